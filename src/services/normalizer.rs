//! Response normalization for the proxy's `/api/weather` endpoint.
//!
//! The forecast provider encodes each time series compactly: a base time, an
//! end time, a fixed interval and one column of values per requested
//! variable. The front end wants explicit ISO 8601 timestamps next to each
//! column instead, shifted into the location's local time.
//!
//! Columns are positional. Which slot holds which variable is fixed by the
//! `*_LAYOUT` tables below; the same tables drive the variable lists sent
//! upstream (see `open_meteo`), so request order and decode order cannot
//! drift apart.
//!
//! Everything here is pure. Missing or malformed columns become empty arrays:
//! partial data is an expected outcome, not an error.

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::helpers::epoch_to_iso;

/// How the values of a slot are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// Plain numeric measurement, passed through as-is.
    Value,
    /// Unix timestamp (e.g. sunrise), offset-corrected and rendered as ISO 8601.
    Instant,
}

/// One entry of a positional layout table.
#[derive(Debug, Clone, Copy)]
pub struct VariableSlot {
    pub slot: usize,
    /// Variable name requested from the provider.
    pub source: &'static str,
    /// Key used in the normalized JSON.
    pub output: &'static str,
    pub kind: SlotKind,
}

/// Fixed slot table for one section of the provider response.
#[derive(Debug, Clone, Copy)]
pub struct SeriesLayout {
    /// Nominal spacing between samples, in seconds.
    pub interval_seconds: i32,
    pub slots: &'static [VariableSlot],
}

impl SeriesLayout {
    /// Comma-separated provider variable names in slot order.
    pub fn request_list(&self) -> String {
        self.slots
            .iter()
            .map(|s| s.source)
            .collect::<Vec<_>>()
            .join(",")
    }
}

const fn value(slot: usize, source: &'static str, output: &'static str) -> VariableSlot {
    VariableSlot {
        slot,
        source,
        output,
        kind: SlotKind::Value,
    }
}

const fn instant(slot: usize, source: &'static str, output: &'static str) -> VariableSlot {
    VariableSlot {
        slot,
        source,
        output,
        kind: SlotKind::Instant,
    }
}

pub const CURRENT_LAYOUT: SeriesLayout = SeriesLayout {
    interval_seconds: 900,
    slots: &[
        value(0, "temperature_2m", "temperature"),
        value(1, "weather_code", "weathercode"),
        value(2, "wind_speed_10m", "windspeed"),
        value(3, "wind_direction_10m", "winddirection"),
    ],
};

pub const HOURLY_LAYOUT: SeriesLayout = SeriesLayout {
    interval_seconds: 3600,
    slots: &[
        value(0, "temperature_2m", "temperature_2m"),
        value(1, "relative_humidity_2m", "relative_humidity_2m"),
        value(2, "pressure_msl", "pressure_msl"),
        value(3, "precipitation", "precipitation"),
        value(4, "weather_code", "weathercode"),
    ],
};

pub const DAILY_LAYOUT: SeriesLayout = SeriesLayout {
    interval_seconds: 86_400,
    slots: &[
        value(0, "weather_code", "weathercode"),
        value(1, "temperature_2m_max", "temperature_2m_max"),
        value(2, "temperature_2m_min", "temperature_2m_min"),
        instant(3, "sunrise", "sunrise"),
        instant(4, "sunset", "sunset"),
        value(5, "precipitation_sum", "precipitation_sum"),
        value(6, "precipitation_hours", "precipitation_hours"),
    ],
};

/// Compact provider time series: `[base_time, end_time)` sampled every
/// `interval_seconds`, one optional column per layout slot.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesBlock {
    pub base_time: i64,
    pub end_time: i64,
    pub interval_seconds: i32,
    /// Indexed by slot. `None` means the provider sent nothing for that slot.
    pub variables: Vec<Option<Vec<f64>>>,
}

impl TimeSeriesBlock {
    /// Number of samples implied by the time range, or `None` when the range
    /// violates the block invariants.
    pub fn sample_count(&self) -> Option<usize> {
        let interval = i64::from(self.interval_seconds);
        let span = self.end_time.checked_sub(self.base_time)?;
        if interval <= 0 || span < 0 || span % interval != 0 {
            return None;
        }
        usize::try_from(span / interval).ok()
    }
}

/// A single provider sample (the `current` section).
#[derive(Debug, Clone, PartialEq)]
pub struct InstantSample {
    pub time: i64,
    /// Indexed by slot.
    pub variables: Vec<Option<f64>>,
}

/// Values of one normalized variable.
#[derive(Debug, Clone, PartialEq)]
pub enum SeriesValues {
    Numbers(Vec<f64>),
    /// One entry per timestamp; `None` where the sample is missing.
    Instants(Vec<Option<String>>),
}

impl SeriesValues {
    #[cfg(test)]
    pub fn len(&self) -> usize {
        match self {
            SeriesValues::Numbers(v) => v.len(),
            SeriesValues::Instants(v) => v.len(),
        }
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn empty(kind: SlotKind) -> Self {
        match kind {
            SlotKind::Value => SeriesValues::Numbers(Vec::new()),
            SlotKind::Instant => SeriesValues::Instants(Vec::new()),
        }
    }
}

impl Serialize for SeriesValues {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            // NaN and None mark missing samples; both serialize as null.
            SeriesValues::Numbers(v) => v.serialize(serializer),
            SeriesValues::Instants(v) => v.serialize(serializer),
        }
    }
}

/// Explicit-timestamp form of a `TimeSeriesBlock`.
///
/// Serializes as `{"time": [...], "<output>": [...], ...}` with variables in
/// slot order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NormalizedSeries {
    pub time: Vec<String>,
    pub variables: Vec<(&'static str, SeriesValues)>,
}

impl NormalizedSeries {
    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<&SeriesValues> {
        self.variables
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
    }
}

impl Serialize for NormalizedSeries {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.variables.len() + 1))?;
        map.serialize_entry("time", &self.time)?;
        for (name, values) in &self.variables {
            map.serialize_entry(name, values)?;
        }
        map.end()
    }
}

/// Normalized single sample. Absent values are omitted when serialized.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedInstant {
    pub time: Option<String>,
    pub values: Vec<(&'static str, Option<f64>)>,
}

impl NormalizedInstant {
    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values
            .iter()
            .find(|(n, _)| *n == name)
            .and_then(|(_, v)| *v)
    }
}

impl Serialize for NormalizedInstant {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if let Some(time) = &self.time {
            map.serialize_entry("time", time)?;
        }
        for (name, value) in &self.values {
            if let Some(v) = value {
                map.serialize_entry(name, v)?;
            }
        }
        map.end()
    }
}

/// Format one instant shifted by the location's UTC offset.
pub fn normalize_instant(epoch_secs: i64, utc_offset_seconds: i32) -> Option<String> {
    epoch_secs
        .checked_add(i64::from(utc_offset_seconds))
        .and_then(epoch_to_iso)
}

/// Normalize a time series block through `layout`.
///
/// `time[i] = base + i * interval + offset`. Every output variable has either
/// `time.len()` entries or none at all. An absent or invalid block yields an
/// empty `time` and empty variables.
pub fn normalize_series(
    block: Option<&TimeSeriesBlock>,
    layout: &SeriesLayout,
    utc_offset_seconds: i32,
) -> NormalizedSeries {
    let time = block.and_then(|b| timestamps(b, utc_offset_seconds));

    let (block, time) = match (block, time) {
        (Some(block), Some(time)) => (block, time),
        _ => {
            if block.is_some() {
                tracing::warn!("Discarding time series block with an invalid time range");
            }
            return empty_series(layout);
        }
    };

    let variables = layout
        .slots
        .iter()
        .map(|slot| {
            let column = block.variables.get(slot.slot).and_then(Option::as_ref);
            let values = match column {
                Some(column) if column.len() == time.len() => {
                    Some(convert_column(column, slot.kind, utc_offset_seconds))
                }
                Some(column) => {
                    tracing::debug!(
                        "Slot {} ({}) has {} values for {} timestamps, dropping it",
                        slot.slot,
                        slot.output,
                        column.len(),
                        time.len()
                    );
                    None
                }
                None => None,
            };
            (
                slot.output,
                values.unwrap_or_else(|| SeriesValues::empty(slot.kind)),
            )
        })
        .collect();

    NormalizedSeries { time, variables }
}

/// Normalize the single `current` sample through `layout`.
pub fn normalize_current(
    sample: &InstantSample,
    layout: &SeriesLayout,
    utc_offset_seconds: i32,
) -> NormalizedInstant {
    let values = layout
        .slots
        .iter()
        .map(|slot| {
            let value = sample
                .variables
                .get(slot.slot)
                .copied()
                .flatten()
                .filter(|v| v.is_finite());
            (slot.output, value)
        })
        .collect();

    NormalizedInstant {
        time: normalize_instant(sample.time, utc_offset_seconds),
        values,
    }
}

fn empty_series(layout: &SeriesLayout) -> NormalizedSeries {
    NormalizedSeries {
        time: Vec::new(),
        variables: layout
            .slots
            .iter()
            .map(|slot| (slot.output, SeriesValues::empty(slot.kind)))
            .collect(),
    }
}

fn timestamps(block: &TimeSeriesBlock, utc_offset_seconds: i32) -> Option<Vec<String>> {
    let count = block.sample_count()?;
    let interval = i64::from(block.interval_seconds);
    (0..count)
        .map(|i| {
            let t = block.base_time.checked_add(interval.checked_mul(i as i64)?)?;
            normalize_instant(t, utc_offset_seconds)
        })
        .collect()
}

fn convert_column(column: &[f64], kind: SlotKind, utc_offset_seconds: i32) -> SeriesValues {
    match kind {
        SlotKind::Value => SeriesValues::Numbers(column.to_vec()),
        SlotKind::Instant => SeriesValues::Instants(
            column
                .iter()
                .map(|&v| {
                    v.is_finite()
                        .then(|| normalize_instant(v as i64, utc_offset_seconds))
                        .flatten()
                })
                .collect(),
        ),
    }
}
