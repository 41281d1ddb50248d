//! Shared helpers for timestamp formatting, display rounding and query parsing.
//!
//! Timestamps leave the service in one format only: ISO 8601 UTC with
//! millisecond precision and a `Z` suffix (`2024-03-01T06:00:00.000Z`), the
//! same shape browsers produce with `Date.prototype.toISOString`.

use chrono::{DateTime, SecondsFormat};

use crate::errors::AppError;

/// Format a unix timestamp (seconds) as ISO 8601 UTC.
///
/// Returns `None` when the value is outside chrono's representable range.
pub(crate) fn epoch_to_iso(secs: i64) -> Option<String> {
    DateTime::from_timestamp(secs, 0).map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Round half towards positive infinity, the way the front end rounds
/// displayed temperatures (`-2.5` becomes `-2`, `2.5` becomes `3`).
pub(crate) fn round_half_up(v: f64) -> f64 {
    (v + 0.5).floor()
}

/// Parse the `lat`/`lon` query pair shared by several endpoints.
///
/// Both must be present and non-empty (`MissingParameter`), and both must be
/// finite numbers (`BadRequest`).
pub(crate) fn parse_lat_lon(lat: Option<&str>, lon: Option<&str>) -> Result<(f64, f64), AppError> {
    let (lat, lon) = match (non_empty(lat), non_empty(lon)) {
        (Some(lat), Some(lon)) => (lat, lon),
        _ => return Err(AppError::MissingParameter("lat/lon required".to_string())),
    };

    let parse = |raw: &str| raw.trim().parse::<f64>().ok().filter(|v| v.is_finite());
    match (parse(lat), parse(lon)) {
        (Some(lat), Some(lon)) => Ok((lat, lon)),
        _ => Err(AppError::BadRequest(
            "lat/lon must be numbers".to_string(),
        )),
    }
}

/// Treat whitespace-only query values the same as missing ones.
pub(crate) fn non_empty(v: Option<&str>) -> Option<&str> {
    v.filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_to_iso_zero() {
        assert_eq!(epoch_to_iso(0).unwrap(), "1970-01-01T00:00:00.000Z");
    }

    #[test]
    fn test_epoch_to_iso_known_instant() {
        assert_eq!(
            epoch_to_iso(1_709_272_800).unwrap(),
            "2024-03-01T06:00:00.000Z"
        );
    }

    #[test]
    fn test_epoch_to_iso_out_of_range() {
        assert!(epoch_to_iso(i64::MAX).is_none());
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_half_up(2.5), 3.0);
        assert_eq!(round_half_up(-2.5), -2.0);
        assert_eq!(round_half_up(12.49), 12.0);
        assert_eq!(round_half_up(-0.4), 0.0);
    }

    #[test]
    fn test_parse_lat_lon_ok() {
        let (lat, lon) = parse_lat_lon(Some("42.6"), Some(" 21.0 ")).unwrap();
        assert!((lat - 42.6).abs() < 1e-9);
        assert!((lon - 21.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_lat_lon_missing() {
        let err = parse_lat_lon(Some("42.6"), None).unwrap_err();
        assert!(matches!(err, AppError::MissingParameter(_)));
        let err = parse_lat_lon(Some(""), Some("21")).unwrap_err();
        assert!(matches!(err, AppError::MissingParameter(_)));
    }

    #[test]
    fn test_parse_lat_lon_not_numeric() {
        let err = parse_lat_lon(Some("north"), Some("21")).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        let err = parse_lat_lon(Some("NaN"), Some("21")).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
