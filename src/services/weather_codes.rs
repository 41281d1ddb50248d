//! WMO weather code lookup: description and icon for each code the forecast
//! provider emits.

/// Description for codes missing from the table.
pub const UNKNOWN_DESCRIPTION: &str = "Unknown";
/// Icon for codes missing from the table.
pub const DEFAULT_ICON_ID: &str = "01d";

const ICON_CDN: &str = "https://openweathermap.org/img/w";

/// (code, description, icon id)
const WEATHER_CODES: &[(i32, &str, &str)] = &[
    (0, "Clear sky", "01d"),
    (1, "Mainly clear", "02d"),
    (2, "Partly cloudy", "03d"),
    (3, "Overcast", "04d"),
    (45, "Fog", "50d"),
    (48, "Depositing rime fog", "50d"),
    (51, "Light drizzle", "09d"),
    (53, "Moderate drizzle", "09d"),
    (55, "Dense drizzle", "09d"),
    (61, "Slight rain", "10d"),
    (63, "Moderate rain", "10d"),
    (65, "Heavy rain", "10d"),
    (71, "Slight snow", "13d"),
    (73, "Moderate snow", "13d"),
    (75, "Heavy snow", "13d"),
    (95, "Thunderstorm", "11d"),
    (96, "Thunderstorm with hail", "11d"),
    (99, "Thunderstorm with heavy hail", "11d"),
];

fn lookup(code: i32) -> Option<&'static (i32, &'static str, &'static str)> {
    WEATHER_CODES.iter().find(|(c, _, _)| *c == code)
}

pub fn describe_weather_code(code: i32) -> &'static str {
    lookup(code).map_or(UNKNOWN_DESCRIPTION, |&(_, description, _)| description)
}

pub fn weather_icon_id(code: i32) -> &'static str {
    lookup(code).map_or(DEFAULT_ICON_ID, |&(_, _, icon)| icon)
}

/// Icon image URL on the public icon CDN.
pub fn weather_icon_url(code: i32) -> String {
    format!("{}/{}.png", ICON_CDN, weather_icon_id(code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        assert_eq!(describe_weather_code(0), "Clear sky");
        assert_eq!(describe_weather_code(63), "Moderate rain");
        assert_eq!(weather_icon_id(48), "50d");
        assert_eq!(weather_icon_id(99), "11d");
    }

    #[test]
    fn test_unknown_code_falls_back() {
        for code in [-1, 4, 56, 80, 1000] {
            assert_eq!(describe_weather_code(code), UNKNOWN_DESCRIPTION);
            assert_eq!(weather_icon_id(code), DEFAULT_ICON_ID);
        }
    }

    #[test]
    fn test_icon_url() {
        assert_eq!(
            weather_icon_url(71),
            "https://openweathermap.org/img/w/13d.png"
        );
        assert_eq!(
            weather_icon_url(12345),
            "https://openweathermap.org/img/w/01d.png"
        );
    }

    #[test]
    fn test_table_has_no_duplicate_codes() {
        for (i, (code, _, _)) in WEATHER_CODES.iter().enumerate() {
            assert!(
                WEATHER_CODES[i + 1..].iter().all(|(c, _, _)| c != code),
                "duplicate code {}",
                code
            );
        }
    }
}
