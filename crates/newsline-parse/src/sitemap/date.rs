//! W3C datetime parsing for `lastmod` and `news:publication_date`

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
];

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"];

/// Parse any W3C datetime profile: `YYYY`, `YYYY-MM`, `YYYY-MM-DD`, and full
/// date-times with minute or (fractional) second precision. `Z` or a numeric
/// offset is honoured; a missing offset means UTC. RFC 2822 dates are
/// accepted as a fallback.
pub fn parse_w3c_datetime(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let normalized = match value.strip_suffix(['Z', 'z']) {
        Some(head) => format!("{head}+00:00"),
        None => value.to_string(),
    };

    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&normalized, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt.and_utc());
        }
    }
    if let Some(date) = parse_partial_date(value) {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    DateTime::parse_from_rfc2822(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// `YYYY-MM-DD`, `YYYY-MM` or `YYYY`
fn parse_partial_date(value: &str) -> Option<NaiveDate> {
    let mut parts = value.splitn(3, '-');
    let year_part = parts.next()?;
    if year_part.len() != 4 {
        return None;
    }
    let year: i32 = year_part.parse().ok()?;
    let month: u32 = match parts.next() {
        Some(m) => m.parse().ok()?,
        None => 1,
    };
    let day: u32 = match parts.next() {
        Some(d) => d.parse().ok()?,
        None => 1,
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn date_only_profiles() {
        assert_eq!(parse_w3c_datetime("2024"), Some(utc(2024, 1, 1, 0, 0, 0)));
        assert_eq!(parse_w3c_datetime("2024-03"), Some(utc(2024, 3, 1, 0, 0, 0)));
        assert_eq!(parse_w3c_datetime("2024-03-17"), Some(utc(2024, 3, 17, 0, 0, 0)));
    }

    #[test]
    fn datetime_with_offsets() {
        assert_eq!(
            parse_w3c_datetime("2024-03-17T10:30:00Z"),
            Some(utc(2024, 3, 17, 10, 30, 0))
        );
        assert_eq!(
            parse_w3c_datetime("2024-03-17T10:30:00+02:00"),
            Some(utc(2024, 3, 17, 8, 30, 0))
        );
        assert_eq!(
            parse_w3c_datetime("2024-03-17T10:30+01:00"),
            Some(utc(2024, 3, 17, 9, 30, 0))
        );
        assert_eq!(
            parse_w3c_datetime("2024-03-17T10:30:00.250-05:00"),
            Some(utc(2024, 3, 17, 15, 30, 0) + chrono::Duration::milliseconds(250))
        );
    }

    #[test]
    fn missing_offset_is_utc() {
        assert_eq!(
            parse_w3c_datetime("2024-03-17T10:30:05"),
            Some(utc(2024, 3, 17, 10, 30, 5))
        );
    }

    #[test]
    fn rfc2822_fallback() {
        assert_eq!(
            parse_w3c_datetime("Sun, 17 Mar 2024 10:30:00 GMT"),
            Some(utc(2024, 3, 17, 10, 30, 0))
        );
    }

    #[test]
    fn garbage_is_none() {
        assert_eq!(parse_w3c_datetime(""), None);
        assert_eq!(parse_w3c_datetime("yesterday"), None);
        assert_eq!(parse_w3c_datetime("2024-13-01"), None);
        assert_eq!(parse_w3c_datetime("24-01-01"), None);
    }
}
