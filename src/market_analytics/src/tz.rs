//! Time zone helpers for the edges of the pipeline.
//!
//! All bar arithmetic runs in UTC. Local calendar dates only show up when a
//! report or chart payload is rendered for a particular exchange, e.g.
//! "Asia/Kolkata" for NSE symbols.
//!
//! - [`parse_ts_to_utc`]: RFC-3339 with an explicit offset -> UTC.
//! - [`parse_tz`]: IANA name -> [`Tz`].
//! - [`local_date`]: the exchange-local calendar date of a UTC instant.

use anyhow::{Context, anyhow};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

/// RFC-3339 with offset -> UTC.
///
/// Example:
/// - "2024-03-11T15:30:00+05:30" -> "2024-03-11T10:00:00Z"
pub fn parse_ts_to_utc(s: &str) -> anyhow::Result<DateTime<Utc>> {
    let dt = DateTime::parse_from_rfc3339(s).with_context(|| format!("bad rfc3339: {s}"))?;
    Ok(dt.with_timezone(&Utc))
}

/// Parses an IANA zone name such as "America/New_York".
pub fn parse_tz(name: &str) -> anyhow::Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|e| anyhow!("unknown time zone '{name}': {e}"))
}

/// Calendar date of `ts` in `tz`, or in UTC when no zone is given.
pub fn local_date(ts: DateTime<Utc>, tz: Option<Tz>) -> NaiveDate {
    match tz {
        Some(tz) => ts.with_timezone(&tz).date_naive(),
        None => ts.date_naive(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn offset_is_applied() {
        let got = parse_ts_to_utc("2024-03-11T15:30:00+05:30").unwrap();
        assert_eq!(got, Utc.with_ymd_and_hms(2024, 3, 11, 10, 0, 0).unwrap());
    }

    #[test]
    fn rejects_naive_timestamp() {
        assert!(parse_ts_to_utc("2024-03-11T15:30:00").is_err());
    }

    #[test]
    fn parses_known_zone_and_rejects_unknown() {
        assert_eq!(parse_tz(" Asia/Kolkata ").unwrap(), chrono_tz::Asia::Kolkata);
        let err = parse_tz("Mars/Olympus").unwrap_err();
        assert!(err.to_string().contains("Mars/Olympus"));
    }

    #[test]
    fn local_date_crosses_midnight() {
        // 20:00Z is already the next morning in Kolkata
        let ts = Utc.with_ymd_and_hms(2024, 5, 17, 20, 0, 0).unwrap();
        assert_eq!(local_date(ts, None), NaiveDate::from_ymd_opt(2024, 5, 17).unwrap());
        assert_eq!(
            local_date(ts, Some(chrono_tz::Asia::Kolkata)),
            NaiveDate::from_ymd_opt(2024, 5, 18).unwrap()
        );
    }
}
