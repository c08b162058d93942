//! Wall-clock time source
//!
//! The scheduler gates on network time when a time API is configured, so a
//! drifted local clock cannot shift the daily trigger. The local clock is
//! the fallback when the network source is unreachable.

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, NaiveTime};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::{Error, Result};

/// A date plus time of day, as the scheduler consumes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WallClock {
    pub date: NaiveDate,
    pub time: NaiveTime,
}

impl WallClock {
    /// The whole-minute form the scheduler compares against, e.g. "17:10".
    pub fn minute(&self) -> String {
        self.time.format("%H:%M").to_string()
    }
}

#[async_trait]
pub trait TimeSource: Send + Sync {
    async fn now(&self) -> Result<WallClock>;
}

/// The machine's local clock. Never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    pub fn read(&self) -> WallClock {
        let now = Local::now();
        WallClock {
            date: now.date_naive(),
            time: now.time(),
        }
    }
}

#[async_trait]
impl TimeSource for SystemClock {
    async fn now(&self) -> Result<WallClock> {
        Ok(self.read())
    }
}

#[derive(Debug, Deserialize)]
struct TimeApiResponse {
    datetime: String,
}

/// Network time over HTTP: expects a JSON body with an RFC 3339 `datetime`
/// field carrying the zone offset, as the worldtimeapi-style services return.
pub struct HttpTimeSource {
    http: reqwest::Client,
    url: String,
}

impl HttpTimeSource {
    pub fn new(url: String, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, url })
    }
}

#[async_trait]
impl TimeSource for HttpTimeSource {
    async fn now(&self) -> Result<WallClock> {
        let response = self.http.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Api(format!("time API returned status {status}")));
        }

        let body: TimeApiResponse = response.json().await?;
        let clock = parse_rfc3339(&body.datetime)?;
        debug!(datetime = %body.datetime, "network time fetched");
        Ok(clock)
    }
}

fn parse_rfc3339(datetime: &str) -> Result<WallClock> {
    let stamp = DateTime::parse_from_rfc3339(datetime)
        .map_err(|e| Error::Validation(format!("time API returned unparseable datetime '{datetime}': {e}")))?;
    Ok(WallClock {
        date: stamp.date_naive(),
        time: stamp.time(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc3339_with_offset_parses_to_local_fields() {
        let clock = parse_rfc3339("2026-08-06T10:32:00.123456-05:00").unwrap();
        assert_eq!(clock.date, NaiveDate::from_ymd_opt(2026, 8, 6).unwrap());
        assert_eq!(clock.minute(), "10:32");
    }

    #[test]
    fn garbage_datetime_is_a_validation_error() {
        assert!(matches!(parse_rfc3339("not-a-date"), Err(Error::Validation(_))));
    }

    #[test]
    fn system_clock_reads_without_failing() {
        let clock = SystemClock.read();
        assert_eq!(clock.minute().len(), 5);
    }
}
