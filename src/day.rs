//! UTC calendar-day windows for stream requests

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::AppError;

/// One UTC calendar day, the unit a client requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    date: NaiveDate,
}

impl DayWindow {
    pub fn new(date: NaiveDate) -> Self {
        Self { date }
    }

    /// Parse a client-supplied date string
    ///
    /// Accepts a plain ISO-8601 date (`2023-05-01`) or an RFC 3339 timestamp,
    /// which is truncated to its UTC calendar day.
    pub fn parse(input: &str) -> Result<Self, AppError> {
        if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
            return Ok(Self { date });
        }

        let instant = DateTime::parse_from_rfc3339(input)
            .map_err(|_| AppError::bad_request(format!("Invalid date: {}", input)))?;

        Ok(Self {
            date: instant.with_timezone(&Utc).date_naive(),
        })
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Start of the day as a unix timestamp (00:00:00 UTC)
    pub fn start_timestamp(&self) -> i64 {
        self.date
            .and_hms_opt(0, 0, 0)
            .expect("midnight is valid")
            .and_utc()
            .timestamp()
    }

    /// End of the day as a unix timestamp (23:59:59 UTC)
    pub fn end_timestamp(&self) -> i64 {
        self.date
            .and_hms_opt(23, 59, 59)
            .expect("end of day is valid")
            .and_utc()
            .timestamp()
    }

    /// The preceding calendar day, for the backward visual search
    pub fn previous(&self) -> Self {
        Self {
            date: self.date.pred_opt().expect("date within supported range"),
        }
    }
}

impl std::fmt::Display for DayWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.date.format("%Y-%m-%d"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_date() {
        let window = DayWindow::parse("2023-05-01").unwrap();
        assert_eq!(window.to_string(), "2023-05-01");
        assert_eq!(window.start_timestamp(), 1682899200);
        assert_eq!(window.end_timestamp(), 1682899200 + 86399);
    }

    #[test]
    fn parses_rfc3339_timestamp_to_its_utc_day() {
        let window = DayWindow::parse("2023-05-01T18:30:00Z").unwrap();
        assert_eq!(window.to_string(), "2023-05-01");

        // Offset timestamps resolve to the UTC day they fall in.
        let window = DayWindow::parse("2023-05-01T23:30:00-05:00").unwrap();
        assert_eq!(window.to_string(), "2023-05-02");
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(DayWindow::parse("yesterday").is_err());
        assert!(DayWindow::parse("2023-13-40").is_err());
        assert!(DayWindow::parse("").is_err());
    }

    #[test]
    fn previous_crosses_month_boundary() {
        let window = DayWindow::parse("2023-05-01").unwrap();
        assert_eq!(window.previous().to_string(), "2023-04-30");
    }
}
