// src/formatting/dates.rs
//! Publication dates as shown on the site (pt-BR).

use crate::types::PublicationDate;
use chrono::{Datelike, Timelike};

const MONTHS_PT_BR: [&str; 12] = [
    "jan", "fev", "mar", "abr", "mai", "jun", "jul", "ago", "set", "out", "nov", "dez",
];

/// `dd MMM yyyy`, e.g. `15 mar 2021`.
pub fn format_date(date: &PublicationDate) -> String {
    let dt = date.as_datetime();
    format!(
        "{:02} {} {}",
        dt.day(),
        MONTHS_PT_BR[dt.month0() as usize],
        dt.year()
    )
}

/// `HH:mm`, e.g. `19:25`.
pub fn format_time(date: &PublicationDate) -> String {
    let dt = date.as_datetime();
    format!("{:02}:{:02}", dt.hour(), dt.minute())
}

/// Formats an optional date; a missing date renders as an empty string.
pub fn format_optional_date(date: Option<&PublicationDate>) -> String {
    date.map(format_date).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_date_and_time() {
        let date = PublicationDate::parse("2021-03-05T09:07:28+0000").unwrap();
        assert_eq!(format_date(&date), "05 mar 2021");
        assert_eq!(format_time(&date), "09:07");
    }

    #[test]
    fn test_every_month_is_abbreviated() {
        let date = PublicationDate::parse("2021-12-25T00:00:00+0000").unwrap();
        assert_eq!(format_date(&date), "25 dez 2021");
        let date = PublicationDate::parse("2021-02-01").unwrap();
        assert_eq!(format_date(&date), "01 fev 2021");
    }

    #[test]
    fn test_missing_date() {
        assert_eq!(format_optional_date(None), "");
    }
}
