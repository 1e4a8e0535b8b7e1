//! Date handling for viewing-history exports
//!
//! Exports use `M/D/YY` (or `MM/DD/YY`); two-digit years are 2000s.

use anyhow::{anyhow, Result};
use chrono::{Datelike, NaiveDate};

/// Parse an `M/D/YY` export date into a calendar date
pub fn parse_us_date(raw: &str) -> Result<NaiveDate> {
  let parts: Vec<&str> = raw.trim().split('/').collect();
  let [month, day, year] = parts.as_slice() else {
    return Err(anyhow!("Expected M/D/YY date, got '{raw}'"));
  };

  let month: u32 = month.trim().parse().map_err(|_| anyhow!("Invalid month in '{raw}'"))?;
  let day: u32 = day.trim().parse().map_err(|_| anyhow!("Invalid day in '{raw}'"))?;
  let year: i32 = year.trim().parse().map_err(|_| anyhow!("Invalid year in '{raw}'"))?;
  let year = if (0..100).contains(&year) { 2000 + year } else { year };

  NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| anyhow!("'{raw}' is not a calendar date"))
}

/// Format a date as zero-padded `YYYY-MM-DD`
pub fn format_ymd(date: NaiveDate) -> String {
  format!("{:04}-{:02}-{:02}", date.year(), date.month(), date.day())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn two_digit_years_land_in_the_2000s() {
    for yy in [0, 7, 23, 99] {
      let date = parse_us_date(&format!("3/4/{yy:02}")).unwrap();
      assert_eq!(date.year(), 2000 + yy);
    }
  }

  #[test]
  fn single_digit_fields_are_zero_padded() {
    let date = parse_us_date("1/5/24").unwrap();
    assert_eq!(format_ymd(date), "2024-01-05");

    let date = parse_us_date("12/25/23").unwrap();
    assert_eq!(format_ymd(date), "2023-12-25");
  }

  #[test]
  fn four_digit_years_pass_through() {
    let date = parse_us_date("07/04/2021").unwrap();
    assert_eq!(format_ymd(date), "2021-07-04");
  }

  #[test]
  fn malformed_dates_are_rejected() {
    assert!(parse_us_date("2024-01-05").is_err());
    assert!(parse_us_date("13/1/24").is_err());
    assert!(parse_us_date("2/30/24").is_err());
    assert!(parse_us_date("a/b/c").is_err());
    assert!(parse_us_date("").is_err());
  }
}
