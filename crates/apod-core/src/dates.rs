// Archive calendar rules: what counts as a valid day and what "today" means
use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, NaiveTime, Utc, Weekday};

use crate::{Error, Result};

/// Date format used everywhere: on the wire, in the favorites record, in the cache
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// The first day the archive has a picture for
pub fn earliest_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1995, 6, 16).unwrap_or(NaiveDate::MIN)
}

/// Parse a `YYYY-MM-DD` string
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    let trimmed = input.trim();
    // chrono happily accepts "2024-1-1"; the archive doesn't
    if trimmed.len() != 10 {
        return Err(Error::InvalidDate(input.to_string()));
    }
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT).map_err(|_| Error::InvalidDate(input.to_string()))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// The archive's current day. New entries are published on US Eastern time.
pub fn archive_today() -> NaiveDate {
    archive_date_at(Utc::now())
}

/// Calendar date in America/New_York at the given instant
pub fn archive_date_at(now: DateTime<Utc>) -> NaiveDate {
    (now + eastern_offset(now)).date_naive()
}

/// UTC-4 while daylight saving is in effect, UTC-5 otherwise.
///
/// DST runs from the second Sunday in March, 02:00 EST (07:00 UTC), to the
/// first Sunday in November, 02:00 EDT (06:00 UTC).
fn eastern_offset(now: DateTime<Utc>) -> Duration {
    let year = now.year();
    let two_am = NaiveTime::from_hms_opt(2, 0, 0).unwrap_or(NaiveTime::MIN);

    let dst_start = nth_weekday(year, 3, Weekday::Sun, 2).and_time(two_am) + Duration::hours(5);
    let dst_end = nth_weekday(year, 11, Weekday::Sun, 1).and_time(two_am) + Duration::hours(4);

    let naive_now = now.naive_utc();
    if naive_now >= dst_start && naive_now < dst_end {
        Duration::hours(-4)
    } else {
        Duration::hours(-5)
    }
}

fn nth_weekday(year: i32, month: u32, weekday: Weekday, n: u8) -> NaiveDate {
    NaiveDate::from_weekday_of_month_opt(year, month, weekday, n).unwrap_or(NaiveDate::MIN)
}

/// A request for the user's local "today" from a timezone that is already a
/// day ahead of the archive gets the archive's today instead of an error.
pub fn resolve_requested(date: NaiveDate, local_today: NaiveDate, archive_today: NaiveDate) -> NaiveDate {
    if date == local_today && local_today != archive_today {
        archive_today
    } else {
        date
    }
}

/// `resolve_requested` against the wall clock
pub fn resolve_requested_now(date: NaiveDate, archive_today: NaiveDate) -> NaiveDate {
    resolve_requested(date, Local::now().date_naive(), archive_today)
}

/// Reject dates the archive can't have
pub fn validate_date(date: NaiveDate, today: NaiveDate) -> Result<NaiveDate> {
    if date > today {
        return Err(Error::DateOutOfRange(format!(
            "{} is in the future (archive today is {})",
            format_date(date),
            format_date(today)
        )));
    }
    if date < earliest_date() {
        return Err(Error::DateOutOfRange(format!(
            "{} is before the first entry on {}",
            format_date(date),
            format_date(earliest_date())
        )));
    }
    Ok(date)
}

/// An inclusive, validated span of archive days
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Build a range, checking both ends and their order
    pub fn new(start: NaiveDate, end: NaiveDate, today: NaiveDate) -> Result<Self> {
        validate_date(start, today)?;
        validate_date(end, today)?;
        if start > end {
            return Err(Error::InvalidRange {
                start: format_date(start),
                end: format_date(end),
            });
        }
        Ok(Self { start, end })
    }

    /// The last `days` days up to and including `today`, clamped to the first entry
    pub fn trailing(today: NaiveDate, days: u32) -> Self {
        let start = today
            .checked_sub_signed(Duration::days(i64::from(days)))
            .unwrap_or_else(earliest_date)
            .max(earliest_date());
        Self {
            start: start.min(today),
            end: today,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of days covered, both ends included
    pub fn len_days(&self) -> usize {
        ((self.end - self.start).num_days() + 1) as usize
    }

    /// Every day in ascending order
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn d(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(d("2024-01-01"), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert!(matches!(parse_date("2024-1-1"), Err(Error::InvalidDate(_))));
        assert!(matches!(parse_date("01/01/2024"), Err(Error::InvalidDate(_))));
        assert!(matches!(parse_date("2024-02-30"), Err(Error::InvalidDate(_))));
        assert!(matches!(parse_date(""), Err(Error::InvalidDate(_))));
    }

    #[test]
    fn test_validate_bounds() {
        let today = d("2024-06-01");
        assert!(validate_date(d("1995-06-16"), today).is_ok());
        assert!(validate_date(today, today).is_ok());
        assert!(matches!(
            validate_date(d("1995-06-15"), today),
            Err(Error::DateOutOfRange(_))
        ));
        assert!(matches!(
            validate_date(d("2024-06-02"), today),
            Err(Error::DateOutOfRange(_))
        ));
    }

    #[test]
    fn test_range_rules() {
        let today = d("2024-06-01");
        let range = DateRange::new(d("2024-01-01"), d("2024-01-03"), today).unwrap();
        assert_eq!(range.len_days(), 3);
        let days: Vec<_> = range.days().map(format_date).collect();
        assert_eq!(days, vec!["2024-01-01", "2024-01-02", "2024-01-03"]);

        assert!(matches!(
            DateRange::new(d("2024-01-03"), d("2024-01-01"), today),
            Err(Error::InvalidRange { .. })
        ));
        assert!(DateRange::new(d("2024-01-01"), d("2024-01-01"), today).is_ok());
    }

    #[test]
    fn test_trailing_window() {
        let window = DateRange::trailing(d("2024-03-31"), 30);
        assert_eq!(window.start(), d("2024-03-01"));
        assert_eq!(window.end(), d("2024-03-31"));
        assert_eq!(window.len_days(), 31);

        // Never reaches before the first entry
        let early = DateRange::trailing(d("1995-06-20"), 30);
        assert_eq!(early.start(), earliest_date());
    }

    #[test]
    fn test_trailing_window_with_huge_day_count() {
        let window = DateRange::trailing(d("2024-06-01"), u32::MAX);
        assert_eq!(window.start(), earliest_date());
        assert_eq!(window.end(), d("2024-06-01"));
    }

    #[test]
    fn test_archive_today_tracks_eastern_time() {
        // 03:00 UTC in January is still the previous evening in New York (EST)
        let winter = Utc.with_ymd_and_hms(2024, 1, 10, 3, 0, 0).unwrap();
        assert_eq!(archive_date_at(winter), d("2024-01-09"));

        // 04:30 UTC in July is 00:30 EDT
        let summer = Utc.with_ymd_and_hms(2024, 7, 10, 4, 30, 0).unwrap();
        assert_eq!(archive_date_at(summer), d("2024-07-10"));

        // Same wall clock in winter is 23:30 EST the day before
        let winter_late = Utc.with_ymd_and_hms(2024, 1, 10, 4, 30, 0).unwrap();
        assert_eq!(archive_date_at(winter_late), d("2024-01-09"));
    }

    #[test]
    fn test_dst_boundaries() {
        // 2024: DST starts March 10 07:00 UTC, ends November 3 06:00 UTC
        let before_start = Utc.with_ymd_and_hms(2024, 3, 10, 6, 59, 0).unwrap();
        assert_eq!(eastern_offset(before_start), Duration::hours(-5));
        let after_start = Utc.with_ymd_and_hms(2024, 3, 10, 7, 0, 0).unwrap();
        assert_eq!(eastern_offset(after_start), Duration::hours(-4));

        let before_end = Utc.with_ymd_and_hms(2024, 11, 3, 5, 59, 0).unwrap();
        assert_eq!(eastern_offset(before_end), Duration::hours(-4));
        let after_end = Utc.with_ymd_and_hms(2024, 11, 3, 6, 0, 0).unwrap();
        assert_eq!(eastern_offset(after_end), Duration::hours(-5));
    }

    #[test]
    fn test_resolve_requested_for_timezones_ahead() {
        let archive = d("2024-01-09");
        let local = d("2024-01-10");

        assert_eq!(resolve_requested(local, local, archive), archive);
        // Any other date is left alone
        assert_eq!(resolve_requested(d("2024-01-05"), local, archive), d("2024-01-05"));
        // Same day everywhere: nothing to adjust
        assert_eq!(resolve_requested(archive, archive, archive), archive);
    }
}
