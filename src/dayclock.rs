use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};

/// Default wall-clock offset when LOCAL_TZ_OFFSET_HOURS is not configured (UTC+9).
pub const DEFAULT_OFFSET_HOURS: i32 = 9;

/// The single owner of all calendar-day math.
///
/// Every snapshot key, every "same day" comparison, and every month-range
/// query goes through this type. Instants are stored in UTC; the calendar day
/// a transaction belongs to is determined by one fixed wall-clock offset,
/// configured once at startup and injected as shared app data. No other
/// module may convert an instant to a date.
#[derive(Debug, Clone, Copy)]
pub struct DayClock {
    offset: FixedOffset,
}

impl DayClock {
    /// Build a clock for a fixed offset east of UTC, in whole hours.
    /// Returns `None` for offsets outside the valid +/-23h range.
    pub fn from_offset_hours(hours: i32) -> Option<Self> {
        FixedOffset::east_opt(hours * 3600).map(|offset| DayClock { offset })
    }

    /// The local calendar day the given instant falls into.
    pub fn day_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }

    /// The UTC instants `[start, end)` spanning one local calendar day.
    pub fn day_range(&self, day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = self.local_midnight_utc(day);
        (start, start + Duration::days(1))
    }

    /// The UTC instants `[start, end)` spanning one local calendar month.
    /// Returns `None` for an invalid year/month pair.
    pub fn month_range(&self, year: i32, month: u32) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)?;
        let next = Self::first_of_next_month(year, month)?;
        Some((self.local_midnight_utc(first), self.local_midnight_utc(next)))
    }

    pub fn previous_day(&self, day: NaiveDate) -> NaiveDate {
        day - Duration::days(1)
    }

    /// Number of calendar days in the given month, or `None` if invalid.
    pub fn days_in_month(&self, year: i32, month: u32) -> Option<u32> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)?;
        let next = Self::first_of_next_month(year, month)?;
        Some((next - first).num_days() as u32)
    }

    /// UTC instant of local midnight: local wall-clock time minus the offset.
    fn local_midnight_utc(&self, day: NaiveDate) -> DateTime<Utc> {
        let local = day.and_time(NaiveTime::MIN);
        let shift = Duration::seconds(i64::from(self.offset.local_minus_utc()));
        Utc.from_utc_datetime(&(local - shift))
    }

    fn first_of_next_month(year: i32, month: u32) -> Option<NaiveDate> {
        if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        }
    }
}
