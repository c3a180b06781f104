use time::util::days_in_year_month;
use time::{Date, Duration, Month, OffsetDateTime, Time};

/// The current time in the server's local offset, falling back to UTC when
/// the offset can't be determined (e.g. in multithreaded processes on Unix).
pub fn current_time() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

pub fn today() -> Date {
    current_time().date()
}

/// The current wall-clock time, truncated to the second.
pub fn time_of_day() -> Time {
    let now = current_time();
    Time::from_hms(now.hour(), now.minute(), now.second()).unwrap_or(Time::MIDNIGHT)
}

/// Adds calendar months to a date, clamping the day to the end of shorter
/// months (Jan 31 + 1 month = Feb 28/29). `None` past the supported years.
pub fn add_months(date: Date, months: i32) -> Option<Date> {
    let total = date
        .year()
        .checked_mul(12)?
        .checked_add(i32::from(u8::from(date.month())) - 1)?
        .checked_add(months)?;
    let year = total.div_euclid(12);
    let month = Month::try_from((total.rem_euclid(12) + 1) as u8).ok()?;
    let day = date.day().min(days_in_year_month(year, month));

    Date::from_calendar_date(year, month, day).ok()
}

pub fn add_days(date: Date, days: i64) -> Date {
    date.saturating_add(Duration::days(days))
}

pub fn first_of_month(date: Date) -> Date {
    Date::from_calendar_date(date.year(), date.month(), 1).unwrap_or(date)
}

pub fn first_of_year(date: Date) -> Date {
    Date::from_ordinal_date(date.year(), 1).unwrap_or(date)
}
