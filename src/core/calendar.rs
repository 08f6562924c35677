use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, TimeZone};

/// Number of days in a calendar month, accounting for leap years.
pub(crate) fn days_in_month(year: i32, month: u32) -> u32 {
    let first = first_of_month(year, month);
    let next = if month == 12 {
        first_of_month(year + 1, 1)
    } else {
        first_of_month(year, month + 1)
    };
    (next - first).num_days() as u32
}

fn first_of_month(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).expect("month index must be in 1..=12")
}

/// The last whole second of the month containing `moment`, in the same fixed
/// offset. Month windows close at 23:59:59 rather than at the next month's
/// first instant, matching the upstream second-granularity bucketing.
pub(crate) fn end_of_month(moment: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    let (year, month) = (moment.year(), moment.month());
    at(
        moment.timezone(),
        year,
        month,
        days_in_month(year, month),
        23,
        59,
        59,
    )
}

/// First instant of the calendar year in the given offset.
pub(crate) fn start_of_year(year: i32, tz: FixedOffset) -> DateTime<FixedOffset> {
    at(tz, year, 1, 1, 0, 0, 0)
}

/// Last whole second of the calendar year in the given offset.
pub(crate) fn end_of_year(year: i32, tz: FixedOffset) -> DateTime<FixedOffset> {
    at(tz, year, 12, 31, 23, 59, 59)
}

/// Human-readable month bucket label, e.g. "January 2020".
pub(crate) fn month_label(year: i32, month: u32) -> String {
    first_of_month(year, month).format("%B %Y").to_string()
}

fn at(
    tz: FixedOffset,
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    min: u32,
    sec: u32,
) -> DateTime<FixedOffset> {
    tz.with_ymd_and_hms(year, month, day, hour, min, sec)
        .single()
        .expect("fixed offsets map every local time to exactly one instant")
}
