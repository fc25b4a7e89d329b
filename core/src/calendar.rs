//! Calendar arithmetic on [`DateTime`]
//!
//! Two families of conversions live here:
//!
//! - [`add_seconds`] advances a calendar value by an elapsed duration the
//!   way the free-running provider needs it: fold into second-of-day, carry
//!   whole days, then roll day/month/year one day at a time.
//! - [`to_unix`] / [`from_unix`] use Howard Hinnant's days_from_civil and
//!   civil_from_days algorithms (O(1), proleptic Gregorian).
//!   Reference: http://howardhinnant.github.io/date_algorithms.html
//!
//! UTC only. No leap seconds.

use edge_clock_hal::DateTime;

const SECONDS_PER_DAY: u32 = 86_400;

/// NTP epoch offset (1900-01-01 to 1970-01-01 in seconds)
const NTP_UNIX_OFFSET: u64 = 2_208_988_800;

/// Gregorian leap year: every fourth year, centuries only when divisible by 400
pub fn is_leap_year(year: u16) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Number of days in `month` of `year`, or 0 for a month outside 1-12
pub fn days_in_month(year: u16, month: u8) -> u8 {
    const DAYS: [u8; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
    match month {
        2 if is_leap_year(year) => 29,
        1..=12 => DAYS[usize::from(month - 1)],
        _ => 0,
    }
}

/// Whether every date/time field is in range (the millisecond phase is not checked)
pub fn is_valid(dt: &DateTime) -> bool {
    (1..=12).contains(&dt.month)
        && dt.day >= 1
        && dt.day <= days_in_month(dt.year, dt.month)
        && dt.hour < 24
        && dt.minute < 60
        && dt.second < 60
}

/// Advance `base` by `seconds`
///
/// The millisecond phase of `base` is carried through untouched. `base` must
/// be valid (see [`is_valid`]) for the result to be valid.
pub fn add_seconds(base: &DateTime, seconds: u32) -> DateTime {
    let mut out = *base;

    // time-of-day rollover
    let second_of_day = u64::from(base.hour) * 3600
        + u64::from(base.minute) * 60
        + u64::from(base.second);
    let total = second_of_day + u64::from(seconds);

    out.hour = ((total / 3600) % 24) as u8;
    out.minute = ((total / 60) % 60) as u8;
    out.second = (total % 60) as u8;

    // day rollover
    let mut days = total / u64::from(SECONDS_PER_DAY);
    while days > 0 {
        if out.day < days_in_month(out.year, out.month) {
            out.day += 1;
        } else {
            out.day = 1;
            if out.month < 12 {
                out.month += 1;
            } else {
                out.month = 1;
                out.year = out.year.wrapping_add(1);
            }
        }
        days -= 1;
    }

    out
}

/// Seconds since 1970-01-01 00:00:00 UTC (millisecond phase ignored)
///
/// Dates before 1970 clamp to 0.
pub fn to_unix(dt: &DateTime) -> u64 {
    let days = days_from_civil(dt.year, dt.month, dt.day);
    let secs = days * i64::from(SECONDS_PER_DAY)
        + i64::from(dt.hour) * 3600
        + i64::from(dt.minute) * 60
        + i64::from(dt.second);
    secs.max(0) as u64
}

/// Calendar value for seconds since 1970-01-01 00:00:00 UTC, millisecond phase 0
pub fn from_unix(unix_secs: u64) -> DateTime {
    let days = (unix_secs / u64::from(SECONDS_PER_DAY)) as i64;
    let secs_today = (unix_secs % u64::from(SECONDS_PER_DAY)) as u32;

    let (year, month, day) = civil_from_days(days);
    DateTime::new(
        year,
        month,
        day,
        (secs_today / 3600) as u8,
        ((secs_today % 3600) / 60) as u8,
        (secs_today % 60) as u8,
    )
}

/// Calendar value for an NTP timestamp (seconds since 1900 plus 2^-32 fraction)
///
/// Seconds values below the 1900-to-1970 offset are taken to be in NTP era 1
/// (after the 2036-02-07 rollover).
pub fn from_ntp(ntp_secs: u32, ntp_frac: u32) -> DateTime {
    let mut secs = u64::from(ntp_secs);
    if secs < NTP_UNIX_OFFSET {
        secs += 1 << 32;
    }
    let millis = ((u64::from(ntp_frac) * 1000) >> 32) as u16;
    from_unix(secs - NTP_UNIX_OFFSET).with_millis(millis)
}

/// Days from 0000-03-01 to 1970-01-01
const EPOCH_SHIFT: i64 = 719_468;
/// Days in a 400-year Gregorian cycle
const DAYS_PER_ERA: i64 = 146_097;

/// Day number relative to 1970-01-01 into (year, month, day)
///
/// Years are counted from March so February's leap day is always the last
/// day of a year.
fn civil_from_days(days: i64) -> (u16, u8, u8) {
    let shifted = days + EPOCH_SHIFT;
    let era = shifted.div_euclid(DAYS_PER_ERA);
    let day_of_era = shifted.rem_euclid(DAYS_PER_ERA) as u32;

    let year_of_era =
        (day_of_era - day_of_era / 1460 + day_of_era / 36_524 - day_of_era / 146_096) / 365;
    let day_of_year = day_of_era - (365 * year_of_era + year_of_era / 4 - year_of_era / 100);
    // 0 is March, 11 is February
    let march_month = (5 * day_of_year + 2) / 153;

    let day = (day_of_year - (153 * march_month + 2) / 5 + 1) as u8;
    let month = if march_month < 10 { march_month + 3 } else { march_month - 9 } as u8;
    let year = i64::from(year_of_era) + era * 400 + i64::from(month <= 2);

    (year as u16, month, day)
}

/// Inverse of [`civil_from_days`]
fn days_from_civil(year: u16, month: u8, day: u8) -> i64 {
    let march_year = i64::from(year) - i64::from(month <= 2);
    let march_month = (i64::from(month) + 9) % 12;

    let era = march_year.div_euclid(400);
    let year_of_era = march_year.rem_euclid(400);
    let day_of_year = (153 * march_month + 2) / 5 + i64::from(day) - 1;
    let day_of_era = year_of_era * 365 + year_of_era / 4 - year_of_era / 100 + day_of_year;

    era * DAYS_PER_ERA + day_of_era - EPOCH_SHIFT
}
