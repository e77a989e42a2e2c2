//! Civil calendar arithmetic for rule expansion.
//!
//! Everything here works on proleptic Gregorian wall-clock values and returns
//! `None` instead of overflowing.

use chrono::{Datelike, Days, NaiveDate};

use crate::rfc::ical::core::Weekday;

/// Number of days in the given month (1-12).
#[must_use]
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map_or(31, |last| last.day())
}

#[must_use]
pub fn days_in_year(year: i32) -> u32 {
    if NaiveDate::from_ymd_opt(year, 2, 29).is_some() {
        366
    } else {
        365
    }
}

/// Month index counted from year 0, so that consecutive months differ by one.
#[must_use]
pub fn month_index(year: i32, month: u32) -> i64 {
    i64::from(year) * 12 + i64::from(month) - 1
}

/// Inverse of [`month_index`].
#[must_use]
pub fn from_month_index(index: i64) -> Option<(i32, u32)> {
    let year = i32::try_from(index.div_euclid(12)).ok()?;
    let month = u32::try_from(index.rem_euclid(12)).ok()? + 1;
    Some((year, month))
}

/// First day of the week containing `date`, weeks starting on `wkst`.
#[must_use]
pub fn week_start(date: NaiveDate, wkst: Weekday) -> Option<NaiveDate> {
    let back = Weekday::from_chrono(date.weekday()).days_since(wkst);
    date.checked_sub_days(Days::new(u64::from(back)))
}

/// First day of week 1 of `year`: the first week with at least four days in the year.
#[must_use]
pub fn first_week_start(year: i32, wkst: Weekday) -> Option<NaiveDate> {
    let jan1 = NaiveDate::from_ymd_opt(year, 1, 1)?;
    let start = week_start(jan1, wkst)?;
    let days_in_year_part = 7 - (jan1 - start).num_days();
    if days_in_year_part >= 4 {
        Some(start)
    } else {
        start.checked_add_days(Days::new(7))
    }
}

/// Number of numbered weeks (52 or 53) in `year`.
#[must_use]
pub fn weeks_in_year(year: i32, wkst: Weekday) -> Option<u32> {
    let this = first_week_start(year, wkst)?;
    let next = first_week_start(year + 1, wkst)?;
    u32::try_from((next - this).num_days() / 7).ok()
}

/// Week-numbering year and week number (1-based) of `date`.
#[must_use]
pub fn week_number(date: NaiveDate, wkst: Weekday) -> Option<(i32, u32)> {
    let year = date.year();
    let this = first_week_start(year, wkst)?;
    let (week_year, start) = if date < this {
        (year - 1, first_week_start(year - 1, wkst)?)
    } else {
        let next = first_week_start(year + 1, wkst)?;
        if date >= next {
            (year + 1, next)
        } else {
            (year, this)
        }
    };
    let week = u32::try_from((date - start).num_days() / 7 + 1).ok()?;
    Some((week_year, week))
}

/// Resolves a signed position (`1` first, `-1` last) within `1..=len`.
#[must_use]
pub fn resolve_signed(position: i32, len: u32) -> Option<u32> {
    let len = i64::from(len);
    let resolved = if position > 0 {
        i64::from(position)
    } else {
        len + i64::from(position) + 1
    };
    (1..=len)
        .contains(&resolved)
        .then(|| u32::try_from(resolved).ok())
        .flatten()
}

/// Positions of a weekday within a scope, counted from the front and from the back.
///
/// `day_of_scope` is the 1-based position of the day in a scope of `scope_len`
/// days. Returns `(n, -m)` where the day is the n-th and the m-th-last such weekday.
#[must_use]
pub fn weekday_ordinals(day_of_scope: u32, scope_len: u32) -> (i32, i32) {
    let from_front = (day_of_scope - 1) / 7 + 1;
    let from_back = (scope_len - day_of_scope) / 7 + 1;
    (
        i32::try_from(from_front).unwrap_or(i32::MAX),
        -i32::try_from(from_back).unwrap_or(i32::MAX),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn month_lengths() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(2100, 2), 28);
        assert_eq!(days_in_month(2000, 2), 29);
        assert_eq!(days_in_month(2024, 12), 31);
        assert_eq!(days_in_month(2024, 4), 30);
        assert_eq!(days_in_year(2024), 366);
    }

    #[test]
    fn month_index_round_trip() {
        let index = month_index(2024, 12);
        assert_eq!(from_month_index(index + 1), Some((2025, 1)));
        assert_eq!(from_month_index(index - 11), Some((2024, 1)));
    }

    #[test]
    fn iso_week_numbers() {
        // 2021-01-03 is a Sunday that still belongs to 2020-W53
        assert_eq!(week_number(date(2021, 1, 3), Weekday::Monday), Some((2020, 53)));
        assert_eq!(week_number(date(2021, 1, 4), Weekday::Monday), Some((2021, 1)));
        // 2024-12-30 is Monday of 2025-W01
        assert_eq!(week_number(date(2024, 12, 30), Weekday::Monday), Some((2025, 1)));
        assert_eq!(weeks_in_year(2020, Weekday::Monday), Some(53));
        assert_eq!(weeks_in_year(2021, Weekday::Monday), Some(52));
    }

    #[test]
    fn week_numbers_follow_week_start() {
        // 1997-01-01 is a Wednesday; with Sunday starts week 1 begins 1996-12-29
        assert_eq!(first_week_start(1997, Weekday::Sunday), Some(date(1996, 12, 29)));
        assert_eq!(first_week_start(1997, Weekday::Monday), Some(date(1996, 12, 30)));
        assert_eq!(week_start(date(1997, 8, 7), Weekday::Sunday), Some(date(1997, 8, 3)));
    }

    #[test]
    fn signed_positions() {
        assert_eq!(resolve_signed(1, 31), Some(1));
        assert_eq!(resolve_signed(-1, 31), Some(31));
        assert_eq!(resolve_signed(-31, 30), None);
        assert_eq!(resolve_signed(31, 30), None);
        // 29th of a 31-day month: 5th from the front, 1st from the back
        assert_eq!(weekday_ordinals(29, 31), (5, -1));
        assert_eq!(weekday_ordinals(1, 31), (1, -5));
    }
}
