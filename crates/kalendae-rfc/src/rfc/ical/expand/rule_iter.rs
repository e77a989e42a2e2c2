//! Rule Iterator: walks the occurrences of one [`RecurrenceRule`] from its anchor.
//!
//! Occurrences are produced period by period. A period is one year, month,
//! week, day, hour, minute or second, and period `k` starts `k * INTERVAL` units
//! after the anchor's own period. Each period expands to a candidate set
//! (matching days crossed with matching times of day, in order), BYSETPOS
//! picks from it, and the iterator walks the picks. Because period numbers are
//! exact, seeks can jump straight to the period holding a target instead of
//! stepping through every occurrence in between.

use std::sync::Arc;

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike};
use kalendae_core::constants::MAX_EXPANSION_YEAR;

use super::RecurrenceCursor;
use super::calendar::{
    days_in_month, days_in_year, from_month_index, month_index, resolve_signed, week_number,
    week_start, weekday_ordinals, weeks_in_year,
};
use super::options::ExpansionError;
use super::timezone::{TimeZoneResolver, coerce_to_frame};
use crate::rfc::ical::core::{
    DateValue, Frequency, RRuleUntil, RecurrenceRule, Weekday, WeekdayNum,
};

/// Position of the cursor in the occurrence sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OccurrenceIndex {
    /// Zero-based index; the anchor is occurrence 0.
    Known(u64),
    /// A seek jumped over whole periods without counting them.
    Unknown,
}

impl OccurrenceIndex {
    const fn succ(self) -> Self {
        match self {
            Self::Known(i) => Self::Known(i.saturating_add(1)),
            Self::Unknown => Self::Unknown,
        }
    }
}

impl Default for OccurrenceIndex {
    fn default() -> Self {
        Self::Known(0)
    }
}

/// Which span a BYDAY ordinal (`2MO`, `-1FR`) counts within.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OrdinalScope {
    Ignored,
    Month,
    Year,
}

/// One expanded period: candidate `days x times`, optionally narrowed by BYSETPOS.
#[derive(Debug, Clone)]
struct Period {
    k: u64,
    days: Vec<NaiveDate>,
    times: Vec<NaiveTime>,
    picks: Option<Vec<usize>>,
    next: usize,
}

impl Period {
    fn candidate(&self, i: usize) -> Option<NaiveDateTime> {
        let flat = match &self.picks {
            Some(picks) => *picks.get(i)?,
            None => i,
        };
        let per_day = self.times.len();
        let day = self.days.get(flat.checked_div(per_day)?)?;
        let time = self.times.get(flat % per_day)?;
        Some(day.and_time(*time))
    }

    fn take_next(&mut self) -> Option<NaiveDateTime> {
        let candidate = self.candidate(self.next)?;
        self.next += 1;
        Some(candidate)
    }
}

#[derive(Debug, Clone, Default)]
struct PeriodCursor {
    period: Option<Period>,
    finished: bool,
}

impl PeriodCursor {
    fn at(period: Option<Period>) -> Self {
        let finished = period.is_none();
        Self { period, finished }
    }

    fn k(&self) -> u64 {
        self.period.as_ref().map_or(0, |p| p.k)
    }
}

/// Iterator state: the occurrence under the cursor and where generation resumes.
///
/// `current` is `None` once the rule is exhausted.
#[derive(Debug, Clone, Default)]
pub struct RuleIteratorState {
    current: Option<NaiveDateTime>,
    index: OccurrenceIndex,
    cursor: PeriodCursor,
}

impl RuleIteratorState {
    /// Wall-clock value of the occurrence under the cursor.
    #[must_use]
    pub const fn current(&self) -> Option<NaiveDateTime> {
        self.current
    }

    #[must_use]
    pub const fn index(&self) -> OccurrenceIndex {
        self.index
    }
}

/// Everything derived once from the rule and the anchor.
#[derive(Debug)]
struct RulePlan {
    rule: RecurrenceRule,
    anchor: DateValue,
    start: NaiveDateTime,
    origin: NaiveDateTime,
    date_only: bool,
    freq: Frequency,
    interval: u32,
    wkst: Weekday,
    months: Vec<u32>,
    weeknos: Vec<i32>,
    yeardays: Vec<i32>,
    monthdays: Vec<i32>,
    weekdays: Vec<WeekdayNum>,
    ordinal_scope: OrdinalScope,
    hours: Vec<u32>,
    minutes: Vec<u32>,
    seconds: Vec<u32>,
    setpos: Vec<i32>,
    until: Option<NaiveDateTime>,
    count: Option<u64>,
    barren: bool,
}

fn widen<T: Copy + Into<i32>>(values: &[T]) -> Vec<i32> {
    values.iter().map(|&v| v.into()).collect()
}

fn widen_unsigned(values: &[u8]) -> Vec<u32> {
    values.iter().map(|&v| u32::from(v)).collect()
}

/// Expansion list for a time field: the explicit values, or the anchor's own
/// value when the frequency is coarser than the field.
fn time_field(explicit: Vec<u32>, anchor_value: u32, defaulted: bool) -> Vec<u32> {
    if explicit.is_empty() && defaulted {
        vec![anchor_value]
    } else {
        explicit
    }
}

impl RulePlan {
    fn new(rule: RecurrenceRule, anchor: DateValue, resolver: &mut TimeZoneResolver) -> Self {
        let civil = anchor.civil();
        let start = civil.with_nanosecond(0).unwrap_or(civil);
        let freq = rule.frequency();
        let wkst = rule.week_start();

        let mut months = widen_unsigned(rule.by_month());
        let mut monthdays = widen(rule.by_monthday());
        let mut weekdays = rule.by_day().to_vec();
        let no_day_parts = rule.by_day().is_empty()
            && rule.by_monthday().is_empty()
            && rule.by_yearday().is_empty()
            && rule.by_weekno().is_empty();
        if no_day_parts {
            match freq {
                Frequency::Yearly => {
                    if months.is_empty() {
                        months = vec![start.month()];
                    }
                    monthdays = vec![i32::try_from(start.day()).unwrap_or(1)];
                }
                Frequency::Monthly => monthdays = vec![i32::try_from(start.day()).unwrap_or(1)],
                Frequency::Weekly => {
                    weekdays = vec![WeekdayNum::every(Weekday::from_chrono(start.weekday()))];
                }
                _ => {}
            }
        }

        let ordinal_scope = match freq {
            Frequency::Monthly => OrdinalScope::Month,
            Frequency::Yearly if rule.by_month().is_empty() => OrdinalScope::Year,
            Frequency::Yearly => OrdinalScope::Month,
            _ => OrdinalScope::Ignored,
        };

        let explicit_seconds: Vec<u32> = widen_unsigned(rule.by_second())
            .into_iter()
            .filter(|&s| s < 60)
            .collect();
        let barren = !rule.by_second().is_empty() && explicit_seconds.is_empty();
        let hours = time_field(
            widen_unsigned(rule.by_hour()),
            start.hour(),
            freq > Frequency::Hourly,
        );
        let minutes = time_field(
            widen_unsigned(rule.by_minute()),
            start.minute(),
            freq > Frequency::Minutely,
        );
        let seconds = time_field(explicit_seconds, start.second(), freq > Frequency::Secondly);

        let midnight = |date: NaiveDate| date.and_time(NaiveTime::MIN);
        let origin = match freq {
            Frequency::Yearly => NaiveDate::from_ymd_opt(start.year(), 1, 1).map(midnight),
            Frequency::Monthly => {
                NaiveDate::from_ymd_opt(start.year(), start.month(), 1).map(midnight)
            }
            Frequency::Weekly => week_start(start.date(), wkst).map(midnight),
            Frequency::Daily => Some(midnight(start.date())),
            Frequency::Hourly => start.with_minute(0).and_then(|t| t.with_second(0)),
            Frequency::Minutely => start.with_second(0),
            Frequency::Secondly => Some(start),
        }
        .unwrap_or(start);

        let until = rule.until().and_then(|until| match until {
            RRuleUntil::Date(d) => {
                midnight(*d).checked_add_signed(TimeDelta::seconds(86_399))
            }
            RRuleUntil::DateTime(dt) => {
                Some(coerce_to_frame(&DateValue::DateTime(dt.clone()), &anchor, resolver).civil())
            }
        });

        let mut plan = Self {
            date_only: anchor.is_date(),
            interval: rule.interval(),
            weeknos: widen(rule.by_weekno()),
            yeardays: widen(rule.by_yearday()),
            setpos: widen(rule.by_setpos()),
            count: rule.count().map(u64::from),
            rule,
            anchor,
            start,
            origin,
            freq,
            wkst,
            months,
            monthdays,
            weekdays,
            ordinal_scope,
            hours,
            minutes,
            seconds,
            until,
            barren,
        };
        if !plan.barren && !plan.period_start_reachable() {
            tracing::debug!(rule = %plan.rule, "Rule can never match after its anchor");
            plan.barren = true;
        }
        plan
    }

    /// For daily and finer rules, whether any period can start on a weekday
    /// and time of day the BY-parts accept.
    ///
    /// Period starts sit `k * step` seconds after the origin, so their offsets
    /// within the week are exactly the origin's offset plus multiples of
    /// `gcd(step, week)`.
    fn period_start_reachable(&self) -> bool {
        const DAY: i64 = 86_400;
        const WEEK: i64 = 7 * DAY;

        let unit = match self.freq {
            Frequency::Daily => DAY,
            Frequency::Hourly => 3_600,
            Frequency::Minutely => 60,
            Frequency::Secondly => 1,
            Frequency::Weekly | Frequency::Monthly | Frequency::Yearly => return true,
        };
        let lattice = gcd(i64::from(self.interval) * unit, WEEK);
        let origin = i64::from(self.origin.weekday().num_days_from_monday()) * DAY
            + i64::from(self.origin.num_seconds_from_midnight());

        let fixed = self.date_only || self.freq == Frequency::Daily;
        let or_all = |values: &[u32], limit: u32, pinned: bool| -> Vec<u32> {
            if pinned {
                vec![0]
            } else if values.is_empty() {
                (0..limit).collect()
            } else {
                values.to_vec()
            }
        };
        let weekdays: Vec<u32> = if self.weekdays.is_empty() {
            (0..7).collect()
        } else {
            self.weekdays
                .iter()
                .map(|wd| wd.weekday.to_chrono().num_days_from_monday())
                .collect()
        };
        let hours = or_all(&self.hours, 24, fixed);
        let minutes = or_all(&self.minutes, 60, fixed || self.freq == Frequency::Hourly);
        let seconds = or_all(&self.seconds, 60, fixed || self.freq != Frequency::Secondly);

        weekdays.iter().any(|&d| {
            hours.iter().any(|&h| {
                minutes.iter().any(|&m| {
                    seconds.iter().any(|&s| {
                        let offset = i64::from(d) * DAY
                            + i64::from(h) * 3_600
                            + i64::from(m) * 60
                            + i64::from(s);
                        (offset - origin).rem_euclid(lattice) == 0
                    })
                })
            })
        })
    }

    fn initial_state(&self) -> RuleIteratorState {
        let within = self.within_until(self.start);
        RuleIteratorState {
            current: within.then_some(self.start),
            index: OccurrenceIndex::Known(0),
            cursor: PeriodCursor::default(),
        }
    }

    fn within_until(&self, value: NaiveDateTime) -> bool {
        self.until.is_none_or(|until| value <= until)
    }

    fn period_start(&self, k: u64) -> Option<NaiveDateTime> {
        let step = i64::try_from(k)
            .ok()?
            .checked_mul(i64::from(self.interval))?;
        let delta = match self.freq {
            Frequency::Yearly => {
                let year = i32::try_from(i64::from(self.origin.year()).checked_add(step)?).ok()?;
                return NaiveDate::from_ymd_opt(year, 1, 1).map(|d| d.and_time(NaiveTime::MIN));
            }
            Frequency::Monthly => {
                let base = month_index(self.origin.year(), self.origin.month());
                let (year, month) = from_month_index(base.checked_add(step)?)?;
                return NaiveDate::from_ymd_opt(year, month, 1).map(|d| d.and_time(NaiveTime::MIN));
            }
            Frequency::Weekly => TimeDelta::try_weeks(step)?,
            Frequency::Daily => TimeDelta::try_days(step)?,
            Frequency::Hourly => TimeDelta::try_hours(step)?,
            Frequency::Minutely => TimeDelta::try_minutes(step)?,
            Frequency::Secondly => TimeDelta::try_seconds(step)?,
        };
        self.origin.checked_add_signed(delta)
    }

    /// Number of the period containing `t` (`t` at or after the anchor).
    fn period_of(&self, t: NaiveDateTime) -> u64 {
        let elapsed = match self.freq {
            Frequency::Yearly => i64::from(t.year()) - i64::from(self.origin.year()),
            Frequency::Monthly => {
                month_index(t.year(), t.month())
                    - month_index(self.origin.year(), self.origin.month())
            }
            Frequency::Weekly => (t.date() - self.origin.date()).num_days().div_euclid(7),
            Frequency::Daily => (t.date() - self.origin.date()).num_days(),
            Frequency::Hourly => (t - self.origin).num_hours(),
            Frequency::Minutely => (t - self.origin).num_minutes(),
            Frequency::Secondly => (t - self.origin).num_seconds(),
        };
        u64::try_from(elapsed.div_euclid(i64::from(self.interval))).unwrap_or(0)
    }

    /// First period starting at or after `t`.
    fn period_at_or_after(&self, t: NaiveDateTime) -> Option<u64> {
        let k = self.period_of(t);
        if self.period_start(k)? < t {
            k.checked_add(1)
        } else {
            Some(k)
        }
    }

    /// First non-empty period numbered `k` or later.
    fn seek_period(&self, mut k: u64) -> Option<Period> {
        if self.barren {
            return None;
        }
        loop {
            let start = self.period_start(k)?;
            if start.year() > MAX_EXPANSION_YEAR || !self.within_until(start) {
                return None;
            }

            if let Some(skip_to) = self.rejected_until(start) {
                k = self.period_at_or_after(skip_to)?.max(k.saturating_add(1));
                continue;
            }

            match self.build_period(k, start) {
                Some(period) => return Some(period),
                None => k = k.checked_add(1)?,
            }
        }
    }

    /// For periods that are a day or shorter, a rejected month, day, hour or
    /// minute rejects every period up to the returned boundary.
    fn rejected_until(&self, start: NaiveDateTime) -> Option<NaiveDateTime> {
        let next_day = || {
            start
                .date()
                .succ_opt()
                .map(|d| d.and_time(NaiveTime::MIN))
        };
        let month_rejected = !self.months.is_empty() && !self.months.contains(&start.month());
        let next_month = || {
            let (year, month) = from_month_index(month_index(start.year(), start.month()) + 1)?;
            NaiveDate::from_ymd_opt(year, month, 1).map(|d| d.and_time(NaiveTime::MIN))
        };
        match self.freq {
            Frequency::Daily => {
                if month_rejected {
                    next_month()
                } else {
                    None
                }
            }
            Frequency::Hourly | Frequency::Minutely | Frequency::Secondly => {
                if month_rejected {
                    return next_month();
                }
                if !self.day_matches(start.date()) {
                    return next_day();
                }
                let hour = start.with_minute(0).and_then(|t| t.with_second(0))?;
                if !self.hours.is_empty() && !self.hours.contains(&start.hour()) {
                    return hour.checked_add_signed(TimeDelta::hours(1));
                }
                if self.freq != Frequency::Hourly
                    && !self.minutes.is_empty()
                    && !self.minutes.contains(&start.minute())
                {
                    let minute = start.with_second(0)?;
                    return minute.checked_add_signed(TimeDelta::minutes(1));
                }
                None
            }
            Frequency::Weekly | Frequency::Monthly | Frequency::Yearly => None,
        }
    }

    fn build_period(&self, k: u64, start: NaiveDateTime) -> Option<Period> {
        if self.freq == Frequency::Monthly
            && !self.months.is_empty()
            && !self.months.contains(&start.month())
        {
            return None;
        }

        let times = self.period_times(start);
        if times.is_empty() {
            return None;
        }
        let days = self.period_days(start);
        if days.is_empty() {
            return None;
        }

        let picks = if self.setpos.is_empty() {
            None
        } else {
            let total = u32::try_from(days.len() * times.len()).unwrap_or(u32::MAX);
            let mut picks: Vec<usize> = self
                .setpos
                .iter()
                .filter_map(|&pos| resolve_signed(pos, total))
                .filter_map(|pos| usize::try_from(pos - 1).ok())
                .collect();
            picks.sort_unstable();
            picks.dedup();
            if picks.is_empty() {
                return None;
            }
            Some(picks)
        };

        Some(Period {
            k,
            days,
            times,
            picks,
            next: 0,
        })
    }

    fn period_days(&self, start: NaiveDateTime) -> Vec<NaiveDate> {
        let first = start.date();
        let len = match self.freq {
            Frequency::Yearly => days_in_year(first.year()),
            Frequency::Monthly => days_in_month(first.year(), first.month()),
            Frequency::Weekly => 7,
            _ => 1,
        };
        (0..len)
            .filter_map(|offset| first.checked_add_days(Days::new(u64::from(offset))))
            .filter(|day| self.day_matches(*day))
            .collect()
    }

    fn period_times(&self, start: NaiveDateTime) -> Vec<NaiveTime> {
        if self.date_only {
            return if self.freq.is_sub_daily() && start.time() != NaiveTime::MIN {
                Vec::new()
            } else {
                vec![NaiveTime::MIN]
            };
        }

        let (hour, minute) = (start.hour(), start.minute());
        match self.freq {
            Frequency::Hourly => cross(&[hour], &self.minutes, &self.seconds),
            Frequency::Minutely => cross(&[hour], &[minute], &self.seconds),
            Frequency::Secondly => {
                if self.seconds.is_empty() || self.seconds.contains(&start.second()) {
                    vec![start.time()]
                } else {
                    Vec::new()
                }
            }
            _ => cross(&self.hours, &self.minutes, &self.seconds),
        }
    }

    fn day_matches(&self, day: NaiveDate) -> bool {
        if !self.months.is_empty() && !self.months.contains(&day.month()) {
            return false;
        }
        if !self.weeknos.is_empty() {
            let matched = week_number(day, self.wkst).is_some_and(|(week_year, week)| {
                weeks_in_year(week_year, self.wkst).is_some_and(|total| {
                    self.weeknos
                        .iter()
                        .any(|&n| resolve_signed(n, total) == Some(week))
                })
            });
            if !matched {
                return false;
            }
        }
        if !self.yeardays.is_empty() {
            let total = days_in_year(day.year());
            if !self
                .yeardays
                .iter()
                .any(|&n| resolve_signed(n, total) == Some(day.ordinal()))
            {
                return false;
            }
        }
        if !self.monthdays.is_empty() {
            let total = days_in_month(day.year(), day.month());
            if !self
                .monthdays
                .iter()
                .any(|&n| resolve_signed(n, total) == Some(day.day()))
            {
                return false;
            }
        }
        self.weekdays.is_empty() || self.weekdays.iter().any(|wd| self.weekday_matches(*wd, day))
    }

    fn weekday_matches(&self, entry: WeekdayNum, day: NaiveDate) -> bool {
        if Weekday::from_chrono(day.weekday()) != entry.weekday {
            return false;
        }
        let Some(ordinal) = entry.ordinal else {
            return true;
        };
        let (position, len) = match self.ordinal_scope {
            OrdinalScope::Ignored => return true,
            OrdinalScope::Month => (day.day(), days_in_month(day.year(), day.month())),
            OrdinalScope::Year => (day.ordinal(), days_in_year(day.year())),
        };
        let (from_front, from_back) = weekday_ordinals(position, len);
        let ordinal = i32::from(ordinal);
        ordinal == from_front || ordinal == from_back
    }

    /// Next candidate after `after` (or equal to it when `inclusive`), never
    /// before the anchor. Consumes candidates from `cursor`.
    fn next_after(
        &self,
        cursor: &mut PeriodCursor,
        after: NaiveDateTime,
        inclusive: bool,
    ) -> Option<NaiveDateTime> {
        if cursor.finished {
            return None;
        }
        if cursor.period.is_none() {
            cursor.period = self.seek_period(0);
        }
        loop {
            let Some(period) = cursor.period.as_mut() else {
                cursor.finished = true;
                return None;
            };
            while let Some(candidate) = period.take_next() {
                if candidate >= self.start && (candidate > after || (inclusive && candidate == after))
                {
                    return Some(candidate);
                }
            }
            let next_k = period.k.checked_add(1);
            cursor.period = next_k.and_then(|k| self.seek_period(k));
        }
    }

    /// Moves `state` to the following occurrence.
    fn advance(&self, mut state: RuleIteratorState) -> RuleIteratorState {
        let Some(current) = state.current else {
            return state;
        };
        if let (Some(count), OccurrenceIndex::Known(index)) = (self.count, state.index)
            && index.saturating_add(1) >= count
        {
            state.current = None;
            return state;
        }

        state.current = self
            .next_after(&mut state.cursor, current, false)
            .filter(|next| self.within_until(*next));
        if state.current.is_some() {
            state.index = state.index.succ();
        }
        state
    }
}

fn gcd(mut a: i64, mut b: i64) -> i64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a.abs()
}

fn cross(hours: &[u32], minutes: &[u32], seconds: &[u32]) -> Vec<NaiveTime> {
    let mut times = Vec::with_capacity(hours.len() * minutes.len() * seconds.len());
    for &h in hours {
        for &m in minutes {
            for &s in seconds {
                if let Some(time) = NaiveTime::from_hms_opt(h, m, s) {
                    times.push(time);
                }
            }
        }
    }
    times
}

/// Cursor over the occurrences of a validated rule, starting at the anchor.
///
/// The anchor is always the first occurrence, whether or not it matches the
/// rule, unless it already lies past UNTIL. Every value carries the anchor's
/// DATE / DATE-TIME kind and form.
#[derive(Debug, Clone)]
pub struct RuleIterator {
    plan: Arc<RulePlan>,
    state: RuleIteratorState,
}

impl RuleIterator {
    #[must_use]
    pub fn new(rule: RecurrenceRule, anchor: DateValue) -> Self {
        Self::with_resolver(rule, anchor, &mut TimeZoneResolver::new())
    }

    /// Like [`RuleIterator::new`], reusing a resolver for UNTIL conversion.
    #[must_use]
    pub fn with_resolver(
        rule: RecurrenceRule,
        anchor: DateValue,
        resolver: &mut TimeZoneResolver,
    ) -> Self {
        let plan = RulePlan::new(rule, anchor, resolver);
        let state = plan.initial_state();
        Self {
            plan: Arc::new(plan),
            state,
        }
    }

    /// The occurrence under the cursor, `None` once past COUNT or UNTIL.
    #[must_use]
    pub fn value(&self) -> Option<DateValue> {
        self.state.current.map(|c| self.plan.anchor.with_civil(c))
    }

    #[must_use]
    pub const fn index(&self) -> OccurrenceIndex {
        self.state.index
    }

    #[must_use]
    pub const fn state(&self) -> &RuleIteratorState {
        &self.state
    }

    #[must_use]
    pub fn rule(&self) -> &RecurrenceRule {
        &self.plan.rule
    }

    #[must_use]
    pub fn anchor(&self) -> &DateValue {
        &self.plan.anchor
    }

    /// True iff the rule has neither COUNT nor UNTIL.
    #[must_use]
    pub fn is_infinite(&self) -> bool {
        self.plan.rule.is_infinite()
    }

    /// Moves to the next occurrence.
    pub fn advance(&mut self) {
        let state = std::mem::take(&mut self.state);
        self.state = self.plan.advance(state);
    }

    /// Moves `n` occurrences forward, stopping early when exhausted.
    pub fn advance_by(&mut self, n: u32) {
        for _ in 0..n {
            if self.state.current.is_none() {
                break;
            }
            self.advance();
        }
    }

    /// ## Summary
    /// Moves to the first occurrence at or after `target` (wall clock, anchor frame).
    ///
    /// Without COUNT, periods entirely before `target` are skipped in one jump
    /// and the index becomes [`OccurrenceIndex::Unknown`]. With COUNT every
    /// occurrence is stepped over so that the index stays exact.
    #[tracing::instrument(level = "trace", skip_all, fields(to = %target))]
    pub fn seek_to_or_after(&mut self, target: NaiveDateTime) {
        let Some(current) = self.state.current else {
            return;
        };
        if current >= target {
            return;
        }

        if self.plan.count.is_none() {
            let k_target = self.plan.period_of(target);
            let k_now = self.state.cursor.k();
            if !self.state.cursor.finished && k_target > k_now.saturating_add(1) {
                tracing::trace!(from = k_now, to = k_target, "Jumping to rule period");
                let mut cursor = PeriodCursor::at(self.plan.seek_period(k_target));
                let found = self
                    .plan
                    .next_after(&mut cursor, target, true)
                    .filter(|c| self.plan.within_until(*c));
                self.state = RuleIteratorState {
                    current: found,
                    index: OccurrenceIndex::Unknown,
                    cursor,
                };
                return;
            }
        }

        while self.state.current.is_some_and(|c| c < target) {
            self.advance();
        }
    }

    /// ## Summary
    /// Moves to the last occurrence strictly before `target`.
    ///
    /// Returns `false`, leaving the cursor alone, when the current occurrence is
    /// already at or after `target` or the iterator is exhausted.
    #[tracing::instrument(level = "trace", skip_all, fields(to = %target))]
    pub fn seek_to_before(&mut self, target: NaiveDateTime) -> bool {
        let Some(current) = self.state.current else {
            return false;
        };
        if current >= target {
            return false;
        }

        if self.plan.count.is_none() && !self.state.cursor.finished {
            let k_target = self.plan.period_of(target);
            let k_now = self.state.cursor.k();
            let mut back: u64 = 1;
            while k_target > k_now.saturating_add(back) {
                let k_probe = k_target - back;
                let mut cursor = PeriodCursor::at(self.plan.seek_period(k_probe));
                let landed = self
                    .plan
                    .next_after(&mut cursor, current, false)
                    .filter(|c| *c < target && self.plan.within_until(*c));
                if let Some(landed) = landed {
                    tracing::trace!(from = k_now, to = k_probe, "Jumping to rule period");
                    self.state = RuleIteratorState {
                        current: Some(landed),
                        index: OccurrenceIndex::Unknown,
                        cursor,
                    };
                    break;
                }
                back = back.saturating_mul(2);
            }
        }

        loop {
            let next = self.plan.advance(self.state.clone());
            match next.current {
                Some(c) if c < target => self.state = next,
                _ => return true,
            }
        }
    }

    /// ## Summary
    /// Moves to the final occurrence of a finite rule.
    ///
    /// ## Errors
    /// Returns `InfiniteRule` if the rule has neither COUNT nor UNTIL.
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn seek_to_end(&mut self) -> Result<(), ExpansionError> {
        if self.is_infinite() {
            return Err(ExpansionError::InfiniteRule);
        }

        if let Some(bound) = self
            .plan
            .until
            .and_then(|until| until.checked_add_signed(TimeDelta::seconds(1)))
        {
            self.seek_to_before(bound);
            return Ok(());
        }

        loop {
            let next = self.plan.advance(self.state.clone());
            if next.current.is_none() {
                return Ok(());
            }
            self.state = next;
        }
    }
}

impl Iterator for RuleIterator {
    type Item = DateValue;

    fn next(&mut self) -> Option<Self::Item> {
        let value = self.value()?;
        self.advance();
        Some(value)
    }
}

impl RecurrenceCursor for RuleIterator {
    fn current(&self) -> Option<NaiveDateTime> {
        self.state.current
    }

    fn advance(&mut self) {
        Self::advance(self);
    }

    fn seek_to_or_after(&mut self, target: NaiveDateTime) {
        Self::seek_to_or_after(self, target);
    }

    fn is_infinite(&self) -> bool {
        Self::is_infinite(self)
    }
}

#[cfg(test)]
#[path = "rule_iter_tests.rs"]
mod tests;
