//! Occurrence expander: the final timeline of one recurring series.
//!
//! Generated values (RRULE merged with RDATE) are filtered through EXDATE,
//! swapped for overrides where a RECURRENCE-ID matches, and followed by the
//! detached overrides once generation ends.

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::{NaiveDateTime, TimeDelta, Utc};
use serde::Serialize;

use super::RecurrenceCursor;
use super::date_iter::DateListIterator;
use super::options::{ExpansionError, ExpansionOptions};
use super::rule_iter::RuleIterator;
use super::timezone::{ConversionError, TimeZoneResolver, coerce_to_frame, instant_of};
use crate::rfc::ical::core::{DateValue, RecurrenceId, RecurrenceRule};

/// A caller-supplied instance replacing the one generated for `recurrence_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Override {
    /// Unmodified start of the instance being replaced.
    pub recurrence_id: DateValue,
    pub start: DateValue,
    pub end: Option<DateValue>,
}

impl Override {
    #[must_use]
    pub const fn new(recurrence_id: DateValue, start: DateValue) -> Self {
        Self {
            recurrence_id,
            start,
            end: None,
        }
    }

    #[must_use]
    pub fn with_end(mut self, end: DateValue) -> Self {
        self.end = Some(end);
        self
    }
}

/// Where an occurrence came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OccurrenceKind {
    /// Produced by the rule or the date list.
    Generated,
    /// Taken from an override.
    Overridden,
}

/// One concrete instance of a series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Occurrence {
    pub recurrence_id: RecurrenceId,
    pub start: DateValue,
    pub end: Option<DateValue>,
    pub kind: OccurrenceKind,
}

impl Occurrence {
    #[must_use]
    pub fn is_overridden(&self) -> bool {
        self.kind == OccurrenceKind::Overridden
    }

    /// ## Summary
    /// Places the start of this occurrence on the UTC line.
    ///
    /// Floating starts are read in `floating_zone`, or as UTC when it is `None`.
    ///
    /// ## Errors
    /// Returns an error if a timezone cannot be resolved.
    pub fn start_utc(
        &self,
        floating_zone: Option<&str>,
        resolver: &mut TimeZoneResolver,
    ) -> Result<chrono::DateTime<Utc>, ConversionError> {
        instant_of(&self.start, floating_zone, resolver)
    }
}

/// Description of one recurring series: the master's anchor, RRULE, RDATE,
/// EXDATE and duration, plus the override instances.
#[derive(Debug, Clone)]
pub struct RecurrenceSet {
    anchor: DateValue,
    rule: Option<RecurrenceRule>,
    rdates: Vec<DateValue>,
    exdates: Vec<DateValue>,
    overrides: Vec<Override>,
    duration: Option<TimeDelta>,
}

impl RecurrenceSet {
    #[must_use]
    pub const fn new(anchor: DateValue) -> Self {
        Self {
            anchor,
            rule: None,
            rdates: Vec::new(),
            exdates: Vec::new(),
            overrides: Vec::new(),
            duration: None,
        }
    }

    #[must_use]
    pub fn with_rule(mut self, rule: RecurrenceRule) -> Self {
        self.rule = Some(rule);
        self
    }

    #[must_use]
    pub fn with_rdates(mut self, dates: impl IntoIterator<Item = DateValue>) -> Self {
        self.rdates.extend(dates);
        self
    }

    #[must_use]
    pub fn with_exdates(mut self, dates: impl IntoIterator<Item = DateValue>) -> Self {
        self.exdates.extend(dates);
        self
    }

    #[must_use]
    pub fn with_override(mut self, instance: Override) -> Self {
        self.overrides.push(instance);
        self
    }

    #[must_use]
    pub fn with_overrides(mut self, instances: impl IntoIterator<Item = Override>) -> Self {
        self.overrides.extend(instances);
        self
    }

    /// Sets the length of generated occurrences (DTEND - DTSTART, or DURATION).
    #[must_use]
    pub fn with_duration(mut self, duration: TimeDelta) -> Self {
        self.duration = Some(duration);
        self
    }

    #[must_use]
    pub const fn anchor(&self) -> &DateValue {
        &self.anchor
    }

    #[must_use]
    pub const fn rule(&self) -> Option<&RecurrenceRule> {
        self.rule.as_ref()
    }

    #[must_use]
    pub fn expander(&self) -> OccurrenceExpander {
        OccurrenceExpander::new(self)
    }
}

/// Lifecycle of an [`OccurrenceExpander`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpanderState {
    NotStarted,
    /// An occurrence is lined up for the next call.
    Positioned,
    /// Terminal; nothing further is yielded.
    Exhausted,
}

/// Override whose RECURRENCE-ID is produced by the generated sequence.
#[derive(Debug, Clone)]
struct AttachedOverride {
    id_civil: NaiveDateTime,
    start: NaiveDateTime,
    instance: Override,
}

/// Occurrence lined up for the next call, with its start in the anchor frame.
#[derive(Debug, Clone)]
struct Pending {
    occurrence: Occurrence,
    start: NaiveDateTime,
    /// Civil value of the generated identifier; `None` for detached overrides.
    generated: Option<NaiveDateTime>,
}

/// Forward-only cursor over the occurrences of a [`RecurrenceSet`].
#[derive(Debug, Clone)]
pub struct OccurrenceExpander {
    anchor: DateValue,
    rule: Option<RuleIterator>,
    dates: Option<DateListIterator>,
    exdates: HashSet<RecurrenceId>,
    attached: HashMap<RecurrenceId, AttachedOverride>,
    detached: VecDeque<(RecurrenceId, NaiveDateTime, Override)>,
    duration: Option<TimeDelta>,
    resolver: TimeZoneResolver,
    last_generated: Option<NaiveDateTime>,
    generating: bool,
    pending: Option<Pending>,
    state: ExpanderState,
}

/// Whether either cursor produces exactly `civil`.
fn generates(
    rule: Option<&RuleIterator>,
    dates: Option<&DateListIterator>,
    civil: NaiveDateTime,
) -> bool {
    fn probe(cursor: &mut dyn RecurrenceCursor, civil: NaiveDateTime) -> bool {
        cursor.seek_to_or_after(civil);
        cursor.current() == Some(civil)
    }
    rule.cloned().is_some_and(|mut r| probe(&mut r, civil))
        || dates.cloned().is_some_and(|mut d| probe(&mut d, civil))
}

impl OccurrenceExpander {
    /// Builds the expander; identifiers of EXDATE and override values are
    /// coerced into the anchor's frame here.
    #[must_use]
    pub fn new(set: &RecurrenceSet) -> Self {
        let mut resolver = TimeZoneResolver::new();
        let anchor = set.anchor.clone();

        let rule = set
            .rule
            .clone()
            .map(|rule| RuleIterator::with_resolver(rule, anchor.clone(), &mut resolver));
        let dates = (rule.is_none() || !set.rdates.is_empty())
            .then(|| DateListIterator::with_resolver(&anchor, &set.rdates, &mut resolver));

        let exdates: HashSet<RecurrenceId> = set
            .exdates
            .iter()
            .map(|date| coerce_to_frame(date, &anchor, &mut resolver).recurrence_id())
            .collect();

        // later overrides for the same instance win
        let mut by_id: HashMap<RecurrenceId, AttachedOverride> = HashMap::new();
        for instance in &set.overrides {
            let id_value = coerce_to_frame(&instance.recurrence_id, &anchor, &mut resolver);
            let id = id_value.recurrence_id();
            let start = coerce_to_frame(&instance.start, &anchor, &mut resolver).civil();
            by_id.insert(
                id,
                AttachedOverride {
                    id_civil: id_value.civil(),
                    start,
                    instance: instance.clone(),
                },
            );
        }

        let mut attached = HashMap::new();
        let mut detached = Vec::new();
        for (id, entry) in by_id {
            if !generates(rule.as_ref(), dates.as_ref(), entry.id_civil) {
                detached.push((id, entry.start, entry.instance));
            } else if exdates.contains(&id) {
                // EXDATE only removes generated instances
                tracing::debug!(recurrence_id = %id, "Override is excluded by EXDATE");
            } else {
                attached.insert(id, entry);
            }
        }
        detached.sort_by(|a, b| (a.1, &a.0).cmp(&(b.1, &b.0)));

        Self {
            anchor,
            rule,
            dates,
            exdates,
            attached,
            detached: detached.into(),
            duration: set.duration,
            resolver,
            last_generated: None,
            generating: true,
            pending: None,
            state: ExpanderState::NotStarted,
        }
    }

    #[must_use]
    pub const fn state(&self) -> ExpanderState {
        self.state
    }

    #[must_use]
    pub const fn anchor(&self) -> &DateValue {
        &self.anchor
    }

    /// ## Summary
    /// Positions the expander on the first occurrence.
    ///
    /// Does nothing unless the expander is `NotStarted`.
    ///
    /// ## Errors
    /// Returns `NoInstances` if the series has no occurrence at all; the
    /// expander is then `Exhausted`.
    pub fn start(&mut self) -> Result<(), ExpansionError> {
        if self.state != ExpanderState::NotStarted {
            return Ok(());
        }

        self.pending = self.pull();
        if self.pending.is_none() {
            self.state = ExpanderState::Exhausted;
            tracing::debug!(anchor = %self.anchor, "Recurrence set has no instances");
            return Err(ExpansionError::NoInstances);
        }

        self.state = ExpanderState::Positioned;
        tracing::debug!(anchor = %self.anchor, "Occurrence expander positioned");
        Ok(())
    }

    /// ## Summary
    /// Returns the next occurrence, starting the expander if needed.
    ///
    /// ## Errors
    /// Returns `NoInstances` when starting finds no occurrence.
    pub fn next_occurrence(&mut self) -> Result<Option<Occurrence>, ExpansionError> {
        match self.state {
            ExpanderState::NotStarted => self.start()?,
            ExpanderState::Exhausted => return Ok(None),
            ExpanderState::Positioned => {}
        }

        let Some(current) = self.pending.take() else {
            self.exhaust();
            return Ok(None);
        };
        self.pending = self.pull();
        if self.pending.is_none() {
            self.exhaust();
        }
        Ok(Some(current.occurrence))
    }

    /// ## Summary
    /// Skips every occurrence whose start is before `target`.
    ///
    /// The landing position is the one reached by calling
    /// [`OccurrenceExpander::next_occurrence`] until an occurrence starts at or
    /// after `target`; sources seek ahead without producing the skipped values.
    ///
    /// ## Errors
    /// Returns `NotPositioned` if the expander has not been started.
    #[tracing::instrument(skip_all, fields(to = %target))]
    pub fn fast_forward(&mut self, target: &DateValue) -> Result<(), ExpansionError> {
        match self.state {
            ExpanderState::NotStarted => return Err(ExpansionError::NotPositioned),
            ExpanderState::Exhausted => return Ok(()),
            ExpanderState::Positioned => {}
        }

        let target = coerce_to_frame(target, &self.anchor, &mut self.resolver).civil();
        let Some((pending_start, pending_id)) = self.pending.as_ref().map(|p| (p.start, p.generated))
        else {
            self.exhaust();
            return Ok(());
        };
        if pending_start >= target {
            return Ok(());
        }

        if let Some(pending_id) = pending_id {
            // an override moved from before the target to after it is where a
            // linear walk would stop
            let seek_to = self
                .attached
                .values()
                .filter(|a| a.id_civil < target && a.start >= target)
                .map(|a| a.id_civil)
                .fold(target, NaiveDateTime::min);
            if seek_to > pending_id {
                tracing::trace!(%seek_to, "Seeking occurrence sources");
                for cursor in self.cursors().into_iter().flatten() {
                    cursor.seek_to_or_after(seek_to);
                }
                self.attached.retain(|_, a| a.id_civil >= seek_to);
                self.pending = self.pull();
            }
        }

        while self.pending.as_ref().is_some_and(|p| p.start < target) {
            self.pending = self.pull();
        }
        if self.pending.is_none() {
            self.exhaust();
        }
        Ok(())
    }

    /// ## Summary
    /// Collects occurrences starting within the options' UTC range, up to
    /// `max_instances` of them.
    ///
    /// Floating starts are placed with `floating_zone`. Generation stops once
    /// identifiers pass the end of the range; detached overrides are still
    /// considered.
    ///
    /// ## Errors
    /// Returns `NoInstances` if the series has no occurrence at all.
    #[tracing::instrument(skip_all, fields(max_instances = options.max_instances))]
    pub fn collect_bounded(
        &mut self,
        options: &ExpansionOptions,
    ) -> Result<Vec<Occurrence>, ExpansionError> {
        self.start()?;

        // wall clocks in any zone lie within a day of UTC
        let margin = TimeDelta::days(1);
        let floating_zone = options.floating_zone.as_deref();

        if let Some(range_start) = options.range_start {
            let early = range_start.checked_sub_signed(margin).unwrap_or(range_start);
            self.fast_forward(&DateValue::utc(early.naive_utc()))?;
        }
        let generation_limit = options
            .range_end
            .and_then(|end| end.checked_add_signed(margin))
            .map(|end| {
                coerce_to_frame(&DateValue::utc(end.naive_utc()), &self.anchor, &mut self.resolver)
                    .civil()
            });

        let mut occurrences = Vec::new();
        while occurrences.len() < options.max_instances {
            if let (Some(limit), Some(id)) = (
                generation_limit,
                self.pending.as_ref().and_then(|p| p.generated),
            ) && id >= limit
            {
                self.stop_generating();
            }

            let Some(occurrence) = self.next_occurrence()? else {
                break;
            };
            let start = match occurrence.start_utc(floating_zone, &mut self.resolver) {
                Ok(start) => start,
                Err(e) => {
                    tracing::warn!(
                        start = %occurrence.start,
                        error = %e,
                        "Could not place occurrence on the UTC line, using its wall clock"
                    );
                    occurrence.start.civil().and_utc()
                }
            };

            let after_start = options.range_start.is_none_or(|s| start >= s);
            let before_end = options.range_end.is_none_or(|e| start < e);
            if after_start && before_end {
                occurrences.push(occurrence);
            }
        }

        tracing::debug!(count = occurrences.len(), "Collected occurrences");
        Ok(occurrences)
    }

    fn exhaust(&mut self) {
        if self.state != ExpanderState::Exhausted {
            self.state = ExpanderState::Exhausted;
            tracing::debug!(anchor = %self.anchor, "Occurrence expander exhausted");
        }
    }

    /// Ends the generated sequence early, moving on to detached overrides.
    fn stop_generating(&mut self) {
        self.generating = false;
        if self.pending.as_ref().is_some_and(|p| p.generated.is_some()) {
            self.pending = self.pull();
        }
    }

    fn cursors(&mut self) -> [Option<&mut dyn RecurrenceCursor>; 2] {
        [
            self.rule.as_mut().map(|r| r as &mut dyn RecurrenceCursor),
            self.dates.as_mut().map(|d| d as &mut dyn RecurrenceCursor),
        ]
    }

    /// Next value of the merged sources, strictly ascending.
    fn next_generated(&mut self) -> Option<NaiveDateTime> {
        loop {
            let next = self
                .cursors()
                .into_iter()
                .flatten()
                .filter_map(|c| c.current())
                .min()?;
            for cursor in self.cursors().into_iter().flatten() {
                if cursor.current() == Some(next) {
                    cursor.advance();
                }
            }
            if self.last_generated.is_some_and(|last| next <= last) {
                continue;
            }
            self.last_generated = Some(next);
            return Some(next);
        }
    }

    fn pull(&mut self) -> Option<Pending> {
        while self.generating {
            let Some(civil) = self.next_generated() else {
                self.generating = false;
                if !self.detached.is_empty() {
                    tracing::debug!(
                        count = self.detached.len(),
                        "Generated sequence exhausted, emitting detached overrides"
                    );
                }
                break;
            };

            let id = self.anchor.with_civil(civil).recurrence_id();
            if self.exdates.contains(&id) {
                continue;
            }
            if let Some(attached) = self.attached.remove(&id) {
                return Some(Pending {
                    occurrence: Occurrence {
                        recurrence_id: id,
                        start: attached.instance.start,
                        end: attached.instance.end,
                        kind: OccurrenceKind::Overridden,
                    },
                    start: attached.start,
                    generated: Some(civil),
                });
            }

            let end = self
                .duration
                .and_then(|d| civil.checked_add_signed(d))
                .map(|end| self.anchor.with_civil(end));
            return Some(Pending {
                occurrence: Occurrence {
                    recurrence_id: id,
                    start: self.anchor.with_civil(civil),
                    end,
                    kind: OccurrenceKind::Generated,
                },
                start: civil,
                generated: Some(civil),
            });
        }

        let (recurrence_id, start, instance) = self.detached.pop_front()?;
        Some(Pending {
            occurrence: Occurrence {
                recurrence_id,
                start: instance.start,
                end: instance.end,
                kind: OccurrenceKind::Overridden,
            },
            start,
            generated: None,
        })
    }
}

impl Iterator for OccurrenceExpander {
    type Item = Occurrence;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_occurrence().ok().flatten()
    }
}

#[cfg(test)]
#[path = "expander_tests.rs"]
mod tests;
