use chrono::{Datelike, TimeDelta};

use super::fixtures::{civil, dates, dtstart, ids, rule, rule_iter, series};
use crate::rfc::ical::core::DateValue;
use crate::rfc::ical::expand::{
    ExpansionError, Occurrence, OccurrenceKind, Override, RecurrenceSet, RuleIterator,
    TimeZoneResolver,
};

#[test]
fn count_bounds_number_of_occurrences() {
    let cases = [
        ("FREQ=DAILY;COUNT=5", "20240101T090000", 5),
        ("FREQ=WEEKLY;BYDAY=MO,WE;COUNT=7", "20240101T090000", 7),
        ("FREQ=MONTHLY;BYDAY=-1FR;COUNT=4", "20240126T090000", 4),
        ("FREQ=YEARLY;BYMONTH=2;BYMONTHDAY=29;COUNT=3", "20240229", 3),
        ("FREQ=HOURLY;INTERVAL=7;COUNT=30", "20240101T000000", 30),
        ("FREQ=MINUTELY;BYHOUR=9;COUNT=90", "20240101T090000", 90),
        // the anchor counts even when it does not match the rule
        ("FREQ=WEEKLY;BYDAY=FR;COUNT=3", "20240101T090000", 3),
    ];
    for (text, start, n) in cases {
        assert_eq!(rule_iter(text, start).count(), n, "{text}");
    }
}

#[test]
fn daily_count_five() {
    let values: Vec<_> = rule_iter("FREQ=DAILY;COUNT=5", "20240101T090000")
        .map(|v| v.civil())
        .collect();
    let expected: Vec<_> = (1..=5).map(|d| civil(2024, 1, d, 9, 0)).collect();
    assert_eq!(values, expected);
}

#[test]
fn monthly_31st_skips_february() {
    let mut iter = rule_iter("FREQ=MONTHLY;BYMONTHDAY=31", "20240131T090000");
    iter.advance();
    assert_eq!(iter.value(), Some(DateValue::floating(civil(2024, 3, 31, 9, 0))));
}

#[test_log::test]
fn weekly_until_with_leading_exdates() {
    let set = series(
        "FREQ=WEEKLY;BYDAY=SA;UNTIL=20240601T130000Z",
        "20240504T080000",
    )
    .with_exdates(dates("20240504T080000,20240511T080000,20240518T080000", None));

    let occurrences: Vec<Occurrence> = set.expander().collect();
    assert_eq!(
        occurrences.first().map(|o| o.start.civil()),
        Some(civil(2024, 5, 25, 8, 0))
    );
    assert_eq!(ids(&occurrences), vec!["20240525T080000", "20240601T080000"]);
}

#[test_log::test]
fn only_occurrence_excluded_is_an_error() {
    let set = series("FREQ=DAILY;COUNT=1", "20240101T090000")
        .with_exdates(dates("20240101T090000", None));
    let mut expander = set.expander();
    assert_eq!(expander.start(), Err(ExpansionError::NoInstances));
    assert_eq!(expander.next(), None);
}

#[test]
fn excluded_anchor_with_rdates_is_not_an_error() {
    let set = RecurrenceSet::new(dtstart("20240101T090000", None))
        .with_rdates(dates("20240102T090000", None))
        .with_exdates(dates("20240101T090000", None));
    let occurrences: Vec<Occurrence> = set.expander().collect();
    assert_eq!(ids(&occurrences), vec!["20240102T090000"]);
}

#[test]
fn rdate_and_detached_override() {
    let detached = Override::new(
        dtstart("20240103T090000", None),
        dtstart("20240103T100000", None),
    );
    let set = RecurrenceSet::new(dtstart("20240101T090000", None))
        .with_rdates(dates("20240105T090000", None))
        .with_override(detached);

    let occurrences: Vec<Occurrence> = set.expander().collect();
    assert_eq!(
        ids(&occurrences),
        vec!["20240101T090000", "20240105T090000", "20240103T090000"]
    );
    let kinds: Vec<OccurrenceKind> = occurrences.iter().map(|o| o.kind).collect();
    assert_eq!(
        kinds,
        vec![
            OccurrenceKind::Generated,
            OccurrenceKind::Generated,
            OccurrenceKind::Overridden,
        ]
    );
    assert_eq!(occurrences[2].start.civil(), civil(2024, 1, 3, 10, 0));
}

#[test_log::test]
fn seeking_equals_stepping() {
    let rules = [
        "FREQ=YEARLY;BYWEEKNO=20;BYDAY=MO",
        "FREQ=YEARLY;BYYEARDAY=1,100,-1",
        "FREQ=MONTHLY;BYDAY=2SU,-1SU",
        "FREQ=WEEKLY;INTERVAL=3;BYDAY=TU,FR;WKST=SU",
        "FREQ=DAILY;BYMONTH=1,7;BYHOUR=9,18",
        "FREQ=MONTHLY;BYMONTHDAY=-1;BYSETPOS=1",
        "FREQ=HOURLY;INTERVAL=25",
        "FREQ=MINUTELY;INTERVAL=1439;BYHOUR=10,11",
    ];
    let anchor = civil(2023, 1, 1, 10, 0);
    let targets: Vec<_> = (0..30)
        .map(|i| anchor + TimeDelta::days(37 * i) + TimeDelta::hours(i))
        .collect();

    for text in rules {
        let iter = RuleIterator::new(rule(text), DateValue::floating(anchor));
        for target in &targets {
            let mut seeked = iter.clone();
            seeked.seek_to_or_after(*target);

            let mut stepped = iter.clone();
            while stepped.value().is_some_and(|v| v.civil() < *target) {
                stepped.advance();
            }
            assert_eq!(seeked.value(), stepped.value(), "{text} at {target}");
        }
    }
}

#[test]
fn generated_identifiers_match_exclusions() {
    let cases = [
        ("FREQ=WEEKLY;BYDAY=TU,TH;COUNT=6", "20240102T093000", Some("America/New_York")),
        ("FREQ=MONTHLY;COUNT=4", "20240115", None),
        ("FREQ=DAILY;COUNT=4", "20240115T120000Z", None),
    ];
    for (text, start, tzid) in cases {
        let set = RecurrenceSet::new(dtstart(start, tzid)).with_rule(rule(text));
        let all: Vec<Occurrence> = set.expander().collect();
        for occurrence in &all {
            let without: Vec<Occurrence> = set
                .clone()
                .with_exdates([occurrence.start.clone()])
                .expander()
                .collect();
            assert_eq!(without.len(), all.len() - 1, "{text}");
            assert!(
                without
                    .iter()
                    .all(|o| o.recurrence_id != occurrence.recurrence_id),
                "{text} excluding {}",
                occurrence.recurrence_id
            );
        }
    }
}

#[test]
fn unfiltered_rules_step_by_interval() {
    let days = |text: &str, start: &str, expected: i64| {
        let values: Vec<_> = rule_iter(text, start).take(12).map(|v| v.civil()).collect();
        for pair in values.windows(2) {
            assert_eq!((pair[1] - pair[0]).num_days(), expected, "{text}");
        }
    };
    days("FREQ=DAILY;INTERVAL=3", "20240101T090000", 3);
    days("FREQ=WEEKLY;INTERVAL=2", "20240101T090000", 14);

    let months: Vec<_> = rule_iter("FREQ=MONTHLY;INTERVAL=2", "20240115T090000")
        .take(12)
        .map(|v| v.civil())
        .collect();
    for pair in months.windows(2) {
        let a = pair[0].year() * 12 + i32::try_from(pair[0].month()).expect("month");
        let b = pair[1].year() * 12 + i32::try_from(pair[1].month()).expect("month");
        assert_eq!(b - a, 2);
        assert_eq!(pair[1].day(), 15);
    }

    let years: Vec<_> = rule_iter("FREQ=YEARLY;INTERVAL=4", "20240101T090000")
        .take(5)
        .map(|v| v.civil().year())
        .collect();
    assert_eq!(years, vec![2024, 2028, 2032, 2036, 2040]);
}

#[test]
fn value_is_stable_without_advance() {
    let mut iter = rule_iter("FREQ=MONTHLY;BYDAY=1MO", "20240101T090000");
    iter.advance_by(3);
    let first = iter.value();
    assert_eq!(iter.value(), first);
    assert!(first.is_some());
}

#[test]
fn zoned_series_keeps_wall_clock_across_dst() {
    let set = RecurrenceSet::new(dtstart("20240330T090000", Some("Europe/Berlin")))
        .with_rule(rule("FREQ=DAILY;COUNT=2"));
    let mut resolver = TimeZoneResolver::new();
    let instants: Vec<_> = set
        .expander()
        .map(|o| o.start_utc(None, &mut resolver).expect("known zone").naive_utc())
        .collect();
    assert_eq!(instants, vec![civil(2024, 3, 30, 8, 0), civil(2024, 3, 31, 7, 0)]);
}

#[test]
fn wall_clock_in_dst_gap_moves_forward() {
    let set = RecurrenceSet::new(dtstart("20240330T023000", Some("Europe/Berlin")))
        .with_rule(rule("FREQ=DAILY;COUNT=2"));
    let gap = set.expander().nth(1).expect("second occurrence");
    assert_eq!(gap.start.civil(), civil(2024, 3, 31, 2, 30));

    let mut resolver = TimeZoneResolver::new();
    let utc = gap.start_utc(None, &mut resolver).expect("known zone");
    assert_eq!(utc.naive_utc(), civil(2024, 3, 31, 1, 30));
}
