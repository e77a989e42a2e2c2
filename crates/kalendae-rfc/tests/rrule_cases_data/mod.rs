use chrono::{DateTime, FixedOffset, Utc};
use kalendae_rfc::rfc::ical::core::RecurrenceRule;
use kalendae_rfc::rfc::ical::expand::{ExpansionOptions, RecurrenceSet, TimeZoneResolver};
use kalendae_rfc::rfc::ical::parse::{parse_date_list, parse_date_value};

pub struct RRuleCase {
    pub name: &'static str,
    pub rruleset: &'static str,
    pub expected: Option<&'static [&'static str]>,
    pub expected_len: Option<usize>,
    pub limit: usize,
    pub after: Option<&'static str>,
    pub before: Option<&'static str>,
}

#[expect(clippy::too_many_lines)]
pub fn rrule_cases() -> Vec<RRuleCase> {
    vec![
        RRuleCase {
            name: "daily_basic",
            rruleset: "DTSTART:20120201T093000Z\nRRULE:FREQ=DAILY;COUNT=3",
            expected: Some(&[
                "2012-02-01T09:30:00+00:00",
                "2012-02-02T09:30:00+00:00",
                "2012-02-03T09:30:00+00:00",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
        },
        RRuleCase {
            name: "weekly_basic",
            rruleset: "DTSTART:19970902T090000Z\nRRULE:FREQ=WEEKLY;COUNT=3;BYDAY=TU,TH",
            expected: Some(&[
                "1997-09-02T09:00:00+00:00",
                "1997-09-04T09:00:00+00:00",
                "1997-09-09T09:00:00+00:00",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
        },
        RRuleCase {
            name: "monthly_basic",
            rruleset: "DTSTART:20120101T090000Z\nRRULE:FREQ=MONTHLY;COUNT=3;BYMONTHDAY=1",
            expected: Some(&[
                "2012-01-01T09:00:00+00:00",
                "2012-02-01T09:00:00+00:00",
                "2012-03-01T09:00:00+00:00",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
        },
        RRuleCase {
            name: "yearly_basic",
            rruleset: "DTSTART:20120101T090000Z\nRRULE:FREQ=YEARLY;COUNT=3",
            expected: Some(&[
                "2012-01-01T09:00:00+00:00",
                "2013-01-01T09:00:00+00:00",
                "2014-01-01T09:00:00+00:00",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
        },
        RRuleCase {
            name: "hourly_basic",
            rruleset: "DTSTART:20120101T090000Z\nRRULE:FREQ=HOURLY;COUNT=3",
            expected: Some(&[
                "2012-01-01T09:00:00+00:00",
                "2012-01-01T10:00:00+00:00",
                "2012-01-01T11:00:00+00:00",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
        },
        RRuleCase {
            name: "minutely_basic",
            rruleset: "DTSTART:20120101T090000Z\nRRULE:FREQ=MINUTELY;COUNT=3",
            expected: Some(&[
                "2012-01-01T09:00:00+00:00",
                "2012-01-01T09:01:00+00:00",
                "2012-01-01T09:02:00+00:00",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
        },
        RRuleCase {
            name: "secondly_basic",
            rruleset: "DTSTART:20120101T090000Z\nRRULE:FREQ=SECONDLY;COUNT=3",
            expected: Some(&[
                "2012-01-01T09:00:00+00:00",
                "2012-01-01T09:00:01+00:00",
                "2012-01-01T09:00:02+00:00",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
        },
        RRuleCase {
            name: "rdate_exdate",
            rruleset: "DTSTART:20120201T093000Z\nRRULE:FREQ=DAILY;COUNT=3\nRDATE:20120210T093000Z\nEXDATE:20120202T093000Z",
            expected: Some(&[
                "2012-02-01T09:30:00+00:00",
                "2012-02-03T09:30:00+00:00",
                "2012-02-10T09:30:00+00:00",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
        },
        RRuleCase {
            name: "after_before",
            rruleset: "DTSTART:20120201T093000Z\nRRULE:FREQ=DAILY;COUNT=3",
            expected: Some(&[
                "2012-02-02T09:30:00+00:00",
                "2012-02-03T09:30:00+00:00",
            ]),
            expected_len: None,
            limit: 100,
            after: Some("2012-02-01T10:00:00+00:00"),
            before: Some("2012-04-01T09:00:00+00:00"),
        },
        RRuleCase {
            name: "dst_new_york",
            rruleset: "DTSTART;TZID=America/New_York:20210313T090000\nRRULE:FREQ=DAILY;COUNT=3",
            expected: Some(&[
                "2021-03-13T09:00:00-05:00",
                "2021-03-14T09:00:00-04:00",
                "2021-03-15T09:00:00-04:00",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
        },
        RRuleCase {
            name: "date_anchor",
            rruleset: "DTSTART;VALUE=DATE:20240101\nRRULE:FREQ=WEEKLY;COUNT=3",
            expected: Some(&[
                "2024-01-01T00:00:00+00:00",
                "2024-01-08T00:00:00+00:00",
                "2024-01-15T00:00:00+00:00",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
        },
        RRuleCase {
            name: "leap_day_yearly",
            rruleset: "DTSTART:20240229T100000Z\nRRULE:FREQ=YEARLY;COUNT=3",
            expected: Some(&[
                "2024-02-29T10:00:00+00:00",
                "2028-02-29T10:00:00+00:00",
                "2032-02-29T10:00:00+00:00",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
        },
        RRuleCase {
            name: "infinite_rule_bounded_by_limit",
            rruleset: "DTSTART;TZID=Europe/Berlin:18930401T010000\nRRULE:FREQ=DAILY",
            expected: None,
            expected_len: Some(10),
            limit: 10,
            after: None,
            before: None,
        },
        RRuleCase {
            name: "rfc_every_day_in_jan",
            rruleset: "DTSTART;TZID=America/New_York:19980101T090000\nRRULE:FREQ=YEARLY;UNTIL=20000131T140000Z;BYMONTH=1;BYDAY=SU,MO,TU,WE,TH,FR,SA",
            expected: None,
            expected_len: Some(93),
            limit: 200,
            after: None,
            before: None,
        },
        RRuleCase {
            name: "rfc_first_friday",
            rruleset: "DTSTART;TZID=America/New_York:19970905T090000\nRRULE:FREQ=MONTHLY;COUNT=10;BYDAY=1FR",
            expected: Some(&[
                "1997-09-05T09:00:00-04:00",
                "1997-10-03T09:00:00-04:00",
                "1997-11-07T09:00:00-05:00",
                "1997-12-05T09:00:00-05:00",
                "1998-01-02T09:00:00-05:00",
                "1998-02-06T09:00:00-05:00",
                "1998-03-06T09:00:00-05:00",
                "1998-04-03T09:00:00-05:00",
                "1998-05-01T09:00:00-04:00",
                "1998-06-05T09:00:00-04:00",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
        },
        RRuleCase {
            name: "rfc_wkst_monday",
            rruleset: "DTSTART;TZID=America/New_York:19970805T090000\nRRULE:FREQ=WEEKLY;INTERVAL=2;COUNT=4;BYDAY=TU,SU;WKST=MO",
            expected: Some(&[
                "1997-08-05T09:00:00-04:00",
                "1997-08-10T09:00:00-04:00",
                "1997-08-19T09:00:00-04:00",
                "1997-08-24T09:00:00-04:00",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
        },
        RRuleCase {
            name: "rfc_wkst_sunday",
            rruleset: "DTSTART;TZID=America/New_York:19970805T090000\nRRULE:FREQ=WEEKLY;INTERVAL=2;COUNT=4;BYDAY=TU,SU;WKST=SU",
            expected: Some(&[
                "1997-08-05T09:00:00-04:00",
                "1997-08-17T09:00:00-04:00",
                "1997-08-19T09:00:00-04:00",
                "1997-08-31T09:00:00-04:00",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
        },
        RRuleCase {
            name: "rfc_week_number_20",
            rruleset: "DTSTART;TZID=America/New_York:19970512T090000\nRRULE:FREQ=YEARLY;BYWEEKNO=20;BYDAY=MO",
            expected: Some(&[
                "1997-05-12T09:00:00-04:00",
                "1998-05-11T09:00:00-04:00",
                "1999-05-17T09:00:00-04:00",
            ]),
            expected_len: None,
            limit: 3,
            after: None,
            before: None,
        },
        RRuleCase {
            name: "rfc_twentieth_monday",
            rruleset: "DTSTART;TZID=America/New_York:19970519T090000\nRRULE:FREQ=YEARLY;BYDAY=20MO",
            expected: Some(&[
                "1997-05-19T09:00:00-04:00",
                "1998-05-18T09:00:00-04:00",
                "1999-05-17T09:00:00-04:00",
            ]),
            expected_len: None,
            limit: 3,
            after: None,
            before: None,
        },
        RRuleCase {
            name: "rfc_thursdays_in_march",
            rruleset: "DTSTART;TZID=America/New_York:19970313T090000\nRRULE:FREQ=YEARLY;BYMONTH=3;BYDAY=TH",
            expected: Some(&[
                "1997-03-13T09:00:00-05:00",
                "1997-03-20T09:00:00-05:00",
                "1997-03-27T09:00:00-05:00",
                "1998-03-05T09:00:00-05:00",
                "1998-03-12T09:00:00-05:00",
                "1998-03-19T09:00:00-05:00",
                "1998-03-26T09:00:00-05:00",
            ]),
            expected_len: None,
            limit: 7,
            after: None,
            before: None,
        },
        RRuleCase {
            name: "rfc_friday_the_13th",
            rruleset: "DTSTART;TZID=America/New_York:19970902T090000\nEXDATE;TZID=America/New_York:19970902T090000\nRRULE:FREQ=MONTHLY;BYDAY=FR;BYMONTHDAY=13",
            expected: Some(&[
                "1998-02-13T09:00:00-05:00",
                "1998-03-13T09:00:00-05:00",
                "1998-11-13T09:00:00-05:00",
                "1999-08-13T09:00:00-04:00",
                "2000-10-13T09:00:00-04:00",
            ]),
            expected_len: None,
            limit: 5,
            after: None,
            before: None,
        },
        RRuleCase {
            name: "rfc_saturday_after_first_sunday",
            rruleset: "DTSTART;TZID=America/New_York:19970913T090000\nRRULE:FREQ=MONTHLY;BYDAY=SA;BYMONTHDAY=7,8,9,10,11,12,13",
            expected: Some(&[
                "1997-09-13T09:00:00-04:00",
                "1997-10-11T09:00:00-04:00",
                "1997-11-08T09:00:00-05:00",
                "1997-12-13T09:00:00-05:00",
                "1998-01-10T09:00:00-05:00",
                "1998-02-07T09:00:00-05:00",
                "1998-03-07T09:00:00-05:00",
                "1998-04-11T09:00:00-04:00",
            ]),
            expected_len: None,
            limit: 8,
            after: None,
            before: None,
        },
        RRuleCase {
            name: "rfc_second_to_last_weekday",
            rruleset: "DTSTART;TZID=America/New_York:19970929T090000\nRRULE:FREQ=MONTHLY;BYDAY=MO,TU,WE,TH,FR;BYSETPOS=-2",
            expected: Some(&[
                "1997-09-29T09:00:00-04:00",
                "1997-10-30T09:00:00-05:00",
                "1997-11-27T09:00:00-05:00",
                "1997-12-30T09:00:00-05:00",
                "1998-01-29T09:00:00-05:00",
                "1998-02-26T09:00:00-05:00",
                "1998-03-30T09:00:00-05:00",
            ]),
            expected_len: None,
            limit: 7,
            after: None,
            before: None,
        },
        RRuleCase {
            name: "rfc_every_15_minutes",
            rruleset: "DTSTART;TZID=America/New_York:19970902T090000\nRRULE:FREQ=MINUTELY;INTERVAL=15;COUNT=6",
            expected: Some(&[
                "1997-09-02T09:00:00-04:00",
                "1997-09-02T09:15:00-04:00",
                "1997-09-02T09:30:00-04:00",
                "1997-09-02T09:45:00-04:00",
                "1997-09-02T10:00:00-04:00",
                "1997-09-02T10:15:00-04:00",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
        },
        RRuleCase {
            name: "rfc_every_20_minutes_daily",
            rruleset: "DTSTART;TZID=America/New_York:19970902T090000\nRRULE:FREQ=DAILY;BYHOUR=9,10,11,12,13,14,15,16;BYMINUTE=0,20,40",
            expected: None,
            expected_len: Some(48),
            limit: 48,
            after: None,
            before: Some("1997-09-04T00:00:00-04:00"),
        },
        RRuleCase {
            name: "rfc_every_20_minutes_minutely",
            rruleset: "DTSTART;TZID=America/New_York:19970902T090000\nRRULE:FREQ=MINUTELY;INTERVAL=20;BYHOUR=9,10,11,12,13,14,15,16",
            expected: None,
            expected_len: Some(48),
            limit: 100,
            after: None,
            before: Some("1997-09-04T00:00:00-04:00"),
        },
        RRuleCase {
            name: "rfc_invalid_dates_ignored",
            rruleset: "DTSTART;TZID=America/New_York:20070115T090000\nRRULE:FREQ=MONTHLY;BYMONTHDAY=15,30;COUNT=5",
            expected: Some(&[
                "2007-01-15T09:00:00-05:00",
                "2007-01-30T09:00:00-05:00",
                "2007-02-15T09:00:00-05:00",
                "2007-03-15T09:00:00-04:00",
                "2007-03-30T09:00:00-04:00",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
        },
        RRuleCase {
            name: "rfc_year_days_every_third_year",
            rruleset: "DTSTART;TZID=America/New_York:19970101T090000\nRRULE:FREQ=YEARLY;INTERVAL=3;COUNT=10;BYYEARDAY=1,100,200",
            expected: Some(&[
                "1997-01-01T09:00:00-05:00",
                "1997-04-10T09:00:00-04:00",
                "1997-07-19T09:00:00-04:00",
                "2000-01-01T09:00:00-05:00",
                "2000-04-09T09:00:00-04:00",
                "2000-07-18T09:00:00-04:00",
                "2003-01-01T09:00:00-05:00",
                "2003-04-10T09:00:00-04:00",
                "2003-07-19T09:00:00-04:00",
                "2006-01-01T09:00:00-05:00",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
        },
        RRuleCase {
            name: "rfc_first_and_last_day_of_month",
            rruleset: "DTSTART;TZID=America/New_York:19970930T090000\nRRULE:FREQ=MONTHLY;COUNT=10;BYMONTHDAY=1,-1",
            expected: Some(&[
                "1997-09-30T09:00:00-04:00",
                "1997-10-01T09:00:00-04:00",
                "1997-10-31T09:00:00-05:00",
                "1997-11-01T09:00:00-05:00",
                "1997-11-30T09:00:00-05:00",
                "1997-12-01T09:00:00-05:00",
                "1997-12-31T09:00:00-05:00",
                "1998-01-01T09:00:00-05:00",
                "1998-01-31T09:00:00-05:00",
                "1998-02-01T09:00:00-05:00",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
        },
    ]
}

/// Builds a series from `NAME[;PARAM=VALUE]:VALUE` lines.
fn parse_set(name: &str, text: &str) -> RecurrenceSet {
    let mut anchor = None;
    let mut rule = None;
    let mut rdates = Vec::new();
    let mut exdates = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let (head, value) = line
            .split_once(':')
            .unwrap_or_else(|| panic!("Case {name}: line without value: {line}"));
        let mut params = head.split(';');
        let property = params.next().unwrap_or_default();
        let tzid = params.find_map(|param| param.strip_prefix("TZID="));
        let (line_no, col) = (index + 1, head.len() + 2);

        match property {
            "DTSTART" => {
                anchor = Some(
                    parse_date_value(value, tzid, line_no, col)
                        .unwrap_or_else(|err| panic!("Case {name}: {err}")),
                );
            }
            "RRULE" => {
                rule = Some(
                    RecurrenceRule::parse(value)
                        .unwrap_or_else(|err| panic!("Case {name}: {err}")),
                );
            }
            "RDATE" => rdates.extend(
                parse_date_list(value, tzid, line_no, col)
                    .unwrap_or_else(|err| panic!("Case {name}: {err}")),
            ),
            "EXDATE" => exdates.extend(
                parse_date_list(value, tzid, line_no, col)
                    .unwrap_or_else(|err| panic!("Case {name}: {err}")),
            ),
            other => panic!("Case {name}: unexpected property {other}"),
        }
    }

    let anchor = anchor.unwrap_or_else(|| panic!("Case {name}: missing DTSTART"));
    let set = RecurrenceSet::new(anchor)
        .with_rdates(rdates)
        .with_exdates(exdates);
    match rule {
        Some(rule) => set.with_rule(rule),
        None => set,
    }
}

pub fn assert_case(case: &RRuleCase) {
    let set = parse_set(case.name, case.rruleset);

    let mut options = ExpansionOptions::default().with_max_instances(case.limit);
    options.range_start = case.after.map(|value| parse_rfc3339(value).with_timezone(&Utc));
    options.range_end = case.before.map(|value| parse_rfc3339(value).with_timezone(&Utc));

    let occurrences = set
        .expander()
        .collect_bounded(&options)
        .unwrap_or_else(|err| panic!("Case {} failed to expand: {err}", case.name));

    let mut resolver = TimeZoneResolver::new();
    let actual_timestamps: Vec<i64> = occurrences
        .iter()
        .map(|occurrence| {
            occurrence
                .start_utc(None, &mut resolver)
                .unwrap_or_else(|err| panic!("Case {}: {err}", case.name))
                .timestamp()
        })
        .collect();

    if let Some(expected) = case.expected {
        let expected_timestamps: Vec<i64> = expected
            .iter()
            .map(|value| parse_rfc3339(value).timestamp())
            .collect();
        assert_eq!(
            actual_timestamps, expected_timestamps,
            "Case {} did not match",
            case.name
        );
    }

    if let Some(expected_len) = case.expected_len {
        assert_eq!(
            occurrences.len(),
            expected_len,
            "Case {} expected {} occurrences",
            case.name,
            expected_len
        );
    }
}

fn parse_rfc3339(value: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(value)
        .unwrap_or_else(|err| panic!("Failed to parse rfc3339 value {value}: {err}"))
}
