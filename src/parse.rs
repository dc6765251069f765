/*!
The textual form of recurrence rules.

Rules are written and read in the RFC 5545 property-value syntax:

```text
FREQ=WEEKLY;DTSTART=20120201T093000Z;INTERVAL=5;BYDAY=MO,+2FR
```

`Display` emits the canonical form: parts in a fixed order, defaults
omitted, datetimes in the basic ISO 8601 format in UTC. `FromStr` accepts
the same syntax case-insensitively and funnels everything through the
ordinary builder, so a parsed rule is validated exactly like a programmatic
one.
*/

use std::fmt;

use anyhow::Context;
use jiff::{
    Timestamp, Zoned,
    civil::{Date, Time, Weekday},
    tz::TimeZone,
};

use crate::rule::{
    ByWeekday, Frequency, RecurrenceRule, truncate_to_seconds,
};

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            Frequency::Yearly => "YEARLY",
            Frequency::Monthly => "MONTHLY",
            Frequency::Weekly => "WEEKLY",
            Frequency::Daily => "DAILY",
            Frequency::Hourly => "HOURLY",
            Frequency::Minutely => "MINUTELY",
            Frequency::Secondly => "SECONDLY",
        };
        f.write_str(name)
    }
}

impl fmt::Display for ByWeekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ByWeekday::Any(weekday) => f.write_str(weekday_code(weekday)),
            ByWeekday::Numbered { nth: 0, weekday } => {
                f.write_str(weekday_code(weekday))
            }
            ByWeekday::Numbered { nth, weekday } => {
                write!(f, "{nth:+}{}", weekday_code(weekday))
            }
        }
    }
}

impl fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value_string(true))
    }
}

impl RecurrenceRule {
    /// Renders this rule as an RFC 5545 property value, optionally with a
    /// DTSTART part. (Rules inside a set leave the start to the set's own
    /// DTSTART property.)
    pub(crate) fn value_string(&self, include_start: bool) -> String {
        fn ints<T: ToString>(values: &[T]) -> String {
            values
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<String>>()
                .join(",")
        }

        let orig = &self.inner().orig;
        let mut parts = vec![format!("FREQ={}", orig.freq)];
        if include_start {
            parts.push(format!(
                "DTSTART={}",
                datetime_utc_string(&self.inner().zoned_start),
            ));
        }
        if orig.interval > 1 {
            parts.push(format!("INTERVAL={}", orig.interval));
        }
        if orig.week_start != Weekday::Monday {
            parts.push(format!("WKST={}", weekday_code(orig.week_start)));
        }
        if orig.count > 0 {
            parts.push(format!("COUNT={}", orig.count));
        }
        if let Some(until) = orig.until.as_ref() {
            parts.push(format!("UNTIL={}", datetime_utc_string(until)));
        }
        if !orig.by_set_pos.is_empty() {
            parts.push(format!("BYSETPOS={}", ints(&orig.by_set_pos)));
        }
        if !orig.by_month.is_empty() {
            parts.push(format!("BYMONTH={}", ints(&orig.by_month)));
        }
        if !orig.by_month_day.is_empty() {
            parts.push(format!("BYMONTHDAY={}", ints(&orig.by_month_day)));
        }
        if !orig.by_year_day.is_empty() {
            parts.push(format!("BYYEARDAY={}", ints(&orig.by_year_day)));
        }
        if !orig.by_week_no.is_empty() {
            parts.push(format!("BYWEEKNO={}", ints(&orig.by_week_no)));
        }
        if !orig.by_week_day.is_empty() {
            parts.push(format!("BYDAY={}", ints(&orig.by_week_day)));
        }
        if !orig.by_hour.is_empty() {
            parts.push(format!("BYHOUR={}", ints(&orig.by_hour)));
        }
        if !orig.by_minute.is_empty() {
            parts.push(format!("BYMINUTE={}", ints(&orig.by_minute)));
        }
        if !orig.by_second.is_empty() {
            parts.push(format!("BYSECOND={}", ints(&orig.by_second)));
        }
        if !orig.by_easter.is_empty() {
            parts.push(format!("BYEASTER={}", ints(&orig.by_easter)));
        }
        parts.join(";")
    }
}

impl std::str::FromStr for RecurrenceRule {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<RecurrenceRule> {
        RuleOptions::parse(s)?.build_with(None)
    }
}

/// The raw key/value parts of one RRULE property value, parsed but not yet
/// validated.
#[derive(Clone, Debug, Default)]
pub(crate) struct RuleOptions {
    freq: Option<Frequency>,
    start: Option<Zoned>,
    interval: Option<i32>,
    week_start: Option<Weekday>,
    count: Option<u32>,
    until: Option<Zoned>,
    by_set_pos: Vec<i32>,
    by_month: Vec<i8>,
    by_month_day: Vec<i8>,
    by_year_day: Vec<i16>,
    by_week_no: Vec<i8>,
    by_week_day: Vec<ByWeekday>,
    by_hour: Vec<i8>,
    by_minute: Vec<i8>,
    by_second: Vec<i8>,
    by_easter: Vec<i16>,
}

impl RuleOptions {
    pub(crate) fn parse(s: &str) -> anyhow::Result<RuleOptions> {
        fn numbers<T: std::str::FromStr>(
            key: &str,
            value: &str,
        ) -> anyhow::Result<Vec<T>>
        where
            T::Err: std::error::Error + Send + Sync + 'static,
        {
            value
                .split(',')
                .map(|v| {
                    v.trim()
                        .parse::<T>()
                        .with_context(|| format!("invalid {key} value `{v}`"))
                })
                .collect()
        }

        let mut options = RuleOptions::default();
        for part in s.split(';') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let Some((key, value)) = part.split_once('=') else {
                anyhow::bail!(
                    "invalid rule part `{part}` (expected `KEY=VALUE`)"
                );
            };
            let (key, value) = (key.trim(), value.trim());
            match &*key.to_uppercase() {
                "FREQ" => options.freq = Some(value.parse()?),
                "DTSTART" => options.start = Some(parse_datetime(value)?),
                "INTERVAL" => {
                    options.interval =
                        Some(value.parse().with_context(|| {
                            format!("invalid INTERVAL value `{value}`")
                        })?);
                }
                "WKST" => {
                    options.week_start = Some(parse_weekday_code(value)?);
                }
                "COUNT" => {
                    options.count = Some(value.parse().with_context(
                        || format!("invalid COUNT value `{value}`"),
                    )?);
                }
                "UNTIL" => options.until = Some(parse_datetime(value)?),
                "BYSETPOS" => {
                    options.by_set_pos = numbers("BYSETPOS", value)?;
                }
                "BYMONTH" => options.by_month = numbers("BYMONTH", value)?,
                "BYMONTHDAY" => {
                    options.by_month_day = numbers("BYMONTHDAY", value)?;
                }
                "BYYEARDAY" => {
                    options.by_year_day = numbers("BYYEARDAY", value)?;
                }
                "BYWEEKNO" => {
                    options.by_week_no = numbers("BYWEEKNO", value)?;
                }
                "BYDAY" | "BYWEEKDAY" => {
                    options.by_week_day = value
                        .split(',')
                        .map(|v| parse_by_weekday(v.trim()))
                        .collect::<anyhow::Result<Vec<ByWeekday>>>()?;
                }
                "BYHOUR" => options.by_hour = numbers("BYHOUR", value)?,
                "BYMINUTE" => {
                    options.by_minute = numbers("BYMINUTE", value)?;
                }
                "BYSECOND" => {
                    options.by_second = numbers("BYSECOND", value)?;
                }
                "BYEASTER" => {
                    options.by_easter = numbers("BYEASTER", value)?;
                }
                unk => anyhow::bail!("unrecognized rule part `{unk}`"),
            }
        }
        Ok(options)
    }

    /// Turns the parsed parts into a validated rule, filling the start in
    /// from `fallback_start` (or from the current time in UTC) when the
    /// string carried no DTSTART of its own.
    pub(crate) fn build_with(
        &self,
        fallback_start: Option<&Zoned>,
    ) -> anyhow::Result<RecurrenceRule> {
        let Some(freq) = self.freq else {
            anyhow::bail!("rule is missing the required FREQ part");
        };
        let start = match (self.start.as_ref(), fallback_start) {
            (Some(start), _) => start.clone(),
            (None, Some(start)) => start.clone(),
            (None, None) => truncate_to_seconds(
                &Timestamp::now().to_zoned(TimeZone::UTC),
            ),
        };
        let mut builder = RecurrenceRule::builder(freq, start);
        if let Some(interval) = self.interval {
            builder.interval(interval);
        }
        if let Some(week_start) = self.week_start {
            builder.week_start(week_start);
        }
        if let Some(count) = self.count {
            builder.count(count);
        }
        if let Some(until) = self.until.as_ref() {
            builder.until(until.clone());
        }
        builder
            .by_set_position(self.by_set_pos.clone())
            .by_month(self.by_month.clone())
            .by_month_day(self.by_month_day.clone())
            .by_year_day(self.by_year_day.clone())
            .by_week_no(self.by_week_no.clone())
            .by_week_day(self.by_week_day.clone())
            .by_hour(self.by_hour.clone())
            .by_minute(self.by_minute.clone())
            .by_second(self.by_second.clone())
            .by_easter(self.by_easter.clone())
            .build()
    }
}

/// Renders a zoned datetime in the basic ISO 8601 format in UTC,
/// e.g. `20120201T093000Z`.
pub(crate) fn datetime_utc_string(zdt: &Zoned) -> String {
    let dt = zdt.with_time_zone(TimeZone::UTC).datetime();
    format!(
        "{:04}{:02}{:02}T{:02}{:02}{:02}Z",
        dt.year(),
        dt.month(),
        dt.day(),
        dt.hour(),
        dt.minute(),
        dt.second(),
    )
}

/// Renders a datetime as an iCalendar property line. UTC datetimes use the
/// `Z` form; anything else carries a TZID parameter and local wall-clock
/// time.
pub(crate) fn datetime_property_string(name: &str, zdt: &Zoned) -> String {
    match zdt.time_zone().iana_name() {
        Some("UTC") | None => {
            format!("{name}:{}", datetime_utc_string(zdt))
        }
        Some(tzid) => {
            let dt = zdt.datetime();
            format!(
                "{name};TZID={tzid}:{:04}{:02}{:02}T{:02}{:02}{:02}",
                dt.year(),
                dt.month(),
                dt.day(),
                dt.hour(),
                dt.minute(),
                dt.second(),
            )
        }
    }
}

/// Parses a datetime in the basic ISO 8601 format: `YYYYMMDD`, optionally
/// followed by `THHMMSS` and a trailing `Z`. A datetime without the UTC
/// designator is resolved against `tz` in [`parse_datetime_in`], and taken
/// to already be UTC here.
pub(crate) fn parse_datetime(s: &str) -> anyhow::Result<Zoned> {
    parse_datetime_in(s, &TimeZone::UTC)
}

pub(crate) fn parse_datetime_in(
    s: &str,
    tz: &TimeZone,
) -> anyhow::Result<Zoned> {
    let err = || format!("invalid datetime `{s}`");
    let (rest, utc) = match s.strip_suffix(['Z', 'z']) {
        Some(rest) => (rest, true),
        None => (s, false),
    };
    let (date_part, time_part) = match rest.split_once(['T', 't']) {
        Some((date_part, time_part)) => (date_part, Some(time_part)),
        None => (rest, None),
    };
    anyhow::ensure!(
        date_part.len() == 8 && date_part.is_ascii(),
        "invalid datetime `{s}` (expected `YYYYMMDD[THHMMSS[Z]]`)",
    );
    let year = date_part[..4].parse::<i16>().with_context(err)?;
    let month = date_part[4..6].parse::<i8>().with_context(err)?;
    let day = date_part[6..8].parse::<i8>().with_context(err)?;
    let date = Date::new(year, month, day).with_context(err)?;
    let time = match time_part {
        None => Time::midnight(),
        Some(time_part) => {
            anyhow::ensure!(
                time_part.len() == 6 && time_part.is_ascii(),
                "invalid datetime `{s}` (expected `YYYYMMDD[THHMMSS[Z]]`)",
            );
            let hour = time_part[..2].parse::<i8>().with_context(err)?;
            let minute = time_part[2..4].parse::<i8>().with_context(err)?;
            let second = time_part[4..6].parse::<i8>().with_context(err)?;
            Time::new(hour, minute, second, 0).with_context(err)?
        }
    };
    let tz = if utc { &TimeZone::UTC } else { tz };
    date.to_datetime(time).to_zoned(tz.clone()).with_context(err)
}

/// Parses a BYDAY entry: a weekday code optionally preceded by a signed
/// position, e.g. `MO`, `+2FR` or `-1SU`.
pub(crate) fn parse_by_weekday(s: &str) -> anyhow::Result<ByWeekday> {
    let split = s
        .find(|c: char| c.is_ascii_alphabetic())
        .ok_or_else(|| anyhow::anyhow!("invalid weekday `{s}`"))?;
    let (nth, code) = s.split_at(split);
    let weekday = parse_weekday_code(code)?;
    if nth.is_empty() {
        Ok(ByWeekday::Any(weekday))
    } else {
        let nth = nth
            .parse::<i8>()
            .with_context(|| format!("invalid weekday position in `{s}`"))?;
        Ok(ByWeekday::Numbered { nth, weekday })
    }
}

pub(crate) fn parse_weekday_code(s: &str) -> anyhow::Result<Weekday> {
    let weekday = match &*s.to_uppercase() {
        "MO" => Weekday::Monday,
        "TU" => Weekday::Tuesday,
        "WE" => Weekday::Wednesday,
        "TH" => Weekday::Thursday,
        "FR" => Weekday::Friday,
        "SA" => Weekday::Saturday,
        "SU" => Weekday::Sunday,
        unk => anyhow::bail!("unrecognized weekday code `{unk}`"),
    };
    Ok(weekday)
}

pub(crate) fn weekday_code(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Monday => "MO",
        Weekday::Tuesday => "TU",
        Weekday::Wednesday => "WE",
        Weekday::Thursday => "TH",
        Weekday::Friday => "FR",
        Weekday::Saturday => "SA",
        Weekday::Sunday => "SU",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_rule_to_string() {
        let start: Zoned =
            "2018-01-01T09:00:00[America/New_York]".parse().unwrap();
        let rule = RecurrenceRule::builder(Frequency::Monthly, start)
            .build()
            .unwrap();
        // The start renders in UTC: 9am Eastern is 2pm Zulu.
        insta::assert_snapshot!(
            rule,
            @"FREQ=MONTHLY;DTSTART=20180101T140000Z",
        );
    }

    #[test]
    fn full_rule_round_trips() {
        let s = "FREQ=WEEKLY;DTSTART=20120201T093000Z;INTERVAL=5;WKST=TU;\
                 COUNT=2;UNTIL=20130130T230000Z;BYSETPOS=2;BYMONTH=3;\
                 BYYEARDAY=95;BYWEEKNO=1;BYDAY=MO,+2FR;BYHOUR=9;\
                 BYMINUTE=30;BYSECOND=0;BYEASTER=-1";
        let rule: RecurrenceRule = s.parse().unwrap();
        assert_eq!(rule.to_string(), s);
    }

    #[test]
    fn defaults_are_omitted() {
        let start: Zoned = "2018-01-01T00:00:00[UTC]".parse().unwrap();
        let rule = RecurrenceRule::builder(Frequency::Daily, start)
            .interval(1)
            .week_start(Weekday::Monday)
            .build()
            .unwrap();
        insta::assert_snapshot!(
            rule,
            @"FREQ=DAILY;DTSTART=20180101T000000Z",
        );
    }

    #[test]
    fn numbered_weekdays_render_with_sign() {
        let start: Zoned = "2018-01-01T00:00:00[UTC]".parse().unwrap();
        let rule = RecurrenceRule::builder(Frequency::Monthly, start)
            .by_week_day(vec![
                ByWeekday::Any(Weekday::Monday),
                ByWeekday::Numbered { nth: 2, weekday: Weekday::Friday },
                ByWeekday::Numbered { nth: -1, weekday: Weekday::Sunday },
            ])
            .build()
            .unwrap();
        insta::assert_snapshot!(
            rule,
            @"FREQ=MONTHLY;DTSTART=20180101T000000Z;BYDAY=MO,+2FR,-1SU",
        );
    }

    #[test]
    fn parsed_rules_generate() {
        let rule: RecurrenceRule =
            "FREQ=DAILY;DTSTART=20180101T000000Z;COUNT=3".parse().unwrap();
        let all = rule.all();
        assert_eq!(all.len(), 3);
        assert_eq!(
            all[0],
            "2018-01-01T00:00:00[UTC]".parse::<Zoned>().unwrap(),
        );
        assert_eq!(
            all[2],
            "2018-01-03T00:00:00[UTC]".parse::<Zoned>().unwrap(),
        );
    }

    #[test]
    fn parsing_is_case_insensitive() {
        let rule: RecurrenceRule =
            "freq=weekly;dtstart=20180101t000000z;byday=mo,+2fr"
                .parse()
                .unwrap();
        assert_eq!(rule.frequency(), Frequency::Weekly);
    }

    #[test]
    fn missing_freq_is_an_error() {
        let err = "DTSTART=20180101T000000Z"
            .parse::<RecurrenceRule>()
            .unwrap_err();
        insta::assert_snapshot!(
            err,
            @"rule is missing the required FREQ part",
        );
    }

    #[test]
    fn nonsense_parts_are_errors() {
        assert!("FREQ=DAILY;BANANA=1".parse::<RecurrenceRule>().is_err());
        assert!("FREQ=DAILY;COUNT".parse::<RecurrenceRule>().is_err());
        assert!(
            "FREQ=DAILY;UNTIL=yesterday".parse::<RecurrenceRule>().is_err()
        );
        assert!("FREQ=DAILY;BYDAY=XX".parse::<RecurrenceRule>().is_err());
        // Out-of-range values are rejected by the same validation as the
        // builder.
        assert!("FREQ=DAILY;BYHOUR=24".parse::<RecurrenceRule>().is_err());
    }

    #[test]
    fn weekday_entries() {
        assert_eq!(
            parse_by_weekday("MO").unwrap(),
            ByWeekday::Any(Weekday::Monday),
        );
        assert_eq!(
            parse_by_weekday("+2FR").unwrap(),
            ByWeekday::Numbered { nth: 2, weekday: Weekday::Friday },
        );
        assert_eq!(
            parse_by_weekday("2FR").unwrap(),
            ByWeekday::Numbered { nth: 2, weekday: Weekday::Friday },
        );
        assert_eq!(
            parse_by_weekday("-1SU").unwrap(),
            ByWeekday::Numbered { nth: -1, weekday: Weekday::Sunday },
        );
        assert!(parse_by_weekday("5").is_err());
        assert!(parse_by_weekday("XX").is_err());
    }

    #[test]
    fn datetimes() {
        let zdt = parse_datetime("20120201T093000Z").unwrap();
        assert_eq!(
            zdt,
            "2012-02-01T09:30:00[UTC]".parse::<Zoned>().unwrap(),
        );
        // Without a designator the datetime is taken to be UTC.
        let zdt = parse_datetime("20120201T093000").unwrap();
        assert_eq!(
            zdt,
            "2012-02-01T09:30:00[UTC]".parse::<Zoned>().unwrap(),
        );
        // A bare date is midnight.
        let zdt = parse_datetime("20120201").unwrap();
        assert_eq!(
            zdt,
            "2012-02-01T00:00:00[UTC]".parse::<Zoned>().unwrap(),
        );
        assert!(parse_datetime("2012-02-01").is_err());
        assert!(parse_datetime("20121301T000000Z").is_err());
    }

    #[test]
    fn property_lines() {
        let ny: Zoned =
            "2018-01-01T09:00:00[America/New_York]".parse().unwrap();
        assert_eq!(
            datetime_property_string("DTSTART", &ny),
            "DTSTART;TZID=America/New_York:20180101T090000",
        );
        let utc: Zoned = "2018-01-01T09:00:00[UTC]".parse().unwrap();
        assert_eq!(
            datetime_property_string("DTSTART", &utc),
            "DTSTART:20180101T090000Z",
        );
    }
}
