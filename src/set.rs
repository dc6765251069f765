/*!
Sets of recurrence rules.

An iCalendar component rarely carries a single RRULE: the recurrence set is
the union of any number of rules and explicit RDATE datetimes, minus the
occurrences of exclusion rules and EXDATE datetimes. This module is a thin
wrapper over the core iterator: it merges the already-sorted streams of its
parts, deduplicates instants that more than one part produces and drops
anything an exclusion stream also produces.
*/

use std::{fmt, iter::Peekable};

use anyhow::Context;
use jiff::{Zoned, tz::TimeZone};

use crate::{
    iter,
    parse::{RuleOptions, datetime_property_string, parse_datetime_in},
    rule::RecurrenceRule,
};

/// A recurrence set: the union of recurrence rules and fixed datetimes,
/// minus exclusion rules and exclusion datetimes.
#[derive(Clone, Debug, Default)]
pub struct RecurrenceSet {
    start: Option<Zoned>,
    rules: Vec<RecurrenceRule>,
    exclusion_rules: Vec<RecurrenceRule>,
    dates: Vec<Zoned>,
    exclusion_dates: Vec<Zoned>,
}

impl RecurrenceSet {
    pub fn new() -> RecurrenceSet {
        RecurrenceSet::default()
    }

    /// Adds a recurrence rule to the set. When the set has a starting
    /// point, the rule is rebased onto it.
    pub fn rule(&mut self, mut rule: RecurrenceRule) -> &mut RecurrenceSet {
        if let Some(start) = self.start.as_ref() {
            rule.set_start(start.clone());
        }
        self.rules.push(rule);
        self
    }

    /// Adds an exclusion rule: none of its occurrences will appear in the
    /// set's stream.
    pub fn exclusion_rule(
        &mut self,
        mut rule: RecurrenceRule,
    ) -> &mut RecurrenceSet {
        if let Some(start) = self.start.as_ref() {
            rule.set_start(start.clone());
        }
        self.exclusion_rules.push(rule);
        self
    }

    /// Adds a fixed datetime to the set.
    pub fn date(&mut self, dt: Zoned) -> &mut RecurrenceSet {
        self.dates.push(dt);
        self
    }

    /// Adds a fixed exclusion datetime: any occurrence at the same instant
    /// is dropped from the set's stream.
    pub fn exclusion_date(&mut self, dt: Zoned) -> &mut RecurrenceSet {
        self.exclusion_dates.push(dt);
        self
    }

    /// Sets the starting point of the set and rebases every rule already
    /// in it (and every rule added later) onto it.
    pub fn set_start(&mut self, start: Zoned) -> &mut RecurrenceSet {
        for rule in
            self.rules.iter_mut().chain(self.exclusion_rules.iter_mut())
        {
            rule.set_start(start.clone());
        }
        self.start = Some(start);
        self
    }

    /// Returns the starting point of the set, if one was given.
    pub fn start(&self) -> Option<&Zoned> {
        self.start.as_ref()
    }

    /// Returns an iterator over the set's datetimes in strictly increasing
    /// order.
    pub fn iter(&self) -> RecurrenceSetIter<'_> {
        let mut includes: Vec<Stream<'_>> =
            self.rules.iter().map(|rule| stream(rule.iter())).collect();
        if !self.dates.is_empty() {
            includes.push(stream(sorted(self.dates.clone()).into_iter()));
        }
        let mut excludes: Vec<Stream<'_>> = self
            .exclusion_rules
            .iter()
            .map(|rule| stream(rule.iter()))
            .collect();
        if !self.exclusion_dates.is_empty() {
            excludes.push(stream(
                sorted(self.exclusion_dates.clone()).into_iter(),
            ));
        }
        RecurrenceSetIter { includes, excludes }
    }

    /// Returns every datetime in the set. This loops forever when any rule
    /// in the set is unbounded.
    pub fn all(&self) -> Vec<Zoned> {
        self.iter().collect()
    }

    /// Returns the datetimes of the set falling between `after` and
    /// `before`, exclusive on both ends (inclusive when `inclusive` is
    /// set).
    pub fn between(
        &self,
        after: &Zoned,
        before: &Zoned,
        inclusive: bool,
    ) -> Vec<Zoned> {
        iter::between(self.iter(), after, before, inclusive)
    }

    /// Returns the last datetime of the set before `dt` (or at `dt`, when
    /// `inclusive` is set), if one exists.
    pub fn before(&self, dt: &Zoned, inclusive: bool) -> Option<Zoned> {
        iter::before(self.iter(), dt, inclusive)
    }

    /// Returns the first datetime of the set after `dt` (or at `dt`, when
    /// `inclusive` is set), if one exists.
    pub fn after(&self, dt: &Zoned, inclusive: bool) -> Option<Zoned> {
        iter::after(self.iter(), dt, inclusive)
    }

    /// Returns the rules in the set.
    pub fn rules(&self) -> &[RecurrenceRule] {
        &self.rules
    }
}

impl<'s> IntoIterator for &'s RecurrenceSet {
    type IntoIter = RecurrenceSetIter<'s>;
    type Item = Zoned;

    fn into_iter(self) -> RecurrenceSetIter<'s> {
        self.iter()
    }
}

impl fmt::Display for RecurrenceSet {
    /// Renders the set in the iCalendar line-per-property form, with the
    /// rules' shared starting point on its own DTSTART line.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut lines = vec![];
        if let Some(start) = self.start.as_ref() {
            lines.push(datetime_property_string("DTSTART", start));
        }
        for rule in self.rules.iter() {
            lines.push(format!("RRULE:{}", rule.value_string(false)));
        }
        for rule in self.exclusion_rules.iter() {
            lines.push(format!("EXRULE:{}", rule.value_string(false)));
        }
        for dt in self.dates.iter() {
            lines.push(datetime_property_string("RDATE", dt));
        }
        for dt in self.exclusion_dates.iter() {
            lines.push(datetime_property_string("EXDATE", dt));
        }
        f.write_str(&lines.join("\n"))
    }
}

impl std::str::FromStr for RecurrenceSet {
    type Err = anyhow::Error;

    /// Parses the line-per-property form emitted by `Display`. A DTSTART
    /// line (wherever it appears) provides the starting point for every
    /// RRULE and EXRULE line that carries no DTSTART of its own.
    fn from_str(s: &str) -> anyhow::Result<RecurrenceSet> {
        // A blank line parses as an empty set, but no input at all is a
        // caller mistake.
        if s.is_empty() {
            anyhow::bail!(
                "cannot parse a recurrence set from an empty string"
            );
        }
        let mut start = None;
        // The starting point applies to every rule regardless of line
        // order, so find it before building any rule.
        for line in s.lines() {
            let line = line.trim();
            if let Some((params, value)) = property_parts(line, "DTSTART") {
                start = Some(parse_property_datetime(
                    params,
                    value,
                    &TimeZone::UTC,
                )?);
            }
        }
        // A floating RDATE/EXDATE value (no TZID, no UTC designator)
        // belongs to the same zone as the set's starting point.
        let default_tz = start
            .as_ref()
            .map(|zdt| zdt.time_zone().clone())
            .unwrap_or(TimeZone::UTC);

        let mut set = RecurrenceSet::new();
        set.start = start.clone();
        for line in s.lines() {
            let line = line.trim();
            if line.is_empty() || property_parts(line, "DTSTART").is_some()
            {
                continue;
            }
            if let Some((_, value)) = property_parts(line, "RRULE") {
                let rule =
                    RuleOptions::parse(value)?.build_with(start.as_ref())?;
                set.rules.push(rule);
            } else if let Some((_, value)) = property_parts(line, "EXRULE")
            {
                let rule =
                    RuleOptions::parse(value)?.build_with(start.as_ref())?;
                set.exclusion_rules.push(rule);
            } else if let Some((params, value)) =
                property_parts(line, "RDATE")
            {
                for v in value.split(',') {
                    set.dates.push(parse_property_datetime(
                        params,
                        v.trim(),
                        &default_tz,
                    )?);
                }
            } else if let Some((params, value)) =
                property_parts(line, "EXDATE")
            {
                for v in value.split(',') {
                    set.exclusion_dates.push(parse_property_datetime(
                        params,
                        v.trim(),
                        &default_tz,
                    )?);
                }
            } else {
                anyhow::bail!("unrecognized recurrence set line `{line}`");
            }
        }
        Ok(set)
    }
}

/// One sorted stream of zoned datetimes feeding the merge.
type Stream<'s> = Peekable<Box<dyn Iterator<Item = Zoned> + 's>>;

fn stream<'s, I>(it: I) -> Stream<'s>
where
    I: Iterator<Item = Zoned> + 's,
{
    (Box::new(it) as Box<dyn Iterator<Item = Zoned> + 's>).peekable()
}

fn sorted(mut dates: Vec<Zoned>) -> Vec<Zoned> {
    dates.sort();
    dates
}

/// An iterator over the datetimes of a recurrence set, in strictly
/// increasing order with duplicates collapsed.
pub struct RecurrenceSetIter<'s> {
    includes: Vec<Stream<'s>>,
    excludes: Vec<Stream<'s>>,
}

impl<'s> Iterator for RecurrenceSetIter<'s> {
    type Item = Zoned;

    fn next(&mut self) -> Option<Zoned> {
        loop {
            // The merged head is the smallest instant any include stream
            // offers.
            let mut candidate: Option<Zoned> = None;
            for it in self.includes.iter_mut() {
                if let Some(head) = it.peek() {
                    if candidate.as_ref().is_none_or(|c| head < c) {
                        candidate = Some(head.clone());
                    }
                }
            }
            let candidate = candidate?;
            // Pop it from every stream that produced it, so duplicates
            // collapse to one.
            for it in self.includes.iter_mut() {
                while it.next_if(|zdt| *zdt == candidate).is_some() {}
            }
            // Exclusion streams are sorted too, so they only ever need to
            // be advanced, never rewound.
            let mut excluded = false;
            for it in self.excludes.iter_mut() {
                while it.next_if(|zdt| *zdt < candidate).is_some() {}
                if it.peek() == Some(&candidate) {
                    excluded = true;
                }
            }
            if !excluded {
                return Some(candidate);
            }
        }
    }
}

impl<'s> std::iter::FusedIterator for RecurrenceSetIter<'s> {}

/// Splits an iCalendar content line `NAME[;PARAMS]:VALUE` into its
/// parameter and value parts when the property name matches.
fn property_parts<'a>(
    line: &'a str,
    name: &str,
) -> Option<(&'a str, &'a str)> {
    let prefix = line.get(..name.len())?;
    if !prefix.eq_ignore_ascii_case(name) {
        return None;
    }
    let rest = &line[name.len()..];
    match rest.as_bytes().first() {
        Some(b':') => Some(("", &rest[1..])),
        Some(b';') => rest[1..].split_once(':'),
        _ => None,
    }
}

/// Parses the datetime of a DTSTART/RDATE/EXDATE line. A TZID parameter
/// wins when one is present; otherwise a floating value resolves against
/// `default_tz` (the set's DTSTART zone). A trailing `Z` means UTC either
/// way.
fn parse_property_datetime(
    params: &str,
    value: &str,
    default_tz: &TimeZone,
) -> anyhow::Result<Zoned> {
    for param in params.split(';') {
        let Some((key, tzid)) = param.split_once('=') else { continue };
        if key.eq_ignore_ascii_case("TZID") {
            let tz = TimeZone::get(tzid).with_context(|| {
                format!("unrecognized time zone `{tzid}`")
            })?;
            return parse_datetime_in(value, &tz);
        }
    }
    parse_datetime_in(value, default_tz)
}
