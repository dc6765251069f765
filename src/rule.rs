use std::{
    cmp::Ordering,
    ops::{Range, RangeInclusive},
    sync::Arc,
};

use jiff::{
    Timestamp, Zoned,
    civil::{DateTime, Time, Weekday, time},
    tz::TimeZone,
};

use crate::iter::{self, RecurrenceIter};

// The rule representation is split the same way as the reference
// implementations of RFC 5545 recurrence: a thin immutable handle over an
// inner value holding the *normalized* rule (lists sorted, BYMONTHDAY split
// by sign, positioned weekdays separated from plain ones, synthetic defaults
// already inserted). The iterator only ever sees the normalized form. The
// builder that produced the rule is kept around verbatim, since the textual
// form and `set_start` both need to know what the caller actually wrote as
// opposed to what normalization derived.

/// An RFC 5545 recurrence rule.
///
/// A rule denotes an ordered, possibly unbounded sequence of datetimes. It
/// is immutable once constructed (except through [`RecurrenceRule::set_start`]
/// and [`RecurrenceRule::set_until`], which cannot be called while an
/// iterator borrows the rule) and cheap to clone.
#[derive(Clone, Debug)]
pub struct RecurrenceRule {
    inner: Arc<RecurrenceRuleInner>,
}

#[derive(Clone, Debug)]
pub(crate) struct RecurrenceRuleInner {
    pub(crate) freq: Frequency,
    pub(crate) zoned_start: Zoned,
    pub(crate) civil_start: DateTime,
    pub(crate) zoned_until: Option<Zoned>,
    pub(crate) interval: i32,
    pub(crate) count: Option<u32>,
    pub(crate) week_start: Weekday,
    pub(crate) by_month: Box<[i8]>,
    pub(crate) by_week_no: Box<[i8]>,
    pub(crate) by_year_day: Box<[i16]>,
    // positive values only
    pub(crate) by_month_day: Box<[i8]>,
    // negative values only
    pub(crate) by_neg_month_day: Box<[i8]>,
    // unpositioned weekdays, as Monday=0 indices
    pub(crate) by_weekday: Box<[i8]>,
    // positioned weekdays; nonempty only at yearly or monthly frequency
    pub(crate) by_nth_weekday: Box<[NthWeekday]>,
    pub(crate) by_hour: Box<[i8]>,
    pub(crate) by_minute: Box<[i8]>,
    pub(crate) by_second: Box<[i8]>,
    // offsets in days relative to Easter Sunday
    pub(crate) by_easter: Box<[i16]>,
    pub(crate) by_set_pos: Box<[i32]>,
    // the precomputed time-set; empty at hourly and finer frequencies
    pub(crate) time_set: Box<[Time]>,
    // what the caller originally asked for, before normalization
    pub(crate) orig: RecurrenceRuleBuilder,
}

/// A positioned weekday, with both components as plain indices
/// (Monday is `0`).
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub(crate) struct NthWeekday {
    pub(crate) nth: i8,
    pub(crate) weekday: i8,
}

impl RecurrenceRule {
    /// Returns a builder for constructing a `RecurrenceRule`.
    ///
    /// The frequency and the starting point are the only two things required
    /// to create a rule. The starting point is truncated to whole seconds,
    /// and occurrences are emitted in its time zone.
    pub fn builder(freq: Frequency, start: Zoned) -> RecurrenceRuleBuilder {
        RecurrenceRuleBuilder::new(freq, start)
    }

    /// Returns an iterator over the datetimes in this recurrence rule, in
    /// strictly increasing order.
    ///
    /// The iterator may be "infinite" when the rule has neither an `until`
    /// nor a `count` limit. Callers iterating such rules should bound the
    /// iteration themselves, e.g. via `take(N)`.
    pub fn iter(&self) -> RecurrenceIter<'_> {
        RecurrenceIter::new(self)
    }

    /// Returns every datetime in this recurrence rule.
    ///
    /// This loops forever when the rule has neither an `until` nor a
    /// `count` limit.
    pub fn all(&self) -> Vec<Zoned> {
        self.iter().collect()
    }

    /// Returns the datetimes of this rule falling between `after` and
    /// `before`, exclusive on both ends. When `inclusive` is true, the
    /// bounds themselves are admitted when the rule produces them.
    pub fn between(
        &self,
        after: &Zoned,
        before: &Zoned,
        inclusive: bool,
    ) -> Vec<Zoned> {
        iter::between(self.iter(), after, before, inclusive)
    }

    /// Returns the last datetime of this rule before `dt` (or at `dt`, when
    /// `inclusive` is true), if one exists.
    pub fn before(&self, dt: &Zoned, inclusive: bool) -> Option<Zoned> {
        iter::before(self.iter(), dt, inclusive)
    }

    /// Returns the first datetime of this rule after `dt` (or at `dt`, when
    /// `inclusive` is true), if one exists.
    pub fn after(&self, dt: &Zoned, inclusive: bool) -> Option<Zoned> {
        iter::after(self.iter(), dt, inclusive)
    }

    /// Replaces the starting point of this rule.
    ///
    /// Any `by_hour`, `by_minute` or `by_second` values that were derived
    /// from the previous starting point (rather than given explicitly) are
    /// re-derived, and the precomputed time-set is recomputed.
    pub fn set_start(&mut self, start: Zoned) {
        let inner = Arc::make_mut(&mut self.inner);
        let start = truncate_to_seconds(&start);
        inner.civil_start = start.datetime();
        inner.zoned_start = start.clone();
        inner.orig.start = start;
        if inner.orig.by_hour.is_empty() && inner.freq < Frequency::Hourly {
            inner.by_hour = Box::new([inner.civil_start.hour()]);
        }
        if inner.orig.by_minute.is_empty() && inner.freq < Frequency::Minutely
        {
            inner.by_minute = Box::new([inner.civil_start.minute()]);
        }
        if inner.orig.by_second.is_empty() && inner.freq < Frequency::Secondly
        {
            inner.by_second = Box::new([inner.civil_start.second()]);
        }
        inner.time_set = compute_time_set(
            inner.freq,
            &inner.by_hour,
            &inner.by_minute,
            &inner.by_second,
        );
    }

    /// Replaces the upper bound of this rule. The bound is inclusive: a
    /// datetime equal to it is still emitted.
    pub fn set_until(&mut self, until: Zoned) {
        let inner = Arc::make_mut(&mut self.inner);
        inner.zoned_until = Some(until.clone());
        inner.orig.until = Some(until);
        inner.time_set = compute_time_set(
            inner.freq,
            &inner.by_hour,
            &inner.by_minute,
            &inner.by_second,
        );
    }

    /// Returns the frequency of this rule.
    pub fn frequency(&self) -> Frequency {
        self.inner.freq
    }

    /// Returns the starting point of this rule, truncated to whole seconds.
    pub fn start(&self) -> &Zoned {
        &self.inner.zoned_start
    }

    /// Returns the inclusive upper bound of this rule, if any.
    pub fn until(&self) -> Option<&Zoned> {
        self.inner.zoned_until.as_ref()
    }

    /// Returns the time zone that datetimes emitted by this rule are in.
    pub(crate) fn time_zone(&self) -> &TimeZone {
        self.inner.zoned_start.time_zone()
    }

    pub(crate) fn inner(&self) -> &RecurrenceRuleInner {
        &self.inner
    }
}

impl<'r> IntoIterator for &'r RecurrenceRule {
    type IntoIter = RecurrenceIter<'r>;
    type Item = Zoned;

    fn into_iter(self) -> RecurrenceIter<'r> {
        self.iter()
    }
}

/// A builder for constructing a valid recurrence rule.
#[derive(Clone, Debug)]
pub struct RecurrenceRuleBuilder {
    pub(crate) freq: Frequency,
    pub(crate) start: Zoned,
    pub(crate) until: Option<Zoned>,
    pub(crate) interval: i32,
    pub(crate) count: u32,
    pub(crate) by_month: Vec<i8>,
    pub(crate) by_week_no: Vec<i8>,
    pub(crate) by_year_day: Vec<i16>,
    pub(crate) by_month_day: Vec<i8>,
    pub(crate) by_week_day: Vec<ByWeekday>,
    pub(crate) by_hour: Vec<i8>,
    pub(crate) by_minute: Vec<i8>,
    pub(crate) by_second: Vec<i8>,
    pub(crate) by_easter: Vec<i16>,
    pub(crate) by_set_pos: Vec<i32>,
    pub(crate) week_start: Weekday,
}

impl RecurrenceRuleBuilder {
    fn new(freq: Frequency, start: Zoned) -> RecurrenceRuleBuilder {
        RecurrenceRuleBuilder {
            freq,
            start,
            until: None,
            interval: 1,
            count: 0,
            by_month: vec![],
            by_week_no: vec![],
            by_year_day: vec![],
            by_month_day: vec![],
            by_week_day: vec![],
            by_hour: vec![],
            by_minute: vec![],
            by_second: vec![],
            by_easter: vec![],
            by_set_pos: vec![],
            week_start: Weekday::Monday,
        }
    }

    pub fn build(&self) -> anyhow::Result<RecurrenceRule> {
        fn sort_and_dedup<T: Clone + Ord>(slice: &[T]) -> Box<[T]> {
            let mut vec = slice.to_vec();
            vec.sort();
            vec.dedup();
            vec.into_boxed_slice()
        }

        anyhow::ensure!(
            self.interval >= 0,
            "interval value of `{}` is invalid \
             (interval must not be negative)",
            self.interval,
        );
        for &v in self.by_month.iter() {
            anyhow::ensure!(
                1 <= v && v <= 12,
                "invalid 'by month' value `{v}` \
                 (values must be in range 1..=12)",
            );
        }
        for &v in self.by_week_no.iter() {
            anyhow::ensure!(
                (-53 <= v && v <= -1) || (1 <= v && v <= 53),
                "invalid 'by week' value `{v}` \
                 (values must be in range 1..=53 or -53..=-1)",
            );
        }
        for &v in self.by_year_day.iter() {
            anyhow::ensure!(
                (-366 <= v && v <= -1) || (1 <= v && v <= 366),
                "invalid 'by day of the year' value `{v}` \
                 (values must be in range 1..=366 or -366..=-1)",
            );
        }
        for &v in self.by_month_day.iter() {
            anyhow::ensure!(
                (-31 <= v && v <= -1) || (1 <= v && v <= 31),
                "invalid 'by day of the month' value `{v}` \
                 (values must be in range 1..=31 or -31..=-1)",
            );
        }
        for &v in self.by_week_day.iter() {
            let ByWeekday::Numbered { nth, .. } = v else { continue };
            anyhow::ensure!(
                -53 <= nth && nth <= 53,
                "invalid numbered 'by week day' value `{v}` \
                 (ordinals must be in range 1..=53 or -53..=-1)",
            );
        }
        for &v in self.by_hour.iter() {
            anyhow::ensure!(
                0 <= v && v <= 23,
                "invalid 'by hour' value `{v}` \
                 (values must be in range 0..=23)",
            );
        }
        for &v in self.by_minute.iter() {
            anyhow::ensure!(
                0 <= v && v <= 59,
                "invalid 'by minute' value `{v}` \
                 (values must be in range 0..=59)",
            );
        }
        for &v in self.by_second.iter() {
            // RFC 5545 technically allows a value of `60` here, presumably
            // for leap seconds. Jiff doesn't support leap seconds outside
            // of parsing, so just reject it. This is also what
            // `python-dateutil` does.
            anyhow::ensure!(
                0 <= v && v <= 59,
                "invalid 'by second' value `{v}` \
                 (values must be in range 0..=59)",
            );
        }
        for &v in self.by_set_pos.iter() {
            anyhow::ensure!(
                (-366 <= v && v <= -1) || (1 <= v && v <= 366),
                "invalid 'by set position' value `{v}` \
                 (values must be in range 1..=366 or -366..=-1)",
            );
        }

        // An interval of zero is treated as "unspecified".
        let interval = if self.interval == 0 { 1 } else { self.interval };
        let count = (self.count > 0).then_some(self.count);

        let zoned_start = truncate_to_seconds(&self.start);
        let civil_start = zoned_start.datetime();

        // When no rule part constrains the date, the starting point fills
        // in: a yearly rule recurs on the start's month and day, a monthly
        // rule on the start's day and a weekly rule on the start's weekday.
        let mut by_month = self.by_month.clone();
        let mut all_month_days = self.by_month_day.clone();
        let mut by_week_day = self.by_week_day.clone();
        let no_date_parts = self.by_week_no.is_empty()
            && self.by_year_day.is_empty()
            && self.by_month_day.is_empty()
            && self.by_week_day.is_empty()
            && self.by_easter.is_empty();
        if no_date_parts {
            match self.freq {
                Frequency::Yearly => {
                    if by_month.is_empty() {
                        by_month.push(civil_start.month());
                    }
                    all_month_days.push(civil_start.day());
                }
                Frequency::Monthly => all_month_days.push(civil_start.day()),
                Frequency::Weekly => by_week_day
                    .push(ByWeekday::Any(civil_start.weekday())),
                _ => {}
            }
        }

        // BYMONTHDAY filters match a day when either its front or its back
        // day-of-month number is listed, so the two signs are kept apart.
        let mut by_month_day = vec![];
        let mut by_neg_month_day = vec![];
        for &day in all_month_days.iter() {
            if day > 0 {
                by_month_day.push(day);
            } else {
                by_neg_month_day.push(day);
            }
        }

        // A weekday position is only meaningful within a month or a year.
        // At any finer frequency the position is dropped and the entry
        // matches every occurrence of its weekday.
        let mut by_weekday = vec![];
        let mut by_nth_weekday = vec![];
        for &entry in by_week_day.iter() {
            match entry {
                ByWeekday::Any(weekday) => {
                    by_weekday.push(weekday.to_monday_zero_offset());
                }
                ByWeekday::Numbered { nth, weekday } => {
                    if nth == 0 || self.freq > Frequency::Monthly {
                        by_weekday.push(weekday.to_monday_zero_offset());
                    } else {
                        by_nth_weekday.push(NthWeekday {
                            nth,
                            weekday: weekday.to_monday_zero_offset(),
                        });
                    }
                }
            }
        }

        // Time-of-day parts left unspecified are pinned to the starting
        // point, but only at frequencies too coarse to iterate them.
        let mut by_hour = self.by_hour.clone();
        if by_hour.is_empty() && self.freq < Frequency::Hourly {
            by_hour.push(civil_start.hour());
        }
        let mut by_minute = self.by_minute.clone();
        if by_minute.is_empty() && self.freq < Frequency::Minutely {
            by_minute.push(civil_start.minute());
        }
        let mut by_second = self.by_second.clone();
        if by_second.is_empty() && self.freq < Frequency::Secondly {
            by_second.push(civil_start.second());
        }

        let by_hour = sort_and_dedup(&by_hour);
        let by_minute = sort_and_dedup(&by_minute);
        let by_second = sort_and_dedup(&by_second);
        let time_set =
            compute_time_set(self.freq, &by_hour, &by_minute, &by_second);

        let inner = Arc::new(RecurrenceRuleInner {
            freq: self.freq,
            zoned_start,
            civil_start,
            zoned_until: self.until.clone(),
            interval,
            count,
            week_start: self.week_start,
            by_month: sort_and_dedup(&by_month),
            by_week_no: sort_and_dedup(&self.by_week_no),
            by_year_day: sort_and_dedup(&self.by_year_day),
            by_month_day: sort_and_dedup(&by_month_day),
            by_neg_month_day: sort_and_dedup(&by_neg_month_day),
            by_weekday: sort_and_dedup(&by_weekday),
            by_nth_weekday: sort_and_dedup(&by_nth_weekday),
            by_hour,
            by_minute,
            by_second,
            by_easter: sort_and_dedup(&self.by_easter),
            by_set_pos: sort_and_dedup(&self.by_set_pos),
            time_set,
            orig: self.clone(),
        });
        Ok(RecurrenceRule { inner })
    }

    pub fn until(&mut self, until: Zoned) -> &mut RecurrenceRuleBuilder {
        self.until = Some(until);
        self
    }

    /// Sets the maximum number of datetimes the rule will produce. A count
    /// of `0` means "no limit" and is the default.
    pub fn count(&mut self, count: u32) -> &mut RecurrenceRuleBuilder {
        self.count = count;
        self
    }

    pub fn interval(&mut self, interval: i32) -> &mut RecurrenceRuleBuilder {
        self.interval = interval;
        self
    }

    pub fn by_month<I: IntoI8Iter>(
        &mut self,
        months: I,
    ) -> &mut RecurrenceRuleBuilder {
        self.by_month.extend(months.into_i8_iter());
        self
    }

    pub fn by_week_no<I: IntoI8Iter>(
        &mut self,
        weeks: I,
    ) -> &mut RecurrenceRuleBuilder {
        self.by_week_no.extend(weeks.into_i8_iter());
        self
    }

    pub fn by_year_day<I: IntoI16Iter>(
        &mut self,
        days: I,
    ) -> &mut RecurrenceRuleBuilder {
        self.by_year_day.extend(days.into_i16_iter());
        self
    }

    pub fn by_month_day<I: IntoI8Iter>(
        &mut self,
        days: I,
    ) -> &mut RecurrenceRuleBuilder {
        self.by_month_day.extend(days.into_i8_iter());
        self
    }

    pub fn by_week_day<I: IntoByWeekdayIter>(
        &mut self,
        week_days: I,
    ) -> &mut RecurrenceRuleBuilder {
        self.by_week_day.extend(week_days.into_by_weekday_iter());
        self
    }

    pub fn by_hour<I: IntoI8Iter>(
        &mut self,
        hours: I,
    ) -> &mut RecurrenceRuleBuilder {
        self.by_hour.extend(hours.into_i8_iter());
        self
    }

    pub fn by_minute<I: IntoI8Iter>(
        &mut self,
        minutes: I,
    ) -> &mut RecurrenceRuleBuilder {
        self.by_minute.extend(minutes.into_i8_iter());
        self
    }

    pub fn by_second<I: IntoI8Iter>(
        &mut self,
        seconds: I,
    ) -> &mut RecurrenceRuleBuilder {
        self.by_second.extend(seconds.into_i8_iter());
        self
    }

    /// Adds offsets, in days, relative to Easter Sunday. An offset of `0`
    /// recurs on Easter itself, `1` on Easter Monday and `-2` on Good
    /// Friday.
    ///
    /// This rule part is an extension of RFC 5545 supported by the usual
    /// recurrence libraries.
    pub fn by_easter<I: IntoI16Iter>(
        &mut self,
        offsets: I,
    ) -> &mut RecurrenceRuleBuilder {
        self.by_easter.extend(offsets.into_i16_iter());
        self
    }

    pub fn by_set_position<I: IntoI32Iter>(
        &mut self,
        positions: I,
    ) -> &mut RecurrenceRuleBuilder {
        self.by_set_pos.extend(positions.into_i32_iter());
        self
    }

    pub fn week_start(
        &mut self,
        weekday: Weekday,
    ) -> &mut RecurrenceRuleBuilder {
        self.week_start = weekday;
        self
    }
}

/// Computes the precomputed time-set: the sorted times of day attached to
/// every candidate day. Only frequencies coarser than hourly have one; the
/// finer frequencies derive their time-sets from the cursor as it moves.
pub(crate) fn compute_time_set(
    freq: Frequency,
    by_hour: &[i8],
    by_minute: &[i8],
    by_second: &[i8],
) -> Box<[Time]> {
    if freq >= Frequency::Hourly {
        return Box::default();
    }
    let mut times = vec![];
    for &hour in by_hour {
        for &minute in by_minute {
            for &second in by_second {
                times.push(time(hour, minute, second, 0));
            }
        }
    }
    times.sort();
    times.into_boxed_slice()
}

/// Truncates a zoned datetime to whole seconds.
pub(crate) fn truncate_to_seconds(zdt: &Zoned) -> Zoned {
    // OK because dropping fractional seconds cannot move a valid timestamp
    // out of range.
    let ts = Timestamp::from_second(zdt.timestamp().as_second()).unwrap();
    ts.to_zoned(zdt.time_zone().clone())
}

/// The frequency at which a recurrence rule repeats.
///
/// Frequencies are ordered from coarsest to finest, so e.g.
/// `Frequency::Yearly < Frequency::Daily`.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Frequency {
    Yearly,
    Monthly,
    Weekly,
    Daily,
    Hourly,
    Minutely,
    Secondly,
}

impl std::str::FromStr for Frequency {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Frequency> {
        use self::Frequency::*;

        let freq = match &*s.to_lowercase() {
            "yearly" | "year" | "yr" | "y" => Yearly,
            "monthly" | "month" | "mo" => Monthly,
            "weekly" | "week" | "wk" | "w" => Weekly,
            "daily" | "day" | "d" => Daily,
            "hourly" | "hour" | "hr" | "h" => Hourly,
            "minutely" | "minute" | "min" | "m" => Minutely,
            "secondly" | "second" | "sec" | "s" => Secondly,
            unk => anyhow::bail!("unrecognized frequency: `{unk}`"),
        };
        Ok(freq)
    }
}

/// A type describing "day of week" inputs.
///
/// A weekday either matches any occurrence of itself within the rule's
/// period, or carries a position `nth` selecting a single occurrence within
/// the enclosing month or year: `nth: 3` is the third occurrence from the
/// front, `nth: -1` the last one. A position of `0` is the same as no
/// position. Positions are only meaningful at yearly and monthly
/// frequencies; at finer frequencies the position is ignored.
///
/// This implements `Ord` even though the actual order of weekdays cannot be
/// determined unless the start of the week is known (which is commonly
/// either Sunday or Monday, but RFC 5545 lets any day be the start).
/// However, we implement `Ord` to make it easy to sort and de-duplicate
/// collections containing a `ByWeekday`. We never rely on its ordering for
/// generating datetimes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ByWeekday {
    Any(Weekday),
    Numbered { nth: i8, weekday: Weekday },
}

impl ByWeekday {
    fn sort_key(&self) -> (i8, i8) {
        match *self {
            ByWeekday::Any(weekday) => (0, weekday.to_monday_zero_offset()),
            ByWeekday::Numbered { nth, weekday } => {
                (nth, weekday.to_monday_zero_offset())
            }
        }
    }
}

impl Ord for ByWeekday {
    fn cmp(&self, other: &ByWeekday) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl PartialOrd for ByWeekday {
    fn partial_cmp(&self, other: &ByWeekday) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A trait that permits flexibly specifying a sequence of `i8` integers.
///
/// This trait is used for builder methods on `RecurrenceRuleBuilder`. It
/// permits callers to provide integers in a number of flexible ways:
///
/// * A single integer: `5`
/// * An array of integers: `[1, 3, 5]`.
/// * A single range of integers: `5..8` or `5..=8`.
/// * An array of ranges of integers: `[5..=10, 15..=20]`.
/// * A `Vec` of integers.
///
/// # Design
///
/// The reason this trait _and_ its `i16`/`i32` siblings exist is to make
/// specifying a sequence more ergonomic. A single trait with an associated
/// integer type would be implemented for several integer types at once, and
/// then the type of the `5` in `builder.by_month(5)` could not be inferred
/// unambiguously.
pub trait IntoI8Iter {
    /// Creates an iterator over all integers in this sequence.
    fn into_i8_iter(self) -> impl Iterator<Item = i8>;
}

/// A trait that permits flexibly specifying a sequence of `i16` integers.
///
/// See [`IntoI8Iter`] for the supported input shapes and the reasoning
/// behind having one trait per integer width.
pub trait IntoI16Iter {
    /// Creates an iterator over all integers in this sequence.
    fn into_i16_iter(self) -> impl Iterator<Item = i16>;
}

/// A trait that permits flexibly specifying a sequence of `i32` integers.
///
/// See [`IntoI8Iter`] for the supported input shapes and the reasoning
/// behind having one trait per integer width.
pub trait IntoI32Iter {
    /// Creates an iterator over all integers in this sequence.
    fn into_i32_iter(self) -> impl Iterator<Item = i32>;
}

impl IntoI8Iter for i8 {
    fn into_i8_iter(self) -> impl Iterator<Item = i8> {
        std::iter::once(self)
    }
}

impl IntoI16Iter for i16 {
    fn into_i16_iter(self) -> impl Iterator<Item = i16> {
        std::iter::once(self)
    }
}

impl IntoI32Iter for i32 {
    fn into_i32_iter(self) -> impl Iterator<Item = i32> {
        std::iter::once(self)
    }
}

impl IntoI8Iter for Range<i8> {
    fn into_i8_iter(self) -> impl Iterator<Item = i8> {
        self.into_iter()
    }
}

impl IntoI16Iter for Range<i16> {
    fn into_i16_iter(self) -> impl Iterator<Item = i16> {
        self.into_iter()
    }
}

impl IntoI32Iter for Range<i32> {
    fn into_i32_iter(self) -> impl Iterator<Item = i32> {
        self.into_iter()
    }
}

impl IntoI8Iter for RangeInclusive<i8> {
    fn into_i8_iter(self) -> impl Iterator<Item = i8> {
        self.into_iter()
    }
}

impl IntoI16Iter for RangeInclusive<i16> {
    fn into_i16_iter(self) -> impl Iterator<Item = i16> {
        self.into_iter()
    }
}

impl IntoI32Iter for RangeInclusive<i32> {
    fn into_i32_iter(self) -> impl Iterator<Item = i32> {
        self.into_iter()
    }
}

impl<const N: usize> IntoI8Iter for [i8; N] {
    fn into_i8_iter(self) -> impl Iterator<Item = i8> {
        self.into_iter()
    }
}

impl<const N: usize> IntoI16Iter for [i16; N] {
    fn into_i16_iter(self) -> impl Iterator<Item = i16> {
        self.into_iter()
    }
}

impl<const N: usize> IntoI32Iter for [i32; N] {
    fn into_i32_iter(self) -> impl Iterator<Item = i32> {
        self.into_iter()
    }
}

impl<const N: usize> IntoI8Iter for [Range<i8>; N] {
    fn into_i8_iter(self) -> impl Iterator<Item = i8> {
        self.into_iter().flatten()
    }
}

impl<const N: usize> IntoI16Iter for [Range<i16>; N] {
    fn into_i16_iter(self) -> impl Iterator<Item = i16> {
        self.into_iter().flatten()
    }
}

impl<const N: usize> IntoI32Iter for [Range<i32>; N] {
    fn into_i32_iter(self) -> impl Iterator<Item = i32> {
        self.into_iter().flatten()
    }
}

impl<const N: usize> IntoI8Iter for [RangeInclusive<i8>; N] {
    fn into_i8_iter(self) -> impl Iterator<Item = i8> {
        self.into_iter().flatten()
    }
}

impl<const N: usize> IntoI16Iter for [RangeInclusive<i16>; N] {
    fn into_i16_iter(self) -> impl Iterator<Item = i16> {
        self.into_iter().flatten()
    }
}

impl<const N: usize> IntoI32Iter for [RangeInclusive<i32>; N] {
    fn into_i32_iter(self) -> impl Iterator<Item = i32> {
        self.into_iter().flatten()
    }
}

impl IntoI8Iter for Vec<i8> {
    fn into_i8_iter(self) -> impl Iterator<Item = i8> {
        self.into_iter()
    }
}

impl IntoI16Iter for Vec<i16> {
    fn into_i16_iter(self) -> impl Iterator<Item = i16> {
        self.into_iter()
    }
}

impl IntoI32Iter for Vec<i32> {
    fn into_i32_iter(self) -> impl Iterator<Item = i32> {
        self.into_iter()
    }
}

/// A trait that permits flexibly specifying a sequence of weekdays.
///
/// This trait is primarily used for the `RecurrenceRuleBuilder::by_week_day`
/// builder method. It permits callers to provide weekdays in a number of
/// flexible ways:
///
/// * Directly via `ByWeekday::Numbered { nth: 3, weekday: Weekday::Monday }`.
/// * As just any weekday via `Weekday::Monday`.
/// * As a positioned weekday via `(3, Weekday::Monday)`.
/// * As a range of weekdays via `Weekday::Monday..=Weekday::Wednesday`.
/// * As an array of weekdays via `[Weekday::Monday, Weekday::Friday]`.
/// * As an array of positioned weekdays via
///   `[(2, Weekday::Monday), (1, Weekday::Friday)]`.
/// * As a `Vec` of any of the above entry forms.
pub trait IntoByWeekdayIter {
    fn into_by_weekday_iter(self) -> impl Iterator<Item = ByWeekday>;
}

impl IntoByWeekdayIter for ByWeekday {
    fn into_by_weekday_iter(self) -> impl Iterator<Item = ByWeekday> {
        std::iter::once(self)
    }
}

impl IntoByWeekdayIter for Weekday {
    fn into_by_weekday_iter(self) -> impl Iterator<Item = ByWeekday> {
        std::iter::once(ByWeekday::Any(self))
    }
}

impl IntoByWeekdayIter for (i8, Weekday) {
    fn into_by_weekday_iter(self) -> impl Iterator<Item = ByWeekday> {
        let (nth, weekday) = self;
        std::iter::once(ByWeekday::Numbered { nth, weekday })
    }
}

impl IntoByWeekdayIter for RangeInclusive<Weekday> {
    fn into_by_weekday_iter(self) -> impl Iterator<Item = ByWeekday> {
        let (start, end) = (*self.start(), *self.end());
        // OK because `Weekday::until` guarantees `0..=6`.
        // And add `1` because this is an inclusive range.
        let count = 1 + usize::try_from(start.until(end)).unwrap();
        start.cycle_forward().take(count).map(ByWeekday::Any)
    }
}

impl<const N: usize> IntoByWeekdayIter for [ByWeekday; N] {
    fn into_by_weekday_iter(self) -> impl Iterator<Item = ByWeekday> {
        self.into_iter()
    }
}

impl<const N: usize> IntoByWeekdayIter for [Weekday; N] {
    fn into_by_weekday_iter(self) -> impl Iterator<Item = ByWeekday> {
        self.into_iter().flat_map(|any| any.into_by_weekday_iter())
    }
}

impl<const N: usize> IntoByWeekdayIter for [(i8, Weekday); N] {
    fn into_by_weekday_iter(self) -> impl Iterator<Item = ByWeekday> {
        self.into_iter().flat_map(|numbered| numbered.into_by_weekday_iter())
    }
}

impl<const N: usize> IntoByWeekdayIter for [RangeInclusive<Weekday>; N] {
    fn into_by_weekday_iter(self) -> impl Iterator<Item = ByWeekday> {
        self.into_iter().flat_map(|any| any.into_by_weekday_iter())
    }
}

impl<T: IntoByWeekdayIter> IntoByWeekdayIter for Vec<T> {
    fn into_by_weekday_iter(self) -> impl Iterator<Item = ByWeekday> {
        self.into_iter().flat_map(|entry| entry.into_by_weekday_iter())
    }
}
