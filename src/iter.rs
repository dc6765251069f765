use std::collections::VecDeque;

use jiff::{
    ToSpan, Zoned,
    civil::{Date, DateTime, date},
};

use crate::{
    info::{IterInfo, py_divmod, py_subscript},
    rule::{Frequency, RecurrenceRule},
};

/// The largest year the engine will step into. A rule whose cursor moves
/// past this year is exhausted, not an error.
const MAXYEAR: i32 = 9999;

/// A bound on the number of steps the hourly/minutely/secondly cursor loops
/// may take while hunting for a time that satisfies the BYHOUR, BYMINUTE
/// and BYSECOND parts. The hunt visits at most one full cycle of distinct
/// times of day (86400 at secondly frequency) before it provably starts
/// repeating, so reaching this bound means the parts are unsatisfiable for
/// the rule's interval.
const MAX_TIME_HUNT: u32 = 100_000;

/// An iterator over the datetimes of a recurrence rule, in strictly
/// increasing order.
///
/// The iterator owns a cursor into the rule's timeline plus the per-year
/// derived tables, and drains one period's worth of occurrences at a time
/// into a small buffer.
#[derive(Clone, Debug)]
pub struct RecurrenceIter<'r> {
    rule: &'r RecurrenceRule,
    info: IterInfo<'r>,
    year: i32,
    month: i8,
    day: i64,
    hour: i64,
    minute: i64,
    second: i64,
    // Only consulted and maintained by the weekly stepper.
    weekday: i64,
    time_set: Vec<jiff::civil::Time>,
    remain: VecDeque<Zoned>,
    remaining_count: Option<u32>,
    finished: bool,
}

impl<'r> RecurrenceIter<'r> {
    pub(crate) fn new(rule: &'r RecurrenceRule) -> RecurrenceIter<'r> {
        let r = rule.inner();
        let start = r.civil_start;
        let info =
            IterInfo::new(rule, i32::from(start.year()), start.month());
        let time_set = if r.freq < Frequency::Hourly {
            r.time_set.to_vec()
        } else {
            // When the starting time of day violates one of the time
            // parts, the first periods produce nothing until the stepper
            // reaches a conforming time and rebuilds the set.
            let violates = !r.by_hour.is_empty()
                && !r.by_hour.contains(&start.hour())
                || r.freq >= Frequency::Minutely
                    && !r.by_minute.is_empty()
                    && !r.by_minute.contains(&start.minute())
                || r.freq >= Frequency::Secondly
                    && !r.by_second.is_empty()
                    && !r.by_second.contains(&start.second());
            if violates {
                vec![]
            } else {
                info.time_set(
                    r.freq,
                    i64::from(start.hour()),
                    i64::from(start.minute()),
                    i64::from(start.second()),
                )
            }
        };
        RecurrenceIter {
            rule,
            info,
            year: i32::from(start.year()),
            month: start.month(),
            day: i64::from(start.day()),
            hour: i64::from(start.hour()),
            minute: i64::from(start.minute()),
            second: i64::from(start.second()),
            weekday: i64::from(start.weekday().to_monday_zero_offset()),
            time_set,
            remain: VecDeque::new(),
            remaining_count: r.count,
            finished: false,
        }
    }

    /// Fills the emit buffer with the next period that produces anything,
    /// advancing the cursor period by period until something is produced or
    /// the rule is exhausted.
    fn generate(&mut self) {
        let r = self.rule.inner();
        while self.remain.is_empty() {
            if self.finished {
                return;
            }

            // Build this period's candidate days and intersect them with
            // every active filter.
            let mut day_set =
                self.info.day_set(r.freq, self.month, self.day);
            let mut filtered_any = false;
            for i in day_set.start..day_set.end {
                if day_set.days[i] && self.rejected(i) {
                    day_set.days[i] = false;
                    filtered_any = true;
                }
            }

            // Combine the surviving days with the time-set, in emission
            // order.
            let mut candidates: Vec<DateTime> = vec![];
            let mut overflowed = false;
            if !r.by_set_pos.is_empty() && !self.time_set.is_empty() {
                let survivors: Vec<usize> = (day_set.start..day_set.end)
                    .filter(|&i| day_set.days[i])
                    .collect();
                for &pos in r.by_set_pos.iter() {
                    let (day_pos, time_pos) = if pos < 0 {
                        py_divmod(i64::from(pos), self.time_set.len() as i64)
                    } else {
                        py_divmod(
                            i64::from(pos) - 1,
                            self.time_set.len() as i64,
                        )
                    };
                    let Some(i) = py_subscript(&survivors, day_pos) else {
                        continue;
                    };
                    let Some(date) = self.date_of(i) else {
                        overflowed = true;
                        continue;
                    };
                    let dt = DateTime::from_parts(
                        date,
                        self.time_set[time_pos as usize],
                    );
                    if !candidates.contains(&dt) {
                        candidates.push(dt);
                    }
                }
                candidates.sort();
            } else {
                'days: for i in day_set.start..day_set.end {
                    if !day_set.days[i] {
                        continue;
                    }
                    let Some(date) = self.date_of(i) else {
                        overflowed = true;
                        break 'days;
                    };
                    for &time in self.time_set.iter() {
                        candidates.push(DateTime::from_parts(date, time));
                    }
                }
            }

            // Emit, respecting the start floor, the until ceiling and the
            // count budget.
            let tz = self.rule.time_zone();
            for dt in candidates {
                let Ok(zdt) = tz.to_ambiguous_zoned(dt).compatible() else {
                    // The candidate cannot be represented as an instant,
                    // which can only happen at the very edge of the
                    // supported datetime range.
                    self.finished = true;
                    return;
                };
                if let Some(until) = r.zoned_until.as_ref() {
                    if &zdt > until {
                        self.finished = true;
                        return;
                    }
                }
                if zdt >= r.zoned_start {
                    self.remain.push_back(zdt);
                    if let Some(count) = self.remaining_count.as_mut() {
                        *count -= 1;
                        if *count == 0 {
                            self.finished = true;
                            return;
                        }
                    }
                }
            }
            if overflowed {
                self.finished = true;
                return;
            }

            // Advance the cursor by the interval in the active frequency
            // dimension.
            let interval = i64::from(r.interval);
            let mut fix_day = false;
            match r.freq {
                Frequency::Yearly => {
                    let year = i64::from(self.year) + interval;
                    if year > i64::from(MAXYEAR) {
                        self.finished = true;
                        return;
                    }
                    self.year = year as i32;
                    self.info.rebuild(self.year, self.month);
                }
                Frequency::Monthly => {
                    let mut month = i64::from(self.month) + interval;
                    if month > 12 {
                        let (div, rem) = py_divmod(month, 12);
                        month = rem;
                        let mut year = i64::from(self.year) + div;
                        if month == 0 {
                            month = 12;
                            year -= 1;
                        }
                        if year > i64::from(MAXYEAR) {
                            self.finished = true;
                            return;
                        }
                        self.year = year as i32;
                    }
                    self.month = month as i8;
                    self.info.rebuild(self.year, self.month);
                }
                Frequency::Weekly => {
                    // Jump to the week start of the period `interval`
                    // weeks ahead.
                    let wkst = i64::from(
                        r.week_start.to_monday_zero_offset(),
                    );
                    if wkst > self.weekday {
                        self.day +=
                            -(self.weekday + 1 + (6 - wkst)) + interval * 7;
                    } else {
                        self.day += -(self.weekday - wkst) + interval * 7;
                    }
                    self.weekday = wkst;
                    fix_day = true;
                }
                Frequency::Daily => {
                    self.day += interval;
                    fix_day = true;
                }
                Frequency::Hourly => {
                    if filtered_any {
                        // The whole day was rejected, so skip to one step
                        // before the next day boundary instead of walking
                        // it hour by hour.
                        self.hour +=
                            ((23 - self.hour) / interval) * interval;
                    }
                    let mut hunt = 0;
                    loop {
                        self.hour += interval;
                        let (div, rem) = py_divmod(self.hour, 24);
                        if div != 0 {
                            self.hour = rem;
                            self.day += div;
                            fix_day = true;
                        }
                        if r.by_hour.is_empty()
                            || r.by_hour.contains(&(self.hour as i8))
                        {
                            break;
                        }
                        hunt += 1;
                        if hunt >= MAX_TIME_HUNT {
                            self.unsatisfiable_time_parts();
                            return;
                        }
                    }
                    self.time_set = self.info.time_set(
                        r.freq,
                        self.hour,
                        self.minute,
                        self.second,
                    );
                }
                Frequency::Minutely => {
                    if filtered_any {
                        // Skip to one step before the next day boundary.
                        self.minute += ((1439
                            - (self.hour * 60 + self.minute))
                            / interval)
                            * interval;
                    }
                    let mut hunt = 0;
                    loop {
                        self.minute += interval;
                        let (div, rem) = py_divmod(self.minute, 60);
                        if div != 0 {
                            self.minute = rem;
                            self.hour += div;
                            let (div, rem) = py_divmod(self.hour, 24);
                            if div != 0 {
                                self.hour = rem;
                                self.day += div;
                                fix_day = true;
                            }
                        }
                        if (r.by_hour.is_empty()
                            || r.by_hour.contains(&(self.hour as i8)))
                            && (r.by_minute.is_empty()
                                || r.by_minute
                                    .contains(&(self.minute as i8)))
                        {
                            break;
                        }
                        hunt += 1;
                        if hunt >= MAX_TIME_HUNT {
                            self.unsatisfiable_time_parts();
                            return;
                        }
                    }
                    self.time_set = self.info.time_set(
                        r.freq,
                        self.hour,
                        self.minute,
                        self.second,
                    );
                }
                Frequency::Secondly => {
                    if filtered_any {
                        // Skip to one step before the next day boundary.
                        self.second += ((86399
                            - (self.hour * 3600
                                + self.minute * 60
                                + self.second))
                            / interval)
                            * interval;
                    }
                    let mut hunt = 0;
                    loop {
                        self.second += interval;
                        let (div, rem) = py_divmod(self.second, 60);
                        if div != 0 {
                            self.second = rem;
                            self.minute += div;
                            let (div, rem) = py_divmod(self.minute, 60);
                            if div != 0 {
                                self.minute = rem;
                                self.hour += div;
                                let (div, rem) = py_divmod(self.hour, 24);
                                if div != 0 {
                                    self.hour = rem;
                                    self.day += div;
                                    fix_day = true;
                                }
                            }
                        }
                        if (r.by_hour.is_empty()
                            || r.by_hour.contains(&(self.hour as i8)))
                            && (r.by_minute.is_empty()
                                || r.by_minute
                                    .contains(&(self.minute as i8)))
                            && (r.by_second.is_empty()
                                || r.by_second
                                    .contains(&(self.second as i8)))
                        {
                            break;
                        }
                        hunt += 1;
                        if hunt >= MAX_TIME_HUNT {
                            self.unsatisfiable_time_parts();
                            return;
                        }
                    }
                    self.time_set = self.info.time_set(
                        r.freq,
                        self.hour,
                        self.minute,
                        self.second,
                    );
                }
            }

            // Roll an overshot day number into the following months (and
            // possibly years).
            if fix_day && self.day > 28 {
                let mut dim = days_in_month(self.year, self.month);
                if self.day > dim {
                    while self.day > dim {
                        self.day -= dim;
                        self.month += 1;
                        if self.month == 13 {
                            self.month = 1;
                            self.year += 1;
                            if self.year > MAXYEAR {
                                self.finished = true;
                                return;
                            }
                        }
                        dim = days_in_month(self.year, self.month);
                    }
                    self.info.rebuild(self.year, self.month);
                }
            }
        }
    }

    /// Returns true when any active filter rejects the given ordinal day.
    fn rejected(&self, i: usize) -> bool {
        let r = self.rule.inner();
        let info = &self.info;
        if !r.by_month.is_empty()
            && !r.by_month.contains(&info.month_mask()[i])
        {
            return true;
        }
        if let Some(mask) = info.week_no_mask() {
            if !mask[i] {
                return true;
            }
        }
        if !r.by_weekday.is_empty()
            && !r.by_weekday.contains(&info.weekday_mask()[i])
        {
            return true;
        }
        if let Some(mask) = info.nth_weekday_mask() {
            if !mask[i] {
                return true;
            }
        }
        if let Some(mask) = info.easter_mask() {
            if !mask[i] {
                return true;
            }
        }
        if (!r.by_month_day.is_empty() || !r.by_neg_month_day.is_empty())
            && !r.by_month_day.contains(&info.month_day_mask()[i])
            && !r
                .by_neg_month_day
                .contains(&info.neg_month_day_mask()[i])
        {
            return true;
        }
        if !r.by_year_day.is_empty() {
            let year_len = info.year_len() as i64;
            let next_year_len = info.next_year_len() as i64;
            let i = i as i64;
            // Beyond the year's end, a weekly window's days are matched
            // against the next year's ordinals.
            let (positive, negative) = if i < year_len {
                (i + 1, i - year_len)
            } else {
                (i + 1 - year_len, i - year_len - next_year_len)
            };
            if !r.by_year_day.contains(&(positive as i16))
                && !r.by_year_day.contains(&(negative as i16))
            {
                return true;
            }
        }
        false
    }

    /// Returns the date of the given ordinal day of the current year, or
    /// `None` past the supported range.
    fn date_of(&self, i: usize) -> Option<Date> {
        self.info.first_day_of_year().checked_add((i as i32).days()).ok()
    }

    fn unsatisfiable_time_parts(&mut self) {
        log::warn!(
            "giving up on recurrence rule whose time-of-day parts can \
             never be satisfied at interval {}",
            self.rule.inner().interval,
        );
        self.finished = true;
    }
}

impl<'r> Iterator for RecurrenceIter<'r> {
    type Item = Zoned;

    fn next(&mut self) -> Option<Zoned> {
        if self.remain.is_empty() && !self.finished {
            self.generate();
        }
        self.remain.pop_front()
    }
}

impl<'r> std::iter::FusedIterator for RecurrenceIter<'r> {}

fn days_in_month(year: i32, month: i8) -> i64 {
    // In range because callers keep the year within the supported bounds.
    i64::from(date(year as i16, month, 1).days_in_month())
}

/// Drains the datetimes of `it` falling between `after` and `before`,
/// exclusive on both ends (inclusive when `inclusive` is set).
pub(crate) fn between(
    it: impl Iterator<Item = Zoned>,
    after: &Zoned,
    before: &Zoned,
    inclusive: bool,
) -> Vec<Zoned> {
    let mut results = vec![];
    for zdt in it {
        if inclusive {
            if &zdt > before {
                break;
            }
            if &zdt >= after {
                results.push(zdt);
            }
        } else {
            if &zdt >= before {
                break;
            }
            if &zdt > after {
                results.push(zdt);
            }
        }
    }
    results
}

/// Returns the last datetime of `it` before `dt` (or at `dt` when
/// `inclusive` is set), if one exists.
pub(crate) fn before(
    it: impl Iterator<Item = Zoned>,
    dt: &Zoned,
    inclusive: bool,
) -> Option<Zoned> {
    let mut last = None;
    for zdt in it {
        if if inclusive { &zdt > dt } else { &zdt >= dt } {
            break;
        }
        last = Some(zdt);
    }
    last
}

/// Returns the first datetime of `it` after `dt` (or at `dt` when
/// `inclusive` is set), if one exists.
pub(crate) fn after(
    mut it: impl Iterator<Item = Zoned>,
    dt: &Zoned,
    inclusive: bool,
) -> Option<Zoned> {
    it.find(|zdt| if inclusive { zdt >= dt } else { zdt > dt })
}
