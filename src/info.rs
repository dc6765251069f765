use jiff::civil::{Date, Time, date, time};

use crate::{
    easter,
    mask::{
        M365_MASK, M365_RANGE, M366_MASK, M366_RANGE, MDAY365_MASK,
        MDAY366_MASK, NMDAY365_MASK, NMDAY366_MASK, WDAY_MASK,
    },
    rule::{Frequency, RecurrenceRule},
};

// The per-iteration state derived from the rule and the cursor's current
// year and month. Most of it is just a selection of the right precomputed
// tables for the year's length, rotated to the year's starting weekday. The
// three optional masks are the only parts that require real work, and they
// are rebuilt as lazily as possible: the week-number and Easter masks only
// when the year changes, the positioned-weekday mask also when the month
// changes (its ranges are month-scoped at monthly frequency).

#[derive(Clone, Debug)]
pub(crate) struct IterInfo<'r> {
    rule: &'r RecurrenceRule,
    last_year: i32,
    last_month: i8,
    year_len: usize,
    next_year_len: usize,
    first_day_of_year: Date,
    year_weekday: usize,
    month_mask: &'static [i8],
    month_day_mask: &'static [i8],
    neg_month_day_mask: &'static [i8],
    month_range: &'static [u16; 13],
    weekday_mask: &'static [i8],
    week_no_mask: Option<Vec<bool>>,
    nth_weekday_mask: Option<Vec<bool>>,
    easter_mask: Option<Vec<bool>>,
}

/// The candidate days of one period: an indicator over ordinal days of the
/// year (extended by seven days for weeks that cross into the next year)
/// plus the window the period covers.
#[derive(Clone, Debug)]
pub(crate) struct DaySet {
    pub(crate) days: Vec<bool>,
    pub(crate) start: usize,
    pub(crate) end: usize,
}

impl<'r> IterInfo<'r> {
    pub(crate) fn new(
        rule: &'r RecurrenceRule,
        year: i32,
        month: i8,
    ) -> IterInfo<'r> {
        let mut info = IterInfo {
            rule,
            // Not a real year, so the first rebuild recomputes everything.
            last_year: i32::MIN,
            last_month: 0,
            year_len: 0,
            next_year_len: 0,
            // Overwritten by the rebuild below.
            first_day_of_year: date(1, 1, 1),
            year_weekday: 0,
            month_mask: &M365_MASK,
            month_day_mask: &MDAY365_MASK,
            neg_month_day_mask: &NMDAY365_MASK,
            month_range: &M365_RANGE,
            weekday_mask: &WDAY_MASK,
            week_no_mask: None,
            nth_weekday_mask: None,
            easter_mask: None,
        };
        info.rebuild(year, month);
        info
    }

    /// Brings the derived tables up to date with the cursor. Callers must
    /// have already bounded `year` to the engine's supported range.
    pub(crate) fn rebuild(&mut self, year: i32, month: i8) {
        let rule = self.rule.inner();
        if year != self.last_year {
            log::trace!("rebuilding year info for year {year}");
            self.rebuild_year(year);
        }
        if !rule.by_nth_weekday.is_empty()
            && (month != self.last_month || year != self.last_year)
        {
            self.rebuild_nth_weekday_mask(month);
        }
        self.last_year = year;
        self.last_month = month;
    }

    fn rebuild_year(&mut self, year: i32) {
        let rule = self.rule.inner();
        self.year_len = 365 + leap(year) as usize;
        self.next_year_len = 365 + leap(year + 1) as usize;
        // In range because the stepper finishes before moving past the
        // maximum supported year.
        self.first_day_of_year = date(year as i16, 1, 1);
        self.year_weekday =
            self.first_day_of_year.weekday().to_monday_zero_offset() as usize;
        self.weekday_mask = &WDAY_MASK[self.year_weekday..];
        if self.year_len == 365 {
            self.month_mask = &M365_MASK;
            self.month_day_mask = &MDAY365_MASK;
            self.neg_month_day_mask = &NMDAY365_MASK;
            self.month_range = &M365_RANGE;
        } else {
            self.month_mask = &M366_MASK;
            self.month_day_mask = &MDAY366_MASK;
            self.neg_month_day_mask = &NMDAY366_MASK;
            self.month_range = &M366_RANGE;
        }
        self.week_no_mask = (!rule.by_week_no.is_empty())
            .then(|| self.build_week_no_mask(year));
        self.easter_mask = (!rule.by_easter.is_empty())
            .then(|| self.build_easter_mask(year));
    }

    /// Builds the indicator of ordinal days belonging to a week listed in
    /// BYWEEKNO. Week numbering follows ISO 8601 semantics generalized to
    /// any week start: week 1 is the first week with at least four days in
    /// the year.
    fn build_week_no_mask(&self, year: i32) -> Vec<bool> {
        let rule = self.rule.inner();
        let mut mask = vec![false; self.year_len + 7];
        let wkst = rule.week_start.to_monday_zero_offset() as i64;
        let year_weekday = self.year_weekday as i64;
        let year_len = self.year_len as i64;

        let first_week_start = pymod(7 - year_weekday + wkst, 7);
        let (week_offset, week_year_len);
        if first_week_start >= 4 {
            // Week 1 starts in the previous year, so this year's week-year
            // also covers the days it borrows from the previous year.
            week_offset = 0;
            week_year_len = year_len + pymod(year_weekday - wkst, 7);
        } else {
            week_offset = first_week_start;
            week_year_len = year_len - first_week_start;
        }
        let (div, rem) = py_divmod(week_year_len, 7);
        let num_weeks = div + rem / 4;

        for &n in rule.by_week_no.iter() {
            let mut n = n as i64;
            if n < 0 {
                n += num_weeks + 1;
            }
            if !(0 < n && n <= num_weeks) {
                continue;
            }
            let mut i;
            if n > 1 {
                i = week_offset + (n - 1) * 7;
                if week_offset != first_week_start {
                    i -= 7 - first_week_start;
                }
            } else {
                i = week_offset;
            }
            for _ in 0..7 {
                mask[i as usize] = true;
                i += 1;
                if self.weekday_mask[i as usize] as i64 == wkst {
                    break;
                }
            }
        }

        if rule.by_week_no.contains(&1) {
            // Week 1 of the next year can begin in the trailing days of
            // this one.
            let mut i = week_offset + num_weeks * 7;
            if week_offset != first_week_start {
                i -= 7 - first_week_start;
            }
            if i < year_len {
                for _ in 0..7 {
                    mask[i as usize] = true;
                    i += 1;
                    if self.weekday_mask[i as usize] as i64 == wkst {
                        break;
                    }
                }
            }
        }

        if week_offset != 0 {
            // The leading days of this year belong to the previous year's
            // last week. (When `week_offset` is zero, either the year
            // started on the week start or week 1 already borrowed those
            // days, so the previous year's last week contributes nothing.)
            let last_num_weeks;
            if !rule.by_week_no.contains(&-1) {
                let prev_year_len = 365 + leap(year - 1) as i64;
                // January 1 of the previous year, derived by stepping the
                // current year's starting weekday back a whole year.
                let prev_year_weekday =
                    pymod(year_weekday - prev_year_len, 7);
                let prev_first_week_start =
                    pymod(7 - prev_year_weekday + wkst, 7);
                if prev_first_week_start >= 4 {
                    last_num_weeks = 52
                        + pymod(
                            prev_year_len
                                + pymod(prev_year_weekday - wkst, 7),
                            7,
                        ) / 4;
                } else {
                    last_num_weeks =
                        52 + pymod(year_len - week_offset, 7) / 4;
                }
            } else {
                last_num_weeks = -1;
            }
            if rule
                .by_week_no
                .iter()
                .any(|&n| n as i64 == last_num_weeks)
            {
                for value in mask.iter_mut().take(week_offset as usize) {
                    *value = true;
                }
            }
        }
        mask
    }

    /// Builds the indicator of ordinal days selected by a positioned BYDAY
    /// entry. At yearly frequency each BYMONTH month (or the whole year) is
    /// a range; at monthly frequency the current month is the only one.
    fn rebuild_nth_weekday_mask(&mut self, month: i8) {
        let rule = self.rule.inner();
        let mut ranges: Vec<(i64, i64)> = vec![];
        match rule.freq {
            Frequency::Yearly => {
                if rule.by_month.is_empty() {
                    ranges.push((0, self.year_len as i64));
                } else {
                    for &m in rule.by_month.iter() {
                        ranges.push((
                            self.month_range[m as usize - 1] as i64,
                            self.month_range[m as usize] as i64,
                        ));
                    }
                }
            }
            Frequency::Monthly => {
                ranges.push((
                    self.month_range[month as usize - 1] as i64,
                    self.month_range[month as usize] as i64,
                ));
            }
            // Positioned weekdays are demoted to plain ones at any other
            // frequency during normalization.
            _ => return,
        }
        let mut mask = vec![false; self.year_len];
        for &(first, end) in ranges.iter() {
            let last = end - 1;
            for &nth_weekday in rule.by_nth_weekday.iter() {
                let weekday = nth_weekday.weekday as i64;
                let n = nth_weekday.nth as i64;
                let i = if n > 0 {
                    // Advance to the first occurrence of the weekday, then
                    // forward by whole weeks.
                    first
                        + pymod(
                            7 - self.weekday_mask[first as usize] as i64
                                + weekday,
                            7,
                        )
                        + (n - 1) * 7
                } else {
                    // Recede to the last occurrence of the weekday, then
                    // backward by whole weeks.
                    last - pymod(
                        self.weekday_mask[last as usize] as i64 - weekday,
                        7,
                    ) + (n + 1) * 7
                };
                if first <= i && i <= last {
                    mask[i as usize] = true;
                }
            }
        }
        self.nth_weekday_mask = Some(mask);
    }

    fn build_easter_mask(&self, year: i32) -> Vec<bool> {
        let rule = self.rule.inner();
        let mut mask = vec![false; self.year_len + 7];
        let easter_day = easter::ordinal(year as i16);
        for &offset in rule.by_easter.iter() {
            let i = easter_day + offset as i64;
            if 0 <= i && (i as usize) < mask.len() {
                mask[i as usize] = true;
            }
        }
        mask
    }

    /// Returns the window of candidate ordinal days for one period at the
    /// given frequency and cursor position.
    pub(crate) fn day_set(
        &self,
        freq: Frequency,
        month: i8,
        day: i64,
    ) -> DaySet {
        match freq {
            Frequency::Yearly => DaySet {
                days: vec![true; self.year_len],
                start: 0,
                end: self.year_len,
            },
            Frequency::Monthly => {
                let mut days = vec![false; self.year_len];
                let start = self.month_range[month as usize - 1] as usize;
                let end = self.month_range[month as usize] as usize;
                for value in days[start..end].iter_mut() {
                    *value = true;
                }
                DaySet { days, start, end }
            }
            Frequency::Weekly => {
                // A weekly window can run past December 31, which is what
                // the seven day tail of every mask is for.
                let mut days = vec![false; self.year_len + 7];
                let wkst =
                    self.rule.inner().week_start.to_monday_zero_offset();
                let start = self.ordinal(month, day);
                let mut i = start;
                for _ in 0..7 {
                    days[i] = true;
                    i += 1;
                    if self.weekday_mask[i] == wkst {
                        break;
                    }
                }
                DaySet { days, start, end: i }
            }
            _ => {
                let mut days = vec![false; self.year_len];
                let i = self.ordinal(month, day);
                days[i] = true;
                DaySet { days, start: i, end: i + 1 }
            }
        }
    }

    /// Returns the times of day to attach to each candidate day, at
    /// frequencies fine enough that the set depends on the cursor. (Coarser
    /// frequencies use the time-set precomputed on the rule.)
    pub(crate) fn time_set(
        &self,
        freq: Frequency,
        hour: i64,
        minute: i64,
        second: i64,
    ) -> Vec<Time> {
        let rule = self.rule.inner();
        let mut times = vec![];
        match freq {
            Frequency::Hourly => {
                for &m in rule.by_minute.iter() {
                    for &s in rule.by_second.iter() {
                        times.push(time(hour as i8, m, s, 0));
                    }
                }
            }
            Frequency::Minutely => {
                for &s in rule.by_second.iter() {
                    times.push(time(hour as i8, minute as i8, s, 0));
                }
            }
            Frequency::Secondly => {
                times.push(time(hour as i8, minute as i8, second as i8, 0));
            }
            _ => {}
        }
        times.sort();
        times
    }

    /// Returns the zero-based ordinal day of the given month and day within
    /// the current year.
    fn ordinal(&self, month: i8, day: i64) -> usize {
        self.month_range[month as usize - 1] as usize + (day as usize - 1)
    }

    pub(crate) fn year_len(&self) -> usize {
        self.year_len
    }

    pub(crate) fn next_year_len(&self) -> usize {
        self.next_year_len
    }

    pub(crate) fn first_day_of_year(&self) -> Date {
        self.first_day_of_year
    }

    pub(crate) fn month_mask(&self) -> &[i8] {
        self.month_mask
    }

    pub(crate) fn month_day_mask(&self) -> &[i8] {
        self.month_day_mask
    }

    pub(crate) fn neg_month_day_mask(&self) -> &[i8] {
        self.neg_month_day_mask
    }

    pub(crate) fn weekday_mask(&self) -> &[i8] {
        self.weekday_mask
    }

    pub(crate) fn week_no_mask(&self) -> Option<&[bool]> {
        self.week_no_mask.as_deref()
    }

    pub(crate) fn nth_weekday_mask(&self) -> Option<&[bool]> {
        self.nth_weekday_mask.as_deref()
    }

    pub(crate) fn easter_mask(&self) -> Option<&[bool]> {
        self.easter_mask.as_deref()
    }
}

/// Returns true when the given proleptic Gregorian year is a leap year.
pub(crate) fn leap(year: i32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

/// Integer division and modulus with the semantics of Python's `divmod`
/// for the positive divisors used throughout the engine: the quotient
/// rounds toward negative infinity and the remainder is never negative.
/// Sign conventions differ across languages' built-in integer division,
/// and BYSETPOS slicing and cursor carry depend on these.
pub(crate) fn py_divmod(a: i64, b: i64) -> (i64, i64) {
    (a.div_euclid(b), a.rem_euclid(b))
}

/// The modulus half of [`py_divmod`].
pub(crate) fn pymod(a: i64, b: i64) -> i64 {
    a.rem_euclid(b)
}

/// Indexes a slice the way Python indexes lists: negative indices count
/// from the end, and anything out of range yields `None` rather than
/// clamping.
pub(crate) fn py_subscript<T: Copy>(slice: &[T], index: i64) -> Option<T> {
    let len = slice.len() as i64;
    let index = if index < 0 { index + len } else { index };
    if 0 <= index && index < len {
        Some(slice[index as usize])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use jiff::Zoned;

    use super::*;
    use crate::rule::RecurrenceRule;

    #[test]
    fn python_division() {
        assert_eq!(py_divmod(7, 12), (0, 7));
        assert_eq!(py_divmod(13, 12), (1, 1));
        assert_eq!(py_divmod(24, 12), (2, 0));
        // The quotient rounds toward negative infinity.
        assert_eq!(py_divmod(-1, 7), (-1, 6));
        assert_eq!(py_divmod(-7, 7), (-1, 0));
        assert_eq!(pymod(-3, 7), 4);
    }

    #[test]
    fn python_subscripts() {
        let values = [10, 20, 30];
        assert_eq!(py_subscript(&values, 0), Some(10));
        assert_eq!(py_subscript(&values, 2), Some(30));
        assert_eq!(py_subscript(&values, -1), Some(30));
        assert_eq!(py_subscript(&values, -3), Some(10));
        assert_eq!(py_subscript(&values, 3), None);
        assert_eq!(py_subscript(&values, -4), None);
    }

    #[test]
    fn day_set_windows() {
        let rule = daily_rule();
        let info = IterInfo::new(&rule, 1997, 9);

        let set = info.day_set(Frequency::Yearly, 9, 2);
        assert_eq!((set.start, set.end), (0, 365));

        let set = info.day_set(Frequency::Monthly, 9, 2);
        assert_eq!((set.start, set.end), (243, 273));
        assert!(!set.days[242]);
        assert!(set.days[243]);
        assert!(set.days[272]);
        assert!(!set.days[273]);

        // 1997-09-02 was a Tuesday and the week start defaults to Monday,
        // so the weekly window runs through Sunday the 7th.
        let set = info.day_set(Frequency::Weekly, 9, 2);
        assert_eq!((set.start, set.end), (244, 250));

        let set = info.day_set(Frequency::Daily, 9, 2);
        assert_eq!((set.start, set.end), (244, 245));
    }

    #[test]
    fn weekly_window_crosses_year_end() {
        let rule = daily_rule();
        let info = IterInfo::new(&rule, 1997, 12);
        // 1997-12-30 was a Tuesday, so the window extends six days into
        // the tail, ending before Monday 1998-01-05.
        let set = info.day_set(Frequency::Weekly, 12, 30);
        assert_eq!((set.start, set.end), (363, 369));
    }

    fn daily_rule() -> RecurrenceRule {
        let start: Zoned =
            "1997-09-02T09:00:00[America/New_York]".parse().unwrap();
        RecurrenceRule::builder(Frequency::Daily, start).build().unwrap()
    }
}
