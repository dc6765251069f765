/*!
Precomputed calendar tables shared by every iterator.

Each table is indexed by the zero-based ordinal day of a 365- or 366-day
year and classifies that day: which month it falls in, its day of the month
(counted from the front and from the back) and its weekday. Every mask
carries a seven day tail describing the start of the *next* year, so that a
weekly window beginning in late December can be sliced without wrapping.

The tables are plain statics computed at compile time. They are never
mutated, so sharing them across iterators (and threads) is free.
*/

/// Month lengths for common years.
const MONTH_LENS_365: [i8; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// Month lengths for leap years.
const MONTH_LENS_366: [i8; 12] = [31, 29, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// The month (1..=12) of each ordinal day of a common year.
pub(crate) static M365_MASK: [i8; 372] = month_mask(MONTH_LENS_365);

/// The month (1..=12) of each ordinal day of a leap year.
pub(crate) static M366_MASK: [i8; 373] = month_mask(MONTH_LENS_366);

/// The day of the month (1..=31) of each ordinal day of a common year.
pub(crate) static MDAY365_MASK: [i8; 372] = month_day_mask(MONTH_LENS_365);

/// The day of the month (1..=31) of each ordinal day of a leap year.
pub(crate) static MDAY366_MASK: [i8; 373] = month_day_mask(MONTH_LENS_366);

/// The negative day of the month (-31..=-1) of each ordinal day of a common
/// year. For example, the last day of February maps to `-1` and the first
/// maps to `-28`.
pub(crate) static NMDAY365_MASK: [i8; 372] = neg_month_day_mask(MONTH_LENS_365);

/// The negative day of the month (-31..=-1) of each ordinal day of a leap
/// year.
pub(crate) static NMDAY366_MASK: [i8; 373] = neg_month_day_mask(MONTH_LENS_366);

/// Ordinal day offsets of the month boundaries of a common year. Month `m`
/// (1-indexed) covers the half-open ordinal range
/// `M365_RANGE[m - 1]..M365_RANGE[m]`.
pub(crate) static M365_RANGE: [u16; 13] =
    [0, 31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334, 365];

/// Ordinal day offsets of the month boundaries of a leap year.
pub(crate) static M366_RANGE: [u16; 13] =
    [0, 31, 60, 91, 121, 152, 182, 213, 244, 274, 305, 335, 366];

/// The repeating weekday sequence `0..=6` (Monday is `0`), materialized long
/// enough that slicing it at the weekday of January 1 yields a weekday mask
/// covering any year plus its seven day tail.
pub(crate) static WDAY_MASK: [i8; 385] = weekday_mask();

const fn month_mask<const N: usize>(lens: [i8; 12]) -> [i8; N] {
    let mut mask = [0i8; N];
    let mut i = 0;
    let mut month = 0;
    while month < 12 {
        let mut day = 0;
        while day < lens[month] {
            mask[i] = (month as i8) + 1;
            i += 1;
            day += 1;
        }
        month += 1;
    }
    // The tail extends into January of the next year.
    while i < N {
        mask[i] = 1;
        i += 1;
    }
    mask
}

const fn month_day_mask<const N: usize>(lens: [i8; 12]) -> [i8; N] {
    let mut mask = [0i8; N];
    let mut i = 0;
    let mut month = 0;
    while month < 12 {
        let mut day = 1;
        while day <= lens[month] {
            mask[i] = day;
            i += 1;
            day += 1;
        }
        month += 1;
    }
    let mut day = 1;
    while i < N {
        mask[i] = day;
        i += 1;
        day += 1;
    }
    mask
}

const fn neg_month_day_mask<const N: usize>(lens: [i8; 12]) -> [i8; N] {
    let mut mask = [0i8; N];
    let mut i = 0;
    let mut month = 0;
    while month < 12 {
        let mut day = -lens[month];
        while day <= -1 {
            mask[i] = day;
            i += 1;
            day += 1;
        }
        month += 1;
    }
    let mut day = -31;
    while i < N {
        mask[i] = day;
        i += 1;
        day += 1;
    }
    mask
}

const fn weekday_mask() -> [i8; 385] {
    let mut mask = [0i8; 385];
    let mut i = 0;
    while i < 385 {
        mask[i] = (i % 7) as i8;
        i += 1;
    }
    mask
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_masks() {
        // Ordinal 59 is February 29 in a leap year but March 1 otherwise.
        assert_eq!(M366_MASK[59], 2);
        assert_eq!(M365_MASK[59], 3);
        assert_eq!(MDAY366_MASK[59], 29);
        assert_eq!(MDAY365_MASK[59], 1);
        // The last day of the year.
        assert_eq!(M365_MASK[364], 12);
        assert_eq!(MDAY365_MASK[364], 31);
        assert_eq!(NMDAY365_MASK[364], -1);
        assert_eq!(M366_MASK[365], 12);
        // The tail belongs to January of the next year.
        assert_eq!(M365_MASK[365], 1);
        assert_eq!(MDAY365_MASK[365], 1);
        assert_eq!(NMDAY365_MASK[365], -31);
        assert_eq!(M366_MASK[366], 1);
        assert_eq!(MDAY366_MASK[372], 7);
    }

    #[test]
    fn negative_month_days() {
        // The first day of a 31 day month counts -31 from the back.
        assert_eq!(NMDAY365_MASK[0], -31);
        // The first day of February.
        assert_eq!(NMDAY365_MASK[31], -28);
        assert_eq!(NMDAY366_MASK[31], -29);
        // The last day of February.
        assert_eq!(NMDAY365_MASK[58], -1);
        assert_eq!(NMDAY366_MASK[59], -1);
    }

    #[test]
    fn month_ranges() {
        for month in 1..=12 {
            let (start, end) =
                (M365_RANGE[month - 1] as usize, M365_RANGE[month] as usize);
            assert_eq!(end - start, MONTH_LENS_365[month - 1] as usize);
            assert!(M365_MASK[start..end]
                .iter()
                .all(|&m| m == month as i8));
        }
    }

    #[test]
    fn weekdays_repeat() {
        assert_eq!(WDAY_MASK[0], 0);
        assert_eq!(WDAY_MASK[6], 6);
        assert_eq!(WDAY_MASK[7], 0);
        assert_eq!(WDAY_MASK[384], 6);
    }
}
