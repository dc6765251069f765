/*!
A calendar recurrence engine.

This crate materializes the datetime streams denoted by RFC 5545
recurrence rules: given a frequency, an interval, a starting point, stop
conditions and any combination of `BY*` parts, it yields the exact ordered
sequence of occurrences the rule denotes. It is built on [Jiff] for all
datetime arithmetic and emits occurrences in the time zone of the rule's
starting point.

# Example

Every other Monday and Tuesday, six times:

```
use jiff::{Zoned, civil::Weekday};
use chime::{Frequency, RecurrenceRule};

let start: Zoned = "2018-01-01T00:00:00[UTC]".parse()?;
let rule = RecurrenceRule::builder(Frequency::Weekly, start)
    .interval(2)
    .by_week_day([Weekday::Monday, Weekday::Tuesday])
    .count(6)
    .build()?;
let occurrences = rule.all();
assert_eq!(occurrences.len(), 6);
assert_eq!(occurrences[5], "2018-01-30T00:00:00[UTC]".parse::<Zoned>()?);
# Ok::<(), anyhow::Error>(())
```

Rules also round trip through the RFC 5545 textual syntax:

```
use chime::RecurrenceRule;

let rule: RecurrenceRule =
    "FREQ=MONTHLY;DTSTART=20200131T090000Z;BYMONTHDAY=31".parse()?;
// Short months have no 31st and are skipped entirely.
assert_eq!(rule.iter().nth(1).unwrap().to_string(), "2020-03-31T09:00:00+00:00[UTC]");
# Ok::<(), anyhow::Error>(())
```

Several rules and fixed dates combine into a [`RecurrenceSet`], which
unions their streams and subtracts exclusions.

[Jiff]: https://docs.rs/jiff
*/

mod easter;
mod info;
mod iter;
mod mask;
mod parse;
mod rule;
mod set;

pub use crate::{
    iter::RecurrenceIter,
    rule::{
        ByWeekday, Frequency, IntoByWeekdayIter, IntoI8Iter, IntoI16Iter,
        IntoI32Iter, RecurrenceRule, RecurrenceRuleBuilder,
    },
    set::{RecurrenceSet, RecurrenceSetIter},
};
