//! Day-of-week bitmask used by series rules.
//!
//! The backend encodes the days a rule may fire on as a bitmask with
//! Monday in bit 0 through Sunday in bit 6. This table is the single place
//! that mapping lives; both directions go through it.

use chrono::Weekday;

/// Bit assigned to each weekday, Monday first.
const DAY_BITS: [(Weekday, u32); 7] = [
    (Weekday::Mon, 1 << 0),
    (Weekday::Tue, 1 << 1),
    (Weekday::Wed, 1 << 2),
    (Weekday::Thu, 1 << 3),
    (Weekday::Fri, 1 << 4),
    (Weekday::Sat, 1 << 5),
    (Weekday::Sun, 1 << 6),
];

/// Mask with every day set.
pub const ALL_DAYS: u32 = 0x7f;

/// Expands a bitmask into weekdays, Monday first. Unknown high bits are
/// ignored.
#[must_use]
pub fn decode(mask: u32) -> Vec<Weekday> {
    DAY_BITS
        .iter()
        .filter(|(_, bit)| mask & bit != 0)
        .map(|(day, _)| *day)
        .collect()
}

/// Packs weekdays into a bitmask. Duplicates are harmless.
#[must_use]
pub fn encode(days: &[Weekday]) -> u32 {
    DAY_BITS
        .iter()
        .filter(|(day, _)| days.contains(day))
        .fold(0, |mask, (_, bit)| mask | bit)
}
