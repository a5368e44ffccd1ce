//! Scheme-aware region naming
//!
//! GPT partitions are `<disk>p<N>`, MBR slices `<disk>s<N>` and BSD labels
//! `<slice><letter>`. Free space is `freespace<K>`.

/// Prefix of synthetic free space names
pub const FREESPACE_PREFIX: &str = "freespace";

/// Primary slice limit of an MBR table
pub const MAX_PRIMARY_SLICES: u32 = 4;

/// Letter reserved by BSD disklabel for the whole slice
const RESERVED_LABEL: char = 'c';

/// Return `prefix` followed by the smallest positive integer not yet taken.
pub fn next_free_name<'a, I>(existing: I, prefix: &str) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let taken: Vec<u32> = existing
        .into_iter()
        .filter_map(|name| name.strip_prefix(prefix))
        .filter(|suffix| !suffix.starts_with('0'))
        .filter_map(|suffix| suffix.parse().ok())
        .collect();

    let mut num = 1;
    while taken.contains(&num) {
        num += 1;
    }
    format!("{prefix}{num}")
}

pub fn partition_prefix(disk: &str) -> String {
    format!("{disk}p")
}

pub fn slice_prefix(disk: &str) -> String {
    format!("{disk}s")
}

/// Usable BSD label letters in allocation order
pub fn label_letters() -> impl Iterator<Item = char> {
    ('a'..='z').filter(|c| *c != RESERVED_LABEL)
}

/// First free label name inside `slice`, or `None` once every letter is used.
pub fn next_label_name<'a, I>(slice: &str, existing: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let existing: Vec<&str> = existing.into_iter().collect();
    label_letters()
        .map(|letter| format!("{slice}{letter}"))
        .find(|name| !existing.contains(&name.as_str()))
}

/// Index `gpart` uses to address `name` inside `parent`.
///
/// `ada0p3` in `ada0` is 3, `ada0s1` in `ada0` is 1 and `ada0s1d` in
/// `ada0s1` is 4 (labels count from `a` = 1).
pub fn index_in_parent(parent: &str, name: &str) -> Option<u32> {
    let suffix = name.strip_prefix(parent)?;
    let mut chars = suffix.chars();
    match (chars.next()?, chars.as_str()) {
        ('p' | 's', digits) if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => {
            digits.parse().ok()
        }
        (letter @ 'a'..='z', "") => Some(letter as u32 - 'a' as u32 + 1),
        _ => None,
    }
}
