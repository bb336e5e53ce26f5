//! Utilities to compare custom types
//!
//! These can be used to sort results, e.g. with `sort_by`

use std::cmp::Ordering;

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// The base letters of a text: decomposed, without diacritics, lowercase
fn base_letters(text: &str) -> String {
    text.nfd()
        .filter(|c| is_combining_mark(*c) == false)
        .flat_map(char::to_lowercase)
        .collect()
}

/// Compare alphabetically, the way people expect names to be sorted.
///
/// Base letters are compared first (`Éclair` sorts next to `Eclair`, not after `Zeta`), then accents, then case.
/// The raw strings break ties, so that the order is total
pub fn compare_alpha(left: &str, right: &str) -> Ordering {
    Ord::cmp(&base_letters(left), &base_letters(right))
        .then_with(|| {
            let left: String = left.nfd().flat_map(char::to_lowercase).collect();
            let right: String = right.nfd().flat_map(char::to_lowercase).collect();
            Ord::cmp(&left, &right)
        })
        .then_with(|| Ord::cmp(left, right))
}
