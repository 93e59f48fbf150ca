use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Serialize, Serializer};

/// Trailing run of ASCII digits in a key, parsed as a number.
/// `"3"` → 3, `"item12"` → 12, `"plate"` → None.
pub fn ordinal(key: &str) -> Option<u64> {
    let digits_start = key
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i)?;
    key[digits_start..].parse().ok()
}

/// Orders provider keys by their numeric suffix, so `item2` sorts before
/// `item10`. Keys without digits sort after numbered keys, lexicographically.
pub fn ordinal_cmp(a: &str, b: &str) -> Ordering {
    match (ordinal(a), ordinal(b)) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

/// Serialize a string-keyed map with its entries in [`ordinal_cmp`] order.
pub fn serialize_by_ordinal<V, S>(map: &BTreeMap<String, V>, serializer: S) -> Result<S::Ok, S::Error>
where
    V: Serialize,
    S: Serializer,
{
    let mut entries: Vec<(&String, &V)> = map.iter().collect();
    entries.sort_by(|a, b| ordinal_cmp(a.0, b.0));
    serializer.collect_map(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinal_of_plain_and_prefixed_keys() {
        assert_eq!(ordinal("0"), Some(0));
        assert_eq!(ordinal("item12"), Some(12));
        assert_eq!(ordinal("plate"), None);
        assert_eq!(ordinal(""), None);
    }

    #[test]
    fn numeric_order_beats_lexicographic() {
        let mut keys = vec!["item10", "item2", "item1"];
        keys.sort_by(|a, b| ordinal_cmp(a, b));
        assert_eq!(keys, vec!["item1", "item2", "item10"]);
    }

    #[test]
    fn unnumbered_keys_sort_last() {
        let mut keys = vec!["zeta", "3", "alpha", "1"];
        keys.sort_by(|a, b| ordinal_cmp(a, b));
        assert_eq!(keys, vec!["1", "3", "alpha", "zeta"]);
    }
}
