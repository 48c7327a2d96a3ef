use once_cell::sync::Lazy;
use regex::Regex;

use depmap_core::KeyInfo;

/// Tier + uppercase dir letter, optionally a lowercase subdir letter and/or
/// a trailing file number. Grounded on `key_manager.py`'s
/// `HIERARCHICAL_KEY_PATTERN`.
static HIERARCHICAL_KEY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[1-9]\d*[A-Z](?:[a-z](?:[1-9]\d*)?|[1-9]\d*)?$").unwrap());

/// Splits a key string into alternating digit/non-digit runs for natural
/// sort, mirroring `KEY_PATTERN = r'\d+|\D+'`.
static KEY_PART_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+|\D+").unwrap());

pub fn validate_key(key: &str) -> bool {
    !key.is_empty() && HIERARCHICAL_KEY_PATTERN.is_match(key)
}

/// A sortable token: a number compares numerically, text compares as text.
/// Mirrors converting digit runs to `int` and leaving the rest as `str` in
/// the Python sort key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum SortToken {
    Num(u64),
    Text(String),
}

fn sort_tokens(key: &str) -> Vec<SortToken> {
    KEY_PART_PATTERN
        .find_iter(key)
        .map(|m| {
            let part = m.as_str();
            if part.chars().all(|c| c.is_ascii_digit()) {
                SortToken::Num(part.parse().unwrap_or(u64::MAX))
            } else {
                SortToken::Text(part.to_string())
            }
        })
        .collect()
}

/// Natural sort over raw key strings: `1A1, 1A2, 1A10`, not `1A1, 1A10, 1A2`.
pub fn sort_key_strings_hierarchically(keys: &[String]) -> Vec<String> {
    let mut valid: Vec<String> = keys.iter().filter(|k| !k.is_empty()).cloned().collect();
    valid.sort_by(|a, b| sort_tokens(a).cmp(&sort_tokens(b)));
    valid
}

/// Sorts `KeyInfo` primarily by tier, then by natural order of the key
/// string within that tier.
pub fn sort_keys(mut infos: Vec<KeyInfo>) -> Vec<KeyInfo> {
    infos.sort_by(|a, b| {
        a.tier
            .cmp(&b.tier)
            .then_with(|| sort_tokens(&a.key_string).cmp(&sort_tokens(&b.key_string)))
    });
    infos
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_keys() {
        for key in ["1A", "1A1", "1Aa", "1Aa1", "10Az12"] {
            assert!(validate_key(key), "{key} should validate");
        }
    }

    #[test]
    fn rejects_malformed_keys() {
        for key in ["", "A1", "1a", "1A-", "aA1"] {
            assert!(!validate_key(key), "{key} should not validate");
        }
    }

    #[test]
    fn natural_sort_orders_numeric_suffix_correctly() {
        let keys = vec!["1A2".to_string(), "1A10".to_string(), "1A1".to_string()];
        assert_eq!(
            sort_key_strings_hierarchically(&keys),
            vec!["1A1".to_string(), "1A2".to_string(), "1A10".to_string()]
        );
    }

    #[test]
    fn sort_keys_orders_by_tier_first() {
        let make = |key: &str, tier: u32| KeyInfo {
            key_string: key.to_string(),
            norm_path: format!("/{key}"),
            parent_path: None,
            tier,
            is_directory: true,
        };
        let infos = vec![make("2A", 2), make("1B", 1), make("1A", 1)];
        let sorted = sort_keys(infos);
        let keys: Vec<_> = sorted.iter().map(|k| k.key_string.clone()).collect();
        assert_eq!(keys, vec!["1A", "1B", "2A"]);
    }
}
