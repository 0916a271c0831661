//! Sequential node naming.
//!
//! The coordination service appends a fixed-width, zero-padded decimal counter
//! to sequential nodes, so plain string ordering of names under one parent is
//! creation ordering.

/// Width of the service-assigned sequence suffix
pub const SEQUENCE_WIDTH: usize = 10;

/// Format a sequence counter the way the service does
pub fn format(counter: u64) -> String {
    format!("{:0width$}", counter, width = SEQUENCE_WIDTH)
}

/// Extract the sequence counter from a sequential node name
pub fn parse(name: &str) -> Option<u64> {
    let suffix = name.get(name.len().checked_sub(SEQUENCE_WIDTH)?..)?;
    if !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    suffix.parse().ok()
}

/// Whether `own` is the smallest name in `children`
///
/// A name missing from `children` is never the minimum.
pub fn is_minimum<S: AsRef<str>>(children: &[S], own: &str) -> bool {
    let mut present = false;
    for child in children {
        let child = child.as_ref();
        if child < own {
            return false;
        }
        if child == own {
            present = true;
        }
    }
    present
}

/// The greatest name strictly smaller than `own`
pub fn predecessor<'a, S: AsRef<str>>(children: &'a [S], own: &str) -> Option<&'a str> {
    children
        .iter()
        .map(|c| c.as_ref())
        .filter(|c| *c < own)
        .max()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_rejects_split_characters() {
        assert_eq!(parse("é000000000"), None);
        assert_eq!(parse("seq-é0000000000"), Some(0));
        assert_eq!(parse("ééééé"), None);
    }

    #[test]
    fn test_format_and_parse() {
        assert_eq!(format(7), "0000000007");
        assert_eq!(parse("seq-0000000007"), Some(7));
        assert_eq!(parse("seq-"), None);
        assert_eq!(parse("seq-00000000x7"), None);
    }

    #[test]
    fn test_minimum_and_predecessor() {
        let children = vec![
            "seq-0000000003".to_string(),
            "seq-0000000001".to_string(),
            "seq-0000000002".to_string(),
        ];
        assert!(is_minimum(&children, "seq-0000000001"));
        assert!(!is_minimum(&children, "seq-0000000002"));
        assert!(!is_minimum(&children, "seq-0000000000"));
        assert_eq!(
            predecessor(&children, "seq-0000000003"),
            Some("seq-0000000002")
        );
        assert_eq!(predecessor(&children, "seq-0000000001"), None);
    }

    proptest! {
        #[test]
        fn prop_string_order_matches_creation_order(counters in proptest::collection::btree_set(0u64..9_999_999_999, 1..50)) {
            let mut names: Vec<String> = counters.iter().map(|c| format!("seq-{}", format(*c))).collect();
            names.sort();
            let parsed: Vec<u64> = names.iter().filter_map(|n| parse(n)).collect();
            let expected: Vec<u64> = counters.iter().copied().collect();
            prop_assert_eq!(parsed, expected);
        }

        #[test]
        fn prop_predecessor_is_next_lower_counter(counters in proptest::collection::btree_set(0u64..1_000_000, 2..40), pick in any::<prop::sample::Index>()) {
            let ordered: Vec<u64> = counters.into_iter().collect();
            let names: Vec<String> = ordered.iter().map(|c| format!("seq-{}", format(*c))).collect();
            let idx = pick.index(names.len());
            let expected = if idx == 0 { None } else { Some(names[idx - 1].as_str()) };
            prop_assert_eq!(predecessor(&names, &names[idx]), expected);
            prop_assert_eq!(is_minimum(&names, &names[idx]), idx == 0);
        }
    }
}
