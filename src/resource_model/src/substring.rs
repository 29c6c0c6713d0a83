/// True iff `needle` occurs in `haystack` and at least one occurrence is
/// bounded — on either side — by a non-identifier character or a string
/// boundary, and `needle` is not the entirety of `haystack`.
///
/// This is the boundary-aware test `dependsOn` runs a candidate's
/// qualified identifier spellings through: it lets `dataset.table` match
/// inside a longer query without `table` also matching as a bare prefix
/// of some unrelated longer token.
pub fn strict_substring(needle: &str, haystack: &str) -> bool {
    if needle.is_empty() || needle == haystack {
        return false;
    }
    let mut search_from = 0;
    while let Some(offset) = haystack[search_from..].find(needle) {
        let start = search_from + offset;
        let end = start + needle.len();

        let left_ok = start == 0 || !is_identifier_char(prev_char(haystack, start));
        let right_ok = end == haystack.len() || !is_identifier_char(next_char(haystack, end));
        if left_ok || right_ok {
            return true;
        }

        search_from = start + 1;
        if search_from >= haystack.len() {
            break;
        }
    }
    false
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn prev_char(s: &str, byte_idx: usize) -> char {
    s[..byte_idx].chars().next_back().expect("byte_idx > 0")
}

fn next_char(s: &str, byte_idx: usize) -> char {
    s[byte_idx..].chars().next().expect("byte_idx < s.len()")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_testable_property_table() {
        assert!(strict_substring("A", "AA"));
        assert!(!strict_substring("A", "A"));
        assert!(strict_substring("A", " Asxx "));
    }

    #[test]
    fn empty_needle_never_matches() {
        assert!(!strict_substring("", "anything"));
    }

    #[test]
    fn absent_needle_does_not_match() {
        assert!(!strict_substring("zzz", "select * from a.b"));
    }

    proptest::proptest! {
        // Wrapping `needle` in an identifier char on both sides must
        // never be reported as a strict-substring match — it's the exact
        // false-positive `foo` matching inside `foobar` is guarding
        // against. `needle` is drawn from uppercase letters and the
        // padding from lowercase/digits/underscore so the two alphabets
        // never overlap — the only place `needle` can occur in the
        // padded haystack is the embedded position, so the assertion
        // can't spuriously pass or fail on an unrelated occurrence.
        #[test]
        fn never_matches_when_flanked_by_identifier_chars(
            needle in "[A-Z]{1,8}",
            prefix in "[a-z0-9_]{1,4}",
            suffix in "[a-z0-9_]{1,4}",
        ) {
            let haystack = format!("{prefix}{needle}{suffix}");
            proptest::prop_assert!(!strict_substring(&needle, &haystack));
        }

        // Flanking `needle` with non-identifier punctuation on both sides
        // must always be reported as a match, regardless of what the
        // needle itself contains.
        #[test]
        fn always_matches_when_flanked_by_punctuation(
            needle in "[a-zA-Z0-9_]{1,8}",
        ) {
            let haystack = format!(" {needle} ");
            proptest::prop_assert!(strict_substring(&needle, &haystack));
        }
    }
}
