//! Wildcard matching and path routing.
//!
//! Patterns use `*` (any run of characters, including none) and `?`
//! (exactly one character). Matching is case-sensitive and operates on
//! whole strings, not substrings. Before matching, both sides are
//! normalized to backslash-separated form, the convention used by the
//! client's own asset manifests.

/// Match `text` against `pattern` in full.
///
/// `*` matches any run of characters (crossing path separators), `?`
/// matches exactly one character, everything else matches itself.
/// An empty pattern matches only the empty string.
#[must_use]
pub fn wild_match(pattern: &str, text: &str) -> bool {
    let pat: Vec<char> = pattern.chars().collect();
    let txt: Vec<char> = text.chars().collect();

    let mut p = 0;
    let mut t = 0;
    // Most recent star: (pattern index after it, text index it was tried at)
    let mut star: Option<(usize, usize)> = None;

    while t < txt.len() {
        if p < pat.len() && (pat[p] == '?' || pat[p] == txt[t]) {
            p += 1;
            t += 1;
        } else if p < pat.len() && pat[p] == '*' {
            star = Some((p + 1, t));
            p += 1;
        } else if let Some((sp, st)) = star {
            // Backtrack: let the star swallow one more character.
            p = sp;
            t = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }

    // Trailing stars match the empty run.
    while p < pat.len() && pat[p] == '*' {
        p += 1;
    }
    p == pat.len()
}

/// Canonicalize a document path or pattern to single-backslash form.
///
/// Forward slashes become backslashes and runs of separators collapse to
/// one, so normalizing an already-normalized path returns it unchanged.
#[must_use]
pub fn normalize_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut last_was_sep = false;
    for c in path.chars() {
        if c == '/' || c == '\\' {
            if !last_was_sep {
                out.push('\\');
            }
            last_was_sep = true;
        } else {
            out.push(c);
            last_was_sep = false;
        }
    }
    out
}

/// Drop the leading path segment of a normalized pattern.
///
/// The first segment of a manifest pattern names the container archive the
/// document ships in, not part of the logical document path. Returns the
/// remainder after the first separator run, or `""` when the pattern has
/// no separator at all.
#[must_use]
pub fn strip_container(pattern: &str) -> &str {
    match pattern.find('\\') {
        Some(sep) => {
            let rest = &pattern[sep..];
            rest.trim_start_matches('\\')
        }
        None => "",
    }
}

/// Routing predicate: does `pattern` select the document at `path`?
///
/// Both sides are normalized first. The pattern applies if it matches the
/// path either in full or with its leading container segment stripped,
/// covering patterns written with and without the archive prefix.
#[must_use]
pub fn pattern_applies(pattern: &str, path: &str) -> bool {
    let pattern = normalize_path(pattern);
    let path = normalize_path(path);
    if wild_match(&pattern, &path) {
        return true;
    }
    let stripped = strip_container(&pattern);
    !stripped.is_empty() && wild_match(stripped, &path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_literal_match() {
        assert!(wild_match("abc", "abc"));
        assert!(!wild_match("abc", "abcd"));
        assert!(!wild_match("abcd", "abc"));
        assert!(!wild_match("abc", "abd"));
    }

    #[test]
    fn test_empty_pattern_and_text() {
        assert!(wild_match("", ""));
        assert!(!wild_match("", "a"));
        assert!(!wild_match("a", ""));
        assert!(wild_match("*", ""));
    }

    #[test]
    fn test_question_mark() {
        assert!(wild_match("a?c", "abc"));
        assert!(wild_match("a?c", "axc"));
        assert!(!wild_match("a?c", "ac"));
        assert!(!wild_match("a?c", "abbc"));
        assert!(wild_match("???", "abc"));
    }

    #[test]
    fn test_star_spans_separators() {
        assert!(wild_match("*.xml", "a\\b.xml"));
        assert!(wild_match("*.xml", "deep\\er\\file.xml"));
        assert!(!wild_match("*.xml", "file.xm"));
    }

    #[test]
    fn test_star_backtracking() {
        assert!(wild_match("a*b*c", "aXbYbZc"));
        assert!(wild_match("*b*", "abc"));
        assert!(!wild_match("a*b*c", "aXbYbZ"));
        assert!(wild_match("a**b", "ab"));
        assert!(wild_match("*abc*abc", "abcabcabc"));
    }

    #[test]
    fn test_case_sensitive() {
        assert!(!wild_match("ABC", "abc"));
        assert!(!wild_match("*.XML", "file.xml"));
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("ui/dialog.xml"), "ui\\dialog.xml");
        assert_eq!(normalize_path("ui\\\\dialog.xml"), "ui\\dialog.xml");
        assert_eq!(normalize_path("a//b\\/c"), "a\\b\\c");
        assert_eq!(normalize_path(""), "");
    }

    #[test]
    fn test_normalize_idempotent() {
        for raw in ["ui/dialog.xml", "a\\\\b///c", "xml\\config.xml", "plain"] {
            let once = normalize_path(raw);
            assert_eq!(normalize_path(&once), once);
        }
    }

    #[test]
    fn test_strip_container() {
        assert_eq!(strip_container("xml\\config.xml"), "config.xml");
        assert_eq!(strip_container("data\\ui\\panel.xml"), "ui\\panel.xml");
        assert_eq!(strip_container("config.xml"), "");
        assert_eq!(strip_container(""), "");
    }

    #[test]
    fn test_pattern_applies_with_container_prefix() {
        assert!(pattern_applies("xml\\config.xml", "config.xml"));
        assert!(pattern_applies("data/ui/panel.xml", "ui\\panel.xml"));
        assert!(!pattern_applies("xml\\config.xml", "other.xml"));
    }

    #[test]
    fn test_pattern_applies_without_container_prefix() {
        assert!(pattern_applies("ui\\dialog.xml", "ui/dialog.xml"));
        assert!(pattern_applies("*.xml", "a/b.xml"));
    }

    proptest! {
        #[test]
        fn prop_literal_matches_itself(s in "[a-zA-Z0-9_.\\\\]{0,24}") {
            prop_assert!(wild_match(&s, &s));
        }

        #[test]
        fn prop_star_prefix_suffix(s in "[a-z0-9.]{0,16}") {
            let star_prefix = format!("*{}", s);
            let star_suffix = format!("{}*", s);
            prop_assert!(wild_match(&star_prefix, &s));
            prop_assert!(wild_match(&star_suffix, &s));
            prop_assert!(wild_match("*", &s));
        }

        #[test]
        fn prop_question_substitution(s in "[a-z]{1,16}", idx in 0usize..16) {
            let chars: Vec<char> = s.chars().collect();
            let idx = idx % chars.len();
            let mut pat: String = chars[..idx].iter().collect();
            pat.push('?');
            pat.extend(&chars[idx + 1..]);
            prop_assert!(wild_match(&pat, &s));
        }

        #[test]
        fn prop_normalize_idempotent(s in "[a-z/\\\\.]{0,24}") {
            let once = normalize_path(&s);
            prop_assert_eq!(normalize_path(&once), once.clone());
            prop_assert!(!once.contains('/'));
            prop_assert!(!once.contains("\\\\"));
        }
    }
}
