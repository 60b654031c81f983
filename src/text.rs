//! Plain-text helpers over the formatted note payload.

use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

static MARKUP_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[^>]*>?").expect("valid markup regex"));

const ENTITIES: [(&str, &str); 6] = [
    ("&nbsp;", " "),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&amp;", "&"),
];

pub const PREVIEW_CHARS: usize = 100;

/// Strips markup tags and decodes the handful of entities the editor emits.
pub fn plain_text(content: &str) -> String {
    let mut text = MARKUP_TAG_RE.replace_all(content, "").into_owned();
    for (entity, replacement) in ENTITIES {
        if text.contains(entity) {
            text = text.replace(entity, replacement);
        }
    }
    text
}

/// First `max_chars` characters of the plain text, with `...` when cut.
pub fn preview(content: &str, max_chars: usize) -> String {
    let text = plain_text(content);
    if text.chars().count() <= max_chars {
        return text;
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push_str("...");
    out
}

pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Lowercased base letters: canonical decomposition with combining marks dropped.
fn base_letters(s: &str) -> impl Iterator<Item = char> + '_ {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
}

/// Human ordering for titles. Base letters decide first, so accents and case
/// are ignored ("Éclair" sorts between "apple" and "zebra"). Ties are broken
/// by accents, then lowercase before uppercase.
pub fn locale_compare(a: &str, b: &str) -> Ordering {
    base_letters(a)
        .cmp(base_letters(b))
        .then_with(|| {
            a.chars()
                .flat_map(char::to_lowercase)
                .cmp(b.chars().flat_map(char::to_lowercase))
        })
        .then_with(|| {
            a.chars()
                .map(char::is_uppercase)
                .cmp(b.chars().map(char::is_uppercase))
        })
        .then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_strips_tags_and_entities() {
        let html = "<h2>Plan</h2><p>Tom &amp; Jerry&nbsp;meet</p>";
        assert_eq!(plain_text(html), "PlanTom & Jerry meet");
    }

    #[test]
    fn plain_text_drops_unterminated_tag() {
        assert_eq!(plain_text("hello <strong"), "hello ");
    }

    #[test]
    fn preview_truncates_long_text() {
        let long = format!("<p>{}</p>", "a".repeat(150));
        let out = preview(&long, PREVIEW_CHARS);
        assert_eq!(out.chars().count(), PREVIEW_CHARS + 3);
        assert!(out.ends_with("..."));
        assert_eq!(preview("<p>short</p>", PREVIEW_CHARS), "short");
    }

    #[test]
    fn locale_compare_ignores_case_first() {
        assert_eq!(locale_compare("apple", "Banana"), Ordering::Less);
        assert_eq!(locale_compare("Zebra", "apple"), Ordering::Greater);
        assert_eq!(locale_compare("a", "A"), Ordering::Less);
        assert_eq!(locale_compare("same", "same"), Ordering::Equal);
    }

    #[test]
    fn locale_compare_sorts_accented_letters_with_their_base() {
        let mut titles = vec!["zebra", "Éclair", "apple", "eclair", "ça va", "cat"];
        titles.sort_by(|a, b| locale_compare(a, b));
        assert_eq!(titles, vec!["apple", "ça va", "cat", "eclair", "Éclair", "zebra"]);
        assert_eq!(locale_compare("résumé", "resume"), Ordering::Greater);
        assert_eq!(locale_compare("Ångström", "angstrom"), Ordering::Greater);
    }

    #[test]
    fn contains_ignore_case_matches_mixed_case() {
        assert!(contains_ignore_case("Meeting scheduled", "meeting"));
        assert!(!contains_ignore_case("Meeting", "meetings"));
    }
}
