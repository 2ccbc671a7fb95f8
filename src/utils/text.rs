use regex::Regex;
use std::sync::LazyLock;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));
static SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("valid regex"));

/// Maximum character length of the brief-content projection.
const BRIEF_LEN: usize = 150;

/// Strip markup tags from an opaque HTML body.
///
/// The body is never parsed as a document; anything between `<` and `>` is
/// removed, nothing else is touched.
pub fn strip_tags(html: &str) -> String {
    TAG_RE.replace_all(html, "").into_owned()
}

/// Derive the brief content shown in short-format listings: the tag-stripped
/// body, truncated to 150 characters with a trailing ellipsis when longer.
/// Computed at response time, never stored.
pub fn brief_content(html: &str) -> String {
    let text = strip_tags(html);
    if text.chars().count() > BRIEF_LEN {
        let truncated: String = text.chars().take(BRIEF_LEN).collect();
        format!("{}...", truncated)
    } else {
        text
    }
}

/// Derive a category slug from its name: lowercase, runs of
/// non-alphanumerics collapsed to a single hyphen, edge hyphens trimmed.
pub fn slugify(name: &str) -> String {
    let lowered = name.to_lowercase();
    let slug = SLUG_RE.replace_all(&lowered, "-");
    slug.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_and_keeps_text() {
        assert_eq!(strip_tags("<p>Hello <b>world</b></p>"), "Hello world");
        assert_eq!(strip_tags("no markup"), "no markup");
        assert_eq!(strip_tags(""), "");
    }

    #[test]
    fn short_body_returned_verbatim_without_ellipsis() {
        let brief = brief_content("<p>Hello <b>world</b></p>");
        assert_eq!(brief, "Hello world");
        assert!(!brief.ends_with("..."));
    }

    #[test]
    fn long_body_truncates_to_150_chars_plus_ellipsis() {
        // Repeat until the stripped text exceeds 150 characters.
        let mut html = String::new();
        while strip_tags(&html).chars().count() <= 150 {
            html.push_str("<p>Hello <b>world</b></p>");
        }
        let brief = brief_content(&html);
        assert!(brief.ends_with("..."));
        assert_eq!(brief.chars().count(), 153);
        let stripped = strip_tags(&html);
        let expected: String = stripped.chars().take(150).collect();
        assert_eq!(&brief[..brief.len() - 3], expected.as_str());
    }

    #[test]
    fn slugify_collapses_and_trims() {
        assert_eq!(slugify("Tech"), "tech");
        assert_eq!(slugify("World News & Politics"), "world-news-politics");
        assert_eq!(slugify("  Rust 2024!  "), "rust-2024");
        assert_eq!(slugify("---"), "");
    }
}
