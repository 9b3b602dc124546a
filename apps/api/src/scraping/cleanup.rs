//! Text cleanup applied to whichever extraction strategy wins.

use std::sync::LazyLock;

use regex::Regex;
use scraper::ElementRef;

/// Boilerplate blocks stripped from extracted text, paired with their replacement.
/// All patterns are dot-matches-newline and non-greedy where they are bounded.
static BOILERPLATE: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        // Navigation menu up to (but keeping) the product actions block
        (r"(?s)Toggle navigation.*?(ProductActions)", "$1"),
        (r"(?s)Join Our Talent Community.*", ""),
        (r"(?s)Subscribe to our.*?inbox\.", ""),
        (r"(?s)©\s*\d{4}.*", ""),
    ]
    .into_iter()
    .map(|(pattern, replacement)| {
        (
            Regex::new(pattern).expect("boilerplate pattern is valid"),
            replacement,
        )
    })
    .collect()
});

static WHITESPACE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("blank line pattern is valid"));

/// Strips boilerplate, collapses every whitespace run (newlines included)
/// to a single space, then collapses runs of blank lines to exactly one.
pub fn clean_description(text: &str) -> String {
    let mut cleaned = text.to_string();
    for (pattern, replacement) in BOILERPLATE.iter() {
        cleaned = pattern.replace_all(&cleaned, *replacement).into_owned();
    }

    let collapsed = WHITESPACE_RUNS.replace_all(&cleaned, " ");
    BLANK_LINES
        .replace_all(&collapsed, "\n\n")
        .trim()
        .to_string()
}

/// Text of an element: every text node trimmed, empty nodes dropped, joined by `separator`.
pub fn element_text(element: ElementRef<'_>, separator: &str) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}

/// Length in characters, the unit every extraction threshold is expressed in.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    #[test]
    fn test_collapses_horizontal_whitespace() {
        assert_eq!(clean_description("Build   \t fast  systems"), "Build fast systems");
    }

    #[test]
    fn test_newlines_collapse_like_any_other_whitespace() {
        let input = "Responsibilities\nShip features\n\n\nReview code";
        assert_eq!(
            clean_description(input),
            "Responsibilities Ship features Review code"
        );
        let padded = "  Requirements:\n\n   \n\t Rust\n";
        assert_eq!(clean_description(padded), "Requirements: Rust");
        assert!(!clean_description(input).contains('\n'));
    }

    #[test]
    fn test_strips_copyright_to_end() {
        let input = "Great role with great people.\n© 2024 Example Corp\nPrivacy | Terms";
        assert_eq!(clean_description(input), "Great role with great people.");
    }

    #[test]
    fn test_strips_newsletter_prompt_non_greedy() {
        let input = "Intro. Subscribe to our newsletter for jobs in your inbox. Requirements: Rust. \
                     Subscribe to our updates straight to your inbox. Done.";
        assert_eq!(clean_description(input), "Intro. Requirements: Rust. Done.");
    }

    #[test]
    fn test_strips_navigation_but_keeps_anchor() {
        let input = "Toggle navigation\nHome\nJobs\nProductActions Apply now";
        assert_eq!(clean_description(input), "ProductActions Apply now");
    }

    #[test]
    fn test_strips_talent_community_tail() {
        let input = "We build compilers.\nJoin Our Talent Community\nSign up here";
        assert_eq!(clean_description(input), "We build compilers.");
    }

    #[test]
    fn test_element_text_drops_empty_nodes() {
        let html = Html::parse_fragment("<div> <p> One </p>\n<p></p><ul><li>Two</li></ul></div>");
        let selector = Selector::parse("div").unwrap();
        let div = html.select(&selector).next().unwrap();
        assert_eq!(element_text(div, "\n"), "One\nTwo");
        assert_eq!(element_text(div, " "), "One Two");
    }

    #[test]
    fn test_char_len_counts_scalars_not_bytes() {
        assert_eq!(char_len("café"), 4);
    }
}
