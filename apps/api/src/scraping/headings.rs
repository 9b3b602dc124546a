//! Heading harvest — the fallback strategy that walks every h1–h6, matches the
//! heading text against job-posting section keywords, and collects the
//! heading plus its following siblings up to the next heading.

use std::path::Path;

use anyhow::{Context, Result};
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

use crate::scraping::cleanup::{char_len, clean_description, element_text};

/// Harvested sections shorter than this are discarded.
pub const MIN_SECTION_LENGTH: usize = 50;

const HEADING_TAGS: [&str; 6] = ["h1", "h2", "h3", "h4", "h5", "h6"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionCategory {
    Role,
    Qualifications,
    Additional,
    Unknown,
}

/// A heading and the sibling text that follows it. Transient, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateSection {
    pub heading_text: String,
    pub body_text: String,
    pub category: SectionCategory,
}

impl CandidateSection {
    pub fn full_text(&self) -> String {
        if self.body_text.is_empty() {
            self.heading_text.clone()
        } else {
            format!("{} {}", self.heading_text, self.body_text)
        }
    }
}

/// Keyword lists per section category. Matching is a lower-case substring test,
/// categories in declaration order, keywords in list order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadingKeywords {
    pub role: Vec<String>,
    pub qualifications: Vec<String>,
    pub additional: Vec<String>,
}

impl Default for HeadingKeywords {
    fn default() -> Self {
        fn owned(words: &[&str]) -> Vec<String> {
            words.iter().map(|w| w.to_string()).collect()
        }

        Self {
            role: owned(&[
                "job description",
                "role and responsibilities",
                "role",
                "what you will do",
                "job duties",
                "key responsibilities",
                "responsibilities",
                "position overview",
                "your role",
                "duties and responsibilities",
            ]),
            qualifications: owned(&[
                "qualifications",
                "required qualifications",
                "preferred qualifications",
                "job requirements",
                "requirements",
                "skills and experience",
                "required skills",
                "essential skills",
                "experience",
                "key requirements",
            ]),
            additional: owned(&[
                "about the role",
                "overview",
                "summary",
                "essential functions",
                "who we are",
                "about us",
            ]),
        }
    }
}

impl HeadingKeywords {
    /// Loads keyword lists from a JSON file with `role`, `qualifications` and `additional` arrays.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read heading keywords from {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Invalid heading keywords file {}", path.display()))
    }

    /// Category of the first keyword contained in `heading_lower`.
    pub fn categorize(&self, heading_lower: &str) -> SectionCategory {
        let groups = [
            (SectionCategory::Role, &self.role),
            (SectionCategory::Qualifications, &self.qualifications),
            (SectionCategory::Additional, &self.additional),
        ];

        groups
            .into_iter()
            .find(|(_, keywords)| keywords.iter().any(|k| heading_lower.contains(k.as_str())))
            .map(|(category, _)| category)
            .unwrap_or(SectionCategory::Unknown)
    }
}

fn is_heading(element: ElementRef<'_>) -> bool {
    HEADING_TAGS.contains(&element.value().name())
}

/// Scans the whole document once, in document order, and returns every
/// keyword-matched section of at least [`MIN_SECTION_LENGTH`] characters.
pub fn harvest_sections(document: &Html, keywords: &HeadingKeywords) -> Vec<CandidateSection> {
    let Ok(selector) = Selector::parse(&HEADING_TAGS.join(", ")) else {
        return Vec::new();
    };

    let mut sections = Vec::new();

    for heading in document.select(&selector) {
        let heading_text = element_text(heading, " ");
        let category = keywords.categorize(&heading_text.to_lowercase());
        if category == SectionCategory::Unknown {
            continue;
        }

        let mut body_parts = Vec::new();
        for sibling in heading.next_siblings().filter_map(ElementRef::wrap) {
            if is_heading(sibling) {
                break;
            }
            let text = element_text(sibling, " ");
            if !text.is_empty() {
                body_parts.push(text);
            }
        }

        let section = CandidateSection {
            heading_text,
            body_text: body_parts.join(" "),
            category,
        };

        if char_len(&section.full_text()) >= MIN_SECTION_LENGTH {
            sections.push(section);
        }
    }

    sections
}

/// Concatenates harvested sections with a single space and cleans the result.
/// Returns an empty string when nothing was harvested.
pub fn harvest_text(html: &str, keywords: &HeadingKeywords) -> String {
    let document = Html::parse_document(html);
    let sections = harvest_sections(&document, keywords);
    if sections.is_empty() {
        return String::new();
    }

    let joined = sections
        .iter()
        .map(CandidateSection::full_text)
        .collect::<Vec<_>>()
        .join(" ");
    clean_description(&joined)
}
