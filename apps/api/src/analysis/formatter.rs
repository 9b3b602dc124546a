//! Presentation of an [`AnalysisResult`]: an HTML fragment and a flat list of lines.
//! Sections appear in a fixed order and only when non-empty.

use crate::analysis::models::AnalysisResult;

pub const NO_SUGGESTIONS_MESSAGE: &str =
    "No specific suggestions found. Please try again with a more detailed job description.";

pub fn format_suggestions_html(analysis: &AnalysisResult) -> String {
    if analysis.is_empty() {
        return format!(
            "<div class=\"optimization-results\">\n<p>{NO_SUGGESTIONS_MESSAGE}</p>\n</div>\n"
        );
    }

    let mut html = String::from("<div class=\"optimization-results\">\n");

    push_section(
        &mut html,
        "Missing Key Skills",
        analysis.missing_skills.iter().map(|s| {
            format!(
                "<li><strong>{}</strong>: {}</li>",
                escape_html(&s.skill),
                escape_html(&s.suggestion)
            )
        }),
    );
    push_section(
        &mut html,
        "Suggested Improvements",
        analysis.improvement_suggestions.iter().map(|s| {
            format!(
                "<li><strong>Current:</strong> {}<br><strong>Suggested:</strong> {}<br><em>Why:</em> {}</li>",
                escape_html(&s.current),
                escape_html(&s.suggested),
                escape_html(&s.reason)
            )
        }),
    );
    push_section(
        &mut html,
        "Experiences to Emphasize",
        analysis.emphasis_suggestions.iter().map(|s| {
            format!(
                "<li><strong>{}</strong><br><em>Why relevant:</em> {}<br><em>How to emphasize:</em> {}</li>",
                escape_html(&s.experience),
                escape_html(&s.why_relevant),
                escape_html(&s.how_to_emphasize)
            )
        }),
    );
    push_section(
        &mut html,
        "General Suggestions",
        analysis
            .general_suggestions
            .iter()
            .map(|s| format!("<li>{}</li>", escape_html(s))),
    );

    html.push_str("</div>\n");
    html
}

fn push_section(html: &mut String, title: &str, items: impl Iterator<Item = String>) {
    let items: Vec<String> = items.collect();
    if items.is_empty() {
        return;
    }
    html.push_str("<div class=\"suggestion-section\">\n");
    html.push_str(&format!("<h4>{title}</h4>\n<ul>\n"));
    for item in items {
        html.push_str(&item);
        html.push('\n');
    }
    html.push_str("</ul>\n</div>\n");
}

/// One line per suggestion, in section order.
pub fn suggestion_lines(analysis: &AnalysisResult) -> Vec<String> {
    let mut lines = Vec::new();
    for s in &analysis.missing_skills {
        lines.push(format!("Missing Skill: {} - {}", s.skill, s.suggestion));
    }
    for s in &analysis.improvement_suggestions {
        lines.push(format!("Improve: {} -> {} ({})", s.current, s.suggested, s.reason));
    }
    for s in &analysis.emphasis_suggestions {
        lines.push(format!("Emphasize: {} - {}", s.experience, s.how_to_emphasize));
    }
    for s in &analysis.general_suggestions {
        lines.push(format!("General: {s}"));
    }
    lines
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
