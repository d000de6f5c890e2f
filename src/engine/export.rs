//! Whole-pattern export to plain text and Markdown.

use serde::{Deserialize, Serialize};

use super::count::{count_round, DecreaseRule};
use super::format::format_round;
use crate::models::{Pattern, RoundSummary, Section};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    #[default]
    Text,
    Markdown,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Markdown => "markdown",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "text" | "txt" => Some(Self::Text),
            "markdown" | "md" => Some(Self::Markdown),
            _ => None,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Text => "text/plain; charset=utf-8",
            Self::Markdown => "text/markdown; charset=utf-8",
        }
    }
}

/// Number and format every round of the pattern.
///
/// Numbering restarts at 1 in each section. Text rounds get no number and
/// do not advance the counter.
pub fn round_summaries(pattern: &Pattern, rule: DecreaseRule) -> Vec<RoundSummary> {
    pattern
        .sections
        .iter()
        .flat_map(|section| section_summaries(section, rule))
        .collect()
}

/// Number and format the rounds of one section, in order.
pub fn section_summaries(section: &Section, rule: DecreaseRule) -> Vec<RoundSummary> {
    let mut counter = 0;
    section
        .rounds
        .iter()
        .map(|round| {
            let number = if round.is_text {
                None
            } else {
                counter += 1;
                Some(counter)
            };
            RoundSummary {
                section_id: section.id,
                round_id: round.id,
                number,
                text: format_round(round, rule),
                total: count_round(round, rule),
            }
        })
        .collect()
}

/// Render a pattern as a printable document.
pub fn export_pattern(pattern: &Pattern, format: ExportFormat, rule: DecreaseRule) -> String {
    let lines = match format {
        ExportFormat::Text => text_lines(pattern, rule),
        ExportFormat::Markdown => markdown_lines(pattern, rule),
    };
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn text_lines(pattern: &Pattern, rule: DecreaseRule) -> Vec<String> {
    let mut lines = vec![pattern.name.clone()];
    if !pattern.description.trim().is_empty() {
        lines.push(pattern.description.clone());
    }

    lines.push(String::new());
    lines.push(format!("Difficulty: {}", pattern.difficulty.label()));
    if !pattern.hook_size.trim().is_empty() {
        lines.push(format!("Hook: {}", pattern.hook_size));
    }
    if !pattern.yarn_weight.trim().is_empty() {
        lines.push(format!("Yarn weight: {}", pattern.yarn_weight));
    }
    if let Some(gauge) = &pattern.gauge {
        lines.push(format!("Gauge: {}", gauge));
    }

    if !pattern.materials.is_empty() {
        lines.push(String::new());
        lines.push("Materials:".to_string());
        lines.extend(pattern.materials.iter().map(|m| format!("- {}", m)));
    }

    for section in &pattern.sections {
        lines.push(String::new());
        lines.push(section.name.clone());
        for (round, summary) in section.rounds.iter().zip(section_summaries(section, rule)) {
            match summary.number {
                None => lines.push(summary.text),
                Some(n) => {
                    if let Some(header) = &round.header_note {
                        lines.push(header.clone());
                    }
                    lines.push(format!("Rnd {}: {}", n, summary.text));
                    if let Some(footer) = &round.footer_note {
                        lines.push(footer.clone());
                    }
                }
            }
        }
    }

    if !pattern.notes.is_empty() {
        lines.push(String::new());
        lines.push("Notes:".to_string());
        lines.extend(pattern.notes.iter().map(|n| format!("- {}", n)));
    }

    lines
}

fn markdown_lines(pattern: &Pattern, rule: DecreaseRule) -> Vec<String> {
    let mut lines = vec![format!("# {}", pattern.name)];
    if !pattern.description.trim().is_empty() {
        lines.push(String::new());
        lines.push(pattern.description.clone());
    }

    lines.push(String::new());
    lines.push(format!("- **Difficulty:** {}", pattern.difficulty.label()));
    if !pattern.hook_size.trim().is_empty() {
        lines.push(format!("- **Hook:** {}", pattern.hook_size));
    }
    if !pattern.yarn_weight.trim().is_empty() {
        lines.push(format!("- **Yarn weight:** {}", pattern.yarn_weight));
    }
    if let Some(gauge) = &pattern.gauge {
        lines.push(format!("- **Gauge:** {}", gauge));
    }

    if !pattern.materials.is_empty() {
        lines.push(String::new());
        lines.push("## Materials".to_string());
        lines.push(String::new());
        lines.extend(pattern.materials.iter().map(|m| format!("- {}", m)));
    }

    for section in &pattern.sections {
        lines.push(String::new());
        lines.push(format!("## {}", section.name));
        lines.push(String::new());
        for (round, summary) in section.rounds.iter().zip(section_summaries(section, rule)) {
            match summary.number {
                None => lines.push(format!("- *{}*", summary.text)),
                Some(n) => {
                    if let Some(header) = &round.header_note {
                        lines.push(format!("- *{}*", header));
                    }
                    lines.push(format!("- **Rnd {}:** {}", n, summary.text));
                    if let Some(footer) = &round.footer_note {
                        lines.push(format!("- *{}*", footer));
                    }
                }
            }
        }
    }

    if !pattern.notes.is_empty() {
        lines.push(String::new());
        lines.push("## Notes".to_string());
        lines.push(String::new());
        lines.extend(pattern.notes.iter().map(|n| format!("- {}", n)));
    }

    lines
}
