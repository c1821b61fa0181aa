//! Structural and volumetric statistics over raw extracted text.

use std::sync::OnceLock;

use regex::Regex;

use super::MetricSet;

/// Computes [`MetricSet`] counts and detects generic markdown-ish structure.
///
/// The sub-scores (`confidence_score`, `structure_score`, `format_retention`)
/// are left at zero here; they depend on the backend and are filled in by the
/// scorer.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricExtractor;

/// Which structure categories appear in a text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StructureIndicators {
    pub headers: bool,
    pub lists: bool,
    pub tables: bool,
    pub section_rules: bool,
}

impl StructureIndicators {
    pub fn count(&self) -> usize {
        [self.headers, self.lists, self.tables, self.section_rules]
            .iter()
            .filter(|present| **present)
            .count()
    }
}

/// Which formatting categories survived extraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormatIndicators {
    pub emphasis: bool,
    pub paragraph_breaks: bool,
    pub indentation: bool,
}

impl FormatIndicators {
    pub fn count(&self) -> usize {
        [self.emphasis, self.paragraph_breaks, self.indentation]
            .iter()
            .filter(|present| **present)
            .count()
    }
}

struct Patterns {
    header: Regex,
    list_item: Regex,
    table_row: Regex,
    section_rule: Regex,
    emphasis: Regex,
    indentation: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        header: Regex::new(r"(?m)^#+\s+.+$").expect("header pattern"),
        list_item: Regex::new(r"(?m)^[ \t]*[-*][ \t]+.+$").expect("list pattern"),
        table_row: Regex::new(r"\|.*\|").expect("table pattern"),
        section_rule: Regex::new(r"(?m)^(?:={3,}|-{3,})[ \t]*$").expect("section rule pattern"),
        emphasis: Regex::new(r"[*_`].*[*_`]").expect("emphasis pattern"),
        indentation: Regex::new(r"(?m)^[ \t]+\S").expect("indentation pattern"),
    })
}

impl MetricExtractor {
    /// Count words, lines and characters.
    ///
    /// Blank or whitespace-only text yields the all-zero set. Any other text
    /// has at least one line, so `avg_line_length` never divides by zero.
    pub fn extract(text: &str) -> MetricSet {
        if text.trim().is_empty() {
            return MetricSet::default();
        }

        let word_count = text.split_whitespace().count();
        let line_count = text.lines().count().max(1);
        let char_count = text.chars().count();

        MetricSet {
            word_count,
            line_count,
            char_count,
            avg_line_length: char_count as f64 / line_count as f64,
            ..MetricSet::default()
        }
    }

    /// Headers (`# ...`), list markers, `|`-delimited table rows and
    /// `===` / `---` section rules.
    pub fn detect_structure(text: &str) -> StructureIndicators {
        let p = patterns();
        StructureIndicators {
            headers: p.header.is_match(text),
            lists: p.list_item.is_match(text),
            tables: p.table_row.is_match(text),
            section_rules: p.section_rule.is_match(text),
        }
    }

    /// Emphasis / code markers, blank-line paragraph breaks and indented lines.
    pub fn detect_format(text: &str) -> FormatIndicators {
        let p = patterns();
        FormatIndicators {
            emphasis: p.emphasis.is_match(text),
            paragraph_breaks: text.contains("\n\n"),
            indentation: p.indentation.is_match(text),
        }
    }
}
