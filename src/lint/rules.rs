//! Style Rules
//!
//! Line classification and the table of style checks.

/// A style check with a stable code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LintRule {
    pub code: &'static str,
    pub summary: &'static str,
}

impl LintRule {
    pub fn message(&self) -> String {
        format!("[{}] {}", self.code, self.summary)
    }
}

pub const TAB_INDENT: LintRule = LintRule {
    code: "S001",
    summary: "Use multiple spaces, not tabs",
};

pub const ITEM_NOT_INDENTED: LintRule = LintRule {
    code: "S002",
    summary: "Item not indented",
};

pub const TOP_LEVEL_INDENTED: LintRule = LintRule {
    code: "S003",
    summary: "Top level sections should not be indented",
};

pub const SECOND_LEVEL_INDENT: LintRule = LintRule {
    code: "S004",
    summary: "Second level sections should be indented exactly 4 spaces",
};

pub const THIRD_LEVEL_INDENT: LintRule = LintRule {
    code: "S005",
    summary: "Third level sections should be indented exactly 8 spaces",
};

pub const TRAILING_WHITESPACE: LintRule = LintRule {
    code: "S006",
    summary: "Trailing whitespace",
};

pub const LINE_TOO_LONG: LintRule = LintRule {
    code: "S007",
    summary: "Line too long",
};

pub const RULES: &[LintRule] = &[
    TAB_INDENT,
    ITEM_NOT_INDENTED,
    TOP_LEVEL_INDENTED,
    SECOND_LEVEL_INDENT,
    THIRD_LEVEL_INDENT,
    TRAILING_WHITESPACE,
    LINE_TOO_LONG,
];

/// Structural role of a single configuration line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    Blank,
    Comment,
    /// Jinja2 or EmPy template markup
    Template,
    /// Section header, `depth` is the number of brackets
    Section { depth: usize, name: String },
    Setting { key: String },
    Other,
}

/// Classify a line by its content, ignoring indentation
pub fn classify_line(line: &str) -> LineKind {
    let trimmed = line.trim();

    if trimmed.is_empty() {
        return LineKind::Blank;
    }
    if trimmed.starts_with("{%")
        || trimmed.starts_with("{{")
        || trimmed.starts_with("{#")
        || trimmed.starts_with("#!")
        || trimmed.starts_with('@')
    {
        return LineKind::Template;
    }
    if trimmed.starts_with('#') {
        return LineKind::Comment;
    }

    if trimmed.starts_with('[') {
        let header = strip_comment(trimmed).trim_end();
        let depth = header.chars().take_while(|&c| c == '[').count();
        let closing = header.chars().rev().take_while(|&c| c == ']').count();
        if depth == closing && header.len() > depth * 2 {
            let name = header[depth..header.len() - depth].trim().to_string();
            return LineKind::Section { depth, name };
        }
        return LineKind::Other;
    }

    // `=>` is a graph arrow, not an assignment
    if let Some((key, value)) = trimmed.split_once('=') {
        let key = key.trim();
        if !key.is_empty() && !value.starts_with('>') {
            return LineKind::Setting {
                key: key.to_string(),
            };
        }
    }

    LineKind::Other
}

fn strip_comment(text: &str) -> &str {
    match text.find('#') {
        Some(idx) => &text[..idx],
        None => text,
    }
}

/// Leading whitespace, in characters
pub fn indent_width(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}

/// Number of triple-quote delimiters on the line
pub fn triple_quotes(line: &str) -> usize {
    line.matches("\"\"\"").count() + line.matches("'''").count()
}
