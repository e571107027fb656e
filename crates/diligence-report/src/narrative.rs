//! Report narrative as annotated lines
//!
//! Lines are classified once, when they are appended. The renderer only
//! looks at [`LineStyle`] and never re-parses markup.

use serde::{Deserialize, Serialize};

const HEADING_MARKER: &str = "##";
const EMPHASIS_MARKER: &str = "**";

/// Separator placed between the initial and the comprehensive narrative
pub const SECTION_SEPARATOR: &str = "---";

/// How a line is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineStyle {
    /// Bold, larger
    Heading,
    /// Bold
    Emphasis,
    /// Regular
    Plain,
}

/// A narrative line and its style
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatedLine {
    pub style: LineStyle,
    /// The line as it was appended, markers included
    pub raw: String,
}

impl AnnotatedLine {
    /// Classify a single line of agent or statistics text
    pub fn classify(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let trimmed = raw.trim_start();

        let style = if raw.contains(HEADING_MARKER) || trimmed.starts_with("# ") {
            LineStyle::Heading
        } else if raw.contains(EMPHASIS_MARKER) {
            LineStyle::Emphasis
        } else {
            LineStyle::Plain
        };

        Self { style, raw }
    }

    /// Text to render, with markup markers removed
    pub fn display_text(&self) -> String {
        match self.style {
            LineStyle::Heading => self
                .raw
                .replace(HEADING_MARKER, "")
                .replace(EMPHASIS_MARKER, "")
                .trim()
                .trim_start_matches('#')
                .trim()
                .to_string(),
            LineStyle::Emphasis => self.raw.replace(EMPHASIS_MARKER, "").trim().to_string(),
            LineStyle::Plain => self.raw.clone(),
        }
    }
}

/// Ordered, append-only report text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Narrative {
    lines: Vec<AnnotatedLine>,
}

impl Narrative {
    pub fn new() -> Self {
        Self::default()
    }

    /// Narrative made of the given lines
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(AnnotatedLine::classify).collect(),
        }
    }

    /// Append one line
    pub fn push_line(&mut self, raw: impl Into<String>) {
        self.lines.push(AnnotatedLine::classify(raw));
    }

    /// Append multi-line text, one annotated line per `\n`
    pub fn push_text(&mut self, text: &str) {
        self.lines.extend(text.split('\n').map(AnnotatedLine::classify));
    }

    /// Append a paragraph, separated from existing content by a blank line
    pub fn push_block(&mut self, text: &str) {
        if !self.lines.is_empty() {
            self.push_line("");
        }
        self.push_text(text);
    }

    /// Append the blank-line wrapped section separator
    pub fn push_separator(&mut self) {
        self.push_line("");
        self.push_line(SECTION_SEPARATOR);
        self.push_line("");
    }

    pub fn lines(&self) -> &[AnnotatedLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Raw lines joined with `\n`
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(|line| line.raw.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Transliterate to the Latin-1 repertoire of the built-in PDF fonts.
///
/// Typographic quotes, dashes, bullets and ellipses get ASCII stand-ins; any
/// other character outside Latin-1 is dropped.
pub fn to_latin1(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\u{2018}' | '\u{2019}' => out.push('\''),
            '\u{201C}' | '\u{201D}' => out.push('"'),
            '\u{2013}' | '\u{2014}' | '\u{2022}' => out.push('-'),
            '\u{2026}' => out.push_str("..."),
            c if u32::from(c) <= 0xFF => out.push(c),
            _ => {}
        }
    }
    out
}
