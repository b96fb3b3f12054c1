//! Comprehensive rules segmentation.
//!
//! The document is split into paragraphs and each paragraph is tagged with
//! the section heading active at that point. Section tracking is an explicit
//! state value handed from one step to the next, so every segmentation run
//! owns its own state.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Read;
use std::sync::OnceLock;

use crate::error::Result;
use crate::types::{Metadata, Passage, PassageType};

/// Blank-line sequence that separates paragraphs in the rules file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParagraphSeparator {
    /// `\n\n`
    #[default]
    Lf,
    /// `\r\n\r\n`
    CrLf,
}

impl ParagraphSeparator {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n\n",
            Self::CrLf => "\r\n\r\n",
        }
    }
}

/// The section a paragraph belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Section {
    #[default]
    Start,
    Named(String),
    Glossary,
    End,
}

impl Section {
    /// Section for a numbered heading's text. Texts that spell one of the
    /// sentinel sections collapse onto that section.
    fn from_heading(text: &str) -> Self {
        match text {
            "start" => Self::Start,
            "Glossary" => Self::Glossary,
            "end" => Self::End,
            other => Self::Named(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Start => "start",
            Self::Named(name) => name,
            Self::Glossary => "Glossary",
            Self::End => "end",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{0,3}\. (.*)$").expect("heading pattern"))
}

fn rule_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+\.\d+[a-z]?\.? ").expect("rule pattern"))
}

/// Section after seeing `paragraph`, given the current one.
fn next_section(current: Section, paragraph: &str) -> Section {
    if let Some(caps) = heading_re().captures(paragraph) {
        return Section::from_heading(&caps[1]);
    }
    match paragraph {
        "Glossary" => Section::Glossary,
        "Introduction" => Section::Named("Introduction".to_string()),
        "Credits" => Section::End,
        _ => current,
    }
}

/// One segmentation step: updates the section first, then classifies the
/// paragraph against the updated section. Blank paragraphs leave the state
/// untouched and produce nothing.
pub fn step(section: Section, paragraph: &str, source: &str) -> (Section, Option<Passage>) {
    let paragraph = paragraph.trim();
    if paragraph.is_empty() {
        return (section, None);
    }
    let section = next_section(section, paragraph);

    let (passage_type, content) = if rule_re().is_match(paragraph) {
        (PassageType::CoreRule, paragraph.to_string())
    } else if section == Section::Glossary {
        let (first_line, rest) = paragraph.split_once('\n').unwrap_or((paragraph, ""));
        let first_line = first_line.strip_suffix('\r').unwrap_or(first_line);
        (PassageType::Glossary, format!("\"{first_line}\": {rest}"))
    } else {
        (PassageType::Other, paragraph.to_string())
    };

    let metadata = Metadata::rules(source, passage_type, section.as_str());
    (section, Some(Passage { content, metadata }))
}

/// Lazy passages over an owned rules document.
pub struct RulesPassages {
    text: String,
    separator: ParagraphSeparator,
    source: String,
    pos: usize,
    section: Section,
}

impl RulesPassages {
    pub fn new(text: String, source: &str, separator: ParagraphSeparator) -> Self {
        Self { text, separator, source: source.to_string(), pos: 0, section: Section::Start }
    }

    /// Section in effect after the passages pulled so far.
    pub fn section(&self) -> &Section {
        &self.section
    }

    fn next_paragraph(&mut self) -> Option<(usize, usize)> {
        if self.pos > self.text.len() {
            return None;
        }
        let sep = self.separator.as_str();
        let start = self.pos;
        let end = self.text[start..].find(sep).map_or(self.text.len(), |i| start + i);
        self.pos = if end == self.text.len() { end + 1 } else { end + sep.len() };
        Some((start, end))
    }
}

impl Iterator for RulesPassages {
    type Item = Passage;

    fn next(&mut self) -> Option<Passage> {
        while let Some((start, end)) = self.next_paragraph() {
            let section = std::mem::take(&mut self.section);
            let (section, passage) = step(section, &self.text[start..end], &self.source);
            self.section = section;
            if passage.is_some() {
                return passage;
            }
        }
        None
    }
}

/// Read a whole rules document and segment it.
pub fn split_rules<R: Read>(mut reader: R, source: &str, separator: ParagraphSeparator) -> Result<RulesPassages> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    Ok(RulesPassages::new(text, source, separator))
}
