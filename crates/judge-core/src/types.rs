//! Passage and metadata types shared by every producer and sink.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// External card identifiers keyed by provider (e.g. `scryfallOracleId`).
pub type Identifiers = BTreeMap<String, String>;

/// A dated official clarification attached to a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ruling {
    pub date: String,
    pub text: String,
}

/// How a passage was classified when it was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PassageType {
    CoreRule,
    CardText,
    Glossary,
    Other,
}

impl PassageType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CoreRule => "core-rule",
            Self::CardText => "card-text",
            Self::Glossary => "glossary",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for PassageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PassageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "core-rule" => Ok(Self::CoreRule),
            "card-text" => Ok(Self::CardText),
            "glossary" => Ok(Self::Glossary),
            "other" => Ok(Self::Other),
            other => Err(format!("unknown passage type '{other}'")),
        }
    }
}

/// Attributes attached to every passage.
///
/// - `name`/`original_text`/`identifiers`: card fields, empty or `None` for
///   rules passages
/// - `source`: label of the file or stream the passage came from
/// - `section`: rules heading active when the passage was produced, empty for cards
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub name: String,
    pub original_text: String,
    pub identifiers: Option<Identifiers>,
    pub source: String,
    pub rulings: Vec<Ruling>,
    #[serde(rename = "type")]
    pub passage_type: PassageType,
    pub section: String,
}

impl Metadata {
    /// Metadata for a passage cut from the rules document.
    pub fn rules(source: &str, passage_type: PassageType, section: &str) -> Self {
        Self {
            name: String::new(),
            original_text: String::new(),
            identifiers: None,
            source: source.to_string(),
            rulings: Vec::new(),
            passage_type,
            section: section.to_string(),
        }
    }
}

/// One retrievable unit of text. `content` is never blank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    pub content: String,
    pub metadata: Metadata,
}

impl Passage {
    pub fn passage_type(&self) -> PassageType {
        self.metadata.passage_type
    }
}
