//! Card database splitting for the two MTGJSON layouts.
//!
//! Both entry points read the file with a pull-based JSON reader: a card
//! record is only parsed when the caller asks for the next passage, so the
//! parsed corpus never sits in memory as a whole. The caller picks the
//! layout; no format detection is attempted.
//!
//! - [`split_atomic`]: `{"data": {"<name>": [<printing>, ...]}}`
//! - [`split_detailed`]: `{"data": [<card>, ...], "rulings": [...]}`

use serde::Deserialize;
use std::io::{Read, Seek, SeekFrom};
use struson::reader::{JsonReader, JsonStreamReader, ReaderError};
use tracing::{debug, info};

use crate::error::{BoxError, Error, Result};
use crate::normalize::card_content;
use crate::types::{Identifiers, Metadata, Passage, PassageType, Ruling};

#[derive(Deserialize)]
struct Printing {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    rulings: Option<Vec<Ruling>>,
    identifiers: Identifiers,
}

#[derive(Deserialize)]
struct DetailedCard {
    name: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    rulings: Option<Vec<Ruling>>,
    identifiers: Identifiers,
}

/// Fields of one printing or card, borrowed for normalization.
struct CardRecord<'a> {
    name: &'a str,
    text: Option<&'a str>,
    rulings: &'a [Ruling],
    identifiers: Identifiers,
}

fn card_passage(card: CardRecord<'_>, metadata_rulings: Vec<Ruling>, source: &str) -> Option<Passage> {
    let Some(content) = card_content(card.text, card.rulings) else {
        info!("Skipping {} because it has no text", card.name);
        return None;
    };
    let metadata = Metadata {
        name: card.name.to_string(),
        original_text: content.clone(),
        identifiers: Some(card.identifiers),
        source: source.to_string(),
        rulings: metadata_rulings,
        passage_type: PassageType::CardText,
        section: String::new(),
    };
    Some(Passage { content, metadata })
}

/// Enter the top-level object and stop in front of its `data` value.
fn enter_data<R: Read>(json: &mut JsonStreamReader<R>) -> std::result::Result<(), BoxError> {
    json.begin_object()?;
    while json.has_next()? {
        if json.next_name()? == "data" {
            return Ok(());
        }
        json.skip_value()?;
    }
    Err("missing `data` member".into())
}

/// Skip whatever follows `data` and close the top-level object.
fn close_document<R: Read>(json: &mut JsonStreamReader<R>) -> std::result::Result<(), ReaderError> {
    while json.has_next()? {
        json.skip_name()?;
        json.skip_value()?;
    }
    json.end_object()
}

/// Document-level `rulings` of a detailed file, wherever the key sits.
fn read_document_rulings<R: Read>(reader: R) -> std::result::Result<Vec<Ruling>, BoxError> {
    let mut json = JsonStreamReader::new(reader);
    let mut rulings = Vec::new();
    json.begin_object()?;
    while json.has_next()? {
        if json.next_name()? == "rulings" {
            rulings = json.deserialize_next()?;
        } else {
            json.skip_value()?;
        }
    }
    json.end_object()?;
    Ok(rulings)
}

/// Open an "atomic" card file: card name → list of printings.
pub fn split_atomic<R: Read>(reader: R, source: &str) -> Result<AtomicPassages<R>> {
    let mut json = JsonStreamReader::new(reader);
    enter_data(&mut json).map_err(|e| Error::malformed(source, e))?;
    json.begin_object().map_err(|e| Error::malformed(source, e))?;
    debug!(source, "Opened atomic card file");
    Ok(AtomicPassages { json, source: source.to_string(), current: None, position: 0, done: false })
}

/// Open a "detailed" card file: a flat list of cards.
///
/// The `rulings` metadata of every passage is the document-level `rulings`
/// list, while the content is built from each card's own rulings. That list
/// may follow `data` in the file, so it is read in a first pass that skips
/// the cards, then the reader is rewound to stream them.
pub fn split_detailed<R: Read + Seek>(mut reader: R, source: &str) -> Result<DetailedPassages<R>> {
    let document_rulings = read_document_rulings(&mut reader).map_err(|e| Error::malformed(source, e))?;
    reader.seek(SeekFrom::Start(0))?;

    let mut json = JsonStreamReader::new(reader);
    enter_data(&mut json).map_err(|e| Error::malformed(source, e))?;
    json.begin_array().map_err(|e| Error::malformed(source, e))?;
    debug!(source, rulings = document_rulings.len(), "Opened detailed card file");
    Ok(DetailedPassages { json, source: source.to_string(), document_rulings, position: 0, done: false })
}

/// Lazy passages from an atomic card file, one per printing with text.
pub struct AtomicPassages<R: Read> {
    json: JsonStreamReader<R>,
    source: String,
    current: Option<(String, std::vec::IntoIter<Printing>)>,
    position: usize,
    done: bool,
}

impl<R: Read> AtomicPassages<R> {
    fn advance(&mut self) -> std::result::Result<Option<Passage>, BoxError> {
        loop {
            if let Some((name, printings)) = &mut self.current {
                for printing in printings.by_ref() {
                    let rulings = printing.rulings.unwrap_or_default();
                    let card = CardRecord {
                        name: name.as_str(),
                        text: printing.text.as_deref(),
                        rulings: &rulings,
                        identifiers: printing.identifiers,
                    };
                    if let Some(passage) = card_passage(card, rulings.clone(), &self.source) {
                        return Ok(Some(passage));
                    }
                }
                self.current = None;
            }
            if !self.json.has_next()? {
                self.json.end_object()?;
                close_document(&mut self.json)?;
                return Ok(None);
            }
            let name = self.json.next_name_owned()?;
            let printings: Vec<Printing> = self.json.deserialize_next()?;
            self.position += 1;
            debug!("Loaded {} cards", self.position);
            self.current = Some((name, printings.into_iter()));
        }
    }
}

impl<R: Read> Iterator for AtomicPassages<R> {
    type Item = Result<Passage>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let step = self.advance();
        fuse(&mut self.done, &self.source, step)
    }
}

/// Lazy passages from a detailed card file, one per card with text.
pub struct DetailedPassages<R: Read> {
    json: JsonStreamReader<R>,
    source: String,
    document_rulings: Vec<Ruling>,
    position: usize,
    done: bool,
}

impl<R: Read> DetailedPassages<R> {
    fn advance(&mut self) -> std::result::Result<Option<Passage>, BoxError> {
        while self.json.has_next()? {
            let card: DetailedCard = self.json.deserialize_next()?;
            self.position += 1;
            debug!("Loaded {} cards", self.position);
            let rulings = card.rulings.unwrap_or_default();
            let record = CardRecord {
                name: &card.name,
                text: card.text.as_deref(),
                rulings: &rulings,
                identifiers: card.identifiers,
            };
            if let Some(passage) = card_passage(record, self.document_rulings.clone(), &self.source) {
                return Ok(Some(passage));
            }
        }
        self.json.end_array()?;
        close_document(&mut self.json)?;
        Ok(None)
    }
}

impl<R: Read> Iterator for DetailedPassages<R> {
    type Item = Result<Passage>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let step = self.advance();
        fuse(&mut self.done, &self.source, step)
    }
}

/// The first error is reported once, then the sequence ends.
fn fuse(
    done: &mut bool,
    source: &str,
    step: std::result::Result<Option<Passage>, BoxError>,
) -> Option<Result<Passage>> {
    match step {
        Ok(Some(passage)) => Some(Ok(passage)),
        Ok(None) => {
            *done = true;
            None
        }
        Err(e) => {
            *done = true;
            Some(Err(Error::malformed(source, e)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::io::Cursor;
    use std::rc::Rc;

    const ATOMIC: &str = r#"{
        "data": {
            "Counterspell": [
                {"text": "Counter target spell.", "identifiers": {"scryfallOracleId": "a1"}}
            ],
            "Forest": [
                {"identifiers": {"scryfallOracleId": "b2"}}
            ],
            "Negate": [
                {
                    "text": "Counter target noncreature spell.",
                    "rulings": [{"date": "2018-12-07", "text": "Test ruling."}],
                    "identifiers": {"scryfallOracleId": "c3"}
                },
                {"text": "  ", "identifiers": {"scryfallOracleId": "c4"}}
            ]
        }
    }"#;

    fn collect<I: Iterator<Item = Result<Passage>>>(passages: I) -> Vec<Passage> {
        passages.collect::<Result<_>>().unwrap()
    }

    #[test]
    fn atomic_emits_one_passage_per_printing_with_text() {
        let passages = collect(split_atomic(ATOMIC.as_bytes(), "atomic.json").unwrap());
        assert_eq!(passages.len(), 2);
        assert_eq!(passages[0].content, "Counter target spell.");
        assert_eq!(passages[0].metadata.name, "Counterspell");
        assert!(passages[0].metadata.rulings.is_empty());
        assert_eq!(
            passages[1].content,
            "Counter target noncreature spell.\n\nRulings:\n2018-12-07: Test ruling."
        );
        assert_eq!(passages[1].metadata.rulings.len(), 1);
    }

    #[test]
    fn atomic_metadata_is_card_text() {
        let passage = split_atomic(ATOMIC.as_bytes(), "atomic.json").unwrap().next().unwrap().unwrap();
        let meta = &passage.metadata;
        assert_eq!(meta.passage_type, PassageType::CardText);
        assert_eq!(meta.source, "atomic.json");
        assert_eq!(meta.section, "");
        assert_eq!(meta.original_text, passage.content);
        assert_eq!(meta.identifiers.as_ref().unwrap()["scryfallOracleId"], "a1");
    }

    #[test]
    fn atomic_without_data_key_is_malformed() {
        let err = split_atomic(r#"{"meta": {}}"#.as_bytes(), "bad.json").err().unwrap();
        assert!(matches!(err, Error::Malformed { ref source_label, .. } if source_label == "bad.json"));
    }

    #[test]
    fn atomic_printing_without_identifiers_fails_when_reached() {
        let json = r#"{"data": {"A": [{"text": "ok", "identifiers": {}}], "B": [{"text": "no ids"}]}}"#;
        let mut passages = split_atomic(json.as_bytes(), "x.json").unwrap();
        assert!(passages.next().unwrap().is_ok());
        assert!(matches!(passages.next(), Some(Err(Error::Malformed { .. }))));
        assert!(passages.next().is_none());
    }

    #[test]
    fn atomic_skips_members_around_data() {
        let json = r#"{
            "meta": {"version": "5.2.2", "tags": [1, {"x": null}]},
            "data": {"Opt": [{"text": "Scry 1.", "identifiers": {}, "colors": ["U"]}]},
            "trailer": "ignored"
        }"#;
        let passages = collect(split_atomic(json.as_bytes(), "a.json").unwrap());
        assert_eq!(passages.len(), 1);
        assert_eq!(passages[0].content, "Scry 1.");
    }

    struct CountingReader {
        inner: Cursor<Vec<u8>>,
        consumed: Rc<Cell<usize>>,
    }

    impl Read for CountingReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = self.inner.read(buf)?;
            self.consumed.set(self.consumed.get() + n);
            Ok(n)
        }
    }

    #[test]
    fn atomic_reads_only_a_prefix_before_the_first_passage() {
        let cards: Vec<String> = (0..5000)
            .map(|i| {
                let text = format!("Card {i} draws a card, then discards a card at random.");
                format!(r#""Card {i}": [{{"text": "{text}", "identifiers": {{"scryfallOracleId": "id-{i}"}}}}]"#)
            })
            .collect();
        let json = format!(r#"{{"meta": {{}}, "data": {{{}}}}}"#, cards.join(",\n"));
        let total = json.len();
        let consumed = Rc::new(Cell::new(0));
        let reader = CountingReader { inner: Cursor::new(json.into_bytes()), consumed: Rc::clone(&consumed) };

        let mut passages = split_atomic(reader, "big.json").unwrap();
        let first = passages.next().unwrap().unwrap();
        assert_eq!(first.metadata.name, "Card 0");
        assert!(consumed.get() < total / 4, "read {} of {} bytes for one passage", consumed.get(), total);

        assert_eq!(passages.filter(Result::is_ok).count(), 4999);
        assert_eq!(consumed.get(), total);
    }

    #[test]
    fn detailed_takes_metadata_rulings_from_document() {
        let json = r#"{
            "data": [
                {"name": "Negate", "text": "Counter target noncreature spell.",
                 "rulings": [{"date": "2018-12-07", "text": "Card ruling."}],
                 "identifiers": {"scryfallOracleId": "c3"}},
                {"name": "Forest", "identifiers": {}}
            ],
            "rulings": [{"date": "2001-01-01", "text": "Document ruling."}]
        }"#;
        let passages = collect(split_detailed(Cursor::new(json), "detailed.json").unwrap());
        assert_eq!(passages.len(), 1);
        assert_eq!(
            passages[0].content,
            "Counter target noncreature spell.\n\nRulings:\n2018-12-07: Card ruling."
        );
        let document_ruling = Ruling { date: "2001-01-01".into(), text: "Document ruling.".into() };
        assert_eq!(passages[0].metadata.rulings, vec![document_ruling]);
    }

    #[test]
    fn detailed_without_document_rulings_has_empty_metadata_rulings() {
        let json = r#"{"data": [{"name": "Negate", "text": "Counter.",
            "rulings": [{"date": "d", "text": "t"}], "identifiers": {}}]}"#;
        let passages = collect(split_detailed(Cursor::new(json), "d.json").unwrap());
        assert!(passages[0].metadata.rulings.is_empty());
        assert!(passages[0].content.ends_with("d: t"));
    }

    #[test]
    fn detailed_card_without_name_is_malformed() {
        let json = r#"{"data": [{"text": "Counter.", "identifiers": {}}]}"#;
        let mut passages = split_detailed(Cursor::new(json), "d.json").unwrap();
        assert!(matches!(passages.next(), Some(Err(Error::Malformed { .. }))));
        assert!(passages.next().is_none());
    }
}
