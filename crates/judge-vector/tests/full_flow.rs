use std::collections::HashSet;
use std::fs::File;
use std::path::PathBuf;
use tempfile::TempDir;

use judge_core::{split_atomic, split_rules, BatchedLoader, LoadStats, ParagraphSeparator, PassageSink, PassageType};
use judge_embed::HashEmbedder;
use judge_vector::{LancePassageSearch, LancePassageSink};

fn test_data(name: &str) -> PathBuf {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).ancestors().nth(2).unwrap().to_path_buf();
    root.join("test_data").join(name)
}

const DIM: usize = 64;
const TABLE: &str = "passages_test_tmp";

fn open_sink(tmp: &TempDir) -> LancePassageSink {
    LancePassageSink::open(tmp.path(), TABLE, Box::new(HashEmbedder::new(DIM))).expect("sink")
}

#[test]
fn lancedb_load_and_search() {
    let tmp = TempDir::new().expect("tmp");
    let mut sink = open_sink(&tmp);
    assert_eq!(sink.count_rows().unwrap(), 0);

    let cards = split_atomic(File::open(test_data("atomic.json")).unwrap(), "atomic.json").unwrap();
    let stats = BatchedLoader::new(&mut sink).load(cards).expect("load cards");
    assert_eq!(stats, LoadStats { passages: 2, batches: 1 });

    let rules = split_rules(File::open(test_data("rules.txt")).unwrap(), "rules.txt", ParagraphSeparator::Lf).unwrap();
    let stats = BatchedLoader::new(&mut sink).with_batch_size(8).load(rules.map(Ok)).expect("load rules");
    assert_eq!(stats.passages, 20);
    assert_eq!(sink.rows_written(), 22);
    assert_eq!(sink.count_rows().unwrap(), 22);

    let search = LancePassageSearch::open(tmp.path(), TABLE, Box::new(HashEmbedder::new(DIM))).expect("search");
    let hits = search.search("Counter target spell.", 3).expect("search");
    assert_eq!(hits.len(), 3);
    for pair in hits.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }

    let top = &hits[0].passage;
    assert_eq!(top.content, "Counter target spell.");
    assert_eq!(top.passage_type(), PassageType::CardText);
    assert_eq!(top.metadata.name, "Counterspell");
    assert_eq!(top.metadata.source, "atomic.json");
    let ids = top.metadata.identifiers.as_ref().expect("card identifiers");
    assert_eq!(ids["scryfallOracleId"], "1e5ea7a2-8a0c-4a43-8b4c-7a3d4a8e0f11");
}

#[test]
fn rules_metadata_survives_the_round_trip() {
    let tmp = TempDir::new().expect("tmp");
    let mut sink = open_sink(&tmp);
    let rules = split_rules(File::open(test_data("rules.txt")).unwrap(), "rules.txt", ParagraphSeparator::Lf).unwrap();
    BatchedLoader::new(&mut sink).load(rules.map(Ok)).expect("load rules");

    let search = LancePassageSearch::open(tmp.path(), TABLE, Box::new(HashEmbedder::new(DIM))).expect("search");
    let question = "100.1a A two-player game is a game that begins with only two players.";
    let hits = search.search(question, 1).expect("search");
    let top = &hits[0].passage;
    assert_eq!(top.content, question);
    assert_eq!(top.passage_type(), PassageType::CoreRule);
    assert_eq!(top.metadata.section, "General");
    assert!(top.metadata.identifiers.is_none());
    assert!(top.metadata.rulings.is_empty());
}

#[test]
fn reopening_appends_to_the_existing_table() {
    let tmp = TempDir::new().expect("tmp");
    for _ in 0..2 {
        let mut sink = open_sink(&tmp);
        let cards = split_atomic(File::open(test_data("atomic.json")).unwrap(), "atomic.json").unwrap();
        BatchedLoader::new(&mut sink).load(cards).expect("load cards");
    }
    assert_eq!(open_sink(&tmp).count_rows().unwrap(), 4);

    let search = LancePassageSearch::open(tmp.path(), TABLE, Box::new(HashEmbedder::new(DIM))).expect("search");
    let hits = search.search("Counter target spell.", 4).expect("search");
    assert_eq!(hits.len(), 4);
    let ids: HashSet<&str> = hits.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids.len(), 4, "a second load of the same file gets fresh row ids");
}

#[test]
fn empty_batch_creates_nothing() {
    let tmp = TempDir::new().expect("tmp");
    let mut sink = open_sink(&tmp);
    sink.add_documents(Vec::new()).unwrap();
    assert_eq!(sink.count_rows().unwrap(), 0);

    let search = LancePassageSearch::open(tmp.path(), TABLE, Box::new(HashEmbedder::new(DIM))).expect("search");
    assert!(search.search("anything", 5).is_err(), "searching before any load reports the missing table");
}
