use judge_core::PassageType;
use judge_vector::ScoredPassage;

const SCRYFALL_TAGGER: &str = "https://tagger.scryfall.com/card/oracle";

pub fn print_hits(question: &str, hits: &[ScoredPassage]) {
    println!("Found {} passages for: \"{}\"", hits.len(), question);

    let of_type = |t: PassageType| hits.iter().filter(move |h| h.passage.passage_type() == t);

    println!("\nCards:");
    for hit in of_type(PassageType::CardText) {
        let meta = &hit.passage.metadata;
        println!("\n  [{:.4}] {}", hit.score, meta.name);
        if let Some(ids) = &meta.identifiers {
            if let Some(oracle_id) = ids.get("scryfallOracleId") {
                println!("  {SCRYFALL_TAGGER}/{oracle_id}");
            }
        }
        println!("  {}", hit.passage.content.replace('\n', "\n  "));
    }

    println!("\nRules:");
    for hit in of_type(PassageType::CoreRule).chain(of_type(PassageType::Glossary)) {
        println!("  [{:.4}] ({}) {}", hit.score, hit.passage.metadata.section, hit.passage.content);
    }

    println!("\nOther:");
    for hit in of_type(PassageType::Other) {
        println!("  [{:.4}] {}", hit.score, hit.passage.content);
    }
}
