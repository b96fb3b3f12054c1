//! Canonical text for a single card printing.

use crate::types::Ruling;

/// Build the content stored for a card: its rules text followed by a
/// `Rulings:` block when rulings exist. Returns `None` when the card has no
/// text after trimming.
pub fn card_content(text: Option<&str>, rulings: &[Ruling]) -> Option<String> {
    let text = text.unwrap_or_default().trim();
    if text.is_empty() {
        return None;
    }
    if rulings.is_empty() {
        return Some(text.to_string());
    }
    let lines: Vec<String> = rulings.iter().map(|r| format!("{}: {}", r.date, r.text)).collect();
    let content = format!("{text}\n\nRulings:\n{}", lines.join("\n"));
    Some(content.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ruling(date: &str, text: &str) -> Ruling {
        Ruling { date: date.to_string(), text: text.to_string() }
    }

    #[test]
    fn text_without_rulings_is_trimmed_verbatim() {
        let content = card_content(Some("  Counter target spell.\n"), &[]);
        assert_eq!(content.as_deref(), Some("Counter target spell."));
    }

    #[test]
    fn rulings_are_appended_in_input_order() {
        let rulings = vec![ruling("2020-01-01", "Later first."), ruling("2018-12-07", "Earlier second.")];
        let content = card_content(Some("Draw a card."), &rulings).unwrap();
        assert_eq!(content, "Draw a card.\n\nRulings:\n2020-01-01: Later first.\n2018-12-07: Earlier second.");
    }

    #[test]
    fn documented_example_card() {
        let rulings = vec![ruling("2018-12-07", "Test ruling.")];
        let content = card_content(Some("Counter target noncreature spell."), &rulings).unwrap();
        assert_eq!(content, "Counter target noncreature spell.\n\nRulings:\n2018-12-07: Test ruling.");
    }

    #[test]
    fn blank_or_missing_text_has_no_content() {
        assert_eq!(card_content(None, &[]), None);
        assert_eq!(card_content(Some("   \n"), &[ruling("2018-12-07", "Ignored.")]), None);
    }

    #[test]
    fn trailing_whitespace_in_last_ruling_is_trimmed() {
        let content = card_content(Some("Flying"), &[ruling("2021-02-05", "Trailing.  \n")]).unwrap();
        assert!(content.ends_with("2021-02-05: Trailing."));
    }
}
