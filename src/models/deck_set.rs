//! Container for all available decks
use super::Deck;

#[derive(Clone, Debug, Default)]
pub struct DeckSet {
    pub decks: Vec<Deck>,
}

impl DeckSet {
    pub fn kanji_count(&self) -> usize {
        self.decks.iter().map(|d| d.kanjis.len()).sum()
    }
}
