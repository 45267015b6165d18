//! Deck is an ordered set of kanji
use super::Kanji;
use serde::{Deserialize, Serialize};

fn default_xp_multiplier() -> f64 {
    1.0
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Deck {
    pub name: String,
    #[serde(default = "default_xp_multiplier")]
    pub xp_multiplier: f64,
    pub kanjis: Vec<Kanji>,
}
