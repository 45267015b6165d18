//! A kanji card: the character, its readings and its meaning.
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Kanji {
    pub character: String,
    #[serde(default)]
    pub onyomi: Vec<String>,
    #[serde(default)]
    pub kunyomi: Vec<String>,
    pub meaning: String,
    pub jlpt_level: u8,
    #[serde(default)]
    pub stroke_count: Option<u8>,
}

impl Kanji {
    /// Readings joined for display, on'yomi first.
    pub fn readings(&self) -> String {
        self.onyomi
            .iter()
            .chain(self.kunyomi.iter())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("、")
    }
}
