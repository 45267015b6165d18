//! JSON import/export module for kanji decks.
//! Provides functionality to save and load Deck structures to/from JSON files.

use crate::error::ExportError;
use crate::models::Deck;
use std::fs;
use std::path::Path;

/// Exports a deck to a pretty-printed JSON file at the specified path.
pub fn export_json_to_path(deck: &Deck, path: impl AsRef<Path>) -> Result<(), ExportError> {
    let json_string = serde_json::to_string_pretty(deck)?;
    fs::write(path.as_ref(), json_string)?;
    tracing::info!(deck = %deck.name, path = %path.as_ref().display(), "deck exported");
    Ok(())
}

/// Imports a deck from a JSON file.
/// Returns an error if the file doesn't exist or contains invalid JSON.
pub fn import_json(path: impl AsRef<Path>) -> Result<Deck, ExportError> {
    let contents = fs::read_to_string(path.as_ref())?;

    // Deserialize JSON string into Deck structure
    let deck: Deck = serde_json::from_str(&contents)?;

    tracing::info!(deck = %deck.name, path = %path.as_ref().display(), "deck read from file");
    Ok(deck)
}
