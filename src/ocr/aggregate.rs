//! Turns raw engine output into one reading per tile.
//!
//! One engine call can yield up to four kinds of candidates: the full text,
//! each line, each word, and a string assembled from individual symbols.
//! Symbol assembly wins outright when it produces a usable string; otherwise
//! the highest-confidence candidate is chosen.

use serde::Serialize;

use super::engine::{OcrSymbol, RawRecognitionOutput};

/// Confidence assumed for the full text when the engine reports none.
pub const FULL_TEXT_CONFIDENCE: f32 = 60.0;
/// Confidence assumed for a line when the engine reports none.
pub const LINE_CONFIDENCE: f32 = 50.0;
/// Confidence assumed for a word when the engine reports none.
pub const WORD_CONFIDENCE: f32 = 30.0;

/// Shortest and longest valid tile text.
pub const MIN_TILE_LEN: usize = 2;
pub const MAX_TILE_LEN: usize = 10;

/// A tile reading and where it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileCandidate {
    /// 2-10 lowercase ASCII letters
    pub text: String,
    /// Relative score; symbol assemblies can exceed 100
    pub confidence: f32,
    /// Id of the strategy that produced it
    pub strategy: String,
}

/// Strips everything but ASCII letters, lowercases, and enforces the tile
/// length bounds.
pub fn clean_text(text: &str) -> Option<String> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_lowercase())
        .collect();

    (MIN_TILE_LEN..=MAX_TILE_LEN)
        .contains(&cleaned.len())
        .then_some(cleaned)
}

/// Builds a string from single-letter symbols ordered left to right.
///
/// Score is the mean symbol confidence plus a length boost (40 for up to
/// three letters, 25 beyond) plus a quality bonus from the weakest symbol
/// (20 above 40, 10 above 30).
pub fn assemble_symbols(symbols: &[OcrSymbol]) -> Option<(String, f32)> {
    let mut letters: Vec<(&OcrSymbol, char)> = symbols
        .iter()
        .filter_map(|s| {
            let mut chars = s.text.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii_alphabetic() => Some((s, c)),
                _ => None,
            }
        })
        .collect();
    if letters.is_empty() {
        return None;
    }
    letters.sort_by_key(|(s, _)| s.x0);

    let text = clean_text(&letters.iter().map(|(_, c)| *c).collect::<String>())?;

    let sum: f32 = letters.iter().map(|(s, _)| s.confidence).sum();
    let avg = sum / letters.len() as f32;
    let min = letters
        .iter()
        .map(|(s, _)| s.confidence)
        .fold(f32::INFINITY, f32::min);

    let quality_bonus = if min > 40.0 {
        20.0
    } else if min > 30.0 {
        10.0
    } else {
        0.0
    };
    let length_boost = if text.len() <= 3 { 40.0 } else { 25.0 };

    Some((text, avg + length_boost + quality_bonus))
}

/// Collects full-text, line and word candidates, in that order.
pub fn text_candidates(raw: &RawRecognitionOutput) -> Vec<(String, f32)> {
    let mut candidates = Vec::new();

    if let Some(text) = raw.text.as_deref().and_then(clean_text) {
        candidates.push((text, raw.text_confidence.unwrap_or(FULL_TEXT_CONFIDENCE)));
    }
    for line in &raw.lines {
        if let Some(text) = clean_text(&line.text) {
            candidates.push((text, line.confidence.unwrap_or(LINE_CONFIDENCE)));
        }
    }
    for word in &raw.words {
        if let Some(text) = clean_text(&word.text) {
            candidates.push((text, word.confidence.unwrap_or(WORD_CONFIDENCE)));
        }
    }

    candidates
}

/// Merges duplicate texts, keeping each text's highest confidence.
/// First-seen order is preserved.
pub fn dedupe_candidates(candidates: Vec<(String, f32)>) -> Vec<(String, f32)> {
    let mut merged: Vec<(String, f32)> = Vec::new();
    for (text, confidence) in candidates {
        match merged.iter_mut().find(|(t, _)| *t == text) {
            Some(existing) => existing.1 = existing.1.max(confidence),
            None => merged.push((text, confidence)),
        }
    }
    merged
}

/// Chooses the reading for one engine call, or `None` if nothing usable came back.
pub fn best_candidate(raw: &RawRecognitionOutput, strategy: &str) -> Option<TileCandidate> {
    if let Some((text, confidence)) = assemble_symbols(&raw.symbols) {
        return Some(TileCandidate {
            text,
            confidence,
            strategy: strategy.to_string(),
        });
    }

    let mut best: Option<(String, f32)> = None;
    for (text, confidence) in dedupe_candidates(text_candidates(raw)) {
        if best.as_ref().is_none_or(|(_, c)| confidence > *c) {
            best = Some((text, confidence));
        }
    }

    best.map(|(text, confidence)| TileCandidate {
        text,
        confidence,
        strategy: strategy.to_string(),
    })
}

/// True if `candidate` should replace `current` as a tile's best reading.
///
/// Only a strictly higher confidence replaces an existing reading, so on a
/// tie the earlier strategy keeps the tile.
pub fn improves(current: Option<&TileCandidate>, candidate: &TileCandidate) -> bool {
    current.is_none_or(|c| candidate.confidence > c.confidence)
}
