//! Word search over tile arrangements.
//!
//! Every ordered selection of one to four distinct tiles is concatenated and
//! looked up in the word set. Matches are grouped by how many tiles they use.

use std::collections::HashSet;
use std::fmt;

/// Tiles of a sample board, used when neither an image nor tiles are given.
pub const DEFAULT_TILES: [&str; 20] = [
    "far", "ci", "ca", "lly", "rec", "ep", "tac", "les", "cap", "itu", "la", "te", "jou", "rn",
    "al", "ing", "aft", "er", "tho", "ught",
];

/// Most tiles a single word may use.
pub const MAX_TILES_PER_WORD: usize = 4;

const CONSONANTS: &str = "bcdfghjklmnpqrstvwxyz";

const PROFANITY: &[&str] = &[
    "fuck", "shit", "bitch", "dick", "piss", "cock", "cunt", "twat", "ass", "damn", "hell",
];

/// All ordered selections of distinct tiles, shortest first.
///
/// Calling `iter()` again starts over from the beginning.
#[derive(Clone, Copy, Debug)]
pub struct Arrangements<'a> {
    tiles: &'a [String],
    max_len: usize,
}

pub fn arrangements(tiles: &[String], max_len: usize) -> Arrangements<'_> {
    Arrangements {
        tiles,
        max_len: max_len.min(tiles.len()),
    }
}

impl<'a> Arrangements<'a> {
    pub fn iter(&self) -> ArrangementIter<'a> {
        ArrangementIter {
            tiles: self.tiles,
            max_len: self.max_len,
            indices: Vec::new(),
        }
    }

    /// Number of arrangements `iter()` yields.
    pub fn count(&self) -> usize {
        let n = self.tiles.len();
        (1..=self.max_len)
            .map(|r| (n - r + 1..=n).product::<usize>())
            .sum()
    }
}

impl<'a> IntoIterator for &Arrangements<'a> {
    type Item = Vec<&'a str>;
    type IntoIter = ArrangementIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Walks arrangements in lexicographic order of tile positions.
pub struct ArrangementIter<'a> {
    tiles: &'a [String],
    max_len: usize,
    /// Positions of the last yielded arrangement; empty before the first
    indices: Vec<usize>,
}

impl ArrangementIter<'_> {
    /// Advances `indices` to the next arrangement of the same length.
    fn advance(&mut self) -> bool {
        let n = self.tiles.len();
        for i in (0..self.indices.len()).rev() {
            let used = &self.indices[..i];
            let next = (self.indices[i] + 1..n).find(|c| !used.contains(c));
            if let Some(next) = next {
                self.indices[i] = next;
                self.fill_from(i + 1);
                return true;
            }
        }
        false
    }

    /// Sets positions `start..` to the smallest unused indices, ascending.
    fn fill_from(&mut self, start: usize) {
        let len = self.indices.len();
        let mut candidate = 0;
        for i in start..len {
            while self.indices[..i].contains(&candidate) {
                candidate += 1;
            }
            self.indices[i] = candidate;
            candidate += 1;
        }
    }

    fn start_length(&mut self, len: usize) {
        self.indices = vec![0; len];
        self.fill_from(0);
    }
}

impl<'a> Iterator for ArrangementIter<'a> {
    type Item = Vec<&'a str>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.indices.is_empty() {
            if self.max_len == 0 {
                return None;
            }
            self.start_length(1);
        } else if !self.advance() {
            let len = self.indices.len() + 1;
            if len > self.max_len {
                return None;
            }
            self.start_length(len);
        }
        Some(self.indices.iter().map(|&i| self.tiles[i].as_str()).collect())
    }
}

/// Keeps purely alphabetic words and drops profanity.
pub fn filter_words(words: &HashSet<String>) -> HashSet<String> {
    words
        .iter()
        .filter(|w| !w.is_empty() && w.chars().all(char::is_alphabetic))
        .filter(|w| !PROFANITY.contains(&w.as_str()))
        .cloned()
        .collect()
}

/// Advisory tags for a word. Short all-consonant words are likely abbreviations.
pub fn classify_word(word: &str) -> Vec<&'static str> {
    let mut tags = Vec::new();
    if word.chars().count() <= 3 && word.chars().all(|c| CONSONANTS.contains(c)) {
        tags.push("abbreviation");
    }
    tags
}

/// One word and the first arrangement that spelled it.
#[derive(Clone, Debug, PartialEq)]
pub struct WordMatch {
    pub tiles: Vec<String>,
    pub word: String,
    pub tags: Vec<&'static str>,
}

/// Matches that use the same number of tiles.
#[derive(Clone, Debug, PartialEq)]
pub struct SolveGroup {
    pub tiles_used: usize,
    /// Untagged words first, each part alphabetical
    pub matches: Vec<WordMatch>,
}

impl SolveGroup {
    pub fn questionable(&self) -> usize {
        self.matches.iter().filter(|m| !m.tags.is_empty()).count()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SolveReport {
    /// Non-empty groups in ascending tile count
    pub groups: Vec<SolveGroup>,
    pub total: usize,
    pub questionable: usize,
    pub min_length: usize,
}

/// Finds every word in `words` spelled by one to four distinct tiles.
pub fn solve(tiles: &[String], words: &HashSet<String>, min_length: usize) -> SolveReport {
    let mut groups: Vec<SolveGroup> = (1..=MAX_TILES_PER_WORD)
        .map(|tiles_used| SolveGroup {
            tiles_used,
            matches: Vec::new(),
        })
        .collect();

    for combo in &arrangements(tiles, MAX_TILES_PER_WORD) {
        let word = combo.concat();
        if word.chars().count() < min_length || !words.contains(&word) {
            continue;
        }
        let group = &mut groups[combo.len() - 1];
        if group.matches.iter().any(|m| m.word == word) {
            continue;
        }
        group.matches.push(WordMatch {
            tiles: combo.iter().map(|t| t.to_string()).collect(),
            tags: classify_word(&word),
            word,
        });
    }

    groups.retain(|g| !g.matches.is_empty());
    for group in &mut groups {
        group
            .matches
            .sort_by(|a, b| (!a.tags.is_empty(), &a.word).cmp(&(!b.tags.is_empty(), &b.word)));
    }

    let total = groups.iter().map(|g| g.matches.len()).sum();
    let questionable = groups.iter().map(SolveGroup::questionable).sum();

    SolveReport {
        groups,
        total,
        questionable,
        min_length,
    }
}

/// Formats tiles four per row, each padded to eight columns.
pub fn format_tile_grid(tiles: &[String]) -> String {
    tiles
        .chunks(4)
        .map(|row| {
            let cells: Vec<String> = row.iter().map(|t| format!("{:8}", t)).collect();
            format!("  {}\n", cells.join("  "))
        })
        .collect()
}

impl fmt::Display for SolveReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(30);

        for group in &self.groups {
            writeln!(f, "\n--- {} Tile Combinations ---", group.tiles_used)?;
            let lefts: Vec<String> = group.matches.iter().map(|m| m.tiles.join(" + ")).collect();
            let width = lefts.iter().map(String::len).max().unwrap_or(0);

            for (left, m) in lefts.iter().zip(&group.matches) {
                if m.tags.is_empty() {
                    writeln!(f, "{:<width$} = {}", left, m.word)?;
                } else {
                    writeln!(f, "{:<width$} = {} [{}]", left, m.word, m.tags.join(", "))?;
                }
            }
            writeln!(
                f,
                "Count: {} ({} may need review)",
                group.matches.len(),
                group.questionable()
            )?;
        }

        writeln!(f, "\n{}", rule)?;
        writeln!(f, "SUMMARY")?;
        writeln!(f, "{}", rule)?;
        writeln!(f, "Total words found: {}", self.total)?;
        if self.questionable > 0 {
            writeln!(
                f,
                "Words needing review: {} (marked with [abbreviation])",
                self.questionable
            )?;
        }
        if self.min_length > 2 {
            writeln!(f, "Minimum length: {}", self.min_length)?;
        }
        writeln!(f, "{}", rule)
    }
}
