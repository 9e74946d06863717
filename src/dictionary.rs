//! Word lists used by the solver.
//!
//! Lists are downloaded once into the cache directory and parsed on first use.
//! Parsed lists stay in a `DictionaryCache` until it is cleared.

use anyhow::{anyhow, Context, Result};
use clap::ValueEnum;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::info;

/// A downloadable word list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WordListSource {
    pub label: &'static str,
    pub file_name: &'static str,
    pub url: &'static str,
}

const TWL06: WordListSource = WordListSource {
    label: "TWL06",
    file_name: "twl06.txt",
    url: "https://raw.githubusercontent.com/jessicatysu/scrabble/master/TWL06.txt",
};

const ENABLE: WordListSource = WordListSource {
    label: "ENABLE",
    file_name: "enable1.txt",
    url: "https://raw.githubusercontent.com/dolph/dictionary/master/enable1.txt",
};

const SOWPODS: WordListSource = WordListSource {
    label: "SOWPODS",
    file_name: "sowpods.txt",
    url: "https://raw.githubusercontent.com/jesstess/Scrabble/master/scrabble/sowpods.txt",
};

/// Dictionaries the solver can search.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, ValueEnum)]
pub enum DictionaryName {
    #[default]
    Twl06,
    Enable,
    Sowpods,
    /// Union of every other list
    All,
}

impl DictionaryName {
    pub fn sources(&self) -> &'static [WordListSource] {
        match self {
            DictionaryName::Twl06 => &[TWL06],
            DictionaryName::Enable => &[ENABLE],
            DictionaryName::Sowpods => &[SOWPODS],
            DictionaryName::All => &[TWL06, ENABLE, SOWPODS],
        }
    }
}

impl fmt::Display for DictionaryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels: Vec<&str> = self.sources().iter().map(|s| s.label).collect();
        write!(f, "{}", labels.join(" + "))
    }
}

/// Parses a newline-separated list: trimmed, lowercased, at least two characters.
pub fn parse_word_list(text: &str) -> HashSet<String> {
    text.lines()
        .map(|line| line.trim().to_lowercase())
        .filter(|word| word.chars().count() >= 2)
        .collect()
}

/// Parsed word lists kept in memory.
#[derive(Debug, Default)]
pub struct DictionaryCache {
    entries: Mutex<HashMap<DictionaryName, Arc<HashSet<String>>>>,
}

impl DictionaryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<DictionaryName, Arc<HashSet<String>>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, name: DictionaryName) -> Option<Arc<HashSet<String>>> {
        self.lock().get(&name).cloned()
    }

    pub fn insert(&self, name: DictionaryName, words: Arc<HashSet<String>>) {
        self.lock().insert(name, words);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drops every parsed list. Files on disk are kept.
    pub fn clear(&self) {
        self.lock().clear();
    }
}

/// Loads dictionaries from the on-disk cache, downloading missing lists.
pub struct DictionaryProvider {
    cache_dir: PathBuf,
    cache: DictionaryCache,
}

impl DictionaryProvider {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            cache: DictionaryCache::new(),
        }
    }

    pub fn cache(&self) -> &DictionaryCache {
        &self.cache
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Returns the word set for `name`, reusing the in-memory copy if present.
    pub fn load(&self, name: DictionaryName) -> Result<Arc<HashSet<String>>> {
        if let Some(words) = self.cache.get(name) {
            return Ok(words);
        }

        let mut words = HashSet::new();
        for source in name.sources() {
            let text = self.read_or_download(source)?;
            words.extend(parse_word_list(&text));
        }
        if words.is_empty() {
            return Err(anyhow!("Dictionary {} is empty", name));
        }

        info!(dictionary = %name, words = words.len(), "Dictionary loaded");
        let words = Arc::new(words);
        self.cache.insert(name, Arc::clone(&words));
        Ok(words)
    }

    fn read_or_download(&self, source: &WordListSource) -> Result<String> {
        let path = self.cache_dir.join(source.file_name);
        if !path.exists() {
            fs::create_dir_all(&self.cache_dir).with_context(|| {
                format!("Failed to create cache directory {}", self.cache_dir.display())
            })?;
            download(source, &path)?;
        }
        fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))
    }
}

fn download(source: &WordListSource, path: &Path) -> Result<()> {
    info!("Downloading {} from {}...", source.label, source.url);

    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(60))
        .build()?;

    let response = client
        .get(source.url)
        .header("User-Agent", "quartiles-tiles")
        .send()
        .with_context(|| format!("Failed to download {}", source.label))?;

    if !response.status().is_success() {
        return Err(anyhow!(
            "Failed to download {}: HTTP {}",
            source.label,
            response.status()
        ));
    }

    let bytes = response.bytes()?;
    fs::write(path, &bytes).with_context(|| format!("Failed to write {}", path.display()))?;

    info!("Downloaded {} ({} bytes)", source.label, bytes.len());
    Ok(())
}
