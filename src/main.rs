//! Quartiles solver
//!
//! Reads the tiles from a puzzle screenshot (or takes them from the command
//! line) and lists every dictionary word that one to four tiles spell.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quartiles_tiles::solver::{filter_words, format_tile_grid, DEFAULT_TILES};
use quartiles_tiles::{
    paths, save_artifacts, solve, DictionaryName, DictionaryProvider, ExtractOptions,
    ExtractorConfig, TileExtraction, TileExtractor,
};

#[derive(Parser, Debug)]
#[command(name = "quartiles-tiles")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Solve a Quartiles puzzle", long_about = None)]
struct Cli {
    /// Path to the puzzle image (optional)
    image: Option<PathBuf>,

    /// Manually specify tiles (space-separated). Overrides image extraction.
    #[arg(long, num_args = 1..)]
    tiles: Option<Vec<String>>,

    /// Tile rows on the board (default from config: 5)
    #[arg(long)]
    rows: Option<u32>,

    /// Tile columns on the board (default from config: 4)
    #[arg(long)]
    cols: Option<u32>,

    /// Minimum word length to include
    #[arg(long, default_value_t = 2)]
    min_length: usize,

    /// Word list to search
    #[arg(long, value_enum, default_value_t = DictionaryName::Twl06)]
    dictionary: DictionaryName,

    /// Save per-tile preprocessing snapshots into a session folder under DIR
    /// (`--debug-dir` alone uses debug/ next to the executable)
    #[arg(long, value_name = "DIR", num_args = 0..=1, require_equals = true)]
    debug_dir: Option<Option<PathBuf>>,

    /// Config file (default: quartiles.json next to the executable)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of OCR engines working in parallel
    #[arg(long)]
    pool_size: Option<usize>,
}

impl Cli {
    /// Where debug snapshots go, if requested.
    fn debug_dir(&self) -> Option<PathBuf> {
        self.debug_dir
            .as_ref()
            .map(|dir| dir.clone().unwrap_or_else(paths::get_debug_dir))
    }
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_tiles(tiles: &[String]) {
    println!();
    print!("{}", format_tile_grid(tiles));
    println!();
    println!("Tiles list: {:?}", tiles);
}

/// Reads the tiles from `image_path`, saving debug snapshots if requested.
fn extract_tiles(
    image_path: &Path,
    config: ExtractorConfig,
    options: ExtractOptions,
    debug_dir: Option<&Path>,
) -> Result<Vec<String>> {
    let bytes = fs::read(image_path)
        .with_context(|| format!("File '{}' not found", image_path.display()))?;

    let extractor = TileExtractor::new(config);
    let report = match extractor.extract(&bytes, &options)? {
        TileExtraction::Extracted(report) => report,
        TileExtraction::NoRegions => return Ok(Vec::new()),
    };

    for (index, result) in report.results.iter().enumerate() {
        match result {
            Some(c) => info!(
                tile = index,
                text = %c.text,
                confidence = c.confidence,
                strategy = %c.strategy,
                "Tile read"
            ),
            None => warn!(tile = index, "Tile could not be read"),
        }
    }

    if let Some(dir) = debug_dir {
        match save_artifacts(&report.artifacts, dir) {
            Ok(session) => info!("Saved debug snapshots to {}", session.display()),
            Err(e) => warn!("Failed to save debug snapshots: {:#}", e),
        }
    }

    Ok(report.tiles)
}

fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(paths::get_config_path);
    let mut config = ExtractorConfig::load(&config_path);
    if let Some(pool_size) = cli.pool_size {
        config.pool_size = pool_size;
    }

    let tiles: Vec<String> = if let Some(tiles) = &cli.tiles {
        let tiles: Vec<String> = tiles.iter().map(|t| t.trim().to_lowercase()).collect();
        println!("Using manually specified tiles ({} total):", tiles.len());
        print_tiles(&tiles);
        tiles
    } else if let Some(image_path) = &cli.image {
        let mut options = ExtractOptions::from_config(&config);
        options.rows = cli.rows.unwrap_or(options.rows);
        options.cols = cli.cols.unwrap_or(options.cols);
        let debug_dir = cli.debug_dir();
        options.capture_debug = debug_dir.is_some();

        let tiles = extract_tiles(image_path, config, options, debug_dir.as_deref())?;
        if tiles.is_empty() {
            return Err(anyhow!(
                "No tiles found in the image or OCR failed.\n\
                 Tip: Check --rows/--cols, run with --debug-dir to inspect the tiles, \
                 or use --tiles to specify them manually"
            ));
        }
        println!("Found {} tiles:", tiles.len());
        print_tiles(&tiles);
        println!("Tip: If tiles look incorrect, run with --debug-dir to inspect them, or use --tiles to override");
        tiles
    } else {
        println!("No image provided. Using default demo tiles.");
        DEFAULT_TILES.iter().map(|t| t.to_string()).collect()
    };

    println!("Loading dictionary...");
    let provider = DictionaryProvider::new(paths::get_cache_dir());
    let all_words = provider
        .load(cli.dictionary)
        .with_context(|| format!("Could not load {} dictionary", cli.dictionary))?;

    println!("Loaded {} words from {}.", all_words.len(), cli.dictionary);
    println!("Applying minimal filter (only profanity excluded)...");
    let valid_words = filter_words(&all_words);
    println!("Using {} words.", valid_words.len());

    println!("Finding combinations...");
    let report = solve(&tiles, &valid_words, cli.min_length);
    print!("{}", report);

    Ok(())
}

fn main() {
    init_logging();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_dir_defaults_next_to_executable() {
        let cli = Cli::try_parse_from(["quartiles-tiles", "board.png", "--debug-dir"]).unwrap();
        assert_eq!(cli.image, Some(PathBuf::from("board.png")));
        assert_eq!(cli.debug_dir(), Some(paths::get_debug_dir()));
    }

    #[test]
    fn test_debug_dir_explicit_and_absent() {
        let cli = Cli::try_parse_from(["quartiles-tiles", "--debug-dir=snaps", "board.png"]).unwrap();
        assert_eq!(cli.debug_dir(), Some(PathBuf::from("snaps")));
        assert_eq!(cli.image, Some(PathBuf::from("board.png")));

        let cli = Cli::try_parse_from(["quartiles-tiles", "board.png"]).unwrap();
        assert_eq!(cli.debug_dir(), None);
    }
}
