//! Recognition engine backed by the Tesseract command-line program.
//!
//! Each call writes the prepared tile to a temporary PNG, runs Tesseract
//! with TSV and hOCR renderers, and parses both outputs: TSV for words and
//! lines, hOCR character boxes for individual symbols.

use anyhow::{anyhow, Context, Result};
use image::DynamicImage;
use regex::Regex;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;
use tracing::debug;

use super::engine::{
    EngineParams, OcrLine, OcrSymbol, OcrWord, RawRecognitionOutput, RecognitionEngine,
};
use super::setup::{find_tessdata_dir, find_tesseract_executable, TesseractConfig};

/// One Tesseract "instance": a resolved executable plus a private scratch
/// directory, so concurrent instances never share files.
pub struct TesseractEngine {
    id: usize,
    executable: PathBuf,
    tessdata: Option<PathBuf>,
    workdir: Option<TempDir>,
}

impl TesseractEngine {
    /// Resolves the executable and creates the scratch directory.
    pub fn new(id: usize, config: &TesseractConfig) -> Result<Self> {
        let executable = find_tesseract_executable(config)?;
        let tessdata = find_tessdata_dir(config);
        let workdir = tempfile::Builder::new()
            .prefix(&format!("quartiles-ocr-{}-", id))
            .tempdir()
            .context("Failed to create Tesseract scratch directory")?;

        debug!(id, exe = %executable.display(), "Tesseract engine ready");

        Ok(Self {
            id,
            executable,
            tessdata,
            workdir: Some(workdir),
        })
    }
}

impl RecognitionEngine for TesseractEngine {
    fn recognize(
        &mut self,
        image: &DynamicImage,
        params: &EngineParams,
    ) -> Result<RawRecognitionOutput> {
        let workdir = self
            .workdir
            .as_ref()
            .ok_or_else(|| anyhow!("Tesseract engine {} already shut down", self.id))?;

        let input = workdir.path().join("tile.png");
        image
            .save(&input)
            .with_context(|| format!("Failed to write {}", input.display()))?;
        let output_base = workdir.path().join("out");

        let output = Command::new(&self.executable)
            .arg(&input)
            .arg(&output_base)
            .args(tesseract_args(params, self.tessdata.as_deref()))
            .output()
            .context("Failed to run Tesseract")?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("Tesseract failed: {}", stderr.trim()));
        }

        let tsv_path = output_base.with_extension("tsv");
        let tsv = std::fs::read_to_string(&tsv_path)
            .map_err(|e| anyhow!("Failed to read Tesseract output: {}", e))?;
        let mut raw = parse_tsv_output(&tsv);

        // Symbols are a bonus; a missing hOCR file leaves them empty.
        let hocr_path = output_base.with_extension("hocr");
        if let Ok(hocr) = std::fs::read_to_string(&hocr_path) {
            raw.symbols = parse_hocr_symbols(&hocr)?;
        }

        let _ = std::fs::remove_file(&tsv_path);
        let _ = std::fs::remove_file(&hocr_path);

        Ok(raw)
    }

    fn shutdown(&mut self) {
        if let Some(dir) = self.workdir.take() {
            if let Err(e) = dir.close() {
                tracing::warn!(id = self.id, "Failed to remove scratch directory: {}", e);
            }
        }
    }
}

/// Command-line options after the input and output base: engine parameters,
/// then the `tsv` and `hocr` output configs.
pub fn tesseract_args(params: &EngineParams, tessdata: Option<&Path>) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::new();
    if let Some(tessdata) = tessdata {
        args.push("--tessdata-dir".into());
        args.push(tessdata.into());
    }
    args.push("-l".into());
    args.push(params.language.as_str().into());
    args.push("--psm".into());
    args.push(params.segmentation.psm().to_string().into());

    let mut config = |value: String| {
        args.push("-c".into());
        args.push(value.into());
    };
    if let Some(whitelist) = &params.char_whitelist {
        config(format!("tessedit_char_whitelist={}", whitelist));
    }
    config(format!("load_system_dawg={}", params.system_dictionary as u8));
    config(format!("load_freq_dawg={}", params.frequent_words as u8));
    config("hocr_char_boxes=1".to_string());

    args.push("tsv".into());
    args.push("hocr".into());
    args
}

/// Parses Tesseract TSV output into words, lines, and full text.
///
/// Words are level-5 rows with a non-negative confidence. Lines group words
/// by (block, paragraph, line) and carry the mean word confidence. The full
/// text joins the lines; TSV has no page-level confidence, so it is left unset.
pub fn parse_tsv_output(tsv: &str) -> RawRecognitionOutput {
    let mut words: Vec<OcrWord> = Vec::new();
    let mut lines: Vec<OcrLine> = Vec::new();

    let mut current_key: Option<(i32, i32, i32)> = None;
    let mut current_words: Vec<(String, f32)> = Vec::new();

    let flush = |current: &mut Vec<(String, f32)>, lines: &mut Vec<OcrLine>| {
        if current.is_empty() {
            return;
        }
        let avg = current.iter().map(|(_, c)| c).sum::<f32>() / current.len() as f32;
        let text = current
            .iter()
            .map(|(t, _)| t.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        lines.push(OcrLine {
            text,
            confidence: Some(avg),
        });
        current.clear();
    };

    for row in tsv.lines().skip(1) {
        // level, page_num, block_num, par_num, line_num, word_num,
        // left, top, width, height, conf, text
        let fields: Vec<&str> = row.split('\t').collect();
        if fields.len() < 12 {
            continue;
        }

        let level: i32 = fields[0].parse().unwrap_or(-1);
        if level != 5 {
            continue;
        }
        let text = fields[11].trim();
        let conf: f32 = fields[10].trim().parse().unwrap_or(-1.0);
        if text.is_empty() || conf < 0.0 {
            continue;
        }

        let key = (
            fields[2].parse().unwrap_or(-1),
            fields[3].parse().unwrap_or(-1),
            fields[4].parse().unwrap_or(-1),
        );
        if current_key != Some(key) {
            flush(&mut current_words, &mut lines);
            current_key = Some(key);
        }

        words.push(OcrWord {
            text: text.to_string(),
            confidence: Some(conf),
        });
        current_words.push((text.to_string(), conf));
    }
    flush(&mut current_words, &mut lines);

    let text = (!lines.is_empty()).then(|| {
        lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    });

    RawRecognitionOutput {
        text,
        text_confidence: None,
        lines,
        words,
        symbols: Vec::new(),
    }
}

/// Matches one hOCR character box: left edge, confidence, character.
const CINFO_PATTERN: &str = r#"class=['"]ocrx_cinfo['"][^>]*title=['"]x_bboxes\s+(\d+)\s+\d+\s+\d+\s+\d+;\s*x_conf\s+([\d.]+)[^'"]*['"][^>]*>([^<]*)</span>"#;

/// Extracts character boxes (`ocrx_cinfo` spans) from hOCR output.
pub fn parse_hocr_symbols(hocr: &str) -> Result<Vec<OcrSymbol>> {
    let cinfo = Regex::new(CINFO_PATTERN)?;
    let symbols = cinfo
        .captures_iter(hocr)
        .filter_map(|caps| {
            let x0 = caps[1].parse().ok()?;
            let confidence = caps[2].parse().ok()?;
            let text = unescape_html(&caps[3]);
            Some(OcrSymbol {
                text,
                confidence,
                x0,
            })
        })
        .collect();
    Ok(symbols)
}

fn unescape_html(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
