use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::Command;
use tracing::debug;

/// Where to find Tesseract and which language data to load.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TesseractConfig {
    /// Explicit path to the `tesseract` executable
    pub executable: Option<PathBuf>,
    /// Explicit tessdata directory (overrides `TESSDATA_PREFIX`)
    pub tessdata_dir: Option<PathBuf>,
    /// Language model name
    pub language: String,
}

impl Default for TesseractConfig {
    fn default() -> Self {
        Self {
            executable: None,
            tessdata_dir: None,
            language: "eng".to_string(),
        }
    }
}

const COMMON_EXECUTABLE_PATHS: &[&str] = &[
    "/usr/bin/tesseract",
    "/usr/local/bin/tesseract",
    "/opt/homebrew/bin/tesseract",
    r"C:\Program Files\Tesseract-OCR\tesseract.exe",
    r"C:\Program Files (x86)\Tesseract-OCR\tesseract.exe",
];

/// Returns true if `exe --version` runs successfully.
fn responds_to_version(exe: &PathBuf) -> bool {
    Command::new(exe)
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Finds the Tesseract executable: configured path first, then PATH, then
/// common install locations.
pub fn find_tesseract_executable(config: &TesseractConfig) -> Result<PathBuf> {
    if let Some(exe) = &config.executable {
        if responds_to_version(exe) {
            return Ok(exe.clone());
        }
        return Err(anyhow!(
            "Configured Tesseract executable does not run: {}",
            exe.display()
        ));
    }

    let on_path = PathBuf::from("tesseract");
    if responds_to_version(&on_path) {
        return Ok(on_path);
    }

    for path in COMMON_EXECUTABLE_PATHS {
        let p = PathBuf::from(path);
        if p.exists() && responds_to_version(&p) {
            debug!(path = %p.display(), "Found Tesseract");
            return Ok(p);
        }
    }

    Err(anyhow!(
        "Tesseract not found. Please install tesseract-ocr \
         (macOS: brew install tesseract, Debian/Ubuntu: apt install tesseract-ocr)."
    ))
}

/// Resolves the tessdata directory, or `None` to let Tesseract use its default.
pub fn find_tessdata_dir(config: &TesseractConfig) -> Option<PathBuf> {
    let traineddata = format!("{}.traineddata", config.language);

    if let Some(dir) = &config.tessdata_dir {
        return Some(dir.clone());
    }

    if let Ok(prefix) = std::env::var("TESSDATA_PREFIX") {
        let p = PathBuf::from(&prefix);
        if p.join(&traineddata).exists() {
            return Some(p);
        }
        let p = p.join("tessdata");
        if p.join(&traineddata).exists() {
            return Some(p);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_tessdata_wins() {
        let config = TesseractConfig {
            tessdata_dir: Some(PathBuf::from("/opt/tessdata")),
            ..TesseractConfig::default()
        };
        assert_eq!(find_tessdata_dir(&config), Some(PathBuf::from("/opt/tessdata")));
    }

    #[test]
    fn test_missing_configured_executable_is_error() {
        let config = TesseractConfig {
            executable: Some(PathBuf::from("/definitely/not/here/tesseract")),
            ..TesseractConfig::default()
        };
        assert!(find_tesseract_executable(&config).is_err());
    }
}
