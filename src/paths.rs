use std::path::PathBuf;
use std::sync::OnceLock;

static EXE_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Returns the directory containing the executable.
pub fn get_exe_dir() -> &'static PathBuf {
    EXE_DIR.get_or_init(|| {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."))
    })
}

/// Returns the default config file: `<exe_dir>/quartiles.json`
pub fn get_config_path() -> PathBuf {
    get_exe_dir().join("quartiles.json")
}

/// Returns the default debug output directory: `<exe_dir>/debug/`
pub fn get_debug_dir() -> PathBuf {
    get_exe_dir().join("debug")
}

/// Returns the word list cache directory: `<user cache>/quartiles-tiles/`,
/// or `<exe_dir>/cache/` when the platform has no cache directory.
pub fn get_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|p| p.join("quartiles-tiles"))
        .unwrap_or_else(|| get_exe_dir().join("cache"))
}
