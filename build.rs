use std::env;
use std::fs;
use std::path::Path;

fn main() {
    copy_config();
}

/// Copies quartiles.json next to the built executable.
fn copy_config() {
    let Ok(out_dir) = env::var("OUT_DIR") else {
        return;
    };
    // OUT_DIR is target/<profile>/build/<pkg>-<hash>/out
    let Some(target_dir) = Path::new(&out_dir).ancestors().nth(3) else {
        return;
    };

    let config_src = Path::new("quartiles.json");
    let config_dst = target_dir.join("quartiles.json");

    if config_src.exists() {
        let _ = fs::copy(config_src, &config_dst);
        println!("cargo:rerun-if-changed=quartiles.json");
    }
}
