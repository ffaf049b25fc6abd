use std::env;
use std::fs;
use std::path::Path;

/// Diagnostic timing baked into the image. Optional: without it the
/// diagnostic runs on defaults.
const CONFIG_FILE: &str = "pirlight-diagnostic.json";

fn main() {
    embuild::espidf::sysenv::output();

    println!("cargo:rerun-if-changed={CONFIG_FILE}");
    let out_dir = env::var("OUT_DIR").unwrap();
    let json = fs::read_to_string(CONFIG_FILE).unwrap_or_else(|_| "{}".to_string());
    fs::write(Path::new(&out_dir).join(CONFIG_FILE), json)
        .expect("Failed to write embedded config");
}
