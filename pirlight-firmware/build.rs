use std::env;
use std::fs;
use std::path::Path;
use std::process::Command;

/// Start-up configuration baked into the image. Optional: without it the
/// firmware runs on defaults.
const CONFIG_FILE: &str = "pirlight.json";

fn main() {
    embuild::espidf::sysenv::output();

    // Expose full git version (e.g. "v0.1.0" or "v0.1.0-3-gabcdef")
    let git_version = Command::new("git")
        .args(["describe", "--tags", "--always"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .unwrap_or_else(|| env::var("CARGO_PKG_VERSION").unwrap());
    println!("cargo:rustc-env=GIT_VERSION={}", git_version.trim());
    // Rebuild when HEAD moves or tags change
    println!("cargo:rerun-if-changed=../.git/HEAD");
    println!("cargo:rerun-if-changed=../.git/refs/tags");

    println!("cargo:rerun-if-changed={CONFIG_FILE}");
    let out_dir = env::var("OUT_DIR").unwrap();
    let json = fs::read_to_string(CONFIG_FILE).unwrap_or_else(|_| "{}".to_string());
    fs::write(Path::new(&out_dir).join(CONFIG_FILE), json)
        .expect("Failed to write embedded config");
}
