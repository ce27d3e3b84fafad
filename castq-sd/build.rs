//! Build script for castq-sd
//!
//! Embeds build identification shown in the startup log and `/build_info`:
//! - GIT_HASH: short commit hash (overridable via CASTQ_GIT_HASH for tarball builds)
//! - BUILD_TIMESTAMP: RFC 3339 UTC
//! - BUILD_PROFILE: cargo profile

use std::process::Command;

fn git_short_hash() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short=8", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn main() {
    let git_hash = std::env::var("CASTQ_GIT_HASH")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .or_else(git_short_hash)
        .unwrap_or_else(|| "unknown".to_string());

    let build_timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());

    println!("cargo:rustc-env=GIT_HASH={}", git_hash);
    println!("cargo:rustc-env=BUILD_TIMESTAMP={}", build_timestamp);
    println!("cargo:rustc-env=BUILD_PROFILE={}", profile);
    println!("cargo:rerun-if-env-changed=CASTQ_GIT_HASH");
    println!("cargo:rerun-if-changed=../.git/HEAD");
}
