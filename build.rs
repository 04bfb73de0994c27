//! Build script: git hash for the version string, and a pre-flight check for
//! the GStreamer development files when the `gstreamer` feature is on.

use std::process::Command;

fn main() {
    // Embed git short hash for version string
    if let Ok(output) = Command::new("git")
        .args(["rev-parse", "--short=7", "HEAD"])
        .output()
        && output.status.success()
    {
        let hash = String::from_utf8_lossy(&output.stdout).trim().to_string();
        println!("cargo:rustc-env=GIT_HASH={}", hash);
    }
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads/");

    if std::env::var_os("CARGO_FEATURE_GSTREAMER").is_some() {
        check_gstreamer();
    }
}

fn check_gstreamer() {
    let output = Command::new("pkg-config")
        .args(["--modversion", "gstreamer-1.0"])
        .output();
    match output {
        Ok(out) if out.status.success() => {
            let version = String::from_utf8_lossy(&out.stdout).trim().to_string();
            match parse_minor_version(&version) {
                Some((1, minor)) if minor >= 14 => {}
                _ => println!(
                    "cargo::warning=GStreamer {version} detected; 1.14 or newer is required"
                ),
            }
        }
        _ => {
            panic!(
                "\n\n\
                ╔══════════════════════════════════════════════════════════╗\n\
                ║  GStreamer development files not found (pkg-config).     ║\n\
                ║                                                          ║\n\
                ║  Install: sudo apt install libgstreamer1.0-dev \\         ║\n\
                ║           gstreamer1.0-plugins-good \\                    ║\n\
                ║           gstreamer1.0-plugins-bad                       ║\n\
                ║  Or build without it: cargo build --release              ║\n\
                ╚══════════════════════════════════════════════════════════╝\n",
            );
        }
    }
}

/// Parse "X.Y[.Z]" into (X, Y).
fn parse_minor_version(text: &str) -> Option<(u32, u32)> {
    let mut parts = text.trim().split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    Some((major, minor))
}
