//! Build script: embeds the dotstow version string at compile time.

use std::process::Command;

fn main() {
    // A release build passes DOTSTOW_VERSION; local builds use git describe.
    if let Ok(version) = std::env::var("DOTSTOW_VERSION") {
        println!("cargo:rustc-env=DOTSTOW_VERSION={version}");
    } else if let Ok(output) = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        && output.status.success()
    {
        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        println!("cargo:rustc-env=DOTSTOW_VERSION={version}");
    }

    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/");
    println!("cargo:rerun-if-env-changed=DOTSTOW_VERSION");
}
