// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use timegate_common::BootConfig;

const CONFIG_FILES: [&str; 2] = ["boot.toml", "boot.example.toml"];

fn main() -> Result<()> {
    let out_dir = PathBuf::from(env::var("OUT_DIR")?);
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);

    fs::copy(manifest_dir.join("memory.x"), out_dir.join("memory.x"))
        .context("Failed to copy memory.x")?;

    println!("cargo:rustc-link-search={}", out_dir.display());
    println!("cargo:rustc-link-arg=-Tlink.x");
    println!("cargo:rustc-link-arg=-Tdefmt.x");
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");

    // Board configuration: a local boot.toml wins over the checked-in example
    let config_path = CONFIG_FILES
        .iter()
        .map(|name| manifest_dir.join(name))
        .find(|path| path.exists())
        .context("No boot.toml or boot.example.toml found")?;
    for name in CONFIG_FILES {
        println!("cargo:rerun-if-changed={}", name);
    }

    let source = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read {}", config_path.display()))?;
    let config: BootConfig = toml::from_str(&source)
        .with_context(|| format!("Failed to parse {}", config_path.display()))?;
    config
        .validate()
        .with_context(|| format!("Invalid configuration in {}", config_path.display()))?;

    let encoded = postcard::to_stdvec(&config).context("Failed to encode boot configuration")?;
    fs::write(out_dir.join("boot_config.bin"), encoded)
        .context("Failed to write boot_config.bin")?;
    Ok(())
}
