use anyhow::Result;
use cpk_config::{
    load_layered_yaml, report_unused_keys, EngineConfig, LoadedConfig, UnusedKeyPolicy,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use super::Output;

/// Global `--config` / `--strict-config` flags.
#[derive(Debug, Clone, Default)]
pub struct ConfigArgs {
    pub paths: Vec<String>,
    pub strict: bool,
}

fn load_layers(paths: &[String], strict: bool) -> Result<LoadedConfig> {
    let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    let loaded = load_layered_yaml(&path_refs)?;

    let policy = if strict {
        UnusedKeyPolicy::Fail
    } else {
        UnusedKeyPolicy::Warn
    };
    let report = report_unused_keys(&loaded.config_json, policy)?;
    for pointer in &report.unused_leaf_pointers {
        warn!(%pointer, "config key is not read by the engine");
    }
    Ok(loaded)
}

/// Typed engine config. No paths means built-in defaults.
pub fn load(args: &ConfigArgs) -> Result<EngineConfig> {
    if args.paths.is_empty() {
        return Ok(EngineConfig::default());
    }
    let loaded = load_layers(&args.paths, args.strict)?;
    let cfg = loaded.engine_config()?;
    info!(config_hash = %loaded.config_hash, layers = args.paths.len(), "config loaded");
    Ok(cfg)
}

#[derive(Serialize)]
struct HashOutput<'a> {
    config_hash: &'a str,
    config: &'a Value,
}

pub fn hash(paths: &[String], strict: bool, out: Output) -> Result<()> {
    let loaded = load_layers(paths, strict)?;
    // a document the engine would refuse gets no hash
    loaded.engine_config()?;

    out.emit(
        &HashOutput {
            config_hash: &loaded.config_hash,
            config: &loaded.config_json,
        },
        || {
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        },
    )
}
