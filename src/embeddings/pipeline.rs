// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Sentence-transformer module pipeline
//!
//! A sentence-transformers model repository declares the stages that follow
//! the transformer in `modules.json`, e.g.
//!
//! ```json
//! [
//!   {"idx": 0, "name": "0", "path": "", "type": "sentence_transformers.models.Transformer"},
//!   {"idx": 1, "name": "1", "path": "1_Pooling", "type": "sentence_transformers.models.Pooling"},
//!   {"idx": 2, "name": "2", "path": "2_Normalize", "type": "sentence_transformers.models.Normalize"}
//! ]
//! ```
//!
//! The ONNX export only covers the transformer, so pooling and normalization
//! are applied here from the same declarations.

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Deserialize;

/// Module list file at the repository root
pub const MODULES_FILE: &str = "modules.json";

/// Config file inside the pooling module directory
pub const POOLING_CONFIG_FILE: &str = "config.json";

const POOLING_MODULE: &str = "sentence_transformers.models.Pooling";
const NORMALIZE_MODULE: &str = "sentence_transformers.models.Normalize";

/// How token embeddings are reduced to one sentence vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum PoolingMode {
    /// Attention-mask weighted mean over all tokens
    #[default]
    Mean,
    /// First token (`[CLS]`)
    Cls,
    /// Last attended token
    #[value(name = "lasttoken")]
    LastToken,
}

/// Post-transformer stages of a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModulePipeline {
    pub pooling: PoolingMode,
    pub normalize: bool,
}

#[derive(Debug, Deserialize)]
struct ModuleEntry {
    #[serde(default)]
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

/// Parsed `modules.json`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleManifest {
    /// Directory of the pooling module, relative to the repository root
    pub pooling_dir: Option<String>,
    /// Whether a Normalize module follows pooling
    pub normalize: bool,
}

impl ModuleManifest {
    pub fn parse(json: &str) -> Result<Self> {
        let entries: Vec<ModuleEntry> =
            serde_json::from_str(json).context("Invalid modules.json")?;

        let pooling_dir = entries
            .iter()
            .find(|e| e.kind == POOLING_MODULE)
            .map(|e| e.path.trim_end_matches('/').to_string());
        let normalize = entries.iter().any(|e| e.kind == NORMALIZE_MODULE);

        Ok(Self {
            pooling_dir,
            normalize,
        })
    }

    /// Repository-relative path of the pooling config, if there is a pooling module
    pub fn pooling_config_path(&self) -> Option<String> {
        self.pooling_dir.as_ref().map(|dir| {
            if dir.is_empty() {
                POOLING_CONFIG_FILE.to_string()
            } else {
                format!("{}/{}", dir, POOLING_CONFIG_FILE)
            }
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PoolingConfig {
    pooling_mode_cls_token: bool,
    pooling_mode_mean_tokens: bool,
    pooling_mode_max_tokens: bool,
    pooling_mode_mean_sqrt_len_tokens: bool,
    pooling_mode_weightedmean_tokens: bool,
    pooling_mode_lasttoken: bool,
}

impl PoolingMode {
    /// Reads the pooling mode from a pooling module's `config.json`
    ///
    /// Exactly one supported mode must be enabled.
    pub fn from_config(json: &str) -> Result<Self> {
        let config: PoolingConfig =
            serde_json::from_str(json).context("Invalid pooling config")?;

        if config.pooling_mode_max_tokens
            || config.pooling_mode_mean_sqrt_len_tokens
            || config.pooling_mode_weightedmean_tokens
        {
            anyhow::bail!("Unsupported pooling mode in {:?}", config);
        }

        match (
            config.pooling_mode_mean_tokens,
            config.pooling_mode_cls_token,
            config.pooling_mode_lasttoken,
        ) {
            (true, false, false) => Ok(Self::Mean),
            (false, true, false) => Ok(Self::Cls),
            (false, false, true) => Ok(Self::LastToken),
            _ => anyhow::bail!("Expected exactly one pooling mode, got {:?}", config),
        }
    }
}

impl ModulePipeline {
    /// Combines a manifest with its pooling config (mean when absent)
    pub fn from_parts(manifest: &ModuleManifest, pooling_config: Option<&str>) -> Result<Self> {
        let pooling = match pooling_config {
            Some(json) => PoolingMode::from_config(json)?,
            None => PoolingMode::default(),
        };

        Ok(Self {
            pooling,
            normalize: manifest.normalize,
        })
    }
}
