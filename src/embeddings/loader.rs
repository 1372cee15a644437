// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Builds the configured embedding provider
//!
//! Model files come from explicit local paths when both are configured,
//! otherwise they are fetched once from the Hugging Face Hub into the local
//! cache. Alongside the weights, the model's `modules.json` and pooling
//! config decide pooling and normalization unless the configuration
//! overrides them.

use super::pipeline::{ModuleManifest, ModulePipeline, MODULES_FILE};
use super::{EmbeddingProvider, HashEmbeddingModel, OnnxEmbeddingModel, OnnxOptions};
use crate::config::{Backend, ServiceConfig};
use anyhow::{Context, Result};
use hf_hub::api::tokio::{Api, ApiRepo};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Tokenizer file name inside a Hugging Face model repository
const TOKENIZER_FILE: &str = "tokenizer.json";

/// Local paths of the files an ONNX model needs, plus its module pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFiles {
    pub model_path: PathBuf,
    pub tokenizer_path: PathBuf,
    pub pipeline: ModulePipeline,
}

/// Loads the provider described by `config`
pub async fn load_provider(config: &ServiceConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let provider: Arc<dyn EmbeddingProvider> = match config.backend {
        Backend::Onnx => {
            let files = resolve_model_files(config).await?;
            let options = onnx_options(config, &files.pipeline);
            let model = OnnxEmbeddingModel::new(
                config.model_name.clone(),
                files.model_path,
                files.tokenizer_path,
                options,
            )
            .await?;
            Arc::new(model)
        }
        Backend::Hash => {
            let dimension = config.dimension.unwrap_or(crate::config::DEFAULT_HASH_DIMENSION);
            Arc::new(HashEmbeddingModel::new(
                config.model_name.clone(),
                dimension,
                config.normalize.unwrap_or(false),
            )?)
        }
    };

    if let Some(expected) = config.dimension {
        if provider.dimension() != expected {
            anyhow::bail!(
                "Model {} dimension mismatch: expected {}, got {}",
                provider.model_name(),
                expected,
                provider.dimension()
            );
        }
    }

    Ok(provider)
}

/// ONNX load options: the model's pipeline, with explicit config taking precedence
pub fn onnx_options(config: &ServiceConfig, pipeline: &ModulePipeline) -> OnnxOptions {
    OnnxOptions {
        max_length: config.max_sequence_length,
        intra_threads: config.intra_threads,
        normalize: config.normalize.unwrap_or(pipeline.normalize),
        pooling: config.pooling.unwrap_or(pipeline.pooling),
    }
}

/// Resolves model and tokenizer paths, downloading from the Hub if needed
pub async fn resolve_model_files(config: &ServiceConfig) -> Result<ModelFiles> {
    if let (Some(model_path), Some(tokenizer_path)) = (&config.model_path, &config.tokenizer_path) {
        // Local layouts keep modules.json next to tokenizer.json
        let model_dir = tokenizer_path.parent().unwrap_or_else(|| Path::new("."));
        let pipeline = read_local_pipeline(model_dir).await?;
        return Ok(ModelFiles {
            model_path: model_path.clone(),
            tokenizer_path: tokenizer_path.clone(),
            pipeline,
        });
    }

    info!(
        "Fetching {} and {} from {}",
        config.model_file, TOKENIZER_FILE, config.model_repo
    );

    let api = Api::new().context("Failed to initialize Hugging Face Hub client")?;
    let repo = api.model(config.model_repo.clone());

    let model_path = repo
        .get(&config.model_file)
        .await
        .with_context(|| format!("Failed to fetch {} from {}", config.model_file, config.model_repo))?;
    let tokenizer_path = repo
        .get(TOKENIZER_FILE)
        .await
        .with_context(|| format!("Failed to fetch {} from {}", TOKENIZER_FILE, config.model_repo))?;
    let pipeline = fetch_hub_pipeline(&repo, &config.model_repo).await?;

    Ok(ModelFiles {
        model_path,
        tokenizer_path,
        pipeline,
    })
}

/// Reads `modules.json` and the pooling config from a model directory
///
/// A directory without `modules.json` gets the default pipeline.
pub async fn read_local_pipeline(model_dir: &Path) -> Result<ModulePipeline> {
    let modules_path = model_dir.join(MODULES_FILE);
    if !modules_path.exists() {
        warn!(
            "No {} in {}, using mean pooling without normalization",
            MODULES_FILE,
            model_dir.display()
        );
        return Ok(ModulePipeline::default());
    }

    let manifest = ModuleManifest::parse(&read_file(&modules_path).await?)?;
    let pooling_config = match manifest.pooling_config_path() {
        Some(relative) => Some(read_file(&model_dir.join(relative)).await?),
        None => None,
    };

    ModulePipeline::from_parts(&manifest, pooling_config.as_deref())
}

async fn fetch_hub_pipeline(repo: &ApiRepo, repo_name: &str) -> Result<ModulePipeline> {
    let modules_path = match repo.get(MODULES_FILE).await {
        Ok(path) => path,
        Err(e) => {
            warn!(
                "No {} in {} ({}), using mean pooling without normalization",
                MODULES_FILE, repo_name, e
            );
            return Ok(ModulePipeline::default());
        }
    };

    let manifest = ModuleManifest::parse(&read_file(&modules_path).await?)?;
    let pooling_config = match manifest.pooling_config_path() {
        Some(relative) => {
            let path = repo
                .get(&relative)
                .await
                .with_context(|| format!("Failed to fetch {} from {}", relative, repo_name))?;
            Some(read_file(&path).await?)
        }
        None => None,
    };

    ModulePipeline::from_parts(&manifest, pooling_config.as_deref())
}

async fn read_file(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}
