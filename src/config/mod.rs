// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Service configuration
//!
//! Every option can be given as a command-line flag or as an environment
//! variable (a `.env` file is honoured). Model identity is fixed here at
//! startup and is never selectable per request.

use crate::embeddings::PoolingMode;
use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_MODEL_NAME: &str = "all-MiniLM-L6-v2";
pub const DEFAULT_MODEL_REPO: &str = "sentence-transformers/all-MiniLM-L6-v2";
pub const DEFAULT_MODEL_FILE: &str = "onnx/model.onnx";
pub const DEFAULT_HASH_DIMENSION: usize = 384;

/// Which embedding backend to load
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Sentence transformer exported to ONNX
    Onnx,
    /// Deterministic hash-seeded vectors, no model files needed
    Hash,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "language-processor")]
#[command(version)]
#[command(about = "Text to embedding vector service", long_about = None)]
pub struct ServiceConfig {
    /// Address to listen on
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    /// Embedding backend
    #[arg(long, env = "EMBEDDING_BACKEND", value_enum, default_value_t = Backend::Onnx)]
    pub backend: Backend,

    /// Model name reported in logs
    #[arg(long, env = "MODEL_NAME", default_value = DEFAULT_MODEL_NAME)]
    pub model_name: String,

    /// Hugging Face repository to fetch model files from
    #[arg(long, env = "MODEL_REPO", default_value = DEFAULT_MODEL_REPO)]
    pub model_repo: String,

    /// ONNX file path inside the repository
    #[arg(long, env = "MODEL_FILE", default_value = DEFAULT_MODEL_FILE)]
    pub model_file: String,

    /// Local ONNX model file (skips the Hub download when set with --tokenizer-path)
    #[arg(long, env = "MODEL_PATH", requires = "tokenizer_path")]
    pub model_path: Option<PathBuf>,

    /// Local tokenizer.json
    #[arg(long, env = "TOKENIZER_PATH", requires = "model_path")]
    pub tokenizer_path: Option<PathBuf>,

    /// Expected output dimension; loading fails on mismatch
    #[arg(long, env = "EMBEDDING_DIMENSION")]
    pub dimension: Option<usize>,

    /// Token limit; longer inputs are truncated
    #[arg(long, env = "MAX_SEQUENCE_LENGTH", default_value_t = 256)]
    pub max_sequence_length: usize,

    /// ONNX Runtime intra-op threads
    #[arg(long, env = "ONNX_INTRA_THREADS", default_value_t = 4)]
    pub intra_threads: usize,

    /// Force L2 normalization on or off; by default the model's own
    /// module list decides
    #[arg(long, env = "NORMALIZE_EMBEDDINGS")]
    pub normalize: Option<bool>,

    /// Force a pooling mode; by default the model's pooling config decides
    #[arg(long, env = "POOLING_MODE", value_enum)]
    pub pooling: Option<PoolingMode>,
}

impl ServiceConfig {
    /// Reads `.env`, then flags and environment
    pub fn load() -> Self {
        dotenv::dotenv().ok();
        Self::parse()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_sequence_length == 0 {
            return Err("Max sequence length must be greater than 0".to_string());
        }
        if self.intra_threads == 0 {
            return Err("Intra-op thread count must be greater than 0".to_string());
        }
        if self.dimension == Some(0) {
            return Err("Embedding dimension must be greater than 0".to_string());
        }
        if self.model_path.is_some() != self.tokenizer_path.is_some() {
            return Err("MODEL_PATH and TOKENIZER_PATH must be set together".to_string());
        }
        if self.model_name.trim().is_empty() {
            return Err("Model name cannot be empty".to_string());
        }
        Ok(())
    }

    /// Resolves `host` (an IP literal or a hostname) to the listen address
    pub async fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        let mut addrs = tokio::net::lookup_host((self.host.as_str(), self.port))
            .await
            .map_err(|e| anyhow::anyhow!("Invalid listen address {}:{}: {}", self.host, self.port, e))?;
        addrs
            .next()
            .ok_or_else(|| anyhow::anyhow!("{} did not resolve to any address", self.host))
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            backend: Backend::Onnx,
            model_name: DEFAULT_MODEL_NAME.to_string(),
            model_repo: DEFAULT_MODEL_REPO.to_string(),
            model_file: DEFAULT_MODEL_FILE.to_string(),
            model_path: None,
            tokenizer_path: None,
            dimension: None,
            max_sequence_length: 256,
            intra_threads: 4,
            normalize: None,
            pooling: None,
        }
    }
}
