// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! ONNX Embedding Model Wrapper
//!
//! This module provides a wrapper around ONNX Runtime for running
//! sentence transformer models exported to ONNX.
//!
//! Features:
//! - ONNX model loading from disk
//! - GPU acceleration via CUDA (with automatic CPU fallback)
//! - Hugging Face tokenization with truncation to the model's max length
//! - Mean, CLS or last-token pooling over token embeddings
//! - Output dimension measured at load time with a full-length inference

use super::{l2_normalize, EmbeddingProvider, PoolingMode};
use crate::error::ServiceError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use ndarray::{Array2, ArrayViewD, Axis, Ix1, Ix2};
use ort::execution_providers::{CPUExecutionProvider, CUDAExecutionProvider};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use tokenizers::{Encoding, Tokenizer, TruncationParams};
use tracing::{debug, info, warn};

/// Load-time knobs for [`OnnxEmbeddingModel`]
#[derive(Debug, Clone)]
pub struct OnnxOptions {
    /// Token limit; longer inputs are truncated by the tokenizer
    pub max_length: usize,
    /// ONNX Runtime intra-op threads
    pub intra_threads: usize,
    /// Apply L2 normalization after pooling
    pub normalize: bool,
    /// Token embedding reduction
    pub pooling: PoolingMode,
}

impl Default for OnnxOptions {
    fn default() -> Self {
        Self {
            max_length: 256,
            intra_threads: 4,
            normalize: false,
            pooling: PoolingMode::Mean,
        }
    }
}

/// ONNX-based sentence embedding model
///
/// # Thread Safety
/// The session needs exclusive access to run, so it sits behind a mutex and
/// every inference is one critical section. All fields are wrapped in `Arc`
/// so the model can be cloned into blocking tasks cheaply.
#[derive(Clone)]
pub struct OnnxEmbeddingModel {
    /// ONNX Runtime session
    session: Arc<Mutex<Session>>,

    tokenizer: Arc<Tokenizer>,

    model_name: String,

    /// Output dimension, measured at load time
    dimension: usize,

    max_length: usize,

    /// Whether the graph declares a `token_type_ids` input (BERT-style models do)
    uses_token_type_ids: bool,

    normalize: bool,

    pooling: PoolingMode,
}

impl std::fmt::Debug for OnnxEmbeddingModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxEmbeddingModel")
            .field("model_name", &self.model_name)
            .field("dimension", &self.dimension)
            .field("max_length", &self.max_length)
            .field("normalize", &self.normalize)
            .field("pooling", &self.pooling)
            .finish_non_exhaustive()
    }
}

impl OnnxEmbeddingModel {
    /// Creates a new ONNX embedding model from disk paths
    ///
    /// # Errors
    /// Returns error if:
    /// - Model or tokenizer file not found or invalid
    /// - ONNX Runtime initialization fails
    /// - The validation inference fails or yields an empty vector
    ///
    /// # Example
    /// ```ignore
    /// let model = OnnxEmbeddingModel::new(
    ///     "all-MiniLM-L6-v2",
    ///     "/models/all-MiniLM-L6-v2/onnx/model.onnx",
    ///     "/models/all-MiniLM-L6-v2/tokenizer.json",
    ///     OnnxOptions::default(),
    /// ).await?;
    /// ```
    pub async fn new<P: AsRef<Path>>(
        model_name: impl Into<String>,
        model_path: P,
        tokenizer_path: P,
        options: OnnxOptions,
    ) -> Result<Self> {
        let model_name = model_name.into();
        let model_path = model_path.as_ref().to_path_buf();
        let tokenizer_path = tokenizer_path.as_ref().to_path_buf();

        if !model_path.exists() {
            anyhow::bail!("ONNX model file not found: {}", model_path.display());
        }
        if !tokenizer_path.exists() {
            anyhow::bail!("Tokenizer file not found: {}", tokenizer_path.display());
        }

        // Session construction and the validation inference are CPU-bound
        tokio::task::spawn_blocking(move || {
            Self::load_blocking(model_name, &model_path, &tokenizer_path, options)
        })
        .await
        .context("Model loading task panicked")?
    }

    fn load_blocking(
        model_name: String,
        model_path: &Path,
        tokenizer_path: &Path,
        options: OnnxOptions,
    ) -> Result<Self> {
        info!("Initializing ONNX embedding model {}", model_name);

        info!("   Attempting CUDA execution provider...");
        let cuda_result = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CUDAExecutionProvider::default().build()])
            .context("Failed to set CUDA execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(options.intra_threads)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path);

        let mut session = match cuda_result {
            Ok(s) => {
                info!("CUDA execution provider initialized");
                s
            }
            Err(e) => {
                warn!("CUDA execution provider failed: {}", e);
                warn!("   Falling back to CPU execution provider");
                Session::builder()
                    .context("Failed to create session builder")?
                    .with_execution_providers([CPUExecutionProvider::default().build()])
                    .context("Failed to set CPU execution provider")?
                    .with_optimization_level(GraphOptimizationLevel::Level3)
                    .context("Failed to set optimization level")?
                    .with_intra_threads(options.intra_threads)
                    .context("Failed to set intra threads")?
                    .commit_from_file(model_path)
                    .with_context(|| {
                        format!("Failed to load ONNX model from {}", model_path.display())
                    })?
            }
        };

        let uses_token_type_ids = session
            .inputs
            .iter()
            .any(|input| input.name == "token_type_ids");

        let mut tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: options.max_length,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("Failed to configure truncation: {}", e))?;
        // One sequence per run, so padding only adds masked tokens
        tokenizer.with_padding(None);

        // Measure the output dimension with a real inference. The input fills
        // the whole token window, so a max_length past the model's position
        // limit fails here instead of on every long request.
        let validation = tokenizer
            .encode(validation_text(options.max_length), true)
            .map_err(|e| anyhow::anyhow!("Tokenizer validation failed: {}", e))?;
        let dimension = run_pooled(&mut session, uses_token_type_ids, &validation, options.pooling)
            .with_context(|| {
                format!(
                    "Validation inference failed at {} tokens (is max_length above the model's limit?)",
                    validation.get_ids().len()
                )
            })?
            .len();
        if dimension == 0 {
            anyhow::bail!("Model produced an empty embedding during validation");
        }

        info!(
            "ONNX embedding model {} loaded ({} dimensions, max_length {}, {:?} pooling, normalize {})",
            model_name, dimension, options.max_length, options.pooling, options.normalize
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
            model_name,
            dimension,
            max_length: options.max_length,
            uses_token_type_ids,
            normalize: options.normalize,
            pooling: options.pooling,
        })
    }

    /// Generates the embedding for a single text on the calling thread
    ///
    /// # Implementation
    /// 1. Tokenize (truncating to `max_length`)
    /// 2. Run ONNX inference under the session lock
    /// 3. Pool token embeddings
    /// 4. Optionally L2-normalize
    pub fn embed_blocking(&self, text: &str) -> Result<Vec<f32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;

        let mut embedding = {
            // A panicking run leaves the session itself intact
            let mut session = self
                .session
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            run_pooled(&mut session, self.uses_token_type_ids, &encoding, self.pooling)?
        };

        if embedding.len() != self.dimension {
            anyhow::bail!(
                "Unexpected embedding dimension: {} (expected {})",
                embedding.len(),
                self.dimension
            );
        }

        if self.normalize {
            l2_normalize(&mut embedding);
        }

        Ok(embedding)
    }

    /// Counts tokens in a text string after truncation
    pub fn count_tokens(&self, text: &str) -> Result<usize> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;

        Ok(encoding.get_attention_mask().iter().map(|&m| m as usize).sum())
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }
}

/// Text long enough to be truncated to `max_length` tokens
fn validation_text(max_length: usize) -> String {
    "validation ".repeat(max_length.max(1))
}

#[async_trait]
impl EmbeddingProvider for OnnxEmbeddingModel {
    async fn encode(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
        let model = self.clone();
        let text = text.to_owned();

        let result = tokio::task::spawn_blocking(move || model.embed_blocking(&text))
            .await
            .map_err(ServiceError::encoding_failure)?;

        result.map_err(|e| {
            debug!("Embedding failed: {:#}", e);
            ServiceError::EncodingFailure(format!("{:#}", e))
        })
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// Runs one tokenized sequence through the session and pools the output
fn run_pooled(
    session: &mut Session,
    uses_token_type_ids: bool,
    encoding: &Encoding,
    pooling: PoolingMode,
) -> Result<Vec<f32>> {
    let input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
    let attention_mask: Vec<i64> = encoding
        .get_attention_mask()
        .iter()
        .map(|&m| m as i64)
        .collect();
    let seq_len = input_ids.len();

    let input_ids_array = Array2::from_shape_vec((1, seq_len), input_ids)
        .context("Failed to create input_ids array")?;
    let attention_mask_array = Array2::from_shape_vec((1, seq_len), attention_mask.clone())
        .context("Failed to create attention_mask array")?;

    let outputs = if uses_token_type_ids {
        let token_type_ids_array = Array2::<i64>::zeros((1, seq_len));
        session.run(ort::inputs![
            "input_ids" => Value::from_array(input_ids_array)?,
            "attention_mask" => Value::from_array(attention_mask_array)?,
            "token_type_ids" => Value::from_array(token_type_ids_array)?
        ])?
    } else {
        session.run(ort::inputs![
            "input_ids" => Value::from_array(input_ids_array)?,
            "attention_mask" => Value::from_array(attention_mask_array)?
        ])?
    };

    // Different exports name their outputs differently; the first one carries the embeddings
    let output = outputs[0]
        .try_extract_array::<f32>()
        .context("Failed to extract output tensor")?;

    pool_first_batch(output, &attention_mask, pooling)
}

/// Reduces batch item 0 of a model output to a sentence vector
///
/// `[batch, seq_len, hidden]` outputs are pooled over the attention mask with
/// `pooling`; `[batch, hidden]` outputs are already pooled and returned as-is.
pub(crate) fn pool_first_batch(
    output: ArrayViewD<'_, f32>,
    attention_mask: &[i64],
    pooling: PoolingMode,
) -> Result<Vec<f32>> {
    let shape = output.shape().to_vec();
    if !matches!(shape.len(), 2 | 3) {
        anyhow::bail!(
            "Model outputs unexpected dimensions: {:?} (expected [batch, seq_len, hidden] or [batch, hidden])",
            shape
        );
    }
    if shape[0] == 0 {
        anyhow::bail!("Model output has an empty batch: {:?}", shape);
    }

    let item = output.index_axis(Axis(0), 0);
    if shape.len() == 2 {
        let pooled = item
            .into_dimensionality::<Ix1>()
            .context("Unexpected pooled output shape")?;
        return Ok(pooled.to_vec());
    }

    let tokens = item
        .into_dimensionality::<Ix2>()
        .context("Unexpected token output shape")?;
    let (seq_len, hidden_dim) = tokens.dim();
    if attention_mask.len() < seq_len {
        anyhow::bail!(
            "Attention mask shorter than sequence ({} < {})",
            attention_mask.len(),
            seq_len
        );
    }

    match pooling {
        PoolingMode::Mean => {
            let mut pooled = vec![0.0f32; hidden_dim];
            let mut sum_mask = 0.0f32;
            for (i, row) in tokens.outer_iter().enumerate() {
                let mask_value = attention_mask[i] as f32;
                sum_mask += mask_value;
                for (acc, &x) in pooled.iter_mut().zip(row.iter()) {
                    *acc += x * mask_value;
                }
            }

            for val in &mut pooled {
                *val /= sum_mask.max(1e-9);
            }

            Ok(pooled)
        }
        PoolingMode::Cls | PoolingMode::LastToken => {
            if seq_len == 0 {
                anyhow::bail!("Model output has no tokens to pool");
            }
            let index = match pooling {
                PoolingMode::Cls => 0,
                // Last attended position; a fully masked sequence uses the final row
                _ => attention_mask[..seq_len]
                    .iter()
                    .rposition(|&m| m != 0)
                    .unwrap_or(seq_len - 1),
            };
            Ok(tokens.row(index).to_vec())
        }
    }
}
