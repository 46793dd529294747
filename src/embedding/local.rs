//! Local ONNX Runtime embedding provider.
//!
//! Runs a sentence-transformers ONNX export via `ort`: tokenization, inference,
//! attention-masked mean pooling, and optional L2 normalization. The hidden
//! size is read from the model output, so any export of this shape works.

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;

use super::{l2_normalize, EmbeddingProvider};
use crate::config::EmbeddingConfig;

const MAX_SEQ_LEN: usize = 256;

/// Texts per inference call; keeps padded tensors bounded for large ingests.
const BATCH_SIZE: usize = 32;

pub struct LocalEmbeddingProvider {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
}

// Safety: Tokenizer is Send+Sync and the Session is only reached through the Mutex.
unsafe impl Send for LocalEmbeddingProvider {}
unsafe impl Sync for LocalEmbeddingProvider {}

/// Where `model.onnx` and `tokenizer.json` live for the configured model.
pub fn model_dir(config: &EmbeddingConfig) -> PathBuf {
    crate::config::expand_tilde(&config.cache_dir).join(&config.model)
}

impl LocalEmbeddingProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let dir = model_dir(config);
        let model_path = dir.join("model.onnx");
        let tokenizer_path = dir.join("tokenizer.json");

        anyhow::ensure!(
            model_path.exists(),
            "ONNX model not found at {}. Run `cvsearch model download` first.",
            model_path.display()
        );
        anyhow::ensure!(
            tokenizer_path.exists(),
            "Tokenizer not found at {}. Run `cvsearch model download` first.",
            tokenizer_path.display()
        );

        let session = Session::builder()?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?
            .commit_from_file(&model_path)
            .context("failed to load ONNX model")?;

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("failed to load tokenizer: {e}"))?;
        tokenizer
            .with_truncation(Some(tokenizers::TruncationParams {
                max_length: MAX_SEQ_LEN,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("failed to set truncation: {e}"))?;
        tokenizer.with_padding(Some(tokenizers::PaddingParams {
            strategy: tokenizers::PaddingStrategy::BatchLongest,
            ..Default::default()
        }));

        tracing::info!(model = %config.model, dir = %dir.display(), "embedding model loaded");

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
        })
    }

    fn encode_chunk(&self, texts: &[&str], normalize: bool) -> Result<Vec<Vec<f32>>> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| anyhow::anyhow!("tokenization failed: {e}"))?;

        let batch_size = encodings.len();
        let seq_len = encodings.first().map_or(0, |e| e.get_ids().len());

        let mut input_ids = Vec::with_capacity(batch_size * seq_len);
        let mut attention_mask = Vec::with_capacity(batch_size * seq_len);
        for encoding in &encodings {
            input_ids.extend(encoding.get_ids().iter().map(|&id| id as i64));
            attention_mask.extend(encoding.get_attention_mask().iter().map(|&m| m as i64));
        }

        let shape = vec![batch_size as i64, seq_len as i64];
        let ids_tensor = Tensor::from_array((shape.clone(), input_ids.into_boxed_slice()))?;
        let mask_tensor =
            Tensor::from_array((shape.clone(), attention_mask.clone().into_boxed_slice()))?;
        let type_ids_tensor = Tensor::from_array((
            shape,
            vec![0i64; batch_size * seq_len].into_boxed_slice(),
        ))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| anyhow::anyhow!("session lock poisoned: {e}"))?;
        let outputs = session.run(ort::inputs! {
            "input_ids" => ids_tensor,
            "attention_mask" => mask_tensor,
            "token_type_ids" => type_ids_tensor,
        })?;

        let token_embeddings = outputs
            .get("token_embeddings")
            .or_else(|| outputs.get("last_hidden_state"))
            .unwrap_or_else(|| &outputs[0]);
        let (out_shape, data) = token_embeddings
            .try_extract_tensor::<f32>()
            .context("failed to extract token embeddings")?;

        let dims: &[i64] = &out_shape;
        anyhow::ensure!(
            dims.len() == 3 && dims[0] as usize == batch_size && dims[2] > 0,
            "unexpected token embedding shape {dims:?}, expected [{batch_size}, seq, hidden]"
        );
        let out_seq = dims[1] as usize;
        let hidden = dims[2] as usize;

        let vectors = (0..batch_size)
            .map(|b| {
                let mask = &attention_mask[b * seq_len..(b + 1) * seq_len];
                let token = move |s: usize| &data[(b * out_seq + s) * hidden..][..hidden];
                let mut pooled = mean_pool(out_seq.min(seq_len), hidden, mask, token);
                if normalize {
                    l2_normalize(&mut pooled);
                }
                pooled
            })
            .collect();
        Ok(vectors)
    }
}

impl EmbeddingProvider for LocalEmbeddingProvider {
    fn encode(&self, texts: &[&str], normalize: bool) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(BATCH_SIZE) {
            vectors.extend(self.encode_chunk(chunk, normalize)?);
        }
        Ok(vectors)
    }
}

/// Average the token vectors whose attention mask is set.
fn mean_pool<'a>(
    tokens: usize,
    hidden: usize,
    mask: &[i64],
    token: impl Fn(usize) -> &'a [f32],
) -> Vec<f32> {
    let mut sum = vec![0.0f32; hidden];
    let mut count = 0.0f32;
    for s in (0..tokens).filter(|&s| mask[s] > 0) {
        for (acc, x) in sum.iter_mut().zip(token(s)) {
            *acc += x;
        }
        count += 1.0;
    }
    if count > 0.0 {
        sum.iter_mut().for_each(|x| *x /= count);
    }
    sum
}
