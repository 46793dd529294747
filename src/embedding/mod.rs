//! Text-to-vector embedding.
//!
//! The store consumes embeddings only through [`EmbeddingProvider`]. The output
//! dimension is whatever the provider produces; nothing downstream hard-codes
//! it. [`create_provider`] builds the configured implementation.

pub mod local;

use anyhow::Result;

/// Converts batches of text into fixed-length vectors.
///
/// Implementations return exactly one vector per input, all of the same length
/// within a call. Calls are synchronous; async callers should use
/// `tokio::task::spawn_blocking`.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed `texts`, L2-normalizing each vector when `normalize` is set.
    fn encode(&self, texts: &[&str], normalize: bool) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text.
    fn encode_one(&self, text: &str, normalize: bool) -> Result<Vec<f32>> {
        self.encode(&[text], normalize)?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("provider returned no vector for a single input"))
    }
}

/// Create an embedding provider from config.
///
/// Currently only `"local"` is supported (ONNX Runtime + a sentence-transformers export).
pub fn create_provider(
    config: &crate::config::EmbeddingConfig,
) -> Result<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "local" => Ok(Box::new(local::LocalEmbeddingProvider::new(config)?)),
        other => anyhow::bail!("unknown embedding provider: {other}. Supported: local"),
    }
}

/// L2-normalize a vector in place. Zero vectors are left unchanged.
pub fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_to_unit_length() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn zero_vector_is_unchanged() {
        let mut v = vec![0.0; 3];
        l2_normalize(&mut v);
        assert_eq!(v, vec![0.0, 0.0, 0.0]);
    }

    struct Echo;

    impl EmbeddingProvider for Echo {
        fn encode(&self, texts: &[&str], _normalize: bool) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| vec![t.len() as f32]).collect())
        }
    }

    #[test]
    fn encode_one_takes_the_single_vector() {
        assert_eq!(Echo.encode_one("abcd", false).unwrap(), vec![4.0]);
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let config = crate::config::EmbeddingConfig {
            provider: "remote".into(),
            ..Default::default()
        };
        let err = create_provider(&config).err().unwrap();
        assert!(err.to_string().contains("unknown embedding provider"));
    }
}
