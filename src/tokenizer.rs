//! Tokenizer abstraction backed by Hugging Face `tokenizers`, with a fallback.
//!
//! A pretrained directory must carry a `tokenizer.json`; a missing file fails
//! fast. A file that is present but not loadable as a tokenizer definition
//! degrades to a byte-level fallback scheme with a warning, so a probe run is
//! never blocked by tokenizer schema drift.

use std::path::Path;
use std::sync::Arc;
use tokenizers::Tokenizer;
use tracing::warn;

use crate::error::{ForgeProbeError, ProbeResult};

/// File name of the tokenizer definition inside a pretrained directory
pub const TOKENIZER_FILE: &str = "tokenizer.json";

/// Vocabulary size of the byte-level fallback scheme
const FALLBACK_VOCAB_SIZE: u32 = 256;

/// Printable ASCII window used when decoding out-of-range fallback ids
const PRINTABLE_BASE: u32 = 33;
const PRINTABLE_SPAN: u32 = 94;

#[derive(Debug, Clone, Default)]
pub struct TokenizerAdapter {
    inner: Option<Arc<Tokenizer>>,
}

impl TokenizerAdapter {
    /// Load the tokenizer from a pretrained directory
    ///
    /// `tokenizer.json` must exist; a file that fails to parse falls back to
    /// the byte-level scheme.
    pub fn from_pretrained(dir: impl AsRef<Path>) -> ProbeResult<Self> {
        let path = dir.as_ref().join(TOKENIZER_FILE);
        if !path.is_file() {
            return Err(ForgeProbeError::MissingPretrainedFile(format!(
                "{}",
                path.display()
            )));
        }

        match Tokenizer::from_file(&path) {
            Ok(tokenizer) => Ok(TokenizerAdapter {
                inner: Some(Arc::new(tokenizer)),
            }),
            Err(err) => {
                warn!(
                    path = %path.display(),
                    "failed to load tokenizer, using byte-level fallback: {}",
                    err
                );
                Ok(TokenizerAdapter::default())
            }
        }
    }

    /// Encode text to token ids
    pub fn encode(&self, text: &str) -> Vec<u32> {
        if let Some(tokenizer) = &self.inner {
            tokenizer
                .encode(text, false)
                .map(|encoding| encoding.get_ids().to_vec())
                .unwrap_or_else(|_| fallback_encode(text))
        } else {
            fallback_encode(text)
        }
    }

    /// Decode token ids, guaranteed non-empty for non-empty input
    pub fn decode(&self, ids: &[u32]) -> String {
        if ids.is_empty() {
            return String::new();
        }
        if let Some(tokenizer) = &self.inner {
            match tokenizer.decode(ids, true) {
                Ok(text) if !text.trim().is_empty() => return text,
                Ok(_) | Err(_) => {}
            }
        }
        fallback_decode(ids)
    }

    /// Vocabulary size (including added tokens), or the fallback size
    pub fn vocab_size(&self) -> u32 {
        self.inner
            .as_ref()
            .map(|tokenizer| tokenizer.get_vocab_size(true) as u32)
            .unwrap_or(FALLBACK_VOCAB_SIZE)
            .max(1)
    }

    /// Whether a real tokenizer definition is backing this adapter
    pub fn is_fallback(&self) -> bool {
        self.inner.is_none()
    }
}

/// Byte-level fallback: one token per byte
fn fallback_encode(text: &str) -> Vec<u32> {
    text.bytes().map(u32::from).collect()
}

/// Map ids into printable ASCII so decoded output is always readable
fn fallback_decode(ids: &[u32]) -> String {
    ids.iter()
        .map(|&id| {
            let code = if (PRINTABLE_BASE..PRINTABLE_BASE + PRINTABLE_SPAN).contains(&id) {
                id
            } else {
                id % PRINTABLE_SPAN + PRINTABLE_BASE
            };
            char::from_u32(code).unwrap_or('?')
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_encode_is_byte_level() {
        let adapter = TokenizerAdapter::default();
        assert!(adapter.is_fallback());
        assert_eq!(adapter.encode("ab"), vec![97, 98]);
        assert_eq!(adapter.vocab_size(), FALLBACK_VOCAB_SIZE);
    }

    #[test]
    fn fallback_decode_round_trips_printable_ascii() {
        let adapter = TokenizerAdapter::default();
        let ids = adapter.encode("fib(n)");
        assert_eq!(adapter.decode(&ids), "fib(n)");
    }

    #[test]
    fn fallback_decode_is_never_empty_for_nonempty_input() {
        let adapter = TokenizerAdapter::default();
        let decoded = adapter.decode(&[0, 7, 1000, u32::MAX]);
        assert_eq!(decoded.chars().count(), 4);
        assert!(decoded.chars().all(|c| !c.is_control()));
    }

    #[test]
    fn decode_of_empty_ids_is_empty() {
        let adapter = TokenizerAdapter::default();
        assert_eq!(adapter.decode(&[]), "");
    }

    #[test]
    fn missing_tokenizer_file_fails_fast() {
        let err = TokenizerAdapter::from_pretrained("/nonexistent/model/dir").unwrap_err();
        assert!(matches!(err, ForgeProbeError::MissingPretrainedFile(_)));
    }
}
