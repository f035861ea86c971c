use std::collections::HashMap;
use anyhow::Result;
pub use tiktoken_rs::{cl100k_base, get_bpe_from_model, CoreBPE};
use log::warn;

use crate::utils::token::CountToken;
use lazy_static::lazy_static;

lazy_static! {
    /// const map from model name to its context window in tokens.
    pub static ref MODEL_TO_MAX_TOKENS: HashMap<&'static str, usize> = HashMap::from([
        ("gpt-4", 8192),
        ("gpt-4-0613", 8192),
        ("gpt-4-32k", 32768),
        ("gpt-4-32k-0613", 32768),
        ("gpt-3.5-turbo", 4096),
        ("gpt-3.5-turbo-16k", 16384),
        ("gpt-3.5-turbo-0613", 4096),
        ("gpt-3.5-turbo-16k-0613", 16384),
    ]);
}

/// Azure deployments conventionally drop the dot, e.g. `gpt-35-turbo`.
fn normalize_model_name(model: &str) -> String {
    model.replace("gpt-35", "gpt-3.5")
}

/// Counter using the Tiktoken tokenizer.
#[derive(Clone)]
#[readonly::make]
pub struct Tiktoken {
    /// The model name of the tokenizer. read-only.
    #[readonly]
    pub model: String,
    /// The tokenizer. read-only.
    #[readonly]
    pub bpe: CoreBPE,
}

impl Tiktoken {
    /// Create a new Tiktoken counter for a model or an Azure deployment name.
    ///
    /// Models unknown to `tiktoken-rs` fall back to the `cl100k_base` encoding.
    pub fn new(model: impl Into<String>) -> Result<Self> {
        let model = normalize_model_name(&model.into());
        let bpe = match get_bpe_from_model(&model) {
            Ok(bpe) => bpe,
            Err(_) => {
                warn!("no tokenizer registered for model {}, falling back to cl100k_base", model);
                cl100k_base()?
            }
        };
        Ok(Tiktoken {
            model,
            bpe,
        })
    }

    /// The context window of the model, if known.
    pub fn max_tokens(&self) -> Option<usize> {
        MODEL_TO_MAX_TOKENS.get(self.model.as_str()).copied()
    }
}

impl CountToken for Tiktoken {
    fn count_token(&self, string: &str) -> usize {
        self.bpe.encode_with_special_tokens(string).len()
    }
}
