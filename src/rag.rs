//! # Retrieval-augmented generation
//!
//! [RagPipeline] answers a question in one pass: retrieve the top-k documents, join them into a context, and make
//! exactly one call to the generation capability. There is no caching and no retry, and every failure reaches the
//! caller.
//!
//! With validation enabled, the question is checked before anything else happens, and a blank generated answer is
//! reported as [RagError::EmptyGeneration].

use log::{debug, info};
use serde::Serialize;

use crate::error::{RagError, Result};
use crate::utils::llm::Generate;
use crate::utils::retrievers::{Retrieve, DEFAULT_TOP_K};

/// Default upper bound on the length of a validated question, in characters.
pub const MAX_QUESTION_CHARS: usize = 1000;

/// Settings of a [RagPipeline], fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RagConfig {
    /// Number of documents retrieved per question.
    pub top_k: usize,
    /// Validate the question before and the answer after generation.
    pub validate: bool,
    /// Longest accepted question when validating, in characters.
    pub max_question_chars: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            validate: false,
            max_question_chars: MAX_QUESTION_CHARS,
        }
    }
}

impl RagConfig {
    pub fn validated() -> Self {
        Self {
            validate: true,
            ..Self::default()
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }
}

/// The answer to one question along with the context it was generated from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[readonly::make]
pub struct Answer {
    pub question: String,
    pub context: String,
    pub answer: String,
}

/// Checks a question against the validation rules: not blank, and at most `max_chars` characters long.
pub fn validate_question(question: &str, max_chars: usize) -> Result<()> {
    if question.trim().is_empty() {
        return Err(RagError::InvalidInput("the question is empty".to_string()));
    }
    let chars = question.chars().count();
    if chars > max_chars {
        return Err(RagError::InvalidInput(format!("the question is too long ({} characters, at most {})", chars, max_chars)));
    }
    Ok(())
}

/// Sequences retrieval and generation into one answer-producing call.
pub struct RagPipeline<R: Retrieve, G: Generate> {
    retriever: R,
    generator: G,
    config: RagConfig,
}

impl<R: Retrieve, G: Generate> RagPipeline<R, G> {
    pub fn new(retriever: R, generator: G) -> Self {
        Self::with_config(retriever, generator, RagConfig::default())
    }

    /// A pipeline that validates questions and answers.
    pub fn validated(retriever: R, generator: G) -> Self {
        Self::with_config(retriever, generator, RagConfig::validated())
    }

    pub fn with_config(retriever: R, generator: G, config: RagConfig) -> Self {
        Self {
            retriever,
            generator,
            config,
        }
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    pub fn retriever(&self) -> &R {
        &self.retriever
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Retrieve the top-k documents for the question and join them with newlines.
    pub fn retrieve_context(&self, question: &str) -> String {
        self.retriever.retrieve(question, self.config.top_k).join("\n")
    }

    /// Answer a question with one retrieval and one generation call.
    pub async fn answer(&self, question: &str) -> Result<Answer> {
        if self.config.validate {
            validate_question(question, self.config.max_question_chars)?;
        }
        let context = self.retrieve_context(question);
        debug!("generating with {} bytes of context", context.len());
        let answer = self.generator
            .generate(&context, question)
            .await
            .map_err(RagError::from_generation)?;
        if self.config.validate && answer.trim().is_empty() {
            return Err(RagError::EmptyGeneration);
        }
        info!("answered question {:?}", question);
        Ok(Answer {
            question: question.to_string(),
            context,
            answer,
        })
    }
}
