//! # promptrag
//!
//! Signature-declared LLM predictions and a minimal retrieval-augmented generation loop in Rust
//!
//! ## Usage
//! `promptrag` is not released on crates.io. To use it, add a path dependency in `Cargo.toml`
//! ```toml
//! promptrag = { path = "../promptrag" }
//! ```
//!
//! ```no_run
//! use promptrag::rag::RagPipeline;
//! use promptrag::signature::{Predict, Signature};
//! use promptrag::utils::llm::LlmConfig;
//! use promptrag::utils::llm::openai::LlmClient;
//! use promptrag::utils::retrievers::KeywordRetriever;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = LlmConfig::from_env()?;
//! let generator = Predict::chain_of_thought(Signature::parse("context, question -> answer")?, LlmClient::new(&config));
//! let retriever: KeywordRetriever = ["RAG combines retrieval and generation."].into_iter().collect();
//! let rag = RagPipeline::validated(retriever, generator);
//! let answer = rag.answer("How does RAG work?").await?;
//! println!("{}", answer.answer);
//! # Ok(())
//! # }
//! ```
//!
//! ## Concepts and Design
//! The APIs are designed to be as explicit as possible: every collaborator is passed in by its constructor and there
//! is no global state. Cycle speed is NOT a top priority since LLM can take trillions of cycles to respond to a request.
//!
//! ### Retriever
//!
//! Anything implementing [`Retrieve`](crate::utils::retrievers::Retrieve) ranks a fixed corpus against a query.
//! [`KeywordRetriever`](crate::utils::retrievers::KeywordRetriever) scores documents by the distinct words they share
//! with the query.
//!
//! ### Generate and Complete
//!
//! [`Generate`](crate::utils::llm::Generate) turns a context and a question into an answer. It is the only thing the
//! RAG pipeline and conversations need from an LLM, which makes them easy to test with stubs.
//! [`Complete`](crate::utils::llm::Complete) is a raw chat completion, implemented for OpenAI and Azure OpenAI by
//! [`LlmClient`](crate::utils::llm::openai::LlmClient).
//!
//! ### Signature
//!
//! A declaration of the input and output fields of one LLM call, e.g. `"context, question -> answer"`. A
//! [`Predict`](crate::signature::Predict) renders its signature into a chat prompt through a
//! [`PromptTemplate`](crate::prompt::PromptTemplate), calls the LLM, and parses the reply back into named fields.
//! It implements `Generate`. A [`Pipeline`](crate::pipeline::Pipeline) chains predictions so that the outputs of one
//! step become the inputs of the next.
//!
//! ### Prompt Template, Placeholder and Filler
//!
//! A template looks like
//!
//! ```text
//! [[ ## question ## ]]
//! {[question]}
//! ```
//!
//! `{[question]}` is a placeholder named `"question"`. A `PartialPrompt` comes only from
//! `PromptTemplate::construct_prompt`, records which placeholder is filled by what value, and becomes a concrete
//! prompt via `PartialPrompt::complete` once every placeholder is filled. Anything implementing
//! [`Fill`](crate::filler::Fill) fills placeholders.
//!
//! ### RAG and Conversation
//!
//! [`RagPipeline`](crate::rag::RagPipeline) retrieves, joins the documents into a context and generates exactly once.
//! [`Conversation`](crate::conversation::Conversation) folds the last few turns into the context of the next one.
//!
//! ## License
//!
//! `promptrag` will always remain free under Apache license.
//!
//! ## Attribution
//! * `tiktoken-rs`: In [crate::utils::token::tiktoken], we re-export the `tiktoken-rs` crate.


pub mod prompt;
pub mod filler;
pub mod signature;
pub mod pipeline;
pub mod rag;
pub mod conversation;
pub mod error;
pub mod utils;

pub use error::{RagError, Result};
