//! Multi-turn conversations.
//!
//! A [Conversation] keeps every turn it has seen, but only the most recent few are rendered into the context of the
//! next generation call.

use std::collections::VecDeque;
use log::debug;
use serde::Serialize;

use crate::error::{RagError, Result};
use crate::utils::llm::Generate;

/// Rendered history of a conversation without any turn yet.
pub const CONVERSATION_START: &str = "(conversation start)";
/// Default number of turns rendered into the next request.
pub const DEFAULT_HISTORY_WINDOW: usize = 3;

/// A question and the answer it got.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[readonly::make]
pub struct Turn {
    pub question: String,
    pub answer: String,
}

/// How much history is rendered and how much is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryConfig {
    /// Number of most recent turns rendered into the next request.
    pub window: usize,
    /// Cap on stored turns, the oldest are dropped first. `None` keeps every turn.
    pub max_stored: Option<usize>,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_HISTORY_WINDOW,
            max_stored: None,
        }
    }
}

/// A conversation session. Owns its history exclusively.
pub struct Conversation<G: Generate> {
    generator: G,
    config: HistoryConfig,
    turns: VecDeque<Turn>,
}

impl<G: Generate> Conversation<G> {
    pub fn new(generator: G) -> Self {
        Self::with_config(generator, HistoryConfig::default())
    }

    pub fn with_config(generator: G, config: HistoryConfig) -> Self {
        Self {
            generator,
            config,
            turns: VecDeque::new(),
        }
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Every retained turn, oldest first.
    pub fn turns(&self) -> impl ExactSizeIterator<Item=&Turn> + DoubleEndedIterator {
        self.turns.iter()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Append a turn, dropping the oldest ones beyond `max_stored`.
    pub fn add_turn(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.turns.push_back(Turn {
            question: question.into(),
            answer: answer.into(),
        });
        if let Some(max_stored) = self.config.max_stored {
            while self.turns.len() > max_stored {
                self.turns.pop_front();
            }
        }
    }

    /// Render the most recent turns as `Q: ...` / `A: ...` lines.
    pub fn render_history(&self) -> String {
        if self.turns.is_empty() {
            return CONVERSATION_START.to_string();
        }
        let skip = self.turns.len().saturating_sub(self.config.window);
        let rendered = self.turns
            .iter()
            .skip(skip)
            .map(|turn| format!("Q: {}\nA: {}", turn.question, turn.answer))
            .collect::<Vec<_>>()
            .join("\n");
        if rendered.is_empty() {
            CONVERSATION_START.to_string()
        } else {
            rendered
        }
    }

    /// Answer a new question in the light of the recent history and record the turn.
    ///
    /// Nothing is recorded when generation fails.
    pub async fn respond(&mut self, new_question: &str) -> Result<Turn> {
        let history = self.render_history();
        debug!("responding with {} of {} turns in history", self.turns.len().min(self.config.window), self.turns.len());
        let response = self.generator
            .generate(&history, new_question)
            .await
            .map_err(RagError::from_generation)?;
        let turn = Turn {
            question: new_question.to_string(),
            answer: response,
        };
        self.add_turn(turn.question.as_str(), turn.answer.as_str());
        Ok(turn)
    }
}
