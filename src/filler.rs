use std::collections::HashMap;
use crate::prompt::PartialPrompt;
use anyhow::Result;

pub trait FillPlaceholders {
    fn placeholders_to_fill(&self) -> &Vec<String>;
}

pub trait Fill: FillPlaceholders {
    fn fill(&self, partial_prompt: &mut PartialPrompt) -> Result<()>;
}

pub trait FillWith<CTX>: FillPlaceholders {
    fn fill_with(&self, partial_prompt: &mut PartialPrompt, context: CTX) -> Result<CTX>;
}

impl<T: FillWith<()>> Fill for T {
    fn fill(&self, partial_prompt: &mut PartialPrompt) -> Result<()> {
        self.fill_with(partial_prompt, ())
    }
}

/// Fills placeholders by name from a set of owned values.
///
/// Only the placeholders listed at construction are filled; a listed placeholder without a value is an error.
#[derive(Debug, Clone, Default)]
pub struct FieldValues {
    placeholders_to_fill: Vec<String>,
    values: HashMap<String, String>,
}

impl FieldValues {
    pub fn new(placeholders_to_fill: Vec<String>) -> Self {
        Self {
            placeholders_to_fill,
            values: HashMap::new(),
        }
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// The first listed placeholder that has no value, if any.
    pub fn first_missing(&self) -> Option<&str> {
        self.placeholders_to_fill
            .iter()
            .find(|p| !self.values.contains_key(p.as_str()))
            .map(String::as_str)
    }
}

impl FillPlaceholders for FieldValues {
    fn placeholders_to_fill(&self) -> &Vec<String> {
        &self.placeholders_to_fill
    }
}

impl FillWith<()> for FieldValues {
    fn fill_with(&self, partial_prompt: &mut PartialPrompt, context: ()) -> Result<()> {
        for placeholder in &self.placeholders_to_fill {
            let value = self.values
                .get(placeholder)
                .ok_or_else(|| anyhow::anyhow!("no value for placeholder {}", placeholder))?;
            partial_prompt.fill(placeholder.as_str(), value.as_str())?;
        }
        Ok(context)
    }
}
