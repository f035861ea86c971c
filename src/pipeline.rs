//! Sequential composition of predictions.
//!
//! A [Pipeline] runs its steps in order. Each step reads its input fields from the pipeline inputs and the outputs
//! of every earlier step, so `question -> key_points` followed by `key_points -> answer` passes the extracted key
//! points into the second prompt.

use log::debug;
use serde_json::Value;

use crate::error::{RagError, Result};
use crate::filler::FieldValues;
use crate::signature::{Predict, Prediction};
use crate::utils::JsonMap;
use crate::utils::llm::Complete;

pub struct Pipeline<L: Complete> {
    steps: Vec<Predict<L>>,
}

impl<L: Complete> Pipeline<L> {
    pub fn new(first: Predict<L>) -> Self {
        Self { steps: vec![first] }
    }

    pub fn then(mut self, step: Predict<L>) -> Self {
        self.steps.push(step);
        self
    }

    pub fn steps(&self) -> &[Predict<L>] {
        &self.steps
    }

    /// Run every step once, in order.
    ///
    /// The returned prediction holds the pipeline inputs and the outputs of all steps. A later step's output
    /// replaces an earlier field of the same name, such as `reasoning`.
    pub async fn forward<'a>(&self, inputs: impl IntoIterator<Item=(&'a str, &'a str)>) -> Result<Prediction> {
        let mut fields: JsonMap = inputs.into_iter()
            .map(|(name, value)| (name.to_string(), Value::String(value.to_string())))
            .collect();
        for (idx, step) in self.steps.iter().enumerate() {
            let mut step_inputs = FieldValues::new(step.signature().input_names());
            for name in step.signature().input_names() {
                let value = fields.get(&name)
                    .and_then(Value::as_str)
                    .ok_or_else(|| RagError::MissingInput(name.clone()))?;
                step_inputs.set(name.as_str(), value);
            }
            debug!("pipeline step {}: {}", idx + 1, step.signature());
            let prediction = step.forward(&step_inputs).await?;
            fields.extend(prediction.fields().clone());
        }
        Ok(Prediction::from(fields))
    }
}

#[cfg(test)]
mod test_pipeline {
    use std::sync::Mutex;
    use async_trait::async_trait;
    use super::*;
    use crate::signature::Signature;
    use crate::utils::llm::ChatPrompt;

    /// Replies in turn with the scripted texts and records the prompts it receives.
    struct ScriptedLm {
        replies: Mutex<Vec<&'static str>>,
        prompts: Mutex<Vec<ChatPrompt>>,
    }

    impl ScriptedLm {
        fn new(mut replies: Vec<&'static str>) -> Self {
            replies.reverse();
            Self { replies: Mutex::new(replies), prompts: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl Complete for ScriptedLm {
        async fn complete(&self, prompt: &ChatPrompt) -> anyhow::Result<String> {
            self.prompts.lock().unwrap().push(prompt.clone());
            self.replies.lock().unwrap()
                .pop()
                .map(str::to_string)
                .ok_or_else(|| anyhow::anyhow!("no scripted reply left"))
        }
    }

    fn two_step(lm: &ScriptedLm) -> Pipeline<&ScriptedLm> {
        Pipeline::new(Predict::new(Signature::parse("question -> key_points").unwrap(), lm))
            .then(Predict::new(Signature::parse("key_points -> answer").unwrap(), lm))
    }

    #[tokio::test]
    async fn test_outputs_feed_next_step() {
        let lm = ScriptedLm::new(vec![
            "[[ ## key_points ## ]]\ncapital city, large population\n\n[[ ## completed ## ]]",
            "[[ ## answer ## ]]\nTokyo is the capital and a very large city.\n\n[[ ## completed ## ]]",
        ]);
        let prediction = two_step(&lm).forward([("question", "What is the capital of Japan?")]).await.unwrap();
        assert_eq!(Some("What is the capital of Japan?"), prediction.get("question"));
        assert_eq!(Some("capital city, large population"), prediction.get("key_points"));
        assert_eq!(Some("Tokyo is the capital and a very large city."), prediction.get("answer"));

        let prompts = lm.prompts.lock().unwrap();
        assert_eq!(2, prompts.len());
        assert!(prompts[0].user.contains("What is the capital of Japan?"));
        assert!(prompts[1].user.contains("[[ ## key_points ## ]]\ncapital city, large population"));
        assert!(!prompts[1].user.contains("What is the capital of Japan?"));
    }

    #[tokio::test]
    async fn test_missing_input_stops_before_call() {
        let lm = ScriptedLm::new(vec![]);
        let error = two_step(&lm).forward([("text", "unrelated")]).await.unwrap_err();
        assert!(matches!(error, RagError::MissingInput(ref name) if name == "question"));
        assert!(lm.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_step_stops_pipeline() {
        let lm = ScriptedLm::new(vec!["[[ ## key_points ## ]]\npoints\n\n[[ ## completed ## ]]"]);
        let error = two_step(&lm).forward([("question", "q")]).await.unwrap_err();
        assert!(matches!(error, RagError::Generation(_)));
        assert_eq!(2, lm.prompts.lock().unwrap().len());
    }
}
