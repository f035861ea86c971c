//! # Signature
//! A signature declares the named input fields and named output fields of one LLM call, written as
//! `"context, question -> answer"`.
//!
//! A signature renders into a chat prompt. The system message describes the fields and the format to answer in, while
//! the user message is a [PromptTemplate] with one `{[field]}` placeholder per input, each under a field marker like
//! `[[ ## question ## ]]`. The reply is parsed back into a [Prediction] by the same markers.
//!
//! [Predict] binds a signature to an LLM. [Signature::chain_of_thought] adds a leading `reasoning` output so the LLM
//! reasons before it answers.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use async_trait::async_trait;
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{RagError, Result};
use crate::filler::{Fill, FieldValues};
use crate::prompt::PromptTemplate;
use crate::utils::JsonMap;
use crate::utils::llm::{ChatPrompt, Complete, Generate};
use crate::utils::prompt_processing::to_placeholder;
use crate::utils::token::CountToken;

/// Name of the output field chain-of-thought adds.
pub const REASONING_FIELD: &str = "reasoning";
/// Marker name that ends the outputs of a reply.
pub const COMPLETED_MARKER: &str = "completed";

const REASONING_DESCRIPTION: &str = "Think step by step in order to produce the remaining outputs.";

lazy_static! {
    static ref FIELD_MARKER_RE: Regex = Regex::new(r"\[\[\s*##\s*(\w+)\s*##\s*\]\]").unwrap();
}

/// `[[ ## name ## ]]`
pub fn field_marker(name: &str) -> String {
    format!("[[ ## {} ## ]]", name)
}

/// A named field of a signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub description: Option<String>,
}

impl Field {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }

    fn describe_line(&self, idx: usize) -> String {
        match &self.description {
            Some(description) => format!("{}. `{}`: {}", idx + 1, self.name, description),
            None => format!("{}. `{}`", idx + 1, self.name),
        }
    }
}

/// Input and output fields of an LLM call, plus the instructions of the task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub inputs: Vec<Field>,
    pub outputs: Vec<Field>,
    instructions: Option<String>,
}

impl Signature {
    /// Parse a signature in the format `"input1, input2 -> output1, output2"`.
    pub fn parse(signature: &str) -> Result<Self> {
        let parts: Vec<&str> = signature.split("->").collect();
        if parts.len() != 2 {
            return Err(RagError::Signature(format!("{:?} must be in the format 'inputs -> outputs'", signature)));
        }
        let inputs = Self::parse_fields(parts[0])?;
        let outputs = Self::parse_fields(parts[1])?;
        if inputs.is_empty() || outputs.is_empty() {
            return Err(RagError::Signature(format!("{:?} needs at least one input and one output field", signature)));
        }
        let sig = Self {
            inputs,
            outputs,
            instructions: None,
        };
        let mut seen = HashSet::new();
        if let Some(dup) = sig.all_fields().find(|f| !seen.insert(f.name.as_str())) {
            return Err(RagError::Signature(format!("field `{}` appears more than once in {:?}", dup.name, signature)));
        }
        Ok(sig)
    }

    fn parse_fields(part: &str) -> Result<Vec<Field>> {
        part.split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| {
                if name.chars().all(|c| c.is_alphanumeric() || c == '_') && name != COMPLETED_MARKER {
                    Ok(Field::new(name))
                } else {
                    Err(RagError::Signature(format!("`{}` is not a valid field name", name)))
                }
            })
            .collect()
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Attach a description to an input or output field.
    pub fn describe(mut self, name: &str, description: impl Into<String>) -> Result<Self> {
        let field = self.inputs.iter_mut()
            .chain(self.outputs.iter_mut())
            .find(|f| f.name == name)
            .ok_or_else(|| RagError::Signature(format!("no field named `{}`", name)))?;
        field.description = Some(description.into());
        Ok(self)
    }

    /// Prepend a `reasoning` output field, unless the signature already has one.
    pub fn chain_of_thought(mut self) -> Self {
        if !self.outputs.iter().any(|f| f.name == REASONING_FIELD) {
            self.outputs.insert(0, Field {
                name: REASONING_FIELD.to_string(),
                description: Some(REASONING_DESCRIPTION.to_string()),
            });
        }
        self
    }

    pub fn all_fields(&self) -> impl Iterator<Item=&Field> {
        self.inputs.iter().chain(self.outputs.iter())
    }

    pub fn input_names(&self) -> Vec<String> {
        self.inputs.iter().map(|f| f.name.clone()).collect()
    }

    /// The instructions, or a default one derived from the field names.
    pub fn instructions(&self) -> String {
        match &self.instructions {
            Some(instructions) => instructions.clone(),
            None => {
                let quote = |fields: &[Field]| fields.iter()
                    .map(|f| format!("`{}`", f.name))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("Given the fields {}, produce the fields {}.", quote(&self.inputs), quote(&self.outputs))
            }
        }
    }

    /// The system message: field descriptions, the structure of an interaction and the task.
    pub fn system_message(&self) -> String {
        let mut message = String::from("Your input fields are:\n");
        for (idx, field) in self.inputs.iter().enumerate() {
            message.push_str(&field.describe_line(idx));
            message.push('\n');
        }
        message.push_str("Your output fields are:\n");
        for (idx, field) in self.outputs.iter().enumerate() {
            message.push_str(&field.describe_line(idx));
            message.push('\n');
        }
        message.push_str("All interactions will be structured in the following way, with the appropriate values filled in.\n\n");
        for field in self.all_fields() {
            message.push_str(&format!("{}\n{{{}}}\n\n", field_marker(&field.name), field.name));
        }
        message.push_str(&field_marker(COMPLETED_MARKER));
        message.push_str("\nIn adhering to this structure, your objective is: ");
        message.push_str(&self.instructions());
        message
    }

    /// The user message template, one placeholder per input field followed by the output format reminder.
    ///
    /// The template's metadata records the signature under `"signature"`.
    pub fn user_template(&self) -> PromptTemplate {
        let inputs = self.inputs.iter()
            .map(|f| format!("{}\n{}", field_marker(&f.name), to_placeholder(&f.name)))
            .collect::<Vec<_>>()
            .join("\n\n");
        let mut metadata = JsonMap::new();
        metadata.insert("signature".to_string(), Value::String(self.to_string()));
        PromptTemplate::with_metadata(format!("{}\n\n{}", inputs, self.output_reminder()), metadata)
    }

    fn output_reminder(&self) -> String {
        let markers: Vec<String> = self.outputs.iter()
            .map(|f| format!("`{}`", field_marker(&f.name)))
            .collect();
        match markers.split_first() {
            Some((first, rest)) => {
                let rest: String = rest.iter().map(|m| format!(", then {}", m)).collect();
                format!("Respond with the corresponding output fields, starting with the field {}{}, and then ending with the marker for `{}`.",
                        first, rest, field_marker(COMPLETED_MARKER))
            }
            None => format!("End your reply with the marker for `{}`.", field_marker(COMPLETED_MARKER)),
        }
    }

    /// Parse a reply into the declared output fields.
    ///
    /// A reply without any field marker is accepted as the value of the only non-reasoning output, if there is
    /// exactly one; a declared `reasoning` is then left empty.
    pub fn parse_reply(&self, reply: &str) -> Result<Prediction> {
        let markers: Vec<(String, usize, usize)> = FIELD_MARKER_RE.captures_iter(reply)
            .filter_map(|captures| {
                let whole = captures.get(0)?;
                Some((captures[1].to_string(), whole.start(), whole.end()))
            })
            .collect();
        let mut fields = JsonMap::new();
        if markers.is_empty() {
            let answers: Vec<&Field> = self.outputs.iter().filter(|f| f.name != REASONING_FIELD).collect();
            if answers.len() == 1 {
                if self.outputs.len() > 1 {
                    fields.insert(REASONING_FIELD.to_string(), Value::String(String::new()));
                }
                fields.insert(answers[0].name.clone(), Value::String(reply.trim().to_string()));
                return Ok(Prediction { fields });
            }
        }
        for (idx, (name, _, end)) in markers.iter().enumerate() {
            if name == COMPLETED_MARKER {
                break;
            }
            let section_end = markers.get(idx + 1).map_or(reply.len(), |next| next.1);
            let is_output = self.outputs.iter().any(|f| &f.name == name);
            if is_output && !fields.contains_key(name) {
                fields.insert(name.clone(), Value::String(reply[*end..section_end].trim().to_string()));
            }
        }
        if let Some(missing) = self.outputs.iter().find(|f| !fields.contains_key(&f.name)) {
            return Err(RagError::MissingOutputField(missing.name.clone()));
        }
        Ok(Prediction { fields })
    }
}

impl FromStr for Signature {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = |fields: &[Field]| fields.iter().map(|f| f.name.as_str()).collect::<Vec<_>>().join(", ");
        write!(f, "{} -> {}", names(&self.inputs), names(&self.outputs))
    }
}

/// A completed example of a task, rendered into the prompt as a few-shot demonstration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Example {
    pub fields: JsonMap,
}

impl Example {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.fields.get(name).map(|value| match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

/// Named outputs of one prediction.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Prediction {
    fields: JsonMap,
}

impl Prediction {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    pub fn reasoning(&self) -> Option<&str> {
        self.get(REASONING_FIELD)
    }

    pub fn fields(&self) -> &JsonMap {
        &self.fields
    }
}

impl From<JsonMap> for Prediction {
    fn from(fields: JsonMap) -> Self {
        Self { fields }
    }
}

/// The exact prompt a prediction would send, with its token count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptInspection {
    pub prompt: ChatPrompt,
    pub token_count: usize,
}

/// A signature bound to an LLM.
pub struct Predict<L: Complete> {
    signature: Signature,
    lm: L,
    demos: Vec<Example>,
    user_template: PromptTemplate,
}

impl<L: Complete> Predict<L> {
    pub fn new(signature: Signature, lm: L) -> Self {
        let user_template = signature.user_template();
        Self {
            signature,
            lm,
            demos: Vec::new(),
            user_template,
        }
    }

    /// Predict with a leading `reasoning` output.
    pub fn chain_of_thought(signature: Signature, lm: L) -> Self {
        Self::new(signature.chain_of_thought(), lm)
    }

    pub fn with_demos(mut self, demos: Vec<Example>) -> Self {
        self.demos = demos;
        self
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn lm(&self) -> &L {
        &self.lm
    }

    pub fn user_template(&self) -> &PromptTemplate {
        &self.user_template
    }

    /// Collect input values for this signature.
    pub fn inputs<'a>(&self, values: impl IntoIterator<Item=(&'a str, &'a str)>) -> FieldValues {
        let mut inputs = FieldValues::new(self.signature.input_names());
        for (name, value) in values {
            inputs.set(name, value);
        }
        inputs
    }

    fn render_demos(&self) -> String {
        self.demos.iter()
            .enumerate()
            .map(|(idx, demo)| {
                let body = self.signature.all_fields()
                    .filter_map(|f| demo.get(&f.name).map(|v| format!("{}\n{}", field_marker(&f.name), v)))
                    .collect::<Vec<_>>()
                    .join("\n\n");
                format!("Example {}:\n{}\n\n", idx + 1, body)
            })
            .collect()
    }

    /// Render the chat prompt for the given inputs.
    pub fn build_prompt(&self, inputs: &FieldValues) -> Result<ChatPrompt> {
        if let Some(missing) = inputs.first_missing() {
            return Err(RagError::MissingInput(missing.to_string()));
        }
        let mut partial_prompt = self.user_template.construct_prompt();
        inputs.fill(&mut partial_prompt)
            .map_err(|e| RagError::Signature(format!("cannot fill the prompt of {}: {}", self.signature, e)))?;
        let user = format!("{}{}", self.render_demos(), partial_prompt.complete()?);
        Ok(ChatPrompt {
            system: self.signature.system_message(),
            user,
        })
    }

    /// Render the prompt and count its tokens without calling the LLM.
    pub fn inspect(&self, inputs: &FieldValues, counter: &impl CountToken) -> Result<PromptInspection> {
        let prompt = self.build_prompt(inputs)?;
        let token_count = counter.count_token(&prompt.system) + counter.count_token(&prompt.user);
        Ok(PromptInspection {
            prompt,
            token_count,
        })
    }

    /// Call the LLM once and parse its reply.
    pub async fn forward(&self, inputs: &FieldValues) -> Result<Prediction> {
        let prompt = self.build_prompt(inputs)?;
        debug!("predicting {} with {} demos", self.signature, self.demos.len());
        let reply = self.lm.complete(&prompt).await.map_err(RagError::Generation)?;
        self.signature.parse_reply(&reply)
    }
}

/// With two inputs the first receives the context and the second the question. With one input it receives the
/// question and the context is dropped. The answer is the last output field.
#[async_trait]
impl<L: Complete> Generate for Predict<L> {
    async fn generate(&self, context: &str, question: &str) -> anyhow::Result<String> {
        let names = self.signature.input_names();
        let inputs = match names.as_slice() {
            [question_field] => self.inputs([(question_field.as_str(), question)]),
            [context_field, question_field] => self.inputs([(context_field.as_str(), context), (question_field.as_str(), question)]),
            _ => {
                let reason = format!("{} cannot generate from a context and a question, it needs one or two input fields", self.signature);
                return Err(RagError::Signature(reason).into());
            }
        };
        let prediction = self.forward(&inputs).await.map_err(|e| match e {
            RagError::Generation(inner) => inner,
            other => other.into(),
        })?;
        let answer_field = self.signature.outputs.last().map(|f| f.name.as_str()).unwrap_or_default();
        Ok(prediction.get(answer_field).unwrap_or_default().to_string())
    }
}

#[cfg(test)]
mod test_signature {
    use std::sync::Mutex;
    use async_trait::async_trait;
    use super::*;
    use crate::utils::token::count_tokens_by_len;

    /// Replies with a fixed text and records the prompts it receives.
    struct ScriptedLm {
        reply: String,
        prompts: Mutex<Vec<ChatPrompt>>,
    }

    impl ScriptedLm {
        fn new(reply: &str) -> Self {
            Self { reply: reply.to_string(), prompts: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl Complete for ScriptedLm {
        async fn complete(&self, prompt: &ChatPrompt) -> anyhow::Result<String> {
            self.prompts.lock().unwrap().push(prompt.clone());
            Ok(self.reply.clone())
        }
    }

    struct FailingLm;

    #[async_trait]
    impl Complete for FailingLm {
        async fn complete(&self, _prompt: &ChatPrompt) -> anyhow::Result<String> {
            anyhow::bail!("quota exceeded")
        }
    }

    #[test]
    fn test_parse() {
        let sig = Signature::parse("context, question -> answer").unwrap();
        assert_eq!(vec!["context".to_string(), "question".to_string()], sig.input_names());
        assert_eq!("answer", sig.outputs[0].name);
        assert_eq!("context, question -> answer", sig.to_string());
        let sig: Signature = "name,age -> greeting".parse().unwrap();
        assert_eq!("name, age -> greeting", sig.to_string());
    }

    #[test]
    fn test_parse_errors() {
        for bad in ["question answer", "a -> b -> c", " -> answer", "question -> ", "a, a -> b", "a b -> c", "q -> completed"] {
            assert!(matches!(Signature::parse(bad), Err(RagError::Signature(_))), "{} should not parse", bad);
        }
    }

    #[test]
    fn test_chain_of_thought_once() {
        let sig = Signature::parse("question -> answer").unwrap().chain_of_thought().chain_of_thought();
        assert_eq!("question -> reasoning, answer", sig.to_string());
    }

    #[test]
    fn test_default_instructions() {
        let sig = Signature::parse("text -> summary").unwrap();
        assert_eq!("Given the fields `text`, produce the fields `summary`.", sig.instructions());
        let sig = sig.with_instructions("Summarize the text.");
        assert!(sig.system_message().ends_with("your objective is: Summarize the text."));
    }

    #[test]
    fn test_describe() {
        let sig = Signature::parse("input_text -> output_text").unwrap()
            .describe("input_text", "the input text").unwrap();
        assert!(sig.system_message().contains("1. `input_text`: the input text"));
        assert!(sig.describe("nope", "x").is_err());
    }

    #[test]
    fn test_user_template_placeholders() {
        let sig = Signature::parse("history, new_question -> response").unwrap().chain_of_thought();
        let template = sig.user_template();
        assert_eq!(2, template.placeholders.len());
        assert_eq!(Some(&Value::String("history, new_question -> reasoning, response".to_string())), template.meta_data.get("signature"));
        assert!(template.str().contains("[[ ## new_question ## ]]\n{[new_question]}"));
        assert!(template.str().ends_with("starting with the field `[[ ## reasoning ## ]]`, then `[[ ## response ## ]]`, and then ending with the marker for `[[ ## completed ## ]]`."));
    }

    #[test]
    fn test_parse_reply() {
        let sig = Signature::parse("question -> answer").unwrap().chain_of_thought();
        let reply = "[[ ## reasoning ## ]]\nPython is a language.\n\n[[ ## answer ## ]]\nAn interpreted language.\n\n[[ ## completed ## ]]\ntrailing";
        let prediction = sig.parse_reply(reply).unwrap();
        assert_eq!(Some("Python is a language."), prediction.reasoning());
        assert_eq!(Some("An interpreted language."), prediction.get("answer"));
    }

    #[test]
    fn test_parse_reply_without_markers() {
        let sig = Signature::parse("question -> answer").unwrap().chain_of_thought();
        let prediction = sig.parse_reply("  just the answer \n").unwrap();
        assert_eq!(Some("just the answer"), prediction.get("answer"));
        assert_eq!(Some(""), prediction.reasoning());

        let sig = Signature::parse("question -> key_points, answer").unwrap();
        assert!(matches!(sig.parse_reply("no markers"), Err(RagError::MissingOutputField(_))));
    }

    #[test]
    fn test_parse_reply_missing_field() {
        let sig = Signature::parse("question -> answer").unwrap().chain_of_thought();
        let error = sig.parse_reply("[[ ## reasoning ## ]]\nthinking...").unwrap_err();
        assert!(matches!(error, RagError::MissingOutputField(name) if name == "answer"));
    }

    #[test]
    fn test_build_prompt_with_demos() {
        let sig = Signature::parse("question -> answer").unwrap();
        let predict = Predict::new(sig, ScriptedLm::new(""))
            .with_demos(vec![Example::new().with("question", "What is 2+2?").with("answer", "4")]);
        let prompt = predict.build_prompt(&predict.inputs([("question", "What is 3x5?")])).unwrap();
        assert!(prompt.system.starts_with("Your input fields are:\n1. `question`\n"));
        assert!(prompt.user.starts_with("Example 1:\n[[ ## question ## ]]\nWhat is 2+2?\n\n[[ ## answer ## ]]\n4\n\n"));
        assert!(prompt.user.contains("[[ ## question ## ]]\nWhat is 3x5?"));
    }

    #[test]
    fn test_missing_input() {
        let predict = Predict::new(Signature::parse("context, question -> answer").unwrap(), ScriptedLm::new(""));
        let error = predict.build_prompt(&predict.inputs([("question", "why?")])).unwrap_err();
        assert!(matches!(error, RagError::MissingInput(name) if name == "context"));
    }

    #[test]
    fn test_inspect() {
        let predict = Predict::new(Signature::parse("question -> answer").unwrap(), ScriptedLm::new(""));
        let inspection = predict.inspect(&predict.inputs([("question", "What is Python?")]), &count_tokens_by_len).unwrap();
        assert_eq!(inspection.prompt.system.len() + inspection.prompt.user.len(), inspection.token_count);
        assert!(predict.lm().prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_forward() {
        let lm = ScriptedLm::new("[[ ## summary ## ]]\nDSPy automates prompting.\n[[ ## completed ## ]]");
        let predict = Predict::new(Signature::parse("text -> summary").unwrap(), lm);
        let prediction = predict.forward(&predict.inputs([("text", "DSPy is a framework ...")])).await.unwrap();
        assert_eq!(Some("DSPy automates prompting."), prediction.get("summary"));
        assert_eq!(1, predict.lm().prompts.lock().unwrap().len());
    }

    #[tokio::test]
    async fn test_generate_binds_context_and_question() {
        let lm = ScriptedLm::new("[[ ## reasoning ## ]]\nfrom context\n[[ ## answer ## ]]\nRAG combines retrieval and generation.");
        let predict = Predict::chain_of_thought(Signature::parse("context, question -> answer").unwrap(), lm);
        let answer = predict.generate("RAG is retrieval plus generation.", "What is RAG?").await.unwrap();
        assert_eq!("RAG combines retrieval and generation.", answer);
        let prompts = predict.lm().prompts.lock().unwrap();
        assert!(prompts[0].user.contains("[[ ## context ## ]]\nRAG is retrieval plus generation."));
        assert!(prompts[0].user.contains("[[ ## question ## ]]\nWhat is RAG?"));
    }

    #[tokio::test]
    async fn test_generate_single_input_drops_context() {
        let predict = Predict::new(Signature::parse("question -> answer").unwrap(), ScriptedLm::new("plain answer"));
        assert_eq!("plain answer", predict.generate("ignored context", "What is Python?").await.unwrap());
        assert!(!predict.lm().prompts.lock().unwrap()[0].user.contains("ignored context"));
    }

    #[tokio::test]
    async fn test_generate_passes_lm_error_through() {
        let predict = Predict::new(Signature::parse("question -> answer").unwrap(), FailingLm);
        let error = predict.generate("", "What is Python?").await.unwrap_err();
        assert_eq!("quota exceeded", error.to_string());
    }

    #[tokio::test]
    async fn test_generate_rejects_three_inputs() {
        let predict = Predict::new(Signature::parse("a, b, c -> answer").unwrap(), ScriptedLm::new("x"));
        assert!(predict.generate("ctx", "q").await.is_err());
    }
}
