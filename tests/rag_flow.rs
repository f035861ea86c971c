use std::sync::Mutex;
use async_trait::async_trait;
use promptrag::conversation::Conversation;
use promptrag::rag::RagPipeline;
use promptrag::signature::{Predict, Signature};
use promptrag::utils::llm::{ChatPrompt, Complete};
use promptrag::utils::retrievers::KeywordRetriever;
use promptrag::RagError;

/// An LLM that follows the field marker format and remembers every prompt.
struct MarkerLm {
    output: &'static str,
    prompts: Mutex<Vec<ChatPrompt>>,
}

impl MarkerLm {
    fn answering(output: &'static str) -> Self {
        Self { output, prompts: Mutex::new(Vec::new()) }
    }
}

#[async_trait]
impl Complete for MarkerLm {
    async fn complete(&self, prompt: &ChatPrompt) -> anyhow::Result<String> {
        let mut prompts = self.prompts.lock().unwrap();
        prompts.push(prompt.clone());
        Ok(format!("[[ ## reasoning ## ]]\nLooked at the context.\n\n[[ ## {} ## ]]\nAnswer #{}\n\n[[ ## completed ## ]]", self.output, prompts.len()))
    }
}

fn sample_documents() -> KeywordRetriever {
    [
        "Python is an interpreted programming language known for its simple syntax.",
        "Machine learning is a field of computer science that learns patterns from data.",
        "DSPy is a framework for programming language models. It automates prompt engineering.",
        "RAG (Retrieval-Augmented Generation) combines retrieval and generation.",
        "Vector search finds similar documents in an embedding space.",
    ].into_iter().collect()
}

#[tokio::test]
async fn rag_with_chain_of_thought_prediction() {
    let signature = Signature::parse("context, question -> answer").unwrap();
    let generator = Predict::chain_of_thought(signature, MarkerLm::answering("answer"));
    let rag = RagPipeline::validated(sample_documents(), generator);

    let answer = rag.answer("dspy framework").await.unwrap();
    assert_eq!("DSPy is a framework for programming language models. It automates prompt engineering.", answer.context);
    assert_eq!("Answer #1", answer.answer);

    let prompts = rag.generator().lm().prompts.lock().unwrap();
    assert_eq!(1, prompts.len());
    assert!(prompts[0].system.contains("`reasoning`"));
    assert!(prompts[0].user.contains("[[ ## context ## ]]\nDSPy is a framework"));
    assert!(prompts[0].user.contains("[[ ## question ## ]]\ndspy framework"));
}

#[tokio::test]
async fn rag_rejects_invalid_question_without_calling_the_lm() {
    let generator = Predict::new(Signature::parse("question -> answer").unwrap(), MarkerLm::answering("answer"));
    let rag = RagPipeline::validated(sample_documents(), generator);
    let error = rag.answer(&"a".repeat(1001)).await.unwrap_err();
    assert!(matches!(error, RagError::InvalidInput(_)));
    assert!(rag.generator().lm().prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn conversation_with_prediction() {
    let signature = Signature::parse("history, new_question -> response").unwrap();
    let mut conversation = Conversation::new(Predict::chain_of_thought(signature, MarkerLm::answering("response")));
    for question in ["Tell me about Python", "What are its advantages?", "Can it be used for machine learning?"] {
        let turn = conversation.respond(question).await.unwrap();
        assert_eq!(question, turn.question);
    }
    assert_eq!(3, conversation.len());
    let prompts = conversation.generator().lm().prompts.lock().unwrap();
    assert!(prompts[0].user.contains("[[ ## history ## ]]\n(conversation start)"));
    assert!(prompts[2].user.contains("Q: What are its advantages?\nA: Answer #2"));
}
