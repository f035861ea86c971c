//! Shows how prompts are assembled, without calling any LLM.

use async_trait::async_trait;
use promptrag::signature::{Example, Predict, Signature};
use promptrag::utils::llm::{ChatPrompt, Complete};
use promptrag::utils::printing::MarkdownPrinter;
use promptrag::utils::retrievers::KeywordRetriever;
use promptrag::utils::token::CountToken;
use promptrag::utils::token::tiktoken::Tiktoken;
use promptrag_demos::{init, sample_documents, section};

/// Refuses every completion; inspection never reaches it.
struct Offline;

#[async_trait]
impl Complete for Offline {
    async fn complete(&self, _prompt: &ChatPrompt) -> anyhow::Result<String> {
        anyhow::bail!("offline")
    }
}

const FLOW: &str = r#"
  question ──► retriever ──► context ──► signature ──► chat prompt ──► LLM ──► reply ──► fields
                 (top-k)     (joined)    (template)    system + user          (markers)
"#;

fn main() -> anyhow::Result<()> {
    init();
    let printer = MarkdownPrinter::default();
    let counter = Tiktoken::new("gpt-3.5-turbo")?;

    section("1. Flow");
    println!("{}", FLOW);

    section("2. Retrieval scores");
    let retriever = KeywordRetriever::new(sample_documents());
    let question = "What is DSPy and how does it automate prompt engineering?";
    println!("\nQuestion: {}\n", question);
    for scored in retriever.score(question) {
        println!("  score {} | doc #{} | {}", scored.score, scored.index, scored.document);
    }

    section("3. Chain-of-thought RAG prompt");
    let rag_predict = Predict::chain_of_thought(Signature::parse("context, question -> answer")?, Offline);
    let context = retriever.score(question)
        .into_iter()
        .take(3)
        .map(|scored| scored.document)
        .collect::<Vec<_>>()
        .join("\n");
    if let Some(tag) = rag_predict.user_template().meta_data.get("signature") {
        println!("\nuser template of {}", tag);
    }
    let inspection = rag_predict.inspect(&rag_predict.inputs([("context", context.as_str()), ("question", question)]), &counter)?;
    printer.print_prompt(&inspection.prompt);
    println!("prompt tokens: {} (context window: {:?})", inspection.token_count, counter.max_tokens());

    section("4. Few-shot prompt");
    let demos = vec![
        Example::new().with("question", "What is 2+2?").with("answer", "4"),
        Example::new().with("question", "What is 3x5?").with("answer", "15"),
    ];
    let few_shot = Predict::new(Signature::parse("question -> answer")?, Offline).with_demos(demos);
    let inspection = few_shot.inspect(&few_shot.inputs([("question", "What is 6x7?")]), &counter)?;
    printer.print_prompt(&inspection.prompt);
    println!("prompt tokens: {}, user message alone: {}", inspection.token_count, counter.count_token(&inspection.prompt.user));
    Ok(())
}
