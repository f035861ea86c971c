use promptrag::conversation::Conversation;
use promptrag::rag::RagPipeline;
use promptrag::signature::{Predict, Signature};
use promptrag::utils::llm::openai::LlmClient;
use promptrag::utils::printing::MarkdownPrinter;
use promptrag::utils::retrievers::KeywordRetriever;
use promptrag_demos::{init, llm_config, sample_documents, section};

async fn rag_demo(lm: &LlmClient, printer: &MarkdownPrinter) -> anyhow::Result<()> {
    section("RAG pipeline");
    let retriever = KeywordRetriever::new(sample_documents());
    let generator = Predict::chain_of_thought(Signature::parse("context, question -> answer")?, lm);
    let rag = RagPipeline::new(retriever, generator);
    let questions = [
        "Tell me about DSPy",
        "What is machine learning?",
        "Explain how RAG works",
    ];
    for question in questions {
        match rag.answer(question).await {
            Ok(answer) => printer.print_answer(&answer),
            Err(e) => println!("✗ {}: {}", question, e),
        }
    }
    Ok(())
}

async fn validation_demo(lm: &LlmClient) -> anyhow::Result<()> {
    section("Validation");
    let generator = Predict::chain_of_thought(Signature::parse("question -> answer")?, lm);
    let validated = RagPipeline::validated(KeywordRetriever::default(), generator);
    let long_question = "a".repeat(1001);
    let cases = [
        ("valid question", "What are the features of Python?"),
        ("empty question", ""),
        ("1001 characters", long_question.as_str()),
    ];
    for (label, question) in cases {
        match validated.answer(question).await {
            Ok(_) => println!("✓ {}: processed", label),
            Err(e) if e.is_before_generation() => println!("✗ {}: rejected before generation: {}", label, e),
            Err(e) => println!("✗ {}: {}", label, e),
        }
    }
    Ok(())
}

async fn conversation_demo(lm: &LlmClient, printer: &MarkdownPrinter) -> anyhow::Result<()> {
    section("Multi-turn conversation");
    let generator = Predict::chain_of_thought(Signature::parse("history, new_question -> response")?, lm);
    let mut conversation = Conversation::new(generator);
    let questions = [
        "Tell me about Python",
        "What are its advantages?",
        "Can it be used for machine learning?",
    ];
    for (idx, question) in questions.into_iter().enumerate() {
        match conversation.respond(question).await {
            Ok(turn) => printer.print_turn(idx + 1, &turn),
            Err(e) => println!("✗ turn {}: {}", idx + 1, e),
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init();
    let Some(config) = llm_config(1000)? else {
        return Ok(());
    };
    let lm = LlmClient::new(&config);
    let printer = MarkdownPrinter::default();
    rag_demo(&lm, &printer).await?;
    validation_demo(&lm).await?;
    conversation_demo(&lm, &printer).await?;
    Ok(())
}
