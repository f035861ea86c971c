use promptrag::pipeline::Pipeline;
use promptrag::signature::{Predict, Signature};
use promptrag::utils::llm::openai::LlmClient;
use promptrag::utils::printing::MarkdownPrinter;
use promptrag_demos::{init, llm_config, section};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init();
    let Some(config) = llm_config(500)? else {
        return Ok(());
    };
    let lm = LlmClient::new(&config);
    let printer = MarkdownPrinter::default();

    section("1. Question answering with chain of thought");
    let qa = Predict::chain_of_thought(Signature::parse("question -> answer")?, &lm);
    let question = "What is Python?";
    println!("\nQuestion: {}\n", question);
    match qa.forward(&qa.inputs([("question", question)])).await {
        Ok(prediction) => {
            println!("Reasoning:\n{}\n", prediction.reasoning().unwrap_or_default());
            printer.print(&format!("**Answer:**\n\n{}", prediction.get("answer").unwrap_or_default()));
        }
        Err(e) => println!("✗ error: {}", e),
    }

    section("2. Prediction with described fields");
    let signature = Signature::parse("input_text -> output_text")?
        .describe("input_text", "the input text")?
        .describe("output_text", "the output text")?;
    let program = Predict::chain_of_thought(signature, &lm);
    let input_text = "Apples are a red fruit.";
    println!("\nInput: {}\n", input_text);
    match program.forward(&program.inputs([("input_text", input_text)])).await {
        Ok(prediction) => println!("Output: {}", prediction.get("output_text").unwrap_or_default()),
        Err(e) => println!("✗ error: {}", e),
    }

    section("3. Summarizer");
    let summarize = Predict::chain_of_thought(Signature::parse("text -> summary")?, &lm);
    let text = "DSPy is a framework that automates prompt engineering. It makes complex AI systems easy to build.";
    println!("\nText:\n{}\n", text);
    match summarize.forward(&summarize.inputs([("text", text)])).await {
        Ok(prediction) => printer.print(&format!("**Summary:**\n\n{}", prediction.get("summary").unwrap_or_default())),
        Err(e) => println!("✗ error: {}", e),
    }

    section("4. Pipeline");
    let pipeline = Pipeline::new(Predict::new(Signature::parse("question -> key_points")?, &lm))
        .then(Predict::new(Signature::parse("key_points -> answer")?, &lm));
    let question = "What is the capital of Japan? Describe the characteristics of that city.";
    println!("\nQuestion: {}\n", question);
    match pipeline.forward([("question", question)]).await {
        Ok(prediction) => {
            println!("Key points:\n{}\n", prediction.get("key_points").unwrap_or_default());
            printer.print(&format!("**Answer:**\n\n{}", prediction.get("answer").unwrap_or_default()));
        }
        Err(e) => println!("✗ error: {}", e),
    }

    Ok(())
}
