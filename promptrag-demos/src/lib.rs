//! Shared setup for the demo programs.

use log::info;
use promptrag::utils::llm::LlmConfig;
use promptrag::RagError;

/// Load `.env` if present and install the logger. `RUST_LOG` controls verbosity.
pub fn init() {
    let dotenv = dotenvy::dotenv();
    env_logger::init();
    if let Ok(path) = dotenv {
        info!("loaded environment from {}", path.display());
    }
}

/// Resolve the LLM configuration, printing how to set credentials when there are none.
pub fn llm_config(max_tokens: u16) -> anyhow::Result<Option<LlmConfig>> {
    match LlmConfig::from_env() {
        Ok(config) => {
            println!("✓ {} is configured (model: {})\n", config.provider.name(), config.provider.model());
            Ok(Some(config.with_max_tokens(max_tokens)))
        }
        Err(RagError::MissingCredentials) => {
            println!("✗ no API key is set\n");
            println!("Set one of the following:");
            println!("  1. Azure OpenAI:");
            println!("     - AZURE_OPENAI_API_KEY");
            println!("     - AZURE_OPENAI_ENDPOINT");
            println!("     - AZURE_OPENAI_API_VERSION (optional, default 2024-02-15-preview)");
            println!("     - AZURE_OPENAI_DEPLOYMENT_NAME (optional, default gpt-35-turbo)");
            println!("  2. OpenAI:");
            println!("     - OPENAI_API_KEY\n");
            println!("Variables can also be put in a .env file.");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

pub fn section(title: &str) {
    println!("\n{}", "=".repeat(60));
    println!("{}", title);
    println!("{}", "=".repeat(60));
}

pub fn sample_documents() -> Vec<String> {
    [
        "Python is an interpreted programming language. It is known for its simple syntax.",
        "Machine learning is a field of computer science that learns patterns from data.",
        "DSPy is a framework for programming language models. It automates prompt engineering.",
        "RAG (Retrieval-Augmented Generation) is a technique that combines retrieval and generation.",
        "Vector search finds similar documents in an embedding vector space.",
    ].into_iter().map(String::from).collect()
}
