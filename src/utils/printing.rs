//! Terminal rendering of answers, prompts and conversation turns as markdown.

use termimad::MadSkin;

use crate::conversation::Turn;
use crate::rag::Answer;
use crate::utils::llm::ChatPrompt;

/// Quote every line of a text as a markdown block quote.
fn quote(text: &str) -> String {
    if text.is_empty() {
        return "> *(empty)*".to_string();
    }
    text.lines()
        .map(|line| format!("> {}", line))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn answer_markdown(answer: &Answer) -> String {
    format!("**Question:** {}\n\n**Retrieved context:**\n\n{}\n\n**Answer:**\n\n{}\n",
            answer.question, quote(&answer.context), answer.answer)
}

pub fn turn_markdown(turn_number: usize, turn: &Turn) -> String {
    format!("### Turn {}\n\n**Question:** {}\n\n**Response:** {}\n", turn_number, turn.question, turn.answer)
}

pub fn prompt_markdown(prompt: &ChatPrompt) -> String {
    format!("**system**\n\n```\n{}\n```\n\n**user**\n\n```\n{}\n```\n", prompt.system, prompt.user)
}

/// Prints markdown through a termimad skin.
#[derive(Default)]
pub struct MarkdownPrinter {
    pub skin: MadSkin,
}

impl MarkdownPrinter {
    pub fn print(&self, markdown: &str) {
        self.skin.print_text(markdown);
    }

    pub fn print_answer(&self, answer: &Answer) {
        self.print(&answer_markdown(answer));
    }

    pub fn print_turn(&self, turn_number: usize, turn: &Turn) {
        self.print(&turn_markdown(turn_number, turn));
    }

    pub fn print_prompt(&self, prompt: &ChatPrompt) {
        self.print(&prompt_markdown(prompt));
    }
}
