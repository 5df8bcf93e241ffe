use anyhow::{Context, Result};
use async_trait::async_trait;

use cwn_scheduler::Operator;

/// Stdin-backed [`Operator`]. Reads happen on the blocking pool so a
/// pending prompt is an await point like any network call.
pub struct TerminalOperator;

impl TerminalOperator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Operator for TerminalOperator {
    async fn prompt(&self, question: &str) -> Result<String> {
        let question = question.to_string();
        tokio::task::spawn_blocking(move || {
            println!("{question}");
            let mut line = String::new();
            std::io::stdin()
                .read_line(&mut line)
                .context("failed to read from stdin")?;
            Ok(line.trim().to_string())
        })
        .await
        .context("stdin reader task failed")?
    }

    async fn confirm(&self, question: &str) -> Result<bool> {
        loop {
            let answer = self
                .prompt(&format!("{question}\nConfirm by typing 'Yes' or 'No'"))
                .await?;
            match parse_yes_no(&answer) {
                Some(decision) => return Ok(decision),
                None => println!("Illegal input. Valid inputs are 'Yes' or 'No'"),
            }
        }
    }
}

fn parse_yes_no(input: &str) -> Option<bool> {
    match input.trim().to_lowercase().as_str() {
        "yes" | "y" => Some(true),
        "no" | "n" => Some(false),
        _ => None,
    }
}
