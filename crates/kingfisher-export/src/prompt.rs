//! Interactive input.

use std::io::{self, BufRead, Write};

use crate::error::ExportError;

/// Asks the user a question and returns the answer without its line ending.
pub trait Prompt: Send + Sync {
    fn ask(&self, message: &str) -> Result<String, ExportError>;
}

/// Prompts on stdout and reads one line from stdin.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdinPrompt;

impl Prompt for StdinPrompt {
    fn ask(&self, message: &str) -> Result<String, ExportError> {
        let mut stdout = io::stdout().lock();
        write!(stdout, "{}", message)?;
        stdout.flush()?;

        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}
