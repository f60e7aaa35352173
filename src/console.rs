//! Terminal presentation: styled feedback lines, tables and the prompt.

use std::io::{self, Write};

use colored::Colorize;

/// How a feedback line is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feedback {
    Echo,
    Confirmation,
    Success,
    Warning,
    Error,
    Dull,
}

/// Prompt state shown before each command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptState {
    Initializing,
    NoContext,
    Context(String),
}

impl PromptState {
    pub fn from_active(name: Option<&str>) -> Self {
        match name {
            Some(name) => PromptState::Context(name.to_string()),
            None => PromptState::NoContext,
        }
    }

    pub fn render(&self) -> String {
        match self {
            PromptState::Initializing => "[Initializing...] >".to_string(),
            PromptState::NoContext => "[No context] >".to_string(),
            PromptState::Context(name) => format!("[{}] >", name),
        }
    }
}

/// Writes operator-facing output.
pub struct Console<W> {
    out: W,
    styled: bool,
    prompt: PromptState,
}

impl Console<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout(), true)
    }
}

impl<W: Write> Console<W> {
    /// `styled: false` writes plain text regardless of terminal support.
    pub fn new(out: W, styled: bool) -> Self {
        Self {
            out,
            styled,
            prompt: PromptState::Initializing,
        }
    }

    pub fn show(&mut self, style: Feedback, message: &str) -> io::Result<()> {
        if !self.styled {
            return writeln!(self.out, "{}", message);
        }
        let painted = match style {
            Feedback::Echo => message.green(),
            Feedback::Confirmation => message.blue(),
            Feedback::Success => message.green().bold(),
            Feedback::Warning => message.yellow(),
            Feedback::Error => message.red(),
            Feedback::Dull => message.dimmed(),
        };
        writeln!(self.out, "{}", painted)
    }

    /// Two-column rows rendered as `\tname = value`.
    pub fn table<A: AsRef<str>, B: AsRef<str>>(&mut self, rows: &[(A, B)]) -> io::Result<()> {
        for (name, value) in rows {
            writeln!(self.out, "\t{} = {}", name.as_ref(), value.as_ref())?;
        }
        Ok(())
    }

    pub fn set_prompt(&mut self, state: PromptState) {
        self.prompt = state;
    }

    pub fn prompt(&self) -> String {
        self.prompt.render()
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    pub fn writer(&mut self) -> &mut W {
        &mut self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
