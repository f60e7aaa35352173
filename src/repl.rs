pub mod format;
mod handlers;

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::debug;

use crate::command::parse_command;
use crate::compiler::Compiler;
use crate::console::{Console, Feedback, PromptState};
use crate::dispatch::SimpleDispatcher;
use crate::loader::Loader;
use crate::session::Session;

/// Whether the loop keeps reading after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// The interactive command loop over one session.
pub struct Repl<C, L, W> {
    session: Session<C, L>,
    console: Console<W>,
    dispatcher: SimpleDispatcher,
    title: String,
}

impl<C: Compiler, L: Loader, W: Write> Repl<C, L, W> {
    pub fn new(session: Session<C, L>, console: Console<W>, title: impl Into<String>) -> Self {
        Self {
            session,
            console,
            dispatcher: SimpleDispatcher,
            title: title.into(),
        }
    }

    pub fn session(&self) -> &Session<C, L> {
        &self.session
    }

    pub fn into_console(self) -> Console<W> {
        self.console
    }

    fn update_prompt(&mut self) {
        let state = PromptState::from_active(self.session.active_type_name());
        self.console.set_prompt(state);
    }

    pub fn prompt(&self) -> String {
        self.console.prompt()
    }

    /// Show the banner and run the initial population pass.
    pub fn start(&mut self) -> io::Result<()> {
        let title = self.title.clone();
        self.console.show(Feedback::Echo, &title)?;
        self.console.show(Feedback::Dull, "Type $Help for commands.")?;
        self.refresh(false)
    }

    /// Execute one line of operator input.
    pub fn handle_line(&mut self, line: &str) -> io::Result<Flow> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Flow::Continue);
        }

        let command = match parse_command(line) {
            Ok(command) => command,
            Err(e) => {
                self.console.show(Feedback::Warning, &e.to_string())?;
                return Ok(Flow::Continue);
            }
        };
        debug!(?command, "parsed command");

        let flow = if command.is_session() {
            self.handle_directive(command)?
        } else {
            self.handle_property_command(command)?;
            Flow::Continue
        };
        self.update_prompt();
        Ok(flow)
    }

    /// Read lines until `$Quit` or end of input.
    pub fn run(&mut self) -> Result<(), ReadlineError> {
        let mut rl = DefaultEditor::new()?;
        let history_path = PathBuf::from(".autonet_history");
        let _ = rl.load_history(&history_path);

        let is_tty = io::stdin().is_terminal();

        loop {
            let prompt = format!("{} ", self.prompt());
            // In non-TTY mode (piped input), rustyline suppresses prompts.
            // Print prompts ourselves and echo input for full transcript output.
            let line = if is_tty {
                rl.readline(&prompt)
            } else {
                write!(self.console.writer(), "{}", prompt)?;
                self.console.flush()?;
                let result = rl.readline("");
                if let Ok(ref line) = result {
                    writeln!(self.console.writer(), "{}", line)?;
                }
                result
            };
            let line = match line {
                Ok(line) => line,
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => break,
                Err(e) => return Err(e),
            };

            if !line.trim().is_empty() {
                let _ = rl.add_history_entry(line.trim());
            }
            if self.handle_line(&line)? == Flow::Quit {
                break;
            }
            self.console.flush()?;
        }

        let _ = rl.append_history(&history_path);
        Ok(())
    }
}
