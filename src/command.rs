//! Operator command parsing.
//!
//! `Get <name|*>`, `Set <name> = <value>`, `Invoke <method> [args]`, and
//! `$Directive [args]` for session commands. The first word is
//! case-insensitive.

use std::fmt;

use crate::error::CommandError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Unknown,
    Get,
    Set,
    Invoke,
    Callback,
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Verb::Unknown => "Unknown",
            Verb::Get => "Get",
            Verb::Set => "Set",
            Verb::Invoke => "Invoke",
            Verb::Callback => "Callback",
        };
        f.write_str(name)
    }
}

/// A `$` command addressed to the session rather than the instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionDirective {
    Quit,
    Map,
    Set,
    Refresh,
    Help,
    /// Anything else; holds the upper-cased word.
    Invalid(String),
}

impl SessionDirective {
    fn from_word(word: &str) -> Self {
        match word.to_uppercase().as_str() {
            "QUIT" => SessionDirective::Quit,
            "MAP" => SessionDirective::Map,
            "SET" => SessionDirective::Set,
            "REFRESH" => SessionDirective::Refresh,
            "HELP" => SessionDirective::Help,
            other => SessionDirective::Invalid(other.to_string()),
        }
    }
}

/// A validated operator command with its argument stack.
///
/// Arguments are consumed last-in-first-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    verb: Verb,
    directive: Option<SessionDirective>,
    args: Vec<String>,
}

impl Command {
    pub fn new(verb: Verb) -> Self {
        Self {
            verb,
            directive: None,
            args: Vec::new(),
        }
    }

    pub fn session(directive: SessionDirective) -> Self {
        Self {
            verb: Verb::Unknown,
            directive: Some(directive),
            args: Vec::new(),
        }
    }

    pub fn verb(&self) -> Verb {
        self.verb
    }

    pub fn is_session(&self) -> bool {
        self.directive.is_some()
    }

    pub fn directive(&self) -> Option<&SessionDirective> {
        self.directive.as_ref()
    }

    pub fn push_arg(&mut self, arg: impl Into<String>) {
        self.args.push(arg.into());
    }

    pub fn pop_arg(&mut self) -> Option<String> {
        self.args.pop()
    }

    /// Remaining arguments in push order.
    pub fn drain_args(&mut self) -> Vec<String> {
        std::mem::take(&mut self.args)
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

/// A word of operator input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    /// Came (at least partly) from a `"..."` section.
    pub quoted: bool,
}

impl Token {
    fn is_assignment(&self) -> bool {
        !self.quoted && self.text == "="
    }
}

/// Split on whitespace. `"..."` keeps its content whole (a doubled `""`
/// inside stands for one quote); an unquoted `=` is always its own token.
pub fn tokenize(line: &str) -> Result<Vec<Token>, CommandError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut in_word = false;
    let mut chars = line.chars().peekable();

    fn flush(tokens: &mut Vec<Token>, current: &mut String, quoted: &mut bool, in_word: &mut bool) {
        if *in_word {
            tokens.push(Token {
                text: std::mem::take(current),
                quoted: *quoted,
            });
        }
        *quoted = false;
        *in_word = false;
    }

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                in_word = true;
                quoted = true;
                loop {
                    match chars.next() {
                        Some('"') if chars.peek() == Some(&'"') => {
                            chars.next();
                            current.push('"');
                        }
                        Some('"') => break,
                        Some(other) => current.push(other),
                        None => return Err(CommandError::UnterminatedQuote),
                    }
                }
            }
            '=' => {
                flush(&mut tokens, &mut current, &mut quoted, &mut in_word);
                tokens.push(Token {
                    text: "=".to_string(),
                    quoted: false,
                });
            }
            c if c.is_whitespace() => flush(&mut tokens, &mut current, &mut quoted, &mut in_word),
            c => {
                in_word = true;
                current.push(c);
            }
        }
    }
    flush(&mut tokens, &mut current, &mut quoted, &mut in_word);
    Ok(tokens)
}

/// Parse one line of operator input.
pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let tokens = tokenize(line)?;
    let Some((head, rest)) = tokens.split_first() else {
        return Err(CommandError::Empty);
    };

    if !head.quoted && let Some(word) = head.text.strip_prefix('$') {
        let mut command = Command::session(SessionDirective::from_word(word));
        for token in rest {
            command.push_arg(token.text.clone());
        }
        return Ok(command);
    }

    let verb = match head.text.to_lowercase().as_str() {
        "get" => Verb::Get,
        "set" => Verb::Set,
        "invoke" => Verb::Invoke,
        "callback" => Verb::Callback,
        _ => return Err(CommandError::UnknownVerb(head.text.clone())),
    };

    let mut command = Command::new(verb);
    match verb {
        Verb::Get => {
            let name = rest.first().ok_or(CommandError::MissingProperty)?;
            command.push_arg(name.text.clone());
        }
        Verb::Set => {
            let eq = rest
                .iter()
                .position(Token::is_assignment)
                .ok_or(CommandError::MissingAssignment)?;
            let (left, right) = (&rest[..eq], &rest[eq + 1..]);
            if right.is_empty() {
                return Err(CommandError::MissingRightOperand);
            }
            let name = left.first().ok_or(CommandError::MissingLeftOperand)?;
            let value = right
                .iter()
                .map(|t| t.text.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            command.push_arg(value);
            command.push_arg(name.text.clone());
        }
        _ => {
            for token in rest {
                command.push_arg(token.text.clone());
            }
        }
    }
    Ok(command)
}
