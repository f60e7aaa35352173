use std::io::{self, Write};

use crate::command::{Command, SessionDirective, Verb};
use crate::compiler::Compiler;
use crate::console::Feedback;
use crate::dispatch::DispatchOutcome;
use crate::error::{DispatchError, SessionError};
use crate::loader::Loader;

use super::format::{
    format_population_summary, format_property_line, format_type_heading, format_unit_failure,
    format_value_line, format_value_rows,
};
use super::{Flow, Repl};

impl<C: Compiler, L: Loader, W: Write> Repl<C, L, W> {
    pub(super) fn handle_directive(&mut self, mut command: Command) -> io::Result<Flow> {
        let Some(directive) = command.directive().cloned() else {
            return Ok(Flow::Continue);
        };
        match directive {
            SessionDirective::Quit => {
                self.console.show(Feedback::Echo, "\tBye !")?;
                return Ok(Flow::Quit);
            }
            SessionDirective::Map => self.cmd_map()?,
            SessionDirective::Set => match command.pop_arg() {
                Some(name) => self.cmd_select(&name)?,
                None => self
                    .console
                    .show(Feedback::Warning, "Provide a fully-qualified type name ?")?,
            },
            SessionDirective::Refresh => self.refresh(true)?,
            SessionDirective::Help => self.cmd_help()?,
            SessionDirective::Invalid(word) => self.console.show(
                Feedback::Warning,
                &format!("\tInvalid Session command [{}] !", word),
            )?,
        }
        Ok(Flow::Continue)
    }

    fn cmd_map(&mut self) -> io::Result<()> {
        let registry = self.session.registry();
        if registry.is_empty() {
            return self
                .console
                .show(Feedback::Warning, "No types loaded. Use $Refresh to rebuild the session.");
        }
        for descriptor in registry.sorted() {
            self.console
                .show(Feedback::Success, &format_type_heading(descriptor))?;
            for prop in descriptor.handle().properties() {
                self.console.show(Feedback::Dull, &format_property_line(prop))?;
            }
        }
        Ok(())
    }

    fn cmd_select(&mut self, name: &str) -> io::Result<()> {
        match self.session.select(name) {
            Ok(context) => {
                let message = format!("Context switched to [{}]", context.descriptor().full_name());
                self.console.show(Feedback::Success, &message)
            }
            Err(SessionError::Lookup(name)) => self.console.show(
                Feedback::Warning,
                &format!(
                    "Unable to locate the type [{}] in current session ! Please use $Map to verify loaded types.",
                    name
                ),
            ),
            Err(SessionError::Activation(name)) => self.console.show(
                Feedback::Error,
                &format!(
                    "Unable to create an instance of type [{}]! Please inspect the logs.",
                    name
                ),
            ),
            Err(other) => self.console.show(Feedback::Error, &other.to_string()),
        }
    }

    fn cmd_help(&mut self) -> io::Result<()> {
        let lines = [
            "Session commands:",
            "  $Set <FullName>        Create an instance of a loaded type and make it current",
            "  $Map                   List loaded types and their properties",
            "  $Refresh               Rebuild and reload every source unit",
            "  $Help                  This help",
            "  $Quit                  Exit",
            "Instance commands:",
            "  Get <Property>         Show a declared property",
            "  Get *                  Show every property, inherited ones included",
            "  Set <Property> = <v>   Assign a declared property (quote strings with spaces)",
        ];
        for line in lines {
            self.console.show(Feedback::Dull, line)?;
        }
        Ok(())
    }

    /// Re-populate the session, reporting per-unit failures.
    pub fn refresh(&mut self, purge: bool) -> io::Result<()> {
        self.console.set_prompt(crate::console::PromptState::Initializing);
        let outcome = self.session.populate(purge);
        self.update_prompt();
        match outcome {
            Ok(report) => {
                let registered = self.session.registry().len();
                self.console
                    .show(Feedback::Echo, &format_population_summary(&report, registered))?;
                for failure in &report.failures {
                    self.console.show(Feedback::Warning, &format_unit_failure(failure))?;
                }
                Ok(())
            }
            Err(e) => self.console.show(Feedback::Error, &e.to_string()),
        }
    }

    pub(super) fn handle_property_command(&mut self, command: Command) -> io::Result<()> {
        if self.session.active_instance().is_none() {
            return self
                .console
                .show(Feedback::Error, "ERROR: no current object in context.");
        }

        let setting = command.verb() == Verb::Set;
        match self.dispatcher.dispatch(&mut self.session, command) {
            Ok(DispatchOutcome::Value { name, value }) => {
                self.console.show(Feedback::Echo, &format_value_line(&name, &value))
            }
            Ok(DispatchOutcome::Table(values)) => self.console.table(&format_value_rows(&values)),
            Ok(DispatchOutcome::Assigned) => self.console.show(Feedback::Confirmation, "√ Ok"),
            Err(DispatchError::Coercion { property, source }) => self.console.show(
                Feedback::Error,
                &format!("Error setting [{}]: {}.", property, source),
            ),
            Err(DispatchError::PropertyNotFound(name)) => {
                let message = if setting {
                    format!("Error setting [{}]: property not found.", name)
                } else {
                    format!("Property [{}] not found.", name)
                };
                self.console.show(Feedback::Error, &message)
            }
            Err(e @ DispatchError::Unsupported(_)) => self.console.show(Feedback::Warning, &e.to_string()),
            Err(e) => self.console.show(Feedback::Error, &e.to_string()),
        }
    }
}
