//! Reflective property access on the session's active instance.

use tracing::debug;

use crate::coerce::coerce;
use crate::command::{Command, Verb};
use crate::compiler::Compiler;
use crate::error::DispatchError;
use crate::loader::Loader;
use crate::reflect::{Instance, PropertyInfo, Value};
use crate::session::Session;

/// Typed property access by name.
pub trait PropertyAccessor {
    /// Value of a declared property.
    fn get(&self, name: &str) -> Result<Value, DispatchError>;

    /// Every property, inherited ones included, in table order.
    fn get_all(&self) -> Result<Vec<(String, Value)>, DispatchError>;

    /// Coerce `raw` to a declared property's type and store it.
    fn set(&mut self, name: &str, raw: &str) -> Result<(), DispatchError>;

    /// Method invocation is not supported.
    fn invoke(&mut self, method: &str, args: &[String]) -> Result<Value, DispatchError>;
}

fn declared<'a>(instance: &'a Instance, name: &str) -> Result<&'a PropertyInfo, DispatchError> {
    instance
        .type_handle()
        .declared_property(name)
        .ok_or_else(|| DispatchError::PropertyNotFound(name.to_string()))
}

fn read(instance: &Instance, prop: &PropertyInfo) -> Result<Value, DispatchError> {
    instance.read(prop).map_err(|failure| DispatchError::Guest {
        property: prop.name.clone(),
        reason: failure.0,
    })
}

impl PropertyAccessor for Instance {
    fn get(&self, name: &str) -> Result<Value, DispatchError> {
        let prop = declared(self, name)?;
        read(self, prop)
    }

    fn get_all(&self) -> Result<Vec<(String, Value)>, DispatchError> {
        self.type_handle()
            .properties()
            .iter()
            .map(|prop| Ok((prop.name.clone(), read(self, prop)?)))
            .collect()
    }

    fn set(&mut self, name: &str, raw: &str) -> Result<(), DispatchError> {
        let prop = declared(self, name)?.clone();
        let value = coerce(raw, &prop.ty).map_err(|source| DispatchError::Coercion {
            property: prop.name.clone(),
            source,
        })?;
        debug!(property = %prop.name, %value, "assigning property");
        self.write(&prop, &value).map_err(|failure| DispatchError::Guest {
            property: prop.name.clone(),
            reason: failure.0,
        })
    }

    fn invoke(&mut self, _method: &str, _args: &[String]) -> Result<Value, DispatchError> {
        Err(DispatchError::Unsupported(
            "This operation is not currently supported.".to_string(),
        ))
    }
}

/// What a dispatched command produced.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// `Get <name>`: one named value.
    Value { name: String, value: Value },
    /// `Get *`: every property.
    Table(Vec<(String, Value)>),
    /// `Set` succeeded.
    Assigned,
}

/// Routes property verbs to the active instance.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimpleDispatcher;

impl SimpleDispatcher {
    pub fn dispatch<C: Compiler, L: Loader>(
        &self,
        session: &mut Session<C, L>,
        mut command: Command,
    ) -> Result<DispatchOutcome, DispatchError> {
        let instance = session
            .active_instance_mut()
            .ok_or(DispatchError::NoContext)?;
        self.apply(instance, &mut command)
    }

    /// Run `command` against any accessor.
    pub fn apply(
        &self,
        target: &mut impl PropertyAccessor,
        command: &mut Command,
    ) -> Result<DispatchOutcome, DispatchError> {
        match command.verb() {
            Verb::Get => {
                let name = command
                    .pop_arg()
                    .ok_or(DispatchError::MissingArgument("property name"))?;
                if name == "*" {
                    Ok(DispatchOutcome::Table(target.get_all()?))
                } else {
                    let value = target.get(&name)?;
                    Ok(DispatchOutcome::Value { name, value })
                }
            }
            Verb::Set => {
                let name = command
                    .pop_arg()
                    .ok_or(DispatchError::MissingArgument("property name"))?;
                let raw = command
                    .pop_arg()
                    .ok_or(DispatchError::MissingArgument("value"))?;
                target.set(&name, &raw)?;
                Ok(DispatchOutcome::Assigned)
            }
            Verb::Invoke => {
                let args = command.drain_args();
                let method = args.first().cloned().unwrap_or_default();
                target
                    .invoke(&method, args.get(1..).unwrap_or_default())
                    .map(|value| DispatchOutcome::Value {
                        name: method,
                        value,
                    })
            }
            other => Err(DispatchError::Unsupported(format!(
                "Command [{}] not supported by SimpleDispatcher.",
                other
            ))),
        }
    }
}
