use std::path::PathBuf;

use thiserror::Error;

/// A source unit could not be turned into a loadable artifact.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to launch compiler '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{} error(s) building {}", diagnostics.len(), unit.display())]
    Diagnostics {
        unit: PathBuf,
        diagnostics: Vec<String>,
    },
    #[error("compiler reported success but produced no artifact at {}", artifact.display())]
    MissingArtifact { artifact: PathBuf },
    #[error("I/O error around build of {}: {source}", unit.display())]
    Io {
        unit: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BuildError {
    /// Lines written to the error report, one per diagnostic.
    pub fn report_lines(&self) -> Vec<String> {
        match self {
            BuildError::Diagnostics { diagnostics, .. } => diagnostics.clone(),
            other => vec![other.to_string()],
        }
    }
}

/// A compiled artifact could not be loaded or enumerated.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to load library {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },
    #[error("library {} has no type manifest: {source}", path.display())]
    MissingManifest {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },
    #[error("type ABI version mismatch in {}: library has {found}, host expects {expected}", path.display())]
    AbiMismatch {
        path: PathBuf,
        found: u32,
        expected: u32,
    },
    #[error("invalid type manifest in {}: {message}", path.display())]
    Manifest { path: PathBuf, message: String },
    #[error("cannot stage library {}: {source}", path.display())]
    Staging {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("loader worker panicked while reading {}", path.display())]
    Panicked { path: PathBuf },
}

/// Failures reported by session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Unable to locate the type [{0}] in current session")]
    Lookup(String),
    #[error("Unable to create an instance of type [{0}]")]
    Activation(String),
    #[error("unable to read source folder {}: {source}", folder.display())]
    SourceFolder {
        folder: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A string could not be converted to a property's type.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoercionError {
    #[error("'{value}' is not a valid {target}")]
    Invalid { value: String, target: String },
    #[error("'{value}' is out of range for {target}")]
    OutOfRange { value: String, target: String },
    #[error("{target} values cannot be assigned from text")]
    NotAssignable { target: String },
}

/// Failures of property access on the active instance.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no current object in context")]
    NoContext,
    #[error("property not found: {0}")]
    PropertyNotFound(String),
    #[error("{source}")]
    Coercion {
        property: String,
        #[source]
        source: CoercionError,
    },
    #[error("{0}")]
    Unsupported(String),
    #[error("missing argument: {0}")]
    MissingArgument(&'static str),
    #[error("type code failed on property {property}: {reason}")]
    Guest { property: String, reason: String },
}

/// Operator text that does not form a valid command.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Empty command.")]
    Empty,
    #[error("Unknown command [{0}].")]
    UnknownVerb(String),
    #[error("Provide property-name or '*' ?")]
    MissingProperty,
    #[error("Assignment ?")]
    MissingAssignment,
    #[error("No left-hand operand.")]
    MissingLeftOperand,
    #[error("No right-hand operand.")]
    MissingRightOperand,
    #[error("Unterminated quoted string.")]
    UnterminatedQuote,
}

/// The configuration file could not be read.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
