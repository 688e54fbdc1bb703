use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error;
use std::fmt;

pub type Result<T, E = RelError> = std::result::Result<T, E>;

/// Create an error for functionality that hasn't been implemented yet.
#[macro_export]
macro_rules! not_implemented {
    ($($arg:tt)+) => {{
        let msg = format!($($arg)+);
        return Err($crate::RelError::new(format!("Not yet implemented: {msg}")));
    }};
}

/// Broad category of an error.
///
/// Callers match on the kind, the message is only for humans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A referenced column does not exist in the input relation.
    UnknownColumn,
    /// A value or expression type is incompatible with the target type.
    TypeMismatch,
    /// Columns of a relation ended up with differing lengths.
    RowCountMismatch,
    /// Join or group keys reference columns missing from one side.
    InvalidKey,
    /// Bad argument to an operation (duplicate names, out of range settings).
    InvalidArgument,
    /// Input text could not be decoded.
    Parse,
    /// Underlying IO failure.
    Io,
    Other,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownColumn => write!(f, "Unknown column"),
            Self::TypeMismatch => write!(f, "Type mismatch"),
            Self::RowCountMismatch => write!(f, "Row count mismatch"),
            Self::InvalidKey => write!(f, "Invalid key"),
            Self::InvalidArgument => write!(f, "Invalid argument"),
            Self::Parse => write!(f, "Parse error"),
            Self::Io => write!(f, "IO error"),
            Self::Other => write!(f, "Error"),
        }
    }
}

#[derive(Debug)]
pub struct RelError {
    inner: Box<RelErrorInner>,
}

#[derive(Debug)]
struct RelErrorInner {
    kind: ErrorKind,
    msg: String,
    fields: Vec<(String, String)>,
    source: Option<Box<dyn Error + Send + Sync>>,
    backtrace: Backtrace,
}

impl RelError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Other, msg)
    }

    pub fn with_kind(kind: ErrorKind, msg: impl Into<String>) -> Self {
        RelError {
            inner: Box::new(RelErrorInner {
                kind,
                msg: msg.into(),
                fields: Vec::new(),
                source: None,
                backtrace: Backtrace::capture(),
            }),
        }
    }

    pub fn with_source(msg: impl Into<String>, source: Box<dyn Error + Send + Sync>) -> Self {
        let mut err = Self::new(msg);
        err.inner.source = Some(source);
        err
    }

    pub fn unknown_column(name: impl fmt::Display) -> Self {
        Self::with_kind(ErrorKind::UnknownColumn, format!("Missing column '{name}'"))
    }

    pub fn type_mismatch(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::TypeMismatch, msg)
    }

    pub fn invalid_key(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::InvalidKey, msg)
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::InvalidArgument, msg)
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Parse, msg)
    }

    pub fn row_count_mismatch(expected: usize, got: usize) -> Self {
        Self::with_kind(
            ErrorKind::RowCountMismatch,
            "Columns in relation have differing lengths",
        )
        .with_field("expected", expected)
        .with_field("got", got)
    }

    /// Attach a key/value pair to the error for display.
    pub fn with_field(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.inner.fields.push((key.into(), value.to_string()));
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.inner.kind
    }

    pub fn get_msg(&self) -> &str {
        &self.inner.msg
    }

    pub fn get_field(&self, key: &str) -> Option<&str> {
        self.inner
            .fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_backtrace(&self) -> &Backtrace {
        &self.inner.backtrace
    }
}

impl fmt::Display for RelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.inner.kind, self.inner.msg)?;
        for (key, value) in &self.inner.fields {
            write!(f, "\n  {key}: {value}")?;
        }
        if let Some(source) = &self.inner.source {
            write!(f, "\nError source: {source}")?;
        }
        if self.inner.backtrace.status() == BacktraceStatus::Captured {
            write!(f, "\nBacktrace: {}", self.inner.backtrace)?;
        }
        Ok(())
    }
}

impl Error for RelError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.inner.source.as_ref().map(|e| e.as_ref() as _)
    }
}

impl From<fmt::Error> for RelError {
    fn from(value: fmt::Error) -> Self {
        RelError::with_source("Format error", Box::new(value))
    }
}

impl From<std::io::Error> for RelError {
    fn from(value: std::io::Error) -> Self {
        let mut err = RelError::with_source("IO error", Box::new(value));
        err.inner.kind = ErrorKind::Io;
        err
    }
}

/// Wrap a foreign error with some context.
pub trait ResultExt<T, E> {
    fn context(self, msg: &'static str) -> Result<T, RelError>;
    fn context_fn<F: Fn() -> String>(self, f: F) -> Result<T, RelError>;
}

impl<T, E: Error + Send + Sync + 'static> ResultExt<T, E> for std::result::Result<T, E> {
    fn context(self, msg: &'static str) -> Result<T, RelError> {
        self.map_err(|e| RelError::with_source(msg, Box::new(e)))
    }

    fn context_fn<F: Fn() -> String>(self, f: F) -> Result<T, RelError> {
        self.map_err(|e| RelError::with_source(f(), Box::new(e)))
    }
}

pub trait OptionExt<T> {
    /// Return an error if the option is None.
    fn required(self, msg: &'static str) -> Result<T, RelError>;
}

impl<T> OptionExt<T> for Option<T> {
    fn required(self, msg: &'static str) -> Result<T, RelError> {
        match self {
            Some(v) => Ok(v),
            None => Err(RelError::new(format!("Missing required value: {msg}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_constructors() {
        assert_eq!(
            ErrorKind::UnknownColumn,
            RelError::unknown_column("dep_delay").kind()
        );
        assert_eq!(
            ErrorKind::RowCountMismatch,
            RelError::row_count_mismatch(3, 4).kind()
        );
        assert_eq!(ErrorKind::Other, RelError::new("oops").kind());
    }

    #[test]
    fn fields_are_displayed() {
        let err = RelError::invalid_key("Join key missing from right side")
            .with_field("key", "carrier");

        assert_eq!(Some("carrier"), err.get_field("key"));
        let s = err.to_string();
        assert!(s.starts_with("Invalid key: Join key missing from right side"));
        assert!(s.contains("key: carrier"));
    }

    #[test]
    fn context_keeps_source() {
        let res: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::other("disk on fire"));
        let err = res.context("failed to read").unwrap_err();
        assert_eq!("failed to read", err.get_msg());
        assert!(err.source().is_some());
    }

    #[test]
    fn required_none() {
        let v: Option<u8> = None;
        let err = v.required("value").unwrap_err();
        assert!(err.get_msg().contains("value"));
    }

    #[test]
    fn not_implemented_returns() {
        fn f() -> Result<()> {
            not_implemented!("thing {}", 1)
        }
        let err = f().unwrap_err();
        assert_eq!("Not yet implemented: thing 1", err.get_msg());
    }
}
