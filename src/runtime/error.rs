//! Runtime error taxonomy
//!
//! Every fallible dispatch or bridge operation returns `RtResult<T>`; nothing
//! in the runtime core panics on bad script input. The embedding API surfaces
//! these errors as-is, and the plugin boundary converts them (and panics) to
//! plain error results before they can cross a library edge.

use thiserror::Error;

/// Runtime result
pub type RtResult<T> = Result<T, RuntimeError>;

/// Runtime errors
///
/// Each variant is a distinguishable error kind, not just a string; the
/// display form is `<Kind>: <message>`, which is also what script-level
/// exception values report through their `type` and `message` members.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// Operation unsupported for the operand type(s)
    #[error("TypeError: {0}")]
    Type(String),

    /// Malformed argument (empty name, unknown kind string, ...)
    #[error("ValueError: {0}")]
    Value(String),

    /// Division or modulo by zero, integer or float
    #[error("ZeroDivisionError: {0}")]
    ZeroDivision(String),

    /// Arithmetic result exceeds every representable integer kind
    #[error("OverflowError: {0}")]
    Overflow(String),

    /// Out-of-range sequence index
    #[error("IndexError: {0}")]
    Index(String),

    /// Missing dictionary key
    #[error("KeyError: {0}")]
    Key(String),

    /// Missing member or method on an object
    #[error("AttributeError: {0}")]
    Attribute(String),

    /// File or plugin-loading failure
    #[error("IOError: {0}")]
    Io(String),
}

impl RuntimeError {
    /// The error kind name, as exposed to scripts via `exception.type`.
    pub fn kind_name(&self) -> &'static str {
        match self {
            RuntimeError::Type(_) => "TypeError",
            RuntimeError::Value(_) => "ValueError",
            RuntimeError::ZeroDivision(_) => "ZeroDivisionError",
            RuntimeError::Overflow(_) => "OverflowError",
            RuntimeError::Index(_) => "IndexError",
            RuntimeError::Key(_) => "KeyError",
            RuntimeError::Attribute(_) => "AttributeError",
            RuntimeError::Io(_) => "IOError",
        }
    }

    /// The bare message, without the kind prefix.
    pub fn message(&self) -> &str {
        match self {
            RuntimeError::Type(m)
            | RuntimeError::Value(m)
            | RuntimeError::ZeroDivision(m)
            | RuntimeError::Overflow(m)
            | RuntimeError::Index(m)
            | RuntimeError::Key(m)
            | RuntimeError::Attribute(m)
            | RuntimeError::Io(m) => m,
        }
    }

    /// Rebuild an error from a kind name and message.
    ///
    /// Unknown kind names fall back to `Type`, matching how foreign error
    /// strings are absorbed at the plugin boundary.
    pub fn from_kind_name(
        kind: &str,
        message: impl Into<String>,
    ) -> Self {
        let message = message.into();
        match kind {
            "ValueError" => RuntimeError::Value(message),
            "ZeroDivisionError" => RuntimeError::ZeroDivision(message),
            "OverflowError" => RuntimeError::Overflow(message),
            "IndexError" => RuntimeError::Index(message),
            "KeyError" => RuntimeError::Key(message),
            "AttributeError" => RuntimeError::Attribute(message),
            "IOError" => RuntimeError::Io(message),
            _ => RuntimeError::Type(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_kind_prefix() {
        let err = RuntimeError::ZeroDivision("Division by zero".to_string());
        assert_eq!(err.to_string(), "ZeroDivisionError: Division by zero");
        assert_eq!(err.kind_name(), "ZeroDivisionError");
        assert_eq!(err.message(), "Division by zero");
    }

    #[test]
    fn test_from_kind_name_round_trip() {
        let err = RuntimeError::Key("missing".to_string());
        let rebuilt = RuntimeError::from_kind_name(err.kind_name(), err.message());
        assert_eq!(err, rebuilt);
    }

    #[test]
    fn test_unknown_kind_falls_back_to_type() {
        let err = RuntimeError::from_kind_name("SomethingElse", "msg");
        assert_eq!(err, RuntimeError::Type("msg".to_string()));
    }
}
