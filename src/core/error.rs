use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid index or object configuration (duplicate field, too many fields, ...)
    Configuration,
    /// The write lock could not be acquired in time
    Concurrency,
    /// Index state does not agree with the request (unknown key, batch misuse, ...)
    Consistency,
    QueryParse,
    /// A caller-supplied callback broke its contract
    CallerContract,
    Cancelled,
    InvalidState,
}

#[derive(Debug, Clone)]
pub struct Error {
    pub kind: ErrorKind,
    pub context: String,
}

impl Error {
    pub fn new(kind: ErrorKind, context: String) -> Self {
        Error { kind, context }
    }

    pub fn configuration(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::Configuration, context.into())
    }

    pub fn consistency(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::Consistency, context.into())
    }

    pub fn query_parse(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::QueryParse, context.into())
    }

    /// Only a write-lock timeout is worth retrying.
    pub fn is_transient(&self) -> bool {
        self.kind == ErrorKind::Concurrency
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.context)
    }
}

impl std::error::Error for Error {}

impl From<tokio::time::error::Elapsed> for Error {
    fn from(err: tokio::time::error::Elapsed) -> Self {
        Error {
            kind: ErrorKind::Concurrency,
            context: format!("Timed out waiting for the write lock: {}", err),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_concurrency_errors_are_transient() {
        assert!(Error::new(ErrorKind::Concurrency, "lock".to_string()).is_transient());
        assert!(!Error::consistency("unknown key").is_transient());
        assert!(!Error::query_parse("bad token").is_transient());
    }

    #[test]
    fn test_display_includes_kind_and_context() {
        let err = Error::configuration("duplicate field 'title'");
        assert_eq!(err.to_string(), "Configuration: duplicate field 'title'");
    }
}
