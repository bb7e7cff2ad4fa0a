use std::borrow::Borrow;

/// Identifier of an operation, derived from the call.
///
/// Comparison and hashing are case-insensitive: `GetUser` and `getuser` name the same
/// operation. The original spelling is kept for logging.
#[derive(Debug, Clone)]
pub struct OperationName {
    value: String,
    folded: String,
}

impl OperationName {
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        let folded = value.to_lowercase();
        Self { value, folded }
    }

    /// Name as written by the caller.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Lower-cased name, used as the generic command name.
    pub fn command_name(&self) -> &str {
        &self.folded
    }

    pub fn is_empty(&self) -> bool {
        self.value.trim().is_empty()
    }

    /// Case-insensitive match against an arbitrary name.
    pub fn matches(&self, other: &str) -> bool {
        self.folded == other.to_lowercase()
    }
}

impl PartialEq for OperationName {
    fn eq(&self, other: &Self) -> bool {
        self.folded == other.folded
    }
}

impl PartialEq<str> for OperationName {
    fn eq(&self, other: &str) -> bool {
        self.matches(other)
    }
}

impl Eq for OperationName {}

impl Borrow<str> for OperationName {
    fn borrow(&self) -> &str {
        &self.folded
    }
}

impl std::hash::Hash for OperationName {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.folded.hash(state);
    }
}

impl std::fmt::Display for OperationName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl From<&str> for OperationName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for OperationName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}
