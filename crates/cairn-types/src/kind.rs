use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// The kind of object stored.
///
/// The three kinds Cairn produces are named variants. Any other token read
/// from a store is kept verbatim in [`ObjectKind::Other`] so it round-trips.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ObjectKind {
    /// Raw content (file contents, arbitrary data).
    Blob,
    /// Directory listing: ordered entries mapping names to object references.
    Tree,
    /// Snapshot event referencing one tree plus a message.
    Commit,
    /// Any other kind token.
    Other(String),
}

impl ObjectKind {
    /// Parse a kind token, rejecting tokens that would break object framing.
    pub fn parse(token: &str) -> Result<Self, TypeError> {
        match token {
            "blob" => Ok(Self::Blob),
            "tree" => Ok(Self::Tree),
            "commit" => Ok(Self::Commit),
            _ if token.is_empty() || token.contains([' ', '\0']) => {
                Err(TypeError::InvalidKind(token.to_string()))
            }
            _ => Ok(Self::Other(token.to_string())),
        }
    }

    /// The token written into the object header.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Blob => "blob",
            Self::Tree => "tree",
            Self::Commit => "commit",
            Self::Other(s) => s,
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectKind {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<ObjectKind> for String {
    fn from(kind: ObjectKind) -> Self {
        kind.as_str().to_string()
    }
}

impl TryFrom<String> for ObjectKind {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}
