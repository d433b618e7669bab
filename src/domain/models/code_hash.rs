use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// SHA-256 of a contract's executable code, as 64 lowercase hex characters
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CodeHash(String);

/// Why a string was rejected as a code hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeHashError {
    WrongLength(usize),
    InvalidCharacter(char),
}

impl fmt::Display for CodeHashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodeHashError::WrongLength(len) => {
                write!(f, "code hash must be 64 hex characters, got {}", len)
            }
            CodeHashError::InvalidCharacter(c) => {
                write!(f, "code hash contains invalid character {:?}", c)
            }
        }
    }
}

impl std::error::Error for CodeHashError {}

impl CodeHash {
    pub const LEN: usize = 64;

    pub fn parse(value: &str) -> Result<Self, CodeHashError> {
        if value.len() != Self::LEN {
            return Err(CodeHashError::WrongLength(value.chars().count()));
        }
        if let Some(c) = value
            .chars()
            .find(|c| !matches!(c, '0'..='9' | 'a'..='f'))
        {
            return Err(CodeHashError::InvalidCharacter(c));
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Raw 32-byte digest
    pub fn to_bytes(&self) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        // validated in `parse`
        hex::decode_to_slice(&self.0, &mut bytes).unwrap_or_default();
        bytes
    }
}

impl FromStr for CodeHash {
    type Err = CodeHashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CodeHash {
    type Error = CodeHashError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CodeHash> for String {
    fn from(hash: CodeHash) -> Self {
        hash.0
    }
}

impl fmt::Display for CodeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
