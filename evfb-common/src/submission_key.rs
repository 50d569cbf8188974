//! Opaque submission keys
//!
//! A key is the only credential a respondent holds for resuming or viewing a
//! submission, so it is drawn from the OS CSPRNG: 16 bytes rendered as 32
//! lowercase hex characters.

use std::fmt;
use std::str::FromStr;

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Number of random bytes in a key
pub const KEY_BYTES: usize = 16;

/// Length of the rendered key
pub const KEY_LEN: usize = KEY_BYTES * 2;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SubmissionKey(String);

impl SubmissionKey {
    /// Generate a fresh key
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes.iter().map(|b| format!("{:02x}", b)).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for SubmissionKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let well_formed = s.len() == KEY_LEN
            && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if well_formed {
            Ok(Self(s.to_string()))
        } else {
            Err(Error::InvalidInput(format!("Malformed submission key: {:?}", s)))
        }
    }
}

impl TryFrom<String> for SubmissionKey {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SubmissionKey> for String {
    fn from(key: SubmissionKey) -> Self {
        key.0
    }
}

impl fmt::Display for SubmissionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
