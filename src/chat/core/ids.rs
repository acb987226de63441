// File: src/chat/core/ids.rs

//! Identifier types for the chat store.
//!
//! Participants travel through the UI and through persisted data as plain
//! strings (`"admin-1"`, `"user-emp-EMP001"`). Inside the crate they are a
//! tagged [`Participant`] so call sites cannot mix up roles, while the string
//! form stays byte-for-byte compatible with what is already stored.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::chat::core::errors::ParticipantError;

// ===== Message IDs ==========================================================

/// Identifier of a chat message.
///
/// Freshly generated ids look like `msg_1718000000000_3f2a...`. Ids loaded
/// from storage are kept verbatim whatever their shape.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Generate a new identifier stamped with the creation time.
    #[must_use]
    pub fn generate(now_ms: i64) -> Self {
        Self(format!("msg_{now_ms}_{}", Uuid::new_v4().simple()))
    }

    /// Borrow as `&str`.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into `String`.
    #[inline]
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for MessageId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl AsRef<str> for MessageId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

// ===== Employment codes =====================================================

/// Employment code of an employee (e.g. `EMP001`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EmploymentCode(String);

impl EmploymentCode {
    /// Hard ceiling to prevent pathological payloads.
    pub const MAX_LEN: usize = 64;

    /// Build a validated `EmploymentCode`.
    ///
    /// Rules:
    /// - Non-empty.
    /// - Max length limited.
    /// - ASCII alphanumerics, `-` and `_` only.
    ///
    /// # Errors
    /// Returns `ParticipantError` if the input is empty, too long, or contains invalid characters.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, ParticipantError> {
        let s = raw.as_ref();

        if s.is_empty() {
            return Err(ParticipantError::Empty);
        }
        if s.len() > Self::MAX_LEN {
            return Err(ParticipantError::TooLong {
                max: Self::MAX_LEN,
                got: s.len(),
            });
        }

        for (i, ch) in s.chars().enumerate() {
            if !(ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_')) {
                return Err(ParticipantError::InvalidChar { ch, index: i });
            }
        }

        Ok(Self(s.to_owned()))
    }

    /// Borrow as `&str`.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmploymentCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmploymentCode {
    type Err = ParticipantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

// ===== Participants =========================================================

/// One side of a conversation.
///
/// String forms:
/// - `Admin` is `admin-1`
/// - `Employee(code)` is `user-emp-{code}`
/// - `Other(token)` is `token`, kept verbatim
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Participant {
    /// The console administrator.
    Admin,
    /// An employee, addressed by employment code.
    Employee(EmploymentCode),
    /// Any other token; built only by [`Participant::parse`].
    Other(OtherToken),
}

/// A participant token that is neither the admin nor an employee handle.
///
/// Never blank and never one of the canonical forms, so it survives a
/// string round-trip unchanged.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OtherToken(String);

impl OtherToken {
    /// Borrow as `&str`.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OtherToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Participant {
    /// String form of the administrator.
    pub const ADMIN_TOKEN: &'static str = "admin-1";
    /// Prefix of employee handles.
    pub const EMPLOYEE_PREFIX: &'static str = "user-emp-";
    /// Hard ceiling on raw identifier length.
    pub const MAX_LEN: usize = 192;

    /// Build the handle of an employee.
    ///
    /// # Errors
    /// Returns `ParticipantError` if the employment code is invalid.
    pub fn employee(code: impl AsRef<str>) -> Result<Self, ParticipantError> {
        Ok(Self::Employee(EmploymentCode::new(code)?))
    }

    /// Parse a raw participant identifier.
    ///
    /// # Errors
    /// Returns `ParticipantError` if the token is blank or too long.
    pub fn parse(raw: &str) -> Result<Self, ParticipantError> {
        if raw.trim().is_empty() {
            return Err(ParticipantError::Empty);
        }
        if raw.len() > Self::MAX_LEN {
            return Err(ParticipantError::TooLong {
                max: Self::MAX_LEN,
                got: raw.len(),
            });
        }
        if raw == Self::ADMIN_TOKEN {
            return Ok(Self::Admin);
        }
        if let Some(code) = raw
            .strip_prefix(Self::EMPLOYEE_PREFIX)
            .and_then(|suffix| EmploymentCode::new(suffix).ok())
        {
            return Ok(Self::Employee(code));
        }
        Ok(Self::Other(OtherToken(raw.to_owned())))
    }

    /// Whether this participant is the administrator.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Employment code, for employees.
    #[must_use]
    pub const fn employment_code(&self) -> Option<&EmploymentCode> {
        match self {
            Self::Employee(code) => Some(code),
            _ => None,
        }
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => f.write_str(Self::ADMIN_TOKEN),
            Self::Employee(code) => write!(f, "{}{code}", Self::EMPLOYEE_PREFIX),
            Self::Other(token) => fmt::Display::fmt(token, f),
        }
    }
}

impl FromStr for Participant {
    type Err = ParticipantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Participant {
    type Error = ParticipantError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Participant> for String {
    fn from(value: Participant) -> Self {
        value.to_string()
    }
}
