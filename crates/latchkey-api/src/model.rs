//! Lock type model

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use latchkey_common::{LOCK_TYPE, LatchkeyError, PRESENCE_TYPE};

use crate::grpc::{Resource, TypeCode};

/// Kind of record held in the lock store.
///
/// Both kinds share the same record shape. A `Lock` is held by one owner doing
/// exclusive work; a `Presence` advertises that a process is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockType {
    Lock,
    Presence,
}

impl LockType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LockType::Lock => LOCK_TYPE,
            LockType::Presence => PRESENCE_TYPE,
        }
    }

    pub fn type_code(&self) -> TypeCode {
        match self {
            LockType::Lock => TypeCode::Lock,
            LockType::Presence => TypeCode::Presence,
        }
    }

    pub fn from_type_code(code: TypeCode) -> Option<Self> {
        match code {
            TypeCode::Lock => Some(LockType::Lock),
            TypeCode::Presence => Some(LockType::Presence),
            TypeCode::Unknown => None,
        }
    }
}

impl Display for LockType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LockType {
    type Err = LatchkeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            LOCK_TYPE => Ok(LockType::Lock),
            PRESENCE_TYPE => Ok(LockType::Presence),
            _ => Err(LatchkeyError::InvalidType),
        }
    }
}

impl Resource {
    /// Build a resource with both type fields filled in
    pub fn new(
        key: impl Into<String>,
        owner: impl Into<String>,
        value: impl Into<String>,
        lock_type: LockType,
    ) -> Self {
        Self {
            key: key.into(),
            owner: owner.into(),
            value: value.into(),
            r#type: lock_type.as_str().to_string(),
            type_code: lock_type.type_code() as i32,
        }
    }

    /// Copy of this resource with `type` and `type_code` rewritten to agree
    /// with `lock_type`
    pub fn normalized(&self, lock_type: LockType) -> Self {
        Self {
            r#type: lock_type.as_str().to_string(),
            type_code: lock_type.type_code() as i32,
            ..self.clone()
        }
    }
}
