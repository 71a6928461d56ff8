//! The uniform payload handed to every callback.

use serde::{Serialize, Serializer};

use crate::consts::ENVELOPE_INFO;

/// Outcome carried by an [`Envelope`]. Serializes as `0`, `1` or `2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Failure,
    Success,
    /// The database is being created or upgraded.
    Upgrade,
}

impl Status {
    pub fn code(self) -> u8 {
        match self {
            Status::Failure => 0,
            Status::Success => 1,
            Status::Upgrade => 2,
        }
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

/// `{status, data, info, description}` as passed to callbacks.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub status: Status,
    pub data: T,
    pub info: &'static str,
    pub description: String,
}

impl<T> Envelope<T> {
    pub fn new(status: Status, data: T, description: impl Into<String>) -> Self {
        Self {
            status,
            data,
            info: ENVELOPE_INFO,
            description: description.into(),
        }
    }

    pub fn success(data: T, description: impl Into<String>) -> Self {
        Self::new(Status::Success, data, description)
    }

    pub fn failure(data: T, description: impl Into<String>) -> Self {
        Self::new(Status::Failure, data, description)
    }

    pub fn upgrade(data: T, description: impl Into<String>) -> Self {
        Self::new(Status::Upgrade, data, description)
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}
