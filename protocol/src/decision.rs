use strum_macros::Display;

/// Size in bytes of the record written to the decision channel.
pub const DECISION_RECORD_LEN: usize = 4;

/// Decision delivered to the waiting requester.
///
/// On the wire this is a 4-byte big-endian integer. Only these two codes are
/// ever written; the duration chosen in the prompt is not encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Policy {
    Deny,
    Allow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("unknown policy code {0}")]
    UnknownCode(u32),
}

impl Policy {
    pub const fn code(self) -> u32 {
        match self {
            Policy::Deny => 1,
            Policy::Allow => 2,
        }
    }

    /// Maps an integer code as carried by activation parameters.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Policy::Deny),
            2 => Some(Policy::Allow),
            _ => None,
        }
    }

    pub const fn to_record(self) -> [u8; DECISION_RECORD_LEN] {
        self.code().to_be_bytes()
    }

    pub fn from_record(record: [u8; DECISION_RECORD_LEN]) -> Result<Self, DecodeError> {
        let code = u32::from_be_bytes(record);
        Self::from_code(i64::from(code)).ok_or(DecodeError::UnknownCode(code))
    }
}
