use std::path::Path;
use std::path::PathBuf;

use strum_macros::Display;

use crate::activation::ACTION_KEY;
use crate::activation::ACTION_REQUEST;
use crate::activation::Activation;
use crate::activation::FIFO_KEY;
use crate::activation::FROM_UID_KEY;
use crate::activation::PID_KEY;
use crate::activation::POLICY_KEY;
use crate::activation::UID_KEY;
use crate::decision::Policy;

const UNKNOWN_ID: i32 = -1;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActivationError {
    /// Without `action` the broker cannot tell a prompt from a notification.
    #[error("activation has no `action` field")]
    MissingAction,
    #[error("live request has no `fifo` decision channel")]
    MissingChannel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum RequestMode {
    LiveRequest,
    Notification,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestKind {
    /// A decision must be collected and written to `channel`.
    Live { channel: PathBuf },
    /// A past decision, displayed only.
    Notification { prior_policy: i32 },
}

/// Who is asking and how to answer, fixed for the lifetime of one activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    requesting_uid: i32,
    requesting_pid: i32,
    kind: RequestKind,
}

impl RequestDescriptor {
    pub fn from_activation(activation: &Activation) -> Result<Self, ActivationError> {
        let action = activation
            .get_str(ACTION_KEY)
            .ok_or(ActivationError::MissingAction)?;
        let requesting_pid = int_field(activation, PID_KEY);

        if action == ACTION_REQUEST {
            let channel = activation
                .get_str(FIFO_KEY)
                .filter(|path| !path.is_empty())
                .ok_or(ActivationError::MissingChannel)?;
            Ok(Self {
                requesting_uid: int_field(activation, UID_KEY),
                requesting_pid,
                kind: RequestKind::Live {
                    channel: PathBuf::from(channel),
                },
            })
        } else {
            Ok(Self {
                requesting_uid: int_field(activation, FROM_UID_KEY),
                requesting_pid,
                kind: RequestKind::Notification {
                    prior_policy: int_field(activation, POLICY_KEY),
                },
            })
        }
    }

    pub fn mode(&self) -> RequestMode {
        match self.kind {
            RequestKind::Live { .. } => RequestMode::LiveRequest,
            RequestKind::Notification { .. } => RequestMode::Notification,
        }
    }

    pub fn requesting_uid(&self) -> i32 {
        self.requesting_uid
    }

    pub fn requesting_pid(&self) -> i32 {
        self.requesting_pid
    }

    pub fn kind(&self) -> &RequestKind {
        &self.kind
    }

    pub fn channel_path(&self) -> Option<&Path> {
        match &self.kind {
            RequestKind::Live { channel } => Some(channel),
            RequestKind::Notification { .. } => None,
        }
    }

    pub fn prior_policy(&self) -> Option<i32> {
        match self.kind {
            RequestKind::Live { .. } => None,
            RequestKind::Notification { prior_policy } => Some(prior_policy),
        }
    }

    /// True when a notification reports a past allow. Any other code,
    /// including unknown ones, reads as a rejection.
    pub fn was_authorized(&self) -> bool {
        self.prior_policy()
            .and_then(|code| Policy::from_code(i64::from(code)))
            == Some(Policy::Allow)
    }
}

fn int_field(activation: &Activation, key: &str) -> i32 {
    i32::try_from(activation.get_int(key, i64::from(UNKNOWN_ID))).unwrap_or(UNKNOWN_ID)
}
