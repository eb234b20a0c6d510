//! # Security Guard Messages

use serde::{Deserialize, Serialize};

/// Permission issued by the security guard.
///
/// The same message is used by the trajectory generator to tell the guard whether it is safe to
/// hand control over to another source.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Permission {
    pub permission: bool,
}

impl From<bool> for Permission {
    fn from(permission: bool) -> Self {
        Self { permission }
    }
}
