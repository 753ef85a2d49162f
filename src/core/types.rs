/*!
 * Core Types
 * Common identifiers used across the signal subsystem
 */

use serde::{Deserialize, Serialize};

/// Thread ID type
pub type Tid = u32;

/// Thread group (process) ID type; equal to the leader's thread ID
pub type Tgid = u32;

/// Process group ID type
pub type Pgid = u32;

/// Session ID type
pub type Sid = u32;

/// User ID type
pub type Uid = u32;

/// Credentials of a thread group, consulted by the permission checker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Credentials {
    pub uid: Uid,
    pub euid: Uid,
    pub suid: Uid,
    /// Holder may signal any process (CAP_KILL analog)
    pub cap_kill: bool,
}

impl Credentials {
    /// Unprivileged credentials with all three ids set to `uid`
    pub const fn user(uid: Uid) -> Self {
        Self {
            uid,
            euid: uid,
            suid: uid,
            cap_kill: false,
        }
    }

    /// Privileged credentials
    pub const fn root() -> Self {
        Self {
            uid: 0,
            euid: 0,
            suid: 0,
            cap_kill: true,
        }
    }
}

/// Identity of a thread group as seen by senders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessIdentity {
    pub pgid: Pgid,
    pub sid: Sid,
    pub creds: Credentials,
}

impl ProcessIdentity {
    pub const fn new(pgid: Pgid, sid: Sid, creds: Credentials) -> Self {
        Self { pgid, sid, creds }
    }
}

impl Default for ProcessIdentity {
    fn default() -> Self {
        Self::new(1, 1, Credentials::root())
    }
}
