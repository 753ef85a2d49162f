/*!
 * Signal Dispositions
 * Per-group action table and the POSIX default-action classification
 */

use crate::core::limits::NSIG;
use crate::signals::core::sigset::SignalSet;
use crate::signals::core::types::{Signal, SignalError, SignalResult};
use serde::{Deserialize, Serialize};

/// POSIX default action classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DefaultAction {
    Ignore,
    Terminate,
    Coredump,
    Stop,
}

/// Default action for `signal`.
///
/// CONT is classified Ignore: its resume effect happens when it is raised,
/// not when it is consumed. Real-time signals terminate.
pub fn classify_default(signal: Signal) -> DefaultAction {
    match signal {
        Signal::SIGQUIT
        | Signal::SIGILL
        | Signal::SIGTRAP
        | Signal::SIGABRT
        | Signal::SIGBUS
        | Signal::SIGFPE
        | Signal::SIGSEGV
        | Signal::SIGXCPU
        | Signal::SIGXFSZ
        | Signal::SIGSYS => DefaultAction::Coredump,

        Signal::SIGCHLD | Signal::SIGCONT | Signal::SIGURG | Signal::SIGWINCH => {
            DefaultAction::Ignore
        }

        Signal::SIGSTOP | Signal::SIGTSTP | Signal::SIGTTIN | Signal::SIGTTOU => {
            DefaultAction::Stop
        }

        _ => DefaultAction::Terminate,
    }
}

/// Opaque handler address supplied by whoever installs the handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HandlerToken(pub u64);

/// What to do with a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SigHandler {
    Default,
    Ignore,
    Handler(HandlerToken),
}

/// sigaction-style flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionFlags(u32);

impl ActionFlags {
    pub const NONE: ActionFlags = ActionFlags(0);
    /// Parent is not told when children stop
    pub const NOCLDSTOP: ActionFlags = ActionFlags(1 << 0);
    /// Handler wants full signal info
    pub const SIGINFO: ActionFlags = ActionFlags(1 << 2);
    /// Restart interrupted calls after the handler
    pub const RESTART: ActionFlags = ActionFlags(1 << 28);
    /// Do not block the signal while its handler runs
    pub const NODEFER: ActionFlags = ActionFlags(1 << 30);
    /// Reset to Default once delivered
    pub const RESETHAND: ActionFlags = ActionFlags(1 << 31);

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn contains(self, other: ActionFlags) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub const fn union(self, other: ActionFlags) -> ActionFlags {
        ActionFlags(self.0 | other.0)
    }
}

impl std::ops::BitOr for ActionFlags {
    type Output = ActionFlags;

    fn bitor(self, rhs: ActionFlags) -> ActionFlags {
        self.union(rhs)
    }
}

/// Configured handling for one signal number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disposition {
    pub handler: SigHandler,
    pub flags: ActionFlags,
    /// Extra signals blocked while the handler runs
    pub mask: SignalSet,
}

impl Disposition {
    pub const fn default_action() -> Self {
        Self {
            handler: SigHandler::Default,
            flags: ActionFlags::NONE,
            mask: SignalSet::empty(),
        }
    }

    pub const fn ignore() -> Self {
        Self {
            handler: SigHandler::Ignore,
            flags: ActionFlags::NONE,
            mask: SignalSet::empty(),
        }
    }

    pub const fn handler(token: HandlerToken) -> Self {
        Self {
            handler: SigHandler::Handler(token),
            flags: ActionFlags::NONE,
            mask: SignalSet::empty(),
        }
    }

    pub fn with_flags(mut self, flags: ActionFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_mask(mut self, mask: SignalSet) -> Self {
        self.mask = mask;
        self
    }

    #[inline]
    pub fn is_default(&self) -> bool {
        self.handler == SigHandler::Default
    }

    /// Explicit Ignore, or Default where the default action is Ignore
    #[inline]
    pub fn ignores(&self, signal: Signal) -> bool {
        match self.handler {
            SigHandler::Ignore => true,
            SigHandler::Default => classify_default(signal) == DefaultAction::Ignore,
            SigHandler::Handler(_) => false,
        }
    }
}

impl Default for Disposition {
    fn default() -> Self {
        Self::default_action()
    }
}

/// Dispositions of one thread group, indexed by signal number
#[derive(Debug, Clone)]
pub struct DispositionTable {
    actions: [Disposition; NSIG as usize],
}

impl DispositionTable {
    pub fn new() -> Self {
        Self {
            actions: [Disposition::default_action(); NSIG as usize],
        }
    }

    #[inline]
    pub fn get(&self, signal: Signal) -> Disposition {
        self.actions[signal.index() as usize]
    }

    /// Install `new` for `signal`, returning the previous disposition.
    ///
    /// KILL and STOP are rejected and the table is left unchanged. KILL
    /// and STOP are also stripped from the handler mask.
    pub fn set(&mut self, signal: Signal, mut new: Disposition) -> SignalResult<Disposition> {
        if !signal.can_catch() {
            return Err(SignalError::NotOverridable(signal));
        }
        new.mask = new.mask - SignalSet::unblockable();

        let slot = &mut self.actions[signal.index() as usize];
        Ok(std::mem::replace(slot, new))
    }

    /// Turn every user handler back into Default, keeping Ignore.
    /// Returns how many handlers were reset.
    pub fn reset_handlers(&mut self) -> usize {
        let mut count = 0;
        for action in self.actions.iter_mut() {
            if matches!(action.handler, SigHandler::Handler(_)) {
                *action = Disposition::default_action();
                count += 1;
            }
        }
        count
    }

    /// Signals whose current disposition ignores them
    pub fn ignored(&self) -> SignalSet {
        SignalSet::full()
            .iter()
            .filter(|signal| self.get(*signal).ignores(*signal))
            .collect()
    }
}

impl Default for DispositionTable {
    fn default() -> Self {
        Self::new()
    }
}
