/*!
 * Signal Types
 * UNIX-style signal definitions, origin info and result types
 */

use crate::core::limits::{NSIG, SIGRTMIN};
use crate::core::types::{Pgid, Tgid, Tid, Uid};
use crate::signals::action::{classify_default, ActionFlags, DefaultAction, HandlerToken};
use crate::signals::core::sigset::SignalSet;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Signal operation result
pub type SignalResult<T> = Result<T, SignalError>;

/// Signal errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum SignalError {
    #[error("Invalid signal: {0}")]
    #[diagnostic(
        code(signal::invalid),
        help("Signal numbers must be in 1..=64.")
    )]
    InvalidSignal(u32),

    #[error("Signal {0} cannot be caught, blocked or ignored")]
    #[diagnostic(
        code(signal::not_overridable),
        help("KILL and STOP always keep their default action.")
    )]
    NotOverridable(Signal),

    #[error("Permission denied: {sender} may not send {signal} to {target}")]
    #[diagnostic(
        code(signal::permission_denied),
        help("Sender needs a matching uid, the same session (CONT only) or kill capability.")
    )]
    PermissionDenied {
        sender: Tgid,
        target: Tgid,
        signal: Signal,
    },

    #[error("Queue full: uid {uid} has exhausted its signal queue quota ({signal})")]
    #[diagnostic(
        code(signal::queue_full),
        help("Try again once queued signals have been consumed.")
    )]
    QueueFull { uid: Uid, signal: Signal },

    #[error("Thread {0} not found")]
    #[diagnostic(
        code(signal::no_such_thread),
        help("The thread may have exited. Exits racing a send are reported here.")
    )]
    NoSuchThread(Tid),

    #[error("Thread group {0} not found")]
    #[diagnostic(
        code(signal::no_such_group),
        help("The process may have exited or never existed.")
    )]
    NoSuchGroup(Tgid),

    #[error("Process group {0} has no members")]
    #[diagnostic(code(signal::no_such_process_group))]
    NoSuchProcessGroup(Pgid),

    #[error("Thread group {0} is exiting")]
    #[diagnostic(
        code(signal::group_exiting),
        help("No new threads can join a group once a fatal signal started its exit.")
    )]
    GroupExiting(Tgid),

    #[error("Timed out waiting for signal")]
    #[diagnostic(code(signal::timed_out))]
    TimedOut,

    #[error("Wait interrupted by fatal signal {0}")]
    #[diagnostic(code(signal::interrupted))]
    Interrupted(Signal),
}

/// A signal number in `1..=NSIG`
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Signal(u8);

impl Signal {
    /// Hangup detected on controlling terminal or death of controlling process
    pub const SIGHUP: Signal = Signal(1);
    /// Interrupt from keyboard (Ctrl+C)
    pub const SIGINT: Signal = Signal(2);
    /// Quit from keyboard (Ctrl+\)
    pub const SIGQUIT: Signal = Signal(3);
    /// Illegal instruction
    pub const SIGILL: Signal = Signal(4);
    /// Trace/breakpoint trap
    pub const SIGTRAP: Signal = Signal(5);
    /// Abort signal
    pub const SIGABRT: Signal = Signal(6);
    /// Bus error (bad memory access)
    pub const SIGBUS: Signal = Signal(7);
    /// Floating-point exception
    pub const SIGFPE: Signal = Signal(8);
    /// Kill signal (cannot be caught or ignored)
    pub const SIGKILL: Signal = Signal(9);
    /// User-defined signal 1
    pub const SIGUSR1: Signal = Signal(10);
    /// Invalid memory reference
    pub const SIGSEGV: Signal = Signal(11);
    /// User-defined signal 2
    pub const SIGUSR2: Signal = Signal(12);
    /// Broken pipe
    pub const SIGPIPE: Signal = Signal(13);
    /// Timer signal
    pub const SIGALRM: Signal = Signal(14);
    /// Termination signal
    pub const SIGTERM: Signal = Signal(15);
    /// Coprocessor stack fault
    pub const SIGSTKFLT: Signal = Signal(16);
    /// Child process stopped or terminated
    pub const SIGCHLD: Signal = Signal(17);
    /// Continue if stopped
    pub const SIGCONT: Signal = Signal(18);
    /// Stop process (cannot be caught or ignored)
    pub const SIGSTOP: Signal = Signal(19);
    /// Stop typed at terminal (Ctrl+Z)
    pub const SIGTSTP: Signal = Signal(20);
    /// Terminal input for background process
    pub const SIGTTIN: Signal = Signal(21);
    /// Terminal output for background process
    pub const SIGTTOU: Signal = Signal(22);
    /// Urgent condition on socket
    pub const SIGURG: Signal = Signal(23);
    /// CPU time limit exceeded
    pub const SIGXCPU: Signal = Signal(24);
    /// File size limit exceeded
    pub const SIGXFSZ: Signal = Signal(25);
    /// Virtual alarm clock
    pub const SIGVTALRM: Signal = Signal(26);
    /// Profiling timer expired
    pub const SIGPROF: Signal = Signal(27);
    /// Window resize signal
    pub const SIGWINCH: Signal = Signal(28);
    /// I/O now possible
    pub const SIGIO: Signal = Signal(29);
    /// Power failure
    pub const SIGPWR: Signal = Signal(30);
    /// Bad system call
    pub const SIGSYS: Signal = Signal(31);
    /// First real-time signal
    pub const SIGRTMIN: Signal = Signal(SIGRTMIN as u8);
    /// Last real-time signal
    pub const SIGRTMAX: Signal = Signal(NSIG as u8);

    /// Convert from signal number
    pub fn from_number(n: u32) -> SignalResult<Self> {
        if (1..=NSIG).contains(&n) {
            Ok(Signal(n as u8))
        } else {
            Err(SignalError::InvalidSignal(n))
        }
    }

    /// Real-time signal `SIGRTMIN + offset`
    pub fn realtime(offset: u32) -> SignalResult<Self> {
        Self::from_number(SIGRTMIN + offset)
    }

    /// Get signal number
    #[inline]
    pub const fn number(self) -> u32 {
        self.0 as u32
    }

    /// Bit index inside a `SignalSet`
    #[inline]
    pub(crate) const fn index(self) -> u32 {
        self.0 as u32 - 1
    }

    /// Real-time signals queue every instance
    #[inline]
    pub const fn is_realtime(self) -> bool {
        self.0 as u32 >= SIGRTMIN
    }

    /// Legacy signals collapse to one pending instance per queue
    #[inline]
    pub const fn is_legacy(self) -> bool {
        !self.is_realtime()
    }

    /// Check if signal can be caught/blocked
    #[inline]
    pub const fn can_catch(self) -> bool {
        !matches!(self.0, 9 | 19)
    }

    /// POSIX default action class
    #[inline]
    pub fn default_action(self) -> DefaultAction {
        classify_default(self)
    }

    /// Default action stops the group
    #[inline]
    pub fn is_stop_class(self) -> bool {
        self.default_action() == DefaultAction::Stop
    }

    /// Default action ends the group (with or without a core dump)
    #[inline]
    pub fn is_fatal_by_default(self) -> bool {
        matches!(
            self.default_action(),
            DefaultAction::Terminate | DefaultAction::Coredump
        )
    }

    /// Symbolic name for legacy signals
    pub fn name(self) -> Option<&'static str> {
        const NAMES: [&str; 31] = [
            "SIGHUP", "SIGINT", "SIGQUIT", "SIGILL", "SIGTRAP", "SIGABRT", "SIGBUS", "SIGFPE",
            "SIGKILL", "SIGUSR1", "SIGSEGV", "SIGUSR2", "SIGPIPE", "SIGALRM", "SIGTERM",
            "SIGSTKFLT", "SIGCHLD", "SIGCONT", "SIGSTOP", "SIGTSTP", "SIGTTIN", "SIGTTOU",
            "SIGURG", "SIGXCPU", "SIGXFSZ", "SIGVTALRM", "SIGPROF", "SIGWINCH", "SIGIO",
            "SIGPWR", "SIGSYS",
        ];
        NAMES.get(self.index() as usize).copied()
    }

    /// Get human-readable description
    pub fn description(self) -> &'static str {
        match self.0 {
            1 => "Hangup",
            2 => "Interrupt",
            3 => "Quit",
            4 => "Illegal instruction",
            5 => "Trace/breakpoint trap",
            6 => "Aborted",
            7 => "Bus error",
            8 => "Floating point exception",
            9 => "Killed",
            10 => "User defined signal 1",
            11 => "Segmentation fault",
            12 => "User defined signal 2",
            13 => "Broken pipe",
            14 => "Alarm clock",
            15 => "Terminated",
            16 => "Stack fault",
            17 => "Child status changed",
            18 => "Continued",
            19 => "Stopped (signal)",
            20 => "Stopped",
            21 => "Stopped (tty input)",
            22 => "Stopped (tty output)",
            23 => "Urgent I/O condition",
            24 => "CPU time limit exceeded",
            25 => "File size limit exceeded",
            26 => "Virtual timer expired",
            27 => "Profiling timer expired",
            28 => "Window size changed",
            29 => "I/O possible",
            30 => "Power failure",
            31 => "Bad system call",
            _ => "Real-time signal",
        }
    }
}

impl TryFrom<u32> for Signal {
    type Error = SignalError;

    fn try_from(n: u32) -> SignalResult<Self> {
        Signal::from_number(n)
    }
}

impl From<Signal> for u32 {
    fn from(signal: Signal) -> u32 {
        signal.number()
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}({})", name, self.number()),
            None => write!(
                f,
                "SIGRTMIN+{}({})",
                self.number() - SIGRTMIN,
                self.number()
            ),
        }
    }
}

impl fmt::Debug for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Where a signal came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SigCode {
    /// kill()-style send from a user process
    User,
    /// Raised by the kernel itself
    Kernel,
    /// sigqueue()-style send carrying a value
    Queue,
    /// Timer expiry
    Timer,
    /// Message queue notification
    MesgQ,
    /// Asynchronous I/O completion
    AsyncIo,
    /// Thread-directed tkill()-style send
    Tkill,
}

impl SigCode {
    /// Unconditional-delivery origin: never fails for lack of queue space
    #[inline]
    pub const fn is_kill_style(self) -> bool {
        matches!(self, SigCode::User | SigCode::Kernel)
    }
}

/// Extra data carried by a queued signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SigPayload {
    None,
    /// Pointer-sized value supplied by the sender
    Value(usize),
    /// Child state change report
    Child { status: i32, utime: u64, stime: u64 },
    /// Timer id and overrun count
    Timer { id: u32, overrun: u32 },
}

/// Signal origin and payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalInfo {
    pub signal: Signal,
    pub code: SigCode,
    /// Sending process (0 for the kernel)
    pub pid: Tgid,
    /// Sending credential; the queue quota is charged to it
    pub uid: Uid,
    pub payload: SigPayload,
}

impl SignalInfo {
    /// kill()-style info
    pub const fn user(signal: Signal, pid: Tgid, uid: Uid) -> Self {
        Self {
            signal,
            code: SigCode::User,
            pid,
            uid,
            payload: SigPayload::None,
        }
    }

    /// Kernel-raised info
    pub const fn kernel(signal: Signal) -> Self {
        Self {
            signal,
            code: SigCode::Kernel,
            pid: 0,
            uid: 0,
            payload: SigPayload::None,
        }
    }

    /// sigqueue()-style info with a value
    pub const fn queued(signal: Signal, pid: Tgid, uid: Uid, value: usize) -> Self {
        Self {
            signal,
            code: SigCode::Queue,
            pid,
            uid,
            payload: SigPayload::Value(value),
        }
    }

    /// tkill()-style info
    pub const fn tkill(signal: Signal, pid: Tgid, uid: Uid) -> Self {
        Self {
            signal,
            code: SigCode::Tkill,
            pid,
            uid,
            payload: SigPayload::None,
        }
    }

    /// Timer expiry info
    pub const fn timer(signal: Signal, id: u32, overrun: u32) -> Self {
        Self {
            signal,
            code: SigCode::Timer,
            pid: 0,
            uid: 0,
            payload: SigPayload::Timer { id, overrun },
        }
    }

    /// Info synthesized for a signal pending without a queue entry
    pub(crate) const fn detailless(signal: Signal) -> Self {
        Self::user(signal, 0, 0)
    }

    /// Same origin, different signal number
    pub fn with_signal(mut self, signal: Signal) -> Self {
        self.signal = signal;
        self
    }
}

/// Who is sending a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sender {
    /// Kernel-internal sender, exempt from permission checks
    Kernel,
    /// A thread of some thread group
    Thread(Tid),
}

/// Target selection rules of kill()
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PidSelector {
    /// Every process in the sender's process group
    ThisGroup,
    /// One thread group
    Pid(Tgid),
    /// Every process in the given process group
    Group(Pgid),
    /// Every process except init and the sender's own group
    Broadcast,
}

/// How `set_blocked_mask` combines the new set with the current mask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaskHow {
    Block,
    Unblock,
    SetAll,
}

/// Scope of a pending-set query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PendingTarget {
    Thread(Tid),
    Group(Tgid),
}

/// State change reported to the parent process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChildEvent {
    Stopped,
    Continued,
    Exited,
    Killed,
    Dumped,
}

/// Tracer decision after intercepting a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TracerVerdict {
    /// Deliver this signal (same or substituted)
    Deliver(Signal),
    /// Cancel delivery
    Suppress,
}

/// What the consuming thread must do next
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryDecision {
    /// Nothing deliverable; resume normal execution
    None,
    /// Run the user handler. `saved_mask` is the blocked mask to restore
    /// once the handler returns; the thread's mask has already been
    /// extended with the handler's mask.
    Handler {
        info: SignalInfo,
        handler: HandlerToken,
        flags: ActionFlags,
        saved_mask: SignalSet,
    },
    /// The thread group is going down; the thread must exit
    Terminate { signal: Signal, core_dumped: bool },
}

impl DeliveryDecision {
    /// Check if decision ends the thread
    pub fn is_fatal(&self) -> bool {
        matches!(self, DeliveryDecision::Terminate { .. })
    }

    /// Delivered signal, if any
    pub fn signal(&self) -> Option<Signal> {
        match self {
            DeliveryDecision::None => None,
            DeliveryDecision::Handler { info, .. } => Some(info.signal),
            DeliveryDecision::Terminate { signal, .. } => Some(*signal),
        }
    }
}

/// Signal statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalStats {
    pub total_signals_sent: u64,
    pub total_signals_delivered: u64,
    pub total_signals_queued: u64,
    pub total_signals_coalesced: u64,
    pub total_signals_ignored: u64,
    pub total_queue_overflows: u64,
    pub group_stops: u64,
    pub group_exits: u64,
}
