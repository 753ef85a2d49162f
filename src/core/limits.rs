/*!
 * System Limits and Constants
 *
 * Centralized location for signal numbering limits and queue sizing.
 *
 * ## Design Philosophy
 * - Linux-compatible values are marked with [LINUX-COMPAT]
 * - Resource limits are marked with [SECURITY]
 */

// =============================================================================
// SIGNAL NUMBERING
// =============================================================================

/// Number of signal slots (signals are numbered 1..=NSIG)
/// [LINUX-COMPAT] Matches _NSIG on 64-bit Linux
pub const NSIG: u32 = 64;

/// First real-time signal number
/// [LINUX-COMPAT] Kernel-side SIGRTMIN (libc reserves a few above it)
pub const SIGRTMIN: u32 = 32;

/// Last real-time signal number
pub const SIGRTMAX: u32 = NSIG;

// =============================================================================
// SIGNAL QUEUE LIMITS
// =============================================================================

/// Default per-sender cap on queued signal entries (128 entries)
/// [LINUX-COMPAT] Matches typical Linux signal queue depth
/// [SECURITY] Bounds memory a single user can pin with sigqueue-style sends
pub const DEFAULT_SIGQUEUE_QUOTA: usize = 128;

/// Thread group ID of the init process, never targeted by broadcast sends
pub const INIT_TGID: u32 = 1;
