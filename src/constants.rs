//! Library level constants
use mio;

/// MIO token used to distinguish system events -- shutdown, at present --
/// from other event sources.
pub const SYSTEM: mio::Token = mio::Token(2048);

/// Seconds between collection cycles when the configuration does not say
/// otherwise.
pub const DEFAULT_INTERVAL_SECS: u64 = 60;

/// Milliseconds a sink will wait for in-flight deliveries once shutdown has
/// been signaled. Deliveries still outstanding at the deadline are
/// abandoned.
pub const DRAIN_GRACE_MILLIS: u64 = 1_000;
