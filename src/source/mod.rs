//! Sources pull telemetry into hawking and push it toward sinks.

use mio;

mod pihole;

pub use self::pihole::{FetchError, Pihole, PiholeConfig};

/// A 'source' of events.
///
/// A source runs on its own thread, handed a `mio::Poll` whose SYSTEM
/// token registration is the shutdown side-channel: when the owner sets
/// readiness the source must wind down, forwarding `Event::Shutdown` to
/// its sinks before returning.
pub trait Source {
    /// Run the source until shutdown is signaled.
    fn run(&mut self, poll: mio::Poll) -> ();
}
