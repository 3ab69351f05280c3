//! Sinks receive snapshots and do something lasting with them.

use metric;
use std::sync::mpsc;

mod console;
mod influxdb;

pub use self::console::{Console, ConsoleConfig};
pub use self::influxdb::{InfluxDB, InfluxDBConfig, SendError};

/// A 'sink' consumes the events a source produces.
///
/// Each sink runs on its own thread, reading the handoff channel until a
/// `Shutdown` event -- or a hangup, should the source die -- then drains
/// and exits. `deliver` handles exactly one snapshot; slow deliveries must
/// not block the source, so anything lengthy belongs on the sink's own
/// workers with `drain` waiting out the stragglers.
pub trait Sink {
    /// Ingest one snapshot and its collection stamp.
    fn deliver(&mut self, doc: &::serde_json::Value, timestamp_ns: i64) -> ();
    /// Wait, boundedly, for any in-flight work before shutdown.
    fn drain(&mut self) -> ();
    /// Receive events until shutdown, then drain.
    fn run(&mut self, recv: mpsc::Receiver<metric::Event>) {
        loop {
            match recv.recv() {
                Ok(metric::Event::Snapshot { doc, timestamp_ns }) => {
                    self.deliver(&doc, timestamp_ns)
                }
                Ok(metric::Event::Shutdown) | Err(_) => break,
            }
        }
        self.drain();
    }
}
