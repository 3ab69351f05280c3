//! The hawking measurement model.
//!
//! A `Point` is one time-series data point: a measurement name, a
//! nanosecond timestamp, indexed tags and typed fields. `line::render`
//! turns a `Point` into its line-protocol text. `Event` is the unit of
//! interchange between the collection source and the sinks.

use serde_json;

mod line;
mod point;

pub use self::line::render;
pub use self::point::{Point, PointError, Value};

/// The event a source hands to its sinks.
#[derive(Clone, Debug)]
pub enum Event {
    /// One raw status snapshot, exactly as fetched, plus the timestamp
    /// minted for it at collection. The receiving sink owns the document
    /// and consumes it immediately.
    Snapshot {
        /// The raw JSON document returned by the appliance.
        doc: serde_json::Value,
        /// Nanoseconds since epoch, shared by every point derived from
        /// this snapshot.
        timestamp_ns: i64,
    },
    /// Orderly stop. Sources emit this after their last snapshot so that
    /// sinks can drain and exit knowing nothing further is coming.
    Shutdown,
}

impl Event {
    /// Wrap a fetched document and its collection stamp into an `Event`.
    pub fn new_snapshot(doc: serde_json::Value, timestamp_ns: i64) -> Event {
        Event::Snapshot {
            doc: doc,
            timestamp_ns: timestamp_ns,
        }
    }
}
