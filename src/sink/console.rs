//! The console sink.
//!
//! Intended for demonstration and for eyeballing what a snapshot turns
//! into before pointing hawking at a real database: every snapshot is
//! transformed and its line-protocol text printed to stdout, one line per
//! point.

use protocols::pihole;
use serde_json;
use sink::Sink;
use metric;

/// The console sink struct.
pub struct Console {
    host_tag: String,
}

/// Configuration for the `Console` sink.
#[derive(Clone, Debug, Deserialize)]
pub struct ConsoleConfig {
    /// Value of the `pi_hole_host` tag stamped on every point.
    pub host_tag: String,
    /// The unique name of the sink in the configuration.
    pub config_path: Option<String>,
}

impl Console {
    /// Create a new Console sink.
    pub fn new(config: &ConsoleConfig) -> Console {
        Console {
            host_tag: config.host_tag.clone(),
        }
    }
}

impl Sink for Console {
    fn deliver(&mut self, doc: &serde_json::Value, timestamp_ns: i64) {
        let harvest =
            match pihole::parse_snapshot(doc, &self.host_tag, timestamp_ns) {
                Ok(harvest) => harvest,
                Err(e) => {
                    warn!("snapshot discarded: {}", e);
                    return;
                }
            };
        for pnt in &harvest.points {
            let line = metric::render(pnt);
            if !line.is_empty() {
                println!("{}", line);
            }
        }
    }

    fn drain(&mut self) {
        // nothing in flight, intentionally
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json;

    #[test]
    fn deliver_tolerates_garbage() {
        let mut console = Console::new(&ConsoleConfig {
            host_tag: "pi.local".to_string(),
            config_path: None,
        });
        let doc: serde_json::Value = serde_json::from_str("[]").unwrap();
        console.deliver(&doc, 10101);
    }
}
