//! The InfluxDB sink.
//!
//! Each snapshot is transformed into points, rendered to line protocol and
//! shipped as one batch to the database's v2 write endpoint. Shipping runs
//! on a small pool of sender threads behind a bounded queue so that a slow
//! or absent database can never hold up the collection tick; when the
//! queue is full the freshest batch is dropped with a complaint. The
//! database answers 204 when it accepted a write, anything else is a
//! failed batch. Hawking does not retry: the next snapshot supersedes the
//! lost one anyway.

use constants;
use flate2::Compression;
use flate2::write::GzEncoder;
use hyper::client::Client;
use hyper::header::{Authorization, ContentEncoding, ContentType, Encoding, Headers};
use hyper::status::StatusCode;
use metric;
use protocols::pihole;
use serde_json;
use sink::Sink;
use std::fmt;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use url;
use url::Url;

/// How many sender threads ship batches concurrently.
const SENDERS: usize = 4;
/// How many rendered batches may wait for a sender before overflow drops
/// the newest.
const PENDING_BATCHES: usize = 8;

/// Configuration for the InfluxDB sink.
#[derive(Clone, Debug, Deserialize)]
pub struct InfluxDBConfig {
    /// Base URL of the database, scheme included, no trailing slash.
    pub base_url: String,
    /// The API token, sent as `Authorization: Token <token>`.
    pub token: String,
    /// The organization to write into.
    pub org: String,
    /// The bucket to write into.
    pub bucket: String,
    /// Whether to gzip the request body.
    pub gzip: bool,
    /// Value of the `pi_hole_host` tag stamped on every point, telling
    /// apart appliances that share a bucket.
    pub host_tag: String,
    /// The unique name of the sink in the configuration.
    pub config_path: Option<String>,
}

impl Default for InfluxDBConfig {
    fn default() -> InfluxDBConfig {
        InfluxDBConfig {
            base_url: "http://localhost:8086".to_string(),
            token: "".to_string(),
            org: "".to_string(),
            bucket: "".to_string(),
            gzip: false,
            host_tag: "".to_string(),
            config_path: None,
        }
    }
}

/// The ways a batch write can fail. The batch is logged and dropped in
/// either case; nothing here is fatal to the process.
#[derive(Debug)]
pub enum SendError {
    /// The request could not be made or timed out.
    Http(::hyper::Error),
    /// The body could not be compressed.
    Gzip(::std::io::Error),
    /// The database answered with something other than 204 No Content.
    Status {
        /// The status the database answered with.
        status: StatusCode,
        /// How many lines the rejected batch held.
        lines: usize,
    },
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            SendError::Http(ref e) => write!(f, "write request failed: {}", e),
            SendError::Gzip(ref e) => write!(f, "gzip failed: {}", e),
            SendError::Status { ref status, lines } => write!(
                f,
                "database answered {} instead of 204 for a {} line batch",
                status, lines
            ),
        }
    }
}

/// The write endpoint, built once at startup and shared read-only by every
/// sender thread.
struct Publisher {
    url: Url,
    auth: String,
    gzip: bool,
    client: Client,
}

impl Publisher {
    fn new(config: &InfluxDBConfig) -> Result<Publisher, url::ParseError> {
        let mut url = Url::parse(&format!("{}/api/v2/write", config.base_url))?;
        url.query_pairs_mut()
            .append_pair("org", &config.org)
            .append_pair("bucket", &config.bucket)
            .append_pair("precision", "ns");
        let mut client = Client::new();
        client.set_read_timeout(Some(Duration::from_secs(5)));
        client.set_write_timeout(Some(Duration::from_secs(5)));
        Ok(Publisher {
            url: url,
            auth: format!("Token {}", config.token),
            gzip: config.gzip,
            client: client,
        })
    }

    /// Ship one newline-joined batch. Success is precisely a 204 answer.
    fn send(&self, batch: &str) -> Result<(), SendError> {
        let lines = batch.lines().count();
        let mut headers = Headers::new();
        headers.set(ContentType::plaintext());
        headers.set(Authorization(self.auth.clone()));

        let res = if self.gzip {
            let mut enc = GzEncoder::new(
                Vec::with_capacity(batch.len() / 4),
                Compression::default(),
            );
            enc.write_all(batch.as_bytes()).map_err(SendError::Gzip)?;
            let body = enc.finish().map_err(SendError::Gzip)?;
            headers.set(ContentEncoding(vec![Encoding::Gzip]));
            self.client
                .post(self.url.clone())
                .headers(headers)
                .body(&body[..])
                .send()
                .map_err(SendError::Http)?
        } else {
            self.client
                .post(self.url.clone())
                .headers(headers)
                .body(batch)
                .send()
                .map_err(SendError::Http)?
        };

        if res.status != StatusCode::NoContent {
            return Err(SendError::Status {
                status: res.status,
                lines: lines,
            });
        }
        Ok(())
    }
}

/// The InfluxDB sink struct.
///
/// Refer to the documentation on `InfluxDBConfig` for more details.
pub struct InfluxDB {
    host_tag: String,
    batches: mpsc::SyncSender<String>,
    in_flight: Arc<AtomicUsize>,
}

impl InfluxDB {
    /// Construct a new InfluxDB sink.
    ///
    /// The write URL and HTTP client are built here, exactly once, and
    /// shared by the sender pool for the life of the process. A base URL
    /// that will not parse is a configuration error and fatal.
    pub fn new(config: InfluxDBConfig) -> Result<InfluxDB, url::ParseError> {
        let publisher = Arc::new(Publisher::new(&config)?);
        let in_flight = Arc::new(AtomicUsize::new(0));
        let (batch_snd, batch_recv) = mpsc::sync_channel::<String>(PENDING_BATCHES);
        let batch_recv = Arc::new(Mutex::new(batch_recv));

        // Sender threads exit on their own once the batch channel
        // disconnects; nothing joins them.
        for _ in 0..SENDERS {
            let publisher = Arc::clone(&publisher);
            let in_flight = Arc::clone(&in_flight);
            let batch_recv = Arc::clone(&batch_recv);
            thread::spawn(move || loop {
                let batch = {
                    let guard = batch_recv.lock().expect("sender pool poisoned");
                    match guard.recv() {
                        Ok(batch) => batch,
                        Err(_) => return,
                    }
                };
                match publisher.send(&batch) {
                    Ok(()) => {
                        debug!("batch of {} lines delivered", batch.lines().count())
                    }
                    Err(e) => error!("batch dropped: {}", e),
                }
                in_flight.fetch_sub(1, Ordering::Release);
            });
        }

        Ok(InfluxDB {
            host_tag: config.host_tag,
            batches: batch_snd,
            in_flight: in_flight,
        })
    }

    /// Render a harvest to one newline-joined body. Field-less points
    /// render empty and are omitted.
    fn body(points: &[metric::Point]) -> String {
        let mut body = String::with_capacity(points.len() * 128);
        for pnt in points {
            let line = metric::render(pnt);
            if line.is_empty() {
                continue;
            }
            if !body.is_empty() {
                body.push('\n');
            }
            body.push_str(&line);
        }
        body
    }
}

impl Sink for InfluxDB {
    fn deliver(&mut self, doc: &serde_json::Value, timestamp_ns: i64) {
        let harvest =
            match pihole::parse_snapshot(doc, &self.host_tag, timestamp_ns) {
                Ok(harvest) => harvest,
                Err(e) => {
                    warn!("snapshot discarded: {}", e);
                    return;
                }
            };
        if harvest.skipped > 0 {
            warn!("{} malformed rows skipped this cycle", harvest.skipped);
        }
        let body = InfluxDB::body(&harvest.points);
        if body.is_empty() {
            warn!("nothing renderable this cycle, no write attempted");
            return;
        }
        let lines = body.lines().count();

        self.in_flight.fetch_add(1, Ordering::Acquire);
        match self.batches.try_send(body) {
            Ok(()) => trace!("batch of {} lines queued", lines),
            Err(mpsc::TrySendError::Full(_)) => {
                self.in_flight.fetch_sub(1, Ordering::Release);
                error!(
                    "senders saturated, dropping batch of {} lines",
                    lines
                );
            }
            Err(mpsc::TrySendError::Disconnected(_)) => {
                self.in_flight.fetch_sub(1, Ordering::Release);
                error!("sender pool has hung up, dropping batch");
            }
        }
    }

    fn drain(&mut self) {
        let deadline = Instant::now()
            + Duration::from_millis(constants::DRAIN_GRACE_MILLIS);
        while self.in_flight.load(Ordering::Acquire) != 0 {
            if Instant::now() >= deadline {
                warn!(
                    "drain grace expired, abandoning {} in-flight batches",
                    self.in_flight.load(Ordering::Acquire)
                );
                return;
            }
            thread::sleep(Duration::from_millis(10));
        }
        debug!("all batches drained");
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use flate2::read::GzDecoder;
    use metric::Point;
    use std::io::Read;

    #[test]
    fn write_url_carries_org_bucket_precision() {
        let config = InfluxDBConfig {
            base_url: "http://influx.example.com:8086".to_string(),
            org: "homelab".to_string(),
            bucket: "pihole".to_string(),
            token: "hunter2".to_string(),
            ..InfluxDBConfig::default()
        };
        let publisher = Publisher::new(&config).unwrap();

        assert_eq!("/api/v2/write", publisher.url.path());
        let query: Vec<(String, String)> = publisher
            .url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(query.contains(&("org".to_string(), "homelab".to_string())));
        assert!(query.contains(&("bucket".to_string(), "pihole".to_string())));
        assert!(query.contains(&("precision".to_string(), "ns".to_string())));
        assert_eq!("Token hunter2", publisher.auth);
    }

    #[test]
    fn unparsable_base_url_is_fatal() {
        let config = InfluxDBConfig {
            base_url: "definitely not a url".to_string(),
            ..InfluxDBConfig::default()
        };
        assert!(Publisher::new(&config).is_err());
    }

    #[test]
    fn body_joins_lines_and_omits_empty_renders() {
        let mut with_fields = Point::new("pi_hole", 10101);
        with_fields.add_int_field("ads_blocked_today", 5).unwrap();
        let mut another = Point::new("pi_hole_gravity", 10101);
        another.add_int_field("updated", 7).unwrap();
        let field_less = Point::new("pi_hole", 10101);

        let body = InfluxDB::body(&[
            with_fields,
            field_less,
            another,
        ]);
        assert_eq!(
            "pi_hole ads_blocked_today=5i 10101\n\
             pi_hole_gravity updated=7i 10101",
            body
        );
    }

    #[test]
    fn rejected_write_reports_status_and_line_count() {
        let err = SendError::Status {
            status: StatusCode::InternalServerError,
            lines: 14,
        };
        assert_eq!(
            "database answered 500 Internal Server Error instead of 204 \
             for a 14 line batch",
            format!("{}", err)
        );
    }

    #[test]
    fn gzip_round_trips() {
        let batch = "pi_hole ads_blocked_today=5i 10101";
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(batch.as_bytes()).unwrap();
        let compressed = enc.finish().unwrap();

        let mut decoder = GzDecoder::new(&compressed[..]);
        let mut round_tripped = String::new();
        decoder.read_to_string(&mut round_tripped).unwrap();
        assert_eq!(batch, round_tripped);
    }
}
