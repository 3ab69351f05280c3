//! The Pi-hole source: collector and scheduler in one.
//!
//! On a fixed interval -- plus one immediate run at startup -- this source
//! fetches the appliance's status API, stamps the snapshot and hands it
//! down the channel. Fetch failures skip the cycle; the next tick fires
//! regardless. The poll timeout doubles as the tick so that a shutdown
//! notification interrupts the wait instantly.

use constants;
use hyper::client::Client;
use hyper::status::StatusCode;
use metric;
use mio;
use serde_json;
use source::Source;
use std::fmt;
use std::io;
use std::io::Read;
use std::time::Duration;
use time;
use url;
use url::Url;
use util;

/// Configuration for the Pi-hole source.
#[derive(Clone, Debug, Deserialize)]
pub struct PiholeConfig {
    /// Base URL of the appliance, scheme included, no trailing slash.
    pub base_url: String,
    /// The API token passed as the `auth` query parameter.
    pub token: String,
    /// Seconds between collection cycles.
    pub interval: u64,
    /// The unique name of the source in the configuration.
    pub config_path: Option<String>,
}

impl Default for PiholeConfig {
    fn default() -> PiholeConfig {
        PiholeConfig {
            base_url: "http://127.0.0.1".to_string(),
            token: "".to_string(),
            interval: constants::DEFAULT_INTERVAL_SECS,
            config_path: None,
        }
    }
}

/// The ways one collection cycle can fail. None of these is fatal; the
/// cycle is skipped and the next tick proceeds.
#[derive(Debug)]
pub enum FetchError {
    /// The request could not be made or timed out.
    Http(::hyper::Error),
    /// The appliance answered with something other than 200.
    Status(StatusCode),
    /// The response body could not be read.
    Read(io::Error),
    /// The response body was not JSON.
    Parse(serde_json::Error),
    /// The response parsed but held no entries, which is what the
    /// appliance serves when the auth token is wrong.
    Empty,
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            FetchError::Http(ref e) => write!(f, "request failed: {}", e),
            FetchError::Status(ref s) => write!(f, "appliance answered {}", s),
            FetchError::Read(ref e) => write!(f, "could not read body: {}", e),
            FetchError::Parse(ref e) => write!(f, "body is not JSON: {}", e),
            FetchError::Empty => write!(f, "response held no entries"),
        }
    }
}

/// The Pi-hole source.
pub struct Pihole {
    chans: util::Channel,
    url: Url,
    client: Client,
    interval: u64,
}

impl Pihole {
    /// Create a new Pihole source.
    ///
    /// The status URL is built here, once: `<base_url>/admin/api.php` with
    /// the auth token and the section-selecting query flags. A base URL
    /// that will not parse is a configuration error and fatal.
    pub fn new(chans: util::Channel, config: PiholeConfig) -> Result<Pihole, url::ParseError> {
        let mut url = Url::parse(&format!("{}/admin/api.php", config.base_url))?;
        url.query_pairs_mut()
            .append_pair("auth", &config.token)
            .append_pair("summaryRaw", "")
            .append_pair("overTimeData", "")
            .append_pair("topItems", "")
            .append_pair("recentItems", "")
            .append_pair("getQueryTypes", "")
            .append_pair("getForwardDestinations", "")
            .append_pair("getQuerySources", "")
            .append_pair("jsonForceObject", "");
        let mut client = Client::new();
        client.set_read_timeout(Some(Duration::from_secs(10)));
        client.set_write_timeout(Some(Duration::from_secs(10)));
        Ok(Pihole {
            chans: chans,
            url: url,
            client: client,
            interval: config.interval,
        })
    }

    /// Fetch one raw snapshot from the appliance.
    pub fn fetch(&self) -> Result<serde_json::Value, FetchError> {
        let mut res = self.client
            .get(self.url.clone())
            .send()
            .map_err(FetchError::Http)?;
        if res.status != StatusCode::Ok {
            return Err(FetchError::Status(res.status));
        }
        let mut body = String::new();
        res.read_to_string(&mut body).map_err(FetchError::Read)?;
        let doc: serde_json::Value =
            serde_json::from_str(&body).map_err(FetchError::Parse)?;
        match doc.as_object() {
            Some(obj) if !obj.is_empty() => {}
            _ => return Err(FetchError::Empty),
        }
        Ok(doc)
    }

    fn cycle(&mut self) {
        match self.fetch() {
            Ok(doc) => {
                util::send(
                    &mut self.chans,
                    metric::Event::new_snapshot(doc, time::now_ns()),
                );
                info!("snapshot collected");
            }
            Err(e) => {
                warn!("fetch failed, cycle skipped: {}", e);
            }
        }
    }
}

impl Source for Pihole {
    fn run(&mut self, poll: mio::Poll) {
        let mut events = mio::Events::with_capacity(64);
        // one cycle right away; the interval gates the rest
        self.cycle();
        loop {
            match poll.poll(&mut events, Some(Duration::from_secs(self.interval))) {
                Ok(0) => self.cycle(),
                Ok(_num_events) => {
                    for event in events.iter() {
                        match event.token() {
                            constants::SYSTEM => {
                                info!("shutdown signaled, collection stopped");
                                util::send(&mut self.chans, metric::Event::Shutdown);
                                return;
                            }
                            _ => unreachable!(),
                        }
                    }
                }
                Err(e) => panic!("Failed during poll {:?}", e),
            }
        }
    }
}
