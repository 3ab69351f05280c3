//! Provides the CLI option parser
//!
//! Used to parse the argv/config file into a struct that
//! the exporter can consume and use as configuration data.

use clap::{App, Arg};
use constants;
use sink::{ConsoleConfig, InfluxDBConfig};
use source::PiholeConfig;
use std::fs::File;
use std::io::Read;
use toml;

const VERSION: Option<&'static str> = option_env!("CARGO_PKG_VERSION");

fn default_version() -> String {
    VERSION.unwrap_or("unknown").to_string()
}

/// Configuration struct for the hawking executable
///
/// This struct is what we construct from parsing the hawking
/// configuration. It is not intended to be created by external clients.
/// Please see documentation on `parse_args` in this module for more
/// details.
#[derive(Debug)]
pub struct Args {
    /// The seconds between collection cycles.
    pub interval: u64,
    /// The verbosity setting of hawking. The higher the value the more
    /// chatty hawking gets.
    pub verbose: u64,
    /// Hawking version string. This is set automatically.
    pub version: String,
    /// See `source::Pihole` for more.
    pub pihole: Option<PiholeConfig>,
    /// See `sink::InfluxDB` for more.
    pub influxdb: Option<InfluxDBConfig>,
    /// See `sink::Console` for more.
    pub console: Option<ConsoleConfig>,
}

impl Default for Args {
    fn default() -> Self {
        Args {
            interval: constants::DEFAULT_INTERVAL_SECS,
            verbose: 0,
            version: default_version(),
            pihole: None,
            influxdb: None,
            console: None,
        }
    }
}

/// Parse the hawking configuration arguments
///
/// This function will read the environment arguments and construct an
/// `Args`. Most hawking configuration is stored in an on-disk file. See
/// `hawking --help` for more information.
pub fn parse_args() -> Args {
    let args = App::new("hawking")
        .version(VERSION.unwrap_or("unknown"))
        .author("Brian L. Troutwine <blt@postmates.com>")
        .about("ships Pi-hole telemetry into InfluxDB")
        .arg(
            Arg::with_name("config-file")
                .long("config")
                .short("C")
                .value_name("config")
                .required(true)
                .help("The config file to feed in.")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .multiple(true)
                .help("Turn on verbose output."),
        )
        .get_matches();

    let verb = if args.is_present("verbose") {
        args.occurrences_of("verbose")
    } else {
        0
    };

    if let Some(filename) = args.value_of("config-file") {
        let mut fp = match File::open(filename) {
            Err(e) => panic!("Could not open file {} with error {}", filename, e),
            Ok(fp) => fp,
        };

        let mut buffer = String::new();
        fp.read_to_string(&mut buffer).unwrap();
        parse_config_file(&buffer, verb)
    } else {
        unreachable!();
    }
}

/// Parse the hawking configuration file.
///
/// The file is toml. `[sources.pihole]` is mandatory, as is at least one
/// sink; tokens and the InfluxDB org/bucket are mandatory within their
/// sections. The `host_tag` of a sink falls back to the Pi-hole base URL
/// when not given, which keeps points tellable-apart once a second
/// appliance shows up in the same bucket.
pub fn parse_config_file(buffer: &str, verbosity: u64) -> Args {
    let mut args = Args::default();
    let value: toml::Value =
        toml::from_str(buffer).expect("could not parse config file");

    args.verbose = verbosity;

    args.interval = value
        .get("interval")
        .map(|i| i.as_integer().expect("could not parse interval") as u64)
        .unwrap_or(args.interval);

    if let Some(sources) = value.get("sources") {
        args.pihole = sources.get("pihole").map(|src| {
            let mut res = PiholeConfig::default();
            res.config_path = Some("sources.pihole".to_string());
            res.interval = args.interval;

            res.base_url = src.get("base_url")
                .map(|p| {
                    p.as_str()
                        .expect("could not parse sources.pihole.base_url")
                        .to_string()
                })
                .unwrap_or(res.base_url);

            res.token = src.get("token")
                .expect("sources.pihole.token is required")
                .as_str()
                .expect("could not parse sources.pihole.token")
                .to_string();

            res
        });
    }

    let host_tag_fallback = args.pihole
        .as_ref()
        .map(|p| p.base_url.clone())
        .unwrap_or_else(|| "".to_string());

    if let Some(sinks) = value.get("sinks") {
        args.influxdb = sinks.get("influxdb").map(|snk| {
            let mut res = InfluxDBConfig::default();
            res.config_path = Some("sinks.influxdb".to_string());

            res.base_url = snk.get("base_url")
                .map(|p| {
                    p.as_str()
                        .expect("could not parse sinks.influxdb.base_url")
                        .to_string()
                })
                .unwrap_or(res.base_url);

            res.token = snk.get("token")
                .expect("sinks.influxdb.token is required")
                .as_str()
                .expect("could not parse sinks.influxdb.token")
                .to_string();

            res.org = snk.get("org")
                .expect("sinks.influxdb.org is required")
                .as_str()
                .expect("could not parse sinks.influxdb.org")
                .to_string();

            res.bucket = snk.get("bucket")
                .expect("sinks.influxdb.bucket is required")
                .as_str()
                .expect("could not parse sinks.influxdb.bucket")
                .to_string();

            res.gzip = snk.get("gzip")
                .map(|p| p.as_bool().expect("could not parse sinks.influxdb.gzip"))
                .unwrap_or(res.gzip);

            res.host_tag = snk.get("host_tag")
                .map(|p| {
                    p.as_str()
                        .expect("could not parse sinks.influxdb.host_tag")
                        .to_string()
                })
                .unwrap_or_else(|| host_tag_fallback.clone());

            res
        });

        args.console = sinks.get("console").map(|snk| {
            let mut res = ConsoleConfig {
                host_tag: "".to_string(),
                config_path: Some("sinks.console".to_string()),
            };

            res.host_tag = snk.get("host_tag")
                .map(|p| {
                    p.as_str()
                        .expect("could not parse sinks.console.host_tag")
                        .to_string()
                })
                .unwrap_or_else(|| host_tag_fallback.clone());

            res
        });
    }

    args
}
