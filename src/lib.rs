//! Hawking is a small telemetry exporter that watches a Pi-hole DNS
//! appliance and ships its statistics into InfluxDB. On a fixed interval --
//! and once immediately at boot -- it pulls the appliance's status API,
//! flattens the response into tagged, typed points and writes them to the
//! database's v2 write endpoint in line-protocol form, gzip compressed if
//! you ask for it.
//!
//! Hawking aims to be boring: fetch failures skip a cycle, write failures
//! drop a batch, and in both cases the poller keeps going. The only fatal
//! errors are the ones you'd want fatal, a broken configuration at startup.
//!
//! If you'd like to learn more, please do have a look in
//! our [wiki](https://github.com/postmates/hawking/wiki/).
#![allow(unknown_lints)]
#![deny(trivial_numeric_casts, missing_docs, unstable_features, unused_import_braces)]
extern crate chrono;
extern crate clap;
extern crate flate2;
extern crate hyper;
extern crate mio;
extern crate serde;
extern crate serde_json;
extern crate toml;
extern crate url;

#[macro_use]
extern crate log;

#[macro_use]
extern crate serde_derive;

#[cfg(test)]
extern crate quickcheck;

pub mod config;
pub mod constants;
pub mod metric;
pub mod protocols;
pub mod sink;
pub mod source;
pub mod time;
pub mod util;
