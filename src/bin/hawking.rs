#![allow(unknown_lints)]

extern crate chan_signal;
extern crate chrono;
extern crate fern;
extern crate hawking;
extern crate mio;

#[macro_use]
extern crate log;

use chan_signal::Signal;
use chrono::Utc;
use hawking::constants;
use hawking::sink::Sink;
use hawking::source::Source;
use hawking::util;
use std::mem;
use std::process;
use std::sync::mpsc;
use std::thread;

#[derive(Debug)]
struct SourceWorker {
    thread: thread::JoinHandle<()>,
    readiness: mio::SetReadiness,
}

fn main() {
    let mut args = hawking::config::parse_args();

    let level = match args.verbose {
        0 => log::LevelFilter::Error,
        1 => log::LevelFilter::Warn,
        2 => log::LevelFilter::Info,
        3 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    // Signal registration must happen before any thread spawns, else the
    // spawned threads race us for delivery.
    let signal = chan_signal::notify(&[Signal::INT, Signal::TERM]);

    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}][{}][{}] {}",
                record.target(),
                record.line().unwrap_or(0),
                Utc::now().to_rfc3339(),
                record.level(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stdout())
        .apply()
        .expect("could not set up logging");

    info!("hawking - {}", args.version);

    // Sinks drain the handoff channel; the source fills it. Shutdown runs
    // the same path in miniature: the source is told to stop via its mio
    // readiness, forwards a Shutdown event to bookend the queue, and each
    // sink drains within its grace period once the bookend arrives.
    let mut sinks: Vec<thread::JoinHandle<()>> = Vec::new();
    let mut chans: util::Channel = Vec::new();

    if let Some(config) = mem::replace(&mut args.influxdb, None) {
        let (send, recv) = mpsc::sync_channel(0);
        chans.push(send);
        sinks.push(thread::spawn(move || {
            match hawking::sink::InfluxDB::new(config) {
                Ok(mut snk) => {
                    snk.run(recv);
                }
                Err(e) => {
                    error!("Configuration error for InfluxDB: {}", e);
                    process::exit(1);
                }
            }
        }));
    }
    if let Some(config) = mem::replace(&mut args.console, None) {
        let (send, recv) = mpsc::sync_channel(0);
        chans.push(send);
        sinks.push(thread::spawn(move || {
            hawking::sink::Console::new(&config).run(recv);
        }));
    }
    if chans.is_empty() {
        error!("No sinks configured, nothing to do");
        process::exit(1);
    }

    let pihole_config = match mem::replace(&mut args.pihole, None) {
        Some(config) => config,
        None => {
            error!("No [sources.pihole] configured, nothing to collect");
            process::exit(1);
        }
    };

    let poll = mio::Poll::new().unwrap();
    let (registration, readiness) = mio::Registration::new2();
    let source_worker = SourceWorker {
        readiness: readiness,
        thread: thread::spawn(move || {
            poll.register(
                &registration,
                constants::SYSTEM,
                mio::Ready::readable(),
                mio::PollOpt::edge(),
            ).expect("Poll failed to return a result!");
            match hawking::source::Pihole::new(chans, pihole_config) {
                Ok(mut src) => {
                    src.run(poll);
                }
                Err(e) => {
                    error!("Configuration error for Pi-hole: {}", e);
                    process::exit(1);
                }
            }
        }),
    };

    let sig = signal.recv().expect("signal channel has hung up");
    info!("{:?} received, shutting down", sig);

    // A second signal while draining means the operator has run out of
    // patience. Oblige immediately.
    let impatience = signal.clone();
    thread::spawn(move || {
        if impatience.recv().is_some() {
            error!("second signal received, exiting immediately");
            process::exit(1);
        }
    });

    source_worker
        .readiness
        .set_readiness(mio::Ready::readable())
        .expect("Failed to set readiness!");
    source_worker.thread.join().expect("Failed during join!");

    for sink in sinks {
        sink.join().expect("Failed during join!");
    }
}
