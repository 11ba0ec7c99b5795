//! Log Replay Demo
//!
//! Replays a timestamped log file, printing each event as it is delivered.
//!
//! Usage:
//!   cargo run --bin replay_demo -- --scale 10 events.log   # 10x realtime
//!   cargo run --bin replay_demo -- --simulate              # built-in sample, fake time
//!
//! Each line of the log is `<RFC 3339 timestamp> <event name>`.
//!
//! With `--simulate` nothing actually sleeps: the replay runs on a simulated
//! clock and every event "costs" as many seconds of processing as its name
//! has characters, so the reported drift shows how far processing overran.

use anyhow::{bail, Context, Result};
use chrono::TimeDelta;
use event_replay::{
    action_fn, Clock, LogEvent, LogLineSource, Replay, ReplayConfig, SimulatedClock, Source,
};
use std::env;
use std::io::BufRead;
use tracing_subscriber::EnvFilter;

const SAMPLE_LOG: &str = "2014-09-24T19:47:32-07:00 first
2014-09-24T19:47:42-07:00 second
2014-09-24T19:48:13-07:00 third";

fn print_usage() {
    println!("Log Replay Demo");
    println!();
    println!("Usage: replay_demo [--scale N] [--simulate] [FILE]");
    println!();
    println!("Options:");
    println!("  -s, --scale N    Replay speed relative to the recording");
    println!("                   (default 1, or 10 for the simulated sample)");
    println!("      --simulate   Use simulated time with per-event overhead");
    println!("  -h, --help       Show this help");
    println!();
    println!("Without FILE the built-in three-line sample is replayed.");
}

/// Scale to use when `--scale` was not given. The sample only shows overrun
/// nicely when sped up.
fn default_scale(simulate: bool, has_file: bool) -> f64 {
    if simulate && !has_file {
        10.0
    } else {
        1.0
    }
}

fn describe(ev: &LogEvent) {
    println!("Processing event named {:?} at {}", ev.name, ev.timestamp);
}

fn replay_simulated<S: Source<Event = LogEvent>>(scale: f64, source: S) -> Result<()> {
    let clock = SimulatedClock::new(chrono::Utc::now());
    let mut replay = Replay::try_with_clock(scale, clock.clone())?;

    let tm = clock.clone();
    let drift = replay.run(
        source,
        action_fn(|ev: &LogEvent| {
            // Predictable overhead: one second per character
            tm.sleep(TimeDelta::seconds(ev.name.chars().count() as i64));
            describe(ev);
        }),
    );

    println!(
        "Took {}s with final entry off by {}",
        clock.elapsed().num_milliseconds() as f64 / 1000.0,
        drift
    );
    Ok(())
}

fn replay_realtime<S: Source<Event = LogEvent>>(scale: f64, source: S) -> Result<()> {
    let mut replay = Replay::from_config(ReplayConfig::default().with_scale(scale))?;
    let started = std::time::Instant::now();

    let drift = replay.run(source, action_fn(describe));

    println!(
        "Took {:?} with final entry off by {}",
        started.elapsed(),
        drift
    );
    Ok(())
}

fn run<R: BufRead>(scale: f64, simulate: bool, mut source: LogLineSource<R>) -> Result<()> {
    if simulate {
        replay_simulated(scale, &mut source)?;
    } else {
        replay_realtime(scale, &mut source)?;
    }

    if let Some(err) = source.last_error() {
        bail!("log stopped early after {} lines: {}", source.lines_read(), err);
    }
    Ok(())
}

struct Options {
    scale: f64,
    simulate: bool,
    path: Option<String>,
}

/// Parse command-line arguments (without the program name). `None` means
/// help was requested.
fn parse_args(args: &[String]) -> Result<Option<Options>> {
    let mut scale: Option<f64> = None;
    let mut simulate = false;
    let mut path: Option<String> = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--scale" | "-s" => {
                i += 1;
                let Some(raw) = args.get(i) else {
                    bail!("--scale needs a value");
                };
                scale = Some(
                    raw.parse()
                        .with_context(|| format!("invalid scale {:?}", raw))?,
                );
            }
            "--simulate" => {
                simulate = true;
            }
            "--help" | "-h" => {
                return Ok(None);
            }
            other => {
                path = Some(other.to_string());
            }
        }
        i += 1;
    }

    Ok(Some(Options {
        scale: scale.unwrap_or_else(|| default_scale(simulate, path.is_some())),
        simulate,
        path,
    }))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let Some(opts) = parse_args(&args)? else {
        print_usage();
        return Ok(());
    };

    match opts.path {
        Some(p) => {
            let source = LogLineSource::open(&p).with_context(|| format!("opening {}", p))?;
            run(opts.scale, opts.simulate, source)
        }
        None => run(
            opts.scale,
            opts.simulate,
            LogLineSource::new(SAMPLE_LOG.as_bytes()),
        ),
    }
}
