//! Records OSC traffic received on a UDP port to a stream.
//!
//! ```bash
//! oscrec -i osc.udp://:7770 -o session.osc
//! ```
//!
//! Runs until interrupted (SIGINT, SIGTERM, SIGHUP or SIGQUIT).

use clap::Parser;
use core::{
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};
use log::{error, info};
use oscreplay_tools::{
    Error, GroupAggregator, RecordingStats, SystemClock,
    network::{Listener, OscUrl},
    stream::GroupWriter,
};
use std::{path::PathBuf, process::ExitCode, sync::Arc};

/// How often the main thread checks for shutdown.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Record OSC messages to a stream file.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// Address to listen on.
    #[arg(short = 'i', value_name = "PROTOCOL://HOST:PORT")]
    input: OscUrl,
    /// Output stream, `-` for standard output.
    #[arg(short = 'o', value_name = "FILE|-")]
    output: PathBuf,
}

fn main() -> ExitCode {
    oscreplay_tools::init_logging();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(oscreplay_tools::usage_exit_code(&e));
        }
    };

    match record(args) {
        Ok(stats) => {
            info!(
                "recorded {} group(s), {} message(s)",
                stats.groups, stats.messages
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

const SHUTDOWN_SIGNALS: [i32; 4] = [
    signal_hook::consts::SIGINT,
    signal_hook::consts::SIGTERM,
    signal_hook::consts::SIGHUP,
    signal_hook::consts::SIGQUIT,
];

/// Makes every shutdown signal raise `flag`.
///
/// A second signal, received while `flag` is already raised, terminates the
/// process with exit code 1, in case the first one couldn't stop it.
fn register_shutdown_signals(flag: &Arc<AtomicBool>) -> std::io::Result<()> {
    for signal in SHUTDOWN_SIGNALS {
        // order matters: the conditional shutdown must see the flag before it's set
        signal_hook::flag::register_conditional_shutdown(signal, 1, Arc::clone(flag))?;
        signal_hook::flag::register(signal, Arc::clone(flag))?;
    }

    Ok(())
}

fn record(args: Args) -> Result<RecordingStats, Error> {
    let listener = Listener::bind(&args.input)?;
    let output = oscreplay_tools::open_output(&args.output)?;

    let shutdown = Arc::new(AtomicBool::new(false));
    register_shutdown_signals(&shutdown).map_err(Error::Signals)?;

    info!("recording from {}", args.input);

    let receiver = std::thread::spawn({
        let shutdown = Arc::clone(&shutdown);

        move || {
            let mut aggregator = GroupAggregator::new(GroupWriter::new(output), SystemClock);
            let res = listener.run(&mut aggregator, &shutdown);

            // whatever stopped the loop, keep what was stored so far
            let finished = aggregator.finish();

            res.map_err(Error::Receive)?;
            finished.map(|(stats, _)| stats).map_err(Error::Write)
        }
    });

    while !shutdown.load(Ordering::Relaxed) && !receiver.is_finished() {
        std::thread::sleep(POLL_INTERVAL);
    }

    info!("cleaning up");
    shutdown.store(true, Ordering::Relaxed);

    receiver.join().map_err(|_| Error::ReceiveThread)?
}
