//! Replays a recorded stream to a UDP destination, with its original timing.
//!
//! ```bash
//! oscplay -i session.osc -o osc.udp://localhost:7770 -d 2.5
//! ```

use clap::Parser;
use log::{error, info};
use oscreplay_tools::{
    DispatchMode, Error, Output, PlaybackScheduler, PlaybackStats, SystemClock,
    network::{Destination, OscUrl},
    stream::GroupReader,
};
use std::{path::PathBuf, process::ExitCode};

/// Play a recorded stream back to an OSC destination.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// Input stream, `-` for standard input.
    #[arg(short = 'i', value_name = "FILE|-")]
    input: PathBuf,
    /// Address to send to.
    #[arg(short = 'o', value_name = "PROTOCOL://HOST:PORT")]
    output: OscUrl,
    /// Additional delay before playback starts, in seconds.
    #[arg(short = 'd', value_name = "DELAY", default_value_t = 0., value_parser = parse_delay)]
    delay: f64,
    /// Send each message in its own datagram instead of one bundle per group.
    #[arg(short = 'm')]
    per_message: bool,
}

fn parse_delay(s: &str) -> Result<f64, String> {
    let delay: f64 = s.parse().map_err(|e| format!("{e}"))?;

    if delay.is_finite() && delay >= 0. {
        Ok(delay)
    } else {
        Err("expected a non-negative number of seconds".into())
    }
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

    match play(args) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn play(args: Args) -> Result<PlaybackStats, Error> {
    let destination = Destination::connect(&args.output)?;
    let mut reader = GroupReader::new(oscreplay_tools::open_input(&args.input)?);

    let mode = if args.per_message {
        DispatchMode::Messages
    } else {
        DispatchMode::Bundle
    };

    info!(
        "playing {} to {} ({mode:?} mode, {}s delay)",
        args.input.display(),
        args.output,
        args.delay
    );

    let mut output = Output::new(destination, mode);

    PlaybackScheduler::new(SystemClock, args.delay)
        .run(&mut reader, &mut output)
        .map_err(Error::Read)
}

#[cfg(test)]
mod tests {
    use super::*;
    use oscreplay_tools::usage_exit_code;

    fn parse(args: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(["oscplay"].iter().chain(args))
    }

    #[test]
    fn delays() {
        assert_eq!(parse_delay("2.5"), Ok(2.5));
        assert_eq!(parse_delay("0"), Ok(0.));

        for bad in ["-1", "nan", "inf", "x", ""] {
            assert!(parse_delay(bad).is_err(), "{bad:?}");
        }
    }

    #[test]
    fn defaults() {
        let args = parse(&["-i", "-", "-o", "osc.udp://localhost:7770"]).unwrap();

        assert_eq!(args.input, PathBuf::from("-"));
        assert_eq!(args.output.send_addr(), ("localhost", 7770));
        assert_eq!(args.delay, 0.);
        assert!(!args.per_message);
    }

    #[test]
    fn all_options() {
        let args = parse(&["-i", "in.osc", "-o", "udp://:9", "-d", "1.25", "-m"]).unwrap();

        assert_eq!(args.delay, 1.25);
        assert!(args.per_message);
    }

    #[test]
    fn bad_arguments_exit_with_1() {
        for args in [
            &["-i", "in.osc"][..],
            &["-o", "osc.udp://localhost:7770"],
            &["-i", "in.osc", "-o", "osc.tcp://localhost:7770"],
            &["-i", "in.osc", "-o", "osc.udp://localhost:7770", "-d", "nan"],
            &["-i", "in.osc", "-o", "osc.udp://localhost:7770", "-d", "soon"],
            &[],
        ] {
            let e = parse(args).unwrap_err();
            assert_eq!(usage_exit_code(&e), 1, "{args:?}");
        }
    }

    #[test]
    fn help_and_version_exit_with_0() {
        for flag in ["--help", "--version"] {
            assert_eq!(usage_exit_code(&parse(&[flag]).unwrap_err()), 0);
        }
    }
}
