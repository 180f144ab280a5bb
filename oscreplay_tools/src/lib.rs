//! Recording and timed playback of OSC message streams.
//!
//! - [`GroupAggregator`] receives transport events and stores them as groups,
//!   one flushed record at a time.
//! - [`PlaybackScheduler`] reads a stored stream back, maps every recorded
//!   timestamp onto the wall clock and dispatches each group once it is due.
//!
//! The `oscrec` and `oscplay` binaries wire these to UDP sockets, files and
//! standard I/O.
//!
//! ## Timing
//!
//! On playback, the first timestamped group read fixes a constant offset
//! between recorded time and wall-clock time (plus an optional delay). Every
//! group is then sent at `timestamp + offset`, preserving the relative timing of
//! the recording exactly. Scheduling is best-effort: groups are never skipped or
//! reordered to catch up.

pub mod clock;
pub mod player;
pub mod recorder;

pub use oscreplay_network as network;
pub use oscreplay_proto as proto;
pub use oscreplay_stream as stream;

pub use clock::{Clock, SystemClock};
pub use player::{
    Dispatch, DispatchMode, Output, PlaybackScheduler, PlaybackSession, PlaybackState,
    PlaybackStats, compute_offset,
};
pub use recorder::{GroupAggregator, RecordingStats};

use std::{fs, io, path::Path};

/// Path standing for standard input or output.
pub const STDIO_PATH: &str = "-";

/// Fatal errors of the command line tools.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Network(#[from] network::NetworkError),
    #[error("cannot open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("cannot read the stream: {0}")]
    Read(#[source] io::Error),
    #[error("cannot write the stream: {0}")]
    Write(#[source] io::Error),
    #[error("cannot install signal handlers: {0}")]
    Signals(#[source] io::Error),
    #[error("receive loop failed: {0}")]
    Receive(#[source] io::Error),
    #[error("receive thread panicked")]
    ReceiveThread,
}

/// Opens `path` for reading, `-` being standard input.
pub fn open_input(path: &Path) -> Result<Box<dyn io::Read + Send>, Error> {
    if path == Path::new(STDIO_PATH) {
        return Ok(Box::new(io::stdin()));
    }

    fs::File::open(path)
        .map(|f| Box::new(f) as Box<dyn io::Read + Send>)
        .map_err(|source| Error::Open {
            path: path.display().to_string(),
            source,
        })
}

/// Creates (or truncates) `path` for writing, `-` being standard output.
pub fn open_output(path: &Path) -> Result<Box<dyn io::Write + Send>, Error> {
    if path == Path::new(STDIO_PATH) {
        return Ok(Box::new(io::BufWriter::new(io::stdout())));
    }

    fs::File::create(path)
        .map(|f| Box::new(io::BufWriter::new(f)) as Box<dyn io::Write + Send>)
        .map_err(|source| Error::Open {
            path: path.display().to_string(),
            source,
        })
}

/// Exit status for a command line that failed to parse.
///
/// `--help` and `--version` exit with 0, every usage error with 1.
#[inline]
pub fn usage_exit_code(e: &clap::Error) -> u8 {
    if e.use_stderr() { 1 } else { 0 }
}

/// Initializes logging to standard error, at `info` level unless `RUST_LOG` says otherwise.
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();
}
