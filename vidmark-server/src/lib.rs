//! # Vidmark Server
//!
//! Video marker session: a loopback media server plus a mark timeline.
//!
//! This crate provides:
//! - A byte-range HTTP server that hands one local video to a player
//! - Port allocation within a configurable loopback range
//! - A session controller (open, mark, undo, list, save)
//! - CSV export of marks and subtitle tables
//!
//! ## Architecture
//!
//! The server is built on top of [`vidmark_core`] for the pure timeline,
//! range and naming logic, with [`tokio`] and [`axum`] doing the I/O.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                    vidmark-server                    │
//! │  ┌──────────────┐        ┌─────────────────────────┐ │
//! │  │ Console      │ ─────▶ │ SessionController       │ │
//! │  │ (stdin/JSON) │        │  - MarkTimeline         │ │
//! │  └──────────────┘        │  - session timestamp    │ │
//! │                          │  - Option<MediaServer>  │ │
//! │                          └──────┬──────────────────┘ │
//! │                                 │                    │
//! │              ┌──────────────────┴───────┐            │
//! │              ▼                          ▼            │
//! │  ┌──────────────────────┐   ┌──────────────────────┐ │
//! │  │ MediaServer (axum)   │   │ storage (csv)        │ │
//! │  │  127.0.0.1:8000-8999 │   │  timestamp_seconds   │ │
//! │  └──────────────────────┘   └──────────────────────┘ │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example: Driving a Session
//!
//! ```rust,no_run
//! use vidmark_server::{SessionController, SessionSettings};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut session = SessionController::new(SessionSettings::default());
//!     let source = session.open_video("/videos/case12.mp4").await.unwrap();
//!     println!("play {}", source.url);
//!
//!     session.mark(12.4);
//!     let summary = session.save(None, Some("attending"), Some("Smith")).unwrap();
//!     println!("saved {} marks to {}", summary.count, summary.saved_to.display());
//!
//!     session.shutdown().await;
//! }
//! ```
//!
//! ## Command-Line Interface
//!
//! See [`Cli`] for all available options. Key options:
//!
//! - `--open` - Video to serve at startup
//! - `-o, --output` - Base path for exports (default: `~/Desktop/marks.csv`)
//! - `--port-low`, `--port-high` - Loopback port range (default: 8000-8999)
//! - `-v` - Increase verbosity (use multiple times)
//! - `subtitles <FILE>` - Convert an SRT file to CSV and exit

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod config;
pub mod console;
pub mod error;
pub mod port;
pub mod session;
pub mod storage;
pub mod web;

pub use console::{Console, Outcome};
pub use error::SessionError;
pub use port::PortAllocator;
pub use session::{ExportSummary, Reply, SessionController, SessionSettings, SessionStatus};
pub use web::{MediaFile, MediaServer, MediaSource};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Clone, Debug)]
#[command(version, about)]
pub struct Cli {
    #[clap(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity<clap_verbosity_flag::InfoLevel>,

    #[command(subcommand)]
    pub command: Option<Command>,

    /// Video to serve as soon as the session starts
    #[arg(long)]
    pub open: Option<PathBuf>,

    /// Lowest port the media server may bind
    #[arg(long, default_value_t = port::DEFAULT_PORT_LOW)]
    pub port_low: u16,

    /// Highest port the media server may bind
    #[arg(long, default_value_t = port::DEFAULT_PORT_HIGH)]
    pub port_high: u16,

    /// Random ports tried before giving up
    #[arg(long, default_value_t = port::DEFAULT_PORT_ATTEMPTS)]
    pub port_attempts: u32,

    /// Base path for exports; the session timestamp and suffixes are added
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Role suffix used by `save` when none is given
    #[arg(short, long)]
    pub role: Option<String>,

    /// Last name used by `save` when none is given
    #[arg(short = 'n', long)]
    pub last_name: Option<String>,
}

#[derive(Subcommand, Clone, Debug, PartialEq)]
pub enum Command {
    /// Convert an SRT subtitle file to `n_sub,start_t,end_t,text` CSV
    Subtitles {
        input: PathBuf,

        /// Output file; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}
