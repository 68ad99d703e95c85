//! Line-oriented shell over the session controller.
//!
//! Stands in for the graphical player: each stdin line is one command and
//! each command prints one JSON reply on stdout.
//!
//! ```text
//! > open "/videos/case 12.mp4"
//! {"url":"http://127.0.0.1:8412/case%2012.mp4","fileName":"case 12.mp4"}
//! > mark 1.5
//! {"count":1,"last":1.5}
//! > save --role attending --last-name Smith
//! {"savedTo":"/home/op/Desktop/20240115_1430_mark_attending_smith.csv","count":1}
//! ```
//!
//! Lines are split with shell quoting rules, so paths containing spaces are
//! written in quotes. Unquoted words after `open` are joined with one space.

use clap::{Parser, Subcommand};
use log::{debug, error};
use serde::Serialize;
use std::io::BufRead;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio_graceful_shutdown::SubsystemHandle;

use crate::error::SessionError;
use crate::session::{Reply, SessionController};

#[derive(Parser, Debug)]
#[command(no_binary_name = true, name = "vidmark", disable_version_flag = true)]
struct ConsoleLine {
    #[command(subcommand)]
    command: ConsoleCommand,
}

#[derive(Subcommand, Debug, PartialEq)]
enum ConsoleCommand {
    /// Serve a video file to the player
    Open {
        #[arg(required = true, num_args = 1..)]
        path: Vec<String>,
    },
    /// Record a mark at a playback offset in seconds
    Mark {
        #[arg(allow_negative_numbers = true)]
        seconds: f64,
    },
    /// Remove the most recent mark
    Undo,
    /// Print all marks
    #[command(alias = "marks")]
    List,
    /// Export the marks as CSV
    Save {
        /// Base path; defaults to the configured output
        #[arg(long)]
        path: Option<PathBuf>,
        #[arg(long)]
        role: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
    },
    /// Print the current video and mark count
    Status,
    /// Stop serving and exit
    #[command(alias = "exit")]
    Quit,
}

/// What a console line produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Reply(String),
    Quit,
}

pub struct Console {
    controller: SessionController,
    role: Option<String>,
    last_name: Option<String>,
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }).to_string())
}

impl Console {
    /// `role` and `last_name` are used by `save` when the command omits them
    pub fn new(controller: SessionController, role: Option<String>, last_name: Option<String>) -> Self {
        Self {
            controller,
            role,
            last_name,
        }
    }

    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    /// Run one command line. Blank lines produce nothing.
    pub async fn execute(&mut self, line: &str) -> Option<Outcome> {
        let Some(words) = shlex::split(line) else {
            let reply: Reply<()> = Reply::Error {
                error: "unbalanced quotes".to_string(),
            };
            return Some(Outcome::Reply(to_json(&reply)));
        };
        if words.is_empty() {
            return None;
        }

        let command = match ConsoleLine::try_parse_from(words) {
            Ok(parsed) => parsed.command,
            Err(e) if e.kind() == clap::error::ErrorKind::DisplayHelp => {
                let help = serde_json::json!({ "help": e.to_string().trim_end() });
                return Some(Outcome::Reply(help.to_string()));
            }
            Err(e) => {
                let message = e.to_string();
                let first = message.lines().next().unwrap_or_default();
                let reply: Reply<()> = Reply::Error {
                    error: first.trim_start_matches("error: ").to_string(),
                };
                return Some(Outcome::Reply(to_json(&reply)));
            }
        };

        let reply = match command {
            ConsoleCommand::Open { path } => {
                let path = PathBuf::from(path.join(" "));
                let reply: Reply<_> = self.controller.open_video(&path).await.into();
                to_json(&reply)
            }
            ConsoleCommand::Mark { seconds } => to_json(&self.controller.mark(seconds)),
            ConsoleCommand::Undo => to_json(&self.controller.undo()),
            ConsoleCommand::List => to_json(&self.controller.get_marks()),
            ConsoleCommand::Save {
                path,
                role,
                last_name,
            } => {
                let role = role.or_else(|| self.role.clone());
                let last_name = last_name.or_else(|| self.last_name.clone());
                let reply: Reply<_> = self
                    .controller
                    .save(path.as_deref(), role.as_deref(), last_name.as_deref())
                    .into();
                to_json(&reply)
            }
            ConsoleCommand::Status => to_json(&self.controller.status()),
            ConsoleCommand::Quit => return Some(Outcome::Quit),
        };

        Some(Outcome::Reply(reply))
    }

    /// Read commands from stdin until `quit`, end of input or shutdown
    pub async fn run(
        mut self,
        subsys: SubsystemHandle,
        open_on_start: Option<PathBuf>,
    ) -> Result<(), SessionError> {
        if let Some(path) = open_on_start {
            let reply: Reply<_> = self.controller.open_video(&path).await.into();
            println!("{}", to_json(&reply));
        }

        let mut lines = spawn_stdin_reader();
        loop {
            tokio::select! {
                _ = subsys.on_shutdown_requested() => break,
                line = lines.recv() => match line {
                    Some(line) => match self.execute(&line).await {
                        Some(Outcome::Reply(reply)) => println!("{}", reply),
                        Some(Outcome::Quit) => {
                            subsys.request_shutdown();
                            break;
                        }
                        None => {}
                    },
                    None => {
                        debug!("End of input");
                        subsys.request_shutdown();
                        break;
                    }
                }
            }
        }

        self.controller.shutdown().await;
        Ok(())
    }
}

/// Forward stdin lines from a dedicated blocking thread
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.blocking_send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    error!("Failed to read stdin: {}", e);
                    break;
                }
            }
        }
    });
    rx
}
