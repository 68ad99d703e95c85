use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::{fs, io, time::Duration};
use tokio_graceful_shutdown::{SubsystemBuilder, Toplevel};
use vidmark_core::parse_subtitles;
use vidmark_server::{
    storage::write_subtitles_csv, Cli, Command, Console, SessionController, SessionSettings,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    env_logger::Builder::new()
        .filter_level(args.verbose.log_level_filter())
        .init();

    log::debug!("vidmark {} starting", vidmark_server::VERSION);

    if let Some(Command::Subtitles { input, output }) = &args.command {
        let text = fs::read_to_string(input).into_diagnostic()?;
        let cues = parse_subtitles(&text).into_diagnostic()?;
        match output {
            Some(path) => {
                let file = fs::File::create(path).into_diagnostic()?;
                write_subtitles_csv(file, &cues).into_diagnostic()?;
                log::info!("Wrote {} subtitles to {}", cues.len(), path.display());
            }
            None => write_subtitles_csv(io::stdout().lock(), &cues).into_diagnostic()?,
        }
        return Ok(());
    }

    let controller = SessionController::new(SessionSettings::from(&args));
    let console = Console::new(controller, args.role.clone(), args.last_name.clone());
    let open = args.open.clone();

    Toplevel::new(|s| async move {
        s.start(SubsystemBuilder::new("Console", |subsys| {
            console.run(subsys, open)
        }));
    })
    .catch_signals()
    .handle_shutdown_requests(Duration::from_secs(5))
    .await
    .into_diagnostic()
}
