mod commands;
mod config;
mod error;
mod lemmy;

use std::{io, process::ExitCode};

use clap::{CommandFactory, Parser};
use tracing_log::LogTracer;
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

/// Posts and pins a daily discussion thread in a Lemmy community, and unpins
/// the previous ones
#[derive(Debug, Parser)]
#[command(version, arg_required_else_help = true)]
struct Args {
    /// Load settings and test logging in, without posting anything
    #[arg(short = 't', long, conflicts_with = "daily")]
    test: bool,

    /// Run the full daily flow: post today's thread, pin it, unpin stale ones
    #[arg(short = 'd', long)]
    daily: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse first so `--help` and bad arguments never touch logging or the
    // network
    let args = Args::parse();

    if let Err(e) = init_logging() {
        eprintln!("Failed to set up logging: {e}");
        return ExitCode::FAILURE;
    }

    let outcome = if args.test {
        commands::test::run().await
    } else if args.daily {
        commands::daily::run().await
    } else {
        // Reachable with e.g. a bare `--`; treat it like a missing mode
        let _ = Args::command().print_help();
        return ExitCode::from(2);
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(fatal) => {
            let code = fatal.exit_code();
            tracing::error!("{:#}", anyhow::Error::new(fatal));
            code
        }
    }
}

fn init_logging() -> anyhow::Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .compact()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG")
                .from_env()?,
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    LogTracer::init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::{error::ErrorKind, CommandFactory, Parser};

    use super::Args;

    #[test]
    fn cli_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn dispatches_modes() {
        let args = Args::try_parse_from(["lemmy_daily_bot", "-t"]).unwrap();
        assert!(args.test && !args.daily);

        let args = Args::try_parse_from(["lemmy_daily_bot", "-d"]).unwrap();
        assert!(args.daily && !args.test);
    }

    #[test]
    fn no_arguments_means_help() {
        let err = Args::try_parse_from(["lemmy_daily_bot"]).unwrap_err();
        assert_eq!(
            err.kind(),
            ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
        );
    }

    #[test]
    fn modes_are_mutually_exclusive() {
        let err = Args::try_parse_from(["lemmy_daily_bot", "-t", "-d"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn unknown_arguments_are_rejected() {
        assert!(Args::try_parse_from(["lemmy_daily_bot", "-x"]).is_err());
    }
}
