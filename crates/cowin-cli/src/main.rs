use anyhow::Result;
use clap::Parser;

mod captcha;
mod cli;
mod run;
mod terminal;

use cli::Cli;
use cwn_core::AppError;

#[tokio::main]
async fn main() -> Result<()> {
    // Logs to stderr; stdout stays clean for prompts and results.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init()
        .ok();

    let cli = Cli::parse();
    match run::run(cli).await {
        Ok(()) => Ok(()),
        // A declined retry is a deliberate stop, not a failure.
        Err(err) if matches!(err.downcast_ref::<AppError>(), Some(AppError::Declined)) => {
            println!("Exiting.");
            Ok(())
        }
        Err(err) => Err(err),
    }
}
