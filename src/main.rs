use anyhow::Result;
use clap::Parser;
use orc_metadata::{Cli, Commands, commands::inspect};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn main() -> Result<()> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(tracing::Level::WARN.into())
        .from_env_lossy();
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect(args) => inspect::run_inspect(&args)?,
        Commands::Identify(args) => inspect::run_identify(&args)?,
        Commands::Codecs(args) => inspect::run_codecs(&args)?,
    };
    Ok(())
}
