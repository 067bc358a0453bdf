use clap::Parser;
use color_eyre::Result;
use crossterm::style::Stylize;
use engine::config::ConfigError;
use whiteboard::{cli::Cli, run};

#[tokio::main]
async fn main() -> Result<()> {
    pretty_env_logger::init();
    color_eyre::install()?;

    match run(Cli::parse()).await {
        Err(e) if e.downcast_ref::<ConfigError>().is_some() => {
            eprintln!("{}", format!("Error: {e}").red());
            std::process::exit(1);
        }
        other => other,
    }
}
