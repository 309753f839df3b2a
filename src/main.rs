use anyhow::Context;
use clap::Parser;
use qc_automation::app::AutomationSystem;
use qc_automation::cli::Cli;
use qc_automation::config::Config;
use qc_automation::{critical, logging};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log_file).context("failed to initialise logging")?;

    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            critical!("Could not load configuration '{}': {}", cli.config.display(), e);
            std::process::exit(1);
        }
    };

    if let Err(e) = AutomationSystem::new(&config).run() {
        critical!("A critical error occurred while running the program: {}", e);
        std::process::exit(1);
    }
    Ok(())
}
