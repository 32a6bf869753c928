use std::io::{self, BufRead};
use std::path::Path;

mod create;
mod list;
mod terminal;

use anyhow::Context;
use boardtree::{Client, Config};
use clap::ArgAction;
use create::Create;
use list::List;

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// GitHub token (falls back to the GITHUB_TOKEN environment variable)
    #[arg(long, global = true)]
    token: Option<String>,

    /// GitHub organization (falls back to GITHUB_ORG, then the config file)
    #[arg(short, long, global = true)]
    org: Option<String>,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        let config = Config::load_or_default(Path::new(".")).map_err(anyhow::Error::msg)?;

        let token = self
            .token
            .or_else(|| std::env::var("GITHUB_TOKEN").ok())
            .context(
                "a GitHub token is required; pass --token or set GITHUB_TOKEN \
                 (the token needs 'repo' and 'project' permissions)",
            )?;
        let org = self
            .org
            .or_else(|| std::env::var("GITHUB_ORG").ok())
            .or_else(|| config.org.clone());

        let client = Client::new(token)?;
        self.command.run(&client, &config, org)
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// List project items with filters and relationship views
    List(List),

    /// Create test-case tasks from a JSON definition file
    Create(Create),
}

impl Command {
    fn run(self, client: &Client, config: &Config, org: Option<String>) -> anyhow::Result<()> {
        match self {
            Self::List(command) => command.run(client, config, org)?,
            Self::Create(command) => command.run(client, config, org)?,
        }
        Ok(())
    }
}

fn prompt_to_proceed() -> io::Result<()> {
    eprint!("\nProceed? (y/N) ");
    let stdin = std::io::stdin();
    let mut line = String::new();
    stdin.lock().read_line(&mut line)?;
    if !line.trim().eq_ignore_ascii_case("y") {
        println!("Cancelled");
        std::process::exit(130);
    }
    Ok(())
}
