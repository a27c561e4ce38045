//! `loop-agent`: run the autonomous TDD loop in a git repository.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use loop_agent::exit_codes;
use loop_agent::io::agent::CommandAgent;
use loop_agent::io::config::load_config;
use loop_agent::io::session::SESSIONS_DIR;
use loop_agent::io::transcript::Echo;
use loop_agent::io::validator::ScriptValidator;
use loop_agent::logging;
use loop_agent::looping::{MAX_ITERATIONS, run_loop};
use loop_agent::start::start_session;

#[derive(Parser)]
#[command(
    name = "loop-agent",
    version,
    about = "Autonomous test-driven development loop around a coding agent"
)]
struct Cli {
    /// Repository root to work in.
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Config file. Defaults to `<root>/.loop_agent/config.toml`.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() {
    logging::init();
    if let Err(err) = run(Cli::parse()) {
        eprintln!("{:#}", err);
        std::process::exit(exit_codes::FATAL);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config_path = cli
        .config
        .unwrap_or_else(|| cli.root.join(SESSIONS_DIR).join("config.toml"));
    let config = load_config(&config_path)?;

    let session = start_session(&cli.root, config, Echo::Stdout)?;
    let agent = CommandAgent::from_config(&session.config.agent);
    let validator = ScriptValidator::new(session.root(), session.validate_script.clone());

    if let Err(err) = run_loop(&session, &agent, &validator, MAX_ITERATIONS, |_| {}) {
        session.log(format!("[FATAL] {err:#}"));
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_defaults() {
        let cli = Cli::parse_from(["loop-agent"]);
        assert_eq!(cli.root, PathBuf::from("."));
        assert!(cli.config.is_none());
    }

    #[test]
    fn parse_root_and_config() {
        let cli = Cli::parse_from(["loop-agent", "--root", "/work", "--config", "/etc/loop.toml"]);
        assert_eq!(cli.root, PathBuf::from("/work"));
        assert_eq!(cli.config, Some(PathBuf::from("/etc/loop.toml")));
    }
}
