// CLI module - command-line argument parsing and handlers
//
// Top-level flags override the loaded configuration; the `config` subcommand
// manages the config file and exits without starting the TUI.

use crate::config::{Config, VERSION};
use clap::{Parser, Subcommand};

/// cchat - streaming chat client for Claude
#[derive(Parser)]
#[command(name = "cchat")]
#[command(version = VERSION)]
#[command(about = "Terminal chat client with streamed, typewriter-style responses", long_about = None)]
pub struct Cli {
    /// Backend URL (overrides config file and environment)
    #[arg(long)]
    pub server: Option<String>,

    /// Play a scripted demo response instead of contacting a backend
    #[arg(long)]
    pub demo: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage configuration
    Config {
        /// Show effective configuration
        #[arg(long)]
        show: bool,

        /// Reset config file to defaults
        #[arg(long)]
        reset: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,
    },
}

/// Handle a subcommand if one was given. Returns true if handled (exit after).
pub fn handle_command(cli: &Cli) -> bool {
    match &cli.command {
        Some(Commands::Config { show, reset, path }) => {
            if *path {
                handle_config_path();
            } else if *show {
                handle_config_show();
            } else if *reset {
                handle_config_reset();
            } else {
                println!("Usage: cchat config [--show|--reset|--path]");
                println!();
                println!("Options:");
                println!("  --show   Display effective configuration");
                println!("  --reset  Reset config file to defaults");
                println!("  --path   Show config file path");
            }
            true
        }
        None => false,
    }
}

/// Apply top-level flag overrides onto the loaded configuration.
pub fn apply_overrides(cli: &Cli, config: &mut Config) {
    if let Some(server) = &cli.server {
        config.server_url = server.clone();
    }
    if cli.demo {
        config.demo_mode = true;
    }
}

fn handle_config_path() {
    match Config::config_path() {
        Some(path) => println!("{}", path.display()),
        None => eprintln!("Could not determine config directory"),
    }
}

fn handle_config_show() {
    let config = Config::load();
    print!("{}", config.render());
}

fn handle_config_reset() {
    let Some(path) = Config::config_path() else {
        eprintln!("Could not determine config directory");
        return;
    };
    if path.exists() {
        if let Err(err) = std::fs::remove_file(&path) {
            eprintln!("Could not remove {}: {}", path.display(), err);
            return;
        }
    }
    Config::ensure_config_exists();
    println!("Config reset: {}", path.display());
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_overrides_apply() {
        let cli = Cli::parse_from(["cchat", "--server", "http://test:1234", "--demo"]);
        let mut config = Config::default();
        apply_overrides(&cli, &mut config);
        assert_eq!(config.server_url, "http://test:1234");
        assert!(config.demo_mode);
    }

    #[test]
    fn test_no_flags_no_overrides() {
        let cli = Cli::parse_from(["cchat"]);
        let mut config = Config::default();
        apply_overrides(&cli, &mut config);
        assert_eq!(config.server_url, "http://localhost:8000");
        assert!(!config.demo_mode);
        assert!(!handle_command(&cli));
    }
}
