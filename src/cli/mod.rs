//! CLI module for PMP Recipe Runner

pub mod serve;

use clap::{Parser, Subcommand};

/// PMP Recipe Runner - human-reviewed multi-step workflows
#[derive(Parser)]
#[command(name = "pmp-recipe-runner")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API
    Serve(serve::ServeArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve_with_port() {
        let cli = Cli::try_parse_from(["pmp-recipe-runner", "serve", "--port", "9090"]).unwrap();

        let Command::Serve(args) = cli.command;
        assert_eq!(args.port, Some(9090));
        assert!(args.host.is_none());
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["pmp-recipe-runner"]).is_err());
    }
}
