use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "todochain",
    about = "TodoChain: todos with ledger-anchored content hashes",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Debug-level logging unless RUST_LOG is set
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// TOML configuration file; built-in defaults otherwise
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Walk through create, update, failure recovery, and early verification
    Demo(DemoArgs),
    /// Seed failing todos and drive the retry sweeper by hand
    Sweep(SweepArgs),
    /// Print the effective configuration
    Config,
}

#[derive(Args)]
pub struct DemoArgs {
    /// Owner the demo todos belong to
    #[arg(long, default_value = "demo-user")]
    pub owner: String,
}

#[derive(Args)]
pub struct SweepArgs {
    /// Number of sweeper runs
    #[arg(long, default_value = "3")]
    pub cycles: u32,
    /// Todos to seed
    #[arg(long, default_value = "5")]
    pub todos: usize,
    /// Ledger writes to reject before the ledger recovers
    #[arg(long, default_value = "8")]
    pub failures: usize,
    /// Simulated seconds between runs, so backoff delays can elapse
    #[arg(long, default_value = "60")]
    pub step_secs: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::try_parse_from([
            "todochain", "sweep", "--cycles", "5", "--config", "/tmp/t.toml", "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/t.toml")));
        match cli.command {
            Command::Sweep(args) => {
                assert_eq!(args.cycles, 5);
                assert_eq!(args.todos, 5);
            }
            _ => panic!("expected sweep"),
        }
    }

    #[test]
    fn format_defaults_to_text() {
        let cli = Cli::try_parse_from(["todochain", "config"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Text);
        assert!(Cli::try_parse_from(["todochain", "config", "--format", "yaml"]).is_err());
    }
}
