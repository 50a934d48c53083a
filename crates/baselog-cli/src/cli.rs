use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "baselog",
    about = "BaseLog: permanent notes for onchain transactions",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file; defaults are used when it does not exist
    #[arg(short, long, global = true, default_value = "baselog.toml")]
    pub config: PathBuf,

    #[arg(short, long, global = true)]
    pub verbose: bool,

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
    /// Upload a note (JSON file) to the content store
    Upload(UploadArgs),
    /// Fetch a note from the gateways by content id
    Fetch(FetchArgs),
    /// Pin existing content by id
    Pin(PinArgs),
    /// List an account's transactions and mark the ones with a note
    Transactions(TransactionsArgs),
    /// Look up the note an account recorded for a transaction
    Lookup(LookupArgs),
    /// Upload a note and record it in the registry
    Commit(CommitArgs),
    /// Show the effective configuration
    Config,
}

#[derive(Args)]
pub struct UploadArgs {
    /// Path to a JSON note
    pub file: PathBuf,
}

#[derive(Args)]
pub struct FetchArgs {
    pub cid: String,
}

#[derive(Args)]
pub struct PinArgs {
    pub cid: String,
    /// Pin name (default: BaseLog-<cid>)
    #[arg(long)]
    pub name: Option<String>,
}

#[derive(Args)]
pub struct TransactionsArgs {
    /// Account to list (default: registry.account from the configuration)
    #[arg(long)]
    pub account: Option<String>,
}

#[derive(Args)]
pub struct LookupArgs {
    pub account: String,
    pub tx_hash: String,
}

#[derive(Args)]
pub struct CommitArgs {
    /// Path to a JSON note
    pub file: PathBuf,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["baselog", "pin", "bafy123", "--name", "mine", "--format", "json"]);
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.config, PathBuf::from("baselog.toml"));
        match cli.command {
            Command::Pin(args) => {
                assert_eq!(args.cid, "bafy123");
                assert_eq!(args.name.as_deref(), Some("mine"));
            }
            _ => panic!("expected pin"),
        }
    }

    #[test]
    fn transactions_account_is_optional() {
        let cli = Cli::parse_from(["baselog", "transactions"]);
        assert!(matches!(cli.command, Command::Transactions(TransactionsArgs { account: None })));

        let cli = Cli::parse_from(["baselog", "transactions", "--account", "0xabc"]);
        match cli.command {
            Command::Transactions(args) => assert_eq!(args.account.as_deref(), Some("0xabc")),
            _ => panic!("expected transactions"),
        }
    }
}
