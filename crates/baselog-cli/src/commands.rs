use std::path::Path;

use anyhow::Context;
use baselog_sdk::{
    Address, CommitOutcome, ContentId, Direction, HttpTransactionSource, JournalConfig,
    JournalMetadata, JournalNote, RemoteJournal, SdkError, TxHash,
};
use chrono::DateTime;
use baselog_store::{ContentStore, HttpContentStore};
use colored::Colorize;

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = JournalConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    tracing::debug!(path = %cli.config.display(), ?config, "configuration loaded");
    let format = cli.format;
    match cli.command {
        Command::Upload(args) => cmd_upload(config, format, args).await,
        Command::Fetch(args) => cmd_fetch(config, format, args).await,
        Command::Pin(args) => cmd_pin(config, format, args).await,
        Command::Transactions(args) => cmd_transactions(config, format, args).await,
        Command::Lookup(args) => cmd_lookup(config, format, args).await,
        Command::Commit(args) => cmd_commit(config, format, args).await,
        Command::Config => cmd_config(config, format),
    }
}

fn read_note(path: &Path) -> anyhow::Result<JournalMetadata> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("{} is not a valid note", path.display()))
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_note(metadata: &JournalMetadata) {
    println!("{}", metadata.title.bold());
    if !metadata.description.is_empty() {
        println!("  {}", metadata.description);
    }
    println!("  Transaction: {}", metadata.tx_hash.short().yellow());
    println!("  Category: {}", metadata.effective_category().cyan());
    if !metadata.tags.is_empty() {
        println!("  Tags: {}", metadata.tags.join(", "));
    }
    if let Some(amount) = &metadata.amount {
        println!("  Amount: {} ETH", amount);
    }
}

async fn cmd_upload(
    config: JournalConfig,
    format: OutputFormat,
    args: UploadArgs,
) -> anyhow::Result<()> {
    let note = read_note(&args.file)?;
    let store = HttpContentStore::new(config.store)?;
    let cid = store.upload(&note).await?;
    match format {
        OutputFormat::Json => print_json(&serde_json::json!({ "contentId": cid })),
        OutputFormat::Text => {
            println!("{} Uploaded {}", "✓".green().bold(), cid.as_str().yellow());
            Ok(())
        }
    }
}

async fn cmd_fetch(
    config: JournalConfig,
    format: OutputFormat,
    args: FetchArgs,
) -> anyhow::Result<()> {
    let store = HttpContentStore::new(config.store)?;
    let metadata = store.fetch(&ContentId::new(args.cid)).await?;
    match format {
        OutputFormat::Json => print_json(&metadata),
        OutputFormat::Text => {
            print_note(&metadata);
            Ok(())
        }
    }
}

async fn cmd_pin(config: JournalConfig, format: OutputFormat, args: PinArgs) -> anyhow::Result<()> {
    let store = HttpContentStore::new(config.store)?;
    let cid = ContentId::new(args.cid);
    store.pin(&cid, args.name.as_deref()).await?;
    match format {
        OutputFormat::Json => print_json(&serde_json::json!({ "pinned": cid })),
        OutputFormat::Text => {
            println!("{} Pinned {}", "✓".green().bold(), cid.as_str().yellow());
            Ok(())
        }
    }
}

async fn cmd_transactions(
    config: JournalConfig,
    format: OutputFormat,
    args: TransactionsArgs,
) -> anyhow::Result<()> {
    let source = HttpTransactionSource::new(config.indexer.clone())?;
    let mut journal = RemoteJournal::connect(config)?;
    if let Some(account) = args.account {
        journal = journal.with_account(account.parse().context("invalid account address")?);
    }
    let Some(account) = journal.account() else {
        anyhow::bail!("no account: pass --account or set registry.account");
    };

    let transactions = journal.transactions(&source).await?;
    if format == OutputFormat::Json {
        return print_json(&transactions);
    }
    if transactions.is_empty() {
        println!("No transactions for {}", account.short());
        return Ok(());
    }
    for enriched in &transactions {
        let tx = &enriched.transaction;
        let date = i64::try_from(tx.timestamp)
            .ok()
            .and_then(DateTime::from_timestamp_millis)
            .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        let (arrow, counterparty) = match tx.direction(&account) {
            Direction::Sent => ("→".red(), tx.to.map(|a| a.short()).unwrap_or_default()),
            Direction::Received => ("←".green(), tx.from.short()),
        };
        let note = if enriched.has_note { "✎".cyan() } else { " ".normal() };
        println!(
            "{} {} {} {:>10} ETH  {:<13} {}",
            note,
            date.dimmed(),
            arrow,
            tx.amount_eth(),
            counterparty,
            tx.hash.short().yellow()
        );
    }
    Ok(())
}

async fn cmd_lookup(
    config: JournalConfig,
    format: OutputFormat,
    args: LookupArgs,
) -> anyhow::Result<()> {
    let account: Address = args.account.parse().context("invalid account address")?;
    let tx_hash: TxHash = args.tx_hash.parse().context("invalid transaction hash")?;
    let journal = RemoteJournal::connect(config)?;

    let note: Option<JournalNote> = journal.note(&account, &tx_hash).await?;
    match (format, note) {
        (OutputFormat::Json, note) => print_json(&note),
        (OutputFormat::Text, None) => {
            println!("No note for {} from {}", tx_hash.short().yellow(), account.short());
            Ok(())
        }
        (OutputFormat::Text, Some(note)) => {
            print_note(&note.metadata);
            println!("  Content: {}", note.entry.content_id.short().dimmed());
            println!("  Recorded: {}", note.entry.timestamp);
            Ok(())
        }
    }
}

async fn cmd_commit(
    config: JournalConfig,
    format: OutputFormat,
    args: CommitArgs,
) -> anyhow::Result<()> {
    let note = read_note(&args.file)?;
    let journal = RemoteJournal::connect(config)?;

    let mut states = journal.subscribe();
    let progress = tokio::spawn(async move {
        while states.changed().await.is_ok() {
            let phase = states.borrow_and_update().phase();
            if phase.is_active() {
                eprintln!("  {} {}", "→".dimmed(), phase);
            }
        }
    });
    let result = journal.commit(note).await;
    progress.abort();

    let outcome: CommitOutcome = match result {
        Ok(outcome) => outcome,
        Err(SdkError::Pipeline(e)) => {
            match journal.snapshot().last_error().map(|(phase, _)| phase) {
                Some(phase) => anyhow::bail!("commit failed while {phase} ({}): {e}", e.kind()),
                None => anyhow::bail!("commit refused ({}): {e}", e.kind()),
            }
        }
        Err(e) => return Err(e.into()),
    };

    match format {
        OutputFormat::Json => print_json(&outcome),
        OutputFormat::Text => {
            println!("{} Note recorded", "✓".green().bold());
            println!("  Content: {}", outcome.content_id.as_str().yellow());
            println!("  Registry tx: {}", outcome.transaction.hash.to_hex().cyan());
            println!("  Block: {}", outcome.inclusion.block_number);
            for step in &outcome.steps {
                println!("  {:<11} {:?}", step.phase.to_string(), step.elapsed);
            }
            Ok(())
        }
    }
}

fn cmd_config(mut config: JournalConfig, format: OutputFormat) -> anyhow::Result<()> {
    if config.store.credential().is_some() {
        config.store.credential = Some("<redacted>".into());
    }
    if config.indexer.api_key().is_some() {
        config.indexer.api_key = Some("<redacted>".into());
    }
    match format {
        OutputFormat::Json => print_json(&config),
        OutputFormat::Text => {
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}
