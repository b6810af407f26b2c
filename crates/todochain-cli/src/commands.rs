use std::time::Duration;

use anyhow::Context;
use chrono::TimeDelta;
use colored::Colorize;
use serde_json::json;
use tracing::debug;

use todochain_ledger::{Fault, LedgerError};
use todochain_sdk::{
    NewTodo, OwnerId, SdkError, SweepReport, SyncStatus, Todo, TodoChainConfig, TodoFilter,
    TodoPatch, TodoRuntime, VerificationResult,
};
use todochain_types::time;

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    match cli.command {
        Command::Demo(args) => cmd_demo(config, args, cli.format).await,
        Command::Sweep(args) => cmd_sweep(config, args, cli.format).await,
        Command::Config => cmd_config(config, cli.format),
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<TodoChainConfig> {
    match &cli.config {
        Some(path) => {
            let config = TodoChainConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?;
            debug!(path = %path.display(), "configuration loaded");
            Ok(config)
        }
        None => {
            debug!("no configuration file, using defaults");
            Ok(TodoChainConfig::default())
        }
    }
}

async fn cmd_demo(config: TodoChainConfig, args: DemoArgs, format: OutputFormat) -> anyhow::Result<()> {
    let owner = OwnerId::new(args.owner)?;
    let rt = TodoRuntime::new(config.clone())?;
    let service = rt.service();
    let mut results = Vec::new();

    // A: create, sync, verify.
    heading("A", "create and verify");
    let todo = service
        .create_todo(&owner, NewTodo::new("Write the quarterly report"))
        .await?;
    println!("  created {} ({})", todo.id.short_id().yellow(), status_label(&todo));
    rt.wait_idle().await;
    let synced = service.get_todo(&todo.id, &owner).await?;
    println!("  now {} hash {}", status_label(&synced), hash_label(&synced));
    let result = service.verify_todo(&todo.id, &owner).await?;
    print_verification(&result);
    results.push(json!({ "scenario": "A", "todo": synced, "verification": result }));

    // B: update and toggle move the ledger hash.
    heading("B", "update and toggle");
    service
        .update_todo(&todo.id, &owner, TodoPatch::title("Write the Q3 report"))
        .await?;
    service.toggle_complete(&todo.id, &owner).await?;
    rt.wait_idle().await;
    let updated = service.get_todo(&todo.id, &owner).await?;
    println!(
        "  hash {} -> {} ({})",
        hash_label(&synced).dimmed(),
        hash_label(&updated),
        status_label(&updated)
    );
    let result = service.verify_todo(&todo.id, &owner).await?;
    print_verification(&result);
    let history = service.sync_history(&todo.id, &owner).await?;
    for entry in &history {
        println!("    audit {:<8} {:?}", entry.operation.to_string(), entry.outcome);
    }
    results.push(json!({ "scenario": "B", "todo": updated, "verification": result, "history": history }));

    // C: a confirmation timeout fails the sync; the sweeper recovers it.
    heading("C", "ledger timeout and retry");
    let mut slow = config.clone();
    slow.ledger.confirmation_timeout_ms = 50;
    slow.ledger.simulated_latency_ms = 200;
    let slow_rt = TodoRuntime::new(slow)?;
    let todo = slow_rt
        .service()
        .create_todo(&owner, NewTodo::new("Renew passport"))
        .await?;
    slow_rt.wait_idle().await;
    let failed = slow_rt.service().get_todo(&todo.id, &owner).await?;
    println!(
        "  {} after {} attempt(s): {}",
        status_label(&failed),
        failed.sync.retry_count,
        failed.sync.last_error.as_deref().unwrap_or("-").red()
    );
    slow_rt.contract().set_latency(Duration::ZERO);
    let report = slow_rt.sweeper().run_once().await?;
    print_report(1, &report);
    let recovered = slow_rt.service().get_todo(&todo.id, &owner).await?;
    println!("  now {} hash {}", status_label(&recovered), hash_label(&recovered));
    results.push(json!({ "scenario": "C", "failed": failed, "sweep": report, "recovered": recovered }));
    slow_rt.shutdown().await;

    // D: verifying before the first sync lands is rejected.
    heading("D", "verify before sync");
    rt.contract().set_latency(Duration::from_millis(100));
    let todo = service
        .create_todo(&owner, NewTodo::new("Book flights"))
        .await?;
    let early = match service.verify_todo(&todo.id, &owner).await {
        Err(e @ SdkError::NotSynced { .. }) => {
            println!("  {} {}", "rejected:".yellow(), e);
            e.to_string()
        }
        other => anyhow::bail!("expected a not-synced rejection, got {other:?}"),
    };
    rt.wait_idle().await;
    let result = service.verify_todo(&todo.id, &owner).await?;
    print_verification(&result);
    results.push(json!({ "scenario": "D", "rejection": early, "verification": result }));

    let open = service.list_todos(&owner, &TodoFilter::completed(false)).await?;
    println!("\n{} open todo(s) for {}", open.len().to_string().bold(), owner);
    rt.shutdown().await;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    }
    Ok(())
}

async fn cmd_sweep(config: TodoChainConfig, args: SweepArgs, format: OutputFormat) -> anyhow::Result<()> {
    let owner = OwnerId::new("sweep-demo")?;
    let rt = TodoRuntime::new(config)?;
    rt.contract().inject_n(
        Fault::Fail(LedgerError::Transport("ledger unreachable".into())),
        args.failures,
    );

    let mut ids = Vec::with_capacity(args.todos);
    for i in 0..args.todos {
        let todo = rt
            .service()
            .create_todo(&owner, NewTodo::new(format!("seeded todo {}", i + 1)))
            .await?;
        ids.push(todo.id);
    }
    rt.wait_idle().await;
    println!(
        "Seeded {} todo(s), {} ledger write(s) set to fail",
        args.todos.to_string().bold(),
        args.failures
    );

    let started = time::now_millis();
    let mut reports = Vec::new();
    for cycle in 1..=args.cycles {
        let at = started + TimeDelta::seconds(args.step_secs * i64::from(cycle));
        let report = rt.sweeper().run_once_at(at).await?;
        print_report(cycle, &report);
        reports.push(report);
    }

    let mut todos = Vec::with_capacity(ids.len());
    for id in &ids {
        todos.push(rt.service().get_todo(id, &owner).await?);
    }
    let count = |status: SyncStatus| todos.iter().filter(|t| t.sync.status == status).count();
    println!(
        "Final: {} synced, {} failed, {} pending",
        count(SyncStatus::Synced).to_string().green(),
        count(SyncStatus::Failed).to_string().red(),
        count(SyncStatus::Pending).to_string().yellow()
    );
    let stuck = rt.service().permanent_failures(args.todos).await?;
    if !stuck.is_empty() {
        println!("{} todo(s) exhausted their retries", stuck.len().to_string().red().bold());
    }
    rt.shutdown().await;

    if format == OutputFormat::Json {
        let out = json!({ "reports": reports, "todos": todos });
        println!("{}", serde_json::to_string_pretty(&out)?);
    }
    Ok(())
}

fn cmd_config(mut config: TodoChainConfig, format: OutputFormat) -> anyhow::Result<()> {
    if config.ledger.signer_key.is_some() {
        config.ledger.signer_key = Some("<redacted>".into());
    }
    match format {
        OutputFormat::Text => print!("{}", config.to_toml_string()?),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&config)?),
    }
    Ok(())
}

fn heading(label: &str, title: &str) {
    println!("\n{} {}", format!("[{label}]").cyan().bold(), title.bold());
}

fn status_label(todo: &Todo) -> colored::ColoredString {
    match todo.sync.status {
        SyncStatus::Synced => "synced".green(),
        SyncStatus::Pending => "pending".yellow(),
        SyncStatus::Failed => "failed".red(),
    }
}

fn hash_label(todo: &Todo) -> String {
    todo.sync
        .ledger_hash
        .map(|h| h.short_hex())
        .unwrap_or_else(|| "-".into())
}

fn print_verification(result: &VerificationResult) {
    if result.is_valid {
        println!("  {} ledger agrees on {}", "✓".green().bold(), result.primary_hash.short_hex());
    } else {
        println!(
            "  {} store {} vs ledger {}",
            "✗".red().bold(),
            result.primary_hash.short_hex(),
            result.ledger_hash.short_hex()
        );
    }
}

fn print_report(cycle: u32, report: &SweepReport) {
    println!(
        "  sweep #{cycle}: scanned {} attempted {} {} {} deferred {}",
        report.scanned,
        report.attempted,
        format!("ok {}", report.succeeded).green(),
        format!("failed {}", report.failed).red(),
        report.deferred
    );
}
