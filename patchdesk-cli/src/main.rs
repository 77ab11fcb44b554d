use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use patchdesk_journal::{tail, verify_log, Journal};
use patchdesk_patches::PatchEngine;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "patchdesk", about = "Manage stored patches and backups")]
struct Cli {
    /// Directory holding patches/, backups/ and journal.jsonl.
    #[arg(long, default_value = "backend/app", global = true)]
    data_dir: PathBuf,
    /// Patch targets resolve under this directory.
    #[arg(long, default_value = ".", global = true)]
    project_root: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    Patches {
        #[command(subcommand)]
        action: PatchCommand,
    },
    Backups {
        #[command(subcommand)]
        action: BackupCommand,
    },
    Journal {
        #[command(subcommand)]
        action: JournalCommand,
    },
}

#[derive(Subcommand)]
enum PatchCommand {
    List,
    Show { name: String },
    /// Store the content of `--from` as a patch for `target`.
    Create {
        target: String,
        #[arg(long)]
        from: PathBuf,
    },
    Apply { name: String },
}

#[derive(Subcommand)]
enum BackupCommand {
    List,
    Rollback { name: String },
}

#[derive(Subcommand)]
enum JournalCommand {
    Tail {
        #[arg(long, default_value_t = 10)]
        lines: usize,
    },
    Verify,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    run(cli, &mut std::io::stdout().lock())
}

fn run(cli: Cli, out: &mut impl Write) -> anyhow::Result<()> {
    let journal_path = cli.data_dir.join("journal.jsonl");
    if let Command::Journal { action } = &cli.command {
        match action {
            JournalCommand::Tail { lines } => {
                for entry in tail(&journal_path, *lines)? {
                    writeln!(out, "{}", serde_json::to_string(&entry)?)?;
                }
            }
            JournalCommand::Verify => {
                let n = verify_log(&journal_path)?;
                writeln!(out, "journal ok ({n} entries)")?;
            }
        }
        return Ok(());
    }

    let journal = Arc::new(Journal::open(&journal_path)?);
    let engine = PatchEngine::open(&cli.data_dir, cli.project_root.clone())?.with_journal(journal);

    match cli.command {
        Command::Patches { action } => match action {
            PatchCommand::List => {
                for name in engine.patches().list()? {
                    writeln!(out, "{name}")?;
                }
            }
            PatchCommand::Show { name } => {
                out.write_all(&engine.patches().get(&name)?)?;
            }
            PatchCommand::Create { target, from } => {
                let content = std::fs::read(&from)
                    .with_context(|| format!("reading {}", from.display()))?;
                let name = engine.create_patch(&target, &content)?;
                writeln!(out, "{name}")?;
            }
            PatchCommand::Apply { name } => {
                let outcome = engine.apply(&name)?;
                match outcome.backup {
                    Some(backup) => writeln!(out, "applied to {} (backup {backup})", outcome.target)?,
                    None => writeln!(out, "applied to {} (new file)", outcome.target)?,
                }
            }
        },
        Command::Backups { action } => match action {
            BackupCommand::List => {
                for name in engine.backups().list()? {
                    writeln!(out, "{name}")?;
                }
            }
            BackupCommand::Rollback { name } => {
                let outcome = engine.rollback(&name)?;
                writeln!(out, "restored {} from {}", outcome.target, outcome.backup)?;
            }
        },
        Command::Journal { .. } => {}
    }

    Ok(())
}
