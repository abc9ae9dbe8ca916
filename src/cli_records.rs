//! Maintenance tool for the recipient directory and the record store.

use anyhow::{bail, Context, Result};
use chrono::{Duration, Utc};
use clap::builder::styling::{AnsiColor, Color, Style, Styles};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use pushfan_server::directory::SqliteRecipientDirectory;
use pushfan_server::purge::{
    PurgeDriver, PurgeOutcome, SqliteRecordStore, DEFAULT_RETENTION_DAYS,
};

fn get_styles() -> Styles {
    Styles::styled()
        .usage(
            Style::new()
                .bold()
                .underline()
                .fg_color(Some(Color::Ansi(AnsiColor::Cyan))),
        )
        .header(
            Style::new()
                .bold()
                .underline()
                .fg_color(Some(Color::Ansi(AnsiColor::Cyan))),
        )
        .literal(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Green))),
        )
        .error(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Red))),
        )
}

fn parse_dir(s: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(s);
    if !path.is_dir() {
        return Err(format!("Not a directory: {}", s));
    }
    Ok(path)
}

#[derive(Parser)]
#[command(styles = get_styles())]
struct CliArgs {
    /// Directory holding directory.db and records.db.
    #[clap(long, value_parser = parse_dir)]
    db_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Adds a recipient address, opted in unless --opted-out is given.
    AddRecipient {
        address: String,
        #[clap(long)]
        opted_out: bool,
    },

    /// Adds one opted-in recipient per non-empty line of the given file.
    ImportRecipients { file: PathBuf },

    /// Changes the opt-in flag of every recipient with the given address.
    SetOptIn {
        address: String,
        #[clap(action = clap::ArgAction::Set)]
        opt_in: bool,
    },

    /// Lists addresses flagged for removal after permanent delivery failures.
    ListFlagged,

    /// Adds a record created `age_days` ago.
    AddRecord {
        id: String,
        #[clap(long, default_value_t = 0)]
        age_days: i64,
        #[clap(long)]
        payload: Option<String>,
    },

    /// Runs one bounded purge pass immediately.
    Purge {
        #[clap(long, default_value_t = DEFAULT_RETENTION_DAYS)]
        retention_days: u64,
    },

    /// Prints recipient and record counts.
    Stats {
        #[clap(long, default_value_t = DEFAULT_RETENTION_DAYS)]
        retention_days: u64,
    },
}

fn open_directory(args: &CliArgs) -> Result<SqliteRecipientDirectory> {
    SqliteRecipientDirectory::new(args.db_dir.join("directory.db"))
}

fn open_records(args: &CliArgs) -> Result<SqliteRecordStore> {
    SqliteRecordStore::new(args.db_dir.join("records.db"))
}

fn main() -> Result<()> {
    let args = CliArgs::parse();

    match &args.command {
        Command::AddRecipient { address, opted_out } => {
            let id = open_directory(&args)?.add_recipient(address, !opted_out)?;
            println!("Added recipient {} (id {})", address, id);
        }
        Command::ImportRecipients { file } => {
            let content = std::fs::read_to_string(file)
                .with_context(|| format!("Failed to read {:?}", file))?;
            let addresses: Vec<&str> = content
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .collect();
            let added = open_directory(&args)?.add_recipients(&addresses, true)?;
            println!("Imported {} recipients", added);
        }
        Command::SetOptIn { address, opt_in } => {
            let updated = open_directory(&args)?.set_opt_in(address, *opt_in)?;
            if updated == 0 {
                bail!("No recipient with address {}", address);
            }
            println!("Updated {} recipients", updated);
        }
        Command::ListFlagged => {
            let flagged = open_directory(&args)?.get_flagged_addresses()?;
            if flagged.is_empty() {
                println!("No flagged addresses");
            }
            for entry in flagged {
                println!("{}\t{}\t{}", entry.flagged_at, entry.error_code, entry.address);
            }
        }
        Command::AddRecord {
            id,
            age_days,
            payload,
        } => {
            let created_at = (Utc::now() - Duration::days(*age_days)).timestamp();
            open_records(&args)?.insert_record(id, payload.as_deref(), created_at)?;
            println!("Added record {} (created_at {})", id, created_at);
        }
        Command::Purge { retention_days } => {
            let store = Arc::new(open_records(&args)?);
            let driver = PurgeDriver::new(store, Duration::days(*retention_days as i64));
            match driver.run() {
                PurgeOutcome::NothingToDo => println!("Nothing to purge"),
                PurgeOutcome::Deleted {
                    count,
                    more_remaining,
                } => {
                    println!("Deleted {} records", count);
                    if more_remaining {
                        println!("More expired records remain; run again to continue");
                    }
                }
                PurgeOutcome::Failed { reason } => bail!("Purge failed: {}", reason),
            }
        }
        Command::Stats { retention_days } => {
            let directory = open_directory(&args)?;
            let records = open_records(&args)?;
            let cutoff = (Utc::now() - Duration::days(*retention_days as i64)).timestamp();
            println!("Recipients: {}", directory.count_recipients()?);
            println!("Flagged: {}", directory.get_flagged_addresses()?.len());
            println!("Records: {}", records.count_records()?);
            println!(
                "Expired (> {} days): {}",
                retention_days,
                records.count_older_than(cutoff)?
            );
        }
    }

    Ok(())
}
