//! Clipring command-line client.

mod ipc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use clipring_common::{ClipEntry, ImageBlob};
use std::io::Read;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::ipc::{IpcClient, Update};

#[derive(Parser)]
#[command(name = "clipring", version, about = "Clipboard history from the command line")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the clipboard history, newest first
    History {
        /// Show at most this many entries
        #[arg(short, long)]
        limit: Option<usize>,
        /// Only show text entries containing this, ignoring case
        #[arg(short, long)]
        search: Option<String>,
        /// Print entries as JSON
        #[arg(long)]
        json: bool,
    },
    /// Put text on the clipboard (reads stdin when TEXT is omitted)
    Copy { text: Option<String> },
    /// Put a PNG image on the clipboard
    CopyImage { path: PathBuf },
    /// Paste a history entry into the focused application
    Paste { id: u64 },
    /// Clear the history
    Clear,
    /// Print history and visibility changes as they happen
    Watch,
    /// Show or hide the history surface
    Toggle,
    /// Hide the history surface
    Hide,
    /// Print daemon status
    Status,
    /// Check that the daemon is running
    Ping,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("clipring=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut client = IpcClient::connect()?;

    match cli.command {
        Command::History {
            limit,
            search,
            json,
        } => {
            let entries = client.get_history(limit, search)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                for entry in &entries {
                    print_entry(entry);
                }
            }
        }

        Command::Copy { text } => {
            let text = match text {
                Some(text) => text,
                None => {
                    let mut text = String::new();
                    std::io::stdin()
                        .read_to_string(&mut text)
                        .context("Failed to read stdin")?;
                    text
                }
            };
            if !client.copy_text(text)? {
                bail!("The clipboard rejected the text");
            }
        }

        Command::CopyImage { path } => {
            let data = std::fs::read(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            if !client.copy_image(ImageBlob::from(data))? {
                bail!("The clipboard rejected the image");
            }
        }

        Command::Paste { id } => {
            let entry = client.paste(id)?;
            tracing::debug!("Pasted {}", entry.accessible_description());
        }

        Command::Clear => client.clear_history()?,

        Command::Watch => {
            for update in client.subscribe()? {
                match update? {
                    Update::History(entries) => {
                        println!("history: {} entries", entries.len());
                        if let Some(newest) = entries.first() {
                            print_entry(newest);
                        }
                    }
                    Update::Visibility(visible) => {
                        println!("surface: {}", if visible { "shown" } else { "hidden" });
                    }
                }
            }
        }

        Command::Toggle => client.toggle_visibility()?,

        Command::Hide => client.hide_surface()?,

        Command::Status => {
            let status = client.status()?;
            println!("version:     {}", status.version);
            println!("entries:     {}/{}", status.entry_count, status.max_entries);
            println!("visible:     {}", status.visible);
            println!("subscribers: {}", status.subscribers);
        }

        Command::Ping => {
            client.ping()?;
            println!("pong");
        }
    }

    Ok(())
}

fn print_entry(entry: &ClipEntry) {
    println!("{:>6}  {}", entry.id, entry.preview());
}
