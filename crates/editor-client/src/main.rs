//! editor: command-line front end for editor-service
//!
//! Each invocation connects with the given token, runs one command and exits.

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use editor_client::{ClientError, EditorApi, HttpEditorApi, Session};

#[derive(Parser, Debug)]
#[command(name = "editor")]
#[command(about = "Browse and edit files behind an editor-service")]
struct Cli {
    /// Service base URL
    #[arg(long, default_value = "http://localhost:8788", env = "EDITOR_URL")]
    server: String,

    /// API token
    #[arg(long, env = "EDITOR_TOKEN", hide_env_values = true)]
    token: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check the token without listing files
    Validate,
    /// List all files
    Ls,
    /// Print a file
    Cat { file: String },
    /// Write a file from a local path, or stdin if none is given
    Put {
        file: String,
        #[arg(long)]
        from: Option<PathBuf>,
    },
    /// Create an empty file
    New { file: String },
    /// Delete a file
    Rm { file: String },
    /// Rename a file, replacing any existing target
    Mv { old: String, new: String },
    /// Fetch a file through the download route into a local directory
    Download {
        file: String,
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
    /// Show every match of a pattern in a file
    Find { file: String, pattern: String },
    /// Replace every match of a pattern in a file
    ///
    /// Prints the result unless --save or --out is given.
    Replace {
        file: String,
        search: String,
        replacement: String,
        /// Write the result back to the server
        #[arg(long)]
        save: bool,
        /// Write the result into this local directory
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "editor_client=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let api = HttpEditorApi::new(&cli.server);

    if let Command::Validate = cli.command {
        if !api.validate_token(&cli.token).await? {
            return Err(ClientError::InvalidToken.into());
        }
        println!("Token is valid");
        return Ok(());
    }

    let mut session = Session::new(api);
    session.connect(&cli.token).await?;

    match cli.command {
        Command::Validate => {}
        Command::Ls => {
            for file in session.files() {
                println!("{}", file);
            }
        }
        Command::Cat { file } => {
            session.load(&file).await?;
            print!("{}", session.text());
        }
        Command::Put { file, from } => {
            let content = match from {
                Some(path) => tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                None => {
                    let mut content = String::new();
                    std::io::stdin()
                        .read_to_string(&mut content)
                        .context("Failed to read stdin")?;
                    content
                }
            };
            session.set_text(content);
            session.save_as(&file).await?;
            eprintln!("Saved {}", file);
        }
        Command::New { file } => {
            session.create(&file).await?;
            eprintln!("Created {}", file);
        }
        Command::Rm { file } => {
            session.delete(&file).await?;
            eprintln!("Deleted {}", file);
        }
        Command::Mv { old, new } => {
            session.rename(&old, &new).await?;
            eprintln!("Renamed {} to {}", old, new);
        }
        Command::Download { file, dir } => {
            let download = session.download(&file).await?;
            let path = dir.join(download.filename.replace(['/', '\\'], "_"));
            tokio::fs::write(&path, download.content)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("{}", path.display());
        }
        Command::Find { file, pattern } => {
            session.load(&file).await?;
            let matches = session.find(&pattern)?;
            let lines: Vec<&str> = session.text().lines().collect();
            for m in &matches {
                let line = lines.get(m.line - 1).copied().unwrap_or_default();
                println!("{}:{}: {}", m.line, m.column, line);
            }
            if matches.is_empty() {
                eprintln!("No matches");
            }
        }
        Command::Replace {
            file,
            search,
            replacement,
            save,
            out,
        } => {
            session.load(&file).await?;
            let count = session.replace(&search, &replacement)?;
            eprintln!("Replaced {} occurrence(s)", count);

            if save {
                session.save_to_cloud().await?;
                eprintln!("Saved {}", file);
            }
            match out {
                Some(dir) => {
                    let path = session.save_locally(&dir).await?;
                    eprintln!("Wrote {}", path.display());
                }
                None if !save => print!("{}", session.text()),
                None => {}
            }
        }
    }

    Ok(())
}
