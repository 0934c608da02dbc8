//! comlink-lsp: Language Server Protocol implementation for Comlink
//!
//! Without a subcommand the binary serves LSP over stdio, providing:
//! - Diagnostics (syntax errors, and map validation against its profile)
//! - Document symbols (file, namespace and definitions outline)
//! - Workspace symbols
//!
//! `check` and `parse` run the same analysis from the command line.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tower_lsp::lsp_types::DiagnosticSeverity;
use tower_lsp::{LspService, Server};
use tracing_subscriber::EnvFilter;

use comlink_lsp::{Backend, DiskStorage, DocumentKind, Silent, Workspace};

/// Language server for Comlink profiles and maps
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve LSP on stdin/stdout (the default)
    Serve,
    /// Load every profile and map under the given folders and print their
    /// diagnostics, failing if any is an error
    Check {
        #[arg(required = true)]
        roots: Vec<PathBuf>,
    },
    /// Parse a single profile or map and print its syntax tree as JSON
    Parse { file: PathBuf },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Logs go to stderr since stdout is for LSP
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            serve().await;
            Ok(ExitCode::SUCCESS)
        }
        Command::Check { roots } => check(roots).await,
        Command::Parse { file } => parse(&file),
    }
}

async fn serve() {
    tracing::info!("Starting comlink-lsp server");

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(Backend::new);
    Server::new(stdin, stdout, socket).serve(service).await;
}

#[tracing::instrument]
async fn check(roots: Vec<PathBuf>) -> Result<ExitCode> {
    let mut absolute = Vec::with_capacity(roots.len());
    for root in roots {
        absolute.push(
            tokio::fs::canonicalize(&root)
                .await
                .with_context(|| format!("cannot resolve {}", root.display()))?,
        );
    }

    let workspace = Workspace::new(Arc::new(DiskStorage));
    workspace
        .spawn_bootstrap(absolute, Arc::new(Silent))
        .join()
        .await?;

    let mut documents = workspace.registry().all();
    documents.sort_by(|a, b| a.uri().as_str().cmp(b.uri().as_str()));

    let mut errors = 0;
    let mut lines = Vec::new();
    for document in documents {
        let path = document
            .uri()
            .to_file_path()
            .unwrap_or_else(|()| PathBuf::from(document.uri().path()));
        for diagnostic in workspace.diagnostics(document.uri()).await?.iter() {
            let severity = match diagnostic.severity {
                Some(DiagnosticSeverity::ERROR) => {
                    errors += 1;
                    "error"
                }
                Some(DiagnosticSeverity::WARNING) => "warning",
                Some(_) | None => "info",
            };
            lines.push(format!(
                "{}:{}:{}: {severity}: {}",
                path.display(),
                diagnostic.range.start.line + 1,
                diagnostic.range.start.character + 1,
                diagnostic.message.replace('\n', " "),
            ));
        }
    }

    let mut stdout = io::stdout().lock();
    for line in lines {
        writeln!(stdout, "{line}")?;
    }
    stdout.flush()?;

    Ok(if errors == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[tracing::instrument]
fn parse(file: &Path) -> Result<ExitCode> {
    let Some(kind) = DocumentKind::from_path(file) else {
        bail!("{} is not a .supr or .suma file", file.display());
    };
    let input = std::fs::read_to_string(file)
        .with_context(|| format!("cannot read {}", file.display()))?;

    match comlink_parser::parse(&input, kind.syntax_kind()) {
        Ok(tree) => {
            let mut stdout = io::stdout();
            serde_json::to_writer_pretty(&stdout, &tree)?;
            writeln!(stdout)?;
            stdout.flush()?;
            Ok(ExitCode::SUCCESS)
        }
        Err(error) => {
            eprintln!(
                "{}:{}:{}: {}: {}",
                file.display(),
                error.location.line,
                error.location.column,
                error.category,
                error.message().replace('\n', " "),
            );
            Ok(ExitCode::FAILURE)
        }
    }
}
