//! ukvfs - boot a VFS from a mount table and look around in it.
//!
//! Usage:
//!   ukvfs [--config FILE] tree
//!   ukvfs [--config FILE] stat <path>...
//!   ukvfs [--config FILE] get <path>

mod boot;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use ukvfs::{global, Dirent, Disk};

use boot::Boot;

/// ukvfs - inspect a unikernel virtual file system
#[derive(Parser, Debug)]
#[command(name = "ukvfs")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Boot layout (JSON). A demo layout is used when omitted.
    #[arg(long, short)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the mount tree
    Tree,
    /// Stat paths through the file systems they are mounted from
    Stat {
        #[arg(required = true)]
        paths: Vec<String>,
    },
    /// Show the object mounted at a path
    Get { path: String },
}

fn main() -> ExitCode {
    // Respects RUST_LOG
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:?}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<ExitCode> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .context("starting runtime")?;
    runtime.block_on(run_async(args))
}

async fn run_async(args: Args) -> Result<ExitCode> {
    let boot = match &args.config {
        Some(path) => Boot::from_file(path)?,
        None => Boot::from_json(boot::DEMO)?,
    };
    boot.apply(global::global()).await?;

    match args.command {
        Command::Tree => {
            print!("{}", global::print_tree());
            Ok(ExitCode::SUCCESS)
        }
        Command::Stat { paths } => {
            let mut code = ExitCode::SUCCESS;
            for path in &paths {
                match global::stat(path.as_str()).await {
                    Ok(dirent) => println!(
                        "{:<32} {:<9} {:>8}  {}",
                        path,
                        format!("{:?}", dirent.kind()).to_lowercase(),
                        dirent.size(),
                        dirent.fs_name().unwrap_or("-"),
                    ),
                    Err(e) => {
                        eprintln!("{}: {}", path, e);
                        code = ExitCode::FAILURE;
                    }
                }
            }
            Ok(code)
        }
        Command::Get { path } => {
            println!("{}", describe(&path)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Describe the object at `path` for the known mount types.
fn describe(path: &str) -> Result<String> {
    if let Ok(dirent) = global::get::<Dirent>(path) {
        return Ok(format!("{:#?}", dirent));
    }
    if let Ok(disk) = global::get::<Disk>(path) {
        return Ok(format!("{:#?}", disk));
    }
    let vfs = global::global();
    let found = vfs.walk(path, false)?;
    vfs.with_tree(|tree| {
        let entry = found
            .and_then(|id| tree.get(id))
            .with_context(|| format!("{} is not mounted", path))?;
        Ok(format!(
            "{} ({}): {}",
            entry.name(),
            entry.type_name(0),
            entry.desc()
        ))
    })
}
