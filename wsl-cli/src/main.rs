//! WSL command-line tool.
//!
//! Reads an XML document from a file or from piped stdin and writes it to
//! stdout as WSL.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, IsTerminal, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Convert an XML document to WSL
#[derive(Parser)]
#[command(name = "wsl")]
#[command(version)]
#[command(about = "Convert an XML document to WSL", long_about = None)]
struct Cli {
    /// XML file to convert (default: piped stdin)
    file: Option<PathBuf>,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let result = match open_input(cli.file.as_deref()) {
        Ok(Some(input)) => run(input),
        Ok(None) => {
            println!("Missing document");
            return ExitCode::FAILURE;
        }
        Err(e) => Err(e.into()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Diagnostics go to stderr so stdout only ever carries WSL.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Opens the named file, or stdin when input is piped.
///
/// Returns `Ok(None)` when there is no document: the file does not exist, or
/// no file was named and stdin is a terminal.
fn open_input(path: Option<&Path>) -> io::Result<Option<Box<dyn Read>>> {
    match path {
        Some(path) => match File::open(path) {
            Ok(file) => {
                debug!(path = %path.display(), "reading input file");
                Ok(Some(Box::new(BufReader::new(file))))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "input file not found");
                Ok(None)
            }
            Err(e) => Err(e),
        },
        None => {
            let stdin = io::stdin();
            if stdin.is_terminal() {
                Ok(None)
            } else {
                debug!("reading piped stdin");
                Ok(Some(Box::new(stdin.lock())))
            }
        }
    }
}

/// Transcodes the whole input to stdout.
fn run(input: Box<dyn Read>) -> Result<(), Box<dyn std::error::Error>> {
    let stdout = io::stdout();
    let mut output = BufWriter::new(stdout.lock());
    xml_wsl::transcode(input, &mut output)?;
    output.flush()?;
    Ok(())
}
