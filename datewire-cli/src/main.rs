//! datewire inspector
//!
//! Reads JSON requests from stdin, one per line, and answers each with one
//! JSON line on stdout. Logs go to stderr.
//!
//! Ops:
//! - decode: wide packed pair to calendar views
//! - decode_small: smalldatetime pair to calendar views
//! - encode: calendar string to packed pair
//! - count_parameters: placeholders in a statement
//! - declare: formal parameter mapping and declaration list
//!
//! Environment:
//! - DATEWIRE_LOG: max log level (default `info`)
//! - DATEWIRE_PROFILE: path to a JSON server profile

mod ops;

use datewire_core::{codes, DriverError};
use datewire_params::ServerProfile;
use std::env;
use std::fs;
use std::io::{self, BufRead, IsTerminal, Write};
use std::process::ExitCode;
use tracing::{debug, error, info, Level};

const SERVER_NAME: &str = "datewire";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get the log level from environment
fn log_level() -> Level {
    env::var("DATEWIRE_LOG")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(Level::INFO)
}

/// Load the server profile named by the environment, or the default one
fn load_profile() -> Result<ServerProfile, DriverError> {
    let path = match env::var("DATEWIRE_PROFILE") {
        Ok(path) => path,
        Err(_) => return Ok(ServerProfile::default()),
    };
    let text = fs::read_to_string(&path).map_err(|e| {
        DriverError::new(codes::GENERAL, format!("Failed to read profile '{}': {}", path, e))
    })?;
    serde_json::from_str(&text).map_err(|e| {
        DriverError::new(codes::GENERAL, format!("Invalid profile '{}': {}", path, e))
            .with_suggestion(r#"Expected {"version": "tds70", "unicode": true, "charset": "single_byte"}"#)
    })
}

fn write_response(out: &mut impl Write, response: &ops::Response) -> io::Result<()> {
    serde_json::to_writer(&mut *out, response)?;
    writeln!(out)?;
    out.flush()
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(log_level())
        .init();

    let profile = match load_profile() {
        Ok(profile) => profile,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("{} inspector v{} started", SERVER_NAME, SERVER_VERSION);
    info!(?profile, "server profile");
    debug!(
        stdin_terminal = io::stdin().is_terminal(),
        stdout_terminal = io::stdout().is_terminal(),
        "terminal detection"
    );

    let stdin = io::stdin();
    let mut reader = io::BufReader::new(stdin.lock());

    loop {
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) => {
                debug!("end of input");
                break;
            }
            Ok(_) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                debug!(bytes = line.len(), "received request");

                let response = ops::handle_line(line, &profile);

                let mut stdout = io::stdout().lock();
                if let Err(e) = write_response(&mut stdout, &response) {
                    error!("Error writing response: {}", e);
                    return ExitCode::FAILURE;
                }
            }
            Err(e) => {
                error!("Error reading input: {}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    info!("inspector shutting down");
    ExitCode::SUCCESS
}
