//! Network front end
//!
//! A thin newline-delimited JSON surface over TCP: one request maps to one
//! dispatcher call under the untrusted profile. It adds nothing beyond the
//! envelope; all semantics live in the dispatcher.

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

use serde::{Deserialize, Serialize};

use crate::commands::{CommandOutcome, Dispatcher, ExposureProfile};

#[derive(Debug, Deserialize)]
struct CommandRequest {
    command: String,
    #[serde(default)]
    args: Vec<String>,
}

#[derive(Debug, Serialize)]
struct CommandResponse {
    status: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    args: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'static str>,
}

impl CommandResponse {
    fn success(message: String, args: Vec<String>) -> Self {
        CommandResponse {
            status: "success",
            message,
            args: Some(args),
            error: None,
        }
    }

    fn failure(error: &'static str, message: String) -> Self {
        CommandResponse {
            status: "error",
            message,
            args: None,
            error: Some(error),
        }
    }
}

/// Binds the listener and serves until the process exits. Each connection
/// gets its own thread; the dispatcher itself is already thread-safe.
pub fn run_server(addr: &str, dispatcher: Arc<Dispatcher>) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr)?;
    log::info!("Command server listening on {}", addr);
    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                let dispatcher = Arc::clone(&dispatcher);
                thread::spawn(move || handle_connection(stream, &dispatcher));
            }
            Err(e) => log::warn!("Accept failed: {}", e),
        }
    }
    Ok(())
}

fn handle_connection(stream: TcpStream, dispatcher: &Dispatcher) {
    let peer = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    log::info!("Connection from {}", peer);

    let reader = BufReader::new(match stream.try_clone() {
        Ok(read_half) => read_half,
        Err(e) => {
            log::error!("Stream clone failed for {}: {}", peer, e);
            return;
        }
    });
    let mut writer = stream;

    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                log::warn!("Read from {} failed: {}", peer, e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let response = handle_request(&line, dispatcher);
        let mut encoded = match serde_json::to_string(&response) {
            Ok(encoded) => encoded,
            Err(e) => {
                log::error!("Response encoding failed: {}", e);
                break;
            }
        };
        encoded.push('\n');
        if writer.write_all(encoded.as_bytes()).is_err() {
            break;
        }
    }
    log::info!("Connection from {} closed", peer);
}

fn handle_request(line: &str, dispatcher: &Dispatcher) -> CommandResponse {
    let request: CommandRequest = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => {
            return CommandResponse::failure("invalid_argument", format!("malformed request: {}", e))
        }
    };

    match dispatcher.dispatch(&request.command, &request.args, ExposureProfile::Untrusted) {
        Ok(CommandOutcome::Success { message }) => CommandResponse::success(message, request.args),
        // Exit is deny-listed by default; if a deployment allows it, the
        // server acknowledges without tearing the process down.
        Ok(CommandOutcome::Terminate) => {
            CommandResponse::success("terminate acknowledged".to_string(), request.args)
        }
        Err(err) => CommandResponse::failure(err.kind(), err.to_string()),
    }
}
