//! Built-in commands known to the shell at compile time.
//!
//! Each builtin parses its tail arguments with [`argh`] (`FromArgs`) and
//! executes directly in-process, writing exclusively through the
//! [`OutputSink`].

use crate::command::{Command, Descriptor};
use crate::env::Environment;
use crate::eval::evaluate;
use crate::sink::OutputSink;
use anyhow::{Context, Result};
use argh::{EarlyExit, FromArgs};
use chrono::{DateTime, Local};
use std::fs;
use std::io;
use std::net::{TcpStream, ToSocketAddrs};
use std::path::PathBuf;
use std::time::{Duration, Instant, SystemTime};

/// The full set of built-in descriptors, in registration order.
pub fn descriptors() -> Vec<Descriptor> {
    vec![
        Descriptor {
            name: "echo",
            description: "Echo the provided text",
            aliases: &[],
            handler: Box::new(Echo),
        },
        Descriptor {
            name: "time",
            description: "Show current time",
            aliases: &[],
            handler: Box::new(Time),
        },
        Descriptor {
            name: "calc",
            description: "Evaluate a simple math expression",
            aliases: &[],
            handler: Box::new(Calc),
        },
        Descriptor {
            name: "file",
            description: "Get information about a file",
            aliases: &[],
            handler: Box::new(FileInfo),
        },
        Descriptor {
            name: "dir",
            description: "List directory contents",
            aliases: &["ls"],
            handler: Box::new(Dir),
        },
        Descriptor {
            name: "pwd",
            description: "Show current directory",
            aliases: &[],
            handler: Box::new(Pwd),
        },
        Descriptor {
            name: "cd",
            description: "Change directory",
            aliases: &[],
            handler: Box::new(Cd),
        },
        Descriptor {
            name: "ping",
            description: "Ping a host to test network connectivity",
            aliases: &[],
            handler: Box::new(Ping),
        },
    ]
}

/// Parse a builtin's arguments from the full argv.
///
/// On a usage error or `--help`, the argh-generated text is written to the
/// sink and `None` is returned; the caller should treat that as handled.
fn parse_args<T: FromArgs>(argv: &[String], sink: &mut dyn OutputSink) -> Option<T> {
    let name = argv.first().map(String::as_str).unwrap_or_default();
    let rest: Vec<&str> = argv.iter().skip(1).map(String::as_str).collect();
    match T::from_args(&[name], &rest) {
        Ok(parsed) => Some(parsed),
        Err(EarlyExit { output, status }) => {
            if status.is_ok() {
                sink.write_line(output.trim_end());
            } else {
                sink.warn(output.trim_end());
            }
            None
        }
    }
}

fn format_timestamp(time: io::Result<SystemTime>) -> String {
    match time {
        Ok(t) => DateTime::<Local>::from(t)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        Err(_) => "-".to_string(),
    }
}

#[derive(FromArgs)]
/// write the arguments to the terminal, separated by spaces
struct EchoArgs {
    #[argh(positional, greedy)]
    /// values to print as-is
    args: Vec<String>,
}

pub struct Echo;

impl Command for Echo {
    fn execute(
        &self,
        argv: &[String],
        _env: &mut Environment,
        sink: &mut dyn OutputSink,
    ) -> Result<()> {
        let Some(parsed) = parse_args::<EchoArgs>(argv, sink) else {
            return Ok(());
        };
        if parsed.args.is_empty() {
            sink.warn("Usage: echo <text>");
        } else {
            sink.info(&parsed.args.join(" "));
        }
        Ok(())
    }
}

#[derive(FromArgs)]
/// show the current local time
struct TimeArgs {}

pub struct Time;

impl Command for Time {
    fn execute(
        &self,
        argv: &[String],
        _env: &mut Environment,
        sink: &mut dyn OutputSink,
    ) -> Result<()> {
        let Some(TimeArgs {}) = parse_args::<TimeArgs>(argv, sink) else {
            return Ok(());
        };
        let now = Local::now();
        sink.info(&format!("Current time: {}", now.format("%Y-%m-%d %H:%M:%S")));
        Ok(())
    }
}

#[derive(FromArgs)]
/// evaluate a simple math expression (+ - * /, parentheses, unary sign)
struct CalcArgs {
    #[argh(positional, greedy)]
    /// the expression, possibly split across arguments
    expression: Vec<String>,
}

pub struct Calc;

impl Command for Calc {
    fn execute(
        &self,
        argv: &[String],
        _env: &mut Environment,
        sink: &mut dyn OutputSink,
    ) -> Result<()> {
        let Some(parsed) = parse_args::<CalcArgs>(argv, sink) else {
            return Ok(());
        };
        if parsed.expression.is_empty() {
            sink.warn("Usage: calc <expression>");
            return Ok(());
        }
        let expression = parsed.expression.join(" ");
        match evaluate(&expression) {
            Ok(result) => sink.success(&format!("{expression} = {result}")),
            Err(e) => sink.error(&e.to_string()),
        }
        Ok(())
    }
}

#[derive(FromArgs)]
/// get information about a file
struct FileArgs {
    #[argh(positional)]
    /// path of the file to inspect
    path: String,
}

pub struct FileInfo;

impl Command for FileInfo {
    fn execute(
        &self,
        argv: &[String],
        _env: &mut Environment,
        sink: &mut dyn OutputSink,
    ) -> Result<()> {
        let Some(parsed) = parse_args::<FileArgs>(argv, sink) else {
            return Ok(());
        };
        let metadata = match fs::metadata(&parsed.path) {
            Ok(m) if m.is_file() => m,
            Ok(_) | Err(_) => {
                sink.error(&format!("File not found: {}", parsed.path));
                return Ok(());
            }
        };
        let full_path = fs::canonicalize(&parsed.path)
            .with_context(|| format!("can't resolve {}", parsed.path))?;
        let name = full_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| parsed.path.clone());

        sink.write_line(&format!("{:<10} {}", "Name", name));
        sink.write_line(&format!("{:<10} {}", "Path", full_path.display()));
        sink.write_line(&format!("{:<10} {} bytes", "Size", metadata.len()));
        sink.write_line(&format!(
            "{:<10} {}",
            "Created",
            format_timestamp(metadata.created())
        ));
        sink.write_line(&format!(
            "{:<10} {}",
            "Modified",
            format_timestamp(metadata.modified())
        ));
        Ok(())
    }
}

#[derive(FromArgs)]
/// list directory contents
struct DirArgs {
    #[argh(positional)]
    /// directory to list; defaults to the current directory
    path: Option<String>,
}

pub struct Dir;

impl Command for Dir {
    fn execute(
        &self,
        argv: &[String],
        env: &mut Environment,
        sink: &mut dyn OutputSink,
    ) -> Result<()> {
        let Some(parsed) = parse_args::<DirArgs>(argv, sink) else {
            return Ok(());
        };
        let target = parsed
            .path
            .map(PathBuf::from)
            .unwrap_or_else(|| env.current_dir.clone());
        if !target.is_dir() {
            sink.error(&format!("Directory not found: {}", target.display()));
            return Ok(());
        }

        let mut entries = Vec::new();
        for entry in
            fs::read_dir(&target).with_context(|| format!("can't read {}", target.display()))?
        {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let metadata = entry
                .metadata()
                .with_context(|| format!("can't stat {name}"))?;
            entries.push((name, metadata));
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        sink.write_line(&format!(
            "{:<28} {:<5} {:>12}  {}",
            "Name", "Type", "Size", "Modified"
        ));
        for (name, metadata) in &entries {
            let kind = if metadata.is_dir() { "DIR" } else { "FILE" };
            let size = if metadata.is_dir() {
                String::new()
            } else {
                format!("{} bytes", metadata.len())
            };
            let modified = match metadata.modified() {
                Ok(t) => DateTime::<Local>::from(t).format("%Y-%m-%d %H:%M").to_string(),
                Err(_) => "-".to_string(),
            };
            sink.write_line(&format!("{name:<28} {kind:<5} {size:>12}  {modified}"));
        }
        Ok(())
    }
}

#[derive(FromArgs)]
/// print the current working directory
struct PwdArgs {}

pub struct Pwd;

impl Command for Pwd {
    fn execute(
        &self,
        argv: &[String],
        env: &mut Environment,
        sink: &mut dyn OutputSink,
    ) -> Result<()> {
        let Some(PwdArgs {}) = parse_args::<PwdArgs>(argv, sink) else {
            return Ok(());
        };
        sink.info(&format!("Current directory: {}", env.current_dir.display()));
        Ok(())
    }
}

#[derive(FromArgs)]
/// change the current working directory
struct CdArgs {
    #[argh(positional)]
    /// directory to switch to, absolute or relative; prints the current
    /// directory when omitted
    target: Option<String>,
}

pub struct Cd;

impl Command for Cd {
    fn execute(
        &self,
        argv: &[String],
        env: &mut Environment,
        sink: &mut dyn OutputSink,
    ) -> Result<()> {
        let Some(parsed) = parse_args::<CdArgs>(argv, sink) else {
            return Ok(());
        };
        let Some(target) = parsed.target.filter(|t| !t.is_empty()) else {
            sink.info(&format!("Current directory: {}", env.current_dir.display()));
            return Ok(());
        };

        let target = PathBuf::from(target);
        let new_dir = if target.is_absolute() {
            target
        } else {
            env.current_dir.join(target)
        };

        let canonical = fs::canonicalize(&new_dir)
            .with_context(|| format!("can't resolve {}", new_dir.display()))?;
        std::env::set_current_dir(&canonical)
            .with_context(|| format!("can't change to {}", canonical.display()))?;
        env.current_dir = canonical;
        sink.success(&format!("Changed to: {}", env.current_dir.display()));
        Ok(())
    }
}

#[derive(FromArgs)]
/// probe a host to test network connectivity
struct PingArgs {
    #[argh(positional)]
    /// hostname or IP address to probe
    host: String,
}

pub struct Ping;

/// Number of probes per invocation.
const PROBE_COUNT: usize = 5;
/// Per-probe connect timeout.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
/// Delay between consecutive probes.
const PROBE_DELAY: Duration = Duration::from_secs(1);
/// TCP port used for connect probes.
const PROBE_PORT: u16 = 80;

impl Command for Ping {
    fn execute(
        &self,
        argv: &[String],
        _env: &mut Environment,
        sink: &mut dyn OutputSink,
    ) -> Result<()> {
        let Some(parsed) = parse_args::<PingArgs>(argv, sink) else {
            return Ok(());
        };
        let host = parsed.host;

        let addr = match (host.as_str(), PROBE_PORT).to_socket_addrs() {
            Ok(mut addrs) => match addrs.next() {
                Some(addr) => addr,
                None => {
                    sink.error(&format!("Failed to resolve {host}"));
                    return Ok(());
                }
            },
            Err(e) => {
                sink.error(&format!("Failed to resolve {host}: {e}"));
                return Ok(());
            }
        };

        sink.info(&format!("Pinging {host} ({}):", addr.ip()));
        sink.write_line("");

        let mut round_trips: Vec<u128> = Vec::new();
        for i in 0..PROBE_COUNT {
            let started = Instant::now();
            match TcpStream::connect_timeout(&addr, PROBE_TIMEOUT) {
                Ok(_) => {
                    let ms = started.elapsed().as_millis();
                    round_trips.push(ms);
                    sink.info(&format!("Reply from {}: time={ms}ms", addr.ip()));
                }
                Err(e) => {
                    log::debug!("probe {} to {addr} failed: {e}", i + 1);
                    sink.warn(&format!("Request failed: {e}"));
                }
            }
            if i + 1 < PROBE_COUNT {
                std::thread::sleep(PROBE_DELAY);
            }
        }

        let sent = PROBE_COUNT;
        let received = round_trips.len();
        let lost = sent - received;
        let loss_percentage = lost * 100 / sent;

        sink.write_line("");
        sink.info(&format!("Ping statistics for {host}:"));
        sink.info(&format!(
            "    Packets: Sent = {sent}, Received = {received}, Lost = {lost} ({loss_percentage}% loss)"
        ));

        if !round_trips.is_empty() {
            let min = round_trips.iter().min().copied().unwrap_or_default();
            let max = round_trips.iter().max().copied().unwrap_or_default();
            let avg = round_trips.iter().sum::<u128>() / round_trips.len() as u128;
            sink.write_line("");
            sink.info("Approximate round trip times in milliseconds:");
            sink.info(&format!(
                "    Minimum = {min}ms, Maximum = {max}ms, Average = {avg}ms"
            ));
        }
        Ok(())
    }
}
