//! Console and file logging for the scaffold CLI.
//!
//! Console output is coloured and filtered by verbosity. Every message is also
//! appended, with a timestamp, to a log file under the user cache directory so
//! that bug reports can include the full trace of a command.

use chrono::Local;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::process::Output;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

/// 0 = quiet, 1 = normal, 2 = verbose, 3+ = trace
static VERBOSITY: AtomicU8 = AtomicU8::new(1);
static LOG_FILE: OnceLock<Mutex<Option<PathBuf>>> = OnceLock::new();

fn log_file_slot() -> &'static Mutex<Option<PathBuf>> {
    LOG_FILE.get_or_init(|| Mutex::new(None))
}

/// Configure verbosity and the log file location.
///
/// `log_path` overrides the default `<cache>/scaffold/scaffold.log`. Passing
/// `None` keeps the default; file logging failures are never fatal.
pub fn init(verbosity: u8, log_path: Option<PathBuf>) {
    VERBOSITY.store(verbosity, Ordering::Relaxed);
    let path = log_path.or_else(default_log_path);
    if let Some(ref p) = path {
        if let Some(parent) = p.parent() {
            let _ = fs::create_dir_all(parent);
        }
    }
    if let Ok(mut slot) = log_file_slot().lock() {
        *slot = path;
    }
}

fn default_log_path() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("scaffold").join("scaffold.log"))
}

pub fn get_verbosity() -> u8 {
    VERBOSITY.load(Ordering::Relaxed)
}

pub fn set_verbosity(level: u8) {
    VERBOSITY.store(level, Ordering::Relaxed);
}

pub fn get_log_path() -> Option<PathBuf> {
    log_file_slot().lock().ok().and_then(|slot| slot.clone())
}

pub fn get_log_path_string() -> String {
    get_log_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<disabled>".to_string())
}

fn write_to_file(level: &str, message: &str) {
    let Some(path) = get_log_path() else {
        return;
    };
    let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
    for line in message.lines() {
        let _ = writeln!(file, "[{}] {:<5} {}", timestamp, level, line);
    }
}

pub fn debug(message: &str) {
    write_to_file("DEBUG", message);
    if get_verbosity() >= 2 {
        eprintln!("{} {}", "DEBUG".dimmed(), message.dimmed());
    }
}

pub fn info(message: &str) {
    write_to_file("INFO", message);
    if get_verbosity() >= 2 {
        eprintln!("{} {}", "INFO".blue(), message);
    }
}

pub fn warn(message: &str) {
    write_to_file("WARN", message);
    if get_verbosity() >= 1 {
        eprintln!("{} {}", "warning:".yellow().bold(), message);
    }
}

pub fn error(message: &str) {
    write_to_file("ERROR", message);
    eprintln!("{} {}", "error:".red().bold(), message);
}

/// A user-facing progress line, shown unless quiet.
pub fn step(message: &str) {
    write_to_file("STEP", message);
    if get_verbosity() >= 1 {
        println!("{} {}", "•".cyan(), message.bold());
    }
}

pub fn success(message: &str) {
    write_to_file("OK", message);
    if get_verbosity() >= 1 {
        println!("{} {}", "✔".green(), message);
    }
}

/// Record the stdout/stderr of a finished subprocess.
///
/// Output always goes to the log file; it is echoed to the console only in
/// verbose mode or when the command failed.
pub fn capture_output(label: &str, output: &Output) {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    write_to_file("CMD", &format!("{} (status: {})", label, output.status));
    if !stdout.trim().is_empty() {
        write_to_file("OUT", &stdout);
    }
    if !stderr.trim().is_empty() {
        write_to_file("ERR", &stderr);
    }

    if get_verbosity() >= 2 || !output.status.success() {
        if !stdout.trim().is_empty() {
            eprintln!("{}", stdout.trim_end().dimmed());
        }
        if !stderr.trim().is_empty() {
            eprintln!("{}", stderr.trim_end());
        }
    }
}

/// Spinner for long-running subprocesses. Hidden when quiet.
pub fn spinner(message: &str) -> ProgressBar {
    write_to_file("STEP", message);
    if get_verbosity() == 0 {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(90));
    bar
}
