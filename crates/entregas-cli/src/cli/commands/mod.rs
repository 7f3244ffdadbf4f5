//! CLI command handlers.

use std::io::{self, BufRead, Write};

use anyhow::{Result, bail};
use chrono::Local;
use entregas_core::auth::AuthSession;

pub mod account;
pub mod auth;
pub mod community;
pub mod config;
pub mod records;
pub mod report;
pub mod vehicles;

/// Prints `label` and reads one trimmed line. EOF yields an empty string.
fn prompt(label: &str) -> Result<String> {
    print!("{label}");
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().lock().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

/// Uses `value` when given, otherwise prompts for it.
fn value_or_prompt(value: Option<String>, label: &str) -> Result<String> {
    match value {
        Some(v) => Ok(v),
        None => prompt(label),
    }
}

fn require_signed(session: &AuthSession) -> Result<()> {
    if !session.signed() {
        bail!("Not signed in. Run `entregas login`.");
    }
    Ok(())
}

fn today() -> String {
    Local::now().date_naive().format("%Y-%m-%d").to_string()
}

fn money(value: f64) -> String {
    format!("R$ {value:.2}")
}

/// Notes sources that failed to load and are shown empty.
fn warn_partial(failed: &[&str]) {
    if !failed.is_empty() {
        eprintln!("Warning: could not load {}; showing what is available.", failed.join(", "));
    }
}
