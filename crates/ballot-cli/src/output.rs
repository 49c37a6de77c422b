//! Output formatting helpers.

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

use ballot_core::GraphQlError;

pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

pub fn hint(msg: &str) {
    eprintln!("{}", msg.dimmed());
}

/// Print a labeled field.
pub fn field(label: &str, value: &str) {
    println!("{}: {}", label.dimmed(), value);
}

/// Print GraphQL errors to stderr, one per line, with their code if set.
pub fn graphql_errors(errors: &[GraphQlError]) {
    for e in errors {
        match e.code() {
            Some(code) => error(&format!("{} [{}]", e.message, code.yellow())),
            None => error(&e.message),
        }
    }
}

/// Print a value as compact JSON.
pub fn json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

/// Print a value as pretty-printed JSON.
pub fn json_pretty<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
