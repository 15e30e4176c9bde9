//! Colored terminal output for scores, batch rows and diagnostics
//!
//! `colored` honours NO_COLOR and CLICOLOR_FORCE. Diagnostics go to stderr so that
//! `--json` output on stdout stays machine readable.

use std::fmt::Display;

use colored::Colorize;

pub fn error(msg: &(impl Display + ?Sized)) {
    eprintln!("{}: {}", "error".red().bold(), msg);
}

pub fn warning(msg: &(impl Display + ?Sized)) {
    eprintln!("{}: {}", "warning".yellow(), msg);
}

/// Batch row that scored, or a completed action such as `config init`.
pub fn success(msg: &(impl Display + ?Sized)) {
    println!("{} {}", "✓".green(), msg);
}

/// Batch row that failed; indented under the scored rows.
pub fn failure(msg: &(impl Display + ?Sized)) {
    println!("  {} {}", "✗".red(), msg);
}

/// `<method> score (<attribute>): 0.7500`
pub fn score(label: &str, value: f64) {
    println!("{}: {}", label.green(), format!("{value:.4}").bold());
}

pub fn header(msg: &(impl Display + ?Sized)) {
    println!("{}", msg.to_string().cyan().bold());
}

/// One breakdown line or config location.
pub fn detail(msg: &(impl Display + ?Sized)) {
    println!("  {msg}");
}

/// Uncolored: JSON reports, TOML settings and rendered trees.
pub fn info(msg: &(impl Display + ?Sized)) {
    println!("{msg}");
}
