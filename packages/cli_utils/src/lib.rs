#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared CLI utilities for the siting tools.
//!
//! Provides `indicatif` spinners and step bars, a validated number prompt,
//! and [`init_logger`] which sets up `indicatif-log-bridge` so that
//! `log::info!` and friends are suspended while progress bars redraw.
//!
//! Any binary that calls [`init_logger()`] at startup gets full progress bar
//! support for free.

use std::time::Duration;

use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};

pub use indicatif::MultiProgress;

/// Creates a spinner for work of unknown length (loading a layer,
/// indexing features).
#[must_use]
pub fn spinner(multi: &MultiProgress, message: &str) -> ProgressBar {
    let bar = multi.add(ProgressBar::new_spinner());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.set_message(message.to_string());
    bar
}

/// Creates a bar for step-level progress (e.g., radii 2/5).
/// Total is known up front so this starts as a bar immediately.
#[must_use]
pub fn steps_bar(multi: &MultiProgress, message: &str, total: u64) -> ProgressBar {
    let bar = multi.add(ProgressBar::new(total));
    bar.set_style(
        ProgressStyle::with_template("{msg} {wide_bar:.green/dim} {pos}/{len} [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
    );
    bar.set_message(message.to_string());
    bar
}

/// Prompts for a positive, finite number, re-asking until one is given.
///
/// # Errors
///
/// Returns an error if the terminal interaction fails.
pub fn prompt_positive(prompt: &str, default: f64) -> Result<f64, dialoguer::Error> {
    Input::<f64>::new()
        .with_prompt(prompt)
        .default(default)
        .validate_with(|value: &f64| -> Result<(), &str> {
            if value.is_finite() && *value > 0.0 {
                Ok(())
            } else {
                Err("Enter a positive number")
            }
        })
        .interact_text()
}

/// Initializes the global logger wrapped in `indicatif-log-bridge` so that
/// `log::info!` and friends are suspended while progress bars redraw.
///
/// Returns the [`MultiProgress`] that all progress bars must be added to.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    // Build the pretty-env-logger logger manually so we can wrap it.
    let logger = pretty_env_logger::formatted_builder()
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .ok(); // Ignore error if logger was already set (e.g., in tests)

    log::set_max_level(level);

    multi
}
