//! ImageClicker
//!
//! Watches the screen for known reference images and clicks them when
//! they appear: capture, search, click-or-wait, repeat, until
//! interrupted. Detection uses grayscale template matching against the
//! `.png` screenshots in the image directory.
//!
//! This tool issues real input events. Use it only in controlled
//! environments.

mod automation;
mod capture;
mod corpus;
mod error;
mod input;
mod matcher;
mod paths;
mod validator;

use anyhow::Result;
use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;

use automation::{CancelToken, Config, Scheduler};
use capture::ScreenFrameSource;
use corpus::Corpus;
use error::ClickerError;
use input::EnigoPointer;
use matcher::NccMatcher;

/// Logs a message to both console and log file with timestamp.
pub fn log(msg: &str) {
    let timestamp = Local::now().format("%H:%M:%S%.3f");
    let line = format!("[{}] {}\n", timestamp, msg);
    print!("{}", line);
    let log_path = paths::get_logs_dir().join("image_clicker.log");
    if let Ok(mut file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        let _ = file.write_all(line.as_bytes());
    }
}

fn print_banner() {
    let rule = "=".repeat(60);
    println!("{}", rule);
    println!("ImageClicker - visual click automation");
    println!("{}", rule);
    println!("WARNING: this tool clicks based on what it sees on screen.");
    println!("Use only in controlled environments, at your own risk.");
    println!("{}", rule);
}

fn main() -> Result<()> {
    paths::ensure_directories()?;
    print_banner();

    let mut config = Config::load();
    // Optional positional argument overrides the image directory.
    if let Some(dir) = std::env::args().nth(1) {
        config.images_dir = dir;
    }

    let images_dir = paths::resolve_images_dir(&config.images_dir);
    let corpus = match Corpus::load(&images_dir) {
        Ok(corpus) => corpus,
        Err(ClickerError::DirectoryMissing(dir)) => {
            log(&format!("Creating image directory '{}'", dir.display()));
            std::fs::create_dir_all(&dir)?;
            log("Directory created, but it is empty.");
            log("Add .png screenshots of the elements to detect, then run again.");
            anyhow::bail!("no reference images configured");
        }
        Err(ClickerError::EmptyCorpus(dir)) => {
            log(&format!("No .png images found in '{}'.", dir.display()));
            log("Add screenshots of buttons, icons, or dialogs to detect.");
            anyhow::bail!("reference image directory is empty");
        }
        Err(e) => return Err(e.into()),
    };

    log(&format!("{} reference image(s) loaded:", corpus.len()));
    for reference in corpus.references() {
        log(&format!(
            "  {} ({}x{})",
            reference.name, reference.width, reference.height
        ));
    }

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || cancel.cancel())?;
    }

    let pointer = EnigoPointer::new()?;
    let mut scheduler = Scheduler::new(
        config,
        corpus,
        ScreenFrameSource::new(),
        NccMatcher,
        pointer,
        cancel,
    );

    log("Started. Press Ctrl+C to stop.");
    log("Move the pointer to the top-left corner for an emergency stop.");

    let counters = scheduler.run()?;

    log(&format!(
        "Stopped after {} cycle(s), {} click(s).",
        counters.cycles, counters.clicks
    ));
    Ok(())
}
