//! Loop configuration.
//!
//! Loads settings from config.json next to the executable at startup,
//! falling back to defaults field by field. The config is passed into
//! the scheduler by value; nothing reads it globally.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Complete loop configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Minimum match confidence to accept (0.0 to 1.0)
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,
    /// Maximum relative deviation of matched size from reference size,
    /// per axis
    #[serde(default = "default_size_tolerance")]
    pub size_tolerance: f32,
    /// Pause after a dispatched click before the next capture
    /// (milliseconds)
    #[serde(default = "default_post_click_delay_ms")]
    pub post_click_delay_ms: u64,
    /// Pause after a cycle with no match (milliseconds)
    #[serde(default = "default_no_match_delay_ms")]
    pub no_match_delay_ms: u64,
    /// Directory holding the reference images
    #[serde(default = "default_images_dir")]
    pub images_dir: String,
    /// How often sleeps check for cancellation (milliseconds)
    #[serde(default = "default_cancel_poll_ms")]
    pub cancel_poll_ms: u64,
    /// Side of the top-left emergency-stop square (pixels)
    #[serde(default = "default_emergency_corner_px")]
    pub emergency_corner_px: i32,
}

fn default_confidence_threshold() -> f32 {
    0.95
}

fn default_size_tolerance() -> f32 {
    0.10
}

fn default_post_click_delay_ms() -> u64 {
    500
}

fn default_no_match_delay_ms() -> u64 {
    1500
}

fn default_images_dir() -> String {
    "images".to_string()
}

fn default_cancel_poll_ms() -> u64 {
    50
}

fn default_emergency_corner_px() -> i32 {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            size_tolerance: default_size_tolerance(),
            post_click_delay_ms: default_post_click_delay_ms(),
            no_match_delay_ms: default_no_match_delay_ms(),
            images_dir: default_images_dir(),
            cancel_poll_ms: default_cancel_poll_ms(),
            emergency_corner_px: default_emergency_corner_px(),
        }
    }
}

impl Config {
    /// Loads configuration from config.json next to the executable, or
    /// returns defaults.
    pub fn load() -> Self {
        let config_path = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|p| p.join("config.json")))
            .unwrap_or_else(|| Path::new("config.json").to_path_buf());

        if config_path.exists() {
            match fs::read_to_string(&config_path) {
                Ok(contents) => match serde_json::from_str(&contents) {
                    Ok(config) => {
                        crate::log("Config loaded from config.json");
                        return config;
                    }
                    Err(e) => {
                        crate::log(&format!(
                            "Failed to parse config.json: {}. Using defaults.",
                            e
                        ));
                    }
                },
                Err(e) => {
                    crate::log(&format!(
                        "Failed to read config.json: {}. Using defaults.",
                        e
                    ));
                }
            }
        }

        Config::default()
    }
}
