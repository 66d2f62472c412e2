//! Error taxonomy for the detection loop.
//!
//! Callers need to tell these apart: a missing corpus directory and an
//! empty one require different fixes, and denied input injection must
//! stop the run while a failed capture must not.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClickerError {
    /// The reference image directory does not exist at all.
    #[error("image directory not found: {0}")]
    DirectoryMissing(PathBuf),

    /// The directory exists but contains no usable reference images.
    #[error("no usable reference images in {0}")]
    EmptyCorpus(PathBuf),

    /// The platform refused or failed a screen capture. Recoverable;
    /// the scheduler treats the cycle as a miss.
    #[error("screen capture unavailable: {0}")]
    CaptureUnavailable(String),

    /// The platform refused synthetic pointer input. Fatal; retrying
    /// would mask a permissions problem.
    #[error("input injection denied: {0}")]
    InputInjectionDenied(String),

    /// A single reference file could not be decoded. Per-file only;
    /// corpus loading skips the file and continues.
    #[error("failed to decode '{name}': {reason}")]
    Decode { name: String, reason: String },
}
