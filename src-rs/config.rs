use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Everything a run needs from the command line, fixed before the window
/// opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub show_cursor: bool,
    /// `None` disables the countdown.
    pub timeout: Option<Duration>,
    pub default_action: String,
    pub prompt: Option<String>,
    pub font: Option<PathBuf>,
    pub max_items: usize,
    /// Fixed window size; fullscreen when `None`.
    pub window_size: Option<(u32, u32)>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            show_cursor: false,
            timeout: None,
            default_action: String::new(),
            prompt: None,
            font: None,
            max_items: crate::input::DEFAULT_MAX_RECORDS,
            window_size: None,
        }
    }
}

pub fn timeout_from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

/// Parse `WIDTHxHEIGHT`, both at least 1.
pub fn parse_size(raw: &str) -> Result<(u32, u32)> {
    let Some((w, h)) = raw.trim().split_once(['x', 'X']) else {
        bail!("invalid size {raw:?}, expected WIDTHxHEIGHT");
    };
    let w: u32 = w
        .trim()
        .parse()
        .with_context(|| format!("invalid width in {raw:?}"))?;
    let h: u32 = h
        .trim()
        .parse()
        .with_context(|| format!("invalid height in {raw:?}"))?;
    if w == 0 || h == 0 {
        bail!("size {raw:?} must be at least 1x1");
    }
    Ok((w, h))
}
