//! Clipboard helper for the copy command
//!
//! Uses `arboard` for cross-platform support. A fresh clipboard handle per
//! copy avoids holding display-server resources between commands.

use anyhow::{Context, Result};
use arboard::Clipboard;

/// Copy a turn's raw text to the system clipboard.
///
/// Common failure cases: no display server (headless Linux), permission
/// denied. Callers surface failures as a status message, never an error.
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    let mut clipboard = Clipboard::new().context("Failed to access clipboard")?;
    clipboard
        .set_text(text)
        .context("Failed to set clipboard text")?;
    Ok(())
}
