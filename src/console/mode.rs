//! Console mode toggling.

use crate::error::{MgmtError, Result};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, is_raw_mode_enabled};

/// Holds the console in the requested mode and restores the original mode on drop.
#[derive(Debug)]
pub struct ConsoleMode {
    was_raw: bool,
    raw: bool,
}

impl ConsoleMode {
    /// Switch the console to raw mode (no line buffering, no echo, no signal keys).
    pub fn enter_raw() -> Result<Self> {
        let was_raw = is_raw_mode_enabled()
            .map_err(|e| MgmtError::console(format!("cannot query console mode: {e}")))?;
        let mut mode = Self {
            was_raw,
            raw: was_raw,
        };
        mode.set_raw(true)?;
        Ok(mode)
    }

    /// Toggle raw mode while the guard is held.
    pub fn set_raw(&mut self, raw: bool) -> Result<()> {
        if raw == self.raw {
            return Ok(());
        }
        let result = if raw {
            enable_raw_mode()
        } else {
            disable_raw_mode()
        };
        result.map_err(|e| MgmtError::console(format!("cannot change console mode: {e}")))?;
        self.raw = raw;
        log::debug!("Console raw mode {}", if raw { "on" } else { "off" });
        Ok(())
    }

    /// Current mode of the guarded console.
    pub fn is_raw(&self) -> bool {
        self.raw
    }
}

impl Drop for ConsoleMode {
    fn drop(&mut self) {
        if let Err(err) = self.set_raw(self.was_raw) {
            log::error!("Failed to restore console mode: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_restores_previous_mode() {
        let before = is_raw_mode_enabled().unwrap_or(false);
        match ConsoleMode::enter_raw() {
            Ok(mut mode) => {
                assert!(mode.is_raw());
                mode.set_raw(false).unwrap();
                assert!(!mode.is_raw());
                mode.set_raw(true).unwrap();
                drop(mode);
                assert_eq!(is_raw_mode_enabled().unwrap_or(false), before);
            }
            // No terminal attached, as under CI.
            Err(err) => assert!(matches!(err, MgmtError::Console { .. })),
        }
    }
}
