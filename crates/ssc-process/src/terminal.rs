//! Raw-mode handling for the controlling terminal

use std::sync::Once;

use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use portable_pty::PtySize;

use ssc_core::error::ProcessError;

/// Size used when the controlling terminal does not report one
const FALLBACK_SIZE: (u16, u16) = (80, 24);

static PANIC_HOOK: Once = Once::new();

/// Keeps the controlling terminal in raw mode while alive
///
/// Dropping the guard restores the previous mode, whichever way the
/// supervisor exits. A panic hook covers the abort-on-panic release profile,
/// where destructors never run.
pub struct RawModeGuard {
    _private: (),
}

impl RawModeGuard {
    /// Switch the controlling terminal to raw mode
    pub fn enable() -> Result<Self, ProcessError> {
        enable_raw_mode().map_err(ProcessError::Terminal)?;
        install_panic_restore();
        tracing::debug!("Terminal switched to raw mode");
        Ok(Self { _private: () })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        match disable_raw_mode() {
            Ok(()) => tracing::debug!("Terminal restored"),
            Err(e) => tracing::warn!("Failed to restore terminal mode: {}", e),
        }
    }
}

fn install_panic_restore() {
    PANIC_HOOK.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let _ = disable_raw_mode();
            previous(info);
        }));
    });
}

/// Current size of the controlling terminal, as a PTY size
pub fn current_size() -> PtySize {
    let (cols, rows) = match crossterm::terminal::size() {
        Ok((cols, rows)) if cols > 0 && rows > 0 => (cols, rows),
        _ => FALLBACK_SIZE,
    };

    PtySize {
        rows,
        cols,
        pixel_width: 0,
        pixel_height: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_size_is_never_empty() {
        let size = current_size();
        assert!(size.rows > 0);
        assert!(size.cols > 0);
    }
}
