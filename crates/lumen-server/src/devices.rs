//! Device collaborators driven by the actuator state.
//!
//! The core only knows the logical value. Electrical polarity and what the
//! status panel looks like are decided here.

use lumen_core::state::Display;
use lumen_core::Actuator;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::metrics;

/// Drives a GPIO line through its sysfs-style value file.
///
/// Without a path it only logs the level it would have driven.
#[derive(Debug, Clone)]
pub struct GpioActuator {
    path: Option<PathBuf>,
    active_low: bool,
}

impl GpioActuator {
    /// Create an actuator writing to `path`.
    #[must_use]
    pub fn new(path: Option<PathBuf>, active_low: bool) -> Self {
        Self { path, active_low }
    }

    /// Line level for a logical value: high unless `on` and active-low
    /// disagree.
    #[must_use]
    pub fn level(&self, on: bool) -> bool {
        on != self.active_low
    }
}

impl Actuator for GpioActuator {
    fn apply(&mut self, on: bool) {
        let level = self.level(on);
        let Some(path) = &self.path else {
            debug!(on, level, "Actuator applied (no output configured)");
            return;
        };

        match std::fs::write(path, if level { "1" } else { "0" }) {
            Ok(()) => debug!(on, level, path = %path.display(), "Actuator applied"),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to drive actuator");
                metrics::record_error("actuator");
            }
        }
    }
}

/// Renders the status panel to the log.
#[derive(Debug, Clone)]
pub struct ConsoleDisplay {
    title: String,
    address: String,
}

impl ConsoleDisplay {
    /// Create a display showing `title` and the address clients should use.
    #[must_use]
    pub fn new(title: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            address: address.into(),
        }
    }

    /// The panel text for a given value.
    #[must_use]
    pub fn panel(&self, on: bool) -> String {
        format!(
            "{}\n-------------------\nIP  : {}\n\nLED : {}",
            self.title,
            self.address,
            if on { "ON" } else { "OFF" }
        )
    }
}

impl Display for ConsoleDisplay {
    fn render(&mut self, on: bool) {
        info!(target: "lumen::display", "\n{}", self.panel(on));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_low_inverts_level() {
        let active_low = GpioActuator::new(None, true);
        assert!(!active_low.level(true));
        assert!(active_low.level(false));

        let active_high = GpioActuator::new(None, false);
        assert!(active_high.level(true));
        assert!(!active_high.level(false));
    }

    #[test]
    fn test_gpio_writes_value_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("value");
        let mut actuator = GpioActuator::new(Some(path.clone()), true);

        actuator.apply(true);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "0");

        actuator.apply(false);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "1");
    }

    #[test]
    fn test_gpio_write_failure_is_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        let mut actuator = GpioActuator::new(Some(dir.path().join("missing/value")), false);

        // Must not panic
        actuator.apply(true);
    }

    #[test]
    fn test_display_panel() {
        let display = ConsoleDisplay::new("Lumen", "192.168.1.20");
        let panel = display.panel(true);

        assert!(panel.starts_with("Lumen\n"));
        assert!(panel.contains("IP  : 192.168.1.20"));
        assert!(panel.ends_with("LED : ON"));
        assert!(display.panel(false).ends_with("LED : OFF"));
    }
}
