//! Handler types and dependencies

use dashmap::DashMap;
use std::sync::Arc;

use retouchcore::enhance::{Intake, PoolMonitor};
use retouchcore::Mode;

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Per-chat mode choice; chats that never chose get the default mode.
///
/// Kept in memory only, a restart resets everyone to the default.
pub struct ModePreferences {
    chosen: DashMap<i64, Mode>,
    default: Mode,
}

impl ModePreferences {
    pub fn new(default: Mode) -> Self {
        Self {
            chosen: DashMap::new(),
            default,
        }
    }

    pub fn get(&self, chat_id: i64) -> Mode {
        self.chosen.get(&chat_id).map(|m| *m).unwrap_or(self.default)
    }

    pub fn set(&self, chat_id: i64, mode: Mode) {
        self.chosen.insert(chat_id, mode);
    }
}

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub intake: Intake,
    pub monitor: PoolMonitor,
    pub modes: Arc<ModePreferences>,
}

impl HandlerDeps {
    /// Create new handler dependencies
    pub fn new(intake: Intake, monitor: PoolMonitor, modes: Arc<ModePreferences>) -> Self {
        Self { intake, monitor, modes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preferences_default_and_override() {
        let prefs = ModePreferences::new(Mode::Upscale);
        assert_eq!(prefs.get(1), Mode::Upscale);

        prefs.set(1, Mode::Poster);
        assert_eq!(prefs.get(1), Mode::Poster);
        assert_eq!(prefs.get(2), Mode::Upscale);
    }
}
