//! Per-user preferences

use serde::{Deserialize, Serialize};

/// User preferences, replaced wholesale on every write.
///
/// `mute` is a string-typed boolean ("True"/"False") because the polling
/// clients compare it as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub theme: String,
    pub mute: String,
}

impl Preferences {
    /// Preferences with the given theme and everything else defaulted.
    pub fn with_theme(theme: impl Into<String>) -> Self {
        Self {
            theme: theme.into(),
            ..Self::default()
        }
    }

    /// The preference values in wire order: theme first, then mute.
    pub fn values(&self) -> Vec<String> {
        vec![self.theme.clone(), self.mute.clone()]
    }
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: "blue".to_string(),
            mute: "False".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_blue_and_unmuted() {
        let prefs = Preferences::default();
        assert_eq!(prefs.values(), vec!["blue", "False"]);
    }

    #[test]
    fn with_theme_keeps_mute_default() {
        let prefs = Preferences::with_theme("dark");
        assert_eq!(prefs.values(), vec!["dark", "False"]);
    }
}
