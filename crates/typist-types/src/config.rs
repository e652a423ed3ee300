//! Console configuration loaded from TOML.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TypistError};

/// Runtime configuration for a console instance.
///
/// Every key is optional in the TOML source; missing keys take the
/// values from [`ConsoleConfig::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Display name used in user-facing messages.
    pub username: String,

    // -- Output animation --
    /// Render standard-queue text one character at a time.
    pub typing_animation: bool,
    /// Play a typing sound while animating.
    pub typing_sound: bool,
    /// Upper-case all rendered text.
    pub caps_mode: bool,
    /// Delay between animated characters.
    pub char_delay_ms: u64,
    /// Pause after each animated text item.
    pub line_delay_ms: u64,
    /// Play the typing sound every this many characters.
    pub sound_frequency: usize,

    // -- Input filtering --
    pub filter_chat: bool,
    pub blocked_words: Vec<String>,

    // -- Unknown command resolution --
    /// Pass unknown commands to the operating system shell.
    pub wrap_shell: bool,
    pub auto_trigger_similar: bool,
    /// Minimum similarity for a "most similar command" suggestion.
    pub suggestion_threshold: f64,
    /// Minimum similarity to invoke the similar command automatically.
    pub auto_trigger_threshold: f64,
    /// Longest allowed chain of automatic similar-command invocations.
    pub max_auto_trigger_chain: usize,

    /// Directory redirected output files are created in.
    pub redirection_dir: PathBuf,

    // -- Printed label styling --
    pub font_name: String,
    pub font_size: u16,
    /// Foreground color as `#rrggbb`.
    pub foreground: String,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            username: "User".to_string(),
            typing_animation: true,
            typing_sound: false,
            caps_mode: false,
            char_delay_ms: 8,
            line_delay_ms: 100,
            sound_frequency: 4,
            filter_chat: true,
            blocked_words: Vec::new(),
            wrap_shell: false,
            auto_trigger_similar: false,
            suggestion_threshold: 0.80,
            auto_trigger_threshold: 0.95,
            max_auto_trigger_chain: 2,
            redirection_dir: PathBuf::from("."),
            font_name: "Agency FB".to_string(),
            font_size: 30,
            foreground: "#000000".to_string(),
        }
    }
}

impl ConsoleConfig {
    /// Parse and validate a configuration from TOML text.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&source)?;
        log::info!("Loaded console config from {}", path.display());
        Ok(config)
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.username.trim().is_empty() {
            return Err(TypistError::Config("username must not be empty".into()));
        }
        for (key, value) in [
            ("suggestion_threshold", self.suggestion_threshold),
            ("auto_trigger_threshold", self.auto_trigger_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(TypistError::Config(format!(
                    "{key} must be within [0, 1], got {value}"
                )));
            }
        }
        if self.sound_frequency == 0 {
            return Err(TypistError::Config(
                "sound_frequency must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Delay between typed characters.
    pub fn char_delay(&self) -> Duration {
        Duration::from_millis(self.char_delay_ms)
    }

    /// Delay after each typed item.
    pub fn line_delay(&self) -> Duration {
        Duration::from_millis(self.line_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_source_yields_defaults() {
        let config = ConsoleConfig::from_toml_str("").unwrap();
        assert_eq!(config, ConsoleConfig::default());
    }

    #[test]
    fn partial_source_overrides_only_given_keys() {
        let config = ConsoleConfig::from_toml_str(
            r#"
            username = "Nathan"
            typing_animation = false
            blocked_words = ["heck"]
            auto_trigger_similar = true
            "#,
        )
        .unwrap();
        assert_eq!(config.username, "Nathan");
        assert!(!config.typing_animation);
        assert_eq!(config.blocked_words, vec!["heck".to_string()]);
        assert!(config.auto_trigger_similar);
        assert_eq!(config.char_delay_ms, 8);
        assert_eq!(config.suggestion_threshold, 0.80);
    }

    #[test]
    fn threshold_out_of_range_rejected() {
        let err = ConsoleConfig::from_toml_str("suggestion_threshold = 1.5").unwrap_err();
        assert!(err.to_string().contains("suggestion_threshold"));
    }

    #[test]
    fn zero_sound_frequency_rejected() {
        assert!(ConsoleConfig::from_toml_str("sound_frequency = 0").is_err());
    }

    #[test]
    fn blank_username_rejected() {
        assert!(ConsoleConfig::from_toml_str("username = \"  \"").is_err());
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let err = ConsoleConfig::from_toml_str("typing_animation = [").unwrap_err();
        assert!(matches!(err, TypistError::TomlParse(_)));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("console.toml");
        std::fs::write(&path, "wrap_shell = true\nchar_delay_ms = 2\n").unwrap();
        let config = ConsoleConfig::load(&path).unwrap();
        assert!(config.wrap_shell);
        assert_eq!(config.char_delay(), Duration::from_millis(2));
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = ConsoleConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, TypistError::Io(_)));
    }
}
