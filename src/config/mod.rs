// Configuration module

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::watermark::config::{AssetPolicy, LayoutStyle, Palette, TextDefaults, Theme};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub theme: Theme,

    /// Display font fallback chain, tried in order
    #[serde(default)]
    pub fonts: Vec<PathBuf>,

    /// Brand font fallback chain; empty reuses the display chain
    #[serde(default)]
    pub brand_fonts: Vec<PathBuf>,

    #[serde(default)]
    pub assets: AssetsConfig,

    #[serde(default)]
    pub style: LayoutStyle,

    #[serde(default)]
    pub palette: Palette,

    #[serde(default)]
    pub text: TextDefaults,

    #[serde(default)]
    pub security: SecurityConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// Decorative asset lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AssetsConfig {
    /// Directory holding `separator.png` and `logo.png`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,

    #[serde(default)]
    pub on_missing: AssetPolicy,
}

fn default_code_length() -> usize {
    12
}

/// Security code generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(default = "default_code_length")]
    pub length: usize,

    /// Fixed RNG seed for reproducible codes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            length: default_code_length(),
            seed: None,
        }
    }
}

fn default_jpeg_quality() -> u8 {
    92
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

impl Config {
    pub fn from_yaml_with_env(yaml: &str) -> Result<Self, String> {
        // Replace ${VAR_NAME} with environment variable values
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").map_err(|e| e.to_string())?;

        // First, check that all referenced environment variables exist
        for caps in re.captures_iter(yaml) {
            let var_name = &caps[1];
            std::env::var(var_name).map_err(|_| {
                format!(
                    "Environment variable '{}' is referenced but not set",
                    var_name
                )
            })?;
        }

        let substituted = re.replace_all(yaml, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_default()
        });

        // An empty document means "all defaults"
        if substituted.trim().is_empty() {
            return Ok(Config::default());
        }

        serde_yaml::from_str(&substituted).map_err(|e| e.to_string())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        Self::from_yaml_with_env(&yaml)
    }

    pub fn validate(&self) -> Result<(), String> {
        self.style.validate()?;

        if !(4..=32).contains(&self.security.length) {
            return Err(format!(
                "security.length must be between 4 and 32, got {}",
                self.security.length
            ));
        }

        if !(1..=100).contains(&self.output.jpeg_quality) {
            return Err(format!(
                "output.jpeg_quality must be between 1 and 100, got {}",
                self.output.jpeg_quality
            ));
        }

        if self.text.security_label.contains('\n') {
            return Err("text.security_label must be a single line".to_string());
        }

        Ok(())
    }
}
