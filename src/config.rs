//! Codec configuration
//!
//! Validation of columnar files before decode is on by default. Setting
//! `DDTREE_DISABLE_NC_VALIDATE` to anything but empty or `0` switches it off for
//! every config built with [`CodecConfig::from_env`]. Decoding an
//! unvalidated file that does not match its dictionary may produce a
//! corrupted tree instead of a clean error; only do this for trusted files.
//!
//! ```bash
//! DDTREE_DISABLE_NC_VALIDATE=1 my-tool read shot.ddtc
//! ```

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

/// Environment variable that disables pre-decode validation
pub const DISABLE_VALIDATE_ENV: &str = "DDTREE_DISABLE_NC_VALIDATE";

/// Cached value of [`DISABLE_VALIDATE_ENV`]
static DISABLE_VALIDATE: OnceLock<Option<String>> = OnceLock::new();

#[inline]
fn disable_validate_env() -> Option<&'static str> {
    DISABLE_VALIDATE
        .get_or_init(|| std::env::var(DISABLE_VALIDATE_ENV).ok())
        .as_deref()
}

/// Options for decoding columnar files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecConfig {
    /// Check every variable against the dictionary before decoding
    #[serde(default = "default_validate")]
    pub validate: bool,
    /// Defer reads until nodes are first accessed
    #[serde(default)]
    pub lazy: bool,
}

fn default_validate() -> bool {
    true
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            validate: true,
            lazy: false,
        }
    }
}

impl CodecConfig {
    /// Defaults, with the environment override applied
    pub fn from_env() -> Self {
        Self::default().with_env_override(disable_validate_env())
    }

    fn with_env_override(mut self, value: Option<&str>) -> Self {
        if matches!(value, Some(v) if !v.is_empty() && v != "0") {
            self.validate = false;
        }
        self
    }

    pub fn lazy() -> Self {
        Self {
            lazy: true,
            ..Self::default()
        }
    }

    /// Skips validation. Use only for trusted files.
    pub fn without_validation(self) -> Self {
        Self {
            validate: false,
            ..self
        }
    }
}
