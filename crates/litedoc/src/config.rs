//! Document configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Tunables for loading, materializing and re-encoding a [`crate::Document`].
///
/// ```
/// use litedoc::DocumentConfig;
///
/// let config = DocumentConfig::from_toml_str("max_depth = 8").unwrap();
/// assert_eq!(config.max_depth, 8);
/// assert!(config.reuse_encoded);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    /// Copy untouched sub-trees straight from the source buffer when encoding.
    /// When off, every value is decoded and written again in canonical form.
    pub reuse_encoded: bool,
    /// Maximum number of nested collection levels, root included.
    pub max_depth: usize,
    /// Initial capacity reserved for encoder output.
    pub writer_alloc_size: usize,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            reuse_encoded: true,
            max_depth: litedoc_pack::DEFAULT_MAX_DEPTH,
            writer_alloc_size: 4 * 1024,
        }
    }
}

impl DocumentConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).map_err(|e| Error::Config(e.to_string()))?;
        if config.max_depth == 0 {
            return Err(Error::Config("max_depth must be at least 1".into()));
        }
        Ok(config)
    }
}
