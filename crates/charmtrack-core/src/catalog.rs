//! Charm seed catalog loaded from a YAML file at startup.
//!
//! The catalog is the authoritative list of charms to track; pricing state
//! is filled in by the refresh loop at runtime.

use std::collections::HashSet;
use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::charm::{Charm, CharmStatus, Material};
use crate::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharmConfig {
    pub name: String,
    pub description: String,
    pub material: Material,
    pub status: CharmStatus,
    pub reference_price: Option<Decimal>,
    pub reference_url: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

impl CharmConfig {
    /// Generate a URL-safe slug from the charm name.
    #[must_use]
    pub fn slug(&self) -> String {
        self.name
            .to_lowercase()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' {
                    c
                } else if c == ' ' {
                    '-'
                } else {
                    '\0'
                }
            })
            .filter(|&c| c != '\0')
            .collect::<String>()
            .split('-')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("-")
    }

    /// Materialize a [`Charm`] with empty pricing state from this entry.
    #[must_use]
    pub fn into_charm(self) -> Charm {
        let mut charm = Charm::new(
            self.name,
            self.description,
            self.material,
            self.status,
            self.reference_price,
        );
        charm.reference_url = self.reference_url;
        charm.images = self.images;
        charm
    }
}

#[derive(Debug, Deserialize)]
pub struct CharmsFile {
    pub charms: Vec<CharmConfig>,
}

/// Load and validate the charm catalog from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails
/// validation.
pub fn load_charms(path: &Path) -> Result<CharmsFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::CharmsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let charms_file: CharmsFile =
        serde_yaml::from_str(&content).map_err(ConfigError::CharmsFileParse)?;

    validate_charms(&charms_file)?;

    Ok(charms_file)
}

fn validate_charms(charms_file: &CharmsFile) -> Result<(), ConfigError> {
    let mut seen_slugs = HashSet::new();

    for charm in &charms_file.charms {
        if charm.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "charm name must be non-empty".to_string(),
            ));
        }

        if let Some(price) = charm.reference_price {
            if price < Decimal::ZERO {
                return Err(ConfigError::Validation(format!(
                    "charm '{}' has negative reference price {price}",
                    charm.name
                )));
            }
        }

        let slug = charm.slug();
        if !seen_slugs.insert(slug.clone()) {
            return Err(ConfigError::Validation(format!(
                "duplicate charm slug: '{}' (from charm '{}')",
                slug, charm.name
            )));
        }
    }

    Ok(())
}
