use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

fn default_active() -> bool {
    true
}

/// One tracked competitor as declared in `entities.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityConfig {
    pub name: String,
    pub website: String,
    pub careers_url: Option<String>,
    pub listings_url: Option<String>,
    pub social_handle: Option<String>,
    pub app_id: Option<String>,
    pub reviews_url: Option<String>,
    pub regulatory_id: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl EntityConfig {
    /// Generate a URL-safe slug from the entity name.
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
}

#[derive(Debug, Deserialize)]
pub struct EntitiesFile {
    pub entities: Vec<EntityConfig>,
}

/// Load and validate the tracked-entity configuration from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_entities(path: &Path) -> Result<EntitiesFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_entities(&content)
}

/// Parse and validate entity configuration from a YAML string.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or fails validation.
pub fn parse_entities(yaml: &str) -> Result<EntitiesFile, ConfigError> {
    let file: EntitiesFile = serde_yaml::from_str(yaml)?;
    validate_entities(&file)?;
    Ok(file)
}

fn validate_entities(file: &EntitiesFile) -> Result<(), ConfigError> {
    let mut seen_names = HashSet::new();
    let mut seen_slugs = HashSet::new();

    for entity in &file.entities {
        if entity.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "entity name must be non-empty".to_string(),
            ));
        }

        if !(entity.website.starts_with("http://") || entity.website.starts_with("https://")) {
            return Err(ConfigError::Validation(format!(
                "entity '{}' has website '{}'; must start with http:// or https://",
                entity.name, entity.website
            )));
        }

        if !seen_names.insert(entity.name.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate entity name: '{}'",
                entity.name
            )));
        }

        let slug = entity.slug();
        if slug.is_empty() {
            return Err(ConfigError::Validation(format!(
                "entity '{}' produces an empty slug",
                entity.name
            )));
        }
        if !seen_slugs.insert(slug.clone()) {
            return Err(ConfigError::Validation(format!(
                "duplicate entity slug: '{}' (from entity '{}')",
                slug, entity.name
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "entities_test.rs"]
mod tests;
