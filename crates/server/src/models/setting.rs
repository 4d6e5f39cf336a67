//! Site settings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A row from `site_settings`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SiteSetting {
    pub key: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_public")]
    pub is_public: bool,
}

const fn default_public() -> bool {
    true
}

/// `{"settings": {key: value}}` envelope.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PublicSettings {
    pub settings: BTreeMap<String, String>,
}

impl FromIterator<SiteSetting> for PublicSettings {
    /// Collects settings, skipping those without a value.
    fn from_iter<I: IntoIterator<Item = SiteSetting>>(iter: I) -> Self {
        Self {
            settings: iter
                .into_iter()
                .filter_map(|s| s.value.map(|v| (s.key, v)))
                .collect(),
        }
    }
}
