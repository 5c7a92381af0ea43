//! Loading of the declarative YAML settings file.

use std::fs;
use std::path::Path;

use anyhow::Result;
use serde::Deserialize;
use tracing::{error, info};

use crate::config::{CollectionCatalog, Settings, DEFAULT_PAGE_CAP};
use crate::dates::DateFilter;

#[derive(Deserialize)]
struct StaticConfig {
    api: ApiSection,
    fields: Vec<String>,
    #[serde(default)]
    collections: std::collections::BTreeMap<String, String>,
    #[serde(default)]
    date_filter: Option<DateFilterSection>,
}

#[derive(Deserialize)]
struct ApiSection {
    base_url: String,
    all_items_pid: String,
    #[serde(default)]
    page_cap: Option<u64>,
}

#[derive(Deserialize)]
struct DateFilterSection {
    from: String,
    #[serde(default)]
    until: Option<String>,
}

/// Loads the YAML settings file and validates its date filter.
///
/// Returns fully merged `Settings` or an error describing the first problem
/// encountered.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading settings from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read settings file");
            return Err(anyhow::anyhow!(
                "Failed to read settings file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let static_conf: StaticConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => conf,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse settings YAML");
            return Err(anyhow::anyhow!("Failed to parse settings YAML: {e}"));
        }
    };

    if static_conf.fields.is_empty() {
        error!(config_path = ?path_ref, "Settings file declares no fields");
        anyhow::bail!("Settings file must declare at least one field");
    }

    let date_filter = match static_conf.date_filter {
        None => None,
        Some(section) => match DateFilter::new(section.from, section.until) {
            Ok(filter) => Some(filter),
            Err(e) => {
                error!(error = %e, config_path = ?path_ref, "Invalid date filter in settings");
                return Err(anyhow::anyhow!("Invalid date filter: {e}"));
            }
        },
    };

    let settings = Settings {
        base_url: static_conf.api.base_url,
        page_cap: static_conf.api.page_cap.unwrap_or(DEFAULT_PAGE_CAP),
        fields: static_conf.fields,
        catalog: CollectionCatalog::new(static_conf.collections, static_conf.api.all_items_pid),
        date_filter,
    };

    settings.trace_loaded();
    Ok(settings)
}
