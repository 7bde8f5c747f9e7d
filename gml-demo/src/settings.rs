use std::{fs, path::Path};

use anyhow::Context;
use gml::GmlConfig;
use serde::{Deserialize, Serialize};

/// The demo settings file.
///
/// Has enum variants for breaking changes in the format of the settings file,
/// but [`read`] always returns the newest variant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "settings_file_version", rename_all = "snake_case")]
pub enum DemoSettings {
    V1 {
        #[serde(default)]
        gml: GmlConfig,
    },
}

impl DemoSettings {
    pub fn into_config(self) -> GmlConfig {
        match self {
            DemoSettings::V1 { gml } => gml,
        }
    }
}

pub fn read(settings: Option<&Path>) -> anyhow::Result<DemoSettings> {
    let Some(settings) = settings.filter(|path| path.exists()) else {
        tracing::info!("no settings file, using the default configuration");
        return Ok(DemoSettings::V1 {
            gml: GmlConfig::default(),
        });
    };
    let settings = fs::read_to_string(settings).context("Failed to open the settings file")?;
    let settings =
        serde_json::from_str(&settings).context("Failed to parse the settings file")?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use gml::GmlConfig;

    use super::{read, DemoSettings};

    #[test]
    fn missing_files_mean_defaults() {
        let settings = read(Some(Path::new("this-file-does-not-exist.json"))).unwrap();
        assert_eq!(GmlConfig::default(), settings.into_config());
    }

    #[test]
    fn versioned_files_parse() {
        let settings: DemoSettings = serde_json::from_str(
            r#"{ "settings_file_version": "v1", "gml": { "max_workers": 3, "call_debug": true } }"#,
        )
        .unwrap();
        let config = settings.into_config();
        assert_eq!(3, config.max_workers);
        assert!(config.call_debug);
    }
}
