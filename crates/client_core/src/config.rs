use std::{collections::HashMap, fs};

use serde::Deserialize;

/// Broker connection settings. The persisted settings store itself is
/// an external concern; this layer only reads an optional `broker.toml`
/// next to the process and environment overrides on top of it.
#[derive(Debug, Clone, Deserialize)]
pub struct BrokerSettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 1883,
            username: None,
            password: None,
        }
    }
}

pub fn load_settings() -> BrokerSettings {
    let mut settings = BrokerSettings::default();

    if let Ok(raw) = fs::read_to_string("broker.toml") {
        apply_file_config(&mut settings, &raw);
    }

    if let Ok(v) = std::env::var("BOARD__HOST") {
        settings.host = v;
    }
    if let Ok(v) = std::env::var("BOARD__PORT") {
        if let Ok(parsed) = v.parse::<u16>() {
            settings.port = parsed;
        }
    }
    if let Ok(v) = std::env::var("BOARD__USERNAME") {
        settings.username = Some(v);
    }
    if let Ok(v) = std::env::var("BOARD__PASSWORD") {
        settings.password = Some(v);
    }

    settings
}

fn apply_file_config(settings: &mut BrokerSettings, raw: &str) {
    let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(raw) else {
        return;
    };
    if let Some(v) = file_cfg.get("host") {
        settings.host = v.clone();
    }
    if let Some(v) = file_cfg.get("port") {
        if let Ok(parsed) = v.parse::<u16>() {
            settings.port = parsed;
        }
    }
    if let Some(v) = file_cfg.get("username") {
        settings.username = Some(v.clone());
    }
    if let Some(v) = file_cfg.get("password") {
        settings.password = Some(v.clone());
    }
}
