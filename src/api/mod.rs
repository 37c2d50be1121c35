pub(crate) mod drive;
pub(crate) mod gemini;
pub(crate) mod identity;
pub(crate) mod transport;

pub(crate) use drive::{DriveAccount, DriveSession, FolderSelection};
pub(crate) use gemini::GenerativeClient;
pub(crate) use transport::ReqwestTransport;

use serde::{Deserialize, Serialize};

pub(crate) const DEFAULT_GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub(crate) const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash-preview-09-2025";
pub(crate) const DEFAULT_DRIVE_API_URL: &str = "https://www.googleapis.com/drive/v3";
pub(crate) const DEFAULT_DRIVE_UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3";
pub(crate) const DEFAULT_LOG_LEVEL: &str = "info";

/// Endpoints and log level, overridable from `window.ENV`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct EnvConfig {
    pub gemini_api_url: String,
    pub gemini_model: String,
    pub drive_api_url: String,
    pub drive_upload_url: String,
    pub log_level: String,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            gemini_api_url: DEFAULT_GEMINI_API_URL.to_string(),
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            drive_api_url: DEFAULT_DRIVE_API_URL.to_string(),
            drive_upload_url: DEFAULT_DRIVE_UPLOAD_URL.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl EnvConfig {
    /// Reads `window.ENV`. Both `GEMINI_MODEL` and `gemini_model` spellings
    /// are accepted; missing or non-string entries keep the default.
    pub fn from_window() -> Self {
        let env = web_sys::window()
            .and_then(|w| w.get("ENV"))
            .filter(|env| !env.is_undefined() && env.is_object());

        match env {
            Some(env) => Self::from_lookup(|key| {
                js_sys::Reflect::get(&env, &key.into())
                    .ok()
                    .and_then(|v| v.as_string())
                    .or_else(|| {
                        js_sys::Reflect::get(&env, &key.to_ascii_lowercase().into())
                            .ok()
                            .and_then(|v| v.as_string())
                    })
            }),
            None => Self::default(),
        }
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str, fallback: String| {
            lookup(key)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or(fallback)
        };
        let defaults = Self::default();

        Self {
            gemini_api_url: trim_slash(get("GEMINI_API_URL", defaults.gemini_api_url)),
            gemini_model: get("GEMINI_MODEL", defaults.gemini_model),
            drive_api_url: trim_slash(get("DRIVE_API_URL", defaults.drive_api_url)),
            drive_upload_url: trim_slash(get("DRIVE_UPLOAD_URL", defaults.drive_upload_url)),
            log_level: get("LOG_LEVEL", defaults.log_level),
        }
    }
}

fn trim_slash(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_env_config_defaults() {
        let cfg = EnvConfig::from_lookup(|_| None);
        assert_eq!(cfg, EnvConfig::default());
        assert_eq!(cfg.gemini_model, DEFAULT_GEMINI_MODEL);
    }

    #[test]
    fn test_env_config_overrides() {
        let env: HashMap<&str, &str> = [
            ("GEMINI_API_URL", "http://localhost:9000/v1/"),
            ("GEMINI_MODEL", "gemini-test"),
            ("LOG_LEVEL", "  "),
        ]
        .into_iter()
        .collect();

        let cfg = EnvConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.gemini_api_url, "http://localhost:9000/v1");
        assert_eq!(cfg.gemini_model, "gemini-test");
        assert_eq!(cfg.drive_api_url, DEFAULT_DRIVE_API_URL);
        assert_eq!(cfg.log_level, DEFAULT_LOG_LEVEL);
    }
}
