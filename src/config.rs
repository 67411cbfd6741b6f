use meetcore::upload::UploadCredentials;
use std::path::PathBuf;

pub const DEFAULT_ORIGIN: &str = "http://localhost:5173";
pub const DEFAULT_PREFERENCES_PATH: &str = "echomeet-preferences.json";

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Public API key of the chat/video backends.
    pub stream_api_key: String,
    /// Origin used when building call invite links.
    pub origin: String,
    pub preferences_path: PathBuf,
    /// `None` when the image service is not configured.
    pub upload: Option<UploadCredentials>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            stream_api_key: String::new(),
            origin: DEFAULT_ORIGIN.to_string(),
            preferences_path: PathBuf::from(DEFAULT_PREFERENCES_PATH),
            upload: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let defaults = Self::default();
        Self {
            stream_api_key: get("STREAM_API_KEY").unwrap_or(defaults.stream_api_key),
            origin: get("ECHOMEET_ORIGIN").unwrap_or(defaults.origin),
            preferences_path: get("ECHOMEET_PREFERENCES")
                .map(PathBuf::from)
                .unwrap_or(defaults.preferences_path),
            upload: upload_credentials_from(&get),
        }
    }
}

/// All three image-service variables must be set.
fn upload_credentials_from(get: &impl Fn(&str) -> Option<String>) -> Option<UploadCredentials> {
    Some(UploadCredentials {
        cloud_name: get("CLOUDINARY_CLOUD_NAME")?,
        api_key: get("CLOUDINARY_API_KEY")?,
        api_secret: get("CLOUDINARY_API_SECRET")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = AppConfig::from_lookup(lookup(&[]));
        assert_eq!(config.origin, DEFAULT_ORIGIN);
        assert!(config.upload.is_none());
    }

    #[test]
    fn upload_requires_all_three_credentials() {
        let partial = AppConfig::from_lookup(lookup(&[
            ("CLOUDINARY_CLOUD_NAME", "demo"),
            ("CLOUDINARY_API_KEY", "key"),
            ("CLOUDINARY_API_SECRET", ""),
        ]));
        assert!(partial.upload.is_none());

        let full = AppConfig::from_lookup(lookup(&[
            ("CLOUDINARY_CLOUD_NAME", "demo"),
            ("CLOUDINARY_API_KEY", "key"),
            ("CLOUDINARY_API_SECRET", "secret"),
            ("ECHOMEET_ORIGIN", "https://meet.example"),
        ]));
        assert_eq!(full.upload.unwrap().cloud_name, "demo");
        assert_eq!(full.origin, "https://meet.example");
    }
}
