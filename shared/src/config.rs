use tracing::warn;

/// Which persistence variant to try at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageMode {
    Local,
    /// Probe the API at `base_url` (empty means the serving origin) and fall back to
    /// local storage if it does not answer.
    Remote { base_url: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub storage: StorageMode,
    pub seed_samples: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage: StorageMode::Remote {
                base_url: String::new(),
            },
            seed_samples: true,
        }
    }
}

impl AppConfig {
    /// Reads `storage=local|remote`, `api=<base url>` and `samples=0|1` from
    /// already-decoded query parameters. Unknown keys are ignored; bad values keep
    /// the default.
    pub fn from_params<K, V>(params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = Self::default();
        let mut local = false;
        let mut base_url = String::new();

        for (key, value) in params {
            let value = value.as_ref();
            match key.as_ref() {
                "storage" => match value {
                    "local" => local = true,
                    "remote" => local = false,
                    other => warn!(value = other, "ignoring unknown storage mode"),
                },
                "api" => base_url = value.trim_end_matches('/').to_string(),
                "samples" => match value {
                    "0" | "false" | "off" => config.seed_samples = false,
                    "1" | "true" | "on" => config.seed_samples = true,
                    other => warn!(value = other, "ignoring unknown samples flag"),
                },
                _ => {}
            }
        }

        config.storage = if local {
            StorageMode::Local
        } else {
            StorageMode::Remote { base_url }
        };
        config
    }
}
