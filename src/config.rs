use secstr::SecUtf8;
use serde::{Deserialize, Deserializer};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub repo_owner: String,
    pub repo_name: String,
    pub username: String,
    #[serde(deserialize_with = "deserialize_secutf8")]
    pub password: SecUtf8,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_retry_total")]
    pub retry_total: u32,
    #[serde(default = "default_backoff_factor_ms")]
    pub backoff_factor_ms: u64,
    #[serde(default)]
    pub max_pages: Option<u32>,
    #[serde(default = "default_body_limit")]
    pub body_limit: usize,
}

fn default_api_url() -> String {
    "https://api.bitbucket.org/2.0".into()
}

fn default_bind() -> String {
    "127.0.0.1:8080".into()
}

fn default_retry_total() -> u32 {
    3
}

fn default_backoff_factor_ms() -> u64 {
    500
}

fn default_body_limit() -> usize {
    8 * 1024 * 1024
}

fn deserialize_secutf8<'de, D>(de: D) -> Result<SecUtf8, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(de).map(SecUtf8::from)
}
