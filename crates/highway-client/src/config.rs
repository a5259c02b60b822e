//! Runtime knobs read from `HIGHWAY_*` environment variables.

use crate::chunk::CHUNK_SIZE;
use crate::error::UploadError;
use crate::flash::FLASH_ENDPOINT;
use crate::highway::http::DEFAULT_USER_AGENT;
use crate::highway::ClosePolicy;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadConfig {
    /// `HIGHWAY_FLASH_ENDPOINT`
    pub flash_endpoint: String,
    /// `HIGHWAY_FLASH_CHUNK_SIZE`, bytes
    pub flash_chunk_size: u64,
    /// `HIGHWAY_CLOSE_POLICY`: `success` or `require-ack`
    pub close_policy: ClosePolicy,
    /// `HIGHWAY_USER_AGENT`
    pub user_agent: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            flash_endpoint: FLASH_ENDPOINT.to_owned(),
            flash_chunk_size: CHUNK_SIZE as u64,
            close_policy: ClosePolicy::default(),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

impl UploadConfig {
    pub fn from_env() -> Result<Self, UploadError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, UploadError> {
        let mut config = Self::default();

        if let Some(endpoint) = lookup("HIGHWAY_FLASH_ENDPOINT") {
            config.flash_endpoint = endpoint;
        }
        if let Some(size) = lookup("HIGHWAY_FLASH_CHUNK_SIZE") {
            config.flash_chunk_size = match size.trim().parse::<u64>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(UploadError::Config(format!(
                        "HIGHWAY_FLASH_CHUNK_SIZE must be a positive integer, got {:?}",
                        size
                    )))
                }
            };
        }
        if let Some(policy) = lookup("HIGHWAY_CLOSE_POLICY") {
            config.close_policy = policy.parse()?;
        }
        if let Some(user_agent) = lookup("HIGHWAY_USER_AGENT") {
            config.user_agent = user_agent;
        }

        Ok(config)
    }
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
    fn test_defaults() {
        let config = UploadConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, UploadConfig::default());
        assert_eq!(config.flash_endpoint, "https://multimedia.qfile.qq.com/sliceupload");
        assert_eq!(config.flash_chunk_size, 1024 * 1024);
        assert_eq!(config.close_policy, ClosePolicy::TreatAsSuccess);
    }

    #[test]
    fn test_overrides() {
        let config = UploadConfig::from_lookup(lookup(&[
            ("HIGHWAY_FLASH_ENDPOINT", "http://127.0.0.1:8080/slice"),
            ("HIGHWAY_FLASH_CHUNK_SIZE", "4096"),
            ("HIGHWAY_CLOSE_POLICY", "require-ack"),
        ]))
        .unwrap();
        assert_eq!(config.flash_endpoint, "http://127.0.0.1:8080/slice");
        assert_eq!(config.flash_chunk_size, 4096);
        assert_eq!(config.close_policy, ClosePolicy::RequireAck);
    }

    #[test]
    fn test_bad_values() {
        assert!(UploadConfig::from_lookup(lookup(&[("HIGHWAY_FLASH_CHUNK_SIZE", "0")])).is_err());
        assert!(UploadConfig::from_lookup(lookup(&[("HIGHWAY_FLASH_CHUNK_SIZE", "big")])).is_err());
        assert!(UploadConfig::from_lookup(lookup(&[("HIGHWAY_CLOSE_POLICY", "maybe")])).is_err());
    }
}
