use crate::error::ConfigError;
use std::fmt;

/// Address and credentials of the cluster's management endpoint
#[derive(Clone, PartialEq, Eq)]
pub struct ClusterConfig {
    /// Base URL without a trailing slash
    pub url: String,
    pub username: String,
    pub password: String,
}

impl ClusterConfig {
    /// Validate and normalise the cluster address
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if the URL is empty or is not an
    /// `http://` / `https://` URL.
    pub fn new(url: &str, username: &str, password: &str) -> Result<Self, ConfigError> {
        let url = url.trim().trim_end_matches('/');
        if url.is_empty() {
            return Err(ConfigError::ValidationError(
                "cluster URL must not be empty".to_string(),
            ));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::ValidationError(format!(
                "cluster URL must start with http:// or https://, got {}",
                url
            )));
        }

        Ok(Self {
            url: url.to_string(),
            username: username.to_string(),
            password: password.to_string(),
        })
    }
}

// Keeps the password out of debug logs
impl fmt::Debug for ClusterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Interpret the optional `downloadOlderLogs` argument
///
/// Only a case-insensitive `FALSE` disables rotated logs.
pub fn parse_download_older_logs(arg: Option<&str>) -> bool {
    !matches!(arg, Some(value) if value.trim().eq_ignore_ascii_case("false"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_trimmed() {
        let cluster = ClusterConfig::new("https://storm.example.net/", "admin", "pw").unwrap();
        assert_eq!(cluster.url, "https://storm.example.net");
    }

    #[test]
    fn test_invalid_urls_rejected() {
        assert!(ClusterConfig::new("", "admin", "pw").is_err());
        assert!(ClusterConfig::new("/", "admin", "pw").is_err());
        assert!(ClusterConfig::new("storm.example.net", "admin", "pw").is_err());
    }

    #[test]
    fn test_debug_hides_password() {
        let cluster = ClusterConfig::new("http://c", "admin", "s3cret").unwrap();
        let debug = format!("{:?}", cluster);
        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("admin"));
    }

    #[test]
    fn test_parse_download_older_logs() {
        assert!(parse_download_older_logs(None));
        assert!(parse_download_older_logs(Some("true")));
        assert!(parse_download_older_logs(Some("no")));
        assert!(!parse_download_older_logs(Some("FALSE")));
        assert!(!parse_download_older_logs(Some("false")));
        assert!(!parse_download_older_logs(Some("False")));
    }
}
