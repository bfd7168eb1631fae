//! API base URL resolution.
//!
//! Order: `GRIEVANCE_API_URL` environment override, explicit `api.base_url`,
//! a backend URL derived from a cloud-workspace origin, then the local default.

use url::Url;

use crate::config::schema::ApiConfig;

/// Environment variable that overrides every other base URL source.
pub const BASE_URL_ENV: &str = "GRIEVANCE_API_URL";

/// Used when nothing else applies.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

/// Hostname fragment identifying a forwarded-port cloud workspace.
const WORKSPACE_HOST_MARKER: &str = "github.dev";

impl ApiConfig {
    /// Resolve the base URL, consulting the process environment first.
    pub fn resolved_base_url(&self) -> String {
        resolve_base_url(self, std::env::var(BASE_URL_ENV).ok())
    }
}

/// Resolve the base URL from an optional environment override and the config.
pub fn resolve_base_url(config: &ApiConfig, env_override: Option<String>) -> String {
    if let Some(url) = env_override.filter(|u| !u.trim().is_empty()) {
        return trim_trailing_slash(url);
    }

    if let Some(url) = &config.base_url {
        return trim_trailing_slash(url.clone());
    }

    if let Some(url) = config
        .origin
        .as_deref()
        .and_then(|origin| workspace_backend_url(origin, config.backend_port))
    {
        return url;
    }

    DEFAULT_BASE_URL.to_string()
}

/// Derive the backend URL for a workspace origin such as
/// `https://name-5173.app.github.dev`, rewriting the port segment.
pub fn workspace_backend_url(origin: &str, backend_port: u16) -> Option<String> {
    let url = Url::parse(origin).ok()?;
    let host = url.host_str()?;
    if !host.contains(WORKSPACE_HOST_MARKER) {
        return None;
    }

    let host = rewrite_port_segment(host, backend_port);
    Some(format!("{}://{}/api", url.scheme(), host))
}

/// Replace the first `-<digits>.` run in `host` with `-<port>.`.
fn rewrite_port_segment(host: &str, port: u16) -> String {
    let bytes = host.as_bytes();
    for (start, _) in host.match_indices('-') {
        let digits = bytes[start + 1..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        let end = start + 1 + digits;
        if digits > 0 && bytes.get(end) == Some(&b'.') {
            return format!("{}-{}{}", &host[..start], port, &host[end..]);
        }
    }
    host.to_string()
}

fn trim_trailing_slash(mut url: String) -> String {
    while url.ends_with('/') {
        url.pop();
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_override_wins() {
        let config = ApiConfig {
            base_url: Some("https://configured.example.org/api".into()),
            ..ApiConfig::default()
        };
        let url = resolve_base_url(&config, Some("https://env.example.org/api/".into()));
        assert_eq!(url, "https://env.example.org/api");
    }

    #[test]
    fn test_explicit_base_url() {
        let config = ApiConfig {
            base_url: Some("https://configured.example.org/api".into()),
            origin: Some("https://demo-5173.app.github.dev".into()),
            ..ApiConfig::default()
        };
        assert_eq!(resolve_base_url(&config, None), "https://configured.example.org/api");
    }

    #[test]
    fn test_workspace_origin_rewrites_port() {
        let config = ApiConfig {
            origin: Some("https://fluffy-space-5173.app.github.dev".into()),
            ..ApiConfig::default()
        };
        assert_eq!(
            resolve_base_url(&config, None),
            "https://fluffy-space-8000.app.github.dev/api"
        );
    }

    #[test]
    fn test_non_workspace_origin_falls_back() {
        let config = ApiConfig {
            origin: Some("http://localhost:5173".into()),
            ..ApiConfig::default()
        };
        assert_eq!(resolve_base_url(&config, None), DEFAULT_BASE_URL);
        assert_eq!(resolve_base_url(&ApiConfig::default(), Some("  ".into())), DEFAULT_BASE_URL);
    }

    #[test]
    fn test_rewrite_skips_non_numeric_segments() {
        assert_eq!(rewrite_port_segment("my-repo-3000.github.dev", 8000), "my-repo-8000.github.dev");
        assert_eq!(rewrite_port_segment("plain.github.dev", 8000), "plain.github.dev");
    }
}
