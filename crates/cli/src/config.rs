//! `restmap.toml` loading and command-line overrides.

use std::path::Path;

use anyhow::{bail, Context};
use model::{ApiConfig, Params, ResourceConfig};
use serde::Deserialize;
use serde_json::Value;

/// Contents of the configuration file.
///
/// API connection settings sit at the top level; every resource class is a
/// `[[resources]]` table.
///
/// ```toml
/// base_url = "https://api.example.com"
/// timeout_secs = 10
///
/// [headers]
/// Accept = "application/json"
///
/// [[resources]]
/// name = "User"
/// has_many = [{ name = "comments" }]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct CliConfig {
    #[serde(flatten)]
    pub api: ApiConfig,
    #[serde(default)]
    pub resources: Vec<ResourceConfig>,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Optional `[telemetry]` table.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TelemetryConfig {
    /// OTLP gRPC collector endpoint. Spans are exported only when set.
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

impl CliConfig {
    /// Reads and parses the file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Parses configuration text.
    pub fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Applies command-line overrides on top of the file contents.
    pub fn apply_overrides(
        &mut self,
        base_url: Option<String>,
        headers: Vec<(String, String)>,
        timeout_secs: Option<u64>,
    ) {
        if let Some(base_url) = base_url {
            self.api.base_url = base_url;
        }
        self.api.headers.extend(headers);
        if timeout_secs.is_some() {
            self.api.timeout_secs = timeout_secs;
        }
    }
}

/// Parses a `NAME: VALUE` or `NAME=VALUE` header argument.
pub fn parse_header(raw: &str) -> anyhow::Result<(String, String)> {
    let Some((name, value)) = raw.split_once(':').or_else(|| raw.split_once('=')) else {
        bail!("expected NAME: VALUE, got '{raw}'");
    };
    let name = name.trim();
    if name.is_empty() {
        bail!("header name is empty in '{raw}'");
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// Parses a `KEY=VALUE` parameter argument.
///
/// The value is read as JSON when it parses (`true`, `3`, `[1,2]`) and as a
/// plain string otherwise.
pub fn parse_param(raw: &str) -> anyhow::Result<(String, Value)> {
    let Some((key, value)) = raw.split_once('=') else {
        bail!("expected KEY=VALUE, got '{raw}'");
    };
    if key.is_empty() {
        bail!("parameter name is empty in '{raw}'");
    }
    let value =
        serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

/// Collects parsed parameter pairs into a [`Params`] map. Later keys win.
pub fn to_params(pairs: Vec<(String, Value)>) -> Params {
    pairs.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::ApiFormat;
    use serde_json::json;

    const SAMPLE: &str = r#"
base_url = "https://api.example.com"
timeout_secs = 10
format = "json_api"

[headers]
Accept = "application/json"

[telemetry]
otlp_endpoint = "http://localhost:4317"

[[resources]]
name = "User"
has_many = [{ name = "comments" }]

[[resources]]
name = "Comment"
"#;

    #[test]
    fn parses_api_settings_and_resources() {
        let config = CliConfig::parse(SAMPLE).unwrap();
        assert_eq!(config.api.base_url, "https://api.example.com");
        assert_eq!(config.api.timeout_secs, Some(10));
        assert_eq!(config.api.format, ApiFormat::JsonApi);
        assert_eq!(
            config.api.headers.get("Accept").map(String::as_str),
            Some("application/json")
        );
        assert_eq!(config.resources.len(), 2);
        assert_eq!(
            config.telemetry.otlp_endpoint.as_deref(),
            Some("http://localhost:4317")
        );
    }

    #[test]
    fn telemetry_is_optional() {
        let config = CliConfig::parse(r#"base_url = "https://api.example.com""#).unwrap();
        assert!(config.telemetry.otlp_endpoint.is_none());
        assert!(config.resources.is_empty());
    }

    #[test]
    fn missing_base_url_is_rejected() {
        assert!(CliConfig::parse("[[resources]]\nname = \"User\"").is_err());
    }

    #[test]
    fn overrides_replace_file_values() {
        let mut config = CliConfig::parse(SAMPLE).unwrap();
        config.apply_overrides(
            Some("http://localhost:8080".into()),
            vec![("X-Token".into(), "abc".into())],
            None,
        );
        assert_eq!(config.api.base_url, "http://localhost:8080");
        assert_eq!(config.api.headers.len(), 2);
        assert_eq!(config.api.timeout_secs, Some(10));
    }

    #[test]
    fn header_arguments_accept_colon_or_equals() {
        assert_eq!(
            parse_header("Accept: text/plain").unwrap(),
            ("Accept".into(), "text/plain".into())
        );
        assert_eq!(
            parse_header("X-Token=abc").unwrap(),
            ("X-Token".into(), "abc".into())
        );
        assert!(parse_header("novalue").is_err());
        assert!(parse_header(": empty").is_err());
    }

    #[test]
    fn param_values_are_json_when_possible() {
        assert_eq!(parse_param("approved=true").unwrap().1, json!(true));
        assert_eq!(parse_param("page=2").unwrap().1, json!(2));
        assert_eq!(parse_param("name=Tobias").unwrap().1, json!("Tobias"));
        assert_eq!(parse_param("q=").unwrap().1, json!(""));
        assert!(parse_param("=1").is_err());
        assert!(parse_param("flag").is_err());

        let params = to_params(vec![
            parse_param("a=1").unwrap(),
            parse_param("a=2").unwrap(),
        ]);
        assert_eq!(params.get("a"), Some(&json!(2)));
    }
}
