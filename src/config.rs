use ::config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::Result;

/// Prefix of the environment variables read by [`ClientOverrides::load`].
pub const ENV_PREFIX: &str = "CONNECTOR_HTTP";

/// The `ClientConfig` struct holds the settings an HTTP client is built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Logs every request and response at debug level.
    pub debug: bool,
    /// Parses response bodies as JSON.
    pub json: bool,
    /// Parses response bodies into an HTML [`Document`](crate::Document). Takes precedence over `json`.
    pub parse_html: bool,
    /// Verifies TLS certificates. Off by default, scraping targets often have broken chains.
    pub strict_ssl: bool,
    /// Keeps cookies between requests.
    pub jar: bool,
    /// Headers sent with every request.
    pub headers: HashMap<String, String>,
    /// Follows redirects whatever the request method. When off, redirects are returned as is.
    pub follow_all_redirects: bool,
    /// Resolves to the full response (status, headers, body) instead of the body alone.
    pub resolve_with_full_response: bool,
    /// The timeout duration for HTTP requests.
    pub timeout: Duration,
    /// The maximum number of redirects followed per request.
    pub max_redirects: usize,
}

impl Default for ClientConfig {
    /// Provides default values for the `ClientConfig` struct.
    ///
    /// # Returns
    ///
    /// A `ClientConfig` instance with scraping-friendly defaults.
    fn default() -> Self {
        Self {
            debug: false,
            json: true,
            parse_html: false,
            strict_ssl: false,
            jar: true,
            headers: HashMap::from([(
                "User-Agent".to_string(),
                crate::DEFAULT_USER_AGENT.to_string(),
            )]),
            follow_all_redirects: true,
            resolve_with_full_response: false,
            timeout: crate::DEFAULT_TIMEOUT,
            max_redirects: crate::DEFAULT_MAX_REDIRECTS,
        }
    }
}

impl ClientConfig {
    /// Applies `overrides` on top of this configuration. Set fields win.
    ///
    /// Headers are merged by name, ignoring case, so overriding `user-agent` replaces the
    /// default `User-Agent` while other default headers stay.
    pub fn merge(mut self, overrides: ClientOverrides) -> Self {
        let ClientOverrides {
            debug,
            json,
            parse_html,
            strict_ssl,
            jar,
            headers,
            follow_all_redirects,
            resolve_with_full_response,
            timeout_secs,
            max_redirects,
        } = overrides;

        self.debug = debug.unwrap_or(self.debug);
        self.json = json.unwrap_or(self.json);
        self.parse_html = parse_html.unwrap_or(self.parse_html);
        self.strict_ssl = strict_ssl.unwrap_or(self.strict_ssl);
        self.jar = jar.unwrap_or(self.jar);
        self.follow_all_redirects = follow_all_redirects.unwrap_or(self.follow_all_redirects);
        self.resolve_with_full_response =
            resolve_with_full_response.unwrap_or(self.resolve_with_full_response);
        self.timeout = timeout_secs.map(Duration::from_secs).unwrap_or(self.timeout);
        self.max_redirects = max_redirects.unwrap_or(self.max_redirects);

        for (name, value) in headers.unwrap_or_default() {
            self.headers.retain(|existing, _| !existing.eq_ignore_ascii_case(&name));
            self.headers.insert(name, value);
        }

        self
    }
}

/// Caller-supplied options. Unset fields keep the [`ClientConfig`] default.
///
/// The camelCase names used by connector configuration files (`cheerio`, `strictSSL`,
/// `followAllRedirects`, `resolveWithFullResponse`) are accepted as aliases.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientOverrides {
    pub debug: Option<bool>,
    pub json: Option<bool>,
    #[serde(alias = "cheerio")]
    pub parse_html: Option<bool>,
    #[serde(alias = "strictSSL", alias = "strictssl")]
    pub strict_ssl: Option<bool>,
    pub jar: Option<bool>,
    pub headers: Option<HashMap<String, String>>,
    #[serde(alias = "followAllRedirects", alias = "followallredirects")]
    pub follow_all_redirects: Option<bool>,
    #[serde(alias = "resolveWithFullResponse", alias = "resolvewithfullresponse")]
    pub resolve_with_full_response: Option<bool>,
    #[serde(alias = "timeout")]
    pub timeout_secs: Option<u64>,
    pub max_redirects: Option<usize>,
}

impl ClientOverrides {
    /// Loads overrides from an optional file, then from `CONNECTOR_HTTP__*` environment variables.
    ///
    /// # Arguments
    ///
    /// * `path` - A configuration file (TOML, JSON, YAML...). A missing file is skipped.
    ///
    /// # Returns
    ///
    /// A `Result` with the overrides, or an error if a source exists but cannot be read.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let overrides = Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        Ok(overrides)
    }

    /// Parses overrides from a TOML snippet.
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let overrides = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        Ok(overrides)
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = Some(debug);
        self
    }

    pub fn json(mut self, json: bool) -> Self {
        self.json = Some(json);
        self
    }

    pub fn parse_html(mut self, parse_html: bool) -> Self {
        self.parse_html = Some(parse_html);
        self
    }

    pub fn strict_ssl(mut self, strict_ssl: bool) -> Self {
        self.strict_ssl = Some(strict_ssl);
        self
    }

    pub fn jar(mut self, jar: bool) -> Self {
        self.jar = Some(jar);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(HashMap::new)
            .insert(name.into(), value.into());
        self
    }

    pub fn follow_all_redirects(mut self, follow: bool) -> Self {
        self.follow_all_redirects = Some(follow);
        self
    }

    pub fn resolve_with_full_response(mut self, full: bool) -> Self {
        self.resolve_with_full_response = Some(full);
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }
}
