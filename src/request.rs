use crate::config::{ClientConfig, ClientOverrides};
use crate::dom::Document;
use crate::types::{FullResponse, Payload, Transformed};
use crate::{ConnectorError, Result};
use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use reqwest::redirect::Policy;
use reqwest::{Client, IntoUrl, Method, RequestBuilder, Response};
use serde::Serialize;
use std::sync::{Arc, OnceLock};
use tracing::{debug, instrument};

/// The process-wide client handed out by [`request`].
static CLIENT: OnceLock<RequestClient> = OnceLock::new();

/// Returns the process-wide request client, building it on first use.
///
/// Only the first successful call configures the client. Every later call returns the same
/// instance and ignores its `overrides`. Build a [`RequestClient`] directly when a differently
/// configured client is needed.
///
/// # Arguments
///
/// * `overrides` - Options merged onto [`ClientConfig::default`] for the first call.
///
/// # Returns
///
/// A `Result` with the shared client, or an error if the first configuration is invalid.
pub fn request(overrides: ClientOverrides) -> Result<&'static RequestClient> {
    if let Some(client) = CLIENT.get() {
        debug!("Reusing the process-wide request client, new options are ignored");
        return Ok(client);
    }

    let client = RequestClient::new(ClientConfig::default().merge(overrides))?;
    Ok(CLIENT.get_or_init(|| client))
}

/// The `RequestClient` struct is an HTTP client preconfigured for scraping.
/// Responses are run through a transform step that parses them as JSON or HTML.
#[derive(Debug)]
pub struct RequestClient {
    /// The HTTP client used for making requests.
    client: Client,
    /// Same settings and cookie jar as `client`, but never follows redirects. Used for methods
    /// other than GET and HEAD when `follow_all_redirects` is off.
    no_redirect: Option<Client>,
    /// The configuration the client was built from.
    config: ClientConfig,
}

impl RequestClient {
    /// Creates a new `RequestClient` with the given configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - The client settings.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `RequestClient`, or an error if a header is invalid or the
    /// underlying client could not be created. No request is sent.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let jar = config.jar.then(|| Arc::new(Jar::default()));

        let client = build_client(&config, jar.clone(), Policy::limited(config.max_redirects))?;
        let no_redirect = if config.follow_all_redirects {
            None
        } else {
            Some(build_client(&config, jar, Policy::none())?)
        };

        debug!(?config, "Getting a new request client with the following options");

        Ok(Self {
            client,
            no_redirect,
            config,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Starts a request with an arbitrary method. Finish it with [`RequestClient::send`].
    pub fn request(&self, method: Method, url: impl IntoUrl) -> RequestBuilder {
        self.client.request(method, url)
    }

    /// Sends a GET request and transforms the response.
    pub async fn get(&self, url: impl IntoUrl) -> Result<Transformed> {
        self.send(self.client.get(url)).await
    }

    /// Sends a url-encoded form as a POST request and transforms the response.
    pub async fn post_form<T: Serialize + ?Sized>(&self, url: impl IntoUrl, form: &T) -> Result<Transformed> {
        self.send(self.client.post(url).form(form)).await
    }

    /// Sends a JSON body as a POST request and transforms the response.
    pub async fn post_json<T: Serialize + ?Sized>(&self, url: impl IntoUrl, body: &T) -> Result<Transformed> {
        self.send(self.client.post(url).json(body)).await
    }

    /// Sends a prepared request and transforms the response.
    ///
    /// # Arguments
    ///
    /// * `builder` - A request started with [`RequestClient::request`].
    ///
    /// # Returns
    ///
    /// A `Result` with the transformed response. Network failures and 4xx/5xx statuses surface
    /// as [`ConnectorError::TransportFailure`] untouched, any other non-2xx status (an unfollowed
    /// redirect) as [`ConnectorError::UnexpectedStatus`]. Nothing is retried.
    #[instrument(skip(self, builder))]
    pub async fn send(&self, builder: RequestBuilder) -> Result<Transformed> {
        let mut request = builder.build()?;

        if self.wants_json() && !request.headers().contains_key(ACCEPT) {
            request
                .headers_mut()
                .insert(ACCEPT, HeaderValue::from_static("application/json"));
        }

        if self.config.debug {
            debug!(
                method = %request.method(),
                url = %request.url(),
                headers = ?request.headers(),
                "Sending request"
            );
        }

        let client = match &self.no_redirect {
            Some(no_redirect) if !follows_redirects(request.method()) => no_redirect,
            _ => &self.client,
        };
        let response = client.execute(request).await?;

        if self.config.debug {
            debug!(
                status = %response.status(),
                url = %response.url(),
                headers = ?response.headers(),
                "Received response"
            );
        }

        let response = response.error_for_status()?;
        if !response.status().is_success() {
            return Err(ConnectorError::UnexpectedStatus {
                status: response.status(),
                url: response.url().to_string(),
            });
        }

        self.transform(response).await
    }

    /// Applies the configured body parsing, then wraps the result in the full response if asked.
    async fn transform(&self, response: Response) -> Result<Transformed> {
        let status = response.status();
        let url = response.url().clone();
        let headers = response.headers().clone();
        let text = response.text().await?;

        let body = if self.config.parse_html {
            Payload::Html(Document::parse(&text))
        } else if self.config.json {
            match serde_json::from_str(&text) {
                Ok(value) => Payload::Json(value),
                Err(e) => {
                    debug!(error = %e, "Body is not JSON, keeping it as text");
                    Payload::Text(text)
                }
            }
        } else {
            Payload::Text(text)
        };

        if self.config.resolve_with_full_response {
            Ok(Transformed::Full(FullResponse {
                status,
                url,
                headers,
                body,
            }))
        } else {
            Ok(Transformed::Body(body))
        }
    }

    fn wants_json(&self) -> bool {
        self.config.json
            && !self.config.parse_html
            && !self
                .config
                .headers
                .keys()
                .any(|name| name.eq_ignore_ascii_case(ACCEPT.as_str()))
    }
}

fn build_client(config: &ClientConfig, jar: Option<Arc<Jar>>, redirect: Policy) -> Result<Client> {
    let mut builder = Client::builder()
        .default_headers(header_map(config)?)
        .danger_accept_invalid_certs(!config.strict_ssl)
        .redirect(redirect)
        .timeout(config.timeout)
        .gzip(true)
        .connection_verbose(config.debug);

    if let Some(jar) = jar {
        builder = builder.cookie_provider(jar);
    }

    Ok(builder.build()?)
}

/// Methods whose redirects are followed even when `follow_all_redirects` is off.
fn follows_redirects(method: &Method) -> bool {
    *method == Method::GET || *method == Method::HEAD
}

fn header_map(config: &ClientConfig) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();

    for (name, value) in &config.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ConnectorError::InvalidHeader(format!("{name}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ConnectorError::InvalidHeader(format!("{name}: {e}")))?;
        headers.insert(name, value);
    }

    Ok(headers)
}
