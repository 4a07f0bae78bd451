use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::Stream;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response};
use serde::Deserialize;
use url::Url;

use crate::accumulating_stream::collect_stream;
use crate::client_logger::ClientLogger;
use crate::credential::Credential;
use crate::error::{Error, Result};
use crate::observability::{CLIENT_REQUESTS, CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS};
use crate::provider::CompletionProvider;
use crate::sse::process_sse;
use crate::types::{
    ChatCompletion, ChatCompletionChunk, ChatCompletionRequest, Completion, CompletionOptions,
    Message,
};

const DEFAULT_API_URL: &str = "https://api.groq.com/openai/v1/";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const COMPLETIONS_PATH: &str = "chat/completions";

/// Client for Groq's OpenAI-compatible chat-completions API.
///
/// The client holds no credential; one is passed with every call so that a
/// single client can serve many sessions.
#[derive(Clone)]
pub struct Groq {
    client: ReqwestClient,
    base_url: Url,
    timeout: Duration,
    logger: Option<Arc<dyn ClientLogger>>,
}

impl Groq {
    /// Create a client for the public Groq endpoint.
    pub fn new() -> Result<Self> {
        Self::with_options(None, None)
    }

    /// Create a new client with custom settings.
    ///
    /// `base_url` must be an absolute http(s) URL; a trailing slash is added
    /// when missing so that relative joins keep the last path segment.
    pub fn with_options(base_url: Option<String>, timeout: Option<Duration>) -> Result<Self> {
        let base_url = parse_base_url(base_url.as_deref().unwrap_or(DEFAULT_API_URL))?;
        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {e}"),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            client,
            base_url,
            timeout,
            logger: None,
        })
    }

    /// Attach a logger that sees every response.
    pub fn with_logger(mut self, logger: Arc<dyn ClientLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// The endpoint root requests are sent to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn endpoint(&self) -> Result<Url> {
        Ok(self.base_url.join(COMPLETIONS_PATH)?)
    }

    /// Create the headers for one request.
    fn headers(&self, credential: &Credential, accept: &'static str) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static(accept));
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", credential.expose()))
            .map_err(|_| {
                Error::validation(
                    "credential contains characters that cannot be sent in a header",
                    Some("credential".to_string()),
                )
            })?;
        auth.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, auth);
        Ok(headers)
    }

    fn transport_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::timeout(
                format!("Request timed out: {e}"),
                Some(self.timeout.as_secs_f64()),
            )
        } else if e.is_connect() {
            Error::connection(format!("Connection error: {e}"), Some(Box::new(e)))
        } else {
            Error::http_client(format!("Request failed: {e}"), Some(Box::new(e)))
        }
    }

    async fn post(
        &self,
        request: &ChatCompletionRequest,
        credential: &Credential,
        accept: &'static str,
    ) -> Result<Response> {
        let url = self.endpoint()?;
        let headers = self.headers(credential, accept)?;
        tracing::debug!(
            model = %request.model,
            messages = request.messages.len(),
            stream = request.stream,
            "sending chat completion request"
        );
        CLIENT_REQUESTS.click();
        let start = Instant::now();
        let response = self
            .client
            .post(url)
            .headers(headers)
            .json(request)
            .send()
            .await
            .map_err(|e| self.transport_error(e));
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());

        let response = match response {
            Ok(response) => response,
            Err(err) => {
                CLIENT_REQUEST_ERRORS.click();
                tracing::warn!(error = %err, "chat completion request failed");
                return Err(err);
            }
        };
        tracing::debug!(status = response.status().as_u16(), "received response");

        if !response.status().is_success() {
            CLIENT_REQUEST_ERRORS.click();
            let err = process_error_response(response).await;
            tracing::warn!(error = %err, "provider rejected chat completion request");
            return Err(err);
        }
        Ok(response)
    }

    /// Send a request and wait for the complete response.
    pub async fn send(
        &self,
        request: &ChatCompletionRequest,
        credential: &Credential,
    ) -> Result<ChatCompletion> {
        let mut request = request.clone();
        request.stream = false;

        let response = self.post(&request, credential, "application/json").await?;
        let completion = response.json::<ChatCompletion>().await.map_err(|e| {
            Error::serialization(format!("Failed to parse response: {e}"), Some(Box::new(e)))
        })?;
        if let Some(logger) = &self.logger {
            logger.log_response(&completion);
        }
        Ok(completion)
    }

    /// Send a request and get the response as a stream of chunks.
    pub async fn stream(
        &self,
        request: &ChatCompletionRequest,
        credential: &Credential,
    ) -> Result<impl Stream<Item = Result<ChatCompletionChunk>> + Send> {
        let mut request = request.clone();
        request.stream = true;

        let response = self.post(&request, credential, "text/event-stream").await?;
        Ok(process_sse(response.bytes_stream()))
    }
}

impl fmt::Debug for Groq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Groq")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .field("logger", &self.logger.is_some())
            .finish()
    }
}

#[async_trait::async_trait]
impl CompletionProvider for Groq {
    async fn complete(
        &self,
        messages: &[Message],
        credential: &Credential,
        options: &CompletionOptions,
    ) -> Result<Completion> {
        let request = ChatCompletionRequest::new(messages, options);
        let completion = if options.stream {
            let stream = self.stream(&request, credential).await?;
            let mut completion = collect_stream(stream, self.logger.as_deref()).await?;
            if completion.model.is_empty() {
                completion.model = request.model.to_string();
            }
            completion
        } else {
            self.send(&request, credential).await?
        };
        tracing::debug!(
            id = %completion.id,
            choices = completion.choices.len(),
            "chat completion finished"
        );
        Ok(completion.into())
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    let with_slash = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    let url = Url::parse(&with_slash)?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(Error::url(
            format!("unsupported URL scheme '{scheme}' in {raw}"),
            None,
        )),
    }
}

/// Convert an unsuccessful response into an error carrying the provider's text.
async fn process_error_response(response: Response) -> Error {
    let status_code = response.status().as_u16();

    let request_id = response
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .map(String::from);

    let retry_after = response
        .headers()
        .get(header::RETRY_AFTER)
        .and_then(|val| val.to_str().ok())
        .and_then(|val| val.trim().parse::<u64>().ok());

    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => {
            return Error::http_client(
                format!("Failed to read error response: {e}"),
                Some(Box::new(e)),
            );
        }
    };

    error_from_body(status_code, &body, request_id, retry_after)
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: Option<ErrorDetail>,
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(rename = "type")]
    error_type: Option<String>,
    message: Option<String>,
    param: Option<String>,
}

/// Map an HTTP status and body to the matching error.
fn error_from_body(
    status_code: u16,
    body: &str,
    request_id: Option<String>,
    retry_after: Option<u64>,
) -> Error {
    let detail = serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .and_then(|e| e.error);
    let error_type = detail.as_ref().and_then(|e| e.error_type.clone());
    let error_param = detail.as_ref().and_then(|e| e.param.clone());
    let message = detail
        .and_then(|e| e.message)
        .unwrap_or_else(|| body.trim().to_string());

    match status_code {
        400 | 413 | 422 => Error::bad_request(message, error_param),
        401 => Error::authentication(message),
        403 => Error::permission(message),
        404 => Error::not_found(message),
        408 => Error::timeout(message, None),
        429 => Error::rate_limit(message, retry_after),
        500 => Error::internal_server(message, request_id),
        502..=504 => Error::service_unavailable(message, retry_after),
        _ => Error::api(status_code, error_type, message, request_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_creation() {
        let client = Groq::new().unwrap();
        assert_eq!(client.base_url().as_str(), DEFAULT_API_URL);
        assert_eq!(client.timeout(), DEFAULT_TIMEOUT);
        assert_eq!(
            client.endpoint().unwrap().as_str(),
            "https://api.groq.com/openai/v1/chat/completions"
        );

        let client = Groq::with_options(
            Some("http://127.0.0.1:8080/openai/v1".to_string()),
            Some(Duration::from_secs(30)),
        )
        .unwrap();
        assert_eq!(client.base_url().as_str(), "http://127.0.0.1:8080/openai/v1/");
        assert_eq!(client.timeout(), Duration::from_secs(30));
        assert_eq!(
            client.endpoint().unwrap().as_str(),
            "http://127.0.0.1:8080/openai/v1/chat/completions"
        );
    }

    #[test]
    fn bad_base_url_is_rejected() {
        assert!(matches!(
            Groq::with_options(Some("not a url".to_string()), None),
            Err(Error::Url { .. })
        ));
        assert!(matches!(
            Groq::with_options(Some("ftp://example.com".to_string()), None),
            Err(Error::Url { .. })
        ));
    }

    #[test]
    fn debug_does_not_leak_internals() {
        let rendered = format!("{:?}", Groq::new().unwrap());
        assert!(rendered.contains("api.groq.com"));
    }

    #[test]
    fn authorization_header_is_sensitive() {
        let client = Groq::new().unwrap();
        let credential = Credential::new("gsk_test").unwrap();
        let headers = client.headers(&credential, "application/json").unwrap();
        let auth = headers.get(header::AUTHORIZATION).unwrap();
        assert!(auth.is_sensitive());
        assert_eq!(auth.to_str().unwrap(), "Bearer gsk_test");
    }

    #[test]
    fn header_unsafe_credential_is_rejected() {
        let client = Groq::new().unwrap();
        let credential = Credential::new("gsk\u{7f}bad").unwrap();
        assert!(
            client
                .headers(&credential, "application/json")
                .unwrap_err()
                .is_validation()
        );
    }

    #[test]
    fn error_mapping_uses_provider_message() {
        let body = r#"{"error":{"message":"Invalid API Key","type":"invalid_request_error","code":"invalid_api_key"}}"#;
        let err = error_from_body(401, body, None, None);
        assert!(err.is_authentication());
        assert_eq!(err.to_string(), "Authentication error: Invalid API Key");

        let err = error_from_body(429, r#"{"error":{"message":"Rate limit reached"}}"#, None, Some(12));
        assert!(matches!(
            err,
            Error::RateLimit {
                retry_after: Some(12),
                ..
            }
        ));

        let err = error_from_body(503, "upstream unavailable", None, None);
        assert!(matches!(err, Error::ServiceUnavailable { .. }));
        assert!(err.to_string().contains("upstream unavailable"));

        let err = error_from_body(418, "short and stout", Some("req_9".to_string()), None);
        assert_eq!(err.status_code(), Some(418));
        assert_eq!(err.request_id(), Some("req_9"));
    }
}
