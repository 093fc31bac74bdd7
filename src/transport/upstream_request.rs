use bytes::Bytes;
use http::header::{ACCEPT, AUTHORIZATION, CACHE_CONTROL, CONNECTION, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::Serialize;

use crate::config::UpstreamConfig;
use crate::error::RelayError;

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatPayload<'a> {
    messages: Vec<ChatMessage<'a>>,
    top_p: f64,
    stream: bool,
}

/// Fully built outbound streaming request.
///
/// Headers are kept as an ordered list and applied in that order.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    url: url::Url,
    headers: Vec<(HeaderName, HeaderValue)>,
    body: Bytes,
}

impl UpstreamRequest {
    /// Build the conversation request for `upstream`.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Encode`] when the payload cannot be serialized and
    /// [`RelayError::RequestBuild`] when the URL or credential cannot be used in
    /// an HTTP request.
    pub fn from_config(upstream: &UpstreamConfig) -> Result<Self, RelayError> {
        let payload = ChatPayload {
            messages: vec![ChatMessage {
                role: "user",
                content: &upstream.prompt,
            }],
            top_p: upstream.top_p,
            stream: true,
        };
        let body = Bytes::from(serde_json::to_vec(&payload)?);

        let url = url::Url::parse(upstream.url())
            .map_err(|err| RelayError::RequestBuild(format!("invalid upstream URL: {err}")))?;

        let mut authorization = HeaderValue::try_from(format!("Bearer {}", upstream.api_key))
            .map_err(|err| RelayError::RequestBuild(format!("invalid credential: {err}")))?;
        authorization.set_sensitive(true);

        let headers = vec![
            (AUTHORIZATION, authorization),
            (ACCEPT, HeaderValue::from_static("text/event-stream")),
            (CACHE_CONTROL, HeaderValue::from_static("no-cache")),
            (CONNECTION, HeaderValue::from_static("keep-alive")),
            (CONTENT_TYPE, HeaderValue::from_static("application/json")),
        ];

        Ok(Self { url, headers, body })
    }

    #[must_use]
    pub fn method(&self) -> Method {
        Method::POST
    }

    #[must_use]
    pub fn header_map(&self) -> HeaderMap {
        let mut map = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            map.insert(name.clone(), value.clone());
        }
        map
    }

    pub(crate) fn to_reqwest(&self) -> reqwest::Request {
        let mut request = reqwest::Request::new(self.method(), self.url.clone());
        *request.headers_mut() = self.header_map();
        *request.body_mut() = Some(reqwest::Body::from(self.body.clone()));
        request
    }
}
