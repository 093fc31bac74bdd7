use std::time::Duration;

use tokio::time::Instant;

use crate::config::ServerConfig;
use crate::error::RelayError;

use super::UpstreamRequest;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

fn build_reqwest_client(
    pool_max_idle_per_host: usize,
    pool_idle_timeout: Option<Duration>,
) -> Result<reqwest::Client, RelayError> {
    reqwest::Client::builder()
        .pool_max_idle_per_host(pool_max_idle_per_host)
        .pool_idle_timeout(pool_idle_timeout)
        .tcp_nodelay(true)
        .connect_timeout(CONNECT_TIMEOUT)
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .build()
        .map_err(|err| RelayError::RequestBuild(format!("Failed to build HTTP client: {err}")))
}

/// HTTP transport client for the upstream streaming API.
///
/// The inner client is pooled and shared by every relay session.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a new transport with connection pooling from the given server config.
    #[must_use]
    pub fn new(config: &ServerConfig) -> Self {
        let pool_idle_timeout = if config.http_pool_idle_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(config.http_pool_idle_timeout_secs))
        };

        let client = match build_reqwest_client(
            config.http_pool_max_idle_per_host.max(1),
            pool_idle_timeout,
        ) {
            Ok(client) => client,
            Err(err) => {
                tracing::error!(error = %err, "failed to build configured reqwest client, falling back to default client");
                reqwest::Client::new()
            }
        };

        Self { client }
    }

    /// Dispatch a streaming request and wait for the response headers.
    ///
    /// The body is left unread; the caller drains it as a stream. Dropping the
    /// returned response closes the upstream connection.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Dispatch`] when the request cannot be sent
    /// (connection refused, DNS, TLS) and [`RelayError::Timeout`] when no
    /// response headers arrive before `deadline`.
    pub async fn send_stream(
        &self,
        request: &UpstreamRequest,
        deadline: Instant,
    ) -> Result<reqwest::Response, RelayError> {
        let pending = self.client.execute(request.to_reqwest());
        match tokio::time::timeout_at(deadline, pending).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(err)) => Err(RelayError::Dispatch(err.to_string())),
            Err(_) => Err(RelayError::Timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UpstreamConfig;

    fn request_to(url: String) -> UpstreamRequest {
        UpstreamRequest::from_config(&UpstreamConfig {
            url: Some(url),
            api_key: "agent-secret".to_string(),
            ..UpstreamConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_build_client_with_idle_timeout_disabled() {
        assert!(build_reqwest_client(1, None).is_ok());
    }

    #[tokio::test]
    async fn test_connection_refused_is_dispatch_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = HttpTransport::new(&ServerConfig::default());
        let deadline = Instant::now() + Duration::from_secs(5);
        let err = transport
            .send_stream(&request_to(format!("http://{addr}/v1")), deadline)
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::Dispatch(_)), "{err:?}");
    }

    #[tokio::test]
    async fn test_silent_upstream_hits_deadline() {
        // Accepts the connection but never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            std::future::pending::<()>().await;
        });

        let transport = HttpTransport::new(&ServerConfig::default());
        let deadline = Instant::now() + Duration::from_millis(200);
        let err = transport
            .send_stream(&request_to(format!("http://{addr}/v1")), deadline)
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::Timeout), "{err:?}");

        server.abort();
    }
}
