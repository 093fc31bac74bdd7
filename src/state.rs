use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::config::AppConfig;
use crate::stream::RelaySession;
use crate::transport::HttpTransport;

/// Shared application state accessible to all handlers.
///
/// Built once at startup and never mutated afterwards, apart from the
/// session id counter.
pub struct AppState {
    pub config: AppConfig,
    pub transport: HttpTransport,
    session_ids: AtomicU64,
}

impl AppState {
    #[must_use]
    pub fn new(config: AppConfig, transport: HttpTransport) -> Self {
        Self {
            config,
            transport,
            session_ids: AtomicU64::new(1),
        }
    }

    #[must_use]
    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.config.server.timeout_secs)
    }

    /// Open a new relay session bounded by the configured ceiling.
    #[must_use]
    pub fn start_session(&self) -> RelaySession {
        let id = self.session_ids.fetch_add(1, Ordering::Relaxed);
        RelaySession::start(id, self.session_timeout())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;

    #[test]
    fn test_sessions_get_distinct_ids() {
        let state = AppState::new(
            AppConfig::default(),
            HttpTransport::new(&ServerConfig::default()),
        );
        let first = state.start_session();
        let second = state.start_session();
        assert_ne!(first.id(), second.id());
        assert_eq!(state.session_timeout(), Duration::from_secs(30));
    }
}
