//! Client context extractor

use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use platform::client::{extract_client_ip, extract_user_agent};

use crate::application::audit::ClientContext;
use crate::domain::repository::AuthStore;
use crate::presentation::handlers::AuthAppState;

/// Reads the client IP and the User-Agent.
///
/// The IP is the peer address from connect info. X-Forwarded-For is only
/// honoured when that peer is one of the configured trusted proxies.
impl<R> FromRequestParts<AuthAppState<R>> for ClientContext
where
    R: AuthStore,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AuthAppState<R>,
    ) -> Result<Self, Self::Rejection> {
        Ok(client_context(parts, &state.config.trusted_proxies))
    }
}

fn client_context(parts: &Parts, trusted_proxies: &[IpAddr]) -> ClientContext {
    let direct_ip = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip());

    ClientContext {
        ip: extract_client_ip(&parts.headers, direct_ip, trusted_proxies),
        user_agent: extract_user_agent(&parts.headers),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::config::AuthConfig;
    use crate::infra::memory::InMemoryAuthRepository;
    use axum::http::Request;

    fn parts_from(peer: [u8; 4], forwarded_for: &str) -> Parts {
        let mut req = Request::builder()
            .header("x-forwarded-for", forwarded_for)
            .header("user-agent", "test-agent")
            .body(())
            .unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from((peer, 5000))));
        req.into_parts().0
    }

    fn state_trusting(proxies: Vec<IpAddr>) -> AuthAppState<InMemoryAuthRepository> {
        let config = AuthConfig {
            trusted_proxies: proxies,
            ..AuthConfig::default()
        };
        AuthAppState::new(InMemoryAuthRepository::new(), config)
    }

    #[tokio::test]
    async fn test_peer_address_wins_over_untrusted_forwarded_for() {
        let mut parts = parts_from([203, 0, 113, 5], "198.51.100.4");
        let state = state_trusting(Vec::new());

        let client = ClientContext::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(client.ip, Some("203.0.113.5".parse().unwrap()));
        assert_eq!(client.user_agent.as_deref(), Some("test-agent"));
    }

    #[tokio::test]
    async fn test_forwarded_for_from_trusted_proxy() {
        let mut parts = parts_from([127, 0, 0, 1], "198.51.100.4");
        let state = state_trusting(vec!["127.0.0.1".parse().unwrap()]);

        let client = ClientContext::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(client.ip, Some("198.51.100.4".parse().unwrap()));
    }

    #[tokio::test]
    async fn test_missing_connect_info() {
        let (mut parts, _) = Request::builder()
            .header("x-forwarded-for", "198.51.100.4")
            .body(())
            .unwrap()
            .into_parts();
        let state = state_trusting(Vec::new());

        let client = ClientContext::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(client, ClientContext::default());
    }
}
