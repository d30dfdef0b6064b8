//! HTTP front door: every GET is charged to the caller's address.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::{ConnectInfo, State};
use axum::http::{Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use tokio::net::TcpListener;
use tracing::{debug, error};

use crate::Result;
use crate::config::Admission;
use crate::error::ServerError;
use crate::limiter::{Counter, Info};

#[derive(Clone, Debug)]
pub struct AppState {
    counter: Arc<Counter>,
    admission: Admission,
}

impl AppState {
    #[must_use]
    pub const fn new(counter: Arc<Counter>, admission: Admission) -> Self {
        Self { counter, admission }
    }

    #[must_use]
    pub fn counter(&self) -> &Arc<Counter> {
        &self.counter
    }
}

/// Router serving the limiter on every path.
pub fn router(state: AppState) -> Router {
    Router::new().fallback(admit).with_state(state)
}

/// Binds the listener the server will accept on.
///
/// `addr` is a `host:port` pair; a host name is resolved and the first
/// address that binds is used.
///
/// # Errors
///
/// Returns [`ServerError::Bind`] when the address cannot be resolved or
/// bound.
pub async fn bind(addr: &str) -> Result<TcpListener> {
    TcpListener::bind(addr).await.map_err(|source| {
        ServerError::Bind {
            addr: addr.to_string(),
            source,
        }
        .into()
    })
}

/// Serves `state` on `listener` until `shutdown` resolves.
///
/// # Errors
///
/// Returns [`ServerError::Serve`] if the accept loop fails.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(state).into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|source| ServerError::Serve { source }.into())
}

/// Key for a remote address: its host part, or the raw string when it is not
/// a `host:port` pair.
#[must_use]
pub fn client_key(remote: &str) -> String {
    remote
        .parse::<SocketAddr>()
        .map_or_else(|_| remote.to_string(), |addr| addr.ip().to_string())
}

async fn admit(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    method: Method,
) -> Response {
    if method != Method::GET {
        return (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed\n").into_response();
    }

    let key = client_key(&peer.to_string());
    let Admission {
        limit_per_window,
        amount,
    } = state.admission;
    let info = state.counter.add(&key, limit_per_window, amount, Utc::now());
    if !info.allowed {
        debug!(key = %info.bucket, reset_at = %info.reset_at, "request rate limited");
    }
    render(&info)
}

fn render(info: &Info) -> Response {
    let status = if info.allowed {
        StatusCode::OK
    } else {
        StatusCode::TOO_MANY_REQUESTS
    };
    match serde_json::to_string_pretty(info) {
        Ok(body) => (status, [(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(err) => {
            error!(error = %err, key = %info.bucket, "failed to encode rate limit info");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::client_key;

    #[test]
    fn client_key_strips_the_port() {
        assert_eq!(client_key("203.0.113.9:52114"), "203.0.113.9");
        assert_eq!(client_key("[2001:db8::1]:443"), "2001:db8::1");
    }

    #[test]
    fn client_key_falls_back_to_raw_address() {
        assert_eq!(client_key("203.0.113.9"), "203.0.113.9");
        assert_eq!(client_key("@unix-socket"), "@unix-socket");
        assert_eq!(client_key(""), "");
    }
}
