// Server loop module
// Accepts connections until shutdown is requested

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use super::connection::accept_connection;
use crate::config::AppState;
use crate::logger;

/// How often the shutdown drain re-checks the connection counter
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Accept connections on `listener` until `state.shutdown` fires.
///
/// Accept errors are logged and never end the loop. After shutdown the
/// listener is closed, idle keep-alive connections are closed and
/// in-flight connections get `shutdown_timeout` seconds to finish.
pub async fn start_server_loop(listener: TcpListener, state: Arc<AppState>) {
    let active_connections = Arc::new(AtomicUsize::new(0));
    let shutdown = Arc::clone(&state.shutdown);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &active_connections);
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            () = shutdown.notified() => {
                break;
            }
        }
    }

    drop(listener);
    state.closing.send_replace(true);
    logger::log_server_stopped(active_connections.load(Ordering::SeqCst));

    let grace = Duration::from_secs(state.config.performance.shutdown_timeout);
    drain_connections(&active_connections, grace).await;
}

/// Wait until no connection is active or the grace period runs out
async fn drain_connections(active_connections: &AtomicUsize, grace: Duration) {
    let deadline = tokio::time::Instant::now() + grace;

    loop {
        let remaining = active_connections.load(Ordering::SeqCst);
        if remaining == 0 {
            logger::log_debug("All connections drained");
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            logger::log_warning(&format!(
                "Shutdown grace period of {}s elapsed with {remaining} connection(s) still open",
                grace.as_secs()
            ));
            return;
        }
        tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::server::create_reusable_listener;
    use http_body_util::{BodyExt, Full};
    use hyper::body::Bytes;
    use hyper::{Method, Request, StatusCode};
    use hyper_util::rt::TokioIo;
    use serde_json::Value;
    use tokio::net::TcpStream;

    fn test_config() -> Config {
        let mut cfg = Config::load_from("does/not/exist/contract-server").unwrap();
        cfg.logging.access_log = false;
        cfg.performance.shutdown_timeout = 1;
        cfg
    }

    async fn request(
        addr: std::net::SocketAddr,
        method: Method,
        uri: &str,
        body: &str,
    ) -> (StatusCode, hyper::HeaderMap, Value) {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
            .await
            .unwrap();
        tokio::spawn(conn);

        let req = Request::builder()
            .method(method)
            .uri(uri)
            .header("Host", addr.to_string())
            .header("Content-Type", "application/json")
            .body(Full::new(Bytes::from(body.to_string())))
            .unwrap();
        let response = sender.send_request(req).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, headers, value)
    }

    #[tokio::test]
    async fn test_drain_returns_when_idle() {
        let counter = AtomicUsize::new(0);
        drain_connections(&counter, Duration::from_secs(30)).await;
    }

    #[tokio::test]
    async fn test_drain_gives_up_after_grace() {
        let counter = AtomicUsize::new(3);
        let started = std::time::Instant::now();
        drain_connections(&counter, Duration::from_millis(100)).await;
        assert!(started.elapsed() >= Duration::from_millis(100));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_serves_contract_over_tcp() {
        let listener = create_reusable_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(AppState::new(&test_config()));
        let server = tokio::spawn(start_server_loop(listener, Arc::clone(&state)));

        let (status, headers, body) = request(addr, Method::GET, "/", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers["content-type"], "application/json");
        assert_eq!(headers["access-control-allow-origin"], "*");
        assert_eq!(body["message"], "Hello, World!");

        let (status, _, body) = request(addr, Method::POST, "/users", r#"{"name":"Ada"}"#).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["name"], "Ada");
        let id = body["data"]["id"].as_i64().unwrap();
        assert!((0..10_000).contains(&id));

        let (status, _, body) = request(addr, Method::GET, "/user/abc", "").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid user ID");

        let (status, headers, body) = request(addr, Method::OPTIONS, "/users", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            headers["access-control-allow-headers"],
            "Content-Type, Authorization"
        );
        assert!(body.is_null());

        state.shutdown.notify_one();
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_idle_keep_alive_connection_does_not_delay_shutdown() {
        let mut cfg = test_config();
        cfg.performance.shutdown_timeout = 3;
        let listener = create_reusable_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(AppState::new(&cfg));
        let server = tokio::spawn(start_server_loop(listener, Arc::clone(&state)));

        let stream = TcpStream::connect(addr).await.unwrap();
        let (mut sender, conn) =
            hyper::client::conn::http1::handshake::<_, Full<Bytes>>(TokioIo::new(stream))
                .await
                .unwrap();
        tokio::spawn(conn);
        let req = Request::builder()
            .uri("/health")
            .header("Host", addr.to_string())
            .body(Full::new(Bytes::new()))
            .unwrap();
        let response = sender.send_request(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        response.into_body().collect().await.unwrap();

        // the client keeps the connection open and idle
        let started = std::time::Instant::now();
        state.shutdown.notify_one();
        server.await.unwrap();
        assert!(
            started.elapsed() < Duration::from_millis(500),
            "shutdown waited {:?} on an idle connection",
            started.elapsed()
        );
        drop(sender);
    }

    #[tokio::test]
    async fn test_connection_limit_rejects_extra_connections() {
        let mut cfg = test_config();
        cfg.performance.max_connections = Some(0);
        let listener = create_reusable_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(AppState::new(&cfg));
        let server = tokio::spawn(start_server_loop(listener, Arc::clone(&state)));

        let stream = TcpStream::connect(addr).await.unwrap();
        let (mut sender, conn) =
            hyper::client::conn::http1::handshake::<_, Full<Bytes>>(TokioIo::new(stream))
                .await
                .unwrap();
        tokio::spawn(conn);
        let req = Request::builder()
            .uri("/health")
            .body(Full::new(Bytes::new()))
            .unwrap();
        assert!(sender.send_request(req).await.is_err());

        state.shutdown.notify_one();
        server.await.unwrap();
    }
}
