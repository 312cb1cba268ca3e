//! HTTP/1.1 hosting of a [`Router`] on tokio and hyper.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::header::{HeaderName, HeaderValue};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::StatusCode;
use hyper_util::rt::{TokioIo, TokioTimer};
use hyper_util::server::graceful::GracefulShutdown;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};
use wayfare_router::{responses, Request, Response, Router};

use crate::config::{Config, ConfigError};

/// Errors raised while starting or stopping the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The listener could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Connections were still open when the shutdown timeout expired.
    #[error("connections still open after {0:?}")]
    ShutdownTimeout(Duration),
}

/// A bound listener serving one router.
#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
    router: Arc<Router>,
    config: Config,
}

impl Server {
    /// Binds the listener described by `config`.
    pub async fn bind(router: Router, config: Config) -> Result<Self, ServerError> {
        let addr = config.socket_addr()?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;

        Ok(Self {
            listener,
            router: Arc::new(router),
            config,
        })
    }

    /// The bound address, useful when the config asked for port 0.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Serves connections until `shutdown` resolves, then waits up to the
    /// configured shutdown timeout for open connections to finish.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        let addr = self.local_addr()?;
        info!(%addr, environment = %self.config.environment, "HTTP server started");

        let mut builder = http1::Builder::new();
        builder
            .timer(TokioTimer::new())
            .header_read_timeout(self.config.read_timeout());

        let graceful = GracefulShutdown::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!("shutdown requested, draining connections");
                    break;
                }
                accepted = self.listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(conn) => conn,
                        Err(err) => {
                            warn!(%err, "failed to accept connection");
                            continue;
                        }
                    };

                    let router = Arc::clone(&self.router);
                    let service = service_fn(move |req| handle(req, Arc::clone(&router)));
                    let conn = graceful.watch(builder.serve_connection(TokioIo::new(stream), service));

                    tokio::spawn(async move {
                        if let Err(err) = conn.await {
                            debug!(%peer, %err, "connection closed with error");
                        }
                    });
                }
            }
        }

        drop(self.listener);

        let timeout = self.config.shutdown_timeout();
        if tokio::time::timeout(timeout, graceful.shutdown()).await.is_err() {
            error!(?timeout, "server shutdown timed out");
            return Err(ServerError::ShutdownTimeout(timeout));
        }

        info!("HTTP server shut down");
        Ok(())
    }
}

async fn handle(
    req: hyper::Request<Incoming>,
    router: Arc<Router>,
) -> Result<hyper::Response<Full<Bytes>>, Infallible> {
    let mut request = match into_request(req).await {
        Ok(request) => request,
        Err(err) => {
            warn!(%err, "failed to read request body");
            return Ok(empty(StatusCode::BAD_REQUEST));
        }
    };

    let method = request.method.clone();
    let path = request.path.clone();

    let dispatched = tokio::task::spawn_blocking(move || {
        let mut response = Response::new();
        router.serve(&mut response, &mut request);
        response
    })
    .await;

    let response = match dispatched {
        Ok(response) => response,
        Err(err) => {
            error!(%method, %path, %err, "request handler failed");
            let mut response = Response::new();
            responses::internal_server_error(&mut response, responses::ERR_INTERNAL_SERVER);
            response
        }
    };

    Ok(into_hyper(response))
}

async fn into_request(req: hyper::Request<Incoming>) -> Result<Request, hyper::Error> {
    let (parts, body) = req.into_parts();

    let mut request = Request::new(parts.method.as_str(), parts.uri.path());
    if let Some(query) = parts.uri.query() {
        request.query = Request::parse_query_string(query);
    }
    for (key, value) in &parts.headers {
        match value.to_str() {
            Ok(v) => {
                request.headers.insert(key.to_string(), v.to_string());
            }
            Err(_) => debug!(header = %key, "skipping non-ASCII header value"),
        }
    }
    request.body = body.collect().await?.to_bytes().to_vec();

    Ok(request)
}

fn into_hyper(response: Response) -> hyper::Response<Full<Bytes>> {
    let mut out = hyper::Response::new(Full::new(Bytes::from(response.body)));
    *out.status_mut() = StatusCode::from_u16(response.status).unwrap_or_else(|_| {
        warn!(status = response.status, "invalid status code, sending 500");
        StatusCode::INTERNAL_SERVER_ERROR
    });

    for (key, value) in response.headers {
        match (HeaderName::from_bytes(key.as_bytes()), HeaderValue::from_str(&value)) {
            (Ok(name), Ok(value)) => {
                out.headers_mut().insert(name, value);
            }
            _ => warn!(header = %key, "dropping invalid response header"),
        }
    }

    out
}

fn empty(status: StatusCode) -> hyper::Response<Full<Bytes>> {
    let mut out = hyper::Response::new(Full::new(Bytes::new()));
    *out.status_mut() = status;
    out
}
