//! # wayfare-server
//!
//! Runs a [`wayfare_router::Router`] as an HTTP/1.1 server.
//!
//! Requests are read with hyper, converted into [`wayfare_router::Request`]
//! values and dispatched on tokio's blocking pool, since handlers are plain
//! synchronous functions. The buffered response is converted back and sent
//! once the handler chain returns.
//!
//! ```no_run
//! use wayfare_router::{responses, Route, Router};
//! use wayfare_server::{Config, Server};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let router = Router::new(vec![
//!     Route::new("ping", "GET", "/ping").handler(|w, _req| responses::ok(w, "pong")),
//! ])?;
//! let config = Config::load("config.json")?;
//!
//! let server = Server::bind(router, config).await?;
//! server.run_until(async { tokio::signal::ctrl_c().await.unwrap_or(()) }).await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod server;

pub use config::{Config, ConfigError};
pub use server::{Server, ServerError};
