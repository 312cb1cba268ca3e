//! wayfare demo server
//!
//! Serves a small set of routes showing parameters, handler chains, route
//! groups and the bundled middleware.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Parser;
use serde_json::json;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use wayfare_middleware::{preflight_routes, AccessLog, Cors, CorsConfig};
use wayfare_router::middleware::from_fn;
use wayfare_router::{responses, AppContext, Request, ResponseWriter, Route, RouteGroup, Router};
use wayfare_server::{Config, Server};

/// Demo HTTP server for wayfare-router.
#[derive(Parser)]
#[command(name = "wayfare")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON config file; defaults are used when omitted.
    #[arg(short, long, env = "WAYFARE_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,
}

fn param_handler(w: &mut dyn ResponseWriter, req: &mut Request) {
    let params: BTreeMap<&str, &str> = req.params().iter().collect();
    let route = req.context().route().map(|r| r.name().to_string()).unwrap_or_default();
    responses::ok(
        w,
        &json!({
            "route": route,
            "params": params,
            "chained": req.get_header("chained").unwrap_or_default(),
        }),
    );
}

fn chain(_w: &mut dyn ResponseWriter, req: &mut Request) {
    req.headers.insert("chained".to_string(), "true".to_string());
}

fn error_setter(w: &mut dyn ResponseWriter, req: &mut Request) {
    let err = std::io::Error::other("oh no, server error");
    let message = err.to_string();
    req.set_error(err);
    responses::internal_server_error(w, &message);
}

fn home(w: &mut dyn ResponseWriter, req: &mut Request) {
    let environment = req
        .context()
        .app()
        .get::<String>("environment")
        .cloned()
        .unwrap_or_default();
    responses::send(
        w,
        responses::HTML_CONTENT_TYPE,
        format!("<h1>wayfare</h1><p>environment: {environment}</p>"),
        200,
    );
}

fn routes() -> Vec<Route> {
    let mut routes = vec![
        Route::new("root", "GET", "/").trailing_slash(true).handler(home),
        Route::new("matchall", "GET", "/matchall/:wildcard*")
            .trailing_slash(true)
            .handler(param_handler),
        Route::new("api", "GET", "/api/:param")
            .trailing_slash(true)
            .fall_through(true)
            .handler(chain)
            .handler(param_handler),
        Route::new("error-setter", "GET", "/error-setter")
            .trailing_slash(true)
            .handler(error_setter),
    ];

    routes.extend(
        RouteGroup::new("/v6.2", false)
            .route(Route::new("group-params", "GET", "/:param").handler(param_handler))
            .route(Route::new("group-wildcard", "GET", "/files/:w*").handler(param_handler))
            .into_routes(),
    );

    let preflight = preflight_routes(&routes);
    routes.extend(preflight);
    routes
}

fn build_router(config: &Config) -> anyhow::Result<Router> {
    let routes = routes();
    let cors = Cors::new(CorsConfig::new().with_routes(&routes))?;

    let mut router = Router::new(routes)?
        .with_app_context(AppContext::new().with("environment", config.environment.clone()));

    router.use_middleware(from_fn(|w, req, next| {
        w.headers_mut().insert("Server".to_string(), "wayfare".to_string());
        next(w, req);
    }));
    router.use_middleware(cors.clone());
    router.use_middleware(AccessLog::new());

    router.use_on_special_handlers(cors);
    router.use_on_special_handlers(AccessLog::new());

    Ok(router)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    let router = build_router(&config)?;
    for warning in router.warnings() {
        info!(%warning, "route registration warning");
    }

    let server = Server::bind(router, config).await?;
    server
        .run_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!(%err, "failed to listen for shutdown signal");
            }
        })
        .await?;

    Ok(())
}
