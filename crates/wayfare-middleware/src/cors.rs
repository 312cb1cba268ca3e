//! Cross-origin resource sharing.

use std::collections::BTreeSet;

use regex::Regex;
use wayfare_router::{responses, Method, Middleware, Next, Request, ResponseWriter, Route};

const HEADER_ORIGIN: &str = "Origin";
const HEADER_ALLOW_ORIGIN: &str = "Access-Control-Allow-Origin";
const HEADER_ALLOW_METHODS: &str = "Access-Control-Allow-Methods";
const HEADER_ALLOW_CREDENTIALS: &str = "Access-Control-Allow-Credentials";
const HEADER_ALLOW_HEADERS: &str = "Access-Control-Allow-Headers";
const HEADER_REQUEST_HEADERS: &str = "Access-Control-Request-Headers";
const HEADER_MAX_AGE: &str = "Access-Control-Max-Age";

/// Methods advertised when none are configured.
pub const DEFAULT_ALLOWED_METHODS: &str = "HEAD,GET,POST,PUT,PATCH,DELETE,OPTIONS";

/// Headers advertised when none are configured.
pub const DEFAULT_ALLOWED_HEADERS: &str =
    "Accept,Content-Type,Content-Length,Accept-Encoding,Access-Control-Request-Headers,";

const MIN_MAX_AGE_SECS: u64 = 60;

/// CORS settings.
#[derive(Debug, Clone, Default)]
pub struct CorsConfig {
    /// Value of `Access-Control-Max-Age`; raised to 60 if lower.
    pub max_age_secs: u64,
    /// Allowed origin hosts. Empty or containing `*` allows every origin.
    pub allowed_origins: Vec<String>,
    /// Allowed request headers. Empty uses [`DEFAULT_ALLOWED_HEADERS`].
    pub allowed_headers: Vec<String>,
    /// Allowed methods. Empty uses [`DEFAULT_ALLOWED_METHODS`].
    pub allowed_methods: Vec<String>,
}

impl CorsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn max_age_secs(mut self, secs: u64) -> Self {
        self.max_age_secs = secs;
        self
    }

    #[must_use]
    pub fn allow_origin(mut self, origin: impl Into<String>) -> Self {
        self.allowed_origins.push(origin.into());
        self
    }

    #[must_use]
    pub fn allow_header(mut self, header: impl Into<String>) -> Self {
        self.allowed_headers.push(header.into());
        self
    }

    /// Advertises exactly the methods used by `routes`, sorted and deduplicated.
    #[must_use]
    pub fn with_routes(mut self, routes: &[Route]) -> Self {
        let methods: BTreeSet<&str> = routes.iter().map(|r| r.method.as_str()).collect();
        self.allowed_methods = methods.into_iter().map(str::to_string).collect();
        self
    }
}

/// CORS middleware.
///
/// Requests from an allowed origin (or without an `Origin` header) get the
/// `Access-Control-*` headers; an allowed `OPTIONS` request is answered
/// with `200` right away. Requests from other origins get no CORS headers
/// but are still passed on.
///
/// ```
/// use wayfare_middleware::{Cors, CorsConfig};
/// use wayfare_router::{Request, Response, Route, Router};
///
/// let mut router = Router::new(vec![
///     Route::new("home", "GET", "/").handler(|w, _req| w.write_header(204)),
/// ])
/// .unwrap();
/// router.use_middleware(Cors::new(CorsConfig::new().allow_origin("example.com")).unwrap());
///
/// let mut res = Response::new();
/// router.serve(&mut res, &mut Request::get("/").header("Origin", "https://app.example.com"));
/// assert_eq!(res.get_header("Access-Control-Allow-Origin"), Some("https://app.example.com"));
/// ```
#[derive(Debug, Clone)]
pub struct Cors {
    origins: Vec<Regex>,
    max_age: String,
    methods: String,
    headers: String,
}

impl Cors {
    /// Compiles the origin matchers for `config`.
    pub fn new(config: CorsConfig) -> Result<Self, regex::Error> {
        let max_age = config.max_age_secs.max(MIN_MAX_AGE_SECS).to_string();

        let methods = if config.allowed_methods.is_empty() {
            DEFAULT_ALLOWED_METHODS.to_string()
        } else {
            config.allowed_methods.join(",")
        };

        let headers = if config.allowed_headers.is_empty() {
            DEFAULT_ALLOWED_HEADERS.to_string()
        } else {
            let mut joined = config.allowed_headers.join(",");
            if !joined.ends_with(',') {
                joined.push(',');
            }
            joined
        };

        Ok(Self {
            origins: origin_matchers(&config.allowed_origins)?,
            max_age,
            methods,
            headers,
        })
    }

    /// Whether `origin` may receive CORS headers. An empty origin is allowed.
    pub fn allows(&self, origin: &str) -> bool {
        origin.is_empty() || self.origins.iter().any(|re| re.is_match(origin))
    }
}

impl Middleware for Cors {
    fn handle(&self, w: &mut dyn ResponseWriter, req: &mut Request, next: Next<'_>) {
        let origin = req.get_header(HEADER_ORIGIN).unwrap_or_default().to_string();
        if !self.allows(&origin) {
            next(w, req);
            return;
        }

        let requested = req.get_header(HEADER_REQUEST_HEADERS).unwrap_or_default();
        let headers = w.headers_mut();
        headers.insert(HEADER_ALLOW_ORIGIN.to_string(), origin);
        headers.insert(HEADER_MAX_AGE.to_string(), self.max_age.clone());
        headers.insert(HEADER_ALLOW_CREDENTIALS.to_string(), "true".to_string());
        headers.insert(HEADER_ALLOW_METHODS.to_string(), self.methods.clone());
        headers.insert(HEADER_ALLOW_HEADERS.to_string(), format!("{}{requested}", self.headers));

        if req.method == Method::Options.as_str() {
            responses::send_header(w, 200);
            return;
        }

        next(w, req);
    }
}

/// One regex per allowed origin host. `*` anywhere collapses the list to a
/// single match-all.
fn origin_matchers(origins: &[String]) -> Result<Vec<Regex>, regex::Error> {
    if origins.is_empty() || origins.iter().any(|o| o.trim() == "*") {
        return Ok(vec![Regex::new(".+")?]);
    }

    origins
        .iter()
        .map(|o| host_of(o))
        .filter(|host| !host.is_empty())
        .map(|host| {
            Regex::new(&format!(
                r"^(http)?(https)?(:\/\/)?(.+\.)?{}(:[0-9]+)?$",
                regex::escape(host)
            ))
        })
        .collect()
}

/// Strips an optional scheme and port from a configured origin.
fn host_of(origin: &str) -> &str {
    let origin = origin.trim();
    let without_scheme = origin.split_once("://").map_or(origin, |(_, rest)| rest);
    without_scheme.split(':').next().unwrap_or_default().trim()
}

/// Builds one `OPTIONS` route for every pattern in `routes` that has none,
/// so that preflight requests reach the CORS middleware instead of the
/// not-found handler.
pub fn preflight_routes(routes: &[Route]) -> Vec<Route> {
    let covered: BTreeSet<&str> = routes
        .iter()
        .filter(|r| r.method == Method::Options.as_str())
        .map(|r| r.pattern.as_str())
        .collect();

    let mut seen = BTreeSet::new();
    routes
        .iter()
        .filter(|r| !covered.contains(r.pattern.as_str()))
        .filter(|r| seen.insert(r.pattern.as_str()))
        .map(|r| {
            Route::new(format!("cors-preflight:{}", r.pattern), Method::Options.as_str(), r.pattern.clone())
                .trailing_slash(r.trailing_slash)
                .skip_middleware(r.skip_middleware)
                .handler(|w, _req| responses::send_header(w, 200))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use wayfare_router::{Response, Router};

    use super::*;

    fn hello() -> Route {
        Route::new("hello", "GET", "/hello").handler(|w, _req| responses::send(w, "text/plain", "hello", 200))
    }

    fn serve(router: &Router, mut req: Request) -> Response {
        let mut res = Response::new();
        router.serve(&mut res, &mut req);
        res
    }

    #[test]
    fn test_default_config_allows_everything() {
        let mut router = Router::new(vec![hello()]).unwrap();
        router.use_middleware(Cors::new(CorsConfig::new()).unwrap());

        let res = serve(&router, Request::get("/hello").header("Origin", "http://anywhere.test"));
        assert_eq!(res.body_string(), Some("hello".to_string()));
        assert_eq!(res.get_header(HEADER_ALLOW_ORIGIN), Some("http://anywhere.test"));
        assert_eq!(res.get_header(HEADER_ALLOW_METHODS), Some(DEFAULT_ALLOWED_METHODS));
        assert_eq!(res.get_header(HEADER_ALLOW_HEADERS), Some(DEFAULT_ALLOWED_HEADERS));
        assert_eq!(res.get_header(HEADER_ALLOW_CREDENTIALS), Some("true"));
        assert_eq!(res.get_header(HEADER_MAX_AGE), Some("60"));
    }

    #[test]
    fn test_origin_matching() {
        let cors = Cors::new(
            CorsConfig::new()
                .allow_origin("example.com")
                .allow_origin("https://localhost:9696"),
        )
        .unwrap();

        assert!(cors.allows(""));
        assert!(cors.allows("example.com"));
        assert!(cors.allows("https://example.com"));
        assert!(cors.allows("http://api.example.com:8443"));
        assert!(cors.allows("http://localhost:3000"));
        assert!(!cors.allows("https://example.org"));
        assert!(!cors.allows("https://exampleXcom"));
    }

    #[test]
    fn test_wildcard_overrides_list() {
        let cors = Cors::new(CorsConfig::new().allow_origin("example.com").allow_origin(" * ")).unwrap();
        assert!(cors.allows("https://elsewhere.org"));
    }

    #[test]
    fn test_disallowed_origin_continues_without_headers() {
        let mut router = Router::new(vec![hello()]).unwrap();
        router.use_middleware(Cors::new(CorsConfig::new().allow_origin("example.com")).unwrap());

        let res = serve(&router, Request::get("/hello").header("Origin", "https://evil.test"));
        assert_eq!(res.body_string(), Some("hello".to_string()));
        assert!(res.get_header(HEADER_ALLOW_ORIGIN).is_none());
    }

    #[test]
    fn test_preflight_is_answered() {
        let mut routes = vec![hello()];
        routes.extend(preflight_routes(&routes));
        let config = CorsConfig::new()
            .max_age_secs(600)
            .allow_header("x-custom")
            .with_routes(&routes);
        let mut router = Router::new(routes).unwrap();
        router.use_middleware(Cors::new(config).unwrap());

        let res = serve(
            &router,
            Request::new("OPTIONS", "/hello")
                .header("Origin", "https://app.test")
                .header(HEADER_REQUEST_HEADERS, "x-trace"),
        );
        assert_eq!(res.status, 200);
        assert_eq!(res.body_string(), Some(String::new()));
        assert_eq!(res.get_header(HEADER_ALLOW_METHODS), Some("GET,OPTIONS"));
        assert_eq!(res.get_header(HEADER_ALLOW_HEADERS), Some("x-custom,x-trace"));
        assert_eq!(res.get_header(HEADER_MAX_AGE), Some("600"));
    }

    #[test]
    fn test_preflight_routes_skip_covered_patterns() {
        let routes = vec![
            Route::new("a-get", "GET", "/a"),
            Route::new("a-post", "POST", "/a"),
            Route::new("b-get", "GET", "/b").trailing_slash(true),
            Route::new("b-options", "OPTIONS", "/b"),
            Route::new("c-get", "GET", "/c/:id"),
        ];

        let preflight = preflight_routes(&routes);
        let patterns: Vec<&str> = preflight.iter().map(|r| r.pattern.as_str()).collect();
        assert_eq!(patterns, ["/a", "/c/:id"]);
        assert!(preflight.iter().all(|r| r.method == "OPTIONS" && r.handlers.len() == 1));
    }
}
