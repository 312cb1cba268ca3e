//! Per-method route buckets.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{Result, RouteWarning};
use crate::request::{Method, Request};
use crate::response::ResponseWriter;
use crate::route::{CompiledRoute, Handler, Route};

/// A compiled route together with its middleware-composed entry point.
pub(crate) struct RouteEntry {
    pub(crate) route: Arc<CompiledRoute>,
    pub(crate) serve: Handler,
}

/// Compiled routes bucketed by method, in registration order.
///
/// GET and HEAD buckets always exist. Other methods only have a bucket when
/// at least one route was registered for them.
pub struct MethodTable {
    buckets: HashMap<Method, Vec<RouteEntry>>,
    warnings: Vec<RouteWarning>,
}

impl MethodTable {
    /// Validates, compiles and buckets `routes`.
    ///
    /// Fails on the first invalid route. Duplicate names and duplicate
    /// patterns are only warnings; the earlier route keeps precedence.
    pub fn build(routes: Vec<Route>) -> Result<Self> {
        let mut buckets: HashMap<Method, Vec<RouteEntry>> = HashMap::new();
        buckets.insert(Method::Get, Vec::new());
        buckets.insert(Method::Head, Vec::new());

        let mut accepted: Vec<Arc<CompiledRoute>> = Vec::with_capacity(routes.len());
        let mut warnings = Vec::new();

        for route in routes {
            let compiled = Arc::new(route.compile()?);
            warnings.extend(find_duplicates(&compiled, &accepted));

            buckets
                .entry(compiled.method())
                .or_default()
                .push(RouteEntry {
                    route: Arc::clone(&compiled),
                    serve: chain_handler(Arc::clone(&compiled)),
                });
            accepted.push(compiled);
        }

        debug!(routes = accepted.len(), "route table built");

        Ok(Self { buckets, warnings })
    }

    /// Routes registered for `method`, or `None` if the method has no bucket.
    pub fn routes(&self, method: Method) -> Option<impl Iterator<Item = &CompiledRoute>> {
        self.buckets
            .get(&method)
            .map(|bucket| bucket.iter().map(|entry| entry.route.as_ref()))
    }

    /// Warnings raised while building.
    pub fn warnings(&self) -> &[RouteWarning] {
        &self.warnings
    }

    /// Total number of routes.
    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    /// Returns `true` if no routes were registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn bucket(&self, method: Method) -> Option<&[RouteEntry]> {
        self.buckets.get(&method).map(Vec::as_slice)
    }

    pub(crate) fn entries_mut(&mut self) -> impl Iterator<Item = &mut RouteEntry> {
        self.buckets.values_mut().flat_map(|bucket| bucket.iter_mut())
    }
}

/// The innermost stage of a route: its own handler chain.
fn chain_handler(route: Arc<CompiledRoute>) -> Handler {
    Arc::new(move |w: &mut dyn ResponseWriter, req: &mut Request| route.serve(w, req))
}

fn find_duplicates(route: &CompiledRoute, accepted: &[Arc<CompiledRoute>]) -> Vec<RouteWarning> {
    let mut warnings = Vec::new();

    for earlier in accepted {
        if !route.name().is_empty() && earlier.name() == route.name() {
            let warning = RouteWarning::DuplicateName {
                name: route.name().to_string(),
            };
            warn!("{warning}");
            warnings.push(warning);
        }

        if earlier.method() == route.method() && earlier.match_path(route.pattern()).is_some() {
            let warning = RouteWarning::DuplicatePattern {
                method: route.method(),
                pattern: earlier.pattern().to_string(),
                duplicate: route.pattern().to_string(),
            };
            warn!("{warning}");
            info!("only the first route to match the URI pattern will handle the request");
            warnings.push(warning);
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RouterError;

    fn route(name: &str, method: &str, pattern: &str) -> Route {
        Route::new(name, method, pattern).handler(|w, _req| w.write_header(200))
    }

    #[test]
    fn test_get_and_head_buckets_always_exist() {
        let table = MethodTable::build(Vec::new()).unwrap();
        assert!(table.is_empty());
        assert!(table.routes(Method::Get).is_some());
        assert!(table.routes(Method::Head).is_some());
        assert!(table.routes(Method::Post).is_none());
    }

    #[test]
    fn test_registration_order_is_preserved() {
        let table = MethodTable::build(vec![
            route("a", "GET", "/a"),
            route("b", "POST", "/b"),
            route("c", "GET", "/c"),
        ])
        .unwrap();

        let names: Vec<&str> = table.routes(Method::Get).unwrap().map(CompiledRoute::name).collect();
        assert_eq!(names, ["a", "c"]);
        assert_eq!(table.len(), 3);
        assert!(table.warnings().is_empty());
    }

    #[test]
    fn test_duplicate_pattern_warns() {
        let table = MethodTable::build(vec![
            route("users", "GET", "/users/:id"),
            route("me", "GET", "/users/me"),
            route("me-post", "POST", "/users/me"),
        ])
        .unwrap();

        assert_eq!(
            table.warnings(),
            [RouteWarning::DuplicatePattern {
                method: Method::Get,
                pattern: "/users/:id".to_string(),
                duplicate: "/users/me".to_string(),
            }]
        );
    }

    #[test]
    fn test_duplicate_name_warns_across_methods() {
        let table = MethodTable::build(vec![
            route("items", "GET", "/items"),
            route("items", "POST", "/items"),
        ])
        .unwrap();

        assert_eq!(
            table.warnings(),
            [RouteWarning::DuplicateName {
                name: "items".to_string()
            }]
        );
    }

    #[test]
    fn test_first_invalid_route_aborts() {
        let result = MethodTable::build(vec![
            route("ok", "GET", "/ok"),
            route("bad", "CONNECT", "/bad"),
            route("dup", "GET", "/a/:x/:x"),
        ]);
        assert!(matches!(result, Err(RouterError::UnsupportedMethod { .. })));
    }
}
