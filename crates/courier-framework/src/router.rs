//! Route table and middleware accumulator.
//!
//! Registration happens on a mutable [`Router`]. Once every route and
//! middleware is in place the router is [sealed](Router::seal) into an
//! immutable [`RouteTable`] that the dispatcher shares across workers
//! without locking. Because sealing consumes the router, registering a route
//! after serving has started does not compile.
//!
//! # Chain order
//!
//! Middleware registered before a route runs first; middleware registered
//! after it is appended to the route's chain. For
//!
//! ```rust,ignore
//! router.middleware(m1).command("start", chain![h]).middleware(m2);
//! ```
//!
//! the effective chain of `start` is `[m1, h, m2]`.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use courier_core::Update;

use crate::error::RouteError;
use crate::handler::{BoxedHandler, Handler, into_handler};

/// The dispatch method an update is classified under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// A message starting with a bot command.
    Command,
}

impl Method {
    /// Classifies an update, or returns `None` if no method applies.
    pub fn classify(update: &Update) -> Option<Self> {
        let message = update.message.as_ref()?;
        message.is_command().then_some(Self::Command)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Command => "command",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered `(method, path)` pair with its handler chain.
#[derive(Clone)]
pub struct Route {
    method: Method,
    path: String,
    handlers: Arc<[BoxedHandler]>,
    trailing: usize,
}

impl Route {
    pub fn method(&self) -> Method {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// The effective chain, middleware included.
    pub fn handlers(&self) -> &Arc<[BoxedHandler]> {
        &self.handlers
    }

    /// Number of middleware registered after this route and appended to
    /// the end of its chain.
    ///
    /// These only run through `next()`, so under
    /// [`ChainPolicy::FirstHandler`](crate::ChainPolicy::FirstHandler) they
    /// are skipped unless an earlier handler calls it.
    pub fn trailing_middleware(&self) -> usize {
        self.trailing
    }

    /// Exact string match against the registered path.
    pub fn matches(&self, path: &str) -> bool {
        self.path == path
    }

    fn append(&mut self, handler: BoxedHandler) {
        self.handlers = self
            .handlers
            .iter()
            .cloned()
            .chain(std::iter::once(handler))
            .collect();
        self.trailing += 1;
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("handler_count", &self.handlers.len())
            .field("trailing", &self.trailing)
            .finish()
    }
}

// =============================================================================
// Router: registration phase
// =============================================================================

/// Collects routes and middleware before serving starts.
#[derive(Default)]
pub struct Router {
    middleware: Vec<BoxedHandler>,
    routes: HashMap<Method, Vec<Route>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a command route.
    pub fn command<I>(&mut self, path: impl Into<String>, handlers: I) -> &mut Self
    where
        I: IntoIterator<Item = BoxedHandler>,
    {
        self.add(Method::Command, path, handlers)
    }

    /// Registers a route for `method`.
    ///
    /// The route's chain starts with every middleware registered so far.
    /// Duplicate paths are accepted here and rejected by [`seal`](Self::seal).
    pub fn add<I>(&mut self, method: Method, path: impl Into<String>, handlers: I) -> &mut Self
    where
        I: IntoIterator<Item = BoxedHandler>,
    {
        let path = path.into();
        let handlers: Arc<[BoxedHandler]> = self
            .middleware
            .iter()
            .cloned()
            .chain(handlers)
            .collect();

        let routes = self.routes.entry(method).or_default();
        if routes.iter().any(|route| route.matches(&path)) {
            warn!(%method, path = %path, "Route registered twice");
        }

        debug!(%method, path = %path, handler_count = handlers.len(), "Registered route");
        routes.push(Route {
            method,
            path,
            handlers,
            trailing: 0,
        });
        self
    }

    /// Registers a global middleware handler.
    ///
    /// The handler is appended to every route registered so far and is
    /// prepended to every route registered later.
    pub fn middleware<H: Handler>(&mut self, handler: H) -> &mut Self {
        self.middleware_boxed(into_handler(handler))
    }

    /// Registers a pre-built boxed middleware handler.
    pub fn middleware_boxed(&mut self, handler: BoxedHandler) -> &mut Self {
        for route in self.routes.values_mut().flatten() {
            route.append(Arc::clone(&handler));
        }
        self.middleware.push(handler);
        self
    }

    /// Returns the routes registered for `method`, in registration order.
    pub fn routes_for(&self, method: Method) -> &[Route] {
        self.routes.get(&method).map_or(&[], Vec::as_slice)
    }

    pub fn middleware_count(&self) -> usize {
        self.middleware.len()
    }

    /// Freezes the router into a [`RouteTable`].
    ///
    /// Fails if two routes share a method and path.
    pub fn seal(self) -> Result<RouteTable, RouteError> {
        for (method, routes) in &self.routes {
            let mut seen = HashSet::new();
            for route in routes {
                if !seen.insert(route.path.as_str()) {
                    return Err(RouteError::Duplicate {
                        method: *method,
                        path: route.path.clone(),
                    });
                }
            }
        }

        Ok(RouteTable {
            routes: self.routes,
        })
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("middleware_count", &self.middleware.len())
            .field("routes", &self.routes)
            .finish()
    }
}

// =============================================================================
// RouteTable: serving phase
// =============================================================================

/// The sealed, read-only route table.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: HashMap<Method, Vec<Route>>,
}

impl RouteTable {
    /// Returns the routes registered for `method`, in registration order.
    pub fn routes_for(&self, method: Method) -> &[Route] {
        self.routes.get(&method).map_or(&[], Vec::as_slice)
    }

    /// Returns the first route for `method` whose path equals `path`.
    pub fn find(&self, method: Method, path: &str) -> Option<&Route> {
        self.routes_for(method)
            .iter()
            .find(|route| route.matches(path))
    }

    /// Iterates over every route, grouped by method.
    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.values().flatten()
    }

    /// Routes whose chain ends with middleware registered after them.
    pub fn with_trailing_middleware(&self) -> impl Iterator<Item = &Route> {
        self.iter().filter(|route| route.trailing > 0)
    }

    /// Total number of routes across all methods.
    pub fn len(&self) -> usize {
        self.routes.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain;
    use crate::context::Context;
    use crate::handler::HandlerResult;
    use crate::testing::command_update;

    async fn noop(_ctx: Context) -> HandlerResult {
        Ok(())
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            Method::classify(&command_update(1, "/start")),
            Some(Method::Command)
        );
        assert_eq!(Method::classify(&command_update(1, "hello")), None);
        let empty = Update {
            update_id: 1,
            message: None,
        };
        assert_eq!(Method::classify(&empty), None);
    }

    #[test]
    fn test_middleware_splices_into_existing_and_future_routes() {
        let mut router = Router::new();
        router
            .middleware(noop)
            .command("start", chain![noop, noop])
            .middleware(noop)
            .command("help", chain![noop]);

        let routes = router.routes_for(Method::Command);
        assert_eq!(routes.len(), 2);
        // [m1] + [h, h] + [m2]
        assert_eq!(routes[0].handlers().len(), 4);
        // [m1, m2] + [h]
        assert_eq!(routes[1].handlers().len(), 3);
        assert_eq!(router.middleware_count(), 2);
        assert_eq!(routes[0].trailing_middleware(), 1);
        assert_eq!(routes[1].trailing_middleware(), 0);
    }

    #[test]
    fn test_routes_with_trailing_middleware() {
        let mut router = Router::new();
        router
            .middleware(noop)
            .command("start", chain![noop])
            .middleware(noop)
            .command("help", chain![noop]);
        let table = router.seal().unwrap();

        let paths: Vec<_> = table.with_trailing_middleware().map(Route::path).collect();
        assert_eq!(paths, vec!["start"]);
        assert_eq!(table.iter().count(), 2);

        let mut router = Router::new();
        router.middleware(noop).command("start", chain![noop]);
        let table = router.seal().unwrap();
        assert_eq!(table.with_trailing_middleware().count(), 0);
    }

    #[test]
    fn test_find_exact_match_only() {
        let mut router = Router::new();
        router
            .command("start", chain![noop])
            .command("help", chain![noop]);
        let table = router.seal().unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(
            table.find(Method::Command, "help").map(Route::path),
            Some("help")
        );
        assert!(table.find(Method::Command, "hel").is_none());
        assert!(table.find(Method::Command, "START").is_none());
    }

    #[test]
    fn test_seal_rejects_duplicate_paths() {
        let mut router = Router::new();
        router
            .command("start", chain![noop])
            .command("start", chain![noop]);

        let err = router.seal().unwrap_err();
        assert_eq!(
            err,
            RouteError::Duplicate {
                method: Method::Command,
                path: "start".into()
            }
        );
    }

    #[test]
    fn test_empty_router_seals() {
        let table = Router::new().seal().unwrap();
        assert!(table.is_empty());
        assert!(table.routes_for(Method::Command).is_empty());
    }
}
