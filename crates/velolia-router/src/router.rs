//! The router: registration, matching, dispatch and URL generation.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use http::Method;
use indexmap::IndexMap;
use tracing::debug;
use velolia_container::{ClassEntry, Container, Instance};
use velolia_core::{RecordStore, Request, Response, VeloliaError, VeloliaResult};
use velolia_middleware::{compose, Stage, StageResolver};

use crate::action::Action;
use crate::binding::{bind_arguments, BindingContext};
use crate::captures::Captures;
use crate::controller::{Controller, ControllerEntry};
use crate::pattern::{normalize_path, normalize_prefix};
use crate::resource::PendingResource;
use crate::route::{Handler, Route, RouteBuilder};
use crate::url::{fill, to_url, UrlParams};
use crate::RouteMatch;

/// Attributes shared by the routes registered inside a group.
#[derive(Debug, Clone, Default)]
pub struct GroupAttributes {
    prefix: Option<String>,
    middleware: Vec<Stage>,
}

impl GroupAttributes {
    /// Empty attributes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A path prefix, joined onto any enclosing prefix.
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Middleware appended after any enclosing group's middleware.
    #[must_use]
    pub fn middleware<I, S>(mut self, stages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Stage>,
    {
        self.middleware.extend(stages.into_iter().map(Into::into));
        self
    }
}

/// Routes requests to handlers.
///
/// Static paths live in an exact-match index per method and are always
/// tried first. Dynamic paths are kept per method in registration order and
/// the first one that matches wins; there is no specificity ranking.
///
/// Registration takes `&mut self`. Once built, the router is shared as an
/// `Arc<Router>` and only read.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use http::Method;
/// use velolia_container::Container;
/// use velolia_router::{Action, GroupAttributes, ParamSpec, Router};
///
/// let mut router = Router::new(Arc::new(Container::new()));
/// router.group(GroupAttributes::new().prefix("admin"), |router| {
///     router
///         .get("/users/{user}", Action::new(vec![ParamSpec::scalar("user")], |args| async move {
///             args.value::<String>("user")
///         }))
///         .name("admin.users.show");
/// });
///
/// let found = router.match_route(&Method::GET, "/admin/users/7").unwrap();
/// assert_eq!(found.captures.get("user"), Some("7"));
/// assert_eq!(router.route_path("admin.users.show", 7_u64).unwrap(), "/admin/users/7");
/// ```
pub struct Router {
    container: Arc<Container>,
    store: Option<Arc<dyn RecordStore>>,
    routes: Vec<Route>,
    static_routes: HashMap<Method, HashMap<String, usize>>,
    dynamic_routes: HashMap<Method, Vec<usize>>,
    named: IndexMap<String, usize>,
    controllers: HashMap<String, ControllerEntry>,
    prefix: String,
    group_middleware: Vec<Stage>,
    last_route: Option<usize>,
    base_url: Option<String>,
}

impl Router {
    /// Creates an empty router resolving through `container`.
    #[must_use]
    pub fn new(container: Arc<Container>) -> Self {
        Self {
            container,
            store: None,
            routes: Vec::new(),
            static_routes: HashMap::new(),
            dynamic_routes: HashMap::new(),
            named: IndexMap::new(),
            controllers: HashMap::new(),
            prefix: String::new(),
            group_middleware: Vec::new(),
            last_route: None,
            base_url: None,
        }
    }

    /// The container used for controllers, services and named middleware.
    #[must_use]
    pub fn container(&self) -> &Arc<Container> {
        &self.container
    }

    /// Sets the store used for route-model binding.
    pub fn set_store(&mut self, store: Arc<dyn RecordStore>) -> &mut Self {
        self.store = Some(store);
        self
    }

    /// Sets the base URL prepended by [`route`](Self::route) and
    /// [`url`](Self::url).
    pub fn set_base_url(&mut self, base_url: impl Into<String>) -> &mut Self {
        self.base_url = Some(base_url.into().trim_end_matches('/').to_string());
        self
    }

    /// The configured base URL.
    #[must_use]
    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    // ==================== Registration ====================

    /// Registers a `GET` route.
    pub fn get(&mut self, path: &str, handler: impl Into<Handler>) -> RouteBuilder<'_> {
        self.add_route(Method::GET, path, handler)
    }

    /// Registers a `POST` route.
    pub fn post(&mut self, path: &str, handler: impl Into<Handler>) -> RouteBuilder<'_> {
        self.add_route(Method::POST, path, handler)
    }

    /// Registers a `PUT` route.
    pub fn put(&mut self, path: &str, handler: impl Into<Handler>) -> RouteBuilder<'_> {
        self.add_route(Method::PUT, path, handler)
    }

    /// Registers a `PATCH` route.
    pub fn patch(&mut self, path: &str, handler: impl Into<Handler>) -> RouteBuilder<'_> {
        self.add_route(Method::PATCH, path, handler)
    }

    /// Registers a `DELETE` route.
    pub fn delete(&mut self, path: &str, handler: impl Into<Handler>) -> RouteBuilder<'_> {
        self.add_route(Method::DELETE, path, handler)
    }

    /// Registers an `OPTIONS` route.
    pub fn options(&mut self, path: &str, handler: impl Into<Handler>) -> RouteBuilder<'_> {
        self.add_route(Method::OPTIONS, path, handler)
    }

    /// Registers a route under the active group prefix and middleware.
    ///
    /// Registering the same static method and path again replaces the
    /// earlier route.
    pub fn add_route(&mut self, method: Method, path: &str, handler: impl Into<Handler>) -> RouteBuilder<'_> {
        let path = normalize_path(&format!("{}/{}", self.prefix, path.trim_matches('/')));
        let route = Route::new(method.clone(), &path, handler.into(), self.group_middleware.clone());
        let id = self.routes.len();

        if route.is_dynamic() {
            self.dynamic_routes.entry(method.clone()).or_default().push(id);
        } else {
            self.static_routes
                .entry(method.clone())
                .or_default()
                .insert(path.clone(), id);
        }
        debug!(method = %method, path = %path, handler = %route.handler(), "route registered");

        self.routes.push(route);
        self.last_route = Some(id);
        RouteBuilder::new(self, id)
    }

    /// Runs `callback` with `attributes` added to the active scope, then
    /// restores the previous scope. Groups nest.
    pub fn group<F>(&mut self, attributes: GroupAttributes, callback: F) -> &mut Self
    where
        F: FnOnce(&mut Self),
    {
        let previous_prefix = self.prefix.clone();
        let previous_middleware = self.group_middleware.clone();

        if let Some(prefix) = &attributes.prefix {
            self.prefix = normalize_prefix(&previous_prefix, prefix);
        }
        self.group_middleware.extend(attributes.middleware);

        callback(self);

        self.prefix = previous_prefix;
        self.group_middleware = previous_middleware;
        self
    }

    /// Names the most recently registered route.
    ///
    /// After a group, this is the last route the group added.
    pub fn name(&mut self, name: impl Into<String>) -> &mut Self {
        if let Some(id) = self.last_route {
            self.name_route(id, name.into());
        }
        self
    }

    /// Appends middleware to the most recently registered route.
    pub fn middleware<I, S>(&mut self, stages: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Stage>,
    {
        if let Some(id) = self.last_route {
            self.add_route_middleware(id, stages.into_iter().map(Into::into).collect());
        }
        self
    }

    /// Starts a resource registration for `controller`.
    pub fn resource(&mut self, name: &str, controller: &str) -> PendingResource<'_> {
        PendingResource::new(self, name, controller)
    }

    /// Registers a controller class and its action table.
    ///
    /// Handlers refer to it as `"{C::id()}@action"`.
    pub fn controller<C: Controller>(&mut self) -> &mut Self {
        self.container.define(ClassEntry::of::<C>());
        let entry = ControllerEntry::of::<C>();
        debug!(controller = C::id(), actions = entry.len(), "controller registered");
        self.controllers.insert(C::id().to_string(), entry);
        self
    }

    pub(crate) fn name_route(&mut self, id: usize, name: String) {
        if let Some(route) = self.routes.get_mut(id) {
            route.set_name(name.clone());
            self.named.insert(name, id);
        }
    }

    pub(crate) fn add_route_middleware(&mut self, id: usize, stages: Vec<Stage>) {
        if let Some(route) = self.routes.get_mut(id) {
            route.push_middleware(stages);
        }
    }

    pub(crate) fn route_at(&self, id: usize) -> Option<&Route> {
        self.routes.get(id)
    }

    // ==================== Inspection ====================

    /// Live routes in registration order.
    ///
    /// A static route replaced by a later registration is not included.
    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes
            .iter()
            .enumerate()
            .filter(|(id, route)| self.is_live(*id, route))
            .map(|(_, route)| route)
    }

    fn is_live(&self, id: usize, route: &Route) -> bool {
        route.is_dynamic()
            || self
                .static_routes
                .get(route.method())
                .and_then(|paths| paths.get(route.path()))
                == Some(&id)
    }

    /// Whether a route with this name exists.
    #[must_use]
    pub fn has_route(&self, name: &str) -> bool {
        self.named.contains_key(name)
    }

    /// The route registered under `name`.
    #[must_use]
    pub fn named_route(&self, name: &str) -> Option<&Route> {
        self.named.get(name).and_then(|id| self.routes.get(*id))
    }

    // ==================== Matching ====================

    /// Finds the route for a method and path.
    ///
    /// The path is normalised first, so trailing and repeated slashes do not
    /// matter.
    #[must_use]
    pub fn match_route(&self, method: &Method, path: &str) -> Option<RouteMatch<'_>> {
        self.find(method, path)
            .map(|(_, route, captures)| RouteMatch::new(route, captures))
    }

    fn find(&self, method: &Method, path: &str) -> Option<(usize, &Route, Captures)> {
        let path = normalize_path(path);

        if let Some(&id) = self.static_routes.get(method).and_then(|paths| paths.get(&path)) {
            return self.routes.get(id).map(|route| (id, route, Captures::new()));
        }

        self.dynamic_routes.get(method)?.iter().find_map(|&id| {
            let route = self.routes.get(id)?;
            route.pattern().captures(&path).map(|captures| (id, route, captures))
        })
    }

    // ==================== Dispatch ====================

    /// Runs the matching route's middleware and handler.
    ///
    /// # Errors
    ///
    /// [`VeloliaError::RouteNotFound`] when nothing matches; otherwise any
    /// error raised by middleware, argument binding or the handler.
    pub async fn dispatch(self: &Arc<Self>, request: Request) -> VeloliaResult<Response> {
        let Some((id, route, captures)) = self.find(request.method(), request.path()) else {
            debug!(method = %request.method(), path = %request.path(), "no route matched");
            return Err(VeloliaError::route_not_found(request.method(), request.path()));
        };
        debug!(
            method = %route.method(),
            route = %route.path(),
            handler = %route.handler(),
            middleware = route.middleware().len(),
            "route matched"
        );

        let stages: Arc<[Stage]> = route.middleware().into();
        let resolver: Arc<dyn StageResolver> = self.container.clone();
        let router = Arc::clone(self);

        compose(
            stages,
            move |request| async move { router.run_handler(id, request, captures).await },
            resolver,
        )
        .run(request)
        .await
    }

    async fn run_handler(&self, id: usize, request: Request, captures: Captures) -> VeloliaResult<Response> {
        let handler = self
            .routes
            .get(id)
            .map(Route::handler)
            .ok_or_else(|| VeloliaError::internal(format!("route {id} vanished")))?;

        match handler {
            Handler::Action(action) => self.call_action(action, None, request, captures).await,
            Handler::Controller { class, method } => {
                let instance = self.container.make(class)?;
                let canonical = self.container.get_alias(class)?;
                let action = self
                    .controllers
                    .get(&canonical)
                    .and_then(|entry| entry.action(method))
                    .ok_or_else(|| VeloliaError::ControllerMethodNotFound {
                        controller: class.clone(),
                        method: method.clone(),
                    })?;
                self.call_action(action, Some(instance), request, captures).await
            }
            Handler::Invalid(spec) => Err(VeloliaError::InvalidHandlerType {
                handler: spec.clone(),
            }),
        }
    }

    async fn call_action(
        &self,
        action: &Action,
        receiver: Option<Instance>,
        request: Request,
        captures: Captures,
    ) -> VeloliaResult<Response> {
        let ctx = BindingContext {
            container: &self.container,
            store: self.store.as_deref(),
        };
        let args = bind_arguments(action.params(), request, captures, ctx).await?;
        let reply = action.invoke(receiver, args).await?;
        Ok(reply.into_response())
    }

    // ==================== URL Generation ====================

    /// The URL of a named route; absolute when a base URL is set.
    ///
    /// # Errors
    ///
    /// [`VeloliaError::UndefinedRoute`] for an unknown name and
    /// [`VeloliaError::MissingUrlParameter`] for an unfilled placeholder.
    pub fn route(&self, name: &str, params: impl Into<UrlParams>) -> VeloliaResult<String> {
        let path = self.route_path(name, params)?;
        Ok(to_url(self.base_url(), &path, &[]))
    }

    /// The path of a named route, without the base URL.
    ///
    /// # Errors
    ///
    /// As for [`route`](Self::route).
    pub fn route_path(&self, name: &str, params: impl Into<UrlParams>) -> VeloliaResult<String> {
        let route = self
            .named_route(name)
            .ok_or_else(|| VeloliaError::UndefinedRoute {
                name: name.to_string(),
            })?;
        fill(name, route.path(), params.into(), route.placeholders())
    }

    /// A URL for an arbitrary path with an encoded query string.
    #[must_use]
    pub fn url(&self, path: &str, query: &[(&str, &str)]) -> String {
        to_url(self.base_url(), path, query)
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes.len())
            .field("named", &self.named.len())
            .field("controllers", &self.controllers.len())
            .field("has_store", &self.store.is_some())
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}
