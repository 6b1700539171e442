//! Resource routes: the seven conventional CRUD routes for one controller.

use std::collections::HashMap;

use http::Method;

use crate::route::Handler;
use crate::router::Router;

/// The resource actions: `(action, method, path suffix)`.
pub const RESOURCE_ACTIONS: [(&str, Method, &str); 7] = [
    ("index", Method::GET, ""),
    ("create", Method::GET, "/create"),
    ("store", Method::POST, ""),
    ("show", Method::GET, "/{id}"),
    ("edit", Method::GET, "/{id}/edit"),
    ("update", Method::PUT, "/{id}"),
    ("destroy", Method::DELETE, "/{id}"),
];

/// A resource registration waiting for its options.
///
/// Routes are added when [`register`](Self::register) is called or the
/// value is dropped, whichever comes first. Surrounding slashes in the
/// resource name are ignored for both paths and default route names.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use velolia_container::Container;
/// use velolia_router::Router;
///
/// let mut router = Router::new(Arc::new(Container::new()));
/// router
///     .resource("photos", "PhotoController")
///     .except(&["create", "edit"])
///     .name("index", "gallery");
///
/// assert_eq!(router.routes().count(), 5);
/// assert!(router.has_route("gallery"));
/// assert!(router.has_route("photos.show"));
/// ```
#[must_use = "resource routes are registered when this value is dropped"]
pub struct PendingResource<'r> {
    router: &'r mut Router,
    name: String,
    controller: String,
    only: Vec<String>,
    except: Vec<String>,
    names: HashMap<String, String>,
    registered: bool,
}

impl<'r> PendingResource<'r> {
    pub(crate) fn new(router: &'r mut Router, name: &str, controller: &str) -> Self {
        Self {
            router,
            name: name.to_string(),
            controller: controller.to_string(),
            only: Vec::new(),
            except: Vec::new(),
            names: HashMap::new(),
            registered: false,
        }
    }

    /// Registers only these actions.
    pub fn only(mut self, actions: &[&str]) -> Self {
        self.only = actions.iter().map(ToString::to_string).collect();
        self
    }

    /// Registers every action except these.
    pub fn except(mut self, actions: &[&str]) -> Self {
        self.except = actions.iter().map(ToString::to_string).collect();
        self
    }

    /// Replaces the route-name overrides.
    pub fn names<I, K, V>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.names = names.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        self
    }

    /// Overrides the route name of one action.
    pub fn name(mut self, action: &str, name: &str) -> Self {
        self.names.insert(action.to_string(), name.to_string());
        self
    }

    /// Adds the routes now.
    pub fn register(mut self) {
        self.add_routes();
    }

    fn selected(&self, action: &str) -> bool {
        (self.only.is_empty() || self.only.iter().any(|a| a == action))
            && !self.except.iter().any(|a| a == action)
    }

    fn add_routes(&mut self) {
        if self.registered {
            return;
        }
        self.registered = true;

        let name = self.name.trim_matches('/').to_string();
        let base = format!("/{name}");
        for (action, method, suffix) in RESOURCE_ACTIONS {
            if !self.selected(action) {
                continue;
            }
            let route_name = self
                .names
                .get(action)
                .cloned()
                .unwrap_or_else(|| format!("{name}.{action}"));
            let handler = Handler::controller(self.controller.as_str(), action);
            self.router
                .add_route(method, &format!("{base}{suffix}"), handler)
                .name(route_name);
        }
    }
}

impl Drop for PendingResource<'_> {
    fn drop(&mut self) {
        self.add_routes();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use velolia_container::Container;

    fn router() -> Router {
        Router::new(Arc::new(Container::new()))
    }

    #[test]
    fn test_registers_seven_routes() {
        let mut router = router();
        router.resource("posts", "PostController").register();

        let routes: Vec<_> = router
            .routes()
            .map(|r| (r.method().to_string(), r.path().to_string(), r.name().map(str::to_string)))
            .collect();
        assert_eq!(routes.len(), 7);
        assert!(routes.contains(&("GET".into(), "/posts/{id}/edit".into(), Some("posts.edit".into()))));
        assert!(routes.contains(&("DELETE".into(), "/posts/{id}".into(), Some("posts.destroy".into()))));
        assert_eq!(router.route_path("posts.show", 3_u64).unwrap(), "/posts/3");
    }

    #[test]
    fn test_only_and_names() {
        let mut router = router();
        router
            .resource("/comments/", "CommentController")
            .only(&["index", "show"])
            .names([("show", "comment")]);

        assert_eq!(router.routes().count(), 2);
        assert!(router.has_route("comments.index"));
        assert!(!router.has_route("/comments/.index"));
        assert!(router.has_route("comment"));
        assert!(!router.has_route("comments.show"));
        assert_eq!(router.route_path("comments.index", ()).unwrap(), "/comments");
    }

    #[test]
    fn test_resource_inside_group() {
        let mut router = router();
        router.group(crate::GroupAttributes::new().prefix("admin"), |router| {
            router.resource("users", "UserController").only(&["index"]);
        });

        let route = router.routes().next().unwrap();
        assert_eq!(route.path(), "/admin/users");
    }
}
