//! Controllers: injectable types with a table of named actions.

use std::collections::HashMap;

use velolia_container::Injectable;

use crate::action::Action;

/// A class whose methods can be routed to as `"Class@method"`.
///
/// The router builds the controller through the container on each dispatch
/// and invokes the named action on it.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use velolia_container::{Arguments, ContainerError, Injectable};
/// use velolia_router::{Action, Controller, ParamSpec};
///
/// struct PostController;
///
/// impl Injectable for PostController {
///     fn id() -> &'static str {
///         "PostController"
///     }
///
///     fn construct(_args: Arguments) -> Result<Self, ContainerError> {
///         Ok(Self)
///     }
/// }
///
/// impl Controller for PostController {
///     fn actions() -> Vec<(&'static str, Action)> {
///         vec![(
///             "show",
///             Action::method(vec![ParamSpec::scalar("id")], |_this: Arc<Self>, args| async move {
///                 args.value::<String>("id")
///             }),
///         )]
///     }
/// }
/// ```
pub trait Controller: Injectable {
    /// The routable methods, by name.
    fn actions() -> Vec<(&'static str, Action)>;
}

/// A registered controller's action table.
#[derive(Debug, Clone)]
pub(crate) struct ControllerEntry {
    actions: HashMap<String, Action>,
}

impl ControllerEntry {
    pub(crate) fn of<C: Controller>() -> Self {
        Self {
            actions: C::actions()
                .into_iter()
                .map(|(name, action)| (name.to_string(), action))
                .collect(),
        }
    }

    pub(crate) fn action(&self, method: &str) -> Option<&Action> {
        self.actions.get(method)
    }

    pub(crate) fn len(&self) -> usize {
        self.actions.len()
    }
}
