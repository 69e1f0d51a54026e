//! Reusable route-declaration units.
//!
//! # Responsibilities
//! - Hold a root path prefix and an initializer that declares routes
//! - Produce a fresh route list on every table build
//! - Flatten nested registrations into one ordered list
//!
//! # Design Decisions
//! - Controllers are plain values built by ordinary code
//! - An initializer may run any number of times; it must not depend on
//!   external mutable state
//! - A panicking initializer fails the build instead of the process

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use super::error::{panic_message, RoutingError};
use super::route::Route;
use super::router::Router;

/// Declares routes against a fresh [`Router`].
pub type Initializer = Arc<dyn Fn(&mut Router) -> Result<(), RoutingError> + Send + Sync>;

const DEFAULT_ROOT: &str = "/";
const ANONYMOUS: &str = "anonymous";

/// A named registration unit.
#[derive(Clone)]
pub struct Controller {
    name: String,
    root_path: String,
    view_namespace: Option<String>,
    init: Initializer,
}

impl Controller {
    /// A controller rooted at `/`.
    pub fn new<F>(init: F) -> Self
    where
        F: Fn(&mut Router) -> Result<(), RoutingError> + Send + Sync + 'static,
    {
        Self::at(DEFAULT_ROOT, init)
    }

    /// A controller rooted at `root_path`.
    pub fn at<F>(root_path: impl Into<String>, init: F) -> Self
    where
        F: Fn(&mut Router) -> Result<(), RoutingError> + Send + Sync + 'static,
    {
        Self {
            name: ANONYMOUS.to_string(),
            root_path: root_path.into(),
            view_namespace: None,
            init: Arc::new(init),
        }
    }

    pub fn builder() -> ControllerBuilder {
        ControllerBuilder::default()
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Tag every route of this controller with a view namespace.
    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.view_namespace = Some(namespace.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root_path(&self) -> &str {
        &self.root_path
    }

    pub fn view_namespace(&self) -> Option<&str> {
        self.view_namespace.as_deref()
    }

    /// Run the initializer against a fresh router and return its routes.
    pub fn routes(&self, case_insensitive: bool) -> Result<Vec<Route>, RoutingError> {
        let mut router = Router::with_options(
            self.root_path.clone(),
            case_insensitive,
            self.view_namespace.clone(),
        );

        match panic::catch_unwind(AssertUnwindSafe(|| (self.init)(&mut router))) {
            Ok(Ok(())) => Ok(router.into_routes()),
            Ok(Err(e)) => Err(e),
            Err(payload) => Err(RoutingError::InitializerPanicked {
                controller: self.name.clone(),
                message: panic_message(&*payload),
            }),
        }
    }
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("name", &self.name)
            .field("root_path", &self.root_path)
            .field("view_namespace", &self.view_namespace)
            .finish_non_exhaustive()
    }
}

/// Step-by-step construction; fails if no initializer was given.
#[derive(Default)]
pub struct ControllerBuilder {
    name: Option<String>,
    root_path: Option<String>,
    view_namespace: Option<String>,
    init: Option<Initializer>,
}

impl ControllerBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn root_path(mut self, root_path: impl Into<String>) -> Self {
        self.root_path = Some(root_path.into());
        self
    }

    pub fn view_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.view_namespace = Some(namespace.into());
        self
    }

    pub fn initializer<F>(mut self, init: F) -> Self
    where
        F: Fn(&mut Router) -> Result<(), RoutingError> + Send + Sync + 'static,
    {
        self.init = Some(Arc::new(init));
        self
    }

    pub fn build(self) -> Result<Controller, RoutingError> {
        let name = self.name.unwrap_or_else(|| ANONYMOUS.to_string());
        let Some(init) = self.init else {
            return Err(RoutingError::MissingInitializer(name));
        };
        Ok(Controller {
            name,
            root_path: self.root_path.unwrap_or_else(|| DEFAULT_ROOT.to_string()),
            view_namespace: self.view_namespace,
            init,
        })
    }
}

/// A controller or an arbitrarily nested list of them.
#[derive(Debug, Clone)]
pub enum ControllerEntry {
    One(Controller),
    Many(Vec<ControllerEntry>),
}

impl ControllerEntry {
    /// Depth-first, preserving order.
    pub fn flatten(self) -> Vec<Controller> {
        let mut out = Vec::new();
        self.flatten_into(&mut out);
        out
    }

    fn flatten_into(self, out: &mut Vec<Controller>) {
        match self {
            ControllerEntry::One(c) => out.push(c),
            ControllerEntry::Many(entries) => {
                for entry in entries {
                    entry.flatten_into(out);
                }
            }
        }
    }
}

impl From<Controller> for ControllerEntry {
    fn from(c: Controller) -> Self {
        ControllerEntry::One(c)
    }
}

impl<T: Into<ControllerEntry>> From<Vec<T>> for ControllerEntry {
    fn from(entries: Vec<T>) -> Self {
        ControllerEntry::Many(entries.into_iter().map(Into::into).collect())
    }
}
