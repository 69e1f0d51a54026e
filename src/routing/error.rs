//! Routing configuration errors.
//!
//! Every variant is raised while routes are declared or the table is
//! rebuilt; none are raised while a request is dispatched.

use thiserror::Error;

/// Errors raised while declaring routes or assembling the table.
#[derive(Debug, Error)]
pub enum RoutingError {
    /// A template could not be compiled.
    #[error("invalid path template '{template}': {source}")]
    Pattern {
        template: String,
        #[source]
        source: regex::Error,
    },

    /// A controller was built without an initializer.
    #[error("unable to create controller '{0}' without an initializer")]
    MissingInitializer(String),

    /// A controller initializer returned an error during a rebuild.
    #[error("controller '{controller}' failed to initialize: {reason}")]
    Initializer { controller: String, reason: String },

    /// A controller initializer panicked during a rebuild.
    #[error("controller '{controller}' panicked during initialization: {message}")]
    InitializerPanicked { controller: String, message: String },
}

impl RoutingError {
    /// Build an initializer failure from any displayable reason.
    pub fn initializer(controller: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        RoutingError::Initializer {
            controller: controller.into(),
            reason: reason.to_string(),
        }
    }
}

/// Render a panic payload as text.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
