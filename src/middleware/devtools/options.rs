//! Devtools middleware configuration.

use std::fmt;
use std::sync::Arc;

use super::extension::DevtoolsConnector;

/// Devtools middleware configuration.
#[derive(Clone, Default)]
pub struct DevtoolsOptions {
    /// Instance name shown by the debugger.
    pub name: Option<String>,

    /// `None` means enabled in debug builds only.
    pub enabled: Option<bool>,

    /// Label for transitions without one.
    /// Default: "anonymous"
    pub anonymous_action_type: Option<String>,

    /// How to reach the debugger. Without one the middleware is a pass-through.
    pub connector: Option<Arc<dyn DevtoolsConnector>>,
}

impl DevtoolsOptions {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    pub fn anonymous_action_type(mut self, label: impl Into<String>) -> Self {
        self.anonymous_action_type = Some(label.into());
        self
    }

    pub fn connector(mut self, connector: Arc<dyn DevtoolsConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(cfg!(debug_assertions))
    }

    pub(crate) fn anonymous_label(&self) -> &str {
        self.anonymous_action_type.as_deref().unwrap_or("anonymous")
    }
}

impl fmt::Debug for DevtoolsOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DevtoolsOptions")
            .field("name", &self.name)
            .field("enabled", &self.enabled)
            .field("anonymous_action_type", &self.anonymous_action_type)
            .field("has_connector", &self.connector.is_some())
            .finish()
    }
}
