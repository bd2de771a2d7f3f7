//! Per-class static scopes.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StaticScopeState {
    Uninitialized,
    /// The static initialization path is being walked. Requests for the
    /// scope in this state get the scope as it stands.
    Initializing,
    Initialized,
}

/// Static state of one class, computed at most once per top-level walk.
#[derive(Debug, Clone, Serialize)]
pub struct ClassStaticScope {
    pub class_name: String,
    pub state: StaticScopeState,
    /// Static fields initialized so far, in initialization order.
    pub fields: Vec<String>,
}

impl ClassStaticScope {
    pub fn new(class_name: &str) -> Self {
        Self {
            class_name: class_name.to_string(),
            state: StaticScopeState::Uninitialized,
            fields: Vec::new(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.state == StaticScopeState::Initialized
    }
}
