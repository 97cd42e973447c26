//! Shared application state.

use std::sync::Arc;

use roomseek_core::RoomSeekConfig;
use roomseek_runtime::Interpreter;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    pub interpreter: Arc<Interpreter>,
}

impl AppState {
    pub fn new(interpreter: Interpreter) -> Self {
        Self {
            interpreter: Arc::new(interpreter),
        }
    }

    pub fn from_config(config: &RoomSeekConfig) -> Self {
        Self::new(Interpreter::from_config(config))
    }
}
