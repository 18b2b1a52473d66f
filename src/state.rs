//! Shared state for the HTTP routes.

use crate::app::Application;

#[derive(Clone)]
pub struct AppState {
    pub app: Application,
}

impl AppState {
    pub fn new(app: Application) -> Self {
        AppState { app }
    }
}
