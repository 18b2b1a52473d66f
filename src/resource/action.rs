//! Action table: HTTP method slot -> optional custom handler plus options.

use crate::context::Context;
use crate::error::AppError;
use crate::params::Params;
use axum::http::Method;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// The four operations a resource can expose.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    Create,
    Show,
    Update,
    Destroy,
}

impl Action {
    /// `POST -> create, GET -> show, PUT -> update, DELETE -> destroy`; anything else is unmapped.
    pub fn from_method(method: &Method) -> Option<Self> {
        match *method {
            Method::POST => Some(Action::Create),
            Method::GET => Some(Action::Show),
            Method::PUT => Some(Action::Update),
            Method::DELETE => Some(Action::Destroy),
            _ => None,
        }
    }

    pub fn method(self) -> Method {
        match self {
            Action::Create => Method::POST,
            Action::Show => Method::GET,
            Action::Update => Method::PUT,
            Action::Destroy => Method::DELETE,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Show => "show",
            Action::Update => "update",
            Action::Destroy => "destroy",
        }
    }
}

pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<Context, AppError>> + Send>>;

/// Custom action. Takes the request context by value and hands it back after
/// changing the record, status, headers or extra fields.
pub type Handler = Arc<dyn Fn(Context) -> HandlerFuture + Send + Sync>;

pub fn handler<F, Fut>(f: F) -> Handler
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Context, AppError>> + Send + 'static,
{
    Arc::new(move |ctx| Box::pin(f(ctx)))
}

#[derive(Clone, Debug, Default)]
pub struct ActionOptions {
    permit: Option<HashSet<String>>,
}

impl ActionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only these payload keys are accepted; any other key fails the request before the handler runs.
    pub fn permit<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permit = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    pub fn permitted(&self) -> Option<&HashSet<String>> {
        self.permit.as_ref()
    }

    pub fn check(&self, params: &Params) -> Result<(), AppError> {
        match &self.permit {
            Some(permitted) => params.ensure_permitted(permitted),
            None => Ok(()),
        }
    }
}

#[derive(Clone, Default)]
pub struct ActionEntry {
    handler: Option<Handler>,
    options: ActionOptions,
}

impl ActionEntry {
    /// Slot served by the default CRUD behaviour.
    pub fn default_with(options: ActionOptions) -> Self {
        ActionEntry {
            handler: None,
            options,
        }
    }

    pub fn custom(handler: Handler, options: ActionOptions) -> Self {
        ActionEntry {
            handler: Some(handler),
            options,
        }
    }

    pub fn handler(&self) -> Option<&Handler> {
        self.handler.as_ref()
    }

    pub fn options(&self) -> &ActionOptions {
        &self.options
    }
}

impl fmt::Debug for ActionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionEntry")
            .field("custom", &self.handler.is_some())
            .field("options", &self.options)
            .finish()
    }
}

#[derive(Clone, Debug, Default)]
pub struct ActionTable {
    entries: HashMap<Action, ActionEntry>,
}

impl ActionTable {
    pub fn insert(&mut self, action: Action, entry: ActionEntry) {
        self.entries.insert(action, entry);
    }

    pub fn get(&self, action: Action) -> Option<&ActionEntry> {
        self.entries.get(&action)
    }

    pub fn contains(&self, action: Action) -> bool {
        self.entries.contains_key(&action)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Builder methods shared by resources and their collection/member sub-routes.
pub trait DeclareActions: Sized {
    fn action_table(&mut self) -> &mut ActionTable;

    /// Enable the default CRUD behaviour for `action`.
    fn action(self, action: Action) -> Self {
        self.action_with(action, ActionOptions::new())
    }

    fn action_with(mut self, action: Action, options: ActionOptions) -> Self {
        self.action_table()
            .insert(action, ActionEntry::default_with(options));
        self
    }

    fn handle<F, Fut>(mut self, action: Action, options: ActionOptions, f: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Context, AppError>> + Send + 'static,
    {
        self.action_table()
            .insert(action, ActionEntry::custom(handler(f), options));
        self
    }

    fn show<F, Fut>(self, f: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Context, AppError>> + Send + 'static,
    {
        self.handle(Action::Show, ActionOptions::new(), f)
    }

    fn create<F, Fut>(self, f: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Context, AppError>> + Send + 'static,
    {
        self.handle(Action::Create, ActionOptions::new(), f)
    }

    fn update<F, Fut>(self, f: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Context, AppError>> + Send + 'static,
    {
        self.handle(Action::Update, ActionOptions::new(), f)
    }

    fn destroy<F, Fut>(self, f: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Context, AppError>> + Send + 'static,
    {
        self.handle(Action::Destroy, ActionOptions::new(), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_mapping_is_fixed() {
        for action in [Action::Create, Action::Show, Action::Update, Action::Destroy] {
            assert_eq!(Action::from_method(&action.method()), Some(action));
        }
        assert_eq!(Action::from_method(&Method::PATCH), None);
        assert_eq!(Action::from_method(&Method::HEAD), None);
    }

    #[test]
    fn options_without_permit_accept_anything() {
        let params: Params = [("anything", "goes")].into_iter().collect();
        assert!(ActionOptions::new().check(&params).is_ok());
        assert!(ActionOptions::new().permit(["name"]).check(&params).is_err());
    }
}
