//! Request boundary: route, dispatch and render one request, converting any
//! error into a response.

use crate::context::Context;
use crate::dispatch::dispatch;
use crate::error::{AppError, ErrorKind};
use crate::params::Params;
use crate::registry::Registry;
use crate::resource::Action;
use crate::response::Reply;
use crate::router::PathRouter;
use crate::serializer::Serializer;
use axum::http::Method;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

/// Compiled application. Cheap to clone; every clone shares one read-only registry.
#[derive(Clone, Debug)]
pub struct Application {
    registry: Arc<Registry>,
}

impl Application {
    pub fn new(registry: Registry) -> Self {
        Application {
            registry: Arc::new(registry),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Route, dispatch and render. Every call builds its own [`Context`].
    pub async fn handle(&self, method: &Method, path: &str, params: Params) -> Result<Reply, AppError> {
        let action = Action::from_method(method).ok_or_else(|| {
            AppError::with_message(
                ErrorKind::MethodNotAllowed,
                format!("method {} is not supported", method),
            )
        })?;
        let route = PathRouter::new(&self.registry).resolve(path).await?;
        let scope = route.scope;
        let ctx: Context = dispatch(route, action, params).await?;
        let body = Serializer::new(scope).render_context(&ctx).await?;
        let (status, headers) = ctx.into_response_parts();
        Ok(Reply {
            status,
            headers,
            body,
        })
    }

    /// [`Application::handle`] with errors turned into responses; logs one line per request.
    pub async fn call(&self, method: &Method, path: &str, params: Params) -> Response {
        let response = match self.handle(method, path, params).await {
            Ok(reply) => reply.into_response(),
            Err(e) => e.into_response(),
        };
        tracing::info!(method = %method, path, status = response.status().as_u16(), "request");
        response
    }
}
