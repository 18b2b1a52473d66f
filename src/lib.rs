//! Resourceful: declarative REST resources over a model store.
//!
//! Resources are declared once into a [`Registry`]; each request path is resolved
//! segment by segment, dispatched to a default or custom action, and rendered
//! into a JSON document following the resource's fields.

pub mod app;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod helpers;
pub mod inflect;
pub mod model;
pub mod params;
pub mod registry;
pub mod resource;
pub mod response;
pub mod router;
pub mod routes;
pub mod serializer;
pub mod sql;
pub mod state;
pub mod telemetry;

pub use app::Application;
pub use config::{resolve, validate, DatabaseConfig, ModelConfig, ResolvedModels, Settings, StoreConfig};
pub use context::Context;
pub use error::{AppError, ConfigError, ErrorKind, StoreError};
pub use helpers::Helpers;
pub use inflect::Inflector;
pub use model::{MemoryStore, Model, ModelHandle, PgStore, Record, Relation, ValidationErrors};
pub use params::Params;
pub use registry::{Registry, RegistryBuilder, ScopeBuilder};
pub use resource::{Action, ActionOptions, DeclareActions, ResourceBuilder, ResourceDef};
pub use response::Reply;
pub use routes::{common_routes, resource_routes};
pub use state::AppState;
pub use telemetry::init_tracing;
