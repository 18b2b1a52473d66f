//! Declarative resource model: fields, actions and sub-routes.

pub mod action;
pub mod definition;
pub mod field;

pub use action::{handler, Action, ActionEntry, ActionOptions, ActionTable, DeclareActions, Handler};
pub use definition::{ResourceBuilder, ResourceDef, SubRoute, SubRouteBuilder};
pub use field::{ComputeFn, FieldDescriptor, FieldKind, FieldSet};
