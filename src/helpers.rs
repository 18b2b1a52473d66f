//! Application-wide helper values reachable from any custom handler, keyed by type.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct Helpers {
    by_type: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Helpers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `value`; a second value of the same type replaces the first.
    pub fn insert<T: Send + Sync + 'static>(&mut self, value: T) {
        self.by_type.insert(TypeId::of::<T>(), Arc::new(value));
    }

    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.by_type
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref::<T>())
    }

    pub fn len(&self) -> usize {
        self.by_type.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }
}

impl std::fmt::Debug for Helpers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Helpers").field("count", &self.by_type.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Auth {
        token: &'static str,
    }

    #[test]
    fn lookup_by_type() {
        let mut helpers = Helpers::new();
        helpers.insert(Auth { token: "secret" });
        helpers.insert(3_u32);
        assert_eq!(helpers.get::<Auth>().map(|a| a.token), Some("secret"));
        assert_eq!(helpers.get::<u32>(), Some(&3));
        assert!(helpers.get::<String>().is_none());
    }
}
