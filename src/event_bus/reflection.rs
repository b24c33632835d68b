//! Minimal opaque-value reflection (`spec.md` §9 "Event-bus type erasure").
//!
//! Events are type-erased `dyn Any` values tagged by `TypeId`. Predicates that want to
//! inspect a field without knowing the concrete event type (e.g. "does this have a
//! `damage` field greater than 5?") look the field up through a small registry of
//! accessor closures keyed by `(TypeId, field name)`, built once at registration time —
//! matching the event type is a single hash-map lookup, not per-event dynamic dispatch.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use bevy::prelude::*;

/// A registered way to read one numeric field out of a type-erased event.
pub type FieldAccessor = Box<dyn Fn(&dyn Any) -> Option<f64> + Send + Sync>;

#[derive(Resource, Default)]
pub struct ReflectionTable {
    fields: HashMap<(TypeId, &'static str), FieldAccessor>,
}

impl ReflectionTable {
    /// Registers `field` of `T` as readable through the opaque-value path.
    pub fn register_field<T: 'static>(&mut self, field: &'static str, get: fn(&T) -> f64) {
        let accessor: FieldAccessor = Box::new(move |any| any.downcast_ref::<T>().map(get));
        self.fields.insert((TypeId::of::<T>(), field), accessor);
    }

    pub fn read_field(&self, type_id: TypeId, field: &str, value: &dyn Any) -> Option<f64> {
        self.fields.get(&(type_id, field)).and_then(|accessor| accessor(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Hit {
        damage: f64,
    }

    #[test]
    fn registered_field_is_readable_through_opaque_value() {
        let mut table = ReflectionTable::default();
        table.register_field::<Hit>("damage", |h| h.damage);

        let hit = Hit { damage: 7.0 };
        let value: &dyn Any = &hit;

        assert_eq!(table.read_field(TypeId::of::<Hit>(), "damage", value), Some(7.0));
        assert_eq!(table.read_field(TypeId::of::<Hit>(), "missing", value), None);
    }

    #[test]
    fn unregistered_field_returns_none() {
        let table = ReflectionTable::default();
        let hit = Hit { damage: 1.0 };
        assert_eq!(table.read_field(TypeId::of::<Hit>(), "damage", &hit as &dyn Any), None);
    }
}
