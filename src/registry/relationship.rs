//! Parent/child relationship graph (`spec.md` §3 "Relationship component", §9 "Cyclic
//! relationship graphs").
//!
//! Represented as a plain component holding entity handles — never owning pointers — so
//! the registry remains the single source of truth for validity (Design Note, §9).

use bevy::prelude::*;

/// Per-entity position in the relationship graph: a parent pointer plus a doubly-linked
/// sibling list rooted at the parent's `first_child`.
///
/// Invariants (asserted in debug, silently preserved in release by construction):
/// - a child's `parent` equals the owning entity of the list it's linked into;
/// - `first_child` begins the sibling list; walking `next_sibling` visits exactly
///   `child_count` entities before hitting `None`;
/// - `prev_sibling`/`next_sibling` are `None` at the respective ends of the list.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Relationship {
    pub parent: Option<Entity>,
    pub first_child: Option<Entity>,
    pub prev_sibling: Option<Entity>,
    pub next_sibling: Option<Entity>,
    pub child_count: u32,
}

impl Relationship {
    pub fn with_parent(parent: Entity) -> Self {
        Self { parent: Some(parent), ..Default::default() }
    }

    pub fn has_children(&self) -> bool {
        self.child_count > 0
    }
}

fn rel_mut(world: &mut World, e: Entity) -> Mut<'_, Relationship> {
    world
        .get_mut::<Relationship>(e)
        .unwrap_or_else(|| panic!("entity {e:?} has no Relationship component"))
}

fn rel_or_default(world: &mut World, e: Entity) -> Relationship {
    world.get::<Relationship>(e).copied().unwrap_or_default()
}

/// Detaches `child` from whatever parent's sibling list it currently belongs to.
/// Returns the `Relationship` data as it stood immediately before detachment, resolving
/// the original engine's `remove_previous_parent` ownership ambiguity (`spec.md` §9 open
/// question 1) by value, not by pointer.
pub fn remove_from_current_parent(world: &mut World, child: Entity) -> Option<Relationship> {
    let rel = rel_or_default(world, child);
    let Some(parent) = rel.parent else { return None };

    match (rel.prev_sibling, rel.next_sibling) {
        (Some(prev), Some(next)) => {
            rel_mut(world, prev).next_sibling = Some(next);
            rel_mut(world, next).prev_sibling = Some(prev);
        }
        (Some(prev), None) => {
            rel_mut(world, prev).next_sibling = None;
        }
        (None, Some(next)) => {
            rel_mut(world, next).prev_sibling = None;
            rel_mut(world, parent).first_child = Some(next);
        }
        (None, None) => {
            rel_mut(world, parent).first_child = None;
        }
    }

    {
        let mut parent_rel = rel_mut(world, parent);
        parent_rel.child_count = parent_rel.child_count.saturating_sub(1);
    }

    if let Some(mut child_rel) = world.get_mut::<Relationship>(child) {
        child_rel.parent = None;
        child_rel.prev_sibling = None;
        child_rel.next_sibling = None;
    }

    Some(rel)
}

/// Appends `child` to `parent`'s sibling list. Caller is responsible for having already
/// detached `child` from any previous parent.
pub fn append_child(world: &mut World, parent: Entity, child: Entity) {
    let last = {
        let mut cursor = rel_or_default(world, parent).first_child;
        let mut last = None;
        while let Some(c) = cursor {
            last = Some(c);
            cursor = rel_or_default(world, c).next_sibling;
        }
        last
    };

    if !world.entity(child).contains::<Relationship>() {
        world.entity_mut(child).insert(Relationship::default());
    }

    {
        let mut child_rel = rel_mut(world, child);
        child_rel.parent = Some(parent);
        child_rel.prev_sibling = last;
        child_rel.next_sibling = None;
    }

    match last {
        Some(last) => rel_mut(world, last).next_sibling = Some(child),
        None => rel_mut(world, parent).first_child = Some(child),
    }

    let mut parent_rel = rel_mut(world, parent);
    parent_rel.child_count += 1;
}

/// Whether `ancestor` is found by walking up `descendant`'s parent chain.
pub fn is_ancestor_of(world: &World, ancestor: Entity, descendant: Entity) -> bool {
    let mut cursor = world.get::<Relationship>(descendant).and_then(|r| r.parent);
    while let Some(e) = cursor {
        if e == ancestor {
            return true;
        }
        cursor = world.get::<Relationship>(e).and_then(|r| r.parent);
    }
    false
}

/// In-order child entities of `parent` (does not require a `&World` query guard; used by
/// callers already holding `&World`).
pub fn children(world: &World, parent: Entity) -> Vec<Entity> {
    let mut out = Vec::new();
    let mut cursor = world.get::<Relationship>(parent).and_then(|r| r.first_child);
    while let Some(e) = cursor {
        out.push(e);
        cursor = world.get::<Relationship>(e).and_then(|r| r.next_sibling);
    }
    out
}
