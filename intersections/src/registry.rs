//! Intersection registry for automatic front-end discovery.
//!
//! Each intersection definition self-registers via [`inventory::submit!`]
//! with an [`IntersectionEntry`] containing its CLI name and a factory
//! function. The front-end discovers available intersections at runtime
//! without any central list.

use atsc_core::prelude::IntersectionDef;

/// Describes a front-end-selectable intersection.
pub struct IntersectionEntry {
    /// CLI name used to select this intersection (e.g., "nema8").
    pub name: &'static str,
    /// One-line description for `--help`-style listings.
    pub description: &'static str,
    /// Factory: build the full definition.
    pub create: fn() -> IntersectionDef,
}

impl IntersectionEntry {
    pub const fn new(
        name: &'static str,
        description: &'static str,
        create: fn() -> IntersectionDef,
    ) -> Self {
        Self {
            name,
            description,
            create,
        }
    }
}

inventory::collect!(IntersectionEntry);

/// Return all registered intersections, sorted by name.
pub fn all() -> Vec<&'static IntersectionEntry> {
    let mut entries: Vec<_> = inventory::iter::<IntersectionEntry>.into_iter().collect();
    entries.sort_by_key(|e| e.name);
    entries
}

/// Look up an intersection by its CLI name.
pub fn find(name: &str) -> Option<&'static IntersectionEntry> {
    inventory::iter::<IntersectionEntry>
        .into_iter()
        .find(|e| e.name == name)
}
