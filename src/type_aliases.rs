// SPDX-License-Identifier: MPL-2.0

//! Publicly exported type aliases.

use indexmap::IndexMap;

use crate::version::Version;

/// Map implementation used by the library.
pub type Map<K, V> = rustc_hash::FxHashMap<K, V>;

/// Set implementation used by the library.
pub type Set<V> = rustc_hash::FxHashSet<V>;

/// Concrete versions picked by [find_solution](crate::Selector::find_solution)
/// for every package present in the solution, in variable order: top-level
/// packages first (graph insertion order), then induced packages in the order
/// reachability discovered them.
pub type Assignment = IndexMap<String, Version>;
