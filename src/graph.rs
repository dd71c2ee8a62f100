// SPDX-License-Identifier: MPL-2.0

//! The package universe handed to the selector.
//!
//! A [DependencyGraph] maps names to packages, each package owning an ordered
//! set of versions, each version owning an append-only list of dependencies.
//! Looking up an unknown name auto-vivifies an empty placeholder package so
//! that dependency edges can always point at a graph member; a package is
//! considered *existent* only once a version has been added to it.
//!
//! Packages and versions are addressed by small copyable identifiers rather
//! than references, which keeps dependency cycles (A→B→A) representable
//! without any reference cycles. The graph is immutable during a solve; the
//! solver only ever reads it.

use indexmap::IndexMap;

use crate::constraint::VersionConstraint;
use crate::version::Version;

/// Identifier of a package within its [DependencyGraph].
///
/// Ids are assigned in insertion order and are only meaningful for the graph
/// that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PackageId(pub(crate) u32);

/// Identifier of one version of one package within its [DependencyGraph].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PackageVersionId {
    pub(crate) package: PackageId,
    pub(crate) index: u32,
}

impl PackageVersionId {
    /// The package this version belongs to.
    pub fn package(&self) -> PackageId {
        self.package
    }
}

/// A dependency edge: this version needs `target` at a version accepted by
/// `constraint`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    /// The package depended upon.
    pub target: PackageId,
    /// Accepted versions of the target.
    pub constraint: VersionConstraint,
}

#[derive(Debug, Clone)]
struct VersionEntry {
    version: Version,
    dependencies: Vec<Dependency>,
}

#[derive(Debug, Clone)]
struct PackageEntry {
    name: String,
    versions: Vec<VersionEntry>,
}

/// An insertion-ordered universe of packages, versions and dependencies.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    names: IndexMap<String, PackageId>,
    packages: Vec<PackageEntry>,
}

impl DependencyGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the package named `name`, creating an empty placeholder if the
    /// graph has never seen that name. Repeated lookups return the same id.
    pub fn package(&mut self, name: &str) -> PackageId {
        if let Some(&id) = self.names.get(name) {
            return id;
        }
        let id = PackageId(self.packages.len() as u32);
        self.names.insert(name.to_string(), id);
        self.packages.push(PackageEntry {
            name: name.to_string(),
            versions: Vec::new(),
        });
        id
    }

    /// Looks up a package by name without vivifying it.
    pub fn get(&self, name: &str) -> Option<PackageId> {
        self.names.get(name).copied()
    }

    /// The name of a package.
    pub fn name(&self, package: PackageId) -> &str {
        &self.packages[package.0 as usize].name
    }

    /// True once at least one version has been added. Placeholder packages
    /// created by name lookups or dependency targets are non-existent.
    pub fn exists(&self, package: PackageId) -> bool {
        !self.packages[package.0 as usize].versions.is_empty()
    }

    /// Number of packages, placeholders included.
    pub fn package_count(&self) -> usize {
        self.packages.len()
    }

    /// All package ids in insertion order.
    pub fn packages(&self) -> impl Iterator<Item = PackageId> + '_ {
        (0..self.packages.len() as u32).map(PackageId)
    }

    /// The versions of a package, in the order they were added.
    pub fn versions(&self, package: PackageId) -> impl Iterator<Item = &Version> {
        self.packages[package.0 as usize]
            .versions
            .iter()
            .map(|entry| &entry.version)
    }

    /// Number of versions of a package.
    pub fn version_count(&self, package: PackageId) -> usize {
        self.packages[package.0 as usize].versions.len()
    }

    /// Registers a version of a package. Adding a version that compares equal
    /// to an existing one returns the existing id instead of duplicating it.
    pub fn add_version(&mut self, package: PackageId, version: Version) -> PackageVersionId {
        let entry = &mut self.packages[package.0 as usize];
        if let Some(index) = entry.versions.iter().position(|e| e.version == version) {
            return PackageVersionId {
                package,
                index: index as u32,
            };
        }
        let index = entry.versions.len() as u32;
        entry.versions.push(VersionEntry {
            version,
            dependencies: Vec::new(),
        });
        PackageVersionId { package, index }
    }

    /// Finds the id of an exact version of a package.
    pub fn find_version(&self, package: PackageId, version: &Version) -> Option<PackageVersionId> {
        self.packages[package.0 as usize]
            .versions
            .iter()
            .position(|e| &e.version == version)
            .map(|index| PackageVersionId {
                package,
                index: index as u32,
            })
    }

    /// The version value behind a version id.
    pub fn version(&self, pv: PackageVersionId) -> &Version {
        &self.packages[pv.package.0 as usize].versions[pv.index as usize].version
    }

    /// Appends a dependency to a package version. Dependency lists are
    /// append-only; edges are never removed.
    pub fn add_dependency(
        &mut self,
        pv: PackageVersionId,
        target: PackageId,
        constraint: VersionConstraint,
    ) {
        self.packages[pv.package.0 as usize].versions[pv.index as usize]
            .dependencies
            .push(Dependency { target, constraint });
    }

    /// The dependencies of a package version, in the order they were added.
    pub fn dependencies(&self, pv: PackageVersionId) -> &[Dependency] {
        &self.packages[pv.package.0 as usize].versions[pv.index as usize].dependencies
    }

    /// Registers a version and its dependency list in one call, vivifying
    /// every named package.
    pub fn add_dependencies<'a, I>(
        &mut self,
        package: &str,
        version: Version,
        dependencies: I,
    ) -> PackageVersionId
    where
        I: IntoIterator<Item = (&'a str, VersionConstraint)>,
    {
        let package = self.package(package);
        let pv = self.add_version(package, version);
        for (target, constraint) in dependencies {
            let target = self.package(target);
            self.add_dependency(pv, target, constraint);
        }
        pv
    }

    /// Version indices of a package sorted ascending by version value. The
    /// solver's domain ranks are positions in this order.
    pub(crate) fn sorted_version_indices(&self, package: PackageId) -> Vec<u32> {
        let versions = &self.packages[package.0 as usize].versions;
        let mut order: Vec<u32> = (0..versions.len() as u32).collect();
        order.sort_by(|&a, &b| versions[a as usize].version.cmp(&versions[b as usize].version));
        order
    }
}

// TESTS #######################################################################
