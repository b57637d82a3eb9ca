//
//  types.rs
//  Cascade
//
//  Created by hak (tharun)
//

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

/// A symbolic fact a node can provide (define) or depend on (reference).
///
/// Facts are the currency of invalidation: a node that re-declares a
/// provided fact invalidates every node whose `depends` set matches it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Fact {
    /// A free/global top-level name.
    TopLevel(String),
    /// A nominal type name (struct, class, enum).
    Nominal(String),
    /// A name reachable via dynamic dispatch.
    DynamicLookup(String),
    /// A qualified member of a nominal type. `member: None` is the
    /// any-member wildcard (serialized as the empty string).
    Member {
        type_name: String,
        member: Option<String>,
    },
    /// A file-system path the node's build read. Depends-only: the text
    /// format has no way to provide one.
    External(String),
}

impl Fact {
    /// Build a member fact from wire-format strings, mapping the empty
    /// member name to the any-member wildcard.
    pub fn member(type_name: impl Into<String>, member: impl Into<String>) -> Self {
        let member = member.into();
        Fact::Member {
            type_name: type_name.into(),
            member: if member.is_empty() { None } else { Some(member) },
        }
    }

    pub fn kind(&self) -> FactKind {
        match self {
            Fact::TopLevel(_) => FactKind::TopLevel,
            Fact::Nominal(_) => FactKind::Nominal,
            Fact::DynamicLookup(_) => FactKind::DynamicLookup,
            Fact::Member { .. } => FactKind::Member,
            Fact::External(_) => FactKind::External,
        }
    }
}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fact::TopLevel(name) => write!(f, "top-level {name}"),
            Fact::Nominal(name) => write!(f, "nominal {name}"),
            Fact::DynamicLookup(name) => write!(f, "dynamic-lookup {name}"),
            Fact::Member {
                type_name,
                member: Some(m),
            } => write!(f, "member {type_name}.{m}"),
            Fact::Member {
                type_name,
                member: None,
            } => write!(f, "member {type_name}.*"),
            Fact::External(path) => write!(f, "external {path}"),
        }
    }
}

/// The five fact kinds, mirroring the kind keys of the text format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FactKind {
    TopLevel,
    Nominal,
    DynamicLookup,
    Member,
    External,
}

impl FactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FactKind::TopLevel => "top-level",
            FactKind::Nominal => "nominal",
            FactKind::DynamicLookup => "dynamic-lookup",
            FactKind::Member => "member",
            FactKind::External => "external",
        }
    }
}

impl fmt::Display for FactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of loading a node's fact summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LoadResult {
    /// No prior record existed, or the provides set is unchanged.
    UpToDate,
    /// The provides set changed; dependents may need re-examination.
    AffectsDownstream,
}

/// Everything the graph stores per node.
///
/// The `provides` set doubles as the node's fingerprint: reloads diff the
/// old set against the new one to decide the [`LoadResult`].
#[derive(Debug, Clone, Default)]
pub struct NodeRecord {
    /// Facts this node defines. Never contains [`Fact::External`].
    pub(crate) provides: HashSet<Fact>,
    /// Facts this node references, all kinds.
    pub(crate) depends: HashSet<Fact>,
    /// The "needs rebuild" bit. Transitions false -> true only.
    pub(crate) marked: bool,
}

/// Summary counts over a dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    /// Nodes with a record (loaded or implicitly created by marking).
    pub nodes: usize,
    /// Nodes currently marked as needing rebuild.
    pub marked: usize,
    /// Distinct facts provided by at least one node.
    pub provided_facts: usize,
    /// Distinct facts depended on by at least one node.
    pub depended_facts: usize,
    /// External paths ever recorded by any load.
    pub external_paths: usize,
}
