//! A bonded-graph representation of glycans, built from the bracket notation used by structure-prediction servers
//!
//! Strings like `NAG(NAG(MAN(MAN)(MAN)))` only say which residues hang off which; [`GlycanGraph`] turns them into
//! numbered residues and explicit glycosidic bonds, filling in the parent's hydroxyl atom from a [`LinkageTable`]
//! wherever the string doesn't spell out its own `parent-child` linkage.

pub mod anchor;
mod builder;
pub mod errors;
pub mod linkages;
pub mod parser;
#[cfg(test)]
mod testing_tools;

use std::{fmt, str::FromStr};

use derive_more::Display;
use itertools::Itertools;

pub use anchor::{Anchor, AttachmentSite};
pub use errors::{GlycanError, Result};
pub use linkages::{BranchRole, LinkageTable};

/// The atom on the child residue of every glycosidic bond
pub const CHILD_ATOM: &str = "C1";

// Core Types ==========================================================================================================

/// The 1-based id of a residue, assigned in pre-order as the glycan is read left to right
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display)]
pub struct NodeId(usize);

impl NodeId {
    pub const ROOT: Self = Self(1);

    #[must_use]
    pub const fn get(self) -> usize {
        self.0
    }
}

/// The hydroxyl oxygen of the parent residue that a child residue bonds to
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display)]
pub enum ParentAtom {
    O2,
    O3,
    O4,
    O6,
}

impl ParentAtom {
    #[must_use]
    pub const fn from_position(position: u8) -> Option<Self> {
        Some(match position {
            2 => Self::O2,
            3 => Self::O3,
            4 => Self::O4,
            6 => Self::O6,
            _ => return None,
        })
    }

    /// The ring carbon the oxygen sits on
    #[must_use]
    pub const fn position(self) -> u8 {
        match self {
            Self::O2 => 2,
            Self::O3 => 3,
            Self::O4 => 4,
            Self::O6 => 6,
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, thiserror::Error)]
#[error("{0:?} is not one of O2, O3, O4, or O6")]
pub struct ParentAtomError(String);

impl FromStr for ParentAtom {
    type Err = ParentAtomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let position = s
            .strip_prefix(['O', 'o'])
            .and_then(|p| p.parse().ok())
            .and_then(Self::from_position);
        position.ok_or_else(|| ParentAtomError(s.to_owned()))
    }
}

/// Where the parent atom of a bond came from
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum LinkageOrigin {
    /// Written out in the glycan string as a `parent-child` token
    Explicit,
    /// Looked up in a [`LinkageTable`]
    Inferred,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct BondEdge {
    pub parent: NodeId,
    pub parent_atom: ParentAtom,
    pub child: NodeId,
    pub origin: LinkageOrigin,
}

impl BondEdge {
    #[must_use]
    pub const fn child_atom(&self) -> &'static str {
        CHILD_ATOM
    }
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub struct ResidueNode {
    pub id: NodeId,
    pub code: String,
    pub parent: Option<NodeId>,
}

// Glycan Graph ========================================================================================================

/// A glycan as a tree of residues and the glycosidic bonds between them
///
/// Node ids run contiguously from 1 in pre-order, so the same string always produces the same numbering. Bonds are
/// stored in the order of their child's id: the bond into node `k` is the `k - 1`th bond.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct GlycanGraph {
    nodes: Vec<ResidueNode>,
    edges: Vec<BondEdge>,
}

impl GlycanGraph {
    /// Parses `glycan` and resolves any implicit linkages using `linkages`
    ///
    /// # Errors
    ///
    /// Fails with [`GlycanError::MalformedTopology`] if the string isn't valid bracket notation, or with
    /// [`GlycanError::UnresolvedLinkage`] if a bond has neither an explicit linkage nor a matching rule in `linkages`.
    pub fn new(linkages: &LinkageTable, glycan: impl AsRef<str>) -> Result<Self> {
        let glycan = glycan.as_ref();
        let tree = parser::parse(glycan)?;
        let graph = builder::GraphBuilder::new(linkages, glycan).build(&tree)?;
        Ok(graph)
    }

    #[must_use]
    pub fn nodes(&self) -> &[ResidueNode] {
        &self.nodes
    }

    #[must_use]
    pub fn edges(&self) -> &[BondEdge] {
        &self.edges
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&ResidueNode> {
        self.nodes.get(id.0.checked_sub(1)?)
    }

    #[must_use]
    pub fn root(&self) -> &ResidueNode {
        // NOTE: Parsing can't produce a glycan without at least one residue
        &self.nodes[0]
    }

    /// The bond connecting `id` to its parent, or `None` for the root
    #[must_use]
    pub fn parent_edge(&self, id: NodeId) -> Option<&BondEdge> {
        self.edges.get(id.0.checked_sub(2)?)
    }

    /// The bonds to the children of `id`, in the order they were written
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = &BondEdge> {
        self.edges.iter().filter(move |e| e.parent == id)
    }

    /// Residue codes in node-id order
    pub fn residue_codes(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.code.as_str())
    }

    /// Residues whose branches were told apart only by the order they were written in
    ///
    /// A residue appears here when any of its children, after the first, was bonded using an inferred linkage.
    #[must_use]
    pub fn ambiguous_branch_points(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .map(|n| n.id)
            .filter(|&id| {
                self.children(id)
                    .skip(1)
                    .any(|e| e.origin == LinkageOrigin::Inferred)
            })
            .collect()
    }
}

impl fmt::Display for BondEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}) -> ({}, {})",
            self.parent,
            self.parent_atom,
            self.child,
            self.child_atom()
        )
    }
}

impl fmt::Display for GlycanGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let residues = self
            .nodes
            .iter()
            .map(|n| format!("{}:{}", n.id, n.code))
            .join(" ");
        writeln!(f, "residues: {residues}")?;
        for edge in &self.edges {
            let origin = match edge.origin {
                LinkageOrigin::Explicit => "",
                LinkageOrigin::Inferred => " (inferred)",
            };
            writeln!(f, "{edge}{origin}")?;
        }
        Ok(())
    }
}

// Module Tests ========================================================================================================
