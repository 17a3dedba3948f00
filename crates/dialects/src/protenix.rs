//! Protenix JSON: covalent bonds address atoms by 1-based entity, copy, and residue position
//!
//! In `combined` mode the glycan is a single multi-residue ligand like `CCD_NAG_NAG_MAN`; in `split` mode each
//! residue is its own ligand entity.

use std::{fmt, str::FromStr};

use glycan::{Anchor, GlycanGraph, NodeId};
use itertools::Itertools;
use serde::Serialize;

use crate::{bonds, chain_ids::spreadsheet_index, Bond, DialectError, Result};

const JOB_NAME: &str = "glycan";
const CCD_PREFIX: &str = "CCD";
// Every entity is written with one copy, so bonds always point at the first
const COPY: u32 = 1;

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum ProtenixMode {
    /// One multi-residue ligand, addressed by node id
    #[default]
    Combined,
    /// One single-residue ligand per node
    Split,
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
pub struct ProtenixJob {
    pub name: &'static str,
    pub sequences: Vec<Sequence>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub covalent_bonds: Vec<CovalentBond>,
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
pub struct Sequence {
    pub ligand: Ligand,
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
pub struct Ligand {
    pub ligand: String,
    pub count: u32,
}

// NOTE: Protenix expects entities and positions as strings, but copies as integers
#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
pub struct CovalentBond {
    pub entity1: String,
    pub copy1: u32,
    pub position1: String,
    pub atom1: String,
    pub entity2: String,
    pub copy2: u32,
    pub position2: String,
    pub atom2: String,
}

/// Renders `graph`, numbering its entities after those of the anchor's chain
///
/// # Errors
///
/// Fails if the anchor's chain is neither a spreadsheet-style label nor a number, so has no entity.
pub fn render(graph: &GlycanGraph, anchor: Option<&Anchor>, mode: ProtenixMode) -> Result<ProtenixJob> {
    // Entities up to and including the anchor's are left for the protein (and whatever precedes it)
    let reserved = anchor.map(|a| anchor_entity(&a.site.chain)).transpose()?.unwrap_or(0);

    let ligand = |codes: &[&str]| Sequence {
        ligand: Ligand {
            ligand: [CCD_PREFIX].iter().chain(codes).join("_"),
            count: 1,
        },
    };
    let codes: Vec<_> = graph.residue_codes().collect();
    let sequences = match mode {
        ProtenixMode::Combined => vec![ligand(&codes)],
        ProtenixMode::Split => codes.iter().map(|&code| ligand(&[code])).collect(),
    };

    let address = |id: NodeId| match mode {
        ProtenixMode::Combined => (reserved + 1, id.get()),
        ProtenixMode::Split => (reserved + id.get(), 1),
    };
    let covalent_bonds = bonds(graph, anchor)
        .map(|bond| {
            let ((entity1, position1), atom1, (entity2, position2), atom2) = match bond {
                Bond::Glycosidic(edge) => (
                    address(edge.parent),
                    edge.parent_atom.to_string(),
                    address(edge.child),
                    edge.child_atom(),
                ),
                Bond::Anchor(anchor) => (
                    (reserved, anchor.site.residue_index),
                    anchor.site.atom.clone(),
                    address(anchor.root),
                    anchor.root_atom(),
                ),
            };
            CovalentBond {
                entity1: entity1.to_string(),
                copy1: COPY,
                position1: position1.to_string(),
                atom1,
                entity2: entity2.to_string(),
                copy2: COPY,
                position2: position2.to_string(),
                atom2: atom2.to_owned(),
            }
        })
        .collect();

    Ok(ProtenixJob {
        name: JOB_NAME,
        sequences,
        covalent_bonds,
    })
}

// Chains are labeled `A`, `B`, ... in entity order, but a literal entity number is taken as-is
fn anchor_entity(chain: &str) -> Result<usize> {
    spreadsheet_index(chain)
        .or_else(|| chain.parse().ok().filter(|&entity| entity > 0))
        .ok_or_else(|| DialectError::UnaddressableChain {
            chain: chain.to_owned(),
        })
}

impl fmt::Display for ProtenixMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Combined => write!(f, "combined"),
            Self::Split => write!(f, "split"),
        }
    }
}

impl FromStr for ProtenixMode {
    type Err = DialectError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "combined" => Ok(Self::Combined),
            "split" => Ok(Self::Split),
            _ => Err(DialectError::UnsupportedMode { mode: s.to_owned() }),
        }
    }
}
