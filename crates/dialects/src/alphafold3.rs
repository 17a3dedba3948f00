//! AlphaFold 3 local-model JSON: the whole glycan is one multi-residue ligand, bonded through `bondedAtomPairs`

use glycan::{Anchor, GlycanGraph};
use serde::Serialize;

use crate::{bonds, chain_ids::glycan_chain, Bond};

const DIALECT: &str = "alphafold3";
const VERSION: u32 = 4;

#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlphaFold3Input {
    pub dialect: &'static str,
    pub version: u32,
    pub sequences: Vec<Sequence>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub bonded_atom_pairs: Vec<[AtomRef; 2]>,
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Sequence {
    Ligand(Ligand),
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ligand {
    pub id: String,
    pub ccd_codes: Vec<String>,
}

/// An atom addressed as `[entity, position, atom]`, with positions counting from 1
#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
pub struct AtomRef(pub String, pub usize, pub String);

pub fn render(graph: &GlycanGraph, anchor: Option<&Anchor>) -> AlphaFold3Input {
    let chain = glycan_chain(anchor);
    let ligand = Ligand {
        id: chain.clone(),
        ccd_codes: graph.residue_codes().map(str::to_owned).collect(),
    };

    let glycan_atom = |position, atom: &str| AtomRef(chain.clone(), position, atom.to_owned());
    let bonded_atom_pairs = bonds(graph, anchor)
        .map(|bond| match bond {
            Bond::Glycosidic(edge) => [
                glycan_atom(edge.parent.get(), &edge.parent_atom.to_string()),
                glycan_atom(edge.child.get(), edge.child_atom()),
            ],
            Bond::Anchor(anchor) => [
                AtomRef(
                    anchor.site.chain.clone(),
                    anchor.site.residue_index,
                    anchor.site.atom.clone(),
                ),
                glycan_atom(anchor.root.get(), anchor.root_atom()),
            ],
        })
        .collect();

    AlphaFold3Input {
        dialect: DIALECT,
        version: VERSION,
        sequences: vec![Sequence::Ligand(ligand)],
        bonded_atom_pairs,
    }
}
