//! Chai-1 FASTA: glycans are written inline in bracket notation, with every linkage spelled out
//!
//! Chai can't express the protein anchor inline, so it's written separately as a single row of a restraints CSV.

use glycan::{Anchor, GlycanGraph, NodeId};
use itertools::Itertools;

use crate::{bonds, chain_ids::glycan_chain, Bond};

const RESTRAINT_HEADER: [&str; 10] = [
    "chainA",
    "res_idxA",
    "chainB",
    "res_idxB",
    "connection_type",
    "confidence",
    "min_distance_angstrom",
    "max_distance_angstrom",
    "comment",
    "restraint_id",
];

#[derive(Clone, Eq, PartialEq, Debug)]
pub struct ChaiInput {
    pub chain: String,
    pub grammar: String,
    pub restraint: Option<Restraint>,
}

/// A covalent bond between a protein atom and the root of the glycan
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Restraint {
    pub chain_a: String,
    pub residue_a: String,
    pub chain_b: String,
    pub residue_b: String,
}

impl ChaiInput {
    #[must_use]
    pub fn fasta(&self) -> String {
        format!(">glycan|{}\n{}\n", self.chain, self.grammar)
    }

    /// The restraints file, if the glycan is anchored to anything
    #[must_use]
    pub fn restraints_csv(&self) -> Option<String> {
        self.restraint.as_ref().map(|restraint| {
            let row = [
                restraint.chain_a.as_str(),
                &restraint.residue_a,
                &restraint.chain_b,
                &restraint.residue_b,
                "covalent",
                "1.0",
                "0.0",
                "0.0",
                "protein-glycan",
                "bond1",
            ];
            format!("{}\n{}\n", RESTRAINT_HEADER.iter().join(","), row.iter().join(","))
        })
    }
}

pub fn render(graph: &GlycanGraph, anchor: Option<&Anchor>) -> ChaiInput {
    let chain = glycan_chain(anchor);
    let grammar = grammar(graph, graph.root().id);
    // Glycosidic bonds are all written into the grammar, which leaves only the anchor
    let restraint = bonds(graph, anchor).find_map(|bond| match bond {
        Bond::Glycosidic(_) => None,
        Bond::Anchor(anchor) => Some(Restraint {
            chain_a: anchor.site.chain.clone(),
            residue_a: format!("{}@{}", anchor.site.residue_tag(), anchor.site.atom),
            chain_b: chain.clone(),
            residue_b: format!("@{}", anchor.root_atom()),
        }),
    });
    ChaiInput {
        chain,
        grammar,
        restraint,
    }
}

fn grammar(graph: &GlycanGraph, id: NodeId) -> String {
    let code = graph.node(id).map_or("", |n| n.code.as_str());
    let branches = graph.children(id).map(|edge| {
        let child_position = edge.child_atom().trim_start_matches('C');
        format!(
            "({}-{child_position} {})",
            edge.parent_atom.position(),
            grammar(graph, edge.child)
        )
    });
    format!("{code}{}", branches.collect::<String>())
}
