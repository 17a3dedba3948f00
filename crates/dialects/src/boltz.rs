//! Boltz YAML: every residue is its own single-residue ligand, and bonds between them are `bond` constraints

use glycan::{Anchor, GlycanGraph, NodeId};
use serde::Serialize;

use crate::{bonds, chain_ids::glycan_chains, Bond};

const VERSION: u32 = 1;
// Single-residue ligands only ever have a residue 1
const LIGAND_RESIDUE: usize = 1;

#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
pub struct BoltzInput {
    pub version: u32,
    pub sequences: Vec<Sequence>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<Constraint>,
}

// NOTE: These wrappers are structs, not enums, since `serde_yaml` writes enum variants as YAML tags
#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
pub struct Sequence {
    pub ligand: Ligand,
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
pub struct Ligand {
    pub id: String,
    pub ccd: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
pub struct Constraint {
    pub bond: BondConstraint,
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
pub struct BondConstraint {
    pub atom1: AtomRef,
    pub atom2: AtomRef,
}

/// An atom addressed as `[chain, residue, atom]`
#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
pub struct AtomRef(pub String, pub usize, pub String);

pub fn render(graph: &GlycanGraph, anchor: Option<&Anchor>) -> BoltzInput {
    let chains = glycan_chains(graph.nodes().len(), anchor);
    let sequences = graph
        .nodes()
        .iter()
        .zip(&chains)
        .map(|(node, chain)| Sequence {
            ligand: Ligand {
                id: chain.clone(),
                ccd: node.code.clone(),
            },
        })
        .collect();

    // Node ids start from 1 and are contiguous, so they index straight into `chains`
    let residue_atom = |id: NodeId, atom: &str| {
        AtomRef(chains[id.get() - 1].clone(), LIGAND_RESIDUE, atom.to_owned())
    };
    let constraints = bonds(graph, anchor)
        .map(|bond| {
            let (atom1, atom2) = match bond {
                Bond::Glycosidic(edge) => (
                    residue_atom(edge.parent, &edge.parent_atom.to_string()),
                    residue_atom(edge.child, edge.child_atom()),
                ),
                Bond::Anchor(anchor) => (
                    AtomRef(
                        anchor.site.chain.clone(),
                        anchor.site.residue_index,
                        anchor.site.atom.clone(),
                    ),
                    residue_atom(anchor.root, anchor.root_atom()),
                ),
            };
            Constraint {
                bond: BondConstraint { atom1, atom2 },
            }
        })
        .collect();

    BoltzInput {
        version: VERSION,
        sequences,
        constraints,
    }
}

#[cfg(test)]
mod tests {
    use glycan::{anchor, LinkageTable};
    use once_cell::sync::Lazy;
    use serde_yaml::Value;

    use super::*;

    static LINKAGES: Lazy<LinkageTable> = Lazy::new(LinkageTable::default);

    fn yaml(glycan: &str, site: Option<&str>) -> Value {
        let graph = GlycanGraph::new(&LINKAGES, glycan).unwrap();
        let site = site.map(|s| s.parse().unwrap());
        let anchor = anchor::resolve(&graph, site.as_ref());
        let text = serde_yaml::to_string(&render(&graph, anchor.as_ref())).unwrap();
        serde_yaml::from_str(&text).unwrap()
    }

    fn atom(value: &Value) -> (String, u64, String) {
        (
            value[0].as_str().unwrap().to_owned(),
            value[1].as_u64().unwrap(),
            value[2].as_str().unwrap().to_owned(),
        )
    }

    #[test]
    fn one_ligand_per_residue() {
        let graph = GlycanGraph::new(&LINKAGES, "NAG(NAG(MAN))").unwrap();
        let input = render(&graph, None);
        let ligands: Vec<_> = input
            .sequences
            .iter()
            .map(|s| (s.ligand.id.as_str(), s.ligand.ccd.as_str()))
            .collect();
        assert_eq!(ligands, vec![("A", "NAG"), ("B", "NAG"), ("C", "MAN")]);
        assert_eq!(
            input.constraints[1],
            Constraint {
                bond: BondConstraint {
                    atom1: AtomRef("B".to_owned(), 1, "O4".to_owned()),
                    atom2: AtomRef("C".to_owned(), 1, "C1".to_owned()),
                }
            }
        );
    }

    #[test]
    fn anchored_glycan() {
        let document = yaml("NAG(NAG)", Some("A:N5"));
        assert_eq!(document["version"].as_u64(), Some(1));
        assert_eq!(document["sequences"][0]["ligand"]["id"].as_str(), Some("B"));
        assert_eq!(document["sequences"][1]["ligand"]["id"].as_str(), Some("C"));

        let bonds = document["constraints"].as_sequence().unwrap();
        assert_eq!(bonds.len(), 2);
        assert_eq!(
            atom(&bonds[0]["bond"]["atom1"]),
            ("B".to_owned(), 1, "O4".to_owned())
        );
        assert_eq!(
            atom(&bonds[1]["bond"]["atom1"]),
            ("A".to_owned(), 5, "ND2".to_owned())
        );
        assert_eq!(
            atom(&bonds[1]["bond"]["atom2"]),
            ("B".to_owned(), 1, "C1".to_owned())
        );
    }

    #[test]
    fn single_residue_has_no_constraints() {
        let document = yaml("MAN", None);
        assert_eq!(document["sequences"][0]["ligand"]["ccd"].as_str(), Some("MAN"));
        assert!(document.get("constraints").is_none());
    }

    #[test]
    fn many_residues_use_two_letter_chains() {
        let glycan = format!("NAG{}", "(4-1 MAN".repeat(27) + &")".repeat(27));
        let graph = GlycanGraph::new(&LINKAGES, glycan).unwrap();
        let input = render(&graph, None);
        assert_eq!(input.sequences.len(), 28);
        assert_eq!(input.sequences[26].ligand.id, "AA");
        assert_eq!(input.sequences[27].ligand.id, "AB");
    }
}
