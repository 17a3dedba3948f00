//! Every format writes each glycosidic bond, and the anchor if there is one, exactly once

use dialects::{Dialect, Document, ProtenixMode};
use glycan::{anchor, Anchor, AttachmentSite, GlycanGraph, LinkageTable};
use once_cell::sync::Lazy;

static LINKAGES: Lazy<LinkageTable> = Lazy::new(LinkageTable::default);

const GLYCANS: [&str; 4] = [
    "NAG",
    "NAG(NAG)",
    "NAG(NAG(MAN(MAN(MAN))))",
    "NAG(NAG(MAN(MAN(MAN))(MAN(MAN))(MAN)))",
];

const DIALECTS: [Dialect; 5] = [
    Dialect::AlphaFold3,
    Dialect::Boltz,
    Dialect::Chai,
    Dialect::Protenix(ProtenixMode::Combined),
    Dialect::Protenix(ProtenixMode::Split),
];

/// Counts (glycosidic bonds, anchor bonds) in a rendered document
fn count_bonds(document: &Document, anchor: Option<&Anchor>) -> (usize, usize) {
    let anchor_atom = anchor.map(|a| a.site.atom.as_str());
    let split = |anchors: usize, total: usize| (total - anchors, anchors);
    match document {
        Document::AlphaFold3(input) => {
            let anchors = input
                .bonded_atom_pairs
                .iter()
                .filter(|[protein, _]| Some(protein.2.as_str()) == anchor_atom)
                .count();
            split(anchors, input.bonded_atom_pairs.len())
        }
        Document::Boltz(input) => {
            let anchors = input
                .constraints
                .iter()
                .filter(|c| Some(c.bond.atom1.2.as_str()) == anchor_atom)
                .count();
            split(anchors, input.constraints.len())
        }
        Document::Chai(input) => (
            input.grammar.matches("-1 ").count(),
            usize::from(input.restraint.is_some()),
        ),
        Document::Protenix(job) => {
            let anchors = job
                .covalent_bonds
                .iter()
                .filter(|b| Some(b.atom1.as_str()) == anchor_atom)
                .count();
            split(anchors, job.covalent_bonds.len())
        }
    }
}

#[test]
fn bonds_appear_once() {
    let site: AttachmentSite = "A:N5".parse().unwrap();
    for glycan in GLYCANS {
        let graph = GlycanGraph::new(&*LINKAGES, glycan).unwrap();
        let edges = graph.edges().len();
        for dialect in DIALECTS {
            let unanchored = dialect.render(&graph, None).unwrap();
            assert_eq!(count_bonds(&unanchored, None), (edges, 0), "{dialect} {glycan}");

            let anchor = anchor::resolve(&graph, Some(&site));
            let anchored = dialect.render(&graph, anchor.as_ref()).unwrap();
            assert_eq!(
                count_bonds(&anchored, anchor.as_ref()),
                (edges, 1),
                "{dialect} {glycan}"
            );
        }
    }
}

#[test]
fn files_are_written_for_every_format() {
    let graph = GlycanGraph::new(&*LINKAGES, "NAG(NAG(MAN))").unwrap();
    let site: AttachmentSite = "A:S12".parse().unwrap();
    let anchor = anchor::resolve(&graph, Some(&site));
    for dialect in DIALECTS {
        let files = dialect.render(&graph, anchor.as_ref()).unwrap().files().unwrap();
        assert!(!files.is_empty(), "{dialect}");
        let text: String = files.iter().map(|f| f.contents.as_str()).collect();
        assert!(text.contains("OG"), "{dialect}: {text}");
    }
}
