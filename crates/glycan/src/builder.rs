use miette::SourceSpan;
use tracing::{debug, warn};

use crate::{
    errors::UnresolvedLinkageError,
    parser::GlycanTree,
    BondEdge, BranchRole, GlycanGraph, LinkageOrigin, LinkageTable, NodeId, ResidueNode,
};

type BuilderResult<T> = Result<T, UnresolvedLinkageError>;

/// Numbers the residues of a [`GlycanTree`] in pre-order and bonds each one to its parent
pub(crate) struct GraphBuilder<'t, 's> {
    linkages: &'t LinkageTable,
    glycan: &'s str,
    nodes: Vec<ResidueNode>,
    edges: Vec<BondEdge>,
}

impl<'t, 's> GraphBuilder<'t, 's> {
    pub(crate) fn new(linkages: &'t LinkageTable, glycan: &'s str) -> Self {
        Self {
            linkages,
            glycan,
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub(crate) fn build(mut self, tree: &GlycanTree<'s>) -> BuilderResult<GlycanGraph> {
        self.add(tree, None)?;
        debug!(
            residues = self.nodes.len(),
            bonds = self.edges.len(),
            "built glycan graph"
        );
        Ok(GlycanGraph {
            nodes: self.nodes,
            edges: self.edges,
        })
    }

    fn add(&mut self, tree: &GlycanTree<'s>, parent: Option<(NodeId, BranchRole)>) -> BuilderResult<()> {
        let id = NodeId(self.nodes.len() + 1);
        if let Some((parent, role)) = parent {
            let edge = self.bond(parent, role, id, tree)?;
            self.edges.push(edge);
        }
        self.nodes.push(ResidueNode {
            id,
            code: tree.residue.to_owned(),
            parent: parent.map(|(p, _)| p),
        });

        for (index, branch) in tree.branches.iter().enumerate() {
            self.add(branch, Some((id, BranchRole::nth(index))))?;
        }
        Ok(())
    }

    fn bond(
        &self,
        parent: NodeId,
        role: BranchRole,
        child: NodeId,
        tree: &GlycanTree<'s>,
    ) -> BuilderResult<BondEdge> {
        let parent_code = &self.nodes[parent.0 - 1].code;
        let edge = |parent_atom, origin| BondEdge {
            parent,
            parent_atom,
            child,
            origin,
        };

        if let Some(linkage) = tree.linkage {
            return Ok(edge(linkage.parent_atom, LinkageOrigin::Explicit));
        }

        let parent_atom = self
            .linkages
            .lookup(parent_code, tree.residue, role)
            .ok_or_else(|| UnresolvedLinkageError {
                glycan: self.glycan.to_owned(),
                span: self.span_of(tree.residue),
                parent,
                parent_code: parent_code.clone(),
                child,
                child_code: tree.residue.to_owned(),
                role,
            })?;

        if let BranchRole::Branch(_) = role {
            warn!(
                "inferred {parent_atom} for the {role} of {parent_code} (residue {parent}) from sibling order alone, \
                write out its linkage, like ({}-1 {}), to be certain",
                parent_atom.position(),
                tree.residue
            );
        }
        Ok(edge(parent_atom, LinkageOrigin::Inferred))
    }

    // Residue codes in a `GlycanTree` are always slices of the original glycan string
    fn span_of(&self, residue: &str) -> SourceSpan {
        let start = residue.as_ptr() as usize - self.glycan.as_ptr() as usize;
        SourceSpan::from(start..start + residue.len())
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use miette::Diagnostic;
    use once_cell::sync::Lazy;

    use super::*;
    use crate::{parser, testing_tools::labels, ParentAtom};

    static LINKAGES: Lazy<LinkageTable> = Lazy::new(LinkageTable::default);

    static ANYTHING_GOES: Lazy<LinkageTable> = Lazy::new(|| {
        let kdl = indoc! {r#"
            rules {
                trunk from="*" to="*" at="O4"
                branch 1 from="*" to="*" at="O6"
            }
        "#};
        LinkageTable::new("anything_goes.kdl", kdl).unwrap()
    });

    fn build_with(linkages: &LinkageTable, glycan: &str) -> BuilderResult<GlycanGraph> {
        let tree = parser::parse(glycan).unwrap();
        GraphBuilder::new(linkages, glycan).build(&tree)
    }

    fn build(glycan: &str) -> BuilderResult<GlycanGraph> {
        build_with(&LINKAGES, glycan)
    }

    #[test]
    fn ids_follow_pre_order() {
        let graph = build_with(&ANYTHING_GOES, "A(B(C)(D))(E(F))").unwrap();
        let codes: Vec<_> = graph.nodes().iter().map(|n| (n.id.get(), n.code.as_str())).collect();
        assert_eq!(
            codes,
            vec![(1, "A"), (2, "B"), (3, "C"), (4, "D"), (5, "E"), (6, "F")]
        );
        let bonds: Vec<_> = graph.edges().iter().map(ToString::to_string).collect();
        assert_eq!(
            bonds,
            vec![
                "(1, O4) -> (2, C1)",
                "(2, O4) -> (3, C1)",
                "(2, O6) -> (4, C1)",
                "(1, O6) -> (5, C1)",
                "(5, O4) -> (6, C1)",
            ]
        );
    }

    #[test]
    fn unresolved_linkage() {
        let error = build("NAG(NAG(MAN(MAN)(MAN)(MAN)(MAN)))").unwrap_err();
        assert_eq!(error.parent, NodeId(3));
        assert_eq!(error.child, NodeId(7));
        assert_eq!(error.parent_code, "MAN");
        assert_eq!(error.child_code, "MAN");
        assert_eq!(error.role, BranchRole::Branch(3));
        assert_eq!(
            error.to_string(),
            "couldn't infer the linkage of MAN (residue 7) to MAN (residue 3) as its branch 3"
        );
        assert_eq!(labels(&error), vec![("no branch 3 rule from MAN".to_owned(), 27..30)]);
        assert!(error.help().is_some());
    }

    #[test]
    fn unknown_residues_need_explicit_linkages() {
        let error = build("NAG(NAG(FUC))").unwrap_err();
        assert_eq!((error.parent, error.child), (NodeId(2), NodeId(3)));
        assert_eq!(error.role, BranchRole::Trunk);
        assert_eq!(labels(&error)[0].1, 8..11);

        let graph = build("NAG(NAG(3-1 FUC))").unwrap();
        let edge = graph.parent_edge(NodeId(3)).unwrap();
        assert_eq!(edge.parent_atom, ParentAtom::O3);
        assert_eq!(edge.origin, LinkageOrigin::Explicit);
    }
}
