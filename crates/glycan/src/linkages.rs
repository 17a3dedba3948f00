//! Rules for filling in linkages that a glycan string leaves implicit
//!
//! Rules are written in KDL. Residue codes can be grouped into named classes, and each rule picks the parent atom for
//! bonds between a parent and child of the given codes or classes, depending on whether the child continues the trunk
//! (the first child written) or opens a numbered branch (every later child).

use std::{collections::hash_map::Entry, fmt};

use ahash::{HashMap, HashMapExt, HashSet};
use derive_more::Display;
use knuffel::{span::Span, Decode};
use miette::{Diagnostic, LabeledSpan, NamedSource, Result};
use thiserror::Error;

use crate::ParentAtom;

/// The built-in rules for the N-glycan core
pub const N_GLYCAN_CORE_KDL: &str = include_str!("../data/n_glycan_core.kdl");

const ANY_RESIDUE: &str = "*";

// Public API ==========================================================================================================

/// How a child sits relative to its siblings
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Display)]
pub enum BranchRole {
    /// The first child of a residue
    #[display("trunk")]
    Trunk,
    /// Any later child, numbered from 1 for the second child written
    #[display("branch {_0}")]
    Branch(usize),
}

impl BranchRole {
    /// The role of the child at `index` (counting from 0) among its siblings
    #[must_use]
    pub const fn nth(index: usize) -> Self {
        match index {
            0 => Self::Trunk,
            n => Self::Branch(n),
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub struct LinkageTable {
    rules: Vec<LinkageRule>,
}

impl LinkageTable {
    /// Reads a linkage table from KDL
    ///
    /// # Errors
    ///
    /// Returns a diagnostic pointing into `kdl_text` if it isn't valid KDL, doesn't match the expected schema, or
    /// contains rules that can't be interpreted.
    pub fn new(file_name: impl AsRef<str>, kdl_text: impl AsRef<str>) -> Result<Self> {
        let parsed: LinkageTableKdl = knuffel::parse(file_name.as_ref(), kdl_text.as_ref())?;
        parsed
            .validate(())
            .map_err(|e| e.finalize(file_name, kdl_text).into())
    }

    /// The parent atom for a `parent` to `child` bond in the given role, if any rule covers it
    ///
    /// Literal residue codes beat classes, which beat `*`, with the parent side compared first. Codes are matched
    /// case-insensitively.
    #[must_use]
    pub fn lookup(&self, parent: &str, child: &str, role: BranchRole) -> Option<ParentAtom> {
        let (parent, child) = (parent.to_ascii_uppercase(), child.to_ascii_uppercase());
        let mut best: Option<(_, ParentAtom)> = None;
        for rule in self.rules.iter().filter(|r| r.role == role) {
            if let (Some(p), Some(c)) = (rule.parent.rank(&parent), rule.child.rank(&child)) {
                // NOTE: Ties go to whichever rule was written first
                if best.is_none_or(|(rank, _)| (p, c) > rank) {
                    best = Some(((p, c), rule.atom));
                }
            }
        }
        best.map(|(_, atom)| atom)
    }
}

impl Default for LinkageTable {
    fn default() -> Self {
        // SAFETY: The built-in table is checked by `build_n_glycan_core` and `n_glycan_core_linkages` below
        Self::new("n_glycan_core.kdl", N_GLYCAN_CORE_KDL).unwrap()
    }
}

// Private Types =======================================================================================================

#[derive(Clone, Eq, PartialEq, Debug)]
struct LinkageRule {
    role: BranchRole,
    parent: ResidueMatcher,
    child: ResidueMatcher,
    atom: ParentAtom,
}

#[derive(Clone, Eq, PartialEq, Debug)]
enum ResidueMatcher {
    Any,
    Class(String, HashSet<String>),
    Code(String),
}

impl ResidueMatcher {
    // Higher ranks are more specific, `None` means no match at all
    fn rank(&self, code: &str) -> Option<u8> {
        match self {
            Self::Any => Some(0),
            Self::Class(_, codes) => codes.contains(code).then_some(1),
            Self::Code(c) => (c == code).then_some(2),
        }
    }
}

impl fmt::Display for ResidueMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "{ANY_RESIDUE}"),
            Self::Class(name, _) | Self::Code(name) => write!(f, "{name}"),
        }
    }
}

// KDL File Schema =====================================================================================================

#[derive(Debug, Decode)]
#[knuffel(span_type=Span)]
struct LinkageTableKdl {
    #[knuffel(child)]
    classes: Option<ClassesKdl>,
    #[knuffel(child)]
    rules: RulesKdl,
}

#[derive(Debug, Decode)]
#[knuffel(span_type=Span)]
struct ClassesKdl {
    #[knuffel(children)]
    classes: Vec<ClassKdl>,
}

#[derive(Debug, Decode)]
#[knuffel(span_type=Span)]
struct RulesKdl {
    #[knuffel(children)]
    rules: Vec<RuleKdl>,
}

#[derive(Debug, Decode)]
#[knuffel(span_type=Span)]
struct ClassKdl {
    #[knuffel(span)]
    span: Span,
    #[knuffel(node_name)]
    name: String,
    #[knuffel(arguments)]
    codes: Vec<String>,
}

#[derive(Debug, Decode)]
#[knuffel(span_type=Span)]
struct RuleKdl {
    #[knuffel(span)]
    span: Span,
    #[knuffel(node_name)]
    role: String,
    #[knuffel(argument)]
    ordinal: Option<u32>,
    #[knuffel(property)]
    from: String,
    #[knuffel(property)]
    to: String,
    #[knuffel(property)]
    at: String,
}

// Contextual Validation Trait  ========================================================================================

type TableResult<T> = std::result::Result<T, LinkageTableErrorKind>;

trait ValidateInto<'c, T> {
    type Context: 'c;

    fn validate(self, ctx: Self::Context) -> TableResult<T>;
}

// Linkage Table Validation ============================================================================================

impl ValidateInto<'_, LinkageTable> for LinkageTableKdl {
    type Context = ();

    fn validate(self, _ctx: Self::Context) -> TableResult<LinkageTable> {
        let classes = self
            .classes
            .map_or_else(|| Ok(HashMap::new()), |c| c.classes.validate(()))?;
        let rules = self.rules.rules.validate(&classes)?;
        Ok(LinkageTable { rules })
    }
}

// ---------------------------------------------------------------------------------------------------------------------

type Classes = HashMap<String, HashSet<String>>;

impl ValidateInto<'_, Classes> for Vec<ClassKdl> {
    type Context = ();

    fn validate(self, _ctx: Self::Context) -> TableResult<Classes> {
        let mut seen_classes = HashMap::new();

        for class in self {
            if class.codes.is_empty() {
                return Err(LinkageTableErrorKind::EmptyClass(class.span, class.name));
            }
            let codes: HashSet<_> = class.codes.iter().map(|c| c.to_ascii_uppercase()).collect();
            match seen_classes.entry(class.name) {
                Entry::Occupied(e) => {
                    let (class_name, (first_defined_at, _)) = e.remove_entry();
                    return Err(LinkageTableErrorKind::DuplicateClass(
                        first_defined_at,
                        class.span,
                        class_name,
                    ));
                }
                Entry::Vacant(e) => e.insert((class.span, codes)),
            };
        }

        Ok(seen_classes.into_iter().map(|(k, (_, v))| (k, v)).collect())
    }
}

// ---------------------------------------------------------------------------------------------------------------------

impl<'c> ValidateInto<'c, Vec<LinkageRule>> for Vec<RuleKdl> {
    type Context = &'c Classes;

    fn validate(self, ctx: Self::Context) -> TableResult<Vec<LinkageRule>> {
        let mut seen_rules: HashMap<_, Span> = HashMap::new();
        let mut rules = Vec::with_capacity(self.len());

        for rule_kdl in self {
            let span = rule_kdl.span.clone();
            let rule = rule_kdl.validate(ctx)?;
            let key = (rule.role, rule.parent.to_string(), rule.child.to_string());
            if let Some(first_defined_at) = seen_rules.get(&key).cloned() {
                return Err(LinkageTableErrorKind::DuplicateRule(
                    first_defined_at,
                    span,
                    key.0,
                    key.1,
                    key.2,
                ));
            }
            seen_rules.insert(key, span);
            rules.push(rule);
        }

        Ok(rules)
    }
}

impl<'c> ValidateInto<'c, LinkageRule> for RuleKdl {
    type Context = &'c Classes;

    fn validate(self, ctx: Self::Context) -> TableResult<LinkageRule> {
        let role = match (self.role.as_str(), self.ordinal) {
            ("trunk", None) => BranchRole::Trunk,
            ("branch", Some(n)) if n > 0 => BranchRole::Branch(n as usize),
            ("branch", _) => return Err(LinkageTableErrorKind::MissingOrdinal(self.span)),
            ("trunk", Some(n)) => return Err(LinkageTableErrorKind::UnexpectedOrdinal(self.span, n)),
            _ => return Err(LinkageTableErrorKind::UnknownRole(self.span, self.role)),
        };
        let atom = self
            .at
            .parse()
            .map_err(|_| LinkageTableErrorKind::InvalidAtom(self.span, self.at))?;

        Ok(LinkageRule {
            role,
            parent: matcher(ctx, self.from),
            child: matcher(ctx, self.to),
            atom,
        })
    }
}

fn matcher(classes: &Classes, name: String) -> ResidueMatcher {
    if name == ANY_RESIDUE {
        ResidueMatcher::Any
    } else if let Some(codes) = classes.get(&name) {
        ResidueMatcher::Class(name, codes.clone())
    } else {
        ResidueMatcher::Code(name.to_ascii_uppercase())
    }
}

// Validation Error Types and Trait Implementations  ===================================================================

#[derive(Debug, Error)]
#[error("failed to validate linkage table file")]
struct LinkageTableError {
    kdl: NamedSource,
    #[source]
    kind: LinkageTableErrorKind,
}

// NOTE: This is manually implemented because the list of labels is dynamic and needs to be extracted from `self.kind`
impl Diagnostic for LinkageTableError {
    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&self.kdl)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        Some(Box::new(self.kind.labels().into_iter().map(|(s, l)| {
            LabeledSpan::new_with_span(Some(l.to_owned()), s.clone())
        })))
    }

    fn diagnostic_source(&self) -> Option<&dyn Diagnostic> {
        Some(&self.kind)
    }
}

#[derive(Clone, Debug, Diagnostic, Error)]
enum LinkageTableErrorKind {
    #[error("the residue class {2:?} has already been defined")]
    #[diagnostic(help("merge the two classes, or give one of them a new name"))]
    DuplicateClass(Span, Span, String),

    #[error("the residue class {1:?} doesn't contain any residues")]
    #[diagnostic(help("list residue codes after the class name, like: {1} \"MAN\" \"BMA\""))]
    EmptyClass(Span, String),

    #[error("{0:?} isn't a rule type")]
    #[diagnostic(help("rules must be either `trunk` or `branch N`, where N counts from 1"))]
    UnknownRole(Span, String),

    #[error("branch rules need an ordinal greater than 0")]
    #[diagnostic(help("the second child of a residue is `branch 1`, the third is `branch 2`, and so on"))]
    MissingOrdinal(Span),

    #[error("trunk rules don't take an ordinal, but {1} was given")]
    #[diagnostic(help("only the first child of a residue continues the trunk, so remove the {1}"))]
    UnexpectedOrdinal(Span, u32),

    #[error("{1:?} isn't a linkable parent atom")]
    #[diagnostic(help("the parent atom must be one of O2, O3, O4, or O6"))]
    InvalidAtom(Span, String),

    #[error("a {2} rule from {3} to {4} has already been defined")]
    #[diagnostic(help("remove one of the duplicate rules"))]
    DuplicateRule(Span, Span, BranchRole, String, String),
}

impl LinkageTableErrorKind {
    fn labels(&self) -> Vec<(&Span, &'static str)> {
        match self {
            Self::DuplicateClass(s1, s2, _) | Self::DuplicateRule(s1, s2, ..) => {
                vec![(s1, "first defined here"), (s2, "then again here")]
            }
            Self::EmptyClass(s, _) => vec![(s, "empty class")],
            Self::UnknownRole(s, _) => vec![(s, "unknown rule type")],
            Self::MissingOrdinal(s) => vec![(s, "expected an ordinal")],
            Self::UnexpectedOrdinal(s, _) => vec![(s, "unexpected ordinal")],
            Self::InvalidAtom(s, _) => vec![(s, "invalid parent atom")],
        }
    }

    fn finalize(self, file_name: impl AsRef<str>, kdl: impl AsRef<str>) -> LinkageTableError {
        let kdl = NamedSource::new(file_name, kdl.as_ref().to_owned());
        LinkageTableError { kdl, kind: self }
    }
}

// Module Tests ========================================================================================================

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use once_cell::sync::Lazy;

    use super::*;
    use crate::testing_tools::labels;

    static CORE: Lazy<LinkageTable> = Lazy::new(LinkageTable::default);

    fn parse_table(kdl: &str) -> std::result::Result<LinkageTable, LinkageTableError> {
        let table: LinkageTableKdl = knuffel::parse("test", kdl).unwrap();
        table.validate(()).map_err(|e| e.finalize("test", kdl))
    }

    #[test]
    fn build_n_glycan_core() {
        use BranchRole::*;
        use ParentAtom::*;
        let table = LinkageTable::new("n_glycan_core.kdl", N_GLYCAN_CORE_KDL).unwrap();
        let rules: Vec<_> = table.rules.iter().map(|r| (r.role, r.atom)).collect();
        assert_eq!(
            rules,
            vec![(Trunk, O4), (Trunk, O4), (Trunk, O2), (Branch(1), O3), (Branch(2), O6)]
        );
    }

    #[test]
    fn n_glycan_core_linkages() {
        use BranchRole::*;
        use ParentAtom::*;
        let cases = [
            ("NAG", "NAG", Trunk, Some(O4)),
            ("NAG", "MAN", Trunk, Some(O4)),
            ("NAG", "BMA", Trunk, Some(O4)),
            ("MAN", "MAN", Trunk, Some(O2)),
            ("BMA", "MAN", Trunk, Some(O2)),
            ("BMA", "MAN", Branch(1), Some(O3)),
            ("MAN", "BMA", Branch(2), Some(O6)),
            ("man", "Man", Branch(1), Some(O3)),
            ("MAN", "MAN", Branch(3), None),
            ("MAN", "NAG", Trunk, None),
            ("NAG", "NAG", Branch(1), None),
            ("GAL", "NAG", Trunk, None),
        ];
        for (parent, child, role, atom) in cases {
            assert_eq!(CORE.lookup(parent, child, role), atom, "{parent} -> {child} as {role}");
        }
    }

    #[test]
    fn branch_roles() {
        assert_eq!(BranchRole::nth(0), BranchRole::Trunk);
        assert_eq!(BranchRole::nth(2), BranchRole::Branch(2));
        assert_eq!(BranchRole::Trunk.to_string(), "trunk");
        assert_eq!(BranchRole::Branch(1).to_string(), "branch 1");
    }

    #[test]
    fn specific_rules_win() {
        let kdl = indoc! {r#"
            classes {
                hexose "MAN" "GAL" "GLC"
            }
            rules {
                trunk from="*" to="*" at="O4"
                trunk from="hexose" to="*" at="O3"
                trunk from="GAL" to="*" at="O6"
                trunk from="GAL" to="hexose" at="O2"
            }
        "#};
        let table = parse_table(kdl).unwrap();
        let trunk = |p, c| table.lookup(p, c, BranchRole::Trunk);
        assert_eq!(trunk("NAG", "FUC"), Some(ParentAtom::O4));
        assert_eq!(trunk("MAN", "FUC"), Some(ParentAtom::O3));
        assert_eq!(trunk("GAL", "FUC"), Some(ParentAtom::O6));
        assert_eq!(trunk("gal", "glc"), Some(ParentAtom::O2));
        assert_eq!(table.lookup("GAL", "GLC", BranchRole::Branch(1)), None);
    }

    #[test]
    fn classes_are_optional() {
        let kdl = indoc! {r#"
            rules {
                branch 1 from="nag" to="FUC" at="O6"
            }
        "#};
        let table = parse_table(kdl).unwrap();
        assert_eq!(table.lookup("NAG", "FUC", BranchRole::Branch(1)), Some(ParentAtom::O6));
    }

    #[test]
    fn duplicate_rules() {
        let kdl = indoc! {r#"
            classes {
                mannose "MAN" "BMA"
            }
            rules {
                trunk from="mannose" to="mannose" at="O2"
                trunk from="mannose" to="mannose" at="O3"
            }
        "#};
        let error = parse_table(kdl).unwrap_err();
        assert!(matches!(error.kind, LinkageTableErrorKind::DuplicateRule(..)));
        let labels: Vec<_> = labels(&error).into_iter().map(|(l, _)| l).collect();
        assert_eq!(labels, vec!["first defined here", "then again here"]);
    }

    #[test]
    fn duplicate_classes() {
        let kdl = indoc! {r#"
            classes {
                mannose "MAN"
                mannose "BMA"
            }
            rules {
            }
        "#};
        let error = parse_table(kdl).unwrap_err();
        assert_eq!(
            error.kind.to_string(),
            r#"the residue class "mannose" has already been defined"#
        );
    }

    #[test]
    fn invalid_rules() {
        let cases = [
            (r#"trunk from="NAG" to="NAG" at="O5""#, "invalid parent atom"),
            (r#"trunk from="NAG" to="NAG" at="C1""#, "invalid parent atom"),
            (r#"branch from="MAN" to="MAN" at="O3""#, "expected an ordinal"),
            (r#"branch 0 from="MAN" to="MAN" at="O3""#, "expected an ordinal"),
            (r#"trunk 1 from="MAN" to="MAN" at="O3""#, "unexpected ordinal"),
            (r#"twig from="MAN" to="MAN" at="O3""#, "unknown rule type"),
        ];
        for (rule, label) in cases {
            let kdl = format!("rules {{\n    {rule}\n}}\n");
            let error = parse_table(&kdl).unwrap_err();
            let found = labels(&error);
            assert_eq!(found.len(), 1, "{rule}");
            assert_eq!(found[0].0, label, "{rule}");
            // The label covers the offending rule
            assert!(kdl[found[0].1.clone()].contains(rule), "{rule}");
        }
    }

    #[test]
    fn empty_class() {
        let kdl = "classes {\n    mannose\n}\nrules {\n}\n";
        let error = parse_table(kdl).unwrap_err();
        assert_eq!(labels(&error)[0].0, "empty class");
        assert!(error.kind.help().is_some());
    }

    #[test]
    fn schema_errors_are_reported() {
        assert!(LinkageTable::new("test", "rules { trunk from=\"NAG\" }").is_err());
        assert!(LinkageTable::new("test", "classes { }").is_err());
    }
}
