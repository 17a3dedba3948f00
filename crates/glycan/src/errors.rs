use std::fmt;

use miette::{Diagnostic, LabeledSpan, SourceSpan};
use nom::error::ErrorKind;
use nom_miette::{FromExternalError, LabeledError, LabeledErrorKind, LabeledParseError};
use thiserror::Error;

use crate::{BranchRole, NodeId};

pub type Result<T, E = GlycanError> = std::result::Result<T, E>;

/// A glycan string that isn't valid bracket notation
pub type MalformedTopologyError = LabeledError<GlycanErrorKind>;

#[derive(Debug, Diagnostic, Clone, Eq, PartialEq, Error)]
pub enum GlycanError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    MalformedTopology(#[from] MalformedTopologyError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    UnresolvedLinkage(#[from] UnresolvedLinkageError),
}

// Parser Errors =======================================================================================================

#[derive(Clone, Eq, PartialEq, Debug, Diagnostic, Error)]
pub enum GlycanErrorKind {
    #[error("expected a residue code, like NAG or MAN")]
    ExpectedResidue,

    #[diagnostic(help("you've probably forgotten to close an earlier '(' bracket"))]
    #[error("expected ')' to close a branch")]
    ExpectedBranchEnd,

    #[diagnostic(help(
        "linkages are written as the parent's ring position, a '-', then the child's, like 4-1"
    ))]
    #[error("expected a linkage, like 4-1")]
    ExpectedLinkage,

    #[error("expected a ring position, like the 4 in 4-1")]
    ExpectedPosition,

    #[error("expected a '-' between the parent and child positions of a linkage")]
    ExpectedLinkageDash,

    #[diagnostic(help(
        "glycosidic bonds are made to the hydroxyl on carbon 2, 3, 4 or 6 of the parent residue"
    ))]
    #[error("the parent position {0} doesn't carry a linkable hydroxyl")]
    InvalidParentPosition(u8),

    #[diagnostic(help("children are always bonded through their anomeric carbon, so write this as p-1"))]
    #[error("the child position {0} isn't the anomeric carbon")]
    InvalidChildPosition(u8),

    #[diagnostic(help("branches can be nested at most {0} levels deep"))]
    #[error("this glycan is nested too deeply to be parsed")]
    TooDeep(usize),

    #[diagnostic(help(
        "this is an internal error that you shouldn't ever see! If you have gotten this error, \
        then please report it as a bug!"
    ))]
    #[error("internal `nom` error: {0:?}")]
    NomError(ErrorKind),

    #[diagnostic(help(
        "check the unparsed region for errors, like an unmatched ')', or remove it from the glycan"
    ))]
    #[error("could not interpret the full input as a valid glycan")]
    Incomplete,
}

impl LabeledErrorKind for GlycanErrorKind {
    fn label(&self) -> Option<&'static str> {
        Some(match self {
            Self::ExpectedResidue => "expected residue",
            Self::ExpectedBranchEnd => "expected ')'",
            Self::ExpectedPosition => "expected position",
            Self::ExpectedLinkageDash => "expected '-'",
            Self::InvalidParentPosition(_) => "expected 2, 3, 4 or 6",
            Self::InvalidChildPosition(_) => "expected 1",
            Self::TooDeep(_) => "branch nested too deeply",
            Self::Incomplete => "input was valid up until this point",
            Self::NomError(_) => "the region that triggered this bug!",
            Self::ExpectedLinkage => return None,
        })
    }
}

impl<'a> FromExternalError<'a, GlycanErrorKind> for GlycanErrorKind {
    const FATAL: bool = true;

    fn from_external_error(input: &'a str, e: GlycanErrorKind) -> LabeledParseError<'a, Self> {
        LabeledParseError::new(input, e)
    }
}

impl From<ErrorKind> for GlycanErrorKind {
    fn from(value: ErrorKind) -> Self {
        match value {
            ErrorKind::Eof => Self::Incomplete,
            kind => Self::NomError(kind),
        }
    }
}

// Builder Errors ======================================================================================================

/// A bond with no explicit linkage and no matching rule in the linkage table
#[derive(Clone, Eq, PartialEq, Debug, Error)]
#[error(
    "couldn't infer the linkage of {child_code} (residue {child}) to {parent_code} (residue {parent}) as its {role}"
)]
pub struct UnresolvedLinkageError {
    pub(crate) glycan: String,
    pub(crate) span: SourceSpan,
    pub parent: NodeId,
    pub parent_code: String,
    pub child: NodeId,
    pub child_code: String,
    pub role: BranchRole,
}

// NOTE: This is manually implemented so that the help message can suggest a linkage for this particular bond
impl Diagnostic for UnresolvedLinkageError {
    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&self.glycan)
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(format!(
            "write the linkage out, like {}(4-1 {}), or add a {} rule for this pair to the linkage table",
            self.parent_code, self.child_code, self.role
        )))
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let label = format!("no {} rule from {}", self.role, self.parent_code);
        Some(Box::new(std::iter::once(LabeledSpan::new_with_span(
            Some(label),
            self.span,
        ))))
    }
}
