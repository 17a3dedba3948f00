//! Covalent attachment of a glycan to a residue of some other polymer chain, usually a glycosylated protein

use std::{fmt, str::FromStr};

use miette::Diagnostic;
use thiserror::Error;
use tracing::debug;

use crate::{GlycanGraph, NodeId, CHILD_ATOM};

/// A protein atom that a glycan's root residue is bonded to
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct AttachmentSite {
    pub chain: String,
    /// 1-based
    pub residue_index: usize,
    pub atom: String,
    /// The one-letter code of the attached residue, when known
    pub residue: Option<char>,
}

/// The bond between an [`AttachmentSite`] and the `C1` of a glycan's root residue
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Anchor {
    pub site: AttachmentSite,
    pub root: NodeId,
}

impl Anchor {
    #[must_use]
    pub const fn root_atom(&self) -> &'static str {
        CHILD_ATOM
    }
}

/// Binds `site`, if there is one, to the root of `graph`
#[must_use]
pub fn resolve(graph: &GlycanGraph, site: Option<&AttachmentSite>) -> Option<Anchor> {
    let site = site?;
    let root = graph.root().id;
    debug!(%site, %root, "anchoring glycan");
    Some(Anchor {
        site: site.clone(),
        root,
    })
}

/// The side-chain atom glycans attach to on the given amino acid: N-linked to asparagine, O-linked to serine and
/// threonine
#[must_use]
pub fn glycosylation_atom(residue: char) -> Option<&'static str> {
    match residue.to_ascii_uppercase() {
        'N' => Some("ND2"),
        'S' => Some("OG"),
        'T' => Some("OG1"),
        _ => None,
    }
}

impl AttachmentSite {
    pub fn new(chain: impl Into<String>, residue_index: usize, atom: impl Into<String>) -> Self {
        Self {
            chain: chain.into(),
            residue_index,
            atom: atom.into(),
            residue: None,
        }
    }

    /// The site at the 1-based `position` of a protein `sequence`, bonding through its usual glycosylation atom
    ///
    /// # Errors
    ///
    /// Fails if `position` is outside of `sequence`, or the residue there isn't one that glycans attach to.
    pub fn from_sequence(
        chain: impl Into<String>,
        sequence: &str,
        position: usize,
    ) -> Result<Self, AttachmentSiteError> {
        let residue = position
            .checked_sub(1)
            .and_then(|i| sequence.chars().nth(i))
            .ok_or(AttachmentSiteError::OutOfRange {
                position,
                length: sequence.chars().count(),
            })?;
        Self::with_residue(chain.into(), residue, position, None)
    }

    fn with_residue(
        chain: String,
        residue: char,
        residue_index: usize,
        atom: Option<&str>,
    ) -> Result<Self, AttachmentSiteError> {
        let residue = residue.to_ascii_uppercase();
        let atom = match atom {
            Some(atom) => atom.to_owned(),
            None => glycosylation_atom(residue)
                .ok_or(AttachmentSiteError::NoGlycosylationAtom {
                    residue,
                    residue_index,
                })?
                .to_owned(),
        };
        Ok(Self {
            chain,
            residue_index,
            atom,
            residue: Some(residue),
        })
    }

    /// The residue as written in restraint files, like `N5`, or just `5` when the residue type is unknown
    #[must_use]
    pub fn residue_tag(&self) -> String {
        self.residue
            .map_or_else(|| self.residue_index.to_string(), |r| format!("{r}{}", self.residue_index))
    }
}

impl fmt::Display for AttachmentSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.chain, self.residue_tag(), self.atom)
    }
}

impl FromStr for AttachmentSite {
    type Err = AttachmentSiteError;

    /// Reads sites like `A:N5:ND2`, `A:5:ND2`, or `A:N5`, where the atom is inferred from the residue
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || AttachmentSiteError::Malformed(s.to_owned());
        let mut parts = s.trim().split(':');
        let (Some(chain), Some(residue), atom, None) = (parts.next(), parts.next(), parts.next(), parts.next()) else {
            return Err(malformed());
        };

        let valid_chain = !chain.is_empty() && chain.chars().all(|c| c.is_ascii_alphanumeric());
        let valid_atom = atom.is_none_or(|a| !a.is_empty() && a.chars().all(|c| c.is_ascii_alphanumeric()));
        if !(valid_chain && valid_atom) {
            return Err(malformed());
        }

        let letter = residue.chars().next().filter(char::is_ascii_alphabetic);
        let digits = &residue[letter.map_or(0, char::len_utf8)..];
        let residue_index: usize = digits.parse().ok().filter(|&i| i > 0).ok_or_else(malformed)?;

        match (letter, atom) {
            (Some(residue), atom) => Self::with_residue(chain.to_owned(), residue, residue_index, atom),
            (None, Some(atom)) => Ok(Self::new(chain, residue_index, atom)),
            (None, None) => Err(AttachmentSiteError::MissingAtom(s.to_owned())),
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Diagnostic, Error)]
pub enum AttachmentSiteError {
    #[error("{0:?} isn't a valid attachment site")]
    #[diagnostic(help("attachment sites are written as CHAIN:RESIDUE:ATOM, like A:N5:ND2 or A:5:ND2"))]
    Malformed(String),

    #[error("the attachment site {0:?} doesn't name an atom")]
    #[diagnostic(help(
        "either give the atom, like A:5:ND2, or the residue type so that the atom can be inferred, like A:N5"
    ))]
    MissingAtom(String),

    #[error("glycans don't usually attach to {residue} (residue {residue_index})")]
    #[diagnostic(help(
        "only N, S and T have a default glycosylation atom, so give the atom explicitly, like A:{residue}{residue_index}:ATOM"
    ))]
    NoGlycosylationAtom { residue: char, residue_index: usize },

    #[error("position {position} is outside of a sequence with {length} residues")]
    #[diagnostic(help("glycan positions count from 1"))]
    OutOfRange { position: usize, length: usize },
}
