//! Renders a [`GlycanGraph`] as the input format of a structure-prediction model
//!
//! Every format addresses the same bonds differently: AlphaFold 3 lists atom pairs within one multi-residue ligand,
//! Boltz bonds single-residue ligands together, Chai writes the linkages inline, and Protenix indexes atoms by entity
//! and position. Whatever the format, every glycosidic bond and the optional protein anchor appear exactly once.

pub mod alphafold3;
pub mod alphafold_server;
pub mod boltz;
pub mod chai;
pub mod chain_ids;
pub mod errors;
pub mod protenix;

use std::{fmt, str::FromStr};

use glycan::{Anchor, BondEdge, GlycanGraph};
use tracing::debug;

pub use chain_ids::spreadsheet_ids;
pub use errors::{DialectError, Result};
pub use protenix::ProtenixMode;

// Public API ==========================================================================================================

/// The formats a glycan can be rendered into
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Dialect {
    AlphaFold3,
    Boltz,
    Chai,
    Protenix(ProtenixMode),
}

impl Dialect {
    pub const ALL: [Self; 4] = [
        Self::AlphaFold3,
        Self::Boltz,
        Self::Chai,
        Self::Protenix(ProtenixMode::Combined),
    ];

    /// Renders `graph`, plus a bond to `anchor` if there is one
    ///
    /// # Errors
    ///
    /// Fails if a residue code isn't a valid CCD code, or if the format can't address the anchor's chain.
    pub fn render(self, graph: &GlycanGraph, anchor: Option<&Anchor>) -> Result<Document> {
        check_residue_codes(graph)?;
        debug!(dialect = %self, residues = graph.nodes().len(), "rendering glycan");
        Ok(match self {
            Self::AlphaFold3 => Document::AlphaFold3(alphafold3::render(graph, anchor)),
            Self::Boltz => Document::Boltz(boltz::render(graph, anchor)),
            Self::Chai => Document::Chai(chai::render(graph, anchor)),
            Self::Protenix(mode) => Document::Protenix(protenix::render(graph, anchor, mode)?),
        })
    }
}

/// A rendered glycan, ready to be written out
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum Document {
    AlphaFold3(alphafold3::AlphaFold3Input),
    Boltz(boltz::BoltzInput),
    Chai(chai::ChaiInput),
    Protenix(protenix::ProtenixJob),
}

/// One file of a [`Document`], named by the extension it should be saved with
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct OutputFile {
    pub extension: &'static str,
    pub contents: String,
}

impl Document {
    /// Serializes the document into the file (or, for Chai, files) that the model reads
    ///
    /// # Errors
    ///
    /// Fails only if serialization itself fails.
    pub fn files(&self) -> Result<Vec<OutputFile>> {
        let file = |extension, contents| OutputFile {
            extension,
            contents,
        };
        Ok(match self {
            Self::AlphaFold3(input) => vec![file("af3.json", serde_json::to_string_pretty(input)?)],
            Self::Boltz(input) => vec![file("boltz.yaml", serde_yaml::to_string(input)?)],
            Self::Chai(input) => {
                let mut files = vec![file("fasta", input.fasta())];
                files.extend(input.restraints_csv().map(|csv| file("restraints.csv", csv)));
                files
            }
            // NOTE: Protenix reads a list of jobs, even when there's only one
            Self::Protenix(job) => vec![file(
                "protenix.json",
                serde_json::to_string_pretty(std::slice::from_ref(job))?,
            )],
        })
    }
}

// Residue Vocabulary ==================================================================================================

const MAX_CCD_LENGTH: usize = 5;

// CCD codes are one to five uppercase letters or digits
fn is_ccd_code(code: &str) -> bool {
    (1..=MAX_CCD_LENGTH).contains(&code.len())
        && code
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

fn check_residue_codes(graph: &GlycanGraph) -> Result<()> {
    match graph.nodes().iter().find(|n| !is_ccd_code(&n.code)) {
        Some(node) => Err(DialectError::UnknownResidue {
            code: node.code.clone(),
            node: node.id,
        }),
        None => Ok(()),
    }
}

// Trait Implementations ===============================================================================================

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlphaFold3 => write!(f, "alphafold3"),
            Self::Boltz => write!(f, "boltz"),
            Self::Chai => write!(f, "chai"),
            Self::Protenix(mode) => write!(f, "protenix:{mode}"),
        }
    }
}

impl FromStr for Dialect {
    type Err = DialectError;

    /// Accepts `alphafold3` (or `af3`), `boltz`, `chai`, and `protenix`, optionally followed by a mode, like
    /// `protenix:split`
    fn from_str(s: &str) -> Result<Self> {
        let (name, mode) = match s.split_once(':') {
            Some((name, mode)) => (name, Some(mode)),
            None => (s, None),
        };
        let name = name.to_ascii_lowercase();
        let dialect = match (name.as_str(), mode) {
            ("alphafold3" | "af3", None) => Self::AlphaFold3,
            ("boltz", None) => Self::Boltz,
            ("chai", None) => Self::Chai,
            ("protenix", mode) => Self::Protenix(mode.map_or(Ok(ProtenixMode::default()), str::parse)?),
            (_, Some(mode)) if Self::ALL.iter().any(|d| d.name() == name) => {
                return Err(DialectError::UnsupportedMode {
                    mode: mode.to_owned(),
                });
            }
            _ => {
                return Err(DialectError::UnknownDialect {
                    name: s.to_owned(),
                });
            }
        };
        Ok(dialect)
    }
}

impl Dialect {
    fn name(self) -> &'static str {
        match self {
            Self::AlphaFold3 => "alphafold3",
            Self::Boltz => "boltz",
            Self::Chai => "chai",
            Self::Protenix(_) => "protenix",
        }
    }
}

// Shared Rendering Helpers ============================================================================================

/// Bonds in output order: glycosidic bonds by child id, then the anchor
pub(crate) enum Bond<'g> {
    Glycosidic(&'g BondEdge),
    Anchor(&'g Anchor),
}

pub(crate) fn bonds<'g>(
    graph: &'g GlycanGraph,
    anchor: Option<&'g Anchor>,
) -> impl Iterator<Item = Bond<'g>> {
    graph
        .edges()
        .iter()
        .map(Bond::Glycosidic)
        .chain(anchor.map(Bond::Anchor))
}

// Module Tests ========================================================================================================
