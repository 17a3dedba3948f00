use glycan::{anchor::AttachmentSiteError, NodeId};
use miette::Diagnostic;
use thiserror::Error;

pub type Result<T, E = DialectError> = std::result::Result<T, E>;

#[derive(Clone, Eq, PartialEq, Debug, Diagnostic, Error)]
pub enum DialectError {
    #[error("{code:?} (residue {node}) isn't a valid CCD code")]
    #[diagnostic(help(
        "structure-prediction models look residues up in the Chemical Component Dictionary, whose codes are one to \
        five uppercase letters or digits, like NAG"
    ))]
    UnknownResidue { code: String, node: NodeId },

    #[error("{mode:?} isn't a supported rendering mode")]
    #[diagnostic(help("Protenix supports the `combined` and `split` modes, other formats have no modes"))]
    UnsupportedMode { mode: String },

    #[error("{name:?} isn't a supported format")]
    #[diagnostic(help("try one of alphafold3, boltz, chai, or protenix"))]
    UnknownDialect { name: String },

    #[error("the chain {chain:?} can't be mapped to a Protenix entity")]
    #[diagnostic(help(
        "Protenix addresses chains by their position in the job, so anchor chains must be labeled like A, B, ..., \
        AA, or numbered from 1"
    ))]
    UnaddressableChain { chain: String },

    #[error("failed to write {format}: {message}")]
    Serialization {
        format: &'static str,
        message: String,
    },

    #[error("failed to read the AlphaFold Server job: {0}")]
    #[diagnostic(help("AlphaFold Server jobs are a JSON list of objects, each with a `sequences` list"))]
    InvalidJob(String),

    #[error("glycan {index} of the AlphaFold Server job isn't attached to a valid residue")]
    Attachment {
        index: usize,
        #[source]
        #[diagnostic_source]
        source: AttachmentSiteError,
    },
}

impl From<serde_json::Error> for DialectError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON",
            message: value.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for DialectError {
    fn from(value: serde_yaml::Error) -> Self {
        Self::Serialization {
            format: "YAML",
            message: value.to_string(),
        }
    }
}
