//! Reads the glycans out of an AlphaFold Server job
//!
//! The server attaches glycans to protein chains by sequence position, leaving the bonding atom implicit. Chains are
//! labeled in order of appearance, with every copy of an entity and every glycan taking the next label.

use glycan::AttachmentSite;
use serde::Deserialize;
use tracing::debug;

use crate::{chain_ids::spreadsheet_id, DialectError, Result};

/// A glycan in bracket notation and the protein residue it's attached to
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct ServerGlycan {
    pub residues: String,
    pub site: AttachmentSite,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerJob {
    sequences: Vec<Entity>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
enum Entity {
    ProteinChain(ProteinChain),
    DnaSequence(Copies),
    RnaSequence(Copies),
    Ligand(Copies),
    Ion(Copies),
}

#[derive(Deserialize)]
struct ProteinChain {
    sequence: String,
    #[serde(default = "one")]
    count: usize,
    #[serde(default)]
    glycans: Vec<Glycan>,
}

#[derive(Deserialize)]
struct Copies {
    #[serde(default = "one")]
    count: usize,
}

#[derive(Deserialize)]
struct Glycan {
    residues: String,
    position: usize,
}

const fn one() -> usize {
    1
}

/// Reads every protein-attached glycan from the first job in `json`
///
/// # Errors
///
/// Fails if `json` isn't a non-empty list of server jobs, or if any glycan is attached to a position outside of its
/// protein or to a residue with no glycosylation atom.
pub fn read_job(json: &str) -> Result<Vec<ServerGlycan>> {
    let jobs: Vec<ServerJob> = serde_json::from_str(json).map_err(|e| DialectError::InvalidJob(e.to_string()))?;
    let job = jobs
        .into_iter()
        .next()
        .ok_or_else(|| DialectError::InvalidJob("the list of jobs is empty".to_owned()))?;

    let mut next_chain = 0;
    let mut allocate = |count: usize| {
        let first = next_chain;
        next_chain += count;
        spreadsheet_id(first)
    };

    let mut glycans = Vec::new();
    for entity in job.sequences {
        let protein = match entity {
            Entity::ProteinChain(protein) => protein,
            Entity::DnaSequence(Copies { count })
            | Entity::RnaSequence(Copies { count })
            | Entity::Ligand(Copies { count })
            | Entity::Ion(Copies { count }) => {
                allocate(count);
                continue;
            }
        };

        // Glycans are bonded to the first copy of their protein
        let chain = allocate(protein.count);
        for Glycan { residues, position } in protein.glycans {
            allocate(1);
            let index = glycans.len();
            let site = AttachmentSite::from_sequence(chain.clone(), &protein.sequence, position)
                .map_err(|source| DialectError::Attachment { index, source })?;
            debug!(%site, %residues, "read AlphaFold Server glycan");
            glycans.push(ServerGlycan { residues, site });
        }
    }
    Ok(glycans)
}
