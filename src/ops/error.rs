use thiserror::Error;

/// Failures raised by the repair, hydrogenation, and topology passes.
#[derive(Debug, Error)]
pub enum Error {
    #[error("internal template not found for standard residue '{res_name}'")]
    MissingInternalTemplate { res_name: String },

    #[error("alignment failed for residue '{res_name}' ({res_id}): {reason}")]
    AlignmentFailed {
        res_name: String,
        res_id: i32,
        reason: String,
    },

    #[error(
        "cannot add hydrogens to residue '{res_name}' ({res_id}): missing anchor atom '{atom_name}'"
    )]
    IncompleteResidueForHydro {
        res_name: String,
        res_id: i32,
        atom_name: String,
    },

    #[error("cannot place missing residues in chain '{chain_id}': {details}")]
    GapPlacementFailed { chain_id: String, details: String },
}

impl Error {
    pub fn missing_template(res_name: impl Into<String>) -> Self {
        Self::MissingInternalTemplate {
            res_name: res_name.into(),
        }
    }

    pub fn alignment_failed(
        res_name: impl Into<String>,
        res_id: i32,
        reason: impl Into<String>,
    ) -> Self {
        Self::AlignmentFailed {
            res_name: res_name.into(),
            res_id,
            reason: reason.into(),
        }
    }

    pub fn incomplete_for_hydro(
        res_name: impl Into<String>,
        res_id: i32,
        atom_name: impl Into<String>,
    ) -> Self {
        Self::IncompleteResidueForHydro {
            res_name: res_name.into(),
            res_id,
            atom_name: atom_name.into(),
        }
    }

    pub fn gap_placement_failed(chain_id: impl Into<String>, details: impl Into<String>) -> Self {
        Self::GapPlacementFailed {
            chain_id: chain_id.into(),
            details: details.into(),
        }
    }
}
