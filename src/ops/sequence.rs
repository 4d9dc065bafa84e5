//! Detects residues declared in the sequence header but absent from the coordinates.
//!
//! Each polymer chain's observed residue names are aligned globally (Needleman-Wunsch)
//! against the declared sequence. Declared residues that align to nothing form gaps, each
//! anchored to the observed residue it precedes so that later insertion knows where the new
//! residues belong.

use crate::model::{chain::Chain, structure::Structure, types::ResidueCategory};

const MATCH_SCORE: i32 = 2;
const MISMATCH_SCORE: i32 = -1;
const GAP_SCORE: i32 = -1;

/// A run of consecutive declared residues with no coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResidueGap {
    pub chain_id: String,
    /// Position in the chain's residue list where the missing residues are inserted.
    ///
    /// An index equal to one past the last observed polymer residue marks a C-terminal tail;
    /// index 0 on a chain starting with a polymer residue marks an N-terminal tail.
    pub index: usize,
    pub names: Vec<String>,
}

impl ResidueGap {
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Finds every gap in every polymer chain that carries a declared sequence.
///
/// Chains without a declared sequence, or without amino acids and nucleotides, produce no
/// gaps.
pub fn find_missing_residues(structure: &Structure) -> Vec<ResidueGap> {
    structure
        .iter_chains()
        .filter(|chain| chain.is_polymer())
        .filter_map(|chain| {
            structure
                .sequence(&chain.id)
                .map(|sequence| chain_gaps(chain, sequence.residues()))
        })
        .flatten()
        .collect()
}

fn chain_gaps(chain: &Chain, declared: &[String]) -> Vec<ResidueGap> {
    // Modified residues listed in the header (MSE, ...) count as observed; ligands do not.
    let observed: Vec<(usize, &str)> = chain
        .iter_residues()
        .enumerate()
        .filter(|(_, r)| {
            r.is_amino_acid()
                || r.is_nucleotide()
                || (r.category == ResidueCategory::Hetero && declared.iter().any(|d| *d == r.name))
        })
        .map(|(i, r)| (i, r.name.as_str()))
        .collect();

    let Some(&(last_index, _)) = observed.last() else {
        return Vec::new();
    };

    let observed_names: Vec<&str> = observed.iter().map(|(_, name)| *name).collect();
    let mut gaps = Vec::new();
    let mut pending: Vec<String> = Vec::new();

    for step in align(declared, &observed_names) {
        match step {
            Step::Aligned(_, obs) => {
                if !pending.is_empty() {
                    gaps.push(ResidueGap {
                        chain_id: chain.id.clone(),
                        index: observed[obs].0,
                        names: std::mem::take(&mut pending),
                    });
                }
            }
            Step::Missing(decl) => pending.push(declared[decl].clone()),
            Step::Extra(_) => {}
        }
    }

    if !pending.is_empty() {
        gaps.push(ResidueGap {
            chain_id: chain.id.clone(),
            index: last_index + 1,
            names: pending,
        });
    }

    gaps
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// Declared and observed residues occupy the same column (match or mismatch).
    Aligned(usize, usize),
    /// Declared residue without an observed counterpart.
    Missing(usize),
    /// Observed residue that the declared sequence does not account for.
    Extra(usize),
}

fn align(declared: &[String], observed: &[&str]) -> Vec<Step> {
    let n = declared.len();
    let m = observed.len();
    let width = m + 1;
    let mut score = vec![0i32; (n + 1) * width];

    for i in 1..=n {
        score[i * width] = i as i32 * GAP_SCORE;
    }
    for j in 1..=m {
        score[j] = j as i32 * GAP_SCORE;
    }

    let pair_score = |i: usize, j: usize| {
        if declared[i - 1] == observed[j - 1] {
            MATCH_SCORE
        } else {
            MISMATCH_SCORE
        }
    };

    for i in 1..=n {
        for j in 1..=m {
            let diagonal = score[(i - 1) * width + j - 1] + pair_score(i, j);
            let up = score[(i - 1) * width + j] + GAP_SCORE;
            let left = score[i * width + j - 1] + GAP_SCORE;
            score[i * width + j] = diagonal.max(up).max(left);
        }
    }

    let mut steps = Vec::with_capacity(n + m);
    let (mut i, mut j) = (n, m);
    while i > 0 || j > 0 {
        let current = score[i * width + j];
        if i > 0 && j > 0 && current == score[(i - 1) * width + j - 1] + pair_score(i, j) {
            steps.push(Step::Aligned(i - 1, j - 1));
            i -= 1;
            j -= 1;
        } else if i > 0 && current == score[(i - 1) * width + j] + GAP_SCORE {
            steps.push(Step::Missing(i - 1));
            i -= 1;
        } else {
            steps.push(Step::Extra(j - 1));
            j -= 1;
        }
    }

    steps.reverse();
    steps
}
