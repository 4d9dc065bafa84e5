use std::fmt;

/// Polymer sequence declared in a file header for one chain.
///
/// PDB files carry it as `SEQRES` records and mmCIF files as `_pdbx_poly_seq_scheme` rows.
/// It lists every residue the experiment intended to model, including those without
/// coordinates, which is what makes missing-residue detection possible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    pub chain_id: String,
    residues: Vec<String>,
}

impl Sequence {
    pub fn new(chain_id: &str) -> Self {
        Self {
            chain_id: chain_id.to_string(),
            residues: Vec::new(),
        }
    }

    pub fn push(&mut self, name: &str) {
        self.residues.push(name.to_string());
    }

    pub fn residues(&self) -> &[String] {
        &self.residues
    }

    pub fn len(&self) -> usize {
        self.residues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.residues.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for Sequence {
    /// Collects residue names into a sequence with an empty chain identifier.
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self {
            chain_id: String::new(),
            residues: iter.into_iter().map(|s| s.as_ref().to_string()).collect(),
        }
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Sequence {{ chain: \"{}\", residues: {} }}",
            self.chain_id,
            self.len()
        )
    }
}
