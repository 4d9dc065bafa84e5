//! Shared assembly step for the PDB and mmCIF readers.
//!
//! Both formats stream atoms row by row; [`StructureBuilder`] groups them into chains and
//! residues in first-seen order, resolves alternate locations by occupancy, and finally runs
//! residue classification and terminal annotation.

use crate::io::context::IoContext;
use crate::model::{
    atom::Atom,
    chain::Chain,
    residue::Residue,
    structure::Structure,
    types::{Element, ResidueCategory, StandardResidue},
};
use std::collections::HashMap;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ResKey {
    res_seq: i32,
    i_code: Option<char>,
}

struct TempResidue {
    raw_name: String,
    is_hetatm: bool,
    atom_order: Vec<String>,
    atoms: HashMap<String, (f64, Atom)>,
}

#[derive(Default)]
struct TempChain {
    residue_order: Vec<ResKey>,
    residues: HashMap<ResKey, TempResidue>,
}

/// Location of one atom record within the chain/residue hierarchy.
pub struct AtomSite<'a> {
    pub chain_id: &'a str,
    pub res_seq: i32,
    pub i_code: Option<char>,
    pub res_name: &'a str,
    pub is_hetatm: bool,
    pub occupancy: f64,
}

#[derive(Default)]
pub struct StructureBuilder {
    chain_order: Vec<String>,
    chains: HashMap<String, TempChain>,
    atom_count: usize,
}

impl StructureBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct atoms buffered so far.
    pub fn atom_count(&self) -> usize {
        self.atom_count
    }

    /// Buffers an atom; a duplicate name in the same residue replaces the stored copy only
    /// when its occupancy is strictly higher.
    pub fn push_atom(&mut self, site: AtomSite<'_>, atom: Atom) {
        if !self.chains.contains_key(site.chain_id) {
            self.chain_order.push(site.chain_id.to_string());
        }
        let chain = self.chains.entry(site.chain_id.to_string()).or_default();

        let key = ResKey {
            res_seq: site.res_seq,
            i_code: site.i_code,
        };
        if !chain.residues.contains_key(&key) {
            chain.residue_order.push(key.clone());
        }
        let temp_res = chain.residues.entry(key).or_insert_with(|| TempResidue {
            raw_name: site.res_name.to_string(),
            is_hetatm: site.is_hetatm,
            atom_order: Vec::new(),
            atoms: HashMap::new(),
        });

        let atom_name = atom.name.to_string();
        match temp_res.atoms.get_mut(&atom_name) {
            Some(existing) if site.occupancy > existing.0 => *existing = (site.occupancy, atom),
            Some(_) => {}
            None => {
                temp_res.atom_order.push(atom_name.clone());
                temp_res.atoms.insert(atom_name, (site.occupancy, atom));
                self.atom_count += 1;
            }
        }
    }

    /// Converts the buffered records into chains and residues on top of `structure`.
    pub fn finish(mut self, mut structure: Structure, context: &IoContext) -> Structure {
        for chain_id in std::mem::take(&mut self.chain_order) {
            let Some(mut temp_chain) = self.chains.remove(&chain_id) else {
                continue;
            };
            let mut chain = Chain::new(&chain_id);

            for key in temp_chain.residue_order {
                let Some(mut temp_res) = temp_chain.residues.remove(&key) else {
                    continue;
                };
                let (canonical_name, std_enum) = context.classify_residue(&temp_res.raw_name);
                let category = classify_category(std_enum, temp_res.atoms.len());

                let mut residue = Residue::new(
                    key.res_seq,
                    key.i_code,
                    canonical_name.as_str(),
                    std_enum,
                    category,
                );
                residue.is_hetatm = temp_res.is_hetatm;

                for name in &temp_res.atom_order {
                    if let Some((_, atom)) = temp_res.atoms.remove(name) {
                        residue.add_atom(atom);
                    }
                }

                chain.add_residue(residue);
            }
            structure.add_chain(chain);
        }

        assign_residue_positions(&mut structure);
        structure
    }
}

/// Standard residues stay standard; anything else with a single atom is an ion.
///
/// Unlike strict template-driven parsers, unknown residue names in `ATOM` records are
/// accepted as hetero groups so modified amino acids pass through untouched.
pub fn classify_category(std_enum: Option<StandardResidue>, atom_count: usize) -> ResidueCategory {
    match std_enum {
        Some(_) => ResidueCategory::Standard,
        None if atom_count == 1 => ResidueCategory::Ion,
        None => ResidueCategory::Hetero,
    }
}

fn assign_residue_positions(structure: &mut Structure) {
    for chain in structure.iter_chains_mut() {
        chain.assign_residue_positions();
    }
}

/// Infers an element from a four-character PDB atom-name field.
///
/// Names starting in column 13 (no leading blank) are two-letter element symbols such as
/// `FE` or `CL`; otherwise the first letter decides (`" CA "` is carbon, `"1HG1"` hydrogen).
pub fn infer_element_from_name(field: &str) -> Element {
    let lookup = |symbol: &str| Element::from_str(symbol).ok().filter(|e| *e != Element::Unknown);

    let letters: Vec<(usize, char)> = field
        .char_indices()
        .filter(|(_, ch)| ch.is_ascii_alphabetic())
        .collect();

    let Some(&(first_idx, first_char)) = letters.first() else {
        return Element::Unknown;
    };

    if first_idx == 0 {
        if let Some(&(second_idx, second_char)) = letters.get(1) {
            if second_idx == 1 {
                let pair: String = [first_char, second_char].iter().collect();
                if let Some(element) = lookup(&pair) {
                    return element;
                }
            }
        }
    }

    letters
        .iter()
        .find_map(|(_, ch)| lookup(&ch.to_string()))
        .unwrap_or(Element::Unknown)
}

/// Builds triclinic box vectors from cell lengths (Å) and angles (radians).
pub fn cell_vectors(a: f64, b: f64, c: f64, alpha: f64, beta: f64, gamma: f64) -> [[f64; 3]; 3] {
    let (cos_a, cos_b, cos_g) = (alpha.cos(), beta.cos(), gamma.cos());
    let sin_g = gamma.sin();

    let term = (cos_a - cos_b * cos_g) / sin_g;
    let v3_z = (1.0 - cos_b * cos_b - term * term).max(0.0).sqrt();

    [
        [a, 0.0, 0.0],
        [b * cos_g, b * sin_g, 0.0],
        [c * cos_b, c * term, c * v3_z],
    ]
}
