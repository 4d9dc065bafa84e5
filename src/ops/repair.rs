//! Template-driven completion of amino acids and nucleotides.
//!
//! Three passes live here: listing which heavy atoms a residue lacks, inserting residues
//! declared in the sequence header but never observed, and rebuilding the heavy atoms a
//! previous listing reported (including the terminal `OXT` and `OP3`) by superposing the
//! residue's template onto the atoms that are present.

use crate::db::{self, TemplateView};
use crate::model::{
    atom::Atom,
    chain::Chain,
    residue::Residue,
    structure::Structure,
    types::{Element, Point, ResidueCategory, ResiduePosition, StandardResidue},
};
use crate::ops::error::Error;
use crate::ops::sequence::ResidueGap;
use nalgebra::{Matrix3, Rotation3, Vector3};
use std::collections::{BTreeMap, HashSet};
use tracing::warn;

const OXT_BOND_LENGTH: f64 = 1.25;
const OP3_BOND_LENGTH: f64 = 1.48;

/// Phosphate atoms a 5'-terminal nucleotide only carries when it was deposited with them.
const PHOSPHATE_ATOMS: [&str; 3] = ["P", "OP1", "OP2"];

/// Heavy atoms one residue lacks relative to its template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingAtoms {
    pub chain_id: String,
    pub residue_id: i32,
    pub insertion_code: Option<char>,
    pub residue_name: String,
    pub atom_names: Vec<String>,
}

/// Three consecutive backbone atoms that seed an inserted residue.
struct BackboneFrame {
    /// Atom bonded toward the preceding residue.
    lead: &'static str,
    center: &'static str,
    /// Atom bonded toward the following residue.
    trail: &'static str,
    /// Distance between the central atoms of consecutive residues.
    spacing: f64,
}

static PEPTIDE_FRAME: BackboneFrame = BackboneFrame {
    lead: "N",
    center: "CA",
    trail: "C",
    spacing: 3.8,
};

static NUCLEIC_FRAME: BackboneFrame = BackboneFrame {
    lead: "O5'",
    center: "C4'",
    trail: "O3'",
    spacing: 5.9,
};

impl BackboneFrame {
    fn of(std: StandardResidue) -> &'static BackboneFrame {
        if std.is_amino_acid() {
            &PEPTIDE_FRAME
        } else {
            &NUCLEIC_FRAME
        }
    }
}

/// Returns the template providing heavy-atom geometry for a standard amino acid or
/// nucleotide.
///
/// All histidine tautomers share their heavy atoms, so `HIE` stands in for `HIS`.
pub(crate) fn heavy_atom_template(std: StandardResidue) -> Option<TemplateView<'static>> {
    if !std.is_amino_acid() && !std.is_nucleotide() {
        return None;
    }
    let template = match std {
        StandardResidue::HIS => db::get_template("HIE"),
        other => db::get_template(other.code()),
    };
    template.filter(|t| t.standard_name() == std)
}

/// Lists the heavy atoms absent from each standard amino acid and nucleotide.
///
/// Terminal atoms follow the residue's polymer position: `OXT` on C-terminal amino acids and
/// `OP3` on 5'-terminal nucleotides that carry a phosphorus. A 5'-terminal nucleotide without
/// phosphorus is not expected to have `P`, `OP1`, or `OP2`. Hetero groups are not reported.
pub fn find_missing_atoms(structure: &Structure) -> Vec<MissingAtoms> {
    structure
        .iter_chains()
        .flat_map(|chain| {
            chain
                .iter_residues()
                .filter(|r| is_repairable(r))
                .filter_map(|r| residue_missing_atoms(&chain.id, r))
        })
        .collect()
}

/// Rebuilds the heavy atoms listed in `missing` and returns how many were added.
///
/// Each listed residue is first cleaned of heavy atoms its template does not know; its
/// hydrogens are left for the hydrogenation pass. Listed atoms that no longer fit the
/// residue's polymer position are ignored, and entries naming a residue that is gone are
/// skipped with a warning. Residues that are not listed are left untouched.
///
/// # Errors
///
/// Returns [`Error::AlignmentFailed`] when a residue shares no heavy atom with its template.
pub fn add_missing_atoms(structure: &mut Structure, missing: &[MissingAtoms]) -> Result<usize, Error> {
    let mut added = 0;
    for entry in missing {
        let residue = structure
            .find_residue_mut(&entry.chain_id, entry.residue_id, entry.insertion_code)
            .filter(|r| r.name == entry.residue_name && is_repairable(r));
        let Some(residue) = residue else {
            warn!(
                chain = %entry.chain_id,
                residue = entry.residue_id,
                name = %entry.residue_name,
                "skipping missing atoms of a residue no longer present"
            );
            continue;
        };
        added += repair_residue(residue, &entry.atom_names)?;
    }
    Ok(added)
}

fn is_repairable(residue: &Residue) -> bool {
    residue.category == ResidueCategory::Standard
        && (residue.is_amino_acid() || residue.is_nucleotide())
}

fn residue_missing_atoms(chain_id: &str, residue: &Residue) -> Option<MissingAtoms> {
    let template = residue.standard_name.and_then(heavy_atom_template)?;
    let atom_names: Vec<String> = expected_heavy_atoms(residue, template)
        .into_iter()
        .filter(|(name, _, _)| !residue.has_atom(name))
        .map(|(name, _, _)| name.to_string())
        .collect();

    (!atom_names.is_empty()).then(|| MissingAtoms {
        chain_id: chain_id.to_string(),
        residue_id: residue.id,
        insertion_code: residue.insertion_code,
        residue_name: residue.name.clone(),
        atom_names,
    })
}

/// The heavy atoms a residue should carry at its current polymer position, with template
/// coordinates.
fn expected_heavy_atoms(
    residue: &Residue,
    template: TemplateView<'static>,
) -> Vec<(&'static str, Element, Point)> {
    let five_prime = residue.is_nucleotide() && residue.position == ResiduePosition::FivePrime;
    let phosphorylated = five_prime && residue.has_atom("P");

    let mut expected: Vec<_> = template
        .heavy_atoms()
        .filter(|(name, _, _)| !five_prime || phosphorylated || !PHOSPHATE_ATOMS.contains(name))
        .collect();

    if residue.is_amino_acid() && residue.position == ResiduePosition::CTerminal {
        expected.extend(calculate_template_oxt(template).map(|pos| ("OXT", Element::O, pos)));
    }
    if phosphorylated {
        expected.extend(calculate_template_op3(template).map(|pos| ("OP3", Element::O, pos)));
    }
    expected
}

fn repair_residue(residue: &mut Residue, requested: &[String]) -> Result<usize, Error> {
    let template = residue
        .standard_name
        .and_then(heavy_atom_template)
        .ok_or_else(|| Error::missing_template(&residue.name))?;

    let expected = expected_heavy_atoms(residue, template);
    let valid_names: HashSet<&str> = expected.iter().map(|(name, _, _)| *name).collect();
    residue.retain_atoms(|atom| atom.is_hydrogen() || valid_names.contains(atom.name.as_str()));

    let mut align_pairs = Vec::new();
    let mut missing_heavy_atoms = Vec::new();

    for (name, element, tmpl_pos) in expected {
        if let Some(atom) = residue.atom(name) {
            align_pairs.push((atom.pos, tmpl_pos));
        } else if requested.iter().any(|r| r == name) {
            missing_heavy_atoms.push((name, element, tmpl_pos));
        }
    }

    if missing_heavy_atoms.is_empty() {
        return Ok(0);
    }

    if align_pairs.is_empty() {
        return Err(Error::alignment_failed(
            &residue.name,
            residue.id,
            "No matching heavy atoms found for alignment",
        ));
    }

    let (rotation, translation) = calculate_transform(&align_pairs)
        .ok_or_else(|| Error::alignment_failed(&residue.name, residue.id, "SVD failed"))?;

    let count = missing_heavy_atoms.len();
    for (name, element, tmpl_pos) in missing_heavy_atoms {
        let new_pos = rotation * tmpl_pos + translation;
        residue.add_atom(Atom::new(name, element, new_pos));
    }

    Ok(count)
}

/// Places `OXT` in the carboxylate plane, opposite the bisector of the C→O and C→CA bonds.
fn calculate_template_oxt(view: TemplateView) -> Option<Point> {
    let (_, c) = view.heavy_atom("C")?;
    let (_, ca) = view.heavy_atom("CA")?;
    let (_, o) = view.heavy_atom("O")?;

    let v_c_o = (o - c).normalize();
    let v_c_ca = (ca - c).normalize();
    let dir_oxt = -(v_c_o + v_c_ca).normalize();

    Some(c + dir_oxt * OXT_BOND_LENGTH)
}

/// Places `OP3` on the fourth tetrahedral position of the phosphorus, away from the
/// centroid of `OP1`, `OP2`, and `O5'`.
fn calculate_template_op3(view: TemplateView) -> Option<Point> {
    let (_, p) = view.heavy_atom("P")?;
    let (_, op1) = view.heavy_atom("OP1")?;
    let (_, op2) = view.heavy_atom("OP2")?;
    let (_, o5) = view.heavy_atom("O5'")?;

    let centroid = Point::from((op1.coords + op2.coords + o5.coords) / 3.0);
    let direction = (p - centroid).try_normalize(1e-9)?;

    Some(p + direction * OP3_BOND_LENGTH)
}

/// Inserts the residues of every gap, seeding each with three template-shaped backbone
/// atoms (N/CA/C for amino acids, O5'/C4'/O3' for nucleotides).
///
/// Internal gaps are spread along the segment between the flanking backbone atoms; terminal
/// tails grow away from the chain one residue spacing at a time. Gaps naming a residue
/// without a template, or mixing amino acids with nucleotides, are skipped with a warning.
/// Returns the heavy atoms each inserted residue still lacks, ready for
/// [`add_missing_atoms`].
///
/// # Errors
///
/// Returns [`Error::GapPlacementFailed`] when neither flanking residue has usable backbone
/// atoms or no free residue number remains.
pub fn add_missing_residues(
    structure: &mut Structure,
    gaps: &[ResidueGap],
) -> Result<Vec<MissingAtoms>, Error> {
    let mut by_chain: BTreeMap<&str, Vec<&ResidueGap>> = BTreeMap::new();
    for gap in gaps.iter().filter(|g| !g.is_empty()) {
        by_chain.entry(gap.chain_id.as_str()).or_default().push(gap);
    }

    let mut pending = Vec::new();
    for (chain_id, mut chain_gaps) in by_chain {
        let Some(chain) = structure.chain_mut(chain_id) else {
            warn!(chain = chain_id, "skipping missing residues for absent chain");
            continue;
        };

        chain_gaps.sort_by(|a, b| b.index.cmp(&a.index));
        let mut inserted = Vec::new();
        for gap in chain_gaps {
            inserted.extend(insert_gap(chain, gap)?);
        }
        chain.assign_residue_positions();

        pending.extend(
            inserted
                .into_iter()
                .filter_map(|(id, insertion_code)| chain.residue(id, insertion_code))
                .filter_map(|residue| residue_missing_atoms(&chain.id, residue)),
        );
    }

    Ok(pending)
}

struct BackboneAnchor {
    id: i32,
    center: Point,
    /// The backbone atom facing the gap: the trailing atom of the preceding residue or the
    /// leading atom of the following one.
    edge: Point,
}

fn insert_gap(chain: &mut Chain, gap: &ResidueGap) -> Result<Vec<(i32, Option<char>)>, Error> {
    let mut templates = Vec::with_capacity(gap.len());
    for name in &gap.names {
        let resolved = name
            .parse::<StandardResidue>()
            .ok()
            .and_then(|std| heavy_atom_template(std).map(|t| (std, t)));
        match resolved {
            Some(entry) => templates.push(entry),
            None => {
                warn!(
                    chain = %chain.id,
                    residue = %name,
                    count = gap.len(),
                    "skipping gap containing a residue without a template"
                );
                return Ok(Vec::new());
            }
        }
    }

    let Some(&(first, _)) = templates.first() else {
        return Ok(Vec::new());
    };
    if templates
        .iter()
        .any(|(std, _)| std.is_amino_acid() != first.is_amino_acid())
    {
        warn!(
            chain = %chain.id,
            count = gap.len(),
            "skipping gap mixing amino acids and nucleotides"
        );
        return Ok(Vec::new());
    }
    let frame = BackboneFrame::of(first);

    let index = gap.index.min(chain.residue_count());
    let residues = chain.residues();
    let prev = index
        .checked_sub(1)
        .and_then(|i| residues.get(i))
        .and_then(|r| backbone_anchor(r, frame, frame.trail));
    let next = residues
        .get(index)
        .and_then(|r| backbone_anchor(r, frame, frame.lead));

    let count = gap.len();
    let (centers, direction, base_id): (Vec<Point>, Vector3<f64>, i32) = match (&prev, &next) {
        (Some(p), Some(n)) => {
            let span = n.edge - p.edge;
            let direction = if span.norm() > 1e-6 {
                span.normalize()
            } else {
                unit_or_x(p.edge - p.center)
            };
            let spacing = span.norm() / (count as f64 + 1.0);
            let positions = (0..count)
                .map(|k| p.edge + direction * spacing * (k as f64 + 1.0))
                .collect();
            (positions, direction, p.id + 1)
        }
        (Some(p), None) => {
            let direction = unit_or_x(p.edge - p.center);
            let positions = (0..count)
                .map(|k| p.center + direction * frame.spacing * (k as f64 + 1.0))
                .collect();
            (positions, direction, p.id + 1)
        }
        (None, Some(n)) => {
            let outward = unit_or_x(n.edge - n.center);
            let positions = (0..count)
                .map(|k| n.center + outward * frame.spacing * (count - k) as f64)
                .collect();
            (positions, -outward, n.id - count as i32)
        }
        (None, None) => {
            return Err(Error::gap_placement_failed(
                &chain.id,
                format!(
                    "no flanking backbone atoms around residue index {}",
                    gap.index
                ),
            ));
        }
    };

    let side = perpendicular(&direction);
    let mut taken: HashSet<(i32, Option<char>)> = chain
        .iter_residues()
        .map(|r| (r.id, r.insertion_code))
        .collect();

    let mut inserted = Vec::with_capacity(count);
    for (k, ((std, template), center)) in templates.into_iter().zip(centers).enumerate() {
        let number = base_id + k as i32;
        let insertion_code = free_insertion_code(&taken, number).ok_or_else(|| {
            Error::gap_placement_failed(
                &chain.id,
                format!("no free insertion code left for residue number {number}"),
            )
        })?;
        taken.insert((number, insertion_code));

        let zigzag = if k % 2 == 0 { side } else { -side };
        let mut residue = Residue::new(
            number,
            insertion_code,
            std.code(),
            Some(std),
            ResidueCategory::Standard,
        );
        for (name, element, pos) in seed_backbone(template, frame, center, &direction, &zigzag) {
            residue.add_atom(Atom::new(name, element, pos));
        }
        chain.insert_residue(index + k, residue);
        inserted.push((number, insertion_code));
    }

    Ok(inserted)
}

fn backbone_anchor(residue: &Residue, frame: &BackboneFrame, edge_name: &str) -> Option<BackboneAnchor> {
    let center = residue.atom(frame.center)?.pos;
    let edge = residue.atom(edge_name)?.pos;
    Some(BackboneAnchor {
        id: residue.id,
        center,
        edge,
    })
}

fn free_insertion_code(taken: &HashSet<(i32, Option<char>)>, number: i32) -> Option<Option<char>> {
    std::iter::once(None)
        .chain(('A'..='Z').map(Some))
        .find(|code| !taken.contains(&(number, *code)))
}

fn unit_or_x(v: Vector3<f64>) -> Vector3<f64> {
    v.try_normalize(1e-9).unwrap_or_else(Vector3::x)
}

fn perpendicular(v: &Vector3<f64>) -> Vector3<f64> {
    let up = if v.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    v.cross(&up).normalize()
}

/// Places the template's frame atoms so that the central one sits at `center`, the
/// lead→trail vector follows `direction`, and the center bulges toward `side`.
fn seed_backbone(
    template: TemplateView<'static>,
    frame: &BackboneFrame,
    center: Point,
    direction: &Vector3<f64>,
    side: &Vector3<f64>,
) -> Vec<(&'static str, Element, Point)> {
    let backbone: Vec<(&'static str, Element, Point)> = template
        .heavy_atoms()
        .filter(|(name, _, _)| [frame.lead, frame.center, frame.trail].contains(name))
        .collect();
    let find = |target: &str| {
        backbone
            .iter()
            .find(|(name, _, _)| *name == target)
            .map(|(_, _, pos)| *pos)
    };
    let (Some(t_lead), Some(t_center), Some(t_trail)) =
        (find(frame.lead), find(frame.center), find(frame.trail))
    else {
        return Vec::new();
    };

    let e1_t = (t_trail - t_lead).normalize();
    let lead_to_center = t_center - t_lead;
    let e2_t = (lead_to_center - e1_t * lead_to_center.dot(&e1_t)).normalize();
    let e3_t = e1_t.cross(&e2_t);

    let e3 = direction.cross(side);
    let rotation = Matrix3::from_columns(&[*direction, *side, e3])
        * Matrix3::from_columns(&[e1_t, e2_t, e3_t]).transpose();

    backbone
        .into_iter()
        .map(|(name, element, pos)| (name, element, center + rotation * (pos - t_center)))
        .collect()
}

/// Computes the best-fit rigid transform mapping template positions onto residue positions.
///
/// Each pair is `(residue_position, template_position)`. One pair yields a pure translation
/// and two pairs a rotation between the bond vectors; three or more use the Kabsch SVD with
/// reflection correction. Returns `None` for an empty input or a failed decomposition.
pub(crate) fn calculate_transform(pairs: &[(Point, Point)]) -> Option<(Matrix3<f64>, Vector3<f64>)> {
    let n = pairs.len();
    if n == 0 {
        return None;
    }

    let center_res = pairs.iter().map(|p| p.0.coords).sum::<Vector3<f64>>() / n as f64;
    let center_tmpl = pairs.iter().map(|p| p.1.coords).sum::<Vector3<f64>>() / n as f64;

    if n == 1 {
        return Some((Matrix3::identity(), center_res - center_tmpl));
    }

    if n == 2 {
        let v_res = pairs[1].0 - pairs[0].0;
        let v_tmpl = pairs[1].1 - pairs[0].1;

        let rotation =
            Rotation3::rotation_between(&v_tmpl, &v_res).unwrap_or_else(Rotation3::identity);
        let translation = center_res - rotation * center_tmpl;

        return Some((rotation.into_inner(), translation));
    }

    let mut cov = Matrix3::zeros();
    for (p_res, p_tmpl) in pairs {
        let v_res = p_res.coords - center_res;
        let v_tmpl = p_tmpl.coords - center_tmpl;
        cov += v_res * v_tmpl.transpose();
    }

    let svd = cov.svd(true, true);
    let u = svd.u?;
    let v_t = svd.v_t?;

    let mut rotation = u * v_t;
    if rotation.determinant() < 0.0 {
        let mut correction = Matrix3::identity();
        correction[(2, 2)] = -1.0;
        rotation = u * correction * v_t;
    }

    let translation = center_res - rotation * center_tmpl;
    Some((rotation, translation))
}
