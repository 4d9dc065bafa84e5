use crate::db::{self, TemplateView};
use crate::model::{
    atom::Atom,
    residue::Residue,
    structure::Structure,
    types::{Element, Point, ResidueCategory, ResiduePosition, StandardResidue},
};
use crate::ops::error::Error;
use crate::ops::repair::calculate_transform;
use nalgebra::{Rotation3, Unit, Vector3};
use serde::Deserialize;
use std::collections::HashSet;
use tracing::debug;

/// Maximum SG–SG distance for two cysteines to be treated as a disulfide bridge.
pub(crate) const DISULFIDE_SG_THRESHOLD: f64 = 2.2;

const ASP_PKA: f64 = 3.9;
const GLU_PKA: f64 = 4.2;
const LYS_PKA: f64 = 10.5;
const HIS_PKA: f64 = 6.0;
const N_TERM_PKA: f64 = 8.0;
const C_TERM_PKA: f64 = 3.1;

const HIS_HBOND_CUTOFF: f64 = 3.5;
const PEPTIDE_BOND_MAX: f64 = 2.0;
const N_H_BOND_LENGTH: f64 = 1.01;
const O_H_BOND_LENGTH: f64 = 0.97;
const TETRAHEDRAL_ANGLE: f64 = 109.5;

#[derive(Debug, Clone)]
pub struct HydroConfig {
    pub target_ph: f64,
    pub remove_existing_h: bool,
    pub his_strategy: HisStrategy,
}

impl Default for HydroConfig {
    fn default() -> Self {
        Self {
            target_ph: 7.0,
            remove_existing_h: true,
            his_strategy: HisStrategy::Network,
        }
    }
}

/// How neutral histidines choose between the δ- and ε-protonated tautomers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HisStrategy {
    Hid,
    Hie,
    /// Protonate the ring nitrogen that has a nearby hydrogen-bond partner.
    #[default]
    Network,
}

struct HydroPlan {
    template: TemplateView<'static>,
    /// Carbonyl carbon of the preceding residue when it is peptide-bonded to this one.
    prev_c: Option<Point>,
}

/// Adds hydrogens to every residue that has a template and returns how many were placed.
///
/// Protonation variants only choose the template; residue names are left as read.
///
/// # Errors
///
/// Returns [`Error::IncompleteResidueForHydro`] when an anchor atom a hydrogen depends on is
/// missing. Run [`add_missing_atoms`](crate::ops::add_missing_atoms) first.
pub fn add_hydrogens(structure: &mut Structure, config: &HydroConfig) -> Result<usize, Error> {
    let disulfides = disulfide_residues(structure);

    let plans: Vec<Vec<Option<HydroPlan>>> = structure
        .iter_chains()
        .enumerate()
        .map(|(c_idx, chain)| {
            let residues = chain.residues();
            residues
                .iter()
                .enumerate()
                .map(|(r_idx, residue)| {
                    let in_disulfide = disulfides.contains(&(c_idx, r_idx));
                    select_template(structure, residue, in_disulfide, config).map(|template| {
                        HydroPlan {
                            template,
                            prev_c: r_idx
                                .checked_sub(1)
                                .and_then(|i| peptide_partner_c(&residues[i], residue)),
                        }
                    })
                })
                .collect()
        })
        .collect();

    let mut added = 0;
    let mut template_charge = 0;
    for (chain, chain_plans) in structure.iter_chains_mut().zip(plans) {
        for (residue, plan) in chain.iter_residues_mut().zip(chain_plans) {
            if let Some(plan) = plan {
                added += apply_plan(residue, &plan, config)?;
                template_charge += plan.template.charge();
            }
        }
    }

    // Termini are not included in the template charges.
    debug!(ph = config.target_ph, template_charge, "selected protonation states");
    Ok(added)
}

fn select_template(
    structure: &Structure,
    residue: &Residue,
    in_disulfide: bool,
    config: &HydroConfig,
) -> Option<TemplateView<'static>> {
    if residue.is_water() {
        return db::get_template("HOH");
    }
    if residue.category != ResidueCategory::Standard {
        return None;
    }
    if residue.is_nucleotide() {
        return residue.standard_name.and_then(|std| db::get_template(std.code()));
    }
    if !residue.is_amino_acid() {
        return None;
    }

    let ph = config.target_ph;
    let name = match residue.standard_name? {
        StandardResidue::ASP if ph < ASP_PKA => "ASH",
        StandardResidue::GLU if ph < GLU_PKA => "GLH",
        StandardResidue::LYS if ph > LYS_PKA => "LYN",
        StandardResidue::HIS if ph < HIS_PKA => "HIP",
        StandardResidue::HIS => select_neutral_his(structure, residue, config.his_strategy),
        StandardResidue::CYS if in_disulfide => "CYX",
        other => other.code(),
    };
    db::get_template(name)
}

fn disulfide_residues(structure: &Structure) -> HashSet<(usize, usize)> {
    let mut cys_sulfurs = Vec::new();
    for (c_idx, chain) in structure.iter_chains().enumerate() {
        for (r_idx, residue) in chain.iter_residues().enumerate() {
            if residue.standard_name == Some(StandardResidue::CYS) {
                if let Some(sg) = residue.atom("SG") {
                    cys_sulfurs.push((c_idx, r_idx, sg.pos));
                }
            }
        }
    }

    let threshold_sq = DISULFIDE_SG_THRESHOLD * DISULFIDE_SG_THRESHOLD;
    let mut bridged = HashSet::new();
    for (i, (ci, ri, pos_i)) in cys_sulfurs.iter().enumerate() {
        for (cj, rj, pos_j) in &cys_sulfurs[i + 1..] {
            if (pos_i - pos_j).norm_squared() <= threshold_sq {
                bridged.insert((*ci, *ri));
                bridged.insert((*cj, *rj));
            }
        }
    }
    bridged
}

fn select_neutral_his(
    structure: &Structure,
    residue: &Residue,
    strategy: HisStrategy,
) -> &'static str {
    match strategy {
        HisStrategy::Hid => "HID",
        HisStrategy::Hie => "HIE",
        HisStrategy::Network => optimize_his_network(structure, residue),
    }
}

fn optimize_his_network(structure: &Structure, residue: &Residue) -> &'static str {
    let cutoff_sq = HIS_HBOND_CUTOFF * HIS_HBOND_CUTOFF;
    let has_partner_near = |atom: &Atom| {
        structure
            .iter_chains()
            .flat_map(|chain| chain.iter_residues())
            .filter(|other| !std::ptr::eq(*other, residue))
            .flat_map(|other| other.iter_atoms())
            .any(|other| {
                matches!(other.element, Element::O | Element::N)
                    && atom.distance_squared(other) < cutoff_sq
            })
    };

    let nd1 = residue.atom("ND1").is_some_and(has_partner_near);
    let ne2 = residue.atom("NE2").is_some_and(has_partner_near);

    match (nd1, ne2) {
        (true, false) => "HID",
        _ => "HIE",
    }
}

fn peptide_partner_c(prev: &Residue, residue: &Residue) -> Option<Point> {
    if !prev.is_amino_acid() {
        return None;
    }
    let c = prev.atom("C")?;
    let n = residue.atom("N")?;
    (c.distance(n) <= PEPTIDE_BOND_MAX).then_some(c.pos)
}

fn apply_plan(residue: &mut Residue, plan: &HydroPlan, config: &HydroConfig) -> Result<usize, Error> {
    if config.remove_existing_h {
        residue.strip_hydrogens();
    }
    let before = residue.atom_count();

    let is_amino_acid = residue.is_amino_acid();
    let n_terminal = is_amino_acid && residue.position == ResiduePosition::NTerminal;

    for (h_name, h_tmpl_pos, anchors) in plan.template.hydrogens() {
        if residue.has_atom(h_name) {
            continue;
        }

        let pos = if is_amino_acid && h_name == "H" {
            if n_terminal {
                continue;
            }
            match plan.prev_c {
                Some(prev_c) => amide_hydrogen(residue, prev_c)?,
                None => reconstruct_geometry(residue, plan.template, h_tmpl_pos, anchors)?,
            }
        } else {
            reconstruct_geometry(residue, plan.template, h_tmpl_pos, anchors)?
        };
        residue.add_atom(Atom::new(h_name, Element::H, pos));
    }

    if n_terminal {
        construct_n_term_hydrogens(residue, config.target_ph < N_TERM_PKA)?;
    }
    if is_amino_acid
        && residue.position == ResiduePosition::CTerminal
        && config.target_ph < C_TERM_PKA
    {
        construct_hydroxyl_hydrogen(residue, "HOXT", ["OXT", "C", "O"])?;
    }

    if residue.is_nucleotide() {
        match residue.position {
            ResiduePosition::ThreePrime => {
                construct_hydroxyl_hydrogen(residue, "HO3'", ["O3'", "C3'", "C4'"])?;
            }
            ResiduePosition::FivePrime if !residue.has_atom("P") => {
                construct_hydroxyl_hydrogen(residue, "HO5'", ["O5'", "C5'", "C4'"])?;
            }
            _ => {}
        }
    }

    Ok(residue.atom_count() - before)
}

fn anchor_pos(residue: &Residue, name: &str) -> Result<Point, Error> {
    residue
        .atom(name)
        .map(|a| a.pos)
        .ok_or_else(|| Error::incomplete_for_hydro(&residue.name, residue.id, name))
}

fn reconstruct_geometry(
    residue: &Residue,
    template: TemplateView<'static>,
    target_tmpl_pos: Point,
    anchor_names: &[String],
) -> Result<Point, Error> {
    let mut pairs = Vec::with_capacity(anchor_names.len());
    for name in anchor_names {
        let res_pos = anchor_pos(residue, name)?;
        let (_, tmpl_pos) = template
            .heavy_atom(name)
            .ok_or_else(|| Error::missing_template(template.name()))?;
        pairs.push((res_pos, tmpl_pos));
    }

    let (rotation, translation) = calculate_transform(&pairs).ok_or_else(|| {
        Error::alignment_failed(&residue.name, residue.id, "no anchors for hydrogen placement")
    })?;
    Ok(rotation * target_tmpl_pos + translation)
}

/// Places the backbone amide hydrogen on the external bisector of the CA–N–C(prev) angle.
fn amide_hydrogen(residue: &Residue, prev_c: Point) -> Result<Point, Error> {
    let n = anchor_pos(residue, "N")?;
    let ca = anchor_pos(residue, "CA")?;

    let bisector = (n - ca).normalize() + (n - prev_c).normalize();
    let direction = bisector
        .try_normalize(1e-6)
        .unwrap_or_else(|| perpendicular(&(ca - n)));
    Ok(n + direction * N_H_BOND_LENGTH)
}

fn construct_n_term_hydrogens(residue: &mut Residue, protonated: bool) -> Result<(), Error> {
    let n = anchor_pos(residue, "N")?;
    let ca = anchor_pos(residue, "CA")?;

    if residue.standard_name == Some(StandardResidue::PRO) {
        let cd = anchor_pos(residue, "CD")?;
        return construct_proline_n_term(residue, n, ca, cd, protonated);
    }

    let axis = (ca - n).normalize();
    let reference = residue
        .atom("C")
        .map(|c| c.pos - ca)
        .and_then(|v| (v - axis * v.dot(&axis)).try_normalize(1e-6))
        .unwrap_or_else(|| perpendicular(&axis));

    // Staggered against CA–C when viewed down the N–CA bond.
    let angle = TETRAHEDRAL_ANGLE.to_radians();
    let count = if protonated { 3 } else { 2 };
    for (name, phase) in ["H1", "H2", "H3"].into_iter().zip([180.0_f64, 300.0, 60.0]).take(count) {
        if residue.has_atom(name) {
            continue;
        }
        let spin = Rotation3::from_axis_angle(&Unit::new_normalize(axis), phase.to_radians());
        let direction = axis * angle.cos() + (spin * reference) * angle.sin();
        residue.add_atom(Atom::new(name, Element::H, n + direction * N_H_BOND_LENGTH));
    }

    Ok(())
}

fn construct_proline_n_term(
    residue: &mut Residue,
    n: Point,
    ca: Point,
    cd: Point,
    protonated: bool,
) -> Result<(), Error> {
    let v_ca = (ca - n).normalize();
    let v_cd = (cd - n).normalize();
    let bisector = -(v_ca + v_cd)
        .try_normalize(1e-6)
        .unwrap_or_else(|| perpendicular(&v_ca));

    let placements: Vec<(&str, Vector3<f64>)> = if protonated {
        let normal = v_ca.cross(&v_cd).try_normalize(1e-6).unwrap_or_else(|| perpendicular(&bisector));
        let half = (TETRAHEDRAL_ANGLE / 2.0).to_radians();
        vec![
            ("H2", bisector * half.cos() + normal * half.sin()),
            ("H3", bisector * half.cos() - normal * half.sin()),
        ]
    } else {
        vec![("H2", bisector)]
    };

    for (name, direction) in placements {
        if !residue.has_atom(name) {
            residue.add_atom(Atom::new(name, Element::H, n + direction * N_H_BOND_LENGTH));
        }
    }
    Ok(())
}

/// Adds a hydroxyl hydrogen on `oxygen`, tetrahedral to its `carbon` and anti to `reference`
/// when viewed down the O–C bond.
///
/// This protonates the acidic C-terminal carboxylate on OXT (anti to O) and caps free 5' and
/// 3' sugar ends.
fn construct_hydroxyl_hydrogen(
    residue: &mut Residue,
    h_name: &str,
    [oxygen, carbon, reference]: [&str; 3],
) -> Result<(), Error> {
    if residue.has_atom(h_name) {
        return Ok(());
    }

    let c = anchor_pos(residue, carbon)?;
    let o = anchor_pos(residue, oxygen)?;

    let to_c = (c - o)
        .try_normalize(1e-6)
        .ok_or_else(|| Error::incomplete_for_hydro(&residue.name, residue.id, oxygen))?;
    let away = residue
        .atom(reference)
        .map(|r| r.pos - c)
        .and_then(|v| (-(v - to_c * v.dot(&to_c))).try_normalize(1e-6))
        .unwrap_or_else(|| perpendicular(&to_c));

    let angle = TETRAHEDRAL_ANGLE.to_radians();
    let direction = to_c * angle.cos() + away * angle.sin();
    residue.add_atom(Atom::new(h_name, Element::H, o + direction * O_H_BOND_LENGTH));
    Ok(())
}

fn perpendicular(v: &Vector3<f64>) -> Vector3<f64> {
    let up = if v.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    v.cross(&up).normalize()
}
