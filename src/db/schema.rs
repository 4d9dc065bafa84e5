use crate::model::types::{Element, StandardResidue};
use serde::Deserialize;

/// One residue template document from `templates/`.
#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ResidueTemplateFile {
    pub info: TemplateInfo,
    #[serde(default)]
    pub atoms: Vec<TemplateHeavyAtom>,
    #[serde(default)]
    pub hydrogens: Vec<TemplateHydrogen>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct TemplateInfo {
    pub name: String,
    pub standard_name: StandardResidue,
    pub charge: i32,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct TemplateHeavyAtom {
    pub name: String,
    pub element: Element,
    pub pos: [f64; 3],
}

/// A template hydrogen and the heavy atoms used to superpose it onto a residue.
///
/// The first anchor is the heavy atom the hydrogen is bonded to.
#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct TemplateHydrogen {
    pub name: String,
    pub pos: [f64; 3],
    pub anchors: Vec<String>,
}
