use crate::model::types::StandardResidue;
use std::collections::HashMap;

/// Residue-name normalization tables shared by the readers.
///
/// Only *naming* variants are folded onto a standard residue: force-field protonation labels
/// (`HID`, `CYX`, `ASH`, ...), CHARMM histidine names, water models, and alternative nucleotide
/// spellings. Chemically modified residues such as `MSE` keep their own name and are treated
/// as hetero groups, so they are written back unchanged.
#[derive(Debug, Clone)]
pub struct IoContext {
    alias_map: HashMap<String, String>,
    standard_map: HashMap<String, StandardResidue>,
}

impl IoContext {
    pub fn new_default() -> Self {
        let mut alias_map = HashMap::new();
        let mut standard_map = HashMap::new();

        macro_rules! register_standard {
            ($canonical:expr, $enum_val:expr) => {
                alias_map.insert($canonical.to_string(), $canonical.to_string());
                standard_map.insert($canonical.to_string(), $enum_val);
            };
        }

        macro_rules! register_alias {
            ($canonical:expr => $($alias:expr),+ $(,)?) => {
                $(alias_map.insert($alias.to_string(), $canonical.to_string());)+
            };
        }

        register_standard!("ALA", StandardResidue::ALA);
        register_standard!("ARG", StandardResidue::ARG);
        register_standard!("ASN", StandardResidue::ASN);
        register_standard!("ASP", StandardResidue::ASP);
        register_standard!("CYS", StandardResidue::CYS);
        register_standard!("GLN", StandardResidue::GLN);
        register_standard!("GLU", StandardResidue::GLU);
        register_standard!("GLY", StandardResidue::GLY);
        register_standard!("HIS", StandardResidue::HIS);
        register_standard!("ILE", StandardResidue::ILE);
        register_standard!("LEU", StandardResidue::LEU);
        register_standard!("LYS", StandardResidue::LYS);
        register_standard!("MET", StandardResidue::MET);
        register_standard!("PHE", StandardResidue::PHE);
        register_standard!("PRO", StandardResidue::PRO);
        register_standard!("SER", StandardResidue::SER);
        register_standard!("THR", StandardResidue::THR);
        register_standard!("TRP", StandardResidue::TRP);
        register_standard!("TYR", StandardResidue::TYR);
        register_standard!("VAL", StandardResidue::VAL);

        register_standard!("DA", StandardResidue::DA);
        register_standard!("DC", StandardResidue::DC);
        register_standard!("DG", StandardResidue::DG);
        register_standard!("DT", StandardResidue::DT);
        register_standard!("DI", StandardResidue::DI);

        register_standard!("A", StandardResidue::A);
        register_standard!("C", StandardResidue::C);
        register_standard!("G", StandardResidue::G);
        register_standard!("U", StandardResidue::U);
        register_standard!("I", StandardResidue::I);

        register_standard!("HOH", StandardResidue::HOH);

        register_alias!("ARG" => "ARN");
        register_alias!("ASP" => "ASH", "ASPP");
        register_alias!("CYS" => "CYX", "CYM", "CYS2");
        register_alias!("GLU" => "GLH", "GLUP");
        register_alias!("HIS" => "HID", "HIE", "HIP", "HSD", "HSE", "HSP", "HISD", "HISE", "HISH");
        register_alias!("LYS" => "LYN", "LSN");
        register_alias!("TYR" => "TYM");

        register_alias!("DA" => "DA5", "DA3", "DAN");
        register_alias!("DC" => "DC5", "DC3", "DCN");
        register_alias!("DG" => "DG5", "DG3", "DGN");
        register_alias!("DT" => "DT5", "DT3", "DTN", "THY");
        register_alias!("A" => "RA", "RA5", "RA3", "A5", "A3");
        register_alias!("C" => "RC", "RC5", "RC3", "C5", "C3");
        register_alias!("G" => "RG", "RG5", "RG3", "G5", "G3");
        register_alias!("U" => "RU", "RU5", "RU3", "U5", "U3", "URA");

        register_alias!("HOH" => "WAT", "H2O", "SOL", "TIP", "TIP3", "TP3", "TIP4", "SPC", "DOD", "D2O");

        Self {
            alias_map,
            standard_map,
        }
    }

    pub fn resolve_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.alias_map.get(name).map(|s| s.as_str()).unwrap_or(name)
    }

    pub fn map_to_standard(&self, name: &str) -> Option<StandardResidue> {
        self.standard_map.get(name).copied()
    }

    pub fn add_alias(&mut self, alias: impl Into<String>, canonical: impl Into<String>) {
        self.alias_map.insert(alias.into(), canonical.into());
    }

    /// Resolves a raw residue name to its canonical spelling and standard residue, if any.
    pub fn classify_residue(&self, raw_name: &str) -> (String, Option<StandardResidue>) {
        let canonical = self.resolve_name(raw_name);
        let standard = self.map_to_standard(canonical);
        (canonical.to_string(), standard)
    }
}

impl Default for IoContext {
    fn default() -> Self {
        Self::new_default()
    }
}
