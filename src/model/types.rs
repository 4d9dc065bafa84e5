use nalgebra::Point3;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

pub type Point = Point3<f64>;

/// Chemical elements encountered in macromolecular coordinate files.
///
/// The set covers the biopolymer elements plus the metals, halogens, and counter-ions
/// that commonly appear as hetero groups. Anything else maps to [`Element::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[repr(u8)]
pub enum Element {
    H = 1,
    Li = 3,
    B = 5,
    C = 6,
    N = 7,
    O = 8,
    F = 9,
    Na = 11,
    Mg = 12,
    Al = 13,
    Si = 14,
    P = 15,
    S = 16,
    Cl = 17,
    K = 19,
    Ca = 20,
    V = 23,
    Mn = 25,
    Fe = 26,
    Co = 27,
    Ni = 28,
    Cu = 29,
    Zn = 30,
    As = 33,
    Se = 34,
    Br = 35,
    Rb = 37,
    Sr = 38,
    Mo = 42,
    Ag = 47,
    Cd = 48,
    I = 53,
    Cs = 55,
    Ba = 56,
    W = 74,
    Pt = 78,
    Au = 79,
    Hg = 80,
    Pb = 82,
    Unknown = 0,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum StandardResidue {
    ALA,
    ARG,
    ASN,
    ASP,
    CYS,
    GLN,
    GLU,
    GLY,
    HIS,
    ILE,
    LEU,
    LYS,
    MET,
    PHE,
    PRO,
    SER,
    THR,
    TRP,
    TYR,
    VAL,
    A,
    C,
    G,
    U,
    I,
    DA,
    DC,
    DG,
    DT,
    DI,
    HOH,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResidueCategory {
    Standard,
    Hetero,
    Ion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResiduePosition {
    None,
    Internal,
    NTerminal,
    CTerminal,
    FivePrime,
    ThreePrime,
}

impl ResidueCategory {
    pub fn name(&self) -> &'static str {
        match self {
            ResidueCategory::Standard => "Standard Residue",
            ResidueCategory::Hetero => "Hetero Residue",
            ResidueCategory::Ion => "Ion",
        }
    }
}

impl fmt::Display for ResidueCategory {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl ResiduePosition {
    pub fn name(&self) -> &'static str {
        match self {
            ResiduePosition::None => "None",
            ResiduePosition::Internal => "Internal",
            ResiduePosition::NTerminal => "N-Terminal",
            ResiduePosition::CTerminal => "C-Terminal",
            ResiduePosition::FivePrime => "5'-Terminal",
            ResiduePosition::ThreePrime => "3'-Terminal",
        }
    }
}

impl fmt::Display for ResiduePosition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl Element {
    pub fn symbol(&self) -> &'static str {
        match self {
            Element::H => "H",
            Element::Li => "Li",
            Element::B => "B",
            Element::C => "C",
            Element::N => "N",
            Element::O => "O",
            Element::F => "F",
            Element::Na => "Na",
            Element::Mg => "Mg",
            Element::Al => "Al",
            Element::Si => "Si",
            Element::P => "P",
            Element::S => "S",
            Element::Cl => "Cl",
            Element::K => "K",
            Element::Ca => "Ca",
            Element::V => "V",
            Element::Mn => "Mn",
            Element::Fe => "Fe",
            Element::Co => "Co",
            Element::Ni => "Ni",
            Element::Cu => "Cu",
            Element::Zn => "Zn",
            Element::As => "As",
            Element::Se => "Se",
            Element::Br => "Br",
            Element::Rb => "Rb",
            Element::Sr => "Sr",
            Element::Mo => "Mo",
            Element::Ag => "Ag",
            Element::Cd => "Cd",
            Element::I => "I",
            Element::Cs => "Cs",
            Element::Ba => "Ba",
            Element::W => "W",
            Element::Pt => "Pt",
            Element::Au => "Au",
            Element::Hg => "Hg",
            Element::Pb => "Pb",
            Element::Unknown => "X",
        }
    }

    pub fn is_heavy_atom(&self) -> bool {
        !matches!(self, Element::H)
    }

    pub fn is_metal(&self) -> bool {
        matches!(
            self,
            Element::Li
                | Element::Na
                | Element::Mg
                | Element::Al
                | Element::K
                | Element::Ca
                | Element::V
                | Element::Mn
                | Element::Fe
                | Element::Co
                | Element::Ni
                | Element::Cu
                | Element::Zn
                | Element::Rb
                | Element::Sr
                | Element::Mo
                | Element::Ag
                | Element::Cd
                | Element::Cs
                | Element::Ba
                | Element::W
                | Element::Pt
                | Element::Au
                | Element::Hg
                | Element::Pb
        )
    }

    /// Single-bond covalent radius in Ångström (Cordero et al., 2008).
    pub fn covalent_radius(&self) -> f64 {
        match self {
            Element::H => 0.31,
            Element::Li => 1.28,
            Element::B => 0.84,
            Element::C => 0.76,
            Element::N => 0.71,
            Element::O => 0.66,
            Element::F => 0.57,
            Element::Na => 1.66,
            Element::Mg => 1.41,
            Element::Al => 1.21,
            Element::Si => 1.11,
            Element::P => 1.07,
            Element::S => 1.05,
            Element::Cl => 1.02,
            Element::K => 2.03,
            Element::Ca => 1.76,
            Element::V => 1.53,
            Element::Mn => 1.39,
            Element::Fe => 1.32,
            Element::Co => 1.26,
            Element::Ni => 1.24,
            Element::Cu => 1.32,
            Element::Zn => 1.22,
            Element::As => 1.19,
            Element::Se => 1.20,
            Element::Br => 1.20,
            Element::Rb => 2.20,
            Element::Sr => 1.95,
            Element::Mo => 1.54,
            Element::Ag => 1.45,
            Element::Cd => 1.44,
            Element::I => 1.39,
            Element::Cs => 2.44,
            Element::Ba => 2.15,
            Element::W => 1.62,
            Element::Pt => 1.36,
            Element::Au => 1.36,
            Element::Hg => 1.32,
            Element::Pb => 1.46,
            Element::Unknown => 0.0,
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl FromStr for Element {
    type Err = String;

    /// Parses an element symbol without regard to case, so PDB element columns such as
    /// `"FE"` or `"CL"` resolve like their canonical spellings. Unrecognized symbols map
    /// to [`Element::Unknown`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let symbol = s.trim();
        if symbol.is_empty() {
            return Err("Empty element symbol".to_string());
        }

        let element = match symbol.to_ascii_uppercase().as_str() {
            "H" | "D" => Element::H,
            "LI" => Element::Li,
            "B" => Element::B,
            "C" => Element::C,
            "N" => Element::N,
            "O" => Element::O,
            "F" => Element::F,
            "NA" => Element::Na,
            "MG" => Element::Mg,
            "AL" => Element::Al,
            "SI" => Element::Si,
            "P" => Element::P,
            "S" => Element::S,
            "CL" => Element::Cl,
            "K" => Element::K,
            "CA" => Element::Ca,
            "V" => Element::V,
            "MN" => Element::Mn,
            "FE" => Element::Fe,
            "CO" => Element::Co,
            "NI" => Element::Ni,
            "CU" => Element::Cu,
            "ZN" => Element::Zn,
            "AS" => Element::As,
            "SE" => Element::Se,
            "BR" => Element::Br,
            "RB" => Element::Rb,
            "SR" => Element::Sr,
            "MO" => Element::Mo,
            "AG" => Element::Ag,
            "CD" => Element::Cd,
            "I" => Element::I,
            "CS" => Element::Cs,
            "BA" => Element::Ba,
            "W" => Element::W,
            "PT" => Element::Pt,
            "AU" => Element::Au,
            "HG" => Element::Hg,
            "PB" => Element::Pb,
            _ => Element::Unknown,
        };
        Ok(element)
    }
}

impl StandardResidue {
    pub fn code(&self) -> &'static str {
        match self {
            StandardResidue::ALA => "ALA",
            StandardResidue::ARG => "ARG",
            StandardResidue::ASN => "ASN",
            StandardResidue::ASP => "ASP",
            StandardResidue::CYS => "CYS",
            StandardResidue::GLN => "GLN",
            StandardResidue::GLU => "GLU",
            StandardResidue::GLY => "GLY",
            StandardResidue::HIS => "HIS",
            StandardResidue::ILE => "ILE",
            StandardResidue::LEU => "LEU",
            StandardResidue::LYS => "LYS",
            StandardResidue::MET => "MET",
            StandardResidue::PHE => "PHE",
            StandardResidue::PRO => "PRO",
            StandardResidue::SER => "SER",
            StandardResidue::THR => "THR",
            StandardResidue::TRP => "TRP",
            StandardResidue::TYR => "TYR",
            StandardResidue::VAL => "VAL",
            StandardResidue::A => "A",
            StandardResidue::C => "C",
            StandardResidue::G => "G",
            StandardResidue::U => "U",
            StandardResidue::I => "I",
            StandardResidue::DA => "DA",
            StandardResidue::DC => "DC",
            StandardResidue::DG => "DG",
            StandardResidue::DT => "DT",
            StandardResidue::DI => "DI",
            StandardResidue::HOH => "HOH",
        }
    }

    pub fn is_amino_acid(&self) -> bool {
        matches!(
            self,
            StandardResidue::ALA
                | StandardResidue::ARG
                | StandardResidue::ASN
                | StandardResidue::ASP
                | StandardResidue::CYS
                | StandardResidue::GLN
                | StandardResidue::GLU
                | StandardResidue::GLY
                | StandardResidue::HIS
                | StandardResidue::ILE
                | StandardResidue::LEU
                | StandardResidue::LYS
                | StandardResidue::MET
                | StandardResidue::PHE
                | StandardResidue::PRO
                | StandardResidue::SER
                | StandardResidue::THR
                | StandardResidue::TRP
                | StandardResidue::TYR
                | StandardResidue::VAL
        )
    }

    pub fn is_nucleotide(&self) -> bool {
        !self.is_amino_acid() && *self != StandardResidue::HOH
    }
}

impl fmt::Display for StandardResidue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for StandardResidue {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ALA" => Ok(StandardResidue::ALA),
            "ARG" => Ok(StandardResidue::ARG),
            "ASN" => Ok(StandardResidue::ASN),
            "ASP" => Ok(StandardResidue::ASP),
            "CYS" => Ok(StandardResidue::CYS),
            "GLN" => Ok(StandardResidue::GLN),
            "GLU" => Ok(StandardResidue::GLU),
            "GLY" => Ok(StandardResidue::GLY),
            "HIS" => Ok(StandardResidue::HIS),
            "ILE" => Ok(StandardResidue::ILE),
            "LEU" => Ok(StandardResidue::LEU),
            "LYS" => Ok(StandardResidue::LYS),
            "MET" => Ok(StandardResidue::MET),
            "PHE" => Ok(StandardResidue::PHE),
            "PRO" => Ok(StandardResidue::PRO),
            "SER" => Ok(StandardResidue::SER),
            "THR" => Ok(StandardResidue::THR),
            "TRP" => Ok(StandardResidue::TRP),
            "TYR" => Ok(StandardResidue::TYR),
            "VAL" => Ok(StandardResidue::VAL),
            "A" => Ok(StandardResidue::A),
            "C" => Ok(StandardResidue::C),
            "G" => Ok(StandardResidue::G),
            "U" => Ok(StandardResidue::U),
            "I" => Ok(StandardResidue::I),
            "DA" => Ok(StandardResidue::DA),
            "DC" => Ok(StandardResidue::DC),
            "DG" => Ok(StandardResidue::DG),
            "DT" => Ok(StandardResidue::DT),
            "DI" => Ok(StandardResidue::DI),
            "HOH" => Ok(StandardResidue::HOH),
            _ => Err(format!("Invalid standard residue: {}", s)),
        }
    }
}
