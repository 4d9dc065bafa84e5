//! Legacy PDB reader.
//!
//! Reads the first model of a PDB file: `ATOM`/`HETATM` coordinates, the `SEQRES` sequence
//! declarations needed for missing-residue detection, and the `CRYST1` unit cell. Alternate
//! locations collapse onto the highest-occupancy copy of each atom.

use crate::io::builder::{AtomSite, StructureBuilder, cell_vectors, infer_element_from_name};
use crate::io::context::IoContext;
use crate::io::error::Error;
use crate::model::{
    atom::Atom,
    sequence::Sequence,
    structure::Structure,
    types::{Element, Point},
};
use std::io::BufRead;
use std::str::FromStr;

const FORMAT: &str = "PDB";

/// Parses a PDB stream into a [`Structure`].
///
/// Chains, residues, and atoms keep the order in which they first appear in the file.
/// Parsing stops at the first `ENDMDL`, so only the first model of an NMR ensemble is read.
///
/// # Errors
///
/// Returns [`Error::Parse`] for truncated or non-numeric coordinate records,
/// [`Error::InconsistentData`] for a degenerate unit cell or a file without atoms, and
/// [`Error::Io`] when the underlying reader fails.
pub fn read<R: BufRead>(reader: R, context: &IoContext) -> Result<Structure, Error> {
    let mut structure = Structure::new();
    let mut builder = StructureBuilder::new();
    let mut sequences: Vec<Sequence> = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line_num = index + 1;
        let line = line.map_err(|e| Error::from_io(e, None))?;

        if line.starts_with("ENDMDL") {
            break;
        }

        if line.starts_with("CRYST1") {
            structure.box_vectors = Some(parse_cryst1(&line, line_num)?);
        } else if line.starts_with("SEQRES") {
            parse_seqres(&line, line_num, context, &mut sequences)?;
        } else if line.starts_with("ATOM  ") || line.starts_with("HETATM") {
            parse_atom_record(&line, line_num, &mut builder)?;
        }
    }

    if builder.atom_count() == 0 {
        return Err(Error::inconsistent_data(
            FORMAT,
            None,
            "no ATOM or HETATM records found",
        ));
    }

    for sequence in sequences {
        structure.set_sequence(sequence);
    }

    Ok(builder.finish(structure, context))
}

fn parse_atom_record(
    line: &str,
    line_num: usize,
    builder: &mut StructureBuilder,
) -> Result<(), Error> {
    if line.len() < 54 || !line.is_ascii() {
        return Err(Error::parse(
            FORMAT,
            None,
            line_num,
            "Atom record too short",
        ));
    }

    let atom_field = &line[12..16];
    let res_seq = line[22..26]
        .trim()
        .parse::<i32>()
        .map_err(|_| Error::parse(FORMAT, None, line_num, "Invalid residue sequence number"))?;

    let coord = |range: std::ops::Range<usize>, axis: &str| {
        line[range].trim().parse::<f64>().map_err(|_| {
            Error::parse(FORMAT, None, line_num, format!("Invalid {axis} coordinate"))
        })
    };
    let pos = Point::new(coord(30..38, "X")?, coord(38..46, "Y")?, coord(46..54, "Z")?);

    let occupancy = line
        .get(54..60)
        .and_then(|s| s.trim().parse::<f64>().ok())
        .unwrap_or(1.0);

    let element = match line.get(76..78).map(str::trim) {
        Some(symbol) if !symbol.is_empty() => {
            Element::from_str(symbol).unwrap_or(Element::Unknown)
        }
        _ => infer_element_from_name(atom_field),
    };

    let site = AtomSite {
        chain_id: &line[21..22],
        res_seq,
        i_code: line[26..27].chars().next().filter(|c| *c != ' '),
        res_name: line[17..21].trim(),
        is_hetatm: line.starts_with("HETATM"),
        occupancy,
    };
    builder.push_atom(site, Atom::new(atom_field.trim(), element, pos));

    Ok(())
}

/// Appends the residue names of one `SEQRES` line to the sequence of its chain.
fn parse_seqres(
    line: &str,
    line_num: usize,
    context: &IoContext,
    sequences: &mut Vec<Sequence>,
) -> Result<(), Error> {
    let chain_id = line
        .get(11..12)
        .ok_or_else(|| Error::parse(FORMAT, None, line_num, "SEQRES record too short"))?;

    let position = match sequences.iter().position(|s| s.chain_id == chain_id) {
        Some(position) => position,
        None => {
            sequences.push(Sequence::new(chain_id));
            sequences.len() - 1
        }
    };

    for name in line.get(19..).unwrap_or("").split_whitespace() {
        sequences[position].push(context.resolve_name(name));
    }

    Ok(())
}

/// Converts a `CRYST1` record into box vectors (a along x, b in the xy-plane).
fn parse_cryst1(line: &str, line_num: usize) -> Result<[[f64; 3]; 3], Error> {
    if line.len() < 54 {
        return Err(Error::parse(
            FORMAT,
            None,
            line_num,
            "CRYST1 record too short",
        ));
    }

    let field = |range: std::ops::Range<usize>, default: f64| {
        line[range].trim().parse::<f64>().unwrap_or(default)
    };

    let a = field(6..15, 0.0);
    let b = field(15..24, 0.0);
    let c = field(24..33, 0.0);
    let alpha = field(33..40, 90.0).to_radians();
    let beta = field(40..47, 90.0).to_radians();
    let gamma = field(47..54, 90.0).to_radians();

    if a <= 0.0 || b <= 0.0 || c <= 0.0 {
        return Err(Error::inconsistent_data(
            FORMAT,
            None,
            "Invalid unit cell dimensions",
        ));
    }

    Ok(cell_vectors(a, b, c, alpha, beta, gamma))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::{ResidueCategory, ResiduePosition, StandardResidue};
    use std::io::Cursor;

    fn parse_result(pdb: &str) -> Result<Structure, Error> {
        let cursor = Cursor::new(pdb.as_bytes());
        read(cursor, &IoContext::new_default())
    }

    fn parse_structure(pdb: &str) -> Structure {
        parse_result(pdb).expect("PDB should parse")
    }

    #[test]
    fn read_parses_polymer_box_and_terminal_positions() {
        const PDB_DATA: &str = "\
            CRYST1   10.000   12.000   15.000  90.00  90.00  90.00 P 1           1\n\
            ATOM      1  N   ALA A   1      12.546  11.406   2.324  1.00 20.00           N\n\
            ATOM      2  CA  ALA A   1      13.123  12.345   3.210  1.00 20.00           C\n\
            ATOM      3  C   ALA A   1      14.456  11.987   4.123  1.00 20.00           C\n\
            ATOM      4  O   ALA A   1      15.123  12.456   4.987  1.00 20.00           O\n\
            ATOM      5  N   GLY A   2      14.789  10.654   4.890  1.00 20.00           N\n\
            ATOM      6  CA  GLY A   2      15.234  10.123   5.789  1.00 20.00           C\n\
            END\n";

        let structure = parse_structure(PDB_DATA);

        let box_vectors = structure.box_vectors.expect("CRYST1 sets box vectors");
        assert!((box_vectors[0][0] - 10.0).abs() < 1e-6);
        assert!((box_vectors[1][1] - 12.0).abs() < 1e-6);
        assert!((box_vectors[2][2] - 15.0).abs() < 1e-6);

        let chain = structure.chain("A").unwrap();
        let residues = chain.residues();
        assert_eq!(residues.len(), 2);
        assert_eq!(residues[0].standard_name, Some(StandardResidue::ALA));
        assert_eq!(residues[0].position, ResiduePosition::NTerminal);
        assert_eq!(residues[1].position, ResiduePosition::CTerminal);
        assert!(!residues[0].is_hetatm);

        let names: Vec<&str> = residues[0].iter_atoms().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["N", "CA", "C", "O"], "file order is preserved");
    }

    #[test]
    fn read_collects_seqres_per_chain_with_aliases_resolved() {
        const PDB_DATA: &str = "\
            SEQRES   1 A    5  MET HIE GLY SER ALA                                      \n\
            SEQRES   1 B    2  GLY GLY                                                  \n\
            SEQRES   2 A    5  LYS                                                      \n\
            ATOM      1  CA  GLY A   3       0.000   0.000   0.000  1.00 20.00           C\n\
            ATOM      2  CA  GLY B   1       5.000   0.000   0.000  1.00 20.00           C\n";

        let structure = parse_structure(PDB_DATA);

        let seq_a = structure.sequence("A").expect("chain A sequence");
        assert_eq!(seq_a.residues(), &["MET", "HIS", "GLY", "SER", "ALA", "LYS"]);
        assert_eq!(structure.sequence("B").unwrap().len(), 2);
    }

    #[test]
    fn read_stops_after_first_model() {
        const PDB_DATA: &str = "\
            MODEL        1\n\
            ATOM      1  CA  GLY A   1       0.000   0.000   0.000  1.00 20.00           C\n\
            ENDMDL\n\
            MODEL        2\n\
            ATOM      1  CA  GLY A   1       9.000   9.000   9.000  1.00 20.00           C\n\
            ATOM      2  CA  GLY A   2       9.000   9.000   9.000  1.00 20.00           C\n\
            ENDMDL\n";

        let structure = parse_structure(PDB_DATA);

        assert_eq!(structure.residue_count(), 1);
        let ca = structure.find_residue("A", 1, None).unwrap().atom("CA").unwrap();
        assert_eq!(ca.pos, Point::new(0.0, 0.0, 0.0));
    }

    #[test]
    fn read_aliases_water_and_detects_ions() {
        const PDB_DATA: &str = "\
            HETATM    1  O   WAT B   5       0.000   0.000   0.000  0.30 20.00           O\n\
            HETATM    2  O   WAT B   5       1.000   1.000   1.000  0.80 20.00           O\n\
            HETATM    3 NA    NA B   6       5.000   5.000   5.000  1.00 20.00          NA\n";

        let structure = parse_structure(PDB_DATA);
        let chain = structure.chain("B").unwrap();

        let water = chain.residue(5, None).unwrap();
        assert_eq!(water.name, "HOH");
        assert_eq!(water.category, ResidueCategory::Standard);
        assert!(water.is_hetatm);
        assert_eq!(water.atom_count(), 1);
        assert!((water.atom("O").unwrap().pos.x - 1.0).abs() < 1e-6);

        let ion = chain.residue(6, None).unwrap();
        assert_eq!(ion.category, ResidueCategory::Ion);
        assert_eq!(ion.atom("NA").unwrap().element, Element::Na);
        assert_eq!(ion.position, ResiduePosition::None);
    }

    #[test]
    fn read_keeps_unknown_atom_residues_as_hetero() {
        const PDB_DATA: &str = "\
            ATOM      1  N   MSE A   1       0.000   0.000   0.000  1.00 20.00           N\n\
            ATOM      2 SE   MSE A   1       1.000   0.000   0.000  1.00 20.00          SE\n";

        let structure = parse_structure(PDB_DATA);
        let residue = structure.find_residue("A", 1, None).unwrap();

        assert_eq!(residue.name, "MSE");
        assert_eq!(residue.category, ResidueCategory::Hetero);
        assert!(!residue.is_hetatm);
        assert_eq!(residue.atom("SE").unwrap().element, Element::Se);
    }

    #[test]
    fn read_supports_insertion_codes_in_file_order() {
        const PDB_DATA: &str = "\
            ATOM      1  CA  SER E  10       0.000   0.000   0.000  1.00 10.00           C\n\
            ATOM      2  CA  SER E  10A      1.500   1.500   1.500  1.00 10.00           C\n\
            ATOM      3  CA  SER E  11       2.500   2.500   2.500  1.00 10.00           C\n";

        let structure = parse_structure(PDB_DATA);
        let keys: Vec<_> = structure
            .chain("E")
            .unwrap()
            .iter_residues()
            .map(|r| (r.id, r.insertion_code))
            .collect();

        assert_eq!(keys, vec![(10, None), (10, Some('A')), (11, None)]);
    }

    #[test]
    fn read_infers_elements_when_columns_are_blank() {
        const PDB_DATA: &str = "\
            ATOM      1  CA  GLY A   1       0.000   0.000   0.000  1.00 20.00\n\
            HETATM    2 ZN    ZN A 101       3.000   0.000   0.000  1.00 20.00\n";

        let structure = parse_structure(PDB_DATA);

        let ca = structure.find_residue("A", 1, None).unwrap().atom("CA").unwrap();
        assert_eq!(ca.element, Element::C);
        let zn = structure.find_residue("A", 101, None).unwrap().atom("ZN").unwrap();
        assert_eq!(zn.element, Element::Zn);
    }

    #[test]
    fn read_rejects_malformed_coordinates() {
        const PDB_DATA: &str = "\
            ATOM      1  CA  GLY A   1       abc     0.000   0.000  1.00 20.00           C\n";

        match parse_result(PDB_DATA) {
            Err(Error::Parse { line_number, details, .. }) => {
                assert_eq!(line_number, 1);
                assert!(details.contains("X coordinate"));
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn read_rejects_files_without_atoms() {
        let result = parse_result("HEADER    EMPTY\nEND\n");

        assert!(matches!(result, Err(Error::InconsistentData { .. })));
    }

    #[test]
    fn read_rejects_degenerate_unit_cell() {
        const PDB_DATA: &str = "\
            CRYST1    0.000    0.000    0.000  90.00  90.00  90.00 P 1           1\n";

        assert!(matches!(
            parse_result(PDB_DATA),
            Err(Error::InconsistentData { .. })
        ));
    }
}
