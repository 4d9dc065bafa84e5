use crate::io::error::Error;
use crate::model::{
    atom::Atom, residue::Residue, sequence::Sequence, structure::Structure, topology::Topology,
};
use std::collections::BTreeMap;
use std::io::Write;

const FORMAT: &str = "PDB";
/// Serial numbers wrap to fit the five-column field: atom 100000 is written as 0.
const SERIAL_MODULUS: usize = 100_000;
const SEQRES_PER_LINE: usize = 13;
const CONECT_PER_LINE: usize = 4;

/// Writes coordinates, declared sequences, and the unit cell as PDB records.
///
/// # Errors
///
/// Returns [`Error::InconsistentData`] when a chain identifier is longer than one character,
/// and [`Error::Io`] on write failures. Serial numbers past 99999 wrap around.
pub fn write_structure<W: Write>(writer: W, structure: &Structure) -> Result<(), Error> {
    let mut ctx = WriterContext::new(writer);

    ctx.write_cryst1(structure.box_vectors)?;
    ctx.write_seqres(structure.sequences())?;
    ctx.write_atoms(structure)?;
    ctx.write_end()?;

    Ok(())
}

/// Same as [`write_structure`] followed by `CONECT` records for every topology bond.
pub fn write_topology<W: Write>(writer: W, topology: &Topology) -> Result<(), Error> {
    let mut ctx = WriterContext::new(writer);
    let structure = topology.structure();

    ctx.write_cryst1(structure.box_vectors)?;
    ctx.write_seqres(structure.sequences())?;
    ctx.write_atoms(structure)?;
    ctx.write_connects(topology)?;
    ctx.write_end()?;

    Ok(())
}

struct WriterContext<W> {
    writer: W,
    current_serial: usize,
    atom_serials: Vec<usize>,
}

impl<W: Write> WriterContext<W> {
    fn new(writer: W) -> Self {
        Self {
            writer,
            current_serial: 1,
            atom_serials: Vec::new(),
        }
    }

    fn write_cryst1(&mut self, box_vectors: Option<[[f64; 3]; 3]>) -> Result<(), Error> {
        if let Some(vectors) = box_vectors {
            let v1 = nalgebra::Vector3::from(vectors[0]);
            let v2 = nalgebra::Vector3::from(vectors[1]);
            let v3 = nalgebra::Vector3::from(vectors[2]);

            let a = v1.norm();
            let b = v2.norm();
            let c = v3.norm();

            let alpha = v2.angle(&v3).to_degrees();
            let beta = v1.angle(&v3).to_degrees();
            let gamma = v1.angle(&v2).to_degrees();

            writeln!(
                self.writer,
                "CRYST1{:9.3}{:9.3}{:9.3}{:7.2}{:7.2}{:7.2} P 1           1",
                a, b, c, alpha, beta, gamma
            )
            .map_err(|e| Error::from_io(e, None))?;
        }
        Ok(())
    }

    fn write_seqres(&mut self, sequences: &[Sequence]) -> Result<(), Error> {
        for sequence in sequences.iter().filter(|s| !s.is_empty()) {
            let chain_id = single_char_chain_id(&sequence.chain_id)?;

            for (line_idx, chunk) in sequence.residues().chunks(SEQRES_PER_LINE).enumerate() {
                let names: Vec<String> = chunk.iter().map(|name| format!("{name:>3}")).collect();
                writeln!(
                    self.writer,
                    "SEQRES {:>3} {} {:>4}  {}",
                    line_idx + 1,
                    chain_id,
                    sequence.len(),
                    names.join(" ")
                )
                .map_err(|e| Error::from_io(e, None))?;
            }
        }
        Ok(())
    }

    fn write_atoms(&mut self, structure: &Structure) -> Result<(), Error> {
        for chain in structure.iter_chains() {
            let chain_id = single_char_chain_id(&chain.id)?;

            for residue in chain.iter_residues() {
                let record_type = if residue.is_hetatm { "HETATM" } else { "ATOM  " };
                for atom in residue.iter_atoms() {
                    let serial = self.next_serial();
                    self.atom_serials.push(serial);
                    self.write_atom_record(record_type, serial, atom, residue, chain_id)?;
                }
            }

            let last_polymer = chain.iter_residues().rev().find(|res| {
                res.standard_name
                    .is_some_and(|std| std.is_amino_acid() || std.is_nucleotide())
            });
            if let Some(last_polymer) = last_polymer {
                let serial = self.next_serial();
                self.write_ter_record(serial, last_polymer, chain_id)?;
            }
        }
        Ok(())
    }

    fn next_serial(&mut self) -> usize {
        let serial = self.current_serial % SERIAL_MODULUS;
        self.current_serial += 1;
        serial
    }

    fn write_atom_record(
        &mut self,
        record_type: &str,
        serial: usize,
        atom: &Atom,
        residue: &Residue,
        chain_id: char,
    ) -> Result<(), Error> {
        let atom_name = if atom.name.len() >= 4 {
            format!("{:<4}", &atom.name[0..4])
        } else if atom.element.symbol().len() == 1 {
            format!(" {:<3}", atom.name)
        } else {
            format!("{:<4}", atom.name)
        };

        let element_str = format!("{:>2}", atom.element.symbol().to_uppercase());

        writeln!(
            self.writer,
            "{:6}{:5} {:4}{:1}{:>3} {:1}{:4}{:1}   {:8.3}{:8.3}{:8.3}{:6.2}{:6.2}          {:2}",
            record_type,
            serial,
            atom_name,
            ' ',
            residue_name(residue),
            chain_id,
            residue.id % 10000,
            residue.insertion_code.unwrap_or(' '),
            atom.pos.x,
            atom.pos.y,
            atom.pos.z,
            1.00,
            0.00,
            element_str
        )
        .map_err(|e| Error::from_io(e, None))
    }

    fn write_ter_record(
        &mut self,
        serial: usize,
        residue: &Residue,
        chain_id: char,
    ) -> Result<(), Error> {
        writeln!(
            self.writer,
            "TER   {:5}      {:>3} {:1}{:4}{:1}",
            serial,
            residue_name(residue),
            chain_id,
            residue.id % 10000,
            residue.insertion_code.unwrap_or(' ')
        )
        .map_err(|e| Error::from_io(e, None))
    }

    fn write_connects(&mut self, topology: &Topology) -> Result<(), Error> {
        let mut adjacency: BTreeMap<usize, Vec<usize>> = BTreeMap::new();

        for bond in topology.bonds() {
            let s1 = self.serial_of(bond.a1_idx)?;
            let s2 = self.serial_of(bond.a2_idx)?;

            adjacency.entry(s1).or_default().push(s2);
            adjacency.entry(s2).or_default().push(s1);
        }

        for (src_serial, mut targets) in adjacency {
            targets.sort_unstable();
            targets.dedup();

            for chunk in targets.chunks(CONECT_PER_LINE) {
                write!(self.writer, "CONECT{:5}", src_serial)
                    .map_err(|e| Error::from_io(e, None))?;
                for target in chunk {
                    write!(self.writer, "{:5}", target).map_err(|e| Error::from_io(e, None))?;
                }
                writeln!(self.writer).map_err(|e| Error::from_io(e, None))?;
            }
        }

        Ok(())
    }

    fn serial_of(&self, atom_idx: usize) -> Result<usize, Error> {
        self.atom_serials.get(atom_idx).copied().ok_or_else(|| {
            Error::inconsistent_data(
                FORMAT,
                None,
                format!("bond references atom index {atom_idx} that was not written"),
            )
        })
    }

    fn write_end(&mut self) -> Result<(), Error> {
        writeln!(self.writer, "END   ").map_err(|e| Error::from_io(e, None))?;
        self.writer.flush().map_err(|e| Error::from_io(e, None))
    }
}

fn single_char_chain_id(id: &str) -> Result<char, Error> {
    let mut chars = id.chars();
    match (chars.next(), chars.next()) {
        (None, _) => Ok(' '),
        (Some(c), None) => Ok(c),
        (Some(_), Some(_)) => Err(Error::inconsistent_data(
            FORMAT,
            None,
            format!("chain identifier '{id}' does not fit the single-character PDB column"),
        )),
    }
}

fn residue_name(residue: &Residue) -> &str {
    residue.name.get(0..3).unwrap_or(&residue.name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::atom::Atom;
    use crate::model::chain::Chain;
    use crate::model::residue::Residue;
    use crate::model::topology::{Bond, Topology};
    use crate::model::types::{Element, Point, ResidueCategory, StandardResidue};

    fn assert_cryst1_line(line: &str, params: (f64, f64, f64, f64, f64, f64)) {
        assert!(line.starts_with("CRYST1"));
        let (a, b, c, alpha, beta, gamma) = params;
        assert!((parse_float(&line[6..15]) - a).abs() < 1e-3);
        assert!((parse_float(&line[15..24]) - b).abs() < 1e-3);
        assert!((parse_float(&line[24..33]) - c).abs() < 1e-3);
        assert!((parse_float(&line[33..40]) - alpha).abs() < 1e-2);
        assert!((parse_float(&line[40..47]) - beta).abs() < 1e-2);
        assert!((parse_float(&line[47..54]) - gamma).abs() < 1e-2);
    }

    #[allow(clippy::too_many_arguments)]
    fn assert_atom_line(
        line: &str,
        record: &str,
        serial: usize,
        atom_name: &str,
        res_name: &str,
        chain_id: char,
        res_seq: i32,
        coords: (f64, f64, f64),
        element: &str,
    ) {
        assert!(line.len() >= 78, "line too short: {line}");
        assert_eq!(&line[0..6], record);
        assert_eq!(line[6..11].trim(), serial.to_string());
        assert_eq!(line[12..16].trim(), atom_name);
        assert_eq!(line[17..20].trim(), res_name);
        assert_eq!(line.chars().nth(21).unwrap(), chain_id);
        assert_eq!(line[22..26].trim(), res_seq.to_string());
        assert!((parse_float(&line[30..38]) - coords.0).abs() < 1e-3);
        assert!((parse_float(&line[38..46]) - coords.1).abs() < 1e-3);
        assert!((parse_float(&line[46..54]) - coords.2).abs() < 1e-3);
        assert_eq!(line[76..78].trim(), element);
    }

    fn assert_conect_line(line: &str, source: usize, targets: &[usize]) {
        let tokens: Vec<_> = line.split_whitespace().collect();
        assert_eq!(tokens[0], "CONECT");
        assert_eq!(tokens[1].parse::<usize>().unwrap(), source);
        let parsed_targets: Vec<_> = tokens[2..]
            .iter()
            .map(|tok| tok.parse::<usize>().unwrap())
            .collect();
        assert_eq!(parsed_targets, targets);
    }

    fn parse_float(slice: &str) -> f64 {
        slice.trim().parse::<f64>().expect("valid float")
    }

    fn write_to_string(structure: &Structure) -> String {
        let mut buffer = Vec::new();
        write_structure(&mut buffer, structure).expect("writer should succeed");
        String::from_utf8(buffer).expect("valid UTF-8")
    }

    fn gly_lig_structure() -> Structure {
        let mut structure = Structure::new();
        let mut chain = Chain::new("A");

        let mut gly = Residue::new(
            1,
            None,
            "GLY",
            Some(StandardResidue::GLY),
            ResidueCategory::Standard,
        );
        gly.add_atom(Atom::new("N", Element::N, Point::new(1.0, 2.0, 3.0)));
        gly.add_atom(Atom::new("CA", Element::C, Point::new(1.5, 2.5, 3.5)));

        let mut lig = Residue::new(2, None, "LIG", None, ResidueCategory::Hetero);
        lig.add_atom(Atom::new("C1", Element::C, Point::new(4.0, 5.0, 6.0)));

        chain.add_residue(gly);
        chain.add_residue(lig);
        structure.add_chain(chain);
        structure
    }

    #[test]
    fn write_structure_emits_cryst1_atoms_ter_and_end() {
        let mut structure = gly_lig_structure();
        structure.box_vectors = Some([[10.0, 0.0, 0.0], [0.0, 11.0, 0.0], [0.0, 0.0, 12.0]]);

        let output = write_to_string(&structure);
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 6, "unexpected number of lines: {lines:?}");

        assert_cryst1_line(lines[0], (10.0, 11.0, 12.0, 90.0, 90.0, 90.0));
        assert_atom_line(lines[1], "ATOM  ", 1, "N", "GLY", 'A', 1, (1.0, 2.0, 3.0), "N");
        assert_atom_line(lines[2], "ATOM  ", 2, "CA", "GLY", 'A', 1, (1.5, 2.5, 3.5), "C");
        assert_atom_line(lines[3], "HETATM", 3, "C1", "LIG", 'A', 2, (4.0, 5.0, 6.0), "C");
        assert!(lines[4].starts_with("TER       4      GLY A   1"));
        assert_eq!(lines[5], "END   ");
    }

    #[test]
    fn write_structure_emits_seqres_in_lines_of_thirteen() {
        let mut structure = gly_lig_structure();
        let names = [
            "MET", "GLY", "ALA", "SER", "THR", "VAL", "LEU", "ILE", "PRO", "PHE", "TYR", "TRP",
            "HIS", "LYS",
        ];
        let mut sequence: Sequence = names.iter().collect();
        sequence.chain_id = "A".to_string();
        structure.set_sequence(sequence);

        let output = write_to_string(&structure);
        let seqres: Vec<&str> = output.lines().filter(|l| l.starts_with("SEQRES")).collect();

        assert_eq!(seqres.len(), 2);
        assert_eq!(
            seqres[0],
            "SEQRES   1 A   14  MET GLY ALA SER THR VAL LEU ILE PRO PHE TYR TRP HIS"
        );
        assert_eq!(seqres[1], "SEQRES   2 A   14  LYS");
    }

    #[test]
    fn hetatm_flag_controls_record_type() {
        let mut structure = Structure::new();
        let mut chain = Chain::new("W");

        let mut water = Residue::new(
            42,
            None,
            "HOH",
            Some(StandardResidue::HOH),
            ResidueCategory::Standard,
        );
        water.is_hetatm = true;
        water.add_atom(Atom::new("O", Element::O, Point::new(0.0, 0.0, 0.0)));

        let mut mse = Residue::new(43, None, "MSE", None, ResidueCategory::Hetero);
        mse.is_hetatm = false;
        mse.add_atom(Atom::new("SE", Element::Se, Point::new(1.0, 0.0, 0.0)));

        chain.add_residue(water);
        chain.add_residue(mse);
        structure.add_chain(chain);

        let output = write_to_string(&structure);
        let lines: Vec<&str> = output.lines().collect();

        assert!(lines[0].starts_with("HETATM"), "water should be HETATM: {}", lines[0]);
        assert!(lines[1].starts_with("ATOM  "), "MSE keeps ATOM: {}", lines[1]);
        assert_eq!(&lines[1][12..16], "SE  ");
        assert!(!output.contains("TER"), "no polymer residue, no TER");
    }

    #[test]
    fn write_topology_emits_sorted_conect_records() {
        let mut structure = Structure::new();
        let mut chain = Chain::new("C");
        let mut lig = Residue::new(10, None, "LIG", None, ResidueCategory::Hetero);
        lig.is_hetatm = true;
        for (i, name) in ["C1", "C2", "C3", "C4", "C5", "C6"].iter().enumerate() {
            lig.add_atom(Atom::new(name, Element::C, Point::new(i as f64, 0.0, 0.0)));
        }
        chain.add_residue(lig);
        structure.add_chain(chain);

        let bonds = (1..6).map(|i| Bond::new(0, i)).collect();
        let topology = Topology::new(structure, bonds);

        let mut buffer = Vec::new();
        write_topology(&mut buffer, &topology).expect("topology writer succeeds");

        let output = String::from_utf8(buffer).expect("valid UTF-8");
        let conect_lines: Vec<&str> = output
            .lines()
            .filter(|line| line.starts_with("CONECT"))
            .collect();

        assert_eq!(conect_lines.len(), 7);
        assert_conect_line(conect_lines[0], 1, &[2, 3, 4, 5]);
        assert_conect_line(conect_lines[1], 1, &[6]);
        assert_conect_line(conect_lines[2], 2, &[1]);
        assert!(output.ends_with("END   \n"));
    }

    #[test]
    fn write_connects_returns_error_when_serial_missing() {
        let structure = gly_lig_structure();
        let topology = Topology::new(structure.clone(), vec![Bond::new(0, 1)]);

        let mut ctx = WriterContext::new(Vec::new());
        ctx.write_atoms(&structure).expect("atoms should write");
        ctx.atom_serials.clear();

        let err = ctx
            .write_connects(&topology)
            .expect_err("missing serial map should error");

        match err {
            Error::InconsistentData { details, .. } => {
                assert!(details.contains("bond references atom index"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn multi_character_chain_id_is_rejected() {
        let mut structure = Structure::new();
        let mut chain = Chain::new("AB");
        let mut ala = Residue::new(
            1,
            None,
            "ALA",
            Some(StandardResidue::ALA),
            ResidueCategory::Standard,
        );
        ala.add_atom(Atom::new("CA", Element::C, Point::origin()));
        chain.add_residue(ala);
        structure.add_chain(chain);

        let err = write_structure(Vec::new(), &structure).expect_err("chain id too long");
        assert!(err.to_string().contains("chain identifier 'AB'"));
    }

    #[test]
    fn serials_wrap_past_five_digits_and_conect_follows() {
        let mut structure = Structure::new();
        let mut chain = Chain::new("L");
        let mut lig = Residue::new(1, None, "LIG", None, ResidueCategory::Hetero);
        lig.is_hetatm = true;
        for (i, name) in ["C1", "C2", "C3", "C4"].iter().enumerate() {
            lig.add_atom(Atom::new(name, Element::C, Point::new(i as f64, 0.0, 0.0)));
        }
        chain.add_residue(lig);
        structure.add_chain(chain);
        let topology = Topology::new(structure, vec![Bond::new(0, 1), Bond::new(1, 2), Bond::new(2, 3)]);

        let mut ctx = WriterContext::new(Vec::new());
        ctx.current_serial = 99_998;
        ctx.write_atoms(topology.structure()).expect("atoms past the limit still write");
        ctx.write_connects(&topology).expect("conect records write");

        let output = String::from_utf8(ctx.writer).expect("valid UTF-8");
        let lines: Vec<&str> = output.lines().collect();
        let serials: Vec<&str> = lines[..4].iter().map(|l| l[6..11].trim()).collect();
        assert_eq!(serials, vec!["99998", "99999", "0", "1"]);

        let conect: Vec<&str> = lines.iter().copied().filter(|l| l.starts_with("CONECT")).collect();
        assert_eq!(conect.len(), 4);
        assert_conect_line(conect[0], 0, &[1, 99999]);
        assert_conect_line(conect[1], 1, &[0]);
        assert_conect_line(conect[2], 99998, &[99999]);
        assert_conect_line(conect[3], 99999, &[0, 99998]);
    }
}
