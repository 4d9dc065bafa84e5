//! mmCIF reader for coordinate, sequence, and unit-cell data.
//!
//! A small line-oriented state machine walks the file, buffering loop rows until they hold
//! one value per header. Only three categories matter: `_atom_site` for coordinates,
//! `_pdbx_poly_seq_scheme` for declared sequences, and the `_cell.*` scalars. Everything
//! else, including semicolon-delimited text fields, is skipped without complaint.

use crate::io::builder::{AtomSite, StructureBuilder, cell_vectors};
use crate::io::context::IoContext;
use crate::io::error::Error;
use crate::model::{
    atom::Atom,
    sequence::Sequence,
    structure::Structure,
    types::{Element, Point},
};
use std::collections::HashMap;
use std::io::BufRead;
use std::str::FromStr;

const FORMAT: &str = "mmCIF";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopCategory {
    AtomSite,
    PolySeqScheme,
    Other,
}

impl LoopCategory {
    fn from_header(header: &str) -> Self {
        if header.starts_with("_atom_site.") {
            LoopCategory::AtomSite
        } else if header.starts_with("_pdbx_poly_seq_scheme.") {
            LoopCategory::PolySeqScheme
        } else {
            LoopCategory::Other
        }
    }
}

enum ParserState {
    Base,
    InLoopHeader,
    InLoopBody,
}

/// Column positions of the `_atom_site` fields the reader understands.
#[derive(Default)]
struct AtomSiteIndices {
    group_pdb: Option<usize>,
    auth_atom_id: Option<usize>,
    label_atom_id: Option<usize>,
    auth_comp_id: Option<usize>,
    label_comp_id: Option<usize>,
    auth_asym_id: Option<usize>,
    label_asym_id: Option<usize>,
    auth_seq_id: Option<usize>,
    label_seq_id: Option<usize>,
    pdbx_pdb_ins_code: Option<usize>,
    cartn_x: Option<usize>,
    cartn_y: Option<usize>,
    cartn_z: Option<usize>,
    occupancy: Option<usize>,
    type_symbol: Option<usize>,
    model_num: Option<usize>,
}

impl AtomSiteIndices {
    fn from_headers(headers: &[String]) -> Self {
        let mut indices = Self::default();
        for (i, header) in headers.iter().enumerate() {
            let slot = match header.as_str() {
                "_atom_site.group_PDB" => &mut indices.group_pdb,
                "_atom_site.auth_atom_id" => &mut indices.auth_atom_id,
                "_atom_site.label_atom_id" => &mut indices.label_atom_id,
                "_atom_site.auth_comp_id" => &mut indices.auth_comp_id,
                "_atom_site.label_comp_id" => &mut indices.label_comp_id,
                "_atom_site.auth_asym_id" => &mut indices.auth_asym_id,
                "_atom_site.label_asym_id" => &mut indices.label_asym_id,
                "_atom_site.auth_seq_id" => &mut indices.auth_seq_id,
                "_atom_site.label_seq_id" => &mut indices.label_seq_id,
                "_atom_site.pdbx_PDB_ins_code" => &mut indices.pdbx_pdb_ins_code,
                "_atom_site.Cartn_x" => &mut indices.cartn_x,
                "_atom_site.Cartn_y" => &mut indices.cartn_y,
                "_atom_site.Cartn_z" => &mut indices.cartn_z,
                "_atom_site.occupancy" => &mut indices.occupancy,
                "_atom_site.type_symbol" => &mut indices.type_symbol,
                "_atom_site.pdbx_PDB_model_num" => &mut indices.model_num,
                _ => continue,
            };
            *slot = Some(i);
        }
        indices
    }
}

/// Column positions of the `_pdbx_poly_seq_scheme` fields used for sequences.
#[derive(Default)]
struct SeqSchemeIndices {
    strand_id: Option<usize>,
    asym_id: Option<usize>,
    seq_id: Option<usize>,
    mon_id: Option<usize>,
}

impl SeqSchemeIndices {
    fn from_headers(headers: &[String]) -> Self {
        let mut indices = Self::default();
        for (i, header) in headers.iter().enumerate() {
            match header.as_str() {
                "_pdbx_poly_seq_scheme.pdb_strand_id" => indices.strand_id = Some(i),
                "_pdbx_poly_seq_scheme.asym_id" => indices.asym_id = Some(i),
                "_pdbx_poly_seq_scheme.seq_id" => indices.seq_id = Some(i),
                "_pdbx_poly_seq_scheme.mon_id" => indices.mon_id = Some(i),
                _ => {}
            }
        }
        indices
    }
}

/// Mutable state accumulated while streaming the file.
struct ReaderState<'c> {
    context: &'c IoContext,
    builder: StructureBuilder,
    first_model: Option<String>,
    sequences: Vec<Sequence>,
    last_seq_ids: HashMap<String, String>,
    cell: HashMap<String, String>,
}

/// Parses an mmCIF stream into a [`Structure`].
///
/// Author-assigned identifiers (`auth_*`) are preferred over label identifiers so chain
/// names and residue numbers match what the PDB format would show. Only rows of the first
/// `pdbx_PDB_model_num` are kept.
///
/// # Errors
///
/// Returns [`Error::Parse`] when a required `_atom_site` column is missing or a coordinate
/// is not numeric, [`Error::InconsistentData`] for files without atoms or with a loop whose
/// value count does not fill its last row, and [`Error::Io`] for reader failures.
pub fn read<R: BufRead>(reader: R, context: &IoContext) -> Result<Structure, Error> {
    let mut state = ReaderState {
        context,
        builder: StructureBuilder::new(),
        first_model: None,
        sequences: Vec::new(),
        last_seq_ids: HashMap::new(),
        cell: HashMap::new(),
    };

    let mut parser = ParserState::Base;
    let mut headers: Vec<String> = Vec::new();
    let mut category = LoopCategory::Other;
    let mut atom_indices = AtomSiteIndices::default();
    let mut seq_indices = SeqSchemeIndices::default();
    let mut pending: Vec<String> = Vec::new();
    let mut text_field: Option<String> = None;
    let mut last_line = 0;

    for (index, line) in reader.lines().enumerate() {
        let line_num = index + 1;
        last_line = line_num;
        let line = line.map_err(|e| Error::from_io(e, None))?;

        if let Some(text) = text_field.as_mut() {
            if line.starts_with(';') {
                let value = text_field.take().unwrap_or_default();
                if matches!(parser, ParserState::InLoopBody) {
                    pending.push(value);
                }
            } else {
                text.push_str(&line);
            }
            continue;
        }

        if let Some(rest) = line.strip_prefix(';') {
            if matches!(parser, ParserState::InLoopHeader) {
                parser = ParserState::InLoopBody;
            }
            text_field = Some(rest.to_string());
            continue;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let tokens = tokenize_mmcif_line(trimmed);
        let Some(first) = tokens.first() else {
            continue;
        };

        let starts_new_block =
            first == "loop_" || first.starts_with('_') || first.starts_with("data_");
        if starts_new_block && matches!(parser, ParserState::InLoopBody) {
            finish_loop(&pending, headers.len(), line_num)?;
            pending.clear();
            parser = ParserState::Base;
        }

        if first == "loop_" {
            parser = ParserState::InLoopHeader;
            headers.clear();
            continue;
        }

        match parser {
            ParserState::InLoopHeader if first.starts_with('_') => {
                headers.push(first.clone());
                continue;
            }
            ParserState::InLoopHeader => {
                category = headers
                    .first()
                    .map(|h| LoopCategory::from_header(h))
                    .unwrap_or(LoopCategory::Other);
                atom_indices = AtomSiteIndices::from_headers(&headers);
                seq_indices = SeqSchemeIndices::from_headers(&headers);
                parser = ParserState::InLoopBody;
            }
            ParserState::Base => {
                if first.starts_with("_cell.") && tokens.len() >= 2 {
                    state.cell.insert(first.clone(), tokens[1].clone());
                }
                continue;
            }
            ParserState::InLoopBody => {}
        }

        pending.extend(tokens);
        if headers.is_empty() {
            pending.clear();
            continue;
        }
        while pending.len() >= headers.len() {
            let row: Vec<String> = pending.drain(..headers.len()).collect();
            match category {
                LoopCategory::AtomSite => {
                    process_atom_row(&row, &atom_indices, line_num, &mut state)?
                }
                LoopCategory::PolySeqScheme => process_seq_row(&row, &seq_indices, &mut state),
                LoopCategory::Other => {}
            }
        }
    }

    if matches!(parser, ParserState::InLoopBody) {
        finish_loop(&pending, headers.len(), last_line)?;
    }

    if state.builder.atom_count() == 0 {
        return Err(Error::inconsistent_data(
            FORMAT,
            None,
            "no _atom_site records found",
        ));
    }

    let mut structure = Structure::new();
    structure.box_vectors = process_cell_parameters(&state.cell);
    for sequence in state.sequences {
        structure.set_sequence(sequence);
    }

    Ok(state.builder.finish(structure, context))
}

fn finish_loop(pending: &[String], columns: usize, line_num: usize) -> Result<(), Error> {
    if pending.is_empty() {
        Ok(())
    } else {
        Err(Error::parse(
            FORMAT,
            None,
            line_num,
            format!(
                "loop ended with {} dangling values for {} columns",
                pending.len(),
                columns
            ),
        ))
    }
}

/// Splits a line into whitespace-separated tokens, honoring single and double quotes.
///
/// A quote only closes a token when followed by whitespace or the end of the line, so
/// atom names such as `O5'` or `"C1'"` survive intact.
fn tokenize_mmcif_line(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = line.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        if chars[i].is_whitespace() {
            i += 1;
            continue;
        }

        if chars[i] == '\'' || chars[i] == '"' {
            let quote = chars[i];
            let start = i + 1;
            let mut end = start;
            while end < chars.len()
                && !(chars[end] == quote && chars.get(end + 1).is_none_or(|c| c.is_whitespace()))
            {
                end += 1;
            }
            tokens.push(chars[start..end.min(chars.len())].iter().collect());
            i = end + 1;
        } else {
            let start = i;
            while i < chars.len() && !chars[i].is_whitespace() {
                i += 1;
            }
            tokens.push(chars[start..i].iter().collect());
        }
    }

    tokens
}

fn is_null(value: &str) -> bool {
    matches!(value, "." | "?")
}

fn column<'r>(
    row: &'r [String],
    idx: Option<usize>,
    line_num: usize,
    what: &str,
) -> Result<&'r str, Error> {
    idx.and_then(|i| row.get(i))
        .map(|s| s.as_str())
        .ok_or_else(|| {
            Error::parse(
                FORMAT,
                None,
                line_num,
                format!("_atom_site loop is missing {what} column"),
            )
        })
}

fn process_atom_row(
    row: &[String],
    indices: &AtomSiteIndices,
    line_num: usize,
    state: &mut ReaderState<'_>,
) -> Result<(), Error> {
    if let Some(model) = indices.model_num.and_then(|i| row.get(i)) {
        match &state.first_model {
            Some(first) if first != model => return Ok(()),
            Some(_) => {}
            None => state.first_model = Some(model.clone()),
        }
    }

    let atom_name = column(row, indices.auth_atom_id.or(indices.label_atom_id), line_num, "atom identifier")?;
    let res_name = column(row, indices.auth_comp_id.or(indices.label_comp_id), line_num, "residue name")?;
    let chain_id = column(row, indices.auth_asym_id.or(indices.label_asym_id), line_num, "chain identifier")?;
    let seq_id = column(row, indices.auth_seq_id.or(indices.label_seq_id), line_num, "sequence number")?;
    let x = column(row, indices.cartn_x, line_num, "Cartn_x")?;
    let y = column(row, indices.cartn_y, line_num, "Cartn_y")?;
    let z = column(row, indices.cartn_z, line_num, "Cartn_z")?;

    if is_null(x) || is_null(y) || is_null(z) {
        return Ok(());
    }

    let parse_coordinate = |value: &str, axis: &str| {
        f64::from_str(value).map_err(|_| {
            Error::parse(FORMAT, None, line_num, format!("Invalid {axis} coordinate"))
        })
    };
    let pos = Point::new(
        parse_coordinate(x, "X")?,
        parse_coordinate(y, "Y")?,
        parse_coordinate(z, "Z")?,
    );

    let optional = |idx: Option<usize>| {
        idx.and_then(|i| row.get(i))
            .map(|s| s.as_str())
            .filter(|s| !is_null(s))
    };

    let is_hetatm = optional(indices.group_pdb).is_some_and(|g| g.eq_ignore_ascii_case("HETATM"));
    let res_seq = if is_null(seq_id) {
        1
    } else {
        seq_id.parse::<i32>().unwrap_or(1)
    };
    let i_code = optional(indices.pdbx_pdb_ins_code).and_then(|code| code.chars().next());
    let occupancy = optional(indices.occupancy)
        .and_then(|occ| f64::from_str(occ).ok())
        .unwrap_or(1.0);
    let element = optional(indices.type_symbol)
        .and_then(|symbol| Element::from_str(symbol).ok())
        .unwrap_or(Element::Unknown);

    let chain_id = if is_null(chain_id) { "?" } else { chain_id };

    let site = AtomSite {
        chain_id,
        res_seq,
        i_code,
        res_name,
        is_hetatm,
        occupancy,
    };
    state.builder.push_atom(site, Atom::new(atom_name, element, pos));

    Ok(())
}

/// Adds one `_pdbx_poly_seq_scheme` row to the sequence of its author chain.
///
/// Rows repeating a `seq_id` describe sequence microheterogeneity; only the first is kept.
fn process_seq_row(row: &[String], indices: &SeqSchemeIndices, state: &mut ReaderState<'_>) {
    let value = |idx: Option<usize>| idx.and_then(|i| row.get(i)).map(|s| s.as_str());

    let Some(chain_id) = value(indices.strand_id)
        .filter(|s| !is_null(s))
        .or_else(|| value(indices.asym_id))
    else {
        return;
    };
    let Some(mon_id) = value(indices.mon_id).filter(|s| !is_null(s)) else {
        return;
    };

    if let Some(seq_id) = value(indices.seq_id) {
        if state.last_seq_ids.get(chain_id).map(String::as_str) == Some(seq_id) {
            return;
        }
        state
            .last_seq_ids
            .insert(chain_id.to_string(), seq_id.to_string());
    }

    let position = match state.sequences.iter().position(|s| s.chain_id == chain_id) {
        Some(position) => position,
        None => {
            state.sequences.push(Sequence::new(chain_id));
            state.sequences.len() - 1
        }
    };
    state.sequences[position].push(state.context.resolve_name(mon_id));
}

fn process_cell_parameters(cell: &HashMap<String, String>) -> Option<[[f64; 3]; 3]> {
    let value = |key: &str| cell.get(key).and_then(|v| v.parse::<f64>().ok());

    let a = value("_cell.length_a")?;
    let b = value("_cell.length_b")?;
    let c = value("_cell.length_c")?;
    if a <= 0.0 || b <= 0.0 || c <= 0.0 {
        return None;
    }

    let alpha = value("_cell.angle_alpha").unwrap_or(90.0).to_radians();
    let beta = value("_cell.angle_beta").unwrap_or(90.0).to_radians();
    let gamma = value("_cell.angle_gamma").unwrap_or(90.0).to_radians();

    Some(cell_vectors(a, b, c, alpha, beta, gamma))
}
