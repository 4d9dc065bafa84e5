//! Atom record shared by readers, the fixer passes, and the PDB writer.
//!
//! An atom carries only what survives a round trip through PDB/mmCIF coordinates: its label,
//! chemical element, and Cartesian position. Occupancy and B-factors are resolved at read
//! time and are not retained.

use super::types::{Element, Point};
use smol_str::SmolStr;
use std::fmt;

/// Named atom with a chemical element and a position in ångströms.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// Label as written in the coordinate file (e.g., `CA`, `OXT`, `HD21`).
    pub name: SmolStr,
    /// Chemical element of the atom.
    pub element: Element,
    /// Cartesian coordinates in ångströms.
    pub pos: Point,
}

impl Atom {
    /// Creates a new atom from a name, element, and position.
    ///
    /// # Arguments
    ///
    /// * `name` - Atom label such as `"N"` or `"HG1"`.
    /// * `element` - Chemical identity of the atom.
    /// * `pos` - Position in ångströms.
    pub fn new(name: &str, element: Element, pos: Point) -> Self {
        Self {
            name: SmolStr::new(name),
            element,
            pos,
        }
    }

    /// Returns `true` for hydrogen (and deuterium) atoms.
    pub fn is_hydrogen(&self) -> bool {
        self.element == Element::H
    }

    /// Squared Euclidean distance to another atom, in Å².
    pub fn distance_squared(&self, other: &Atom) -> f64 {
        nalgebra::distance_squared(&self.pos, &other.pos)
    }

    /// Euclidean distance to another atom, in Å.
    pub fn distance(&self, other: &Atom) -> f64 {
        nalgebra::distance(&self.pos, &other.pos)
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Atom {{ name: \"{}\", element: {}, pos: [{:.3}, {:.3}, {:.3}] }}",
            self.name, self.element, self.pos.x, self.pos.y, self.pos.z
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atom_new_stores_fields() {
        let atom = Atom::new("CA", Element::C, Point::new(1.0, 2.0, 3.0));

        assert_eq!(atom.name, "CA");
        assert_eq!(atom.element, Element::C);
        assert_eq!(atom.pos, Point::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn atom_is_hydrogen_only_for_hydrogen_element() {
        let h = Atom::new("HA", Element::H, Point::origin());
        let c = Atom::new("CA", Element::C, Point::origin());

        assert!(h.is_hydrogen());
        assert!(!c.is_hydrogen());
    }

    #[test]
    fn atom_distances_use_euclidean_metric() {
        let a = Atom::new("N", Element::N, Point::new(0.0, 0.0, 0.0));
        let b = Atom::new("CA", Element::C, Point::new(3.0, 4.0, 0.0));

        assert!((a.distance(&b) - 5.0).abs() < 1e-12);
        assert!((a.distance_squared(&b) - 25.0).abs() < 1e-12);
        assert_eq!(a.distance(&b), b.distance(&a));
    }

    #[test]
    fn atom_display_rounds_coordinates() {
        let atom = Atom::new("OXT", Element::O, Point::new(1.23456, -0.5, 10.0));

        assert_eq!(
            atom.to_string(),
            "Atom { name: \"OXT\", element: O, pos: [1.235, -0.500, 10.000] }"
        );
    }
}
