//! Embedded residue templates.
//!
//! Every standard amino acid (plus its protonation variants) and water ships as a TOML
//! document with idealized coordinates. Templates are parsed once into a process-wide store
//! and handed out as borrowed [`TemplateView`]s.

mod loader;
mod schema;
mod store;

use crate::model::types::{Element, Point, StandardResidue};

/// Retrieves a template by name, such as `"ALA"`, `"HIP"`, or `"HOH"`.
pub fn get_template(name: &str) -> Option<TemplateView<'static>> {
    store::get_store()
        .templates_by_name
        .get(name)
        .map(TemplateView::new)
}

/// Read-only access to a stored template.
#[derive(Debug, Clone, Copy)]
pub struct TemplateView<'a> {
    inner: &'a store::InternalTemplate,
}

impl<'a> TemplateView<'a> {
    pub fn new(inner: &'a store::InternalTemplate) -> Self {
        Self { inner }
    }

    pub fn name(&self) -> &'a str {
        &self.inner.schema.info.name
    }

    /// The standard residue this template (or protonation variant) belongs to.
    pub fn standard_name(&self) -> StandardResidue {
        self.inner.schema.info.standard_name
    }

    /// Net integer charge in elementary units.
    pub fn charge(&self) -> i32 {
        self.inner.schema.info.charge
    }

    /// Iterates heavy atoms as `(name, element, position)` in declaration order.
    pub fn heavy_atoms(&self) -> impl Iterator<Item = (&'a str, Element, Point)> + use<'a> {
        self.inner
            .schema
            .atoms
            .iter()
            .map(|a| (a.name.as_str(), a.element, Point::from(a.pos)))
    }

    /// Looks up the reference position of one heavy atom.
    pub fn heavy_atom(&self, name: &str) -> Option<(Element, Point)> {
        self.inner
            .schema
            .atoms
            .iter()
            .find(|a| a.name == name)
            .map(|a| (a.element, Point::from(a.pos)))
    }

    /// Iterates hydrogens as `(name, position, anchors)`.
    ///
    /// The first anchor is the bonded heavy atom; the remaining anchors orient the placement.
    pub fn hydrogens(&self) -> impl Iterator<Item = (&'a str, Point, &'a [String])> + use<'a> {
        self.inner
            .schema
            .hydrogens
            .iter()
            .map(|h| (h.name.as_str(), Point::from(h.pos), h.anchors.as_slice()))
    }
}
