//! Schema facade
//!
//! Read-only view over the entity-type hierarchy. The compiler and the
//! fixture synthesizer only ever talk to a [`SchemaFacade`]; the concrete
//! [`SchemaCatalog`] is loaded from a YAML table and exposes one view per
//! dialect plus a hybrid IFC2X3 view.

pub(crate) mod catalog;
mod conventions;

pub use catalog::{CatalogEntry, SchemaCatalog, SchemaView};
pub use conventions::{SuffixRule, TypeConventions};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::error::Result;

/// Schema release an entity type or specification targets
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
pub enum SchemaDialect {
    #[strum(serialize = "IFC2X3")]
    #[serde(rename = "IFC2X3")]
    Ifc2x3,
    #[strum(serialize = "IFC4")]
    #[serde(rename = "IFC4")]
    Ifc4,
    #[strum(serialize = "IFC4X3")]
    #[serde(rename = "IFC4X3")]
    Ifc4x3,
}

impl SchemaDialect {
    pub fn flag(self) -> DialectSet {
        match self {
            Self::Ifc2x3 => DialectSet::IFC2X3,
            Self::Ifc4 => DialectSet::IFC4,
            Self::Ifc4x3 => DialectSet::IFC4X3,
        }
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct DialectSet: u8 {
        const IFC2X3 = 1 << 0;
        const IFC4 = 1 << 1;
        const IFC4X3 = 1 << 2;
        const ALL = Self::IFC2X3.bits() | Self::IFC4.bits() | Self::IFC4X3.bits();
    }
}

impl DialectSet {
    pub fn from_dialects(dialects: &[SchemaDialect]) -> Self {
        dialects
            .iter()
            .fold(DialectSet::empty(), |acc, d| acc | d.flag())
    }

    pub fn supports(self, dialect: SchemaDialect) -> bool {
        self.contains(dialect.flag())
    }
}

/// One node of the entity-type hierarchy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityTypeDescriptor {
    /// Schema name, e.g. `IfcDoorStyle`
    pub name: String,
    pub parent: Option<String>,
    /// Direct children, sorted by name
    pub children: Vec<String>,
    /// Enumerated sub-kinds (predefined types), in schema order
    pub sub_kinds: Vec<String>,
    pub is_abstract: bool,
    /// Grouping used to order fixtures, e.g. `HvacDomain`
    pub domain: String,
    pub dialects: DialectSet,
    /// IFC2X3 occurrence class used to represent an occurrence that only
    /// exists from IFC4 onwards (e.g. `IfcAirTerminal` -> `IfcFlowTerminal`)
    pub ifc2x3_host: Option<String>,
}

impl EntityTypeDescriptor {
    pub fn upper_name(&self) -> String {
        self.name.to_ascii_uppercase()
    }

    pub fn is_concrete(&self) -> bool {
        !self.is_abstract
    }

    pub fn has_sub_kinds(&self) -> bool {
        !self.sub_kinds.is_empty()
    }
}

/// Read-only access to an entity-type hierarchy
pub trait SchemaFacade {
    /// Dialect the view answers for
    fn dialect(&self) -> SchemaDialect;

    /// Every type in the view, ordered by name
    fn all_types(&self) -> Vec<&EntityTypeDescriptor>;

    /// Case-insensitive lookup
    fn lookup(&self, name: &str) -> Option<&EntityTypeDescriptor>;

    /// Concrete types at or below `name`, ordered by name.
    /// Fails with `UnsupportedType` when `name` is unknown.
    fn concrete_subtypes_of(&self, name: &str) -> Result<Vec<&EntityTypeDescriptor>>;

    /// Lookup that treats an unknown name as a configuration bug
    fn require(&self, name: &str) -> Result<&EntityTypeDescriptor> {
        self.lookup(name)
            .ok_or_else(|| crate::GeneratorError::unsupported(name, self.dialect()))
    }
}
