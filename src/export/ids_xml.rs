//! IDS 1.0 XML
//!
//! Writes a [`SpecificationGroup`] as a buildingSMART IDS document and reads
//! one back far enough to check what was written: the header, and per
//! specification its name, identifier, IFC versions and facet counts.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use ids_core::{
    Facet, FacetGroup, PartOfRelation, RangeBounds, RequirementCardinality, Specification, SpecificationGroup,
    ValueConstraint,
};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

const IDS_NAMESPACE: &str = "http://standards.buildingsmart.org/IDS";
const XS_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";
const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
const SCHEMA_LOCATION: &str = "http://standards.buildingsmart.org/IDS http://standards.buildingsmart.org/IDS/1.0/ids.xsd";

const FACETS: [&str; 6] = ["entity", "attribute", "property", "classification", "partOf", "material"];

struct IdsWriter {
    inner: Writer<Vec<u8>>,
}

impl IdsWriter {
    fn new() -> Self {
        Self {
            inner: Writer::new_with_indent(Vec::new(), b' ', 2),
        }
    }

    fn open(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<()> {
        let mut start = BytesStart::new(name);
        for attribute in attributes {
            start.push_attribute(*attribute);
        }
        self.inner.write_event(Event::Start(start))?;
        Ok(())
    }

    fn close(&mut self, name: &str) -> Result<()> {
        self.inner.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    fn empty(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<()> {
        let mut start = BytesStart::new(name);
        for attribute in attributes {
            start.push_attribute(*attribute);
        }
        self.inner.write_event(Event::Empty(start))?;
        Ok(())
    }

    fn text(&mut self, name: &str, text: &str) -> Result<()> {
        self.open(name, &[])?;
        self.inner.write_event(Event::Text(BytesText::new(text)))?;
        self.close(name)
    }

    fn into_string(self) -> Result<String> {
        String::from_utf8(self.inner.into_inner()).context("IDS output is not UTF-8")
    }

    fn document(&mut self, group: &SpecificationGroup) -> Result<()> {
        self.inner
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        self.open(
            "ids:ids",
            &[
                ("xmlns:ids", IDS_NAMESPACE),
                ("xmlns:xs", XS_NAMESPACE),
                ("xmlns:xsi", XSI_NAMESPACE),
                ("xsi:schemaLocation", SCHEMA_LOCATION),
            ],
        )?;
        self.info(group)?;
        self.open("ids:specifications", &[])?;
        for spec in &group.specifications {
            self.specification(spec)?;
        }
        self.close("ids:specifications")?;
        self.close("ids:ids")
    }

    fn info(&mut self, group: &SpecificationGroup) -> Result<()> {
        let metadata = &group.metadata;
        self.open("ids:info", &[])?;
        self.text("ids:title", &metadata.name)?;
        let optional = [
            ("ids:copyright", metadata.copyright.as_str()),
            ("ids:version", metadata.version.as_str()),
            ("ids:description", metadata.description.as_str()),
            ("ids:author", metadata.author.as_str()),
            ("ids:date", metadata.date.as_deref().unwrap_or_default()),
            ("ids:purpose", metadata.purpose.as_str()),
            ("ids:milestone", metadata.milestone.as_str()),
        ];
        for (element, value) in optional {
            if !value.is_empty() {
                self.text(element, value)?;
            }
        }
        self.close("ids:info")
    }

    fn specification(&mut self, spec: &Specification) -> Result<()> {
        let versions = spec
            .dialects
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        let mut attributes = vec![
            ("name", spec.name.as_str()),
            ("ifcVersion", versions.as_str()),
            ("identifier", spec.identifier.as_str()),
        ];
        if !spec.description.is_empty() {
            attributes.push(("description", spec.description.as_str()));
        }
        if let Some(instructions) = &spec.instructions {
            attributes.push(("instructions", instructions.as_str()));
        }
        self.open("ids:specification", &attributes)?;

        let (min, max) = spec.applicability_cardinality.occurs();
        self.open("ids:applicability", &[("minOccurs", min), ("maxOccurs", max)])?;
        for facet in &spec.applicability.facets {
            self.facet(facet, None)?;
        }
        self.close("ids:applicability")?;

        if !spec.is_presence_only() {
            self.requirements(&spec.requirement)?;
        }
        self.close("ids:specification")
    }

    fn requirements(&mut self, group: &FacetGroup) -> Result<()> {
        let mut attributes = Vec::new();
        if !group.description.is_empty() {
            attributes.push(("description", group.description.as_str()));
        }
        self.open("ids:requirements", &attributes)?;
        for (facet, cardinality) in group.entries() {
            self.facet(facet, Some(cardinality))?;
        }
        self.close("ids:requirements")
    }

    /// `cardinality` is `None` inside an applicability
    fn facet(&mut self, facet: &Facet, cardinality: Option<RequirementCardinality>) -> Result<()> {
        let cardinality = cardinality.map(RequirementCardinality::ids_value);
        match facet {
            Facet::Entity {
                entity,
                predefined_type,
            } => {
                self.open("ids:entity", &[])?;
                self.value("ids:name", entity)?;
                if let Some(predefined_type) = predefined_type {
                    self.value("ids:predefinedType", predefined_type)?;
                }
                self.close("ids:entity")
            }
            Facet::Attribute { name, value } => {
                let attributes = cardinality_attribute(cardinality);
                self.open("ids:attribute", &attributes)?;
                self.value("ids:name", &ValueConstraint::exact(name.as_str()))?;
                if let Some(value) = value {
                    self.value("ids:value", value)?;
                }
                self.close("ids:attribute")
            }
            Facet::Property {
                property_set,
                name,
                value,
                data_type,
            } => {
                let mut attributes = Vec::new();
                if let Some(data_type) = data_type {
                    attributes.push(("dataType", data_type.as_str()));
                }
                attributes.extend(cardinality_attribute(cardinality));
                self.open("ids:property", &attributes)?;
                self.value("ids:propertySet", property_set)?;
                self.value("ids:baseName", name)?;
                if let Some(value) = value {
                    self.value("ids:value", value)?;
                }
                self.close("ids:property")
            }
            Facet::Classification { system, value } => {
                let attributes = cardinality_attribute(cardinality);
                self.open("ids:classification", &attributes)?;
                if let Some(value) = value {
                    self.value("ids:value", value)?;
                }
                if let Some(system) = system {
                    self.value("ids:system", system)?;
                }
                self.close("ids:classification")
            }
            Facet::PartOf { relation, entity } => {
                let relation = relation.as_ref().map(PartOfRelation::to_string);
                let mut attributes = Vec::new();
                if let Some(relation) = &relation {
                    attributes.push(("relation", relation.as_str()));
                }
                attributes.extend(cardinality_attribute(cardinality));
                self.open("ids:partOf", &attributes)?;
                self.open("ids:entity", &[])?;
                self.value("ids:name", &ValueConstraint::exact(entity.to_ascii_uppercase()))?;
                self.close("ids:entity")?;
                self.close("ids:partOf")
            }
        }
    }

    fn value(&mut self, element: &str, constraint: &ValueConstraint) -> Result<()> {
        self.open(element, &[])?;
        match constraint {
            ValueConstraint::Exact(value) => self.text("ids:simpleValue", value)?,
            ValueConstraint::Pattern(pattern) => {
                self.open("xs:restriction", &[("base", "xs:string")])?;
                self.empty("xs:pattern", &[("value", pattern.as_str())])?;
                self.close("xs:restriction")?;
            }
            ValueConstraint::List(values) => {
                self.open("xs:restriction", &[("base", "xs:string")])?;
                for value in values {
                    self.empty("xs:enumeration", &[("value", value.as_str())])?;
                }
                self.close("xs:restriction")?;
            }
            ValueConstraint::Range(bounds) => self.bounds(bounds)?,
            ValueConstraint::Length { min, max } => {
                self.open("xs:restriction", &[("base", "xs:string")])?;
                self.empty("xs:minLength", &[("value", min.to_string().as_str())])?;
                self.empty("xs:maxLength", &[("value", max.to_string().as_str())])?;
                self.close("xs:restriction")?;
            }
        }
        self.close(element)
    }

    fn bounds(&mut self, bounds: &RangeBounds) -> Result<()> {
        self.open("xs:restriction", &[("base", "xs:double")])?;
        if let Some(min) = &bounds.min {
            let element = if bounds.min_inclusive { "xs:minInclusive" } else { "xs:minExclusive" };
            self.empty(element, &[("value", min.as_str())])?;
        }
        if let Some(max) = &bounds.max {
            let element = if bounds.max_inclusive { "xs:maxInclusive" } else { "xs:maxExclusive" };
            self.empty(element, &[("value", max.as_str())])?;
        }
        self.close("xs:restriction")
    }
}

fn cardinality_attribute(cardinality: Option<&'static str>) -> Vec<(&'static str, &'static str)> {
    cardinality
        .map(|value| vec![("cardinality", value)])
        .unwrap_or_default()
}

/// Render `group` as an IDS document
pub fn render(group: &SpecificationGroup) -> Result<String> {
    let mut writer = IdsWriter::new();
    writer.document(group)?;
    writer.into_string()
}

/// Render `group` to `path`, creating parent folders
pub fn write_file(path: &Path, group: &SpecificationGroup) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("Creating {}", parent.display()))?;
    }
    let xml = render(group).with_context(|| format!("Rendering {}", group.name()))?;
    fs::write(path, xml).with_context(|| format!("Writing {}", path.display()))
}

/// What a read-back specification looked like
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecificationSummary {
    pub name: String,
    pub identifier: Option<String>,
    pub ifc_versions: Vec<String>,
    pub applicability_facets: usize,
    pub requirement_facets: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdsSummary {
    pub title: String,
    pub version: Option<String>,
    pub milestone: Option<String>,
    pub specifications: Vec<SpecificationSummary>,
}

impl IdsSummary {
    pub fn len(&self) -> usize {
        self.specifications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specifications.is_empty()
    }

    /// Problems a checker would reject the file for
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.title.is_empty() {
            problems.push("missing title".to_string());
        }
        for spec in &self.specifications {
            if spec.name.is_empty() {
                problems.push("specification without a name".to_string());
            }
            if spec.ifc_versions.is_empty() {
                problems.push(format!("{}: no ifcVersion", spec.name));
            }
            if spec.applicability_facets == 0 {
                problems.push(format!("{}: empty applicability", spec.name));
            }
        }
        problems
    }
}

fn local_name(start: &BytesStart<'_>) -> Result<String> {
    Ok(std::str::from_utf8(start.local_name().as_ref())?.to_string())
}

fn attribute(start: &BytesStart<'_>, name: &str) -> Result<Option<String>> {
    match start.try_get_attribute(name)? {
        Some(attribute) => Ok(Some(attribute.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

fn begin_specification(start: &BytesStart<'_>) -> Result<SpecificationSummary> {
    Ok(SpecificationSummary {
        name: attribute(start, "name")?.unwrap_or_default(),
        identifier: attribute(start, "identifier")?,
        ifc_versions: attribute(start, "ifcVersion")?
            .map(|v| v.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default(),
        ..SpecificationSummary::default()
    })
}

/// Count a facet opened directly below an applicability or requirements element
fn count_facet(summary: &mut IdsSummary, stack: &[String], element: &str) {
    if !FACETS.contains(&element) {
        return;
    }
    let Some(spec) = summary.specifications.last_mut() else {
        return;
    };
    match stack.last().map(String::as_str) {
        Some("applicability") => spec.applicability_facets += 1,
        Some("requirements") => spec.requirement_facets += 1,
        _ => {}
    }
}

/// Read the parts of an IDS document [`render`] writes
pub fn read_summary(xml: &str) -> Result<IdsSummary> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut summary = IdsSummary::default();
    let mut stack: Vec<String> = Vec::new();
    let mut saw_root = false;
    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                let name = local_name(&start)?;
                if name == "ids" {
                    saw_root = true;
                }
                if name == "specification" {
                    summary.specifications.push(begin_specification(&start)?);
                }
                count_facet(&mut summary, &stack, &name);
                stack.push(name);
            }
            Event::Empty(start) => {
                let name = local_name(&start)?;
                if name == "specification" {
                    summary.specifications.push(begin_specification(&start)?);
                }
                count_facet(&mut summary, &stack, &name);
            }
            Event::Text(text) => {
                let in_info = stack.len() >= 2 && stack[stack.len() - 2] == "info";
                if in_info {
                    let value = text.unescape()?.into_owned();
                    match stack.last().map(String::as_str) {
                        Some("title") => summary.title = value,
                        Some("version") => summary.version = Some(value),
                        Some("milestone") => summary.milestone = Some(value),
                        _ => {}
                    }
                }
            }
            Event::End(_) => {
                stack.pop();
            }
            Event::Eof => break,
            _ => {}
        }
    }
    if !saw_root {
        bail!("not an IDS document: no ids root element");
    }
    Ok(summary)
}

pub fn read_file(path: &Path) -> Result<IdsSummary> {
    let xml = fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
    read_summary(&xml).with_context(|| format!("Parsing {}", path.display()))
}
