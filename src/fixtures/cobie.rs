//! Conforming COBie values for type objects and components

use ids_core::fixtures::{Baseline, Field};

use crate::rulebook::patterns::DEFAULT_DATE;

pub(crate) const ASSET: &str = "COBie_Asset";
pub(crate) const MANUFACTURER_TYPE: &str = "Pset_ManufacturerTypeInformation";
pub(crate) const MANUFACTURER_OCCURRENCE: &str = "Pset_ManufacturerOccurrence";
pub(crate) const WARRANTY: &str = "COBie_Warranty";
pub(crate) const ECONOMIC: &str = "COBie_EconomicImpactValues";
pub(crate) const SERVICE_LIFE: &str = "COBie_ServiceLife";
pub(crate) const SPECIFICATION: &str = "COBie_Specification";
pub(crate) const COMPONENT: &str = "COBie_Component";
pub(crate) const DOOR_COMMON: &str = "Pset_DoorCommon";

/// Classification system carrying product codes
pub(crate) const UNICLASS_PR: &str = "Uniclass Pr";

const SPECIFICATION_TEXT: [&str; 11] = [
    "Shape",
    "Size",
    "Color",
    "Finish",
    "Grade",
    "Material",
    "Constituents",
    "Features",
    "AccessibilityPerformance",
    "CodePerformance",
    "SustainabilityPerformance",
];

/// Uniclass product code for a schema domain
pub(crate) fn product_code(domain: &str) -> &'static str {
    match domain.to_ascii_lowercase().as_str() {
        "buildingcontrolsdomain" | "electricaldomain" => "Pr_75",
        "hvacdomain" => "Pr_60_60",
        "plumbingfireprotectiondomain" => "Pr_40",
        "productextension" => "Pr_35",
        "sharedbldgelements" => "Pr_20",
        "sharedbldgserviceelements" => "Pr_60_65",
        _ => "Pr_60",
    }
}

/// Type object data that passes every COBie type rule
pub(crate) fn type_baseline(domain: &str) -> Baseline {
    let contact = domain.to_ascii_lowercase();
    let mut baseline = Baseline::new(format!("COBie type ({domain})"))
        .with(Field::classification(UNICLASS_PR), product_code(domain))
        .with(Field::property(ASSET, "AssetType"), "Fixed")
        .with(
            Field::property(MANUFACTURER_TYPE, "Manufacturer"),
            format!("sales.{contact}@example.com"),
        )
        .with(Field::property(MANUFACTURER_TYPE, "ModelReference"), "Some Ref")
        .with(
            Field::property(WARRANTY, "WarrantyGuarantorParts"),
            format!("service.{contact}@example.com"),
        )
        .with(
            Field::property(WARRANTY, "WarrantyGuarantorLabor"),
            format!("service.{contact}@example.com"),
        )
        .with(Field::property(WARRANTY, "WarrantyDurationParts"), "2")
        .with(Field::property(WARRANTY, "WarrantyDurationLabor"), "2")
        .with(Field::property(WARRANTY, "WarrantyDescription"), "n/a")
        .with(Field::property(ECONOMIC, "ReplacementCost"), "n/a")
        .with(Field::property(SERVICE_LIFE, "ExpectedLife"), "n/a");
    for dimension in ["NominalLength", "NominalWidth", "NominalHeight"] {
        baseline = baseline.with(Field::property(SPECIFICATION, dimension), "100");
    }
    for property in SPECIFICATION_TEXT {
        baseline = baseline.with(Field::property(SPECIFICATION, property), "n/a");
    }
    baseline
}

/// Component data; serial and bar code numbers are supplied per instance
pub(crate) fn component_baseline() -> Baseline {
    Baseline::new("COBie component")
        .with(Field::property(COMPONENT, "AssetIdentifier"), "n/a")
        .with(Field::property(COMPONENT, "TagNumber"), "n/a")
        .with(Field::property(COMPONENT, "InstallationDate"), DEFAULT_DATE)
        .with(Field::property(COMPONENT, "WarrantyStartDate"), DEFAULT_DATE)
}

pub(crate) fn serial_number(sequence: u32) -> String {
    format!("{sequence:07}")
}

pub(crate) fn bar_code(sequence: u32) -> String {
    format!("{:07}", sequence + 65_000)
}

#[cfg(test)]
mod tests {
    use ids_core::naming::full_match;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::rulebook::patterns::{EMAIL, NUMBER_OR_NA};

    #[test]
    fn test_product_codes_by_domain() {
        assert_eq!(product_code("HvacDomain"), "Pr_60_60");
        assert_eq!(product_code("ElectricalDomain"), "Pr_75");
        assert_eq!(product_code("SharedComponentElements"), "Pr_60");
    }

    #[test]
    fn test_baseline_contacts_are_emails() {
        let values = type_baseline("HvacDomain").values;
        let manufacturer = values
            .get(&Field::property(MANUFACTURER_TYPE, "Manufacturer"))
            .unwrap();
        assert_eq!(manufacturer, "sales.hvacdomain@example.com");
        assert!(full_match(EMAIL, manufacturer).unwrap());
    }

    #[test]
    fn test_component_numbers_are_numeric() {
        assert_eq!(serial_number(7), "0000007");
        assert_eq!(bar_code(7), "0065007");
        assert!(full_match(NUMBER_OR_NA, &bar_code(12)).unwrap());
    }
}
