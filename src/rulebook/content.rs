//! DfE content tables: storeys, zones, ADS codes and Uniclass spaces

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Floor {
    pub code: String,
    /// Absent for placeholder codes such as `XX` and `ZZ`
    #[serde(default)]
    pub name: Option<String>,
    pub description: String,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneDefinition {
    pub code: String,
    pub category: String,
    pub description: String,
}

/// Area data sheet code and the Uniclass space it maps to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdsCode {
    pub code: String,
    pub description: String,
    pub uniclass: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniclassCode {
    pub code: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct FloorTable {
    pub floors: Vec<Floor>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ZoneTable {
    pub zones: Vec<ZoneDefinition>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct AdsTable {
    pub ads_codes: Vec<AdsCode>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct UniclassTable {
    pub uniclass_sl: Vec<UniclassCode>,
}

/// Every table the rulebook and the fixture scripts draw values from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainContent {
    pub floors: Vec<Floor>,
    pub zones: Vec<ZoneDefinition>,
    pub ads_codes: Vec<AdsCode>,
    pub uniclass_sl: Vec<UniclassCode>,
}

impl DomainContent {
    pub fn floor(&self, code: &str) -> Option<&Floor> {
        self.floors.iter().find(|f| f.code == code)
    }

    /// Floors that can name a storey
    pub fn named_floors(&self) -> impl Iterator<Item = &Floor> + '_ {
        self.floors.iter().filter(|f| f.name.is_some())
    }

    pub fn floor_names(&self) -> Vec<&str> {
        self.named_floors().filter_map(|f| f.name.as_deref()).collect()
    }

    pub fn floor_descriptions(&self) -> Vec<&str> {
        self.named_floors().map(|f| f.description.as_str()).collect()
    }

    pub fn zone(&self, code: &str) -> Option<&ZoneDefinition> {
        self.zones.iter().find(|z| z.code == code)
    }

    pub fn zone_codes(&self) -> Vec<&str> {
        self.zones.iter().map(|z| z.code.as_str()).collect()
    }

    pub fn zone_descriptions(&self) -> Vec<&str> {
        self.zones.iter().map(|z| z.description.as_str()).collect()
    }

    /// Distinct categories in first-seen order
    pub fn zone_categories(&self) -> Vec<&str> {
        let mut categories: Vec<&str> = Vec::new();
        for zone in &self.zones {
            if !categories.contains(&zone.category.as_str()) {
                categories.push(&zone.category);
            }
        }
        categories
    }

    pub fn ads_code_values(&self) -> Vec<&str> {
        self.ads_codes.iter().map(|a| a.code.as_str()).collect()
    }

    pub fn uniclass_codes(&self) -> Vec<&str> {
        self.uniclass_sl.iter().map(|u| u.code.as_str()).collect()
    }

    /// ADS codes grouped by Uniclass space, in order of first appearance
    pub fn uniclass_ads_map(&self) -> Vec<(&str, Vec<&str>)> {
        let mut map: Vec<(&str, Vec<&str>)> = Vec::new();
        for ads in &self.ads_codes {
            match map.iter_mut().find(|(uniclass, _)| *uniclass == ads.uniclass) {
                Some((_, codes)) => codes.push(&ads.code),
                None => map.push((&ads.uniclass, vec![&ads.code])),
            }
        }
        map
    }

    /// Uniclass spaces that at least one ADS code maps to
    pub fn mapped_uniclass(&self) -> Vec<&UniclassCode> {
        self.uniclass_sl
            .iter()
            .filter(|u| self.ads_codes.iter().any(|a| a.uniclass == u.code))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn content() -> DomainContent {
        DomainContent {
            floors: vec![
                Floor {
                    code: "XX".into(),
                    name: None,
                    description: "No spatial sub-division is applicable".into(),
                    category: "n/a".into(),
                },
                Floor {
                    code: "00".into(),
                    name: Some("Level 00".into()),
                    description: "Base level of building".into(),
                    category: "Floor".into(),
                },
            ],
            zones: vec![
                ZoneDefinition {
                    code: "Basic teaching".into(),
                    category: "Teaching".into(),
                    description: "Classrooms".into(),
                },
                ZoneDefinition {
                    code: "Learning resources".into(),
                    category: "Teaching".into(),
                    description: "Libraries".into(),
                },
                ZoneDefinition {
                    code: "Non-net".into(),
                    category: "Non-net".into(),
                    description: "Circulation".into(),
                },
            ],
            ads_codes: vec![
                AdsCode {
                    code: "CLA11".into(),
                    description: "Classrooms (nursery)".into(),
                    uniclass: "SL_25_10_14".into(),
                },
                AdsCode {
                    code: "STT10".into(),
                    description: "Teaching resources stores".into(),
                    uniclass: "SL_90_50_87".into(),
                },
                AdsCode {
                    code: "CLA12".into(),
                    description: "Classrooms (general)".into(),
                    uniclass: "SL_25_10_14".into(),
                },
            ],
            uniclass_sl: vec![
                UniclassCode {
                    code: "SL_25_10_14".into(),
                    description: "Classrooms".into(),
                },
                UniclassCode {
                    code: "SL_42_40_30".into(),
                    description: "Changing rooms".into(),
                },
            ],
        }
    }

    #[test]
    fn test_placeholder_floors_are_not_storey_names() {
        let content = content();
        assert_eq!(content.floor_names(), vec!["Level 00"]);
        assert_eq!(content.floor_descriptions(), vec!["Base level of building"]);
        assert!(content.floor("XX").is_some());
    }

    #[test]
    fn test_zone_categories_are_distinct() {
        assert_eq!(content().zone_categories(), vec!["Teaching", "Non-net"]);
    }

    #[test]
    fn test_ads_map_keeps_first_appearance_order() {
        let content = content();
        assert_eq!(
            content.uniclass_ads_map(),
            vec![
                ("SL_25_10_14", vec!["CLA11", "CLA12"]),
                ("SL_90_50_87", vec!["STT10"]),
            ]
        );
        let mapped: Vec<&str> = content.mapped_uniclass().iter().map(|u| u.code.as_str()).collect();
        assert_eq!(mapped, vec!["SL_25_10_14"]);
    }
}
