//! Lifecycle stages and generation passes
//!
//! Rules are compiled once per (target stage, target pass) combination. A
//! scope carries a [`LifecycleStages`] window and a [`GenerationPass`] set;
//! rules created inside it are only emitted when both contain the target.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// A single RIBA plan-of-work stage
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
pub enum RibaStage {
    Stage1,
    Stage2,
    Stage3,
    Stage4,
    Stage5,
    Stage6,
    Stage7,
}

impl RibaStage {
    pub fn number(self) -> u8 {
        match self {
            Self::Stage1 => 1,
            Self::Stage2 => 2,
            Self::Stage3 => 3,
            Self::Stage4 => 4,
            Self::Stage5 => 5,
            Self::Stage6 => 6,
            Self::Stage7 => 7,
        }
    }

    /// Short label, e.g. "Stage 3"
    pub fn short_description(self) -> String {
        format!("Stage {}", self.number())
    }

    /// Milestone text used in group metadata and the project phase rule
    pub fn description(self) -> &'static str {
        match self {
            Self::Stage1 => "RIBA Stage 1: Preparation and Brief",
            Self::Stage2 => "RIBA Stage 2: Concept Design",
            Self::Stage3 => "RIBA Stage 3: Spatial Coordination",
            Self::Stage4 => "RIBA Stage 4: Technical Design",
            Self::Stage5 => "RIBA Stage 5: Construction and Manufacturing",
            Self::Stage6 => "RIBA Stage 6: Handover and Close Out",
            Self::Stage7 => "RIBA Stage 7: Use",
        }
    }

    pub fn mask(self) -> LifecycleStages {
        LifecycleStages::from_bits_truncate(1 << self.number())
    }

    /// Stages 1-6 can be compiled for; Stage 7 (Use) only appears in windows
    pub fn is_valid_target(self) -> bool {
        self != Self::Stage7
    }

    pub fn all_descriptions() -> Vec<&'static str> {
        Self::iter().map(Self::description).collect()
    }
}

bitflags! {
    /// Window of stages a rule applies to
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct LifecycleStages: u16 {
        const STAGE1 = 1 << 1;
        const STAGE2 = 1 << 2;
        const STAGE3 = 1 << 3;
        const STAGE4 = 1 << 4;
        const STAGE5 = 1 << 5;
        const STAGE6 = 1 << 6;
        const STAGE7 = 1 << 7;

        const STAGE6_PLUS = Self::STAGE6.bits() | Self::STAGE7.bits();
        const STAGE5_PLUS = Self::STAGE5.bits() | Self::STAGE6_PLUS.bits();
        const STAGE4_PLUS = Self::STAGE4.bits() | Self::STAGE5_PLUS.bits();
        const STAGE3_PLUS = Self::STAGE3.bits() | Self::STAGE4_PLUS.bits();
        const STAGE2_PLUS = Self::STAGE2.bits() | Self::STAGE3_PLUS.bits();

        const ALL = Self::STAGE1.bits() | Self::STAGE2_PLUS.bits();
    }
}

impl Default for LifecycleStages {
    fn default() -> Self {
        LifecycleStages::ALL
    }
}

impl LifecycleStages {
    pub fn includes(self, stage: RibaStage) -> bool {
        self.contains(stage.mask())
    }
}

bitflags! {
    /// Which family of rules a compilation emits
    ///
    /// `COMPLEX` covers the per-type naming rules, which run to thousands of
    /// specifications and are published separately from the `CORE` set.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct GenerationPass: u8 {
        const CORE = 1 << 1;
        const COMPLEX = 1 << 2;
        const ALL = Self::CORE.bits() | Self::COMPLEX.bits();
    }
}

impl Default for GenerationPass {
    fn default() -> Self {
        GenerationPass::CORE
    }
}

impl GenerationPass {
    /// File-name suffix for a compiled bundle
    pub fn file_suffix(self) -> &'static str {
        if self == Self::CORE {
            "-Core"
        } else if self == Self::COMPLEX {
            "-Naming"
        } else {
            ""
        }
    }

    pub fn label(self) -> &'static str {
        if self == Self::CORE {
            "Core"
        } else if self == Self::COMPLEX {
            "Complex"
        } else if self == Self::ALL {
            "All"
        } else {
            "None"
        }
    }

    /// Parse a CLI or config label: core, complex (or naming), all
    pub fn parse_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "core" => Some(Self::CORE),
            "complex" | "naming" => Some(Self::COMPLEX),
            "all" => Some(Self::ALL),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_stage_masks_are_cumulative() {
        assert!(LifecycleStages::STAGE4_PLUS.includes(RibaStage::Stage4));
        assert!(LifecycleStages::STAGE4_PLUS.includes(RibaStage::Stage7));
        assert!(!LifecycleStages::STAGE4_PLUS.includes(RibaStage::Stage3));
        assert!(LifecycleStages::ALL.includes(RibaStage::Stage1));
        assert_eq!(
            LifecycleStages::STAGE3 | LifecycleStages::STAGE4_PLUS,
            LifecycleStages::STAGE3_PLUS
        );
    }

    #[test]
    fn test_stage_parse_and_describe() {
        let stage = RibaStage::from_str("Stage3").unwrap();
        assert_eq!(stage, RibaStage::Stage3);
        assert_eq!(stage.to_string(), "Stage3");
        assert_eq!(stage.short_description(), "Stage 3");
        assert_eq!(stage.description(), "RIBA Stage 3: Spatial Coordination");
        assert!(!RibaStage::Stage7.is_valid_target());
    }

    #[test]
    fn test_pass_suffixes() {
        assert_eq!(GenerationPass::CORE.file_suffix(), "-Core");
        assert_eq!(GenerationPass::COMPLEX.file_suffix(), "-Naming");
        assert_eq!(GenerationPass::ALL.file_suffix(), "");
        assert_eq!(GenerationPass::parse_label("Naming"), Some(GenerationPass::COMPLEX));
        assert!(GenerationPass::ALL.intersects(GenerationPass::COMPLEX));
    }
}
