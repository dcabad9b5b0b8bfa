use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Canonical pipeline stages, in board order.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Stage {
    Lead,
    Qualified,
    Proposal,
    Negotiation,
    ClosedWon,
    ClosedLost,
}

impl Stage {
    /// The canonical label, as stored and rendered everywhere.
    pub const fn as_str(self) -> &'static str {
        match self {
            Stage::Lead => "Lead",
            Stage::Qualified => "Qualified",
            Stage::Proposal => "Proposal",
            Stage::Negotiation => "Negotiation",
            Stage::ClosedWon => "Closed Won",
            Stage::ClosedLost => "Closed Lost",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Stage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Stage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        StageRegistry::global()
            .normalize(&label)
            .map_err(serde::de::Error::custom)
    }
}

/// Per-stage metadata: board position, default win likelihood, terminal flags.
#[derive(Clone, Debug)]
pub struct StageDefinition {
    pub stage: Stage,
    pub sort_order: i16,
    pub default_probability: i16,
    pub is_won: bool,
    pub is_lost: bool,
}

const STAGE_DEFAULTS: [(Stage, i16, i16, bool, bool); 6] = [
    (Stage::Lead, 10, 10, false, false),
    (Stage::Qualified, 20, 25, false, false),
    (Stage::Proposal, 30, 50, false, false),
    (Stage::Negotiation, 40, 70, false, false),
    (Stage::ClosedWon, 90, 100, true, false),
    (Stage::ClosedLost, 95, 0, false, true),
];

const LEGACY_ALIASES: [(&str, Stage); 2] = [
    ("Initial", Stage::Lead),
    ("Qualification", Stage::Qualified),
];

static GLOBAL: Lazy<StageRegistry> = Lazy::new(StageRegistry::default);

/// The single lookup table for stage labels. Every component resolves labels
/// here so records written under the older naming scheme and current records
/// are never treated as distinct stages.
pub struct StageRegistry {
    definitions: Vec<StageDefinition>,
    labels: HashMap<String, Stage>,
}

impl Default for StageRegistry {
    fn default() -> Self {
        let definitions: Vec<StageDefinition> = STAGE_DEFAULTS
            .iter()
            .map(
                |&(stage, sort_order, default_probability, is_won, is_lost)| StageDefinition {
                    stage,
                    sort_order,
                    default_probability,
                    is_won,
                    is_lost,
                },
            )
            .collect();
        let mut labels = HashMap::new();
        for definition in &definitions {
            labels.insert(definition.stage.as_str().to_lowercase(), definition.stage);
        }
        for (alias, stage) in LEGACY_ALIASES {
            labels.insert(alias.to_lowercase(), stage);
        }
        Self {
            definitions,
            labels,
        }
    }
}

impl StageRegistry {
    /// Process-wide registry instance.
    pub fn global() -> &'static StageRegistry {
        &GLOBAL
    }

    /// Resolve a label (canonical or legacy, any case) to its canonical stage.
    pub fn normalize(&self, label: &str) -> Result<Stage, PipelineError> {
        let trimmed = label.trim();
        self.labels
            .get(&trimmed.to_lowercase())
            .copied()
            .ok_or_else(|| PipelineError::UnknownStage(trimmed.to_string()))
    }

    pub fn is_terminal(&self, stage: Stage) -> bool {
        let definition = self.definition(stage);
        definition.is_won || definition.is_lost
    }

    /// Ordered stage definitions.
    pub fn definitions(&self) -> &[StageDefinition] {
        &self.definitions
    }

    pub fn definition(&self, stage: Stage) -> &StageDefinition {
        self.definitions
            .iter()
            .find(|definition| definition.stage == stage)
            .unwrap_or(&self.definitions[0])
    }

    /// Board position, used to order derived reports.
    pub fn position(&self, stage: Stage) -> usize {
        self.definitions
            .iter()
            .position(|definition| definition.stage == stage)
            .unwrap_or(usize::MAX)
    }

    /// Where newly created opportunities start.
    pub fn first_stage(&self) -> Stage {
        self.definitions[0].stage
    }

    pub fn won_stage(&self) -> Stage {
        self.stage_where(|definition| definition.is_won)
    }

    pub fn lost_stage(&self) -> Stage {
        self.stage_where(|definition| definition.is_lost)
    }

    fn stage_where(&self, predicate: impl Fn(&StageDefinition) -> bool) -> Stage {
        self.definitions
            .iter()
            .find(|definition| predicate(definition))
            .map(|definition| definition.stage)
            .unwrap_or(self.definitions[0].stage)
    }
}
