//! The rules configuration document.

use std::collections::BTreeMap;
use std::path::Path;

use runeforge_core::error::DomainError;
use runeforge_rules::domain::dice::{DEFAULT_MAX_EXPLOSIONS, DiceResolver};
use runeforge_rules::domain::escalation::EscalationPolicy;
use runeforge_rules::domain::skills::{SkillCatalog, SkillCheck};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ConfigError;

/// Environment variable naming a YAML rules file.
pub const CONFIG_PATH_ENV: &str = "RUNEFORGE_RULES_CONFIG";

/// Retry ceiling used when a procedure has no tuning entry.
pub const DEFAULT_RETRY_CEILING: u32 = 3;

const BUILT_IN_SKILLS: &[(&str, &str, &str)] = &[
    ("perception", "wits", "Noticing hidden dangers and details"),
    ("wits", "wits", "Reasoning through unfamiliar problems"),
    ("finesse", "finesse", "Delicate manual work"),
    ("might", "might", "Raw physical force"),
    ("wasteland-survival", "wits", "Reading trails and terrain"),
    ("system-bypass", "finesse", "Coaxing machines into cooperating"),
];

/// A configured skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillDefinition {
    /// Governing attribute, informational only.
    #[serde(default)]
    pub attribute: Option<String>,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
}

/// Escalation tuning for one procedure kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureTuning {
    /// Failures allowed in a phase before the setback. `None` is unbounded.
    #[serde(default = "default_retry_ceiling")]
    pub retry_ceiling: Option<u32>,
    /// Lowest effective DC.
    #[serde(default)]
    pub floor: i32,
    /// DC added per failed attempt.
    #[serde(default = "default_per_attempt_penalty")]
    pub per_attempt_penalty: u32,
}

#[allow(clippy::unnecessary_wraps)]
fn default_retry_ceiling() -> Option<u32> {
    Some(DEFAULT_RETRY_CEILING)
}

fn default_per_attempt_penalty() -> u32 {
    EscalationPolicy::DEFAULT_PER_ATTEMPT_PENALTY
}

impl Default for ProcedureTuning {
    fn default() -> Self {
        Self {
            retry_ceiling: default_retry_ceiling(),
            floor: 0,
            per_attempt_penalty: default_per_attempt_penalty(),
        }
    }
}

impl ProcedureTuning {
    /// Documented defaults for a procedure kind; unknown kinds get the
    /// generic defaults.
    #[must_use]
    pub fn built_in(kind: &str) -> Self {
        match kind {
            "jury-rig" => Self {
                retry_ceiling: None,
                floor: 4,
                per_attempt_penalty: 0,
            },
            _ => Self::default(),
        }
    }

    /// The retry ceiling as a `PhaseRule` bound; unbounded becomes `u32::MAX`.
    #[must_use]
    pub fn ceiling(&self) -> u32 {
        self.retry_ceiling.unwrap_or(u32::MAX)
    }

    /// The escalation policy these settings describe.
    #[must_use]
    pub const fn escalation_policy(&self) -> EscalationPolicy {
        EscalationPolicy::new(self.per_attempt_penalty, self.floor)
    }
}

/// Dice engine settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceSettings {
    /// Explosion dice allowed per roll.
    #[serde(default = "default_max_explosions")]
    pub max_explosions: u32,
}

fn default_max_explosions() -> u32 {
    DEFAULT_MAX_EXPLOSIONS
}

impl Default for DiceSettings {
    fn default() -> Self {
        Self {
            max_explosions: DEFAULT_MAX_EXPLOSIONS,
        }
    }
}

/// Rules configuration: skill catalog, procedure tuning and dice settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesConfig {
    #[serde(default = "built_in_skills")]
    skills: BTreeMap<String, SkillDefinition>,
    #[serde(default)]
    procedures: BTreeMap<String, ProcedureTuning>,
    #[serde(default)]
    dice: DiceSettings,
}

fn built_in_skills() -> BTreeMap<String, SkillDefinition> {
    BUILT_IN_SKILLS
        .iter()
        .map(|(id, attribute, description)| {
            (
                (*id).to_owned(),
                SkillDefinition {
                    attribute: Some((*attribute).to_owned()),
                    description: (*description).to_owned(),
                },
            )
        })
        .collect()
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            skills: built_in_skills(),
            procedures: BTreeMap::new(),
            dice: DiceSettings::default(),
        }
    }
}

impl RulesConfig {
    /// Parses and validates a YAML document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed YAML and
    /// `ConfigError::Invalid` if validation fails.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a YAML file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` if the file cannot be read, otherwise as
    /// [`RulesConfig::from_yaml_str`].
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml_str(&yaml)?;
        info!(path = %path.display(), skills = config.skills.len(), "loaded rules config");
        Ok(config)
    }

    /// Loads the file named by `RUNEFORGE_RULES_CONFIG`, or the built-in
    /// defaults when the variable is unset.
    ///
    /// # Errors
    ///
    /// As [`RulesConfig::from_path`].
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_path(path),
            Err(_) => {
                debug!("{CONFIG_PATH_ENV} not set; using built-in rules config");
                Ok(Self::default())
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(blank) = self.skills.keys().find(|id| id.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!("blank skill id {blank:?}")));
        }
        if self.dice.max_explosions == 0 {
            return Err(ConfigError::Invalid(
                "dice.max_explosions must be at least 1".to_owned(),
            ));
        }
        Ok(())
    }

    /// The definition of `skill_id`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Configuration` if the skill is not configured.
    pub fn skill(&self, skill_id: &str) -> Result<&SkillDefinition, DomainError> {
        self.skills
            .get(skill_id)
            .ok_or_else(|| DomainError::Configuration(format!("unknown skill: {skill_id}")))
    }

    /// Tuning for `kind`, falling back to its documented defaults.
    #[must_use]
    pub fn procedure(&self, kind: &str) -> ProcedureTuning {
        self.procedures
            .get(kind)
            .copied()
            .unwrap_or_else(|| ProcedureTuning::built_in(kind))
    }

    /// Dice settings.
    #[must_use]
    pub const fn dice(&self) -> DiceSettings {
        self.dice
    }

    /// Explosion dice allowed per roll.
    #[must_use]
    pub const fn max_explosions(&self) -> u32 {
        self.dice.max_explosions
    }

    /// A dice resolver honouring the configured explosion cap.
    #[must_use]
    pub const fn dice_resolver(&self) -> DiceResolver {
        DiceResolver::new(self.dice.max_explosions)
    }

    /// A skill-check resolver over this catalog.
    #[must_use]
    pub fn skill_check(&self) -> SkillCheck<'_> {
        SkillCheck::new(self, self.dice_resolver())
    }
}

impl SkillCatalog for RulesConfig {
    fn has_skill(&self, skill_id: &str) -> bool {
        self.skills.contains_key(skill_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_has_built_in_skills() {
        let config = RulesConfig::default();

        for id in ["perception", "wits", "finesse", "might", "wasteland-survival", "system-bypass"] {
            assert!(config.has_skill(id), "missing {id}");
        }
    }

    #[test]
    fn test_unknown_skill_is_configuration_error() {
        let config = RulesConfig::default();

        match config.skill("basket-weaving").unwrap_err() {
            DomainError::Configuration(msg) => assert_eq!(msg, "unknown skill: basket-weaving"),
            other => panic!("expected Configuration, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_procedure_falls_back_to_defaults() {
        let config = RulesConfig::default();

        let tuning = config.procedure("lockpicking");

        assert_eq!(tuning, ProcedureTuning::default());
        assert_eq!(tuning.retry_ceiling, Some(3));
        assert_eq!(tuning.per_attempt_penalty, 1);
        assert_eq!(tuning.floor, 0);
    }

    #[test]
    fn test_jury_rig_defaults_to_floor_four_without_ceiling() {
        let tuning = RulesConfig::default().procedure("jury-rig");

        assert_eq!(tuning.floor, 4);
        assert_eq!(tuning.retry_ceiling, None);
        assert_eq!(tuning.escalation_policy().floor(), 4);
    }

    #[test]
    fn test_yaml_overrides_and_partial_entries() {
        let yaml = r"
skills:
  perception:
    attribute: wits
  wasteland-survival: {}
procedures:
  tracking:
    retry_ceiling: 5
  jury-rig:
    floor: 2
    retry_ceiling: null
dice:
  max_explosions: 12
";

        let config = RulesConfig::from_yaml_str(yaml).unwrap();

        assert!(config.has_skill("perception"));
        assert!(!config.has_skill("might"));
        let tracking = config.procedure("tracking");
        assert_eq!(tracking.retry_ceiling, Some(5));
        assert_eq!(tracking.per_attempt_penalty, 1);
        let jury_rig = config.procedure("jury-rig");
        assert_eq!(jury_rig.floor, 2);
        assert_eq!(jury_rig.retry_ceiling, None);
        assert_eq!(config.dice_resolver().max_explosions(), 12);
    }

    #[test]
    fn test_empty_document_uses_built_ins() {
        let config = RulesConfig::from_yaml_str("{}").unwrap();

        assert_eq!(config, RulesConfig::default());
    }

    #[test]
    fn test_zero_max_explosions_is_invalid() {
        let result = RulesConfig::from_yaml_str("dice:\n  max_explosions: 0\n");

        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_malformed_yaml_is_parse_error() {
        let result = RulesConfig::from_yaml_str("skills: [unterminated");

        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let path = std::env::temp_dir().join(format!("runeforge-missing-{}.yaml", uuid::Uuid::new_v4()));

        let err = RulesConfig::from_path(&path).unwrap_err();

        assert!(matches!(err, ConfigError::Io { .. }));
        let domain: DomainError = err.into();
        assert!(matches!(domain, DomainError::Configuration(_)));
    }

    #[test]
    fn test_from_path_reads_yaml_file() {
        let path = std::env::temp_dir().join(format!("runeforge-rules-{}.yaml", uuid::Uuid::new_v4()));
        std::fs::write(&path, "skills:\n  might: {}\n").unwrap();

        let config = RulesConfig::from_path(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert!(config.has_skill("might"));
        assert!(!config.has_skill("perception"));
    }
}
