//! Index (`index.json`) model for the UMB format
//!
//! The index describes the transition system, the annotation registry and
//! the optional valuation layout. It is built incrementally while writing,
//! validated once before export, and parsed and validated eagerly when a
//! file is opened. Field names are kebab-case; counts carry a `#` prefix.

mod annotations;
mod valuations;

pub use annotations::Annotation;
pub use valuations::{ValuationDescription, ValuationItem};

use crate::format::{
    Entity, NumericType, TimeNotion, FORMAT_REVISION, FORMAT_VERSION,
};
use crate::validation::validate_id;
use crate::{Result, UmbError};
use hashbrown::HashMap;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Descriptive information about the model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ModelData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Information about the file and the tool that produced it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FileData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_version: Option<String>,
    /// Seconds since the Unix epoch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
}

/// Shape and numeric types of the transition system
///
/// Counts are signed so that a negative value in a parsed file reaches
/// [`TransitionSystem::validate`] and is reported by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TransitionSystem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<TimeNotion>,
    #[serde(rename = "#players", skip_serializing_if = "Option::is_none")]
    pub num_players: Option<i64>,
    #[serde(rename = "#states", skip_serializing_if = "Option::is_none")]
    pub num_states: Option<i64>,
    #[serde(rename = "#initial-states", skip_serializing_if = "Option::is_none")]
    pub num_initial_states: Option<i64>,
    #[serde(rename = "#choices", skip_serializing_if = "Option::is_none")]
    pub num_choices: Option<i64>,
    #[serde(rename = "#choice-actions", skip_serializing_if = "Option::is_none")]
    pub num_choice_actions: Option<i64>,
    #[serde(rename = "#branches", skip_serializing_if = "Option::is_none")]
    pub num_branches: Option<i64>,
    #[serde(rename = "#branch-actions", skip_serializing_if = "Option::is_none")]
    pub num_branch_actions: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_probability_type: Option<NumericType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_rate_type: Option<NumericType>,
}

fn require<T: Copy>(field: &str, value: Option<T>) -> Result<T> {
    value.ok_or_else(|| UmbError::schema(format!("required field \"{field}\" is missing")))
}

fn non_negative(field: &str, value: i64) -> Result<u64> {
    u64::try_from(value)
        .map_err(|_| UmbError::schema(format!("field \"{field}\" is negative ({value})")))
}

fn require_count(field: &str, value: Option<i64>) -> Result<u64> {
    non_negative(field, require(field, value)?)
}

fn to_count(count: u64) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}

impl TransitionSystem {
    /// Check that every required field is present and no count is negative
    pub fn validate(&self) -> Result<()> {
        let time = require("time", self.time)?;
        require_count("#players", self.num_players)?;
        require_count("#states", self.num_states)?;
        require_count("#initial-states", self.num_initial_states)?;
        require_count("#choices", self.num_choices)?;
        require_count("#choice-actions", self.num_choice_actions)?;
        require_count("#branches", self.num_branches)?;
        require_count("#branch-actions", self.num_branch_actions)?;
        require("branch-probability-type", self.branch_probability_type)?;
        if time.is_stochastic() {
            require("exit-rate-type", self.exit_rate_type)?;
        }
        Ok(())
    }

    /// `#choice-actions` if it has been set
    pub fn declared_choice_actions(&self) -> Result<Option<u64>> {
        self.num_choice_actions
            .map(|count| non_negative("#choice-actions", count))
            .transpose()
    }

    /// `#branch-actions` if it has been set
    pub fn declared_branch_actions(&self) -> Result<Option<u64>> {
        self.num_branch_actions
            .map(|count| non_negative("#branch-actions", count))
            .transpose()
    }
}

/// Contents of `index.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UmbIndex {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format_version: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format_revision: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_data: Option<ModelData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_data: Option<FileData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition_system: Option<TransitionSystem>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    annotations: IndexMap<String, IndexMap<String, Annotation>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_valuations: Option<ValuationDescription>,
    /// group -> alias -> id, derived from `annotations`
    #[serde(skip)]
    aliases: HashMap<String, HashMap<String, String>>,
}

impl Default for UmbIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl UmbIndex {
    /// Empty index for the current format version
    pub fn new() -> Self {
        Self {
            format_version: Some(FORMAT_VERSION),
            format_revision: Some(FORMAT_REVISION),
            model_data: Some(ModelData::default()),
            file_data: Some(FileData::default()),
            transition_system: Some(TransitionSystem::default()),
            annotations: IndexMap::new(),
            state_valuations: None,
            aliases: HashMap::new(),
        }
    }

    /// Parse index text and rebuild the derived alias index
    ///
    /// The result is not validated; see [`UmbIndex::validate`].
    pub fn from_json(text: &str) -> Result<Self> {
        let mut index: UmbIndex = serde_json::from_str(text)?;
        index.rebuild_alias_index();
        tracing::debug!(
            groups = index.annotations.len(),
            "parsed index"
        );
        Ok(index)
    }

    /// Pretty-printed index text
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check required fields, identifiers and valuation items
    pub fn validate(&self) -> Result<()> {
        require("format-version", self.format_version)?;
        require("format-revision", self.format_revision)?;
        self.transition_system()?.validate()?;
        for (group, annotations) in &self.annotations {
            validate_id("annotation group", group)?;
            let mut seen_aliases = hashbrown::HashSet::new();
            for (id, annotation) in annotations {
                annotation.validate(group, id)?;
                if let Some(alias) = &annotation.alias {
                    if !seen_aliases.insert(alias.as_str()) {
                        return Err(UmbError::duplicate(format!(
                            "alias \"{alias}\" used twice in annotation group \"{group}\""
                        )));
                    }
                }
            }
        }
        if let Some(description) = &self.state_valuations {
            description.validate()?;
        }
        Ok(())
    }

    pub fn transition_system(&self) -> Result<&TransitionSystem> {
        self.transition_system
            .as_ref()
            .ok_or_else(|| UmbError::schema("required field \"transition-system\" is missing"))
    }

    pub fn transition_system_mut(&mut self) -> &mut TransitionSystem {
        self.transition_system.get_or_insert_with(TransitionSystem::default)
    }

    pub fn model_data_mut(&mut self) -> &mut ModelData {
        self.model_data.get_or_insert_with(ModelData::default)
    }

    pub fn file_data_mut(&mut self) -> &mut FileData {
        self.file_data.get_or_insert_with(FileData::default)
    }

    pub fn time(&self) -> Result<TimeNotion> {
        require("time", self.transition_system()?.time)
    }

    pub fn num_players(&self) -> Result<u64> {
        require_count("#players", self.transition_system()?.num_players)
    }

    pub fn num_states(&self) -> Result<u64> {
        require_count("#states", self.transition_system()?.num_states)
    }

    pub fn num_initial_states(&self) -> Result<u64> {
        require_count("#initial-states", self.transition_system()?.num_initial_states)
    }

    pub fn num_choices(&self) -> Result<u64> {
        require_count("#choices", self.transition_system()?.num_choices)
    }

    pub fn num_choice_actions(&self) -> Result<u64> {
        require_count("#choice-actions", self.transition_system()?.num_choice_actions)
    }

    pub fn num_branches(&self) -> Result<u64> {
        require_count("#branches", self.transition_system()?.num_branches)
    }

    pub fn num_branch_actions(&self) -> Result<u64> {
        require_count("#branch-actions", self.transition_system()?.num_branch_actions)
    }

    pub fn branch_probability_type(&self) -> Result<NumericType> {
        require(
            "branch-probability-type",
            self.transition_system()?.branch_probability_type,
        )
    }

    pub fn exit_rate_type(&self) -> Result<NumericType> {
        require("exit-rate-type", self.transition_system()?.exit_rate_type)
    }

    pub fn set_time(&mut self, time: TimeNotion) -> &mut Self {
        self.transition_system_mut().time = Some(time);
        self
    }

    pub fn set_num_players(&mut self, count: u64) -> &mut Self {
        self.transition_system_mut().num_players = Some(to_count(count));
        self
    }

    pub fn set_num_states(&mut self, count: u64) -> &mut Self {
        self.transition_system_mut().num_states = Some(to_count(count));
        self
    }

    pub fn set_num_initial_states(&mut self, count: u64) -> &mut Self {
        self.transition_system_mut().num_initial_states = Some(to_count(count));
        self
    }

    pub fn set_num_choices(&mut self, count: u64) -> &mut Self {
        self.transition_system_mut().num_choices = Some(to_count(count));
        self
    }

    pub fn set_num_choice_actions(&mut self, count: u64) -> &mut Self {
        self.transition_system_mut().num_choice_actions = Some(to_count(count));
        self
    }

    pub fn set_num_branches(&mut self, count: u64) -> &mut Self {
        self.transition_system_mut().num_branches = Some(to_count(count));
        self
    }

    pub fn set_num_branch_actions(&mut self, count: u64) -> &mut Self {
        self.transition_system_mut().num_branch_actions = Some(to_count(count));
        self
    }

    pub fn set_branch_probability_type(&mut self, numeric: NumericType) -> &mut Self {
        self.transition_system_mut().branch_probability_type = Some(numeric);
        self
    }

    pub fn set_exit_rate_type(&mut self, numeric: NumericType) -> &mut Self {
        self.transition_system_mut().exit_rate_type = Some(numeric);
        self
    }

    /// Number of elements of `entity` in the model
    pub fn entity_count(&self, entity: Entity) -> Result<u64> {
        match entity {
            Entity::States => self.num_states(),
            Entity::Choices => self.num_choices(),
            Entity::Branches => self.num_branches(),
        }
    }

    /// Number of stored branch probability values (two per branch for intervals)
    pub fn branch_probability_count(&self) -> Result<u64> {
        let numeric = self.branch_probability_type()?;
        scaled_count("#branches", self.num_branches()?, numeric)
    }

    /// Number of stored exit rate values (two per state for intervals)
    pub fn exit_rate_count(&self) -> Result<u64> {
        let numeric = self.exit_rate_type()?;
        scaled_count("#states", self.num_states()?, numeric)
    }
}

fn scaled_count(field: &str, count: u64, numeric: NumericType) -> Result<u64> {
    count
        .checked_mul(numeric.values_per_entry())
        .ok_or_else(|| UmbError::schema(format!("\"{field}\" value {count} is too large")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::ValueType;

    fn dtmc_index() -> UmbIndex {
        let mut index = UmbIndex::new();
        index
            .set_time(TimeNotion::Discrete)
            .set_num_players(0)
            .set_num_states(3)
            .set_num_initial_states(1)
            .set_num_choices(3)
            .set_num_choice_actions(0)
            .set_num_branches(4)
            .set_num_branch_actions(0)
            .set_branch_probability_type(NumericType::Double);
        index
    }

    #[test]
    fn test_complete_index_validates() {
        assert!(dtmc_index().validate().is_ok());
    }

    #[test]
    fn test_missing_field_is_named() {
        let mut index = dtmc_index();
        index.transition_system_mut().num_choices = None;
        let err = index.validate().unwrap_err();
        assert!(matches!(err, UmbError::Schema(_)));
        assert!(err.to_string().contains("#choices"));

        index.transition_system = None;
        assert!(index.validate().unwrap_err().to_string().contains("transition-system"));
    }

    #[test]
    fn test_stochastic_requires_exit_rate_type() {
        let mut index = dtmc_index();
        index.set_time(TimeNotion::UrgentStochastic);
        let err = index.validate().unwrap_err();
        assert!(err.to_string().contains("exit-rate-type"));

        index.set_exit_rate_type(NumericType::Double);
        assert!(index.validate().is_ok());
    }

    #[test]
    fn test_negative_count_is_named() {
        let text = r##"{"format-version": 1, "format-revision": 0,
            "transition-system": {"time": "discrete", "#players": 0, "#states": -1,
            "#initial-states": 1, "#choices": 1, "#choice-actions": 0, "#branches": 1,
            "#branch-actions": 0, "branch-probability-type": "double"}}"##;
        let index = UmbIndex::from_json(text).unwrap();
        let err = index.validate().unwrap_err();
        assert!(matches!(err, UmbError::Schema(_)));
        assert!(err.to_string().contains("#states"));
        assert!(index.num_states().unwrap_err().to_string().contains("#states"));
        assert_eq!(index.num_choices().unwrap(), 1);
    }

    #[test]
    fn test_declared_action_counts() {
        let mut index = dtmc_index();
        index.transition_system_mut().num_branch_actions = None;
        let ts = index.transition_system().unwrap();
        assert_eq!(ts.declared_choice_actions().unwrap(), Some(0));
        assert_eq!(ts.declared_branch_actions().unwrap(), None);

        index.transition_system_mut().num_choice_actions = Some(-2);
        let ts = index.transition_system().unwrap();
        assert!(ts.declared_choice_actions().unwrap_err().to_string().contains("#choice-actions"));
    }

    #[test]
    fn test_json_field_names() {
        let mut index = dtmc_index();
        index.model_data_mut().name = Some("die".into());
        let json: serde_json::Value = serde_json::from_str(&index.to_json().unwrap()).unwrap();
        assert_eq!(json["format-version"], 1);
        assert_eq!(json["model-data"]["name"], "die");
        assert_eq!(json["transition-system"]["#states"], 3);
        assert_eq!(json["transition-system"]["time"], "discrete");
        assert_eq!(json["transition-system"]["branch-probability-type"], "double");
        assert!(json["transition-system"].get("exit-rate-type").is_none());
        assert!(json.get("annotations").is_none());
    }

    #[test]
    fn test_json_round_trip_rebuilds_aliases() {
        let mut index = dtmc_index();
        index
            .create_annotation("rewards", Some("Steps"), ValueType::Double)
            .unwrap();
        index.attach_data("rewards", "steps", Entity::States).unwrap();
        let parsed = UmbIndex::from_json(&index.to_json().unwrap()).unwrap();
        assert_eq!(parsed, index);
        assert_eq!(
            parsed.annotation_by_alias("rewards", "Steps").unwrap().id(),
            "steps"
        );
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let text = r##"{"format-version": 1, "format-revision": 0, "extra": [1, 2],
            "transition-system": {"time": "discrete", "#players": 0, "#states": 1,
            "#initial-states": 1, "#choices": 1, "#choice-actions": 0, "#branches": 1,
            "#branch-actions": 0, "branch-probability-type": "double", "future": true}}"##;
        let index = UmbIndex::from_json(text).unwrap();
        assert!(index.validate().is_ok());
        assert_eq!(index.num_branches().unwrap(), 1);
    }

    #[test]
    fn test_interval_counts_double() {
        let mut index = dtmc_index();
        assert_eq!(index.branch_probability_count().unwrap(), 4);
        index.set_branch_probability_type(NumericType::DoubleInterval);
        assert_eq!(index.branch_probability_count().unwrap(), 8);
        assert!(matches!(index.exit_rate_count(), Err(UmbError::Schema(_))));
    }
}
