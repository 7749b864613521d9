//! Reading UMB files
//!
//! The index is parsed and validated when the file is opened. Every
//! extraction afterwards opens the archive again, scans forward to its entry
//! and pushes decoded values into the caller's closure, so arrays of any size
//! can be consumed without holding them in memory.

use crate::archive::ArchiveReader;
use crate::arrays::decode::{
    read_all, read_bool_indices, read_bools, read_elements, read_records, read_strings,
};
use std::path::{Path, PathBuf};
use umb_core::csr::{indexed, offset_count, Max, OffsetsToCounts};
use umb_core::{
    files, groups, valuations_file, Annotation, ArrayElement, BitString, Entity, Layout,
    NumericType, Result, UmbError, UmbIndex, ValueType, INDEX_FILE,
};

/// An opened UMB file
#[derive(Debug, Clone)]
pub struct UmbReader {
    path: PathBuf,
    index: UmbIndex,
}

impl UmbReader {
    /// Open `path` and load its index
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let archive = ArchiveReader::open(&path)?;
        let compression = archive.compression();
        let json = archive.find_entry(INDEX_FILE, |entry| entry.read_to_string())?;
        let index = UmbIndex::from_json(&json)?;
        index.validate()?;
        tracing::debug!(
            path = %path.display(),
            ?compression,
            states = index.num_states()?,
            "opened UMB file"
        );
        Ok(Self { path, index })
    }

    pub fn index(&self) -> &UmbIndex {
        &self.index
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn archive(&self) -> Result<ArchiveReader> {
        ArchiveReader::open(&self.path)
    }

    fn extract<T: ArrayElement>(&self, name: &str, count: u64, sink: impl FnMut(T)) -> Result<()> {
        self.archive()?
            .find_entry(name, |mut entry| read_elements(&mut entry, count, sink))
    }

    /// Whether the archive contains an entry called `name`
    pub fn has_entry(&self, name: &str) -> Result<bool> {
        self.archive()?.contains_entry(name)
    }

    /// Every entry name in stored order
    pub fn entry_names(&self) -> Result<Vec<String>> {
        self.archive()?.entry_names()
    }

    // Transition system

    pub fn extract_state_choice_offsets(&self, sink: impl FnMut(u64)) -> Result<()> {
        let count = offset_count("#states", self.index.num_states()?)?;
        self.extract(files::STATE_CHOICE_OFFSETS, count, sink)
    }

    pub fn extract_choice_branch_offsets(&self, sink: impl FnMut(u64)) -> Result<()> {
        let count = offset_count("#choices", self.index.num_choices()?)?;
        self.extract(files::CHOICE_BRANCH_OFFSETS, count, sink)
    }

    pub fn extract_branch_targets(&self, sink: impl FnMut(u64)) -> Result<()> {
        let count = self.index.num_branches()?;
        self.extract(files::BRANCH_TARGETS, count, sink)
    }

    /// Branch probabilities; interval types yield lower and upper bound per branch
    pub fn extract_branch_probabilities(&self, sink: impl FnMut(f64)) -> Result<()> {
        require_double("branch-probability-type", self.index.branch_probability_type()?)?;
        let count = self.index.branch_probability_count()?;
        self.extract(files::BRANCH_PROBABILITIES, count, sink)
    }

    /// Exit rates; interval types yield two values per state
    pub fn extract_exit_rates(&self, sink: impl FnMut(f64)) -> Result<()> {
        require_double("exit-rate-type", self.index.exit_rate_type()?)?;
        let count = self.index.exit_rate_count()?;
        self.extract(files::EXIT_RATES, count, sink)
    }

    /// Indices of the initial states, ascending
    pub fn extract_initial_states(&self, sink: impl FnMut(u64)) -> Result<()> {
        let count = self.index.num_states()?;
        self.archive()?.find_entry(files::INITIAL_STATES, |mut entry| {
            read_bool_indices(&mut entry, count, sink)
        })
    }

    /// Initial-state flag of every state
    pub fn extract_initial_state_flags(&self, sink: impl FnMut(bool)) -> Result<()> {
        let count = self.index.num_states()?;
        self.archive()?
            .find_entry(files::INITIAL_STATES, |mut entry| read_bools(&mut entry, count, sink))
    }

    /// Number of choices of every state
    pub fn extract_state_choice_counts(&self, sink: impl FnMut(u64)) -> Result<()> {
        let mut counts = OffsetsToCounts::new(sink);
        self.extract_state_choice_offsets(|offset| counts.accept(offset))?;
        counts.finish(files::STATE_CHOICE_OFFSETS)
    }

    /// Number of branches of every choice
    pub fn extract_choice_branch_counts(&self, sink: impl FnMut(u64)) -> Result<()> {
        let mut counts = OffsetsToCounts::new(sink);
        self.extract_choice_branch_offsets(|offset| counts.accept(offset))?;
        counts.finish(files::CHOICE_BRANCH_OFFSETS)
    }

    /// Largest number of choices in any state (0 for a model without states)
    pub fn max_state_choice_count(&self) -> Result<u64> {
        let mut max = Max::new();
        self.extract_state_choice_counts(|count| max.accept(count))?;
        Ok(max.get().unwrap_or(0))
    }

    // Actions

    pub fn has_choice_actions(&self) -> Result<bool> {
        self.has_entry(files::CHOICE_ACTIONS)
    }

    pub fn has_branch_actions(&self) -> Result<bool> {
        self.has_entry(files::BRANCH_ACTIONS)
    }

    /// Action index of every choice
    pub fn extract_choice_actions(&self, sink: impl FnMut(u32)) -> Result<()> {
        let count = self.index.num_choices()?;
        self.extract(files::CHOICE_ACTIONS, count, sink)
    }

    /// Action index of every branch
    pub fn extract_branch_actions(&self, sink: impl FnMut(u32)) -> Result<()> {
        let count = self.index.num_branches()?;
        self.extract(files::BRANCH_ACTIONS, count, sink)
    }

    pub fn has_choice_action_strings(&self) -> Result<bool> {
        self.has_entry(files::CHOICE_ACTION_STRINGS)
    }

    pub fn has_branch_action_strings(&self) -> Result<bool> {
        self.has_entry(files::BRANCH_ACTION_STRINGS)
    }

    /// Names of the choice actions in index order
    pub fn extract_choice_action_strings(&self, sink: impl FnMut(String)) -> Result<()> {
        let count = self.index.num_choice_actions()?;
        self.extract_strings(
            files::CHOICE_ACTION_STRING_OFFSETS,
            files::CHOICE_ACTION_STRINGS,
            count,
            sink,
        )
    }

    /// Names of the branch actions in index order
    pub fn extract_branch_action_strings(&self, sink: impl FnMut(String)) -> Result<()> {
        let count = self.index.num_branch_actions()?;
        self.extract_strings(
            files::BRANCH_ACTION_STRING_OFFSETS,
            files::BRANCH_ACTION_STRINGS,
            count,
            sink,
        )
    }

    fn extract_strings(
        &self,
        offsets_name: &str,
        strings_name: &str,
        count: u64,
        sink: impl FnMut(String),
    ) -> Result<()> {
        let offset_len = offset_count(offsets_name, count)?;
        let offsets = self
            .archive()?
            .find_entry(offsets_name, |mut entry| read_all::<u64>(&mut entry, offset_len))?;
        self.archive()?
            .find_entry(strings_name, |mut entry| read_strings(&mut entry, &offsets, sink))
    }

    // Annotations

    /// Entry holding the `entity` values of `annotation`, checking it stores `expected` values
    fn annotation_entry(
        &self,
        annotation: &Annotation,
        entity: Entity,
        expected: ValueType,
    ) -> Result<(String, u64)> {
        if !annotation.applies_to(entity) {
            return Err(UmbError::not_found(format!(
                "{entity} data for annotation \"{}/{}\"",
                annotation.group(),
                annotation.id()
            )));
        }
        let value_type = annotation.value_type()?;
        if value_type != expected {
            return Err(UmbError::schema(format!(
                "annotation \"{}/{}\" holds {value_type} values, not {expected}",
                annotation.group(),
                annotation.id()
            )));
        }
        Ok((annotation.file_for(entity), self.index.entity_count(entity)?))
    }

    /// Whether annotation `group`/`id` exists and has data for `entity`
    pub fn has_annotation_data(&self, group: &str, id: &str, entity: Entity) -> bool {
        self.index
            .annotation(group, id)
            .is_ok_and(|annotation| annotation.applies_to(entity))
    }

    /// Boolean annotation values, one per element of `entity`
    pub fn extract_bool_annotation(
        &self,
        group: &str,
        id: &str,
        entity: Entity,
        sink: impl FnMut(bool),
    ) -> Result<()> {
        let annotation = self.index.annotation(group, id)?;
        let (name, count) = self.annotation_entry(annotation, entity, ValueType::Bool)?;
        self.archive()?
            .find_entry(&name, |mut entry| read_bools(&mut entry, count, sink))
    }

    /// Indices of the elements of `entity` where a boolean annotation holds
    pub fn extract_bool_annotation_sparse(
        &self,
        group: &str,
        id: &str,
        entity: Entity,
        sink: impl FnMut(u64),
    ) -> Result<()> {
        let annotation = self.index.annotation(group, id)?;
        let (name, count) = self.annotation_entry(annotation, entity, ValueType::Bool)?;
        self.archive()?
            .find_entry(&name, |mut entry| read_bool_indices(&mut entry, count, sink))
    }

    /// Boolean annotation values paired with element indices
    pub fn extract_indexed_bool_annotation(
        &self,
        group: &str,
        id: &str,
        entity: Entity,
        sink: impl FnMut(u64, bool),
    ) -> Result<()> {
        self.extract_bool_annotation(group, id, entity, indexed(sink))
    }

    pub fn extract_int_annotation(
        &self,
        group: &str,
        id: &str,
        entity: Entity,
        sink: impl FnMut(i32),
    ) -> Result<()> {
        let annotation = self.index.annotation(group, id)?;
        let (name, count) = self.annotation_entry(annotation, entity, ValueType::Int)?;
        self.extract(&name, count, sink)
    }

    pub fn extract_indexed_int_annotation(
        &self,
        group: &str,
        id: &str,
        entity: Entity,
        sink: impl FnMut(u64, i32),
    ) -> Result<()> {
        self.extract_int_annotation(group, id, entity, indexed(sink))
    }

    pub fn extract_double_annotation(
        &self,
        group: &str,
        id: &str,
        entity: Entity,
        sink: impl FnMut(f64),
    ) -> Result<()> {
        let annotation = self.index.annotation(group, id)?;
        let (name, count) = self.annotation_entry(annotation, entity, ValueType::Double)?;
        self.extract(&name, count, sink)
    }

    pub fn extract_indexed_double_annotation(
        &self,
        group: &str,
        id: &str,
        entity: Entity,
        sink: impl FnMut(u64, f64),
    ) -> Result<()> {
        self.extract_double_annotation(group, id, entity, indexed(sink))
    }

    fn id_for_alias(&self, group: &str, alias: &str) -> Result<String> {
        Ok(self.index.annotation_by_alias(group, alias)?.id().to_string())
    }

    /// States satisfying the atomic proposition `id`
    pub fn extract_state_ap(&self, id: &str, sink: impl FnMut(u64)) -> Result<()> {
        self.extract_bool_annotation_sparse(groups::APS, id, Entity::States, sink)
    }

    pub fn extract_state_ap_by_alias(&self, alias: &str, sink: impl FnMut(u64)) -> Result<()> {
        let id = self.id_for_alias(groups::APS, alias)?;
        self.extract_state_ap(&id, sink)
    }

    /// Values of reward structure `id` for `entity`
    pub fn extract_rewards(&self, id: &str, entity: Entity, sink: impl FnMut(f64)) -> Result<()> {
        self.extract_double_annotation(groups::REWARDS, id, entity, sink)
    }

    pub fn extract_rewards_by_alias(
        &self,
        alias: &str,
        entity: Entity,
        sink: impl FnMut(f64),
    ) -> Result<()> {
        let id = self.id_for_alias(groups::REWARDS, alias)?;
        self.extract_rewards(&id, entity, sink)
    }

    // Valuations

    pub fn has_state_valuations(&self) -> bool {
        self.index.state_valuations.is_some()
    }

    /// Layout of the state valuation records
    pub fn state_valuation_layout(&self) -> Result<Layout> {
        let description = self
            .index
            .state_valuations
            .as_ref()
            .ok_or_else(|| UmbError::not_found("state valuations"))?;
        Layout::from_description(description)
    }

    /// One bit-packed record per state
    pub fn extract_state_valuations(&self, sink: impl FnMut(BitString)) -> Result<()> {
        let description = self
            .index
            .state_valuations
            .as_ref()
            .ok_or_else(|| UmbError::not_found("state valuations"))?;
        let width = description.record_bytes()?;
        let count = self.index.num_states()?;
        self.archive()?
            .find_entry(&valuations_file(Entity::States), |mut entry| {
                read_records(&mut entry, count, width, sink)
            })
    }
}

fn require_double(field: &str, numeric: NumericType) -> Result<()> {
    if numeric.is_double() {
        Ok(())
    } else {
        Err(UmbError::schema(format!(
            "\"{field}\" is {numeric}; only double values can be read"
        )))
    }
}
