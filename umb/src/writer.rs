//! Building and exporting UMB files
//!
//! A [`UmbWriter`] collects the index and a queue of value producers, one per
//! archive entry. Nothing is encoded until export: `index.json` is written
//! first, then each queued array in the order it was added, pulling values
//! from its producer as the archive consumes bytes.

use crate::archive::ArchiveWriter;
use crate::arrays::{ArraySource, PendingEntry};
use crate::config::ExportConfig;
use std::io::Write;
use std::path::Path;
use umb_core::csr::offset_count;
use umb_core::{
    files, groups, valuations_file, BitString, Entity, FileData, Layout, NumericType, Result,
    UmbError, UmbIndex, ValueType, INDEX_FILE,
};

/// Accumulates a model and writes it as a UMB archive
pub struct UmbWriter<'a> {
    index: UmbIndex,
    pending: Vec<PendingEntry<'a>>,
}

impl Default for UmbWriter<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> UmbWriter<'a> {
    /// Empty writer whose file data names this library and the current time
    pub fn new() -> Self {
        let mut index = UmbIndex::new();
        index.file_data = Some(FileData {
            tool: Some(env!("CARGO_PKG_NAME").to_string()),
            tool_version: Some(env!("CARGO_PKG_VERSION").to_string()),
            creation_date: Some(chrono::Utc::now().timestamp()),
            parameters: None,
        });
        Self {
            index,
            pending: Vec::new(),
        }
    }

    pub fn index(&self) -> &UmbIndex {
        &self.index
    }

    /// Mutable index, for setting counts and types before adding arrays
    pub fn index_mut(&mut self) -> &mut UmbIndex {
        &mut self.index
    }

    /// Entry names queued so far, in export order
    pub fn pending_entries(&self) -> impl Iterator<Item = &str> {
        self.pending.iter().map(|entry| entry.name.as_str())
    }

    fn ensure_unqueued(&self, name: &str) -> Result<()> {
        if self.pending.iter().any(|entry| entry.name == name) {
            return Err(UmbError::duplicate(format!(
                "archive entry \"{name}\" was already added"
            )));
        }
        Ok(())
    }

    fn queue(&mut self, name: impl Into<String>, count: u64, source: ArraySource<'a>) -> Result<()> {
        let name = name.into();
        self.ensure_unqueued(&name)?;
        let entry = PendingEntry::new(name, count, source)?;
        tracing::debug!(entry = %entry.name, count, size = entry.size, "queued array");
        self.pending.push(entry);
        Ok(())
    }

    // Transition system

    /// Offsets into the choice arrays, one per state plus a final one
    pub fn add_state_choice_offsets<I>(&mut self, offsets: I) -> Result<()>
    where
        I: IntoIterator<Item = u64>,
        I::IntoIter: 'a,
    {
        let count = offset_count("#states", self.index.num_states()?)?;
        self.queue(
            files::STATE_CHOICE_OFFSETS,
            count,
            ArraySource::Long(Box::new(offsets.into_iter())),
        )
    }

    /// Offsets into the branch arrays, one per choice plus a final one
    pub fn add_choice_branch_offsets<I>(&mut self, offsets: I) -> Result<()>
    where
        I: IntoIterator<Item = u64>,
        I::IntoIter: 'a,
    {
        let count = offset_count("#choices", self.index.num_choices()?)?;
        self.queue(
            files::CHOICE_BRANCH_OFFSETS,
            count,
            ArraySource::Long(Box::new(offsets.into_iter())),
        )
    }

    /// Target state of every branch
    pub fn add_branch_targets<I>(&mut self, targets: I) -> Result<()>
    where
        I: IntoIterator<Item = u64>,
        I::IntoIter: 'a,
    {
        let count = self.index.num_branches()?;
        self.queue(
            files::BRANCH_TARGETS,
            count,
            ArraySource::Long(Box::new(targets.into_iter())),
        )
    }

    /// Probability of every branch; interval types take a lower and an upper bound per branch
    pub fn add_branch_probabilities<I>(&mut self, values: I) -> Result<()>
    where
        I: IntoIterator<Item = f64>,
        I::IntoIter: 'a,
    {
        require_double("branch-probability-type", self.index.branch_probability_type()?)?;
        let count = self.index.branch_probability_count()?;
        self.queue(
            files::BRANCH_PROBABILITIES,
            count,
            ArraySource::Double(Box::new(values.into_iter())),
        )
    }

    /// Exit rate of every state; interval types take two values per state
    pub fn add_exit_rates<I>(&mut self, values: I) -> Result<()>
    where
        I: IntoIterator<Item = f64>,
        I::IntoIter: 'a,
    {
        require_double("exit-rate-type", self.index.exit_rate_type()?)?;
        let count = self.index.exit_rate_count()?;
        self.queue(
            files::EXIT_RATES,
            count,
            ArraySource::Double(Box::new(values.into_iter())),
        )
    }

    /// Initial-state flag of every state
    pub fn add_initial_states<I>(&mut self, flags: I) -> Result<()>
    where
        I: IntoIterator<Item = bool>,
        I::IntoIter: 'a,
    {
        let count = self.index.num_states()?;
        self.queue(
            files::INITIAL_STATES,
            count,
            ArraySource::Bool(Box::new(flags.into_iter())),
        )
    }

    /// Initial states given as state indices; also sets `#initial-states`
    pub fn add_initial_state_indices(&mut self, states: impl IntoIterator<Item = u64>) -> Result<()> {
        let num_states = self.index.num_states()?;
        self.ensure_unqueued(files::INITIAL_STATES)?;
        let mut states: Vec<u64> = states.into_iter().collect();
        states.sort_unstable();
        states.dedup();
        if let Some(&last) = states.last() {
            if last >= num_states {
                return Err(UmbError::schema(format!(
                    "initial state {last} is out of range for {num_states} states"
                )));
            }
        }
        self.index.set_num_initial_states(states.len() as u64);
        let mut sparse = states.into_iter().peekable();
        let dense = (0..num_states).map(move |state| sparse.next_if_eq(&state).is_some());
        self.queue(files::INITIAL_STATES, num_states, ArraySource::Bool(Box::new(dense)))
    }

    /// Action index of every choice
    pub fn add_choice_actions<I>(&mut self, actions: I) -> Result<()>
    where
        I: IntoIterator<Item = u32>,
        I::IntoIter: 'a,
    {
        let count = self.index.num_choices()?;
        self.queue(
            files::CHOICE_ACTIONS,
            count,
            ArraySource::UInt(Box::new(actions.into_iter())),
        )
    }

    /// Action index of every branch
    pub fn add_branch_actions<I>(&mut self, actions: I) -> Result<()>
    where
        I: IntoIterator<Item = u32>,
        I::IntoIter: 'a,
    {
        let count = self.index.num_branches()?;
        self.queue(
            files::BRANCH_ACTIONS,
            count,
            ArraySource::UInt(Box::new(actions.into_iter())),
        )
    }

    /// Names of the choice actions (empty names allowed); sets `#choice-actions`
    pub fn add_choice_action_strings<S: Into<String>>(
        &mut self,
        names: impl IntoIterator<Item = S>,
    ) -> Result<()> {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let declared = match &self.index.transition_system {
            Some(ts) => ts.declared_choice_actions()?,
            None => None,
        };
        check_action_count(files::CHOICE_ACTION_STRINGS, declared, names.len())?;
        let count = names.len() as u64;
        self.queue_strings(
            files::CHOICE_ACTION_STRING_OFFSETS,
            files::CHOICE_ACTION_STRINGS,
            names,
        )?;
        self.index.set_num_choice_actions(count);
        Ok(())
    }

    /// Names of the branch actions (empty names allowed); sets `#branch-actions`
    pub fn add_branch_action_strings<S: Into<String>>(
        &mut self,
        names: impl IntoIterator<Item = S>,
    ) -> Result<()> {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let declared = match &self.index.transition_system {
            Some(ts) => ts.declared_branch_actions()?,
            None => None,
        };
        check_action_count(files::BRANCH_ACTION_STRINGS, declared, names.len())?;
        let count = names.len() as u64;
        self.queue_strings(
            files::BRANCH_ACTION_STRING_OFFSETS,
            files::BRANCH_ACTION_STRINGS,
            names,
        )?;
        self.index.set_num_branch_actions(count);
        Ok(())
    }

    fn queue_strings(&mut self, offsets_name: &str, strings_name: &str, strings: Vec<String>) -> Result<()> {
        self.ensure_unqueued(offsets_name)?;
        self.ensure_unqueued(strings_name)?;
        let mut offsets = Vec::with_capacity(strings.len() + 1);
        let mut offset = 0u64;
        offsets.push(offset);
        for string in &strings {
            offset += string.len() as u64;
            offsets.push(offset);
        }
        let count = strings.len() as u64;
        self.queue(
            offsets_name,
            count + 1,
            ArraySource::Long(Box::new(offsets.into_iter())),
        )?;
        self.queue(strings_name, count, ArraySource::Strings(strings))
    }

    // Annotations

    /// Register an annotation without data and return its id
    pub fn create_annotation(
        &mut self,
        group: &str,
        alias: Option<&str>,
        value_type: ValueType,
    ) -> Result<String> {
        Ok(self
            .index
            .create_annotation(group, alias, value_type)?
            .id()
            .to_string())
    }

    fn attach(&mut self, group: &str, id: &str, entity: Entity, expected: ValueType) -> Result<(u64, String)> {
        let value_type = self.index.annotation(group, id)?.value_type()?;
        if value_type != expected {
            return Err(UmbError::schema(format!(
                "annotation \"{group}/{id}\" holds {value_type} values, not {expected}"
            )));
        }
        self.index.attach_data(group, id, entity)
    }

    /// Attach boolean values for `entity` to annotation `group`/`id`
    pub fn add_bool_annotation_data<I>(&mut self, group: &str, id: &str, entity: Entity, values: I) -> Result<()>
    where
        I: IntoIterator<Item = bool>,
        I::IntoIter: 'a,
    {
        let (count, file) = self.attach(group, id, entity, ValueType::Bool)?;
        self.queue(file, count, ArraySource::Bool(Box::new(values.into_iter())))
    }

    /// Attach int values for `entity` to annotation `group`/`id`
    pub fn add_int_annotation_data<I>(&mut self, group: &str, id: &str, entity: Entity, values: I) -> Result<()>
    where
        I: IntoIterator<Item = i32>,
        I::IntoIter: 'a,
    {
        let (count, file) = self.attach(group, id, entity, ValueType::Int)?;
        self.queue(file, count, ArraySource::Int(Box::new(values.into_iter())))
    }

    /// Attach double values for `entity` to annotation `group`/`id`
    pub fn add_double_annotation_data<I>(&mut self, group: &str, id: &str, entity: Entity, values: I) -> Result<()>
    where
        I: IntoIterator<Item = f64>,
        I::IntoIter: 'a,
    {
        let (count, file) = self.attach(group, id, entity, ValueType::Double)?;
        self.queue(file, count, ArraySource::Double(Box::new(values.into_iter())))
    }

    /// Create a boolean annotation with data for one entity
    pub fn add_bool_annotation<I>(
        &mut self,
        group: &str,
        alias: Option<&str>,
        entity: Entity,
        values: I,
    ) -> Result<String>
    where
        I: IntoIterator<Item = bool>,
        I::IntoIter: 'a,
    {
        let id = self.create_annotation(group, alias, ValueType::Bool)?;
        self.add_bool_annotation_data(group, &id, entity, values)?;
        Ok(id)
    }

    /// Create an int annotation with data for one entity
    pub fn add_int_annotation<I>(
        &mut self,
        group: &str,
        alias: Option<&str>,
        entity: Entity,
        values: I,
    ) -> Result<String>
    where
        I: IntoIterator<Item = i32>,
        I::IntoIter: 'a,
    {
        let id = self.create_annotation(group, alias, ValueType::Int)?;
        self.add_int_annotation_data(group, &id, entity, values)?;
        Ok(id)
    }

    /// Create a double annotation with data for one entity
    pub fn add_double_annotation<I>(
        &mut self,
        group: &str,
        alias: Option<&str>,
        entity: Entity,
        values: I,
    ) -> Result<String>
    where
        I: IntoIterator<Item = f64>,
        I::IntoIter: 'a,
    {
        let id = self.create_annotation(group, alias, ValueType::Double)?;
        self.add_double_annotation_data(group, &id, entity, values)?;
        Ok(id)
    }

    /// Atomic proposition over states
    pub fn add_state_ap<I>(&mut self, alias: &str, states: I) -> Result<String>
    where
        I: IntoIterator<Item = bool>,
        I::IntoIter: 'a,
    {
        self.add_bool_annotation(groups::APS, Some(alias), Entity::States, states)
    }

    /// Reward structure without data; attach values with [`UmbWriter::add_reward_data`]
    pub fn add_rewards(&mut self, alias: Option<&str>) -> Result<String> {
        self.create_annotation(groups::REWARDS, alias, ValueType::Double)
    }

    /// Reward values for `entity` on the reward structure `id`
    pub fn add_reward_data<I>(&mut self, id: &str, entity: Entity, values: I) -> Result<()>
    where
        I: IntoIterator<Item = f64>,
        I::IntoIter: 'a,
    {
        self.add_double_annotation_data(groups::REWARDS, id, entity, values)
    }

    pub fn add_state_rewards<I>(&mut self, alias: Option<&str>, values: I) -> Result<String>
    where
        I: IntoIterator<Item = f64>,
        I::IntoIter: 'a,
    {
        self.add_double_annotation(groups::REWARDS, alias, Entity::States, values)
    }

    pub fn add_choice_rewards<I>(&mut self, alias: Option<&str>, values: I) -> Result<String>
    where
        I: IntoIterator<Item = f64>,
        I::IntoIter: 'a,
    {
        self.add_double_annotation(groups::REWARDS, alias, Entity::Choices, values)
    }

    pub fn add_branch_rewards<I>(&mut self, alias: Option<&str>, values: I) -> Result<String>
    where
        I: IntoIterator<Item = f64>,
        I::IntoIter: 'a,
    {
        self.add_double_annotation(groups::REWARDS, alias, Entity::Branches, values)
    }

    /// Boolean state variable
    pub fn add_bool_variable<I>(&mut self, alias: &str, values: I) -> Result<String>
    where
        I: IntoIterator<Item = bool>,
        I::IntoIter: 'a,
    {
        self.add_bool_annotation(groups::VARIABLES, Some(alias), Entity::States, values)
    }

    /// Integer state variable
    pub fn add_int_variable<I>(&mut self, alias: &str, values: I) -> Result<String>
    where
        I: IntoIterator<Item = i32>,
        I::IntoIter: 'a,
    {
        self.add_int_annotation(groups::VARIABLES, Some(alias), Entity::States, values)
    }

    // Valuations

    /// Bit-packed variable values of every state, one `layout`-shaped record per state
    ///
    /// The layout is recorded in the index, padded to a whole number of bytes.
    pub fn add_state_valuations<I>(&mut self, layout: &Layout, records: I) -> Result<()>
    where
        I: IntoIterator<Item = BitString>,
        I::IntoIter: 'a,
    {
        let count = self.index.num_states()?;
        let file = valuations_file(Entity::States);
        self.ensure_unqueued(&file)?;
        let description = layout.to_description();
        let width = description.record_bytes()?;
        self.queue(
            file,
            count,
            ArraySource::Record {
                width,
                values: Box::new(records.into_iter()),
            },
        )?;
        self.index.state_valuations = Some(description);
        Ok(())
    }

    // Export

    /// Write to `path` with the default configuration (xz compressed)
    pub fn export<P: AsRef<Path>>(self, path: P) -> Result<()> {
        self.export_with(path, &ExportConfig::default())
    }

    /// Write to `path`, replacing any existing file
    pub fn export_with<P: AsRef<Path>>(self, path: P, config: &ExportConfig) -> Result<()> {
        self.index.validate()?;
        let path = path.as_ref();
        let archive = ArchiveWriter::create(path, config)?;
        self.write_archive(archive, config)?;
        tracing::info!(path = %path.display(), "exported UMB file");
        Ok(())
    }

    /// Write to any sink and hand it back once every layer is finished
    pub fn export_to<W: Write>(self, inner: W, config: &ExportConfig) -> Result<W> {
        self.index.validate()?;
        let archive = ArchiveWriter::new(inner, config)?;
        self.write_archive(archive, config)
    }

    fn write_archive<W: Write>(self, mut archive: ArchiveWriter<W>, config: &ExportConfig) -> Result<W> {
        let json = self.index.to_json()?;
        archive.write_text(INDEX_FILE, &json)?;
        for entry in self.pending {
            let name = entry.name.clone();
            let size = entry.size;
            archive.write_entry(&name, size, entry.into_stream(config.buffer_size))?;
        }
        let entries = archive.entry_count();
        let inner = archive.finish()?;
        tracing::info!(
            entries,
            compression = ?config.compression,
            "finished UMB archive"
        );
        Ok(inner)
    }

    /// Render the index and every queued array as text
    ///
    /// Each entry appears as `/name:` followed by its contents on the next line.
    pub fn export_as_text(self) -> Result<String> {
        let mut text = format!("/{INDEX_FILE}:\n{}\n", self.index.to_json()?);
        for entry in self.pending {
            text.push('/');
            text.push_str(&entry.name);
            text.push_str(":\n");
            text.push_str(&entry.source.into_text());
            text.push('\n');
        }
        Ok(text)
    }
}

fn require_double(field: &str, numeric: NumericType) -> Result<()> {
    if numeric.is_double() {
        Ok(())
    } else {
        Err(UmbError::schema(format!(
            "\"{field}\" is {numeric}; only double values can be written"
        )))
    }
}

fn check_action_count(entry: &str, declared: Option<u64>, actual: usize) -> Result<()> {
    match declared {
        Some(expected) if expected != actual as u64 => Err(UmbError::SizeMismatch {
            entry: entry.to_string(),
            expected,
            actual: actual as u64,
        }),
        _ => Ok(()),
    }
}
