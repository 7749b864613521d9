//! Annotation registry
//!
//! Annotations are keyed by (group, id) and stored in insertion order. An
//! optional alias gives a human-readable name that is unique within its
//! group; aliases resolve to ids through a secondary index that is rebuilt
//! from the primary map whenever an index is parsed.

use super::UmbIndex;
use crate::format::{annotation_file, groups, Entity, ValueType};
use crate::validation::{to_unique_id, validate_id};
use crate::{Result, UmbError};
use serde::{Deserialize, Serialize};

/// A named family of values attached to states, choices and/or branches
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Annotation {
    #[serde(skip)]
    group: String,
    #[serde(skip)]
    id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default)]
    pub applies_to: Vec<Entity>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub value_type: Option<ValueType>,
}

impl Annotation {
    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Alias if present, id otherwise
    pub fn name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.id)
    }

    pub fn applies_to(&self, entity: Entity) -> bool {
        self.applies_to.contains(&entity)
    }

    pub fn value_type(&self) -> Result<ValueType> {
        self.value_type.ok_or_else(|| {
            UmbError::schema(format!(
                "annotation \"{}/{}\" has no type",
                self.group, self.id
            ))
        })
    }

    /// Archive path of this annotation's values for `entity`
    pub fn file_for(&self, entity: Entity) -> String {
        annotation_file(&self.group, &self.id, entity)
    }

    pub(super) fn validate(&self, group: &str, id: &str) -> Result<()> {
        validate_id(&format!("annotation id in group \"{group}\""), id)?;
        if self.applies_to.is_empty() {
            return Err(UmbError::schema(format!(
                "annotation \"{group}/{id}\" has an empty \"applies-to\""
            )));
        }
        if self.value_type.is_none() {
            return Err(UmbError::schema(format!(
                "annotation \"{group}/{id}\" has no \"type\""
            )));
        }
        Ok(())
    }
}

impl UmbIndex {
    /// Register a new annotation, creating its group if needed
    ///
    /// Without a (non-empty) alias the id is the next 1-based position in
    /// the group; with one, it is the alias sanitised to `[a-z0-9_-]` and
    /// suffixed with `_` until unique.
    pub fn create_annotation(
        &mut self,
        group: &str,
        alias: Option<&str>,
        value_type: ValueType,
    ) -> Result<&Annotation> {
        validate_id("annotation group", group)?;
        let alias = alias.filter(|alias| !alias.is_empty());
        if let Some(alias) = alias {
            if self
                .aliases
                .get(group)
                .is_some_and(|by_alias| by_alias.contains_key(alias))
            {
                return Err(UmbError::duplicate(format!(
                    "alias \"{alias}\" already exists in annotation group \"{group}\""
                )));
            }
        }

        let annotations = self.annotations.entry(group.to_string()).or_default();
        let base = match alias {
            Some(alias) => alias.to_string(),
            None => (annotations.len() + 1).to_string(),
        };
        let id = to_unique_id(&base, |candidate| annotations.contains_key(candidate));
        if let Some(alias) = alias {
            self.aliases
                .entry(group.to_string())
                .or_default()
                .insert(alias.to_string(), id.clone());
        }
        tracing::debug!(group, id = %id, ?alias, "created annotation");

        let annotation = Annotation {
            group: group.to_string(),
            id: id.clone(),
            alias: alias.map(str::to_string),
            applies_to: Vec::new(),
            value_type: Some(value_type),
        };
        Ok(annotations.entry(id).or_insert(annotation))
    }

    /// Annotation `group`/`id`
    pub fn annotation(&self, group: &str, id: &str) -> Result<&Annotation> {
        self.annotations
            .get(group)
            .and_then(|annotations| annotations.get(id))
            .ok_or_else(|| UmbError::not_found(format!("annotation \"{group}/{id}\"")))
    }

    fn annotation_mut(&mut self, group: &str, id: &str) -> Result<&mut Annotation> {
        self.annotations
            .get_mut(group)
            .and_then(|annotations| annotations.get_mut(id))
            .ok_or_else(|| UmbError::not_found(format!("annotation \"{group}/{id}\"")))
    }

    /// Annotation in `group` whose alias is `alias`
    pub fn annotation_by_alias(&self, group: &str, alias: &str) -> Result<&Annotation> {
        let id = self
            .aliases
            .get(group)
            .and_then(|by_alias| by_alias.get(alias))
            .ok_or_else(|| {
                UmbError::not_found(format!("alias \"{alias}\" in annotation group \"{group}\""))
            })?;
        self.annotation(group, id)
    }

    /// Record that `entity` carries values for `group`/`id`
    ///
    /// Returns the number of values expected and the archive path they go to.
    pub fn attach_data(&mut self, group: &str, id: &str, entity: Entity) -> Result<(u64, String)> {
        let count = self.entity_count(entity)?;
        let annotation = self.annotation_mut(group, id)?;
        if annotation.applies_to(entity) {
            return Err(UmbError::duplicate(format!(
                "annotation \"{group}/{id}\" already has data for {entity}"
            )));
        }
        annotation.applies_to.push(entity);
        Ok((count, annotation.file_for(entity)))
    }

    /// Rebuild the alias index and the stored group/id of every annotation
    pub fn rebuild_alias_index(&mut self) {
        self.aliases.clear();
        for (group, annotations) in self.annotations.iter_mut() {
            for (id, annotation) in annotations.iter_mut() {
                annotation.group = group.clone();
                annotation.id = id.clone();
                if let Some(alias) = &annotation.alias {
                    self.aliases
                        .entry(group.clone())
                        .or_default()
                        .insert(alias.clone(), id.clone());
                }
            }
        }
    }

    /// Group names in insertion order
    pub fn annotation_groups(&self) -> impl Iterator<Item = &str> {
        self.annotations.keys().map(String::as_str)
    }

    pub fn has_annotation_group(&self, group: &str) -> bool {
        self.annotations.contains_key(group)
    }

    /// Annotations of `group` in insertion order (empty if the group is absent)
    pub fn annotations_in<'a>(&'a self, group: &str) -> impl Iterator<Item = &'a Annotation> + 'a {
        self.annotations
            .get(group)
            .into_iter()
            .flat_map(|annotations| annotations.values())
    }

    /// Alias-or-id of every annotation in `group`
    pub fn annotation_names(&self, group: &str) -> Vec<String> {
        self.annotations_in(group)
            .map(|annotation| annotation.name().to_string())
            .collect()
    }

    pub fn aps(&self) -> impl Iterator<Item = &Annotation> + '_ {
        self.annotations_in(groups::APS)
    }

    pub fn rewards(&self) -> impl Iterator<Item = &Annotation> + '_ {
        self.annotations_in(groups::REWARDS)
    }

    pub fn variables(&self) -> impl Iterator<Item = &Annotation> + '_ {
        self.annotations_in(groups::VARIABLES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_with_counts() -> UmbIndex {
        let mut index = UmbIndex::new();
        index.set_num_states(4).set_num_choices(5).set_num_branches(7);
        index
    }

    #[test]
    fn test_counter_ids_are_one_based() {
        let mut index = index_with_counts();
        let first = index.create_annotation("aps", None, ValueType::Bool).unwrap().id().to_string();
        let second = index.create_annotation("aps", Some(""), ValueType::Bool).unwrap().id().to_string();
        assert_eq!(first, "1");
        assert_eq!(second, "2");
    }

    #[test]
    fn test_alias_is_sanitised_and_made_unique() {
        let mut index = index_with_counts();
        let a = index
            .create_annotation("rewards", Some("Total Cost"), ValueType::Double)
            .unwrap()
            .id()
            .to_string();
        let b = index
            .create_annotation("rewards", Some("total cost"), ValueType::Double)
            .unwrap()
            .id()
            .to_string();
        assert_eq!(a, "total_cost");
        assert_eq!(b, "total_cost_");
        assert_eq!(index.annotation_by_alias("rewards", "total cost").unwrap().id(), "total_cost_");
    }

    #[test]
    fn test_counter_id_does_not_overwrite_alias_id() {
        let mut index = index_with_counts();
        index.create_annotation("aps", Some("2"), ValueType::Bool).unwrap();
        let id = index.create_annotation("aps", None, ValueType::Bool).unwrap().id().to_string();
        assert_eq!(id, "2_");
        assert_eq!(index.annotations_in("aps").count(), 2);
    }

    #[test]
    fn test_duplicate_alias_in_same_group() {
        let mut index = index_with_counts();
        index.create_annotation("aps", Some("goal"), ValueType::Bool).unwrap();
        assert!(matches!(
            index.create_annotation("aps", Some("goal"), ValueType::Bool),
            Err(UmbError::Duplicate(_))
        ));
        assert!(index.create_annotation("rewards", Some("goal"), ValueType::Double).is_ok());
    }

    #[test]
    fn test_invalid_group_is_rejected() {
        let mut index = index_with_counts();
        assert!(matches!(
            index.create_annotation("My Group", None, ValueType::Int),
            Err(UmbError::Schema(_))
        ));
        assert!(!index.has_annotation_group("My Group"));
    }

    #[test]
    fn test_lookups_report_not_found() {
        let mut index = index_with_counts();
        index.create_annotation("aps", Some("init"), ValueType::Bool).unwrap();
        assert!(matches!(index.annotation("aps", "nope"), Err(UmbError::NotFound(_))));
        assert!(matches!(index.annotation("none", "init"), Err(UmbError::NotFound(_))));
        assert!(matches!(
            index.annotation_by_alias("aps", "other"),
            Err(UmbError::NotFound(_))
        ));
    }

    #[test]
    fn test_attach_data() {
        let mut index = index_with_counts();
        index.create_annotation("rewards", Some("cost"), ValueType::Double).unwrap();

        let (count, path) = index.attach_data("rewards", "cost", Entity::Choices).unwrap();
        assert_eq!(count, 5);
        assert_eq!(path, "annotations/rewards/cost/for-choices/values.bin");

        let (count, _) = index.attach_data("rewards", "cost", Entity::Branches).unwrap();
        assert_eq!(count, 7);

        assert!(matches!(
            index.attach_data("rewards", "cost", Entity::Choices),
            Err(UmbError::Duplicate(_))
        ));
        let annotation = index.annotation("rewards", "cost").unwrap();
        assert_eq!(annotation.applies_to, vec![Entity::Choices, Entity::Branches]);
    }

    #[test]
    fn test_unattached_annotation_fails_validation() {
        let mut index = index_with_counts();
        index.create_annotation("aps", None, ValueType::Bool).unwrap();
        let annotation = index.annotation("aps", "1").unwrap();
        assert!(matches!(annotation.validate("aps", "1"), Err(UmbError::Schema(_))));
    }

    #[test]
    fn test_parsed_bad_id_fails_validation() {
        let annotation = Annotation {
            applies_to: vec![Entity::States],
            value_type: Some(ValueType::Int),
            ..Annotation::default()
        };
        assert!(annotation.validate("aps", "Bad Id").is_err());
        assert!(annotation.validate("aps", "").is_err());
        assert!(annotation.validate("aps", "ok_id").is_ok());
    }

    #[test]
    fn test_names_and_group_views() {
        let mut index = index_with_counts();
        index.create_annotation("rewards", Some("Energy"), ValueType::Double).unwrap();
        index.create_annotation("rewards", None, ValueType::Double).unwrap();
        index.create_annotation("aps", Some("goal"), ValueType::Bool).unwrap();

        assert_eq!(index.annotation_names("rewards"), vec!["Energy", "2"]);
        assert_eq!(index.rewards().count(), 2);
        assert_eq!(index.aps().count(), 1);
        assert_eq!(index.variables().count(), 0);
        assert_eq!(index.annotation_groups().collect::<Vec<_>>(), vec!["rewards", "aps"]);
    }
}
