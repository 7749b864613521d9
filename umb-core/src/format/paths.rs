//! Canonical archive paths for annotation and valuation data

use super::constants::dirs;
use super::enums::{Entity, Interchange};

/// Directory segment naming the entity a data file belongs to
pub fn entity_dir(entity: Entity) -> String {
    format!("for-{}", entity.as_str())
}

/// Path of the values of annotation `group`/`id` for `entity`
pub fn annotation_file(group: &str, id: &str, entity: Entity) -> String {
    format!(
        "{}/{group}/{id}/{}/{}",
        dirs::ANNOTATIONS,
        entity_dir(entity),
        dirs::VALUES_FILE
    )
}

/// Path of the bit-packed valuation records for `entity`
pub fn valuations_file(entity: Entity) -> String {
    format!(
        "{}/{}/{}",
        dirs::VALUATIONS,
        entity_dir(entity),
        dirs::VALUATIONS_FILE
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotation_file() {
        assert_eq!(
            annotation_file("rewards", "time", Entity::Choices),
            "annotations/rewards/time/for-choices/values.bin"
        );
        assert_eq!(
            annotation_file("aps", "1", Entity::States),
            "annotations/aps/1/for-states/values.bin"
        );
    }

    #[test]
    fn test_valuations_file() {
        assert_eq!(
            valuations_file(Entity::States),
            "valuations/for-states/valuations.bin"
        );
    }
}
