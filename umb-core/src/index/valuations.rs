//! State valuation descriptions stored in the index

use crate::format::VariableType;
use crate::packing::LayoutItem;
use crate::{Result, UmbError};
use serde::{Deserialize, Serialize};

/// Declarative form of a bit-packing layout
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValuationDescription {
    /// Record size in bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alignment: Option<u32>,
    #[serde(default)]
    pub variables: Vec<ValuationItem>,
}

/// A variable (`name`, `size`, `type`) or anonymous padding (`padding`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValuationItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub var_type: Option<VariableType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub padding: Option<u32>,
}

impl ValuationItem {
    pub fn variable(name: impl Into<String>, size: u32, var_type: VariableType) -> Self {
        Self {
            name: Some(name.into()),
            size: Some(size),
            var_type: Some(var_type),
            padding: None,
        }
    }

    pub fn padding(width: u32) -> Self {
        Self {
            padding: Some(width),
            ..Self::default()
        }
    }

    /// Check the item is well-formed and convert it; `position` is used in errors
    pub fn to_layout_item(&self, position: usize) -> Result<LayoutItem> {
        if let Some(width) = self.padding {
            if self.name.is_some() || self.size.is_some() || self.var_type.is_some() {
                return Err(UmbError::schema(format!(
                    "state-valuations item {position} mixes padding with variable fields"
                )));
            }
            return Ok(LayoutItem::Padding { width });
        }
        let name = self.name.as_ref().ok_or_else(|| {
            UmbError::schema(format!("state-valuations item {position} has no name"))
        })?;
        let var_type = self.var_type.ok_or_else(|| {
            UmbError::schema(format!("state-valuations variable \"{name}\" has no type"))
        })?;
        let width = self.size.ok_or_else(|| {
            UmbError::schema(format!(
                "state-valuations variable \"{name}\" has no size; only fixed-size variables are supported"
            ))
        })?;
        Ok(LayoutItem::Variable {
            name: name.clone(),
            width,
            var_type,
        })
    }
}

impl ValuationDescription {
    /// Check alignment is present and every item is well-formed
    pub fn validate(&self) -> Result<()> {
        if self.alignment.is_none() {
            return Err(UmbError::schema(
                "required field \"state-valuations.alignment\" is missing",
            ));
        }
        for (position, item) in self.variables.iter().enumerate() {
            item.to_layout_item(position)?;
        }
        Ok(())
    }

    /// Record size in bytes
    pub fn record_bytes(&self) -> Result<usize> {
        self.alignment.map(|bytes| bytes as usize).ok_or_else(|| {
            UmbError::schema("required field \"state-valuations.alignment\" is missing")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_shape() {
        let description = ValuationDescription {
            alignment: Some(1),
            variables: vec![
                ValuationItem::variable("x", 3, VariableType::Uint),
                ValuationItem::padding(5),
            ],
        };
        let json = serde_json::to_value(&description).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "alignment": 1,
                "variables": [
                    {"name": "x", "size": 3, "type": "uint"},
                    {"padding": 5}
                ]
            })
        );
        let back: ValuationDescription = serde_json::from_value(json).unwrap();
        assert_eq!(back, description);
    }

    #[test]
    fn test_validate() {
        let mut description = ValuationDescription {
            alignment: Some(1),
            variables: vec![ValuationItem::variable("b", 1, VariableType::Bool)],
        };
        assert!(description.validate().is_ok());

        description.variables.push(ValuationItem {
            name: Some("y".into()),
            padding: Some(2),
            ..ValuationItem::default()
        });
        assert!(matches!(description.validate(), Err(UmbError::Schema(_))));

        description.variables.pop();
        description.alignment = None;
        assert!(matches!(description.validate(), Err(UmbError::Schema(_))));
    }

    #[test]
    fn test_unknown_variable_type_fails_to_parse() {
        let result: std::result::Result<ValuationItem, _> =
            serde_json::from_str(r#"{"name": "s", "size": 8, "type": "string"}"#);
        assert!(result.is_err());
    }
}
