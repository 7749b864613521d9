//! Interchange enums for the UMB format
//!
//! Every enum stored in `index.json` is written as lowercase hyphenated text.
//! Each one maps to and from that text through a pure function pair; parsing
//! normalises the input (lowercase, `_` to `-`) and reports unknown values as
//! a schema error naming the field.

use crate::{Result, UmbError};
use core::fmt;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Enums with a canonical text form in the index
pub trait Interchange: Copy + Sized + 'static {
    /// Name of the field this enum appears in, used in error messages
    const FIELD: &'static str;

    /// Every variant, in declaration order
    const ALL: &'static [Self];

    /// Canonical text for this variant
    fn as_str(self) -> &'static str;

    /// Parse canonical text (after normalisation) into a variant
    fn parse(text: &str) -> Result<Self> {
        let normalised = normalise(text);
        Self::ALL
            .iter()
            .copied()
            .find(|variant| variant.as_str() == normalised)
            .ok_or_else(|| {
                UmbError::schema(format!("unknown value \"{text}\" for field \"{}\"", Self::FIELD))
            })
    }
}

/// Lowercase and replace underscores with hyphens
pub fn normalise(text: &str) -> String {
    text.to_lowercase().replace('_', "-")
}

macro_rules! interchange_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> core::result::Result<Self, D::Error> {
                let text = String::deserialize(deserializer)?;
                <$ty as Interchange>::parse(&text).map_err(serde::de::Error::custom)
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

/// Model element kinds that annotations and valuations attach to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    States,
    Choices,
    Branches,
}

impl Interchange for Entity {
    const FIELD: &'static str = "applies-to";
    const ALL: &'static [Self] = &[Entity::States, Entity::Choices, Entity::Branches];

    fn as_str(self) -> &'static str {
        match self {
            Entity::States => "states",
            Entity::Choices => "choices",
            Entity::Branches => "branches",
        }
    }
}

interchange_serde!(Entity);

/// Notion of time of a transition system
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeNotion {
    Discrete,
    Stochastic,
    UrgentStochastic,
}

impl TimeNotion {
    /// Whether exit rates are part of the model
    pub fn is_stochastic(self) -> bool {
        matches!(self, TimeNotion::Stochastic | TimeNotion::UrgentStochastic)
    }
}

impl Interchange for TimeNotion {
    const FIELD: &'static str = "time";
    const ALL: &'static [Self] = &[
        TimeNotion::Discrete,
        TimeNotion::Stochastic,
        TimeNotion::UrgentStochastic,
    ];

    fn as_str(self) -> &'static str {
        match self {
            TimeNotion::Discrete => "discrete",
            TimeNotion::Stochastic => "stochastic",
            TimeNotion::UrgentStochastic => "urgent-stochastic",
        }
    }
}

interchange_serde!(TimeNotion);

/// Numeric representation of probabilities and rates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericType {
    Double,
    Rational,
    DoubleInterval,
    RationalInterval,
}

impl NumericType {
    /// Interval types store a lower and an upper bound per value
    pub fn is_interval(self) -> bool {
        matches!(self, NumericType::DoubleInterval | NumericType::RationalInterval)
    }

    /// Whether values of this type are stored as 64-bit doubles
    pub fn is_double(self) -> bool {
        matches!(self, NumericType::Double | NumericType::DoubleInterval)
    }

    /// Number of stored values per logical value
    pub fn values_per_entry(self) -> u64 {
        if self.is_interval() {
            2
        } else {
            1
        }
    }
}

impl Interchange for NumericType {
    const FIELD: &'static str = "numeric-type";
    const ALL: &'static [Self] = &[
        NumericType::Double,
        NumericType::Rational,
        NumericType::DoubleInterval,
        NumericType::RationalInterval,
    ];

    fn as_str(self) -> &'static str {
        match self {
            NumericType::Double => "double",
            NumericType::Rational => "rational",
            NumericType::DoubleInterval => "double-interval",
            NumericType::RationalInterval => "rational-interval",
        }
    }
}

interchange_serde!(NumericType);

/// Value type of an annotation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Bool,
    Int,
    Double,
}

impl Interchange for ValueType {
    const FIELD: &'static str = "type";
    const ALL: &'static [Self] = &[ValueType::Bool, ValueType::Int, ValueType::Double];

    fn as_str(self) -> &'static str {
        match self {
            ValueType::Bool => "bool",
            ValueType::Int => "int",
            ValueType::Double => "double",
        }
    }
}

interchange_serde!(ValueType);

/// Type of a variable inside a bit-packed valuation record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableType {
    Bool,
    Int,
    Uint,
    Double,
}

impl Interchange for VariableType {
    const FIELD: &'static str = "variables.type";
    const ALL: &'static [Self] = &[
        VariableType::Bool,
        VariableType::Int,
        VariableType::Uint,
        VariableType::Double,
    ];

    fn as_str(self) -> &'static str {
        match self {
            VariableType::Bool => "bool",
            VariableType::Int => "int",
            VariableType::Uint => "uint",
            VariableType::Double => "double",
        }
    }
}

interchange_serde!(VariableType);

/// Whole-stream compression applied around the tar container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionFormat {
    Xz,
    Zstd,
}

impl CompressionFormat {
    /// Conventional file extension
    pub fn extension(self) -> &'static str {
        match self {
            CompressionFormat::Xz => "xz",
            CompressionFormat::Zstd => "zst",
        }
    }

    /// Leading bytes identifying a stream in this format
    pub fn magic(self) -> &'static [u8] {
        match self {
            CompressionFormat::Xz => &[0xFD, b'7', b'z', b'X', b'Z', 0x00],
            CompressionFormat::Zstd => &[0x28, 0xB5, 0x2F, 0xFD],
        }
    }

    /// Identify the compression of a stream from its first bytes
    pub fn detect(head: &[u8]) -> Option<Self> {
        [CompressionFormat::Xz, CompressionFormat::Zstd]
            .into_iter()
            .find(|format| head.starts_with(format.magic()))
    }

    /// Whether conformant writers may produce this format
    pub fn is_allowed(self) -> bool {
        crate::format::constants::ALLOWED_COMPRESSION.contains(&self)
    }
}

impl fmt::Display for CompressionFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_round_trip<E: Interchange + PartialEq + fmt::Debug>() {
        for variant in E::ALL {
            assert_eq!(E::parse(variant.as_str()).unwrap(), *variant);
        }
    }

    #[test]
    fn test_canonical_text_round_trips() {
        assert_round_trip::<Entity>();
        assert_round_trip::<TimeNotion>();
        assert_round_trip::<NumericType>();
        assert_round_trip::<ValueType>();
        assert_round_trip::<VariableType>();
    }

    #[test]
    fn test_parse_normalises_input() {
        assert_eq!(
            NumericType::parse("DOUBLE_INTERVAL").unwrap(),
            NumericType::DoubleInterval
        );
        assert_eq!(
            TimeNotion::parse("Urgent-Stochastic").unwrap(),
            TimeNotion::UrgentStochastic
        );
    }

    #[test]
    fn test_unknown_text_is_schema_error() {
        let err = TimeNotion::parse("continuous").unwrap_err();
        match err {
            UmbError::Schema(msg) => {
                assert!(msg.contains("continuous"));
                assert!(msg.contains("time"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(matches!(Entity::parse("edges"), Err(UmbError::Schema(_))));
    }

    #[test]
    fn test_serde_uses_canonical_text() {
        let json = serde_json::to_string(&TimeNotion::UrgentStochastic).unwrap();
        assert_eq!(json, "\"urgent-stochastic\"");
        let parsed: Entity = serde_json::from_str("\"branches\"").unwrap();
        assert_eq!(parsed, Entity::Branches);
        assert!(serde_json::from_str::<ValueType>("\"string\"").is_err());
    }

    #[test]
    fn test_numeric_type_properties() {
        assert_eq!(NumericType::Double.values_per_entry(), 1);
        assert_eq!(NumericType::RationalInterval.values_per_entry(), 2);
        assert!(NumericType::DoubleInterval.is_double());
        assert!(!NumericType::Rational.is_double());
    }

    #[test]
    fn test_compression_detection() {
        let xz = [0xFD, b'7', b'z', b'X', b'Z', 0x00, 0x00, 0x04];
        assert_eq!(CompressionFormat::detect(&xz), Some(CompressionFormat::Xz));
        assert_eq!(
            CompressionFormat::detect(&[0x28, 0xB5, 0x2F, 0xFD, 0x24]),
            Some(CompressionFormat::Zstd)
        );
        assert_eq!(CompressionFormat::detect(b"index.json"), None);
        assert!(CompressionFormat::Xz.is_allowed());
        assert!(!CompressionFormat::Zstd.is_allowed());
    }
}
