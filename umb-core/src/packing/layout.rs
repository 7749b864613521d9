//! Layout manager for bit-packed records
//!
//! A `Layout` is an ordered list of named variables and anonymous padding.
//! Each item starts where the previous one ends; a record occupies the total
//! width rounded up to whole bytes. Layouts convert to and from the
//! `state-valuations` description stored in the index.

use super::bit_string::BitString;
use crate::format::VariableType;
use crate::index::{ValuationDescription, ValuationItem};
use crate::{Result, UmbError};
use core::fmt;

/// One item of a layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutItem {
    Variable {
        name: String,
        width: u32,
        var_type: VariableType,
    },
    Padding {
        width: u32,
    },
}

impl LayoutItem {
    /// Width in bits
    pub fn width(&self) -> u32 {
        match self {
            LayoutItem::Variable { width, .. } | LayoutItem::Padding { width } => *width,
        }
    }

    /// Variable name, `None` for padding
    pub fn name(&self) -> Option<&str> {
        match self {
            LayoutItem::Variable { name, .. } => Some(name),
            LayoutItem::Padding { .. } => None,
        }
    }
}

/// A value read from or written to a layout variable
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VariableValue {
    Bool(bool),
    Int(i32),
    Uint(u32),
    Double(f64),
}

impl VariableValue {
    /// The variable type able to hold this value
    pub fn var_type(self) -> VariableType {
        match self {
            VariableValue::Bool(_) => VariableType::Bool,
            VariableValue::Int(_) => VariableType::Int,
            VariableValue::Uint(_) => VariableType::Uint,
            VariableValue::Double(_) => VariableType::Double,
        }
    }
}

impl fmt::Display for VariableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableValue::Bool(v) => write!(f, "{v}"),
            VariableValue::Int(v) => write!(f, "{v}"),
            VariableValue::Uint(v) => write!(f, "{v}"),
            VariableValue::Double(v) => write_double(f, *v),
        }
    }
}

/// Shortest round-trip digits; exponent form `1.0E-7` outside `[1e-3, 1e7)`
fn write_double(f: &mut fmt::Formatter<'_>, value: f64) -> fmt::Result {
    if value.is_nan() {
        return f.write_str("NaN");
    }
    if value.is_infinite() {
        return f.write_str(if value > 0.0 { "Infinity" } else { "-Infinity" });
    }
    let magnitude = value.abs();
    if magnitude == 0.0 || (1e-3..1e7).contains(&magnitude) {
        let text = value.to_string();
        return if text.contains('.') {
            f.write_str(&text)
        } else {
            write!(f, "{text}.0")
        };
    }
    let text = format!("{value:e}");
    let (mantissa, exponent) = text.split_once('e').unwrap_or((text.as_str(), "0"));
    if mantissa.contains('.') {
        write!(f, "{mantissa}E{exponent}")
    } else {
        write!(f, "{mantissa}.0E{exponent}")
    }
}

/// Ordered variables and padding making up one bit-packed record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layout {
    items: Vec<LayoutItem>,
    offsets: Vec<usize>,
    total_bits: usize,
}

impl Layout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a layout from an index description
    pub fn from_description(description: &ValuationDescription) -> Result<Self> {
        let mut layout = Self::new();
        for (position, item) in description.variables.iter().enumerate() {
            layout.push(item.to_layout_item(position)?);
        }
        Ok(layout)
    }

    /// Append a variable
    pub fn add_variable(&mut self, name: impl Into<String>, width: u32, var_type: VariableType) -> &mut Self {
        self.push(LayoutItem::Variable {
            name: name.into(),
            width,
            var_type,
        })
    }

    /// Append anonymous padding
    pub fn add_padding(&mut self, width: u32) -> &mut Self {
        self.push(LayoutItem::Padding { width })
    }

    /// Append padding up to the next byte boundary, if needed
    pub fn pad_to_byte_boundary(&mut self) -> &mut Self {
        match self.trailing_padding() {
            0 => self,
            width => self.add_padding(width),
        }
    }

    fn push(&mut self, item: LayoutItem) -> &mut Self {
        self.offsets.push(self.total_bits);
        self.total_bits += item.width() as usize;
        self.items.push(item);
        self
    }

    fn trailing_padding(&self) -> u32 {
        ((8 - self.total_bits % 8) % 8) as u32
    }

    pub fn items(&self) -> &[LayoutItem] {
        &self.items
    }

    /// Bit offset of item `index`
    pub fn offset(&self, index: usize) -> Option<usize> {
        self.offsets.get(index).copied()
    }

    /// Position of the variable called `name`
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.items.iter().position(|item| item.name() == Some(name))
    }

    pub fn total_bits(&self) -> usize {
        self.total_bits
    }

    /// Record size in bytes, rounded up
    pub fn total_bytes(&self) -> usize {
        self.total_bits.div_ceil(8)
    }

    /// Zeroed record sized for this layout
    pub fn new_bit_string(&self) -> BitString {
        BitString::new(self.total_bytes())
    }

    fn variable(&self, index: usize) -> Result<(usize, u32, VariableType)> {
        match self.items.get(index) {
            Some(LayoutItem::Variable { width, var_type, .. }) => {
                Ok((self.offsets[index], *width, *var_type))
            }
            Some(LayoutItem::Padding { .. }) => Err(UmbError::schema(format!(
                "layout item {index} is padding, not a variable"
            ))),
            None => Err(UmbError::not_found(format!(
                "layout item {index} (layout has {} items)",
                self.items.len()
            ))),
        }
    }

    /// Read variable `index`, dispatching on its declared type
    pub fn get(&self, bits: &BitString, index: usize) -> Result<VariableValue> {
        let (offset, width, var_type) = self.variable(index)?;
        Ok(match var_type {
            VariableType::Bool => VariableValue::Bool(bits.get_bool(offset, width)?),
            VariableType::Int => VariableValue::Int(bits.get_int(offset, width)?),
            VariableType::Uint => VariableValue::Uint(bits.get_uint(offset, width)?),
            VariableType::Double => VariableValue::Double(bits.get_double(offset, width)?),
        })
    }

    /// Write variable `index`; the value must match the declared type
    pub fn set(&self, bits: &mut BitString, index: usize, value: VariableValue) -> Result<()> {
        let (offset, width, var_type) = self.variable(index)?;
        match (var_type, value) {
            (VariableType::Bool, VariableValue::Bool(v)) => bits.set_bool(offset, width, v),
            (VariableType::Int, VariableValue::Int(v)) => bits.set_int(offset, width, v),
            (VariableType::Uint, VariableValue::Uint(v)) => bits.set_uint(offset, width, v),
            (VariableType::Double, VariableValue::Double(v)) => bits.set_double(offset, width, v),
            (declared, value) => Err(UmbError::schema(format!(
                "variable {index} is declared {declared}, got {} value",
                value.var_type()
            ))),
        }
    }

    /// Comma-separated variable values in declaration order
    pub fn decode(&self, bits: &BitString) -> Result<String> {
        let mut values = Vec::new();
        for (index, item) in self.items.iter().enumerate() {
            if let LayoutItem::Variable { .. } = item {
                values.push(self.get(bits, index)?.to_string());
            }
        }
        Ok(values.join(","))
    }

    /// Raw bits grouped by item, last item first, padding shown as dots
    pub fn format(&self, bits: &BitString) -> Result<String> {
        let mut groups = Vec::with_capacity(self.items.len());
        for (index, item) in self.items.iter().enumerate().rev() {
            groups.push(match item {
                LayoutItem::Variable { width, .. } => bits.to_bit_text(self.offsets[index], *width)?,
                LayoutItem::Padding { width } => ".".repeat(*width as usize),
            });
        }
        Ok(groups.join("|"))
    }

    /// Index description of this layout, padded to a whole number of bytes
    pub fn to_description(&self) -> ValuationDescription {
        let mut variables: Vec<ValuationItem> = self
            .items
            .iter()
            .map(|item| match item {
                LayoutItem::Variable {
                    name,
                    width,
                    var_type,
                } => ValuationItem::variable(name.clone(), *width, *var_type),
                LayoutItem::Padding { width } => ValuationItem::padding(*width),
            })
            .collect();
        match self.trailing_padding() {
            0 => {}
            width => variables.push(ValuationItem::padding(width)),
        }
        ValuationDescription {
            alignment: Some(self.total_bytes() as u32),
            variables,
        }
    }
}
