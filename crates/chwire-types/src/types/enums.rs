use std::collections::HashMap;
use std::fmt;

use crate::error::TypeError;
use crate::grammar::{quote, unquote, SyntaxTreeNode};
use crate::type_code::TypeCode;
use crate::types::{ClickHouseType, ParseContext};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EnumWidth {
    Enum8,
    Enum16,
}

impl EnumWidth {
    pub const fn type_code(self) -> TypeCode {
        match self {
            EnumWidth::Enum8 => TypeCode::Enum8,
            EnumWidth::Enum16 => TypeCode::Enum16,
        }
    }

    fn contains(self, code: i16) -> bool {
        match self {
            EnumWidth::Enum8 => i8::try_from(code).is_ok(),
            EnumWidth::Enum16 => true,
        }
    }
}

/// `Enum8('a' = 1, ...)` / `Enum16(...)`: a two-way mapping between names and integer codes.
#[derive(Clone, Debug)]
pub struct EnumType {
    width: EnumWidth,
    /// Declaration order, used for display.
    entries: Vec<(String, i16)>,
    by_name: HashMap<String, i16>,
    by_code: HashMap<i16, usize>,
}

impl PartialEq for EnumType {
    fn eq(&self, other: &Self) -> bool {
        self.width == other.width && self.entries == other.entries
    }
}

impl Eq for EnumType {}

impl EnumType {
    pub fn new<N: Into<String>>(
        width: EnumWidth,
        entries: impl IntoIterator<Item = (N, i16)>,
    ) -> Result<Self, TypeError> {
        let type_name = width.type_code().name();
        let entries: Vec<(String, i16)> = entries
            .into_iter()
            .map(|(name, code)| (name.into(), code))
            .collect();
        if entries.is_empty() {
            return Err(TypeError::invalid(type_name, "enum must have at least one value"));
        }

        let mut by_name = HashMap::with_capacity(entries.len());
        let mut by_code = HashMap::with_capacity(entries.len());
        for (idx, (name, code)) in entries.iter().enumerate() {
            if !width.contains(*code) {
                return Err(TypeError::invalid(
                    type_name,
                    format!("code {code} for {name:?} is out of range"),
                ));
            }
            if by_name.insert(name.clone(), *code).is_some() {
                return Err(TypeError::invalid(type_name, format!("duplicate name {name:?}")));
            }
            if by_code.insert(*code, idx).is_some() {
                return Err(TypeError::invalid(type_name, format!("duplicate code {code}")));
            }
        }

        Ok(Self {
            width,
            entries,
            by_name,
            by_code,
        })
    }

    pub fn width(&self) -> EnumWidth {
        self.width
    }

    pub fn type_code(&self) -> TypeCode {
        self.width.type_code()
    }

    pub fn entries(&self) -> &[(String, i16)] {
        &self.entries
    }

    /// Code for a symbolic name.
    pub fn code_of(&self, name: &str) -> Result<i16, TypeError> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| TypeError::EnumNameNotFound(name.to_string()))
    }

    /// Symbolic name for a code.
    pub fn name_of(&self, code: i16) -> Result<&str, TypeError> {
        self.by_code
            .get(&code)
            .map(|&idx| self.entries[idx].0.as_str())
            .ok_or(TypeError::EnumCodeNotFound(code))
    }

    pub(crate) fn parse_enum8(
        node: &SyntaxTreeNode,
        _ctx: &ParseContext<'_>,
    ) -> Result<ClickHouseType, TypeError> {
        Ok(ClickHouseType::Enum8(Self::parse_entries(node, EnumWidth::Enum8)?))
    }

    pub(crate) fn parse_enum16(
        node: &SyntaxTreeNode,
        _ctx: &ParseContext<'_>,
    ) -> Result<ClickHouseType, TypeError> {
        Ok(ClickHouseType::Enum16(Self::parse_entries(node, EnumWidth::Enum16)?))
    }

    /// `Enum(...)`: `Enum8` when every code fits in `i8`, otherwise `Enum16`.
    pub(crate) fn parse_enum(
        node: &SyntaxTreeNode,
        _ctx: &ParseContext<'_>,
    ) -> Result<ClickHouseType, TypeError> {
        let entries = Self::parse_pairs(node, EnumWidth::Enum8)?;
        if entries
            .iter()
            .all(|(_, code)| EnumWidth::Enum8.contains(*code))
        {
            Ok(ClickHouseType::Enum8(Self::new(EnumWidth::Enum8, entries)?))
        } else {
            Ok(ClickHouseType::Enum16(Self::new(EnumWidth::Enum16, entries)?))
        }
    }

    fn parse_entries(node: &SyntaxTreeNode, width: EnumWidth) -> Result<Self, TypeError> {
        Self::new(width, Self::parse_pairs(node, width)?)
    }

    fn parse_pairs(
        node: &SyntaxTreeNode,
        width: EnumWidth,
    ) -> Result<Vec<(String, i16)>, TypeError> {
        let type_name = width.type_code().name();
        let mut entries = Vec::with_capacity(node.children.len());
        for child in &node.children {
            // Codes are integers, so the last `=` always separates name from code even when the
            // quoted name itself contains `=`.
            let Some((name, code)) = child
                .value
                .rsplit_once('=')
                .filter(|_| !child.has_children())
            else {
                return Err(TypeError::invalid(
                    type_name,
                    format!("expected 'name' = code, got {child}"),
                ));
            };
            let code = code.trim().parse::<i16>().map_err(|_| {
                TypeError::invalid(type_name, format!("invalid code in {}", child.value))
            })?;
            entries.push((unquote(name), code));
        }
        Ok(entries)
    }
}

impl fmt::Display for EnumType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.type_code().name())?;
        for (idx, (name, code)) in self.entries.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} = {code}", quote(name))?;
        }
        f.write_str(")")
    }
}
