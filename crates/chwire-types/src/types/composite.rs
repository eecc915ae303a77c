use std::fmt;

use crate::coerce::CoerceError;
use crate::error::TypeError;
use crate::grammar::SyntaxTreeNode;
use crate::native::NativeType;
use crate::types::{integer_arg, ClickHouseType, ParseContext};
use crate::value::Value;

fn single_child<'n>(
    node: &'n SyntaxTreeNode,
    type_name: &'static str,
) -> Result<&'n SyntaxTreeNode, TypeError> {
    node.single_child().ok_or_else(|| {
        TypeError::invalid(type_name, format!("expected exactly one argument, got {node}"))
    })
}

/// `FixedString(N)`: exactly `N` bytes, zero padded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FixedStringType {
    length: usize,
}

impl FixedStringType {
    pub fn new(length: usize) -> Result<Self, TypeError> {
        if length == 0 {
            return Err(TypeError::invalid("FixedString", "length must be positive"));
        }
        Ok(Self { length })
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub(crate) fn parse(
        node: &SyntaxTreeNode,
        _ctx: &ParseContext<'_>,
    ) -> Result<ClickHouseType, TypeError> {
        let length = integer_arg(single_child(node, "FixedString")?, "FixedString")?;
        Ok(ClickHouseType::FixedString(Self::new(length as usize)?))
    }
}

impl fmt::Display for FixedStringType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FixedString({})", self.length)
    }
}

/// `Array(T)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArrayType {
    element: Box<ClickHouseType>,
}

impl ArrayType {
    pub fn new(element: ClickHouseType) -> Self {
        Self {
            element: Box::new(element),
        }
    }

    pub fn element(&self) -> &ClickHouseType {
        &self.element
    }

    pub fn native_type(&self) -> NativeType {
        NativeType::array_of(self.element.native_type())
    }

    pub(crate) fn parse(
        node: &SyntaxTreeNode,
        ctx: &ParseContext<'_>,
    ) -> Result<ClickHouseType, TypeError> {
        let element = ctx.resolve(single_child(node, "Array")?)?;
        Ok(ClickHouseType::Array(Self::new(element)))
    }
}

impl fmt::Display for ArrayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Array({})", self.element)
    }
}

/// `Nullable(T)`: a presence flag plus, when present, the inner value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NullableType {
    inner: Box<ClickHouseType>,
}

impl NullableType {
    pub fn new(inner: ClickHouseType) -> Self {
        Self {
            inner: Box::new(inner),
        }
    }

    pub fn inner(&self) -> &ClickHouseType {
        &self.inner
    }

    pub fn native_type(&self) -> NativeType {
        NativeType::optional_of(self.inner.native_type())
    }

    pub(crate) fn parse(
        node: &SyntaxTreeNode,
        ctx: &ParseContext<'_>,
    ) -> Result<ClickHouseType, TypeError> {
        let inner = ctx.resolve(single_child(node, "Nullable")?)?;
        Ok(ClickHouseType::Nullable(Self::new(inner)))
    }
}

impl fmt::Display for NullableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Nullable({})", self.inner)
    }
}

/// `LowCardinality(T)`: dictionary encoding on the wire, invisible in the native value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LowCardinalityType {
    inner: Box<ClickHouseType>,
}

impl LowCardinalityType {
    pub fn new(inner: ClickHouseType) -> Self {
        Self {
            inner: Box::new(inner),
        }
    }

    pub fn inner(&self) -> &ClickHouseType {
        &self.inner
    }

    pub(crate) fn parse(
        node: &SyntaxTreeNode,
        ctx: &ParseContext<'_>,
    ) -> Result<ClickHouseType, TypeError> {
        let inner = ctx.resolve(single_child(node, "LowCardinality")?)?;
        Ok(ClickHouseType::LowCardinality(Self::new(inner)))
    }
}

impl fmt::Display for LowCardinalityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LowCardinality({})", self.inner)
    }
}

/// One element of a tuple or nested type, optionally named.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TupleElement {
    pub name: Option<String>,
    pub ty: ClickHouseType,
}

impl fmt::Display for TupleElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) if is_plain_identifier(name) => write!(f, "{name} {}", self.ty),
            Some(name) => write!(f, "`{name}` {}", self.ty),
            None => write!(f, "{}", self.ty),
        }
    }
}

fn is_plain_identifier(name: &str) -> bool {
    let mut bytes = name.bytes();
    matches!(bytes.next(), Some(b) if b.is_ascii_alphabetic() || b == b'_')
        && bytes.all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// `Tuple(T1, T2, ...)` or `Tuple(a T1, b T2, ...)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TupleType {
    elements: Vec<TupleElement>,
}

impl TupleType {
    pub fn new(types: impl IntoIterator<Item = ClickHouseType>) -> Self {
        Self {
            elements: types
                .into_iter()
                .map(|ty| TupleElement { name: None, ty })
                .collect(),
        }
    }

    pub fn named<N: Into<String>>(fields: impl IntoIterator<Item = (N, ClickHouseType)>) -> Self {
        Self {
            elements: fields
                .into_iter()
                .map(|(name, ty)| TupleElement {
                    name: Some(name.into()),
                    ty,
                })
                .collect(),
        }
    }

    pub fn elements(&self) -> &[TupleElement] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn types(&self) -> impl Iterator<Item = &ClickHouseType> + '_ {
        self.elements.iter().map(|element| &element.ty)
    }

    pub fn native_type(&self) -> NativeType {
        NativeType::tuple_of(self.types().map(ClickHouseType::native_type).collect())
    }

    /// Build a tuple value, converting each scalar element to its column's native type.
    ///
    /// Composite elements (arrays, tuples, maps, ...) are taken as given.
    pub fn make_tuple(&self, values: Vec<Value>) -> Result<Value, CoerceError> {
        if values.len() != self.elements.len() {
            return Err(TypeError::TupleArityMismatch {
                expected: self.elements.len(),
                actual: values.len(),
            }
            .into());
        }
        let values = values
            .into_iter()
            .zip(self.types())
            .map(|(value, ty)| {
                if ty.is_scalar() {
                    value.coerce_to(ty)
                } else {
                    Ok(value)
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Value::Tuple(values))
    }

    fn parse_elements(node: &SyntaxTreeNode, ctx: &ParseContext<'_>) -> Result<Self, TypeError> {
        let elements = node
            .children
            .iter()
            .map(|child| {
                Ok(TupleElement {
                    name: child.field_name.clone(),
                    ty: ctx.resolve(child)?,
                })
            })
            .collect::<Result<Vec<_>, TypeError>>()?;
        Ok(Self { elements })
    }

    pub(crate) fn parse(
        node: &SyntaxTreeNode,
        ctx: &ParseContext<'_>,
    ) -> Result<ClickHouseType, TypeError> {
        Ok(ClickHouseType::Tuple(Self::parse_elements(node, ctx)?))
    }

    fn fmt_elements(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, element) in self.elements.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{element}")?;
        }
        Ok(())
    }
}

impl fmt::Display for TupleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Tuple(")?;
        self.fmt_elements(f)?;
        f.write_str(")")
    }
}

/// `Nested(a T1, b T2, ...)`: rows of tuples.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NestedType {
    row: TupleType,
}

impl NestedType {
    pub fn new(row: TupleType) -> Self {
        Self { row }
    }

    /// Shape of a single nested row.
    pub fn row(&self) -> &TupleType {
        &self.row
    }

    pub fn native_type(&self) -> NativeType {
        NativeType::array_of(self.row.native_type())
    }

    pub(crate) fn parse(
        node: &SyntaxTreeNode,
        ctx: &ParseContext<'_>,
    ) -> Result<ClickHouseType, TypeError> {
        if node.children.is_empty() {
            return Err(TypeError::invalid("Nested", "expected at least one element"));
        }
        Ok(ClickHouseType::Nested(Self::new(TupleType::parse_elements(
            node, ctx,
        )?)))
    }
}

impl fmt::Display for NestedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Nested(")?;
        self.row.fmt_elements(f)?;
        f.write_str(")")
    }
}

/// `Map(K, V)`: a counted list of key/value pairs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MapType {
    key: Box<ClickHouseType>,
    value: Box<ClickHouseType>,
}

impl MapType {
    pub fn new(key: ClickHouseType, value: ClickHouseType) -> Self {
        Self {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    pub fn key(&self) -> &ClickHouseType {
        &self.key
    }

    pub fn value(&self) -> &ClickHouseType {
        &self.value
    }

    pub fn native_type(&self) -> NativeType {
        NativeType::map_of(self.key.native_type(), self.value.native_type())
    }

    pub(crate) fn parse(
        node: &SyntaxTreeNode,
        ctx: &ParseContext<'_>,
    ) -> Result<ClickHouseType, TypeError> {
        let [key, value] = node.children.as_slice() else {
            return Err(TypeError::invalid(
                "Map",
                format!("expected (key, value), got {node}"),
            ));
        };
        Ok(ClickHouseType::Map(Self::new(
            ctx.resolve(key)?,
            ctx.resolve(value)?,
        )))
    }
}

impl fmt::Display for MapType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Map({}, {})", self.key, self.value)
    }
}

/// `SimpleAggregateFunction(func, T)`: stored exactly like `T`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimpleAggregateFunctionType {
    function: String,
    inner: Box<ClickHouseType>,
}

impl SimpleAggregateFunctionType {
    pub fn new(function: impl Into<String>, inner: ClickHouseType) -> Self {
        Self {
            function: function.into(),
            inner: Box::new(inner),
        }
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn inner(&self) -> &ClickHouseType {
        &self.inner
    }

    pub(crate) fn parse(
        node: &SyntaxTreeNode,
        ctx: &ParseContext<'_>,
    ) -> Result<ClickHouseType, TypeError> {
        let [function, inner] = node.children.as_slice() else {
            return Err(TypeError::invalid(
                "SimpleAggregateFunction",
                format!("expected (function, type), got {node}"),
            ));
        };
        Ok(ClickHouseType::SimpleAggregateFunction(Self::new(
            function.to_string(),
            ctx.resolve(inner)?,
        )))
    }
}

impl fmt::Display for SimpleAggregateFunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SimpleAggregateFunction({}, {})", self.function, self.inner)
    }
}
