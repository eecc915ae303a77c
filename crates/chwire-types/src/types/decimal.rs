use std::fmt;
use std::ops::RangeInclusive;

use crate::error::TypeError;
use crate::grammar::SyntaxTreeNode;
use crate::type_code::TypeCode;
use crate::types::{integer_arg, ClickHouseType, ParseContext};
use crate::value::pow10;

/// Storage width of a decimal column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DecimalWidth {
    W32,
    W64,
    W128,
}

/// Precision buckets, narrowest first.
const PRECISION_BUCKETS: [(RangeInclusive<u32>, DecimalWidth); 3] = [
    (1..=9, DecimalWidth::W32),
    (10..=18, DecimalWidth::W64),
    (19..=38, DecimalWidth::W128),
];

impl DecimalWidth {
    /// Narrowest width able to hold `precision` digits.
    pub fn for_precision(precision: u32) -> Result<Self, TypeError> {
        PRECISION_BUCKETS
            .iter()
            .find(|(range, _)| range.contains(&precision))
            .map(|(_, width)| *width)
            .ok_or(TypeError::DecimalPrecisionOutOfRange { precision })
    }

    pub const fn bytes(self) -> usize {
        match self {
            DecimalWidth::W32 => 4,
            DecimalWidth::W64 => 8,
            DecimalWidth::W128 => 16,
        }
    }

    pub const fn max_precision(self) -> u32 {
        match self {
            DecimalWidth::W32 => 9,
            DecimalWidth::W64 => 18,
            DecimalWidth::W128 => 38,
        }
    }

    pub const fn type_code(self) -> TypeCode {
        match self {
            DecimalWidth::W32 => TypeCode::Decimal32,
            DecimalWidth::W64 => TypeCode::Decimal64,
            DecimalWidth::W128 => TypeCode::Decimal128,
        }
    }
}

/// `Decimal(P, S)` and its fixed-precision spellings `Decimal32(S)`, `Decimal64(S)`,
/// `Decimal128(S)`.
///
/// Values travel as a signed integer of [`DecimalWidth::bytes`] bytes holding
/// `value * 10^scale`. Precision, scale and the derived exponent are fixed at construction.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DecimalType {
    precision: u32,
    scale: u32,
    exponent: i128,
    width: DecimalWidth,
}

impl DecimalType {
    pub fn new(precision: u32, scale: u32) -> Result<Self, TypeError> {
        let width = DecimalWidth::for_precision(precision)?;
        if scale > precision {
            return Err(TypeError::invalid(
                "Decimal",
                format!("scale {scale} exceeds precision {precision}"),
            ));
        }
        let exponent = pow10(scale).ok_or_else(|| {
            TypeError::invalid("Decimal", format!("scale {scale} is too large"))
        })?;
        Ok(Self {
            precision,
            scale,
            exponent,
            width,
        })
    }

    /// A decimal with the full precision of `width` (`Decimal64(S)` is `Decimal(18, S)`).
    pub fn with_width(width: DecimalWidth, scale: u32) -> Result<Self, TypeError> {
        Self::new(width.max_precision(), scale)
    }

    pub fn precision(&self) -> u32 {
        self.precision
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// `10^scale`.
    pub fn exponent(&self) -> i128 {
        self.exponent
    }

    pub fn width(&self) -> DecimalWidth {
        self.width
    }

    /// Storage size in bytes.
    pub fn size(&self) -> usize {
        self.width.bytes()
    }

    pub fn type_code(&self) -> TypeCode {
        self.width.type_code()
    }

    /// True when a scaled mantissa has no more than `precision` digits.
    pub fn fits(&self, mantissa: i128) -> bool {
        match pow10(self.precision) {
            Some(limit) => mantissa > -limit && mantissa < limit,
            // 10^38 fits in i128 so this is unreachable for valid precisions.
            None => true,
        }
    }

    /// `Decimal(P, S)` or `Decimal(P)`.
    pub(crate) fn parse(
        node: &SyntaxTreeNode,
        _ctx: &ParseContext<'_>,
    ) -> Result<ClickHouseType, TypeError> {
        let (precision, scale) = match node.children.as_slice() {
            [p] => (integer_arg(p, "Decimal")?, 0),
            [p, s] => (integer_arg(p, "Decimal")?, integer_arg(s, "Decimal")?),
            _ => {
                return Err(TypeError::invalid(
                    "Decimal",
                    format!("expected (precision, scale), got {node}"),
                ))
            }
        };
        Ok(ClickHouseType::Decimal(Self::new(precision, scale)?))
    }

    pub(crate) fn parse_decimal32(
        node: &SyntaxTreeNode,
        _ctx: &ParseContext<'_>,
    ) -> Result<ClickHouseType, TypeError> {
        Self::parse_sized(node, DecimalWidth::W32, "Decimal32")
    }

    pub(crate) fn parse_decimal64(
        node: &SyntaxTreeNode,
        _ctx: &ParseContext<'_>,
    ) -> Result<ClickHouseType, TypeError> {
        Self::parse_sized(node, DecimalWidth::W64, "Decimal64")
    }

    pub(crate) fn parse_decimal128(
        node: &SyntaxTreeNode,
        _ctx: &ParseContext<'_>,
    ) -> Result<ClickHouseType, TypeError> {
        Self::parse_sized(node, DecimalWidth::W128, "Decimal128")
    }

    fn parse_sized(
        node: &SyntaxTreeNode,
        width: DecimalWidth,
        type_name: &'static str,
    ) -> Result<ClickHouseType, TypeError> {
        let scale_node = node
            .single_child()
            .ok_or_else(|| TypeError::invalid(type_name, format!("expected (scale), got {node}")))?;
        let scale = integer_arg(scale_node, type_name)?;
        Ok(ClickHouseType::Decimal(Self::with_width(width, scale)?))
    }
}

impl fmt::Display for DecimalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Decimal({}, {})", self.precision, self.scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_follows_precision_buckets() {
        for precision in 1..=38 {
            let expected = match precision {
                1..=9 => 4,
                10..=18 => 8,
                _ => 16,
            };
            let ty = DecimalType::new(precision, 0).unwrap();
            assert_eq!(ty.size(), expected, "precision {precision}");
        }
        assert_eq!(
            DecimalType::new(0, 0),
            Err(TypeError::DecimalPrecisionOutOfRange { precision: 0 })
        );
        assert_eq!(
            DecimalType::new(39, 0),
            Err(TypeError::DecimalPrecisionOutOfRange { precision: 39 })
        );
    }

    #[test]
    fn exponent_tracks_scale() {
        let ty = DecimalType::new(18, 4).unwrap();
        assert_eq!(ty.exponent(), 10_000);
        let ty = DecimalType::with_width(DecimalWidth::W128, 20).unwrap();
        assert_eq!(ty.precision(), 38);
        assert_eq!(ty.exponent(), 10i128.pow(20));
    }

    #[test]
    fn scale_cannot_exceed_precision() {
        assert!(DecimalType::new(4, 5).is_err());
        assert!(DecimalType::with_width(DecimalWidth::W32, 10).is_err());
    }

    #[test]
    fn fits_checks_digit_count() {
        let ty = DecimalType::new(5, 2).unwrap();
        assert!(ty.fits(99_999));
        assert!(ty.fits(-99_999));
        assert!(!ty.fits(100_000));
    }
}
