use std::fmt;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::TypeError;
use crate::grammar::{quote, SyntaxTreeNode};
use crate::types::{integer_arg, ClickHouseType, ParseContext};
use crate::zone::resolve_local;

/// Highest sub-second precision ClickHouse supports (nanoseconds).
pub const MAX_DATETIME64_SCALE: u32 = 9;

fn zone_arg(
    node: &SyntaxTreeNode,
    ctx: &ParseContext<'_>,
    type_name: &'static str,
) -> Result<Tz, TypeError> {
    if !node.is_string_literal() {
        return Err(TypeError::invalid(
            type_name,
            format!("expected a quoted time zone, got {node}"),
        ));
    }
    Ok(ctx.zone(&node.unquoted()))
}

/// `DateTime` / `DateTime('Zone/Name')`: whole seconds since the Unix epoch.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct DateTimeType {
    time_zone: Option<Tz>,
}

impl DateTimeType {
    pub fn new(time_zone: Option<Tz>) -> Self {
        Self { time_zone }
    }

    /// The zone named in the signature, if any.
    pub fn time_zone(&self) -> Option<Tz> {
        self.time_zone
    }

    /// The zone values are converted to; UTC when the signature names none.
    pub fn effective_zone(&self) -> Tz {
        self.time_zone.unwrap_or(Tz::UTC)
    }

    /// Interpret a zone-naive local time in this column's zone.
    pub fn localize(&self, local: &NaiveDateTime) -> DateTime<Tz> {
        resolve_local(&self.effective_zone(), local)
    }

    pub fn from_unix_seconds(&self, seconds: i64) -> Option<DateTime<Tz>> {
        Utc.timestamp_opt(seconds, 0)
            .single()
            .map(|utc| utc.with_timezone(&self.effective_zone()))
    }

    pub(crate) fn parse(
        node: &SyntaxTreeNode,
        ctx: &ParseContext<'_>,
    ) -> Result<ClickHouseType, TypeError> {
        let time_zone = match node.children.as_slice() {
            [] => None,
            [zone] => Some(zone_arg(zone, ctx, "DateTime")?),
            _ => {
                return Err(TypeError::invalid(
                    "DateTime",
                    format!("expected at most one time zone, got {node}"),
                ))
            }
        };
        Ok(ClickHouseType::DateTime(Self::new(time_zone)))
    }
}

impl fmt::Display for DateTimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.time_zone {
            Some(tz) => write!(f, "DateTime({})", quote(tz.name())),
            None => f.write_str("DateTime"),
        }
    }
}

/// `DateTime64(scale[, 'Zone/Name'])`: ticks of `10^-scale` seconds since the Unix epoch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DateTime64Type {
    scale: u32,
    time_zone: Option<Tz>,
}

impl DateTime64Type {
    pub fn new(scale: u32, time_zone: Option<Tz>) -> Result<Self, TypeError> {
        if scale > MAX_DATETIME64_SCALE {
            return Err(TypeError::invalid(
                "DateTime64",
                format!("scale {scale} exceeds {MAX_DATETIME64_SCALE}"),
            ));
        }
        Ok(Self { scale, time_zone })
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    pub fn time_zone(&self) -> Option<Tz> {
        self.time_zone
    }

    pub fn effective_zone(&self) -> Tz {
        self.time_zone.unwrap_or(Tz::UTC)
    }

    pub fn ticks_per_second(&self) -> i64 {
        10i64.pow(self.scale)
    }

    pub fn localize(&self, local: &NaiveDateTime) -> DateTime<Tz> {
        resolve_local(&self.effective_zone(), local)
    }

    /// Ticks since the epoch; sub-tick precision is truncated toward negative infinity.
    pub fn to_ticks<Z: TimeZone>(&self, instant: &DateTime<Z>) -> Option<i64> {
        let nanos_per_tick = 10u32.pow(MAX_DATETIME64_SCALE - self.scale);
        let seconds = i128::from(instant.timestamp());
        let sub_ticks = i128::from(instant.timestamp_subsec_nanos() / nanos_per_tick);
        // The whole-second product can overflow i64 even when the total fits.
        i64::try_from(seconds * i128::from(self.ticks_per_second()) + sub_ticks).ok()
    }

    pub fn from_ticks(&self, ticks: i64) -> Option<DateTime<Tz>> {
        let tps = self.ticks_per_second();
        let seconds = ticks.div_euclid(tps);
        let nanos = ticks.rem_euclid(tps) * 10i64.pow(MAX_DATETIME64_SCALE - self.scale);
        let nanos = u32::try_from(nanos).ok()?;
        Utc.timestamp_opt(seconds, nanos)
            .single()
            .map(|utc| utc.with_timezone(&self.effective_zone()))
    }

    pub(crate) fn parse(
        node: &SyntaxTreeNode,
        ctx: &ParseContext<'_>,
    ) -> Result<ClickHouseType, TypeError> {
        let (scale, time_zone) = match node.children.as_slice() {
            [scale] => (integer_arg(scale, "DateTime64")?, None),
            [scale, zone] => (
                integer_arg(scale, "DateTime64")?,
                Some(zone_arg(zone, ctx, "DateTime64")?),
            ),
            _ => {
                return Err(TypeError::invalid(
                    "DateTime64",
                    format!("expected (scale[, 'zone']), got {node}"),
                ))
            }
        };
        Ok(ClickHouseType::DateTime64(Self::new(scale, time_zone)?))
    }
}

impl fmt::Display for DateTime64Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.time_zone {
            Some(tz) => write!(f, "DateTime64({}, {})", self.scale, quote(tz.name())),
            None => write!(f, "DateTime64({})", self.scale),
        }
    }
}
