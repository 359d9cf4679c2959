// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! `bcl.DateTime` and `bcl.TimeSpan`.
//!
//! Both count 100ns ticks; DateTime ticks are relative to the Unix epoch. The
//! default layout stores the tick count divided by the coarsest unit that
//! divides it exactly:
//!
//! ```text
//! message TimeSpan { sint64 value = 1; TimeSpanScale scale = 2; DateTimeKind kind = 3; }
//! ```
//!
//! `FixedSize` writes the raw tick count as fixed64 and `WellKnown` uses the
//! `google.protobuf.Timestamp` / `Duration` layout of seconds and nanos.

use super::bcl::{read_surrogate, surrogate_wire_type, write_surrogate};
use crate::error::Error;
use crate::meta::{BclKind, DefaultValue, ValueShape};
use crate::resolver::context::{ReadContext, WriteContext};
use crate::serializer::ProtoItem;
use crate::types::{DataFormat, WireType};
use chrono::{DateTime, NaiveDateTime, TimeDelta};

const TICKS_PER_MILLISECOND: i64 = 10_000;
const TICKS_PER_SECOND: i64 = 10_000_000;
const TICKS_PER_MINUTE: i64 = 600_000_000;
const TICKS_PER_HOUR: i64 = 36_000_000_000;
const TICKS_PER_DAY: i64 = 864_000_000_000;
const NANOS_PER_TICK: i64 = 100;

const SCALE_DAYS: u32 = 0;
const SCALE_TICKS: u32 = 5;
const SCALE_MINMAX: u32 = 15;

/// Ticks per unit, indexed by scale (days, hours, minutes, seconds,
/// milliseconds, ticks).
const UNITS: [i64; 6] = [
    TICKS_PER_DAY,
    TICKS_PER_HOUR,
    TICKS_PER_MINUTE,
    TICKS_PER_SECOND,
    TICKS_PER_MILLISECOND,
    1,
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Ticks {
    Min,
    Max,
    Value(i64),
}

trait TickValue: Sized {
    const KIND: BclKind;

    fn zero() -> Self;
    fn to_ticks(&self) -> Result<Ticks, Error>;
    fn from_ticks(ticks: Ticks) -> Result<Self, Error>;
    fn to_well_known(&self) -> (i64, i32);
    fn from_well_known(seconds: i64, nanos: i32) -> Result<Self, Error>;
}

#[cold]
fn unrepresentable(what: &str) -> Error {
    Error::schema_mismatch(format!("{} cannot be represented in 100ns ticks", what))
}

#[cold]
fn out_of_range(kind: BclKind, detail: impl std::fmt::Display) -> Error {
    Error::format(format!("{:?} value {} is out of range", kind, detail))
}

fn split_ticks(ticks: i64) -> (i64, u32) {
    let seconds = ticks.div_euclid(TICKS_PER_SECOND);
    let nanos = ticks.rem_euclid(TICKS_PER_SECOND) * NANOS_PER_TICK;
    (seconds, nanos as u32)
}

/// Sub-tick nanoseconds are rejected rather than truncated.
fn join_ticks(seconds: i64, nanos: i64, what: &str) -> Result<i64, Error> {
    if nanos % NANOS_PER_TICK != 0 {
        return Err(Error::schema_mismatch(format!(
            "{} has {} nanoseconds, which is not a whole number of 100ns ticks",
            what, nanos
        )));
    }
    seconds
        .checked_mul(TICKS_PER_SECOND)
        .and_then(|ticks| ticks.checked_add(nanos / NANOS_PER_TICK))
        .ok_or_else(|| unrepresentable(what))
}

impl TickValue for NaiveDateTime {
    const KIND: BclKind = BclKind::DateTime;

    fn zero() -> Self {
        NaiveDateTime::default()
    }

    fn to_ticks(&self) -> Result<Ticks, Error> {
        if *self == NaiveDateTime::MIN {
            return Ok(Ticks::Min);
        }
        if *self == NaiveDateTime::MAX {
            return Ok(Ticks::Max);
        }
        let utc = self.and_utc();
        join_ticks(
            utc.timestamp(),
            utc.timestamp_subsec_nanos() as i64,
            "date time",
        )
        .map(Ticks::Value)
    }

    fn from_ticks(ticks: Ticks) -> Result<Self, Error> {
        match ticks {
            Ticks::Min => Ok(NaiveDateTime::MIN),
            Ticks::Max => Ok(NaiveDateTime::MAX),
            Ticks::Value(ticks) => {
                let (seconds, nanos) = split_ticks(ticks);
                DateTime::from_timestamp(seconds, nanos)
                    .map(|dt| dt.naive_utc())
                    .ok_or_else(|| out_of_range(Self::KIND, ticks))
            }
        }
    }

    fn to_well_known(&self) -> (i64, i32) {
        let utc = self.and_utc();
        (utc.timestamp(), utc.timestamp_subsec_nanos() as i32)
    }

    fn from_well_known(seconds: i64, nanos: i32) -> Result<Self, Error> {
        let nanos = u32::try_from(nanos).map_err(|_| out_of_range(Self::KIND, nanos))?;
        DateTime::from_timestamp(seconds, nanos)
            .map(|dt| dt.naive_utc())
            .ok_or_else(|| out_of_range(Self::KIND, seconds))
    }
}

impl TickValue for TimeDelta {
    const KIND: BclKind = BclKind::TimeSpan;

    fn zero() -> Self {
        TimeDelta::zero()
    }

    fn to_ticks(&self) -> Result<Ticks, Error> {
        if *self == TimeDelta::MIN {
            return Ok(Ticks::Min);
        }
        if *self == TimeDelta::MAX {
            return Ok(Ticks::Max);
        }
        join_ticks(self.num_seconds(), self.subsec_nanos() as i64, "time span")
            .map(Ticks::Value)
    }

    fn from_ticks(ticks: Ticks) -> Result<Self, Error> {
        match ticks {
            Ticks::Min => Ok(TimeDelta::MIN),
            Ticks::Max => Ok(TimeDelta::MAX),
            Ticks::Value(ticks) => {
                let (seconds, nanos) = split_ticks(ticks);
                TimeDelta::new(seconds, nanos).ok_or_else(|| out_of_range(Self::KIND, ticks))
            }
        }
    }

    fn to_well_known(&self) -> (i64, i32) {
        (self.num_seconds(), self.subsec_nanos())
    }

    fn from_well_known(seconds: i64, nanos: i32) -> Result<Self, Error> {
        TimeDelta::try_seconds(seconds)
            .and_then(|span| span.checked_add(&TimeDelta::nanoseconds(nanos as i64)))
            .ok_or_else(|| out_of_range(Self::KIND, seconds))
    }
}

/// Coarsest `(value, scale)` representation of a tick count.
fn scaled(ticks: Ticks) -> (i64, u32) {
    match ticks {
        Ticks::Min => (-1, SCALE_MINMAX),
        Ticks::Max => (1, SCALE_MINMAX),
        Ticks::Value(0) => (0, SCALE_DAYS),
        Ticks::Value(ticks) => UNITS
            .iter()
            .zip(0u32..)
            .find(|(unit, _)| ticks % **unit == 0)
            .map(|(unit, scale)| (ticks / unit, scale))
            .unwrap_or((ticks, SCALE_TICKS)),
    }
}

fn unscaled(kind: BclKind, value: i64, scale: u32) -> Result<Ticks, Error> {
    if scale == SCALE_MINMAX {
        return match value {
            1 => Ok(Ticks::Max),
            -1 => Ok(Ticks::Min),
            other => Err(Error::format(format!(
                "{:?} min/max marker must be 1 or -1, got {}",
                kind, other
            ))),
        };
    }
    let unit = UNITS
        .get(scale as usize)
        .ok_or_else(|| Error::format(format!("unknown {:?} scale {}", kind, scale)))?;
    value
        .checked_mul(*unit)
        .map(Ticks::Value)
        .ok_or_else(|| out_of_range(kind, value))
}

fn time_wire_type(format: DataFormat) -> WireType {
    match format {
        DataFormat::FixedSize => WireType::Fixed64,
        DataFormat::WellKnown => WireType::LengthDelimited,
        other => surrogate_wire_type(other),
    }
}

fn write_time<T: TickValue>(
    value: &T,
    format: DataFormat,
    context: &mut WriteContext,
) -> Result<(), Error> {
    match format {
        DataFormat::FixedSize => {
            let raw = match value.to_ticks()? {
                Ticks::Min => i64::MIN,
                Ticks::Max => i64::MAX,
                Ticks::Value(ticks) => ticks,
            };
            context.writer.write_i64(raw)
        }
        DataFormat::WellKnown => {
            let (seconds, nanos) = value.to_well_known();
            write_surrogate(context, |writer| {
                if seconds != 0 {
                    writer.write_field_header(1, WireType::Varint)?;
                    writer.write_i64(seconds)?;
                }
                if nanos != 0 {
                    writer.write_field_header(2, WireType::Varint)?;
                    writer.write_i32(nanos)?;
                }
                Ok(())
            })
        }
        _ => {
            let (value, scale) = scaled(value.to_ticks()?);
            write_surrogate(context, |writer| {
                if value != 0 {
                    writer.write_field_header(1, WireType::SignedVarint)?;
                    writer.write_i64(value)?;
                }
                if scale != SCALE_DAYS {
                    writer.write_field_header(2, WireType::Varint)?;
                    writer.write_u32(scale)?;
                }
                Ok(())
            })
        }
    }
}

fn read_time<T: TickValue>(format: DataFormat, context: &mut ReadContext) -> Result<T, Error> {
    match format {
        DataFormat::FixedSize => {
            let ticks = match context.reader.read_i64()? {
                i64::MIN => Ticks::Min,
                i64::MAX => Ticks::Max,
                ticks => Ticks::Value(ticks),
            };
            T::from_ticks(ticks)
        }
        DataFormat::WellKnown => {
            let (mut seconds, mut nanos) = (0i64, 0i32);
            read_surrogate(context, |reader, tag| match tag {
                1 => {
                    seconds = reader.read_i64()?;
                    Ok(true)
                }
                2 => {
                    nanos = reader.read_i32()?;
                    Ok(true)
                }
                _ => Ok(false),
            })?;
            T::from_well_known(seconds, nanos)
        }
        _ => {
            let (mut value, mut scale) = (0i64, SCALE_DAYS);
            // field 3 is the DateTimeKind, which naive values have no use for
            read_surrogate(context, |reader, tag| match tag {
                1 => {
                    reader.hint(WireType::SignedVarint);
                    value = reader.read_i64()?;
                    Ok(true)
                }
                2 => {
                    scale = reader.read_u32()?;
                    Ok(true)
                }
                _ => Ok(false),
            })?;
            T::from_ticks(unscaled(T::KIND, value, scale)?)
        }
    }
}

macro_rules! impl_proto_time {
    ($ty:ty) => {
        impl ProtoItem for $ty {
            fn shape() -> ValueShape {
                ValueShape::Surrogate(<$ty as TickValue>::KIND)
            }

            fn wire_type(format: DataFormat) -> WireType {
                time_wire_type(format)
            }

            fn accepts_format(format: DataFormat) -> bool {
                matches!(
                    format,
                    DataFormat::Default
                        | DataFormat::Group
                        | DataFormat::FixedSize
                        | DataFormat::WellKnown
                )
            }

            fn write_item(&self, format: DataFormat, context: &mut WriteContext) -> Result<(), Error> {
                write_time(self, format, context)
            }

            fn read_item(format: DataFormat, context: &mut ReadContext) -> Result<Self, Error> {
                read_time(format, context)
            }

            fn fresh(_context: &ReadContext) -> Result<Self, Error> {
                Ok(<$ty as TickValue>::zero())
            }

            fn is_default(&self, default: Option<&DefaultValue>) -> bool {
                match default {
                    Some(default) => Self::from_default(default) == Some(*self),
                    None => *self == <$ty as TickValue>::zero(),
                }
            }

            /// Integer defaults are tick counts.
            fn from_default(default: &DefaultValue) -> Option<Self> {
                match default {
                    DefaultValue::Int(ticks) => {
                        <$ty as TickValue>::from_ticks(Ticks::Value(*ticks)).ok()
                    }
                    _ => None,
                }
            }
        }
    };
}

impl_proto_time!(NaiveDateTime);
impl_proto_time!(TimeDelta);
