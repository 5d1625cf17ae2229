// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 U.S. Federal Government (in countries where recognized)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Bidirectional conversion between element text and typed values.
//!
//! Every [`Converter`] is total on `None`: `from_string(None)` and
//! `to_string(None)` both yield `Ok(None)`. Handing a converter a [`Value`]
//! of the wrong kind is a [`BindingError::Type`]; ranged integers outside
//! their bounds are a [`BindingError::Range`].

use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, Timelike, Utc};
use regex::Regex;

use crate::error::BindingError;
use crate::soap::auth::AuthMethod;

/// Width of the base64 lines inside a PEM block.
const PEM_LINE_WIDTH: usize = 64;

static DATETIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<year>\d{4})-(?P<month>\d{2})-(?P<day>\d{2})T(?P<hour>\d{2}):(?P<minute>\d{2}):(?P<second>\d{2})(?P<tz>Z|(?P<sign>[+-])(?P<tz_hour>\d{2}):(?P<tz_minute>\d{2}))$",
    )
    .expect("datetime regex is valid")
});

static PEM_CERTIFICATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*-----BEGIN CERTIFICATE-----(?P<body>.*?)-----END CERTIFICATE-----\s*$")
        .expect("certificate regex is valid")
});

/// A typed value carried by a scalar field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Free text. Also used for PEM certificates.
    String(String),
    /// Any integer; ranged converters check bounds.
    Integer(i64),
    /// `xs:boolean`.
    Boolean(bool),
    /// `xs:dateTime` restricted to second precision.
    DateTime(XsDateTime),
    /// XCEP `clientAuthentication` value.
    AuthMethod(AuthMethod),
}

impl Value {
    /// Name of the value kind, used in type errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Integer(_) => "integer",
            Self::Boolean(_) => "boolean",
            Self::DateTime(_) => "datetime",
            Self::AuthMethod(_) => "authentication method",
        }
    }

    fn type_error(&self, expected: &'static str) -> BindingError {
        BindingError::Type {
            expected,
            actual: self.kind(),
        }
    }
}

/// Closed set of converters understood by the binding engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Converter {
    /// Text passes through unchanged.
    String,
    /// Unbounded (64-bit) integer.
    Integer,
    /// Integer restricted to `[lower, upper]`.
    RangedInteger {
        /// Inclusive lower bound.
        lower: i64,
        /// Inclusive upper bound.
        upper: i64,
    },
    /// `true`/`false`/`1`/`0`, written as lowercase words.
    Boolean,
    /// `CCYY-MM-DDThh:mm:ss(Z|+hh:mm|-hh:mm)`.
    DateTime,
    /// Bare base64 DER on the wire, PEM in memory.
    Certificate,
    /// XCEP client authentication bit (1, 2, 4 or 8).
    ClientAuthentication,
}

impl Converter {
    /// `xs:int`.
    pub const SIGNED_INT: Self = Self::RangedInteger {
        lower: i32::MIN as i64,
        upper: i32::MAX as i64,
    };

    /// `xs:unsignedInt`.
    pub const UNSIGNED_INT: Self = Self::RangedInteger {
        lower: 0,
        upper: u32::MAX as i64,
    };

    /// Decode element text.
    pub fn from_string(&self, text: Option<&str>) -> Result<Option<Value>, BindingError> {
        let Some(text) = text else {
            return Ok(None);
        };

        if let Self::String = self {
            return Ok(Some(Value::String(text.to_string())));
        }

        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        let value = match *self {
            Self::String => Value::String(text.to_string()),
            Self::Integer => Value::Integer(parse_integer(trimmed)?),
            Self::RangedInteger { lower, upper } => {
                let value = parse_integer(trimmed)?;
                check_range(value, lower, upper)?;
                Value::Integer(value)
            }
            Self::Boolean => Value::Boolean(match trimmed {
                "true" | "1" => true,
                "false" | "0" => false,
                _ => return Err(BindingError::format("boolean", text)),
            }),
            Self::DateTime => Value::DateTime(trimmed.parse()?),
            Self::Certificate => Value::String(wrap_certificate(trimmed)),
            Self::ClientAuthentication => {
                let wire = parse_integer(trimmed)?;
                let method = AuthMethod::from_wire(wire)
                    .ok_or_else(|| BindingError::format("clientAuthentication", text))?;
                Value::AuthMethod(method)
            }
        };

        Ok(Some(value))
    }

    /// Encode a value as element text.
    pub fn to_string(&self, value: Option<&Value>) -> Result<Option<String>, BindingError> {
        let Some(value) = value else {
            return Ok(None);
        };

        let text = match (*self, value) {
            (Self::String, Value::String(s)) => s.clone(),
            (Self::Integer, Value::Integer(i)) => i.to_string(),
            (Self::RangedInteger { lower, upper }, Value::Integer(i)) => {
                check_range(*i, lower, upper)?;
                i.to_string()
            }
            (Self::Boolean, Value::Boolean(b)) => b.to_string(),
            (Self::DateTime, Value::DateTime(dt)) => dt.to_string(),
            (Self::Certificate, Value::String(pem)) => unwrap_certificate(pem)?,
            (Self::ClientAuthentication, Value::AuthMethod(m)) => m.wire_value().to_string(),
            (Self::String | Self::Certificate, other) => return Err(other.type_error("string")),
            (Self::Integer | Self::RangedInteger { .. }, other) => {
                return Err(other.type_error("integer"))
            }
            (Self::Boolean, other) => return Err(other.type_error("boolean")),
            (Self::DateTime, other) => return Err(other.type_error("datetime")),
            (Self::ClientAuthentication, other) => {
                return Err(other.type_error("authentication method"))
            }
        };

        Ok(Some(text))
    }
}

fn parse_integer(text: &str) -> Result<i64, BindingError> {
    text.parse::<i64>()
        .map_err(|_| BindingError::format("integer", text))
}

fn check_range(value: i64, lower: i64, upper: i64) -> Result<(), BindingError> {
    if value < lower || value > upper {
        return Err(BindingError::Range {
            value: i128::from(value),
            lower,
            upper,
        });
    }
    Ok(())
}

/// Wrap bare base64 into a PEM certificate block.
fn wrap_certificate(base64: &str) -> String {
    let compact: String = base64.chars().filter(|c| !c.is_whitespace()).collect();
    let mut pem = String::from("-----BEGIN CERTIFICATE-----\n");
    for line in compact.as_bytes().chunks(PEM_LINE_WIDTH) {
        // base64 is ASCII, so chunking on bytes never splits a character
        pem.push_str(&String::from_utf8_lossy(line));
        pem.push('\n');
    }
    pem.push_str("-----END CERTIFICATE-----");
    pem
}

/// Strip the PEM armor and line breaks, leaving bare base64.
fn unwrap_certificate(pem: &str) -> Result<String, BindingError> {
    let caps = PEM_CERTIFICATE
        .captures(pem)
        .ok_or_else(|| BindingError::format("certificate", pem))?;
    Ok(caps["body"].chars().filter(|c| !c.is_whitespace()).collect())
}

/// Time zone designator of an [`XsDateTime`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offset {
    /// `Z`.
    Utc,
    /// Fixed offset east of UTC, in minutes.
    Minutes(i32),
}

/// An `xs:dateTime` with second precision and an explicit zone.
///
/// The zone designator is kept as written so that `Z` and `+00:00` survive a
/// round trip unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XsDateTime {
    /// Wall-clock time in the given zone.
    pub local: NaiveDateTime,
    /// Zone designator.
    pub offset: Offset,
}

impl XsDateTime {
    /// Current time in UTC, truncated to whole seconds.
    pub fn now_utc() -> Self {
        Self::from(Utc::now())
    }

    /// Offset east of UTC, in seconds.
    pub fn offset_seconds(&self) -> i32 {
        match self.offset {
            Offset::Utc => 0,
            Offset::Minutes(m) => m * 60,
        }
    }

    /// Convert to a chrono timestamp with a fixed offset.
    pub fn to_fixed(&self) -> Option<DateTime<FixedOffset>> {
        let tz = FixedOffset::east_opt(self.offset_seconds())?;
        self.local.and_local_timezone(tz).single()
    }
}

impl From<DateTime<Utc>> for XsDateTime {
    fn from(value: DateTime<Utc>) -> Self {
        let naive = value.naive_utc();
        Self {
            local: naive.with_nanosecond(0).unwrap_or(naive),
            offset: Offset::Utc,
        }
    }
}

impl std::str::FromStr for XsDateTime {
    type Err = BindingError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let invalid = || BindingError::format("datetime", text);
        let caps = DATETIME.captures(text).ok_or_else(invalid)?;
        let field = |name: &str| -> Result<u32, BindingError> {
            caps[name].parse::<u32>().map_err(|_| invalid())
        };

        let year = caps["year"].parse::<i32>().map_err(|_| invalid())?;
        let date = NaiveDate::from_ymd_opt(year, field("month")?, field("day")?).ok_or_else(invalid)?;
        let local = date
            .and_hms_opt(field("hour")?, field("minute")?, field("second")?)
            .ok_or_else(invalid)?;

        // Equality on the captured designator, never identity.
        let offset = if &caps["tz"] == "Z" {
            Offset::Utc
        } else {
            let minutes = (field("tz_hour")? * 60 + field("tz_minute")?) as i32;
            if &caps["sign"] == "-" {
                Offset::Minutes(-minutes)
            } else {
                Offset::Minutes(minutes)
            }
        };

        Ok(Self { local, offset })
    }
}

impl fmt::Display for XsDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
            self.local.year(),
            self.local.month(),
            self.local.day(),
            self.local.hour(),
            self.local.minute(),
            self.local.second()
        )?;
        match self.offset {
            Offset::Utc => f.write_str("Z"),
            Offset::Minutes(m) => {
                let sign = if m < 0 { '-' } else { '+' };
                let m = m.unsigned_abs();
                write!(f, "{}{:02}:{:02}", sign, m / 60, m % 60)
            }
        }
    }
}

// Typed extraction used by the accessor methods of bound nodes.

impl TryFrom<Value> for String {
    type Error = BindingError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(s) => Ok(s),
            other => Err(other.type_error("string")),
        }
    }
}

impl TryFrom<Value> for i64 {
    type Error = BindingError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Integer(i) => Ok(i),
            other => Err(other.type_error("integer")),
        }
    }
}

impl TryFrom<Value> for i32 {
    type Error = BindingError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let i = i64::try_from(value)?;
        check_range(i, i32::MIN.into(), i32::MAX.into())?;
        Ok(i as i32)
    }
}

impl TryFrom<Value> for u32 {
    type Error = BindingError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let i = i64::try_from(value)?;
        check_range(i, 0, u32::MAX.into())?;
        Ok(i as u32)
    }
}

impl TryFrom<Value> for bool {
    type Error = BindingError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Boolean(b) => Ok(b),
            other => Err(other.type_error("boolean")),
        }
    }
}

impl TryFrom<Value> for XsDateTime {
    type Error = BindingError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::DateTime(dt) => Ok(dt),
            other => Err(other.type_error("datetime")),
        }
    }
}

impl TryFrom<Value> for AuthMethod {
    type Error = BindingError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::AuthMethod(m) => Ok(m),
            other => Err(other.type_error("authentication method")),
        }
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<XsDateTime> for Value {
    fn from(value: XsDateTime) -> Self {
        Self::DateTime(value)
    }
}

impl From<AuthMethod> for Value {
    fn from(value: AuthMethod) -> Self {
        Self::AuthMethod(value)
    }
}
