//! Runtime values passed to and returned from exported functions.

use std::fmt;

use anyhow::{bail, Context, Result};
use wasmparser::ValType;

/// A Wasm number value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
}

/// The four numeric value types an instance can pass around.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    I32,
    I64,
    F32,
    F64,
}

impl ValueType {
    /// Map a `wasmparser` type, rejecting vector and reference types.
    pub fn from_wasmparser(ty: ValType) -> Result<Self> {
        Ok(match ty {
            ValType::I32 => ValueType::I32,
            ValType::I64 => ValueType::I64,
            ValType::F32 => ValueType::F32,
            ValType::F64 => ValueType::F64,
            other => bail!("unsupported value type {other:?}"),
        })
    }

    /// Zero value used to initialize locals.
    pub fn zero(self) -> Value {
        match self {
            ValueType::I32 => Value::I32(0),
            ValueType::I64 => Value::I64(0),
            ValueType::F32 => Value::F32(0.0),
            ValueType::F64 => Value::F64(0.0),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValueType::I32 => "i32",
            ValueType::I64 => "i64",
            ValueType::F32 => "f32",
            ValueType::F64 => "f64",
        })
    }
}

impl Value {
    pub fn ty(&self) -> ValueType {
        match self {
            Value::I32(_) => ValueType::I32,
            Value::I64(_) => ValueType::I64,
            Value::F32(_) => ValueType::F32,
            Value::F64(_) => ValueType::F64,
        }
    }

    /// Parse a command-line argument as a value of type `ty`.
    ///
    /// Integers accept decimal or `0x`-prefixed hex. Values that fit the
    /// unsigned range of the type are reinterpreted (so `4294967295` is a
    /// valid `i32` meaning `-1`).
    pub fn parse(text: &str, ty: ValueType) -> Result<Self> {
        let ctx = || format!("invalid {ty} argument {text:?}");
        Ok(match ty {
            ValueType::I32 => Value::I32(parse_int(text).with_context(ctx)? as i32),
            ValueType::I64 => Value::I64(parse_int(text).with_context(ctx)? as i64),
            ValueType::F32 => Value::F32(text.parse().with_context(ctx)?),
            ValueType::F64 => Value::F64(text.parse().with_context(ctx)?),
        })
    }
}

fn parse_int(text: &str) -> Result<i128> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let magnitude = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => i128::from_str_radix(hex, 16)?,
        None => digits.parse::<i128>()?,
    };
    let value = if negative { -magnitude } else { magnitude };
    if value < i128::from(i64::MIN) || value > i128::from(u64::MAX) {
        bail!("integer out of 64-bit range");
    }
    Ok(value)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::I32(v) => write!(f, "{v}"),
            Value::I64(v) => write!(f, "{v}"),
            Value::F32(v) => write!(f, "{v}"),
            Value::F64(v) => write!(f, "{v}"),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::I32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::F32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}
