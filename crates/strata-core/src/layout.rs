//! Textual field layouts.
//!
//! A layout is a comma-separated list of field kinds read in order, for
//! example `u32,str,u32s,skip:4,raw:8`. It lets tools dump records without
//! compiling a schema.
//!
//! | Token     | Read                                          |
//! |-----------|-----------------------------------------------|
//! | `u8`      | one byte                                      |
//! | `u32`     | unsigned 32-bit in the deserializer encoding  |
//! | `i32`     | signed 32-bit, native order                   |
//! | `u64`     | unsigned 64-bit, big-endian                   |
//! | `f64`     | float, native order                           |
//! | `str`     | `\0`-terminated string                        |
//! | `strs`    | counted list of strings                       |
//! | `cstrs`   | counted list of raw byte strings              |
//! | `u32s`    | counted list of `u32`                         |
//! | `skip:N`  | skip `N` bytes                                |
//! | `raw:N`   | `N` raw bytes                                 |
//! | `until:C` | bytes up to the delimiter `C`                 |

use crate::deserializer::Deserializer;
use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// One field kind of a layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// One byte
    U8,
    /// Unsigned 32-bit value
    U32,
    /// Signed 32-bit value
    I32,
    /// Unsigned 64-bit value
    U64,
    /// 64-bit float
    F64,
    /// Terminated string
    Str,
    /// Counted string list
    Strs,
    /// Counted raw byte string list
    CStrs,
    /// Counted `u32` list
    U32s,
    /// Skipped bytes
    Skip(usize),
    /// Raw bytes
    Raw(usize),
    /// Bytes up to a delimiter
    Until(u8),
}

impl Field {
    /// Reads this field from `de`
    pub fn read(self, de: &mut Deserializer<'_>) -> Result<Value> {
        Ok(match self {
            Field::U8 => Value::U8(de.read_u8()?),
            Field::U32 => Value::U32(de.read_u32()?),
            Field::I32 => Value::I32(de.read_i32()?),
            Field::U64 => Value::U64(de.read_u64()?),
            Field::F64 => Value::F64(de.read_f64()?),
            Field::Str => Value::Str(de.read_string()?),
            Field::Strs => Value::Strs(de.read_string_vec()?),
            Field::CStrs => Value::CStrs(de.read_cstring_vec()?),
            Field::U32s => Value::U32s(de.read_u32_vec()?),
            Field::Skip(n) => {
                de.seek_forward(n)?;
                Value::Skipped(n)
            }
            Field::Raw(n) => Value::Raw(de.read_bytes(n)?),
            Field::Until(delimiter) => {
                let mut bytes = Vec::new();
                let found = de.read_to(&mut bytes, delimiter)?;
                Value::Until { bytes, found }
            }
        })
    }
}

impl FromStr for Field {
    type Err = Error;

    fn from_str(token: &str) -> Result<Self> {
        let token = token.trim();
        if let Some((kind, arg)) = token.split_once(':') {
            return match kind {
                "skip" => Ok(Field::Skip(parse_count(arg)?)),
                "raw" => Ok(Field::Raw(parse_count(arg)?)),
                "until" => Ok(Field::Until(parse_delimiter(arg)?)),
                _ => Err(Error::invalid_layout(format!("unknown field '{}'", token))),
            };
        }
        match token {
            "u8" => Ok(Field::U8),
            "u32" => Ok(Field::U32),
            "i32" => Ok(Field::I32),
            "u64" => Ok(Field::U64),
            "f64" => Ok(Field::F64),
            "str" => Ok(Field::Str),
            "strs" => Ok(Field::Strs),
            "cstrs" => Ok(Field::CStrs),
            "u32s" => Ok(Field::U32s),
            "" => Err(Error::invalid_layout("empty field")),
            _ => Err(Error::invalid_layout(format!("unknown field '{}'", token))),
        }
    }
}

fn parse_count(arg: &str) -> Result<usize> {
    arg.trim()
        .parse()
        .map_err(|_| Error::invalid_layout(format!("invalid byte count '{}'", arg)))
}

/// Parses a delimiter given as a single character, an escape (`\0`, `\n`,
/// `\t`), or a hex byte (`0x7c`)
pub fn parse_delimiter(arg: &str) -> Result<u8> {
    let arg = arg.trim();
    match arg {
        "\\0" => return Ok(0),
        "\\n" => return Ok(b'\n'),
        "\\t" => return Ok(b'\t'),
        _ => {}
    }
    if let Some(hex) = arg.strip_prefix("0x") {
        return u8::from_str_radix(hex, 16)
            .map_err(|_| Error::invalid_layout(format!("invalid delimiter '{}'", arg)));
    }
    match arg.as_bytes() {
        [byte] => Ok(*byte),
        _ => Err(Error::invalid_layout(format!("invalid delimiter '{}'", arg))),
    }
}

/// An ordered list of fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    fields: Vec<Field>,
}

impl Layout {
    /// Creates a layout from fields
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// The fields in read order
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Reads every field in order, stopping at the first failure
    pub fn read(&self, de: &mut Deserializer<'_>) -> Result<Vec<Value>> {
        self.fields.iter().map(|field| field.read(de)).collect()
    }
}

impl FromStr for Layout {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let fields = s
            .split(',')
            .map(Field::from_str)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { fields })
    }
}

/// A decoded field value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// One byte
    U8(u8),
    /// Unsigned 32-bit value
    U32(u32),
    /// Signed 32-bit value
    I32(i32),
    /// Unsigned 64-bit value
    U64(u64),
    /// 64-bit float
    F64(f64),
    /// Terminated string
    Str(String),
    /// String list
    Strs(Vec<String>),
    /// Raw byte string list
    CStrs(Vec<Vec<u8>>),
    /// `u32` list
    U32s(Vec<u32>),
    /// Number of bytes skipped
    Skipped(usize),
    /// Raw bytes
    Raw(Vec<u8>),
    /// Bytes before a delimiter, and whether the delimiter was found
    Until {
        /// Bytes read
        bytes: Vec<u8>,
        /// Whether the delimiter was consumed
        found: bool,
    },
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::U8(v) => write!(f, "{}", v),
            Value::U32(v) => write!(f, "{}", v),
            Value::I32(v) => write!(f, "{}", v),
            Value::U64(v) => write!(f, "{}", v),
            Value::F64(v) => write!(f, "{}", v),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Strs(list) => write!(f, "{:?}", list),
            Value::CStrs(list) => f
                .debug_list()
                .entries(list.iter().map(|bytes| String::from_utf8_lossy(bytes)))
                .finish(),
            Value::U32s(list) => write!(f, "{:?}", list),
            Value::Skipped(n) => write!(f, "<skipped {} bytes>", n),
            Value::Raw(bytes) => {
                for byte in bytes {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
            Value::Until { bytes, found } => {
                write!(f, "{:?}", String::from_utf8_lossy(bytes))?;
                if !found {
                    write!(f, " <unterminated>")?;
                }
                Ok(())
            }
        }
    }
}
