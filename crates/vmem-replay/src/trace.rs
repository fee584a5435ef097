//! Translation trace records.
//!
//! A trace is a text file with one request per line:
//!
//! ```text
//! # comment
//! translate <space> <vaddr>
//! pte <space> <vaddr> <level>
//! ```
//!
//! `t` and `p` are accepted as short forms. Numbers may be decimal or `0x`-prefixed hex.

use std::io::BufRead;
use std::num::ParseIntError;
use std::str::FromStr;

use thiserror::Error;
use vmem::{AddressSpaceId, VirtualAddress};

/// A single request replayed against the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceRecord {
    /// Leaf translation of a virtual address.
    Translate {
        space: AddressSpaceId,
        vaddr: VirtualAddress,
    },
    /// Location of the page-table entry read at `level`.
    Pte {
        space: AddressSpaceId,
        vaddr: VirtualAddress,
        level: usize,
    },
}

/// Errors produced while reading a trace.
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("line {line}: unknown request `{request}`")]
    UnknownRequest { line: usize, request: String },
    #[error("line {line}: expected {expected} fields, found {found}")]
    FieldCount {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("line {line}: invalid number `{text}`: {source}")]
    Number {
        line: usize,
        text: String,
        source: ParseIntError,
    },
    #[error("line {line}: level must be at least 1")]
    LevelZero { line: usize },
    #[error("failed to read trace: {0}")]
    Io(#[from] std::io::Error),
}

/// Parses a decimal or `0x`-prefixed hexadecimal number.
pub fn parse_number<T>(text: &str) -> Result<T, ParseIntError>
where
    T: FromStr<Err = ParseIntError> + FromStrRadix,
{
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => T::from_str_radix(&hex.replace('_', ""), 16),
        None => text.replace('_', "").parse::<T>(),
    }
}

/// Integer types that can be parsed in an arbitrary radix.
pub trait FromStrRadix: Sized {
    fn from_str_radix(text: &str, radix: u32) -> Result<Self, ParseIntError>;
}

macro_rules! impl_from_str_radix {
    ($($ty:ty),*) => {
        $(
            impl FromStrRadix for $ty {
                fn from_str_radix(text: &str, radix: u32) -> Result<Self, ParseIntError> {
                    <$ty>::from_str_radix(text, radix)
                }
            }
        )*
    };
}

impl_from_str_radix!(u32, u64, usize);

impl TraceRecord {
    /// Parses one trace line. Returns `Ok(None)` for blank lines and comments.
    pub fn parse_line(line_number: usize, line: &str) -> Result<Option<Self>, TraceError> {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            return Ok(None);
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        let number = |index: usize| -> Result<u64, TraceError> {
            parse_number::<u64>(fields[index]).map_err(|source| TraceError::Number {
                line: line_number,
                text: fields[index].to_string(),
                source,
            })
        };
        let space = |index: usize| -> Result<AddressSpaceId, TraceError> {
            parse_number::<u32>(fields[index])
                .map(AddressSpaceId::new)
                .map_err(|source| TraceError::Number {
                    line: line_number,
                    text: fields[index].to_string(),
                    source,
                })
        };
        let expect_fields = |expected: usize| {
            if fields.len() == expected {
                Ok(())
            } else {
                Err(TraceError::FieldCount {
                    line: line_number,
                    expected,
                    found: fields.len(),
                })
            }
        };

        match fields[0] {
            "translate" | "t" => {
                expect_fields(3)?;
                Ok(Some(Self::Translate {
                    space: space(1)?,
                    vaddr: VirtualAddress::new(number(2)?),
                }))
            }
            "pte" | "p" => {
                expect_fields(4)?;
                let level = parse_number::<usize>(fields[3]).map_err(|source| {
                    TraceError::Number {
                        line: line_number,
                        text: fields[3].to_string(),
                        source,
                    }
                })?;
                if level == 0 {
                    return Err(TraceError::LevelZero { line: line_number });
                }
                Ok(Some(Self::Pte {
                    space: space(1)?,
                    vaddr: VirtualAddress::new(number(2)?),
                    level,
                }))
            }
            other => Err(TraceError::UnknownRequest {
                line: line_number,
                request: other.to_string(),
            }),
        }
    }
}

/// Reads every record from `reader`, stopping at the first malformed line.
pub fn read_trace(reader: impl BufRead) -> Result<Vec<TraceRecord>, TraceError> {
    let mut records = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        if let Some(record) = TraceRecord::parse_line(index + 1, &line?)? {
            records.push(record);
        }
    }
    Ok(records)
}
