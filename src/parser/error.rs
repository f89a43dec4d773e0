//! Decode error types.
//!
//! Every decode operation returns a [`DecodeError`] carrying the error kind
//! and the absolute input offset at which it was detected. The section
//! dispatcher additionally stamps the section id and entry index so a
//! failure deep inside a vector still names the entry that caused it.

use std::fmt;

use thiserror::Error;

/// What went wrong, independent of where.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ErrorKind {
    #[error("magic mismatch")]
    MagicMismatch,
    #[error("unsupported binary format version {0}")]
    UnsupportedVersion(u32),
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("integer overflow")]
    Overflow,
    #[error("size mismatch")]
    SizeMismatch,
    #[error("unsupported section id {0:#04x}")]
    UnsupportedSection(u8),
    #[error("unsupported import description type {0:#04x}")]
    UnsupportedImportDesc(u8),
    #[error("unsupported element kind {0:#04x}")]
    UnsupportedElemKind(u8),
    #[error("unsupported data kind {0:#04x}")]
    UnsupportedDataKind(u8),
    #[error("invalid limits flag {0:#04x}")]
    LimitsFlag(u8),
    #[error("expected function type header 0x60, got {0:#04x}")]
    FuncTypeHeader(u8),
    #[error("unsupported opcode {op:#04x} {args:02x?}")]
    UnsupportedOpcode { op: u8, args: Vec<u8> },
}

/// A decode failure annotated with its location in the input.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeError {
    pub kind: ErrorKind,
    /// Absolute byte offset at which the error was detected.
    pub offset: usize,
    /// Section id, when the failure happened inside a section body.
    pub section: Option<u8>,
    /// Entry index within the section's vector, when meaningful.
    pub item: Option<usize>,
}

impl DecodeError {
    pub fn new(kind: ErrorKind, offset: usize) -> DecodeError {
        DecodeError {
            kind,
            offset,
            section: None,
            item: None,
        }
    }

    /// Stamps the section id, keeping an id set by an inner layer.
    pub fn in_section(mut self, id: u8) -> DecodeError {
        self.section.get_or_insert(id);
        self
    }

    /// Stamps the entry index, keeping an index set by an inner layer.
    pub fn at_item(mut self, n: usize) -> DecodeError {
        self.item.get_or_insert(n);
        self
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(id) = self.section {
            write!(f, "{} section", section_name(id))?;
            if let Some(n) = self.item {
                write!(f, ", entry {n}")?;
            }
            write!(f, ": ")?;
        }
        write!(f, "{} at offset {:#x}", self.kind, self.offset)
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

/// Human name for a section id, for error and dump output.
pub fn section_name(id: u8) -> &'static str {
    match id {
        0 => "custom",
        1 => "type",
        2 => "import",
        3 => "function",
        4 => "table",
        5 => "memory",
        6 => "global",
        7 => "export",
        8 => "start",
        9 => "element",
        10 => "code",
        11 => "data",
        12 => "data count",
        _ => "unknown",
    }
}
