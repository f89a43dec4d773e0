//! Expression walking.
//!
//! [`read_expression`] scans one expression: it consumes opcodes and their
//! immediates while tracking block nesting depth, and stops after the `end`
//! that closes the outermost level. The scan is purely structural; operand
//! values are decoded only far enough to know how many bytes they occupy.

use log::trace;

use crate::parser::encoding;
use crate::parser::error::{DecodeError, ErrorKind};
use crate::parser::module::FuncCode;
use crate::parser::reader::Reader;

use super::*;

/// Reads one expression, returning its bytes including the terminating `end`.
///
/// Depth starts at zero; `block`/`loop`/`if` raise it, `end` lowers it, and
/// the expression is complete when depth would go below zero.
pub fn read_expression<'a>(reader: &mut Reader<'a>) -> Result<&'a [u8], DecodeError> {
    let start = reader.pos();
    let mut depth = 0i64;

    while !reader.is_empty() {
        let at = reader.pos();
        let op = reader.read_byte()?;

        match op {
            UNREACHABLE | NOP | ELSE | RETURN => {}
            BLOCK | LOOP | IF => {
                read_block_type(reader)?;
                depth += 1;
            }
            END => depth -= 1,
            BR | BR_IF | CALL => {
                reader.read_vs64()?;
            }
            BR_TABLE => {
                let labels = reader.read_vu64()?;
                for _ in 0..labels + 1 {
                    reader.read_vu64()?;
                }
            }
            CALL_INDIRECT => {
                reader.read_vs64()?;
                reader.read_byte()?;
            }
            DROP | SELECT => {}
            LOCAL_GET..=GLOBAL_SET => {
                reader.read_vs64()?;
            }
            I32_LOAD..=I64_STORE32 => {
                reader.read_vs64()?;
                reader.read_vs64()?;
            }
            MEMORY_SIZE | MEMORY_GROW => {
                // reserved immediate byte, not validated
                reader.read_byte()?;
            }
            I32_CONST | I64_CONST => {
                reader.read_vs64()?;
            }
            F32_CONST => {
                reader.read_bytes(4)?;
            }
            F64_CONST => {
                reader.read_bytes(8)?;
            }
            I32_EQZ..=F64_COPYSIGN => {}
            FC_EXT => {
                let inner = reader.read_byte()?;
                match inner {
                    FC_MEMORY_COPY | FC_MEMORY_FILL => {}
                    _ => {
                        return Err(DecodeError::new(
                            ErrorKind::UnsupportedOpcode {
                                op: FC_EXT,
                                args: vec![inner],
                            },
                            at,
                        ))
                    }
                }
            }
            _ => {
                return Err(DecodeError::new(
                    ErrorKind::UnsupportedOpcode { op, args: vec![] },
                    at,
                ))
            }
        }

        trace!(
            "{at:#08x}: {} [{}]",
            mnemonic(op).unwrap_or("?"),
            hex::encode(reader.bytes_from(at))
        );

        if depth < 0 {
            return Ok(reader.bytes_from(start));
        }
    }

    Err(DecodeError::new(ErrorKind::UnexpectedEof, reader.pos()))
}

/// Reads one expression starting at `offset`, returning its bytes and the
/// post-expression cursor position.
pub fn parse_expression(bytes: &[u8], offset: usize) -> Result<(&[u8], usize), DecodeError> {
    let mut reader = Reader::at(bytes, offset);
    let expr = read_expression(&mut reader)?;
    Ok((expr, reader.pos()))
}

/// Parses a code entry: run-length locals groups followed by the expression.
pub fn parse_function(bytes: &[u8]) -> Result<FuncCode, DecodeError> {
    let mut func = FuncCode::default();
    parse_function_into(bytes, &mut func)?;
    Ok(func)
}

/// [`parse_function`] into a reused buffer; the locals and expression vectors
/// are truncated and refilled.
pub fn parse_function_into(bytes: &[u8], func: &mut FuncCode) -> Result<(), DecodeError> {
    let mut reader = Reader::new(bytes);

    let groups = reader.read_vu64()?;

    func.locals.clear();
    for _ in 0..groups {
        let count = reader.read_vu64()?;
        let tp = reader.read_byte()?;
        for _ in 0..count {
            func.locals.push(tp);
        }
    }

    let expr = read_expression(&mut reader)?;
    func.expr.clear();
    func.expr.extend_from_slice(expr);

    if !reader.is_empty() {
        return Err(DecodeError::new(ErrorKind::SizeMismatch, reader.pos()));
    }

    Ok(())
}

/// Consumes a blocktype immediate: a single `0x40` (empty) or value-type
/// byte, otherwise a signed LEB type index.
fn read_block_type(reader: &mut Reader) -> Result<(), DecodeError> {
    let at = reader.pos();
    let byte = reader.read_byte()?;

    if byte == encoding::BLOCK_TYPE_EMPTY || encoding::is_val_type(byte) {
        return Ok(());
    }

    reader.skip_to(at);
    reader.read_vs64()?;
    Ok(())
}
