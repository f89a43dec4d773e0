//! Binary decoding primitives for WebAssembly values.
//!
//! [`Reader`] is a cursor over a fully materialised input buffer. Every read
//! either returns the decoded value with the cursor advanced past it, or a
//! [`DecodeError`] stamped with the offset at which the problem was detected
//! and with the cursor left where it was safe to observe.
//!
//! Names, result types, and section payloads are handed out as subslices of
//! the input; callers that keep them copy them into owned storage.

use byteorder::{ByteOrder, LittleEndian};

use crate::parser::encoding::{FUNC_TYPE_HEADER, LIMIT_LO, LIMIT_LO_HI};
use crate::parser::error::{DecodeError, ErrorKind};
use crate::parser::module::{FuncType, Limits, Table};

pub struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(bytes: &'a [u8]) -> Reader<'a> {
        Reader { bytes, pos: 0 }
    }

    /// A cursor starting at `pos` instead of the beginning of the buffer.
    pub fn at(bytes: &'a [u8], pos: usize) -> Reader<'a> {
        Reader { bytes, pos }
    }

    // Basic operations --------------------------------------------------------

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    /// The input between `start` and the current cursor position.
    pub fn bytes_from(&self, start: usize) -> &'a [u8] {
        &self.bytes[start..self.pos]
    }

    /// Moves the cursor to an absolute position.
    pub fn skip_to(&mut self, pos: usize) {
        self.pos = pos;
    }

    pub fn read_byte(&mut self) -> Result<u8, DecodeError> {
        if self.pos >= self.bytes.len() {
            return Err(DecodeError::new(ErrorKind::UnexpectedEof, self.pos));
        }

        let byte = self.bytes[self.pos];
        self.pos += 1;
        Ok(byte)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if len > self.remaining() {
            return Err(DecodeError::new(ErrorKind::UnexpectedEof, self.pos));
        }

        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    /// Guards a decoded vector length against the remaining input: every
    /// entry occupies at least one byte, so a larger count cannot be honest.
    pub fn validate_item_count(&self, count: u64) -> Result<(), DecodeError> {
        if count > self.remaining() as u64 {
            return Err(DecodeError::new(ErrorKind::UnexpectedEof, self.pos));
        }
        Ok(())
    }

    // Read and interpret values -----------------------------------------------

    /// A 32-bit little-endian integer (the header version field).
    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        let bytes = self.read_bytes(4)?;
        Ok(LittleEndian::read_u32(bytes))
    }

    /// An unsigned LEB128 integer of up to ten 7-bit groups.
    pub fn read_vu64(&mut self) -> Result<u64, DecodeError> {
        let start = self.pos;
        let mut value = 0u64;
        let mut shift = 0u32;

        loop {
            if shift > 63 {
                return Err(DecodeError::new(ErrorKind::Overflow, start));
            }

            let byte = self.read_byte()?;
            value |= u64::from(byte & 0x7f) << shift;
            shift += 7;

            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
    }

    /// A signed LEB128 integer, sign-extended from the final group width.
    pub fn read_vs64(&mut self) -> Result<i64, DecodeError> {
        let start = self.pos;
        let mut value = 0i64;
        let mut shift = 0u32;

        loop {
            if shift > 63 {
                return Err(DecodeError::new(ErrorKind::Overflow, start));
            }

            let byte = self.read_byte()?;
            value |= i64::from(byte & 0x7f) << shift;
            shift += 7;

            if byte & 0x80 == 0 {
                if shift < 64 {
                    value = value << (64 - shift) >> (64 - shift);
                }
                return Ok(value);
            }
        }
    }

    /// An eight-byte little-endian IEEE 754 double.
    pub fn read_f64(&mut self) -> Result<f64, DecodeError> {
        let bytes = self.read_bytes(8)?;
        Ok(LittleEndian::read_f64(bytes))
    }

    /// A length-prefixed byte run. The bytes are not validated as UTF-8.
    pub fn read_name(&mut self) -> Result<&'a [u8], DecodeError> {
        let len = self.read_vu64()? as usize;
        self.read_bytes(len)
    }

    // Composite type shapes ---------------------------------------------------

    /// One value-type tag byte, stored verbatim.
    pub fn read_val_type(&mut self) -> Result<u8, DecodeError> {
        self.read_byte()
    }

    /// A length-prefixed vector of value-type tag bytes.
    pub fn read_result_type(&mut self) -> Result<&'a [u8], DecodeError> {
        let len = self.read_vu64()? as usize;
        self.read_bytes(len)
    }

    /// A function type: `0x60 vec(valtype) vec(valtype)`.
    pub fn read_func_type(&mut self) -> Result<FuncType, DecodeError> {
        let at = self.pos;
        let header = self.read_byte()?;
        if header != FUNC_TYPE_HEADER {
            self.pos = at;
            return Err(DecodeError::new(ErrorKind::FuncTypeHeader(header), at));
        }

        let params = self.read_result_type()?.to_vec();
        let results = self.read_result_type()?.to_vec();

        Ok(FuncType { params, results })
    }

    /// Limits: flag 0x00 gives `hi = -1`, flag 0x01 carries both bounds.
    pub fn read_limits(&mut self) -> Result<Limits, DecodeError> {
        let at = self.pos;
        let flag = self.read_byte()?;

        match flag {
            LIMIT_LO => {
                let lo = self.read_vu64()? as i64;
                Ok(Limits { lo, hi: -1 })
            }
            LIMIT_LO_HI => {
                let lo = self.read_vu64()? as i64;
                let hi = self.read_vu64()? as i64;
                Ok(Limits { lo, hi })
            }
            _ => {
                self.pos = at;
                Err(DecodeError::new(ErrorKind::LimitsFlag(flag), at))
            }
        }
    }

    /// A table type: element reference type then limits.
    pub fn read_table_type(&mut self) -> Result<Table, DecodeError> {
        let ty = self.read_val_type()?;
        let limits = self.read_limits()?;
        Ok(Table { ty, limits })
    }

    /// A global type: value type then mutability byte.
    pub fn read_global_type(&mut self) -> Result<(u8, u8), DecodeError> {
        let ty = self.read_byte()?;
        let mutable = self.read_byte()?;
        Ok((ty, mutable))
    }

    /// A section envelope; returns the id and the payload slice with the
    /// cursor advanced past the payload.
    pub fn read_section(&mut self) -> Result<(u8, &'a [u8]), DecodeError> {
        let id = self.read_byte()?;
        let size = self.read_vu64()? as usize;
        let data = self.read_bytes(size)?;
        Ok((id, data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::encoding::{F32, I32, I64};

    #[test]
    fn test_read_vu64() {
        let read = |v: &[u8]| Reader::new(v).read_vu64().expect("failed to read vu64");

        assert_eq!(read(&[0]), 0);
        assert_eq!(read(&[1]), 1);
        assert_eq!(read(&[0x7f]), 127);
        assert_eq!(read(&[0x80, 0x01]), 128);
        assert_eq!(read(&[0xe5, 0x8e, 0x26]), 624485);
        assert_eq!(read(&[0xff, 0xff, 0xff, 0xff, 0xf]), 0xffffffff);
    }

    #[test]
    fn test_read_vu64_truncated() {
        let err = Reader::new(&[0x80, 0x80]).read_vu64().unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_read_vu64_overflow() {
        // ten groups land exactly on 64 bits; an eleventh overflows
        let bytes = [0x80u8; 11];
        let err = Reader::new(&bytes).read_vu64().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Overflow);
        assert_eq!(err.offset, 0);
    }

    #[test]
    fn test_read_vs64() {
        let read = |v: &[u8]| Reader::new(v).read_vs64().expect("failed to read vs64");

        assert_eq!(read(&[0]), 0);
        assert_eq!(read(&[1]), 1);
        assert_eq!(read(&[0x7f]), -1);
        assert_eq!(read(&[0x80, 0x7f]), -128);
        assert_eq!(read(&[0xe5, 0x8e, 0x26]), 624485);
        assert_eq!(read(&[0xc0, 0xbb, 0x78]), -123456);
        assert_eq!(read(&[0x9b, 0xf1, 0x59]), -624485);
        assert_eq!(
            read(&[128, 128, 128, 128, 128, 128, 128, 128, 128, 127]),
            i64::MIN
        );
    }

    #[test]
    fn test_read_f64() {
        let mut reader = Reader::new(&[24, 45, 68, 84, 251, 33, 25, 64]);
        assert_eq!(reader.read_f64().unwrap(), std::f64::consts::TAU);
        assert_eq!(reader.pos(), 8);

        let err = Reader::new(&[0; 7]).read_f64().unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_read_name() {
        let mut reader = Reader::new(&[4, b'1', b'q', b'a', b'z']);
        assert_eq!(reader.read_name().unwrap(), b"1qaz");

        let mut buf = vec![];
        crate::parser::encoding::write_name(&mut buf, "Hello, 世界".as_bytes());
        let mut reader = Reader::new(&buf);
        assert_eq!(reader.read_name().unwrap(), "Hello, 世界".as_bytes());
        assert_eq!(reader.pos(), buf.len());
    }

    #[test]
    fn test_read_name_truncated() {
        // declares five bytes, carries one
        let err = Reader::new(&[5, b'x']).read_name().unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_read_result_type() {
        let mut reader = Reader::new(&[2, I32, I64]);
        assert_eq!(reader.read_result_type().unwrap(), &[I32, I64]);
    }

    #[test]
    fn test_read_func_type() {
        let mut reader = Reader::new(&[0x60, 2, I32, I64, 1, F32]);
        let fn_type = reader.read_func_type().unwrap();
        assert_eq!(fn_type.params, vec![I32, I64]);
        assert_eq!(fn_type.results, vec![F32]);
        assert_eq!(reader.pos(), 6);
    }

    #[test]
    fn test_read_func_type_bad_header() {
        let mut reader = Reader::new(&[0x61, 0, 0]);
        let err = reader.read_func_type().unwrap_err();
        assert_eq!(err.kind, ErrorKind::FuncTypeHeader(0x61));
        assert_eq!(reader.pos(), 0);
    }

    #[test]
    fn test_read_limits() {
        let mut reader = Reader::new(&[0x00, 5]);
        assert_eq!(reader.read_limits().unwrap(), Limits { lo: 5, hi: -1 });

        let mut reader = Reader::new(&[0x01, 0, 4]);
        assert_eq!(reader.read_limits().unwrap(), Limits { lo: 0, hi: 4 });
    }

    #[test]
    fn test_read_limits_bad_flag() {
        let mut reader = Reader::new(&[0x02, 0, 4]);
        let err = reader.read_limits().unwrap_err();
        assert_eq!(err.kind, ErrorKind::LimitsFlag(0x02));
        assert_eq!(err.offset, 0);
    }

    #[test]
    fn test_read_table_type() {
        let mut reader = Reader::new(&[0x70, 0x01, 1, 4]);
        let table = reader.read_table_type().unwrap();
        assert_eq!(table.ty, 0x70);
        assert_eq!(table.limits, Limits { lo: 1, hi: 4 });
    }

    #[test]
    fn test_read_global_type() {
        let mut reader = Reader::new(&[I64, 1]);
        assert_eq!(reader.read_global_type().unwrap(), (I64, 1));
    }

    #[test]
    fn test_read_section() {
        let mut reader = Reader::new(&[1, 3, 0xaa, 0xbb, 0xcc, 9]);
        let (id, data) = reader.read_section().unwrap();
        assert_eq!(id, 1);
        assert_eq!(data, &[0xaa, 0xbb, 0xcc]);
        assert_eq!(reader.pos(), 5);
    }

    #[test]
    fn test_read_section_truncated_payload() {
        let mut reader = Reader::new(&[1, 3, 0xaa]);
        let err = reader.read_section().unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_read_u32() {
        let mut reader = Reader::new(&[1, 0, 0, 0]);
        assert_eq!(reader.read_u32().unwrap(), 1);
    }
}
