//! Binary encoding primitives for WebAssembly values.
//!
//! Provides LEB128 integer encoding, IEEE 754 float encoding, and the small
//! composite shapes (names, result types, limits, type descriptors, section
//! envelopes) as specified by the WebAssembly binary format.
//!
//! All functions write directly into a caller-provided `&mut Vec<u8>` buffer
//! and produce the minimal encoding for every integer value.

use byteorder::{ByteOrder, LittleEndian};

// ---------------------------------------------------------------------------
// WebAssembly binary format constants (spec section 5)
// ---------------------------------------------------------------------------

/// First four bytes of every module: `\0asm`.
pub const MAGIC: [u8; 4] = [0x00, 0x61, 0x73, 0x6d];

/// Highest binary format version this crate accepts.
pub const MAX_SUPPORTED_VERSION: u32 = 1;

// Section IDs (§5.5.2)
pub const SECTION_CUSTOM: u8 = 0;
pub const SECTION_TYPE: u8 = 1;
pub const SECTION_IMPORT: u8 = 2;
pub const SECTION_FUNCTION: u8 = 3;
pub const SECTION_TABLE: u8 = 4;
pub const SECTION_MEMORY: u8 = 5;
pub const SECTION_GLOBAL: u8 = 6;
pub const SECTION_EXPORT: u8 = 7;
pub const SECTION_START: u8 = 8;
pub const SECTION_ELEMENT: u8 = 9;
pub const SECTION_CODE: u8 = 10;
pub const SECTION_DATA: u8 = 11;
pub const SECTION_DATA_COUNT: u8 = 12;

// Value type tags (§5.3.1), stored verbatim in decoded records
pub const I32: u8 = 0x7f;
pub const I64: u8 = 0x7e;
pub const F32: u8 = 0x7d;
pub const F64: u8 = 0x7c;
pub const V128: u8 = 0x7b;
pub const FUNCREF: u8 = 0x70;
pub const EXTERNREF: u8 = 0x6f;

// Type constructors (§5.3.6)
pub const FUNC_TYPE_HEADER: u8 = 0x60;

// Limits flags (§5.3.7)
pub const LIMIT_LO: u8 = 0x00;
pub const LIMIT_LO_HI: u8 = 0x01;

// Import/export descriptor kinds (§5.5.5, §5.5.10)
pub const DESC_FUNC: u8 = 0x00;
pub const DESC_TABLE: u8 = 0x01;
pub const DESC_MEMORY: u8 = 0x02;
pub const DESC_GLOBAL: u8 = 0x03;

// Block type: empty (§5.4.1)
pub const BLOCK_TYPE_EMPTY: u8 = 0x40;

/// True for the seven single-byte value-type tags.
pub fn is_val_type(byte: u8) -> bool {
    matches!(byte, I32 | I64 | F32 | F64 | V128 | FUNCREF | EXTERNREF)
}

// ---------------------------------------------------------------------------
// LEB128
// ---------------------------------------------------------------------------

/// Appends the unsigned LEB128 encoding of a u64 value to `buf`.
pub fn write_vu64(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            buf.push(byte);
            break;
        }
        byte |= 0x80;
        buf.push(byte);
    }
}

/// Appends the signed LEB128 encoding of an i64 value to `buf`.
pub fn write_vs64(buf: &mut Vec<u8>, mut value: i64) {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if (value == 0 && (byte & 0x40) == 0) || (value == -1 && (byte & 0x40) != 0) {
            buf.push(byte);
            break;
        }
        byte |= 0x80;
        buf.push(byte);
    }
}

// ---------------------------------------------------------------------------
// Fixed-width values
// ---------------------------------------------------------------------------

/// Appends a 32-bit little-endian integer (the header version field).
pub fn write_u32(buf: &mut Vec<u8>, v: u32) {
    let mut bytes = [0u8; 4];
    LittleEndian::write_u32(&mut bytes, v);
    buf.extend_from_slice(&bytes);
}

/// Appends the little-endian IEEE 754 encoding of an f64 value to `buf`.
pub fn write_f64(buf: &mut Vec<u8>, v: f64) {
    let mut bytes = [0u8; 8];
    LittleEndian::write_f64(&mut bytes, v);
    buf.extend_from_slice(&bytes);
}

// ---------------------------------------------------------------------------
// Composite shapes
// ---------------------------------------------------------------------------

/// Appends a length-prefixed byte run (a name, or any `vec(byte)`).
pub fn write_name(buf: &mut Vec<u8>, v: &[u8]) {
    write_vu64(buf, v.len() as u64);
    buf.extend_from_slice(v);
}

/// Appends a single value-type tag byte.
pub fn write_val_type(buf: &mut Vec<u8>, tp: u8) {
    buf.push(tp);
}

/// Appends a length-prefixed vector of value-type tags.
pub fn write_result_type(buf: &mut Vec<u8>, types: &[u8]) {
    write_vu64(buf, types.len() as u64);
    buf.extend_from_slice(types);
}

/// Appends a function type: `0x60 vec(valtype) vec(valtype)`.
pub fn write_func_type(buf: &mut Vec<u8>, params: &[u8], results: &[u8]) {
    buf.push(FUNC_TYPE_HEADER);
    write_result_type(buf, params);
    write_result_type(buf, results);
}

/// Appends limits; `hi < 0` selects the lower-bound-only form.
pub fn write_limits(buf: &mut Vec<u8>, lo: i64, hi: i64) {
    if hi < 0 {
        buf.push(LIMIT_LO);
        write_vu64(buf, lo as u64);
        return;
    }

    buf.push(LIMIT_LO_HI);
    write_vu64(buf, lo as u64);
    write_vu64(buf, hi as u64);
}

/// Appends a table type: element reference type then limits.
pub fn write_table_type(buf: &mut Vec<u8>, tp: u8, lo: i64, hi: i64) {
    buf.push(tp);
    write_limits(buf, lo, hi);
}

/// Appends a global type: value type then mutability byte.
pub fn write_global_type(buf: &mut Vec<u8>, tp: u8, mutable: u8) {
    buf.push(tp);
    buf.push(mutable);
}

/// Appends a section envelope: id, payload length, payload.
pub fn write_section(buf: &mut Vec<u8>, id: u8, data: &[u8]) {
    buf.push(id);
    write_vu64(buf, data.len() as u64);
    buf.extend_from_slice(data);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::reader::Reader;

    fn encode_vu64(v: u64) -> Vec<u8> {
        let mut buf = Vec::new();
        write_vu64(&mut buf, v);
        buf
    }

    fn encode_vs64(v: i64) -> Vec<u8> {
        let mut buf = Vec::new();
        write_vs64(&mut buf, v);
        buf
    }

    // -- Unsigned LEB128 --

    #[test]
    fn test_write_vu64() {
        assert_eq!(encode_vu64(0), vec![0]);
        assert_eq!(encode_vu64(1), vec![1]);
        assert_eq!(encode_vu64(127), vec![0x7f]);
        assert_eq!(encode_vu64(128), vec![0x80, 0x01]);
        assert_eq!(encode_vu64(624485), vec![0xe5, 0x8e, 0x26]);
        assert_eq!(encode_vu64(0xffffffff), vec![0xff, 0xff, 0xff, 0xff, 0xf]);
        assert_eq!(encode_vu64(0x80000000), vec![128, 128, 128, 128, 8]);
    }

    #[test]
    fn test_rt_vu64() {
        let mut test_values = vec![0, 1, 5, 100, 127, 128, 512, 624485, 123_456_789, u64::MAX];

        for i in 0..63 {
            let value = 1u64 << i;
            test_values.push(value);
            test_values.push(value + 1);
            test_values.push(value - 1);
        }

        use rand::Rng;
        let mut rng = rand::rng();
        for _ in 0..100 {
            test_values.push(rng.random::<u64>());
        }

        for &expected in &test_values {
            let bytes = encode_vu64(expected);
            let mut reader = Reader::new(&bytes);
            let actual = reader.read_vu64().expect("failed to read vu64");
            assert_eq!(actual, expected);
            assert_eq!(reader.pos(), bytes.len());
        }
    }

    // -- Signed LEB128 --

    #[test]
    fn test_write_vs64() {
        assert_eq!(encode_vs64(0), vec![0]);
        assert_eq!(encode_vs64(1), vec![1]);
        assert_eq!(encode_vs64(-1), vec![0x7f]);
        assert_eq!(encode_vs64(-128), vec![0x80, 0x7f]);
        assert_eq!(encode_vs64(624485), vec![0xe5, 0x8e, 0x26]);
        assert_eq!(encode_vs64(-123456), vec![0xc0, 0xbb, 0x78]);
        assert_eq!(encode_vs64(-624485), vec![0x9b, 0xf1, 0x59]);
        assert_eq!(
            encode_vs64(i64::MIN),
            vec![128, 128, 128, 128, 128, 128, 128, 128, 128, 127]
        );
    }

    #[test]
    fn test_rt_vs64() {
        let mut test_values = vec![
            0,
            1,
            -1,
            5,
            -5,
            100,
            -100,
            127,
            -128,
            512,
            -512,
            123456,
            -123456,
            123_456_789,
            -123_456_789,
            i64::MAX,
            i64::MIN,
        ];

        for i in 0..63 {
            let value = 1i64 << i;
            test_values.push(value);
            test_values.push(-value);
            test_values.push(value + 1);
            test_values.push(-value - 1);
        }

        use rand::Rng;
        let mut rng = rand::rng();
        for _ in 0..100 {
            test_values.push(rng.random::<i64>());
        }

        for &expected in &test_values {
            let bytes = encode_vs64(expected);
            let mut reader = Reader::new(&bytes);
            let actual = reader.read_vs64().expect("failed to read vs64");
            assert_eq!(actual, expected);
            assert_eq!(reader.pos(), bytes.len());
        }
    }

    #[test]
    fn test_rt_f64() {
        for expected in [0.0, 1.0, -1.0, 100.123456, -100.123456] {
            let mut buf = Vec::new();
            write_f64(&mut buf, expected);
            assert_eq!(buf.len(), 8);

            let mut reader = Reader::new(&buf);
            assert_eq!(reader.read_f64().unwrap(), expected);
            assert_eq!(reader.pos(), buf.len());
        }
    }

    #[test]
    fn test_rt_name() {
        for expected in ["", "1", "a", "1qaz", "Hello, 世界"] {
            let mut buf = Vec::new();
            write_name(&mut buf, expected.as_bytes());

            let mut reader = Reader::new(&buf);
            assert_eq!(reader.read_name().unwrap(), expected.as_bytes());
            assert_eq!(reader.pos(), buf.len());
        }
    }

    #[test]
    fn test_rt_result_type() {
        for expected in [vec![], vec![F32], vec![I32, I64]] {
            let mut buf = Vec::new();
            write_result_type(&mut buf, &expected);

            let mut reader = Reader::new(&buf);
            assert_eq!(reader.read_result_type().unwrap(), &expected[..]);
            assert_eq!(reader.pos(), buf.len());
        }
    }

    #[test]
    fn test_rt_func_type() {
        let mut buf = Vec::new();
        write_func_type(&mut buf, &[I32, I64], &[F32]);

        let mut reader = Reader::new(&buf);
        let fn_type = reader.read_func_type().unwrap();
        assert_eq!(fn_type.params, vec![I32, I64]);
        assert_eq!(fn_type.results, vec![F32]);
        assert_eq!(reader.pos(), buf.len());
    }

    #[test]
    fn test_rt_limits() {
        for (lo, hi) in [(0, -1), (1, -1), (0, 0), (0, 4), (1, 4)] {
            let mut buf = Vec::new();
            write_limits(&mut buf, lo, hi);

            let mut reader = Reader::new(&buf);
            let limits = reader.read_limits().unwrap();
            assert_eq!((limits.lo, limits.hi), (lo, hi));
            assert_eq!(reader.pos(), buf.len());
        }
    }

    #[test]
    fn test_rt_table_type() {
        for (tp, lo, hi) in [(FUNCREF, 0, 5), (EXTERNREF, 4, -1)] {
            let mut buf = Vec::new();
            write_table_type(&mut buf, tp, lo, hi);

            let mut reader = Reader::new(&buf);
            let table = reader.read_table_type().unwrap();
            assert_eq!((table.ty, table.limits.lo, table.limits.hi), (tp, lo, hi));
            assert_eq!(reader.pos(), buf.len());
        }
    }

    #[test]
    fn test_rt_global_type() {
        for (tp, mutable) in [(I64, 1), (F32, 0)] {
            let mut buf = Vec::new();
            write_global_type(&mut buf, tp, mutable);

            let mut reader = Reader::new(&buf);
            assert_eq!(reader.read_global_type().unwrap(), (tp, mutable));
            assert_eq!(reader.pos(), buf.len());
        }
    }

    #[test]
    fn test_rt_section() {
        let mut buf = Vec::new();
        write_section(&mut buf, SECTION_TYPE, &[0xaa, 0xbb, 0xcc]);

        let mut reader = Reader::new(&buf);
        let (id, data) = reader.read_section().unwrap();
        assert_eq!(id, SECTION_TYPE);
        assert_eq!(data, &[0xaa, 0xbb, 0xcc]);
        assert_eq!(reader.pos(), buf.len());
    }

    // -- Fixed width and composites --

    #[test]
    fn test_write_u32() {
        let mut buf = Vec::new();
        write_u32(&mut buf, 1);
        assert_eq!(buf, vec![1, 0, 0, 0]);
    }

    #[test]
    fn test_write_f64() {
        let mut buf = Vec::new();
        write_f64(&mut buf, std::f64::consts::TAU);
        assert_eq!(buf, vec![24, 45, 68, 84, 251, 33, 25, 64]);
    }

    #[test]
    fn test_write_name() {
        let mut buf = Vec::new();
        write_name(&mut buf, b"x");
        assert_eq!(buf, vec![1, 0x78]);

        buf.clear();
        write_name(&mut buf, b"");
        assert_eq!(buf, vec![0]);
    }

    #[test]
    fn test_write_func_type() {
        let mut buf = Vec::new();
        write_func_type(&mut buf, &[], &[]);
        assert_eq!(buf, vec![0x60, 0x00, 0x00]);

        buf.clear();
        write_func_type(&mut buf, &[I32, I64], &[F32]);
        assert_eq!(buf, vec![0x60, 0x02, 0x7f, 0x7e, 0x01, 0x7d]);
    }

    #[test]
    fn test_write_limits() {
        let mut buf = Vec::new();
        write_limits(&mut buf, 1, -1);
        assert_eq!(buf, vec![0x00, 0x01]);

        buf.clear();
        write_limits(&mut buf, 0, 4);
        assert_eq!(buf, vec![0x01, 0x00, 0x04]);
    }

    #[test]
    fn test_write_section() {
        let mut buf = Vec::new();
        write_section(&mut buf, SECTION_CUSTOM, &[0x01, 0x78, 0xaa]);
        assert_eq!(buf, vec![0x00, 0x03, 0x01, 0x78, 0xaa]);
    }
}
