//! Binary encoder. Serialises a [`Module`] back to `.wasm` bytes.
//!
//! The conceptual inverse of [`crate::parser::parse`]. Sections are emitted
//! in canonical id order (custom sections last) and only when non-empty; the
//! module's decode-time section log is not replayed, so duplicate or
//! reordered input sections do not survive a round trip, but every typed
//! vector and the start/data count scalars do.
//!
//! Envelope sizes are regenerated and all integers use minimal LEB128.

use crate::parser::encoding::{
    write_func_type, write_global_type, write_limits, write_name, write_section, write_table_type,
    write_u32, write_vu64, DESC_FUNC, DESC_GLOBAL, DESC_MEMORY, DESC_TABLE, MAGIC,
    MAX_SUPPORTED_VERSION, SECTION_CODE, SECTION_CUSTOM, SECTION_DATA, SECTION_DATA_COUNT,
    SECTION_ELEMENT, SECTION_EXPORT, SECTION_FUNCTION, SECTION_GLOBAL, SECTION_IMPORT,
    SECTION_MEMORY, SECTION_START, SECTION_TABLE, SECTION_TYPE,
};
use crate::parser::module::{ImportDesc, Module};

/// Encodes a module to WebAssembly binary format.
pub fn encode(module: &Module) -> Vec<u8> {
    let mut buf = Vec::new();

    buf.extend_from_slice(&MAGIC);
    write_u32(&mut buf, MAX_SUPPORTED_VERSION);

    encode_type_section(&mut buf, module);
    encode_import_section(&mut buf, module);
    encode_function_section(&mut buf, module);
    encode_table_section(&mut buf, module);
    encode_memory_section(&mut buf, module);
    encode_global_section(&mut buf, module);
    encode_export_section(&mut buf, module);
    encode_start_section(&mut buf, module);
    encode_element_section(&mut buf, module);
    encode_data_count_section(&mut buf, module);
    encode_code_section(&mut buf, module);
    encode_data_section(&mut buf, module);
    encode_custom_sections(&mut buf, module);

    buf
}

/// Type section (id 1): `0x60 vec(valtype) vec(valtype)` per entry.
fn encode_type_section(buf: &mut Vec<u8>, module: &Module) {
    if module.types.is_empty() {
        return;
    }

    let mut contents = Vec::new();
    write_vu64(&mut contents, module.types.len() as u64);
    for fn_type in &module.types {
        write_func_type(&mut contents, &fn_type.params, &fn_type.results);
    }
    write_section(buf, SECTION_TYPE, &contents);
}

/// Import section (id 2): two names and a tagged description per entry.
fn encode_import_section(buf: &mut Vec<u8>, module: &Module) {
    if module.imports.is_empty() {
        return;
    }

    let mut contents = Vec::new();
    write_vu64(&mut contents, module.imports.len() as u64);
    for import in &module.imports {
        write_name(&mut contents, &import.module);
        write_name(&mut contents, &import.name);

        match &import.desc {
            ImportDesc::Func(idx) => {
                contents.push(DESC_FUNC);
                write_vu64(&mut contents, *idx as u64);
            }
            ImportDesc::Table(t) => {
                contents.push(DESC_TABLE);
                write_table_type(&mut contents, t.ty, t.limits.lo, t.limits.hi);
            }
            ImportDesc::Memory(l) => {
                contents.push(DESC_MEMORY);
                write_limits(&mut contents, l.lo, l.hi);
            }
            ImportDesc::Global { ty, mutable } => {
                contents.push(DESC_GLOBAL);
                write_global_type(&mut contents, *ty, *mutable);
            }
        }
    }
    write_section(buf, SECTION_IMPORT, &contents);
}

/// Function section (id 3): one type index per defined function.
fn encode_function_section(buf: &mut Vec<u8>, module: &Module) {
    if module.functions.is_empty() {
        return;
    }

    let mut contents = Vec::new();
    write_vu64(&mut contents, module.functions.len() as u64);
    for idx in &module.functions {
        write_vu64(&mut contents, *idx as u64);
    }
    write_section(buf, SECTION_FUNCTION, &contents);
}

fn encode_table_section(buf: &mut Vec<u8>, module: &Module) {
    if module.tables.is_empty() {
        return;
    }

    let mut contents = Vec::new();
    write_vu64(&mut contents, module.tables.len() as u64);
    for table in &module.tables {
        write_table_type(&mut contents, table.ty, table.limits.lo, table.limits.hi);
    }
    write_section(buf, SECTION_TABLE, &contents);
}

fn encode_memory_section(buf: &mut Vec<u8>, module: &Module) {
    if module.memories.is_empty() {
        return;
    }

    let mut contents = Vec::new();
    write_vu64(&mut contents, module.memories.len() as u64);
    for limits in &module.memories {
        write_limits(&mut contents, limits.lo, limits.hi);
    }
    write_section(buf, SECTION_MEMORY, &contents);
}

/// Global section (id 6): global type then the stored initialiser bytes,
/// which already include the terminating `end`.
fn encode_global_section(buf: &mut Vec<u8>, module: &Module) {
    if module.globals.is_empty() {
        return;
    }

    let mut contents = Vec::new();
    write_vu64(&mut contents, module.globals.len() as u64);
    for global in &module.globals {
        write_global_type(&mut contents, global.ty, global.mutable);
        contents.extend_from_slice(&global.expr);
    }
    write_section(buf, SECTION_GLOBAL, &contents);
}

fn encode_export_section(buf: &mut Vec<u8>, module: &Module) {
    if module.exports.is_empty() {
        return;
    }

    let mut contents = Vec::new();
    write_vu64(&mut contents, module.exports.len() as u64);
    for export in &module.exports {
        write_name(&mut contents, &export.name);
        contents.push(export.kind);
        write_vu64(&mut contents, export.index as u64);
    }
    write_section(buf, SECTION_EXPORT, &contents);
}

/// Start section (id 8): emitted only when a start function is set.
fn encode_start_section(buf: &mut Vec<u8>, module: &Module) {
    if module.start < 0 {
        return;
    }

    let mut contents = Vec::new();
    write_vu64(&mut contents, module.start as u64);
    write_section(buf, SECTION_START, &contents);
}

/// Element section (id 9): kind 0 only (active, funcref, table 0).
fn encode_element_section(buf: &mut Vec<u8>, module: &Module) {
    if module.elements.is_empty() {
        return;
    }

    let mut contents = Vec::new();
    write_vu64(&mut contents, module.elements.len() as u64);
    for element in &module.elements {
        contents.push(0x00);
        contents.extend_from_slice(&element.expr);
        write_vu64(&mut contents, element.funcs.len() as u64);
        for idx in &element.funcs {
            write_vu64(&mut contents, *idx as u64);
        }
    }
    write_section(buf, SECTION_ELEMENT, &contents);
}

/// Data count section (id 12): emitted only for a non-zero count.
fn encode_data_count_section(buf: &mut Vec<u8>, module: &Module) {
    if module.data_count == 0 {
        return;
    }

    let mut contents = Vec::new();
    write_vu64(&mut contents, module.data_count as u64);
    write_section(buf, SECTION_DATA_COUNT, &contents);
}

/// Code section (id 10): size-prefixed raw bodies, stored verbatim.
fn encode_code_section(buf: &mut Vec<u8>, module: &Module) {
    if module.code.is_empty() {
        return;
    }

    let mut contents = Vec::new();
    write_vu64(&mut contents, module.code.len() as u64);
    for body in &module.code {
        write_name(&mut contents, body);
    }
    write_section(buf, SECTION_CODE, &contents);
}

/// Data section (id 11): kind 0 only (active, memory 0).
fn encode_data_section(buf: &mut Vec<u8>, module: &Module) {
    if module.data.is_empty() {
        return;
    }

    let mut contents = Vec::new();
    write_vu64(&mut contents, module.data.len() as u64);
    for data in &module.data {
        contents.push(0x00);
        contents.extend_from_slice(&data.expr);
        write_name(&mut contents, &data.init);
    }
    write_section(buf, SECTION_DATA, &contents);
}

/// Custom sections (id 0), one envelope each, after all known sections.
fn encode_custom_sections(buf: &mut Vec<u8>, module: &Module) {
    for custom in &module.customs {
        let mut contents = Vec::new();
        write_name(&mut contents, &custom.name);
        contents.extend_from_slice(&custom.data);
        write_section(buf, SECTION_CUSTOM, &contents);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_module_is_header_only() {
        let bytes = encode(&Module::new());
        assert_eq!(bytes, vec![0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn start_section_only_when_set() {
        let mut module = Module::new();
        module.start = 7;
        let bytes = encode(&module);
        assert_eq!(
            bytes,
            vec![0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00, 0x08, 0x01, 0x07]
        );
    }

    #[test]
    fn custom_section_bytes() {
        let mut module = Module::new();
        module.customs.push(crate::parser::module::Custom {
            name: b"x".to_vec(),
            data: vec![0xaa, 0xbb],
        });
        let bytes = encode(&module);
        assert_eq!(
            bytes,
            vec![0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00, 0x00, 0x04, 0x01, 0x78, 0xaa, 0xbb]
        );
    }
}
