//! Binary format decoder. Reads `.wasm` bytes into a [`module::Module`].
//!
//! The decoder is a dispatcher over section envelopes: it verifies the
//! module header, then reads one section at a time, appending each id to the
//! module's section log and delegating the payload to a per-section decoder.
//! The envelope size is authoritative; a decoder that does not consume
//! exactly the declared payload raises [`ErrorKind::SizeMismatch`].
//!
//! Section ordering and multiplicity are not enforced; semantic validation
//! is out of scope.

pub mod encoding;
pub mod error;
pub mod instruction;
pub mod module;
pub mod reader;

pub use error::{DecodeError, ErrorKind};

use log::debug;

use crate::parser::encoding::{
    DESC_FUNC, DESC_GLOBAL, DESC_MEMORY, DESC_TABLE, MAGIC, MAX_SUPPORTED_VERSION, SECTION_CODE,
    SECTION_CUSTOM, SECTION_DATA, SECTION_DATA_COUNT, SECTION_ELEMENT, SECTION_EXPORT,
    SECTION_FUNCTION, SECTION_GLOBAL, SECTION_IMPORT, SECTION_MEMORY, SECTION_START, SECTION_TABLE,
    SECTION_TYPE,
};
use crate::parser::error::section_name;
use crate::parser::module::{
    Custom, Data, Element, Export, Global, Import, ImportDesc, Index, Module,
};
use crate::parser::reader::Reader;

/// Decodes a complete module image.
pub fn parse(bytes: &[u8]) -> Result<Module, DecodeError> {
    let mut module = Module::new();
    parse_into(bytes, &mut module)?;
    Ok(module)
}

/// Decodes a complete module image into a reused [`Module`].
///
/// The module's vectors are truncated in place and refilled, so parsing into
/// a previously populated module yields the same value as parsing into a
/// fresh one while reusing its allocations.
pub fn parse_into(bytes: &[u8], module: &mut Module) -> Result<(), DecodeError> {
    module.clear();

    let mut reader = Reader::new(bytes);

    match reader.read_bytes(4) {
        Ok(magic) if magic == MAGIC => {}
        _ => return Err(DecodeError::new(ErrorKind::MagicMismatch, 0)),
    }

    module.version = reader.read_u32()?;
    if module.version > MAX_SUPPORTED_VERSION {
        return Err(DecodeError::new(
            ErrorKind::UnsupportedVersion(module.version),
            4,
        ));
    }

    while !reader.is_empty() {
        let sec_at = reader.pos();
        let id = reader.read_byte()?;
        module.sections.push(id);

        let size = reader.read_vu64()? as usize;
        let end = match reader.pos().checked_add(size) {
            Some(end) if end <= bytes.len() => end,
            _ => {
                return Err(DecodeError::new(ErrorKind::UnexpectedEof, reader.pos()).in_section(id))
            }
        };

        debug!("section {} (id {id}), {size} bytes", section_name(id));

        let result = match id {
            SECTION_CUSTOM => custom_section(&mut reader, end, module),
            SECTION_TYPE => type_section(&mut reader, module),
            SECTION_IMPORT => import_section(&mut reader, module),
            SECTION_FUNCTION => function_section(&mut reader, module),
            SECTION_TABLE => table_section(&mut reader, module),
            SECTION_MEMORY => memory_section(&mut reader, module),
            SECTION_GLOBAL => global_section(&mut reader, module),
            SECTION_EXPORT => export_section(&mut reader, module),
            SECTION_START => start_section(&mut reader, module),
            SECTION_ELEMENT => element_section(&mut reader, module),
            SECTION_CODE => code_section(&mut reader, module),
            SECTION_DATA => data_section(&mut reader, module),
            SECTION_DATA_COUNT => data_count_section(&mut reader, module),
            _ => Err(DecodeError::new(ErrorKind::UnsupportedSection(id), sec_at)),
        };
        result.map_err(|e| e.in_section(id))?;

        if reader.pos() != end {
            return Err(DecodeError::new(ErrorKind::SizeMismatch, reader.pos()).in_section(id));
        }
    }

    Ok(())
}

/* SECTION DECODERS ************************************************/

fn custom_section(reader: &mut Reader, end: usize, module: &mut Module) -> Result<(), DecodeError> {
    let name = reader.read_name()?;
    if reader.pos() > end {
        // the name overran the envelope
        return Err(DecodeError::new(ErrorKind::SizeMismatch, reader.pos()));
    }

    let data = reader.read_bytes(end - reader.pos())?;

    module.customs.push(Custom {
        name: name.to_vec(),
        data: data.to_vec(),
    });

    Ok(())
}

fn type_section(reader: &mut Reader, module: &mut Module) -> Result<(), DecodeError> {
    let count = reader.read_vu64()?;

    for n in 0..count {
        let fn_type = reader.read_func_type().map_err(|e| e.at_item(n as usize))?;
        module.types.push(fn_type);
    }

    Ok(())
}

fn import_section(reader: &mut Reader, module: &mut Module) -> Result<(), DecodeError> {
    let count = reader.read_vu64()?;

    for n in 0..count {
        let import = read_import(reader).map_err(|e| e.at_item(n as usize))?;
        module.imports.push(import);
    }

    Ok(())
}

fn read_import(reader: &mut Reader) -> Result<Import, DecodeError> {
    let module_name = reader.read_name()?.to_vec();
    let name = reader.read_name()?.to_vec();

    let at = reader.pos();
    let tag = reader.read_byte()?;

    let desc = match tag {
        DESC_FUNC => ImportDesc::Func(reader.read_vu64()? as Index),
        DESC_TABLE => ImportDesc::Table(reader.read_table_type()?),
        DESC_MEMORY => ImportDesc::Memory(reader.read_limits()?),
        DESC_GLOBAL => {
            let (ty, mutable) = reader.read_global_type()?;
            ImportDesc::Global { ty, mutable }
        }
        _ => return Err(DecodeError::new(ErrorKind::UnsupportedImportDesc(tag), at)),
    };

    Ok(Import {
        module: module_name,
        name,
        desc,
    })
}

fn function_section(reader: &mut Reader, module: &mut Module) -> Result<(), DecodeError> {
    let count = reader.read_vu64()?;

    for n in 0..count {
        let idx = reader.read_vu64().map_err(|e| e.at_item(n as usize))?;
        module.functions.push(idx as Index);
    }

    Ok(())
}

fn table_section(reader: &mut Reader, module: &mut Module) -> Result<(), DecodeError> {
    let count = reader.read_vu64()?;

    for n in 0..count {
        let table = reader.read_table_type().map_err(|e| e.at_item(n as usize))?;
        module.tables.push(table);
    }

    Ok(())
}

fn memory_section(reader: &mut Reader, module: &mut Module) -> Result<(), DecodeError> {
    let count = reader.read_vu64()?;

    for n in 0..count {
        let limits = reader.read_limits().map_err(|e| e.at_item(n as usize))?;
        module.memories.push(limits);
    }

    Ok(())
}

fn global_section(reader: &mut Reader, module: &mut Module) -> Result<(), DecodeError> {
    let count = reader.read_vu64()?;

    for n in 0..count {
        let global = read_global(reader).map_err(|e| e.at_item(n as usize))?;
        module.globals.push(global);
    }

    Ok(())
}

fn read_global(reader: &mut Reader) -> Result<Global, DecodeError> {
    let (ty, mutable) = reader.read_global_type()?;
    let expr = instruction::read_expression(reader)?;

    Ok(Global {
        ty,
        mutable,
        expr: expr.to_vec(),
    })
}

fn export_section(reader: &mut Reader, module: &mut Module) -> Result<(), DecodeError> {
    let count = reader.read_vu64()?;

    for n in 0..count {
        let export = read_export(reader).map_err(|e| e.at_item(n as usize))?;
        module.exports.push(export);
    }

    Ok(())
}

fn read_export(reader: &mut Reader) -> Result<Export, DecodeError> {
    let name = reader.read_name()?.to_vec();
    let kind = reader.read_byte()?;
    let index = reader.read_vu64()? as Index;

    Ok(Export { name, kind, index })
}

fn start_section(reader: &mut Reader, module: &mut Module) -> Result<(), DecodeError> {
    module.start = reader.read_vu64()? as Index;
    Ok(())
}

fn element_section(reader: &mut Reader, module: &mut Module) -> Result<(), DecodeError> {
    let count = reader.read_vu64()?;

    for n in 0..count {
        let element = read_element(reader).map_err(|e| e.at_item(n as usize))?;
        module.elements.push(element);
    }

    Ok(())
}

fn read_element(reader: &mut Reader) -> Result<Element, DecodeError> {
    let at = reader.pos();
    let kind = reader.read_byte()?;

    // only kind 0 (active, funcref, table 0) in this format version
    if kind != 0 {
        return Err(DecodeError::new(ErrorKind::UnsupportedElemKind(kind), at));
    }

    let expr = instruction::read_expression(reader)?.to_vec();

    let len = reader.read_vu64()?;
    reader.validate_item_count(len)?;
    let mut funcs = Vec::with_capacity(len as usize);
    for _ in 0..len {
        funcs.push(reader.read_vu64()? as Index);
    }

    Ok(Element {
        ty: encoding::FUNCREF,
        expr,
        funcs,
    })
}

fn code_section(reader: &mut Reader, module: &mut Module) -> Result<(), DecodeError> {
    let count = reader.read_vu64()?;

    for n in 0..count {
        let body = read_code_entry(reader).map_err(|e| e.at_item(n as usize))?;
        module.code.push(body);
    }

    Ok(())
}

fn read_code_entry(reader: &mut Reader) -> Result<Vec<u8>, DecodeError> {
    let size = reader.read_vu64()? as usize;
    Ok(reader.read_bytes(size)?.to_vec())
}

fn data_section(reader: &mut Reader, module: &mut Module) -> Result<(), DecodeError> {
    let count = reader.read_vu64()?;

    for n in 0..count {
        let data = read_data(reader).map_err(|e| e.at_item(n as usize))?;
        module.data.push(data);
    }

    Ok(())
}

fn read_data(reader: &mut Reader) -> Result<Data, DecodeError> {
    let at = reader.pos();
    let kind = reader.read_byte()?;

    // only kind 0 (active, memory 0) in this format version
    if kind != 0 {
        return Err(DecodeError::new(ErrorKind::UnsupportedDataKind(kind), at));
    }

    let expr = instruction::read_expression(reader)?.to_vec();
    let init = reader.read_name()?.to_vec();

    Ok(Data { expr, init })
}

fn data_count_section(reader: &mut Reader, module: &mut Module) -> Result<(), DecodeError> {
    module.data_count = reader.read_vu64()? as i64;
    Ok(())
}
