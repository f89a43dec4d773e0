//! Decoded module representation.
//!
//! A [`Module`] mirrors the binary format section by section: typed vectors
//! in order of first occurrence, the raw section id log, and the start/data
//! count scalars. Cross-references between records are integer indices only;
//! no record points at another.
//!
//! Byte runs (names, expressions, data initialisers, raw code bodies) are
//! owned copies of the input, so a `Module` outlives the buffer it was
//! decoded from.

use std::fmt;

use crate::parser::encoding;

/// An index decoded from the binary, wide enough for any LEB value and for
/// the `-1` "absent" sentinel used by [`Module::start`].
pub type Index = i64;

/// A value-type tag byte, stored verbatim (`0x7f` = i32, ..., `0x6f` =
/// externref). Tags are not validated during decoding.
pub type ValType = u8;

/// An ordered sequence of value-type tags.
pub type ResultType = Vec<ValType>;

#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub version: u32,

    /// Start function index; `-1` when no start section was present.
    pub start: Index,
    /// Declared data segment count; `0` when no data count section was present.
    pub data_count: i64,

    /// Section ids in input order, duplicates preserved.
    pub sections: Vec<u8>,

    pub types: Vec<FuncType>,
    pub imports: Vec<Import>,
    /// One type index per locally defined function.
    pub functions: Vec<Index>,
    pub tables: Vec<Table>,
    pub memories: Vec<Limits>,
    pub globals: Vec<Global>,
    pub exports: Vec<Export>,
    pub elements: Vec<Element>,
    /// Raw function bodies, not instruction-parsed; see
    /// [`crate::parser::instruction::parse_function`].
    pub code: Vec<Vec<u8>>,
    pub data: Vec<Data>,
    pub customs: Vec<Custom>,
}

impl Module {
    pub fn new() -> Module {
        Module {
            version: 0,
            start: -1,
            data_count: 0,
            sections: Vec::new(),
            types: Vec::new(),
            imports: Vec::new(),
            functions: Vec::new(),
            tables: Vec::new(),
            memories: Vec::new(),
            globals: Vec::new(),
            exports: Vec::new(),
            elements: Vec::new(),
            code: Vec::new(),
            data: Vec::new(),
            customs: Vec::new(),
        }
    }

    /// Truncates every vector in place (capacity preserved) and resets the
    /// scalars, so the module can be refilled by another parse.
    pub fn clear(&mut self) {
        self.version = 0;
        self.start = -1;
        self.data_count = 0;
        self.sections.clear();
        self.types.clear();
        self.imports.clear();
        self.functions.clear();
        self.tables.clear();
        self.memories.clear();
        self.globals.clear();
        self.exports.clear();
        self.elements.clear();
        self.code.clear();
        self.data.clear();
        self.customs.clear();
    }
}

impl Default for Module {
    fn default() -> Module {
        Module::new()
    }
}

/// A function signature: parameter and result type vectors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FuncType {
    pub params: ResultType,
    pub results: ResultType,
}

impl fmt::Display for FuncType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, tp) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", val_type_name(*tp))?;
        }
        write!(f, ") -> (")?;
        for (i, tp) in self.results.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", val_type_name(*tp))?;
        }
        write!(f, ")")
    }
}

/// What an import brings into the module.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportDesc {
    /// Tag 0: a function, by type index.
    Func(Index),
    /// Tag 1: a table with its element reference type.
    Table(Table),
    /// Tag 2: a memory.
    Memory(Limits),
    /// Tag 3: a global with its mutability byte.
    Global { ty: ValType, mutable: u8 },
}

impl fmt::Display for ImportDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportDesc::Func(idx) => write!(f, "func type[{idx}]"),
            ImportDesc::Table(t) => write!(f, "table {} {}", val_type_name(t.ty), t.limits),
            ImportDesc::Memory(l) => write!(f, "memory {l}"),
            ImportDesc::Global { ty, mutable } => write!(
                f,
                "global {} {}",
                val_type_name(*ty),
                if *mutable != 0 { "var" } else { "const" }
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Import {
    pub module: Vec<u8>,
    pub name: Vec<u8>,
    pub desc: ImportDesc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Export {
    pub name: Vec<u8>,
    /// Export kind byte, stored verbatim (0 func, 1 table, 2 memory, 3 global).
    pub kind: u8,
    pub index: Index,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub ty: ValType,
    pub limits: Limits,
}

/// Size bounds; `hi == -1` means no upper bound.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Limits {
    pub lo: i64,
    pub hi: i64,
}

impl fmt::Display for Limits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hi < 0 {
            write!(f, "min {}", self.lo)
        } else {
            write!(f, "min {} max {}", self.lo, self.hi)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Global {
    pub ty: ValType,
    pub mutable: u8,
    /// Initialiser expression bytes, terminating `end` included.
    pub expr: Vec<u8>,
}

/// An element segment of kind 0: active, funcref, table 0.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    pub ty: ValType,
    pub expr: Vec<u8>,
    pub funcs: Vec<Index>,
}

/// A data segment of kind 0: active, memory 0.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Data {
    pub expr: Vec<u8>,
    pub init: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Custom {
    pub name: Vec<u8>,
    /// Raw payload after the name, semantically uninterpreted.
    pub data: Vec<u8>,
}

/// A parsed function body: run-length expanded locals and the expression.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FuncCode {
    pub locals: ResultType,
    pub expr: Vec<u8>,
}

/// Mnemonic for a value-type tag, or `"?"` for bytes outside the known set.
pub fn val_type_name(tp: ValType) -> &'static str {
    match tp {
        encoding::I32 => "i32",
        encoding::I64 => "i64",
        encoding::F32 => "f32",
        encoding::F64 => "f64",
        encoding::V128 => "v128",
        encoding::FUNCREF => "funcref",
        encoding::EXTERNREF => "externref",
        _ => "?",
    }
}
