use std::fmt;

use num_derive::FromPrimitive;

use super::opcode::Opcode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
#[repr(i8)]
pub enum ValueType {
    I32 = -0x01,     // 0x7F
    I64 = -0x02,     // 0x7E
    F32 = -0x03,     // 0x7D
    F64 = -0x04,     // 0x7C
    AnyFunc = -0x10, // 0x70
    Func = -0x20,    // 0x60
    Block = -0x40,   // 0x40, pseudo type for an empty block_type
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::AnyFunc => "anyfunc",
            Self::Func => "func",
            Self::Block => "block_type",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncType {
    /// type constructor, always `func` once decoded
    pub form: ValueType,
    pub params: Vec<ValueType>,
    pub results: Vec<ValueType>,
}

impl Default for FuncType {
    fn default() -> Self {
        Self {
            form: ValueType::Func,
            params: vec![],
            results: vec![],
        }
    }
}

impl FuncType {
    pub fn new(params: &[ValueType], results: &[ValueType]) -> Self {
        Self {
            form: ValueType::Func,
            params: params.to_vec(),
            results: results.to_vec(),
        }
    }

    pub fn matches(&self, params: &[ValueType], results: &[ValueType]) -> bool {
        self.params == params && self.results == results
    }
}

impl fmt::Display for FuncType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}", self.form)?;
        if !self.params.is_empty() {
            f.write_str(" (param")?;
            for param in &self.params {
                write!(f, " {}", param)?;
            }
            f.write_str(")")?;
        }
        if !self.results.is_empty() {
            f.write_str(" (result")?;
            for result in &self.results {
                write!(f, " {}", result)?;
            }
            f.write_str(")")?;
        }
        f.write_str(")")
    }
}

/// Limits of a table or memory. `maximum` is present iff bit 0 of `flags` is set.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResizableLimits {
    pub flags: u32,
    pub initial: u32,
    pub maximum: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableType {
    pub element_type: ValueType,
    pub limits: ResizableLimits,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryType {
    pub limits: ResizableLimits,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalType {
    pub content_type: ValueType,
    pub mutable: bool,
}

/// A constant initializer: `i32.const` or `i64.const` followed by `end`.
///
/// Both opcodes store their operand as an i64; `raw` keeps the instruction
/// bytes exactly as they were read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitExpr {
    pub opcode: Opcode,
    pub value: i64,
    pub raw: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalVariable {
    pub ty: GlobalType,
    pub init: InitExpr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum ExternalKind {
    Function = 0x00,
    Table = 0x01,
    Memory = 0x02,
    Global = 0x03,
}

impl fmt::Display for ExternalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Function => "func",
            Self::Table => "table",
            Self::Memory => "memory",
            Self::Global => "global",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportDesc {
    Func(u32),
    Table(TableType),
    Memory(MemoryType),
    Global(GlobalType),
}

impl ImportDesc {
    pub fn kind(&self) -> ExternalKind {
        match self {
            Self::Func(_) => ExternalKind::Function,
            Self::Table(_) => ExternalKind::Table,
            Self::Memory(_) => ExternalKind::Memory,
            Self::Global(_) => ExternalKind::Global,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub module: String,
    pub field: String,
    pub desc: ImportDesc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    pub field: String,
    pub kind: ExternalKind,
    pub index: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionLocal {
    pub type_count: u32,
    pub value_type: ValueType,
}
