use super::types::{
    Export, FuncType, FunctionLocal, GlobalVariable, Import, InitExpr, MemoryType, TableType,
};
use num_derive::FromPrimitive;

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum SectionCode {
    Custom = 0x00,
    Type = 0x01,
    Import = 0x02,
    Function = 0x03,
    Table = 0x04,
    Memory = 0x05,
    Global = 0x06,
    Export = 0x07,
    Start = 0x08,
    Element = 0x09,
    Code = 0x0a,
    Data = 0x0b,
}

/// Name of the custom section carrying debug names.
pub const NAME_SECTION: &str = "name";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionName {
    pub index: u32,
    pub name: String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NameSection {
    pub module_name: Option<String>,
    pub function_names: Vec<FunctionName>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomPayload {
    Name(NameSection),
    Raw(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomSection {
    pub name: String,
    pub payload: CustomPayload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSegment {
    pub table_index: u32,
    pub offset: InitExpr,
    pub elems: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSegment {
    pub memory_index: u32,
    pub offset: InitExpr,
    pub data: Vec<u8>,
}

/// A function body; the instruction stream is kept as opaque bytes.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct FunctionBody {
    pub locals: Vec<FunctionLocal>,
    pub code: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Section {
    Custom(CustomSection),
    Type(Vec<FuncType>),
    Import(Vec<Import>),
    Function(Vec<u32>),
    Table(Vec<TableType>),
    Memory(Vec<MemoryType>),
    Global(Vec<GlobalVariable>),
    Export(Vec<Export>),
    Start(u32),
    Element(Vec<ElementSegment>),
    Code(Vec<FunctionBody>),
    Data(Vec<DataSegment>),
}

impl Section {
    pub fn code(&self) -> SectionCode {
        match self {
            Self::Custom(_) => SectionCode::Custom,
            Self::Type(_) => SectionCode::Type,
            Self::Import(_) => SectionCode::Import,
            Self::Function(_) => SectionCode::Function,
            Self::Table(_) => SectionCode::Table,
            Self::Memory(_) => SectionCode::Memory,
            Self::Global(_) => SectionCode::Global,
            Self::Export(_) => SectionCode::Export,
            Self::Start(_) => SectionCode::Start,
            Self::Element(_) => SectionCode::Element,
            Self::Code(_) => SectionCode::Code,
            Self::Data(_) => SectionCode::Data,
        }
    }

    /// Number of entries the section declared. Start and custom sections
    /// count as a single entry.
    pub fn len(&self) -> usize {
        match self {
            Self::Custom(_) | Self::Start(_) => 1,
            Self::Type(v) => v.len(),
            Self::Import(v) => v.len(),
            Self::Function(v) => v.len(),
            Self::Table(v) => v.len(),
            Self::Memory(v) => v.len(),
            Self::Global(v) => v.len(),
            Self::Export(v) => v.len(),
            Self::Element(v) => v.len(),
            Self::Code(v) => v.len(),
            Self::Data(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
