pub mod error;
pub mod leb128;
pub mod module;
pub mod opcode;
pub mod section;
pub mod types;
