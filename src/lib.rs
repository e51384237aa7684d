pub mod binary;
pub mod validation;

pub use binary::{error::DecodeError, module::Module, section::Section};
pub use validation::{
    Error, ValidateOptions, canonicalize, error::ValidationError, module::ValModule,
};
