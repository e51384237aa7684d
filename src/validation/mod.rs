pub mod error;
pub mod host;
pub mod module;

use thiserror::Error;

use crate::binary::error::DecodeError;
use error::ValidationError;
use module::ValModule;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ValidateOptions {
    /// Accept modules carrying custom sections. They are stripped either way.
    pub allow_custom: bool,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read module: {0}")]
    Decode(#[from] DecodeError),
    #[error("module is not valid: {0}")]
    Validation(#[from] ValidationError),
}

/// Reads and validates `input`, returning the canonical bytes.
pub fn canonicalize(input: &[u8], options: &ValidateOptions) -> Result<Vec<u8>, Error> {
    let module = ValModule::read(input)?;
    module.validate_with(options)?;
    Ok(module.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn canonicalize_strips_custom_when_allowed() -> Result<()> {
        let clean = wat::parse_str(r#"(module (memory (export "memory") 1) (func (export "main")))"#)?;
        let mut wasm = clean.clone();
        // custom section "x" with one payload byte
        wasm.extend_from_slice(&[0x00, 0x03, 0x01, b'x', 0xff]);

        assert!(matches!(
            canonicalize(&wasm, &ValidateOptions::default()),
            Err(Error::Validation(ValidationError::HasCustom))
        ));
        let canonical = canonicalize(&wasm, &ValidateOptions { allow_custom: true })?;
        assert_eq!(canonical, clean);
        Ok(())
    }

    #[test]
    fn canonicalize_reports_decode_errors() {
        assert!(matches!(
            canonicalize(b"\0asm", &ValidateOptions::default()),
            Err(Error::Decode(DecodeError::UnexpectedEnd))
        ));
    }
}
