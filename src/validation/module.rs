use log::{debug, warn};

use super::{ValidateOptions, error::ValidationError, host};
use crate::binary::{
    error::DecodeError,
    leb128::write_u32,
    module::{HEADER_LEN, RawSection, decode_header, decode_section, next_section},
    section::{Section, SectionCode},
    types::{Export, ExternalKind, FuncType, Import, ImportDesc},
};

pub const MAIN_EXPORT: &str = "main";
pub const MEMORY_EXPORT: &str = "memory";
pub const MAX_EXPORT_NAME_LEN: usize = 64;
pub const MAX_EXPORTS: usize = 64;

/// A module read for validation.
///
/// Only the sections validation looks at are kept. While reading, the
/// canonical output is assembled: the header and every section verbatim,
/// except that the export section is rebuilt with just `main` and `memory`
/// and start and custom sections are left out.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ValModule {
    types: Vec<FuncType>,
    imports: Vec<Import>,
    functions: Vec<u32>,
    exports: Vec<Export>,
    has_start: bool,
    has_custom: bool,
    buf: Vec<u8>,
}

impl ValModule {
    pub fn read(input: &[u8]) -> Result<Self, DecodeError> {
        let (mut remaining, _) = decode_header(input)?;
        let mut module = ValModule {
            buf: input[..HEADER_LEN].to_vec(),
            ..Default::default()
        };

        while !remaining.is_empty() {
            let offset = input.len() - remaining.len();
            let id = remaining[0];

            let (rest, raw) =
                next_section(remaining).map_err(|e| DecodeError::from(e).in_section(id, offset))?;
            module
                .read_section(&raw)
                .map_err(|e| e.in_section(raw.id, offset))?;

            remaining = rest;
        }

        Ok(module)
    }

    fn read_section(&mut self, raw: &RawSection<'_>) -> Result<(), DecodeError> {
        let (unread, section) = decode_section(raw.id, raw.contents)?;
        let code = section.code();
        if !unread.is_empty() {
            warn!("{} bytes unread in {:?} section", unread.len(), code);
            return Err(DecodeError::TrailingBytes {
                section: code,
                remaining: unread.len(),
            });
        }

        match section {
            Section::Type(types) => self.types.extend(types),
            Section::Import(imports) => self.imports.extend(imports),
            Section::Function(idxs) => self.functions.extend(idxs),
            Section::Export(exports) => {
                let kept = self.filter_exports(exports);
                if !kept.is_empty() {
                    let section = encode_export_section(&kept)?;
                    self.buf.extend_from_slice(&section);
                }
                return Ok(());
            }
            Section::Start(_) => {
                self.has_start = true;
                return Ok(());
            }
            Section::Custom(custom) => {
                debug!("dropping custom section {:?}", custom.name);
                self.has_custom = true;
                return Ok(());
            }
            _ => {}
        }

        self.buf.extend_from_slice(raw.bytes);
        Ok(())
    }

    /// Keeps `main` (function) and `memory` (memory), one of each, and
    /// returns the entries taken from this section.
    fn filter_exports(&mut self, exports: Vec<Export>) -> Vec<Export> {
        let mut kept = vec![];
        for export in exports {
            if self.exports.len() >= 2 {
                break;
            }
            let wanted = matches!(
                (export.field.as_str(), export.kind),
                (MAIN_EXPORT, ExternalKind::Function) | (MEMORY_EXPORT, ExternalKind::Memory)
            );
            if wanted && self.find_export(&export.field).is_none() {
                self.exports.push(export.clone());
                kept.push(export);
            }
        }
        kept
    }

    fn find_export(&self, name: &str) -> Option<&Export> {
        self.exports.iter().find(|e| e.field == name)
    }

    /// Resolves a function index to its signature. Imported functions come
    /// first in the index space; other import kinds take no function index.
    fn func_type(&self, func_idx: u32) -> Option<&FuncType> {
        let imported: Vec<u32> = self
            .imports
            .iter()
            .filter_map(|import| match import.desc {
                ImportDesc::Func(type_idx) => Some(type_idx),
                _ => None,
            })
            .collect();

        let func_idx = func_idx as usize;
        let type_idx = match imported.get(func_idx) {
            Some(type_idx) => *type_idx,
            None => *self.functions.get(func_idx - imported.len())?,
        };
        self.types.get(type_idx as usize)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.validate_with(&ValidateOptions::default())
    }

    pub fn validate_with(&self, options: &ValidateOptions) -> Result<(), ValidationError> {
        if self.has_start {
            return Err(ValidationError::HasStart);
        }
        if self.has_custom && !options.allow_custom {
            return Err(ValidationError::HasCustom);
        }

        if self.exports.len() != 2 {
            let missing = [MAIN_EXPORT, MEMORY_EXPORT]
                .into_iter()
                .find(|name| self.find_export(name).is_none());
            return Err(match missing {
                Some(name) => ValidationError::ExportMissing(name),
                None => ValidationError::ExportCount(self.exports.len()),
            });
        }

        self.validate_main()?;
        self.validate_memory()?;

        for import in &self.imports {
            self.validate_import(import)?;
        }

        debug!(
            "module valid: {} imports, {} functions",
            self.imports.len(),
            self.functions.len()
        );
        Ok(())
    }

    fn validate_main(&self) -> Result<(), ValidationError> {
        let main = self
            .find_export(MAIN_EXPORT)
            .ok_or(ValidationError::ExportMissing(MAIN_EXPORT))?;
        let signature_error = |reason: String| ValidationError::ExportSignature {
            name: MAIN_EXPORT,
            reason,
        };

        if main.kind != ExternalKind::Function {
            return Err(signature_error(format!(
                "expected a function, found a {}",
                main.kind
            )));
        }
        match self.func_type(main.index) {
            None => Err(signature_error(format!(
                "function {} does not exist",
                main.index
            ))),
            Some(ty) if !ty.params.is_empty() || !ty.results.is_empty() => {
                Err(signature_error(format!("expected (func), found {}", ty)))
            }
            Some(_) => Ok(()),
        }
    }

    fn validate_memory(&self) -> Result<(), ValidationError> {
        let memory = self
            .find_export(MEMORY_EXPORT)
            .ok_or(ValidationError::ExportMissing(MEMORY_EXPORT))?;
        if memory.kind != ExternalKind::Memory || memory.index != 0 {
            return Err(ValidationError::ExportSignature {
                name: MEMORY_EXPORT,
                reason: format!("expected memory 0, found {} {}", memory.kind, memory.index),
            });
        }
        Ok(())
    }

    fn validate_import(&self, import: &Import) -> Result<(), ValidationError> {
        let ImportDesc::Func(type_idx) = import.desc else {
            return Err(ValidationError::ImportNotFunc {
                module: import.module.clone(),
                field: import.field.clone(),
                kind: import.desc.kind(),
            });
        };
        let Some(found) = self.types.get(type_idx as usize) else {
            return Err(ValidationError::ImportTypeIndex {
                module: import.module.clone(),
                field: import.field.clone(),
                index: type_idx,
            });
        };
        let Some(host) = host::lookup(&import.module, &import.field) else {
            return Err(ValidationError::UnknownImport {
                module: import.module.clone(),
                field: import.field.clone(),
            });
        };

        if !found.matches(host.params, host.results) {
            return Err(ValidationError::ImportSignature {
                module: import.module.clone(),
                field: import.field.clone(),
                expected: FuncType::new(host.params, host.results),
                found: found.clone(),
            });
        }
        Ok(())
    }

    /// The canonical byte stream. Available whether or not `validate` passed.
    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Builds an export section: count byte, then per entry a name-length byte,
/// the name, a kind byte and the LEB128 index.
pub fn encode_export_section(exports: &[Export]) -> Result<Vec<u8>, DecodeError> {
    if exports.len() > MAX_EXPORTS {
        return Err(DecodeError::ExportBound {
            what: "count",
            len: exports.len(),
            max: MAX_EXPORTS,
        });
    }

    let mut payload = vec![exports.len() as u8];
    for export in exports {
        let name = export.field.as_bytes();
        if name.len() > MAX_EXPORT_NAME_LEN {
            return Err(DecodeError::ExportBound {
                what: "name length",
                len: name.len(),
                max: MAX_EXPORT_NAME_LEN,
            });
        }
        payload.push(name.len() as u8);
        payload.extend_from_slice(name);
        payload.push(export.kind as u8);
        write_u32(&mut payload, export.index);
    }

    let mut section = vec![SectionCode::Export as u8];
    write_u32(&mut section, payload.len() as u32);
    section.extend_from_slice(&payload);
    Ok(section)
}
