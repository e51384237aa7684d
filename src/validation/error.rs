use thiserror::Error;

use crate::binary::types::{ExternalKind, FuncType};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("module has a start section")]
    HasStart,
    #[error("module has a custom section")]
    HasCustom,
    #[error("module must export exactly main and memory, found {0} exports")]
    ExportCount(usize),
    #[error("export {0:?} is missing")]
    ExportMissing(&'static str),
    #[error("export {name:?}: {reason}")]
    ExportSignature { name: &'static str, reason: String },
    #[error("import {module}.{field} is a {kind}, only functions may be imported")]
    ImportNotFunc {
        module: String,
        field: String,
        kind: ExternalKind,
    },
    #[error("import {module}.{field} refers to type {index} which does not exist")]
    ImportTypeIndex {
        module: String,
        field: String,
        index: u32,
    },
    #[error("import {module}.{field} is not a known host function")]
    UnknownImport { module: String, field: String },
    #[error("import {module}.{field} has type {found}, expected {expected}")]
    ImportSignature {
        module: String,
        field: String,
        expected: FuncType,
        found: FuncType,
    },
}
