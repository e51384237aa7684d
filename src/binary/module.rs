use super::{
    error::{DecodeError, Res, fail},
    leb128::{var_i7, var_i32, var_i64, var_u1, var_u7, var_u32},
    opcode::Opcode,
    section::{
        CustomPayload, CustomSection, DataSegment, ElementSegment, FunctionBody, FunctionName,
        NAME_SECTION, NameSection, Section, SectionCode,
    },
    types::{
        Export, ExternalKind, FuncType, FunctionLocal, GlobalType, GlobalVariable, Import,
        ImportDesc, InitExpr, MemoryType, ResizableLimits, TableType, ValueType,
    },
};
use log::{debug, warn};
use nom::{
    bytes::complete::take,
    number::complete::{le_u8, le_u32},
};
use num_traits::FromPrimitive as _;

pub const MAGIC: [u8; 4] = *b"\0asm";
pub const HEADER_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub magic: [u8; 4],
    pub version: u32,
}

impl Default for Header {
    fn default() -> Self {
        Self {
            magic: MAGIC,
            version: 1,
        }
    }
}

/// A decoded module: the header plus every section in stream order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Module {
    pub header: Header,
    pub sections: Vec<Section>,
}

impl Module {
    pub fn new(input: &[u8]) -> Result<Module, DecodeError> {
        let (mut remaining, header) = decode_header(input)?;
        let mut module = Module {
            header,
            sections: vec![],
        };

        // running out of input on a section boundary is the normal way out
        while !remaining.is_empty() {
            let offset = input.len() - remaining.len();
            let id = remaining[0];

            let (rest, raw) =
                next_section(remaining).map_err(|e| DecodeError::from(e).in_section(id, offset))?;
            let (unread, section) = decode_section(raw.id, raw.contents)
                .map_err(|e| DecodeError::from(e).in_section(raw.id, offset))?;

            if !unread.is_empty() {
                warn!(
                    "{} bytes unread in {:?} section at offset {:#x}, skipping",
                    unread.len(),
                    section.code(),
                    offset
                );
            }
            debug!(
                "decoded {:?} section at offset {:#x}: {} entries",
                section.code(),
                offset,
                section.len()
            );

            module.sections.push(section);
            remaining = rest;
        }

        Ok(module)
    }

    pub fn type_section(&self) -> Option<&[FuncType]> {
        self.sections.iter().find_map(|s| match s {
            Section::Type(types) => Some(types.as_slice()),
            _ => None,
        })
    }

    pub fn import_section(&self) -> Option<&[Import]> {
        self.sections.iter().find_map(|s| match s {
            Section::Import(imports) => Some(imports.as_slice()),
            _ => None,
        })
    }

    pub fn function_section(&self) -> Option<&[u32]> {
        self.sections.iter().find_map(|s| match s {
            Section::Function(idxs) => Some(idxs.as_slice()),
            _ => None,
        })
    }

    pub fn export_section(&self) -> Option<&[Export]> {
        self.sections.iter().find_map(|s| match s {
            Section::Export(exports) => Some(exports.as_slice()),
            _ => None,
        })
    }

    pub fn start(&self) -> Option<u32> {
        self.sections.iter().find_map(|s| match s {
            Section::Start(idx) => Some(*idx),
            _ => None,
        })
    }

    pub fn name_section(&self) -> Option<&NameSection> {
        self.sections.iter().find_map(|s| match s {
            Section::Custom(CustomSection {
                payload: CustomPayload::Name(names),
                ..
            }) => Some(names),
            _ => None,
        })
    }
}

/// A section as it sits in the byte stream. `bytes` spans the id, the
/// length prefix and the payload; `contents` is the payload alone.
#[derive(Debug)]
pub(crate) struct RawSection<'a> {
    pub id: u8,
    pub contents: &'a [u8],
    pub bytes: &'a [u8],
}

pub(crate) fn decode_header(input: &[u8]) -> Res<'_, Header> {
    let (rest, magic_bytes) = take(4usize)(input)?;
    let mut magic = [0u8; 4];
    magic.copy_from_slice(magic_bytes);
    if magic != MAGIC {
        return fail(DecodeError::InvalidMagic(magic));
    }
    let (rest, version) = le_u32(rest)?;
    Ok((rest, Header { magic, version }))
}

pub(crate) fn next_section(input: &[u8]) -> Res<'_, RawSection<'_>> {
    let (rest, id) = var_u7(input)?;
    let (rest, size) = var_u32(rest)?;
    let (rest, contents) = take(size)(rest)?;
    let bytes = &input[..input.len() - rest.len()];
    Ok((
        rest,
        RawSection {
            id,
            contents,
            bytes,
        },
    ))
}

/// Decodes one section payload. Whatever the payload holds past the
/// section's declared content is returned unread for the caller to judge.
pub(crate) fn decode_section(id: u8, input: &[u8]) -> Res<'_, Section> {
    let Some(code) = SectionCode::from_u8(id) else {
        return fail(DecodeError::InvalidSectionId(id));
    };

    let (rest, section) = match code {
        SectionCode::Custom => {
            let (rest, custom) = decode_custom_section(input)?;
            (rest, Section::Custom(custom))
        }
        SectionCode::Type => {
            let (rest, types) = decode_vec(input, decode_func_type)?;
            (rest, Section::Type(types))
        }
        SectionCode::Import => {
            let (rest, imports) = decode_vec(input, decode_import)?;
            (rest, Section::Import(imports))
        }
        SectionCode::Function => {
            let (rest, idxs) = decode_vec(input, var_u32)?;
            (rest, Section::Function(idxs))
        }
        SectionCode::Table => {
            let (rest, tables) = decode_vec(input, decode_table_type)?;
            (rest, Section::Table(tables))
        }
        SectionCode::Memory => {
            let (rest, memories) = decode_vec(input, decode_memory_type)?;
            (rest, Section::Memory(memories))
        }
        SectionCode::Global => {
            let (rest, globals) = decode_vec(input, decode_global_variable)?;
            (rest, Section::Global(globals))
        }
        SectionCode::Export => {
            let (rest, exports) = decode_vec(input, decode_export)?;
            (rest, Section::Export(exports))
        }
        SectionCode::Start => {
            let (rest, idx) = var_u32(input)?;
            (rest, Section::Start(idx))
        }
        SectionCode::Element => {
            let (rest, elements) = decode_vec(input, decode_element_segment)?;
            (rest, Section::Element(elements))
        }
        SectionCode::Code => {
            let (rest, bodies) = decode_vec(input, decode_function_body)?;
            (rest, Section::Code(bodies))
        }
        SectionCode::Data => {
            let (rest, segments) = decode_vec(input, decode_data_segment)?;
            (rest, Section::Data(segments))
        }
    };

    Ok((rest, section))
}

fn decode_vec<'a, T>(
    input: &'a [u8],
    decode: impl Fn(&'a [u8]) -> Res<'a, T>,
) -> Res<'a, Vec<T>> {
    let (mut input, count) = var_u32(input)?;
    // the count is untrusted, so no preallocation
    let mut items = vec![];

    for _ in 0..count {
        let (rest, item) = decode(input)?;
        items.push(item);
        input = rest;
    }

    Ok((input, items))
}

fn decode_name(input: &[u8]) -> Res<'_, String> {
    let (input, size) = var_u32(input)?;
    let (input, name) = take(size)(input)?;
    Ok((input, String::from_utf8_lossy(name).into_owned()))
}

fn decode_value_type(input: &[u8]) -> Res<'_, ValueType> {
    let (input, value) = var_i7(input)?;
    match ValueType::from_i8(value) {
        Some(value_type) => Ok((input, value_type)),
        None => fail(DecodeError::InvalidValueType(value as i64)),
    }
}

fn decode_func_type(input: &[u8]) -> Res<'_, FuncType> {
    let (input, form) = var_i7(input)?;
    if form != ValueType::Func as i8 {
        return fail(DecodeError::InvalidTypeForm(form as i64));
    }

    let (input, params) = decode_vec(input, decode_value_type)?;
    let (input, results) = decode_vec(input, decode_value_type)?;
    if results.len() > 1 {
        return fail(DecodeError::TooManyResults(results.len() as u32));
    }

    Ok((
        input,
        FuncType {
            form: ValueType::Func,
            params,
            results,
        },
    ))
}

fn decode_external_kind(input: &[u8]) -> Res<'_, ExternalKind> {
    let (input, kind) = le_u8(input)?;
    match ExternalKind::from_u8(kind) {
        Some(kind) => Ok((input, kind)),
        None => fail(DecodeError::InvalidExternalKind(kind)),
    }
}

fn decode_limits(input: &[u8]) -> Res<'_, ResizableLimits> {
    let (input, flags) = var_u32(input)?;
    let (input, initial) = var_u32(input)?;
    let (input, maximum) = if flags & 0x1 != 0 {
        let (input, max) = var_u32(input)?;
        (input, Some(max))
    } else {
        (input, None)
    };

    Ok((
        input,
        ResizableLimits {
            flags,
            initial,
            maximum,
        },
    ))
}

fn decode_table_type(input: &[u8]) -> Res<'_, TableType> {
    let (input, element_type) = decode_value_type(input)?;
    let (input, limits) = decode_limits(input)?;
    Ok((
        input,
        TableType {
            element_type,
            limits,
        },
    ))
}

fn decode_memory_type(input: &[u8]) -> Res<'_, MemoryType> {
    let (input, limits) = decode_limits(input)?;
    Ok((input, MemoryType { limits }))
}

fn decode_global_type(input: &[u8]) -> Res<'_, GlobalType> {
    let (input, content_type) = decode_value_type(input)?;
    let (input, mutable) = var_u1(input)?;
    Ok((
        input,
        GlobalType {
            content_type,
            mutable,
        },
    ))
}

fn decode_init_expr(input: &[u8]) -> Res<'_, InitExpr> {
    let (rest, byte) = le_u8(input)?;
    let (rest, opcode, value) = match Opcode::from_u8(byte) {
        Some(Opcode::I32Const) => {
            let (rest, value) = var_i32(rest)?;
            (rest, Opcode::I32Const, value as i64)
        }
        Some(Opcode::I64Const) => {
            let (rest, value) = var_i64(rest)?;
            (rest, Opcode::I64Const, value)
        }
        _ => return fail(DecodeError::InvalidOpcode(byte)),
    };

    let (rest, end) = le_u8(rest)?;
    if end != Opcode::End as u8 {
        return fail(DecodeError::InvalidOpcode(end));
    }

    Ok((
        rest,
        InitExpr {
            opcode,
            value,
            raw: input[..input.len() - rest.len()].to_vec(),
        },
    ))
}

fn decode_global_variable(input: &[u8]) -> Res<'_, GlobalVariable> {
    let (input, ty) = decode_global_type(input)?;
    let (input, init) = decode_init_expr(input)?;
    Ok((input, GlobalVariable { ty, init }))
}

fn decode_import(input: &[u8]) -> Res<'_, Import> {
    let (input, module) = decode_name(input)?;
    let (input, field) = decode_name(input)?;
    let (input, kind) = decode_external_kind(input)?;
    let (input, desc) = match kind {
        ExternalKind::Function => {
            let (input, idx) = var_u32(input)?;
            (input, ImportDesc::Func(idx))
        }
        ExternalKind::Table => {
            let (input, table) = decode_table_type(input)?;
            (input, ImportDesc::Table(table))
        }
        ExternalKind::Memory => {
            let (input, memory) = decode_memory_type(input)?;
            (input, ImportDesc::Memory(memory))
        }
        ExternalKind::Global => {
            let (input, global) = decode_global_type(input)?;
            (input, ImportDesc::Global(global))
        }
    };

    Ok((
        input,
        Import {
            module,
            field,
            desc,
        },
    ))
}

fn decode_export(input: &[u8]) -> Res<'_, Export> {
    let (input, field) = decode_name(input)?;
    let (input, kind) = decode_external_kind(input)?;
    let (input, index) = var_u32(input)?;
    Ok((input, Export { field, kind, index }))
}

fn decode_element_segment(input: &[u8]) -> Res<'_, ElementSegment> {
    let (input, table_index) = var_u32(input)?;
    let (input, offset) = decode_init_expr(input)?;
    let (input, elems) = decode_vec(input, var_u32)?;
    Ok((
        input,
        ElementSegment {
            table_index,
            offset,
            elems,
        },
    ))
}

fn decode_data_segment(input: &[u8]) -> Res<'_, DataSegment> {
    let (input, memory_index) = var_u32(input)?;
    let (input, offset) = decode_init_expr(input)?;
    let (input, size) = var_u32(input)?;
    let (input, data) = take(size)(input)?;
    Ok((
        input,
        DataSegment {
            memory_index,
            offset,
            data: data.into(),
        },
    ))
}

fn decode_function_local(input: &[u8]) -> Res<'_, FunctionLocal> {
    let (input, type_count) = var_u32(input)?;
    let (input, value_type) = decode_value_type(input)?;
    Ok((
        input,
        FunctionLocal {
            type_count,
            value_type,
        },
    ))
}

fn decode_function_body(input: &[u8]) -> Res<'_, FunctionBody> {
    let (rest, size) = var_u32(input)?;
    let (rest, body) = take(size)(rest)?;
    let (code, locals) = decode_vec(body, decode_function_local)?;
    Ok((
        rest,
        FunctionBody {
            locals,
            code: code.to_vec(),
        },
    ))
}

fn decode_custom_section(input: &[u8]) -> Res<'_, CustomSection> {
    let (input, name) = decode_name(input)?;
    if name == NAME_SECTION {
        let (input, names) = decode_name_section(input)?;
        return Ok((
            input,
            CustomSection {
                name,
                payload: CustomPayload::Name(names),
            },
        ));
    }

    Ok((
        &input[input.len()..],
        CustomSection {
            name,
            payload: CustomPayload::Raw(input.to_vec()),
        },
    ))
}

fn decode_function_name(input: &[u8]) -> Res<'_, FunctionName> {
    let (input, index) = var_u32(input)?;
    let (input, name) = decode_name(input)?;
    Ok((input, FunctionName { index, name }))
}

fn decode_name_section(mut input: &[u8]) -> Res<'_, NameSection> {
    let mut names = NameSection::default();

    while !input.is_empty() {
        let (rest, name_type) = var_u7(input)?;
        let (rest, size) = var_u32(rest)?;
        let (rest, payload) = take(size)(rest)?;

        let unread: &[u8] = match name_type {
            0 => {
                let (unread, module_name) = decode_name(payload)?;
                names.module_name = Some(module_name);
                unread
            }
            1 => {
                let (unread, function_names) = decode_vec(payload, decode_function_name)?;
                names.function_names = function_names;
                unread
            }
            // local names and anything newer are skipped whole
            _ => &[],
        };

        if !unread.is_empty() {
            warn!(
                "{}/{} bytes unread in name subsection {}, skipping",
                unread.len(),
                size,
                name_type
            );
        }
        input = rest;
    }

    Ok((input, names))
}

/// Assembles a module from raw `(id, payload)` pairs behind a version 1 header.
#[cfg(test)]
pub(crate) fn raw_module(sections: &[(u8, &[u8])]) -> Vec<u8> {
    let mut wasm = MAGIC.to_vec();
    wasm.extend_from_slice(&1u32.to_le_bytes());
    for (id, payload) in sections {
        wasm.push(*id);
        super::leb128::write_u32(&mut wasm, payload.len() as u32);
        wasm.extend_from_slice(payload);
    }
    wasm
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use nom_leb128::leb128_u32;
    use pretty_assertions::assert_eq;

    fn i32_const(value: i64, raw: &[u8]) -> InitExpr {
        InitExpr {
            opcode: Opcode::I32Const,
            value,
            raw: raw.to_vec(),
        }
    }

    #[test]
    fn decode_simplest_module() -> Result<()> {
        let wasm = wat::parse_str("(module)")?;
        let module = Module::new(&wasm)?;
        assert_eq!(module, Module::default());
        Ok(())
    }

    #[test]
    fn decode_simplest_func() -> Result<()> {
        let wasm = wat::parse_str("(module (func))")?;
        let module = Module::new(&wasm)?;
        assert_eq!(
            module,
            Module {
                sections: vec![
                    Section::Type(vec![FuncType::default()]),
                    Section::Function(vec![0]),
                    Section::Code(vec![FunctionBody {
                        locals: vec![],
                        code: vec![0x0b],
                    }]),
                ],
                ..Default::default()
            }
        );
        Ok(())
    }

    #[test]
    fn decode_func_local() -> Result<()> {
        let wasm = wat::parse_str("(module (func (local i32 i64 i64) nop))")?;
        let module = Module::new(&wasm)?;
        assert_eq!(
            module.sections[2],
            Section::Code(vec![FunctionBody {
                locals: vec![
                    FunctionLocal {
                        type_count: 1,
                        value_type: ValueType::I32,
                    },
                    FunctionLocal {
                        type_count: 2,
                        value_type: ValueType::I64,
                    },
                ],
                code: vec![0x01, 0x0b],
            }])
        );
        Ok(())
    }

    #[test]
    fn decode_func_add() -> Result<()> {
        let wasm = wat::parse_str(
            r#"(module
                (func (export "add") (param i32 i32) (result i32)
                    local.get 0
                    local.get 1
                    i32.add))"#,
        )?;
        let module = Module::new(&wasm)?;
        assert_eq!(
            module.type_section(),
            Some(&[FuncType::new(&[ValueType::I32, ValueType::I32], &[ValueType::I32])][..])
        );
        assert_eq!(module.function_section(), Some(&[0][..]));
        assert_eq!(
            module.export_section(),
            Some(
                &[Export {
                    field: "add".into(),
                    kind: ExternalKind::Function,
                    index: 0,
                }][..]
            )
        );
        assert_eq!(
            module.type_section().map(|types| types[0].to_string()),
            Some("(func (param i32 i32) (result i32))".to_string())
        );
        Ok(())
    }

    #[test]
    fn decode_import() -> Result<()> {
        let wasm = wat::parse_str(
            r#"(module
                (import "env" "f" (func (param i64)))
                (import "env" "t" (table 2 funcref))
                (import "env" "m" (memory 1 4))
                (import "env" "g" (global (mut i32))))"#,
        )?;
        let module = Module::new(&wasm)?;
        assert_eq!(
            module.import_section(),
            Some(
                &[
                    Import {
                        module: "env".into(),
                        field: "f".into(),
                        desc: ImportDesc::Func(0),
                    },
                    Import {
                        module: "env".into(),
                        field: "t".into(),
                        desc: ImportDesc::Table(TableType {
                            element_type: ValueType::AnyFunc,
                            limits: ResizableLimits {
                                flags: 0,
                                initial: 2,
                                maximum: None,
                            },
                        }),
                    },
                    Import {
                        module: "env".into(),
                        field: "m".into(),
                        desc: ImportDesc::Memory(MemoryType {
                            limits: ResizableLimits {
                                flags: 1,
                                initial: 1,
                                maximum: Some(4),
                            },
                        }),
                    },
                    Import {
                        module: "env".into(),
                        field: "g".into(),
                        desc: ImportDesc::Global(GlobalType {
                            content_type: ValueType::I32,
                            mutable: true,
                        }),
                    },
                ][..]
            )
        );
        Ok(())
    }

    #[test]
    fn decode_memory() -> Result<()> {
        let tests = vec![
            (
                "(module (memory 1))",
                ResizableLimits {
                    flags: 0,
                    initial: 1,
                    maximum: None,
                },
            ),
            (
                "(module (memory 1 2))",
                ResizableLimits {
                    flags: 1,
                    initial: 1,
                    maximum: Some(2),
                },
            ),
        ];
        for (wasm, limits) in tests {
            let module = Module::new(&wat::parse_str(wasm)?)?;
            assert_eq!(
                module,
                Module {
                    sections: vec![Section::Memory(vec![MemoryType { limits }])],
                    ..Default::default()
                }
            );
        }
        Ok(())
    }

    #[test]
    fn decode_global() -> Result<()> {
        let wasm = wat::parse_str(
            "(module (global i32 (i32.const -1)) (global (mut i64) (i64.const 42)))",
        )?;
        let module = Module::new(&wasm)?;
        assert_eq!(
            module.sections,
            vec![Section::Global(vec![
                GlobalVariable {
                    ty: GlobalType {
                        content_type: ValueType::I32,
                        mutable: false,
                    },
                    init: i32_const(-1, &[0x41, 0x7f, 0x0b]),
                },
                GlobalVariable {
                    ty: GlobalType {
                        content_type: ValueType::I64,
                        mutable: true,
                    },
                    init: InitExpr {
                        opcode: Opcode::I64Const,
                        value: 42,
                        raw: vec![0x42, 0x2a, 0x0b],
                    },
                },
            ])]
        );
        Ok(())
    }

    #[test]
    fn decode_data() -> Result<()> {
        let wasm = wat::parse_str(
            r#"(module (memory 1) (data (i32.const 0) "hello") (data (i32.const 5) "world"))"#,
        )?;
        let module = Module::new(&wasm)?;
        assert_eq!(
            module.sections[1],
            Section::Data(vec![
                DataSegment {
                    memory_index: 0,
                    offset: i32_const(0, &[0x41, 0x00, 0x0b]),
                    data: b"hello".into(),
                },
                DataSegment {
                    memory_index: 0,
                    offset: i32_const(5, &[0x41, 0x05, 0x0b]),
                    data: b"world".into(),
                },
            ])
        );
        Ok(())
    }

    #[test]
    fn decode_element_and_start() -> Result<()> {
        let wasm = wat::parse_str(
            "(module (table 2 funcref) (func) (start 0) (elem (i32.const 1) 0))",
        )?;
        let module = Module::new(&wasm)?;
        let codes: Vec<SectionCode> = module.sections.iter().map(Section::code).collect();
        assert_eq!(
            codes,
            vec![
                SectionCode::Type,
                SectionCode::Function,
                SectionCode::Table,
                SectionCode::Start,
                SectionCode::Element,
                SectionCode::Code,
            ]
        );
        assert_eq!(module.start(), Some(0));
        assert_eq!(
            module.sections[4],
            Section::Element(vec![ElementSegment {
                table_index: 0,
                offset: i32_const(1, &[0x41, 0x01, 0x0b]),
                elems: vec![0],
            }])
        );
        Ok(())
    }

    #[test]
    fn decode_name_section() -> Result<()> {
        let wasm = wat::parse_str("(module $demo (func $foo) (func $bar))")?;
        let module = Module::new(&wasm)?;
        assert_eq!(
            module.name_section(),
            Some(&NameSection {
                module_name: Some("demo".into()),
                function_names: vec![
                    FunctionName {
                        index: 0,
                        name: "foo".into(),
                    },
                    FunctionName {
                        index: 1,
                        name: "bar".into(),
                    },
                ],
            })
        );
        Ok(())
    }

    #[test]
    fn unknown_name_subsection_is_skipped() -> Result<()> {
        // "name", local names subsection (2) with junk, module name subsection
        let payload = [
            0x04, b'n', b'a', b'm', b'e', 0x02, 0x03, 0xaa, 0xbb, 0xcc, 0x00, 0x02, 0x01, b'm',
        ];
        let module = Module::new(&raw_module(&[(0, &payload)]))?;
        assert_eq!(
            module.name_section(),
            Some(&NameSection {
                module_name: Some("m".into()),
                function_names: vec![],
            })
        );
        Ok(())
    }

    #[test]
    fn decode_raw_custom_section() -> Result<()> {
        let payload = [0x03, b'f', b'o', b'o', 0x01, 0x02, 0x03];
        let module = Module::new(&raw_module(&[(0, &payload)]))?;
        assert_eq!(
            module.sections,
            vec![Section::Custom(CustomSection {
                name: "foo".into(),
                payload: CustomPayload::Raw(vec![1, 2, 3]),
            })]
        );
        Ok(())
    }

    #[test]
    fn trailing_bytes_are_skipped() -> Result<()> {
        // start section padded with one extra byte, followed by a function section
        let wasm = raw_module(&[(8, &[0x00, 0x00]), (3, &[0x01, 0x00])]);
        let module = Module::new(&wasm)?;
        assert_eq!(
            module.sections,
            vec![Section::Start(0), Section::Function(vec![0])]
        );
        Ok(())
    }

    #[test]
    fn invalid_magic() {
        let err = Module::new(b"\0wsm\x01\0\0\0").unwrap_err();
        assert_eq!(err, DecodeError::InvalidMagic(*b"\0wsm"));
    }

    #[test]
    fn truncated_header() {
        let err = Module::new(b"\0asm\x01").unwrap_err();
        assert_eq!(err, DecodeError::UnexpectedEnd);
    }

    #[test]
    fn invalid_section_id() {
        let wasm = raw_module(&[(3, &[0x00]), (0x0c, &[0x00])]);
        let err = Module::new(&wasm).unwrap_err();
        assert_eq!(
            err,
            DecodeError::InvalidSectionId(0x0c).in_section(0x0c, HEADER_LEN + 3)
        );
        assert_eq!(
            err.to_string(),
            "section 12 at offset 0xb: invalid section id (12)"
        );
    }

    #[test]
    fn truncated_section() {
        let mut wasm = raw_module(&[(1, &[0x01, 0x60, 0x00, 0x00])]);
        wasm.truncate(wasm.len() - 1);
        let err = Module::new(&wasm).unwrap_err();
        assert_eq!(err.root_cause(), &DecodeError::UnexpectedEnd);
    }

    #[test]
    fn truncated_entry_inside_section() {
        // declares two types but holds one
        let wasm = raw_module(&[(1, &[0x02, 0x60, 0x00, 0x00])]);
        let err = Module::new(&wasm).unwrap_err();
        assert_eq!(err.root_cause(), &DecodeError::UnexpectedEnd);
    }

    #[test]
    fn malformed_entries() {
        let cases: [(u8, &[u8], DecodeError); 7] = [
            // import kind 4
            (
                2,
                &[0x01, 0x01, b'a', 0x01, b'b', 0x04, 0x00],
                DecodeError::InvalidExternalKind(4),
            ),
            // value type 0x7b
            (
                1,
                &[0x01, 0x60, 0x01, 0x7b, 0x00],
                DecodeError::InvalidValueType(-5),
            ),
            // type constructor other than func
            (1, &[0x01, 0x7f, 0x00, 0x00], DecodeError::InvalidTypeForm(-1)),
            // two results
            (
                1,
                &[0x01, 0x60, 0x00, 0x02, 0x7f, 0x7f],
                DecodeError::TooManyResults(2),
            ),
            // global initialised with f32.const
            (
                6,
                &[0x01, 0x7f, 0x00, 0x43, 0x00, 0x00, 0x00, 0x00, 0x0b],
                DecodeError::InvalidOpcode(0x43),
            ),
            // i32.const without end
            (
                6,
                &[0x01, 0x7f, 0x00, 0x41, 0x00, 0x01],
                DecodeError::InvalidOpcode(0x01),
            ),
            // mutability encoded in two bytes
            (
                6,
                &[0x01, 0x7f, 0x80, 0x00, 0x41, 0x00, 0x0b],
                DecodeError::MalformedEncoding {
                    width: "varuint7",
                    len: 2,
                },
            ),
        ];

        for (id, payload, want) in cases {
            let err = Module::new(&raw_module(&[(id, payload)])).unwrap_err();
            assert_eq!(err, want.in_section(id, HEADER_LEN), "section {}", id);
        }
    }

    /// Walks the stream independently and reads the entry count each
    /// counted section starts with.
    fn scan_counts(wasm: &[u8]) -> Vec<(u8, usize)> {
        let mut counts = vec![];
        let mut input = &wasm[HEADER_LEN..];
        while !input.is_empty() {
            let id = input[0];
            let size: nom::IResult<&[u8], u32> = leb128_u32(&input[1..]);
            let (rest, size) = size.unwrap();
            let (payload, rest) = rest.split_at(size as usize);
            if id != 0 && id != 8 {
                let count: nom::IResult<&[u8], u32> = leb128_u32(payload);
                counts.push((id, count.unwrap().1 as usize));
            }
            input = rest;
        }
        counts
    }

    #[test]
    fn section_counts_match_byte_scan() -> Result<()> {
        let wasm = wat::parse_str(
            r#"(module
                (import "env" "a" (func (param i32)))
                (import "env" "b" (func))
                (table 1 funcref)
                (memory 1)
                (global i32 (i32.const 7))
                (global i64 (i64.const -7))
                (func (export "main"))
                (func (param i32) (result i32) local.get 0)
                (func)
                (elem (i32.const 0) 2)
                (data (i32.const 0) "abc"))"#,
        )?;
        let module = Module::new(&wasm)?;

        let decoded: Vec<(u8, usize)> = module
            .sections
            .iter()
            .filter(|s| !matches!(s, Section::Custom(_) | Section::Start(_)))
            .map(|s| (s.code() as u8, s.len()))
            .collect();
        assert_eq!(decoded, scan_counts(&wasm));
        Ok(())
    }
}
