//! WebAssembly module parser.
//!
//! This module wraps the `wasmparser` crate to extract the parts of a
//! `.wasm` binary that a memory-only instance needs: signatures, function
//! bodies, the memory declaration, data segments, exports, and imports.
//!
//! The module is fully validated first, so later stages can rely on
//! well-typed bodies. Sections outside the supported subset (tables,
//! globals, elements, start function, non-memory imports) are rejected here
//! with a descriptive error rather than silently ignored.

use anyhow::{bail, Context, Result};
use wasmparser::{ExternalKind, FuncType, Parser, Payload, TypeRef, ValType, Validator};

/// Memory declaration (defined or imported).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryInfo {
    /// Initial size in pages (64 KiB each)
    pub initial_pages: u32,

    /// Maximum size in pages (None = unlimited, up to implementation limit)
    pub maximum_pages: Option<u32>,
}

/// An active data segment to initialize memory.
#[derive(Debug, Clone)]
pub struct DataSegment {
    /// Byte offset into memory 0 (from the i32.const in the offset expression).
    pub offset: u32,
    /// Raw data bytes to copy into memory at initialization.
    pub data: Vec<u8>,
}

/// An export from the Wasm module.
#[derive(Debug, Clone)]
pub struct ExportInfo {
    /// The exported name.
    pub name: String,
    /// What kind of item is exported.
    pub kind: ExportKind,
    /// Index into the corresponding index space.
    pub index: u32,
}

/// Kind of export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Func,
    Memory,
}

/// A memory import (the only import kind accepted).
#[derive(Debug, Clone)]
pub struct MemoryImport {
    /// The import module name (e.g., "env").
    pub module_name: String,
    /// The import field name (e.g., "memory").
    pub name: String,
    /// Limits the importer requires of the supplied memory.
    pub limits: MemoryInfo,
}

/// Parsed WebAssembly module.
#[derive(Debug, Clone)]
pub struct ParsedModule {
    /// Type section: function signatures
    pub types: Vec<FuncType>,

    /// Locally defined functions, in function index order
    pub functions: Vec<ParsedFunction>,

    /// Locally defined memory (at most one)
    pub memory: Option<MemoryInfo>,

    /// Imported memory (at most one, mutually exclusive with `memory`)
    pub memory_import: Option<MemoryImport>,

    /// Data segments for memory initialization
    pub data_segments: Vec<DataSegment>,

    /// Exports
    pub exports: Vec<ExportInfo>,
}

impl ParsedModule {
    /// Signature of a local function.
    pub fn func_type(&self, func_idx: u32) -> Option<&FuncType> {
        let func = self.functions.get(func_idx as usize)?;
        self.types.get(func.type_idx as usize)
    }

    /// The memory the module uses, defined or imported.
    pub fn memory_limits(&self) -> Option<MemoryInfo> {
        self.memory
            .or_else(|| self.memory_import.as_ref().map(|imp| imp.limits))
    }
}

/// A single function in the module.
#[derive(Debug, Clone)]
pub struct ParsedFunction {
    /// Index into the types section
    pub type_idx: u32,

    /// Local variable types (parameters are in the function type)
    pub locals: Vec<ValType>,

    /// Function body (Wasm bytecode)
    pub body: Vec<u8>,
}

fn memory_info(ty: wasmparser::MemoryType) -> Result<MemoryInfo> {
    if ty.memory64 {
        bail!("64-bit memories are not supported");
    }
    if ty.shared {
        bail!("shared memories are not supported");
    }
    let initial_pages = u32::try_from(ty.initial).context("memory initial size")?;
    let maximum_pages = ty
        .maximum
        .map(u32::try_from)
        .transpose()
        .context("memory maximum size")?;
    Ok(MemoryInfo {
        initial_pages,
        maximum_pages,
    })
}

/// Evaluate a data segment offset expression (a single `i32.const`).
fn eval_offset_expr(const_expr: wasmparser::ConstExpr) -> Result<u32> {
    let mut reader = const_expr.get_operators_reader();
    let op = reader.read().context("reading const expr operator")?;
    match op {
        wasmparser::Operator::I32Const { value } => Ok(value as u32),
        _ => bail!("Unsupported data segment offset expression: {:?}", op),
    }
}

/// Parse an active data segment, or return None for passive segments.
fn parse_data_segment(data: wasmparser::Data) -> Result<Option<DataSegment>> {
    match data.kind {
        wasmparser::DataKind::Active {
            memory_index: 0,
            offset_expr,
        } => Ok(Some(DataSegment {
            offset: eval_offset_expr(offset_expr)?,
            data: data.data.to_vec(),
        })),
        wasmparser::DataKind::Passive => {
            // Passive segments are only reachable through memory.init,
            // which is outside the accepted operator set.
            Ok(None)
        }
        wasmparser::DataKind::Active { memory_index, .. } => {
            bail!(
                "Multi-memory data segments not supported (memory_index={})",
                memory_index
            );
        }
    }
}

/// Convert an export, accepting functions and memory 0 only.
fn export_info(export: &wasmparser::Export) -> Result<ExportInfo> {
    let kind = match export.kind {
        ExternalKind::Func => ExportKind::Func,
        ExternalKind::Memory if export.index == 0 => ExportKind::Memory,
        ExternalKind::Memory => bail!(
            "Export {} refers to memory {}: only memory 0 exists",
            export.name,
            export.index
        ),
        other => bail!("Unsupported export kind {:?} for {}", other, export.name),
    };
    Ok(ExportInfo {
        name: export.name.to_string(),
        kind,
        index: export.index,
    })
}

/// Parse a function code section entry, extracting locals and bytecode.
fn parse_code_entry(body: wasmparser::FunctionBody, type_idx: u32) -> Result<ParsedFunction> {
    let mut locals = Vec::new();
    let locals_reader = body.get_locals_reader().context("getting locals reader")?;
    for local in locals_reader {
        let (count, val_type) = local.context("reading local")?;
        for _ in 0..count {
            locals.push(val_type);
        }
    }

    // Operators are kept as raw bytes and decoded when the instance is built.
    let operators_reader = body
        .get_operators_reader()
        .context("getting operators reader")?;
    let mut binary_reader = operators_reader.get_binary_reader();
    let remaining = binary_reader.bytes_remaining();
    let body_bytes = binary_reader
        .read_bytes(remaining)
        .context("reading body bytes")?;

    Ok(ParsedFunction {
        type_idx,
        locals,
        body: body_bytes.to_vec(),
    })
}

/// Validate and parse a WebAssembly binary into a structured module.
pub fn parse_wasm(wasm_bytes: &[u8]) -> Result<ParsedModule> {
    Validator::new()
        .validate_all(wasm_bytes)
        .context("module failed validation")?;

    let parser = Parser::new(0);

    let mut types = Vec::new();
    let mut function_types: Vec<u32> = Vec::new(); // type index for each function
    let mut functions = Vec::new();
    let mut memory: Option<MemoryInfo> = None;
    let mut memory_import: Option<MemoryImport> = None;
    let mut data_segments = Vec::new();
    let mut exports = Vec::new();

    for payload in parser.parse_all(wasm_bytes) {
        let payload = payload.context("parsing wasm payload")?;

        match payload {
            Payload::TypeSection(reader) => {
                for rec_group in reader {
                    let rec_group = rec_group.context("reading rec group")?;
                    for sub_type in rec_group.types() {
                        match &sub_type.composite_type.inner {
                            wasmparser::CompositeInnerType::Func(func_ty) => {
                                types.push(func_ty.clone());
                            }
                            _ => bail!("Only function types are supported"),
                        }
                    }
                }
            }

            Payload::ImportSection(reader) => {
                for import in reader {
                    let import = import.context("reading import")?;
                    match import.ty {
                        TypeRef::Memory(mem_ty) => {
                            if memory_import.is_some() {
                                bail!(
                                    "Second memory import {}.{}: only one memory is supported",
                                    import.module,
                                    import.name
                                );
                            }
                            memory_import = Some(MemoryImport {
                                module_name: import.module.to_string(),
                                name: import.name.to_string(),
                                limits: memory_info(mem_ty)?,
                            });
                        }
                        other => bail!(
                            "Unsupported import {}.{} ({:?}): only memory imports are accepted",
                            import.module,
                            import.name,
                            other
                        ),
                    }
                }
            }

            Payload::FunctionSection(reader) => {
                for func_type_idx in reader {
                    let func_type_idx = func_type_idx.context("reading function type index")?;
                    function_types.push(func_type_idx);
                }
            }

            Payload::CodeSectionEntry(body) => {
                let type_idx = *function_types
                    .get(functions.len())
                    .context("code entry without a matching function declaration")?;
                let parsed_func = parse_code_entry(body, type_idx)?;
                functions.push(parsed_func);
            }

            Payload::MemorySection(reader) => {
                if reader.count() > 1 {
                    bail!(
                        "{} memories defined: only one memory is supported",
                        reader.count()
                    );
                }
                if memory_import.is_some() && reader.count() > 0 {
                    bail!(
                        "Module both imports and defines a memory: only one memory is supported"
                    );
                }
                if let Some(mem) = reader.into_iter().next() {
                    let memory_type = mem.context("reading memory type")?;
                    memory = Some(memory_info(memory_type)?);
                }
            }

            Payload::TableSection(_) => bail!("Tables are not supported"),
            Payload::ElementSection(_) => bail!("Element segments are not supported"),
            Payload::GlobalSection(_) => bail!("Globals are not supported"),
            Payload::StartSection { .. } => bail!("Start functions are not supported"),
            Payload::TagSection(_) => bail!("Exception tags are not supported"),

            Payload::ExportSection(reader) => {
                for export in reader {
                    let export = export.context("reading export")?;
                    exports.push(export_info(&export)?);
                }
            }

            Payload::DataSection(reader) => {
                for data in reader {
                    let data = data.context("reading data segment")?;
                    if let Some(segment) = parse_data_segment(data)? {
                        data_segments.push(segment);
                    }
                }
            }

            _ => {}
        }
    }

    Ok(ParsedModule {
        types,
        functions,
        memory,
        memory_import,
        data_segments,
        exports,
    })
}
