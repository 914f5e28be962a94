//! Module instances — memory ownership, import resolution, and exports.
//!
//! An [`Instance`] owns its linear memory (defined by the module, or moved
//! in through [`Imports`]) together with the decoded functions. The export
//! map is resolved once at instantiation: each export name maps to a typed
//! [`Export`], so calling by name is a single map lookup.

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use linmem_runtime::LinearMemory;
use tracing::{debug, trace};

use crate::exec::{compile_function, execute, CompiledFunction};
use crate::parser::{parse_wasm, ExportKind, MemoryInfo, ParsedModule};
use crate::value::{Value, ValueType};

/// Instantiation options.
#[derive(Debug, Clone, Default)]
pub struct InstanceOptions {
    /// Growth cap applied when the module declares no memory maximum.
    /// `None` leaves the wasm32 address-space limit as the only bound.
    pub default_max_pages: Option<u32>,
}

/// Host-provided imports. Only memories can be imported.
#[derive(Debug, Default)]
pub struct Imports {
    memories: BTreeMap<(String, String), LinearMemory>,
}

impl Imports {
    /// The empty import object.
    pub fn new() -> Self {
        Self::default()
    }

    /// Provide `memory` for the import `module.name`.
    pub fn with_memory(mut self, module: &str, name: &str, memory: LinearMemory) -> Self {
        self.define_memory(module, name, memory);
        self
    }

    /// Provide `memory` for the import `module.name`, replacing any previous definition.
    pub fn define_memory(&mut self, module: &str, name: &str, memory: LinearMemory) {
        self.memories
            .insert((module.to_string(), name.to_string()), memory);
    }

    fn take_memory(&mut self, module: &str, name: &str) -> Option<LinearMemory> {
        self.memories
            .remove(&(module.to_string(), name.to_string()))
    }
}

/// Handle to an exported or internal function of one instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FuncHandle(u32);

impl FuncHandle {
    /// Index in the module's function index space.
    pub fn index(self) -> u32 {
        self.0
    }
}

/// A resolved export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Export {
    Func(FuncHandle),
    Memory,
}

/// An instantiated module.
#[derive(Debug)]
pub struct Instance {
    memory: Option<LinearMemory>,
    functions: Vec<CompiledFunction>,
    exports: BTreeMap<String, Export>,
}

impl Instance {
    /// Validate, decode, and instantiate a module.
    ///
    /// Steps: parse and validate, resolve the memory (defined or imported),
    /// apply active data segments, decode function bodies, build the
    /// export map.
    pub fn instantiate(
        wasm_bytes: &[u8],
        imports: Imports,
        options: &InstanceOptions,
    ) -> Result<Self> {
        let parsed = parse_wasm(wasm_bytes).context("failed to parse WebAssembly module")?;
        Self::from_parsed(&parsed, imports, options)
    }

    /// Instantiate an already parsed module.
    pub fn from_parsed(
        parsed: &ParsedModule,
        mut imports: Imports,
        options: &InstanceOptions,
    ) -> Result<Self> {
        let mut memory = resolve_memory(parsed, &mut imports, options)?;

        if let Some(mem) = memory.as_mut() {
            for (i, segment) in parsed.data_segments.iter().enumerate() {
                mem.init_data(u64::from(segment.offset), &segment.data)
                    .with_context(|| format!("data segment {i} does not fit in memory"))?;
            }
        } else if !parsed.data_segments.is_empty() {
            bail!("data segments present but module has no memory");
        }

        let functions = parsed
            .functions
            .iter()
            .enumerate()
            .map(|(idx, func)| {
                let ty = parsed.types.get(func.type_idx as usize).with_context(|| {
                    format!("function {idx} has unknown type {}", func.type_idx)
                })?;
                compile_function(func, ty)
                    .with_context(|| format!("failed to decode function {idx}"))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut exports = BTreeMap::new();
        for export in &parsed.exports {
            let resolved = match export.kind {
                ExportKind::Func => {
                    if export.index as usize >= functions.len() {
                        bail!(
                            "export {} refers to missing function {}",
                            export.name,
                            export.index
                        );
                    }
                    Export::Func(FuncHandle(export.index))
                }
                ExportKind::Memory => Export::Memory,
            };
            exports.insert(export.name.clone(), resolved);
        }

        debug!(
            pages = memory.as_ref().map(LinearMemory::page_count),
            max_pages = memory.as_ref().and_then(LinearMemory::max_pages),
            functions = functions.len(),
            exports = exports.len(),
            "instantiated module"
        );

        Ok(Self {
            memory,
            functions,
            exports,
        })
    }

    /// All exports, in name order.
    pub fn exports(&self) -> impl Iterator<Item = (&str, Export)> + '_ {
        self.exports.iter().map(|(name, export)| (name.as_str(), *export))
    }

    /// Look up an exported function by name.
    pub fn func(&self, name: &str) -> Result<FuncHandle> {
        match self.exports.get(name) {
            Some(Export::Func(handle)) => Ok(*handle),
            Some(Export::Memory) => bail!("export {name} is a memory, not a function"),
            None => bail!("no export named {name}"),
        }
    }

    /// Parameter and result types of `handle`.
    pub fn signature(&self, handle: FuncHandle) -> Result<(&[ValueType], &[ValueType])> {
        let func = self.function(handle)?;
        Ok((func.params.as_slice(), func.results.as_slice()))
    }

    fn function(&self, handle: FuncHandle) -> Result<&CompiledFunction> {
        self.functions
            .get(handle.0 as usize)
            .with_context(|| format!("invalid function handle {}", handle.0))
    }

    /// Call a function.
    ///
    /// Argument mismatches are reported as host errors. A trap is returned
    /// unchanged as a `linmem_runtime::Trap` inside the error; the instance
    /// stays usable afterwards and memory is as it was before the trapping
    /// access.
    pub fn invoke(&mut self, handle: FuncHandle, args: &[Value]) -> Result<Vec<Value>> {
        let func = self
            .functions
            .get(handle.0 as usize)
            .with_context(|| format!("invalid function handle {}", handle.0))?;

        if args.len() != func.params.len() {
            bail!(
                "function {} expects {} argument(s), got {}",
                handle.0,
                func.params.len(),
                args.len()
            );
        }
        for (i, (arg, ty)) in args.iter().zip(&func.params).enumerate() {
            if arg.ty() != *ty {
                bail!(
                    "argument {i} of function {} must be {ty}, got {}",
                    handle.0,
                    arg.ty()
                );
            }
        }

        trace!(func = handle.0, ?args, "invoke");
        execute(func, args, self.memory.as_mut())
    }

    /// Look up `name` and call it.
    pub fn call(&mut self, name: &str, args: &[Value]) -> Result<Vec<Value>> {
        let handle = self.func(name)?;
        self.invoke(handle, args)
    }

    /// The instance's linear memory, if it has one.
    pub fn memory(&self) -> Option<&LinearMemory> {
        self.memory.as_ref()
    }

    pub fn memory_mut(&mut self) -> Option<&mut LinearMemory> {
        self.memory.as_mut()
    }

    /// Tear the instance down and hand its memory back to the host.
    pub fn into_memory(self) -> Option<LinearMemory> {
        self.memory
    }
}

/// Create the module's own memory or take the imported one.
fn resolve_memory(
    parsed: &ParsedModule,
    imports: &mut Imports,
    options: &InstanceOptions,
) -> Result<Option<LinearMemory>> {
    if let Some(import) = &parsed.memory_import {
        let memory = imports
            .take_memory(&import.module_name, &import.name)
            .with_context(|| {
                format!(
                    "unresolved memory import {}.{}",
                    import.module_name, import.name
                )
            })?;
        check_import_limits(&memory, import.limits).with_context(|| {
            format!(
                "incompatible memory import {}.{}",
                import.module_name, import.name
            )
        })?;
        return Ok(Some(memory));
    }

    match parsed.memory {
        Some(info) => {
            let max = info.maximum_pages.or(options.default_max_pages);
            let memory = LinearMemory::try_new(info.initial_pages, max)
                .map_err(anyhow::Error::from)
                .context("failed to create linear memory")?;
            Ok(Some(memory))
        }
        None => Ok(None),
    }
}

/// Wasm import matching: the supplied memory must be at least as large as
/// the declared minimum and no more growable than the declared maximum.
fn check_import_limits(memory: &LinearMemory, limits: MemoryInfo) -> Result<()> {
    if memory.page_count() < limits.initial_pages {
        bail!(
            "memory has {} page(s), import requires at least {}",
            memory.page_count(),
            limits.initial_pages
        );
    }
    if let Some(required_max) = limits.maximum_pages {
        match memory.max_pages() {
            Some(max) if max <= required_max => {}
            Some(max) => bail!("memory maximum {max} exceeds import maximum {required_max}"),
            None => bail!("memory has no maximum, import requires at most {required_max}"),
        }
    }
    Ok(())
}
