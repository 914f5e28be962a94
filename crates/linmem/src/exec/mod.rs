//! Straight-line executor for memory-access functions.
//!
//! Function bodies are decoded once, at instantiation, from Wasm operators
//! into [`Instr`]; only the memory-access subset is accepted (constants,
//! locals, address arithmetic, every MVP load/store, `memory.size`,
//! `memory.grow`, `memory.fill`, `memory.copy`). Anything else, control
//! flow included, is rejected while compiling so it can never be
//! mis-executed.
//!
//! Every load and store goes through `LinearMemory`, so bounds checking is
//! never duplicated here. A trap is returned as a [`Trap`] wrapped in
//! `anyhow::Error`; callers recover it with `downcast_ref::<Trap>()`.

mod compile;

pub use compile::compile_function;

use anyhow::{bail, Context, Result};
use linmem_runtime::{effective_address, LinearMemory, Trap};

use crate::value::{Value, ValueType};

/// Sub-width and full-width loads, named after their Wasm opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOp {
    I32Load,
    I64Load,
    F32Load,
    F64Load,
    I32Load8S,
    I32Load8U,
    I32Load16S,
    I32Load16U,
    I64Load8S,
    I64Load8U,
    I64Load16S,
    I64Load16U,
    I64Load32S,
    I64Load32U,
}

/// Sub-width and full-width stores, named after their Wasm opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    I32Store,
    I64Store,
    F32Store,
    F64Store,
    I32Store8,
    I32Store16,
    I64Store8,
    I64Store16,
    I64Store32,
}

/// A decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Instr {
    Unreachable,
    Nop,
    Drop,
    Return,
    LocalGet(u32),
    LocalSet(u32),
    LocalTee(u32),
    Const(Value),
    I32Add,
    I32Sub,
    I64Add,
    Load { op: LoadOp, offset: u64 },
    Store { op: StoreOp, offset: u64 },
    MemorySize,
    MemoryGrow,
    MemoryFill,
    MemoryCopy,
}

/// A function ready to run.
#[derive(Debug, Clone)]
pub struct CompiledFunction {
    pub params: Vec<ValueType>,
    pub results: Vec<ValueType>,
    /// Declared locals, excluding parameters.
    pub locals: Vec<ValueType>,
    pub code: Vec<Instr>,
}

impl CompiledFunction {
    /// Whether any instruction needs a linear memory.
    pub fn uses_memory(&self) -> bool {
        self.code.iter().any(|instr| {
            matches!(
                instr,
                Instr::Load { .. }
                    | Instr::Store { .. }
                    | Instr::MemorySize
                    | Instr::MemoryGrow
                    | Instr::MemoryFill
                    | Instr::MemoryCopy
            )
        })
    }
}

/// Operand stack plus locals for one activation.
struct Frame {
    locals: Vec<Value>,
    stack: Vec<Value>,
}

impl Frame {
    fn pop(&mut self) -> Result<Value> {
        self.stack.pop().context("operand stack underflow")
    }

    fn pop_i32(&mut self) -> Result<i32> {
        match self.pop()? {
            Value::I32(v) => Ok(v),
            other => bail!("expected i32 operand, found {}", other.ty()),
        }
    }

    fn pop_i64(&mut self) -> Result<i64> {
        match self.pop()? {
            Value::I64(v) => Ok(v),
            other => bail!("expected i64 operand, found {}", other.ty()),
        }
    }

    fn pop_f32(&mut self) -> Result<f32> {
        match self.pop()? {
            Value::F32(v) => Ok(v),
            other => bail!("expected f32 operand, found {}", other.ty()),
        }
    }

    fn pop_f64(&mut self) -> Result<f64> {
        match self.pop()? {
            Value::F64(v) => Ok(v),
            other => bail!("expected f64 operand, found {}", other.ty()),
        }
    }

    /// Pop an i32 address operand and add the static `memarg` offset.
    fn pop_addr(&mut self, offset: u64) -> Result<u64> {
        Ok(effective_address(self.pop_i32()? as u32, offset))
    }

    fn local(&mut self, idx: u32) -> Result<&mut Value> {
        self.locals
            .get_mut(idx as usize)
            .with_context(|| format!("local index {idx} out of bounds"))
    }
}

/// Run `func` with `args` against `memory`.
///
/// Argument count and types must already match `func.params`.
pub fn execute(
    func: &CompiledFunction,
    args: &[Value],
    mut memory: Option<&mut LinearMemory>,
) -> Result<Vec<Value>> {
    let mut frame = Frame {
        locals: args
            .iter()
            .copied()
            .chain(func.locals.iter().map(|ty| ty.zero()))
            .collect(),
        stack: Vec::new(),
    };

    for instr in &func.code {
        match *instr {
            Instr::Unreachable => return Err(Trap::Unreachable.into()),
            Instr::Nop => {}
            Instr::Drop => {
                frame.pop()?;
            }
            Instr::Return => break,
            Instr::LocalGet(idx) => {
                let value = *frame.local(idx)?;
                frame.stack.push(value);
            }
            Instr::LocalSet(idx) => {
                let value = frame.pop()?;
                *frame.local(idx)? = value;
            }
            Instr::LocalTee(idx) => {
                let value = frame.pop()?;
                *frame.local(idx)? = value;
                frame.stack.push(value);
            }
            Instr::Const(value) => frame.stack.push(value),
            Instr::I32Add => {
                let rhs = frame.pop_i32()?;
                let lhs = frame.pop_i32()?;
                frame.stack.push(Value::I32(lhs.wrapping_add(rhs)));
            }
            Instr::I32Sub => {
                let rhs = frame.pop_i32()?;
                let lhs = frame.pop_i32()?;
                frame.stack.push(Value::I32(lhs.wrapping_sub(rhs)));
            }
            Instr::I64Add => {
                let rhs = frame.pop_i64()?;
                let lhs = frame.pop_i64()?;
                frame.stack.push(Value::I64(lhs.wrapping_add(rhs)));
            }
            Instr::Load { op, offset } => {
                let mem = require_memory(&mut memory)?;
                let addr = frame.pop_addr(offset)?;
                frame.stack.push(load(mem, op, addr)?);
            }
            Instr::Store { op, offset } => {
                let mem = require_memory(&mut memory)?;
                store(mem, &mut frame, op, offset)?;
            }
            Instr::MemorySize => {
                let mem = require_memory(&mut memory)?;
                frame.stack.push(Value::I32(mem.memory_size()));
            }
            Instr::MemoryGrow => {
                let mem = require_memory(&mut memory)?;
                let delta = frame.pop_i32()? as u32;
                frame.stack.push(Value::I32(mem.memory_grow(delta)));
            }
            Instr::MemoryFill => {
                let mem = require_memory(&mut memory)?;
                let len = frame.pop_i32()? as u32;
                let value = frame.pop_i32()? as u8;
                let dst = frame.pop_i32()? as u32;
                mem.memory_fill(dst.into(), value, len.into())?;
            }
            Instr::MemoryCopy => {
                let mem = require_memory(&mut memory)?;
                let len = frame.pop_i32()? as u32;
                let src = frame.pop_i32()? as u32;
                let dst = frame.pop_i32()? as u32;
                mem.memory_copy(dst.into(), src.into(), len.into())?;
            }
        }
    }

    let arity = func.results.len();
    if frame.stack.len() < arity {
        bail!(
            "function left {} value(s) on the stack, expected {}",
            frame.stack.len(),
            arity
        );
    }
    Ok(frame.stack.split_off(frame.stack.len() - arity))
}

fn require_memory<'a>(memory: &'a mut Option<&mut LinearMemory>) -> Result<&'a mut LinearMemory> {
    memory
        .as_deref_mut()
        .context("memory instruction executed without a linear memory")
}

fn load(mem: &LinearMemory, op: LoadOp, addr: u64) -> Result<Value> {
    Ok(match op {
        LoadOp::I32Load => Value::I32(mem.load_i32(addr)?),
        LoadOp::I64Load => Value::I64(mem.load_i64(addr)?),
        LoadOp::F32Load => Value::F32(mem.load_f32(addr)?),
        LoadOp::F64Load => Value::F64(mem.load_f64(addr)?),
        LoadOp::I32Load8S => Value::I32(mem.load_i8(addr)?.into()),
        LoadOp::I32Load8U => Value::I32(mem.load_u8(addr)?.into()),
        LoadOp::I32Load16S => Value::I32(mem.load_i16(addr)?.into()),
        LoadOp::I32Load16U => Value::I32(mem.load_u16(addr)?.into()),
        LoadOp::I64Load8S => Value::I64(mem.load_i8(addr)?.into()),
        LoadOp::I64Load8U => Value::I64(mem.load_u8(addr)?.into()),
        LoadOp::I64Load16S => Value::I64(mem.load_i16(addr)?.into()),
        LoadOp::I64Load16U => Value::I64(mem.load_u16(addr)?.into()),
        LoadOp::I64Load32S => Value::I64(mem.load_i32(addr)?.into()),
        LoadOp::I64Load32U => Value::I64(mem.load_u32(addr)?.into()),
    })
}

fn store(mem: &mut LinearMemory, frame: &mut Frame, op: StoreOp, offset: u64) -> Result<()> {
    // The value is on top of the stack, the address below it.
    match op {
        StoreOp::I32Store => {
            let v = frame.pop_i32()?;
            mem.store_i32(frame.pop_addr(offset)?, v)?;
        }
        StoreOp::I64Store => {
            let v = frame.pop_i64()?;
            mem.store_i64(frame.pop_addr(offset)?, v)?;
        }
        StoreOp::F32Store => {
            let v = frame.pop_f32()?;
            mem.store_f32(frame.pop_addr(offset)?, v)?;
        }
        StoreOp::F64Store => {
            let v = frame.pop_f64()?;
            mem.store_f64(frame.pop_addr(offset)?, v)?;
        }
        StoreOp::I32Store8 => {
            let v = frame.pop_i32()?;
            mem.store_u8(frame.pop_addr(offset)?, v as u8)?;
        }
        StoreOp::I32Store16 => {
            let v = frame.pop_i32()?;
            mem.store_u16(frame.pop_addr(offset)?, v as u16)?;
        }
        StoreOp::I64Store8 => {
            let v = frame.pop_i64()?;
            mem.store_u8(frame.pop_addr(offset)?, v as u8)?;
        }
        StoreOp::I64Store16 => {
            let v = frame.pop_i64()?;
            mem.store_u16(frame.pop_addr(offset)?, v as u16)?;
        }
        StoreOp::I64Store32 => {
            let v = frame.pop_i64()?;
            mem.store_i32(frame.pop_addr(offset)?, v as i32)?;
        }
    }
    Ok(())
}
