//! Operator decoding - converts WebAssembly bytecode into [`Instr`]s.

use anyhow::{bail, Context, Result};
use wasmparser::{FuncType, MemArg, Operator};

use super::{CompiledFunction, Instr, LoadOp, StoreOp};
use crate::parser::ParsedFunction;
use crate::value::{Value, ValueType};

/// Decode a validated function body into a [`CompiledFunction`].
pub fn compile_function(func: &ParsedFunction, ty: &FuncType) -> Result<CompiledFunction> {
    let params = ty
        .params()
        .iter()
        .map(|t| ValueType::from_wasmparser(*t))
        .collect::<Result<Vec<_>>>()?;
    let results = ty
        .results()
        .iter()
        .map(|t| ValueType::from_wasmparser(*t))
        .collect::<Result<Vec<_>>>()?;
    let locals = func
        .locals
        .iter()
        .map(|t| ValueType::from_wasmparser(*t))
        .collect::<Result<Vec<_>>>()?;

    let mut code = Vec::new();
    let mut reader = wasmparser::BinaryReader::new(&func.body, 0);
    while !reader.eof() {
        let op = reader.read_operator().context("failed to read operator")?;
        match op {
            // Without blocks, the only `end` is the one closing the body.
            Operator::End => break,
            op => code.push(translate_operator(&op)?),
        }
    }

    Ok(CompiledFunction {
        params,
        results,
        locals,
        code,
    })
}

fn memarg_offset(memarg: &MemArg) -> Result<u64> {
    if memarg.memory != 0 {
        bail!("multi-memory access (memory {}) not supported", memarg.memory);
    }
    Ok(memarg.offset)
}

fn load(op: LoadOp, memarg: &MemArg) -> Result<Instr> {
    Ok(Instr::Load {
        op,
        offset: memarg_offset(memarg)?,
    })
}

fn store(op: StoreOp, memarg: &MemArg) -> Result<Instr> {
    Ok(Instr::Store {
        op,
        offset: memarg_offset(memarg)?,
    })
}

/// Translate a single Wasm operator.
fn translate_operator(op: &Operator) -> Result<Instr> {
    Ok(match op {
        Operator::Unreachable => Instr::Unreachable,
        Operator::Nop => Instr::Nop,
        Operator::Drop => Instr::Drop,
        Operator::Return => Instr::Return,

        Operator::LocalGet { local_index } => Instr::LocalGet(*local_index),
        Operator::LocalSet { local_index } => Instr::LocalSet(*local_index),
        Operator::LocalTee { local_index } => Instr::LocalTee(*local_index),

        Operator::I32Const { value } => Instr::Const(Value::I32(*value)),
        Operator::I64Const { value } => Instr::Const(Value::I64(*value)),
        Operator::F32Const { value } => Instr::Const(Value::F32(f32::from_bits(value.bits()))),
        Operator::F64Const { value } => Instr::Const(Value::F64(f64::from_bits(value.bits()))),

        // Address arithmetic
        Operator::I32Add => Instr::I32Add,
        Operator::I32Sub => Instr::I32Sub,
        Operator::I64Add => Instr::I64Add,

        Operator::I32Load { memarg } => load(LoadOp::I32Load, memarg)?,
        Operator::I64Load { memarg } => load(LoadOp::I64Load, memarg)?,
        Operator::F32Load { memarg } => load(LoadOp::F32Load, memarg)?,
        Operator::F64Load { memarg } => load(LoadOp::F64Load, memarg)?,
        Operator::I32Load8S { memarg } => load(LoadOp::I32Load8S, memarg)?,
        Operator::I32Load8U { memarg } => load(LoadOp::I32Load8U, memarg)?,
        Operator::I32Load16S { memarg } => load(LoadOp::I32Load16S, memarg)?,
        Operator::I32Load16U { memarg } => load(LoadOp::I32Load16U, memarg)?,
        Operator::I64Load8S { memarg } => load(LoadOp::I64Load8S, memarg)?,
        Operator::I64Load8U { memarg } => load(LoadOp::I64Load8U, memarg)?,
        Operator::I64Load16S { memarg } => load(LoadOp::I64Load16S, memarg)?,
        Operator::I64Load16U { memarg } => load(LoadOp::I64Load16U, memarg)?,
        Operator::I64Load32S { memarg } => load(LoadOp::I64Load32S, memarg)?,
        Operator::I64Load32U { memarg } => load(LoadOp::I64Load32U, memarg)?,

        Operator::I32Store { memarg } => store(StoreOp::I32Store, memarg)?,
        Operator::I64Store { memarg } => store(StoreOp::I64Store, memarg)?,
        Operator::F32Store { memarg } => store(StoreOp::F32Store, memarg)?,
        Operator::F64Store { memarg } => store(StoreOp::F64Store, memarg)?,
        Operator::I32Store8 { memarg } => store(StoreOp::I32Store8, memarg)?,
        Operator::I32Store16 { memarg } => store(StoreOp::I32Store16, memarg)?,
        Operator::I64Store8 { memarg } => store(StoreOp::I64Store8, memarg)?,
        Operator::I64Store16 { memarg } => store(StoreOp::I64Store16, memarg)?,
        Operator::I64Store32 { memarg } => store(StoreOp::I64Store32, memarg)?,

        Operator::MemorySize { mem: 0 } => Instr::MemorySize,
        Operator::MemoryGrow { mem: 0 } => Instr::MemoryGrow,
        Operator::MemoryFill { mem: 0 } => Instr::MemoryFill,
        Operator::MemoryCopy {
            dst_mem: 0,
            src_mem: 0,
        } => Instr::MemoryCopy,

        other => bail!("unsupported operator {:?}", other),
    })
}
