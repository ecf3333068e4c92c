// Segment resolution and push/pop emission.
//
// Direct segments (temp, pointer, static) resolve to an address at
// translation time; indirect segments (local, argument, this, that) go
// through their base pointer cell at run time.

use super::emitter::AsmEmitter;
use crate::abi::{MAX_CONSTANT, POINTER_BASE, POINTER_SIZE, TEMP_BASE, TEMP_SIZE};
use crate::error::Location;
use crate::hack::{Address, Comp, Dest, Instruction};
use crate::vm::Segment;
use crate::{Error, Result};

/// How a `(segment, index)` pair is reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentAccess {
    /// `constant n`: the value itself, no memory access.
    Constant(u16),
    /// A fixed RAM address or a unit-scoped static symbol.
    Direct(Address),
    /// `RAM[RAM[base] + index]`.
    Indirect { base: &'static str, index: u16 },
}

/// Resolve `(segment, index)` within translation unit `unit`.
pub fn resolve(
    segment: Segment,
    index: u16,
    unit: &str,
    location: &Location,
) -> Result<SegmentAccess> {
    let out_of_range = |max: u16| Error::IndexOutOfRange {
        location: location.clone(),
        segment,
        index,
        max,
    };
    // The offset is loaded with an A-instruction.
    let indirect = |base: &'static str| {
        if index > MAX_CONSTANT {
            return Err(out_of_range(MAX_CONSTANT));
        }
        Ok(SegmentAccess::Indirect { base, index })
    };

    let access = match segment {
        Segment::Constant => {
            if index > MAX_CONSTANT {
                return Err(out_of_range(MAX_CONSTANT));
            }
            SegmentAccess::Constant(index)
        }
        Segment::Temp => {
            if index >= TEMP_SIZE {
                return Err(out_of_range(TEMP_SIZE - 1));
            }
            SegmentAccess::Direct(Address::Constant(TEMP_BASE + index))
        }
        Segment::Pointer => {
            if index >= POINTER_SIZE {
                return Err(out_of_range(POINTER_SIZE - 1));
            }
            SegmentAccess::Direct(Address::Constant(POINTER_BASE + index))
        }
        Segment::Static => SegmentAccess::Direct(Address::Symbol(static_symbol(unit, index))),
        Segment::Local => indirect("LCL")?,
        Segment::Argument => indirect("ARG")?,
        Segment::This => indirect("THIS")?,
        Segment::That => indirect("THAT")?,
    };
    Ok(access)
}

/// Assembler symbol for `static index` in `unit`.
///
/// The assembler allocates each distinct symbol its own cell from RAM 16
/// upward, so equal indices in different units never alias.
pub fn static_symbol(unit: &str, index: u16) -> String {
    format!("{unit}.{index}")
}

/// Push the value of `access` onto the stack.
pub fn emit_push(e: &mut AsmEmitter, access: &SegmentAccess) {
    match access {
        SegmentAccess::Constant(value) => e.load_constant_d(*value),
        SegmentAccess::Direct(address) => {
            e.emit(Instruction::At(address.clone()));
            e.assign(Dest::D, Comp::M);
        }
        SegmentAccess::Indirect { base, index: 0 } => {
            e.at(base);
            e.assign(Dest::A, Comp::M);
            e.assign(Dest::D, Comp::M);
        }
        SegmentAccess::Indirect { base, index } => {
            e.load_d(base);
            e.at_const(*index);
            e.assign(Dest::A, Comp::DPlusA);
            e.assign(Dest::D, Comp::M);
        }
    }
    e.push_d();
}

/// Pop the top of stack into `access`.
///
/// Indirect segments with a non-zero index compute the target address into
/// R13 before popping, since popping needs both A and D.
pub fn emit_pop(e: &mut AsmEmitter, access: &SegmentAccess) -> Result<()> {
    match access {
        SegmentAccess::Constant(_) => {
            return Err(Error::Internal(
                "pop into the constant segment reached code generation".to_string(),
            ));
        }
        SegmentAccess::Direct(address) => {
            e.pop_d();
            e.emit(Instruction::At(address.clone()));
            e.assign(Dest::M, Comp::D);
        }
        SegmentAccess::Indirect { base, index: 0 } => {
            e.pop_d();
            e.at(base);
            e.assign(Dest::A, Comp::M);
            e.assign(Dest::M, Comp::D);
        }
        SegmentAccess::Indirect { base, index } => {
            e.load_d(base);
            e.at_const(*index);
            e.assign(Dest::D, Comp::DPlusA);
            e.store_d("R13");
            e.pop_d();
            e.at("R13");
            e.assign(Dest::A, Comp::M);
            e.assign(Dest::M, Comp::D);
        }
    }
    Ok(())
}
