// Call protocol: call, function entry and return.
//
// Frame layout after a call with n arguments, in ascending addresses:
//
//   ARG ->  arg 0 .. arg n-1
//           return address
//           saved LCL, ARG, THIS, THAT
//   LCL ->  local 0 .. local k-1   (zeroed on entry)
//           working stack
//
// There is no frame object; every offset is relative to the SP at call
// time, so recursive activations simply occupy different addresses.

use super::emitter::AsmEmitter;
use crate::abi::{FRAME_SAVED_WORDS, RETURN_ADDRESS_OFFSET, SAVED_POINTERS};
use crate::hack::{Comp, Dest};

/// Save the caller's frame and reposition ARG/LCL for the callee.
///
/// Expects the return address in D. Leaves control falling through; the
/// caller of this helper emits the jump into the callee.
pub fn emit_frame_save(e: &mut AsmEmitter, n_args: u16) {
    e.push_d();
    for (pointer, _) in SAVED_POINTERS {
        e.load_d(pointer);
        e.push_d();
    }

    // LCL = SP
    e.load_d("SP");
    e.store_d("LCL");

    // ARG = SP - n_args - 5
    e.at_const(n_args.saturating_add(FRAME_SAVED_WORDS));
    e.assign(Dest::D, Comp::DMinusA);
    e.store_d("ARG");
}

/// Complete inline call sequence: save the frame, jump to `callee`, and
/// define `return_label` where the callee's return lands.
pub fn emit_call(e: &mut AsmEmitter, callee: &str, n_args: u16, return_label: &str) {
    e.load_address_d(return_label);
    emit_frame_save(e, n_args);
    e.jump_to(callee);
    e.define_label(return_label);
}

/// Push `n_locals` zero words starting at SP.
pub fn emit_zero_locals(e: &mut AsmEmitter, n_locals: u16) {
    match n_locals {
        0 => {}
        1 => {
            e.at("SP");
            e.assign(Dest::AM, Comp::MPlusOne);
            e.assign(Dest::A, Comp::AMinusOne);
            e.assign(Dest::M, Comp::Zero);
        }
        n => {
            e.at("SP");
            e.assign(Dest::A, Comp::M);
            for _ in 0..n {
                e.assign(Dest::M, Comp::Zero);
                e.assign(Dest::A, Comp::APlusOne);
            }
            e.assign(Dest::D, Comp::A);
            e.store_d("SP");
        }
    }
}

/// Tear down the current frame and jump back to the caller.
///
/// R13 holds the frame base (the callee's LCL) for the whole sequence and
/// every saved pointer is read relative to it, never through ARG or LCL,
/// which are being overwritten.
pub fn emit_return(e: &mut AsmEmitter) {
    // R13 = frame
    e.load_d("LCL");
    e.store_d("R13");

    // R14 = *(frame - 5), before the return value can overwrite it
    e.at_const(RETURN_ADDRESS_OFFSET);
    e.assign(Dest::A, Comp::DMinusA);
    e.assign(Dest::D, Comp::M);
    e.store_d("R14");

    // *ARG = pop()
    e.pop_d();
    e.at("ARG");
    e.assign(Dest::A, Comp::M);
    e.assign(Dest::M, Comp::D);

    // SP = ARG + 1
    e.at("ARG");
    e.assign(Dest::D, Comp::MPlusOne);
    e.store_d("SP");

    // THAT, THIS, ARG, LCL = *(frame - 1) .. *(frame - 4)
    for (pointer, _) in SAVED_POINTERS.iter().rev() {
        e.at("R13");
        e.assign(Dest::AM, Comp::MMinusOne);
        e.assign(Dest::D, Comp::M);
        e.store_d(pointer);
    }

    e.jump_indirect("R14");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_locals_count() {
        for n in 0..5u16 {
            let mut e = AsmEmitter::new();
            emit_zero_locals(&mut e, n);
            let zeroes = e
                .into_program()
                .to_string()
                .lines()
                .filter(|l| *l == "M=0")
                .count();
            assert_eq!(zeroes, n as usize);
        }
    }

    #[test]
    fn test_call_defines_return_label_after_jump() {
        let mut e = AsmEmitter::new();
        emit_call(&mut e, "Main.f", 2, "__ret.0");
        let text = e.into_program().to_string();
        assert!(text.starts_with("@__ret.0\nD=A\n"), "{text}");
        assert!(text.ends_with("@Main.f\n0;JMP\n(__ret.0)\n"), "{text}");
        assert!(text.contains("@7\nD=D-A\n@ARG\nM=D\n"), "{text}");
    }

    #[test]
    fn test_return_restores_from_saved_frame() {
        let mut e = AsmEmitter::new();
        emit_return(&mut e);
        let text = e.into_program().to_string();
        let restores: Vec<_> = text
            .lines()
            .collect::<Vec<_>>()
            .windows(4)
            .filter(|w| w[0] == "@R13" && w[1] == "AM=M-1")
            .map(|w| w[3].to_string())
            .collect();
        assert_eq!(restores, vec!["@THAT", "@THIS", "@ARG", "@LCL"]);
        assert!(text.ends_with("@R14\nA=M\n0;JMP\n"));
    }
}
