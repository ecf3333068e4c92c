// Arithmetic, logical and comparison operators.
//
// Values are 16-bit two's complement; true is -1 and false is 0.

use super::emitter::AsmEmitter;
use crate::hack::{Comp, Dest, Jump};
use crate::vm::ArithmeticOp;

pub fn emit_arithmetic(e: &mut AsmEmitter, op: ArithmeticOp) {
    match op {
        ArithmeticOp::Add => emit_binary(e, Comp::DPlusM),
        ArithmeticOp::Sub => emit_binary(e, Comp::MMinusD),
        ArithmeticOp::And => emit_binary(e, Comp::DAndM),
        ArithmeticOp::Or => emit_binary(e, Comp::DOrM),
        ArithmeticOp::Neg => emit_unary(e, Comp::NegM),
        ArithmeticOp::Not => emit_unary(e, Comp::NotM),
        ArithmeticOp::Eq => emit_comparison(e, Jump::Eq),
        ArithmeticOp::Gt => emit_comparison(e, Jump::Gt),
        ArithmeticOp::Lt => emit_comparison(e, Jump::Lt),
    }
}

/// Whether the inline body is no longer than a shared-subroutine call stub,
/// in which case sharing it would only grow the program.
pub const fn is_trivial(op: ArithmeticOp) -> bool {
    matches!(op, ArithmeticOp::Neg | ArithmeticOp::Not)
}

/// Pop y, then replace x (the new top) with `comp` applied to D=y, M=x.
fn emit_binary(e: &mut AsmEmitter, comp: Comp) {
    e.pop_d();
    e.assign(Dest::A, Comp::AMinusOne);
    e.assign(Dest::M, comp);
}

/// Rewrite the top of stack in place.
fn emit_unary(e: &mut AsmEmitter, comp: Comp) {
    e.address_top();
    e.assign(Dest::M, comp);
}

/// Pop y, compute x - y, and overwrite x with -1 when `jump` holds, else 0.
fn emit_comparison(e: &mut AsmEmitter, jump: Jump) {
    let true_label = e.fresh_label("true");
    let end_label = e.fresh_label("end");

    e.pop_d();
    e.assign(Dest::A, Comp::AMinusOne);
    e.assign(Dest::D, Comp::MMinusD);
    e.at(&true_label);
    e.branch(Comp::D, jump);

    e.address_top();
    e.assign(Dest::M, Comp::Zero);
    e.jump_to(&end_label);

    e.define_label(&true_label);
    e.address_top();
    e.assign(Dest::M, Comp::MinusOne);

    e.define_label(&end_label);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(op: ArithmeticOp) -> String {
        let mut e = AsmEmitter::new();
        emit_arithmetic(&mut e, op);
        e.into_program().to_string()
    }

    #[test]
    fn test_add_shrinks_stack_in_place() {
        assert_eq!(
            render(ArithmeticOp::Add),
            "@SP\nAM=M-1\nD=M\nA=A-1\nM=D+M\n"
        );
    }

    #[test]
    fn test_not_rewrites_top() {
        assert_eq!(render(ArithmeticOp::Not), "@SP\nA=M-1\nM=!M\n");
    }

    #[test]
    fn test_comparison_uses_fresh_labels() {
        let mut e = AsmEmitter::new();
        emit_arithmetic(&mut e, ArithmeticOp::Lt);
        emit_arithmetic(&mut e, ArithmeticOp::Lt);
        let program = e.into_program();
        let labels: Vec<_> = program.labels().collect();
        assert_eq!(labels, vec!["__true.0", "__end.1", "__true.2", "__end.3"]);
        assert!(program.to_string().contains("D;JLT"));
    }
}
