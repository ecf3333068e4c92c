//! Shared subroutines for call-site independent code.
//!
//! The Hack ROM holds 32K words, and inlining every comparison, frame save
//! and return quickly exhausts it. Instead, the first occurrence of a
//! construct emits its body once behind an entry label, and every occurrence
//! (including the first) reaches it through a short stub:
//!
//! ```text
//!   @__resume.N      // resume address into D
//!   D=A
//!   @__lt            // shared entry
//!   0;JMP
//! (__lt)             // first occurrence only:
//!   @R15             //   save resume address
//!   M=D
//!   ...body...
//!   @R15             //   return to the call site
//!   A=M
//!   0;JMP
//! (__resume.N)
//! ```
//!
//! Bodies are written through a plain `AsmEmitter` and cannot reach the
//! cache, so no shared body ever enters another one and R15 is never
//! overwritten before it is consumed.

use std::collections::HashSet;
use std::fmt;

use super::emitter::AsmEmitter;
use crate::Result;
use crate::vm::{ArithmeticOp, Segment};

/// Identity of a shared body. Two occurrences share a body exactly when
/// their keys are equal, so a key holds everything the body depends on and
/// nothing specific to the call site.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SubroutineKey {
    /// Never built for `neg` or `not`: their inline bodies are shorter than
    /// the stub, so the translator always inlines them.
    Arithmetic(ArithmeticOp),
    /// `unit` is set only for `static`, whose symbols are unit-scoped.
    Push {
        segment: Segment,
        index: u16,
        unit: Option<String>,
    },
    Pop {
        segment: Segment,
        index: u16,
        unit: Option<String>,
    },
    /// Frame save for a call with this many arguments.
    Call { n_args: u16 },
    ZeroLocals { n_locals: u16 },
    Return,
}

impl SubroutineKey {
    pub fn push(segment: Segment, index: u16, unit: &str) -> Self {
        SubroutineKey::Push {
            segment,
            index,
            unit: (segment == Segment::Static).then(|| unit.to_string()),
        }
    }

    pub fn pop(segment: Segment, index: u16, unit: &str) -> Self {
        SubroutineKey::Pop {
            segment,
            index,
            unit: (segment == Segment::Static).then(|| unit.to_string()),
        }
    }

    /// Entry label of the shared body.
    pub fn entry_label(&self) -> String {
        format!("__{self}")
    }
}

impl fmt::Display for SubroutineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubroutineKey::Arithmetic(op) => write!(f, "{op}"),
            SubroutineKey::Push {
                segment,
                index,
                unit,
            } => match unit {
                Some(unit) => write!(f, "push.{segment}.{unit}.{index}"),
                None => write!(f, "push.{segment}.{index}"),
            },
            SubroutineKey::Pop {
                segment,
                index,
                unit,
            } => match unit {
                Some(unit) => write!(f, "pop.{segment}.{unit}.{index}"),
                None => write!(f, "pop.{segment}.{index}"),
            },
            SubroutineKey::Call { n_args } => write!(f, "call.{n_args}"),
            SubroutineKey::ZeroLocals { n_locals } => write!(f, "zero_locals.{n_locals}"),
            SubroutineKey::Return => write!(f, "return"),
        }
    }
}

/// Records which shared bodies have been emitted. Grows monotonically for
/// the lifetime of one translation.
#[derive(Debug, Default)]
pub struct SubroutineCache {
    emitted: HashSet<SubroutineKey>,
}

impl SubroutineCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct shared bodies emitted so far.
    pub fn emitted_count(&self) -> usize {
        self.emitted.len()
    }

    /// Mark `key` emitted; true if this is its first occurrence.
    fn first_use(&mut self, key: &SubroutineKey) -> bool {
        if self.emitted.contains(key) {
            return false;
        }
        tracing::debug!(subroutine = %key, "emitting shared body");
        self.emitted.insert(key.clone());
        true
    }

    /// Run `body` as a shared subroutine that returns to the call site.
    pub fn invoke(
        &mut self,
        e: &mut AsmEmitter,
        key: &SubroutineKey,
        body: impl FnOnce(&mut AsmEmitter) -> Result<()>,
    ) -> Result<()> {
        let entry = key.entry_label();
        let resume = e.fresh_label("resume");

        e.load_address_d(&resume);
        e.jump_to(&entry);
        if self.first_use(key) {
            e.define_label(&entry);
            e.store_d("R15");
            body(e)?;
            e.jump_indirect("R15");
        }
        e.define_label(&resume);
        Ok(())
    }

    /// Run the shared frame save of a call, then continue into `callee`.
    ///
    /// Here the resume label is the call's return label: D carries it into
    /// the body, which pushes it as the saved return address, and R14 carries
    /// the callee's entry address. The body exits through R14, and the
    /// callee's `return` lands on the resume label.
    pub fn invoke_call(
        &mut self,
        e: &mut AsmEmitter,
        n_args: u16,
        callee: &str,
        return_label: &str,
        body: impl FnOnce(&mut AsmEmitter) -> Result<()>,
    ) -> Result<()> {
        let key = SubroutineKey::Call { n_args };
        let entry = key.entry_label();

        e.load_address_d(callee);
        e.store_d("R14");
        e.load_address_d(return_label);
        e.jump_to(&entry);
        if self.first_use(&key) {
            e.define_label(&entry);
            body(e)?;
            e.jump_indirect("R14");
        }
        e.define_label(return_label);
        Ok(())
    }

    /// Run a shared body that never returns to the call site (`return`).
    pub fn invoke_tail(
        &mut self,
        e: &mut AsmEmitter,
        key: &SubroutineKey,
        body: impl FnOnce(&mut AsmEmitter) -> Result<()>,
    ) -> Result<()> {
        let entry = key.entry_label();
        e.jump_to(&entry);
        if self.first_use(key) {
            e.define_label(&entry);
            body(e)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::arithmetic::emit_arithmetic;

    #[test]
    fn test_key_ignores_unit_except_for_static() {
        assert_eq!(
            SubroutineKey::push(Segment::Local, 2, "A"),
            SubroutineKey::push(Segment::Local, 2, "B")
        );
        assert_ne!(
            SubroutineKey::push(Segment::Static, 2, "A"),
            SubroutineKey::push(Segment::Static, 2, "B")
        );
        assert_ne!(
            SubroutineKey::push(Segment::Local, 2, "A"),
            SubroutineKey::pop(Segment::Local, 2, "A")
        );
    }

    #[test]
    fn test_entry_labels() {
        assert_eq!(
            SubroutineKey::Arithmetic(ArithmeticOp::Eq).entry_label(),
            "__eq"
        );
        assert_eq!(
            SubroutineKey::pop(Segment::Static, 3, "Main").entry_label(),
            "__pop.static.Main.3"
        );
        assert_eq!(SubroutineKey::Call { n_args: 2 }.entry_label(), "__call.2");
    }

    #[test]
    fn test_body_emitted_once() {
        let mut e = AsmEmitter::new();
        let mut cache = SubroutineCache::new();
        let key = SubroutineKey::Arithmetic(ArithmeticOp::Add);
        for _ in 0..3 {
            cache
                .invoke(&mut e, &key, |e| {
                    emit_arithmetic(e, ArithmeticOp::Add);
                    Ok(())
                })
                .unwrap();
        }
        let text = e.into_program().to_string();
        assert_eq!(text.matches("(__add)").count(), 1);
        assert_eq!(text.matches("M=D+M").count(), 1);
        assert_eq!(text.matches("@__add\n0;JMP").count(), 3);
        assert_eq!(cache.emitted_count(), 1);
        assert!(cache.emitted.contains(&key));
    }

    #[test]
    fn test_resume_labels_are_distinct() {
        let mut e = AsmEmitter::new();
        let mut cache = SubroutineCache::new();
        let key = SubroutineKey::Arithmetic(ArithmeticOp::Sub);
        for _ in 0..2 {
            cache
                .invoke(&mut e, &key, |e| {
                    emit_arithmetic(e, ArithmeticOp::Sub);
                    Ok(())
                })
                .unwrap();
        }
        let program = e.into_program();
        let resumes: Vec<_> = program
            .labels()
            .filter(|l| l.starts_with("__resume"))
            .collect();
        assert_eq!(resumes.len(), 2);
        assert_ne!(resumes[0], resumes[1]);
    }
}
