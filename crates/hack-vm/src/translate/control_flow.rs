// Labels, goto and if-goto, plus bookkeeping that catches jumps to labels
// that are never defined.

use std::collections::{HashMap, HashSet};

use super::emitter::AsmEmitter;
use crate::error::Location;
use crate::hack::{Comp, Jump};
use crate::{Error, Result};

/// `function$label`: VM labels are private to the function they appear in.
pub fn scoped_label(function: &str, label: &str) -> String {
    format!("{function}${label}")
}

pub fn emit_label(e: &mut AsmEmitter, symbol: &str) {
    e.define_label(symbol);
}

pub fn emit_goto(e: &mut AsmEmitter, symbol: &str) {
    e.jump_to(symbol);
}

/// Pop the top of stack and jump to `symbol` if it is non-zero.
pub fn emit_if_goto(e: &mut AsmEmitter, symbol: &str) {
    e.pop_d();
    e.at(symbol);
    e.branch(Comp::D, Jump::Ne);
}

#[derive(Debug)]
struct LabelReference {
    location: Location,
    text: String,
    label: String,
    function: String,
}

/// Tracks user-visible symbols (function entries and scoped labels).
#[derive(Debug, Default)]
pub struct LabelTracker {
    defined: HashSet<String>,
    /// Scoped symbol -> first reference to it.
    references: HashMap<String, LabelReference>,
    /// Reference order, so the first unresolved jump is reported.
    order: Vec<String>,
}

impl LabelTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, symbol: &str, location: &Location) -> Result<()> {
        if !self.defined.insert(symbol.to_string()) {
            return Err(Error::DuplicateLabel {
                location: location.clone(),
                symbol: symbol.to_string(),
            });
        }
        Ok(())
    }

    pub fn reference(
        &mut self,
        symbol: &str,
        label: &str,
        function: &str,
        text: String,
        location: &Location,
    ) {
        if self.references.contains_key(symbol) {
            return;
        }
        self.order.push(symbol.to_string());
        self.references.insert(
            symbol.to_string(),
            LabelReference {
                location: location.clone(),
                text,
                label: label.to_string(),
                function: function.to_string(),
            },
        );
    }

    /// Fail on the first jump whose target was never defined.
    pub fn check(mut self) -> Result<()> {
        for symbol in &self.order {
            if self.defined.contains(symbol) {
                continue;
            }
            if let Some(reference) = self.references.remove(symbol) {
                return Err(Error::UndefinedLabel {
                    location: reference.location,
                    text: reference.text,
                    label: reference.label,
                    function: reference.function,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoped_label() {
        assert_eq!(scoped_label("Main.loop", "END"), "Main.loop$END");
        assert_eq!(scoped_label("", "END"), "$END");
    }

    #[test]
    fn test_if_goto_pops_then_branches() {
        let mut e = AsmEmitter::new();
        emit_if_goto(&mut e, "f$L");
        assert_eq!(
            e.into_program().to_string(),
            "@SP\nAM=M-1\nD=M\n@f$L\nD;JNE\n"
        );
    }

    #[test]
    fn test_forward_reference_resolves() {
        let loc = Location::new("Test", 1);
        let mut tracker = LabelTracker::new();
        tracker.reference("f$L", "L", "f", "goto L".into(), &loc);
        tracker.define("f$L", &loc).unwrap();
        assert!(tracker.check().is_ok());
    }

    #[test]
    fn test_undefined_label_reported() {
        let loc = Location::new("Test", 7);
        let mut tracker = LabelTracker::new();
        tracker.define("f$A", &loc).unwrap();
        tracker.reference("f$B", "B", "f", "if-goto B".into(), &loc);
        let err = tracker.check().unwrap_err();
        match err {
            Error::UndefinedLabel {
                label,
                function,
                location,
                ..
            } => {
                assert_eq!(label, "B");
                assert_eq!(function, "f");
                assert_eq!(location.line, 7);
            }
            other => panic!("unexpected {other}"),
        }
    }

    #[test]
    fn test_duplicate_definition() {
        let loc = Location::new("Test", 1);
        let mut tracker = LabelTracker::new();
        tracker.define("f$A", &loc).unwrap();
        assert!(matches!(
            tracker.define("f$A", &loc),
            Err(Error::DuplicateLabel { .. })
        ));
    }
}
