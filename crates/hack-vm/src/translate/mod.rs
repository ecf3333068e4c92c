mod arithmetic;
mod calls;
mod control_flow;
mod emitter;
mod segment;
mod subroutine;

pub use segment::{SegmentAccess, resolve as resolve_segment, static_symbol};
pub use subroutine::SubroutineKey;

use crate::abi::{FRAME_SAVED_WORDS, MAX_CONSTANT, PREDEFINED_SYMBOLS, STACK_BASE};
use crate::error::Location;
use crate::hack::{AsmProgram, is_valid_symbol};
use crate::vm::{self, ArithmeticOp, Command, Segment};
use crate::{Error, Result};

use control_flow::LabelTracker;
use emitter::AsmEmitter;
use subroutine::SubroutineCache;

/// Which construct families are emitted as shared subroutines.
///
/// Disabling a family inlines it at every occurrence; behavior is the same
/// either way, only the ROM footprint changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct OptimizationFlags {
    /// Binary operators and comparisons.
    pub dedup_arithmetic: bool,
    /// Push/pop through the local, argument, this and that pointers.
    pub dedup_memory_access: bool,
    /// The frame save performed by `call`.
    pub dedup_calls: bool,
    /// The frame teardown performed by `return`.
    pub dedup_returns: bool,
    /// Zeroing of a function's locals on entry.
    pub dedup_locals: bool,
}

impl OptimizationFlags {
    /// Inline everything.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            dedup_arithmetic: false,
            dedup_memory_access: false,
            dedup_calls: false,
            dedup_returns: false,
            dedup_locals: false,
        }
    }
}

impl Default for OptimizationFlags {
    fn default() -> Self {
        Self {
            dedup_arithmetic: true,
            dedup_memory_access: true,
            dedup_calls: true,
            dedup_returns: true,
            dedup_locals: true,
        }
    }
}

/// Options for a translation run.
#[derive(Debug, Clone)]
pub struct TranslateOptions {
    /// Prepend `SP = 256; call <entry_function> 0`.
    pub bootstrap: bool,
    pub entry_function: String,
    /// Reject jumps to undefined labels and duplicate definitions.
    pub check_labels: bool,
    pub optimizations: OptimizationFlags,
}

impl Default for TranslateOptions {
    fn default() -> Self {
        Self {
            bootstrap: true,
            entry_function: "Sys.init".to_string(),
            check_labels: true,
            optimizations: OptimizationFlags::default(),
        }
    }
}

/// One translation unit: a `.vm` file's name (without extension) and text.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    pub name: String,
    pub source: String,
}

impl SourceUnit {
    #[must_use]
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }
}

/// Translate every unit, in order, into one assembly program.
pub fn translate(units: &[SourceUnit], options: &TranslateOptions) -> Result<AsmProgram> {
    let mut translator = Translator::new(options.clone())?;
    for unit in units {
        translator.translate_unit(unit)?;
    }
    translator.finish()
}

/// Translation state for one run: the output buffer, the label counter, the
/// function currently open, and the shared-subroutine cache.
pub struct Translator {
    options: TranslateOptions,
    emitter: AsmEmitter,
    cache: SubroutineCache,
    labels: LabelTracker,
    unit: String,
    current_function: String,
    location: Location,
}

impl Translator {
    /// Create a translator, emitting the bootstrap if enabled.
    pub fn new(options: TranslateOptions) -> Result<Self> {
        let mut translator = Self {
            options,
            emitter: AsmEmitter::new(),
            cache: SubroutineCache::new(),
            labels: LabelTracker::new(),
            unit: String::new(),
            current_function: String::new(),
            location: Location::new("<bootstrap>", 0),
        };
        if translator.options.bootstrap {
            translator.emit_bootstrap()?;
        }
        Ok(translator)
    }

    fn emit_bootstrap(&mut self) -> Result<()> {
        let entry = self.options.entry_function.clone();
        if !is_valid_symbol(&entry) {
            return Err(Error::MalformedCommand {
                location: self.location.clone(),
                text: format!("call {entry} 0"),
                reason: format!("invalid entry function name `{entry}`"),
            });
        }
        tracing::debug!(entry = %entry, "emitting bootstrap");
        self.emitter.load_constant_d(STACK_BASE);
        self.emitter.store_d("SP");
        self.call(&entry, 0)
    }

    /// Start a new translation unit; `static` symbols are scoped to it.
    pub fn begin_unit(&mut self, name: &str) -> Result<()> {
        self.location = Location::new(name, 0);
        if !is_valid_symbol(name) || name.starts_with("__") {
            return Err(Error::MalformedCommand {
                location: self.location.clone(),
                text: name.to_string(),
                reason: "translation unit name must be a symbol not starting with `__`"
                    .to_string(),
            });
        }
        tracing::debug!(unit = name, "translating unit");
        self.unit = name.to_string();
        self.current_function.clear();
        Ok(())
    }

    /// Parse and translate a whole unit.
    pub fn translate_unit(&mut self, unit: &SourceUnit) -> Result<()> {
        self.begin_unit(&unit.name)?;
        for source_command in vm::parse(&unit.name, &unit.source)? {
            self.location = Location::new(&unit.name, source_command.line);
            self.translate_command(&source_command.command)?;
        }
        Ok(())
    }

    pub fn translate_command(&mut self, command: &Command) -> Result<()> {
        tracing::trace!(%command, "translating");
        match command {
            Command::Arithmetic(op) => self.arithmetic(*op),
            Command::Push(segment, index) => self.push(*segment, *index),
            Command::Pop(segment, index) => self.pop(*segment, *index, command),
            Command::Label(name) => self.label(name),
            Command::Goto(name) => {
                let symbol = self.reference_label(name, command);
                control_flow::emit_goto(&mut self.emitter, &symbol);
                Ok(())
            }
            Command::IfGoto(name) => {
                let symbol = self.reference_label(name, command);
                control_flow::emit_if_goto(&mut self.emitter, &symbol);
                Ok(())
            }
            Command::Function { name, n_locals } => self.function(name, *n_locals),
            Command::Call { name, n_args } => self.call(name, *n_args),
            Command::Return => self.return_from_function(),
        }
    }

    /// Check labels and hand over the finished program.
    pub fn finish(self) -> Result<AsmProgram> {
        if self.options.check_labels {
            self.labels.check()?;
        }
        tracing::debug!(
            rom_words = self.emitter.rom_size(),
            shared_subroutines = self.cache.emitted_count(),
            "translation finished"
        );
        Ok(self.emitter.into_program())
    }

    /// Number of distinct shared subroutine bodies emitted so far.
    #[must_use]
    pub fn shared_subroutines(&self) -> usize {
        self.cache.emitted_count()
    }

    fn arithmetic(&mut self, op: ArithmeticOp) -> Result<()> {
        if !self.options.optimizations.dedup_arithmetic || arithmetic::is_trivial(op) {
            arithmetic::emit_arithmetic(&mut self.emitter, op);
            return Ok(());
        }
        self.cache
            .invoke(&mut self.emitter, &SubroutineKey::Arithmetic(op), |e| {
                arithmetic::emit_arithmetic(e, op);
                Ok(())
            })
    }

    fn push(&mut self, segment: Segment, index: u16) -> Result<()> {
        let access = segment::resolve(segment, index, &self.unit, &self.location)?;
        if !self.shares_memory_access(segment) {
            segment::emit_push(&mut self.emitter, &access);
            return Ok(());
        }
        let key = SubroutineKey::push(segment, index, &self.unit);
        self.cache.invoke(&mut self.emitter, &key, |e| {
            segment::emit_push(e, &access);
            Ok(())
        })
    }

    fn pop(&mut self, segment: Segment, index: u16, command: &Command) -> Result<()> {
        if segment == Segment::Constant {
            return Err(Error::MalformedCommand {
                location: self.location.clone(),
                text: command.to_string(),
                reason: "cannot pop into the constant segment".to_string(),
            });
        }
        let access = segment::resolve(segment, index, &self.unit, &self.location)?;
        if !self.shares_memory_access(segment) {
            return segment::emit_pop(&mut self.emitter, &access);
        }
        let key = SubroutineKey::pop(segment, index, &self.unit);
        self.cache
            .invoke(&mut self.emitter, &key, |e| segment::emit_pop(e, &access))
    }

    /// Only pointer-relative accesses are long enough to be worth a stub.
    fn shares_memory_access(&self, segment: Segment) -> bool {
        self.options.optimizations.dedup_memory_access && segment.is_indirect()
    }

    fn label(&mut self, name: &str) -> Result<()> {
        let symbol = control_flow::scoped_label(&self.current_function, name);
        if self.options.check_labels {
            self.labels.define(&symbol, &self.location)?;
        }
        control_flow::emit_label(&mut self.emitter, &symbol);
        Ok(())
    }

    fn reference_label(&mut self, name: &str, command: &Command) -> String {
        let symbol = control_flow::scoped_label(&self.current_function, name);
        if self.options.check_labels {
            self.labels.reference(
                &symbol,
                name,
                &self.current_function,
                command.to_string(),
                &self.location,
            );
        }
        symbol
    }

    /// Function names share the assembler namespace with internal labels
    /// (`__` prefix), predefined symbols and static variables (`Unit.index`).
    fn check_function_name(&self, name: &str, command: &Command) -> Result<()> {
        let reason = if name.starts_with("__") {
            "names starting with `__` are reserved".to_string()
        } else if PREDEFINED_SYMBOLS.iter().any(|(symbol, _)| *symbol == name) {
            format!("`{name}` is a predefined symbol")
        } else if is_static_symbol(name) {
            format!("`{name}` has the form of a static variable symbol")
        } else {
            return Ok(());
        };
        Err(Error::MalformedCommand {
            location: self.location.clone(),
            text: command.to_string(),
            reason,
        })
    }

    fn function(&mut self, name: &str, n_locals: u16) -> Result<()> {
        self.check_function_name(name, &Command::Function {
            name: name.to_string(),
            n_locals,
        })?;
        if self.options.check_labels {
            self.labels.define(name, &self.location)?;
        }
        self.current_function = name.to_string();
        self.emitter.define_label(name);

        if n_locals < 2 || !self.options.optimizations.dedup_locals {
            calls::emit_zero_locals(&mut self.emitter, n_locals);
            return Ok(());
        }
        self.cache.invoke(
            &mut self.emitter,
            &SubroutineKey::ZeroLocals { n_locals },
            |e| {
                calls::emit_zero_locals(e, n_locals);
                Ok(())
            },
        )
    }

    fn call(&mut self, name: &str, n_args: u16) -> Result<()> {
        let command = Command::Call {
            name: name.to_string(),
            n_args,
        };
        self.check_function_name(name, &command)?;
        // ARG = SP - n_args - 5 loads n_args + 5 with an A-instruction.
        let max_args = MAX_CONSTANT - FRAME_SAVED_WORDS;
        if n_args > max_args {
            return Err(Error::MalformedCommand {
                location: self.location.clone(),
                text: command.to_string(),
                reason: format!("argument count {n_args} exceeds {max_args}"),
            });
        }
        let return_label = self.emitter.fresh_label("ret");
        if !self.options.optimizations.dedup_calls {
            calls::emit_call(&mut self.emitter, name, n_args, &return_label);
            return Ok(());
        }
        self.cache
            .invoke_call(&mut self.emitter, n_args, name, &return_label, |e| {
                calls::emit_frame_save(e, n_args);
                Ok(())
            })
    }

    fn return_from_function(&mut self) -> Result<()> {
        if !self.options.optimizations.dedup_returns {
            calls::emit_return(&mut self.emitter);
            return Ok(());
        }
        self.cache
            .invoke_tail(&mut self.emitter, &SubroutineKey::Return, |e| {
                calls::emit_return(e);
                Ok(())
            })
    }
}

/// `Unit.index`: a suffix of digits after the last dot.
fn is_static_symbol(name: &str) -> bool {
    name.rsplit_once('.').is_some_and(|(_, suffix)| {
        !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_bootstrap() -> TranslateOptions {
        TranslateOptions {
            bootstrap: false,
            ..TranslateOptions::default()
        }
    }

    fn translate_text(source: &str, options: &TranslateOptions) -> Result<AsmProgram> {
        translate(&[SourceUnit::new("Test", source)], options)
    }

    #[test]
    fn test_bootstrap_sets_stack_and_calls_entry() {
        let options = TranslateOptions {
            check_labels: false,
            ..TranslateOptions::default()
        };
        let text = translate(&[], &options).unwrap().to_string();
        assert!(text.starts_with("@256\nD=A\n@SP\nM=D\n"), "{text}");
        assert!(text.contains("@Sys.init\nD=A\n@R14\nM=D\n"), "{text}");
    }

    #[test]
    fn test_custom_entry_function() {
        let options = TranslateOptions {
            entry_function: "Main.main".to_string(),
            check_labels: false,
            ..TranslateOptions::default()
        };
        let program = translate(&[], &options).unwrap();
        assert!(program.to_string().contains("@Main.main\n"));
    }

    #[test]
    fn test_labels_are_scoped_to_function() {
        let src = "function A.f 0\nlabel L\ngoto L\nfunction B.g 0\nlabel L\ngoto L\n";
        let program = translate_text(src, &no_bootstrap()).unwrap();
        let labels: Vec<_> = program.labels().collect();
        assert!(labels.contains(&"A.f$L"));
        assert!(labels.contains(&"B.g$L"));
    }

    #[test]
    fn test_undefined_label_fails() {
        let src = "function A.f 0\nlabel L\nfunction B.g 0\ngoto L\n";
        let err = translate_text(src, &no_bootstrap()).unwrap_err();
        match err {
            Error::UndefinedLabel {
                function, location, ..
            } => {
                assert_eq!(function, "B.g");
                assert_eq!(location.line, 4);
            }
            other => panic!("unexpected {other}"),
        }
    }

    #[test]
    fn test_undefined_label_allowed_when_unchecked() {
        let options = TranslateOptions {
            check_labels: false,
            ..no_bootstrap()
        };
        assert!(translate_text("goto NOWHERE\n", &options).is_ok());
    }

    #[test]
    fn test_duplicate_function_fails() {
        let src = "function A.f 0\nreturn\nfunction A.f 0\nreturn\n";
        let err = translate_text(src, &no_bootstrap()).unwrap_err();
        assert!(matches!(err, Error::DuplicateLabel { .. }), "{err}");
    }

    #[test]
    fn test_reserved_names_rejected() {
        let err = translate_text("function __add 0\n", &no_bootstrap()).unwrap_err();
        assert!(matches!(err, Error::MalformedCommand { .. }), "{err}");

        let err = translate_text("call __return 0\n", &no_bootstrap()).unwrap_err();
        assert!(matches!(err, Error::MalformedCommand { .. }), "{err}");

        let err = translate(&[SourceUnit::new("__x", "")], &no_bootstrap()).unwrap_err();
        assert!(matches!(err, Error::MalformedCommand { .. }), "{err}");
    }

    #[test]
    fn test_argument_count_limit() {
        let err = translate_text("call F.f 32763\n", &no_bootstrap()).unwrap_err();
        assert!(matches!(err, Error::MalformedCommand { .. }), "{err}");
        assert!(err.to_string().contains("32762"), "{err}");

        let options = TranslateOptions {
            check_labels: false,
            ..no_bootstrap()
        };
        let text = translate_text("call F.f 32762\n", &options)
            .unwrap()
            .to_string();
        assert!(text.contains("@32767\nD=D-A\n"), "{text}");
    }

    #[test]
    fn test_neg_and_not_never_shared() {
        let mut translator = Translator::new(no_bootstrap()).unwrap();
        translator.begin_unit("Test").unwrap();
        for op in [ArithmeticOp::Neg, ArithmeticOp::Not, ArithmeticOp::Neg] {
            translator
                .translate_command(&Command::Arithmetic(op))
                .unwrap();
        }
        assert_eq!(translator.shared_subroutines(), 0);
    }

    #[test]
    fn test_static_symbol_shape() {
        assert!(is_static_symbol("Main.0"));
        assert!(is_static_symbol("A.b.17"));
        assert!(!is_static_symbol("Main.f0"));
        assert!(!is_static_symbol("Main."));
        assert!(!is_static_symbol("Main"));
    }

    #[test]
    fn test_pop_constant_command_rejected() {
        let mut translator = Translator::new(no_bootstrap()).unwrap();
        translator.begin_unit("Test").unwrap();
        let err = translator
            .translate_command(&Command::Pop(Segment::Constant, 1))
            .unwrap_err();
        assert!(matches!(err, Error::MalformedCommand { .. }), "{err}");
    }

    #[test]
    fn test_index_out_of_range_reports_line() {
        let err = translate_text("push constant 1\npush temp 8\n", &no_bootstrap()).unwrap_err();
        assert!(matches!(err, Error::IndexOutOfRange { .. }), "{err}");
        assert_eq!(err.location(), Some(&Location::new("Test", 2)));
    }

    #[test]
    fn test_shared_bodies_counted_once_per_key() {
        let mut translator = Translator::new(no_bootstrap()).unwrap();
        let src = "push constant 1\npush constant 2\neq\npush constant 1\npush constant 2\neq\n\
                   push local 1\npush local 1\nneg\nneg\n";
        translator
            .translate_unit(&SourceUnit::new("Test", src))
            .unwrap();
        // eq and `push local 1`; neg stays inline, push constant is direct.
        assert_eq!(translator.shared_subroutines(), 2);
    }

    #[test]
    fn test_no_dedup_inlines_everything() {
        let options = TranslateOptions {
            optimizations: OptimizationFlags::none(),
            ..no_bootstrap()
        };
        let src = "function F.f 3\npush argument 0\npush argument 0\nadd\nreturn\n";
        let text = translate_text(src, &options).unwrap().to_string();
        assert!(!text.contains("__resume"), "{text}");
        assert!(!text.contains("(__return)"), "{text}");
        assert!(!text.contains("(__zero_locals"), "{text}");
        assert!(!text.contains("(__add)"), "{text}");
    }
}
