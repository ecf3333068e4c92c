mod command;
mod display;
mod parser;

pub use command::{ArithmeticOp, Command, Segment, SourceCommand, UnknownSegmentName};
pub use parser::{parse, parse_line};
