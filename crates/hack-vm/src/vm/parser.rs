//! Line tokenizer for VM source text.
//!
//! Format (one command per line):
//! ```text
//! // Comments start with //
//! push constant 7
//! function Main.main 2   // trailing comments are fine too
//! ```

use std::str::SplitWhitespace;

use super::{ArithmeticOp, Command, Segment, SourceCommand};
use crate::error::Location;
use crate::hack::is_valid_symbol;
use crate::{Error, Result};

/// Parse a whole translation unit into its command stream.
///
/// Stops at the first malformed line.
pub fn parse(unit: &str, source: &str) -> Result<Vec<SourceCommand>> {
    let mut commands = Vec::new();

    for (line_num, line) in source.lines().enumerate() {
        let line = strip_comment(line).trim();
        if line.is_empty() {
            continue;
        }

        let location = Location::new(unit, line_num + 1);
        let command = parse_line(line, &location)?;
        commands.push(SourceCommand {
            line: line_num + 1,
            command,
        });
    }

    Ok(commands)
}

/// Parse one comment-free, non-empty line.
pub fn parse_line(line: &str, location: &Location) -> Result<Command> {
    let mut tokens = Tokens {
        inner: line.split_whitespace(),
        line,
        location,
    };
    let mnemonic = tokens.next_token("command")?;

    let command = match mnemonic {
        "push" => {
            let (segment, index) = tokens.segment_and_index()?;
            Command::Push(segment, index)
        }
        "pop" => {
            let (segment, index) = tokens.segment_and_index()?;
            if segment == Segment::Constant {
                return Err(tokens.malformed("cannot pop into the constant segment"));
            }
            Command::Pop(segment, index)
        }
        "label" => Command::Label(tokens.symbol("label name")?),
        "goto" => Command::Goto(tokens.symbol("label name")?),
        "if-goto" => Command::IfGoto(tokens.symbol("label name")?),
        "function" => {
            let name = tokens.symbol("function name")?;
            let n_locals = tokens.number("local count")?;
            Command::Function { name, n_locals }
        }
        "call" => {
            let name = tokens.symbol("function name")?;
            let n_args = tokens.number("argument count")?;
            Command::Call { name, n_args }
        }
        "return" => Command::Return,
        other => match ArithmeticOp::from_mnemonic(other) {
            Some(op) => Command::Arithmetic(op),
            None => return Err(tokens.malformed(format!("unknown command `{other}`"))),
        },
    };

    tokens.finish()?;
    Ok(command)
}

fn strip_comment(line: &str) -> &str {
    line.find("//").map_or(line, |idx| &line[..idx])
}

struct Tokens<'a> {
    inner: SplitWhitespace<'a>,
    line: &'a str,
    location: &'a Location,
}

impl<'a> Tokens<'a> {
    fn malformed(&self, reason: impl Into<String>) -> Error {
        Error::MalformedCommand {
            location: self.location.clone(),
            text: self.line.to_string(),
            reason: reason.into(),
        }
    }

    fn next_token(&mut self, what: &str) -> Result<&'a str> {
        self.inner
            .next()
            .ok_or_else(|| self.malformed(format!("missing {what}")))
    }

    fn symbol(&mut self, what: &str) -> Result<String> {
        let token = self.next_token(what)?;
        if !is_valid_symbol(token) {
            return Err(self.malformed(format!("invalid {what} `{token}`")));
        }
        Ok(token.to_string())
    }

    fn number(&mut self, what: &str) -> Result<u16> {
        let token = self.next_token(what)?;
        if !token.bytes().all(|b| b.is_ascii_digit()) {
            return Err(self.malformed(format!(
                "{what} `{token}` is not a non-negative integer"
            )));
        }
        token
            .parse::<u16>()
            .map_err(|_| self.malformed(format!("{what} `{token}` does not fit in 16 bits")))
    }

    fn segment_and_index(&mut self) -> Result<(Segment, u16)> {
        let name = self.next_token("segment")?;
        let segment = name.parse::<Segment>().map_err(|e| Error::UnknownSegment {
            location: self.location.clone(),
            segment: e.0,
            text: self.line.to_string(),
        })?;
        let index = self.number("index")?;
        Ok((segment, index))
    }

    fn finish(mut self) -> Result<()> {
        match self.inner.next() {
            Some(extra) => Err(self.malformed(format!("unexpected operand `{extra}`"))),
            None => Ok(()),
        }
    }
}
