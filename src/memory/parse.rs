//! Loads `.ls8` program images into memory.
//!
//! An image is plain text with one instruction byte per line, written as an
//! 8-bit binary literal. Lines starting with `#` are comments, as is anything
//! after a `#` on an instruction line. Blank lines are skipped.
//!
//! ```text
//! # print8.ls8
//! 10000010 # LDI R0,8
//! 00000000
//! 00001000
//! 01000111 # PRN R0
//! 00000000
//! 00000001 # HLT
//! ```

use std::borrow::Cow;
use std::error;
use std::fs;
use std::io;
use std::path::Path;
use std::str::{FromStr, Lines};

use super::{Memory, Word};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    InvalidToken,
    ProgramTooLarge { capacity: usize },
}

impl std::fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseErrorKind::InvalidToken => f.write_str("invalid instruction byte"),
            ParseErrorKind::ProgramTooLarge { capacity } => {
                write!(f, "program does not fit into {} bytes of memory", capacity)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    context: Option<Cow<'static, str>>,
    pub line_nr: usize,
}

impl ParseError {
    fn new<C, S>(kind: ParseErrorKind, context: C, line_nr: usize) -> Self
    where
        C: Into<Option<S>>,
        S: Into<Cow<'static, str>>,
    {
        Self {
            kind,
            context: context.into().map(|inner| inner.into()),
            line_nr,
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(context) = &self.context {
            write!(
                f,
                "error [ln: {}]: {} - {}",
                self.line_nr, self.kind, context
            )
        } else {
            write!(f, "error [ln: {}]: {}", self.line_nr, self.kind)
        }
    }
}

impl error::Error for ParseError {}

pub type Result<T, E = ParseError> = std::result::Result<T, E>;

/// Why a program image could not be turned into a memory ready to run.
///
/// The run loop must never start on a missing, malformed, or empty image, and
/// the process exit status distinguishes the three.
#[derive(Debug)]
pub enum LoadError {
    /// The image file could not be read.
    Io(io::Error),
    /// One or more lines failed to parse; every offending line is reported.
    Parse(Vec<ParseError>),
    /// The image contained no instruction bytes at all.
    EmptyProgram,
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::Io(err) => write!(f, "failed to read program image: {}", err),
            LoadError::Parse(errors) => {
                write!(f, "program image is malformed ({} error(s))", errors.len())
            }
            LoadError::EmptyProgram => f.write_str("program image contains no instructions"),
        }
    }
}

impl error::Error for LoadError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            LoadError::Io(err) => Some(err),
            LoadError::Parse(errors) => errors
                .first()
                .map(|err| err as &(dyn error::Error + 'static)),
            LoadError::EmptyProgram => None,
        }
    }
}

impl From<io::Error> for LoadError {
    fn from(err: io::Error) -> Self {
        LoadError::Io(err)
    }
}

#[derive(Debug, Clone)]
pub struct Parser<'a, const S: usize> {
    lines: Lines<'a>,
    line_nr: usize,
    address: Word,
    loaded: usize,
    memory: Memory<S>,
}

impl<'a, const S: usize> Parser<'a, S> {
    /// Creates a new parser for `data` which will try to populate `memory`
    /// starting at address 0.
    pub fn new(data: &'a str, memory: Memory<S>) -> Self {
        Self {
            lines: data.lines(),
            line_nr: 0,
            address: 0,
            loaded: 0,
            memory,
        }
    }

    /// Consumes `self` and tries to parse all lines into memory.
    ///
    /// # Errors
    ///
    /// All line errors which may occur are collected and returned at the end.
    /// An image without a single instruction byte is rejected.
    pub fn parse(mut self) -> Result<Memory<S>, LoadError> {
        let mut errors = Vec::new();

        while let Some(res) = self.parse_next_line() {
            if let Err(err) = res {
                log::error!("{}", err);
                errors.push(err);
            }
        }

        if !errors.is_empty() {
            Err(LoadError::Parse(errors))
        } else if self.loaded == 0 {
            Err(LoadError::EmptyProgram)
        } else {
            log::debug!("loaded {} program byte(s)", self.loaded);
            Ok(self.memory)
        }
    }

    /// Tries to parse the next line of the image. Each instruction byte is
    /// located on its own line.
    fn parse_next_line(&mut self) -> Option<Result<()>> {
        let line = self.lines.next()?;
        self.line_nr += 1;

        // Strip a trailing comment, then whitespace. What remains is either
        // nothing or a single binary token.
        let token = line.split('#').next().unwrap_or("").trim();
        if token.is_empty() {
            return Some(Ok(()));
        }

        let byte = match u8::from_str_radix(token, 2) {
            Ok(byte) => byte,
            Err(_) => {
                return Some(Err(ParseError::new(
                    ParseErrorKind::InvalidToken,
                    format!("`{}` is not an 8-bit binary literal", token),
                    self.line_nr,
                )))
            }
        };

        if self.memory.write_byte(self.address, byte).is_err() {
            return Some(Err(ParseError::new::<Option<&'static str>, &'static str>(
                ParseErrorKind::ProgramTooLarge { capacity: S },
                None,
                self.line_nr,
            )));
        }

        self.address += 1;
        self.loaded += 1;
        Some(Ok(()))
    }
}

impl<const S: usize> Memory<S> {
    /// Reads and parses a program image from `path`.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let data = fs::read_to_string(path)?;
        data.parse()
    }
}

impl<const S: usize> FromStr for Memory<S> {
    type Err = LoadError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        Parser::new(data, Memory::default()).parse()
    }
}
