use compact_str::CompactString;

/// The result type for compiler operations.
pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Clone, Debug, PartialEq, Eq)]
/// Represents an error raised by any stage of the compiler.
pub enum CompileError {
    /// An out of range access into a bounded sequence.
    BadIndex {
        index: usize,
        min: usize,
        max: usize,
    },
    /// The source cursor advanced past the last character.
    EndOfSource,
    /// Text that was required to be an identifier does not match the
    /// identifier pattern.
    InvalidIdentifier(CompactString),
    /// The fragment builder was flushed in an inconsistent condition.
    IllegalState,
    /// A cross-builder node handle, or a null where a value was required.
    InvalidParameter(&'static str),
    /// A required optional reference was absent.
    UnexpectedNull,
    /// Misuse of an operation factory.
    BadOperation(&'static str),
    /// Something other than an argument list was given where function
    /// arguments were expected.
    BadFunctionCall(&'static str),
    /// The code builder exceeded the script's code capacity.
    FullCodeData,
    /// A source-level diagnostic with an attached line number.
    Parser { line: usize, message: CompactString },
}

impl std::error::Error for CompileError {}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompileError::BadIndex { index, min, max } => {
                write!(f, "index {index} out of range [{min}, {max})")
            }
            CompileError::EndOfSource => write!(f, "unexpected end of source"),
            CompileError::InvalidIdentifier(text) => {
                write!(f, "invalid identifier: {text}")
            }
            CompileError::IllegalState => write!(f, "fragment builder in illegal state"),
            CompileError::InvalidParameter(what) => write!(f, "invalid parameter: {what}"),
            CompileError::UnexpectedNull => write!(f, "required value was absent"),
            CompileError::BadOperation(msg) => write!(f, "bad operation: {msg}"),
            CompileError::BadFunctionCall(msg) => write!(f, "bad function call: {msg}"),
            CompileError::FullCodeData => write!(f, "script code capacity exceeded"),
            CompileError::Parser { line, message } => write!(f, "line {line}: {message}"),
        }
    }
}

impl CompileError {
    /// Creates a parser error for a source line.
    pub fn parser(line: usize, message: impl AsRef<str>) -> CompileError {
        CompileError::Parser {
            line,
            message: CompactString::new(message.as_ref()),
        }
    }

    /// Wraps this error into a parser error carrying the given source line.
    ///
    /// Parser errors keep their own line.
    pub fn at_line(self, line: usize) -> CompileError {
        match self {
            err @ CompileError::Parser { .. } => err,
            other => CompileError::Parser {
                line,
                message: CompactString::new(other.to_string()),
            },
        }
    }

    /// Returns true when the error must abort the whole compilation
    /// instead of being recorded and recovered from.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CompileError::InvalidParameter(_) | CompileError::FullCodeData
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// A single entry of the diagnostics list handed back to the driver.
pub struct ErrorEntry {
    /// First source line the diagnostic covers.
    pub start_line: usize,
    /// Last source line the diagnostic covers.
    pub end_line: usize,
    /// Human readable message.
    pub message: CompactString,
}

impl std::fmt::Display for ErrorEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.start_line == self.end_line {
            write!(f, "line {}: {}", self.start_line, self.message)
        } else {
            write!(
                f,
                "lines {}-{}: {}",
                self.start_line, self.end_line, self.message
            )
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
/// An ordered list of source diagnostics collected during one compilation.
pub struct ErrorList {
    entries: Vec<ErrorEntry>,
}

impl ErrorList {
    /// Creates an empty list.
    pub fn new() -> ErrorList {
        ErrorList::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Appends a diagnostic covering a single line.
    pub fn push(&mut self, line: usize, message: impl AsRef<str>) {
        self.push_span(line, line, message);
    }

    /// Appends a diagnostic covering a line range.
    pub fn push_span(&mut self, start_line: usize, end_line: usize, message: impl AsRef<str>) {
        self.entries.push(ErrorEntry {
            start_line,
            end_line,
            message: CompactString::new(message.as_ref()),
        });
    }

    /// Records a compiler error, using its own line when it has one.
    pub fn record(&mut self, err: &CompileError, fallback_line: usize) {
        match err {
            CompileError::Parser { line, message } => {
                self.push(*line, message.as_str());
            }
            other => self.push(fallback_line, other.to_string()),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ErrorEntry> {
        self.entries.iter()
    }
}

impl std::error::Error for ErrorList {}

impl std::fmt::Display for ErrorList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for entry in &self.entries {
            writeln!(f, "error: {entry}")?;
        }
        let noun = if self.entries.len() == 1 {
            "error"
        } else {
            "errors"
        };
        write!(f, "compilation failed with {} {noun}", self.entries.len())
    }
}

impl IntoIterator for ErrorList {
    type Item = ErrorEntry;
    type IntoIter = std::vec::IntoIter<ErrorEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parser_errors_keep_their_own_line() {
        let err = CompileError::parser(7, "oops").at_line(99);
        assert_eq!(err, CompileError::parser(7, "oops"));
    }

    #[test]
    fn structural_errors_become_parser_errors_with_line() {
        let err = CompileError::EndOfSource.at_line(3);
        assert_eq!(err, CompileError::parser(3, "unexpected end of source"));
    }

    #[test]
    fn error_list_preserves_order() {
        let mut list = ErrorList::new();
        list.push(4, "first");
        list.push(2, "second");
        let lines: Vec<usize> = list.iter().map(|e| e.start_line).collect();
        assert_eq!(lines, vec![4, 2]);
    }

    #[test]
    fn fatal_errors_are_flagged() {
        assert!(CompileError::FullCodeData.is_fatal());
        assert!(CompileError::InvalidParameter("location").is_fatal());
        assert!(!CompileError::EndOfSource.is_fatal());
    }
}
