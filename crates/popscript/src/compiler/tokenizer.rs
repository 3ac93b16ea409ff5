use tracing::trace;

use crate::callable::Callable;
use crate::compiler::statement;
use crate::error::{CompileError, CompileResult};
use crate::fragment::{
    CodeFragment, Command, CommandArguments, FragmentList, FunctionArguments, FunctionCall,
    Identifier, LiteralInteger, Operator, Stopchar, TypeConstant,
};
use crate::reader::CodeReader;

/// One logical unit of tokenized source, as consumed by the instruction
/// parser.
#[derive(Clone, Debug, PartialEq)]
pub enum TokenizedUnit {
    /// Fragments up to and including a top-level `;`.
    Statement(FragmentList),
    /// Fragments seen before an opening `{`.
    BlockOpen(FragmentList),
    /// Fragments seen before a closing `}`; well-formed input leaves this
    /// empty.
    BlockClose(FragmentList),
    /// End of source, with any unterminated leftover fragments.
    End(FragmentList),
}

impl TokenizedUnit {
    pub fn fragments(&self) -> &FragmentList {
        match self {
            TokenizedUnit::Statement(list)
            | TokenizedUnit::BlockOpen(list)
            | TokenizedUnit::BlockClose(list)
            | TokenizedUnit::End(list) => list,
        }
    }
}

/// The partial token under construction.
///
/// Flushing an empty builder does nothing; decoding an empty builder is an
/// illegal state. Decode order: reserved keyword, enumeration value,
/// integer literal, identifier.
#[derive(Default)]
struct Builder {
    text: String,
}

impl Builder {
    fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    fn push(&mut self, c: char) {
        self.text.push(c);
    }

    /// Decodes the buffer and appends the fragment to `out`. Reports
    /// whether `out` holds any fragment afterwards.
    fn flush(&mut self, out: &mut Vec<CodeFragment>) -> CompileResult<bool> {
        if self.is_empty() {
            return Ok(!out.is_empty());
        }
        let fragment = self.decode()?;
        self.text.clear();
        out.push(fragment);
        Ok(true)
    }

    fn decode(&self) -> CompileResult<CodeFragment> {
        if self.is_empty() {
            return Err(CompileError::IllegalState);
        }
        let text = self.text.as_str();
        if let Some(command) = Command::from_keyword(text) {
            return Ok(CodeFragment::Command(command));
        }
        if TypeConstant::is_valid(text) {
            let constant = TypeConstant::parse(text).ok_or(CompileError::UnexpectedNull)?;
            return Ok(CodeFragment::TypeConstant(constant));
        }
        if LiteralInteger::is_valid(text) {
            return Ok(CodeFragment::LiteralInteger(LiteralInteger::parse(text)?));
        }
        Identifier::new(text).map(CodeFragment::Identifier)
    }
}

/// Converts the source stream into logical units of code fragments.
pub struct Tokenizer<'a> {
    reader: &'a mut CodeReader,
}

/// Characters that may start an operator symbol.
const OPERATOR_CHARS: &str = "+-*/<>=!&|";

/// Two-character operator symbols.
const OPERATOR_PAIRS: [&str; 12] = [
    "++", "--", "+=", "-=", "*=", "/=", "<=", ">=", "==", "!=", "&&", "||",
];

impl<'a> Tokenizer<'a> {
    pub fn new(reader: &'a mut CodeReader) -> Tokenizer<'a> {
        Tokenizer { reader }
    }

    /// The 1-based line currently under the cursor.
    fn line(&self) -> usize {
        self.reader.current_line().max(1)
    }

    /// Produces the next logical unit.
    pub fn next_unit(&mut self) -> CompileResult<TokenizedUnit> {
        let mut out = Vec::new();
        let mut builder = Builder::default();
        let mut line = None;

        macro_rules! flush {
            () => {{
                builder
                    .flush(&mut out)
                    .map_err(|err| err.at_line(self.line()))?;
                if line.is_none() && !out.is_empty() {
                    line = Some(self.line());
                }
            }};
        }

        loop {
            let c = match self.reader.next() {
                Ok(c) => c,
                Err(_) => {
                    flush!();
                    let list = FragmentList::from_vec(line.unwrap_or(self.line()), out);
                    return Ok(TokenizedUnit::End(list));
                }
            };
            match c {
                ' ' | '\t' | '\n' | '\r' => flush!(),
                '/' if self.reader.peek_at(1) == Ok('/') => self.reader.seek_or_end('\n'),
                '/' if self.reader.peek_at(1) == Ok('*') => {
                    self.reader.next()?;
                    self.reader.seek_pair_or_end('*', '/');
                }
                ';' => {
                    flush!();
                    out.push(CodeFragment::Stopchar(Stopchar::Semicolon));
                    let list = FragmentList::from_vec(line.unwrap_or(self.line()), out);
                    trace!(line = list.source_line(), "tokenized statement line");
                    return Ok(TokenizedUnit::Statement(list));
                }
                ',' => {
                    flush!();
                    out.push(CodeFragment::Stopchar(Stopchar::Comma));
                }
                ':' => {
                    flush!();
                    out.push(CodeFragment::Stopchar(Stopchar::Colon));
                }
                '{' => {
                    flush!();
                    let list = FragmentList::from_vec(line.unwrap_or(self.line()), out);
                    return Ok(TokenizedUnit::BlockOpen(list));
                }
                '}' => {
                    flush!();
                    let list = FragmentList::from_vec(line.unwrap_or(self.line()), out);
                    return Ok(TokenizedUnit::BlockClose(list));
                }
                '(' => {
                    flush!();
                    self.read_group(&mut out)?;
                    if line.is_none() {
                        line = Some(self.line());
                    }
                }
                ')' => {
                    return Err(CompileError::parser(self.line(), "unexpected )"));
                }
                '?' => {
                    flush!();
                    out.push(CodeFragment::Operator(Operator::TERNARY_CONDITIONAL));
                }
                c if OPERATOR_CHARS.contains(c) => {
                    flush!();
                    let operator = self.read_operator(c, &out)?;
                    out.push(CodeFragment::Operator(operator));
                }
                c if c == '_' || c.is_ascii_alphanumeric() => builder.push(c),
                other => {
                    return Err(CompileError::parser(
                        self.line(),
                        format!("unexpected character {other:?}"),
                    ));
                }
            }
        }
    }

    /// Assembles a one or two character operator symbol. The previously
    /// emitted fragment discriminates prefix forms from suffix and binary
    /// forms.
    fn read_operator(&mut self, first: char, out: &[CodeFragment]) -> CompileResult<Operator> {
        let mut symbol = String::from(first);
        if let Ok(next) = self.reader.peek_at(1) {
            let mut pair = symbol.clone();
            pair.push(next);
            if OPERATOR_PAIRS.contains(&pair.as_str()) {
                self.reader.next()?;
                symbol = pair;
            }
        }
        let after_statement = out.last().is_some_and(CodeFragment::is_statement);
        Operator::from_symbol(&symbol, after_statement).ok_or_else(|| {
            CompileError::parser(self.line(), format!("unknown operator {symbol}"))
        })
    }

    /// Reads a parenthesised group after its `(` and folds it into the
    /// fragment the bracket belongs to: the arguments of a callable named
    /// by the preceding identifier, the arguments of a preceding command,
    /// or a plain parenthesised grouping.
    fn read_group(&mut self, out: &mut Vec<CodeFragment>) -> CompileResult<()> {
        let open_line = self.line();
        let mut inner = Vec::new();
        let mut builder = Builder::default();

        macro_rules! flush {
            () => {
                builder
                    .flush(&mut inner)
                    .map_err(|err| err.at_line(self.line()))?
            };
        }

        loop {
            let c = self
                .reader
                .next()
                .map_err(|_| CompileError::parser(open_line, "missing ) in argument list"))?;
            match c {
                ' ' | '\t' | '\n' | '\r' => {
                    flush!();
                }
                '/' if self.reader.peek_at(1) == Ok('/') => self.reader.seek_or_end('\n'),
                '/' if self.reader.peek_at(1) == Ok('*') => {
                    self.reader.next()?;
                    self.reader.seek_pair_or_end('*', '/');
                }
                ')' => {
                    flush!();
                    break;
                }
                '(' => {
                    flush!();
                    self.read_group(&mut inner)?;
                }
                ',' => {
                    flush!();
                    inner.push(CodeFragment::Stopchar(Stopchar::Comma));
                }
                ':' => {
                    flush!();
                    inner.push(CodeFragment::Stopchar(Stopchar::Colon));
                }
                '?' => {
                    flush!();
                    inner.push(CodeFragment::Operator(Operator::TERNARY_CONDITIONAL));
                }
                ';' | '{' | '}' => {
                    return Err(CompileError::parser(
                        self.line(),
                        format!("unexpected {c:?} in argument list"),
                    ));
                }
                c if OPERATOR_CHARS.contains(c) => {
                    flush!();
                    let operator = self.read_operator(c, &inner)?;
                    inner.push(CodeFragment::Operator(operator));
                }
                c if c == '_' || c.is_ascii_alphanumeric() => builder.push(c),
                other => {
                    return Err(CompileError::parser(
                        self.line(),
                        format!("unexpected character {other:?}"),
                    ));
                }
            }
        }

        let inner = FragmentList::from_vec(open_line, inner);
        fold_group(open_line, inner, out)
    }
}

/// Attaches a completed group to the preceding fragment: the arguments of
/// a preceding command, a call of the callable named by the preceding
/// identifier, or a plain parenthesised grouping.
fn fold_group(line: usize, inner: FragmentList, out: &mut Vec<CodeFragment>) -> CompileResult<()> {
    if matches!(out.last(), Some(CodeFragment::Command(_))) {
        let mut arguments = CommandArguments::new();
        for part in split_arguments(line, &inner)? {
            arguments.push(part);
        }
        out.push(CodeFragment::CommandArguments(arguments));
        return Ok(());
    }

    let callable = match out.last() {
        Some(CodeFragment::Identifier(name)) => Callable::find(name.as_str()).cloned(),
        _ => None,
    };
    let mut arguments = FunctionArguments::new();
    for part in split_arguments(line, &inner)? {
        arguments.push(part);
    }
    match callable {
        Some(callable) => {
            let call = FunctionCall::make(
                callable,
                crate::fragment::Statement::FunctionArguments(arguments),
            )
            .map_err(|err| err.at_line(line))?;
            out.pop();
            out.push(CodeFragment::FunctionCall(Box::new(call)));
        }
        None => out.push(CodeFragment::FunctionArguments(arguments)),
    }
    Ok(())
}

/// Splits a group body by top-level commas and parses each part as a
/// statement.
fn split_arguments(
    line: usize,
    inner: &FragmentList,
) -> CompileResult<Vec<crate::fragment::Statement>> {
    if inner.is_empty() {
        return Ok(Vec::new());
    }
    let separator = CodeFragment::Stopchar(Stopchar::Comma);
    let mut parts = Vec::new();
    for part in inner.split(&separator, None) {
        if part.is_empty() {
            return Err(CompileError::parser(line, "expected an argument"));
        }
        parts.push(statement::parse(&part)?);
    }
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::FragmentKind;

    fn units(source: &str) -> Vec<TokenizedUnit> {
        let mut reader = CodeReader::load(source);
        let mut tokenizer = Tokenizer::new(&mut reader);
        let mut units = Vec::new();
        loop {
            let unit = tokenizer.next_unit().unwrap();
            let done = matches!(unit, TokenizedUnit::End(_));
            units.push(unit);
            if done {
                return units;
            }
        }
    }

    fn first_line(source: &str) -> FragmentList {
        match units(source).remove(0) {
            TokenizedUnit::Statement(list) => list,
            other => panic!("expected a statement unit, got {other:?}"),
        }
    }

    #[test]
    fn keywords_decode_to_commands() {
        let list = first_line("var x;");
        assert_eq!(list.get(0), &CodeFragment::Command(Command::Var));
        assert_eq!(
            list.get(1),
            &CodeFragment::Identifier(Identifier::new("x").unwrap())
        );
        assert_eq!(list.get(2), &CodeFragment::Stopchar(Stopchar::Semicolon));
    }

    #[test]
    fn literals_decode_in_all_bases() {
        let list = first_line("x = 0x1F;");
        assert_eq!(
            list.get(2),
            &CodeFragment::LiteralInteger(LiteralInteger::new(31))
        );
        let list = first_line("x = 010;");
        assert_eq!(
            list.get(2),
            &CodeFragment::LiteralInteger(LiteralInteger::new(8))
        );
    }

    #[test]
    fn enumeration_values_decode_to_type_constants() {
        let list = first_line("x = Blue;");
        assert_eq!(
            list.get(2),
            &CodeFragment::TypeConstant(TypeConstant::parse("Blue").unwrap())
        );
    }

    #[test]
    fn suffix_and_prefix_operators_are_discriminated() {
        let list = first_line("x++;");
        assert_eq!(list.get(1), &CodeFragment::Operator(Operator::SUFFIX_INCREMENT));
        let list = first_line("++x;");
        assert_eq!(list.get(0), &CodeFragment::Operator(Operator::PREFIX_INCREMENT));
    }

    #[test]
    fn minus_is_binary_after_a_statement_fragment() {
        let list = first_line("a - b;");
        assert_eq!(list.get(1), &CodeFragment::Operator(Operator::SUBTRACTION));
        let list = first_line("x = -b;");
        assert_eq!(list.get(2), &CodeFragment::Operator(Operator::UNARY_MINUS));
    }

    #[test]
    fn comments_are_skipped() {
        let list = first_line("x = /* a comment */ 1; // trailing");
        assert_eq!(list.len(), 4);
        let list = first_line("// whole line\nx = 1;");
        assert_eq!(list.source_line(), 2);
    }

    #[test]
    fn line_numbers_are_attached_to_lists() {
        let all = units("x = 1;\n\ny = 2;");
        assert_eq!(all[0].fragments().source_line(), 1);
        assert_eq!(all[1].fragments().source_line(), 3);
    }

    #[test]
    fn braces_produce_block_units() {
        let all = units("if(a) { x = 1; }");
        assert!(matches!(all[0], TokenizedUnit::BlockOpen(_)));
        assert!(matches!(all[1], TokenizedUnit::Statement(_)));
        assert!(matches!(all[2], TokenizedUnit::BlockClose(_)));
    }

    #[test]
    fn command_brackets_fold_to_command_arguments() {
        let all = units("if(a == 1) { }");
        let list = all[0].fragments();
        assert_eq!(list.get(0), &CodeFragment::Command(Command::If));
        assert!(list.get(1).is(FragmentKind::CommandArguments));
    }

    #[test]
    fn callable_brackets_fold_to_function_calls() {
        let list = first_line("attack(Blue, 5);");
        let CodeFragment::FunctionCall(call) = list.get(0) else {
            panic!("expected a function call, got {:?}", list.get(0));
        };
        assert_eq!(call.callable().name(), "attack");
        assert_eq!(call.arguments().len(), 2);
    }

    #[test]
    fn plain_brackets_fold_to_groupings() {
        let list = first_line("x = (1 + 2) * 3;");
        assert!(list.get(2).is(FragmentKind::FunctionArguments));
        assert_eq!(list.get(3), &CodeFragment::Operator(Operator::MULTIPLICATION));
    }

    #[test]
    fn ternary_symbols_tokenize_as_operator_and_colon() {
        let list = first_line("x = a ? 1 : 2;");
        assert_eq!(
            list.get(3),
            &CodeFragment::Operator(Operator::TERNARY_CONDITIONAL)
        );
        assert_eq!(list.get(5), &CodeFragment::Stopchar(Stopchar::Colon));
    }

    #[test]
    fn invalid_identifiers_are_reported_with_their_line() {
        let mut reader = CodeReader::load("x = 3y;");
        let mut tokenizer = Tokenizer::new(&mut reader);
        let err = tokenizer.next_unit().unwrap_err();
        assert!(matches!(err, CompileError::Parser { line: 1, .. }));
    }

    #[test]
    fn unknown_operators_are_reported() {
        let mut reader = CodeReader::load("a & b;");
        let mut tokenizer = Tokenizer::new(&mut reader);
        assert!(tokenizer.next_unit().is_err());
    }

    #[test]
    fn unterminated_groups_are_reported() {
        let mut reader = CodeReader::load("attack(Blue;");
        let mut tokenizer = Tokenizer::new(&mut reader);
        assert!(tokenizer.next_unit().is_err());
    }

    #[test]
    fn rendered_fragments_match_the_source_modulo_whitespace() {
        let list = first_line("x  =  y+2 ;");
        let rendered: Vec<String> = list.fragments().iter().map(|f| f.to_string()).collect();
        assert_eq!(rendered.join(" "), "x = y + 2 ;");
    }

    #[test]
    fn end_unit_carries_unterminated_fragments() {
        let all = units("x = 1");
        let TokenizedUnit::End(list) = &all[0] else {
            panic!("expected end unit");
        };
        assert_eq!(list.len(), 3);
    }
}
