use crate::callable::Callable;
use crate::error::{CompileError, CompileResult};
use crate::types::DataType;
use crate::{CodeValue, FieldValue, PopString};
use std::fmt::Display;

pub mod list;

pub use list::{FragmentList, Pointer};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
/// The type tag of a code fragment.
pub enum FragmentKind {
    Identifier,
    LiteralInteger,
    TypeConstant,
    Stopchar,
    Operator,
    Operation,
    FunctionCall,
    FunctionArguments,
    CommandArguments,
    Command,
    Instruction,
    Scope,
}

#[derive(Clone, Debug, PartialEq)]
/// A tagged lexical or syntactic atom. Fragments are value types: cloning
/// copies the whole subtree and equality is structural.
pub enum CodeFragment {
    Identifier(Identifier),
    LiteralInteger(LiteralInteger),
    TypeConstant(TypeConstant),
    Stopchar(Stopchar),
    Operator(Operator),
    Operation(Box<Operation>),
    FunctionCall(Box<FunctionCall>),
    FunctionArguments(FunctionArguments),
    CommandArguments(CommandArguments),
    Command(Command),
    Instruction(Box<Instruction>),
    Scope(Scope),
}

impl CodeFragment {
    pub fn kind(&self) -> FragmentKind {
        match self {
            CodeFragment::Identifier(_) => FragmentKind::Identifier,
            CodeFragment::LiteralInteger(_) => FragmentKind::LiteralInteger,
            CodeFragment::TypeConstant(_) => FragmentKind::TypeConstant,
            CodeFragment::Stopchar(_) => FragmentKind::Stopchar,
            CodeFragment::Operator(_) => FragmentKind::Operator,
            CodeFragment::Operation(_) => FragmentKind::Operation,
            CodeFragment::FunctionCall(_) => FragmentKind::FunctionCall,
            CodeFragment::FunctionArguments(_) => FragmentKind::FunctionArguments,
            CodeFragment::CommandArguments(_) => FragmentKind::CommandArguments,
            CodeFragment::Command(_) => FragmentKind::Command,
            CodeFragment::Instruction(_) => FragmentKind::Instruction,
            CodeFragment::Scope(_) => FragmentKind::Scope,
        }
    }

    pub fn is(&self, kind: FragmentKind) -> bool {
        self.kind() == kind
    }

    /// Whether this fragment is an evaluable expression node.
    pub fn is_statement(&self) -> bool {
        matches!(
            self,
            CodeFragment::Identifier(_)
                | CodeFragment::LiteralInteger(_)
                | CodeFragment::TypeConstant(_)
                | CodeFragment::Operation(_)
                | CodeFragment::FunctionCall(_)
                | CodeFragment::FunctionArguments(_)
        )
    }

    /// Converts into the statement subset, when this fragment belongs to
    /// it.
    pub fn into_statement(self) -> Option<Statement> {
        match self {
            CodeFragment::Identifier(id) => Some(Statement::Identifier(id)),
            CodeFragment::LiteralInteger(lit) => Some(Statement::LiteralInteger(lit)),
            CodeFragment::TypeConstant(tc) => Some(Statement::TypeConstant(tc)),
            CodeFragment::Operation(op) => Some(Statement::Operation(op)),
            CodeFragment::FunctionCall(fc) => Some(Statement::FunctionCall(fc)),
            CodeFragment::FunctionArguments(args) => Some(Statement::FunctionArguments(args)),
            _ => None,
        }
    }
}

impl std::fmt::Display for CodeFragment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodeFragment::Identifier(x) => x.fmt(f),
            CodeFragment::LiteralInteger(x) => x.fmt(f),
            CodeFragment::TypeConstant(x) => x.fmt(f),
            CodeFragment::Stopchar(x) => x.fmt(f),
            CodeFragment::Operator(x) => x.fmt(f),
            CodeFragment::Operation(x) => x.fmt(f),
            CodeFragment::FunctionCall(x) => x.fmt(f),
            CodeFragment::FunctionArguments(x) => x.fmt(f),
            CodeFragment::CommandArguments(x) => x.fmt(f),
            CodeFragment::Command(x) => x.fmt(f),
            CodeFragment::Instruction(x) => x.fmt(f),
            CodeFragment::Scope(x) => x.fmt(f),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
/// The subset of fragments that form expression trees.
pub enum Statement {
    Identifier(Identifier),
    LiteralInteger(LiteralInteger),
    TypeConstant(TypeConstant),
    Operation(Box<Operation>),
    FunctionCall(Box<FunctionCall>),
    FunctionArguments(FunctionArguments),
}

impl Statement {
    pub fn kind(&self) -> FragmentKind {
        match self {
            Statement::Identifier(_) => FragmentKind::Identifier,
            Statement::LiteralInteger(_) => FragmentKind::LiteralInteger,
            Statement::TypeConstant(_) => FragmentKind::TypeConstant,
            Statement::Operation(_) => FragmentKind::Operation,
            Statement::FunctionCall(_) => FragmentKind::FunctionCall,
            Statement::FunctionArguments(_) => FragmentKind::FunctionArguments,
        }
    }

    pub fn is(&self, kind: FragmentKind) -> bool {
        self.kind() == kind
    }

    pub fn as_identifier(&self) -> Option<&Identifier> {
        match self {
            Statement::Identifier(id) => Some(id),
            _ => None,
        }
    }
}

impl From<Statement> for CodeFragment {
    fn from(statement: Statement) -> CodeFragment {
        match statement {
            Statement::Identifier(id) => CodeFragment::Identifier(id),
            Statement::LiteralInteger(lit) => CodeFragment::LiteralInteger(lit),
            Statement::TypeConstant(tc) => CodeFragment::TypeConstant(tc),
            Statement::Operation(op) => CodeFragment::Operation(op),
            Statement::FunctionCall(fc) => CodeFragment::FunctionCall(fc),
            Statement::FunctionArguments(args) => CodeFragment::FunctionArguments(args),
        }
    }
}

impl std::fmt::Display for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Statement::Identifier(x) => x.fmt(f),
            Statement::LiteralInteger(x) => x.fmt(f),
            Statement::TypeConstant(x) => x.fmt(f),
            Statement::Operation(x) => x.fmt(f),
            Statement::FunctionCall(x) => x.fmt(f),
            Statement::FunctionArguments(x) => x.fmt(f),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
/// A source identifier matching `[_A-Za-z][_A-Za-z0-9]*`.
pub struct Identifier(PopString);

impl Identifier {
    pub fn new(text: &str) -> CompileResult<Identifier> {
        if !Identifier::is_valid(text) {
            return Err(CompileError::InvalidIdentifier(PopString::new(text)));
        }
        Ok(Identifier(PopString::new(text)))
    }

    pub fn is_valid(text: &str) -> bool {
        let mut chars = text.chars();
        match chars.next() {
            Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
            _ => return false,
        }
        chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
/// A 32-bit signed integer literal.
pub struct LiteralInteger(FieldValue);

impl LiteralInteger {
    pub fn new(value: FieldValue) -> LiteralInteger {
        LiteralInteger(value)
    }

    pub fn value(self) -> FieldValue {
        self.0
    }

    /// Whether the text is an integer literal in base 10, 8 (leading `0`)
    /// or 16 (leading `0x`/`0X`).
    pub fn is_valid(text: &str) -> bool {
        match LiteralInteger::split_base(text) {
            (16, digits) => !digits.is_empty() && digits.chars().all(|c| c.is_ascii_hexdigit()),
            (_, digits) => !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()),
        }
    }

    /// Parses a literal, honouring the base prefix.
    pub fn parse(text: &str) -> CompileResult<LiteralInteger> {
        let (base, digits) = LiteralInteger::split_base(text);
        FieldValue::from_str_radix(digits, base)
            .map(LiteralInteger)
            .map_err(|_| CompileError::InvalidIdentifier(PopString::new(text)))
    }

    fn split_base(text: &str) -> (u32, &str) {
        if let Some(rest) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
            (16, rest)
        } else if text.len() > 1 && text.starts_with('0') {
            (8, &text[1..])
        } else {
            (10, text)
        }
    }
}

impl std::fmt::Display for LiteralInteger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
/// A source identifier resolved to a value of one of the closed
/// enumerations.
pub struct TypeConstant {
    value: CodeValue,
    data_type: DataType,
}

impl TypeConstant {
    /// Whether the text names a value of a registered enumeration.
    pub fn is_valid(text: &str) -> bool {
        DataType::find_type_from_value_name(text).is_some()
    }

    /// Whether the code belongs to a registered enumeration.
    pub fn is_valid_code(code: CodeValue) -> bool {
        DataType::find_type_from_value(code).is_some()
    }

    /// Resolves a value identifier.
    pub fn parse(text: &str) -> Option<TypeConstant> {
        let data_type = DataType::find_type_from_value_name(text)?;
        let value = data_type.identifier_value(text)?;
        Some(TypeConstant { value, data_type })
    }

    /// Resolves a value code.
    pub fn parse_code(code: CodeValue) -> Option<TypeConstant> {
        let data_type = DataType::find_type_from_value(code)?;
        Some(TypeConstant {
            value: code,
            data_type,
        })
    }

    pub fn value(self) -> CodeValue {
        self.value
    }

    pub fn data_type(self) -> DataType {
        self.data_type
    }
}

impl std::fmt::Display for TypeConstant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.data_type.value_identifier(self.value) {
            Some(identifier) => f.write_str(identifier),
            None => self.value.fmt(f),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
/// A separator symbol.
pub enum Stopchar {
    Semicolon,
    Comma,
    Colon,
}

impl Stopchar {
    pub fn symbol(self) -> char {
        match self {
            Stopchar::Semicolon => ';',
            Stopchar::Comma => ',',
            Stopchar::Colon => ':',
        }
    }
}

impl std::fmt::Display for Stopchar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
/// The arity class of an operator.
pub enum OperatorKind {
    Unary,
    Binary,
    Ternary,
    Assignment,
}

#[derive(Copy, Clone, Debug)]
/// An operator of the expression grammar.
///
/// Lower priority binds tighter. Identical symbols at different positions
/// (prefix `++` vs suffix `++`, unary vs binary `-`) are distinct operator
/// values; equality is by the (symbol, kind, priority, right-to-left)
/// tuple.
pub struct Operator {
    symbol: &'static str,
    kind: OperatorKind,
    priority: u8,
    right_to_left: bool,
    conditional: bool,
}

impl PartialEq for Operator {
    fn eq(&self, other: &Self) -> bool {
        self.symbol == other.symbol
            && self.kind == other.kind
            && self.priority == other.priority
            && self.right_to_left == other.right_to_left
    }
}

impl Eq for Operator {}

impl Operator {
    pub const SUFFIX_INCREMENT: Operator = Operator::new("++", OperatorKind::Unary, 0, false, false);
    pub const SUFFIX_DECREMENT: Operator = Operator::new("--", OperatorKind::Unary, 0, false, false);

    pub const PREFIX_INCREMENT: Operator = Operator::new("++", OperatorKind::Unary, 1, true, false);
    pub const PREFIX_DECREMENT: Operator = Operator::new("--", OperatorKind::Unary, 1, true, false);
    pub const UNARY_MINUS: Operator = Operator::new("-", OperatorKind::Unary, 1, true, false);
    pub const NOT: Operator = Operator::new("!", OperatorKind::Unary, 1, true, false);

    pub const MULTIPLICATION: Operator = Operator::new("*", OperatorKind::Binary, 2, false, false);
    pub const DIVISION: Operator = Operator::new("/", OperatorKind::Binary, 2, false, false);

    pub const ADDITION: Operator = Operator::new("+", OperatorKind::Binary, 3, false, false);
    pub const SUBTRACTION: Operator = Operator::new("-", OperatorKind::Binary, 3, false, false);

    pub const GREATER_THAN: Operator = Operator::new(">", OperatorKind::Binary, 4, false, true);
    pub const SMALLER_THAN: Operator = Operator::new("<", OperatorKind::Binary, 4, false, true);
    pub const GREATER_EQUALS_THAN: Operator =
        Operator::new(">=", OperatorKind::Binary, 4, false, true);
    pub const SMALLER_EQUALS_THAN: Operator =
        Operator::new("<=", OperatorKind::Binary, 4, false, true);

    pub const EQUALS_TO: Operator = Operator::new("==", OperatorKind::Binary, 5, false, true);
    pub const NOT_EQUALS_TO: Operator = Operator::new("!=", OperatorKind::Binary, 5, false, true);

    pub const AND: Operator = Operator::new("&&", OperatorKind::Binary, 6, false, false);
    pub const OR: Operator = Operator::new("||", OperatorKind::Binary, 6, false, false);

    pub const TERNARY_CONDITIONAL: Operator =
        Operator::new("?:", OperatorKind::Ternary, 7, false, false);

    pub const ASSIGNMENT: Operator = Operator::new("=", OperatorKind::Assignment, 8, true, false);
    pub const ASSIGNMENT_ADDITION: Operator =
        Operator::new("+=", OperatorKind::Assignment, 8, true, false);
    pub const ASSIGNMENT_SUBTRACTION: Operator =
        Operator::new("-=", OperatorKind::Assignment, 8, true, false);
    pub const ASSIGNMENT_MULTIPLICATION: Operator =
        Operator::new("*=", OperatorKind::Assignment, 8, true, false);
    pub const ASSIGNMENT_DIVISION: Operator =
        Operator::new("/=", OperatorKind::Assignment, 8, true, false);

    const fn new(
        symbol: &'static str,
        kind: OperatorKind,
        priority: u8,
        right_to_left: bool,
        conditional: bool,
    ) -> Operator {
        Operator {
            symbol,
            kind,
            priority,
            right_to_left,
            conditional,
        }
    }

    /// Resolves an operator symbol to its operator value. The previous
    /// fragment decides between prefix and suffix/binary interpretations:
    /// a statement-kind fragment on the left forces the suffix or binary
    /// form.
    pub fn from_symbol(symbol: &str, after_statement: bool) -> Option<Operator> {
        let op = match symbol {
            "++" if after_statement => Operator::SUFFIX_INCREMENT,
            "--" if after_statement => Operator::SUFFIX_DECREMENT,
            "++" => Operator::PREFIX_INCREMENT,
            "--" => Operator::PREFIX_DECREMENT,
            "-" if after_statement => Operator::SUBTRACTION,
            "-" => Operator::UNARY_MINUS,
            "!" => Operator::NOT,
            "*" => Operator::MULTIPLICATION,
            "/" => Operator::DIVISION,
            "+" => Operator::ADDITION,
            ">" => Operator::GREATER_THAN,
            "<" => Operator::SMALLER_THAN,
            ">=" => Operator::GREATER_EQUALS_THAN,
            "<=" => Operator::SMALLER_EQUALS_THAN,
            "==" => Operator::EQUALS_TO,
            "!=" => Operator::NOT_EQUALS_TO,
            "&&" => Operator::AND,
            "||" => Operator::OR,
            "?" => Operator::TERNARY_CONDITIONAL,
            "=" => Operator::ASSIGNMENT,
            "+=" => Operator::ASSIGNMENT_ADDITION,
            "-=" => Operator::ASSIGNMENT_SUBTRACTION,
            "*=" => Operator::ASSIGNMENT_MULTIPLICATION,
            "/=" => Operator::ASSIGNMENT_DIVISION,
            _ => return None,
        };
        Some(op)
    }

    pub fn symbol(&self) -> &'static str {
        self.symbol
    }

    pub fn priority(&self) -> u8 {
        self.priority
    }

    pub fn has_right_to_left(&self) -> bool {
        self.right_to_left
    }

    pub fn is_conditional(&self) -> bool {
        self.conditional
    }

    pub fn is_unary(&self) -> bool {
        self.kind == OperatorKind::Unary
    }

    pub fn is_binary(&self) -> bool {
        self.kind == OperatorKind::Binary
    }

    pub fn is_ternary(&self) -> bool {
        self.kind == OperatorKind::Ternary
    }

    pub fn is_assignment(&self) -> bool {
        self.kind == OperatorKind::Assignment
    }

    /// Compares binding strength: 1 when `self` binds tighter than
    /// `other`, -1 when looser. Equal priorities compare 0 unless either
    /// operator is right-to-left, which forces a right-deep tree.
    pub fn compare_priority(&self, other: &Operator) -> i32 {
        if self.priority == other.priority {
            if self.right_to_left || other.right_to_left {
                -1
            } else {
                0
            }
        } else if self.priority < other.priority {
            1
        } else {
            -1
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol)
    }
}

#[derive(Clone, Debug, PartialEq)]
/// An applied operator with its packed operands.
pub struct Operation {
    operator: Operator,
    operands: Vec<Statement>,
}

impl Operation {
    /// Builds a unary operation. The operand must be an identifier.
    pub fn unary(operator: Operator, operand: Statement) -> CompileResult<Operation> {
        if !operator.is_unary() {
            return Err(CompileError::BadOperation(
                "a unary operation requires a unary operator",
            ));
        }
        if !operand.is(FragmentKind::Identifier) {
            return Err(CompileError::BadOperation(
                "a unary operator requires an identifier operand",
            ));
        }
        Ok(Operation {
            operator,
            operands: vec![operand],
        })
    }

    /// Builds a binary operation.
    pub fn binary(operator: Operator, left: Statement, right: Statement) -> CompileResult<Operation> {
        if !operator.is_binary() {
            return Err(CompileError::BadOperation(
                "a binary operation requires a binary operator",
            ));
        }
        Ok(Operation {
            operator,
            operands: vec![left, right],
        })
    }

    /// Builds a ternary conditional.
    pub fn ternary(condition: Statement, if_true: Statement, if_false: Statement) -> Operation {
        Operation {
            operator: Operator::TERNARY_CONDITIONAL,
            operands: vec![condition, if_true, if_false],
        }
    }

    /// Builds an assignment. The left operand must be an identifier.
    pub fn assignment(
        operator: Operator,
        left: Statement,
        right: Statement,
    ) -> CompileResult<Operation> {
        if !operator.is_assignment() {
            return Err(CompileError::BadOperation(
                "an assignment requires an assignment operator",
            ));
        }
        if !left.is(FragmentKind::Identifier) {
            return Err(CompileError::BadOperation(
                "the left side of an assignment must be an identifier",
            ));
        }
        Ok(Operation {
            operator,
            operands: vec![left, right],
        })
    }

    pub fn operator(&self) -> &Operator {
        &self.operator
    }

    pub fn operand_count(&self) -> usize {
        self.operands.len()
    }

    pub fn operand(&self, idx: usize) -> &Statement {
        &self.operands[idx]
    }

    pub fn is_unary(&self) -> bool {
        self.operator.is_unary()
    }

    pub fn is_binary(&self) -> bool {
        self.operator.is_binary()
    }

    pub fn is_ternary(&self) -> bool {
        self.operator.is_ternary()
    }

    pub fn is_assignment(&self) -> bool {
        self.operator.is_assignment()
    }

    pub fn unary_operand(&self) -> &Statement {
        &self.operands[0]
    }

    pub fn left_operand(&self) -> &Statement {
        &self.operands[0]
    }

    pub fn right_operand(&self) -> &Statement {
        &self.operands[1]
    }

    pub fn condition_operand(&self) -> &Statement {
        &self.operands[0]
    }

    pub fn true_case_operand(&self) -> &Statement {
        &self.operands[1]
    }

    pub fn false_case_operand(&self) -> &Statement {
        &self.operands[2]
    }

    /// Wraps into a statement.
    pub fn into_statement(self) -> Statement {
        Statement::Operation(Box::new(self))
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_unary() {
            let suffix = self.operator == Operator::SUFFIX_INCREMENT
                || self.operator == Operator::SUFFIX_DECREMENT;
            if suffix {
                write!(f, "{}{}", self.operands[0], self.operator)
            } else {
                write!(f, "{}{}", self.operator, self.operands[0])
            }
        } else if self.is_ternary() {
            write!(
                f,
                "{} ? {} : {}",
                self.operands[0], self.operands[1], self.operands[2]
            )
        } else {
            write!(f, "{} {} {}", self.operands[0], self.operator, self.operands[1])
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
/// A call of a registered callable with packed arguments.
pub struct FunctionCall {
    callable: Callable,
    arguments: FunctionArguments,
}

impl FunctionCall {
    /// Builds a call; the argument statement must be an argument list.
    pub fn make(callable: Callable, arguments: Statement) -> CompileResult<FunctionCall> {
        match arguments {
            Statement::FunctionArguments(arguments) => Ok(FunctionCall {
                callable,
                arguments,
            }),
            _ => Err(CompileError::BadFunctionCall(
                "expected an argument list for the function call",
            )),
        }
    }

    pub fn callable(&self) -> &Callable {
        &self.callable
    }

    pub fn arguments(&self) -> &FunctionArguments {
        &self.arguments
    }

    pub fn into_statement(self) -> Statement {
        Statement::FunctionCall(Box::new(self))
    }
}

impl std::fmt::Display for FunctionCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.callable.name(), self.arguments)
    }
}

/// Renders an argument list as `(a, b, c)`.
fn fmt_arguments(args: &[Statement], f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str("(")?;
    for (idx, arg) in args.iter().enumerate() {
        if idx > 0 {
            f.write_str(", ")?;
        }
        arg.fmt(f)?;
    }
    f.write_str(")")
}

#[derive(Clone, Debug, Default, PartialEq)]
/// An ordered statement list in value position; also serves as
/// parenthesised grouping, so it is itself a statement.
pub struct FunctionArguments(Vec<Statement>);

impl FunctionArguments {
    pub fn new() -> FunctionArguments {
        FunctionArguments::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn push(&mut self, argument: Statement) {
        self.0.push(argument);
    }

    pub fn get(&self, idx: usize) -> &Statement {
        &self.0[idx]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Statement> {
        self.0.iter()
    }
}

impl std::fmt::Display for FunctionArguments {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fmt_arguments(&self.0, f)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
/// An ordered statement list in command position (`if`, `every`). Not a
/// statement itself.
pub struct CommandArguments(Vec<Statement>);

impl CommandArguments {
    pub fn new() -> CommandArguments {
        CommandArguments::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn push(&mut self, argument: Statement) {
        self.0.push(argument);
    }

    pub fn get(&self, idx: usize) -> &Statement {
        &self.0[idx]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Statement> {
        self.0.iter()
    }
}

impl std::fmt::Display for CommandArguments {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fmt_arguments(&self.0, f)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
/// A reserved command keyword.
pub enum Command {
    Var,
    Const,
    Define,
    Import,
    If,
    Else,
    Every,
}

impl Command {
    /// Resolves a reserved keyword. `define` and `import` are part of the
    /// command set but are not produced by the tokenizer.
    pub fn from_keyword(text: &str) -> Option<Command> {
        match text {
            "var" => Some(Command::Var),
            "const" => Some(Command::Const),
            "if" => Some(Command::If),
            "else" => Some(Command::Else),
            "every" => Some(Command::Every),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Command::Var => "var",
            Command::Const => "const",
            Command::Define => "define",
            Command::Import => "import",
            Command::If => "if",
            Command::Else => "else",
            Command::Every => "every",
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug, PartialEq)]
/// A single entry of a `var` declaration.
pub struct VarEntry {
    identifier: Identifier,
    init: Option<Statement>,
}

impl VarEntry {
    pub fn new(identifier: Identifier, init: Option<Statement>) -> VarEntry {
        VarEntry { identifier, init }
    }

    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    pub fn has_init_value(&self) -> bool {
        self.init.is_some()
    }

    pub fn init_value(&self) -> Option<&Statement> {
        self.init.as_ref()
    }
}

#[derive(Clone, Debug, PartialEq)]
/// A single entry of a `const` declaration.
pub struct ConstEntry {
    identifier: Identifier,
    value: FieldValue,
}

impl ConstEntry {
    pub fn new(identifier: Identifier, value: FieldValue) -> ConstEntry {
        ConstEntry { identifier, value }
    }

    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    pub fn value(&self) -> FieldValue {
        self.value
    }
}

/// The closed set of every-loop period masks, `2^0` through `2^15`.
const EVERY_FIRST_VALUES: [CodeValue; 16] = [
    1 << 0,
    1 << 1,
    1 << 2,
    1 << 3,
    1 << 4,
    1 << 5,
    1 << 6,
    1 << 7,
    1 << 8,
    1 << 9,
    1 << 10,
    1 << 11,
    1 << 12,
    1 << 13,
    1 << 14,
    1 << 15,
];

#[derive(Clone, Debug, PartialEq)]
/// A top-level declarative or control-flow unit.
pub enum Instruction {
    /// A single optional statement terminated by `;`.
    Statement(Option<Statement>),
    /// An ordered list of instructions from a `{ }` block.
    StatementScope(Vec<Instruction>),
    VarDeclaration(Vec<VarEntry>),
    ConstDeclaration(Vec<ConstEntry>),
    Conditional {
        condition: Statement,
        block: Box<Instruction>,
        else_block: Option<Box<Instruction>>,
    },
    EveryLoop {
        turns: CodeValue,
        block: Box<Instruction>,
    },
}

impl Instruction {
    /// The smallest power of two in `{2^0 .. 2^15}` that is at least
    /// `turns`, saturating at `2^15`.
    pub fn every_first_value(turns: CodeValue) -> CodeValue {
        for &value in EVERY_FIRST_VALUES.iter() {
            if turns <= value {
                return value;
            }
        }
        EVERY_FIRST_VALUES[EVERY_FIRST_VALUES.len() - 1]
    }

    /// The offset of the period mask from the requested turn count.
    pub fn every_second_value(turns: CodeValue) -> CodeValue {
        Instruction::every_first_value(turns).saturating_sub(turns)
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Instruction::Statement(None) => f.write_str(";"),
            Instruction::Statement(Some(statement)) => write!(f, "{statement};"),
            Instruction::StatementScope(instructions) => fmt_scope(instructions, f),
            Instruction::VarDeclaration(entries) => {
                f.write_str("var ")?;
                for (idx, entry) in entries.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    entry.identifier().fmt(f)?;
                    if let Some(init) = entry.init_value() {
                        write!(f, " = {init}")?;
                    }
                }
                f.write_str(";")
            }
            Instruction::ConstDeclaration(entries) => {
                f.write_str("const ")?;
                for (idx, entry) in entries.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{} = {}", entry.identifier(), entry.value())?;
                }
                f.write_str(";")
            }
            Instruction::Conditional {
                condition,
                block,
                else_block,
            } => {
                write!(f, "if({condition}) {block}")?;
                if let Some(else_block) = else_block {
                    write!(f, " else {else_block}")?;
                }
                Ok(())
            }
            Instruction::EveryLoop { turns, block } => {
                let first = Instruction::every_first_value(*turns);
                let second = Instruction::every_second_value(*turns);
                if second > 0 {
                    write!(f, "every({first}, {second}) {block}")
                } else {
                    write!(f, "every({first}) {block}")
                }
            }
        }
    }
}

/// Renders a `{ }` block.
fn fmt_scope(instructions: &[Instruction], f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    if instructions.is_empty() {
        return f.write_str("{}");
    }
    f.write_str("{ ")?;
    for instruction in instructions {
        write!(f, "{instruction} ")?;
    }
    f.write_str("}")
}

#[derive(Clone, Debug, Default, PartialEq)]
/// An ordered list of instructions.
pub struct Scope(Vec<Instruction>);

impl Scope {
    pub fn new() -> Scope {
        Scope::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, idx: usize) -> &Instruction {
        &self.0[idx]
    }

    pub fn push(&mut self, instruction: Instruction) {
        self.0.push(instruction);
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.0
    }

    pub fn into_instructions(self) -> Vec<Instruction> {
        self.0
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fmt_scope(&self.0, f)
    }
}
