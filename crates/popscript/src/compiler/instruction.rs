//! Instruction parsing.
//!
//! Consumes logical units from the tokenizer and assembles typed
//! instructions: declarations, conditionals, every-loops, scopes and plain
//! statements. A unit is either a `;`-terminated fragment line or a brace
//! boundary; blocks may be `{ }` scopes or single inline instructions.

use crate::compiler::statement;
use crate::compiler::tokenizer::{TokenizedUnit, Tokenizer};
use crate::error::{CompileError, CompileResult};
use crate::fragment::{
    CodeFragment, Command, ConstEntry, FragmentList, Instruction, Scope, Statement, Stopchar,
    VarEntry,
};
use crate::reader::CodeReader;

/// Parses instructions out of a source cursor, one at a time.
pub struct InstructionParser<'a> {
    tokenizer: Tokenizer<'a>,
    pending: Option<TokenizedUnit>,
    depth: usize,
    finished: bool,
    last_line: usize,
}

impl<'a> InstructionParser<'a> {
    pub fn new(reader: &'a mut CodeReader) -> InstructionParser<'a> {
        InstructionParser {
            tokenizer: Tokenizer::new(reader),
            pending: None,
            depth: 0,
            finished: false,
            last_line: 1,
        }
    }

    /// The source line of the most recently consumed non-empty unit; used
    /// by the driver to attribute later-stage diagnostics.
    pub fn last_line(&self) -> usize {
        self.last_line
    }

    /// Parses the next top-level instruction. `None` at end of source.
    pub fn next_instruction(&mut self) -> CompileResult<Option<Instruction>> {
        if self.finished {
            return Ok(None);
        }
        let unit = self.next_unit()?;
        match unit {
            TokenizedUnit::End(list) => {
                self.finished = true;
                if list.is_empty() {
                    Ok(None)
                } else {
                    Err(CompileError::parser(
                        list.source_line(),
                        "expected ; at end of instruction",
                    ))
                }
            }
            TokenizedUnit::BlockClose(list) => Err(CompileError::parser(
                list.source_line(),
                "unexpected }",
            )),
            TokenizedUnit::BlockOpen(list) if list.is_empty() => {
                let scope = self.parse_scope()?;
                Ok(Some(Instruction::StatementScope(scope.into_instructions())))
            }
            TokenizedUnit::BlockOpen(list) => Ok(Some(self.dispatch(&list, true)?)),
            TokenizedUnit::Statement(list) => Ok(Some(self.dispatch(&list, false)?)),
        }
    }

    /// Discards units until the brace depth balances again. Used by the
    /// driver to resume at the next top-level instruction after an error.
    pub fn recover(&mut self) {
        self.pending = None;
        while self.depth > 0 {
            match self.next_unit() {
                Ok(TokenizedUnit::End(_)) | Err(_) => {
                    self.finished = true;
                    return;
                }
                Ok(_) => {}
            }
        }
    }

    fn next_unit(&mut self) -> CompileResult<TokenizedUnit> {
        let unit = match self.pending.take() {
            Some(unit) => unit,
            None => self.tokenizer.next_unit()?,
        };
        match unit {
            TokenizedUnit::BlockOpen(_) => self.depth += 1,
            TokenizedUnit::BlockClose(_) => self.depth = self.depth.saturating_sub(1),
            _ => {}
        }
        if !unit.fragments().is_empty() {
            self.last_line = unit.fragments().source_line();
        }
        Ok(unit)
    }

    fn push_back(&mut self, unit: TokenizedUnit) {
        match unit {
            TokenizedUnit::BlockOpen(_) => self.depth -= 1,
            TokenizedUnit::BlockClose(_) => self.depth += 1,
            _ => {}
        }
        self.pending = Some(unit);
    }

    /// Dispatches one fragment line by its leading fragment. `has_block`
    /// is set when the line was terminated by `{` instead of `;`.
    fn dispatch(&mut self, list: &FragmentList, has_block: bool) -> CompileResult<Instruction> {
        let line = list.source_line();
        match list.fragments().first() {
            Some(CodeFragment::Command(Command::Var)) => {
                self.expect_statement_form(list, has_block, "var")?;
                parse_var_declaration(list)
            }
            Some(CodeFragment::Command(Command::Const)) => {
                self.expect_statement_form(list, has_block, "const")?;
                parse_const_declaration(list)
            }
            Some(CodeFragment::Command(Command::If)) => self.parse_conditional(list, has_block),
            Some(CodeFragment::Command(Command::Every)) => self.parse_every(list, has_block),
            Some(CodeFragment::Command(command)) => Err(CompileError::parser(
                line,
                format!("{command} cannot start an instruction"),
            )),
            _ if has_block => Err(CompileError::parser(line, "unexpected {")),
            _ => parse_statement_instruction(list),
        }
    }

    fn expect_statement_form(
        &self,
        list: &FragmentList,
        has_block: bool,
        what: &str,
    ) -> CompileResult<()> {
        if has_block {
            return Err(CompileError::parser(
                list.source_line(),
                format!("unexpected {{ in {what} declaration"),
            ));
        }
        Ok(())
    }

    /// Parses the instructions of a `{ }` scope, after its opening brace.
    fn parse_scope(&mut self) -> CompileResult<Scope> {
        let mut scope = Scope::new();
        loop {
            let unit = self.next_unit()?;
            match unit {
                TokenizedUnit::Statement(list) => {
                    scope.push(self.dispatch(&list, false)?);
                }
                TokenizedUnit::BlockOpen(list) if list.is_empty() => {
                    let inner = self.parse_scope()?;
                    scope.push(Instruction::StatementScope(inner.into_instructions()));
                }
                TokenizedUnit::BlockOpen(list) => {
                    scope.push(self.dispatch(&list, true)?);
                }
                TokenizedUnit::BlockClose(list) => {
                    if !list.is_empty() {
                        return Err(CompileError::parser(
                            list.source_line(),
                            "expected ; before }",
                        ));
                    }
                    return Ok(scope);
                }
                TokenizedUnit::End(list) => {
                    return Err(CompileError::parser(list.source_line(), "missing }"));
                }
            }
        }
    }

    /// Parses the block of a conditional or every-loop: either a `{ }`
    /// scope (the line ended at `{`) or a single inline instruction built
    /// from the line's remaining fragments.
    fn parse_block(
        &mut self,
        list: &FragmentList,
        from: usize,
        has_block: bool,
    ) -> CompileResult<Instruction> {
        let rest = list.sublist_from(from);
        if has_block {
            if rest.is_empty() {
                let scope = self.parse_scope()?;
                return Ok(Instruction::StatementScope(scope.into_instructions()));
            }
            // The rest of the line is itself an instruction that owns the
            // opening brace, e.g. `if(a) if(b) {`.
            return self.dispatch(&rest, true);
        }
        if rest.is_empty() {
            return Err(CompileError::parser(
                list.source_line(),
                "expected an instruction",
            ));
        }
        self.dispatch(&rest, false)
    }

    fn parse_conditional(
        &mut self,
        list: &FragmentList,
        has_block: bool,
    ) -> CompileResult<Instruction> {
        let condition = command_condition(list, "if")?;
        let block = self.parse_block(list, 2, has_block)?;
        let else_block = self.parse_else_block()?;
        Ok(Instruction::Conditional {
            condition,
            block: Box::new(block),
            else_block: else_block.map(Box::new),
        })
    }

    /// Consumes an `else` block when the next unit starts with `else`.
    fn parse_else_block(&mut self) -> CompileResult<Option<Instruction>> {
        if self.finished {
            return Ok(None);
        }
        let unit = self.next_unit()?;
        let starts_with_else = matches!(
            unit.fragments().fragments().first(),
            Some(CodeFragment::Command(Command::Else))
        );
        if !starts_with_else {
            self.push_back(unit);
            return Ok(None);
        }

        match unit {
            TokenizedUnit::Statement(list) => {
                let rest = list.sublist_from(1);
                if rest.is_empty() {
                    return Err(CompileError::parser(
                        list.source_line(),
                        "expected an instruction after else",
                    ));
                }
                Ok(Some(self.dispatch(&rest, false)?))
            }
            TokenizedUnit::BlockOpen(list) => {
                if list.len() == 1 {
                    let scope = self.parse_scope()?;
                    Ok(Some(Instruction::StatementScope(scope.into_instructions())))
                } else {
                    Ok(Some(self.dispatch(&list.sublist_from(1), true)?))
                }
            }
            TokenizedUnit::BlockClose(list) | TokenizedUnit::End(list) => Err(
                CompileError::parser(list.source_line(), "expected an instruction after else"),
            ),
        }
    }

    fn parse_every(&mut self, list: &FragmentList, has_block: bool) -> CompileResult<Instruction> {
        let line = list.source_line();
        let argument = command_condition(list, "every")?;
        let turns = match argument {
            Statement::LiteralInteger(lit) => lit.value(),
            other => {
                return Err(CompileError::parser(
                    line,
                    format!("every expects an integer turn count, found {other}"),
                ));
            }
        };
        if turns < 1 || turns > i32::from(u16::MAX) {
            return Err(CompileError::parser(
                line,
                format!("every turn count {turns} is out of range"),
            ));
        }
        let block = self.parse_block(list, 2, has_block)?;
        Ok(Instruction::EveryLoop {
            turns: turns as u16,
            block: Box::new(block),
        })
    }
}

/// Extracts the single parenthesised argument of `if` or `every`.
fn command_condition(list: &FragmentList, what: &str) -> CompileResult<Statement> {
    let line = list.source_line();
    match list.fragments().get(1) {
        Some(CodeFragment::CommandArguments(args)) if args.len() == 1 => Ok(args.get(0).clone()),
        Some(CodeFragment::CommandArguments(_)) => Err(CompileError::parser(
            line,
            format!("{what} expects exactly one argument"),
        )),
        _ => Err(CompileError::parser(
            line,
            format!("expected ( after {what}"),
        )),
    }
}

/// Strips the leading command and trailing `;` of a declaration line.
fn declaration_body(list: &FragmentList) -> FragmentList {
    debug_assert_eq!(
        list.fragments().last(),
        Some(&CodeFragment::Stopchar(Stopchar::Semicolon))
    );
    list.sublist(1, list.len() - 2)
}

fn parse_var_declaration(list: &FragmentList) -> CompileResult<Instruction> {
    let line = list.source_line();
    let body = declaration_body(list);
    if body.is_empty() {
        return Err(CompileError::parser(line, "expected a variable name"));
    }
    let separator = CodeFragment::Stopchar(Stopchar::Comma);
    let mut entries = Vec::new();
    for part in body.split(&separator, None) {
        let identifier = match part.fragments().first() {
            Some(CodeFragment::Identifier(id)) => id.clone(),
            _ => {
                return Err(CompileError::parser(line, "expected a variable name"));
            }
        };
        if part.len() == 1 {
            entries.push(VarEntry::new(identifier, None));
            continue;
        }
        match part.get(1) {
            CodeFragment::Operator(op) if *op == crate::fragment::Operator::ASSIGNMENT => {}
            _ => {
                return Err(CompileError::parser(
                    line,
                    format!("expected = after {identifier}"),
                ));
            }
        }
        let init = statement::parse(&part.sublist_from(2))?;
        entries.push(VarEntry::new(identifier, Some(init)));
    }
    Ok(Instruction::VarDeclaration(entries))
}

fn parse_const_declaration(list: &FragmentList) -> CompileResult<Instruction> {
    let line = list.source_line();
    let body = declaration_body(list);
    if body.is_empty() {
        return Err(CompileError::parser(line, "expected a constant name"));
    }
    let separator = CodeFragment::Stopchar(Stopchar::Comma);
    let mut entries = Vec::new();
    for part in body.split(&separator, None) {
        match part.fragments() {
            [CodeFragment::Identifier(id), CodeFragment::Operator(op), CodeFragment::LiteralInteger(value)]
                if *op == crate::fragment::Operator::ASSIGNMENT =>
            {
                entries.push(ConstEntry::new(id.clone(), value.value()));
            }
            [CodeFragment::Identifier(id), ..] => {
                return Err(CompileError::parser(
                    line,
                    format!("constant {id} requires an integer literal value"),
                ));
            }
            _ => {
                return Err(CompileError::parser(line, "expected a constant name"));
            }
        }
    }
    Ok(Instruction::ConstDeclaration(entries))
}

/// A plain `;`-terminated statement instruction.
fn parse_statement_instruction(list: &FragmentList) -> CompileResult<Instruction> {
    debug_assert_eq!(
        list.fragments().last(),
        Some(&CodeFragment::Stopchar(Stopchar::Semicolon))
    );
    let body = list.sublist(0, list.len() - 1);
    if body.is_empty() {
        return Ok(Instruction::Statement(None));
    }
    Ok(Instruction::Statement(Some(statement::parse(&body)?)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::{Identifier, LiteralInteger, Operation, Operator};

    fn parse_all(source: &str) -> Vec<Instruction> {
        let mut reader = CodeReader::load(source);
        let mut parser = InstructionParser::new(&mut reader);
        let mut instructions = Vec::new();
        while let Some(instruction) = parser.next_instruction().unwrap() {
            instructions.push(instruction);
        }
        instructions
    }

    fn parse_one(source: &str) -> Instruction {
        let mut all = parse_all(source);
        assert_eq!(all.len(), 1, "expected one instruction");
        all.remove(0)
    }

    fn parse_err(source: &str) -> CompileError {
        let mut reader = CodeReader::load(source);
        let mut parser = InstructionParser::new(&mut reader);
        loop {
            match parser.next_instruction() {
                Ok(Some(_)) => {}
                Ok(None) => panic!("no error in {source:?}"),
                Err(err) => return err,
            }
        }
    }

    fn ident(name: &str) -> Identifier {
        Identifier::new(name).unwrap()
    }

    fn lit_statement(value: i32) -> Statement {
        Statement::LiteralInteger(LiteralInteger::new(value))
    }

    #[test]
    fn var_declaration_with_init_parses_as_e1() {
        let instruction = parse_one("var x = 3;");
        assert_eq!(
            instruction,
            Instruction::VarDeclaration(vec![VarEntry::new(ident("x"), Some(lit_statement(3)))])
        );
    }

    #[test]
    fn var_declaration_entries_may_omit_the_init() {
        let instruction = parse_one("var x, y = 2, z;");
        let Instruction::VarDeclaration(entries) = instruction else {
            panic!("expected a var declaration");
        };
        assert_eq!(entries.len(), 3);
        assert!(!entries[0].has_init_value());
        assert_eq!(entries[1].init_value(), Some(&lit_statement(2)));
        assert_eq!(entries[2].identifier(), &ident("z"));
    }

    #[test]
    fn const_declaration_parses_hex_as_e2() {
        let instruction = parse_one("const Y = 0x1F;");
        assert_eq!(
            instruction,
            Instruction::ConstDeclaration(vec![ConstEntry::new(ident("Y"), 31)])
        );
    }

    #[test]
    fn const_requires_a_literal_initialiser() {
        let err = parse_err("const Y = x + 1;");
        assert!(matches!(err, CompileError::Parser { line: 1, .. }));
    }

    #[test]
    fn conditional_with_else_parses_as_e3() {
        let instruction = parse_one("if(a == 1) { x = 2; } else x = 3;");
        let Instruction::Conditional {
            condition,
            block,
            else_block,
        } = instruction
        else {
            panic!("expected a conditional");
        };

        let expected_condition = Operation::binary(
            Operator::EQUALS_TO,
            Statement::Identifier(ident("a")),
            lit_statement(1),
        )
        .unwrap()
        .into_statement();
        assert_eq!(condition, expected_condition);

        let Instruction::StatementScope(then_instructions) = *block else {
            panic!("expected a scope block");
        };
        assert_eq!(then_instructions.len(), 1);
        let assign_two = Operation::assignment(
            Operator::ASSIGNMENT,
            Statement::Identifier(ident("x")),
            lit_statement(2),
        )
        .unwrap()
        .into_statement();
        assert_eq!(
            then_instructions[0],
            Instruction::Statement(Some(assign_two))
        );

        let assign_three = Operation::assignment(
            Operator::ASSIGNMENT,
            Statement::Identifier(ident("x")),
            lit_statement(3),
        )
        .unwrap()
        .into_statement();
        assert_eq!(
            else_block.map(|b| *b),
            Some(Instruction::Statement(Some(assign_three)))
        );
    }

    #[test]
    fn every_loop_parses_as_e4() {
        let instruction = parse_one("every(5) { x = x + 1; }");
        let Instruction::EveryLoop { turns, block } = instruction else {
            panic!("expected an every loop");
        };
        assert_eq!(turns, 5);
        assert_eq!(Instruction::every_first_value(turns), 8);
        assert_eq!(Instruction::every_second_value(turns), 3);
        let Instruction::StatementScope(body) = *block else {
            panic!("expected a scope block");
        };
        assert_eq!(body.len(), 1);
    }

    #[test]
    fn else_if_chains_nest_as_conditionals() {
        let instruction = parse_one("if(a) x = 1; else if(b) x = 2; else x = 3;");
        let Instruction::Conditional { else_block, .. } = instruction else {
            panic!("expected a conditional");
        };
        let Some(else_block) = else_block else {
            panic!("expected an else block");
        };
        let Instruction::Conditional {
            else_block: inner_else,
            ..
        } = *else_block
        else {
            panic!("expected a nested conditional");
        };
        assert!(inner_else.is_some());
    }

    #[test]
    fn dangling_else_attaches_to_the_nearest_if() {
        let instruction = parse_one("if(a) if(b) x = 1; else x = 2;");
        let Instruction::Conditional {
            block, else_block, ..
        } = instruction
        else {
            panic!("expected a conditional");
        };
        assert!(else_block.is_none(), "outer if must not take the else");
        let Instruction::Conditional {
            else_block: inner_else,
            ..
        } = *block
        else {
            panic!("expected a nested conditional");
        };
        assert!(inner_else.is_some());
    }

    #[test]
    fn inline_if_may_own_the_opening_brace() {
        let instruction = parse_one("if(a) if(b) { x = 1; }");
        let Instruction::Conditional { block, .. } = instruction else {
            panic!("expected a conditional");
        };
        let Instruction::Conditional { block: inner, .. } = *block else {
            panic!("expected a nested conditional");
        };
        assert!(matches!(*inner, Instruction::StatementScope(_)));
    }

    #[test]
    fn else_with_scope_block_parses() {
        let instruction = parse_one("if(a) { x = 1; } else { x = 2; }");
        let Instruction::Conditional { else_block, .. } = instruction else {
            panic!("expected a conditional");
        };
        assert!(matches!(
            else_block.map(|b| *b),
            Some(Instruction::StatementScope(_))
        ));
    }

    #[test]
    fn bare_scopes_nest() {
        let instructions = parse_all("{ x = 1; { y = 2; } }");
        assert_eq!(instructions.len(), 1);
        let Instruction::StatementScope(outer) = &instructions[0] else {
            panic!("expected a scope");
        };
        assert_eq!(outer.len(), 2);
        assert!(matches!(outer[1], Instruction::StatementScope(_)));
    }

    #[test]
    fn empty_statement_is_allowed() {
        assert_eq!(parse_one(";"), Instruction::Statement(None));
    }

    #[test]
    fn plain_statement_falls_through() {
        let instruction = parse_one("x = 1;");
        assert!(matches!(instruction, Instruction::Statement(Some(_))));
    }

    #[test]
    fn every_requires_a_literal_argument() {
        let err = parse_err("every(x) { }");
        assert!(matches!(err, CompileError::Parser { .. }));
    }

    #[test]
    fn every_turn_count_must_be_positive() {
        let err = parse_err("every(0) { }");
        assert!(matches!(err, CompileError::Parser { .. }));
    }

    #[test]
    fn unbalanced_close_brace_is_reported() {
        let err = parse_err("}");
        assert!(matches!(err, CompileError::Parser { .. }));
    }

    #[test]
    fn missing_close_brace_is_reported() {
        let err = parse_err("every(2) { x = 1;");
        assert!(matches!(err, CompileError::Parser { .. }));
    }

    #[test]
    fn missing_semicolon_at_end_is_reported() {
        let err = parse_err("x = 1");
        assert!(matches!(err, CompileError::Parser { .. }));
    }

    #[test]
    fn else_without_if_is_reported() {
        let err = parse_err("else x = 1;");
        assert!(matches!(err, CompileError::Parser { .. }));
    }

    #[test]
    fn line_numbers_follow_the_source() {
        let err = parse_err("x = 1;\ny = ;\n");
        assert!(matches!(err, CompileError::Parser { line: 2, .. }));
    }
}
