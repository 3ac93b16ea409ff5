//! Code generation.
//!
//! Lowers parsed instructions into the bounded 16-bit code stream and the
//! field table. Expressions encode in prefix order; literals intern into
//! the field table; user variables occupy the script's slot budget in
//! declaration order.

use std::collections::HashMap;

use crate::elements::elements;
use crate::error::{CompileError, CompileResult};
use crate::fragment::{Instruction, Operation, Operator, Statement, VarEntry};
use crate::script::{CodeBuilder, Script, ScriptField, MAX_FIELDS, MAX_VARS};
use crate::codes::{token, SCRIPT_VERSION};
use crate::{CodeValue, FieldValue, PopString};

/// Lowers instructions into a script, one at a time.
pub struct Codegen {
    builder: CodeBuilder,
    field_values: Vec<FieldValue>,
    field_index: HashMap<FieldValue, u16>,
    var_slots: HashMap<PopString, u16>,
    const_bindings: HashMap<PopString, FieldValue>,
}

impl Default for Codegen {
    fn default() -> Self {
        Codegen::new()
    }
}

impl Codegen {
    pub fn new() -> Codegen {
        let mut builder = CodeBuilder::new();
        // The emitted stream always opens with the version word pair, so
        // the built script carries them at codes[0..2].
        builder
            .push_back(SCRIPT_VERSION)
            .expect("a fresh builder has capacity");
        builder.push_back(0).expect("a fresh builder has capacity");
        Codegen {
            builder,
            field_values: Vec::new(),
            field_index: HashMap::new(),
            var_slots: HashMap::new(),
            const_bindings: HashMap::new(),
        }
    }

    /// The number of interned field values so far.
    pub fn field_count(&self) -> usize {
        self.field_values.len()
    }

    /// Lowers one top-level instruction. `line` attributes diagnostics.
    pub fn lower_instruction(&mut self, instruction: &Instruction, line: usize) -> CompileResult<()> {
        match instruction {
            Instruction::Statement(None) => Ok(()),
            Instruction::Statement(Some(statement)) => self.lower_effect(statement, line),
            Instruction::StatementScope(instructions) => {
                for instruction in instructions {
                    self.lower_instruction(instruction, line)?;
                }
                Ok(())
            }
            Instruction::VarDeclaration(entries) => self.lower_var_declaration(entries, line),
            Instruction::ConstDeclaration(entries) => {
                for entry in entries {
                    let name = PopString::new(entry.identifier().as_str());
                    if self.const_bindings.contains_key(&name)
                        || self.var_slots.contains_key(&name)
                    {
                        return Err(CompileError::parser(
                            line,
                            format!("{name} is already declared"),
                        ));
                    }
                    self.const_bindings.insert(name, entry.value());
                }
                Ok(())
            }
            Instruction::Conditional {
                condition,
                block,
                else_block,
            } => {
                self.push(token::IF, line)?;
                self.lower_value(condition, line)?;
                self.lower_instruction(block, line)?;
                if let Some(else_block) = else_block {
                    self.push(token::ELSE, line)?;
                    self.lower_instruction(else_block, line)?;
                }
                self.push(token::ENDIF, line)
            }
            Instruction::EveryLoop { turns, block } => {
                self.push(token::EVERY, line)?;
                self.push(Instruction::every_first_value(*turns), line)?;
                self.push(Instruction::every_second_value(*turns), line)?;
                self.lower_instruction(block, line)?;
                self.push(token::ENDEVERY, line)
            }
        }
    }

    /// Materializes the stream and the field table into a fresh script.
    pub fn finish(self) -> CompileResult<Script> {
        let mut script = Script::new();
        self.builder.build(&mut script);
        for (index, value) in self.field_values.iter().enumerate() {
            script.set_field(index, ScriptField::new(*value))?;
        }
        Ok(script)
    }

    fn lower_var_declaration(&mut self, entries: &[VarEntry], line: usize) -> CompileResult<()> {
        for entry in entries {
            let name = PopString::new(entry.identifier().as_str());
            if self.var_slots.contains_key(&name) || self.const_bindings.contains_key(&name) {
                return Err(CompileError::parser(
                    line,
                    format!("{name} is already declared"),
                ));
            }
            if self.var_slots.len() >= MAX_VARS {
                return Err(CompileError::parser(
                    line,
                    format!("too many variables, the script allows {MAX_VARS}"),
                ));
            }
            let slot = self.var_slots.len() as u16;
            self.var_slots.insert(name, slot);
            if let Some(init) = entry.init_value() {
                self.push(token::SET, line)?;
                self.push(token::VARIABLE, line)?;
                self.push(slot, line)?;
                self.lower_value(init, line)?;
            }
        }
        Ok(())
    }

    /// Lowers a statement in effect position: assignments, increments,
    /// decrements and calls.
    fn lower_effect(&mut self, statement: &Statement, line: usize) -> CompileResult<()> {
        match statement {
            Statement::Operation(operation) if operation.is_assignment() => {
                self.lower_assignment(operation, line)
            }
            Statement::Operation(operation) if operation.is_unary() => {
                let operator = operation.operator();
                let step = if *operator == Operator::PREFIX_INCREMENT
                    || *operator == Operator::SUFFIX_INCREMENT
                {
                    token::INCREMENT
                } else if *operator == Operator::PREFIX_DECREMENT
                    || *operator == Operator::SUFFIX_DECREMENT
                {
                    token::DECREMENT
                } else {
                    return Err(CompileError::parser(
                        line,
                        format!("operator {operator} has no effect as a statement"),
                    ));
                };
                self.push(step, line)?;
                self.lower_write_target(operation.unary_operand(), line)
            }
            Statement::FunctionCall(call) => {
                let callable = call.callable();
                if call.arguments().len() != callable.parameter_count() {
                    return Err(CompileError::parser(
                        line,
                        format!(
                            "{} expects {} arguments, found {}",
                            callable.name(),
                            callable.parameter_count(),
                            call.arguments().len()
                        ),
                    ));
                }
                self.push(callable.code(), line)?;
                for argument in call.arguments().iter() {
                    self.lower_value(argument, line)?;
                }
                Ok(())
            }
            Statement::FunctionArguments(group) if group.len() == 1 => {
                self.lower_effect(group.get(0), line)
            }
            other => Err(CompileError::parser(
                line,
                format!("the value of {other} is unused"),
            )),
        }
    }

    fn lower_assignment(&mut self, operation: &Operation, line: usize) -> CompileResult<()> {
        let target = operation.left_operand();
        self.push(token::SET, line)?;
        self.lower_write_target(target, line)?;

        let operator = operation.operator();
        let compound = if *operator == Operator::ASSIGNMENT {
            None
        } else if *operator == Operator::ASSIGNMENT_ADDITION {
            Some(token::ADD)
        } else if *operator == Operator::ASSIGNMENT_SUBTRACTION {
            Some(token::SUBTRACT)
        } else if *operator == Operator::ASSIGNMENT_MULTIPLICATION {
            Some(token::MULTIPLY)
        } else if *operator == Operator::ASSIGNMENT_DIVISION {
            Some(token::DIVIDE)
        } else {
            return Err(CompileError::parser(
                line,
                format!("invalid assignment operator {operator}"),
            ));
        };
        if let Some(op_token) = compound {
            // x += e lowers as x = x + e.
            self.push(op_token, line)?;
            self.lower_read_identifier(target, line)?;
        }
        self.lower_value(operation.right_operand(), line)
    }

    /// Lowers a statement in value position.
    fn lower_value(&mut self, statement: &Statement, line: usize) -> CompileResult<()> {
        match statement {
            Statement::LiteralInteger(literal) => {
                let index = self.intern_field(literal.value(), line)?;
                self.push(token::FIELD, line)?;
                self.push(index, line)
            }
            Statement::TypeConstant(constant) => self.push(constant.value(), line),
            Statement::Identifier(_) => self.lower_read_identifier(statement, line),
            Statement::FunctionArguments(group) => {
                if group.len() != 1 {
                    return Err(CompileError::parser(
                        line,
                        "expected a single value in parentheses",
                    ));
                }
                self.lower_value(group.get(0), line)
            }
            Statement::FunctionCall(call) => {
                let callable = call.callable();
                if callable.is_void() {
                    return Err(CompileError::parser(
                        line,
                        format!("{} does not produce a value", callable.name()),
                    ));
                }
                if call.arguments().len() != callable.parameter_count() {
                    return Err(CompileError::parser(
                        line,
                        format!(
                            "{} expects {} arguments, found {}",
                            callable.name(),
                            callable.parameter_count(),
                            call.arguments().len()
                        ),
                    ));
                }
                self.push(callable.code(), line)?;
                for argument in call.arguments().iter() {
                    self.lower_value(argument, line)?;
                }
                Ok(())
            }
            Statement::Operation(operation) => self.lower_value_operation(operation, line),
        }
    }

    fn lower_value_operation(&mut self, operation: &Operation, line: usize) -> CompileResult<()> {
        if operation.is_ternary() {
            self.push(token::IF, line)?;
            self.lower_value(operation.condition_operand(), line)?;
            self.lower_value(operation.true_case_operand(), line)?;
            self.push(token::ELSE, line)?;
            self.lower_value(operation.false_case_operand(), line)?;
            return self.push(token::ENDIF, line);
        }
        if operation.is_assignment() {
            // Assignments are permitted inside expressions; they lower in
            // their effect form and the host reads the target afterwards.
            return self.lower_assignment(operation, line);
        }
        let operator = operation.operator();
        if operation.is_unary() {
            let op_token = if *operator == Operator::NOT {
                token::NOT
            } else if *operator == Operator::UNARY_MINUS {
                token::NEGATE
            } else {
                return Err(CompileError::parser(
                    line,
                    format!("operator {operator} is not usable in an expression"),
                ));
            };
            self.push(op_token, line)?;
            return self.lower_value(operation.unary_operand(), line);
        }

        let op_token = binary_token(operator).ok_or_else(|| {
            CompileError::parser(
                line,
                format!("operator {operator} is not usable in an expression"),
            )
        })?;
        self.push(op_token, line)?;
        self.lower_value(operation.left_operand(), line)?;
        self.lower_value(operation.right_operand(), line)
    }

    /// Lowers an identifier in read position: constants, variables, then
    /// the element surface.
    fn lower_read_identifier(&mut self, statement: &Statement, line: usize) -> CompileResult<()> {
        let Some(identifier) = statement.as_identifier() else {
            return Err(CompileError::parser(
                line,
                format!("expected an identifier, found {statement}"),
            ));
        };
        if let Some(&value) = self.const_bindings.get(identifier.as_str()) {
            let index = self.intern_field(value, line)?;
            self.push(token::FIELD, line)?;
            return self.push(index, line);
        }
        if let Some(&slot) = self.var_slots.get(identifier.as_str()) {
            self.push(token::VARIABLE, line)?;
            return self.push(slot, line);
        }
        if let Some(element) = elements().find_global(identifier.as_str()) {
            if let Some(code) = element.code() {
                return self.push(code, line);
            }
        }
        Err(CompileError::parser(
            line,
            format!("unknown identifier {identifier}"),
        ))
    }

    /// Lowers an identifier in write position: variables and writable
    /// attributes only.
    fn lower_write_target(&mut self, statement: &Statement, line: usize) -> CompileResult<()> {
        let Some(identifier) = statement.as_identifier() else {
            return Err(CompileError::parser(
                line,
                format!("expected an identifier, found {statement}"),
            ));
        };
        if let Some(&slot) = self.var_slots.get(identifier.as_str()) {
            self.push(token::VARIABLE, line)?;
            return self.push(slot, line);
        }
        if self.const_bindings.contains_key(identifier.as_str()) {
            return Err(CompileError::parser(
                line,
                format!("cannot assign to constant {identifier}"),
            ));
        }
        if let Some(element) = elements().find_global(identifier.as_str()) {
            if element.is_read_only_attribute() {
                return Err(CompileError::parser(
                    line,
                    format!("{identifier} is read-only"),
                ));
            }
            if element.is_writable() {
                let code = element.code().ok_or(CompileError::UnexpectedNull)?;
                return self.push(code, line);
            }
        }
        Err(CompileError::parser(
            line,
            format!("unknown identifier {identifier}"),
        ))
    }

    /// Interns a literal into the field table, reusing equal values.
    fn intern_field(&mut self, value: FieldValue, line: usize) -> CompileResult<CodeValue> {
        if let Some(&index) = self.field_index.get(&value) {
            return Ok(index);
        }
        if self.field_values.len() >= MAX_FIELDS {
            return Err(CompileError::parser(
                line,
                format!("field table full, the script allows {MAX_FIELDS} values"),
            ));
        }
        let index = self.field_values.len() as u16;
        self.field_values.push(value);
        self.field_index.insert(value, index);
        Ok(index)
    }

    fn push(&mut self, code: CodeValue, line: usize) -> CompileResult<()> {
        self.builder
            .push_back(code)
            .map(|_| ())
            .map_err(|err| match err {
                CompileError::FullCodeData => CompileError::FullCodeData,
                other => other.at_line(line),
            })
    }
}

/// The stream token of a binary operator.
fn binary_token(operator: &Operator) -> Option<CodeValue> {
    let table = [
        (Operator::MULTIPLICATION, token::MULTIPLY),
        (Operator::DIVISION, token::DIVIDE),
        (Operator::ADDITION, token::ADD),
        (Operator::SUBTRACTION, token::SUBTRACT),
        (Operator::GREATER_THAN, token::GREATER),
        (Operator::SMALLER_THAN, token::LESS),
        (Operator::GREATER_EQUALS_THAN, token::GREATER_EQUAL),
        (Operator::SMALLER_EQUALS_THAN, token::LESS_EQUAL),
        (Operator::EQUALS_TO, token::EQUAL),
        (Operator::NOT_EQUALS_TO, token::NOT_EQUAL),
        (Operator::AND, token::AND),
        (Operator::OR, token::OR),
    ];
    table
        .iter()
        .find(|(op, _)| op == operator)
        .map(|&(_, code)| code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::{attribute, state, team};
    use crate::compiler::instruction::InstructionParser;
    use crate::reader::CodeReader;

    fn lower_source(source: &str) -> Codegen {
        let mut reader = CodeReader::load(source);
        let mut parser = InstructionParser::new(&mut reader);
        let mut codegen = Codegen::new();
        while let Some(instruction) = parser.next_instruction().unwrap() {
            codegen.lower_instruction(&instruction, 1).unwrap();
        }
        codegen
    }

    fn lower_err(source: &str) -> CompileError {
        let mut reader = CodeReader::load(source);
        let mut parser = InstructionParser::new(&mut reader);
        let mut codegen = Codegen::new();
        while let Some(instruction) = parser.next_instruction().unwrap() {
            if let Err(err) = codegen.lower_instruction(&instruction, 1) {
                return err;
            }
        }
        panic!("no lowering error in {source:?}");
    }

    fn emitted(source: &str) -> Vec<CodeValue> {
        let script = lower_source(source).finish().unwrap();
        let used = script
            .codes()
            .iter()
            .rposition(|&c| c != 0)
            .map_or(0, |i| i + 1);
        script.codes()[..used].to_vec()
    }

    #[test]
    fn the_stream_opens_with_the_version_pair() {
        let codes = emitted("var x = 1;");
        assert_eq!(codes[0], SCRIPT_VERSION);
        assert_eq!(codes[1], 0);
    }

    #[test]
    fn var_initialisers_lower_to_set() {
        let codes = emitted("var x = 3;");
        assert_eq!(
            &codes[2..],
            &[token::SET, token::VARIABLE, 0, token::FIELD, 0]
        );
        let script = lower_source("var x = 3;").finish().unwrap();
        assert_eq!(script.field(0).unwrap().value(), 3);
    }

    #[test]
    fn literals_are_interned_once() {
        let codegen = lower_source("var x = 5; var y = 5; var z = 6;");
        assert_eq!(codegen.field_count(), 2);
    }

    #[test]
    fn variables_take_slots_in_declaration_order() {
        let codes = emitted("var a, b; b = 1;");
        // The assignment addresses slot 1.
        assert_eq!(
            &codes[2..],
            &[token::SET, token::VARIABLE, 1, token::FIELD, 0]
        );
    }

    #[test]
    fn constants_fold_to_field_references() {
        let codes = emitted("const K = 9; var x = K;");
        assert_eq!(
            &codes[2..],
            &[token::SET, token::VARIABLE, 0, token::FIELD, 0]
        );
    }

    #[test]
    fn expressions_lower_in_prefix_order() {
        let codes = emitted("var x; x = 1 + 2 * 3;");
        assert_eq!(
            &codes[2..],
            &[
                token::SET,
                token::VARIABLE,
                0,
                token::ADD,
                token::FIELD,
                0,
                token::MULTIPLY,
                token::FIELD,
                1,
                token::FIELD,
                2,
            ]
        );
    }

    #[test]
    fn compound_assignment_desugars() {
        let codes = emitted("var x; x += 2;");
        assert_eq!(
            &codes[2..],
            &[
                token::SET,
                token::VARIABLE,
                0,
                token::ADD,
                token::VARIABLE,
                0,
                token::FIELD,
                0,
            ]
        );
    }

    #[test]
    fn increments_lower_to_step_tokens() {
        let codes = emitted("var x; x++; --x;");
        assert_eq!(
            &codes[2..],
            &[
                token::INCREMENT,
                token::VARIABLE,
                0,
                token::DECREMENT,
                token::VARIABLE,
                0,
            ]
        );
    }

    #[test]
    fn conditionals_lower_with_their_delimiters() {
        let codes = emitted("var x; if(x == 1) { x = 2; } else x = 3;");
        let expected = [
            token::IF,
            token::EQUAL,
            token::VARIABLE,
            0,
            token::FIELD,
            0,
            token::SET,
            token::VARIABLE,
            0,
            token::FIELD,
            1,
            token::ELSE,
            token::SET,
            token::VARIABLE,
            0,
            token::FIELD,
            2,
            token::ENDIF,
        ];
        assert_eq!(&codes[2..], &expected);
    }

    #[test]
    fn every_loops_lower_mask_and_offset() {
        let codes = emitted("var x; every(5) { x = 1; }");
        assert_eq!(
            &codes[2..],
            &[
                token::EVERY,
                8,
                3,
                token::SET,
                token::VARIABLE,
                0,
                token::FIELD,
                0,
                token::ENDEVERY,
            ]
        );
    }

    #[test]
    fn type_constants_emit_their_codes() {
        let codes = emitted("setAggression(on);");
        assert_eq!(
            &codes[2..],
            &[crate::codes::function::SET_AGGRESSION, state::ON]
        );
    }

    #[test]
    fn calls_emit_code_then_arguments() {
        let codes = emitted("attack(Blue, 5);");
        assert_eq!(
            &codes[2..],
            &[
                crate::codes::function::ATTACK,
                team::BLUE,
                token::FIELD,
                0,
            ]
        );
    }

    #[test]
    fn attributes_read_and_write_by_code() {
        let codes = emitted("Aggression = GameTurn;");
        assert_eq!(
            &codes[2..],
            &[token::SET, attribute::AGGRESSION, attribute::GAME_TURN]
        );
    }

    #[test]
    fn read_only_attributes_reject_writes() {
        let err = lower_err("GameTurn = 1;");
        assert!(err.to_string().contains("read-only"));
    }

    #[test]
    fn constants_reject_writes() {
        let err = lower_err("const K = 1; K = 2;");
        assert!(err.to_string().contains("constant"));
    }

    #[test]
    fn unknown_identifiers_are_reported() {
        let err = lower_err("mystery = 1;");
        assert!(err.to_string().contains("unknown identifier"));
    }

    #[test]
    fn duplicate_declarations_are_reported() {
        let err = lower_err("var x; var x;");
        assert!(err.to_string().contains("already declared"));
    }

    #[test]
    fn variable_budget_is_enforced() {
        let mut source = String::from("var ");
        for i in 0..(MAX_VARS + 1) {
            if i > 0 {
                source.push_str(", ");
            }
            source.push_str(&format!("v{i}"));
        }
        source.push(';');
        let err = lower_err(&source);
        assert!(err.to_string().contains("too many variables"));
    }

    #[test]
    fn wrong_arity_is_reported() {
        let err = lower_err("attack(Blue);");
        assert!(err.to_string().contains("expects 2 arguments"));
    }

    #[test]
    fn void_calls_are_rejected_in_value_position() {
        let err = lower_err("var x = attack(Blue, 1);");
        assert!(err.to_string().contains("does not produce a value"));
    }

    #[test]
    fn getters_are_allowed_in_value_position() {
        let codes = emitted("var x = gameTurn();");
        assert_eq!(
            &codes[2..],
            &[
                token::SET,
                token::VARIABLE,
                0,
                crate::codes::function::GAME_TURN,
            ]
        );
    }

    #[test]
    fn unused_values_are_rejected() {
        let err = lower_err("var x; x + 1;");
        assert!(err.to_string().contains("unused"));
    }
}
