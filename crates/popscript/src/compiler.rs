//! The compiler pipeline.
//!
//! Source text flows through the cursor and tokenizer into fragment
//! lists, through the statement and instruction parsers into typed
//! instructions, and through code generation into the fixed script
//! layout. The driver composes the stages and aggregates diagnostics;
//! after a recoverable error it resumes at the next top-level
//! instruction, so one run reports every offending line.

/// Code generation.
pub mod codegen;
/// Instruction parsing.
pub mod instruction;
/// Statement parsing.
pub mod statement;
/// Tokenization.
pub mod tokenizer;

use tracing::debug;

use crate::error::ErrorList;
use crate::fragment::Instruction;
use crate::reader::CodeReader;
use crate::script::Script;
use codegen::Codegen;
use instruction::InstructionParser;

/// Compiles a source text into a script, or the full list of
/// diagnostics.
pub fn compile(source: &str) -> Result<Script, ErrorList> {
    let mut reader = CodeReader::load(source);
    let mut parser = InstructionParser::new(&mut reader);
    let mut codegen = Codegen::new();
    let mut errors = ErrorList::new();
    let mut count = 0usize;

    loop {
        match parser.next_instruction() {
            Ok(None) => break,
            Ok(Some(instruction)) => {
                count += 1;
                let line = parser.last_line();
                if let Err(err) = codegen.lower_instruction(&instruction, line) {
                    errors.record(&err, line);
                    if err.is_fatal() {
                        return Err(errors);
                    }
                }
            }
            Err(err) => {
                errors.record(&err, parser.last_line());
                if err.is_fatal() {
                    return Err(errors);
                }
                parser.recover();
            }
        }
    }
    debug!(instructions = count, errors = errors.len(), "compiled source");

    if !errors.is_empty() {
        return Err(errors);
    }
    codegen.finish().map_err(|err| {
        errors.record(&err, 0);
        errors
    })
}

/// Runs the front-end only, yielding the parsed instruction list.
pub fn compile_to_instructions(source: &str) -> Result<Vec<Instruction>, ErrorList> {
    let mut reader = CodeReader::load(source);
    let mut parser = InstructionParser::new(&mut reader);
    let mut errors = ErrorList::new();
    let mut instructions = Vec::new();

    loop {
        match parser.next_instruction() {
            Ok(None) => break,
            Ok(Some(instruction)) => instructions.push(instruction),
            Err(err) => {
                errors.record(&err, parser.last_line());
                if err.is_fatal() {
                    return Err(errors);
                }
                parser.recover();
            }
        }
    }
    if !errors.is_empty() {
        return Err(errors);
    }
    Ok(instructions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::{token, SCRIPT_VERSION};
    use crate::fragment::{ConstEntry, Identifier, VarEntry};
    use crate::script::{MAX_VARS, SCRIPT_SIZE};

    #[test]
    fn empty_source_compiles_to_a_versioned_script() {
        let script = compile("").unwrap();
        assert_eq!(script.version(), SCRIPT_VERSION);
        assert_eq!(script.code(1), Ok(0));
        assert!(script.codes()[2..].iter().all(|&c| c == 0));
        assert!(script.fields().iter().all(|f| f.is_invalid()));
    }

    #[test]
    fn var_declaration_compiles_end_to_end() {
        let script = compile("var x = 3;").unwrap();
        assert_eq!(
            &script.codes()[..7],
            &[
                SCRIPT_VERSION,
                0,
                token::SET,
                token::VARIABLE,
                0,
                token::FIELD,
                0,
            ]
        );
        assert_eq!(script.field(0).unwrap().value(), 3);
    }

    #[test]
    fn front_end_yields_typed_instructions() {
        let instructions = compile_to_instructions("var x = 3; const Y = 0x1F;").unwrap();
        assert_eq!(instructions.len(), 2);
        assert!(matches!(
            &instructions[0],
            Instruction::VarDeclaration(entries)
                if entries == &[VarEntry::new(Identifier::new("x").unwrap(), Some(
                    crate::fragment::Statement::LiteralInteger(
                        crate::fragment::LiteralInteger::new(3)
                    )
                ))]
        ));
        assert!(matches!(
            &instructions[1],
            Instruction::ConstDeclaration(entries)
                if entries == &[ConstEntry::new(Identifier::new("Y").unwrap(), 31)]
        ));
    }

    #[test]
    fn a_full_program_compiles() {
        let source = "
            var tribe_ready = 0;
            const LIMIT = 100;

            every(64) {
                if(MyPeopleCount > LIMIT) {
                    Aggression = 3;
                    tribe_ready = 1;
                } else {
                    train(Brave, 5);
                }
            }

            if(tribe_ready == 1) attack(Blue, 10);
        ";
        let script = compile(source).unwrap();
        assert_eq!(script.version(), SCRIPT_VERSION);
        // The var initialiser lowers first, then the mask pair of
        // every(64).
        assert_eq!(
            &script.codes()[2..10],
            &[
                token::SET,
                token::VARIABLE,
                0,
                token::FIELD,
                0,
                token::EVERY,
                64,
                0,
            ]
        );
    }

    #[test]
    fn shared_literals_intern_to_one_field() {
        let script = compile("var x = 5; var y = 5;").unwrap();
        assert_eq!(script.field(0).unwrap().value(), 5);
        assert!(script.field(1).unwrap().is_invalid());
    }

    #[test]
    fn variable_budget_is_a_compile_error() {
        let mut source = String::from("var ");
        for i in 0..(MAX_VARS + 1) {
            if i > 0 {
                source.push_str(", ");
            }
            source.push_str(&format!("v{i}"));
        }
        source.push(';');
        let errors = compile(&source).unwrap_err();
        assert_eq!(errors.len(), 1);
        let message = errors.iter().next().unwrap().message.clone();
        assert!(message.contains("too many variables"));
    }

    #[test]
    fn compiled_scripts_round_trip_through_bytes() {
        let script = compile("var x = 3; every(5) { x += 1; }").unwrap();
        let mut data = Vec::new();
        script.write(&mut data).unwrap();
        assert_eq!(data.len(), SCRIPT_SIZE);

        let mut restored = crate::Script::new();
        restored.read(&mut data.as_slice()).unwrap();
        assert_eq!(restored, script);
    }

    #[test]
    fn multiple_errors_are_collected_in_order() {
        let source = "x = ;\nvar ok = 1;\ny = 2;\n";
        let errors = compile(source).unwrap_err();
        assert_eq!(errors.len(), 2);
        let lines: Vec<usize> = errors.iter().map(|e| e.start_line).collect();
        assert_eq!(lines, vec![1, 3]);
    }

    #[test]
    fn diagnostics_carry_source_lines_from_deep_blocks() {
        let source = "every(2) {\n    mystery = 1;\n}\n";
        let errors = compile(source).unwrap_err();
        assert_eq!(errors.len(), 1);
        let entry = errors.iter().next().unwrap();
        assert!(entry.message.contains("unknown identifier"));
    }

    #[test]
    fn recovery_continues_after_a_bad_block() {
        let source = "if(a {\n x = 1;\n}\nvar y = 2;\n";
        let errors = compile(source).unwrap_err();
        assert!(!errors.is_empty());
    }
}
