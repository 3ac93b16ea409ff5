//! Statement parsing.
//!
//! Precedence climbing over a fragment list through its pointer view.
//! Lower operator priority binds tighter; equal priorities associate
//! left-to-right unless an operator is right-to-left, which forces a
//! right-deep tree. Ternaries scan ahead for their matching `:` tracking
//! nesting depth.

use crate::error::{CompileError, CompileResult};
use crate::fragment::{
    CodeFragment, FragmentList, Operation, Operator, Pointer, Statement, Stopchar,
};

/// Parses one fragment list into a statement tree.
pub fn parse(list: &FragmentList) -> CompileResult<Statement> {
    let mut it = list.ptr();
    let operand = pack_part(&mut it)?;
    if !it.is_valid() {
        return Ok(operand);
    }
    pack_operation(&mut it, operand)
}

fn error(it: &Pointer, message: impl AsRef<str>) -> CompileError {
    CompileError::parser(it.line(), message)
}

/// Packs one operand: an optional prefix chain, then suffix operators.
fn pack_part(it: &mut Pointer) -> CompileResult<Statement> {
    if !it.is_valid() {
        return Err(error(it, "unexpected end of instruction"));
    }
    let pre = pack_pre_unary(it)?;
    pack_post_unary(it, pre)
}

fn pack_pre_unary(it: &mut Pointer) -> CompileResult<Statement> {
    let part = it
        .current()
        .ok_or_else(|| error(it, "unexpected end of instruction"))?
        .clone();
    it.advance();

    if let CodeFragment::Operator(prefix) = part {
        if !it.is_valid() {
            return Err(error(it, "unexpected end of instruction"));
        }
        if !prefix.is_unary() {
            return Err(error(
                it,
                format!("operator {prefix} cannot be a non unary prefix operator"),
            ));
        }
        let operand = pack_next_operator_part(it, &prefix)?;
        let operation = Operation::unary(prefix, operand).map_err(|err| err.at_line(it.line()))?;
        return Ok(operation.into_statement());
    }

    let rendered = part.to_string();
    part.into_statement()
        .ok_or_else(|| error(it, format!("expected valid operand, but found: {rendered}")))
}

fn pack_post_unary(it: &mut Pointer, pre: Statement) -> CompileResult<Statement> {
    let Some(CodeFragment::Operator(suffix)) = it.current() else {
        return Ok(pre);
    };
    let suffix = *suffix;
    if !suffix.is_unary() {
        return Ok(pre);
    }
    it.advance();
    if suffix.has_right_to_left() {
        return Err(error(
            it,
            format!("operator {suffix} cannot be an unary suffix operator"),
        ));
    }
    let operation = Operation::unary(suffix, pre).map_err(|err| err.at_line(it.line()))?;
    pack_post_unary(it, operation.into_statement())
}

/// The first operator fragment at or after `index`.
fn find_next_operator(list: &FragmentList, index: usize) -> Option<Operator> {
    list.fragments()[index..].iter().find_map(|f| match f {
        CodeFragment::Operator(op) => Some(*op),
        _ => None,
    })
}

/// Parses the longest span after the cursor in which every operator binds
/// tighter than `base`, leaving the cursor on the first looser operator.
fn super_operator_scope(it: &mut Pointer, base: &Operator) -> CompileResult<Statement> {
    let start = it.index();
    while it.is_valid() {
        if let Some(CodeFragment::Operator(op)) = it.current() {
            if base.compare_priority(op) > 0 {
                let sub = it.list().sublist(start, it.index() - start);
                return parse(&sub);
            }
        }
        it.advance();
    }
    parse(&it.list().sublist_from(start))
}

/// Folds operators into the left operand until the list is consumed.
fn pack_operation(it: &mut Pointer, operand1: Statement) -> CompileResult<Statement> {
    let current = it
        .current()
        .ok_or_else(|| error(it, "unexpected end of instruction"))?;
    let CodeFragment::Operator(oper) = current else {
        return Err(error(
            it,
            format!("expected a valid operator between operands: \"{current}\""),
        ));
    };
    let oper = *oper;
    it.advance();

    let operation = if oper.is_ternary() {
        let start = it.index();
        let mut depth = 0usize;
        while it.is_valid() {
            match it.current() {
                Some(CodeFragment::Operator(op)) if op.is_ternary() => depth += 1,
                Some(CodeFragment::Stopchar(Stopchar::Colon)) => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                }
                _ => {}
            }
            it.advance();
        }
        if !it.is_valid() {
            return Err(error(it, "missing colon in ternary operator"));
        }
        let if_true = parse(&it.list().sublist(start, it.index() - start))?;
        it.advance();
        let if_false = parse(&it.list().sublist_from(it.index()))?;
        it.finish();
        return Ok(Operation::ternary(operand1, if_true, if_false).into_statement());
    } else if oper.is_binary() {
        let operand2 = pack_next_operator_part(it, &oper)?;
        Operation::binary(oper, operand1, operand2)
            .map_err(|err| err.at_line(it.line()))?
            .into_statement()
    } else if oper.is_assignment() {
        let operand2 = pack_next_operator_part(it, &oper)?;
        Operation::assignment(oper, operand1, operand2)
            .map_err(|err| err.at_line(it.line()))?
            .into_statement()
    } else {
        return Err(error(it, format!("invalid operator type: {oper}")));
    };

    if !it.is_valid() {
        return Ok(operation);
    }
    pack_operation(it, operation)
}

/// Computes the right operand of `oper`: when the next operator binds
/// tighter, the whole tighter-binding span; otherwise a single part.
fn pack_next_operator_part(it: &mut Pointer, oper: &Operator) -> CompileResult<Statement> {
    let next = find_next_operator(it.list(), it.index());
    match next {
        Some(next) if oper.compare_priority(&next) < 0 => super_operator_scope(it, oper),
        _ => pack_part(it),
    }
}
