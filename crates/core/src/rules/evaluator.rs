//! Compiled rules and their evaluation.

use std::cmp::Ordering;

use rust_decimal::Decimal;

use super::ast::{BinaryOp, Expr, Function, UnaryOp};
use super::context::RuleContext;
use super::error::RuleError;
use super::parser;
use super::value::RuleValue;

/// A parsed rule, ready to be evaluated any number of times.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledRule {
    source: String,
    expr: Expr,
}

impl CompiledRule {
    /// Compiles rule source.
    ///
    /// # Errors
    ///
    /// Returns `RuleError` on syntax errors and calls to unknown functions.
    pub fn compile(source: &str) -> Result<Self, RuleError> {
        Ok(Self {
            source: source.to_string(),
            expr: parser::parse(source)?,
        })
    }

    /// Returns the source the rule was compiled from.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluates the rule. Evaluation never fails.
    #[must_use]
    pub fn evaluate(&self, ctx: &RuleContext<'_>) -> RuleValue {
        eval(&self.expr, ctx)
    }

    /// Evaluates the rule in a numeric context. `Undefined` becomes 0.
    #[must_use]
    pub fn evaluate_to_number(&self, ctx: &RuleContext<'_>) -> Decimal {
        self.evaluate(ctx).to_number()
    }

    /// Evaluates the rule in a boolean context. `Undefined` becomes false.
    #[must_use]
    pub fn evaluate_to_boolean(&self, ctx: &RuleContext<'_>) -> bool {
        self.evaluate(ctx).is_truthy()
    }
}

fn eval(expr: &Expr, ctx: &RuleContext<'_>) -> RuleValue {
    match expr {
        Expr::Literal(value) => value.clone(),
        Expr::Path(path) => ctx.lookup(path),
        Expr::Unary(UnaryOp::Not, inner) => RuleValue::Bool(!eval(inner, ctx).is_truthy()),
        Expr::Unary(UnaryOp::Negate, inner) => RuleValue::Number(-eval(inner, ctx).to_number()),
        Expr::Binary(BinaryOp::And, left, right) => {
            let left = eval(left, ctx);
            if left.is_truthy() { eval(right, ctx) } else { left }
        }
        Expr::Binary(BinaryOp::Or, left, right) => {
            let left = eval(left, ctx);
            if left.is_truthy() { left } else { eval(right, ctx) }
        }
        Expr::Binary(op, left, right) => binary(*op, &eval(left, ctx), &eval(right, ctx)),
        Expr::Call(function, args) => call(*function, args, ctx),
    }
}

fn binary(op: BinaryOp, left: &RuleValue, right: &RuleValue) -> RuleValue {
    match op {
        BinaryOp::Add => {
            if matches!(left, RuleValue::Str(_)) || matches!(right, RuleValue::Str(_)) {
                return RuleValue::Str(format!("{left}{right}"));
            }
            arithmetic(left, right, Decimal::checked_add)
        }
        BinaryOp::Sub => arithmetic(left, right, Decimal::checked_sub),
        BinaryOp::Mul => arithmetic(left, right, Decimal::checked_mul),
        BinaryOp::Div => arithmetic(left, right, Decimal::checked_div),
        BinaryOp::Eq => RuleValue::Bool(left.strict_eq(right)),
        BinaryOp::NotEq => RuleValue::Bool(!left.strict_eq(right)),
        BinaryOp::Lt => compare(left, right, Ordering::is_lt),
        BinaryOp::Le => compare(left, right, Ordering::is_le),
        BinaryOp::Gt => compare(left, right, Ordering::is_gt),
        BinaryOp::Ge => compare(left, right, Ordering::is_ge),
        // short-circuit operators are handled in eval
        BinaryOp::And | BinaryOp::Or => RuleValue::Undefined,
    }
}

/// Division by zero and overflow yield `Undefined` (`checked_div` returns None).
fn arithmetic(
    left: &RuleValue,
    right: &RuleValue,
    op: fn(Decimal, Decimal) -> Option<Decimal>,
) -> RuleValue {
    op(left.to_number(), right.to_number()).map_or(RuleValue::Undefined, RuleValue::Number)
}

fn compare(left: &RuleValue, right: &RuleValue, test: fn(Ordering) -> bool) -> RuleValue {
    let ordering = match (left, right) {
        (RuleValue::Str(a), RuleValue::Str(b)) => a.cmp(b),
        _ => left.to_number().cmp(&right.to_number()),
    };
    RuleValue::Bool(test(ordering))
}

fn call(function: Function, args: &[Expr], ctx: &RuleContext<'_>) -> RuleValue {
    let numbers = args.iter().map(|arg| eval(arg, ctx).to_number());
    let result = match function {
        Function::Min => numbers.min(),
        Function::Max => numbers.max(),
    };
    result.map_or(RuleValue::Undefined, RuleValue::Number)
}
