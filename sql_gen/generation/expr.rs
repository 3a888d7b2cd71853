//! Predicate generation and the pivot rectification that backs PQS.

use rand::Rng;

use crate::model::expr::{Expr, LogicOp};
use crate::model::table::Column;
use crate::model::types::ColumnTypeKind;
use crate::model::value::{ArithOp, CmpOp, PivotRows, Value};
use crate::{GenError, Generator};

use super::{pick, rand_ident, GenCtx};

const CMP_OPS: [CmpOp; 6] = [
    CmpOp::Eq,
    CmpOp::Ne,
    CmpOp::Lt,
    CmpOp::Le,
    CmpOp::Gt,
    CmpOp::Ge,
];

/// String columns only use equality: ordered comparison is collation
/// sensitive and would make local evaluation disagree with the engine.
const STR_CMP_OPS: [CmpOp; 2] = [CmpOp::Eq, CmpOp::Ne];

impl Generator {
    /// A random predicate over the tables in `ctx`. `depth` bounds the
    /// nesting of logical connectives.
    pub fn condition_clause<R: Rng + ?Sized>(&self, rng: &mut R, ctx: &GenCtx, depth: usize) -> Expr {
        let columns = ctx.columns();
        if columns.is_empty() {
            return Expr::true_literal();
        }
        gen_predicate(rng, &columns, depth)
    }

    /// Rewrite a predicate so that it is guaranteed true on the pivot row:
    /// TRUE keeps it, FALSE negates it, and unknown wraps it in IS NULL.
    pub(crate) fn rectify(pred: Expr, pivot: &PivotRows) -> Result<Expr, GenError> {
        match pred.eval(pivot)?.truth() {
            Some(true) => Ok(pred),
            Some(false) => Ok(Expr::not(pred)),
            None => Ok(Expr::is_null(pred)),
        }
    }

    /// A predicate that holds on the pivot row by construction.
    pub(crate) fn pivot_condition<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        ctx: &GenCtx,
        pivot: &PivotRows,
        depth: usize,
    ) -> Result<Expr, GenError> {
        Self::rectify(self.condition_clause(rng, ctx, depth), pivot)
    }
}

fn gen_predicate<R: Rng + ?Sized>(rng: &mut R, columns: &[Column], depth: usize) -> Expr {
    if depth == 0 {
        return gen_leaf(rng, columns);
    }
    match rng.random_range(0..4u8) {
        0 => Expr::logic(
            LogicOp::And,
            gen_predicate(rng, columns, depth - 1),
            gen_predicate(rng, columns, depth - 1),
        ),
        1 => Expr::logic(
            LogicOp::Or,
            gen_predicate(rng, columns, depth - 1),
            gen_predicate(rng, columns, depth - 1),
        ),
        2 => Expr::not(gen_predicate(rng, columns, depth - 1)),
        _ => gen_leaf(rng, columns),
    }
}

fn gen_leaf<R: Rng + ?Sized>(rng: &mut R, columns: &[Column]) -> Expr {
    let column = pick(columns, rng);
    let kind = column.column_type.kind;
    match rng.random_range(0..10u8) {
        // IS NULL / IS NOT NULL on nullable columns
        0 | 1 if column.nullable => Expr::IsNull {
            expr: Box::new(Expr::Column(column.clone())),
            negated: rng.random_bool(0.5),
        },
        // column against column of the same kind
        2 | 3 => {
            let peers: Vec<&Column> = columns
                .iter()
                .filter(|c| c.column_type.kind == kind)
                .collect();
            let peer = *pick(&peers, rng);
            Expr::cmp(
                gen_cmp_op(rng, kind),
                Expr::Column(column.clone()),
                Expr::Column(peer.clone()),
            )
        }
        // arithmetic against a literal, numeric columns only
        4 if kind.is_numeric() => {
            let shifted = Expr::arith(
                gen_arith_op(rng),
                Expr::Column(column.clone()),
                Expr::Value(gen_literal(rng, kind, false)),
            );
            Expr::cmp(gen_cmp_op(rng, kind), shifted, Expr::Value(gen_literal(rng, kind, false)))
        }
        // plain column/literal comparison
        _ => Expr::cmp(
            gen_cmp_op(rng, kind),
            Expr::Column(column.clone()),
            Expr::Value(gen_literal(rng, kind, true)),
        ),
    }
}

fn gen_cmp_op<R: Rng + ?Sized>(rng: &mut R, kind: ColumnTypeKind) -> CmpOp {
    if kind == ColumnTypeKind::Varchar {
        *pick(&STR_CMP_OPS, rng)
    } else {
        *pick(&CMP_OPS, rng)
    }
}

fn gen_arith_op<R: Rng + ?Sized>(rng: &mut R) -> ArithOp {
    *pick(&[ArithOp::Add, ArithOp::Sub, ArithOp::Mul], rng)
}

/// A literal of the given kind; small domains keep collisions with stored
/// values likely enough to exercise every comparison outcome.
pub(crate) fn gen_literal<R: Rng + ?Sized>(
    rng: &mut R,
    kind: ColumnTypeKind,
    allow_null: bool,
) -> Value {
    if allow_null && rng.random_bool(0.1) {
        return Value::Null;
    }
    match kind {
        ColumnTypeKind::Int => Value::Int(rng.random_range(-64..64)),
        ColumnTypeKind::Float => Value::Float(rng.random_range(-640..640) as f64 / 10.0),
        ColumnTypeKind::Varchar => {
            let len = rng.random_range(1..5);
            Value::Str(rand_ident(rng, len))
        }
    }
}
