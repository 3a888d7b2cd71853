//! Statement AST nodes and their MySQL-dialect rendering.

use std::fmt;

use crate::model::expr::Expr;
use crate::model::ident::CiStr;
use crate::model::table::Column;
use crate::model::value::Value;

/// `JOIN` flavor; left/right joins are gated by the generation context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinType::Inner => write!(f, "JOIN"),
            JoinType::Left => write!(f, "LEFT JOIN"),
            JoinType::Right => write!(f, "RIGHT JOIN"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct JoinedTable {
    pub table: CiStr,
    pub join_type: JoinType,
    pub on: Expr,
}

/// A base table plus zero or more joined tables.
#[derive(Debug, Clone)]
pub struct FromClause {
    pub base: CiStr,
    pub joins: Vec<JoinedTable>,
}

impl FromClause {
    pub fn single(base: impl Into<CiStr>) -> Self {
        FromClause {
            base: base.into(),
            joins: Vec::new(),
        }
    }

    /// Every table referenced by this clause.
    pub fn tables(&self) -> impl Iterator<Item = &CiStr> {
        std::iter::once(&self.base).chain(self.joins.iter().map(|j| &j.table))
    }
}

impl fmt::Display for FromClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base)?;
        for join in &self.joins {
            write!(f, " {} {} ON {}", join.join_type, join.table, join.on)?;
        }
        Ok(())
    }
}

/// A generated SELECT. The field list is always an explicit list of
/// qualified columns so oracle verification can match result cells
/// positionally.
#[derive(Debug, Clone)]
pub struct SelectStmt {
    pub hint: Option<String>,
    pub fields: Vec<Column>,
    pub from: FromClause,
    pub where_clause: Expr,
}

impl SelectStmt {
    /// Copy of this statement with a different WHERE clause, used by the
    /// metamorphic rewrites.
    pub fn with_where(&self, where_clause: Expr) -> SelectStmt {
        SelectStmt {
            where_clause,
            ..self.clone()
        }
    }
}

impl fmt::Display for SelectStmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SELECT ")?;
        if let Some(hint) = &self.hint {
            write!(f, "/*+ {hint} */ ")?;
        }
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", field.qualified())?;
        }
        write!(f, " FROM {} WHERE {}", self.from, self.where_clause)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompoundOp {
    UnionAll,
}

impl fmt::Display for CompoundOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompoundOp::UnionAll => write!(f, "UNION ALL"),
        }
    }
}

/// A compound of parenthesized selects, e.g. the TLP partition union.
#[derive(Debug, Clone)]
pub struct CompoundSelect {
    pub op: CompoundOp,
    pub selects: Vec<SelectStmt>,
}

impl fmt::Display for CompoundSelect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, sel) in self.selects.iter().enumerate() {
            if i > 0 {
                write!(f, " {} ", self.op)?;
            }
            write!(f, "({sel})")?;
        }
        Ok(())
    }
}

/// A query produced by a transformer: either a plain select or a compound.
#[derive(Debug, Clone)]
pub enum QueryNode {
    Select(SelectStmt),
    Compound(CompoundSelect),
}

impl fmt::Display for QueryNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryNode::Select(s) => write!(f, "{s}"),
            QueryNode::Compound(c) => write!(f, "{c}"),
        }
    }
}

impl From<SelectStmt> for QueryNode {
    fn from(s: SelectStmt) -> Self {
        QueryNode::Select(s)
    }
}

/// One-row INSERT over the named columns.
#[derive(Debug, Clone)]
pub struct InsertStmt {
    pub table: CiStr,
    pub columns: Vec<CiStr>,
    pub values: Vec<Value>,
}

impl fmt::Display for InsertStmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "INSERT INTO {} (", self.table)?;
        for (i, c) in self.columns.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{c}")?;
        }
        write!(f, ") VALUES (")?;
        for (i, v) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{v}")?;
        }
        write!(f, ")")
    }
}

/// Multi-table UPDATE assigning literals to columns of the base table.
#[derive(Debug, Clone)]
pub struct UpdateStmt {
    pub from: FromClause,
    pub assignments: Vec<(Column, Value)>,
    pub where_clause: Expr,
}

impl fmt::Display for UpdateStmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UPDATE {} SET ", self.from)?;
        for (i, (col, val)) in self.assignments.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} = {}", col.qualified(), val)?;
        }
        write!(f, " WHERE {}", self.where_clause)
    }
}

/// Multi-table DELETE removing rows of the target table.
#[derive(Debug, Clone)]
pub struct DeleteStmt {
    pub target: CiStr,
    pub from: FromClause,
    pub where_clause: Expr,
}

impl fmt::Display for DeleteStmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.from.joins.is_empty() {
            write!(f, "DELETE FROM {} WHERE {}", self.from.base, self.where_clause)
        } else {
            write!(
                f,
                "DELETE {} FROM {} WHERE {}",
                self.target, self.from, self.where_clause
            )
        }
    }
}

/// One column definition inside a CREATE TABLE.
#[derive(Debug, Clone)]
pub struct ColumnSpec {
    pub name: String,
    pub definition: String,
}

#[derive(Debug, Clone)]
pub struct CreateTableStmt {
    pub name: CiStr,
    pub columns: Vec<ColumnSpec>,
}

impl fmt::Display for CreateTableStmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CREATE TABLE {} (", self.name)?;
        for (i, c) in self.columns.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} {}", c.name, c.definition)?;
        }
        write!(f, ")")
    }
}

/// An index key part: a plain column or a parenthesized expression
/// (functional index).
#[derive(Debug, Clone)]
pub enum IndexKey {
    Column(CiStr),
    Expr(Expr),
}

#[derive(Debug, Clone)]
pub struct CreateIndexStmt {
    pub index_name: String,
    pub table: CiStr,
    pub keys: Vec<IndexKey>,
}

impl fmt::Display for CreateIndexStmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CREATE INDEX {} ON {} (", self.index_name, self.table)?;
        for (i, key) in self.keys.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match key {
                IndexKey::Column(c) => write!(f, "{c}")?,
                // expression key parts need their own parentheses
                IndexKey::Expr(e) => write!(f, "({e})")?,
            }
        }
        write!(f, ")")
    }
}
