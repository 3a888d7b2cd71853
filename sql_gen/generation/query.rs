//! Statement-level generation: SELECT, DML and DDL synthesis.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::model::query::{
    ColumnSpec, CreateIndexStmt, CreateTableStmt, DeleteStmt, FromClause, IndexKey, InsertStmt,
    JoinType, JoinedTable, SelectStmt, UpdateStmt,
};
use crate::model::table::{Table, TableKind};
use crate::model::types::ColumnTypeKind;
use crate::{GenError, Generator};

use super::expr::gen_literal;
use super::{pick, rand_ident, GenCtx, GeneratedSelect};

impl Generator {
    /// Generate a SELECT over the context tables. In PQS mode every
    /// predicate (WHERE and join ON) is rectified against the pivot, so
    /// the result set provably contains the pivot row.
    pub fn select_stmt<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        ctx: &GenCtx,
        depth: usize,
    ) -> Result<GeneratedSelect, GenError> {
        if ctx.tables.is_empty() {
            return Err(GenError::NoTables);
        }
        let base = &ctx.tables[0];
        let mut joins = Vec::new();
        for (i, table) in ctx.tables.iter().enumerate().skip(1) {
            // the ON clause may only reference tables joined so far
            let scope = GenCtx {
                tables: ctx.tables[..=i].to_vec(),
                ..ctx.clone()
            };
            let on = self.join_condition(rng, &scope)?;
            let join_type = if ctx.enable_left_right_join && rng.random_bool(0.3) {
                if rng.random_bool(0.5) {
                    JoinType::Left
                } else {
                    JoinType::Right
                }
            } else {
                JoinType::Inner
            };
            joins.push(JoinedTable {
                table: table.name.clone(),
                join_type,
                on,
            });
        }

        let where_clause = if ctx.is_pqs_mode {
            let pivot = ctx.pivot.as_ref().ok_or(GenError::NoTables)?;
            self.pivot_condition(rng, ctx, pivot, depth)?
        } else {
            self.condition_clause(rng, ctx, depth)
        };

        let hint = (self.config.hint && rng.random_bool(0.2))
            .then(|| format!("HASH_JOIN({})", base.name));

        let stmt = SelectStmt {
            hint,
            fields: ctx.columns(),
            from: FromClause {
                base: base.name.clone(),
                joins,
            },
            where_clause,
        };
        Ok(GeneratedSelect {
            sql: stmt.to_string(),
            columns: stmt.fields.clone(),
            pivot: ctx.pivot.clone().unwrap_or_default(),
            stmt,
        })
    }

    fn join_condition<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        scope: &GenCtx,
    ) -> Result<crate::model::expr::Expr, GenError> {
        if scope.is_pqs_mode {
            let pivot = scope.pivot.as_ref().ok_or(GenError::NoTables)?;
            self.pivot_condition(rng, scope, pivot, 1)
        } else {
            Ok(self.condition_clause(rng, scope, 1))
        }
    }

    /// CREATE TABLE for one tuple of the column-type enumeration. The name
    /// is deterministic in the tuple (and thereby in `index`); each table
    /// gets an auto-increment key plus one nullable column per kind.
    pub fn ddl_create_table(&self, index: usize, kinds: &[ColumnTypeKind]) -> CreateTableStmt {
        let name = if kinds.is_empty() {
            format!("table_{index}")
        } else {
            let suffix: Vec<&str> = kinds.iter().map(|k| k.name()).collect();
            format!("table_{}", suffix.join("_"))
        };
        let mut columns = vec![ColumnSpec {
            name: format!("id_{name}"),
            definition: "INT NOT NULL AUTO_INCREMENT PRIMARY KEY".into(),
        }];
        for kind in kinds {
            columns.push(ColumnSpec {
                name: format!("col_{}", kind.name()),
                definition: match kind {
                    ColumnTypeKind::Int => "INT".into(),
                    ColumnTypeKind::Float => "FLOAT".into(),
                    ColumnTypeKind::Varchar => "VARCHAR(100)".into(),
                },
            });
        }
        CreateTableStmt {
            name: name.into(),
            columns,
        }
    }

    /// CREATE INDEX over 1..3 data columns of a random base table.
    pub fn ddl_create_index<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        tables: &[Table],
    ) -> Result<CreateIndexStmt, GenError> {
        let eligible: Vec<&Table> = tables
            .iter()
            .filter(|t| t.kind == TableKind::BaseTable && t.data_columns().next().is_some())
            .collect();
        if eligible.is_empty() {
            return Err(GenError::NoTables);
        }
        let table = *pick(&eligible, rng);
        let mut candidates: Vec<_> = table.data_columns().map(|c| c.name.clone()).collect();
        candidates.shuffle(rng);
        let count = rng.random_range(1..=candidates.len().min(3));
        candidates.truncate(count);
        Ok(CreateIndexStmt {
            index_name: format!("idx_{}", rand_ident(rng, 5)),
            table: table.name.clone(),
            keys: candidates.into_iter().map(IndexKey::Column).collect(),
        })
    }

    /// One INSERT with random values for every non-key column.
    pub fn dml_insert_by_table<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        table: &Table,
    ) -> Result<InsertStmt, GenError> {
        let columns: Vec<_> = table.data_columns().collect();
        if columns.is_empty() {
            return Err(GenError::NoColumns(table.name.to_string()));
        }
        let values = columns
            .iter()
            .map(|c| gen_literal(rng, c.column_type.kind, c.nullable))
            .collect();
        Ok(InsertStmt {
            table: table.name.clone(),
            columns: columns.into_iter().map(|c| c.name.clone()).collect(),
            values,
        })
    }

    /// Multi-table UPDATE assigning a random literal to one column of the
    /// target table.
    pub fn update_stmt<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        tables: &[Table],
        target: &Table,
    ) -> Result<UpdateStmt, GenError> {
        let (from, ctx) = self.dml_scope(rng, tables, target)?;
        let data: Vec<_> = target.data_columns().collect();
        if data.is_empty() {
            return Err(GenError::NoColumns(target.name.to_string()));
        }
        let column = *pick(&data, rng);
        let value = gen_literal(rng, column.column_type.kind, column.nullable);
        Ok(UpdateStmt {
            from,
            assignments: vec![(column.clone(), value)],
            where_clause: self.condition_clause(rng, &ctx, 1),
        })
    }

    /// Multi-table DELETE removing rows of the target table.
    pub fn delete_stmt<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        tables: &[Table],
        target: &Table,
    ) -> Result<DeleteStmt, GenError> {
        let (from, ctx) = self.dml_scope(rng, tables, target)?;
        Ok(DeleteStmt {
            target: target.name.clone(),
            from,
            where_clause: self.condition_clause(rng, &ctx, 1),
        })
    }

    /// Build the FROM clause and generation scope for multi-table DML: the
    /// target plus up to three joined peers.
    fn dml_scope<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        tables: &[Table],
        target: &Table,
    ) -> Result<(FromClause, GenCtx), GenError> {
        let mut scope = vec![target.clone()];
        scope.extend(
            tables
                .iter()
                .filter(|t| t.name != target.name)
                .take(3)
                .cloned(),
        );
        let mut joins = Vec::new();
        for i in 1..scope.len() {
            let join_scope = GenCtx::new(scope[..=i].to_vec(), None);
            joins.push(JoinedTable {
                table: scope[i].name.clone(),
                join_type: JoinType::Inner,
                on: self.condition_clause(rng, &join_scope, 1),
            });
        }
        let from = FromClause {
            base: target.name.clone(),
            joins,
        };
        let ctx = GenCtx::new(scope, None);
        Ok((from, ctx))
    }
}

/// Enumerate the column-type tuples of the schema: every non-empty subset
/// of `kinds`, in a stable order. A non-negative `limit` bounds the tuple
/// length; a negative one means unbounded.
pub fn compose_all_column_types(limit: i32, kinds: &[ColumnTypeKind]) -> Vec<Vec<ColumnTypeKind>> {
    let n = kinds.len();
    let mut out = Vec::new();
    for mask in 1u32..(1 << n) {
        let tuple: Vec<ColumnTypeKind> = (0..n)
            .filter(|i| mask & (1 << i) != 0)
            .map(|i| kinds[i])
            .collect();
        if limit >= 0 && tuple.len() > limit as usize {
            continue;
        }
        out.push(tuple);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::table::Column;
    use crate::model::types::ColumnType;
    use crate::model::value::{ItemKind, QueryItem};
    use crate::model::value::PivotRows;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn table(name: &str, kinds: &[ColumnTypeKind]) -> Table {
        let mut t = Table::new(name);
        t.columns.push(
            Column::new(name, format!("id_{name}"), ColumnType::new(ColumnTypeKind::Int))
                .not_null(),
        );
        for k in kinds {
            t.columns
                .push(Column::new(name, format!("col_{}", k.name()), ColumnType::new(*k)));
        }
        t
    }

    fn pivot_for(tables: &[Table]) -> PivotRows {
        let mut pivot = PivotRows::new();
        for t in tables {
            for c in &t.columns {
                let item = match c.column_type.kind {
                    ColumnTypeKind::Int => QueryItem::new("1", ItemKind::Int),
                    ColumnTypeKind::Float => QueryItem::new("1.5", ItemKind::Float),
                    ColumnTypeKind::Varchar => QueryItem::new("ab", ItemKind::Str),
                };
                pivot.insert(c.pivot_key(), item);
            }
        }
        pivot
    }

    #[test]
    fn compose_enumerates_the_powerset() {
        let all = compose_all_column_types(-1, &ColumnTypeKind::ALL);
        assert_eq!(all.len(), 7);
        assert!(all.iter().any(|t| t.len() == 3));
        let bounded = compose_all_column_types(1, &ColumnTypeKind::ALL);
        assert_eq!(bounded.len(), 3);
    }

    #[test]
    fn create_table_names_follow_the_tuple() {
        let g = Generator::default();
        let stmt = g.ddl_create_table(3, &[ColumnTypeKind::Int, ColumnTypeKind::Varchar]);
        assert_eq!(stmt.name.as_str(), "table_int_varchar");
        let sql = stmt.to_string();
        assert!(sql.contains("id_table_int_varchar INT NOT NULL AUTO_INCREMENT PRIMARY KEY"));
        assert!(sql.contains("col_int INT"));
        assert!(sql.contains("col_varchar VARCHAR(100)"));
    }

    #[test]
    fn insert_covers_every_data_column() {
        let g = Generator::default();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let t = table("table_int_float", &[ColumnTypeKind::Int, ColumnTypeKind::Float]);
        let stmt = g.dml_insert_by_table(&mut rng, &t).unwrap();
        assert_eq!(stmt.columns.len(), 2);
        assert_eq!(stmt.values.len(), 2);
        assert!(!stmt.columns.iter().any(|c| c.has_prefix("id_")));
    }

    #[test]
    fn create_index_skips_views() {
        let g = Generator::default();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut view = table("view_0", &[ColumnTypeKind::Int]);
        view.kind = TableKind::View;
        assert!(matches!(
            g.ddl_create_index(&mut rng, &[view]),
            Err(GenError::NoTables)
        ));
    }

    #[test]
    fn pqs_select_contains_every_context_column() {
        let g = Generator::default();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let tables = vec![
            table("t1", &[ColumnTypeKind::Int]),
            table("t2", &[ColumnTypeKind::Varchar]),
        ];
        let pivot = pivot_for(&tables);
        let mut ctx = GenCtx::new(tables, Some(pivot.clone()));
        ctx.is_pqs_mode = true;
        let generated = g.select_stmt(&mut rng, &ctx, 2).unwrap();
        assert_eq!(generated.columns.len(), 4);
        assert!(generated.sql.contains("FROM t1"));
        assert!(generated.sql.contains("t2"));
        // the PQS contract: the emitted predicate holds on the pivot
        assert_eq!(
            generated.stmt.where_clause.eval(&pivot).unwrap().truth(),
            Some(true)
        );
    }

    #[test]
    fn select_on_empty_context_fails() {
        let g = Generator::default();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let ctx = GenCtx::new(vec![], None);
        assert!(matches!(
            g.select_stmt(&mut rng, &ctx, 1),
            Err(GenError::NoTables)
        ));
    }

    #[test]
    fn delete_is_single_table_without_peers() {
        let g = Generator::default();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let t = table("t1", &[ColumnTypeKind::Int]);
        let stmt = g.delete_stmt(&mut rng, &[t.clone()], &t).unwrap();
        assert!(stmt.to_string().starts_with("DELETE FROM t1 WHERE"));
    }
}
