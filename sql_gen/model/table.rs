//! Tables and columns as reflected from the database catalogue.

use crate::model::ident::CiStr;
use crate::model::types::ColumnType;

/// Whether a cached table is a base table or a seeded view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    BaseTable,
    View,
}

impl TableKind {
    /// Parse the catalogue `TABLE_TYPE` string.
    pub fn parse(raw: &str) -> TableKind {
        if raw.eq_ignore_ascii_case("view") {
            TableKind::View
        } else {
            TableKind::BaseTable
        }
    }
}

/// A single column with its owning table, parsed type and nullability.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub table: CiStr,
    pub name: CiStr,
    pub column_type: ColumnType,
    pub nullable: bool,
}

impl Column {
    pub fn new(table: impl Into<CiStr>, name: impl Into<CiStr>, column_type: ColumnType) -> Self {
        Column {
            table: table.into(),
            name: name.into(),
            column_type,
            nullable: true,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// The folded `table.column` key used by pivot-row maps.
    pub fn pivot_key(&self) -> String {
        format!("{}.{}", self.table.folded(), self.name.folded())
    }

    /// Qualified reference as it appears in emitted SQL.
    pub fn qualified(&self) -> String {
        format!("{}.{}", self.table, self.name)
    }

    /// Auto-increment key columns carry the `id_` prefix and are excluded
    /// from value generation and expression indexes.
    pub fn is_auto_increment(&self) -> bool {
        self.name.has_prefix("id_")
    }
}

/// A table (or view) with its ordered columns and index names.
#[derive(Debug, Clone)]
pub struct Table {
    pub name: CiStr,
    pub columns: Vec<Column>,
    pub indexes: Vec<CiStr>,
    pub kind: TableKind,
}

impl Table {
    pub fn new(name: impl Into<CiStr>) -> Self {
        Table {
            name: name.into(),
            columns: Vec::new(),
            indexes: Vec::new(),
            kind: TableKind::BaseTable,
        }
    }

    pub fn find_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name.eq_str(name))
    }

    /// Columns eligible for value generation, i.e. everything except the
    /// auto-increment key.
    pub fn data_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| !c.is_auto_increment())
    }

    /// A copy of this table with the auto-increment columns removed, used
    /// when a generation phase must not reference them.
    pub fn without_auto_increment(&self) -> Table {
        let mut t = self.clone();
        t.columns.retain(|c| !c.is_auto_increment());
        t
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::{ColumnType, ColumnTypeKind};

    fn table_int() -> Table {
        let mut t = Table::new("table_int");
        t.columns = vec![
            Column::new("table_int", "id_table_int", ColumnType::new(ColumnTypeKind::Int))
                .not_null(),
            Column::new("table_int", "col_int", ColumnType::new(ColumnTypeKind::Int)),
        ];
        t
    }

    #[test]
    fn pivot_key_is_folded() {
        let c = Column::new("Table_Int", "Col_Int", ColumnType::new(ColumnTypeKind::Int));
        assert_eq!(c.pivot_key(), "table_int.col_int");
        assert_eq!(c.qualified(), "Table_Int.Col_Int");
    }

    #[test]
    fn data_columns_skip_auto_increment() {
        let t = table_int();
        let names: Vec<_> = t.data_columns().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["col_int"]);
    }

    #[test]
    fn without_auto_increment_is_a_copy() {
        let t = table_int();
        let filtered = t.without_auto_increment();
        assert_eq!(filtered.columns.len(), 1);
        // the source table keeps its full column list
        assert_eq!(t.columns.len(), 2);
    }

    #[test]
    fn table_kind_parses_catalogue_strings() {
        assert_eq!(TableKind::parse("BASE TABLE"), TableKind::BaseTable);
        assert_eq!(TableKind::parse("VIEW"), TableKind::View);
        assert_eq!(TableKind::parse("view"), TableKind::View);
    }
}
