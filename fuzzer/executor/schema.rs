//! Schema reflection: rebuilding the cache from the live catalogue.

use std::collections::HashMap;

use anyhow::{Context, Result};
use sql_gen::{CiStr, Column, ColumnType, Table, TableKind};

use super::{Executor, SchemaCache};

impl Executor {
    /// Rebuild the cache from the flat catalogue listing. The new cache is
    /// assembled completely before it replaces the old one, so a failure
    /// partway through leaves the previous snapshot intact.
    pub fn reload_schema(&mut self) -> Result<()> {
        let records = self
            .conn
            .fetch_schema(&self.db)
            .context("fetch schema records")?;

        let mut indexes: HashMap<String, Vec<CiStr>> = HashMap::new();
        for record in records.iter().filter(|r| r.db == self.db) {
            if indexes.contains_key(&record.table) {
                continue;
            }
            let index = self
                .conn
                .fetch_indexes(&self.db, &record.table)
                .with_context(|| format!("fetch indexes of {}", record.table))?;
            indexes.insert(
                record.table.clone(),
                index.into_iter().map(CiStr::new).collect(),
            );
        }

        let mut cache = SchemaCache::new();
        for record in &records {
            if record.db != self.db {
                continue;
            }
            let table = cache
                .entry(record.table.to_lowercase())
                .or_insert_with(|| Table {
                    name: CiStr::new(&record.table),
                    columns: Vec::new(),
                    indexes: indexes.get(&record.table).cloned().unwrap_or_default(),
                    kind: TableKind::parse(&record.table_type),
                });
            let nullable = record.nullable.eq_ignore_ascii_case("yes");
            // catalogue views may return several rows per column; fold
            // duplicates by updating the existing entry in place
            if let Some(column) = table
                .columns
                .iter_mut()
                .find(|c| c.name.eq_str(&record.column))
            {
                column.column_type = ColumnType::parse(&record.column_type);
                column.nullable = nullable;
                continue;
            }
            table.columns.push(Column {
                table: CiStr::new(&record.table),
                name: CiStr::new(&record.column),
                column_type: ColumnType::parse(&record.column_type),
                nullable,
            });
        }

        self.cache = cache;
        Ok(())
    }

    /// Rebuild the cache through the per-table catalogue surface. Table
    /// kinds are recovered from the seeded-view naming convention since
    /// this listing does not carry a type column.
    pub fn load_schema(&mut self) -> Result<()> {
        let names = self
            .conn
            .fetch_tables(&self.db)
            .context("fetch table names")?;

        let mut cache = SchemaCache::new();
        for name in names {
            let mut table = Table::new(name.as_str());
            if name.to_lowercase().starts_with("view_") {
                table.kind = TableKind::View;
            }
            for [column, column_type, nullable] in self
                .conn
                .fetch_columns(&self.db, &name)
                .with_context(|| format!("fetch columns of {name}"))?
            {
                table.columns.push(Column {
                    table: CiStr::new(&name),
                    name: CiStr::new(column),
                    column_type: ColumnType::parse(&column_type),
                    nullable: nullable.eq_ignore_ascii_case("yes"),
                });
            }
            for index in self
                .conn
                .fetch_indexes(&self.db, &name)
                .with_context(|| format!("fetch indexes of {name}"))?
            {
                table.indexes.push(CiStr::new(index));
            }
            cache.insert(table.name.folded().to_string(), table);
        }

        self.cache = cache;
        Ok(())
    }
}
