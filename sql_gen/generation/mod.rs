//! Random statement synthesis.
//!
//! All generation is driven by an explicit `Rng` plus a [`GenCtx`]
//! describing the tables in scope and the generation mode. Nothing in this
//! module touches global state.

use rand::Rng;

use crate::model::query::SelectStmt;
use crate::model::table::{Column, Table};
use crate::model::value::PivotRows;

mod expr;
mod query;

pub use query::compose_all_column_types;

/// Static generator options.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenConfig {
    /// Allow optimizer hints on generated selects.
    pub hint: bool,
}

/// The statement generator. Stateless apart from its configuration; the
/// RNG is threaded through every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct Generator {
    pub config: GenConfig,
}

impl Generator {
    pub fn new(config: GenConfig) -> Self {
        Generator { config }
    }
}

/// The set of tables a generation call may reference, the optional pivot
/// witness, and mode flags. Tables are held by value: the context is a
/// snapshot, detached from the live schema cache.
#[derive(Debug, Clone)]
pub struct GenCtx {
    pub tables: Vec<Table>,
    pub pivot: Option<PivotRows>,
    pub is_pqs_mode: bool,
    pub is_in_expr_index: bool,
    pub enable_left_right_join: bool,
}

impl GenCtx {
    pub fn new(tables: Vec<Table>, pivot: Option<PivotRows>) -> Self {
        GenCtx {
            tables,
            pivot,
            is_pqs_mode: false,
            is_in_expr_index: false,
            enable_left_right_join: true,
        }
    }

    /// All columns of all tables in scope, in table order.
    pub fn columns(&self) -> Vec<Column> {
        self.tables
            .iter()
            .flat_map(|t| t.columns.iter().cloned())
            .collect()
    }
}

/// The outcome of `Generator::select_stmt`: the AST, its rendering, the
/// ordered output columns and the pivot map the query was built against
/// (empty outside PQS mode).
#[derive(Debug, Clone)]
pub struct GeneratedSelect {
    pub stmt: SelectStmt,
    pub sql: String,
    pub columns: Vec<Column>,
    pub pivot: PivotRows,
}

/// Uniformly pick an element. Panics on an empty slice, matching the
/// contract of every call site (which checks emptiness first).
pub(crate) fn pick<'a, T, R: Rng + ?Sized>(items: &'a [T], rng: &mut R) -> &'a T {
    &items[rng.random_range(0..items.len())]
}

/// A short random identifier suffix of lowercase letters.
pub fn rand_ident<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
    (0..len)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn rand_ident_is_lowercase_alpha() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let id = rand_ident(&mut rng, 5);
        assert_eq!(id.len(), 5);
        assert!(id.chars().all(|c| c.is_ascii_lowercase()));
    }

    #[test]
    fn pick_returns_member() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let items = [1, 2, 3];
        for _ in 0..16 {
            assert!(items.contains(pick(&items, &mut rng)));
        }
    }
}
