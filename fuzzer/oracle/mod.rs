//! The verification oracles: PQS pivot checking and the cardinality /
//! content comparison shared by NoREC and TLP.

use std::fmt;

use itertools::Itertools;
use sql_gen::model::value::{PivotRows, QueryItem};
use sql_gen::Column;

/// The testing approach chosen for a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Approach {
    Pqs,
    NoRec,
    Tlp,
}

impl fmt::Display for Approach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Approach::Pqs => write!(f, "PQS"),
            Approach::NoRec => write!(f, "NoREC"),
            Approach::Tlp => write!(f, "TLP"),
        }
    }
}

/// Cell equality: both NULL, or both non-NULL with identical renderings.
pub fn compare_query_item(left: &QueryItem, right: &QueryItem) -> bool {
    if left.null != right.null {
        return false;
    }
    left.null || left.val == right.val
}

/// True when some result row matches the pivot on every output column.
pub fn verify_pqs(
    pivot: &PivotRows,
    columns: &[Column],
    result: &[Vec<QueryItem>],
) -> bool {
    result.iter().any(|row| check_row(pivot, columns, row))
}

fn check_row(pivot: &PivotRows, columns: &[Column], row: &[QueryItem]) -> bool {
    if row.len() != columns.len() {
        return false;
    }
    columns.iter().zip(row).all(|(column, cell)| {
        pivot
            .get(&column.pivot_key())
            .is_some_and(|expected| compare_query_item(expected, cell))
    })
}

/// Compare the result sets of one equivalence group. Cardinality must
/// always agree; with `ignore_sort` the row contents are compared as
/// multisets, otherwise in order.
pub fn check_result_set(sets: &[Vec<Vec<QueryItem>>], ignore_sort: bool) -> bool {
    if sets.len() < 2 {
        return true;
    }
    let reference = canonical(&sets[0], ignore_sort);
    sets[1..].iter().all(|set| {
        set.len() == sets[0].len() && canonical(set, ignore_sort) == reference
    })
}

fn canonical(set: &[Vec<QueryItem>], ignore_sort: bool) -> Vec<Vec<(bool, String)>> {
    let rows = set
        .iter()
        .map(|row| {
            row.iter()
                .map(|item| (item.null, if item.null { String::new() } else { item.val.clone() }))
                .collect::<Vec<_>>()
        });
    if ignore_sort {
        rows.sorted().collect()
    } else {
        rows.collect()
    }
}
