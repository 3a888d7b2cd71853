//! Mismatch reporting.

use itertools::Itertools;
use sql_gen::model::value::PivotRows;

/// Prints offending queries and, in the PQS case, the pivot row the result
/// set should have contained. When `silent` is off a report aborts the
/// process; otherwise the loop continues hunting.
pub struct Reporter {
    silent: bool,
}

impl Reporter {
    pub fn new(silent: bool) -> Self {
        Reporter { silent }
    }

    pub fn report_pqs(&self, sql: &str, pivot: &PivotRows) {
        tracing::error!(sql, pivot = %format_pivot(pivot), "pivot row missing from result set");
        if !self.silent {
            panic!("data verification failed");
        }
    }

    pub fn report_group(&self, sqls: &[String]) {
        tracing::error!(queries = ?sqls, "result sets disagree within an equivalence group");
        if !self.silent {
            panic!("data verification failed");
        }
    }
}

/// Render the pivot as `table.column=value` lines, sorted by key so the
/// output is stable across runs.
pub fn format_pivot(pivot: &PivotRows) -> String {
    pivot
        .iter()
        .sorted_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(key, item)| {
            if item.null {
                format!("{key}=NULL")
            } else {
                format!("{key}={}", item.val)
            }
        })
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use sql_gen::model::value::{ItemKind, QueryItem};

    #[test]
    fn pivot_formatting_is_sorted_and_null_aware() {
        let pivot: PivotRows = [
            ("t2.b".to_string(), QueryItem::null()),
            ("t1.a".to_string(), QueryItem::new("5", ItemKind::Int)),
        ]
        .into_iter()
        .collect();
        assert_eq!(format_pivot(&pivot), "t1.a=5\nt2.b=NULL");
    }

    #[test]
    fn silent_reporter_does_not_panic() {
        let reporter = Reporter::new(true);
        reporter.report_pqs("SELECT 1", &PivotRows::new());
        reporter.report_group(&["SELECT 1".into(), "SELECT 2".into()]);
    }

    #[test]
    #[should_panic(expected = "data verification failed")]
    fn loud_reporter_panics() {
        Reporter::new(false).report_group(&[]);
    }
}
