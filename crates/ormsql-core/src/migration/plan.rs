//! DDL plans produced by the schema differ.

use std::fmt;

/// Whether a plan creates the table or alters an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanKind {
    /// The table is missing; the single statement is a `CREATE TABLE`.
    Create,
    /// The table exists; statements are `ALTER TABLE` clauses.
    Alter,
}

impl fmt::Display for PlanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanKind::Create => write!(f, "create"),
            PlanKind::Alter => write!(f, "alter"),
        }
    }
}

/// Ordered statements that reconcile a live table with its model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationPlan {
    /// Escaped table name.
    pub table: String,
    /// Plan kind.
    pub kind: PlanKind,
    /// Full `CREATE TABLE` for [`PlanKind::Create`], otherwise the
    /// individual `ALTER TABLE` clauses in execution order.
    pub statements: Vec<String>,
}

impl MigrationPlan {
    /// Plan that creates the table.
    pub fn create(table: impl Into<String>, statement: String) -> Self {
        Self {
            table: table.into(),
            kind: PlanKind::Create,
            statements: vec![statement],
        }
    }

    /// Plan that alters the table. May be empty.
    pub fn alter(table: impl Into<String>, clauses: Vec<String>) -> Self {
        Self {
            table: table.into(),
            kind: PlanKind::Alter,
            statements: clauses,
        }
    }

    /// Whether applying the plan would change anything.
    pub fn needs_changes(&self) -> bool {
        !self.statements.is_empty()
    }

    /// Number of statements or clauses.
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    /// Whether the plan has no statements.
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Render the plan as one executable statement.
    ///
    /// Returns `None` for an empty alter plan.
    pub fn to_sql(&self) -> Option<String> {
        if self.statements.is_empty() {
            return None;
        }
        match self.kind {
            PlanKind::Create => Some(self.statements.join(";\n")),
            PlanKind::Alter => Some(format!(
                "ALTER TABLE {} {}",
                self.table,
                self.statements.join(",\n")
            )),
        }
    }
}
