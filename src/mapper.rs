use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Result, TallyError};

/// Roles that must be assigned before rows can be normalized.
pub const REQUIRED_ROLES: [Role; 3] = [Role::Amount, Role::Date, Role::Payee];

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Role {
    Amount,
    Date,
    Payee,
    /// Any other column name, passed through to the record unchanged.
    Field(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Amount => "amount",
            Self::Date => "date",
            Self::Payee => "payee",
            Self::Field(name) => name,
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name {
            "amount" => Self::Amount,
            "date" => Self::Date,
            "payee" => Self::Payee,
            other => Self::Field(other.to_string()),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the user picked for a single column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ColumnChoice {
    #[default]
    Unset,
    /// Explicitly excluded from the import.
    Skip,
    Role(Role),
}

impl ColumnChoice {
    pub fn role(&self) -> Option<&Role> {
        match self {
            Self::Role(r) => Some(r),
            _ => None,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Unset => "-",
            Self::Skip => "skip",
            Self::Role(r) => r.as_str(),
        }
    }
}

/// Parse a `--map` argument of the form `INDEX=ROLE` (zero-based index).
pub fn parse_assignment(arg: &str) -> Result<(usize, ColumnChoice)> {
    let (idx, role) = arg
        .split_once('=')
        .ok_or_else(|| TallyError::Other(format!("Invalid column mapping {arg:?} (expected INDEX=ROLE)")))?;
    let idx: usize = idx
        .trim()
        .parse()
        .map_err(|_| TallyError::Other(format!("Invalid column index in {arg:?}")))?;
    let choice = match role.trim().to_lowercase().as_str() {
        "" | "unset" | "none" => ColumnChoice::Unset,
        "skip" => ColumnChoice::Skip,
        name => ColumnChoice::Role(Role::from_name(name)),
    };
    Ok((idx, choice))
}

/// Tabular input as read from the file: first row is headers, rest is body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub body: Vec<Vec<String>>,
}

impl RawTable {
    pub fn from_rows(mut rows: Vec<Vec<String>>) -> Self {
        if rows.is_empty() {
            return Self::default();
        }
        let headers = rows.remove(0);
        Self { headers, body: rows }
    }

    pub fn width(&self) -> usize {
        self.headers.len()
    }
}

/// Raw table after masking: unmapped cells are `None`, empty rows are gone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappedTable {
    pub headers: Vec<Option<Role>>,
    pub body: Vec<Vec<Option<String>>>,
}

/// Per-column role selection for one import session.
#[derive(Debug, Clone, Default)]
pub struct ColumnMapper {
    selection: BTreeMap<usize, ColumnChoice>,
}

impl ColumnMapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign_role(&mut self, column: usize, choice: ColumnChoice) {
        if let ColumnChoice::Role(role) = &choice {
            for (idx, held) in self.selection.iter_mut() {
                if *idx != column && held.role() == Some(role) {
                    tracing::debug!("Releasing {role} from column {idx}");
                    *held = ColumnChoice::Unset;
                }
            }
        }
        self.selection.insert(column, choice);
    }

    pub fn choice(&self, column: usize) -> &ColumnChoice {
        static UNSET: ColumnChoice = ColumnChoice::Unset;
        self.selection.get(&column).unwrap_or(&UNSET)
    }

    pub fn role_at(&self, column: usize) -> Option<&Role> {
        self.choice(column).role()
    }

    pub fn progress_count(&self) -> usize {
        self.selection.values().filter(|c| c.role().is_some()).count()
    }

    pub fn missing_roles(&self) -> Vec<Role> {
        REQUIRED_ROLES
            .iter()
            .filter(|r| !self.selection.values().any(|c| c.role() == Some(*r)))
            .cloned()
            .collect()
    }

    pub fn required_roles_satisfied(&self) -> bool {
        self.missing_roles().is_empty()
    }

    pub fn build_mapped_table(&self, table: &RawTable) -> MappedTable {
        let headers: Vec<Option<Role>> = (0..table.width())
            .map(|i| self.role_at(i).cloned())
            .collect();

        let body = table
            .body
            .iter()
            .map(|row| {
                headers
                    .iter()
                    .enumerate()
                    .map(|(i, role)| match role {
                        Some(_) => row.get(i).cloned(),
                        None => None,
                    })
                    .collect::<Vec<_>>()
            })
            .filter(|row| row.iter().any(Option::is_some))
            .collect();

        MappedTable { headers, body }
    }
}
