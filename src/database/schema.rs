//! Static table declarations shared by the repositories and both stores.

use crate::filter::filter::{validate_column, validate_table_name};
use crate::filter::FilterError;

/// Columns a caller can never write through `update`.
pub const PROTECTED_COLUMNS: [&str; 3] = ["id", "created_at", "updated_at"];

/// A column holding the `id` of a row in another table. Deleting that row
/// deletes the referencing rows too.
#[derive(Debug, PartialEq, Eq)]
pub struct Reference {
    pub column: &'static str,
    pub table: &'static str,
}

#[derive(Debug, PartialEq, Eq)]
pub struct TableSchema {
    /// Human name used in errors and logs.
    pub entity: &'static str,
    pub name: &'static str,
    /// Primary key columns. `["id"]` for object tables.
    pub key: &'static [&'static str],
    pub columns: &'static [&'static str],
    /// Allow list for `update` and the overwrite set of `upsert`.
    pub mutable: &'static [&'static str],
    /// Additional unique column sets beyond the key.
    pub unique: &'static [&'static [&'static str]],
    pub references: &'static [Reference],
}

impl TableSchema {
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains(&column)
    }

    pub fn is_key(&self, column: &str) -> bool {
        self.key.contains(&column)
    }

    pub fn is_mutable(&self, column: &str) -> bool {
        self.mutable.contains(&column) && !PROTECTED_COLUMNS.contains(&column) && !self.is_key(column)
    }

    /// The key followed by every declared unique set.
    pub fn unique_sets(&self) -> impl Iterator<Item = &'static [&'static str]> + '_ {
        std::iter::once(self.key).chain(self.unique.iter().copied())
    }

    pub fn validate(&self) -> Result<(), FilterError> {
        validate_table_name(self.name)?;
        for column in self.columns {
            validate_column(column)?;
        }
        let referencing = self.references.iter().map(|r| &r.column);
        for column in self.key.iter().chain(self.mutable.iter()).chain(referencing) {
            if !self.has_column(column) {
                return Err(FilterError::InvalidColumn(format!(
                    "{}.{} is not a declared column",
                    self.name, column
                )));
            }
        }
        for reference in self.references {
            validate_table_name(reference.table)?;
        }
        Ok(())
    }
}

pub const USERS: TableSchema = TableSchema {
    entity: "User",
    name: "users",
    key: &["id"],
    columns: &[
        "id",
        "username",
        "email",
        "password_hash",
        "is_verified",
        "last_login",
        "last_password_change",
        "created_at",
        "updated_at",
        "is_active",
    ],
    mutable: &[
        "username",
        "email",
        "password_hash",
        "is_verified",
        "last_login",
        "last_password_change",
        "is_active",
    ],
    unique: &[&["username"], &["email"]],
    references: &[],
};

pub const TREES: TableSchema = TableSchema {
    entity: "Tree",
    name: "trees",
    key: &["id"],
    columns: &["id", "name", "description", "created_at", "updated_at", "is_active"],
    mutable: &["name", "description", "is_active"],
    unique: &[],
    references: &[],
};

pub const INDIVIDUALS: TableSchema = TableSchema {
    entity: "Individual",
    name: "individuals",
    key: &["id"],
    columns: &[
        "id",
        "tree_id",
        "first_name",
        "last_name",
        "patronymic",
        "gender",
        "birth_date",
        "birth_date_precision",
        "birth_place",
        "death_date",
        "death_date_precision",
        "death_place",
        "bio",
        "avatar_url",
        "created_at",
        "updated_at",
        "is_active",
    ],
    mutable: &[
        "first_name",
        "last_name",
        "patronymic",
        "gender",
        "birth_date",
        "birth_date_precision",
        "birth_place",
        "death_date",
        "death_date_precision",
        "death_place",
        "bio",
        "avatar_url",
        "is_active",
    ],
    unique: &[],
    references: &[Reference {
        column: "tree_id",
        table: "trees",
    }],
};

pub const TREE_ACCESS: TableSchema = TableSchema {
    entity: "TreeAccess",
    name: "tree_access",
    key: &["user_id", "tree_id"],
    columns: &["user_id", "tree_id", "access_level", "created_at", "updated_at", "is_active"],
    mutable: &["access_level", "is_active"],
    unique: &[],
    references: &[
        Reference {
            column: "user_id",
            table: "users",
        },
        Reference {
            column: "tree_id",
            table: "trees",
        },
    ],
};

pub const BLOOD_RELATIONS: TableSchema = TableSchema {
    entity: "BloodRelation",
    name: "blood_relations",
    key: &["parent_id", "child_id"],
    columns: &["parent_id", "child_id", "created_at", "updated_at", "is_active"],
    mutable: &["is_active"],
    unique: &[],
    references: &[
        Reference {
            column: "parent_id",
            table: "individuals",
        },
        Reference {
            column: "child_id",
            table: "individuals",
        },
    ],
};

pub const MARRIAGES: TableSchema = TableSchema {
    entity: "Marriage",
    name: "marriages",
    key: &["father_id", "mother_id"],
    columns: &[
        "father_id",
        "mother_id",
        "start_date",
        "end_date",
        "marriage_place",
        "notes",
        "created_at",
        "updated_at",
        "is_active",
    ],
    mutable: &["start_date", "end_date", "marriage_place", "notes", "is_active"],
    unique: &[],
    references: &[
        Reference {
            column: "father_id",
            table: "individuals",
        },
        Reference {
            column: "mother_id",
            table: "individuals",
        },
    ],
};

pub const ALL: [&TableSchema; 6] = [&USERS, &TREES, &INDIVIDUALS, &TREE_ACCESS, &BLOOD_RELATIONS, &MARRIAGES];
