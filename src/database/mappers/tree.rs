use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::EntityMapper;
use crate::database::schema::{TableSchema, TREES};
use crate::domain::entities::{NewTree, Tree};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeRecord {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_active: bool,
}

pub struct TreeMapper;

impl EntityMapper for TreeMapper {
    type Entity = Tree;
    type Draft = NewTree;
    type Record = TreeRecord;

    const SCHEMA: &'static TableSchema = &TREES;

    fn to_storage(entity: &Tree) -> TreeRecord {
        TreeRecord {
            id: entity.id,
            name: entity.name.clone(),
            description: entity.description.clone(),
            created_at: entity.created_at,
            updated_at: entity.updated_at,
            is_active: entity.is_active,
        }
    }

    fn to_entity(record: TreeRecord) -> Tree {
        Tree {
            id: record.id,
            name: record.name,
            description: record.description,
            created_at: record.created_at,
            updated_at: record.updated_at,
            is_active: record.is_active,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::mappers::{decode, encode, testing::stamp};

    #[test]
    fn round_trips_through_a_storage_row() {
        let now = stamp();
        let tree = Tree {
            id: Uuid::new_v4(),
            name: "Romanov".into(),
            description: None,
            created_at: now,
            updated_at: now,
            is_active: false,
        };

        assert_eq!(TreeMapper::to_entity(TreeMapper::to_storage(&tree)), tree);

        let row = encode::<TreeMapper>(&tree).unwrap();
        assert!(row.keys().all(|c| TREES.has_column(c)));
        assert_eq!(decode::<TreeMapper>(row).unwrap(), tree);
    }
}
