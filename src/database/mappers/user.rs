use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::EntityMapper;
use crate::database::schema::{TableSchema, USERS};
use crate::domain::entities::{NewUser, User};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_verified: bool,
    pub last_login: DateTime<Utc>,
    pub last_password_change: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_active: bool,
}

pub struct UserMapper;

impl EntityMapper for UserMapper {
    type Entity = User;
    type Draft = NewUser;
    type Record = UserRecord;

    const SCHEMA: &'static TableSchema = &USERS;

    fn to_storage(entity: &User) -> UserRecord {
        UserRecord {
            id: entity.id,
            username: entity.username.clone(),
            email: entity.email.clone(),
            password_hash: entity.password_hash.clone(),
            is_verified: entity.is_verified,
            last_login: entity.last_login,
            last_password_change: entity.last_password_change,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
            is_active: entity.is_active,
        }
    }

    fn to_entity(record: UserRecord) -> User {
        User {
            id: record.id,
            username: record.username,
            email: record.email,
            password_hash: record.password_hash,
            is_verified: record.is_verified,
            last_login: record.last_login,
            last_password_change: record.last_password_change,
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
    fn keeps_the_password_hash_in_storage() {
        let now = stamp();
        let user = User {
            id: Uuid::new_v4(),
            username: "ann".into(),
            email: "ann@example.com".into(),
            password_hash: "$argon2id$v=19$stub".into(),
            is_verified: true,
            last_login: now,
            last_password_change: now,
            created_at: now,
            updated_at: now,
            is_active: true,
        };

        let row = encode::<UserMapper>(&user).unwrap();
        assert_eq!(row["password_hash"], "$argon2id$v=19$stub");
        assert_eq!(decode::<UserMapper>(row).unwrap(), user);
        assert_eq!(UserMapper::to_entity(UserMapper::to_storage(&user)), user);
    }
}
