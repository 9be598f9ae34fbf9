//! `roles`: named permission sets granted to users.

use super::users::{self, User};
use archivedb_core::{Executor, RelatedMany, Result, Timestamp, Value};
use archivedb_macros::Entity;
use archivedb_query::{Bridge, Inverse, ManyToMany, Persist};
use std::sync::Arc;

#[derive(Debug, Clone, Default, Entity)]
#[entity(table = "roles")]
pub struct Role {
    #[entity(primary_key, default)]
    pub id: i32,
    pub name: Option<String>,
    pub description: Option<String>,
    #[entity(created_at)]
    pub created_at: Option<Timestamp>,
    #[entity(updated_at)]
    pub updated_at: Option<Timestamp>,
    #[entity(skip)]
    pub r: Option<Box<RoleR>>,
}

#[derive(Debug, Clone, Default)]
pub struct RoleR {
    pub users: RelatedMany<User>,
}

pub(crate) fn role_users(r: &mut Role) -> &mut RelatedMany<User> {
    &mut r.rels().users
}

/// Users holding this role, through `roles_users`.
pub const USERS: ManyToMany<Role, User> = ManyToMany {
    name: "Users",
    bridge: Bridge {
        table: "roles_users",
        owner_column: "role_id",
        related_column: "user_id",
    },
    local_key: "id",
    related_key: "id",
    slot: role_users,
    inverse: Inverse::Many(users::user_roles),
};

impl Role {
    pub fn rels(&mut self) -> &mut RoleR {
        self.r.get_or_insert_with(Default::default)
    }

    pub fn find_by_id<X: Executor + ?Sized>(exec: &X, id: i32) -> Result<Option<Role>> {
        Self::find(exec, &[Value::Int(id)])
    }

    pub fn grant<X: Executor + ?Sized>(&mut self, exec: &X, to: Vec<User>) -> Result<Vec<Arc<User>>> {
        USERS.add(exec, self, to, false)
    }

    pub fn revoke<X: Executor + ?Sized>(&mut self, exec: &X, from: &mut [User]) -> Result<()> {
        USERS.remove(exec, self, from)
    }
}
