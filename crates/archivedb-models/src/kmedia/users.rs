//! `users`: accounts of the catalogue's editors.

use super::roles::{self, Role};
use super::roles_users::{self, RolesUser};
use archivedb_core::{Entity, Executor, RelatedMany, Result, Timestamp, Value};
use archivedb_macros::Entity;
use archivedb_query::{Bridge, HasMany, Inverse, ManyToMany, Persist};
use std::sync::Arc;

#[derive(Debug, Clone, Default, Entity)]
#[entity(table = "users")]
pub struct User {
    #[entity(primary_key, default)]
    pub id: i32,
    #[entity(default)]
    pub email: String,
    #[entity(default)]
    pub encrypted_password: String,
    pub reset_password_token: Option<String>,
    pub remember_created_at: Option<Timestamp>,
    #[entity(default)]
    pub sign_in_count: Option<i32>,
    pub current_sign_in_at: Option<Timestamp>,
    pub last_sign_in_at: Option<Timestamp>,
    pub current_sign_in_ip: Option<String>,
    pub last_sign_in_ip: Option<String>,
    #[entity(created_at)]
    pub created_at: Option<Timestamp>,
    #[entity(updated_at)]
    pub updated_at: Option<Timestamp>,
    #[entity(default)]
    pub first_name: Option<String>,
    #[entity(default)]
    pub last_name: Option<String>,
    pub authentication_token: Option<String>,
    pub reset_password_sent_at: Option<Timestamp>,
    pub department_id: Option<i32>,
    #[entity(skip)]
    pub r: Option<Box<UserR>>,
}

#[derive(Debug, Clone, Default)]
pub struct UserR {
    pub roles_users: RelatedMany<RolesUser>,
    pub roles: RelatedMany<Role>,
}

pub(crate) fn user_roles_users(u: &mut User) -> &mut RelatedMany<RolesUser> {
    &mut u.rels().roles_users
}

pub(crate) fn user_roles(u: &mut User) -> &mut RelatedMany<Role> {
    &mut u.rels().roles
}

/// Raw grant rows; `roles_users.user_id` is not nullable.
pub const ROLES_USERS: HasMany<User, RolesUser> = HasMany {
    name: "RolesUsers",
    foreign_key: "user_id",
    local_key: "id",
    slot: user_roles_users,
    inverse: Inverse::One(roles_users::roles_user_user),
};

pub const ROLES: ManyToMany<User, Role> = ManyToMany {
    name: "Roles",
    bridge: Bridge {
        table: "roles_users",
        owner_column: "user_id",
        related_column: "role_id",
    },
    local_key: "id",
    related_key: "id",
    slot: user_roles,
    inverse: Inverse::Many(roles::role_users),
};

impl User {
    pub fn rels(&mut self) -> &mut UserR {
        self.r.get_or_insert_with(Default::default)
    }

    pub fn find_by_id<X: Executor + ?Sized>(exec: &X, id: i32) -> Result<Option<User>> {
        Self::find(exec, &[Value::Int(id)])
    }

    pub fn full_name(&self) -> String {
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(name), None) | (None, Some(name)) => name.to_string(),
            (None, None) => self.email.clone(),
        }
    }

    pub fn roles<X: Executor + ?Sized>(&self, exec: &X) -> Result<Vec<Arc<Role>>> {
        let mut probe = self.detached();
        ROLES.load_one(exec, &mut probe)?;
        Ok(user_roles(&mut probe).as_slice().to_vec())
    }

    pub fn has_role<X: Executor + ?Sized>(&self, exec: &X, name: &str) -> Result<bool> {
        Ok(self
            .roles(exec)?
            .iter()
            .any(|role| role.name.as_deref() == Some(name)))
    }

    pub fn add_roles<X: Executor + ?Sized>(
        &mut self,
        exec: &X,
        related: Vec<Role>,
        insert: bool,
    ) -> Result<Vec<Arc<Role>>> {
        ROLES.add(exec, self, related, insert)
    }
}
