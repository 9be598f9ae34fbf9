//! `roles_users`: the grant table between users and roles.

use super::users::{self, User};
use archivedb_core::{Executor, Related, Result, Value};
use archivedb_macros::Entity;
use archivedb_query::{BelongsTo, Inverse, Persist};

#[derive(Debug, Clone, Default, Entity)]
#[entity(table = "roles_users")]
pub struct RolesUser {
    #[entity(primary_key, foreign_key = "roles.id")]
    pub role_id: i32,
    #[entity(primary_key, foreign_key = "users.id")]
    pub user_id: i32,
    #[entity(skip)]
    pub r: Option<Box<RolesUserR>>,
}

#[derive(Debug, Clone, Default)]
pub struct RolesUserR {
    pub user: Related<User>,
}

pub(crate) fn roles_user_user(ru: &mut RolesUser) -> &mut Related<User> {
    &mut ru.rels().user
}

pub const USER: BelongsTo<RolesUser, User> = BelongsTo {
    name: "User",
    foreign_key: "user_id",
    references: "id",
    slot: roles_user_user,
    inverse: Inverse::Many(users::user_roles_users),
};

impl RolesUser {
    pub fn rels(&mut self) -> &mut RolesUserR {
        self.r.get_or_insert_with(Default::default)
    }

    pub fn find_by_key<X: Executor + ?Sized>(
        exec: &X,
        role_id: i32,
        user_id: i32,
    ) -> Result<Option<RolesUser>> {
        Self::find(exec, &[Value::Int(role_id), Value::Int(user_id)])
    }
}
