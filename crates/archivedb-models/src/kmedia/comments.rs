//! `comments`: free-form feedback left on the site.

use archivedb_core::{Executor, Result, Timestamp, Value};
use archivedb_macros::Entity;
use archivedb_query::Persist;

#[derive(Debug, Clone, Default, PartialEq, Entity)]
#[entity(table = "comments")]
pub struct Comment {
    #[entity(primary_key, default)]
    pub id: i32,
    pub name: Option<String>,
    pub email: Option<String>,
    pub subject: Option<String>,
    pub comment: Option<String>,
    #[entity(created_at)]
    pub created_at: Timestamp,
    #[entity(updated_at)]
    pub updated_at: Timestamp,
}

impl Comment {
    pub fn find_by_id<X: Executor + ?Sized>(exec: &X, id: i32) -> Result<Option<Comment>> {
        Self::find(exec, &[Value::Int(id)])
    }
}
