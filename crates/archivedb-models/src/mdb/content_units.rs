//! `content_units`: the logical units of archived content.

use super::tags::{CONTENT_UNITS_TAGS, Tag};
use archivedb_core::{Executor, RelatedMany, Result, Timestamp, Value};
use archivedb_macros::Entity;
use archivedb_query::{Bridge, Inverse, ManyToMany, Persist};
use std::sync::Arc;

#[derive(Debug, Clone, Default, Entity)]
#[entity(table = "content_units")]
pub struct ContentUnit {
    #[entity(primary_key, default)]
    pub id: i64,
    pub uid: String,
    pub type_id: i64,
    #[entity(default, created_at)]
    pub created_at: Timestamp,
    pub properties: Option<serde_json::Value>,
    #[entity(skip)]
    pub r: Option<Box<ContentUnitR>>,
}

#[derive(Debug, Clone, Default)]
pub struct ContentUnitR {
    pub tags: RelatedMany<Tag>,
}

pub(crate) fn tags(c: &mut ContentUnit) -> &mut RelatedMany<Tag> {
    &mut c.rels().tags
}

/// The reverse side of [`super::tags::CONTENT_UNITS`], over the same bridge table.
pub const TAGS: ManyToMany<ContentUnit, Tag> = ManyToMany {
    name: "Tags",
    bridge: Bridge {
        table: CONTENT_UNITS_TAGS.table,
        owner_column: CONTENT_UNITS_TAGS.related_column,
        related_column: CONTENT_UNITS_TAGS.owner_column,
    },
    local_key: "id",
    related_key: "id",
    slot: tags,
    inverse: Inverse::Many(super::tags::content_units),
};

impl ContentUnit {
    pub fn rels(&mut self) -> &mut ContentUnitR {
        self.r.get_or_insert_with(Default::default)
    }

    pub fn find_by_id<X: Executor + ?Sized>(exec: &X, id: i64) -> Result<Option<ContentUnit>> {
        Self::find(exec, &[Value::BigInt(id)])
    }

    /// Read one top-level key of `properties`.
    pub fn property(&self, key: &str) -> Option<&serde_json::Value> {
        self.properties.as_ref()?.get(key)
    }

    pub fn add_tags<X: Executor + ?Sized>(
        &mut self,
        exec: &X,
        related: Vec<Tag>,
        insert: bool,
    ) -> Result<Vec<Arc<Tag>>> {
        TAGS.add(exec, self, related, insert)
    }

    /// Replace every tag link of this unit.
    pub fn set_tags<X: Executor + ?Sized>(
        &mut self,
        exec: &X,
        related: Vec<Tag>,
        insert: bool,
    ) -> Result<Vec<Arc<Tag>>> {
        TAGS.set(exec, self, related, insert)
    }
}
