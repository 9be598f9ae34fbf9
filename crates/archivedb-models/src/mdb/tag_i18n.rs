//! `tag_i18n`: per-language labels of a tag.

use super::tags::{self, Tag};
use archivedb_core::{Entity, Executor, Related, Result, Timestamp, Value};
use archivedb_macros::Entity;
use archivedb_query::{BelongsTo, Inverse, Persist};
use std::sync::Arc;

#[derive(Debug, Clone, Default, Entity)]
#[entity(table = "tag_i18n")]
pub struct TagI18n {
    #[entity(primary_key, foreign_key = "tags.id")]
    pub tag_id: i64,
    #[entity(primary_key)]
    pub language: String,
    #[entity(default)]
    pub original_language: Option<String>,
    #[entity(default)]
    pub label: Option<String>,
    #[entity(default)]
    pub user_id: Option<i64>,
    #[entity(default, created_at)]
    pub created_at: Timestamp,
    #[entity(skip)]
    pub r: Option<Box<TagI18nR>>,
}

#[derive(Debug, Clone, Default)]
pub struct TagI18nR {
    pub tag: Related<Tag>,
}

pub(crate) fn tag(t: &mut TagI18n) -> &mut Related<Tag> {
    &mut t.rels().tag
}

pub const TAG: BelongsTo<TagI18n, Tag> = BelongsTo {
    name: "Tag",
    foreign_key: "tag_id",
    references: "id",
    slot: tag,
    inverse: Inverse::Many(tags::tag_i18ns),
};

impl TagI18n {
    pub fn rels(&mut self) -> &mut TagI18nR {
        self.r.get_or_insert_with(Default::default)
    }

    pub fn find_by_key<X: Executor + ?Sized>(
        exec: &X,
        tag_id: i64,
        language: &str,
    ) -> Result<Option<TagI18n>> {
        Self::find(exec, &[Value::BigInt(tag_id), Value::from(language)])
    }

    pub fn tag<X: Executor + ?Sized>(&self, exec: &X) -> Result<Option<Arc<Tag>>> {
        let mut probe = self.detached();
        TAG.load_one(exec, &mut probe)?;
        Ok(tag(&mut probe).take())
    }

    /// Move this translation to another tag.
    ///
    /// `tag_id` is part of the primary key, so the `UPDATE` is keyed on the
    /// old value and the record is left pointing at `related` afterwards.
    pub fn set_tag<X: Executor + ?Sized>(
        &mut self,
        exec: &X,
        related: Tag,
        insert: bool,
    ) -> Result<Arc<Tag>> {
        TAG.set(exec, self, related, insert)
    }
}
