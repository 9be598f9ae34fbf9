//! `tags`: the hierarchical topic tree.

use super::content_units::ContentUnit;
use super::tag_i18n::TagI18n;
use archivedb_core::{Entity, Executor, Related, RelatedMany, Result, Value};
use archivedb_macros::Entity;
use archivedb_query::{BelongsTo, Bridge, HasMany, Inverse, ManyToMany, Persist};
use std::sync::Arc;

#[derive(Debug, Clone, Default, Entity)]
#[entity(table = "tags")]
pub struct Tag {
    #[entity(primary_key, default)]
    pub id: i64,
    pub description: Option<String>,
    #[entity(foreign_key = "tags.id")]
    pub parent_id: Option<i64>,
    pub uid: String,
    pub pattern: Option<String>,
    #[entity(skip)]
    pub r: Option<Box<TagR>>,
}

/// Loaded relationships of a [`Tag`].
#[derive(Debug, Clone, Default)]
pub struct TagR {
    pub parent: Related<Tag>,
    pub content_units: RelatedMany<ContentUnit>,
    pub tag_i18ns: RelatedMany<TagI18n>,
    pub parent_tags: RelatedMany<Tag>,
}

fn parent(t: &mut Tag) -> &mut Related<Tag> {
    &mut t.rels().parent
}

fn parent_tags(t: &mut Tag) -> &mut RelatedMany<Tag> {
    &mut t.rels().parent_tags
}

pub(crate) fn content_units(t: &mut Tag) -> &mut RelatedMany<ContentUnit> {
    &mut t.rels().content_units
}

pub(crate) fn tag_i18ns(t: &mut Tag) -> &mut RelatedMany<TagI18n> {
    &mut t.rels().tag_i18ns
}

/// The tag this one hangs under.
pub const PARENT: BelongsTo<Tag, Tag> = BelongsTo {
    name: "Parent",
    foreign_key: "parent_id",
    references: "id",
    slot: parent,
    inverse: Inverse::Many(parent_tags),
};

/// Direct children, i.e. tags whose `parent_id` is this tag.
pub const PARENT_TAGS: HasMany<Tag, Tag> = HasMany {
    name: "ParentTags",
    foreign_key: "parent_id",
    local_key: "id",
    slot: parent_tags,
    inverse: Inverse::One(parent),
};

pub const TAG_I18NS: HasMany<Tag, TagI18n> = HasMany {
    name: "TagI18ns",
    foreign_key: "tag_id",
    local_key: "id",
    slot: tag_i18ns,
    inverse: Inverse::One(super::tag_i18n::tag),
};

pub(crate) const CONTENT_UNITS_TAGS: Bridge = Bridge {
    table: "content_units_tags",
    owner_column: "tag_id",
    related_column: "content_unit_id",
};

pub const CONTENT_UNITS: ManyToMany<Tag, ContentUnit> = ManyToMany {
    name: "ContentUnits",
    bridge: CONTENT_UNITS_TAGS,
    local_key: "id",
    related_key: "id",
    slot: content_units,
    inverse: Inverse::Many(super::content_units::tags),
};

impl Tag {
    pub fn rels(&mut self) -> &mut TagR {
        self.r.get_or_insert_with(Default::default)
    }

    pub fn find_by_id<X: Executor + ?Sized>(exec: &X, id: i64) -> Result<Option<Tag>> {
        Self::find(exec, &[Value::BigInt(id)])
    }

    /// Fetch the parent without touching this tag's relations.
    pub fn parent<X: Executor + ?Sized>(&self, exec: &X) -> Result<Option<Arc<Tag>>> {
        let mut probe = self.detached();
        PARENT.load_one(exec, &mut probe)?;
        Ok(parent(&mut probe).take())
    }

    pub fn children<X: Executor + ?Sized>(&self, exec: &X) -> Result<Vec<Arc<Tag>>> {
        let mut probe = self.detached();
        PARENT_TAGS.load_one(exec, &mut probe)?;
        Ok(parent_tags(&mut probe).as_slice().to_vec())
    }

    pub fn translations<X: Executor + ?Sized>(&self, exec: &X) -> Result<Vec<Arc<TagI18n>>> {
        let mut probe = self.detached();
        TAG_I18NS.load_one(exec, &mut probe)?;
        Ok(tag_i18ns(&mut probe).as_slice().to_vec())
    }

    pub fn set_parent<X: Executor + ?Sized>(
        &mut self,
        exec: &X,
        related: Tag,
        insert: bool,
    ) -> Result<Arc<Tag>> {
        PARENT.set(exec, self, related, insert)
    }

    pub fn remove_parent<X: Executor + ?Sized>(&mut self, exec: &X, related: &mut Tag) -> Result<()> {
        PARENT.remove(exec, self, related)
    }

    pub fn add_children<X: Executor + ?Sized>(
        &mut self,
        exec: &X,
        related: Vec<Tag>,
        insert: bool,
    ) -> Result<Vec<Arc<Tag>>> {
        PARENT_TAGS.add(exec, self, related, insert)
    }

    pub fn add_content_units<X: Executor + ?Sized>(
        &mut self,
        exec: &X,
        related: Vec<ContentUnit>,
        insert: bool,
    ) -> Result<Vec<Arc<ContentUnit>>> {
        CONTENT_UNITS.add(exec, self, related, insert)
    }

    pub fn remove_content_units<X: Executor + ?Sized>(
        &mut self,
        exec: &X,
        related: &mut [ContentUnit],
    ) -> Result<()> {
        CONTENT_UNITS.remove(exec, self, related)
    }
}
