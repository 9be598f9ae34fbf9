//! A small folder/note/label schema shared by the integration tests.
#![allow(dead_code)]

use archivedb_core::{Related, RelatedMany, Row, Timestamp, Value};
use archivedb_macros::Entity;
use archivedb_query::testing::row;
use archivedb_query::{BelongsTo, Bridge, HasMany, HasOne, Inverse, ManyToMany};

#[derive(Debug, Clone, Default, Entity)]
#[entity(table = "folders")]
pub struct Folder {
    #[entity(primary_key, default)]
    pub id: i64,
    pub name: String,
    #[entity(foreign_key = "folders.id")]
    pub parent_id: Option<i64>,
    #[entity(skip)]
    pub r: Option<Box<FolderR>>,
}

#[derive(Debug, Clone, Default)]
pub struct FolderR {
    pub parent: Related<Folder>,
    pub children: RelatedMany<Folder>,
    pub notes: RelatedMany<Note>,
    pub cover: Related<Cover>,
}

#[derive(Debug, Clone, Default, Entity)]
#[entity(table = "notes")]
pub struct Note {
    #[entity(primary_key, default)]
    pub id: i64,
    #[entity(foreign_key = "folders.id")]
    pub folder_id: Option<i64>,
    pub title: String,
    pub body: Option<String>,
    #[entity(default, created_at)]
    pub created_at: Timestamp,
    #[entity(updated_at)]
    pub updated_at: Timestamp,
    #[entity(skip)]
    pub r: Option<Box<NoteR>>,
}

#[derive(Debug, Clone, Default)]
pub struct NoteR {
    pub folder: Related<Folder>,
    pub labels: RelatedMany<Label>,
}

#[derive(Debug, Clone, Default, Entity)]
#[entity(table = "labels")]
pub struct Label {
    #[entity(primary_key, default)]
    pub id: i64,
    pub name: String,
    #[entity(skip)]
    pub r: Option<Box<LabelR>>,
}

#[derive(Debug, Clone, Default)]
pub struct LabelR {
    pub notes: RelatedMany<Note>,
}

#[derive(Debug, Clone, Default, Entity)]
#[entity(table = "covers")]
pub struct Cover {
    #[entity(primary_key, default)]
    pub id: i64,
    pub folder_id: i64,
    pub url: String,
    #[entity(skip)]
    pub r: Option<Box<CoverR>>,
}

#[derive(Debug, Clone, Default)]
pub struct CoverR {
    pub folder: Related<Folder>,
}

/// Composite-key entity with no defaults.
#[derive(Debug, Clone, Default, Entity)]
#[entity(table = "memberships")]
pub struct Membership {
    #[entity(primary_key)]
    pub folder_id: i64,
    #[entity(primary_key)]
    pub user_id: i64,
}

impl Folder {
    pub fn rels(&mut self) -> &mut FolderR {
        self.r.get_or_insert_with(Default::default)
    }
}

impl Note {
    pub fn rels(&mut self) -> &mut NoteR {
        self.r.get_or_insert_with(Default::default)
    }
}

impl Label {
    pub fn rels(&mut self) -> &mut LabelR {
        self.r.get_or_insert_with(Default::default)
    }
}

impl Cover {
    pub fn rels(&mut self) -> &mut CoverR {
        self.r.get_or_insert_with(Default::default)
    }
}

fn folder_parent(f: &mut Folder) -> &mut Related<Folder> {
    &mut f.rels().parent
}

fn folder_children(f: &mut Folder) -> &mut RelatedMany<Folder> {
    &mut f.rels().children
}

fn folder_notes(f: &mut Folder) -> &mut RelatedMany<Note> {
    &mut f.rels().notes
}

fn folder_cover(f: &mut Folder) -> &mut Related<Cover> {
    &mut f.rels().cover
}

fn note_folder(n: &mut Note) -> &mut Related<Folder> {
    &mut n.rels().folder
}

fn note_labels(n: &mut Note) -> &mut RelatedMany<Label> {
    &mut n.rels().labels
}

fn label_notes(l: &mut Label) -> &mut RelatedMany<Note> {
    &mut l.rels().notes
}

fn cover_folder(c: &mut Cover) -> &mut Related<Folder> {
    &mut c.rels().folder
}

pub const FOLDER_PARENT: BelongsTo<Folder, Folder> = BelongsTo {
    name: "Parent",
    foreign_key: "parent_id",
    references: "id",
    slot: folder_parent,
    inverse: Inverse::Many(folder_children),
};

pub const FOLDER_CHILDREN: HasMany<Folder, Folder> = HasMany {
    name: "Children",
    foreign_key: "parent_id",
    local_key: "id",
    slot: folder_children,
    inverse: Inverse::One(folder_parent),
};

pub const FOLDER_NOTES: HasMany<Folder, Note> = HasMany {
    name: "Notes",
    foreign_key: "folder_id",
    local_key: "id",
    slot: folder_notes,
    inverse: Inverse::One(note_folder),
};

pub const FOLDER_COVER: HasOne<Folder, Cover> = HasOne {
    name: "Cover",
    foreign_key: "folder_id",
    local_key: "id",
    slot: folder_cover,
    inverse: Inverse::One(cover_folder),
};

pub const NOTE_FOLDER: BelongsTo<Note, Folder> = BelongsTo {
    name: "Folder",
    foreign_key: "folder_id",
    references: "id",
    slot: note_folder,
    inverse: Inverse::Many(folder_notes),
};

pub const NOTE_LABELS: ManyToMany<Note, Label> = ManyToMany {
    name: "Labels",
    bridge: Bridge {
        table: "note_labels",
        owner_column: "note_id",
        related_column: "label_id",
    },
    local_key: "id",
    related_key: "id",
    slot: note_labels,
    inverse: Inverse::Many(label_notes),
};

pub fn folder(id: i64, name: &str, parent_id: Option<i64>) -> Folder {
    Folder {
        id,
        name: name.to_string(),
        parent_id,
        r: None,
    }
}

pub fn note(id: i64, folder_id: Option<i64>, title: &str) -> Note {
    Note {
        id,
        folder_id,
        title: title.to_string(),
        ..Note::default()
    }
}

pub fn label(id: i64, name: &str) -> Label {
    Label {
        id,
        name: name.to_string(),
        r: None,
    }
}

pub fn folder_row(id: i64, name: &str, parent_id: Option<i64>) -> Row {
    row(
        ["id", "name", "parent_id"],
        [Value::BigInt(id), Value::from(name), Value::from(parent_id)],
    )
}

pub fn note_row(id: i64, folder_id: Option<i64>, title: &str) -> Row {
    row(
        ["id", "folder_id", "title", "body", "created_at", "updated_at"],
        [
            Value::BigInt(id),
            Value::from(folder_id),
            Value::from(title),
            Value::Null,
            Value::TimestampTz(1),
            Value::TimestampTz(1),
        ],
    )
}

pub fn label_row(id: i64, name: &str, owner: i64) -> Row {
    row(
        ["id", "name", "__owner_key"],
        [Value::BigInt(id), Value::from(name), Value::BigInt(owner)],
    )
}

/// Install a test subscriber once so `tracing` output shows up under `--nocapture`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
