//! Tables of the metadata database.

pub mod content_units;
pub mod tag_i18n;
pub mod tags;

pub use content_units::{ContentUnit, ContentUnitR};
pub use tag_i18n::{TagI18n, TagI18nR};
pub use tags::{Tag, TagR};
