//! Statement compilation for insert, update and upsert.
//!
//! The `compile_*` functions are pure: they take an entity descriptor plus
//! already-canonicalised column lists and produce a [`Plan`]. The `*_plan`
//! functions validate raw caller input, derive the [`Signature`] and go
//! through the entity's [`StatementCache`].

use crate::cache::{Plan, StatementCache};
use crate::signature::{PlanKind, Signature};
use archivedb_core::{Dialect, EntityDescriptor, Error, Operation, Result};
use std::sync::Arc;

/// Effective insert columns and the defaulted columns read back afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertColumns {
    /// Columns sent in the INSERT, in source order.
    pub columns: Vec<&'static str>,
    /// Defaulted columns the database fills in, in source order.
    pub returning: Vec<&'static str>,
}

/// Upsert inputs after canonicalisation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpsertShape {
    pub update_on_conflict: bool,
    pub conflict: Vec<&'static str>,
    pub update: Vec<&'static str>,
    pub whitelist: Vec<&'static str>,
    pub non_zero_defaults: Vec<&'static str>,
}

/// Decide which columns an INSERT carries.
///
/// A column is sent when it has no database default, when it is whitelisted,
/// or when it has a default but its field holds a non-zero value. Every other
/// defaulted column is returned by the database instead.
pub fn insert_columns(
    descriptor: &EntityDescriptor,
    whitelist: &[&str],
    non_zero_defaults: &[&str],
) -> InsertColumns {
    let mut columns = Vec::with_capacity(descriptor.columns.len());
    let mut returning = Vec::new();
    for col in descriptor.columns {
        let sent = !col.has_default
            || whitelist.contains(&col.name)
            || non_zero_defaults.contains(&col.name);
        if sent {
            columns.push(col.name);
        } else {
            returning.push(col.name);
        }
    }
    InsertColumns { columns, returning }
}

/// Non-key columns, restricted to `whitelist` when it is non-empty.
pub fn update_columns(descriptor: &EntityDescriptor, whitelist: &[&str]) -> Vec<&'static str> {
    descriptor
        .non_key_columns()
        .into_iter()
        .filter(|c| whitelist.is_empty() || whitelist.contains(c))
        .collect()
}

fn returning_clause(dialect: Dialect, returning: &[&str]) -> String {
    if returning.is_empty() {
        String::new()
    } else {
        format!(" RETURNING {}", dialect.quote_list(returning))
    }
}

fn insert_head(dialect: Dialect, table: &str, columns: &[&str]) -> String {
    let table = dialect.quote_identifier(table);
    if columns.is_empty() {
        format!("INSERT INTO {table} DEFAULT VALUES")
    } else {
        format!(
            "INSERT INTO {table} ({}) VALUES ({})",
            dialect.quote_list(columns),
            dialect.placeholders(columns.len(), 1)
        )
    }
}

/// `INSERT INTO "t" ("a","b") VALUES ($1,$2) [RETURNING "id"]`.
pub fn compile_insert(
    descriptor: &EntityDescriptor,
    dialect: Dialect,
    whitelist: &[&str],
    non_zero_defaults: &[&str],
) -> Result<Plan> {
    let InsertColumns { columns, returning } =
        insert_columns(descriptor, whitelist, non_zero_defaults);

    let mut sql = insert_head(dialect, descriptor.table, &columns);
    sql.push_str(&returning_clause(dialect, &returning));

    Ok(Plan {
        sql,
        values: descriptor.bind(&columns)?,
        returning: descriptor.bind(&returning)?,
    })
}

/// `UPDATE "t" SET "a"=$1,"b"=$2 WHERE "id"=$3`.
pub fn compile_update(
    descriptor: &EntityDescriptor,
    dialect: Dialect,
    whitelist: &[&str],
) -> Result<Plan> {
    let set = update_columns(descriptor, whitelist);
    if set.is_empty() {
        return Err(Error::empty_update(descriptor.table, Operation::Update));
    }

    let assignments = set
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{}={}", dialect.quote_identifier(c), dialect.placeholder(i + 1)))
        .collect::<Vec<_>>()
        .join(",");
    let sql = format!(
        "UPDATE {} SET {} WHERE {}",
        dialect.quote_identifier(descriptor.table),
        assignments,
        dialect.where_equals(descriptor.primary_key, set.len() + 1)
    );

    let mut values = descriptor.bind(&set)?;
    values.extend(descriptor.bind(descriptor.primary_key)?);

    Ok(Plan {
        sql,
        values,
        returning: Vec::new(),
    })
}

/// `INSERT ... ON CONFLICT ("id") DO NOTHING | DO UPDATE SET "a" = EXCLUDED."a" [RETURNING ...]`.
///
/// The conflict target defaults to the primary key. The update column set
/// must be non-empty even when `update_on_conflict` is false.
pub fn compile_upsert(
    descriptor: &EntityDescriptor,
    dialect: Dialect,
    shape: &UpsertShape,
) -> Result<Plan> {
    let InsertColumns { columns, returning } =
        insert_columns(descriptor, &shape.whitelist, &shape.non_zero_defaults);

    let update = update_columns(descriptor, &shape.update);
    if update.is_empty() {
        return Err(Error::empty_update(descriptor.table, Operation::Upsert));
    }

    let conflict: &[&str] = if shape.conflict.is_empty() {
        descriptor.primary_key
    } else {
        &shape.conflict
    };

    let mut sql = insert_head(dialect, descriptor.table, &columns);
    sql.push_str(" ON CONFLICT (");
    sql.push_str(&dialect.quote_list(conflict));
    sql.push(')');
    if shape.update_on_conflict {
        let sets = update
            .iter()
            .map(|c| {
                let q = dialect.quote_identifier(c);
                format!("{q} = EXCLUDED.{q}")
            })
            .collect::<Vec<_>>()
            .join(",");
        sql.push_str(" DO UPDATE SET ");
        sql.push_str(&sets);
    } else {
        sql.push_str(" DO NOTHING");
    }
    sql.push_str(&returning_clause(dialect, &returning));

    Ok(Plan {
        sql,
        values: descriptor.bind(&columns)?,
        returning: descriptor.bind(&returning)?,
    })
}

/// Cached insert plan for raw caller input.
pub fn insert_plan<S: AsRef<str>>(
    cache: &StatementCache,
    descriptor: &EntityDescriptor,
    dialect: Dialect,
    whitelist: &[S],
    non_zero_defaults: &[&'static str],
) -> Result<Arc<Plan>> {
    let whitelist = descriptor.canonicalize(whitelist)?;
    let signature = Signature::builder(dialect, PlanKind::Insert)
        .group('w', &whitelist)
        .group('d', non_zero_defaults)
        .finish();
    cache.get_or_compile(PlanKind::Insert, signature, || {
        compile_insert(descriptor, dialect, &whitelist, non_zero_defaults)
    })
}

/// Cached update plan for raw caller input.
pub fn update_plan<S: AsRef<str>>(
    cache: &StatementCache,
    descriptor: &EntityDescriptor,
    dialect: Dialect,
    whitelist: &[S],
) -> Result<Arc<Plan>> {
    let whitelist = descriptor.canonicalize(whitelist)?;
    let signature = Signature::builder(dialect, PlanKind::Update)
        .group('w', &whitelist)
        .finish();
    cache.get_or_compile(PlanKind::Update, signature, || {
        compile_update(descriptor, dialect, &whitelist)
    })
}

/// Cached upsert plan; `shape` must already be canonical.
pub fn upsert_plan(
    cache: &StatementCache,
    descriptor: &EntityDescriptor,
    dialect: Dialect,
    shape: &UpsertShape,
) -> Result<Arc<Plan>> {
    let signature = Signature::builder(dialect, PlanKind::Upsert)
        .flag('u', shape.update_on_conflict)
        .group('c', &shape.conflict)
        .group('s', &shape.update)
        .group('w', &shape.whitelist)
        .group('d', &shape.non_zero_defaults)
        .finish();
    cache.get_or_compile(PlanKind::Upsert, signature, || {
        compile_upsert(descriptor, dialect, shape)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use archivedb_core::ColumnDef;
    use pretty_assertions::assert_eq;

    static COMMENT_COLUMNS: [ColumnDef; 7] = [
        ColumnDef::new("id").primary_key(true).has_default(true),
        ColumnDef::new("name").nullable(true),
        ColumnDef::new("email").nullable(true),
        ColumnDef::new("subject").nullable(true),
        ColumnDef::new("comment").nullable(true),
        ColumnDef::new("created_at"),
        ColumnDef::new("updated_at"),
    ];

    static COMMENTS: EntityDescriptor = EntityDescriptor {
        table: "comments",
        columns: &COMMENT_COLUMNS,
        primary_key: &["id"],
    };

    static I18N_COLUMNS: [ColumnDef; 4] = [
        ColumnDef::new("tag_id").primary_key(true),
        ColumnDef::new("language").primary_key(true),
        ColumnDef::new("label").nullable(true).has_default(true),
        ColumnDef::new("created_at").has_default(true),
    ];

    static TAG_I18N: EntityDescriptor = EntityDescriptor {
        table: "tag_i18n",
        columns: &I18N_COLUMNS,
        primary_key: &["tag_id", "language"],
    };

    static KEYS_ONLY_COLUMNS: [ColumnDef; 2] = [
        ColumnDef::new("role_id").primary_key(true),
        ColumnDef::new("user_id").primary_key(true),
    ];

    static ROLES_USERS: EntityDescriptor = EntityDescriptor {
        table: "roles_users",
        columns: &KEYS_ONLY_COLUMNS,
        primary_key: &["role_id", "user_id"],
    };

    #[test]
    fn comments_insert_splits_columns_and_returning() {
        let cols = insert_columns(&COMMENTS, &[], &[]);
        assert_eq!(
            cols.columns,
            vec!["name", "email", "subject", "comment", "created_at", "updated_at"]
        );
        assert_eq!(cols.returning, vec!["id"]);

        let plan = compile_insert(&COMMENTS, Dialect::Postgres, &[], &[]).unwrap();
        assert_eq!(
            plan.sql,
            "INSERT INTO \"comments\" (\"name\",\"email\",\"subject\",\"comment\",\"created_at\",\"updated_at\") \
             VALUES ($1,$2,$3,$4,$5,$6) RETURNING \"id\""
        );
        assert_eq!(plan.values, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(plan.returning, vec![0]);
    }

    #[test]
    fn non_zero_default_is_sent() {
        let plan = compile_insert(&COMMENTS, Dialect::Postgres, &[], &["id"]).unwrap();
        assert!(plan.sql.starts_with("INSERT INTO \"comments\" (\"id\",\"name\""));
        assert!(!plan.sql.contains("RETURNING"));
        assert_eq!(plan.values.len(), 7);
    }

    #[test]
    fn whitelisted_default_is_sent() {
        let plan = compile_insert(&TAG_I18N, Dialect::Postgres, &["label"], &[]).unwrap();
        assert_eq!(
            plan.sql,
            "INSERT INTO \"tag_i18n\" (\"tag_id\",\"language\",\"label\") VALUES ($1,$2,$3) \
             RETURNING \"created_at\""
        );
    }

    #[test]
    fn insert_with_only_defaults_uses_default_values() {
        static ONLY: [ColumnDef; 1] = [ColumnDef::new("id").primary_key(true).has_default(true)];
        static SERIALS: EntityDescriptor = EntityDescriptor {
            table: "serials",
            columns: &ONLY,
            primary_key: &["id"],
        };
        let plan = compile_insert(&SERIALS, Dialect::Postgres, &[], &[]).unwrap();
        assert_eq!(plan.sql, "INSERT INTO \"serials\" DEFAULT VALUES RETURNING \"id\"");
        assert!(plan.values.is_empty());
    }

    #[test]
    fn update_excludes_primary_key() {
        let plan = compile_update(&COMMENTS, Dialect::Postgres, &[]).unwrap();
        assert_eq!(
            plan.sql,
            "UPDATE \"comments\" SET \"name\"=$1,\"email\"=$2,\"subject\"=$3,\"comment\"=$4,\
             \"created_at\"=$5,\"updated_at\"=$6 WHERE \"id\"=$7"
        );
        assert_eq!(plan.values, vec![1, 2, 3, 4, 5, 6, 0]);

        let filtered = update_columns(&COMMENTS, &["id", "email"]);
        assert_eq!(filtered, vec!["email"]);
    }

    #[test]
    fn update_composite_key() {
        let plan = compile_update(&TAG_I18N, Dialect::Postgres, &["label"]).unwrap();
        assert_eq!(
            plan.sql,
            "UPDATE \"tag_i18n\" SET \"label\"=$1 WHERE \"tag_id\"=$2 AND \"language\"=$3"
        );
        assert_eq!(plan.values, vec![2, 0, 1]);
    }

    #[test]
    fn update_with_nothing_to_set_fails() {
        let err = compile_update(&COMMENTS, Dialect::Postgres, &["id"]).unwrap_err();
        assert!(err.is_empty_update());
        let err = compile_update(&ROLES_USERS, Dialect::Postgres, &[]).unwrap_err();
        assert!(err.is_empty_update());
    }

    #[test]
    fn upsert_defaults_conflict_to_primary_key() {
        let shape = UpsertShape {
            update_on_conflict: true,
            update: vec!["subject", "comment"],
            ..UpsertShape::default()
        };
        let plan = compile_upsert(&COMMENTS, Dialect::Postgres, &shape).unwrap();
        assert_eq!(
            plan.sql,
            "INSERT INTO \"comments\" (\"name\",\"email\",\"subject\",\"comment\",\"created_at\",\"updated_at\") \
             VALUES ($1,$2,$3,$4,$5,$6) ON CONFLICT (\"id\") DO UPDATE SET \
             \"subject\" = EXCLUDED.\"subject\",\"comment\" = EXCLUDED.\"comment\" RETURNING \"id\""
        );
    }

    #[test]
    fn upsert_do_nothing_with_explicit_conflict() {
        let shape = UpsertShape {
            update_on_conflict: false,
            conflict: vec!["language"],
            whitelist: vec!["label", "created_at"],
            ..UpsertShape::default()
        };
        let plan = compile_upsert(&TAG_I18N, Dialect::Postgres, &shape).unwrap();
        assert_eq!(
            plan.sql,
            "INSERT INTO \"tag_i18n\" (\"tag_id\",\"language\",\"label\",\"created_at\") \
             VALUES ($1,$2,$3,$4) ON CONFLICT (\"language\") DO NOTHING"
        );
        assert!(plan.returning.is_empty());
    }

    #[test]
    fn upsert_without_update_columns_fails() {
        let shape = UpsertShape::default();
        let err = compile_upsert(&ROLES_USERS, Dialect::Postgres, &shape).unwrap_err();
        assert!(matches!(err, Error::EmptyUpdate(ref e) if e.operation == Operation::Upsert));

        let shape = UpsertShape {
            update_on_conflict: true,
            ..UpsertShape::default()
        };
        let err = compile_upsert(&ROLES_USERS, Dialect::Postgres, &shape).unwrap_err();
        assert!(err.is_empty_update());
    }

    #[test]
    fn cached_plans_are_shared_and_canonical() {
        let cache = StatementCache::new();
        let a = insert_plan(&cache, &COMMENTS, Dialect::Postgres, &["email", "name"], &[]).unwrap();
        let b = insert_plan(&cache, &COMMENTS, Dialect::Postgres, &["name", "email", "name"], &[])
            .unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);

        let err = update_plan(&cache, &COMMENTS, Dialect::Postgres, &["nope"]).unwrap_err();
        assert!(matches!(err, Error::Binding(_)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn dialect_changes_placeholders() {
        let plan = compile_update(&TAG_I18N, Dialect::Sqlite, &["label"]).unwrap();
        assert_eq!(
            plan.sql,
            "UPDATE \"tag_i18n\" SET \"label\"=?1 WHERE \"tag_id\"=?2 AND \"language\"=?3"
        );
    }
}
