//! Parsing logic for the Entity derive macro.
//!
//! This module extracts struct-level and field-level `#[entity(...)]`
//! attributes from the derive input to build `EntityDef` and `FieldDef`
//! structures used for code generation.

use proc_macro2::Span;
use syn::{Attribute, Data, DeriveInput, Error, Field, Fields, Ident, Lit, Result, Type};

/// Parsed entity definition from a struct with `#[derive(Entity)]`.
#[derive(Debug)]
pub struct EntityDef {
    /// The struct name (e.g., `Tag`).
    pub name: Ident,
    /// The SQL table name (e.g., `"tags"`).
    pub table_name: String,
    /// Parsed field definitions, in declaration order.
    pub fields: Vec<FieldDef>,
}

/// Parsed field definition from a struct field.
#[derive(Debug)]
pub struct FieldDef {
    /// The Rust field name.
    pub name: Ident,
    /// The SQL column name (field name unless overridden).
    pub column_name: String,
    /// The Rust type of the field.
    pub ty: Type,
    /// Whether the column allows NULL.
    pub nullable: bool,
    /// Whether this field is (part of) the primary key.
    pub primary_key: bool,
    /// Whether the column has a database default.
    pub has_default: bool,
    /// Foreign key reference (e.g., `"tags.id"`).
    pub foreign_key: Option<String>,
    /// Stamped on insert when still zero.
    pub created_at: bool,
    /// Stamped on every insert and update.
    pub updated_at: bool,
    /// Not a column; left at `Default::default()` on load and detach.
    pub skip: bool,
}

impl EntityDef {
    /// Fields that map to columns.
    pub fn columns(&self) -> Vec<&FieldDef> {
        self.fields.iter().filter(|f| !f.skip).collect()
    }

    /// Primary-key fields in declaration order.
    pub fn primary_key_fields(&self) -> Vec<&FieldDef> {
        self.fields.iter().filter(|f| f.primary_key).collect()
    }
}

/// Parse a `DeriveInput` into an `EntityDef`.
pub fn parse_entity(input: &DeriveInput) -> Result<EntityDef> {
    let name = input.ident.clone();

    if !input.generics.params.is_empty() {
        return Err(Error::new_spanned(
            &input.generics,
            "Entity cannot be derived for generic structs",
        ));
    }

    let table_name = parse_struct_attrs(&input.attrs)?
        .unwrap_or_else(|| derive_table_name(&name.to_string()));

    let fields = match &input.data {
        Data::Struct(data) => parse_fields(&data.fields)?,
        Data::Enum(_) => {
            return Err(Error::new_spanned(
                input,
                "Entity can only be derived for structs, not enums",
            ));
        }
        Data::Union(_) => {
            return Err(Error::new_spanned(
                input,
                "Entity can only be derived for structs, not unions",
            ));
        }
    };

    if !fields.iter().any(|f| f.primary_key) {
        return Err(Error::new_spanned(
            &input.ident,
            "Entity requires at least one #[entity(primary_key)] field",
        ));
    }

    Ok(EntityDef {
        name,
        table_name,
        fields,
    })
}

/// Parse struct-level `#[entity(table = "...")]`.
fn parse_struct_attrs(attrs: &[Attribute]) -> Result<Option<String>> {
    let mut table_name: Option<String> = None;

    for attr in attrs {
        if !attr.path().is_ident("entity") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                let value: Lit = meta.value()?.parse()?;
                let Lit::Str(lit_str) = value else {
                    return Err(Error::new_spanned(
                        value,
                        "expected string literal for table name",
                    ));
                };
                if table_name.is_some() {
                    return Err(Error::new_spanned(
                        meta.path,
                        "duplicate entity attribute: table",
                    ));
                }
                table_name = Some(lit_str.value());
                Ok(())
            } else {
                Err(meta.error("unknown entity attribute; expected `table`"))
            }
        })?;
    }

    Ok(table_name)
}

/// Derive a table name: snake_case plus a plural suffix.
fn derive_table_name(struct_name: &str) -> String {
    pluralize(&to_snake_case(struct_name))
}

fn to_snake_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev_lower = i > 0 && chars[i - 1].is_lowercase();
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let prev_upper = i > 0 && chars[i - 1].is_uppercase();
            if i > 0 && (prev_lower || (prev_upper && next_lower)) {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

fn pluralize(word: &str) -> String {
    if word.ends_with('s') || word.ends_with('x') || word.ends_with("ch") || word.ends_with("sh")
    {
        format!("{word}es")
    } else if let Some(stem) = word.strip_suffix('y') {
        if stem.ends_with(['a', 'e', 'i', 'o', 'u']) {
            format!("{word}s")
        } else {
            format!("{stem}ies")
        }
    } else {
        format!("{word}s")
    }
}

fn parse_fields(fields: &Fields) -> Result<Vec<FieldDef>> {
    match fields {
        Fields::Named(named) => named.named.iter().map(parse_field).collect(),
        Fields::Unnamed(_) => Err(Error::new(
            Span::call_site(),
            "Entity requires a struct with named fields, not a tuple struct",
        )),
        Fields::Unit => Err(Error::new(
            Span::call_site(),
            "Entity requires a struct with fields, not a unit struct",
        )),
    }
}

/// Intermediate struct for collecting field attributes.
#[derive(Default)]
struct FieldAttrs {
    column: Option<String>,
    primary_key: bool,
    has_default: bool,
    foreign_key: Option<String>,
    created_at: bool,
    updated_at: bool,
    skip: bool,
}

fn parse_field(field: &Field) -> Result<FieldDef> {
    let name = field
        .ident
        .clone()
        .ok_or_else(|| Error::new_spanned(field, "expected named field"))?;
    let ty = field.ty.clone();
    let attrs = parse_field_attrs(&field.attrs)?;

    if attrs.skip && (attrs.primary_key || attrs.has_default || attrs.column.is_some()) {
        return Err(Error::new_spanned(
            &name,
            "a skipped field cannot carry column attributes",
        ));
    }
    if attrs.created_at && attrs.updated_at {
        return Err(Error::new_spanned(
            &name,
            "a field cannot be both created_at and updated_at",
        ));
    }

    let column_name = attrs.column.unwrap_or_else(|| name.to_string());

    Ok(FieldDef {
        nullable: is_option_type(&ty),
        name,
        column_name,
        ty,
        primary_key: attrs.primary_key,
        has_default: attrs.has_default,
        foreign_key: attrs.foreign_key,
        created_at: attrs.created_at,
        updated_at: attrs.updated_at,
        skip: attrs.skip,
    })
}

/// Parse all `#[entity(...)]` attributes on a field.
fn parse_field_attrs(attrs: &[Attribute]) -> Result<FieldAttrs> {
    let mut result = FieldAttrs::default();

    for attr in attrs {
        if !attr.path().is_ident("entity") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            let path = &meta.path;

            if path.is_ident("primary_key") {
                result.primary_key = true;
            } else if path.is_ident("default") {
                result.has_default = true;
            } else if path.is_ident("created_at") {
                result.created_at = true;
            } else if path.is_ident("updated_at") {
                result.updated_at = true;
            } else if path.is_ident("skip") {
                result.skip = true;
            } else if path.is_ident("column") {
                result.column = Some(parse_str_value(&meta, "column name")?);
            } else if path.is_ident("foreign_key") {
                let reference = parse_str_value(&meta, "foreign key")?;
                if !reference.contains('.') {
                    return Err(meta.error("foreign_key must be written as \"table.column\""));
                }
                result.foreign_key = Some(reference);
            } else {
                return Err(meta.error(
                    "unknown entity attribute; expected one of primary_key, default, \
                     created_at, updated_at, skip, column, foreign_key",
                ));
            }
            Ok(())
        })?;
    }

    Ok(result)
}

fn parse_str_value(meta: &syn::meta::ParseNestedMeta<'_>, what: &str) -> Result<String> {
    let value: Lit = meta.value()?.parse()?;
    match value {
        Lit::Str(lit_str) => Ok(lit_str.value()),
        other => Err(Error::new_spanned(
            other,
            format!("expected string literal for {what}"),
        )),
    }
}

/// Check if a type is `Option<T>`.
pub fn is_option_type(ty: &Type) -> bool {
    if let Type::Path(type_path) = ty {
        if let Some(segment) = type_path.path.segments.last() {
            return segment.ident == "Option";
        }
    }
    false
}
