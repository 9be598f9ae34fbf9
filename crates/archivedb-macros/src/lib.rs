//! Procedural macros for archivedb.
//!
//! `#[derive(Entity)]` turns a row struct into an `Entity` with static column
//! metadata and a fn-pointer accessor table, and gives it a process-wide
//! statement cache through `Persist`.
//!
//! # Attributes
//!
//! - `#[entity(table = "name")]` - table name (defaults to the pluralized snake_case struct name)
//! - `#[entity(primary_key)]` - field is (part of) the primary key
//! - `#[entity(default)]` - column has a database default
//! - `#[entity(column = "name")]` - override the column name
//! - `#[entity(foreign_key = "table.column")]` - record a foreign key reference
//! - `#[entity(created_at)]` / `#[entity(updated_at)]` - automatic timestamps
//! - `#[entity(skip)]` - not a column (the relation side-structure)
//!
//! # Example
//!
//! ```ignore
//! use archivedb::Entity;
//!
//! #[derive(Debug, Clone, Entity)]
//! #[entity(table = "tags")]
//! pub struct Tag {
//!     #[entity(primary_key, default)]
//!     pub id: i64,
//!     pub uid: String,
//!     #[entity(foreign_key = "tags.id")]
//!     pub parent_id: Option<i64>,
//!     #[entity(skip)]
//!     pub r: Option<Box<TagR>>,
//! }
//! ```

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};

mod parse;

use parse::{EntityDef, parse_entity};

#[proc_macro_derive(Entity, attributes(entity))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as syn::DeriveInput);

    let entity = match parse_entity(&input) {
        Ok(e) => e,
        Err(e) => return e.to_compile_error().into(),
    };

    generate_entity_impl(&entity).into()
}

fn generate_entity_impl(entity: &EntityDef) -> TokenStream2 {
    let name = &entity.name;
    let table = &entity.table_name;
    let columns = entity.columns();
    let column_count = columns.len();

    let column_defs = columns.iter().map(|f| {
        let col = &f.column_name;
        let nullable = f.nullable;
        let primary_key = f.primary_key;
        let has_default = f.has_default;
        let fk = f
            .foreign_key
            .as_ref()
            .map(|r| quote! { .foreign_key(#r) });
        quote! {
            ::archivedb_core::ColumnDef::new(#col)
                .nullable(#nullable)
                .primary_key(#primary_key)
                .has_default(#has_default)
                #fk
        }
    });

    let pk_columns = entity
        .primary_key_fields()
        .into_iter()
        .map(|f| f.column_name.clone())
        .collect::<Vec<_>>();

    // One get/set/is_zero triple of plain fns per column; the accessor table
    // stores them as fn pointers.
    let mut accessor_fns = Vec::with_capacity(column_count);
    let mut accessor_entries = Vec::with_capacity(column_count);
    for f in &columns {
        let field = &f.name;
        let ty = &f.ty;
        let col = &f.column_name;
        let get = format_ident!("__get_{}", field);
        let set = format_ident!("__set_{}", field);
        let zero = format_ident!("__zero_{}", field);
        accessor_fns.push(quote! {
            fn #get(e: &#name) -> ::archivedb_core::Value {
                ::archivedb_core::Value::from(::std::clone::Clone::clone(&e.#field))
            }
            fn #set(e: &mut #name, v: &::archivedb_core::Value) -> ::archivedb_core::Result<()> {
                e.#field = <#ty as ::archivedb_core::FromValue>::from_value(v)?;
                Ok(())
            }
            fn #zero(e: &#name) -> bool {
                ::archivedb_core::IsZero::is_zero(&e.#field)
            }
        });
        accessor_entries.push(quote! {
            ::archivedb_core::Accessor { column: #col, get: #get, set: #set, is_zero: #zero }
        });
    }

    let from_row_fields = entity.fields.iter().map(|f| {
        let field = &f.name;
        let col = &f.column_name;
        if f.skip {
            quote! { #field: ::std::default::Default::default() }
        } else {
            quote! { #field: row.get_named(#col)? }
        }
    });

    let detached_fields = entity.fields.iter().map(|f| {
        let field = &f.name;
        if f.skip {
            quote! { #field: ::std::default::Default::default() }
        } else {
            quote! { #field: ::std::clone::Clone::clone(&self.#field) }
        }
    });

    let insert_stamps = entity
        .fields
        .iter()
        .filter(|f| f.created_at || f.updated_at)
        .map(|f| {
            let field = &f.name;
            quote! { ::archivedb_core::Stamp::stamp_if_zero(&mut self.#field, now); }
        })
        .collect::<Vec<_>>();
    let update_stamps = entity
        .fields
        .iter()
        .filter(|f| f.updated_at)
        .map(|f| {
            let field = &f.name;
            quote! { ::archivedb_core::Stamp::stamp(&mut self.#field, now); }
        })
        .collect::<Vec<_>>();

    let before_insert = if insert_stamps.is_empty() {
        quote! {}
    } else {
        quote! {
            fn before_insert(&mut self, now: ::archivedb_core::Timestamp) {
                #(#insert_stamps)*
            }
        }
    };
    let before_update = if update_stamps.is_empty() {
        quote! {}
    } else {
        quote! {
            fn before_update(&mut self, now: ::archivedb_core::Timestamp) {
                #(#update_stamps)*
            }
        }
    };

    quote! {
        impl ::archivedb_core::Entity for #name {
            const TABLE_NAME: &'static str = #table;

            fn descriptor() -> &'static ::archivedb_core::EntityDescriptor {
                static COLUMNS: [::archivedb_core::ColumnDef; #column_count] = [
                    #(#column_defs),*
                ];
                static DESCRIPTOR: ::archivedb_core::EntityDescriptor =
                    ::archivedb_core::EntityDescriptor {
                        table: #table,
                        columns: &COLUMNS,
                        primary_key: &[#(#pk_columns),*],
                    };
                &DESCRIPTOR
            }

            #[allow(non_snake_case)]
            fn accessors() -> &'static [::archivedb_core::Accessor<Self>] {
                #(#accessor_fns)*
                static ACCESSORS: [::archivedb_core::Accessor<#name>; #column_count] = [
                    #(#accessor_entries),*
                ];
                &ACCESSORS
            }

            fn from_row(row: &::archivedb_core::Row) -> ::archivedb_core::Result<Self> {
                Ok(Self {
                    #(#from_row_fields),*
                })
            }

            fn detached(&self) -> Self {
                Self {
                    #(#detached_fields),*
                }
            }

            #before_insert
            #before_update
        }

        impl ::archivedb_query::Persist for #name {
            fn statement_cache() -> &'static ::archivedb_query::StatementCache {
                static CACHE: ::std::sync::OnceLock<::archivedb_query::StatementCache> =
                    ::std::sync::OnceLock::new();
                CACHE.get_or_init(::archivedb_query::StatementCache::new)
            }
        }
    }
}
