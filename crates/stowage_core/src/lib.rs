//! # Stowage Core
//!
//! Generic, backend-agnostic record access.
//!
//! Record types implement [`Item`] and are registered once on a
//! [`RegistryBuilder`]. The sealed [`TypeRegistry`] drives a [`Crud`]
//! dispatcher that creates, updates, deletes and queries any registered
//! type by name against one [`DataStorage`]:
//!
//! - [`DocumentStorage`] for document engines (records stored as-is,
//!   filters compiled to selectors and aggregation pipelines);
//! - [`SqlStorage`] for relational engines (records flattened to one
//!   column per leaf path, filters compiled to parameterized `WHERE`
//!   fragments).
//!
//! ## Operations
//!
//! | Operation | Result |
//! |---|---|
//! | [`Crud::create`] | stored record |
//! | [`Crud::update`] | stored record |
//! | [`Crud::delete`] | `()` |
//! | [`Crud::retrieve_one`] | `Option<Value>` |
//! | [`Crud::count`] | `u64` |
//! | [`Crud::retrieve`] | `Vec<Value>` |
//! | [`Crud::retrieve_with_count`] | [`stowage_filter::CountList`] |
//! | [`Crud::filter_values`] | [`stowage_filter::FilterValues`] |
//! | [`Crud::filter_values_x`] | [`stowage_filter::FacetCounts`] |
//!
//! Backend failures are logged with the call site through `tracing` and
//! returned unchanged; nothing is retried.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod crud;
mod error;
mod item;
mod registry;
mod storage;

pub use config::CrudConfig;
pub use crud::{parse_query, Crud};
pub use error::{CoreError, CoreResult};
pub use item::{bind, decode, merge_json, Item};
pub use registry::{ItemHandler, RegistryBuilder, TypeRegistry, TypedHandler};
pub use storage::{DataStorage, DocumentStorage, SqlStorage};
