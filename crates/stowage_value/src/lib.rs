//! # Stowage Value
//!
//! Dynamic value model shared by every Stowage crate.
//!
//! Record types enter the system through serde: [`to_value`] turns any
//! `Serialize` type into a [`Value`] tree, [`from_value`] turns it back.
//! On top of that tree this crate provides:
//!
//! - the [object walker](walk()), a configurable depth-first traversal
//!   reporting each node with its path, depth and field metadata;
//! - the [flat projection](FlatMap), mapping dotted leaf paths such as
//!   `address.city` or `tags.0` to scalar and timestamp leaves;
//! - typed [paths](FieldPath) and [timestamp](timestamp) serde helpers.
//!
//! ## Usage
//!
//! ```
//! use serde::Serialize;
//! use stowage_value::{FlatMap, Value};
//!
//! #[derive(Serialize)]
//! struct Book {
//!     title: String,
//!     tags: Vec<String>,
//! }
//!
//! let book = Book {
//!     title: "Dune".to_string(),
//!     tags: vec!["scifi".to_string()],
//! };
//! let flat = FlatMap::from_item(&book).unwrap();
//! assert_eq!(flat.get("title"), Some(&Value::from("Dune")));
//! assert_eq!(flat.get("tags.0"), Some(&Value::from("scifi")));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod de;
mod error;
mod flat;
mod path;
mod ser;
pub mod timestamp;
mod value;
mod walk;

pub use de::from_value;
pub use error::{ValueError, ValueResult};
pub use flat::FlatMap;
pub use path::{FieldPath, PathSegment};
pub use ser::{to_value, ValueSerializer};
pub use value::{Field, Record, Value};
pub use walk::{walk, FieldNaming, MaxDepth, WalkConfig, WalkerState};
