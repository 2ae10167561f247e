//! Write path: typing of client documents and the batched put, delete and
//! drop operations against a search backend index.

pub mod batch;
pub mod delete;
pub mod document;

pub use batch::BatchIndexer;
pub use delete::{delete_by_ids, drop_index};
pub use document::{DocumentInput, FieldInput};
