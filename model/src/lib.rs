//! Topic-map graph encoded as typed Rust data.
//!
//! The `ctm-model` crate provides the in-memory topic-map model consumed by
//! the CTM writer: topics with their locators, names, variants, occurrences,
//! and typed n-ary associations, plus the [`TopicMapSource`] capability a
//! serializer reads through.
//!
//! # Entry Point
//!
//! ```
//! use ctm_model::{iris, TopicMap, TopicMapSource};
//!
//! let mut tm = TopicMap::new();
//! let person = tm.create_topic_by_subject_identifier("http://example.org/Person");
//! let alice = tm.create_topic_by_subject_identifier("http://example.org/alice");
//! tm.add_type(alice, person);
//! tm.create_default_name(alice, "Alice", &[]);
//! assert_eq!(tm.instances_of(person), vec![alice]);
//! assert!(iris::is_reserved(iris::TOPIC_NAME));
//! ```

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

pub mod model;
pub mod source;

pub use model::{
    iris, Association, AssociationId, LocatorKind, Name, NameId, Occurrence, OccurrenceId,
    Reifiable, Role, RoleId, Topic, TopicId, TopicMap, Variant, VariantId,
};
pub use source::TopicMapSource;
