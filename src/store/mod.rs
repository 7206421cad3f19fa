//! Library stores consumed by the explorer (read-only from its perspective).
//!
//! Architecture follows the project pattern (trait + impl):
//! - [`LinkStore`]: persisted relations (outgoing links and backlinks)
//! - [`ResourceStore`]: resource lookup, mention search, tag membership,
//!   nearest-neighbour similarity search
//! - [`InMemoryLibrary`]: implementation of both over in-memory maps,
//!   loadable from a JSON [`LibrarySnapshot`]

pub mod memory;
pub mod models;
pub mod traits;

pub use memory::InMemoryLibrary;
pub use models::{
    normalize_tag, Backlink, LibrarySnapshot, MentionHit, MentionMatch, OutgoingLink, Resource,
    SimilarResource, StoredLink,
};
pub use traits::{LinkStore, ResourceStore};
