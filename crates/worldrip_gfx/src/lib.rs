//! Game world geometry decoding and reconstruction
//!
//! The pipeline goes like this:
//!  1. a [`source::MemorySource`] gives access to the game's memory,
//!  2. [`schema`] readers turn fixed-layout records of the selected title into neutral ones,
//!  3. [`mesh::MeshAssembler`] and [`entity::EntityAssembler`] build the mesh and the entity
//!     list,
//!  4. [`export`] serializes both into interchange files.
//!
//! [`world::extract_world`] runs steps 2 and 3 for a whole world.

use std::fmt;

pub mod decode;
pub mod entity;
pub mod export;
pub mod mesh;
pub mod rotation;
pub mod schema;
pub mod source;
pub mod world;

/// A surface or static model left out of the output because something it points at is missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    pub what: &'static str,
    pub index: usize,
    pub reason: String,
}

impl fmt::Display for Skipped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} #{}: {}", self.what, self.index, self.reason)
    }
}
