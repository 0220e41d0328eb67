//! # AMF Document
//!
//! In-memory model of an Additive Manufacturing File: objects made of
//! meshes and volumes, materials with composite blends, and constellations
//! of positioned instances.
//!
//! ## Architecture
//!
//! ```text
//! amf-mesh (import) → amf-doc (Document) → amf-mesh (envelope, slice, render)
//! ```
//!
//! The Document owns every entity. Entities refer to each other by index;
//! see [`Document`] for the renumbering contract. The model derives serde
//! traits and is the hand-off point to the external AMF codec.
//!
//! ## Usage
//!
//! ```rust
//! use amf_doc::{Document, Equation};
//!
//! let mut doc = Document::new();
//! let steel = doc.add_material("steel");
//! let foam = doc.add_material("foam");
//! doc.add_composite(steel, foam, Equation::new("0.3")).unwrap();
//! assert!(doc.add_composite(foam, steel, Equation::new("0.3")).is_err());
//! ```

pub mod color;
pub mod document;
pub mod equation;
pub mod error;
pub mod geometry;
pub mod guard;
pub mod material;
pub mod progress;
pub mod scene;
pub mod texture;
pub mod units;

pub use color::Color;
pub use document::Document;
pub use equation::{Equation, SpatialEquation};
pub use error::{AmfError, AmfResult, EntityKind};
pub use geometry::{Mesh, Object, TexMap, Triangle, Vertex, Volume};
pub use material::{Composite, Material};
pub use progress::{Progress, ProgressSnapshot};
pub use scene::{Constellation, Instance, InstanceParam, InstanceTarget};
pub use texture::Texture;
pub use units::{convert_units, UnitSystem};
