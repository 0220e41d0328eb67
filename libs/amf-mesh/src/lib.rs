//! # AMF Mesh
//!
//! Geometry engines over an [`amf_doc::Document`].
//!
//! ## Architecture
//!
//! ```text
//! StagedMesh ──commit──→ Document ──flatten──→ RenderItem (object + Pose)
//!                                     │
//!                    refine_document (subdivision)
//!                                     │
//!               envelope · Slicer · render_triangles
//! ```
//!
//! Every engine reads the Document through the same flattening: top-level
//! constellations are walked recursively and each placement of an object
//! becomes one render item. A Document without constellations renders each
//! object once, unposed.
//!
//! ## Usage
//!
//! ```rust
//! use amf_doc::{Document, Progress};
//! use amf_mesh::{envelope, ImportOptions, MeshFormat, NoTextures, Slicer, StagedMesh};
//! use glam::DVec3;
//!
//! let mut doc = Document::new();
//! let staged = StagedMesh::from_soup(
//!     MeshFormat::Stl,
//!     [[DVec3::ZERO, DVec3::X, DVec3::Y], [DVec3::ZERO, DVec3::Y, DVec3::Z]],
//! );
//! staged
//!     .commit(&mut doc, 0, 0, &ImportOptions::default(), &NoTextures, &Progress::new())
//!     .unwrap();
//!
//! let env = envelope(&doc, None).unwrap();
//! assert_eq!(env.max, DVec3::ONE);
//!
//! let bitmap = Slicer::new()
//!     .slice(&doc, 0.1, 0.1, 0.5, 0.0, &Progress::new())
//!     .unwrap();
//! assert_eq!((bitmap.width, bitmap.height), (10, 10));
//! ```

pub mod envelope;
pub mod export;
pub mod flatten;
pub mod import;
pub mod pose;
pub mod slice;
pub mod subdivide;
mod world;

pub use envelope::{envelope, render_count, Envelope};
pub use export::{render_triangles, render_triangles_with, RenderTriangle};
pub use flatten::{flatten, RenderItem};
pub use import::{ImportOptions, ImportReport, MeshFormat, NoTextures, StagedMesh, TextureResolver};
pub use pose::Pose;
pub use slice::{SliceBitmap, SliceSegment, Slicer};
pub use subdivide::{refine_document, subdivide_mesh};
pub use world::material_color;
