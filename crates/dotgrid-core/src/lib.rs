//! dotgrid-core: dot-lattice generation and annotation layer model (sans-IO).
//!
//! Fills lasso polygons with rotated, clipped dot lattices and keeps the
//! per-image history of committed annotation layers:
//! geometry kernel -> lattice generator -> layer history -> session.
//! Proportional allocation turns polygon areas into per-region dot counts
//! for reporting.
//!
//! This crate has **no I/O dependencies** -- uploads arrive as in-memory
//! byte slices and records leave as structured data. Compositing and
//! archive/document encoding live in `dotgrid-export`.

pub mod allocate;
pub mod cache;
pub mod config;
pub mod elements;
pub mod geometry;
pub mod history;
pub mod ingest;
pub mod interaction;
pub mod lattice;
pub mod numbering;
pub mod session;
pub mod types;

pub use allocate::{RegionShare, allocate};
pub use cache::DecodedCache;
pub use config::EditorDefaults;
pub use elements::{Element, ElementStore};
pub use history::{History, HistoryError, NumberingPatch};
pub use ingest::{
    IngestError, InputFile, PAGE_MARKER, PageRasterizer, PageSelection, RasterizedPage, ingest,
};
pub use interaction::{DragState, Interaction, Key};
pub use lattice::{Jitter, LatticeCache, LatticeParams, generate};
pub use numbering::{ResolvedLabel, label_origin, resolve_style};
pub use session::{EditorMode, Session, SessionError};
pub use types::{
    Bounds, Color, Dimensions, DotElement, GridDot, ImageRecord, LabelPosition, LabelStyle, Layer,
    LayerSettings, Point, Polygon, RgbaImage, TextElement,
};
