//! # strata-core: layout model for the Strata page editor
//!
//! Pure, synchronous building blocks:
//!
//! - [`catalog`]: closed set of component kinds and their display names
//! - [`layout`]: `PlacedComponent` and the id-unique `Layout`
//! - [`reorder`]: insert / move / drop operations producing a new layout
//! - [`history`]: undo/redo container over full layout snapshots
//! - [`envelope`]: persisted envelope, legacy normalization, canonical
//!   serialization and schema validation
//!
//! ```text
//! drag / click ──► reorder ──► History::set_layout ──► envelope ──► field store
//!                                   ▲                                   │
//!                                   └──────── normalize ◄── push ───────┘
//! ```

pub mod catalog;
pub mod envelope;
pub mod history;
pub mod layout;
pub mod reorder;

pub use catalog::ComponentType;
pub use envelope::{
    canonical_components, canonical_json, normalize, validate_value, EnvelopeError,
    NormalizedPayload, PayloadFormat, SaveEnvelope, SchemaViolation, SCHEMA_VERSION,
};
pub use history::History;
pub use layout::{Layout, LayoutError, PlacedComponent};
pub use reorder::{DropEvent, DropSource};
