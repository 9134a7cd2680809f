//! Labelmap round-trip validation
//!
//! Takes a multi-channel image volume, derives a single-channel label volume
//! from it, paints labels into it, writes it as a raster file, reloads it from
//! disk and checks that it comes back as a label volume.
//!
//! # Features
//!
//! - Vector-to-scalar magnitude reduction
//! - Scalar type normalization through an awaitable external cast
//! - Deterministic circular brush painting with per-stroke timing
//! - PNG persistence with an optional JSON geometry header
//! - A strict state machine reporting pass/fail with the failing stage
//!
//! The host's document collection, file store and cast operation are
//! collaborators behind the [`Scene`], [`LabelStore`] and [`ScalarCaster`]
//! traits; in-memory and file system implementations are provided.
//!
//! # Example
//!
//! ```rust,ignore
//! use labelmap_roundtrip::{
//!     ClampingCaster, FileSystemStore, MemoryScene, PipelineConfig, PipelineOrchestrator,
//! };
//!
//! # async fn example(input: labelmap_roundtrip::VolumeImage) {
//! let scene = MemoryScene::new();
//! let store = FileSystemStore::new();
//! let orchestrator =
//!     PipelineOrchestrator::new(PipelineConfig::default(), &scene, &store, &ClampingCaster);
//!
//! let report = orchestrator.run(&input).await;
//! println!("{}", report.summary());
//! # }
//! ```

pub mod cast;
pub mod config;
pub mod error;
pub mod geometry;
pub mod magnitude;
pub mod paint;
pub mod persist;
pub mod pipeline;
pub mod scene;
pub mod storage;
pub mod types;
pub mod utils;
pub mod volume;

// Re-exports
pub use cast::{normalize_label, ClampingCaster, ScalarCaster};
pub use config::PipelineConfig;
pub use error::{ErrorKind, Result, RoundTripError};
pub use geometry::OrientationMatrix;
pub use magnitude::reduce_magnitude;
pub use paint::{diagonal_strokes, BrushStroke, RasterPainter, StrokeTiming};
pub use persist::{RoundTripPersistor, SavedLabel};
pub use pipeline::{Failure, PipelineOrchestrator, PipelineReport, PipelineState};
pub use scene::{MemoryScene, Scene, SceneNode};
pub use storage::{FileFormat, FileSystemStore, LabelStore, StorageDescriptor};
pub use types::{Dimensions, ScalarType, VolumeClass};
pub use volume::VolumeImage;

/// Version of this crate, recorded in geometry headers
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
