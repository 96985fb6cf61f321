//! # DICOM-labeler library
//!
//! This crate assembles the slices of a DICOM series into a volume, renders
//! windowed cross-sections of it and keeps per-series anomaly labels.
//!
//! Slices are ordered by a position attribute (SliceLocation by default);
//! slices without one are skipped. The volume is stored as a
//! (height, width, slices) array and can be sliced in the three medical
//! axes:
//!  - Axial: native slices
//!  - Coronal: transposed, rotated 180 degrees, resized to height x height
//!  - Sagittal: rotated 90 degrees, resized to height x height
//!
//! Every rendered slice is windowed with its own intensity range: a
//! threshold slider in `[0, 100]` shifts the pixels by up to the slice
//! maximum, the result is clipped back into the slice range and normalized
//! to `[0, 1]`.
//!
//! DICOM files are assumed to be single-frame images of the same series;
//! only the first frame is used. Resampling of the coronal and sagittal
//! views runs in parallel using rayon.
//!
//! # Examples
//!
//! ## Rendering the center of a series
//!
//! ```no_run
//! # use dicom_labeler::{VolumeLoader, Orientation, SortBy};
//! # use std::path::PathBuf;
//! let (volume, metadata) =
//!     VolumeLoader::load_from_directory(&PathBuf::from("dicom"), SortBy::SliceLocation)
//!         .expect("should have loaded files from directory");
//! println!("{metadata}");
//! let slice = volume
//!     .render_slice(
//!         Orientation::Sagittal,
//!         volume.center_index(Orientation::Sagittal),
//!         50,
//!     )
//!     .expect("should have rendered the center of the volume");
//! let image = dicom_labeler::Volume::to_luma8(&slice).expect("should fit into a bitmap");
//! image.save("result.png").expect("should have written the image");
//! ```

pub mod annotation;
pub mod config;
pub mod enums;
mod interpolator;
pub mod metadata;
pub mod series;
pub mod session;
pub mod slice_record;
pub mod volume;
pub mod volume_loader;
pub mod windowing;

pub use annotation::{Annotation, AnnotationError, AnnotationSet};
pub use config::ViewerConfig;
pub use enums::{Orientation, SortBy};
pub use metadata::{DescriptorField, Descriptors, MetadataTable};
pub use series::SeriesFolder;
pub use session::{Message, SessionError, SessionState, StateChange, Viewer};
pub use slice_record::SliceRecord;
pub use volume::{RenderError, RenderRequest, Volume};
pub use volume_loader::{VolumeLoader, VolumeLoaderError};
