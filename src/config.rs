use crate::{enums::SortBy, windowing::NEUTRAL_THRESHOLD};

/// Settings shared by series discovery, loading and rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewerConfig {
    /// Folders with fewer `.dcm` files are not offered as a series.
    pub min_dcm_files: usize,
    pub sort_by: SortBy,
    /// Threshold every view starts with.
    pub default_threshold: u8,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            min_dcm_files: 2,
            sort_by: SortBy::default(),
            default_threshold: NEUTRAL_THRESHOLD,
        }
    }
}
