//! Viewing session as a sequence of immutable state snapshots.
//!
//! Each user interaction produces a [`Message`]; applying it to the current
//! [`SessionState`] yields the next snapshot. A [`Viewer`] diffs consecutive
//! snapshots and only rebuilds its volume when the selected series changed.

use ndarray::Array2;
use thiserror::Error;

use crate::{
    annotation::{Annotation, AnnotationSet},
    config::ViewerConfig,
    enums::{Orientation, SortBy},
    metadata::MetadataTable,
    series::{self, SeriesFolder},
    volume::{RenderError, RenderRequest, Volume},
    volume_loader::{VolumeLoader, VolumeLoaderError},
};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Unknown series {0:?}")]
    UnknownSeries(String),

    #[error("No series selected")]
    NoSeriesSelected,

    #[error("Failed to load series: {0}")]
    Load(#[from] VolumeLoaderError),

    #[error("Failed to render slice: {0}")]
    Render(#[from] RenderError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Slider state of one view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewSettings {
    pub enabled: bool,
    pub index: usize,
    pub threshold: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    SelectSeries(String),
    ShowView(Orientation, bool),
    SetIndex(Orientation, usize),
    SetThreshold(Orientation, u8),
    /// Anomaly label of the selected series
    SetAnomaly(String),
    /// Slice list of the selected series
    SetSlices(String),
    Reset,
}

/// What differs between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateChange {
    SeriesSelected(String),
    ViewChanged(Orientation),
    AnnotationChanged(String),
    Cleared,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    series: Vec<SeriesFolder>,
    selected: Option<String>,
    views: [ViewSettings; 3],
    annotations: AnnotationSet,
}

fn view_slot(orientation: Orientation) -> usize {
    match orientation {
        Orientation::Axial => 0,
        Orientation::Coronal => 1,
        Orientation::Sagittal => 2,
    }
}

impl SessionState {
    /// Fresh session: first series selected, only the axial view shown.
    pub fn new(series: Vec<SeriesFolder>, config: &ViewerConfig) -> Self {
        let view = |enabled| ViewSettings {
            enabled,
            index: 0,
            threshold: config.default_threshold,
        };
        Self {
            selected: series.first().map(|folder| folder.name.clone()),
            annotations: AnnotationSet::for_series(series.iter().map(|folder| folder.name.clone())),
            views: [view(true), view(false), view(false)],
            series,
        }
    }

    pub fn series(&self) -> &[SeriesFolder] {
        &self.series
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn selected_folder(&self) -> Option<&SeriesFolder> {
        let selected = self.selected.as_deref()?;
        self.series.iter().find(|folder| folder.name == selected)
    }

    pub fn view(&self, orientation: Orientation) -> ViewSettings {
        self.views[view_slot(orientation)]
    }

    pub fn annotations(&self) -> &AnnotationSet {
        &self.annotations
    }

    pub fn render_request(&self, orientation: Orientation) -> RenderRequest {
        let view = self.view(orientation);
        RenderRequest {
            orientation,
            index: view.index,
            threshold_percent: view.threshold,
        }
    }

    /// Next snapshot after a user interaction.
    pub fn update(&self, message: Message) -> Result<Self, SessionError> {
        let mut next = self.clone();
        match message {
            Message::SelectSeries(name) => {
                if !self.series.iter().any(|folder| folder.name == name) {
                    return Err(SessionError::UnknownSeries(name));
                }
                next.selected = Some(name);
            }
            Message::ShowView(orientation, enabled) => {
                next.views[view_slot(orientation)].enabled = enabled;
            }
            Message::SetIndex(orientation, index) => {
                next.views[view_slot(orientation)].index = index;
            }
            Message::SetThreshold(orientation, threshold) => {
                next.views[view_slot(orientation)].threshold = threshold.min(100);
            }
            Message::SetAnomaly(anomaly) => {
                let (series, current) = self.selected_annotation()?;
                next.annotations = self.annotations.with(
                    series,
                    Annotation {
                        anomaly,
                        ..current
                    },
                );
            }
            Message::SetSlices(slices) => {
                let (series, current) = self.selected_annotation()?;
                next.annotations = self
                    .annotations
                    .with(series, Annotation { slices, ..current });
            }
            Message::Reset => {
                next.series.clear();
                next.selected = None;
                next.annotations = AnnotationSet::default();
            }
        }
        Ok(next)
    }

    fn selected_annotation(&self) -> Result<(&str, Annotation), SessionError> {
        let series = self.selected().ok_or(SessionError::NoSeriesSelected)?;
        let current = self.annotations.get(series).cloned().unwrap_or_default();
        Ok((series, current))
    }

    /// Every view centred on the given volume.
    pub fn with_centered_views(&self, volume: &Volume) -> Self {
        let mut next = self.clone();
        for orientation in Orientation::ALL {
            next.views[view_slot(orientation)].index = volume.center_index(orientation);
        }
        next
    }

    /// Changes from `previous` to `self`.
    pub fn diff(&self, previous: &SessionState) -> Vec<StateChange> {
        let mut changes = Vec::new();
        if self.series != previous.series && self.series.is_empty() {
            changes.push(StateChange::Cleared);
        }
        if self.selected != previous.selected || self.series != previous.series {
            if let Some(selected) = &self.selected {
                changes.push(StateChange::SeriesSelected(selected.clone()));
            }
        }
        for orientation in Orientation::ALL {
            if self.view(orientation) != previous.view(orientation) {
                changes.push(StateChange::ViewChanged(orientation));
            }
        }
        for folder in &self.series {
            let name = folder.name.as_str();
            if previous.annotations.get(name).is_some()
                && self.annotations.get(name) != previous.annotations.get(name)
            {
                changes.push(StateChange::AnnotationChanged(name.to_owned()));
            }
        }
        changes
    }
}

/// Produces the volume of a series folder.
pub trait SeriesSource {
    fn load(&self, folder: &SeriesFolder) -> Result<(Volume, MetadataTable), VolumeLoaderError>;
}

/// Reads the `.dcm` files of a series folder from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct DicomDirectorySource {
    pub sort_by: SortBy,
}

impl SeriesSource for DicomDirectorySource {
    fn load(&self, folder: &SeriesFolder) -> Result<(Volume, MetadataTable), VolumeLoaderError> {
        VolumeLoader::load_from_directory(&folder.path, self.sort_by)
    }
}

/// The volume currently on display.
#[derive(Debug, Clone)]
pub struct LoadedSeries {
    pub name: String,
    pub volume: Volume,
    pub metadata: MetadataTable,
}

pub struct Viewer<S> {
    source: S,
    state: SessionState,
    loaded: Option<LoadedSeries>,
}

impl Viewer<DicomDirectorySource> {
    /// Discovers the series below `root` and loads the first one.
    pub fn open(root: &std::path::Path, config: &ViewerConfig) -> Result<Self, SessionError> {
        let folders = series::find_series_folders(root, config.min_dcm_files)?;
        log::info!("Found {} series below {}", folders.len(), root.display());
        let source = DicomDirectorySource {
            sort_by: config.sort_by,
        };
        Self::with_source(source, SessionState::new(folders, config))
    }
}

impl<S: SeriesSource> Viewer<S> {
    /// Starts from `initial`, loading its selected series if there is one.
    pub fn with_source(source: S, initial: SessionState) -> Result<Self, SessionError> {
        let mut viewer = Self {
            source,
            state: SessionState {
                selected: None,
                ..initial.clone()
            },
            loaded: None,
        };
        let _ = viewer.apply(initial)?;
        Ok(viewer)
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn loaded(&self) -> Option<&LoadedSeries> {
        self.loaded.as_ref()
    }

    /// Moves to `next`, rebuilding the volume if the series changed.
    ///
    /// On a failed load the previous state and volume are kept.
    pub fn apply(&mut self, next: SessionState) -> Result<Vec<StateChange>, SessionError> {
        let changes = next.diff(&self.state);
        let mut next = next;

        if changes.contains(&StateChange::Cleared) {
            self.loaded = None;
        }

        let reload = changes
            .iter()
            .any(|change| matches!(change, StateChange::SeriesSelected(_)));
        if reload {
            let folder = next
                .selected_folder()
                .cloned()
                .ok_or(SessionError::NoSeriesSelected)?;
            log::info!("Loading series {}", folder.name);
            let (volume, metadata) = self.source.load(&folder)?;
            next = next.with_centered_views(&volume);
            self.loaded = Some(LoadedSeries {
                name: folder.name,
                volume,
                metadata,
            });
        }

        self.state = next;
        Ok(changes)
    }

    pub fn dispatch(&mut self, message: Message) -> Result<Vec<StateChange>, SessionError> {
        let next = self.state.update(message)?;
        self.apply(next)
    }

    /// Renders a view with the current slider settings.
    pub fn render(&self, orientation: Orientation) -> Result<Array2<f32>, SessionError> {
        let loaded = self.loaded.as_ref().ok_or(SessionError::NoSeriesSelected)?;
        Ok(loaded.volume.render(&self.state.render_request(orientation))?)
    }
}
