//! Per-series anomaly labels and their JSON export.

use std::{collections::BTreeMap, ops::RangeInclusive};

use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

pub const DEFAULT_ANOMALY: &str = "Bleeding";

#[derive(Debug, Error)]
pub enum AnnotationError {
    #[error("Invalid slice range {0:?}, expected `N` or `N-M` with N <= M")]
    InvalidSliceRange(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Free-text label and axial slice list attached to one series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(rename = "Anomaly")]
    pub anomaly: String,
    /// Axial slices with the anomaly, e.g. `0-11; 57-59; 112;`
    #[serde(rename = "Slices")]
    pub slices: String,
}

impl Default for Annotation {
    fn default() -> Self {
        Self {
            anomaly: DEFAULT_ANOMALY.to_owned(),
            slices: String::new(),
        }
    }
}

impl Annotation {
    /// Parses [`Annotation::slices`] into inclusive ranges.
    pub fn slice_ranges(&self) -> Result<Vec<RangeInclusive<usize>>, AnnotationError> {
        parse_slice_ranges(&self.slices)
    }
}

pub fn parse_slice_ranges(text: &str) -> Result<Vec<RangeInclusive<usize>>, AnnotationError> {
    text.split(';')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            let invalid = || AnnotationError::InvalidSliceRange(part.to_owned());
            let (start, end) = match part.split_once('-') {
                Some((start, end)) => (start.trim(), end.trim()),
                None => (part, part),
            };
            let start: usize = start.parse().map_err(|_| invalid())?;
            let end: usize = end.parse().map_err(|_| invalid())?;
            if start > end {
                return Err(invalid());
            }
            Ok(start..=end)
        })
        .collect()
}

/// Annotations of every series in the current upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationSet {
    annotations: BTreeMap<String, Annotation>,
}

impl AnnotationSet {
    /// One default annotation per series name.
    pub fn for_series<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            annotations: names
                .into_iter()
                .map(|name| (name.into(), Annotation::default()))
                .collect(),
        }
    }

    pub fn get(&self, series: &str) -> Option<&Annotation> {
        self.annotations.get(series)
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// Copy of the set with one series' annotation replaced.
    pub fn with(&self, series: &str, annotation: Annotation) -> Self {
        let mut annotations = self.annotations.clone();
        let _ = annotations.insert(series.to_owned(), annotation);
        Self { annotations }
    }

    /// Pretty JSON object of the selected series, in selection order.
    ///
    /// Selected names without an annotation are left out.
    pub fn export_json<S: AsRef<str>>(&self, selection: &[S]) -> Result<String, AnnotationError> {
        let selected = Selected(
            selection
                .iter()
                .filter_map(|name| {
                    let name = name.as_ref();
                    self.annotations.get_key_value(name)
                })
                .map(|(name, annotation)| (name.as_str(), annotation))
                .collect(),
        );
        Ok(serde_json::to_string_pretty(&selected)?)
    }
}

struct Selected<'a>(Vec<(&'a str, &'a Annotation)>);

impl Serialize for Selected<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().copied())
    }
}
