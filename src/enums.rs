use std::fmt;

/// The three medical viewing planes through a volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    Axial,
    Coronal,
    Sagittal,
}

impl Orientation {
    pub const ALL: [Orientation; 3] = [
        Orientation::Axial,
        Orientation::Coronal,
        Orientation::Sagittal,
    ];
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Orientation::Axial => "Axial",
            Orientation::Coronal => "Coronal",
            Orientation::Sagittal => "Sagittal",
        };
        f.write_str(name)
    }
}

/// Attribute that provides the stacking position of a slice.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SortBy {
    #[default]
    SliceLocation,
    /// Z component of ImagePositionPatient
    ImagePositionPatient,
    TablePosition,
    InstanceNumber,
}
