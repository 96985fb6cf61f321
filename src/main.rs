use std::{fs, path::PathBuf};

use clap::{Parser, ValueEnum};
use color_eyre::eyre::{self, WrapErr};

use dicom_labeler::{
    Message, Orientation, SortBy, ViewerConfig, Volume, annotation::parse_slice_ranges,
    session::Viewer,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ViewArg {
    Axial,
    Coronal,
    Sagittal,
}

impl From<ViewArg> for Orientation {
    fn from(view: ViewArg) -> Self {
        match view {
            ViewArg::Axial => Orientation::Axial,
            ViewArg::Coronal => Orientation::Coronal,
            ViewArg::Sagittal => Orientation::Sagittal,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SortByArg {
    SliceLocation,
    ImagePositionPatient,
    TablePosition,
    InstanceNumber,
}

impl From<SortByArg> for SortBy {
    fn from(sort_by: SortByArg) -> Self {
        match sort_by {
            SortByArg::SliceLocation => SortBy::SliceLocation,
            SortByArg::ImagePositionPatient => SortBy::ImagePositionPatient,
            SortByArg::TablePosition => SortBy::TablePosition,
            SortByArg::InstanceNumber => SortBy::InstanceNumber,
        }
    }
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory containing one folder per series
    root: PathBuf,

    /// Series to open, defaults to the first one found
    #[arg(short, long)]
    series: Option<String>,

    /// Views to render
    #[arg(short, long, value_enum, value_delimiter = ',', default_value = "axial")]
    views: Vec<ViewArg>,

    /// Slice index for every rendered view, defaults to the center
    #[arg(short, long)]
    index: Option<usize>,

    /// Color threshold, 50 is neutral
    #[arg(short, long, default_value_t = 50, value_parser = clap::value_parser!(u8).range(0..=100))]
    threshold: u8,

    #[arg(long, value_enum, default_value = "slice-location")]
    sort_by: SortByArg,

    /// Folders with fewer .dcm files are ignored
    #[arg(long, default_value_t = 2)]
    min_dcm_files: usize,

    /// Where rendered PNGs are written
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    out_dir: PathBuf,

    /// Anomaly label of the opened series
    #[arg(long)]
    anomaly: Option<String>,

    /// Axial slices with the anomaly, e.g. "0-11; 57-59; 112;"
    #[arg(long)]
    slices: Option<String>,

    /// Write the annotations of all series to this JSON file
    #[arg(long, value_name = "FILE")]
    annotations: Option<PathBuf>,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let _ = env_logger::Builder::from_default_env()
        .format_timestamp_secs()
        .try_init();

    let args = Cli::parse();
    let config = ViewerConfig {
        min_dcm_files: args.min_dcm_files,
        sort_by: args.sort_by.into(),
        default_threshold: args.threshold,
    };

    let mut viewer = Viewer::open(&args.root, &config)
        .wrap_err_with(|| format!("opening {}", args.root.display()))?;
    if viewer.state().series().is_empty() {
        eyre::bail!("No series with at least {} .dcm files found", config.min_dcm_files);
    }
    if let Some(series) = args.series {
        let _ = viewer.dispatch(Message::SelectSeries(series))?;
    }

    let loaded = viewer
        .loaded()
        .ok_or_else(|| eyre::eyre!("No series loaded"))?;
    let series = loaded.name.clone();
    println!("Series {series}, volume {:?}", loaded.volume.dim());
    if loaded.metadata.is_empty() {
        println!("Patient info unavailable");
    } else {
        print!("{}", loaded.metadata);
    }

    fs::create_dir_all(&args.out_dir)?;
    for view in args.views {
        let orientation = Orientation::from(view);
        let _ = viewer.dispatch(Message::ShowView(orientation, true))?;
        if let Some(index) = args.index {
            let _ = viewer.dispatch(Message::SetIndex(orientation, index))?;
        }

        let index = viewer.state().view(orientation).index;
        let rendered = viewer.render(orientation)?;
        let image =
            Volume::to_luma8(&rendered).ok_or_else(|| eyre::eyre!("Slice too large for a bitmap"))?;
        let path = args
            .out_dir
            .join(format!("{series}_{}_{index}.png", orientation.to_string().to_lowercase()));
        image
            .save(&path)
            .wrap_err_with(|| format!("writing {}", path.display()))?;
        println!("Slice {index} ({orientation}) -> {}", path.display());
    }

    if let Some(anomaly) = args.anomaly {
        let _ = viewer.dispatch(Message::SetAnomaly(anomaly))?;
    }
    if let Some(slices) = args.slices {
        let ranges = parse_slice_ranges(&slices)?;
        log::debug!("Annotated slice ranges: {ranges:?}");
        let _ = viewer.dispatch(Message::SetSlices(slices))?;
    }

    if let Some(path) = args.annotations {
        let names: Vec<_> = viewer
            .state()
            .series()
            .iter()
            .map(|folder| folder.name.as_str())
            .collect();
        let json = viewer.state().annotations().export_json(&names)?;
        fs::write(&path, json).wrap_err_with(|| format!("writing {}", path.display()))?;
        println!("Annotations -> {}", path.display());
    }

    Ok(())
}
