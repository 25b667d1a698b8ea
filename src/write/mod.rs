//! Writing extracted arrays to disk.
//!
//! Every product is written at most once per filename stem: if either
//! `<stem>.fits` or `<stem>.numpy` already exists, the export is skipped
//! without computing anything.

#[cfg(feature = "cfitsio")]
mod fits;

use std::{
    ffi::OsString,
    fmt::{Debug, Display},
    path::{Path, PathBuf},
};

use log::{debug, info};
use ndarray::prelude::*;
use ndarray_npy::{read_npy, write_npy, ReadableElement, WritableElement};
use thiserror::Error;

use crate::{convert::ConvertError, read::MsReadError, wavelengths::WavelengthsError};

#[cfg(feature = "cfitsio")]
use fitsio::{
    errors::Error as FitsError,
    hdu::FitsHdu,
    images::ImageType,
    FitsFile,
};

/// The extension given to FITS outputs.
pub const FITS_EXTENSION: &str = "fits";

/// The extension given to NumPy outputs. The contents are in the `.npy`
/// format.
pub const NPY_EXTENSION: &str = "numpy";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error(transparent)]
    MsRead(#[from] MsReadError),

    #[error(transparent)]
    Convert(#[from] ConvertError),

    #[error("Can't write {0} as FITS; this build was made without the \"cfitsio\" feature")]
    FitsUnavailable(PathBuf),

    #[error("The primary HDU of {0} is not an image")]
    NotAnImage(PathBuf),

    #[error("Don't know how to read {0}; expected a .fits or .numpy file")]
    UnknownExtension(PathBuf),

    #[cfg(feature = "cfitsio")]
    #[error(transparent)]
    Fitsio(#[from] FitsError),

    #[error(transparent)]
    WriteNpy(#[from] ndarray_npy::WriteNpyError),

    #[error(transparent)]
    ReadNpy(#[from] ndarray_npy::ReadNpyError),

    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),
}

impl From<WavelengthsError> for ExportError {
    fn from(e: WavelengthsError) -> ExportError {
        match e {
            WavelengthsError::MsRead(e) => ExportError::MsRead(e),
            WavelengthsError::Convert(e) => ExportError::Convert(e),
        }
    }
}

/// How exported arrays get serialised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerializationBackend {
    /// A FITS primary image (needs cfitsio).
    Fits,

    /// A NumPy array dump.
    Npy,
}

impl SerializationBackend {
    /// FITS if this build can write it, otherwise NumPy.
    pub fn detect() -> SerializationBackend {
        if cfg!(feature = "cfitsio") {
            SerializationBackend::Fits
        } else {
            SerializationBackend::Npy
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            SerializationBackend::Fits => FITS_EXTENSION,
            SerializationBackend::Npy => NPY_EXTENSION,
        }
    }
}

impl Display for SerializationBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SerializationBackend::Fits => write!(f, "FITS"),
            SerializationBackend::Npy => write!(f, "NumPy"),
        }
    }
}

/// Settings shared by every export. This is worked out once at start up and
/// doesn't change afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportConfig {
    pub backend: SerializationBackend,
}

impl ExportConfig {
    /// Use the best available backend, unless NumPy output is forced.
    pub fn new(force_npy: bool) -> ExportConfig {
        let backend = if force_npy {
            SerializationBackend::Npy
        } else {
            SerializationBackend::detect()
        };
        ExportConfig { backend }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        ExportConfig::new(false)
    }
}

/// What [`export`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// A new file was written.
    Written(PathBuf),

    /// An export for this stem already existed; nothing was done.
    Skipped(PathBuf),
}

impl ExportOutcome {
    pub fn path(&self) -> &Path {
        match self {
            ExportOutcome::Written(p) | ExportOutcome::Skipped(p) => p,
        }
    }
}

/// Element types that can be exported (and read back).
pub trait ExportElement: WritableElement + ReadableElement + Copy + Debug {
    #[cfg(feature = "cfitsio")]
    const IMAGE_TYPE: ImageType;

    #[cfg(feature = "cfitsio")]
    fn write_fits(hdu: &FitsHdu, fptr: &mut FitsFile, data: &[Self]) -> Result<(), FitsError>;

    #[cfg(feature = "cfitsio")]
    fn read_fits(hdu: &FitsHdu, fptr: &mut FitsFile) -> Result<Vec<Self>, FitsError>;
}

macro_rules! impl_export_element {
    ($t:ty, $image_type:ident) => {
        impl ExportElement for $t {
            #[cfg(feature = "cfitsio")]
            const IMAGE_TYPE: ImageType = ImageType::$image_type;

            #[cfg(feature = "cfitsio")]
            fn write_fits(
                hdu: &FitsHdu,
                fptr: &mut FitsFile,
                data: &[Self],
            ) -> Result<(), FitsError> {
                hdu.write_image(fptr, data)
            }

            #[cfg(feature = "cfitsio")]
            fn read_fits(hdu: &FitsHdu, fptr: &mut FitsFile) -> Result<Vec<Self>, FitsError> {
                hdu.read_image(fptr)
            }
        }
    };
}

impl_export_element!(f32, Float);
impl_export_element!(f64, Double);
impl_export_element!(i32, Long);
impl_export_element!(i64, LongLong);

/// Append `.<extension>` to `stem`. Unlike [`Path::with_extension`], this
/// doesn't touch any dots already in the stem.
pub fn stem_with_extension(stem: &Path, extension: &str) -> PathBuf {
    let mut s: OsString = stem.as_os_str().to_owned();
    s.push(".");
    s.push(extension);
    PathBuf::from(s)
}

/// If something has already been exported to `stem` (by either backend),
/// return its path.
pub fn existing_export(stem: &Path) -> Option<PathBuf> {
    [FITS_EXTENSION, NPY_EXTENSION]
        .into_iter()
        .map(|ext| stem_with_extension(stem, ext))
        .find(|p| p.is_file())
}

/// Write `array` to `<stem>.<ext>`, overwriting anything that's already there.
pub fn write_array<T: ExportElement>(
    config: &ExportConfig,
    array: ArrayViewD<T>,
    stem: &Path,
) -> Result<PathBuf, ExportError> {
    let path = stem_with_extension(stem, config.backend.extension());
    debug!("Writing {} ({})", path.display(), config.backend);
    match config.backend {
        #[cfg(feature = "cfitsio")]
        SerializationBackend::Fits => fits::fits_write_image(&path, array)?,

        #[cfg(not(feature = "cfitsio"))]
        SerializationBackend::Fits => return Err(ExportError::FitsUnavailable(path)),

        SerializationBackend::Npy => write_npy(&path, &array)?,
    }
    Ok(path)
}

/// Compute and write out a product, unless it has been written before.
///
/// If `<stem>.fits` or `<stem>.numpy` already exists, `compute` is not
/// called and [`ExportOutcome::Skipped`] is returned. Otherwise `compute` is
/// called and its result is written with the configured backend. Nothing is
/// written if `compute` fails.
pub fn export<T, E, F>(
    config: &ExportConfig,
    compute: F,
    stem: &Path,
) -> Result<ExportOutcome, ExportError>
where
    T: ExportElement,
    F: FnOnce() -> Result<ArrayD<T>, E>,
    ExportError: From<E>,
{
    if let Some(existing) = existing_export(stem) {
        info!("{} already exists", existing.display());
        return Ok(ExportOutcome::Skipped(existing));
    }

    let array = compute()?;
    let name = stem
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    info!("shape ({name}): {:?}", array.shape());
    let path = write_array(config, array.view(), stem)?;
    info!("Wrote {}", path.display());
    Ok(ExportOutcome::Written(path))
}

/// Read an exported array back from disk. The format is worked out from the
/// file extension.
///
/// 0-dimensional arrays are written to FITS as a single-element image, so
/// they come back as 1-dimensional arrays from FITS files.
pub fn read_exported<T: ExportElement>(path: &Path) -> Result<ArrayD<T>, ExportError> {
    match path.extension().and_then(|os_str| os_str.to_str()) {
        #[cfg(feature = "cfitsio")]
        Some(FITS_EXTENSION) => fits::fits_read_image(path),

        #[cfg(not(feature = "cfitsio"))]
        Some(FITS_EXTENSION) => Err(ExportError::FitsUnavailable(path.to_path_buf())),

        Some(NPY_EXTENSION | "npy") => Ok(read_npy(path)?),

        _ => Err(ExportError::UnknownExtension(path.to_path_buf())),
    }
}
