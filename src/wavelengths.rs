//! Baseline coordinates in units of wavelength.

use std::path::Path;

use log::debug;
use ndarray::prelude::*;
use thiserror::Error;

use crate::{
    convert::{convert_array_to_wavelengths, ConversionPath, ConvertError},
    read::{get_frequency, read_column, ColumnKind, MsReadError, MAIN_TABLE},
    Frequency,
};

#[derive(Error, Debug)]
pub enum WavelengthsError {
    #[error(transparent)]
    MsRead(#[from] MsReadError),

    #[error(transparent)]
    Convert(#[from] ConvertError),
}

/// Get the `UVW` column of a measurement set as a `(3, num_rows)` array
/// \[metres\].
pub fn get_uvw(ms: &Path) -> Result<Array2<f64>, MsReadError> {
    let uvw: ArrayD<f64> = read_column(ms, MAIN_TABLE, "UVW", ColumnKind::Vector)?;
    // With no rows there are no cells to give the coordinate axis a length.
    if uvw.is_empty() {
        return Ok(Array2::zeros((3, 0)));
    }
    // A single row gets squeezed down to (3,).
    let uvw = match uvw.ndim() {
        1 => uvw.insert_axis(Axis(1)),
        _ => uvw,
    };
    match uvw.into_dimensionality::<Ix2>() {
        Ok(uvw) if uvw.len_of(Axis(0)) == 3 => Ok(uvw),
        Ok(uvw) => Err(MsReadError::BadRank {
            column: "UVW",
            expected: "3 coordinates per row",
            got: uvw.len_of(Axis(0)),
        }),
        Err(e) => Err(e.into()),
    }
}

/// Convert the u and v coordinates of `uvw` (a `(3, num_baselines)` array
/// \[metres\]) into wavelengths.
///
/// With per-channel frequencies, the result has shape `(num_chans,
/// num_baselines, 2)`; otherwise it is `(num_baselines, 2)`. The last axis
/// holds (u, v). Only the units change from channel to channel; every
/// channel uses the same geometric baselines.
pub fn uv_wavelengths(
    uvw: ArrayView2<f64>,
    frequency: &Frequency,
    path: ConversionPath,
) -> Result<ArrayD<f64>, ConvertError> {
    let num_baselines = uvw.len_of(Axis(1));
    let coord_shape = match frequency.num_chans() {
        Some(num_chans) => vec![num_chans, num_baselines],
        None => vec![num_baselines],
    };
    let uv_axis = Axis(coord_shape.len());
    let mut uv_shape = coord_shape.clone();
    uv_shape.push(2);

    let mut uv = ArrayD::zeros(uv_shape);
    for (i_coord, coord) in [uvw.row(0), uvw.row(1)].into_iter().enumerate() {
        // Repeat the coordinates for every channel.
        let coord = coord
            .broadcast(IxDyn(&coord_shape))
            .ok_or_else(|| ConvertError::ShapeMismatch {
                num_chans: frequency.num_chans().unwrap_or(1),
                shape: coord.shape().to_vec(),
            })?;
        let wavelengths = convert_array_to_wavelengths(coord, frequency, path)?;
        uv.index_axis_mut(uv_axis, i_coord).assign(&wavelengths);
    }
    Ok(uv)
}

/// Read the baselines and channel frequencies of a measurement set and give
/// back the baselines in wavelengths. See [`uv_wavelengths`] for the shape.
pub fn get_uv_wavelengths(
    ms: &Path,
    path: ConversionPath,
) -> Result<ArrayD<f64>, WavelengthsError> {
    let uvw = get_uvw(ms)?;
    let frequency = get_frequency(ms)?;
    match &frequency {
        Frequency::Scalar(f) => debug!("Single frequency: {f} Hz"),
        Frequency::PerChannel(f) => debug!("{} channel frequencies", f.len()),
    }
    Ok(uv_wavelengths(uvw.view(), &frequency, path)?)
}
