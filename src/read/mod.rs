//! Reading columns out of measurement sets.
//!
//! The functions here each pull a single product out of a measurement set.
//! All of them return [`MsReadError::NotFound`] if the measurement set isn't
//! there.

mod error;
pub mod ms;

pub use error::MsReadError;
pub use ms::{read_column, squeeze, ColumnKind, MAIN_TABLE};

use std::path::Path;

use hifitime::Epoch;
use log::debug;
use marlu::{c32, Complex};
use ndarray::{prelude::*, ErrorKind, ShapeError};

use crate::Frequency;

/// The number of channels in each spectral window.
pub fn get_num_chan(ms: &Path) -> Result<ArrayD<i32>, MsReadError> {
    read_column(ms, "SPECTRAL_WINDOW", "NUM_CHAN", ColumnKind::Scalar)
}

/// The spectral window IDs referenced by the data descriptions.
pub fn get_spw_ids(ms: &Path) -> Result<ArrayD<i32>, MsReadError> {
    read_column(
        ms,
        "DATA_DESCRIPTION",
        "SPECTRAL_WINDOW_ID",
        ColumnKind::Scalar,
    )
}

/// The channel frequencies \[Hz\] as stored in `SPECTRAL_WINDOW`.
pub fn get_frequencies(ms: &Path) -> Result<ArrayD<f64>, MsReadError> {
    read_column(ms, "SPECTRAL_WINDOW", "CHAN_FREQ", ColumnKind::Vector)
}

/// Like [`get_frequencies`], but as a [`Frequency`].
pub fn get_frequency(ms: &Path) -> Result<Frequency, MsReadError> {
    Frequency::try_from(get_frequencies(ms)?)
}

/// The antenna indices of every row, as a `(2, num_rows)` array.
pub fn get_antennas(ms: &Path) -> Result<ArrayD<i32>, MsReadError> {
    let antenna1: ArrayD<i32> = read_column(ms, MAIN_TABLE, "ANTENNA1", ColumnKind::Scalar)?;
    let antenna2: ArrayD<i32> = read_column(ms, MAIN_TABLE, "ANTENNA2", ColumnKind::Scalar)?;
    Ok(ndarray::stack(
        Axis(0),
        &[antenna1.view(), antenna2.view()],
    )?)
}

/// The scan number of every row.
pub fn get_scans(ms: &Path) -> Result<ArrayD<i32>, MsReadError> {
    read_column(ms, MAIN_TABLE, "SCAN_NUMBER", ColumnKind::Scalar)
}

/// casacore stores times as UTC seconds since the MJD epoch (1858-11-17).
pub fn casacore_utc_to_epoch(utc_seconds: f64) -> Epoch {
    Epoch::from_utc_seconds(utc_seconds - hifitime::J1900_OFFSET * hifitime::SECONDS_PER_DAY)
}

/// The (centroid) time of every row, in casacore's UTC seconds.
pub fn get_times(ms: &Path) -> Result<ArrayD<f64>, MsReadError> {
    let times: ArrayD<f64> = read_column(ms, MAIN_TABLE, "TIME", ColumnKind::Scalar)?;
    let (first, last) = times
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &t| {
            (lo.min(t), hi.max(t))
        });
    if first.is_finite() {
        debug!("First timestamp: {}", casacore_utc_to_epoch(first));
        debug!("Last timestamp:  {}", casacore_utc_to_epoch(last));
    }
    Ok(times)
}

/// Split complex values into their real and imaginary parts, which are
/// stacked along a new, last axis of length 2.
pub fn split_complex<F: Clone>(data: ArrayViewD<Complex<F>>) -> Result<ArrayD<F>, ShapeError> {
    let re = data.mapv(|c| c.re);
    let im = data.mapv(|c| c.im);
    ndarray::stack(Axis(data.ndim()), &[re.view(), im.view()])
}

/// The visibilities in the `DATA` column, as real numbers. The last axis has
/// the real and imaginary parts.
pub fn get_visibilities(ms: &Path) -> Result<ArrayD<f32>, MsReadError> {
    let data: ArrayD<c32> = read_column(ms, MAIN_TABLE, "DATA", ColumnKind::Matrix)?;
    debug!("DATA shape: {:?}", data.shape());
    Ok(split_complex(data.view())?)
}

/// Give `sigma` a channel axis (just before the row axis) when there are
/// per-channel frequencies, so it lines up with the visibilities.
pub fn broadcast_over_channels(
    sigma: ArrayD<f32>,
    frequency: &Frequency,
) -> Result<ArrayD<f32>, ShapeError> {
    let num_chans = match frequency.num_chans() {
        Some(n) => n,
        None => return Ok(sigma),
    };

    let chan_axis = sigma.ndim().saturating_sub(1);
    let mut shape = sigma.shape().to_vec();
    shape.insert(chan_axis, num_chans);
    let with_chan_axis = sigma.insert_axis(Axis(chan_axis));
    let view = with_chan_axis
        .broadcast(IxDyn(&shape))
        .ok_or_else(|| ShapeError::from_kind(ErrorKind::IncompatibleShape))?;
    Ok(view.to_owned())
}

/// The `SIGMA` column, repeated over channels and duplicated for the real and
/// imaginary parts so that it has the same shape as the output of
/// [`get_visibilities`].
pub fn get_sigma(ms: &Path) -> Result<ArrayD<f32>, MsReadError> {
    let sigma: ArrayD<f32> = read_column(ms, MAIN_TABLE, "SIGMA", ColumnKind::Vector)?;
    let frequency = get_frequency(ms)?;
    let sigma = broadcast_over_channels(sigma, &frequency)?;
    Ok(ndarray::stack(
        Axis(sigma.ndim()),
        &[sigma.view(), sigma.view()],
    )?)
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    use super::*;

    #[test]
    fn test_casacore_utc_to_epoch() {
        // 2013-10-15T13:48:32 UTC, the start of MWA observation 1065880128.
        let epoch = casacore_utc_to_epoch(4888561712.0);
        assert_abs_diff_eq!(epoch.to_gpst_seconds(), 1065880128.0, epsilon = 1e-3);
    }

    #[test]
    fn split_complex_appends_axis() {
        let data = array![
            [c32::new(1.0, -1.0), c32::new(2.0, -2.0), c32::new(3.0, 0.5)],
            [c32::new(4.0, 4.0), c32::new(-5.0, 0.0), c32::new(0.25, 6.0)]
        ]
        .into_dyn();
        let split = split_complex(data.view()).unwrap();
        assert_eq!(split.shape(), &[2, 3, 2]);
        let split = split.into_dimensionality::<Ix3>().unwrap();
        for ((i, j), c) in data.into_dimensionality::<Ix2>().unwrap().indexed_iter() {
            assert_eq!(split[(i, j, 0)], c.re);
            assert_eq!(split[(i, j, 1)], c.im);
        }
    }

    #[test]
    fn split_complex_1d() {
        let data = array![c32::new(1.5, 2.5)].into_dyn();
        let split = split_complex(data.view()).unwrap();
        assert_eq!(split.shape(), &[1, 2]);
    }

    #[test]
    fn sigma_gets_a_channel_axis() {
        // (num_pols, num_rows)
        let sigma = array![[1.0_f32, 2.0, 3.0], [4.0, 5.0, 6.0]].into_dyn();
        let freq = Frequency::PerChannel(vec![1e9, 2e9, 3e9, 4e9]);
        let b = broadcast_over_channels(sigma, &freq).unwrap();
        assert_eq!(b.shape(), &[2, 4, 3]);
        let b = b.into_dimensionality::<Ix3>().unwrap();
        for i_chan in 0..4 {
            assert_eq!(b[(0, i_chan, 2)], 3.0);
            assert_eq!(b[(1, i_chan, 0)], 4.0);
        }
    }

    #[test]
    fn sigma_with_scalar_frequency_is_untouched() {
        let sigma = array![1.0_f32, 2.0].into_dyn();
        let b = broadcast_over_channels(sigma.clone(), &Frequency::Scalar(1e9)).unwrap();
        assert_eq!(b, sigma);
    }

    #[test]
    fn missing_ms() {
        let ms = Path::new("/does/not/exist.ms");
        assert!(matches!(get_num_chan(ms), Err(MsReadError::NotFound(_))));
        assert!(matches!(get_spw_ids(ms), Err(MsReadError::NotFound(_))));
        assert!(matches!(get_frequencies(ms), Err(MsReadError::NotFound(_))));
        assert!(matches!(get_antennas(ms), Err(MsReadError::NotFound(_))));
        assert!(matches!(get_scans(ms), Err(MsReadError::NotFound(_))));
        assert!(matches!(get_times(ms), Err(MsReadError::NotFound(_))));
        assert!(matches!(get_sigma(ms), Err(MsReadError::NotFound(_))));
        assert!(matches!(get_visibilities(ms), Err(MsReadError::NotFound(_))));
    }
}
