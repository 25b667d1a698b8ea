//! Converting baseline lengths from metres into wavelengths.

use std::ops::{Div, Mul};

use marlu::constants::VEL_C;
use ndarray::prelude::*;
use thiserror::Error;

use crate::Frequency;

/// The speed of light used by [`ConversionPath::Plain`] \[metres/second\].
pub const SPEED_OF_LIGHT_M_S: f64 = 299792458.0;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Can't broadcast {num_chans} frequencies across an array of shape {shape:?}; the leading axis must have one element per channel")]
    ShapeMismatch { num_chans: usize, shape: Vec<usize> },
}

/// How to do the metres -> wavelengths conversion. Both give the same
/// numbers to well within 1e-9.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConversionPath {
    /// Carry units through the calculation with [`Metres`], [`Hertz`] and
    /// [`MetresPerSecond`], so that the result can only be dimensionless.
    #[default]
    Units,

    /// Multiply and divide by [`SPEED_OF_LIGHT_M_S`].
    Plain,
}

/// A length \[metres\].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Metres(pub f64);

/// A frequency \[Hz\].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Hertz(pub f64);

/// A speed \[metres/second\].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct MetresPerSecond(pub f64);

/// The speed of light in vacuum, from ERFA.
pub const SPEED_OF_LIGHT: MetresPerSecond = MetresPerSecond(VEL_C);

impl Mul<Hertz> for Metres {
    type Output = MetresPerSecond;

    fn mul(self, rhs: Hertz) -> MetresPerSecond {
        MetresPerSecond(self.0 * rhs.0)
    }
}

// The units cancel, so this is just a number.
impl Div for MetresPerSecond {
    type Output = f64;

    fn div(self, rhs: MetresPerSecond) -> f64 {
        self.0 / rhs.0
    }
}

/// Convert a single length into a number of wavelengths at `freq_hz`.
#[inline]
pub fn metres_to_wavelengths(metres: f64, freq_hz: f64, path: ConversionPath) -> f64 {
    match path {
        ConversionPath::Units => Metres(metres) * Hertz(freq_hz) / SPEED_OF_LIGHT,
        ConversionPath::Plain => metres * freq_hz / SPEED_OF_LIGHT_M_S,
    }
}

/// Convert every element of an array of lengths \[metres\] into wavelengths
/// at a single frequency \[Hz\].
pub fn convert_at_frequency<D: Dimension>(
    array: ArrayView<f64, D>,
    freq_hz: f64,
    path: ConversionPath,
) -> Array<f64, D> {
    array.mapv(|m| metres_to_wavelengths(m, freq_hz, path))
}

/// Convert an array of lengths \[metres\] into wavelengths.
///
/// A [`Frequency::Scalar`] applies to every element. For
/// [`Frequency::PerChannel`], the leading axis of `array` must be the channel
/// axis, and each slice along it is converted at its own frequency.
pub fn convert_array_to_wavelengths(
    array: ArrayViewD<f64>,
    frequency: &Frequency,
    path: ConversionPath,
) -> Result<ArrayD<f64>, ConvertError> {
    match frequency {
        Frequency::Scalar(freq_hz) => Ok(convert_at_frequency(array, *freq_hz, path)),

        Frequency::PerChannel(freqs_hz) => {
            if array.ndim() == 0 || array.len_of(Axis(0)) != freqs_hz.len() {
                return Err(ConvertError::ShapeMismatch {
                    num_chans: freqs_hz.len(),
                    shape: array.shape().to_vec(),
                });
            }

            let mut converted = ArrayD::zeros(array.raw_dim());
            for ((mut out, chan), &freq_hz) in converted
                .outer_iter_mut()
                .zip(array.outer_iter())
                .zip(freqs_hz)
            {
                out.assign(&convert_at_frequency(chan, freq_hz, path));
            }
            Ok(converted)
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use ndarray::array;

    use super::*;

    #[test]
    fn speed_of_light_agrees() {
        assert_eq!(SPEED_OF_LIGHT.0, SPEED_OF_LIGHT_M_S);
    }

    #[test]
    fn paths_agree() {
        let lengths = [-15000.0, -123.456, 0.0, 1e-3, 10.0, 20.0, 3456.789, 16000.0];
        let freqs = [50e6, 150e6, 1.4e9, 84e9, 100e9, 110e9, 345.796e9, 950e9];
        for &m in &lengths {
            for &f in &freqs {
                let units = metres_to_wavelengths(m, f, ConversionPath::Units);
                let plain = metres_to_wavelengths(m, f, ConversionPath::Plain);
                assert_relative_eq!(units, plain, max_relative = 1e-9);
            }
        }
    }

    #[test]
    fn scalar_frequency() {
        let u = array![10.0, 20.0].into_dyn();
        let freq = Frequency::Scalar(100e9);
        let result = convert_array_to_wavelengths(u.view(), &freq, ConversionPath::Units)
            .unwrap()
            .into_dimensionality::<Ix1>()
            .unwrap();
        assert_relative_eq!(result[0], 3335.6409519815206, max_relative = 1e-12);
        assert_relative_eq!(result[1], 6671.281903963041, max_relative = 1e-12);
    }

    #[test]
    fn per_channel_frequency_scales_leading_axis() {
        let a = array![[1.0, 2.0], [1.0, 2.0]].into_dyn();
        let freq = Frequency::PerChannel(vec![SPEED_OF_LIGHT_M_S, 2.0 * SPEED_OF_LIGHT_M_S]);
        let result = convert_array_to_wavelengths(a.view(), &freq, ConversionPath::Plain).unwrap();
        assert_relative_eq!(
            result.into_dimensionality::<Ix2>().unwrap(),
            array![[1.0, 2.0], [2.0, 4.0]]
        );
    }

    #[test]
    fn per_channel_frequency_shape_mismatch() {
        let a = array![1.0, 2.0, 3.0].into_dyn();
        let freq = Frequency::PerChannel(vec![100e9, 110e9]);
        let result = convert_array_to_wavelengths(a.view(), &freq, ConversionPath::Units);
        assert!(matches!(
            result,
            Err(ConvertError::ShapeMismatch { num_chans: 2, .. })
        ));
    }
}
