//! Pull visibilities, uv-wavelengths and metadata out of CASA measurement
//! sets and write them to FITS (or NumPy) files for imaging pipelines.

pub mod convert;
pub mod orchestrate;
pub mod read;
pub mod split;
pub mod wavelengths;
pub mod write;

use ndarray::ArrayD;

use read::MsReadError;

/// The fine-channel frequencies of a measurement set \[Hz\].
///
/// Whether a dataset has one frequency or a vector of them depends on the
/// shape of its (squeezed) `CHAN_FREQ` column, not on how many channels it
/// has; a vector with one element is still [`Frequency::PerChannel`].
#[derive(Debug, Clone, PartialEq)]
pub enum Frequency {
    Scalar(f64),
    PerChannel(Vec<f64>),
}

impl Frequency {
    /// The number of channels, if there is a channel axis.
    pub fn num_chans(&self) -> Option<usize> {
        match self {
            Frequency::Scalar(_) => None,
            Frequency::PerChannel(freqs) => Some(freqs.len()),
        }
    }
}

impl From<f64> for Frequency {
    fn from(freq_hz: f64) -> Self {
        Frequency::Scalar(freq_hz)
    }
}

impl From<Vec<f64>> for Frequency {
    fn from(freqs_hz: Vec<f64>) -> Self {
        Frequency::PerChannel(freqs_hz)
    }
}

impl TryFrom<ArrayD<f64>> for Frequency {
    type Error = MsReadError;

    fn try_from(chan_freq: ArrayD<f64>) -> Result<Self, Self::Error> {
        match chan_freq.ndim() {
            0 => match chan_freq.first() {
                Some(&f) => Ok(Frequency::Scalar(f)),
                None => unreachable!("0D arrays always have an element"),
            },
            1 => Ok(Frequency::PerChannel(chan_freq.iter().copied().collect())),
            got => Err(MsReadError::BadRank {
                column: "CHAN_FREQ",
                expected: "0 or 1",
                got,
            }),
        }
    }
}
