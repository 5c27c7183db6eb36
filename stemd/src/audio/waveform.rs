//! Canonical waveform type
//!
//! The separation model requires exactly (channels, samples) input. This
//! type is the single place shapes are ever adjusted: a 3-D array with a
//! singleton leading axis is squeezed to 2-D, anything else non-2-D is
//! rejected.

use ndarray::{Array2, Array3, ArrayD, ArrayView2, Axis, Ix2};

use super::AudioError;

/// A decoded waveform in canonical (channels, samples) layout
#[derive(Debug, Clone)]
pub struct Waveform {
    data: Array2<f32>,
    sample_rate: u32,
}

impl Waveform {
    /// The only validated conversion into canonical form.
    ///
    /// A (1, channels, samples) input is squeezed to 2-D; any other
    /// non-2-D shape is a shape error, never silently coerced.
    pub fn from_array(data: ArrayD<f32>, sample_rate: u32) -> Result<Self, AudioError> {
        let data = if data.ndim() == 3 && data.shape()[0] == 1 {
            data.remove_axis(Axis(0))
        } else {
            data
        };

        let shape = data.shape().to_vec();
        let data = data
            .into_dimensionality::<Ix2>()
            .map_err(|_| AudioError::Shape(shape.clone()))?;

        if data.nrows() == 0 || data.ncols() == 0 {
            return Err(AudioError::Shape(shape));
        }

        Ok(Self { data, sample_rate })
    }

    pub fn channels(&self) -> usize {
        self.data.nrows()
    }

    pub fn samples(&self) -> usize {
        self.data.ncols()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration_seconds(&self) -> f64 {
        self.samples() as f64 / self.sample_rate as f64
    }

    pub fn data(&self) -> ArrayView2<'_, f32> {
        self.data.view()
    }

    /// Copy with a leading batch axis of size 1, the layout the model
    /// expects even for single-file jobs.
    pub fn batched(&self) -> Array3<f32> {
        self.data.clone().insert_axis(Axis(0))
    }
}
