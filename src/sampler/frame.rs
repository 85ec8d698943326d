//! Loudness frames and the batching buffer that seals them.

/// An ordered batch of loudness samples, one per angular step of the display.
///
/// Frames built by [`FrameBuilder`] always hold exactly the configured frame
/// size; a partially filled buffer is never turned into a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct LoudnessFrame {
    values: Vec<f64>,
}

impl LoudnessFrame {
    /// Returns the loudness values in acquisition order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Largest loudness value in the frame (the floor for an empty frame).
    pub fn peak(&self) -> f64 {
        self.values.iter().copied().fold(super::loudness::LOUDNESS_FLOOR, f64::max)
    }

    /// Arithmetic mean of the frame's loudness values.
    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return super::loudness::LOUDNESS_FLOOR;
        }
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }
}

impl LoudnessFrame {
    /// A frame of `len` silent samples (every value at the loudness floor).
    ///
    /// Maps onto the unit half circle, which the display draws as its
    /// reference arc.
    pub fn silence(len: usize) -> Self {
        Self {
            values: vec![super::loudness::LOUDNESS_FLOOR; len],
        }
    }
}

#[cfg(test)]
impl From<Vec<f64>> for LoudnessFrame {
    fn from(values: Vec<f64>) -> Self {
        Self { values }
    }
}

/// Accumulates loudness samples and seals them into frames of a fixed size.
#[derive(Debug)]
pub struct FrameBuilder {
    pending: Vec<f64>,
    frame_size: usize,
}

impl FrameBuilder {
    pub fn new(frame_size: usize) -> Self {
        Self {
            pending: Vec::with_capacity(frame_size),
            frame_size,
        }
    }

    /// Appends one sample. Returns the sealed frame once the buffer reaches
    /// exactly `frame_size` samples, after which a fresh buffer begins.
    pub fn push(&mut self, sample: f64) -> Option<LoudnessFrame> {
        self.pending.push(sample);

        if self.pending.len() == self.frame_size {
            let values = std::mem::replace(&mut self.pending, Vec::with_capacity(self.frame_size));
            Some(LoudnessFrame { values })
        } else {
            None
        }
    }

    /// Number of samples waiting in the unsealed buffer.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Throws away the unsealed buffer, returning how many samples it held.
    pub fn discard(&mut self) -> usize {
        let discarded = self.pending.len();
        self.pending.clear();
        discarded
    }
}
