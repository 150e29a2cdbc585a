/// Pre-allocated planar scratch buffer holding the dry copy of a block
///
/// Sized at prepare time so the audio thread never allocates. Blocks that do
/// not fit are refused rather than grown.
pub struct DryBuffer {
    channels: Vec<Vec<f32>>,
    frames: usize,
    max_frames: usize,
}

impl DryBuffer {
    /// Create a buffer for `num_channels` channels of up to `max_frames` samples
    pub fn new(num_channels: usize, max_frames: usize) -> Self {
        Self {
            channels: vec![vec![0.0; max_frames]; num_channels],
            frames: 0,
            max_frames,
        }
    }

    /// Reallocate for a new processing configuration (not real-time safe)
    pub fn resize(&mut self, num_channels: usize, max_frames: usize) {
        *self = Self::new(num_channels, max_frames);
    }

    /// Whether a block of this shape fits without allocating
    pub fn fits(&self, num_channels: usize, num_frames: usize) -> bool {
        num_channels <= self.channels.len() && num_frames <= self.max_frames
    }

    /// Copy a block into the buffer. Returns false if the block does not fit.
    pub fn capture(&mut self, block: &[&mut [f32]]) -> bool {
        let frames = block.first().map(|c| c.len()).unwrap_or(0);
        if !self.fits(block.len(), frames) || block.iter().any(|c| c.len() != frames) {
            return false;
        }

        for (dry, wet) in self.channels.iter_mut().zip(block.iter()) {
            dry[..frames].copy_from_slice(wet);
        }
        self.frames = frames;
        true
    }

    /// Captured samples for one channel
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index][..self.frames]
    }
}

impl Default for DryBuffer {
    fn default() -> Self {
        Self::new(0, 0)
    }
}
