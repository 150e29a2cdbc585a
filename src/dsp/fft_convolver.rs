use realfft::num_complex::Complex;
use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};
use std::sync::Arc;

/// Single-channel uniformly partitioned FFT convolver
///
/// Overlap-add over segments of `block_size` samples with a frequency-domain
/// delay line. Input is accumulated into the current partition and the
/// partial result is emitted immediately, so any call size works with zero
/// latency. All buffers are allocated in `new`; `process` never allocates.
pub struct FftConvolver {
    block_size: usize,
    seg_count: usize,
    current: usize,
    forward: Arc<dyn RealToComplex<f32>>,
    inverse: Arc<dyn ComplexToReal<f32>>,
    segments: Vec<Vec<Complex<f32>>>,
    segments_ir: Vec<Vec<Complex<f32>>>,
    fft_buffer: Vec<f32>,
    forward_scratch: Vec<Complex<f32>>,
    inverse_scratch: Vec<Complex<f32>>,
    pre_multiplied: Vec<Complex<f32>>,
    conv: Vec<Complex<f32>>,
    overlap: Vec<f32>,
    input_buffer: Vec<f32>,
    input_buffer_fill: usize,
}

impl FftConvolver {
    /// Build a convolver for `impulse_response` with partitions of at least `block_size`
    pub fn new(impulse_response: &[f32], block_size: usize) -> Self {
        let block_size = block_size.max(1).next_power_of_two();
        let seg_size = 2 * block_size;
        let complex_size = seg_size / 2 + 1;
        let seg_count = (impulse_response.len() + block_size - 1) / block_size;

        let mut planner = RealFftPlanner::<f32>::new();
        let forward = planner.plan_fft_forward(seg_size);
        let inverse = planner.plan_fft_inverse(seg_size);
        let mut forward_scratch = forward.make_scratch_vec();
        let inverse_scratch = inverse.make_scratch_vec();

        let mut fft_buffer = vec![0.0; seg_size];
        let mut segments_ir = Vec::with_capacity(seg_count);
        for chunk in impulse_response.chunks(block_size) {
            let mut segment = vec![Complex::default(); complex_size];
            copy_and_pad(&mut fft_buffer, chunk);
            if forward
                .process_with_scratch(&mut fft_buffer, &mut segment, &mut forward_scratch)
                .is_err()
            {
                segment.fill(Complex::default());
            }
            segments_ir.push(segment);
        }

        Self {
            block_size,
            seg_count,
            current: 0,
            forward,
            inverse,
            segments: vec![vec![Complex::default(); complex_size]; seg_count],
            segments_ir,
            fft_buffer,
            forward_scratch,
            inverse_scratch,
            pre_multiplied: vec![Complex::default(); complex_size],
            conv: vec![Complex::default(); complex_size],
            overlap: vec![0.0; block_size],
            input_buffer: vec![0.0; block_size],
            input_buffer_fill: 0,
        }
    }

    /// Partition size actually used (power of two)
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Length of the impulse response this convolver was built with, rounded up to whole partitions
    pub fn partition_count(&self) -> usize {
        self.seg_count
    }

    /// Clear the delay line and overlap, keeping the impulse response
    pub fn reset(&mut self) {
        for segment in self.segments.iter_mut() {
            segment.fill(Complex::default());
        }
        self.pre_multiplied.fill(Complex::default());
        self.conv.fill(Complex::default());
        self.overlap.fill(0.0);
        self.input_buffer.fill(0.0);
        self.fft_buffer.fill(0.0);
        self.input_buffer_fill = 0;
        self.current = 0;
    }

    /// Convolve `input` into `output` (same length)
    pub fn process(&mut self, input: &[f32], output: &mut [f32]) {
        let len = input.len().min(output.len());
        if self.seg_count == 0 {
            output.fill(0.0);
            return;
        }

        let mut processed = 0;
        while processed < len {
            let input_buffer_was_empty = self.input_buffer_fill == 0;
            let processing = (len - processed).min(self.block_size - self.input_buffer_fill);
            let pos = self.input_buffer_fill;

            self.input_buffer[pos..pos + processing]
                .copy_from_slice(&input[processed..processed + processing]);

            // Forward FFT of the partially filled partition
            copy_and_pad(&mut self.fft_buffer, &self.input_buffer);
            if self
                .forward
                .process_with_scratch(
                    &mut self.fft_buffer,
                    &mut self.segments[self.current],
                    &mut self.forward_scratch,
                )
                .is_err()
            {
                output.fill(0.0);
                return;
            }

            // Contribution of older partitions only changes once per partition
            if input_buffer_was_empty {
                self.pre_multiplied.fill(Complex::default());
                for i in 1..self.seg_count {
                    let index_audio = (self.current + i) % self.seg_count;
                    complex_multiply_accumulate(
                        &mut self.pre_multiplied,
                        &self.segments_ir[i],
                        &self.segments[index_audio],
                    );
                }
            }

            self.conv.copy_from_slice(&self.pre_multiplied);
            complex_multiply_accumulate(
                &mut self.conv,
                &self.segments[self.current],
                &self.segments_ir[0],
            );

            // DC and Nyquist bins of a real spectrum are real
            let last = self.conv.len() - 1;
            self.conv[0].im = 0.0;
            self.conv[last].im = 0.0;

            if self
                .inverse
                .process_with_scratch(&mut self.conv, &mut self.fft_buffer, &mut self.inverse_scratch)
                .is_err()
            {
                output.fill(0.0);
                return;
            }

            let scale = 1.0 / self.fft_buffer.len() as f32;
            for i in 0..processing {
                output[processed + i] =
                    self.fft_buffer[pos + i] * scale + self.overlap[pos + i];
            }

            self.input_buffer_fill += processing;
            if self.input_buffer_fill == self.block_size {
                self.input_buffer.fill(0.0);
                self.input_buffer_fill = 0;

                for (overlap, sample) in self
                    .overlap
                    .iter_mut()
                    .zip(self.fft_buffer[self.block_size..].iter())
                {
                    *overlap = sample * scale;
                }

                self.current = if self.current > 0 {
                    self.current - 1
                } else {
                    self.seg_count - 1
                };
            }

            processed += processing;
        }
    }
}

/// Copy `src` into the start of `dst` and zero the remainder
#[inline]
fn copy_and_pad(dst: &mut [f32], src: &[f32]) {
    dst[..src.len()].copy_from_slice(src);
    dst[src.len()..].fill(0.0);
}

#[inline]
fn complex_multiply_accumulate(result: &mut [Complex<f32>], a: &[Complex<f32>], b: &[Complex<f32>]) {
    for ((r, x), y) in result.iter_mut().zip(a.iter()).zip(b.iter()) {
        *r += x * y;
    }
}
