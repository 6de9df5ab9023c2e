// Spectral Engine
// Frequency-domain resonance analysis over the segment signal.
//
// Y[k] = X[k] * P[k]
// R    = |Re(IDFT(Y))|
//
// The forward DFT is unscaled and the inverse carries the 1/N factor, so an all-ones
// filter reproduces the input signal. Power-of-two sizes use iterative radix-2
// Cooley-Tukey; other sizes go through Bluestein's chirp-z on a radix-2 core.

use std::f64::consts::PI;
use tracing::debug;

use crate::error::{ResonanceError, Result};
use crate::models::Segment;

// ============================================================================
// Complex arithmetic
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
struct Complex {
    re: f64,
    im: f64,
}

impl Complex {
    const ZERO: Complex = Complex { re: 0.0, im: 0.0 };

    #[inline]
    fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }

    #[inline]
    fn from_angle(theta: f64) -> Self {
        Self::new(theta.cos(), theta.sin())
    }

    #[inline]
    fn add(self, o: Complex) -> Complex {
        Complex::new(self.re + o.re, self.im + o.im)
    }

    #[inline]
    fn sub(self, o: Complex) -> Complex {
        Complex::new(self.re - o.re, self.im - o.im)
    }

    #[inline]
    fn mul(self, o: Complex) -> Complex {
        Complex::new(self.re * o.re - self.im * o.im, self.re * o.im + self.im * o.re)
    }

    #[inline]
    fn conj(self) -> Complex {
        Complex::new(self.re, -self.im)
    }

    #[inline]
    fn scale(self, s: f64) -> Complex {
        Complex::new(self.re * s, self.im * s)
    }
}

// ============================================================================
// DFT kernels (unscaled in both directions)
// ============================================================================

fn radix2_in_place(buf: &mut [Complex], inverse: bool) {
    let n = buf.len();
    if n <= 1 {
        return;
    }

    // Bit-reversal permutation
    let mut j = 0usize;
    for i in 1..n {
        let mut bit = n >> 1;
        while j & bit != 0 {
            j ^= bit;
            bit >>= 1;
        }
        j |= bit;
        if i < j {
            buf.swap(i, j);
        }
    }

    let sign = if inverse { 1.0 } else { -1.0 };
    let mut len = 2;
    while len <= n {
        let half = len / 2;
        let step = sign * 2.0 * PI / len as f64;
        for start in (0..n).step_by(len) {
            for k in 0..half {
                let w = Complex::from_angle(step * k as f64);
                let u = buf[start + k];
                let v = buf[start + k + half].mul(w);
                buf[start + k] = u.add(v);
                buf[start + k + half] = u.sub(v);
            }
        }
        len <<= 1;
    }
}

fn bluestein(input: &[Complex], inverse: bool) -> Vec<Complex> {
    let n = input.len();
    let m = (2 * n - 1).next_power_of_two();
    let sign = if inverse { 1.0 } else { -1.0 };

    // Chirp w_k = exp(sign * i * pi * k^2 / n); k^2 reduced mod 2n to keep the angle small
    let chirp: Vec<Complex> = (0..n)
        .map(|k| {
            let k2 = (k as u128 * k as u128 % (2 * n as u128)) as f64;
            Complex::from_angle(sign * PI * k2 / n as f64)
        })
        .collect();

    let mut a = vec![Complex::ZERO; m];
    for k in 0..n {
        a[k] = input[k].mul(chirp[k]);
    }

    let mut b = vec![Complex::ZERO; m];
    b[0] = chirp[0].conj();
    for k in 1..n {
        let c = chirp[k].conj();
        b[k] = c;
        b[m - k] = c;
    }

    radix2_in_place(&mut a, false);
    radix2_in_place(&mut b, false);
    for (x, y) in a.iter_mut().zip(&b) {
        *x = x.mul(*y);
    }
    radix2_in_place(&mut a, true);

    let inv_m = 1.0 / m as f64;
    (0..n).map(|k| a[k].scale(inv_m).mul(chirp[k])).collect()
}

fn dft(input: &[Complex], inverse: bool) -> Vec<Complex> {
    let n = input.len();
    if n <= 1 {
        return input.to_vec();
    }
    if n.is_power_of_two() {
        let mut buf = input.to_vec();
        radix2_in_place(&mut buf, inverse);
        buf
    } else {
        bluestein(input, inverse)
    }
}

fn interleave(values: &[Complex]) -> Vec<f64> {
    values.iter().flat_map(|c| [c.re, c.im]).collect()
}

fn deinterleave(values: &[f64]) -> Vec<Complex> {
    values.chunks_exact(2).map(|p| Complex::new(p[0], p[1])).collect()
}

// ============================================================================
// Spectrum
// ============================================================================

/// Full complex spectrum, interleaved as [re0, im0, re1, im1, ...]
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum<'a> {
    complex: Vec<f64>,
    size: usize,
    segments: &'a [Segment],
}

impl<'a> Spectrum<'a> {
    /// Fails when the interleaved buffer is not exactly `2 * size` long
    pub fn from_parts(complex: Vec<f64>, size: usize, segments: &'a [Segment]) -> Result<Self> {
        if complex.len() != size * 2 {
            return Err(ResonanceError::SpectrumSizeMismatch {
                expected: size * 2,
                actual: complex.len(),
            });
        }
        Ok(Self { complex, size, segments })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn complex(&self) -> &[f64] {
        &self.complex
    }

    /// Segments the signal was built from; empty for raw-signal spectra
    pub fn segments(&self) -> &'a [Segment] {
        self.segments
    }

    pub fn real_part(&self) -> Vec<f64> {
        self.complex.iter().step_by(2).copied().collect()
    }

    pub fn imaginary_part(&self) -> Vec<f64> {
        self.complex.iter().skip(1).step_by(2).copied().collect()
    }

    pub fn magnitude_at(&self, index: usize) -> f64 {
        if index >= self.size {
            return 0.0;
        }
        let (re, im) = (self.complex[index * 2], self.complex[index * 2 + 1]);
        (re * re + im * im).sqrt()
    }

    pub fn phase_at(&self, index: usize) -> f64 {
        if index >= self.size {
            return 0.0;
        }
        self.complex[index * 2 + 1].atan2(self.complex[index * 2])
    }
}

// ============================================================================
// Engine
// ============================================================================

/// sample[i] = importance * 2 + ln(len + 1) / 10 + (1 if heading)
pub fn segment_signal(segments: &[Segment]) -> Vec<f64> {
    segments
        .iter()
        .map(|s| {
            let mut value = s.importance() * 2.0;
            value += (s.len() as f64 + 1.0).ln() / 10.0;
            if s.is_header() {
                value += 1.0;
            }
            value
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SpectralEngine;

impl SpectralEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn transform<'a>(&self, segments: &'a [Segment]) -> Spectrum<'a> {
        let signal = segment_signal(segments);
        debug!("[SPECTRAL] forward transform: {} points", signal.len());
        Spectrum {
            complex: forward_dft(&signal),
            size: signal.len(),
            segments,
        }
    }

    /// Spectrum of an arbitrary real signal, detached from any segments
    pub fn transform_signal(&self, signal: &[f64]) -> Spectrum<'static> {
        Spectrum {
            complex: forward_dft(signal),
            size: signal.len(),
            segments: &[],
        }
    }

    /// Scale bins i < len(filter) by filter[i]; higher bins pass through unchanged
    pub fn apply_filter<'a>(&self, spectrum: &Spectrum<'a>, filter: &[f64]) -> Spectrum<'a> {
        let mut complex = spectrum.complex.clone();
        for (i, coeff) in filter.iter().take(spectrum.size).enumerate() {
            complex[i * 2] *= coeff;
            complex[i * 2 + 1] *= coeff;
        }
        Spectrum {
            complex,
            size: spectrum.size,
            segments: spectrum.segments,
        }
    }

    /// Real part of the 1/N-scaled inverse DFT
    pub fn inverse_transform(&self, spectrum: &Spectrum<'_>) -> Vec<f64> {
        let n = spectrum.size;
        if n == 0 {
            return Vec::new();
        }
        let scale = 1.0 / n as f64;
        dft(&deinterleave(&spectrum.complex), true)
            .into_iter()
            .map(|c| c.re * scale)
            .collect()
    }

    /// Per-segment resonance intensity |Re(IDFT(X * P))|
    pub fn analyze_resonance(&self, segments: &[Segment], filter: &[f64]) -> Vec<f64> {
        let spectrum = self.transform(segments);
        let filtered = self.apply_filter(&spectrum, filter);
        self.inverse_transform(&filtered)
            .into_iter()
            .map(f64::abs)
            .collect()
    }

    pub fn power_spectrum(&self, spectrum: &Spectrum<'_>) -> Vec<f64> {
        (0..spectrum.size).map(|i| spectrum.magnitude_at(i)).collect()
    }

    /// Mean magnitude over `num_bands` contiguous equal-width ranges; the last band takes the remainder
    pub fn band_energy(&self, spectrum: &Spectrum<'_>, num_bands: usize) -> Result<Vec<f64>> {
        let power = self.power_spectrum(spectrum);
        if num_bands == 0 || num_bands > power.len() {
            return Err(ResonanceError::InvalidBandCount {
                bands: num_bands,
                size: power.len(),
            });
        }

        let band_size = power.len() / num_bands;
        Ok((0..num_bands)
            .map(|band| {
                let start = band * band_size;
                let end = if band + 1 == num_bands { power.len() } else { start + band_size };
                power[start..end].iter().sum::<f64>() / (end - start) as f64
            })
            .collect())
    }
}

fn forward_dft(signal: &[f64]) -> Vec<f64> {
    let input: Vec<Complex> = signal.iter().map(|&v| Complex::new(v, 0.0)).collect();
    interleave(&dft(&input, false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BlockType, LayoutMetrics};

    const TOL: f64 = 1e-9;

    fn direct_dft(signal: &[f64]) -> Vec<f64> {
        let n = signal.len();
        let mut out = Vec::with_capacity(2 * n);
        for k in 0..n {
            let (mut re, mut im) = (0.0, 0.0);
            for (t, x) in signal.iter().enumerate() {
                let angle = -2.0 * PI * (k * t) as f64 / n as f64;
                re += x * angle.cos();
                im += x * angle.sin();
            }
            out.push(re);
            out.push(im);
        }
        out
    }

    fn test_signal(n: usize) -> Vec<f64> {
        (0..n).map(|i| ((i * 7 + 3) % 11) as f64 * 0.37 + (i as f64).sin()).collect()
    }

    fn segment(importance: f64, len: usize, block_type: BlockType) -> Segment {
        let layout = LayoutMetrics {
            line_count: 1,
            word_count: 1,
            char_count: len,
            indent_level: 0,
            relative_font_size: 1.0,
        };
        Segment::new("s".into(), block_type, "x".repeat(len), 0, layout, importance)
    }

    #[test]
    fn test_forward_matches_direct_dft() {
        let engine = SpectralEngine::new();
        for n in [1usize, 2, 3, 5, 8, 12, 16, 31, 64, 100] {
            let signal = test_signal(n);
            let fast = engine.transform_signal(&signal);
            let reference = direct_dft(&signal);
            assert_eq!(fast.complex().len(), 2 * n);
            for (a, b) in fast.complex().iter().zip(&reference) {
                assert!((a - b).abs() < 1e-8, "n={} fast={} ref={}", n, a, b);
            }
        }
    }

    #[test]
    fn test_round_trip_identity_filter() {
        let engine = SpectralEngine::new();
        let ones = vec![1.0; 128];
        for n in [1usize, 2, 7, 10, 64, 129, 200] {
            let signal = test_signal(n);
            let spectrum = engine.transform_signal(&signal);
            let restored = engine.inverse_transform(&engine.apply_filter(&spectrum, &ones));
            assert_eq!(restored.len(), n);
            for (a, b) in restored.iter().zip(&signal) {
                assert!((a - b).abs() < TOL, "n={} restored={} original={}", n, a, b);
            }
        }
    }

    #[test]
    fn test_filter_composability() {
        let engine = SpectralEngine::new();
        let spectrum = engine.transform_signal(&test_signal(40));
        let p1: Vec<f64> = (0..32).map(|i| 0.5 + i as f64 * 0.1).collect();
        let p2: Vec<f64> = (0..32).map(|i| 2.0 - i as f64 * 0.05).collect();
        let product: Vec<f64> = p1.iter().zip(&p2).map(|(a, b)| a * b).collect();

        let sequential = engine.apply_filter(&engine.apply_filter(&spectrum, &p1), &p2);
        let combined = engine.apply_filter(&spectrum, &product);
        for (a, b) in sequential.complex().iter().zip(combined.complex()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_filter_leaves_high_bins_untouched() {
        let engine = SpectralEngine::new();
        let spectrum = engine.transform_signal(&test_signal(10));
        let filtered = engine.apply_filter(&spectrum, &[0.0, 0.0, 0.0]);
        assert_eq!(filtered.magnitude_at(0), 0.0);
        assert_eq!(filtered.magnitude_at(2), 0.0);
        assert_eq!(filtered.complex()[6..], spectrum.complex()[6..]);
    }

    #[test]
    fn test_signal_construction() {
        let segments = vec![
            segment(0.5, 10, BlockType::Paragraph),
            segment(1.0, 0, BlockType::Title),
        ];
        let signal = segment_signal(&segments);
        assert!((signal[0] - (1.0 + (11.0f64).ln() / 10.0)).abs() < 1e-12);
        assert!((signal[1] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_resonance_with_identity_filter_equals_signal() {
        let engine = SpectralEngine::new();
        let segments = vec![
            segment(0.9, 40, BlockType::SectionHeader),
            segment(0.5, 300, BlockType::Paragraph),
            segment(0.6, 20, BlockType::ListItem),
        ];
        let resonance = engine.analyze_resonance(&segments, &[1.0; 128]);
        for (r, s) in resonance.iter().zip(segment_signal(&segments)) {
            assert!((r - s).abs() < TOL);
        }
        assert!(engine.analyze_resonance(&[], &[1.0; 128]).is_empty());
    }

    #[test]
    fn test_power_spectrum_and_accessors() {
        let engine = SpectralEngine::new();
        let spectrum = engine.transform_signal(&[1.0, 1.0, 1.0, 1.0]);
        let power = engine.power_spectrum(&spectrum);
        assert!((power[0] - 4.0).abs() < TOL);
        assert!(power[1..].iter().all(|p| p.abs() < TOL));
        assert_eq!(spectrum.real_part().len(), 4);
        assert_eq!(spectrum.imaginary_part().len(), 4);
        assert_eq!(spectrum.magnitude_at(10), 0.0);
        assert_eq!(spectrum.phase_at(10), 0.0);
        assert!(spectrum.phase_at(0).abs() < TOL);
    }

    #[test]
    fn test_band_energy_last_band_absorbs_remainder() {
        let engine = SpectralEngine::new();
        let spectrum = engine.transform_signal(&test_signal(10));
        let power = engine.power_spectrum(&spectrum);
        let bands = engine.band_energy(&spectrum, 3).unwrap();
        assert_eq!(bands.len(), 3);
        let expected_last = power[6..].iter().sum::<f64>() / 4.0;
        assert!((bands[2] - expected_last).abs() < TOL);
        let expected_first = power[..3].iter().sum::<f64>() / 3.0;
        assert!((bands[0] - expected_first).abs() < TOL);
    }

    #[test]
    fn test_band_energy_rejects_bad_band_count() {
        let engine = SpectralEngine::new();
        let spectrum = engine.transform_signal(&test_signal(4));
        assert!(matches!(
            engine.band_energy(&spectrum, 0),
            Err(ResonanceError::InvalidBandCount { .. })
        ));
        assert!(engine.band_energy(&spectrum, 5).is_err());
    }

    #[test]
    fn test_from_parts_size_mismatch() {
        let err = Spectrum::from_parts(vec![0.0; 5], 3, &[]).unwrap_err();
        assert!(matches!(
            err,
            ResonanceError::SpectrumSizeMismatch { expected: 6, actual: 5 }
        ));
        assert!(Spectrum::from_parts(vec![0.0; 6], 3, &[]).is_ok());
    }
}
