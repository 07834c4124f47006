//! Structural similarity (SSIM) and its multiscale variant.
//!
//! Both follow the usual Gaussian-window formulation: an 11x11 window with
//! sigma 1.5, VALID filtering (no padding), `C1 = (k1 * L)^2` and
//! `C2 = (k2 * L)^2`. Images are `[H, W, C]`; scores are computed per channel
//! and averaged.

use ndarray::{Array2, ArrayView2, ArrayView3, Axis, Zip};

use crate::error::{Error, Result};

/// Weights of the five scales of multiscale SSIM, finest first.
pub const MS_SSIM_POWER_FACTORS: [f32; 5] = [0.0448, 0.2856, 0.3001, 0.2363, 0.1333];

/// Parameters of the SSIM computation.
#[derive(Debug, Clone, PartialEq)]
pub struct SsimConfig {
    /// Dynamic range of the pixel values.
    pub max_val: f32,

    /// Side length of the Gaussian window.
    pub filter_size: usize,

    /// Standard deviation of the Gaussian window.
    pub filter_sigma: f32,

    /// Luminance stabilizer.
    pub k1: f32,

    /// Contrast stabilizer.
    pub k2: f32,

    /// Per-scale exponents for multiscale SSIM. The number of entries is the
    /// number of scales.
    pub power_factors: Vec<f32>,
}

impl Default for SsimConfig {
    fn default() -> Self {
        Self {
            max_val: 1.0,
            filter_size: 11,
            filter_sigma: 1.5,
            k1: 0.01,
            k2: 0.03,
            power_factors: MS_SSIM_POWER_FACTORS.to_vec(),
        }
    }
}

impl SsimConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any parameter is out of valid range.
    pub fn validate(&self) -> Result<()> {
        if self.max_val <= 0.0 || !self.max_val.is_finite() {
            return Err(invalid("max_val", "must be a positive finite number"));
        }

        if self.filter_size == 0 {
            return Err(invalid("filter_size", "must be greater than 0"));
        }

        if self.filter_sigma <= 0.0 || !self.filter_sigma.is_finite() {
            return Err(invalid("filter_sigma", "must be a positive finite number"));
        }

        if self.k1 <= 0.0 || self.k2 <= 0.0 {
            return Err(invalid("k1/k2", "must be greater than 0"));
        }

        if self.power_factors.is_empty() {
            return Err(invalid("power_factors", "at least one scale is required"));
        }

        Ok(())
    }

    /// Smallest side length multiscale SSIM accepts with this configuration.
    #[must_use]
    pub fn min_ms_ssim_size(&self) -> usize {
        let halvings = self.power_factors.len().saturating_sub(1);
        self.filter_size.saturating_sub(1) * (1 << halvings) + 1
    }

    fn c1(&self) -> f32 {
        (self.k1 * self.max_val).powi(2)
    }

    fn c2(&self) -> f32 {
        (self.k2 * self.max_val).powi(2)
    }
}

fn invalid(name: &str, reason: &str) -> Error {
    Error::InvalidParameter {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

/// Single-scale SSIM of two images with the same `[H, W, C]` shape.
///
/// # Errors
///
/// Returns an error if the shapes differ, the images are smaller than the
/// filter window, or the configuration is invalid.
pub fn ssim(a: ArrayView3<'_, f32>, b: ArrayView3<'_, f32>, config: &SsimConfig) -> Result<f32> {
    check_pair(a, b)?;
    config.validate()?;

    let kernel = gaussian_kernel(config.filter_size, config.filter_sigma);
    let channels = a.len_of(Axis(2));

    let mut total = 0.0_f64;
    for c in 0..channels {
        let (ssim, _) = ssim_components(
            a.index_axis(Axis(2), c),
            b.index_axis(Axis(2), c),
            &kernel,
            config,
        )?;
        total += f64::from(ssim);
    }

    Ok(channel_mean(total, channels))
}

/// Multiscale SSIM of two images with the same `[H, W, C]` shape.
///
/// Each scale after the first halves the image with 2x2 average pooling,
/// repeating the last row or column when a side is odd. The
/// contrast-structure terms of all but the coarsest scale and the full SSIM
/// of the coarsest scale are clamped at zero, raised to their power factor
/// and multiplied.
///
/// # Errors
///
/// Returns an error if the shapes differ, the coarsest scale is smaller than
/// the filter window, or the configuration is invalid.
pub fn ms_ssim(a: ArrayView3<'_, f32>, b: ArrayView3<'_, f32>, config: &SsimConfig) -> Result<f32> {
    check_pair(a, b)?;
    config.validate()?;

    let kernel = gaussian_kernel(config.filter_size, config.filter_sigma);
    let channels = a.len_of(Axis(2));
    let scales = config.power_factors.len();

    let mut total = 0.0_f64;
    for c in 0..channels {
        let mut x = a.index_axis(Axis(2), c).to_owned();
        let mut y = b.index_axis(Axis(2), c).to_owned();
        let mut value = 1.0_f64;

        for (scale, &weight) in config.power_factors.iter().enumerate() {
            if scale > 0 {
                x = downsample(x.view());
                y = downsample(y.view());
            }

            let (ssim, cs) = ssim_components(x.view(), y.view(), &kernel, config)?;
            let term = if scale + 1 == scales { ssim } else { cs };
            value *= f64::from(term.max(0.0)).powf(f64::from(weight));
        }

        total += value;
    }

    Ok(channel_mean(total, channels))
}

fn check_pair(a: ArrayView3<'_, f32>, b: ArrayView3<'_, f32>) -> Result<()> {
    if a.shape() != b.shape() {
        return Err(Error::ShapeMismatch {
            expected: format!("{:?}", a.shape()),
            actual: format!("{:?}", b.shape()),
        });
    }
    Ok(())
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn channel_mean(total: f64, channels: usize) -> f32 {
    if channels == 0 {
        return 0.0;
    }
    (total / channels as f64) as f32
}

/// Mean SSIM and mean contrast-structure term of one channel.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn ssim_components(
    x: ArrayView2<'_, f32>,
    y: ArrayView2<'_, f32>,
    kernel: &[f32],
    config: &SsimConfig,
) -> Result<(f32, f32)> {
    let (height, width) = x.dim();
    let window = kernel.len();
    if height < window || width < window {
        return Err(Error::ImageTooSmall {
            height,
            width,
            window,
        });
    }

    let mu_x = filter_valid(x, kernel);
    let mu_y = filter_valid(y, kernel);
    let xx = filter_valid((&x * &x).view(), kernel);
    let yy = filter_valid((&y * &y).view(), kernel);
    let xy = filter_valid((&x * &y).view(), kernel);

    let c1 = config.c1();
    let c2 = config.c2();

    let mut ssim_sum = 0.0_f64;
    let mut cs_sum = 0.0_f64;

    Zip::from(&mu_x)
        .and(&mu_y)
        .and(&xx)
        .and(&yy)
        .and(&xy)
        .for_each(|&mx, &my, &sxx, &syy, &sxy| {
            let mean_product = 2.0 * mx * my;
            let luminance = (mean_product + c1) / (mx.mul_add(mx, my * my) + c1);
            let cs = 2.0_f32.mul_add(sxy, -mean_product) + c2;
            let cs = cs / (sxx + syy - mx.mul_add(mx, my * my) + c2);

            ssim_sum += f64::from(luminance * cs);
            cs_sum += f64::from(cs);
        });

    let count = mu_x.len() as f64;
    Ok(((ssim_sum / count) as f32, (cs_sum / count) as f32))
}

/// Normalized 1-D Gaussian; the 2-D window is its outer product.
#[allow(clippy::cast_precision_loss)]
fn gaussian_kernel(size: usize, sigma: f32) -> Vec<f32> {
    let center = (size as f32 - 1.0) / 2.0;
    let weights: Vec<f32> = (0..size)
        .map(|i| {
            let d = i as f32 - center;
            (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect();

    let sum: f32 = weights.iter().sum();
    weights.into_iter().map(|w| w / sum).collect()
}

/// Separable Gaussian filtering without padding.
fn filter_valid(plane: ArrayView2<'_, f32>, kernel: &[f32]) -> Array2<f32> {
    let (height, width) = plane.dim();
    let n = kernel.len();

    let horizontal = Array2::from_shape_fn((height, width + 1 - n), |(i, j)| {
        kernel
            .iter()
            .enumerate()
            .map(|(k, &g)| g * plane[[i, j + k]])
            .sum::<f32>()
    });

    Array2::from_shape_fn((height + 1 - n, width + 1 - n), |(i, j)| {
        kernel
            .iter()
            .enumerate()
            .map(|(k, &g)| g * horizontal[[i + k, j]])
            .sum::<f32>()
    })
}

/// 2x2 average pooling, repeating the last row/column of odd-sized planes.
fn downsample(plane: ArrayView2<'_, f32>) -> Array2<f32> {
    let (height, width) = plane.dim();

    Array2::from_shape_fn((height.div_ceil(2), width.div_ceil(2)), |(i, j)| {
        let rows = [2 * i, (2 * i + 1).min(height - 1)];
        let cols = [2 * j, (2 * j + 1).min(width - 1)];
        let sum: f32 = rows
            .iter()
            .flat_map(|&r| cols.iter().map(move |&c| plane[[r, c]]))
            .sum();
        sum / 4.0
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array3};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn noise_image(height: usize, width: usize, channels: usize, seed: u64) -> Array3<f32> {
        let mut rng = StdRng::seed_from_u64(seed);
        Array3::from_shape_fn((height, width, channels), |_| rng.random::<f32>())
    }

    fn perturb(image: &Array3<f32>, amount: f32, seed: u64) -> Array3<f32> {
        let mut rng = StdRng::seed_from_u64(seed);
        image.mapv(|v| amount.mul_add(rng.random::<f32>() - 0.5, v).clamp(0.0, 1.0))
    }

    #[test]
    fn test_gaussian_kernel() {
        let kernel = gaussian_kernel(11, 1.5);

        assert_eq!(kernel.len(), 11);
        assert!((kernel.iter().sum::<f32>() - 1.0).abs() < 1e-6);
        assert!((kernel[0] - kernel[10]).abs() < 1e-9);
        assert!(kernel[5] > kernel[4]);
    }

    #[test]
    fn test_filter_valid_shape() {
        let plane = Array2::<f32>::ones((20, 15));
        let filtered = filter_valid(plane.view(), &gaussian_kernel(11, 1.5));

        assert_eq!(filtered.dim(), (10, 5));
        assert!(filtered.iter().all(|&v| (v - 1.0).abs() < 1e-5));
    }

    #[test]
    fn test_downsample_odd_size() {
        let plane = array![[0.0_f32, 4.0, 8.0], [4.0, 8.0, 12.0], [8.0, 12.0, 16.0]];
        let down = downsample(plane.view());

        assert_eq!(down, array![[4.0, 10.0], [10.0, 16.0]]);
    }

    #[test]
    fn test_identical_images() {
        let image = noise_image(32, 32, 1, 1);
        let score = ssim(image.view(), image.view(), &SsimConfig::default()).unwrap();

        assert!((score - 1.0).abs() < 1e-4, "score = {score}");
    }

    #[test]
    fn test_ssim_is_symmetric() {
        let a = noise_image(24, 24, 3, 2);
        let b = perturb(&a, 0.4, 3);
        let config = SsimConfig::default();

        let ab = ssim(a.view(), b.view(), &config).unwrap();
        let ba = ssim(b.view(), a.view(), &config).unwrap();
        assert!((ab - ba).abs() < 1e-5);
    }

    #[test]
    fn test_ssim_drops_with_noise() {
        let a = noise_image(32, 32, 1, 4);
        let config = SsimConfig::default();

        let mild = ssim(a.view(), perturb(&a, 0.1, 5).view(), &config).unwrap();
        let strong = ssim(a.view(), perturb(&a, 0.8, 6).view(), &config).unwrap();

        assert!(mild < 1.0);
        assert!(strong < mild);
    }

    #[test]
    fn test_constant_images_luminance_only() {
        let a = Array3::from_elem((16, 16, 1), 0.2_f32);
        let b = Array3::from_elem((16, 16, 1), 0.8_f32);
        let score = ssim(a.view(), b.view(), &SsimConfig::default()).unwrap();

        // (2 * 0.16 + C1) / (0.04 + 0.64 + C1) with C1 = 1e-4
        assert!((score - 0.470_67).abs() < 1e-3, "score = {score}");
    }

    #[test]
    fn test_image_smaller_than_window() {
        let a = Array3::<f32>::zeros((8, 32, 1));
        let result = ssim(a.view(), a.view(), &SsimConfig::default());

        assert!(matches!(
            result,
            Err(Error::ImageTooSmall {
                height: 8,
                window: 11,
                ..
            })
        ));
    }

    #[test]
    fn test_shape_mismatch() {
        let a = Array3::<f32>::zeros((16, 16, 1));
        let b = Array3::<f32>::zeros((16, 16, 3));

        assert!(matches!(
            ssim(a.view(), b.view(), &SsimConfig::default()),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_ms_ssim_identical() {
        let image = noise_image(176, 176, 3, 7);
        let score = ms_ssim(image.view(), image.view(), &SsimConfig::default()).unwrap();

        assert!((score - 1.0).abs() < 1e-4, "score = {score}");
    }

    #[test]
    fn test_ms_ssim_drops_with_noise() {
        let a = noise_image(176, 176, 3, 8);
        let b = perturb(&a, 0.5, 9);
        let score = ms_ssim(a.view(), b.view(), &SsimConfig::default()).unwrap();

        assert!(score < 0.99);
        assert!(score >= 0.0);
    }

    #[test]
    fn test_ms_ssim_minimum_size() {
        let config = SsimConfig::default();
        assert_eq!(config.min_ms_ssim_size(), 161);

        let small = Array3::<f32>::zeros((160, 160, 3));
        assert!(matches!(
            ms_ssim(small.view(), small.view(), &config),
            Err(Error::ImageTooSmall { window: 11, .. })
        ));
    }

    #[test]
    fn test_single_scale_ms_ssim_is_ssim() {
        let a = noise_image(20, 20, 1, 10);
        let b = perturb(&a, 0.2, 11);
        let config = SsimConfig {
            power_factors: vec![1.0],
            ..SsimConfig::default()
        };

        let single = ssim(a.view(), b.view(), &config).unwrap();
        let multi = ms_ssim(a.view(), b.view(), &config).unwrap();
        assert!((single.max(0.0) - multi).abs() < 1e-5);
    }

    #[test]
    fn test_invalid_config() {
        let config = SsimConfig {
            filter_size: 0,
            ..SsimConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidParameter { .. })
        ));

        let config = SsimConfig {
            power_factors: Vec::new(),
            ..SsimConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
