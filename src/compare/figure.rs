//! Explicit rendering context for side-by-side image panels.

use std::path::Path;

use image::{imageops, Rgb, RgbImage};
use ndarray::{ArrayView3, Axis};

use crate::error::{Error, Result};
use crate::image::{to_rgb_image, GRAY_CHANNELS};

/// Horizontal spacing between panels, in pixels.
pub const DEFAULT_GAP: u32 = 8;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

/// One titled image inside a [`Figure`].
#[derive(Debug, Clone)]
pub struct Panel {
    title: String,
    image: RgbImage,
    grayscale: bool,
}

impl Panel {
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Rendered pixels, values clamped to [0, 1] before scaling.
    #[must_use]
    pub const fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Whether the panel was drawn from a single channel with a gray colormap.
    #[must_use]
    pub const fn is_grayscale(&self) -> bool {
        self.grayscale
    }
}

/// A row of image panels, rendered left to right.
#[derive(Debug, Clone)]
pub struct Figure {
    panels: Vec<Panel>,
    gap: u32,
}

impl Default for Figure {
    fn default() -> Self {
        Self::new()
    }
}

impl Figure {
    #[must_use]
    pub const fn new() -> Self {
        Self::with_gap(DEFAULT_GAP)
    }

    #[must_use]
    pub const fn with_gap(gap: u32) -> Self {
        Self {
            panels: Vec::new(),
            gap,
        }
    }

    /// Append a panel showing an `[H, W, 1]` or `[H, W, 3]` image.
    ///
    /// Pixel values are mapped from [0, 1] with clipping outside that range.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel count is neither 1 nor 3.
    pub fn imshow(&mut self, image: ArrayView3<'_, f32>, title: impl Into<String>) -> Result<()> {
        let grayscale = image.len_of(Axis(2)) == GRAY_CHANNELS;
        let rendered = to_rgb_image(image)?;

        self.panels.push(Panel {
            title: title.into(),
            image: rendered,
            grayscale,
        });

        Ok(())
    }

    #[must_use]
    pub fn panels(&self) -> &[Panel] {
        &self.panels
    }

    /// Compose all panels side by side on a white background.
    ///
    /// # Errors
    ///
    /// Returns an error if the combined width does not fit in a `u32`.
    pub fn render(&self) -> Result<RgbImage> {
        let width = self
            .panels
            .iter()
            .enumerate()
            .try_fold(0_u32, |width, (i, panel)| {
                let gap = if i == 0 { 0 } else { self.gap };
                width.checked_add(gap)?.checked_add(panel.image.width())
            })
            .ok_or_else(|| Error::InvalidParameter {
                name: "gap".to_string(),
                reason: format!(
                    "{} panels with a gap of {} px exceed the maximum canvas width",
                    self.panels.len(),
                    self.gap
                ),
            })?;
        let height = self
            .panels
            .iter()
            .map(|panel| panel.image.height())
            .max()
            .unwrap_or(0);

        let mut canvas = RgbImage::from_pixel(width, height, BACKGROUND);

        let mut x = 0_i64;
        for panel in &self.panels {
            imageops::replace(&mut canvas, &panel.image, x, 0);
            x += i64::from(panel.image.width()) + i64::from(self.gap);
        }

        Ok(canvas)
    }

    /// Render the figure and write it to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the figure cannot be rendered or the image cannot
    /// be written.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        let titles: Vec<&str> = self.panels.iter().map(Panel::title).collect();
        tracing::info!("Saving figure {titles:?} to {}", path.display());

        self.render()?.save(path).map_err(|source| Error::ImageSave {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_render_side_by_side() {
        let mut figure = Figure::new();
        figure
            .imshow(Array3::from_elem((16, 16, 3), 0.0).view(), "left")
            .unwrap();
        figure
            .imshow(Array3::from_elem((10, 16, 1), 1.0).view(), "right")
            .unwrap();

        let canvas = figure.render().unwrap();
        assert_eq!(canvas.dimensions(), (40, 16));
        assert_eq!(canvas.get_pixel(0, 0), &Rgb([0, 0, 0]));
        assert_eq!(canvas.get_pixel(20, 0), &BACKGROUND);
        assert_eq!(canvas.get_pixel(24, 0), &Rgb([255, 255, 255]));
        assert_eq!(canvas.get_pixel(30, 12), &BACKGROUND);
    }

    #[test]
    fn test_panel_metadata() {
        let mut figure = Figure::with_gap(0);
        figure
            .imshow(Array3::from_elem((2, 2, 1), 0.5).view(), "gray")
            .unwrap();

        let panel = &figure.panels()[0];
        assert_eq!(panel.title(), "gray");
        assert!(panel.is_grayscale());
        assert_eq!(panel.image().get_pixel(1, 1), &Rgb([128, 128, 128]));
    }

    #[test]
    fn test_values_are_clipped() {
        let mut figure = Figure::new();
        figure
            .imshow(Array3::from_elem((1, 1, 3), 3.0).view(), "bright")
            .unwrap();

        assert_eq!(figure.panels()[0].image().get_pixel(0, 0), &Rgb([255, 255, 255]));
    }

    #[test]
    fn test_rejects_unsupported_channels() {
        let mut figure = Figure::new();
        let result = figure.imshow(Array3::<f32>::zeros((2, 2, 4)).view(), "rgba");

        assert!(matches!(
            result,
            Err(Error::UnsupportedChannels { channels: 4, .. })
        ));
        assert!(figure.panels().is_empty());
    }

    #[test]
    fn test_empty_figure_renders_empty() {
        assert_eq!(Figure::new().render().unwrap().dimensions(), (0, 0));
    }

    #[test]
    fn test_render_width_overflow() {
        let mut figure = Figure::with_gap(u32::MAX);
        figure
            .imshow(Array3::from_elem((2, 2, 3), 0.5).view(), "a")
            .unwrap();
        assert_eq!(figure.render().unwrap().dimensions(), (2, 2));

        figure
            .imshow(Array3::from_elem((2, 2, 3), 0.5).view(), "b")
            .unwrap();
        assert!(matches!(
            figure.render(),
            Err(Error::InvalidParameter { ref name, .. }) if name == "gap"
        ));

        let dir = tempfile::tempdir().unwrap();
        assert!(figure.save(dir.path().join("wide.png")).is_err());
    }

    #[test]
    fn test_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("figure.png");
        let mut figure = Figure::new();
        figure
            .imshow(Array3::from_elem((4, 4, 3), 0.5).view(), "a")
            .unwrap();
        figure.save(&path).unwrap();

        assert_eq!(image::open(&path).unwrap().width(), 4);
    }
}
