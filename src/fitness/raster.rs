//! Polygon rendering oracle
//!
//! Decodes a solution into coloured polygons, rasterizes them onto a black
//! RGB canvas and scores the result against a reference image. Larger
//! costs always mean a larger difference.
//!
//! Gene layout per polygon: `vertices` pairs of `(x, y)` as fractions of
//! the canvas, followed by red, green, blue and alpha as fractions of 255.

use std::path::Path;
use std::str::FromStr;

use image::{ImageFormat, ImageResult, Rgb, RgbImage};
use serde::{Deserialize, Serialize};

use crate::error::{SearchError, SearchResult};
use crate::fitness::traits::ObjectiveOracle;
use crate::genome::bounds::MultiBounds;
use crate::genome::solution::Solution;

/// Colour and alpha genes that follow the vertex genes of each polygon
const COLOR_GENES: usize = 4;
/// Side of the square SSIM window
const SSIM_WINDOW: usize = 7;

/// Shape of the polygon encoding
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolygonLayout {
    /// Number of polygons
    pub polygons: usize,
    /// Vertices per polygon
    pub vertices: usize,
}

impl PolygonLayout {
    pub fn new(polygons: usize, vertices: usize) -> SearchResult<Self> {
        if polygons == 0 {
            return Err(SearchError::Configuration(
                "polygon count must be at least 1".to_string(),
            ));
        }
        if vertices < 3 {
            return Err(SearchError::Configuration(format!(
                "a polygon needs at least 3 vertices, got {vertices}"
            )));
        }
        Ok(Self { polygons, vertices })
    }

    /// Genes used by one polygon
    pub fn genes_per_polygon(&self) -> usize {
        self.vertices * 2 + COLOR_GENES
    }

    /// Length of a solution vector for this layout
    pub fn param_count(&self) -> usize {
        self.polygons * self.genes_per_polygon()
    }

    /// Solution domain: `[0, 1]` for every gene
    pub fn bounds(&self) -> MultiBounds {
        MultiBounds::unit(self.param_count())
    }
}

/// An 8-bit RGB image stored row-major
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RasterImage {
    width: usize,
    height: usize,
    pixels: Vec<[u8; 3]>,
}

impl RasterImage {
    pub fn new(width: usize, height: usize, pixels: Vec<[u8; 3]>) -> SearchResult<Self> {
        if width == 0 || height == 0 {
            return Err(SearchError::Configuration(
                "image dimensions must be non-zero".to_string(),
            ));
        }
        if pixels.len() != width * height {
            return Err(SearchError::Configuration(format!(
                "expected {} pixels for a {width}x{height} image, got {}",
                width * height,
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Build from interleaved RGB bytes
    pub fn from_rgb_bytes(width: usize, height: usize, bytes: &[u8]) -> SearchResult<Self> {
        if bytes.len() % 3 != 0 {
            return Err(SearchError::Configuration(
                "RGB byte buffer length must be a multiple of 3".to_string(),
            ));
        }
        let pixels = bytes.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect();
        Self::new(width, height, pixels)
    }

    /// Decode an image file, dropping any alpha channel
    pub fn open(path: impl AsRef<Path>) -> SearchResult<Self> {
        let decoded = image::open(path)?.to_rgb8();
        let (width, height) = decoded.dimensions();
        Self::from_rgb_bytes(width as usize, height as usize, decoded.as_raw())
    }

    pub fn to_rgb_image(&self) -> RgbImage {
        RgbImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            Rgb(self.pixel(x as usize, y as usize))
        })
    }

    /// Encode as PNG
    pub fn save_png(&self, path: impl AsRef<Path>) -> ImageResult<()> {
        self.to_rgb_image().save_with_format(path, ImageFormat::Png)
    }

    /// Place `other` to the right of this image on a black canvas tall
    /// enough for both
    pub fn side_by_side(&self, other: &RasterImage) -> RasterImage {
        let width = self.width + other.width;
        let height = self.height.max(other.height);
        let mut joined = Self::black(width, height);
        for (offset, part) in [(0, self), (self.width, other)] {
            for y in 0..part.height {
                let row = &part.pixels[y * part.width..(y + 1) * part.width];
                let start = y * width + offset;
                joined.pixels[start..start + part.width].copy_from_slice(row);
            }
        }
        joined
    }

    /// An all-black canvas
    pub fn black(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![[0, 0, 0]; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixel_count(&self) -> usize {
        self.pixels.len()
    }

    pub fn pixels(&self) -> &[[u8; 3]] {
        &self.pixels
    }

    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        self.pixels[y * self.width + x]
    }

    fn blend(&mut self, x: usize, y: usize, color: [u8; 3], alpha: u8) {
        let dst = &mut self.pixels[y * self.width + x];
        let a = alpha as u32;
        for c in 0..3 {
            let mixed = (color[c] as u32 * a + dst[c] as u32 * (255 - a) + 127) / 255;
            dst[c] = mixed as u8;
        }
    }

    /// Fill a polygon with even-odd scanlines sampled at pixel centres
    fn fill_polygon(&mut self, vertices: &[(f64, f64)], color: [u8; 3], alpha: u8) {
        if alpha == 0 {
            return;
        }
        let mut crossings: Vec<f64> = Vec::with_capacity(vertices.len());
        for row in 0..self.height {
            let yc = row as f64 + 0.5;
            crossings.clear();
            for i in 0..vertices.len() {
                let (x0, y0) = vertices[i];
                let (x1, y1) = vertices[(i + 1) % vertices.len()];
                if (y0 <= yc && y1 > yc) || (y1 <= yc && y0 > yc) {
                    crossings.push(x0 + (yc - y0) * (x1 - x0) / (y1 - y0));
                }
            }
            crossings.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            for span in crossings.chunks_exact(2) {
                let start = (span[0] - 0.5).ceil().max(0.0) as usize;
                let end = (span[1] - 0.5).floor();
                if end < 0.0 {
                    continue;
                }
                let end = (end as usize).min(self.width - 1);
                for col in start..=end {
                    self.blend(col, row, color, alpha);
                }
            }
        }
    }
}

/// Quantize a `[0, 1]` gene into a byte the way an 8-bit canvas would
fn channel(gene: f64) -> u8 {
    (gene * 255.0).clamp(0.0, 255.0) as u8
}

/// Rasterize a solution onto a black canvas of the given size
pub fn render(
    layout: &PolygonLayout,
    solution: &Solution,
    width: usize,
    height: usize,
) -> RasterImage {
    let mut canvas = RasterImage::black(width, height);
    let mut vertices = Vec::with_capacity(layout.vertices);
    for poly in solution.genes().chunks_exact(layout.genes_per_polygon()) {
        vertices.clear();
        for v in 0..layout.vertices {
            let x = (poly[2 * v] * width as f64).trunc();
            let y = (poly[2 * v + 1] * height as f64).trunc();
            vertices.push((x, y));
        }
        let base = layout.vertices * 2;
        let color = [
            channel(poly[base]),
            channel(poly[base + 1]),
            channel(poly[base + 2]),
        ];
        canvas.fill_polygon(&vertices, color, channel(poly[base + 3]));
    }
    canvas
}

/// Image-difference metric; larger values always mean a larger difference
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectiveMetric {
    /// Sum of squared channel differences per pixel
    Mse,
    /// One minus mean structural similarity
    Ssim,
    /// One minus peak signal-to-noise ratio over 100
    Psnr,
    /// Sum of absolute channel differences
    Loss,
    /// Inverse of the percentage of loss recovered relative to a blank canvas
    Cp,
}

impl FromStr for ObjectiveMetric {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "MSE" => Ok(Self::Mse),
            "SSIM" => Ok(Self::Ssim),
            "PSNR" => Ok(Self::Psnr),
            "LOSS" => Ok(Self::Loss),
            "CP" => Ok(Self::Cp),
            _ => Err(SearchError::UnsupportedMethod {
                kind: "objective metric",
                name: s.to_string(),
            }),
        }
    }
}

impl ObjectiveMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mse => "MSE",
            Self::Ssim => "SSIM",
            Self::Psnr => "PSNR",
            Self::Loss => "LOSS",
            Self::Cp => "CP",
        }
    }

    /// Difference between a rendered image and the reference
    pub fn difference(
        &self,
        generated: &RasterImage,
        reference: &RasterImage,
    ) -> SearchResult<f64> {
        if generated.width != reference.width || generated.height != reference.height {
            return Err(SearchError::Objective(format!(
                "image size mismatch: {}x{} vs {}x{}",
                generated.width, generated.height, reference.width, reference.height
            )));
        }
        match self {
            Self::Mse => Ok(squared_error(generated, reference) / reference.pixel_count() as f64),
            Self::Psnr => {
                let channels = (reference.pixel_count() * 3) as f64;
                let mse = squared_error(generated, reference) / channels;
                let psnr = if mse == 0.0 {
                    100.0
                } else {
                    20.0 * (255.0 / mse.sqrt()).log10()
                };
                Ok(1.0 - psnr / 100.0)
            }
            Self::Loss => Ok(absolute_error(generated, reference)),
            Self::Cp => {
                let blank = RasterImage::black(reference.width, reference.height);
                let max_loss = absolute_error(reference, &blank);
                let loss = absolute_error(generated, reference);
                let cp = if max_loss == 0.0 {
                    if loss == 0.0 {
                        100.0
                    } else {
                        0.0
                    }
                } else {
                    100.0 * (max_loss - loss) / max_loss
                };
                Ok(1.0 / (cp + 1.0))
            }
            Self::Ssim => Ok(1.0 - mean_ssim(generated, reference)?),
        }
    }
}

fn squared_error(a: &RasterImage, b: &RasterImage) -> f64 {
    a.pixels
        .iter()
        .zip(&b.pixels)
        .flat_map(|(p, q)| (0..3).map(move |c| (p[c] as f64 - q[c] as f64).powi(2)))
        .sum()
}

fn absolute_error(a: &RasterImage, b: &RasterImage) -> f64 {
    a.pixels
        .iter()
        .zip(&b.pixels)
        .flat_map(|(p, q)| (0..3).map(move |c| (p[c] as f64 - q[c] as f64).abs()))
        .sum()
}

/// Mean SSIM over every fully contained 7x7 window of every channel
fn mean_ssim(a: &RasterImage, b: &RasterImage) -> SearchResult<f64> {
    if a.width < SSIM_WINDOW || a.height < SSIM_WINDOW {
        return Err(SearchError::Objective(format!(
            "SSIM needs images of at least {SSIM_WINDOW}x{SSIM_WINDOW}"
        )));
    }
    let c1 = (0.01f64 * 255.0).powi(2);
    let c2 = (0.03f64 * 255.0).powi(2);
    let n = (SSIM_WINDOW * SSIM_WINDOW) as f64;
    let cov_norm = n / (n - 1.0);

    let mut total = 0.0;
    let mut windows = 0usize;
    for c in 0..3 {
        for top in 0..=(a.height - SSIM_WINDOW) {
            for left in 0..=(a.width - SSIM_WINDOW) {
                let (mut sx, mut sy, mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0, 0.0, 0.0);
                for y in top..top + SSIM_WINDOW {
                    for x in left..left + SSIM_WINDOW {
                        let u = a.pixel(x, y)[c] as f64;
                        let v = b.pixel(x, y)[c] as f64;
                        sx += u;
                        sy += v;
                        sxx += u * u;
                        syy += v * v;
                        sxy += u * v;
                    }
                }
                let (mx, my) = (sx / n, sy / n);
                let vx = cov_norm * (sxx / n - mx * mx);
                let vy = cov_norm * (syy / n - my * my);
                let vxy = cov_norm * (sxy / n - mx * my);
                let num = (2.0 * mx * my + c1) * (2.0 * vxy + c2);
                let den = (mx * mx + my * my + c1) * (vx + vy + c2);
                total += num / den;
                windows += 1;
            }
        }
    }
    Ok(total / windows as f64)
}

/// Oracle that scores polygon encodings against a reference image
#[derive(Clone, Debug)]
pub struct RasterObjective {
    layout: PolygonLayout,
    reference: RasterImage,
    metric: ObjectiveMetric,
}

impl RasterObjective {
    pub fn new(layout: PolygonLayout, reference: RasterImage, metric: ObjectiveMetric) -> Self {
        Self {
            layout,
            reference,
            metric,
        }
    }

    /// Build with the metric given by name, failing on unknown names
    pub fn with_metric_name(
        layout: PolygonLayout,
        reference: RasterImage,
        metric: &str,
    ) -> SearchResult<Self> {
        Ok(Self::new(layout, reference, metric.parse()?))
    }

    pub fn layout(&self) -> &PolygonLayout {
        &self.layout
    }

    pub fn metric(&self) -> ObjectiveMetric {
        self.metric
    }

    pub fn reference(&self) -> &RasterImage {
        &self.reference
    }

    /// Render a solution at the reference resolution
    pub fn render(&self, solution: &Solution) -> RasterImage {
        render(
            &self.layout,
            solution,
            self.reference.width,
            self.reference.height,
        )
    }
}

impl ObjectiveOracle for RasterObjective {
    fn cost(&self, solution: &Solution) -> SearchResult<f64> {
        if solution.len() != self.layout.param_count() {
            return Err(SearchError::Objective(format!(
                "expected {} genes, got {}",
                self.layout.param_count(),
                solution.len()
            )));
        }
        self.metric.difference(&self.render(solution), &self.reference)
    }

    fn name(&self) -> &str {
        self.metric.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_square(color: [f64; 4]) -> Vec<f64> {
        // Two triangles covering the whole canvas
        let mut genes = vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0];
        genes.extend_from_slice(&color);
        genes.extend_from_slice(&[0.0, 0.0, 1.0, 1.0, 0.0, 1.0]);
        genes.extend_from_slice(&color);
        genes
    }

    #[test]
    fn test_layout_param_count() {
        let layout = PolygonLayout::new(100, 3).unwrap();
        assert_eq!(layout.param_count(), 1000);
        assert_eq!(layout.bounds().dimension(), 1000);
    }

    #[test]
    fn test_layout_rejects_degenerate_shapes() {
        assert!(PolygonLayout::new(0, 3).is_err());
        assert!(PolygonLayout::new(10, 2).is_err());
    }

    #[test]
    fn test_metric_names() {
        assert_eq!("MSE".parse::<ObjectiveMetric>().unwrap(), ObjectiveMetric::Mse);
        assert_eq!("ssim".parse::<ObjectiveMetric>().unwrap(), ObjectiveMetric::Ssim);
        let err = "UQI".parse::<ObjectiveMetric>().unwrap_err();
        assert!(matches!(err, SearchError::UnsupportedMethod { .. }));
    }

    #[test]
    fn test_opaque_cover_fills_canvas() {
        let layout = PolygonLayout::new(2, 3).unwrap();
        let solution = Solution::new(full_square([1.0, 0.0, 0.0, 1.0]));
        let image = render(&layout, &solution, 8, 8);
        assert!(image.pixels().iter().all(|p| *p == [255, 0, 0]));
    }

    #[test]
    fn test_transparent_polygon_leaves_canvas_black() {
        let layout = PolygonLayout::new(2, 3).unwrap();
        let solution = Solution::new(full_square([1.0, 1.0, 1.0, 0.0]));
        let image = render(&layout, &solution, 8, 8);
        assert_eq!(image, RasterImage::black(8, 8));
    }

    #[test]
    fn test_identical_images_have_zero_cost() {
        let layout = PolygonLayout::new(2, 3).unwrap();
        let solution = Solution::new(full_square([0.0, 1.0, 0.0, 1.0]));
        let reference = render(&layout, &solution, 8, 8);
        for metric in [ObjectiveMetric::Mse, ObjectiveMetric::Loss, ObjectiveMetric::Psnr] {
            let oracle = RasterObjective::new(layout, reference.clone(), metric);
            assert_eq!(oracle.cost(&solution).unwrap(), 0.0);
        }
        let ssim = RasterObjective::new(layout, reference.clone(), ObjectiveMetric::Ssim);
        assert!(ssim.cost(&solution).unwrap().abs() < 1e-12);
        let cp = RasterObjective::new(layout, reference, ObjectiveMetric::Cp);
        assert!((cp.cost(&solution).unwrap() - 1.0 / 101.0).abs() < 1e-12);
    }

    #[test]
    fn test_mse_of_black_against_white() {
        let layout = PolygonLayout::new(2, 3).unwrap();
        let white = RasterImage::new(4, 4, vec![[255, 255, 255]; 16]).unwrap();
        let oracle = RasterObjective::new(layout, white, ObjectiveMetric::Mse);
        let transparent = Solution::new(full_square([0.0, 0.0, 0.0, 0.0]));
        assert_eq!(oracle.cost(&transparent).unwrap(), 3.0 * 255.0 * 255.0);
    }

    #[test]
    fn test_wrong_solution_length_is_an_objective_error() {
        let layout = PolygonLayout::new(2, 3).unwrap();
        let oracle = RasterObjective::new(layout, RasterImage::black(4, 4), ObjectiveMetric::Mse);
        let result = oracle.cost(&Solution::new(vec![0.5; 3]));
        assert!(matches!(result, Err(SearchError::Objective(_))));
    }

    #[test]
    fn test_from_rgb_bytes_checks_length() {
        assert!(RasterImage::from_rgb_bytes(2, 2, &[0; 12]).is_ok());
        assert!(RasterImage::from_rgb_bytes(2, 2, &[0; 9]).is_err());
    }

    #[test]
    fn test_png_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reference.png");
        let pixels = (0..12u8).map(|i| [i * 20, 255 - i * 20, i]).collect();
        let image = RasterImage::new(4, 3, pixels).unwrap();

        image.save_png(&path).unwrap();
        let loaded = RasterImage::open(&path).unwrap();
        assert_eq!(loaded, image);
    }

    #[test]
    fn test_open_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = RasterImage::open(dir.path().join("absent.png"));
        assert!(matches!(result, Err(SearchError::Image(_))));
    }

    #[test]
    fn test_side_by_side_pads_shorter_image() {
        let left = RasterImage::new(2, 2, vec![[10, 10, 10]; 4]).unwrap();
        let right = RasterImage::new(1, 3, vec![[200, 0, 0]; 3]).unwrap();
        let joined = left.side_by_side(&right);
        assert_eq!((joined.width(), joined.height()), (3, 3));
        assert_eq!(joined.pixel(1, 1), [10, 10, 10]);
        assert_eq!(joined.pixel(2, 2), [200, 0, 0]);
        assert_eq!(joined.pixel(0, 2), [0, 0, 0]);
    }
}
