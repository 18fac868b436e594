//! Template matching by normalized cross-correlation.
//!
//! The score at an alignment is the correlation coefficient between the
//! template and the image window under it (both mean-centred), so it lies
//! in `[-1, 1]` and is insensitive to uniform brightness and contrast
//! changes. Window sums come from integral images. The cross term is a
//! frequency-domain correlation against the centred template, computed
//! with `rustfft`; tiny templates are correlated directly instead.

use crate::core::decode::FastDecoder;
use crate::error::{ComparisonError, DecodeError};
use image::GrayImage;
use imageproc::integral_image::{integral_image, integral_squared_image};
use rayon::prelude::*;
use rustfft::num_complex::Complex;
use rustfft::{FftDirection, FftPlanner};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Variance below this is treated as a flat patch that cannot correlate
const FLAT_EPSILON: f64 = 1e-9;

/// Templates up to this many pixels skip the FFT
const DIRECT_TEMPLATE_PIXELS: usize = 64;

/// A grayscale template, mean-centred once up front
#[derive(Debug, Clone)]
pub struct Template {
    width: u32,
    height: u32,
    centred: Vec<f64>,
    norm: f64,
}

impl Template {
    pub fn new(gray: &GrayImage) -> Self {
        let (width, height) = gray.dimensions();
        let n = (width as f64 * height as f64).max(1.0);
        let mean = gray.as_raw().iter().map(|&v| v as f64).sum::<f64>() / n;
        let centred: Vec<f64> = gray.as_raw().iter().map(|&v| v as f64 - mean).collect();
        let norm = centred.iter().map(|v| v * v).sum::<f64>().sqrt();

        Self {
            width,
            height,
            centred,
            norm,
        }
    }

    /// Decode a template file and convert it to grayscale
    pub fn load(path: &Path) -> Result<Self, DecodeError> {
        Ok(Self::new(&FastDecoder::decode_luma(path)?))
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// A template with no contrast matches nothing
    pub fn is_flat(&self) -> bool {
        self.norm <= FLAT_EPSILON
    }
}

/// Best alignment of a template within an image
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchScore {
    pub score: f32,
    pub x: u32,
    pub y: u32,
}

/// Slide `template` over every alignment inside `image` and return the
/// highest correlation coefficient.
pub fn best_match(
    path: &Path,
    image: &GrayImage,
    template: &Template,
) -> Result<MatchScore, ComparisonError> {
    let (image_width, image_height) = image.dimensions();
    let (tw, th) = template.dimensions();

    if tw == 0 || th == 0 || tw > image_width || th > image_height {
        return Err(ComparisonError::TemplateLargerThanImage {
            path: path.to_path_buf(),
            template_width: tw,
            template_height: th,
            image_width,
            image_height,
        });
    }

    let sums = integral_image::<_, u64>(image);
    let squares = integral_squared_image::<_, u64>(image);
    let window_sum = |integral: &image::ImageBuffer<image::Luma<u64>, Vec<u64>>, x: u32, y: u32| {
        let a = integral.get_pixel(x, y)[0];
        let b = integral.get_pixel(x + tw, y)[0];
        let c = integral.get_pixel(x, y + th)[0];
        let d = integral.get_pixel(x + tw, y + th)[0];
        ((a + d) - (b + c)) as f64
    };

    let n = tw as f64 * th as f64;
    let columns = (image_width - tw + 1) as usize;
    let cross = cross_terms(image, template);

    let best = (0..=image_height - th)
        .into_par_iter()
        .map(|y| {
            let mut row_best = MatchScore {
                score: f32::NEG_INFINITY,
                x: 0,
                y,
            };

            for x in 0..=image_width - tw {
                let sum = window_sum(&sums, x, y);
                let sum_sq = window_sum(&squares, x, y);
                let variance = sum_sq - sum * sum / n;

                let score = if variance <= FLAT_EPSILON || template.is_flat() {
                    0.0
                } else {
                    let cross = cross[y as usize * columns + x as usize];
                    (cross / (variance.sqrt() * template.norm)).clamp(-1.0, 1.0)
                };

                if score as f32 > row_best.score {
                    row_best = MatchScore {
                        score: score as f32,
                        x,
                        y,
                    };
                }
            }

            row_best
        })
        .reduce_with(|a, b| if b.score > a.score { b } else { a })
        .unwrap_or(MatchScore {
            score: 0.0,
            x: 0,
            y: 0,
        });

    Ok(best)
}

/// `sum(image[x + i, y + j] * centred[i, j])` for every alignment, row-major
/// over the `(W - tw + 1) x (H - th + 1)` alignments.
fn cross_terms(image: &GrayImage, template: &Template) -> Vec<f64> {
    if template.centred.len() <= DIRECT_TEMPLATE_PIXELS {
        direct_cross_terms(image, template)
    } else {
        fft_cross_terms(image, template)
    }
}

fn direct_cross_terms(image: &GrayImage, template: &Template) -> Vec<f64> {
    let (width, height) = image.dimensions();
    let (tw, th) = template.dimensions();
    let columns = (width - tw + 1) as usize;
    let rows = (height - th + 1) as usize;
    let (stride, tw, th) = (width as usize, tw as usize, th as usize);
    let pixels = image.as_raw();

    let mut out = vec![0.0; columns * rows];
    out.par_chunks_mut(columns).enumerate().for_each(|(y, row)| {
        for (x, cell) in row.iter_mut().enumerate() {
            *cell = (0..th)
                .map(|j| {
                    let start = (y + j) * stride + x;
                    pixels[start..start + tw]
                        .iter()
                        .zip(&template.centred[j * tw..(j + 1) * tw])
                        .map(|(&p, &t)| p as f64 * t)
                        .sum::<f64>()
                })
                .sum();
        }
    });
    out
}

/// Circular correlation over an image-sized grid. Valid alignments never
/// wrap because `x + i < W` and `y + j < H`.
fn fft_cross_terms(image: &GrayImage, template: &Template) -> Vec<f64> {
    let (width, height) = image.dimensions();
    let (tw, th) = template.dimensions();
    let columns = (width - tw + 1) as usize;
    let rows = (height - th + 1) as usize;
    let (width, height, tw) = (width as usize, height as usize, tw as usize);

    let mut spectrum: Vec<Complex<f64>> = image
        .as_raw()
        .iter()
        .map(|&p| Complex::new(p as f64, 0.0))
        .collect();
    let mut kernel = vec![Complex::new(0.0, 0.0); width * height];
    for (j, row) in template.centred.chunks(tw).enumerate() {
        for (i, &t) in row.iter().enumerate() {
            kernel[j * width + i] = Complex::new(t, 0.0);
        }
    }

    let mut planner = FftPlanner::<f64>::new();
    fft_2d(&mut planner, &mut spectrum, width, height, FftDirection::Forward);
    fft_2d(&mut planner, &mut kernel, width, height, FftDirection::Forward);
    spectrum
        .par_iter_mut()
        .zip(kernel.par_iter())
        .for_each(|(s, k)| *s *= k.conj());
    fft_2d(&mut planner, &mut spectrum, width, height, FftDirection::Inverse);

    let scale = 1.0 / (width * height) as f64;
    let mut out = Vec::with_capacity(columns * rows);
    for y in 0..rows {
        let start = y * width;
        out.extend(spectrum[start..start + columns].iter().map(|c| c.re * scale));
    }
    out
}

/// Unnormalized 2-D transform of a row-major `width x height` grid
fn fft_2d(
    planner: &mut FftPlanner<f64>,
    data: &mut [Complex<f64>],
    width: usize,
    height: usize,
    direction: FftDirection,
) {
    let along_rows = planner.plan_fft(width, direction);
    data.par_chunks_mut(width).for_each(|row| along_rows.process(row));

    let mut columns = transpose(data, width, height);
    let along_columns = planner.plan_fft(height, direction);
    columns
        .par_chunks_mut(height)
        .for_each(|column| along_columns.process(column));

    data.copy_from_slice(&transpose(&columns, height, width));
}

fn transpose(data: &[Complex<f64>], width: usize, height: usize) -> Vec<Complex<f64>> {
    let mut out = vec![Complex::new(0.0, 0.0); data.len()];
    for y in 0..height {
        for x in 0..width {
            out[x * height + y] = data[y * width + x];
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    /// Noise-like background so windows are rarely flat
    fn background(width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| {
            Luma([((x * 37 + y * 91 + (x * y) % 13) % 200) as u8])
        })
    }

    fn logo() -> GrayImage {
        GrayImage::from_fn(6, 4, |x, y| Luma([if (x + y) % 3 == 0 { 250 } else { 5 }]))
    }

    fn paste(target: &mut GrayImage, patch: &GrayImage, ox: u32, oy: u32) {
        for (x, y, p) in patch.enumerate_pixels() {
            target.put_pixel(ox + x, oy + y, *p);
        }
    }

    #[test]
    fn embedded_template_scores_one_at_its_location() {
        let mut image = background(40, 30);
        paste(&mut image, &logo(), 21, 17);

        let m = best_match(Path::new("slide.png"), &image, &Template::new(&logo())).unwrap();

        assert!(m.score > 0.999, "score was {}", m.score);
        assert_eq!((m.x, m.y), (21, 17));
    }

    #[test]
    fn brightness_shift_does_not_change_score() {
        let mut image = background(40, 30);
        let brighter = GrayImage::from_fn(6, 4, |x, y| Luma([logo().get_pixel(x, y)[0] / 2 + 60]));
        paste(&mut image, &brighter, 3, 2);

        let m = best_match(Path::new("slide.png"), &image, &Template::new(&logo())).unwrap();

        assert!(m.score > 0.999, "score was {}", m.score);
    }

    #[test]
    fn flat_image_scores_zero() {
        let image = GrayImage::from_pixel(20, 20, Luma([128]));
        let m = best_match(Path::new("blank.png"), &image, &Template::new(&logo())).unwrap();
        assert_eq!(m.score, 0.0);
    }

    #[test]
    fn flat_template_never_matches() {
        let template = Template::new(&GrayImage::from_pixel(4, 4, Luma([10])));
        assert!(template.is_flat());

        let m = best_match(Path::new("slide.png"), &background(20, 20), &template).unwrap();
        assert_eq!(m.score, 0.0);
    }

    #[test]
    fn template_larger_than_image_is_an_error() {
        let image = background(5, 3);
        let err = best_match(Path::new("tiny.png"), &image, &Template::new(&logo())).unwrap_err();
        assert!(matches!(err, ComparisonError::TemplateLargerThanImage { .. }));
    }

    #[test]
    fn template_same_size_as_image_has_one_alignment() {
        let m = best_match(Path::new("logo.png"), &logo(), &Template::new(&logo())).unwrap();
        assert!(m.score > 0.999);
        assert_eq!((m.x, m.y), (0, 0));
    }

    /// Wide template that takes the frequency-domain path
    fn banner() -> GrayImage {
        GrayImage::from_fn(24, 9, |x, y| {
            Luma([if (x / 3 + y / 2) % 2 == 0 { 240 } else { 20 }])
        })
    }

    #[test]
    fn large_template_is_found_through_the_frequency_domain() {
        assert!(banner().as_raw().len() > DIRECT_TEMPLATE_PIXELS);
        let mut image = background(97, 61);
        paste(&mut image, &banner(), 50, 33);

        let m = best_match(Path::new("slide.png"), &image, &Template::new(&banner())).unwrap();

        assert!(m.score > 0.999, "score was {}", m.score);
        assert_eq!((m.x, m.y), (50, 33));
    }

    #[test]
    fn direct_and_frequency_cross_terms_agree() {
        let image = background(53, 37);
        let template = Template::new(&banner());

        let direct = direct_cross_terms(&image, &template);
        let fft = fft_cross_terms(&image, &template);

        assert_eq!(direct.len(), (53 - 24 + 1) * (37 - 9 + 1));
        assert_eq!(direct.len(), fft.len());
        for (d, f) in direct.iter().zip(&fft) {
            assert!((d - f).abs() < 1e-6 * d.abs().max(1e3), "{} vs {}", d, f);
        }
    }
}
