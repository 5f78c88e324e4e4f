use crate::config::Settings;
use crate::field::ScalarField;
use anyhow::{Context, Result};
use image::imageops::FilterType;
use log::warn;
use rayon::prelude::*;
use std::sync::OnceLock;

const HUE_DEGREES_PER_SECOND: f32 = 50.0;
const RAY_STEP_DEGREES: f32 = 5.0;
const RAY_HALF_WIDTH: f32 = 1.0;
const BLOOM_SIGMA_SCALE: f32 = 10.0;
const PAR_THRESHOLD_DEFAULT: usize = 65_536;

fn parallel_threshold() -> usize {
    static THRESHOLD: OnceLock<usize> = OnceLock::new();
    *THRESHOLD.get_or_init(|| {
        std::env::var("SWIRL_PAR_THRESHOLD")
            .ok()
            .and_then(|value| value.parse::<usize>().ok())
            .filter(|value| *value > 0)
            .unwrap_or(PAR_THRESHOLD_DEFAULT)
    })
}

fn should_parallel(len: usize) -> bool {
    len >= parallel_threshold()
}

pub struct Visuals {
    width: usize,
    height: usize,
    base: Vec<f32>,
    bloom: Vec<f32>,
    scratch: Vec<f32>,
    ray_mask: Vec<f32>,
    background: Option<Vec<u8>>,
}

impl Visuals {
    pub fn new(width: usize, height: usize, settings: &Settings) -> Self {
        let background = settings.background_image.as_ref().and_then(|path| {
            match load_background(path, width, height) {
                Ok(data) => Some(data),
                Err(err) => {
                    warn!("{err:#}, falling back to the background color");
                    None
                }
            }
        });
        Self {
            width,
            height,
            base: vec![0.0; width * height * 3],
            bloom: vec![0.0; width * height * 3],
            scratch: vec![0.0; width * height * 3],
            ray_mask: build_ray_mask(width, height),
            background,
        }
    }

    pub fn render(
        &mut self,
        density: &ScalarField,
        elapsed_seconds: f32,
        settings: &Settings,
        frame: &mut [u8],
    ) {
        self.fill_base(density, elapsed_seconds, settings);
        if settings.bloom {
            self.apply_bloom(settings);
        }
        if settings.sunrays {
            self.apply_sunrays(settings.sunrays_weight);
        }
        self.write_frame(settings, frame);
    }

    fn fill_base(&mut self, density: &ScalarField, elapsed_seconds: f32, settings: &Settings) {
        let width = self.width;
        let height = self.height;
        let side = density.side() as f32;
        let tint = if settings.colorful {
            let hue = (elapsed_seconds * HUE_DEGREES_PER_SECOND).rem_euclid(360.0);
            hsv_to_rgb(hue, 1.0, 1.0)
        } else {
            (1.0, 1.0, 1.0)
        };
        let row_fill = |y: usize, row: &mut [f32]| {
            let gy = (y as f32 + 0.5) * side / height as f32 - 0.5;
            for x in 0..width {
                let gx = (x as f32 + 0.5) * side / width as f32 - 0.5;
                let value = density.sample_linear(gx, gy).clamp(0.0, 255.0);
                row[x * 3] = value * tint.0;
                row[x * 3 + 1] = value * tint.1;
                row[x * 3 + 2] = value * tint.2;
            }
        };
        if should_parallel(width * height) {
            self.base
                .par_chunks_mut(width * 3)
                .enumerate()
                .for_each(|(y, row)| row_fill(y, row));
        } else {
            for (y, row) in self.base.chunks_mut(width * 3).enumerate() {
                row_fill(y, row);
            }
        }
    }

    fn apply_bloom(&mut self, settings: &Settings) {
        let cutoff = settings.bloom_threshold * 255.0;
        for (bloom, base) in self.bloom.chunks_mut(3).zip(self.base.chunks(3)) {
            let mean = (base[0] + base[1] + base[2]) / 3.0;
            if mean > cutoff {
                bloom.copy_from_slice(base);
            } else {
                bloom.fill(0.0);
            }
        }
        let sigma = (settings.bloom_intensity * BLOOM_SIGMA_SCALE).max(0.5);
        let kernel = gaussian_kernel(sigma);
        blur_rows(&self.bloom, &mut self.scratch, self.width, &kernel);
        blur_columns(&self.scratch, &mut self.bloom, self.width, self.height, &kernel);
        for (base, bloom) in self.base.iter_mut().zip(self.bloom.iter()) {
            *base += bloom;
        }
    }

    fn apply_sunrays(&mut self, weight: f32) {
        let weight = weight.clamp(0.0, 1.0);
        let keep = 1.0 - weight;
        for (pixel, mask) in self.base.chunks_mut(3).zip(self.ray_mask.iter()) {
            let gain = keep + mask * weight;
            pixel[0] *= gain;
            pixel[1] *= gain;
            pixel[2] *= gain;
        }
    }

    fn write_frame(&self, settings: &Settings, frame: &mut [u8]) {
        let width = self.width;
        assert_eq!(frame.len(), width * self.height * 4);
        let solid = settings.background_color;
        let background = self.background.as_deref();
        let write_row = |y: usize, row: &mut [u8]| {
            for x in 0..width {
                let i = y * width + x;
                let bg = match background {
                    Some(data) => [data[i * 3], data[i * 3 + 1], data[i * 3 + 2]],
                    None => solid,
                };
                for c in 0..3 {
                    let value = bg[c] as f32 + self.base[i * 3 + c];
                    row[x * 4 + c] = value.clamp(0.0, 255.0) as u8;
                }
                row[x * 4 + 3] = 255;
            }
        };
        if should_parallel(width * self.height) {
            frame
                .par_chunks_mut(width * 4)
                .enumerate()
                .for_each(|(y, row)| write_row(y, row));
        } else {
            for (y, row) in frame.chunks_mut(width * 4).enumerate() {
                write_row(y, row);
            }
        }
    }
}

fn load_background(path: &str, width: usize, height: usize) -> Result<Vec<u8>> {
    let img = image::open(path).with_context(|| format!("loading background image {path}"))?;
    let resized = image::imageops::resize(
        &img.to_rgb8(),
        width as u32,
        height as u32,
        FilterType::Triangle,
    );
    Ok(resized.into_raw())
}

fn gaussian_kernel(sigma: f32) -> Vec<f32> {
    let radius = (sigma * 3.0).ceil() as i32;
    let denom = 2.0 * sigma * sigma;
    let mut kernel: Vec<f32> = (-radius..=radius)
        .map(|offset| (-(offset * offset) as f32 / denom).exp())
        .collect();
    let total: f32 = kernel.iter().sum();
    for weight in &mut kernel {
        *weight /= total;
    }
    kernel
}

fn blur_rows(src: &[f32], dst: &mut [f32], width: usize, kernel: &[f32]) {
    let radius = (kernel.len() / 2) as i32;
    let blur_row = |row_src: &[f32], row_dst: &mut [f32]| {
        for x in 0..width {
            let mut acc = [0.0f32; 3];
            for (k, weight) in kernel.iter().enumerate() {
                let sx = (x as i32 + k as i32 - radius).clamp(0, width as i32 - 1) as usize;
                acc[0] += row_src[sx * 3] * weight;
                acc[1] += row_src[sx * 3 + 1] * weight;
                acc[2] += row_src[sx * 3 + 2] * weight;
            }
            row_dst[x * 3..x * 3 + 3].copy_from_slice(&acc);
        }
    };
    if should_parallel(src.len()) {
        dst.par_chunks_mut(width * 3)
            .zip(src.par_chunks(width * 3))
            .for_each(|(row_dst, row_src)| blur_row(row_src, row_dst));
    } else {
        for (row_dst, row_src) in dst.chunks_mut(width * 3).zip(src.chunks(width * 3)) {
            blur_row(row_src, row_dst);
        }
    }
}

fn blur_columns(src: &[f32], dst: &mut [f32], width: usize, height: usize, kernel: &[f32]) {
    let radius = (kernel.len() / 2) as i32;
    let blur_row = |y: usize, row_dst: &mut [f32]| {
        for x in 0..width {
            let mut acc = [0.0f32; 3];
            for (k, weight) in kernel.iter().enumerate() {
                let sy = (y as i32 + k as i32 - radius).clamp(0, height as i32 - 1) as usize;
                let i = (sy * width + x) * 3;
                acc[0] += src[i] * weight;
                acc[1] += src[i + 1] * weight;
                acc[2] += src[i + 2] * weight;
            }
            row_dst[x * 3..x * 3 + 3].copy_from_slice(&acc);
        }
    };
    if should_parallel(src.len()) {
        dst.par_chunks_mut(width * 3)
            .enumerate()
            .for_each(|(y, row_dst)| blur_row(y, row_dst));
    } else {
        for (y, row_dst) in dst.chunks_mut(width * 3).enumerate() {
            blur_row(y, row_dst);
        }
    }
}

fn build_ray_mask(width: usize, height: usize) -> Vec<f32> {
    let cx = width as f32 * 0.5;
    let cy = height as f32 * 0.5;
    (0..width * height)
        .map(|i| {
            let x = (i % width) as f32 + 0.5;
            let y = (i / width) as f32 + 0.5;
            let dx = x - cx;
            let dy = y - cy;
            let r = (dx * dx + dy * dy).sqrt();
            if r < 1.0 {
                return 1.0;
            }
            let angle = dy.atan2(dx).to_degrees().rem_euclid(RAY_STEP_DEGREES);
            let off_axis = angle.min(RAY_STEP_DEGREES - angle).to_radians();
            let distance = r * off_axis.sin();
            (RAY_HALF_WIDTH + 0.5 - distance).clamp(0.0, 1.0)
        })
        .collect()
}

fn hsv_to_rgb(hue: f32, saturation: f32, value: f32) -> (f32, f32, f32) {
    let c = value * saturation;
    let h = hue / 60.0;
    let x = c * (1.0 - (h.rem_euclid(2.0) - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = value - c;
    (r + m, g + m, b + m)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f32, b: f32, tol: f32) {
        assert!(
            (a - b).abs() <= tol,
            "expected {a} to be within {tol} of {b}"
        );
    }

    fn plain_settings() -> Settings {
        Settings {
            colorful: false,
            bloom: false,
            sunrays: false,
            background_image: None,
            ..Settings::default()
        }
    }

    #[test]
    fn hsv_primaries_are_exact() {
        assert_eq!(hsv_to_rgb(0.0, 1.0, 1.0), (1.0, 0.0, 0.0));
        assert_eq!(hsv_to_rgb(120.0, 1.0, 1.0), (0.0, 1.0, 0.0));
        assert_eq!(hsv_to_rgb(240.0, 1.0, 1.0), (0.0, 0.0, 1.0));
    }

    #[test]
    fn gaussian_kernel_is_normalized_and_symmetric() {
        let kernel = gaussian_kernel(2.0);
        let total: f32 = kernel.iter().sum();
        assert_close(total, 1.0, 1e-5);
        assert_eq!(kernel.len() % 2, 1);
        for (a, b) in kernel.iter().zip(kernel.iter().rev()) {
            assert_close(*a, *b, 1e-6);
        }
    }

    #[test]
    fn ray_mask_is_full_at_the_center() {
        let mask = build_ray_mask(32, 32);
        assert_close(mask[16 * 32 + 16], 1.0, 1e-6);
    }

    #[test]
    fn ray_mask_fades_between_rays() {
        let mask = build_ray_mask(64, 64);
        // (62, 33) sits about 2.2 degrees off the horizontal ray, 30 pixels
        // from the center, well clear of the adjacent ray at 5 degrees.
        assert!(mask[33 * 64 + 62] < 0.5);
    }

    #[test]
    fn monochrome_render_is_gray() {
        let settings = plain_settings();
        let mut visuals = Visuals::new(8, 8, &settings);
        let density = ScalarField::from_fn(4, |_x, _y| 100.0);
        let mut frame = vec![0u8; 8 * 8 * 4];
        visuals.render(&density, 0.0, &settings, &mut frame);
        for pixel in frame.chunks(4) {
            assert_eq!(pixel[0], pixel[1]);
            assert_eq!(pixel[1], pixel[2]);
            assert_eq!(pixel[3], 255);
            assert!(pixel[0] > 0);
        }
    }

    #[test]
    fn colorful_render_applies_the_hue_tint() {
        let mut settings = plain_settings();
        settings.colorful = true;
        let mut visuals = Visuals::new(4, 4, &settings);
        let density = ScalarField::from_fn(4, |_x, _y| 200.0);
        let mut frame = vec![0u8; 4 * 4 * 4];
        // Hue 0 at t = 0 is pure red.
        visuals.render(&density, 0.0, &settings, &mut frame);
        assert!(frame[0] > 0);
        assert_eq!(frame[1], 0);
        assert_eq!(frame[2], 0);
    }

    #[test]
    fn background_color_shows_through_empty_density() {
        let mut settings = plain_settings();
        settings.background_color = [10, 20, 30];
        let mut visuals = Visuals::new(4, 4, &settings);
        let density = ScalarField::new(4);
        let mut frame = vec![0u8; 4 * 4 * 4];
        visuals.render(&density, 0.0, &settings, &mut frame);
        assert_eq!(&frame[..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn bloom_spreads_bright_pixels() {
        let mut settings = plain_settings();
        settings.bloom_threshold = 0.5;
        settings.bloom_intensity = 0.2;
        let mut visuals = Visuals::new(9, 9, &settings);
        let center = (4 * 9 + 4) * 3;
        visuals.base[center] = 255.0;
        visuals.base[center + 1] = 255.0;
        visuals.base[center + 2] = 255.0;
        visuals.apply_bloom(&settings);
        assert!(visuals.base[center] > 255.0);
        let neighbor = (4 * 9 + 5) * 3;
        assert!(visuals.base[neighbor] > 0.0);
    }

    #[test]
    fn bloom_ignores_dim_pixels() {
        let mut settings = plain_settings();
        settings.bloom_threshold = 0.9;
        settings.bloom_intensity = 0.2;
        let mut visuals = Visuals::new(9, 9, &settings);
        let center = (4 * 9 + 4) * 3;
        visuals.base[center] = 100.0;
        visuals.base[center + 1] = 100.0;
        visuals.base[center + 2] = 100.0;
        visuals.apply_bloom(&settings);
        assert_close(visuals.base[center], 100.0, 1e-4);
        let neighbor = (4 * 9 + 5) * 3;
        assert_close(visuals.base[neighbor], 0.0, 1e-4);
    }

    #[test]
    fn sunrays_dim_pixels_off_the_rays() {
        let settings = plain_settings();
        let mut visuals = Visuals::new(64, 64, &settings);
        visuals.base.fill(100.0);
        let off_ray = (33 * 64 + 62) * 3;
        let center = (32 * 64 + 32) * 3;
        visuals.apply_sunrays(0.9);
        assert!(visuals.base[off_ray] < visuals.base[center]);
        assert_close(visuals.base[center], 100.0, 1e-3);
    }
}
