use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use super::error::RenderError;

const DEFAULT_BINS: usize = 40;
const WIDTH: u32 = 1000;
const HEIGHT: u32 = 500;
const PADDING: f64 = 40.0;

pub trait HistogramRenderer {
    fn render(&self, samples: &[f64], output_path: &Path) -> Result<(), RenderError>;
}

#[derive(Debug, Clone, Copy)]
pub struct SvgHistogramRenderer {
    bins: usize,
}

impl Default for SvgHistogramRenderer {
    fn default() -> Self {
        Self { bins: DEFAULT_BINS }
    }
}

impl SvgHistogramRenderer {
    pub fn with_bins(bins: usize) -> Self {
        Self {
            bins: bins.clamp(5, 200),
        }
    }
}

impl HistogramRenderer for SvgHistogramRenderer {
    fn render(&self, samples: &[f64], output_path: &Path) -> Result<(), RenderError> {
        let counts = bin_counts(samples, self.bins).ok_or(RenderError::NoFiniteSamples)?;
        fs::write(output_path, draw_svg(&counts))?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
struct BinCounts {
    min: f64,
    max: f64,
    counts: Vec<usize>,
}

fn bin_counts(samples: &[f64], bins: usize) -> Option<BinCounts> {
    let finite = samples.iter().copied().filter(|v| v.is_finite());
    let (min, max) = finite.fold(None, |acc: Option<(f64, f64)>, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })?;

    let mut counts = vec![0usize; bins];
    let span = max - min;
    for v in samples.iter().copied().filter(|v| v.is_finite()) {
        let idx = if span == 0.0 {
            0
        } else {
            (((v - min) / span) * bins as f64).floor() as usize
        };
        counts[idx.min(bins - 1)] += 1;
    }

    Some(BinCounts { min, max, counts })
}

fn draw_svg(bins: &BinCounts) -> String {
    let width = WIDTH as f64;
    let height = HEIGHT as f64;
    let plot_width = width - 2.0 * PADDING;
    let plot_height = height - 2.0 * PADDING;
    let max_count = bins.counts.iter().copied().max().unwrap_or(0).max(1) as f64;
    let bar_width = plot_width / bins.counts.len() as f64;

    let mut svg = String::new();
    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}">"#
    );
    let _ = write!(
        svg,
        r##"<rect width="{WIDTH}" height="{HEIGHT}" fill="#ffffff" />"##
    );

    for (i, count) in bins.counts.iter().enumerate() {
        let h = (*count as f64 / max_count) * plot_height;
        let x = PADDING + i as f64 * bar_width;
        let y = height - PADDING - h;
        let _ = write!(
            svg,
            r##"<rect x="{x:.2}" y="{y:.2}" width="{w:.2}" height="{h:.2}" fill="#1f77b4" stroke="#ffffff" stroke-width="0.5" />"##,
            w = bar_width,
        );
    }

    let axis_y = height - PADDING;
    let _ = write!(
        svg,
        r##"<line x1="{PADDING}" y1="{axis_y}" x2="{x2}" y2="{axis_y}" stroke="#333333" />"##,
        x2 = width - PADDING,
    );
    let _ = write!(
        svg,
        r##"<text x="{PADDING}" y="{ty}" font-size="12" fill="#333333">{min:.4}</text>"##,
        ty = axis_y + 16.0,
        min = bins.min,
    );
    let _ = write!(
        svg,
        r##"<text x="{tx}" y="{ty}" font-size="12" fill="#333333" text-anchor="end">{max:.4}</text>"##,
        tx = width - PADDING,
        ty = axis_y + 16.0,
        max = bins.max,
    );
    svg.push_str("</svg>\n");
    svg
}
