//! Spectrogram heatmap

use std::path::Path;

use plotters::prelude::*;

use super::{ensure_font, ChartError, CHART_SIZE, FONT_FAMILY};
use crate::analysis::spectrum::Spectrogram;

/// Dark-to-bright color stops for dB values
const COLOR_STOPS: [(f32, (u8, u8, u8)); 5] = [
    (0.0, (0, 0, 4)),
    (0.25, (81, 18, 124)),
    (0.5, (183, 55, 121)),
    (0.75, (252, 137, 97)),
    (1.0, (252, 253, 191)),
];

/// Map `fraction` in `0.0..=1.0` onto the color ramp
fn ramp_color(fraction: f32) -> RGBColor {
    let f = fraction.clamp(0.0, 1.0);
    for pair in COLOR_STOPS.windows(2) {
        let (lo, (r0, g0, b0)) = pair[0];
        let (hi, (r1, g1, b1)) = pair[1];
        if f <= hi {
            let t = if hi > lo { (f - lo) / (hi - lo) } else { 0.0 };
            let lerp = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
            return RGBColor(lerp(r0, r1), lerp(g0, g1), lerp(b0, b1));
        }
    }
    let (_, (r, g, b)) = COLOR_STOPS[COLOR_STOPS.len() - 1];
    RGBColor(r, g, b)
}

pub fn render_spectrogram(path: &Path, title: &str, spectrogram: &Spectrogram) -> Result<(), ChartError> {
    let time_cells = spectrogram.time_cells();
    let freq_cells = spectrogram.freq_cells();
    if time_cells == 0 || freq_cells == 0 {
        return Err(ChartError::EmptyData("spectrogram"));
    }

    let cells = &spectrogram.db;
    let duration = spectrogram.duration_seconds.max(f32::EPSILON);
    let cell_seconds = duration / time_cells as f32;
    let cell_hz = spectrogram.max_frequency_hz / freq_cells as f32;
    let min_db = spectrogram.min_db();
    let span = if min_db < 0.0 { -min_db } else { 1.0 };

    ensure_font()?;
    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut ctx = ChartBuilder::on(&root)
        .caption(title, (FONT_FAMILY, 22))
        .margin(15)
        .x_label_area_size(35)
        .y_label_area_size(65)
        .build_cartesian_2d(0f32..duration, 0f32..spectrogram.max_frequency_hz)?;

    ctx.configure_mesh()
        .disable_mesh()
        .x_desc("Time (s)")
        .y_desc("Frequency (Hz)")
        .draw()?;

    ctx.draw_series(cells.iter().enumerate().flat_map(|(ti, column)| {
        column.iter().enumerate().map(move |(fi, &db)| {
            let x0 = ti as f32 * cell_seconds;
            let y0 = fi as f32 * cell_hz;
            Rectangle::new(
                [(x0, y0), (x0 + cell_seconds, y0 + cell_hz)],
                ramp_color((db - min_db) / span).filled(),
            )
        })
    }))?;

    root.present()?;
    tracing::debug!(path = %path.display(), time_cells, freq_cells, "Spectrogram written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic(time_cells: usize, freq_cells: usize) -> Spectrogram {
        Spectrogram {
            db: (0..time_cells)
                .map(|f| (0..freq_cells).map(|b| -(((f + b) % 80) as f32)).collect())
                .collect(),
            duration_seconds: 0.5,
            max_frequency_hz: 8000.0,
            peak_magnitude: 1.0,
        }
    }

    #[test]
    fn test_ramp_endpoints() {
        assert_eq!(ramp_color(0.0), RGBColor(0, 0, 4));
        assert_eq!(ramp_color(1.0), RGBColor(252, 253, 191));
        assert_eq!(ramp_color(2.0), RGBColor(252, 253, 191));
    }

    #[test]
    fn test_render_writes_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("spectrum.png");

        render_spectrogram(&path, "Spectrum", &synthetic(50, 129)).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
    }

    #[test]
    fn test_empty_spectrogram_is_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = render_spectrogram(&dir.path().join("s.png"), "Spectrum", &synthetic(0, 0));
        assert!(matches!(result, Err(ChartError::EmptyData(_))));
    }
}
