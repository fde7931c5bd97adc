//! Line and waveform charts

use std::path::Path;

use plotters::prelude::*;

use super::{
    ensure_font, min_max_envelope, padded_range, ChartError, ACCENT_COLOR, CHART_SIZE, FONT_FAMILY,
    WAVEFORM_COLUMNS, WAVE_COLOR,
};

/// A single series over time
#[derive(Debug, Clone)]
pub struct LineChart<'a> {
    pub title: String,
    pub y_label: &'a str,
    /// `(time_seconds, value)`
    pub points: &'a [(f32, f32)],
    /// Fixed x extent; defaults to the span of the points
    pub duration_seconds: Option<f32>,
    /// Fixed y extent; defaults to the padded span of the points
    pub y_range: Option<std::ops::Range<f32>>,
}

/// Amplitude over time, optionally marking one sample
#[derive(Debug, Clone)]
pub struct WaveformChart<'a> {
    pub title: String,
    pub samples: &'a [f32],
    pub sample_rate: u32,
    /// `(time_seconds, value)` to highlight
    pub marker: Option<(f32, f32)>,
}

pub fn render_line_chart(path: &Path, chart: &LineChart<'_>) -> Result<(), ChartError> {
    let x_end = chart
        .duration_seconds
        .or_else(|| chart.points.last().map(|&(t, _)| t))
        .filter(|&t| t > 0.0)
        .unwrap_or(1.0);
    let y_range = chart
        .y_range
        .clone()
        .unwrap_or_else(|| padded_range(chart.points.iter().map(|&(_, v)| v)));

    ensure_font()?;
    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut ctx = ChartBuilder::on(&root)
        .caption(&chart.title, (FONT_FAMILY, 22))
        .margin(15)
        .x_label_area_size(35)
        .y_label_area_size(55)
        .build_cartesian_2d(0f32..x_end, y_range)?;

    ctx.configure_mesh()
        .x_desc("Time (s)")
        .y_desc(chart.y_label)
        .draw()?;

    ctx.draw_series(LineSeries::new(chart.points.iter().copied(), WAVE_COLOR.stroke_width(2)))?;

    root.present()?;
    tracing::debug!(path = %path.display(), points = chart.points.len(), "Line chart written");
    Ok(())
}

pub fn render_waveform(path: &Path, chart: &WaveformChart<'_>) -> Result<(), ChartError> {
    if chart.samples.is_empty() {
        return Err(ChartError::EmptyData("waveform"));
    }

    let envelope = min_max_envelope(chart.samples, WAVEFORM_COLUMNS);
    let duration = chart.samples.len() as f32 / chart.sample_rate as f32;
    let column_seconds = duration / envelope.len() as f32;

    let peak = chart.samples.iter().fold(0.0f32, |acc, &s| acc.max(s.abs()));
    let limit = if peak > 0.0 { peak * 1.1 } else { 1.0 };

    ensure_font()?;
    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut ctx = ChartBuilder::on(&root)
        .caption(&chart.title, (FONT_FAMILY, 22))
        .margin(15)
        .x_label_area_size(35)
        .y_label_area_size(55)
        .build_cartesian_2d(0f32..duration, -limit..limit)?;

    ctx.configure_mesh()
        .x_desc("Time (s)")
        .y_desc("Amplitude")
        .draw()?;

    ctx.draw_series(envelope.iter().enumerate().map(|(i, &(lo, hi))| {
        let t = i as f32 * column_seconds;
        PathElement::new(vec![(t, lo), (t, hi)], WAVE_COLOR)
    }))?;

    if let Some((time, value)) = chart.marker {
        ctx.draw_series(std::iter::once(PathElement::new(
            vec![(time, -limit), (time, limit)],
            ACCENT_COLOR.mix(0.4),
        )))?;
        ctx.draw_series(std::iter::once(Circle::new((time, value), 6, ACCENT_COLOR.filled())))?;
    }

    root.present()?;
    tracing::debug!(path = %path.display(), columns = envelope.len(), "Waveform chart written");
    Ok(())
}
