//! Pie chart drawn directly in pixel space

use std::f64::consts::PI;
use std::path::Path;

use plotters::prelude::*;

use super::{ensure_font, ChartError, FONT_FAMILY};

/// Segments per full turn used to approximate the arc
const ARC_SEGMENTS: f64 = 360.0;

#[derive(Debug, Clone)]
pub struct PieSlice<'a> {
    pub label: &'a str,
    pub value: f64,
    pub color: RGBColor,
}

/// Render slices clockwise from 12 o'clock with a legend on the right.
/// Zero-valued slices are left out of the circle but kept in the legend.
pub fn render_pie_chart(path: &Path, title: &str, slices: &[PieSlice<'_>]) -> Result<(), ChartError> {
    let total: f64 = slices.iter().map(|s| s.value.max(0.0)).sum();
    if total <= 0.0 {
        return Err(ChartError::EmptyData("pie chart"));
    }

    let size = (640u32, 480u32);
    ensure_font()?;
    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.titled(title, (FONT_FAMILY, 22))?;

    let center = (240i32, 220i32);
    let radius = 170.0;
    let mut start = -PI / 2.0;

    for slice in slices.iter().filter(|s| s.value > 0.0) {
        let sweep = 2.0 * PI * slice.value / total;
        let steps = ((sweep / (2.0 * PI)) * ARC_SEGMENTS).ceil().max(1.0) as usize;

        let mut points = Vec::with_capacity(steps + 2);
        points.push(center);
        for i in 0..=steps {
            let angle = start + sweep * i as f64 / steps as f64;
            points.push((
                center.0 + (radius * angle.cos()).round() as i32,
                center.1 + (radius * angle.sin()).round() as i32,
            ));
        }

        root.draw(&Polygon::new(points, slice.color.filled()))?;
        start += sweep;
    }

    for (i, slice) in slices.iter().enumerate() {
        let y = 150 + i as i32 * 40;
        root.draw(&Rectangle::new([(450, y), (470, y + 20)], slice.color.filled()))?;

        let percent = 100.0 * slice.value.max(0.0) / total;
        root.draw(&Text::new(
            format!("{} {:.1}%", slice.label, percent),
            (480, y + 2),
            (FONT_FAMILY, 16),
        ))?;
    }

    root.present()?;
    tracing::debug!(path = %path.display(), slices = slices.len(), "Pie chart written");
    Ok(())
}
