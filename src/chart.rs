/// Strip-chart snapshot of the rolling window
use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;

use crate::buffer::SampleBuffer;
use crate::error::ChartError;
use crate::models::Thresholds;

const SHADE: RGBColor = RGBColor(173, 216, 230);
const LIMIT_LINE: RGBColor = RGBColor(0, 0, 255);

pub trait ChartRenderer {
    /// Draw the buffer to `path`, overwriting any previous snapshot.
    fn render(&self, buffer: &SampleBuffer, path: &Path) -> Result<(), ChartError>;
}

/// Two stacked panels, temperature over humidity, with out-of-range regions
/// shaded.
pub struct PlotRenderer {
    temperature: Thresholds,
    humidity: Thresholds,
    size: (u32, u32),
}

impl PlotRenderer {
    pub fn new(temperature: Thresholds, humidity: Thresholds) -> Self {
        Self {
            temperature,
            humidity,
            size: (1024, 600),
        }
    }
}

fn chart_err<E: std::fmt::Display>(e: E) -> ChartError {
    ChartError(e.to_string())
}

/// Vertical extent covering the data and both limits, with a margin.
fn y_range(values: &[f64], limits: &Thresholds) -> (f64, f64) {
    let lo = values.iter().copied().fold(limits.min, f64::min);
    let hi = values.iter().copied().fold(limits.max, f64::max);
    let pad = ((hi - lo) * 0.1).max(0.1);
    (lo - pad, hi + pad)
}

fn draw_panel(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    values: &[f64],
    limits: &Thresholds,
    color: RGBColor,
) -> Result<(), ChartError> {
    let n = values.len().max(2);
    let (lo, hi) = y_range(values, limits);

    let mut chart = ChartBuilder::on(area)
        .margin(12)
        .build_cartesian_2d(0..n - 1, lo..hi)
        .map_err(chart_err)?;

    chart
        .draw_series([
            Rectangle::new([(0, limits.max), (n - 1, hi)], SHADE.mix(0.2).filled()),
            Rectangle::new([(0, lo), (n - 1, limits.min)], SHADE.mix(0.2).filled()),
        ])
        .map_err(chart_err)?;
    for limit in [limits.min, limits.max] {
        chart
            .draw_series(LineSeries::new([(0, limit), (n - 1, limit)], &LIMIT_LINE))
            .map_err(chart_err)?;
    }
    chart
        .draw_series(LineSeries::new(
            values.iter().enumerate().map(|(i, v)| (i, *v)),
            color.stroke_width(2),
        ))
        .map_err(chart_err)?;
    Ok(())
}

impl ChartRenderer for PlotRenderer {
    fn render(&self, buffer: &SampleBuffer, path: &Path) -> Result<(), ChartError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(chart_err)?;
        }
        let temperatures: Vec<f64> = buffer.iter().map(|r| r.temperature).collect();
        let humidities: Vec<f64> = buffer.iter().map(|r| r.humidity).collect();

        let root = BitMapBackend::new(path, self.size).into_drawing_area();
        root.fill(&BLACK).map_err(chart_err)?;
        let (top, bottom) = root.split_vertically((self.size.1 / 2) as i32);
        draw_panel(&top, &temperatures, &self.temperature, RED)?;
        draw_panel(&bottom, &humidities, &self.humidity, GREEN)?;
        root.present().map_err(chart_err)?;
        Ok(())
    }
}
