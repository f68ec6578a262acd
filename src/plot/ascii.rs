//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Each curve gets its own glyph (see `GLYPHS`), listed in a legend under the
//! grid. Line series are drawn first so that point series overlay them.

use crate::domain::Curve;

/// Glyphs assigned to series in order, wrapping around.
pub const GLYPHS: [char; 8] = ['o', '+', 'x', '*', '#', '@', '%', '&'];

/// Axis transform applied before mapping points to the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlotScale {
    #[default]
    Linear,
    /// `log10` on both axes; points with `x <= 0` or `y <= 0` are dropped.
    LogLog,
}

impl PlotScale {
    fn apply(self, (x, y): (f64, f64)) -> Option<(f64, f64)> {
        let p = match self {
            PlotScale::Linear => (x, y),
            PlotScale::LogLog if x > 0.0 && y > 0.0 => (x.log10(), y.log10()),
            PlotScale::LogLog => return None,
        };
        (p.0.is_finite() && p.1.is_finite()).then_some(p)
    }

    fn label(self) -> &'static str {
        match self {
            PlotScale::Linear => "",
            PlotScale::LogLog => " (log10)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesStyle {
    Points,
    Line,
}

/// One labelled series to plot.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotSeries {
    pub label: String,
    pub points: Vec<(f64, f64)>,
    pub style: SeriesStyle,
}

/// Plot each curve's raw samples.
pub fn render_raw_plot(curves: &[Curve], scale: PlotScale, width: usize, height: usize) -> String {
    let series: Vec<PlotSeries> = curves
        .iter()
        .map(|c| PlotSeries {
            label: c.id.clone(),
            points: c.samples.iter().map(|s| (s.x, s.y)).collect(),
            style: SeriesStyle::Points,
        })
        .collect();
    render_plot("Raw curves", &series, scale, width, height)
}

/// Plot each curve's model evaluated on the shared grid (`q_range`, `y_range_fit`).
///
/// Curves without derived columns are skipped.
pub fn render_fitted_plot(curves: &[Curve], scale: PlotScale, width: usize, height: usize) -> String {
    let series: Vec<PlotSeries> = curves
        .iter()
        .filter_map(|c| {
            let d = c.derived.as_ref()?;
            Some(PlotSeries {
                label: c.id.clone(),
                points: d.q_range.iter().copied().zip(d.y_range_fit.iter().copied()).collect(),
                style: SeriesStyle::Line,
            })
        })
        .collect();
    render_plot("Superimposed curves", &series, scale, width, height)
}

/// Plot each curve's model evaluated on its own X samples (`X`, `y_fit`).
///
/// Curves without derived columns are skipped.
pub fn render_native_fit_plot(curves: &[Curve], scale: PlotScale, width: usize, height: usize) -> String {
    let series: Vec<PlotSeries> = curves
        .iter()
        .filter_map(|c| {
            let d = c.derived.as_ref()?;
            Some(PlotSeries {
                label: c.id.clone(),
                points: c.samples.iter().map(|s| s.x).zip(d.y_fit.iter().copied()).collect(),
                style: SeriesStyle::Points,
            })
        })
        .collect();
    render_plot("Scaled curves on native X", &series, scale, width, height)
}

/// Render labelled series on one grid with a legend.
pub fn render_plot(title: &str, series: &[PlotSeries], scale: PlotScale, width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let finite = move || {
        series
            .iter()
            .flat_map(move |s| s.points.iter().filter_map(move |&p| scale.apply(p)))
    };
    let (x_min, x_max) = min_max(finite().map(|(x, _)| x)).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = min_max(finite().map(|(_, y)| y)).unwrap_or((0.0, 1.0));
    let (x_min, x_max) = if x_max > x_min { (x_min, x_max) } else { pad_range(x_min, x_max, 0.05) };
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    let glyph = |i: usize| GLYPHS[i % GLYPHS.len()];
    for style in [SeriesStyle::Line, SeriesStyle::Points] {
        for (i, s) in series.iter().enumerate().filter(|(_, s)| s.style == style) {
            let cells: Vec<(usize, usize)> = s
                .points
                .iter()
                .filter_map(|&p| scale.apply(p))
                .map(|(x, y)| (map_x(x, x_min, x_max, width), map_y(y, y_min, y_max, height)))
                .collect();
            match style {
                SeriesStyle::Line => draw_polyline(&mut grid, &cells, glyph(i)),
                SeriesStyle::Points => {
                    for (x, y) in cells {
                        grid[y][x] = glyph(i);
                    }
                }
            }
        }
    }

    let mut out = String::new();
    out.push_str(&format!(
        "{title}{}: x=[{x_min:.3}, {x_max:.3}] | y=[{y_min:.3}, {y_max:.3}]\n",
        scale.label()
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    for (i, s) in series.iter().enumerate() {
        out.push_str(&format!("  {}  {}\n", glyph(i), s.label));
    }
    out
}

fn min_max(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_polyline(grid: &mut [Vec<char>], cells: &[(usize, usize)], ch: char) {
    match cells {
        [] => {}
        [(x, y)] => grid[*y][*x] = ch,
        _ => {
            for pair in cells.windows(2) {
                draw_line(grid, pair[0], pair[1], ch);
            }
        }
    }
}

/// Integer line drawing (Bresenham); only fills blank cells.
fn draw_line(grid: &mut [Vec<char>], from: (usize, usize), to: (usize, usize), ch: char) {
    let (mut x0, mut y0) = (from.0 as isize, from.1 as isize);
    let (x1, y1) = (to.0 as isize, to.1 as isize);

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
