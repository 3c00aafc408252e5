//! ASCII/Unicode plotting of marginal curves for terminal output.
//!
//! This is intentionally "dumb" (fixed-size character grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! The y axis is always the probability range `[0, 1]`, so curves for
//! different features can be compared by eye.
//!
//! Plot elements:
//! - curve points: `o`
//! - interpolated line between points: `-`

use crate::domain::{Feature, MarginalCurve};

/// Left margin holding the y-axis labels.
const MARGIN: &str = "    ";

/// Render one marginal curve.
pub fn render_curve_plot(curve: &MarginalCurve, width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (x_min, x_max) = x_range(curve).unwrap_or((0.0, 1.0));
    let (x_lo, x_hi) = if x_max > x_min {
        (x_min, x_max)
    } else {
        (x_min - 0.5, x_max + 0.5)
    };

    let mut grid = vec![vec![' '; width]; height];
    let cells: Vec<(usize, usize)> = curve
        .points
        .iter()
        .map(|p| {
            (
                map_x(p.value, x_lo, x_hi, width),
                map_y(p.proportion, height),
            )
        })
        .collect();

    // Line first so points can overlay.
    for pair in cells.windows(2) {
        draw_line(&mut grid, pair[0], pair[1], '-');
    }
    for &(x, y) in &cells {
        grid[y][x] = 'o';
    }

    let mut out = String::new();
    out.push_str(&format!(
        "{}: x=[{}, {}] | P(top half) in [0, 1]\n",
        curve.feature.display_name(),
        format_value(curve.feature, x_min),
        format_value(curve.feature, x_max),
    ));

    for (i, row) in grid.into_iter().enumerate() {
        let label = if i == 0 {
            "1.0 "
        } else if i == height - 1 {
            "0.0 "
        } else {
            MARGIN
        };
        out.push_str(label);
        out.push('|');
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }

    out.push_str(MARGIN);
    out.push('+');
    out.push_str(&"-".repeat(width));
    out.push('\n');

    let left = format_value(curve.feature, x_min);
    let right = format_value(curve.feature, x_max);
    let gap = width.saturating_sub(left.len() + right.len()).max(1);
    out.push_str(&format!("{MARGIN} {left}{}{right}\n", " ".repeat(gap)));
    out.push_str(&format!("{MARGIN} {}\n", curve.feature.axis_label()));

    out
}

/// Render every curve, one block per feature.
pub fn render_curves(curves: &[MarginalCurve], width: usize, height: usize) -> String {
    curves
        .iter()
        .map(|c| render_curve_plot(c, width, height))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_value(feature: Feature, v: f64) -> String {
    if feature.is_integral() {
        format!("{v:.0}")
    } else {
        format!("{v:.2}")
    }
}

fn x_range(curve: &MarginalCurve) -> Option<(f64, f64)> {
    let mut min_x = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    for p in &curve.points {
        min_x = min_x.min(p.value);
        max_x = max_x.max(p.value);
    }
    (min_x.is_finite() && max_x.is_finite()).then_some((min_x, max_x))
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(p: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = p.clamp(0.0, 1.0);
    // p=1 -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

/// Integer line drawing (Bresenham-ish).
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CurvePoint;

    fn curve(feature: Feature, points: &[(f64, f64)]) -> MarginalCurve {
        MarginalCurve {
            feature,
            points: points
                .iter()
                .map(|&(value, proportion)| CurvePoint {
                    value,
                    proportion,
                    rows: 1,
                    resolved: 1,
                })
                .collect(),
        }
    }

    #[test]
    fn plot_golden_snapshot_small() {
        let txt = render_curve_plot(
            &curve(Feature::Links, &[(0.0, 1.0), (1.0, 1.0), (2.0, 0.0)]),
            10,
            5,
        );
        let expected = concat!(
            "Links: x=[0, 2] | P(top half) in [0, 1]\n",
            "1.0 |o----o    \n",
            "    |      -   \n",
            "    |       -  \n",
            "    |        - \n",
            "0.0 |         o\n",
            "    +----------\n",
            "     0        2\n",
            "     Outbound Links\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn single_point_is_centered() {
        let txt = render_curve_plot(&curve(Feature::Verbosity, &[(14.5, 0.5)]), 11, 5);
        let rows: Vec<&str> = txt.lines().collect();
        assert_eq!(rows[3], "    |     o     ");
        assert!(rows[0].contains("x=[14.50, 14.50]"));
    }

    #[test]
    fn out_of_range_proportions_are_clamped() {
        let txt = render_curve_plot(&curve(Feature::Sentiment, &[(-1.0, 1.5), (1.0, -0.5)]), 10, 5);
        let rows: Vec<&str> = txt.lines().collect();
        assert!(rows[1].starts_with("1.0 |o"));
        assert!(rows[5].ends_with('o'));
    }
}
