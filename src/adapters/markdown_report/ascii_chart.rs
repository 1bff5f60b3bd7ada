//! Plain-text equity chart for the Markdown report.

use crate::domain::portfolio::EquityPoint;

pub const DEFAULT_WIDTH: usize = 80;
pub const DEFAULT_HEIGHT: usize = 20;

/// Plots total equity on a `width` x `height` character grid, with the
/// y axis on the left and the x axis along the bottom row.
///
/// Consecutive points are joined so that sparse curves still read as a line.
pub fn render_equity_chart(equity_curve: &[EquityPoint], width: usize, height: usize) -> String {
    if equity_curve.is_empty() {
        return "No data available for equity curve".to_string();
    }
    if width < 2 || height < 2 {
        return String::new();
    }

    let values: Vec<f64> = equity_curve.iter().map(|p| p.total_equity).collect();
    let min_val = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max_val = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max_val - min_val;

    if range <= 0.0 || !range.is_finite() {
        return format!("No variation in portfolio value (${:.2})", min_val);
    }

    let column = |i: usize| -> usize {
        if values.len() > 1 {
            i * (width - 1) / (values.len() - 1)
        } else {
            width / 2
        }
    };
    let row = |v: f64| -> usize {
        let scaled = ((v - min_val) / range * (height - 1) as f64).floor() as usize;
        scaled.min(height - 1)
    };

    let mut grid = vec![vec![' '; width]; height];
    let mut plot = |x: usize, y: usize| grid[height - 1 - y][x] = '*';

    for (i, &v) in values.iter().enumerate() {
        plot(column(i), row(v));
    }

    for i in 0..values.len().saturating_sub(1) {
        let (x1, y1) = (column(i) as i64, row(values[i]) as i64);
        let (x2, y2) = (column(i + 1) as i64, row(values[i + 1]) as i64);
        let steps = (x2 - x1).abs().max((y2 - y1).abs());
        for step in 1..steps {
            let x = x1 + (x2 - x1) * step / steps;
            let y = y1 + (y2 - y1) * step / steps;
            plot(x as usize, y as usize);
        }
    }

    for line in grid.iter_mut() {
        line[0] = '|';
    }
    grid[height - 1].fill('-');

    let mut output = format!("Equity Curve (${:.2} - ${:.2})\n", min_val, max_val);
    for line in &grid {
        output.push_str(line.iter().collect::<String>().trim_end());
        output.push('\n');
    }
    output.push_str(&format!(
        "Start: ${:.2} | Final: ${:.2}",
        values[0],
        values[values.len() - 1]
    ));
    output
}
