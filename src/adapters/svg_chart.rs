//! SVG charts for a finished run.
//!
//! Two charts per run: a candlestick price chart with a marker at every trade
//! entry and exit, and a balance chart that draws realized capital (steps at
//! each exit) over the daily mark-to-market equity.

use crate::domain::account::EquityPoint;
use crate::domain::backtest::BacktestResult;
use crate::domain::error::SwingError;
use crate::domain::metrics::realized_balance_curve;
use crate::domain::position::ClosedTrade;
use crate::domain::price::PricePoint;
use crate::ports::report_port::ReportPort;
use chrono::NaiveDate;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

const WIDTH: f64 = 900.0;
const HEIGHT: f64 = 400.0;
const PADDING: f64 = 50.0;
const PLOT_WIDTH: f64 = WIDTH - 2.0 * PADDING;
const PLOT_HEIGHT: f64 = HEIGHT - 2.0 * PADDING;
const MARKER_SIZE: f64 = 6.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Price,
    Balance,
}

impl ChartKind {
    fn file_suffix(self) -> &'static str {
        match self {
            ChartKind::Price => "price_chart",
            ChartKind::Balance => "balance_chart",
        }
    }
}

/// Renders one chart as a standalone SVG document. The price series is the
/// one the run was made on; the result supplies trades and equity.
pub struct ChartReport<'a> {
    pub prices: &'a [PricePoint],
    pub kind: ChartKind,
    pub title: String,
}

impl ReportPort for ChartReport<'_> {
    fn write(&self, result: &BacktestResult, out: &mut dyn Write) -> Result<(), SwingError> {
        let svg = match self.kind {
            ChartKind::Price => price_chart_svg(&self.title, self.prices, &result.trades),
            ChartKind::Balance => {
                let balance =
                    realized_balance_curve(self.prices, &result.trades, result.initial_capital);
                balance_chart_svg(&self.title, &balance, &result.equity_curve)
            }
        };
        out.write_all(svg.as_bytes())?;
        Ok(())
    }
}

/// Write `<name>_price_chart.svg` and `<name>_balance_chart.svg` into `dir`,
/// creating it if needed. Returns the paths written.
pub fn write_charts(
    dir: &Path,
    name: &str,
    prices: &[PricePoint],
    result: &BacktestResult,
) -> Result<Vec<PathBuf>, SwingError> {
    fs::create_dir_all(dir)?;

    let mut written = Vec::new();
    for kind in [ChartKind::Price, ChartKind::Balance] {
        let path = dir.join(format!("{name}_{}.svg", kind.file_suffix()));
        let mut file = BufWriter::new(File::create(&path)?);
        let chart = ChartReport {
            prices,
            kind,
            title: name.to_string(),
        };
        chart.write(result, &mut file)?;
        file.flush()?;

        tracing::info!(path = %path.display(), "wrote chart");
        written.push(path);
    }
    Ok(written)
}

/// Maps series index and value onto the plot area.
struct Frame {
    min: f64,
    max: f64,
    count: usize,
}

impl Frame {
    fn new(values: impl Iterator<Item = f64>, count: usize) -> Self {
        let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
        // a flat series still needs a non-zero range
        let (min, max) = if max > min { (min, max) } else { (min - 1.0, min + 1.0) };
        Frame { min, max, count }
    }

    fn step(&self) -> f64 {
        if self.count > 1 {
            PLOT_WIDTH / (self.count - 1) as f64
        } else {
            PLOT_WIDTH
        }
    }

    fn x(&self, index: usize) -> f64 {
        if self.count > 1 {
            PADDING + index as f64 * self.step()
        } else {
            PADDING + PLOT_WIDTH / 2.0
        }
    }

    fn y(&self, value: f64) -> f64 {
        HEIGHT - PADDING - (value - self.min) / (self.max - self.min) * PLOT_HEIGHT
    }
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn open_svg(title: &str) -> Vec<String> {
    vec![
        format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH:.0}" height="{HEIGHT:.0}" viewBox="0 0 {WIDTH:.0} {HEIGHT:.0}" font-family="sans-serif" font-size="11">"#
        ),
        format!(r#"<rect width="{WIDTH:.0}" height="{HEIGHT:.0}" fill="white"/>"#),
        format!(
            r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="14">{}</text>"#,
            WIDTH / 2.0,
            PADDING / 2.0,
            escape_xml(title)
        ),
    ]
}

fn axes(frame: &Frame, first: NaiveDate, last: NaiveDate) -> Vec<String> {
    let bottom = HEIGHT - PADDING;
    vec![
        format!(
            r#"<line x1="{PADDING:.1}" y1="{PADDING:.1}" x2="{PADDING:.1}" y2="{bottom:.1}" stroke="black"/>"#
        ),
        format!(
            r#"<line x1="{PADDING:.1}" y1="{bottom:.1}" x2="{:.1}" y2="{bottom:.1}" stroke="black"/>"#,
            WIDTH - PADDING
        ),
        format!(
            r#"<text x="{:.1}" y="{:.1}" text-anchor="end">{:.2}</text>"#,
            PADDING - 4.0,
            frame.y(frame.max) + 4.0,
            frame.max
        ),
        format!(
            r#"<text x="{:.1}" y="{:.1}" text-anchor="end">{:.2}</text>"#,
            PADDING - 4.0,
            frame.y(frame.min) + 4.0,
            frame.min
        ),
        format!(
            r#"<text x="{PADDING:.1}" y="{:.1}">{}</text>"#,
            bottom + 16.0,
            first.format("%Y-%m-%d")
        ),
        format!(
            r#"<text x="{:.1}" y="{:.1}" text-anchor="end">{}</text>"#,
            WIDTH - PADDING,
            bottom + 16.0,
            last.format("%Y-%m-%d")
        ),
    ]
}

fn empty_chart(title: &str, message: &str) -> String {
    let mut parts = open_svg(title);
    parts.push(format!(
        r#"<text x="{:.1}" y="{:.1}" text-anchor="middle">{message}</text>"#,
        WIDTH / 2.0,
        HEIGHT / 2.0
    ));
    parts.push("</svg>".to_string());
    parts.join("\n")
}

/// Candlesticks for `prices` with an up-triangle under each entry and a
/// down-triangle over each exit. Trades dated outside `prices` get no marker.
pub fn price_chart_svg(title: &str, prices: &[PricePoint], trades: &[ClosedTrade]) -> String {
    let (Some(first), Some(last)) = (prices.first(), prices.last()) else {
        return empty_chart(title, "No price data available.");
    };

    let trade_prices = trades.iter().flat_map(|t| [t.entry_price, t.exit_price]);
    let frame = Frame::new(
        prices.iter().flat_map(|p| [p.low, p.high]).chain(trade_prices),
        prices.len(),
    );
    let body_width = (frame.step() * 0.6).clamp(1.0, 12.0);

    let mut parts = open_svg(&format!("{title} - Price with Trades"));
    parts.extend(axes(&frame, first.date, last.date));

    for (i, bar) in prices.iter().enumerate() {
        let x = frame.x(i);
        let color = if bar.close >= bar.open { "#2e7d32" } else { "#c62828" };
        let top = frame.y(bar.open.max(bar.close));
        let height = (frame.y(bar.open.min(bar.close)) - top).max(1.0);
        parts.push(format!(
            r#"<g class="candle"><line x1="{x:.1}" y1="{:.1}" x2="{x:.1}" y2="{:.1}" stroke="{color}"/><rect x="{:.1}" y="{top:.1}" width="{body_width:.1}" height="{height:.1}" fill="{color}"/></g>"#,
            frame.y(bar.high),
            frame.y(bar.low),
            x - body_width / 2.0,
        ));
    }

    let index_of = |date: NaiveDate| prices.binary_search_by_key(&date, |p| p.date).ok();
    for trade in trades {
        if let Some(i) = index_of(trade.entry_date) {
            let (x, y) = (frame.x(i), frame.y(trade.entry_price) + 2.0);
            parts.push(format!(
                r##"<polygon class="entry" points="{x:.1},{y:.1} {:.1},{:.1} {:.1},{:.1}" fill="#1565c0"><title>{} entry @ {:.2}</title></polygon>"##,
                x - MARKER_SIZE,
                y + 1.5 * MARKER_SIZE,
                x + MARKER_SIZE,
                y + 1.5 * MARKER_SIZE,
                escape_xml(&trade.id),
                trade.entry_price,
            ));
        }
        if let Some(i) = index_of(trade.exit_date) {
            let (x, y) = (frame.x(i), frame.y(trade.exit_price) - 2.0);
            parts.push(format!(
                r##"<polygon class="exit" points="{x:.1},{y:.1} {:.1},{:.1} {:.1},{:.1}" fill="#ef6c00"><title>{} exit @ {:.2} ({})</title></polygon>"##,
                x - MARKER_SIZE,
                y - 1.5 * MARKER_SIZE,
                x + MARKER_SIZE,
                y - 1.5 * MARKER_SIZE,
                escape_xml(&trade.id),
                trade.exit_price,
                trade.exit_reason,
            ));
        }
    }

    parts.push("</svg>".to_string());
    parts.join("\n")
}

fn polyline(frame: &Frame, curve: &[EquityPoint], class: &str, style: &str) -> String {
    let points: Vec<String> = curve
        .iter()
        .enumerate()
        .map(|(i, p)| format!("{:.1},{:.1}", frame.x(i), frame.y(p.equity)))
        .collect();
    format!(
        r#"<polyline class="{class}" points="{}" fill="none" {style}/>"#,
        points.join(" ")
    )
}

/// Realized balance as a solid line over daily equity as a dashed line.
pub fn balance_chart_svg(title: &str, balance: &[EquityPoint], equity: &[EquityPoint]) -> String {
    let (Some(first), Some(last)) = (balance.first(), balance.last()) else {
        return empty_chart(title, "No balance data available.");
    };

    let frame = Frame::new(
        balance.iter().chain(equity).map(|p| p.equity),
        balance.len().max(equity.len()),
    );

    let mut parts = open_svg(&format!("{title} - Account Balance"));
    parts.extend(axes(&frame, first.date, last.date));
    if !equity.is_empty() {
        parts.push(polyline(
            &frame,
            equity,
            "equity",
            r##"stroke="#9e9e9e" stroke-width="1" stroke-dasharray="4 3""##,
        ));
    }
    parts.push(polyline(
        &frame,
        balance,
        "balance",
        r##"stroke="#1565c0" stroke-width="1.5""##,
    ));
    parts.push(format!(
        r##"<text x="{:.1}" y="{:.1}" text-anchor="end" fill="#1565c0">realized</text>"##,
        WIDTH - PADDING,
        PADDING - 6.0
    ));
    parts.push(format!(
        r##"<text x="{:.1}" y="{:.1}" text-anchor="end" fill="#9e9e9e">equity</text>"##,
        WIDTH - PADDING - 60.0,
        PADDING - 6.0
    ));

    parts.push("</svg>".to_string());
    parts.join("\n")
}
