//! Plain-text console report and CSV trade log.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::SwingError;
use crate::domain::position::ClosedTrade;
use crate::domain::sweep::SweepEntry;
use crate::ports::report_port::ReportPort;
use std::io::Write;
use std::path::Path;

const RECENT_TRADES: usize = 5;

/// Fixed-width summary of one run, ending with the most recent trades.
pub struct TextReport {
    pub recent_trades: usize,
}

impl Default for TextReport {
    fn default() -> Self {
        Self {
            recent_trades: RECENT_TRADES,
        }
    }
}

impl ReportPort for TextReport {
    fn write(&self, result: &BacktestResult, out: &mut dyn Write) -> Result<(), SwingError> {
        let m = &result.metrics;
        let separator = "=".repeat(60);

        writeln!(out, "{separator}")?;
        writeln!(out, "BACKTEST RESULTS")?;
        writeln!(out, "{separator}")?;
        writeln!(
            out,
            "Period: {} to {}",
            result.start_date.format("%Y-%m-%d"),
            result.end_date.format("%Y-%m-%d")
        )?;

        writeln!(out, "\nCapital:")?;
        writeln!(out, "  Initial Capital:    ${:.2}", result.initial_capital)?;
        writeln!(out, "  Final Capital:      ${:.2}", m.final_capital)?;
        writeln!(out, "  Total P&L:          ${:.2}", m.total_pnl)?;
        writeln!(out, "  Total Fees:         ${:.2}", m.total_fees)?;
        writeln!(out, "  Total Return:       {:.2}%", m.total_return)?;
        writeln!(out, "  Annualized Return:  {:.2}%", m.annualized_return)?;

        writeln!(out, "\nTrade Statistics:")?;
        writeln!(out, "  Signals:            {}", result.signals.len())?;
        writeln!(out, "  Total Trades:       {}", m.total_trades)?;
        writeln!(out, "  Winning Trades:     {}", m.trades_won)?;
        writeln!(out, "  Losing Trades:      {}", m.trades_lost)?;
        writeln!(out, "  Win Rate:           {:.1}%", m.win_rate)?;
        if m.avg_win > 0.0 {
            writeln!(out, "  Average Win:        ${:.2}", m.avg_win)?;
        }
        if m.avg_loss > 0.0 {
            writeln!(out, "  Average Loss:       ${:.2}", m.avg_loss)?;
        }
        if m.total_trades > 0 {
            writeln!(out, "  Profit Factor:      {}", format_ratio(m.profit_factor))?;
            writeln!(out, "  Avg Holding:        {:.1} days", m.avg_trade_duration_days)?;
        }

        writeln!(out, "\nRisk Metrics:")?;
        writeln!(out, "  Max Drawdown:       {:.2}%", m.max_drawdown)?;
        if m.total_trades > 0 {
            writeln!(out, "  Largest Win:        ${:.2}", m.largest_win)?;
            writeln!(out, "  Largest Loss:       ${:.2}", m.largest_loss)?;
        }

        if !result.trades.is_empty() {
            writeln!(out, "\nRecent Trades:")?;
            let skip = result.trades.len().saturating_sub(self.recent_trades);
            for trade in &result.trades[skip..] {
                writeln!(
                    out,
                    "  {}: Entry {} @${:.2} -> Exit {} @${:.2} ({}) | P&L: ${:.2}",
                    trade.id,
                    trade.entry_date.format("%Y-%m-%d"),
                    trade.entry_price,
                    trade.exit_date.format("%Y-%m-%d"),
                    trade.exit_price,
                    trade.exit_reason,
                    trade.pnl,
                )?;
            }
        }

        writeln!(out, "{separator}")?;
        Ok(())
    }
}

fn format_ratio(value: f64) -> String {
    if value.is_infinite() {
        "inf".to_string()
    } else {
        format!("{value:.2}")
    }
}

/// Ranked sweep table, best first, at most `top` rows.
pub fn write_sweep_table(
    entries: &[SweepEntry],
    top: usize,
    out: &mut dyn Write,
) -> Result<(), SwingError> {
    writeln!(
        out,
        "{:>4} {:>6} {:>6} {:>6} {:>6} {:>7} {:>9} {:>8} {:>8}",
        "rank", "buy", "sell", "stop", "target", "trades", "return%", "win%", "maxdd%"
    )?;
    for (rank, entry) in entries.iter().take(top).enumerate() {
        let s = &entry.config.strategy;
        let m = &entry.result.metrics;
        writeln!(
            out,
            "{:>4} {:>6.1} {:>6.1} {:>6.3} {:>6.3} {:>7} {:>9.2} {:>8.1} {:>8.2}",
            rank + 1,
            s.buy_threshold,
            s.sell_threshold,
            s.stop_loss_pct,
            s.take_profit_pct,
            m.total_trades,
            m.total_return,
            m.win_rate,
            m.max_drawdown,
        )?;
    }
    Ok(())
}

/// Export the trade list, one row per closed trade.
pub fn write_trades_csv(trades: &[ClosedTrade], path: &Path) -> Result<(), SwingError> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record([
        "id",
        "entry_date",
        "entry_price",
        "exit_date",
        "exit_price",
        "quantity",
        "entry_fee",
        "exit_fee",
        "stop_loss",
        "take_profit",
        "exit_reason",
        "status",
        "pnl",
    ])?;

    for t in trades {
        wtr.write_record([
            t.id.clone(),
            t.entry_date.format("%Y-%m-%d").to_string(),
            format!("{:.4}", t.entry_price),
            t.exit_date.format("%Y-%m-%d").to_string(),
            format!("{:.4}", t.exit_price),
            t.quantity.to_string(),
            format!("{:.4}", t.entry_fee),
            format!("{:.4}", t.exit_fee),
            format!("{:.4}", t.stop_loss),
            format!("{:.4}", t.take_profit),
            t.exit_reason.to_string(),
            t.status().to_string(),
            format!("{:.4}", t.pnl),
        ])?;
    }

    wtr.flush()?;
    tracing::info!(path = %path.display(), trades = trades.len(), "wrote trade log");
    Ok(())
}
