use analytics::PerformanceReport;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};
use optimizer::OptimalPortfolio;
use risk::RiskReport;

fn fmt(value: f64, decimals: usize) -> String {
    format!("{value:.decimals$}")
}

fn fmt_opt(value: Option<f64>, decimals: usize) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| fmt(v, decimals))
}

fn pct(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{:.2}%", v * 100.0))
}

fn numeric(text: String) -> Cell {
    Cell::new(text).set_alignment(CellAlignment::Right)
}

/// One row per run: headline performance and risk figures.
pub fn performance_table(rows: &[(&PerformanceReport, &RiskReport)]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            "Strategy", "Symbol", "Net P&L", "Return %", "Sharpe", "Sortino", "Max DD", "Trades",
            "Win %", "VaR", "CVaR", "EVT VaR",
        ]);

    for (performance, risk) in rows {
        table.add_row(vec![
            Cell::new(&risk.strategy),
            Cell::new(&risk.symbol),
            numeric(fmt(performance.total_net_profit, 2)),
            numeric(fmt(performance.total_return_pct, 2)),
            numeric(fmt_opt(performance.sharpe_ratio, 2)),
            numeric(fmt_opt(performance.sortino_ratio, 2)),
            numeric(pct(Some(risk.drawdown.max_drawdown))),
            numeric(performance.total_trades.to_string()),
            numeric(fmt_opt(performance.win_rate_pct, 1)),
            numeric(pct(risk.tail.historical_var)),
            numeric(pct(risk.tail.conditional_var)),
            numeric(pct(risk.tail.evt_var)),
        ]);
    }
    table
}

pub fn portfolio_table(portfolio: &OptimalPortfolio) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Asset", "Weight"]);
    for (asset, weight) in portfolio.assets.iter().zip(&portfolio.weights) {
        table.add_row(vec![Cell::new(asset), numeric(format!("{:.2}%", weight * 100.0))]);
    }
    table.add_row(vec![
        Cell::new("Expected return"),
        numeric(format!("{:.2}%", portfolio.expected_return * 100.0)),
    ]);
    table.add_row(vec![
        Cell::new("Volatility"),
        numeric(format!("{:.2}%", portfolio.volatility * 100.0)),
    ]);
    table.add_row(vec![Cell::new("Sharpe"), numeric(fmt(portfolio.sharpe_ratio, 2))]);
    table
}
