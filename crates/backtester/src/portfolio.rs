use chrono::{DateTime, Utc};
use core_types::{Direction, HedgeLeg, Position, Trade};
use tracing::debug;

/// Prices at which a fill happens.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Quote {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub benchmark: Option<f64>,
}

/// Cash account holding at most one position.
///
/// Opening a long pays `size * price` out of cash; opening a short receives
/// it. The hedge leg of a pairs position is booked the same way with the
/// opposite sign. Equity is cash plus the position's market value, so fees are
/// the only thing that moves equity at the moment of a fill.
#[derive(Debug, Clone)]
pub(crate) struct Portfolio {
    pub cash: f64,
    pub position: Option<Position>,
    pub trades: Vec<Trade>,
    pub total_fees: f64,
    transaction_cost: f64,
}

impl Portfolio {
    pub fn new(initial_capital: f64, transaction_cost: f64) -> Self {
        Self {
            cash: initial_capital,
            position: None,
            trades: Vec::new(),
            total_fees: 0.0,
            transaction_cost,
        }
    }

    pub fn side(&self) -> Direction {
        self.position.as_ref().map(|p| p.side).unwrap_or_default()
    }

    pub fn equity(&self, price: f64, benchmark: Option<f64>) -> f64 {
        self.cash
            + self
                .position
                .as_ref()
                .map_or(0.0, |p| p.market_value(price, benchmark))
    }

    /// Opens a position worth `notional` across both legs. Returns `false`
    /// when no sensible size can be derived.
    pub fn open(&mut self, side: Direction, quote: Quote, notional: f64, hedge_ratio: Option<f64>) -> bool {
        if side.is_flat() || self.position.is_some() {
            return false;
        }
        let hedge = match (hedge_ratio, quote.benchmark) {
            (Some(ratio), Some(bench)) => Some(HedgeLeg {
                ratio,
                entry_price: bench,
            }),
            _ => None,
        };
        let unit_cost = quote.price + hedge.map_or(0.0, |h| h.ratio.abs() * h.entry_price);
        let size = notional / unit_cost;
        if !(size.is_finite() && size > 0.0) {
            debug!(timestamp = %quote.timestamp, notional, unit_cost, "Position size is not positive, skipping entry");
            return false;
        }

        let mut position = Position {
            side,
            entry_timestamp: quote.timestamp,
            entry_price: quote.price,
            size,
            hold_count: 0,
            hedge,
            entry_fee: 0.0,
        };
        let fee = self.transaction_cost * position.notional(quote.price, quote.benchmark);
        position.entry_fee = fee;

        // Buying the asset costs cash, selling it short raises cash.
        self.cash -= position.market_value(quote.price, quote.benchmark) + fee;
        self.total_fees += fee;
        debug!(timestamp = %quote.timestamp, %side, size, price = quote.price, fee, "Opened position");
        self.position = Some(position);
        true
    }

    /// Closes the open position, recording a trade.
    pub fn close(&mut self, quote: Quote, reason: &str) -> Option<&Trade> {
        let position = self.position.take()?;
        let fee = self.transaction_cost * position.notional(quote.price, quote.benchmark);
        self.cash += position.market_value(quote.price, quote.benchmark) - fee;
        self.total_fees += fee;

        let pnl = position.unrealized_pnl(quote.price, quote.benchmark) - position.entry_fee - fee;
        debug!(
            timestamp = %quote.timestamp,
            side = %position.side,
            price = quote.price,
            pnl,
            reason,
            "Closed position"
        );
        self.trades.push(Trade {
            entry_timestamp: position.entry_timestamp,
            exit_timestamp: quote.timestamp,
            entry_price: position.entry_price,
            exit_price: quote.price,
            side: position.side,
            size: position.size,
            pnl,
            fees: position.entry_fee + fee,
            hedge_ratio: position.hedge.map(|h| h.ratio),
            bars_held: position.hold_count,
        });
        self.trades.last()
    }
}
