//! Scales an observed target trade into a simulated order.

use crate::config::{Config, SizingMode};
use crate::domain::{Decimal, Side, SimulatedOrder, TargetTrade};

/// Sizing and safety policy for copied trades.
#[derive(Debug, Clone)]
pub struct TradeSizer {
    mode: SizingMode,
    ratio: Decimal,
    fixed_stake: Decimal,
    copy_sells: bool,
    max_slippage_pct: Decimal,
    max_price_cap: Decimal,
    min_price_cap: Decimal,
}

impl TradeSizer {
    pub fn new(
        mode: SizingMode,
        ratio: Decimal,
        fixed_stake: Decimal,
        copy_sells: bool,
        max_slippage_pct: Decimal,
        max_price_cap: Decimal,
        min_price_cap: Decimal,
    ) -> Self {
        Self {
            mode,
            ratio,
            fixed_stake,
            copy_sells,
            max_slippage_pct,
            max_price_cap,
            min_price_cap,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.sizing_mode,
            config.ratio(),
            config.fixed_stake,
            config.copy_sells,
            config.max_slippage_pct,
            config.max_price_cap,
            config.min_price_cap,
        )
    }

    /// Derive a simulated order from a target trade.
    ///
    /// Returns None as an explicit skip: unknown side, or SELL while SELL
    /// copying is disabled. The limit widens the entry price by the
    /// slippage allowance in the direction that favors crossing, clamped
    /// to the configured probability-range caps. Share count truncates to
    /// 0.1 granularity so the stake is never exceeded.
    pub fn derive_order(&self, trade: &TargetTrade) -> Option<SimulatedOrder> {
        let side = trade.side?;
        if side == Side::Sell && !self.copy_sells {
            return None;
        }

        let target_notional = trade.size * trade.price;
        let stake = match self.mode {
            SizingMode::Ratio => target_notional * self.ratio,
            SizingMode::Fixed => self.fixed_stake,
        };

        let slip = self.max_slippage_pct / Decimal::hundred();
        let limit_price = match side {
            Side::Buy => (trade.price * (Decimal::one() + slip)).min(self.max_price_cap),
            Side::Sell => (trade.price * (Decimal::one() - slip)).max(self.min_price_cap),
        };

        // A zero-priced BUY produces a zero limit even after clamping;
        // skip it rather than divide by zero.
        if !limit_price.is_positive() {
            return None;
        }

        let desired_size = (stake / limit_price).trunc_to_tenths();

        Some(SimulatedOrder {
            asset: trade.asset.clone(),
            side,
            limit_price,
            desired_size,
            allow_any_price: false,
        })
    }
}
