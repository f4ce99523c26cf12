//! Order-book fill simulation.

use crate::domain::{BookSnapshot, Decimal, Side, SimulatedFill, SimulatedOrder};

/// Simulate taking liquidity for `order` against `book`.
///
/// Walks the opposing side best-price-first (asks ascending for a BUY,
/// bids descending for a SELL), consuming `min(remaining, level.size)` at
/// each level until the order is filled or a level crosses the limit
/// price. Levels are re-sorted before the walk since upstream order is
/// not guaranteed.
///
/// Returns None when nothing filled: empty opposing side, zero desired
/// size, or every level outside the limit.
pub fn simulate(order: &SimulatedOrder, book: &BookSnapshot) -> Option<SimulatedFill> {
    let levels = match order.side {
        Side::Buy => book.sorted_asks(),
        Side::Sell => book.sorted_bids(),
    };

    let mut filled = Decimal::zero();
    let mut cost = Decimal::zero();
    let mut remaining = order.desired_size;

    for level in levels {
        if !order.allow_any_price {
            // Levels are monotonic in price, so the first one past the
            // limit ends the walk.
            match order.side {
                Side::Buy if level.price > order.limit_price => break,
                Side::Sell if level.price < order.limit_price => break,
                _ => {}
            }
        }

        let take = remaining.min(level.size);
        filled += take;
        cost += take * level.price;
        remaining = remaining - take;
        if !remaining.is_positive() {
            break;
        }
    }

    if filled.is_positive() {
        Some(SimulatedFill {
            size: filled,
            avg_price: cost / filled,
        })
    } else {
        None
    }
}
