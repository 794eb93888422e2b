//! Orders: single simulated executions.

use crate::domain::error::TradebenchError;
use crate::domain::num::Num;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderType {
    Buy,
    Sell,
}

impl OrderType {
    pub fn complement(self) -> Self {
        match self {
            OrderType::Buy => OrderType::Sell,
            OrderType::Sell => OrderType::Buy,
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderType::Buy => write!(f, "BUY"),
            OrderType::Sell => write!(f, "SELL"),
        }
    }
}

impl FromStr for OrderType {
    type Err = TradebenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" | "long" => Ok(OrderType::Buy),
            "sell" | "short" => Ok(OrderType::Sell),
            other => Err(TradebenchError::InvalidArgument {
                reason: format!("unknown order type '{}'", other),
            }),
        }
    }
}

/// One execution at a bar index. Immutable once created.
///
/// `cost` is the transaction cost charged for this order alone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Order<N: Num> {
    index: usize,
    order_type: OrderType,
    price_per_asset: N,
    amount: N,
    cost: N,
}

impl<N: Num> Order<N> {
    pub fn new(index: usize, order_type: OrderType, price_per_asset: N, amount: N, cost: N) -> Self {
        Order {
            index,
            order_type,
            price_per_asset,
            amount,
            cost,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn order_type(&self) -> OrderType {
        self.order_type
    }

    pub fn is_buy(&self) -> bool {
        self.order_type == OrderType::Buy
    }

    pub fn is_sell(&self) -> bool {
        self.order_type == OrderType::Sell
    }

    pub fn price_per_asset(&self) -> N {
        self.price_per_asset
    }

    pub fn amount(&self) -> N {
        self.amount
    }

    pub fn cost(&self) -> N {
        self.cost
    }

    /// Price times amount, before costs.
    pub fn value(&self) -> N {
        self.price_per_asset.multiplied_by(self.amount)
    }

    /// Price per asset with the order's cost spread over the amount.
    pub fn net_price(&self) -> N {
        if self.amount.is_zero() {
            return self.price_per_asset;
        }
        let per_unit = self.cost.divided_by(self.amount);
        match self.order_type {
            OrderType::Buy => self.price_per_asset.plus(per_unit),
            OrderType::Sell => self.price_per_asset.minus(per_unit),
        }
    }
}

impl<N: Num> fmt::Display for Order<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} @ {} [{}]",
            self.order_type, self.amount, self.price_per_asset, self.index
        )
    }
}
