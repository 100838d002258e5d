//! Trading pair configuration and registry

use crate::ids::Symbol;
use crate::numeric::{Price, Quantity};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One minute in Unix nanoseconds; default circuit-breaker lookback.
pub const DEFAULT_LOOKBACK_NANOS: i64 = 60 * 1_000_000_000;

/// Trading pair status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PairStatus {
    /// Accepting orders
    ACTIVE,
    /// Temporarily not accepting orders
    SUSPENDED,
}

/// Static configuration for a single trading pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingPair {
    pub symbol: Symbol,
    pub base: String,
    pub quote: String,
    /// Maximum fractional digits accepted on prices
    pub price_precision: u32,
    /// Maximum fractional digits accepted on amounts
    pub amount_precision: u32,
    pub min_amount: Quantity,
    /// Minimum notional (price × amount) in quote currency
    pub min_notional: Decimal,
    /// Maker fee in basis points of the received amount
    pub maker_fee_bps: u32,
    /// Taker fee in basis points of the received amount
    pub taker_fee_bps: u32,
    /// Maximum allowed price deviation (percent) within the lookback window
    pub max_deviation_pct: Decimal,
    /// Circuit-breaker lookback window in Unix nanoseconds
    pub lookback_nanos: i64,
    pub status: PairStatus,
}

impl TradingPair {
    /// Create a pair with sensible defaults for the non-structural knobs
    /// (10 bps maker / 20 bps taker, 15% deviation over one minute).
    pub fn new(
        symbol: Symbol,
        price_precision: u32,
        amount_precision: u32,
        min_amount: Quantity,
        min_notional: Decimal,
    ) -> Self {
        let (base, quote) = symbol.split();
        let base = base.to_string();
        let quote = quote.to_string();
        Self {
            symbol,
            base,
            quote,
            price_precision,
            amount_precision,
            min_amount,
            min_notional,
            maker_fee_bps: 10,
            taker_fee_bps: 20,
            max_deviation_pct: Decimal::from(15),
            lookback_nanos: DEFAULT_LOOKBACK_NANOS,
            status: PairStatus::ACTIVE,
        }
    }

    /// Override the fee schedule
    pub fn with_fees(mut self, maker_bps: u32, taker_bps: u32) -> Self {
        self.maker_fee_bps = maker_bps;
        self.taker_fee_bps = taker_bps;
        self
    }

    /// Override the circuit-breaker bounds
    pub fn with_deviation_limit(mut self, max_pct: Decimal, lookback_nanos: i64) -> Self {
        self.max_deviation_pct = max_pct;
        self.lookback_nanos = lookback_nanos;
        self
    }

    /// Check if the pair accepts orders
    pub fn is_active(&self) -> bool {
        matches!(self.status, PairStatus::ACTIVE)
    }

    /// Maker fee on a received amount
    pub fn maker_fee(&self, received: Decimal) -> Decimal {
        received * Decimal::from(self.maker_fee_bps) / Decimal::from(10_000)
    }

    /// Taker fee on a received amount
    pub fn taker_fee(&self, received: Decimal) -> Decimal {
        received * Decimal::from(self.taker_fee_bps) / Decimal::from(10_000)
    }

    /// Check a price against the declared precision
    pub fn price_conforms(&self, price: Price) -> bool {
        price.fits_scale(self.price_precision)
    }

    /// Check an amount against the declared precision
    pub fn amount_conforms(&self, amount: Quantity) -> bool {
        amount.fits_scale(self.amount_precision)
    }
}

/// Registry of configured trading pairs, keyed by symbol string
///
/// Built once at startup; read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct PairRegistry {
    pairs: HashMap<String, TradingPair>,
}

impl PairRegistry {
    pub fn new() -> Self {
        Self {
            pairs: HashMap::new(),
        }
    }

    /// Register a pair, replacing any previous configuration for the symbol
    pub fn insert(&mut self, pair: TradingPair) {
        self.pairs.insert(pair.symbol.as_str().to_string(), pair);
    }

    /// Look up a pair by symbol
    pub fn get(&self, symbol: &Symbol) -> Option<&TradingPair> {
        self.pairs.get(symbol.as_str())
    }

    /// All configured symbols
    pub fn symbols(&self) -> impl Iterator<Item = &TradingPair> {
        self.pairs.values()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}
