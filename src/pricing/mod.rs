//! Logarithmic Market Scoring Rule (LMSR) pricing engine.
//!
//! Pure functions over a quantity vector; no state, no I/O. For a market
//! with quantities `q = (q_1..q_n)` and liquidity `b`:
//!
//! - `cost(q) = b * ln(sum_i exp(q_i / b))`
//! - `price(q, i) = exp(q_i / b) / sum_j exp(q_j / b)`
//! - `trade_cost(q, i, delta) = cost(q with q_i += delta) - cost(q)`
//!
//! Reference: Hanson (2003) "Combinatorial Information Market Design".
//!
//! All exponentials are evaluated with log-sum-exp stabilization (the
//! maximum of `q_i / b` is subtracted before exponentiating), so large
//! quantity vectors do not overflow to infinity.

use crate::domain::DomainError;

/// LMSR pricing engine parameterized by a liquidity constant.
///
/// The liquidity parameter `b` controls price sensitivity to trade size:
/// - Higher `b` = flatter price response, deeper market
/// - Lower `b` = faster price movement per share
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lmsr {
    b: f64,
}

impl Lmsr {
    /// Create a pricing engine with the given liquidity parameter.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidLiquidity` unless `b` is positive and
    /// finite.
    pub fn new(b: f64) -> Result<Self, DomainError> {
        if !(b.is_finite() && b > 0.0) {
            return Err(DomainError::InvalidLiquidity { liquidity: b });
        }
        Ok(Self { b })
    }

    /// Get the liquidity parameter.
    #[must_use]
    pub const fn liquidity(&self) -> f64 {
        self.b
    }

    /// The LMSR cost function `C(q) = b * ln(sum_i exp(q_i / b))`.
    ///
    /// Computed as `b * (m + ln(sum_i exp(q_i / b - m)))` with
    /// `m = max_i(q_i / b)`, which keeps every exponent non-positive.
    #[must_use]
    pub fn cost(&self, quantities: &[f64]) -> f64 {
        let max = self.max_scaled(quantities);
        let sum: f64 = quantities
            .iter()
            .map(|&q| (q / self.b - max).exp())
            .sum();
        self.b * (max + sum.ln())
    }

    /// Instantaneous marginal price of outcome `i`, in (0, 1).
    ///
    /// # Panics
    ///
    /// Panics if `i` is out of bounds for `quantities`.
    #[must_use]
    pub fn price(&self, quantities: &[f64], i: usize) -> f64 {
        let max = self.max_scaled(quantities);
        let sum: f64 = quantities
            .iter()
            .map(|&q| (q / self.b - max).exp())
            .sum();
        (quantities[i] / self.b - max).exp() / sum
    }

    /// Marginal prices of every outcome; a proper probability
    /// distribution summing to 1.
    #[must_use]
    pub fn prices(&self, quantities: &[f64]) -> Vec<f64> {
        let max = self.max_scaled(quantities);
        let exps: Vec<f64> = quantities
            .iter()
            .map(|&q| (q / self.b - max).exp())
            .collect();
        let sum: f64 = exps.iter().sum();
        exps.into_iter().map(|e| e / sum).collect()
    }

    /// Cost of buying `delta` additional shares of outcome `i` at the
    /// current state.
    ///
    /// Callers enforce `delta > 0`; the pricing engine itself is buy/sell
    /// agnostic, but nothing in this crate ever passes a negative delta.
    ///
    /// # Panics
    ///
    /// Panics if `i` is out of bounds for `quantities`.
    #[must_use]
    pub fn trade_cost(&self, quantities: &[f64], i: usize, delta: f64) -> f64 {
        let mut moved = quantities.to_vec();
        moved[i] += delta;
        self.cost(&moved) - self.cost(quantities)
    }

    fn max_scaled(&self, quantities: &[f64]) -> f64 {
        quantities
            .iter()
            .map(|&q| q / self.b)
            .fold(f64::NEG_INFINITY, f64::max)
    }
}
