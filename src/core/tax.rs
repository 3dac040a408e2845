use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Skatteverket policy constants. Both are jurisdiction policy, not derived
/// values, so they stay independently configurable.
#[derive(Debug, Clone, PartialEq)]
pub struct TaxPolicy {
    /// Flat tax rate on capital gains and interest income.
    pub tax_rate: Decimal,
    /// Fraction of capital losses that is deductible.
    pub loss_deduction: Decimal,
}

impl Default for TaxPolicy {
    fn default() -> Self {
        TaxPolicy {
            tax_rate: dec!(0.30),
            loss_deduction: dec!(0.70),
        }
    }
}

impl TaxPolicy {
    /// Payable tax. `loss` is a sum of negative results, so the deductible
    /// part subtracts from the taxable total.
    pub fn tax(&self, gain: Decimal, loss: Decimal, interest: Decimal) -> Decimal {
        (gain + interest + loss * self.loss_deduction) * self.tax_rate
    }
}
