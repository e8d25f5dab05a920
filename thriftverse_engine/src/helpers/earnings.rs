use tv_common::Rupees;

use crate::db_types::PaymentChannel;

/// How the product cost of an order is divided between the seller and the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EarningsSplit {
    pub sellers_earning: Rupees,
    pub platform_earnings: Rupees,
}

/// Compute the earnings split for an order, off the product cost (shipping excluded).
///
/// The seller earns a flat 95% of product cost on every channel, while the platform books 3% on gateway payments and
/// 5% on COD. The two figures are computed independently and do not reconcile to 100% on the gateway path. That
/// asymmetry is an open billing question with the product owner; until it is resolved the rates are reproduced
/// exactly, not adjusted.
pub fn earnings_split(product_cost: Rupees, channel: PaymentChannel) -> EarningsSplit {
    EarningsSplit {
        sellers_earning: product_cost.percent(95),
        platform_earnings: product_cost.percent(channel.platform_fee_percent()),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn gateway_split() {
        let split = earnings_split(Rupees::from_rupees(1000), PaymentChannel::Esewa);
        assert_eq!(split.platform_earnings, Rupees::from_rupees(30));
        assert_eq!(split.sellers_earning, Rupees::from_rupees(950));
    }

    #[test]
    fn cod_split() {
        let split = earnings_split(Rupees::from_rupees(1000), PaymentChannel::Cod);
        assert_eq!(split.platform_earnings, Rupees::from_rupees(50));
        assert_eq!(split.sellers_earning, Rupees::from_rupees(950));
    }

    #[test]
    fn fonepay_uses_the_gateway_rate() {
        let split = earnings_split(Rupees::from_rupees(500), PaymentChannel::Fonepay);
        assert_eq!(split.platform_earnings, Rupees::from_rupees(15));
        assert_eq!(split.sellers_earning, Rupees::from_rupees(475));
    }
}
