use crate::core::shareholder::Shareholder;
use crate::core::snapshot::ProRataAllocation;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Pro-rata entitlements of existing preferred holders in a new round.
///
/// Reporting only. Entitlements are attached to the round details and
/// never change how many shares the new investor receives.
pub struct ProRataCalculator;

impl ProRataCalculator {
    /// For each preferred holder with pro-rata rights:
    /// `shares = (holder shares / outstanding) × new_round_shares` and
    /// `investment = shares × share_price`.
    ///
    /// `outstanding_shares` is the share count immediately before the new
    /// issuance (pool and anti-dilution grants included). An empty base
    /// yields no entitlements.
    pub fn allocate(
        shareholders: &BTreeMap<String, Shareholder>,
        outstanding_shares: Decimal,
        new_round_shares: Decimal,
        share_price: Decimal,
    ) -> BTreeMap<String, ProRataAllocation> {
        if outstanding_shares <= Decimal::ZERO {
            return BTreeMap::new();
        }

        shareholders
            .iter()
            .filter(|(_, holder)| {
                holder.is_preferred()
                    && holder
                        .preferences
                        .as_ref()
                        .map(|p| p.pro_rata_rights)
                        .unwrap_or(false)
            })
            .map(|(name, holder)| {
                let fraction = holder.shares / outstanding_shares;
                let shares = fraction * new_round_shares;
                (
                    name.clone(),
                    ProRataAllocation {
                        shares,
                        investment: shares * share_price,
                        ownership: fraction * Decimal::ONE_HUNDRED,
                    },
                )
            })
            .collect()
    }
}
