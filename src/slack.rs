use crate::case::Gen;
use crate::parameters::BalanceType;

/// Power (MW) below which a remainder is considered fully distributed.
const DISTRIBUTION_EPS: f64 = 1e-6;

/// Participation factor of each generator. Zero for generators that do not
/// take part: those with a non-positive setpoint or no active power range.
pub(crate) fn participation(gen: &[Gen], balance_type: BalanceType) -> Vec<f64> {
    gen.iter()
        .map(|g| {
            if g.pg <= 0.0 || g.pmax <= g.pmin {
                return 0.0;
            }
            let factor = match balance_type {
                BalanceType::ProportionalToGenerationPMax => g.pmax,
                BalanceType::ProportionalToGenerationP => g.pg,
                BalanceType::ProportionalToGenerationRemainingMargin => g.pmax - g.pg,
            };
            factor.max(0.0)
        })
        .collect()
}

/// Participation factors normalized to sum to one, or all zero if no
/// generator participates.
pub(crate) fn weights(gen: &[Gen], balance_type: BalanceType) -> Vec<f64> {
    let factors = participation(gen, balance_type);
    let total: f64 = factors.iter().sum();
    if total > 0.0 {
        factors.iter().map(|f| f / total).collect()
    } else {
        factors
    }
}

/// Shares `mismatch` (MW) between participating generators, adding it to
/// their active power `pg`. Generators reaching a limit are clamped and the
/// rest is shared again between the others.
///
/// Returns the part of the mismatch that could not be distributed.
pub(crate) fn distribute(
    pg: &mut [f64],
    gen: &[Gen],
    balance_type: BalanceType,
    mismatch: f64,
) -> f64 {
    let factors = participation(gen, balance_type);
    let mut active: Vec<usize> = (0..gen.len()).filter(|&k| factors[k] > 0.0).collect();
    let mut remaining = mismatch;

    while !active.is_empty() && remaining.abs() > DISTRIBUTION_EPS {
        let total: f64 = active.iter().map(|&k| factors[k]).sum();
        let mut done = 0.0;
        let mut unclamped = Vec::with_capacity(active.len());
        for &k in &active {
            let target = pg[k] + remaining * factors[k] / total;
            let p = target.clamp(gen[k].pmin, gen[k].pmax);
            done += p - pg[k];
            pg[k] = p;
            if p == target {
                unclamped.push(k);
            }
        }
        remaining -= done;
        if unclamped.len() == active.len() {
            break;
        }
        active = unclamped;
    }
    log::trace!("distributed {} MW of {} MW", mismatch - remaining, mismatch);

    if remaining.abs() > DISTRIBUTION_EPS {
        remaining
    } else {
        0.0
    }
}
