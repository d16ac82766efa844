use sprs::CsMat;

use crate::case::Case;
use crate::dc::make_b_dc;
use crate::math::{mul_vec, positions, select};
use crate::traits::{Factorization, SparseLU};

/// Islanding threshold on `1 - PTDF_mm` when forming LODF columns.
const LODF_EPS: f64 = 1e-8;

/// How the slack is taken up for an injection.
#[derive(Clone, Debug)]
pub(crate) enum PTDFSlack {
    /// Single slack bus.
    Single(usize),
    /// Weights specifying the proportion of the slack taken up at each bus.
    Weights(Vec<f64>),
}

/// Linearized DC model of a case with the reduced B matrix factored once.
pub(crate) struct DcModel {
    nb: usize,
    slack: usize,
    b_f: CsMat<f64>,
    branch_ends: Vec<(usize, usize)>,
    /// Position of each non-reference bus in the reduced system.
    pos: Vec<Option<usize>>,
    noslack: Vec<usize>,
    lu: Factorization,
}

impl DcModel {
    /// Builds the B matrices of `case` and factors B without the row and
    /// column of the `slack` bus.
    pub(crate) fn new(case: &Case, slack: usize, use_ratio: bool) -> Result<Self, String> {
        let nb = case.bus.len();
        let (b_bus, b_f, _, _) = make_b_dc(nb, &case.branch, use_ratio);

        let noslack: Vec<usize> = (0..nb).filter(|&i| i != slack).collect();
        let lu = SparseLU.factor(&select(&b_bus, &noslack, &noslack))?;

        Ok(Self {
            nb,
            slack,
            b_f,
            branch_ends: case.branch.iter().map(|br| (br.f_bus, br.t_bus)).collect(),
            pos: positions(nb, &noslack),
            noslack,
            lu,
        })
    }

    pub(crate) fn branch_count(&self) -> usize {
        self.branch_ends.len()
    }

    /// Branch flows (p.u.) resulting from the bus injections `p`, the
    /// imbalance being taken up at the slack bus.
    pub(crate) fn flows(&self, p: &[f64]) -> Result<Vec<f64>, String> {
        let rhs: Vec<f64> = self.noslack.iter().map(|&i| p[i]).collect();
        let va_red = self.lu.solve(&rhs)?;

        let mut va = vec![0.0; self.nb];
        for (i, p) in self.pos.iter().enumerate() {
            if let Some(k) = p {
                va[i] = va_red[*k];
            }
        }
        Ok(mul_vec(&self.b_f, &va))
    }

    /// PTDF column of a unit injection at `bus`, withdrawn at the slack bus.
    fn single_column(&self, bus: usize) -> Result<Vec<f64>, String> {
        if bus == self.slack {
            return Ok(vec![0.0; self.branch_count()]);
        }
        let mut p = vec![0.0; self.nb];
        p[bus] = 1.0;
        self.flows(&p)
    }
}

/// Builds the DC PTDF columns of the requested buses for a given choice
/// of slack.
///
/// Each returned column holds the change of flow on every branch of the
/// case for a unit injection at the bus.
pub(crate) fn make_ptdf(
    model: &DcModel,
    slack: &PTDFSlack,
    bus_idx: &[usize],
) -> Result<Vec<Vec<f64>>, String> {
    let nbr = model.branch_count();

    // flows for injections balanced by the slack weights
    let slack_column = match slack {
        PTDFSlack::Single(s) if *s == model.slack => None,
        PTDFSlack::Single(s) => Some(model.single_column(*s)?),
        PTDFSlack::Weights(w) => {
            if w.len() != model.nb {
                return Err(format!(
                    "slack weights must have nb = {} entries, got {}",
                    model.nb,
                    w.len()
                ));
            }
            let mut p = w.clone();
            p[model.slack] = 0.0;
            Some(model.flows(&p)?)
        }
    };

    bus_idx
        .iter()
        .map(|&b| {
            let mut h = model.single_column(b)?;
            if let Some(hs) = &slack_column {
                for l in 0..nbr {
                    h[l] -= hs[l];
                }
            }
            Ok(h)
        })
        .collect()
}

/// Builds the line outage distribution factors for an outage of branch `m`.
///
/// Entry `l` is the share of the pre-outage flow of `m` moving onto `l`.
/// Returns `None` if the outage splits the case into islands.
pub(crate) fn make_lodf(model: &DcModel, m: usize) -> Result<Option<Vec<f64>>, String> {
    let (f, t) = model.branch_ends[m];

    // flows for a unit transfer from the from bus to the to bus of m
    let mut p = vec![0.0; model.nb];
    p[f] += 1.0;
    p[t] -= 1.0;
    let phi = model.flows(&p)?;

    let denom = 1.0 - phi[m];
    if denom.abs() < LODF_EPS {
        return Ok(None);
    }
    let mut lodf: Vec<f64> = phi.iter().map(|h| h / denom).collect();
    lodf[m] = -1.0;
    Ok(Some(lodf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::{Branch, Bus, BusType, Order};
    use approx::assert_abs_diff_eq;

    fn three_bus_ring() -> Case {
        let bus = (0..3)
            .map(|i| Bus {
                i,
                bus_type: BusType::PQ,
                pd: 0.0,
                qd: 0.0,
                gs: 0.0,
                bs: 0.0,
                vm: 1.0,
                va: 0.0,
                base_kv: 1.0,
            })
            .collect();
        let line = |f, t| Branch {
            f_bus: f,
            t_bus: t,
            r: 0.0,
            x: 0.1,
            b: 0.0,
            tap: 1.0,
            shift: 0.0,
        };
        Case {
            component_num: 0,
            base_mva: 100.0,
            bus,
            gen: Vec::new(),
            branch: vec![line(0, 1), line(1, 2), line(0, 2)],
            order: Order::default(),
        }
    }

    #[test]
    fn equal_reactances_split_two_to_one() {
        let case = three_bus_ring();
        let model = DcModel::new(&case, 0, true).unwrap();

        let h = make_ptdf(&model, &PTDFSlack::Single(0), &[1]).unwrap();

        assert_abs_diff_eq!(h[0][0], -2.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(h[0][1], 1.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(h[0][2], -1.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn weighted_slack_is_a_shifted_single_slack() {
        let case = three_bus_ring();
        let model = DcModel::new(&case, 0, true).unwrap();

        let single = make_ptdf(&model, &PTDFSlack::Single(0), &[1, 2]).unwrap();
        let weighted = make_ptdf(&model, &PTDFSlack::Weights(vec![0.0, 0.0, 1.0]), &[1]).unwrap();

        for l in 0..3 {
            assert_abs_diff_eq!(weighted[0][l], single[0][l] - single[1][l], epsilon = 1e-12);
        }
    }

    #[test]
    fn lodf_moves_the_whole_flow_around_the_ring() {
        let case = three_bus_ring();
        let model = DcModel::new(&case, 0, true).unwrap();

        let lodf = make_lodf(&model, 0).unwrap().unwrap();

        assert_abs_diff_eq!(lodf[0], -1.0);
        assert_abs_diff_eq!(lodf[1], -1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(lodf[2], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn radial_outage_islands() {
        let mut case = three_bus_ring();
        case.branch.truncate(2);
        let model = DcModel::new(&case, 0, true).unwrap();

        assert!(make_lodf(&model, 1).unwrap().is_none());
    }
}
