use num_complex::Complex64;
use sprs::CsMat;

use crate::jac::make_jac;
use crate::math::{mul_vec, norm_inf};
use crate::traits::LinearSolver;

pub trait ProgressMonitor {
    fn update(&self, i: usize, norm_f: f64);
}

/// Reports Newton iterations through the `log` facade.
pub struct LogProgress {
    pub component_num: usize,
}

impl ProgressMonitor for LogProgress {
    fn update(&self, i: usize, norm_f: f64) {
        log::debug!(
            "component {}: iteration {} mismatch {:e}",
            self.component_num,
            i,
            norm_f
        );
    }
}

/// Outcome of a Newton power flow.
pub(crate) struct NewtonSolution {
    pub v: Vec<Complex64>,
    pub converged: bool,
    pub iterations: usize,
}

/// Solves power flow using full Newton's method (power/polar).
///
/// Fails only if a linear solve fails or the voltages stop being finite.
pub(crate) fn newtonpf(
    y_bus: &CsMat<Complex64>,
    s_bus: &[Complex64],
    v0: &[Complex64],
    pv: &[usize],
    pq: &[usize],
    lin_solver: &dyn LinearSolver,
    tol: f64,
    max_it: usize,
    progress: Option<&dyn ProgressMonitor>,
) -> Result<NewtonSolution, String> {
    let pv_pq = [pv, pq].concat();

    let mut converged = false;
    let mut i = 0;
    let mut v = v0.to_vec();
    let mut va: Vec<f64> = v.iter().map(|v| v.arg()).collect();
    let mut vm: Vec<f64> = v.iter().map(|v| v.norm()).collect();

    // set up indexing for updating V
    let npv = pv.len();
    let npq = pq.len();
    let (j1, j2) = (0, npv); // j1:j2 - V angle of pv buses
    let (j3, j4) = (j2, j2 + npq); // j3:j4 - V angle of pq buses
    let (j5, j6) = (j4, j4 + npq); // j5:j6 - V mag of pq buses

    // evaluate F(x0)
    let mut f = mismatch(y_bus, s_bus, &v, &pv_pq, pq);

    // check tolerance
    let norm_f = norm_inf(&f);
    if let Some(pm) = progress {
        pm.update(i, norm_f);
    }
    if norm_f < tol {
        converged = true;
    }

    // do Newton iterations
    while !converged && i < max_it {
        // update iteration counter
        i += 1;

        // evaluate Jacobian
        let jac = make_jac(y_bus, &v, &pv_pq, pq);

        // compute update step
        let neg_f: Vec<f64> = f.iter().map(|f_i| -f_i).collect();
        let dx = lin_solver.solve(&jac, &neg_f)?;

        // update voltage
        pv.iter().zip(j1..j2).for_each(|(&i, j)| va[i] += dx[j]);
        pq.iter().zip(j3..j4).for_each(|(&i, j)| va[i] += dx[j]);
        pq.iter().zip(j5..j6).for_each(|(&i, j)| vm[i] += dx[j]);

        // update Vm and Va again in case we wrapped around with a negative Vm
        v = vm
            .iter()
            .zip(&va)
            .map(|(&m, &a)| Complex64::from_polar(m, a))
            .collect();
        if v.iter().any(|v| !v.is_finite()) {
            return Err(format!("voltages diverged at iteration {}", i));
        }
        va = v.iter().map(|v| v.arg()).collect();
        vm = v.iter().map(|v| v.norm()).collect();

        // evalute F(x)
        f = mismatch(y_bus, s_bus, &v, &pv_pq, pq);

        // check for convergence
        let norm_f = norm_inf(&f);
        if let Some(pm) = progress {
            pm.update(i, norm_f);
        }
        if norm_f < tol {
            converged = true;
            log::debug!(
                "Newton's method power flow (power balance, polar) converged in {} iterations.",
                i
            );
        }
    }

    if !converged {
        log::debug!(
            "Newton's method power flow (power balance, polar) did not converge in {} iterations.",
            i
        );
    }

    Ok(NewtonSolution {
        v,
        converged,
        iterations: i,
    })
}

/// Active power mismatch at PV and PQ buses followed by reactive power
/// mismatch at PQ buses.
fn mismatch(
    y_bus: &CsMat<Complex64>,
    s_bus: &[Complex64],
    v: &[Complex64],
    pv_pq: &[usize],
    pq: &[usize],
) -> Vec<f64> {
    let i_bus = mul_vec(y_bus, v);
    let mis: Vec<Complex64> = v
        .iter()
        .zip(&i_bus)
        .zip(s_bus)
        .map(|((v, i), s)| v * i.conj() - s)
        .collect();
    pv_pq
        .iter()
        .map(|&k| mis[k].re)
        .chain(pq.iter().map(|&k| mis[k].im))
        .collect()
}
