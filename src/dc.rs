use std::f64::consts::PI;

use itertools::{izip, Itertools};
use sprs::{CsMat, TriMat};

use crate::case::Branch;
use crate::debug::format_f64_vec;
use crate::math::{mul_vec, mul_vec_t, norm_inf, select};
use crate::traits::LinearSolver;

/// Solves a DC power flow.
///
/// Solves for the bus voltage angles at all but the reference bus,
/// given the full system B matrix and the vector of bus real power injections,
/// the initial vector of bus voltage angles (in radians), and column vectors
/// with the lists of bus indices for the swing bus, PV buses, and PQ buses,
/// respectively. Returns a vector of bus voltage angles in radians.
pub(crate) fn dc_pf(
    b_mat: &CsMat<f64>,
    p_bus: &[f64],
    va0: &[f64],
    ref_: &[usize],
    pv: &[usize],
    pq: &[usize],
    lin_solver: &dyn LinearSolver,
) -> Result<(Vec<f64>, bool), String> {
    let va_threshold = 1e5; // arbitrary threshold on |Va| for declaring failure

    // initialize result vector
    let mut va = va0.to_vec();
    let mut success = true; // successful by default

    // update angles for non-reference buses
    let pvpq = [pv, pq].concat();

    // Va([pv; pq]) = B([pv; pq], [pv; pq]) \ ...
    //                     (Pbus([pv; pq]) - B([pv; pq], ref) * Va0(ref));

    let b_pvpq = select(b_mat, &pvpq, &pvpq);
    let b_ref = select(b_mat, &pvpq, ref_);
    let p_bus_pvpq = pvpq.iter().map(|&i| p_bus[i]).collect_vec();
    let va_ref = ref_.iter().map(|&i| va0[i]).collect_vec();

    let rhs = izip!(p_bus_pvpq, mul_vec(&b_ref, &va_ref))
        .map(|(p_bus, p_ref)| p_bus - p_ref)
        .collect_vec();

    let va_pvpq = if pvpq.is_empty() {
        Vec::new()
    } else {
        lin_solver.solve(&b_pvpq, &rhs)?
    };

    pvpq.iter()
        .enumerate()
        .for_each(|(i, &j)| va[j] = va_pvpq[i]);

    log::trace!("Va: {}", format_f64_vec(&va));

    if norm_inf(&va) > va_threshold {
        success = false;
    }

    Ok((va, success))
}

/// Series susceptance used in the DC model.
pub(crate) fn branch_b(br: &Branch, use_ratio: bool) -> f64 {
    let b = 1.0 / br.x; // series susceptance
    if use_ratio {
        b / br.ratio()
    } else {
        b
    }
}

/// Builds the B matrices and phase shift injections for DC power flow.
///
/// Returns the B matrices and phase shift injection vectors needed for
/// a DC power flow. The bus real power injections are related to bus
/// voltage angles by
///     P = BBUS * Va + PBUSINJ
/// The real power flows at the from end the lines are related to the bus
/// voltage angles by
///     Pf = BF * Va + PFINJ
/// Bus numbers must be consecutive beginning at 0 (i.e. internal ordering).
pub(crate) fn make_b_dc(
    nb: usize,
    branch: &[Branch],
    use_ratio: bool,
) -> (CsMat<f64>, CsMat<f64>, Vec<f64>, Vec<f64>) {
    let (rows, cols) = (branch.len(), nb);
    let nnz = 2 * branch.len();

    // Build Bf such that Bf * Va is the vector of real branch powers injected
    // at each branch's "from" bus.
    let mut b_f = TriMat::with_capacity((rows, cols), nnz);
    let mut b_bus = TriMat::with_capacity((cols, cols), 2 * nnz);

    for (i, br) in branch.iter().enumerate() {
        let b = branch_b(br, use_ratio);

        let (f, t) = (br.f_bus, br.t_bus);

        b_f.add_triplet(i, f, b);
        b_f.add_triplet(i, t, -b);

        // Bbus = Cft' * Bf, with connection matrix Cft = Cf - Ct
        b_bus.add_triplet(f, f, b);
        b_bus.add_triplet(f, t, -b);
        b_bus.add_triplet(t, f, -b);
        b_bus.add_triplet(t, t, b);
    }
    let b_f: CsMat<f64> = b_f.to_csr();

    // Build phase shift injection vectors.
    let pfinj = branch
        .iter()
        .map(|br| branch_b(br, use_ratio) * -br.shift * PI / 180.0)
        .collect::<Vec<f64>>(); // injected at the from bus ...

    // ... and extracted at the to bus
    let mut c_ft = TriMat::with_capacity((rows, cols), nnz);
    for (i, br) in branch.iter().enumerate() {
        c_ft.add_triplet(i, br.f_bus, 1.0);
        c_ft.add_triplet(i, br.t_bus, -1.0);
    }
    let pbusinj = mul_vec_t(&c_ft.to_csr(), &pfinj);

    (b_bus.to_csr(), b_f, pbusinj, pfinj)
}
