use num_complex::Complex64;
use sprs::{CsMat, TriMat};

use crate::debug::format_polar_vec;
use crate::math::positions;
use crate::sbus::d_sbus_d_v;

/// Forms the power flow Jacobian.
///
/// The unknowns are the voltage angles of PV and PQ buses followed by the
/// voltage magnitudes of PQ buses; the equations are the active power
/// balance at PV and PQ buses followed by the reactive power balance at PQ
/// buses:
///
///   | J11 J12 |   | Re dS/dVa[pvpq, pvpq]  Re dS/dVm[pvpq, pq] |
///   | J21 J22 | = | Im dS/dVa[pq, pvpq]    Im dS/dVm[pq, pq]   |
///
/// Bus numbers must be consecutive beginning at 0 (i.e. internal ordering).
/// The units for all quantities are in per unit with radians for voltage
/// angles.
#[allow(non_snake_case)]
pub(crate) fn make_jac(
    Ybus: &CsMat<Complex64>,
    V: &[Complex64],
    pv_pq: &[usize],
    pq: &[usize],
) -> CsMat<f64> {
    log::trace!("V: {}", format_polar_vec(V));

    let nb = V.len();
    let n = pv_pq.len() + pq.len();

    let (dSbus_dVa, dSbus_dVm) = d_sbus_d_v(Ybus, V);

    // angle unknowns and P equations share the pvpq positions, magnitude
    // unknowns and Q equations the pq positions offset by npvpq
    let pos_a = positions(nb, pv_pq);
    let pos_m: Vec<Option<usize>> = positions(nb, pq)
        .into_iter()
        .map(|p| p.map(|p| p + pv_pq.len()))
        .collect();

    let mut J = TriMat::with_capacity((n, n), 2 * (dSbus_dVa.nnz() + dSbus_dVm.nnz()));
    for (d, (i, j)) in dSbus_dVa.iter() {
        if let (Some(r), Some(c)) = (pos_a[i], pos_a[j]) {
            J.add_triplet(r, c, d.re); // J11
        }
        if let (Some(r), Some(c)) = (pos_m[i], pos_a[j]) {
            J.add_triplet(r, c, d.im); // J21
        }
    }
    for (d, (i, j)) in dSbus_dVm.iter() {
        if let (Some(r), Some(c)) = (pos_a[i], pos_m[j]) {
            J.add_triplet(r, c, d.re); // J12
        }
        if let (Some(r), Some(c)) = (pos_m[i], pos_m[j]) {
            J.add_triplet(r, c, d.im); // J22
        }
    }

    J.to_csr()
}
