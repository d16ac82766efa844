use num_complex::Complex64;
use sprs::{CsMat, TriMat};

use crate::case::{Bus, Gen};
use crate::math::{mul_vec, J};

/// Builds the vector of complex bus power injections.
///
/// Returns the vector of complex bus power injections, that is, generation
/// minus load, in per unit. Loads are constant power. If `pg` is provided
/// it overrides the active power output of each generator.
pub(crate) fn make_sbus(
    base_mva: f64,
    bus: &[Bus],
    gen: &[Gen],
    pg: Option<&[f64]>,
) -> Vec<Complex64> {
    let mut s_bus = vec![Complex64::default(); bus.len()];

    for (k, g) in gen.iter().enumerate() {
        let p = pg.map_or(g.pg, |pg| pg[k]);
        s_bus[g.bus] += Complex64::new(p, g.qg) / base_mva;
    }

    bus.iter()
        .filter(|b| b.pd != 0.0 || b.qd != 0.0)
        .for_each(|b| {
            s_bus[b.i] -= Complex64::new(b.pd, b.qd) / base_mva;
        });

    s_bus
}

/// Computes partial derivatives of power injection w.r.t. voltage
/// angle and magnitude.
///
///   dSbus/dVa = 1j * diagV * conj(diagIbus - Ybus * diagV)
///   dSbus/dVm = diagV * conj(Ybus * diagVnorm) + conj(diagIbus) * diagVnorm
pub(crate) fn d_sbus_d_v(
    y_bus: &CsMat<Complex64>,
    v: &[Complex64],
) -> (CsMat<Complex64>, CsMat<Complex64>) {
    let nb = v.len();
    let i_bus = mul_vec(y_bus, v);
    let v_norm: Vec<Complex64> = v.iter().map(|v| *v / v.norm()).collect();

    let nnz = y_bus.nnz() + nb;
    let mut d_sbus_d_va = TriMat::with_capacity((nb, nb), nnz);
    let mut d_sbus_d_vm = TriMat::with_capacity((nb, nb), nnz);

    for (&y, (i, j)) in y_bus.iter() {
        d_sbus_d_va.add_triplet(i, j, J * v[i] * (-(y * v[j])).conj());
        d_sbus_d_vm.add_triplet(i, j, v[i] * (y * v_norm[j]).conj());
    }
    for i in 0..nb {
        d_sbus_d_va.add_triplet(i, i, J * v[i] * i_bus[i].conj());
        d_sbus_d_vm.add_triplet(i, i, i_bus[i].conj() * v_norm[i]);
    }

    (d_sbus_d_va.to_csr(), d_sbus_d_vm.to_csr())
}
