use num_complex::Complex64;
use sprs::{CsMat, TriMat};

use crate::case::{Branch, Bus};
use crate::cmplx;

/// Builds the bus admittance matrix and branch admittance matrices.
///
/// Returns `(Ybus, Yf, Yt)` where `Yf * V` and `Yt * V` are the complex
/// currents injected into each branch at its from and to ends. Branches
/// are assumed to be in service. Buses must be in internal ordering.
pub(crate) fn make_ybus(
    base_mva: f64,
    bus: &[Bus],
    branch: &[Branch],
) -> (CsMat<Complex64>, CsMat<Complex64>, CsMat<Complex64>) {
    let nb = bus.len();
    let nl = branch.len();

    // For each branch, compute the elements of the branch admittance matrix where:
    //
    //      | If |   | Yff  Yft |   | Vf |
    //      |    | = |          | * |    |
    //      | It |   | Ytf  Ytt |   | Vt |
    let mut y_bus = TriMat::with_capacity((nb, nb), 4 * nl + nb);
    let mut y_f = TriMat::with_capacity((nl, nb), 2 * nl);
    let mut y_t = TriMat::with_capacity((nl, nb), 2 * nl);

    for (i, br) in branch.iter().enumerate() {
        let y_s = br.y_s(); // series admittance
        let tap = Complex64::from_polar(br.ratio(), br.shift.to_radians()); // add phase shifters

        let y_tt = y_s + cmplx!(0.0, br.b / 2.0);
        let y_ff = y_tt / (tap * tap.conj());
        let y_ft = -y_s / tap.conj();
        let y_tf = -y_s / tap;

        let (f, t) = (br.f_bus, br.t_bus);

        y_f.add_triplet(i, f, y_ff);
        y_f.add_triplet(i, t, y_ft);

        y_t.add_triplet(i, f, y_tf);
        y_t.add_triplet(i, t, y_tt);

        y_bus.add_triplet(f, f, y_ff);
        y_bus.add_triplet(f, t, y_ft);
        y_bus.add_triplet(t, f, y_tf);
        y_bus.add_triplet(t, t, y_tt);
    }

    // Psh - j Qsh = V * conj(Ysh * V) = conj(Ysh) = Gs - j Bs at V = 1.0 p.u.
    for (i, b) in bus.iter().enumerate() {
        if b.gs != 0.0 || b.bs != 0.0 {
            y_bus.add_triplet(i, i, cmplx!(b.gs, b.bs) / base_mva);
        }
    }

    (y_bus.to_csr(), y_f.to_csr(), y_t.to_csr())
}
