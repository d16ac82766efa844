use num_complex::Complex64;
use sprs::CsMat;

use crate::bus_types::{bus_types, set_bus_types};
use crate::case::Case;
use crate::dc::{dc_pf, make_b_dc};
use crate::error::Result;
use crate::math::mul_vec;
use crate::network::Network;
use crate::newton::{newtonpf, LogProgress};
use crate::order::ext2int;
use crate::parameters::{Parameters, VoltageInitMode};
use crate::results::{
    BranchFlow, BusState, ComponentResult, ComponentStatus, InjectionState, LoadFlowResult,
};
use crate::sbus::make_sbus;
use crate::slack::distribute;
use crate::traits::{LinearSolver, SparseLU};
use crate::ybus::make_ybus;

/// Runs an AC or a DC load flow, as selected by `params.dc`.
pub fn run(network: &Network, params: &Parameters) -> Result<LoadFlowResult> {
    runpf(network, params, params.dc, &SparseLU)
}

/// Runs an AC Newton-Raphson load flow on every connected component.
pub fn run_ac(network: &Network, params: &Parameters) -> Result<LoadFlowResult> {
    runpf(network, params, false, &SparseLU)
}

/// Runs a DC load flow on every connected component.
pub fn run_dc(network: &Network, params: &Parameters) -> Result<LoadFlowResult> {
    runpf(network, params, true, &SparseLU)
}

/// Runs a load flow with the given linear solver.
///
/// Only invalid parameters are an error. Each component is solved on its
/// own and its outcome is reported through its [`ComponentStatus`].
pub fn runpf(
    network: &Network,
    params: &Parameters,
    dc: bool,
    lin_solver: &dyn LinearSolver,
) -> Result<LoadFlowResult> {
    params.validate()?;

    let mut result = LoadFlowResult::default();
    for mut case in ext2int(network) {
        let comp = if dc {
            solve_dc(network, &mut case, params, lin_solver, &mut result)
        } else {
            solve_ac(network, &mut case, params, lin_solver, &mut result)
        };
        match comp.status {
            ComponentStatus::Converged => log::info!(
                "{} load flow of component {} converged in {} iterations",
                if dc { "DC" } else { "AC" },
                comp.component_num,
                comp.iteration_count
            ),
            ComponentStatus::NoCalculation => log::info!(
                "component {} has no generator able to hold the reference",
                comp.component_num
            ),
            status => log::warn!(
                "{} load flow of component {}: {:?}",
                if dc { "DC" } else { "AC" },
                comp.component_num,
                status
            ),
        }
        result.components.push(comp);
    }
    Ok(result)
}

fn slack_bus_id(network: &Network, case: &Case, slack: usize) -> Option<String> {
    case.order.bus_i2e[slack]
        .first()
        .map(|&k| network.buses[k].id.clone())
}

fn solve_ac(
    network: &Network,
    case: &mut Case,
    params: &Parameters,
    lin_solver: &dyn LinearSolver,
    out: &mut LoadFlowResult,
) -> ComponentResult {
    let mut res = ComponentResult::new(case.component_num, ComponentStatus::NoCalculation);
    if !set_bus_types(case, network, &params.slack_bus_selection, false) {
        return res;
    }
    let (ref_, pv, pq) = bus_types(&case.bus, &case.gen, false);
    let slack = ref_[0];
    res.slack_bus_id = slack_bus_id(network, case, slack);
    let base_mva = case.base_mva;

    // build admittance matrices
    let (y_bus, y_f, y_t) = make_ybus(base_mva, &case.bus, &case.branch);

    let mut v = initial_voltages(case, params, &ref_, lin_solver);
    let mut pg: Vec<f64> = case.gen.iter().map(|g| g.pg).collect();
    let progress = LogProgress {
        component_num: case.component_num,
    };

    let mut status = ComponentStatus::MaxIterationReached;
    for _ in 0..params.max_outer_iterations {
        let s_bus = make_sbus(base_mva, &case.bus, &case.gen, Some(&pg));

        let sol = match newtonpf(
            &y_bus,
            &s_bus,
            &v,
            &pv,
            &pq,
            lin_solver,
            params.convergence_tolerance,
            params.max_iterations,
            Some(&progress),
        ) {
            Ok(sol) => sol,
            Err(err) => {
                log::warn!("component {}: {}", case.component_num, err);
                status = ComponentStatus::SolverFailed;
                break;
            }
        };
        res.iteration_count += sol.iterations;
        v = sol.v;
        if !sol.converged {
            status = ComponentStatus::MaxIterationReached;
            break;
        }

        let mismatch = slack_mismatch(&y_bus, &v, &s_bus, slack) * base_mva;
        res.slack_bus_active_power_mismatch = mismatch;
        if !params.distributed_slack || mismatch.abs() < params.slack_bus_p_max_mismatch {
            status = ComponentStatus::Converged;
            break;
        }

        let remaining = distribute(&mut pg, &case.gen, params.balance_type, mismatch);
        res.distributed_active_power += mismatch - remaining;
        log::debug!(
            "component {}: distributed {} MW of slack bus mismatch",
            case.component_num,
            mismatch - remaining
        );
        if remaining.abs() >= params.slack_bus_p_max_mismatch {
            log::warn!(
                "component {}: {} MW of slack bus mismatch cannot be distributed",
                case.component_num,
                remaining
            );
            status = ComponentStatus::Failed;
            break;
        }
    }
    res.status = status;

    if status == ComponentStatus::Converged {
        pfsoln(network, case, &y_bus, &y_f, &y_t, &v, &pg, slack, out);
    }
    res
}

/// Active power injected at the slack bus by the network, minus the
/// specified injection (p.u.).
fn slack_mismatch(
    y_bus: &CsMat<Complex64>,
    v: &[Complex64],
    s_bus: &[Complex64],
    slack: usize,
) -> f64 {
    let i_bus = mul_vec(y_bus, v);
    (v[slack] * i_bus[slack].conj()).re - s_bus[slack].re
}

fn initial_voltages(
    case: &Case,
    params: &Parameters,
    ref_: &[usize],
    lin_solver: &dyn LinearSolver,
) -> Vec<Complex64> {
    let nb = case.bus.len();
    let (vm, va): (Vec<f64>, Vec<f64>) = match params.voltage_init_mode {
        VoltageInitMode::UniformValues => (vec![1.0; nb], vec![0.0; nb]),
        VoltageInitMode::PreviousValues => case
            .bus
            .iter()
            .map(|b| {
                if b.vm.is_finite() && b.vm > 0.0 && b.va.is_finite() {
                    (b.vm, b.va.to_radians())
                } else {
                    (1.0, 0.0)
                }
            })
            .unzip(),
        VoltageInitMode::DcValues => {
            let va = dc_angles(case, params, ref_, lin_solver).unwrap_or_else(|err| {
                log::warn!(
                    "component {}: DC initialization failed: {}",
                    case.component_num,
                    err
                );
                vec![0.0; nb]
            });
            (vec![1.0; nb], va)
        }
    };

    let mut v: Vec<Complex64> = vm
        .iter()
        .zip(&va)
        .map(|(&m, &a)| Complex64::from_polar(m, a))
        .collect();

    // make sure we use generator setpoint voltage for PV and slack buses
    for g in case.gen.iter().filter(|g| g.regulating) {
        let b = &case.bus[g.bus];
        if b.is_pv() || b.is_ref() {
            v[g.bus] = v[g.bus] * (g.vg / v[g.bus].norm());
        }
    }
    v
}

/// Voltage angles (radians) of a DC load flow with the AC reference bus.
fn dc_angles(
    case: &Case,
    params: &Parameters,
    ref_: &[usize],
    lin_solver: &dyn LinearSolver,
) -> std::result::Result<Vec<f64>, String> {
    let nb = case.bus.len();
    let (b_bus, _, pbusinj, _) = make_b_dc(nb, &case.branch, params.dc_use_transformer_ratio);
    let s_bus = make_sbus(case.base_mva, &case.bus, &case.gen, None);
    let p_bus: Vec<f64> = (0..nb)
        .map(|i| s_bus[i].re - pbusinj[i] - case.bus[i].gs / case.base_mva)
        .collect();
    let others: Vec<usize> = (0..nb).filter(|i| !ref_.contains(i)).collect();

    let (va, success) = dc_pf(&b_bus, &p_bus, &vec![0.0; nb], ref_, &[], &others, lin_solver)?;
    if !success {
        return Err("angles diverged".to_string());
    }
    Ok(va)
}

/// Current (A) through a terminal carrying `s_mva` at `v_kv`.
fn current(s_mva: f64, v_kv: f64) -> f64 {
    s_mva * 1000.0 / (3f64.sqrt() * v_kv)
}

/// Updates generator outputs, branch flows and bus voltages from a
/// converged AC solution.
#[allow(clippy::too_many_arguments)]
fn pfsoln(
    network: &Network,
    case: &Case,
    y_bus: &CsMat<Complex64>,
    y_f: &CsMat<Complex64>,
    y_t: &CsMat<Complex64>,
    v: &[Complex64],
    pg: &[f64],
    slack: usize,
    out: &mut LoadFlowResult,
) {
    let base_mva = case.base_mva;
    let nb = case.bus.len();

    let i_bus = mul_vec(y_bus, v);
    let s_calc: Vec<Complex64> = v
        .iter()
        .zip(&i_bus)
        .map(|(v, i)| v * i.conj() * base_mva)
        .collect();

    let mut gens_at = vec![Vec::new(); nb];
    for (k, g) in case.gen.iter().enumerate() {
        gens_at[g.bus].push(k);
    }

    let mut p = pg.to_vec();
    let mut q: Vec<f64> = case.gen.iter().map(|g| g.qg).collect();

    // reactive output of regulating generators, shared equally at each bus
    for (i, at) in gens_at.iter().enumerate() {
        let b = &case.bus[i];
        if !(b.is_pv() || b.is_ref()) {
            continue;
        }
        let (regulating, fixed): (Vec<usize>, Vec<usize>) =
            at.iter().partition(|&&k| case.gen[k].regulating);
        if regulating.is_empty() {
            continue;
        }
        let q_fixed: f64 = fixed.iter().map(|&k| case.gen[k].qg).sum();
        let q_share = (s_calc[i].im + b.qd - q_fixed) / regulating.len() as f64;
        for k in regulating {
            q[k] = q_share;
        }
    }

    // slack generator (1st regulating gen at ref bus) takes the rest of
    // the active power
    if let Some(&first) = gens_at[slack]
        .iter()
        .find(|&&k| case.gen[k].regulating)
    {
        let others: f64 = gens_at[slack]
            .iter()
            .filter(|&&k| k != first)
            .map(|&k| p[k])
            .sum();
        p[first] = s_calc[slack].re + case.bus[slack].pd - others;
    }

    for (k, &e) in case.order.gen_i2e.iter().enumerate() {
        out.generators.push(InjectionState {
            id: network.generators[e].id.clone(),
            index: e,
            p: p[k],
            q: Some(q[k]),
        });
    }
    push_loads(network, case, true, out);

    let i_f = mul_vec(y_f, v);
    let i_t = mul_vec(y_t, v);
    for (k, br) in case.branch.iter().enumerate() {
        let (f, t) = (br.f_bus, br.t_bus);
        let s_f = v[f] * i_f[k].conj() * base_mva;
        let s_t = v[t] * i_t[k].conj() * base_mva;
        let e = case.order.branch_i2e[k];
        out.branches.push(BranchFlow {
            id: network.branches[e].id.clone(),
            index: e,
            p1: s_f.re,
            q1: s_f.im,
            p2: s_t.re,
            q2: s_t.im,
            i1: current(s_f.norm(), v[f].norm() * case.bus[f].base_kv),
            i2: current(s_t.norm(), v[t].norm() * case.bus[t].base_kv),
        });
    }

    push_buses(network, case, v, out);
}

fn push_loads(network: &Network, case: &Case, reactive: bool, out: &mut LoadFlowResult) {
    for &(e, _) in &case.order.load_i2e {
        let l = &network.loads[e];
        out.loads.push(InjectionState {
            id: l.id.clone(),
            index: e,
            p: l.p0,
            q: if reactive { Some(l.q0) } else { None },
        });
    }
}

fn push_buses(network: &Network, case: &Case, v: &[Complex64], out: &mut LoadFlowResult) {
    for (i, buses) in case.order.bus_i2e.iter().enumerate() {
        for &e in buses {
            out.buses.push(BusState {
                id: network.buses[e].id.clone(),
                index: e,
                v_magnitude: v[i].norm(),
                v_angle: v[i].arg().to_degrees(),
            });
        }
    }
}

fn solve_dc(
    network: &Network,
    case: &mut Case,
    params: &Parameters,
    lin_solver: &dyn LinearSolver,
    out: &mut LoadFlowResult,
) -> ComponentResult {
    let mut res = ComponentResult::new(case.component_num, ComponentStatus::NoCalculation);
    if !set_bus_types(case, network, &params.slack_bus_selection, true) {
        return res;
    }
    let (ref_, pv, pq) = bus_types(&case.bus, &case.gen, true);
    let slack = ref_[0];
    res.slack_bus_id = slack_bus_id(network, case, slack);
    let base_mva = case.base_mva;
    let nb = case.bus.len();

    let mut pg: Vec<f64> = case.gen.iter().map(|g| g.pg).collect();
    if params.distributed_slack {
        let imbalance = case.bus.iter().map(|b| b.pd + b.gs).sum::<f64>() - pg.iter().sum::<f64>();
        let remaining = distribute(&mut pg, &case.gen, params.balance_type, imbalance);
        res.distributed_active_power = imbalance - remaining;
        if remaining.abs() >= params.slack_bus_p_max_mismatch {
            log::warn!(
                "component {}: {} MW of active power imbalance cannot be distributed",
                case.component_num,
                remaining
            );
            res.status = ComponentStatus::Failed;
            return res;
        }
    }

    // build B matrices and phase shift injections
    let (b_bus, b_f, pbusinj, pfinj) =
        make_b_dc(nb, &case.branch, params.dc_use_transformer_ratio);

    // compute complex bus power injections (generation - load)
    // adjusted for phase shifters and real shunts
    let s_bus = make_sbus(base_mva, &case.bus, &case.gen, Some(&pg));
    let p_bus: Vec<f64> = (0..nb)
        .map(|i| s_bus[i].re - pbusinj[i] - case.bus[i].gs / base_mva)
        .collect();
    let va0: Vec<f64> = case.bus.iter().map(|b| b.va.to_radians()).collect();

    // "run" the power flow
    let va = match dc_pf(&b_bus, &p_bus, &va0, &ref_, &pv, &pq, lin_solver) {
        Ok((va, true)) => va,
        Ok((_, false)) => {
            log::warn!("component {}: voltage angles diverged", case.component_num);
            res.status = ComponentStatus::SolverFailed;
            return res;
        }
        Err(err) => {
            log::warn!("component {}: {}", case.component_num, err);
            res.status = ComponentStatus::SolverFailed;
            return res;
        }
    };
    res.status = ComponentStatus::Converged;
    res.iteration_count = 1;

    // update Pg for slack generator (1st gen at ref bus)
    //      newPg = oldPg + newPinj - oldPinj
    let p_ref = mul_vec(&b_bus, &va)[slack];
    let mismatch = (p_ref - p_bus[slack]) * base_mva;
    res.slack_bus_active_power_mismatch = mismatch;
    if let Some(first) = case.gen.iter().position(|g| g.bus == slack) {
        pg[first] += mismatch;
    }

    for (k, &e) in case.order.gen_i2e.iter().enumerate() {
        out.generators.push(InjectionState {
            id: network.generators[e].id.clone(),
            index: e,
            p: pg[k],
            q: None,
        });
    }
    push_loads(network, case, false, out);

    let pf: Vec<f64> = mul_vec(&b_f, &va)
        .iter()
        .zip(&pfinj)
        .map(|(pf, pfinj)| (pf + pfinj) * base_mva)
        .collect();
    for (k, br) in case.branch.iter().enumerate() {
        let e = case.order.branch_i2e[k];
        out.branches.push(BranchFlow {
            id: network.branches[e].id.clone(),
            index: e,
            p1: pf[k],
            q1: 0.0,
            p2: -pf[k],
            q2: 0.0,
            i1: current(pf[k].abs(), case.bus[br.f_bus].base_kv),
            i2: current(pf[k].abs(), case.bus[br.t_bus].base_kv),
        });
    }

    let v: Vec<Complex64> = va.iter().map(|&a| Complex64::from_polar(1.0, a)).collect();
    push_buses(network, case, &v, out);

    res
}
