//! End-to-end scenarios on meshed models, checked against closed-form
//! elasticity results where available.

use nalgebra::Vector3;
use tde_model::{AndersonianRemote, Coulomb, Material, Model, Surface, UniformRemote};
use tde_solver::{Solution, Solver, SolverConfig};

/// Triangulated disk of the given radius in the plane z = `z`: a central
/// fan plus annulus bands, `sectors` triangles around, `rings` bands.
fn disk_mesh(radius: f64, rings: usize, sectors: usize, z: f64) -> (Vec<f64>, Vec<usize>) {
    let mut verts = vec![0.0, 0.0, z];
    for k in 1..=rings {
        let r = radius * k as f64 / rings as f64;
        for j in 0..sectors {
            let a = 2.0 * std::f64::consts::PI * j as f64 / sectors as f64;
            verts.extend_from_slice(&[r * a.cos(), r * a.sin(), z]);
        }
    }
    let idx = |k: usize, j: usize| 1 + (k - 1) * sectors + (j % sectors);
    let mut indices = Vec::new();
    for j in 0..sectors {
        indices.extend_from_slice(&[0, idx(1, j), idx(1, j + 1)]);
    }
    for k in 1..rings {
        for j in 0..sectors {
            let (a, b) = (idx(k, j), idx(k, j + 1));
            let (c, d) = (idx(k + 1, j + 1), idx(k + 1, j));
            indices.extend_from_slice(&[a, d, c]);
            indices.extend_from_slice(&[a, c, b]);
        }
    }
    (verts, indices)
}

fn disk_model(radius: f64, rings: usize, sectors: usize, z: f64, half_space: bool) -> Model {
    let (verts, indices) = disk_mesh(radius, rings, sectors, z);
    let mut model = Model::new(Material::new(0.25, 1.0, 0.0), half_space);
    let mut s = Surface::from_arrays(&verts, &indices).unwrap();
    s.set_bc("normal", "free", 0.0).unwrap();
    model.add_surface(s);
    model
}

/// Penny-shaped crack under uniform remote normal stress: the central
/// opening follows Sneddon's closed form 8(1−ν²)σa/(πE).
#[test]
fn penny_crack_matches_analytic_opening() {
    let mut model = disk_model(1.0, 7, 16, 0.0, false);
    model.add_remote(Box::new(UniformRemote::from_flat([
        0.0, 0.0, 0.0, 0.0, 0.0, -1.0,
    ])));
    let mut solver = Solver::new(SolverConfig {
        max_iterations: 2000,
        tolerance: 1e-8,
        ..SolverConfig::default()
    });
    let report = solver.run(&model).unwrap();
    assert!(
        report.residual < 1e-6,
        "penny solve residual {}",
        report.residual
    );

    // Largest closing sits at the central fan elements.
    let center_b = solver.burgers()[0].x;
    let nu = 0.25_f64;
    let expected = -8.0 * (1.0 - nu * nu) / std::f64::consts::PI;
    assert!(center_b < 0.0, "compression must close the crack");
    assert!(
        (center_b - expected).abs() < 0.12 * expected.abs(),
        "central opening {center_b} vs analytic {expected}"
    );

    // The opening profile decreases toward the rim.
    let n = solver.burgers().len();
    let rim_b = solver.burgers()[n - 1].x;
    assert!(rim_b.abs() < center_b.abs());
}

/// Scaling every load by α scales Burgers and fields by α, and the sum of
/// two loadings solves like their superposition.
#[test]
fn linearity_and_superposition_of_loadings() {
    let probe = [0.4, -0.2, 0.9, 2.0, 1.0, 0.5];

    let solve = |zz: f64, xz: f64, pressure: f64| -> (Vec<Vector3<f64>>, Vec<f64>, Vec<f64>) {
        let mut model = disk_model(1.0, 3, 8, 0.0, false);
        model.surfaces_mut()[0]
            .set_bc("normal", "free", pressure)
            .unwrap();
        model.add_remote(Box::new(UniformRemote::from_flat([
            0.0, 0.0, xz, 0.0, 0.0, zz,
        ])));
        let mut solver = Solver::new(SolverConfig {
            max_iterations: 1000,
            ..SolverConfig::default()
        });
        let report = solver.run(&model).unwrap();
        assert!(report.residual < 1e-7);
        let sol = Solution::from_solver(&model, &solver).unwrap();
        (
            solver.burgers().to_vec(),
            sol.displacement(&probe).unwrap(),
            sol.stress(&probe).unwrap(),
        )
    };

    let (b1, u1, s1) = solve(-1.0, 0.0, 0.0);
    let (b2, u2, s2) = solve(0.0, 0.5, 0.0);
    let (b3, u3, s3) = solve(0.0, 0.0, -0.7);
    let (alpha1, alpha2, alpha3) = (2.0, -1.0, 0.5);
    let (bc, uc, sc) = solve(-1.0 * alpha1, 0.5 * alpha2, -0.7 * alpha3);

    for i in 0..bc.len() {
        let combo = b1[i] * alpha1 + b2[i] * alpha2 + b3[i] * alpha3;
        assert!(
            (bc[i] - combo).norm() < 1e-6 * combo.norm().max(1e-9),
            "triangle {i}"
        );
    }
    for i in 0..uc.len() {
        let combo = alpha1 * u1[i] + alpha2 * u2[i] + alpha3 * u3[i];
        assert!((uc[i] - combo).abs() < 1e-6 * (1.0 + combo.abs()));
    }
    for i in 0..sc.len() {
        let combo = alpha1 * s1[i] + alpha2 * s2[i] + alpha3 * s3[i];
        assert!((sc[i] - combo).abs() < 1e-6 * (1.0 + combo.abs()));
    }
}

/// Reusing the assembled operator across unit loadings reproduces the
/// composite solution from stored fields.
#[test]
fn stored_unit_loadings_reconstruct_composite() {
    let mut model = disk_model(1.0, 3, 8, 0.0, false);
    let mut solver = Solver::new(SolverConfig {
        auto_release_memory: false,
        max_iterations: 1000,
        ..SolverConfig::default()
    });
    let probe = [1.5, 0.5, 0.8];

    let mut unit_disp = Vec::new();
    let loads = [
        [0.0, 0.0, 0.0, 0.0, 0.0, -1.0],
        [0.0, 0.0, 1.0, 0.0, 0.0, 0.0],
        [0.0, 0.0, 0.0, 0.0, 1.0, 0.0],
    ];
    for load in loads {
        model.clear_remotes();
        model.add_remote(Box::new(UniformRemote::from_flat(load)));
        let report = solver.run(&model).unwrap();
        assert!(report.residual < 1e-7);
        let sol = Solution::from_solver(&model, &solver).unwrap();
        unit_disp.push(sol.displacement(&probe).unwrap());
    }
    // All three solves after the first reuse the operator.
    assert_eq!(solver.assembly_count(), 1);

    let weights = [1.5, -2.0, 0.25];
    model.clear_remotes();
    let mut combo = [0.0; 6];
    for (w, load) in weights.iter().zip(loads) {
        for (c, l) in combo.iter_mut().zip(load) {
            *c += w * l;
        }
    }
    model.add_remote(Box::new(UniformRemote::from_flat(combo)));
    let report = solver.run(&model).unwrap();
    assert!(report.residual < 1e-7);
    let sol = Solution::from_solver(&model, &solver).unwrap();
    let direct = sol.displacement(&probe).unwrap();

    for i in 0..direct.len() {
        let rebuilt: f64 = weights.iter().zip(&unit_disp).map(|(w, u)| w * u[i]).sum();
        assert!(
            (direct[i] - rebuilt).abs() < 1e-6 * (1.0 + rebuilt.abs()),
            "component {i}: {} vs {}",
            direct[i],
            rebuilt
        );
    }
}

/// Ten equal load increments with warm starts end at the single-step
/// solution for a purely linear model.
#[test]
fn incremental_loading_matches_single_step() {
    let mut model = disk_model(1.0, 3, 8, 0.0, false);
    let mut stepped = Solver::new(SolverConfig {
        warm_start: true,
        auto_release_memory: false,
        max_iterations: 1000,
        ..SolverConfig::default()
    });
    let probe = [0.3, 0.1, 0.6];
    let mut u_at_steps = Vec::new();
    for k in 1..=10 {
        model.clear_remotes();
        model.add_remote(Box::new(UniformRemote::from_flat([
            0.0,
            0.0,
            0.0,
            0.0,
            0.0,
            -0.1 * k as f64,
        ])));
        let report = stepped.run(&model).unwrap();
        assert!(report.residual < 1e-7);
        let sol = Solution::from_solver(&model, &stepped).unwrap();
        u_at_steps.push(sol.displacement(&probe).unwrap());
    }
    assert_eq!(stepped.assembly_count(), 1);

    let mut fresh_model = disk_model(1.0, 3, 8, 0.0, false);
    fresh_model.add_remote(Box::new(UniformRemote::from_flat([
        0.0, 0.0, 0.0, 0.0, 0.0, -1.0,
    ])));
    let mut direct = Solver::new(SolverConfig {
        max_iterations: 1000,
        ..SolverConfig::default()
    });
    direct.run(&fresh_model).unwrap();
    let sol = Solution::from_solver(&fresh_model, &direct).unwrap();
    let u_direct = sol.displacement(&probe).unwrap();

    let last = u_at_steps.last().unwrap();
    for (a, b) in last.iter().zip(&u_direct) {
        assert!((a - b).abs() < 1e-6 * (1.0 + b.abs()));
    }
    // Intermediate steps follow linear scaling.
    for (k, u) in u_at_steps.iter().enumerate() {
        let f = (k + 1) as f64 / 10.0;
        for (a, b) in u.iter().zip(&u_direct) {
            assert!((a - f * b).abs() < 1e-6 * (1.0 + b.abs()));
        }
    }
}

/// Buried crack in a half-space: the solve converges and the induced
/// traction on the free surface vanishes away from the crack.
#[test]
fn half_space_free_surface_traction_is_small() {
    let mut model = disk_model(1.0, 4, 12, -2.0, true);
    model.add_remote(Box::new(UniformRemote::from_flat([
        0.0, 0.0, 0.0, 0.0, 0.0, -1.0,
    ])));
    let mut solver = Solver::new(SolverConfig {
        max_iterations: 2000,
        tolerance: 1e-8,
        ..SolverConfig::default()
    });
    let report = solver.run(&model).unwrap();
    assert!(report.residual < 1e-6, "residual {}", report.residual);

    let material = model.material();
    let sol = Solution::from_solver(&model, &solver).unwrap();
    for r in [5.0, 6.5, 8.0] {
        let p = Vector3::new(r, 0.3 * r, 0.0);
        let induced = material.stress_from_strain(&sol.strain_at(&p));
        let t = induced.traction(&Vector3::z());
        assert!(
            t.norm() < 2e-2,
            "free-surface traction {t:?} at distance {r}"
        );
    }
}

/// The same buried crack solved very deep approaches the whole-space
/// solution.
#[test]
fn deep_half_space_matches_whole_space() {
    let deep = -50.0;
    let mut hs_model = disk_model(1.0, 3, 8, deep, true);
    hs_model.add_remote(Box::new(UniformRemote::from_flat([
        0.0, 0.0, 0.0, 0.0, 0.0, -1.0,
    ])));
    let mut hs = Solver::new(SolverConfig {
        max_iterations: 1000,
        ..SolverConfig::default()
    });
    hs.run(&hs_model).unwrap();

    let mut ws_model = disk_model(1.0, 3, 8, deep, false);
    ws_model.add_remote(Box::new(UniformRemote::from_flat([
        0.0, 0.0, 0.0, 0.0, 0.0, -1.0,
    ])));
    let mut ws = Solver::new(SolverConfig {
        max_iterations: 1000,
        ..SolverConfig::default()
    });
    ws.run(&ws_model).unwrap();

    for (a, b) in hs.burgers().iter().zip(ws.burgers()) {
        assert!(
            (a - b).norm() < 5e-2 * b.norm().max(1e-9),
            "half-space {a:?} vs whole-space {b:?}"
        );
    }
}

/// Square fault dipping 60° under an Andersonian stress state with Coulomb
/// friction: residual tractions end on or inside the cone, and sliding
/// elements slip along the resolved shear direction.
#[test]
fn coulomb_fault_respects_the_friction_cone() {
    let dip = 60_f64.to_radians();
    let (c, s) = (dip.cos(), dip.sin());
    let verts = [
        0.0, 0.0, -1.0, //
        1.0, 0.0, -1.0, //
        1.0, c, -1.0 - s, //
        0.0, c, -1.0 - s,
    ];
    let indices = [0, 1, 2, 0, 2, 3];
    let mut model = Model::new(Material::new(0.25, 1.0, 0.0), false);
    let mut surface = Surface::from_arrays(&verts, &indices).unwrap();
    // Normal axis stays locked (the fault transmits compression); shear
    // axes are free and limited by friction.
    surface.set_bc("strike", "free", 0.0).unwrap();
    surface.set_bc("dip", "free", 0.0).unwrap();
    let friction = 0.6;
    surface.add_constraint(Box::new(Coulomb::new(friction, 0.0)));
    model.add_surface(surface);
    model.add_remote(Box::new(AndersonianRemote::new(
        1.0,
        1.0,
        0.6,
        0.1,
        45_f64.to_radians(),
    )));

    let mut solver = Solver::new(SolverConfig {
        max_iterations: 1000,
        tolerance: 1e-8,
        ..SolverConfig::default()
    });
    let report = solver.run(&model).unwrap();
    assert!(
        report.residual < 1e-6,
        "friction solve stalled at {}",
        report.residual
    );

    let sol = Solution::from_solver(&model, &solver).unwrap();
    for (t, tri) in model.surfaces()[0].triangles().iter().enumerate() {
        let p = tri.center() + tri.normal() * 1e-6;
        let traction = sol.stress_at(&p).traction(&tri.normal());
        let local = tri.to_local(&traction);
        let sigma_n = local.x;
        let tau = (local.y * local.y + local.z * local.z).sqrt();
        assert!(sigma_n < 0.0, "fault must stay in compression");
        let tau_max = -sigma_n * friction;
        assert!(
            tau <= tau_max + 1e-5,
            "triangle {t}: shear {tau} exceeds strength {tau_max}"
        );

        // Where the element slides, slip and resolved shear are collinear.
        let b = solver.burgers()[t];
        let slip = (b.y * b.y + b.z * b.z).sqrt();
        if slip > 1e-9 && tau > 1e-9 {
            let cosine = (b.y * local.y + b.z * local.z) / (slip * tau);
            assert!(
                cosine.abs() > 0.95,
                "triangle {t}: slip not collinear with shear (cos {cosine})"
            );
        }
    }
}

/// A fault locked by very high friction does not slip at all.
#[test]
fn high_friction_locks_the_fault() {
    let dip = 60_f64.to_radians();
    let (c, s) = (dip.cos(), dip.sin());
    let verts = [
        0.0, 0.0, -1.0, //
        1.0, 0.0, -1.0, //
        1.0, c, -1.0 - s, //
        0.0, c, -1.0 - s,
    ];
    let mut model = Model::new(Material::new(0.25, 1.0, 0.0), false);
    let mut surface = Surface::from_arrays(&verts, &[0, 1, 2, 0, 2, 3]).unwrap();
    surface.set_bc("strike", "free", 0.0).unwrap();
    surface.set_bc("dip", "free", 0.0).unwrap();
    surface.add_constraint(Box::new(Coulomb::new(100.0, 0.0)));
    model.add_surface(surface);
    model.add_remote(Box::new(AndersonianRemote::new(
        1.0,
        1.0,
        0.6,
        0.1,
        45_f64.to_radians(),
    )));

    let mut solver = Solver::new(SolverConfig {
        max_iterations: 500,
        ..SolverConfig::default()
    });
    solver.run(&model).unwrap();
    for b in solver.burgers() {
        assert!(b.y.abs() < 1e-9, "strike slip {b:?}");
        assert!(b.z.abs() < 1e-9, "dip slip {b:?}");
    }
}
