//! Crate-level integration scenarios: small but complete geometries exercised end to end through
//! [`mocc::config::build`] and the outer solvers, mirroring how `pineappl/tests/` drives the
//! library through its public API rather than individual module internals.

use std::collections::HashMap;
use std::sync::Arc;

use mocc::core_mesh::{Assembly, Core, CoreMesh, Lattice};
use mocc::driver::{EigenvalueSolver, FixedSourceSolver};
use mocc::material::{Material, MaterialLib};
use mocc::pin::Pin;
use mocc::pin_mesh::{PinMesh, RectMesh};
use mocc::quadrature::{AngularQuadrature, Boundary};
use mocc::ray::{RayData, VolumeCorrection};
use mocc::scattering_matrix::ScatteringMatrix;
use mocc::xs_mesh::XSMesh;
use ndarray::Array2;

fn single_pin_mesh(boundary: Boundary, mat_lib: MaterialLib) -> CoreMesh {
    let mesh = Arc::new(PinMesh::Rectangular(RectMesh::uniform(1.0, 1.0, 1, 1).unwrap()));
    let mut pin_meshes = HashMap::new();
    pin_meshes.insert(1u32, mesh.clone());

    let mut pins = HashMap::new();
    pins.insert(0u32, Pin::new(0, 1, mesh.clone(), vec![1], &mat_lib, None).unwrap());

    let mut lattices = HashMap::new();
    lattices.insert(0u32, Lattice::new(0, 1, 1, vec![0], &pins).unwrap());

    let mut assemblies = HashMap::new();
    assemblies.insert(0u32, Assembly::new(0, vec![0], vec![1.0], vec![1], &lattices).unwrap());

    let core = Core::new(1, 1, vec![0], [boundary; 6], &assemblies).unwrap();
    CoreMesh::new(pin_meshes, mat_lib, pins, lattices, assemblies, core).unwrap()
}

/// E1: single pin, 1 group, vacuum BC, isotropic external source, pure absorber.
#[test]
fn single_pin_vacuum_external_source_stays_below_the_infinite_medium_balance() {
    let mut mat_lib = MaterialLib::new();
    let scat = ScatteringMatrix::from_dense(&[vec![0.0]]).unwrap();
    let mat = Material::new(vec![1.0], vec![0.0], vec![0.0], vec![0.0], scat).unwrap();
    mat_lib.add("absorber", mat).unwrap();
    mat_lib.assign_id(1, "absorber").unwrap();

    let mesh = single_pin_mesh(Boundary::Vacuum, mat_lib);
    let quad = AngularQuadrature::chebyshev_gauss(16, 2).unwrap();
    let ray_data = RayData::generate(&mesh, &quad, 0.01, VolumeCorrection::Angle).unwrap();

    let fsr_materials = mesh.fsr_materials();
    let xs_mesh = XSMesh::new(&fsr_materials, mesh.mat_lib(), vec![1.0]).unwrap();

    let fixed_source = Array2::<f64>::from_elem((mesh.n_reg(), 1), 1.0);
    let solver = FixedSourceSolver {
        tol_flux: 1e-7,
        max_inner: 200,
    };
    let (flux, iters) = solver.solve(&mesh, &ray_data, &quad, &xs_mesh, &fixed_source).unwrap();

    assert!(iters > 0);
    // an infinite (reflected) medium at the same source and sigma_a would settle at Q/sigma_a = 1;
    // leakage through the vacuum boundary can only lower the in-pin average.
    let avg: f64 = flux.column(0).iter().sum::<f64>() / flux.nrows() as f64;
    assert!(avg > 0.0 && avg < 1.0);
}

/// P6: uniform source, reflective boundaries on all faces, homogeneous material — pin flux
/// converges to Q/sigma_a, since a reflected, spatially uniform source has nowhere to leak.
#[test]
fn reflected_uniform_source_converges_to_q_over_sigma_a() {
    let sigma_a = 0.4_f64;
    let q = 0.8_f64;

    let mut mat_lib = MaterialLib::new();
    let scat = ScatteringMatrix::from_dense(&[vec![0.0]]).unwrap();
    let mat = Material::new(vec![sigma_a], vec![0.0], vec![0.0], vec![0.0], scat).unwrap();
    mat_lib.add("absorber", mat).unwrap();
    mat_lib.assign_id(1, "absorber").unwrap();

    let mesh = single_pin_mesh(Boundary::Reflect, mat_lib);
    let quad = AngularQuadrature::chebyshev_gauss(8, 2).unwrap();
    let ray_data = RayData::generate(&mesh, &quad, 0.05, VolumeCorrection::Angle).unwrap();

    let fsr_materials = mesh.fsr_materials();
    let xs_mesh = XSMesh::new(&fsr_materials, mesh.mat_lib(), vec![1.0]).unwrap();

    let fixed_source = Array2::<f64>::from_elem((mesh.n_reg(), 1), q);
    let solver = FixedSourceSolver {
        tol_flux: 1e-9,
        max_inner: 300,
    };
    let (flux, _iters) = solver.solve(&mesh, &ray_data, &quad, &xs_mesh, &fixed_source).unwrap();

    let expected = q / sigma_a;
    for &v in flux.column(0) {
        assert!((v - expected).abs() < 1e-4, "flux {v} expected {expected}");
    }
}

/// E2: 2x2 lattice of identical pins, reflective boundaries, 2 groups, chi = (1, 0), down-scatter
/// only. Reflective boundaries on an all-identical lattice reduce to an infinite medium, whose
/// k-eigenvalue has a closed form: k = nuSigf2 * sigma_s(1->2) / (sigma_a2 * sigma_tr1).
#[test]
fn two_by_two_reflected_lattice_matches_the_infinite_medium_eigenvalue() {
    let sigma_a1 = 0.01;
    let sigma_s12 = 0.02;
    let sigma_a2 = 0.08;
    let nu_sigf2 = 2.43 * 0.05;

    let mut mat_lib = MaterialLib::new();
    // from_dense takes scat[to][from]: group 1 down-scatters into group 2 only.
    let scat = ScatteringMatrix::from_dense(&[vec![0.0, 0.0], vec![sigma_s12, 0.0]]).unwrap();
    let mat = Material::new(
        vec![sigma_a1, sigma_a2],
        vec![0.0, nu_sigf2],
        vec![0.0, nu_sigf2],
        vec![1.0, 0.0],
        scat,
    )
    .unwrap();
    mat_lib.add("fuel", mat).unwrap();
    mat_lib.assign_id(1, "fuel").unwrap();

    let pin_mesh = Arc::new(PinMesh::Rectangular(RectMesh::uniform(1.26, 1.26, 1, 1).unwrap()));
    let mut pin_meshes = HashMap::new();
    pin_meshes.insert(1u32, pin_mesh.clone());

    let mut pins = HashMap::new();
    pins.insert(0u32, Pin::new(0, 1, pin_mesh.clone(), vec![1], &mat_lib, None).unwrap());

    let mut lattices = HashMap::new();
    lattices.insert(0u32, Lattice::new(0, 2, 2, vec![0, 0, 0, 0], &pins).unwrap());

    let mut assemblies = HashMap::new();
    assemblies.insert(0u32, Assembly::new(0, vec![0], vec![1.0], vec![1], &lattices).unwrap());

    let core = Core::new(1, 1, vec![0], [Boundary::Reflect; 6], &assemblies).unwrap();
    let mesh = CoreMesh::new(pin_meshes, mat_lib, pins, lattices, assemblies, core).unwrap();

    let quad = AngularQuadrature::chebyshev_gauss(8, 2).unwrap();
    let ray_data = RayData::generate(&mesh, &quad, 0.05, VolumeCorrection::Angle).unwrap();

    let solver = EigenvalueSolver {
        max_outer: 40,
        use_cmfd: false,
        ..EigenvalueSolver::default()
    };
    let (k, _flux, history) = solver.solve(&mesh, &ray_data, &quad, &[1e6, 1.0]).unwrap();

    let k_inf = nu_sigf2 * sigma_s12 / (sigma_a2 * (sigma_a1 + sigma_s12));
    assert!(history.n_outer() > 0);
    assert!((k - k_inf).abs() < 5e-3, "k = {k}, k_inf = {k_inf}");
}

/// E2 variant with CMFD acceleration enabled: the same infinite-medium closed form must hold
/// when the outer loop goes through the CMFD-accelerated power iteration rather than plain MoC
/// source iteration, which exercises CMFD's per-group in-scatter source term across groups.
#[test]
fn two_by_two_reflected_lattice_matches_the_infinite_medium_eigenvalue_with_cmfd() {
    let sigma_a1 = 0.01;
    let sigma_s12 = 0.02;
    let sigma_a2 = 0.08;
    let nu_sigf2 = 2.43 * 0.05;

    let mut mat_lib = MaterialLib::new();
    let scat = ScatteringMatrix::from_dense(&[vec![0.0, 0.0], vec![sigma_s12, 0.0]]).unwrap();
    let mat = Material::new(
        vec![sigma_a1, sigma_a2],
        vec![0.0, nu_sigf2],
        vec![0.0, nu_sigf2],
        vec![1.0, 0.0],
        scat,
    )
    .unwrap();
    mat_lib.add("fuel", mat).unwrap();
    mat_lib.assign_id(1, "fuel").unwrap();

    let pin_mesh = Arc::new(PinMesh::Rectangular(RectMesh::uniform(1.26, 1.26, 1, 1).unwrap()));
    let mut pin_meshes = HashMap::new();
    pin_meshes.insert(1u32, pin_mesh.clone());

    let mut pins = HashMap::new();
    pins.insert(0u32, Pin::new(0, 1, pin_mesh.clone(), vec![1], &mat_lib, None).unwrap());

    let mut lattices = HashMap::new();
    lattices.insert(0u32, Lattice::new(0, 2, 2, vec![0, 0, 0, 0], &pins).unwrap());

    let mut assemblies = HashMap::new();
    assemblies.insert(0u32, Assembly::new(0, vec![0], vec![1.0], vec![1], &lattices).unwrap());

    let core = Core::new(1, 1, vec![0], [Boundary::Reflect; 6], &assemblies).unwrap();
    let mesh = CoreMesh::new(pin_meshes, mat_lib, pins, lattices, assemblies, core).unwrap();

    let quad = AngularQuadrature::chebyshev_gauss(8, 2).unwrap();
    let ray_data = RayData::generate(&mesh, &quad, 0.05, VolumeCorrection::Angle).unwrap();

    let solver = EigenvalueSolver {
        max_outer: 40,
        use_cmfd: true,
        ..EigenvalueSolver::default()
    };
    let (k, _flux, history) = solver.solve(&mesh, &ray_data, &quad, &[1e6, 1.0]).unwrap();

    let k_inf = nu_sigf2 * sigma_s12 / (sigma_a2 * (sigma_a1 + sigma_s12));
    assert!(history.n_outer() > 0);
    assert!((k - k_inf).abs() < 5e-3, "k = {k}, k_inf = {k_inf}");
}

/// E6: a 5-plane core with plane sequence [A, B, A, B, A] stores exactly 2 unique planes, and
/// RayData traces exactly that many plane layouts.
#[test]
fn five_plane_alternating_core_deduplicates_to_two_unique_planes() {
    let mut mat_lib = MaterialLib::new();
    let scat = ScatteringMatrix::from_dense(&[vec![0.2]]).unwrap();
    let mat = Material::new(vec![0.5], vec![0.05], vec![0.07], vec![1.0], scat).unwrap();
    mat_lib.add("fuel", mat).unwrap();
    mat_lib.assign_id(1, "fuel").unwrap();

    let mesh_a = Arc::new(PinMesh::Rectangular(RectMesh::uniform(1.0, 1.0, 1, 1).unwrap()));
    let mesh_b = Arc::new(PinMesh::Rectangular(RectMesh::uniform(1.0, 1.0, 2, 1).unwrap()));
    let mut pin_meshes = HashMap::new();
    pin_meshes.insert(1u32, mesh_a.clone());
    pin_meshes.insert(2u32, mesh_b.clone());

    let mut pins = HashMap::new();
    pins.insert(0u32, Pin::new(0, 1, mesh_a.clone(), vec![1], &mat_lib, None).unwrap());
    pins.insert(1u32, Pin::new(1, 2, mesh_b.clone(), vec![1, 1], &mat_lib, None).unwrap());

    let mut lattices = HashMap::new();
    lattices.insert(0u32, Lattice::new(0, 1, 1, vec![0], &pins).unwrap()); // A
    lattices.insert(1u32, Lattice::new(1, 1, 1, vec![1], &pins).unwrap()); // B

    let mut assemblies = HashMap::new();
    assemblies
        .insert(0u32, Assembly::new(0, vec![0, 1, 0, 1, 0], vec![1.0; 5], vec![1, 1, 1, 1, 1], &lattices).unwrap());

    let core = Core::new(1, 1, vec![0], [Boundary::Reflect; 6], &assemblies).unwrap();
    let mesh = CoreMesh::new(pin_meshes, mat_lib, pins, lattices, assemblies, core).unwrap();

    assert_eq!(mesh.n_unique_planes(), 2);

    let quad = AngularQuadrature::chebyshev_gauss(4, 2).unwrap();
    let ray_data = RayData::generate(&mesh, &quad, 0.1, VolumeCorrection::Flat).unwrap();
    // rays are only traced per geometrically-unique plane, so the total ray storage spans
    // n_unique_planes * n_angle entries rather than n_plane (5) * n_angle.
    assert_eq!(ray_data.plane(0).len(), ray_data.n_angle());
    assert_eq!(ray_data.plane(1).len(), ray_data.n_angle());

    // planes 0, 2, 4 share the same unique-plane layout (A), so their fine-plane index resolves
    // to the same entry in the unique-plane table.
    assert_eq!(mesh.unique_plane_id(0), mesh.unique_plane_id(2));
    assert_eq!(mesh.unique_plane_id(2), mesh.unique_plane_id(4));
    assert_ne!(mesh.unique_plane_id(0), mesh.unique_plane_id(1));
}
