#![allow(dead_code)]

use chargefit::{
    Atom, AtomTypeKey, Bond, ChargeMethod, Charges, Eem, Molecule, MoleculeSet, default_registry,
    periodic,
};

pub struct TestCase<'a> {
    pub name: &'a str,
    pub molecule: Molecule,
    pub expected: Vec<(usize, f64)>,
}

pub fn atom(symbol: &str, position: [f64; 3]) -> Atom {
    charged_atom(symbol, position, 0)
}

pub fn charged_atom(symbol: &str, position: [f64; 3], formal_charge: i32) -> Atom {
    let element = periodic::lookup(symbol).expect("test element exists");
    Atom::new(element, position, formal_charge)
}

pub fn make_diatomic(name: &str, x: &str, y: &str, dist: f64) -> Molecule {
    Molecule::new(
        name,
        vec![atom(x, [0.0, 0.0, 0.0]), atom(y, [dist, 0.0, 0.0])],
        &[Bond::new(0, 1, 1)],
    )
    .expect("valid diatomic")
}

pub fn make_water_like(name: &str, center: &str, outer: &str, r: f64, angle_deg: f64) -> Molecule {
    let half_angle = angle_deg.to_radians() / 2.0;
    let x = r * half_angle.sin();
    let y = r * half_angle.cos();
    Molecule::new(
        name,
        vec![
            atom(center, [0.0, 0.0, 0.0]),
            atom(outer, [x, y, 0.0]),
            atom(outer, [-x, y, 0.0]),
        ],
        &[Bond::new(0, 1, 1), Bond::new(0, 2, 1)],
    )
    .expect("valid water-like molecule")
}

pub fn make_ethene(name: &str) -> Molecule {
    Molecule::new(
        name,
        vec![
            atom("C", [-0.6672, 0.0, 0.0]),
            atom("C", [0.6672, 0.0, 0.0]),
            atom("H", [-1.2321, 0.9215, 0.0]),
            atom("H", [-1.2321, -0.9215, 0.0]),
            atom("H", [1.2321, 0.9215, 0.0]),
            atom("H", [1.2321, -0.9215, 0.0]),
        ],
        &[
            Bond::new(0, 1, 2),
            Bond::new(0, 2, 1),
            Bond::new(0, 3, 1),
            Bond::new(1, 4, 1),
            Bond::new(1, 5, 1),
        ],
    )
    .expect("valid ethene")
}

pub fn make_ethane(name: &str) -> Molecule {
    Molecule::new(
        name,
        vec![
            atom("C", [-0.7680, 0.0, 0.0]),
            atom("C", [0.7680, 0.0, 0.0]),
            atom("H", [-1.1573, 1.0277, 0.0]),
            atom("H", [-1.1573, -0.5138, 0.8900]),
            atom("H", [-1.1573, -0.5138, -0.8900]),
            atom("H", [1.1573, -1.0277, 0.0]),
            atom("H", [1.1573, 0.5138, 0.8900]),
            atom("H", [1.1573, 0.5138, -0.8900]),
        ],
        &[
            Bond::new(0, 1, 1),
            Bond::new(0, 2, 1),
            Bond::new(0, 3, 1),
            Bond::new(0, 4, 1),
            Bond::new(1, 5, 1),
            Bond::new(1, 6, 1),
            Bond::new(1, 7, 1),
        ],
    )
    .expect("valid ethane")
}

pub fn make_formaldehyde(name: &str) -> Molecule {
    Molecule::new(
        name,
        vec![
            atom("C", [0.0, 0.0, 0.0]),
            atom("O", [0.0, 0.0, 1.205]),
            atom("H", [0.0, 0.9429, -0.5876]),
            atom("H", [0.0, -0.9429, -0.5876]),
        ],
        &[Bond::new(0, 1, 2), Bond::new(0, 2, 1), Bond::new(0, 3, 1)],
    )
    .expect("valid formaldehyde")
}

/// An EEM instance with `kappa` and one `(element, scheme, tag, A, B)` row per entry.
pub fn make_eem(kappa: f64, rows: &[(&str, &str, &str, f64, f64)]) -> Eem {
    let mut eem = Eem::new();
    let store = eem.parameters_mut();
    store.set_common("kappa", kappa).expect("kappa is declared");
    for (element, scheme, tag, a, b) in rows {
        store
            .add_row(AtomTypeKey::new(*element, *scheme, *tag), vec![*a, *b])
            .expect("distinct rows");
    }
    eem
}

/// Plain-scheme EEM coefficients for H, C, N and O used as synthetic ground truth.
pub fn reference_eem() -> Eem {
    make_eem(
        0.42,
        &[
            ("H", "plain", "*", 2.40, 0.95),
            ("C", "plain", "*", 2.48, 0.90),
            ("N", "plain", "*", 2.58, 1.05),
            ("O", "plain", "*", 2.65, 1.15),
        ],
    )
}

/// A set typed against the rows of `method`'s store.
pub fn typed_set(molecules: Vec<Molecule>, method: &dyn ChargeMethod) -> MoleculeSet {
    let mut set = MoleculeSet::new(molecules).expect("unique names");
    set.assign_atom_types(method.parameters(), default_registry())
        .expect("every atom has parameters");
    set
}

/// Reference charges produced by `method` itself.
pub fn synthetic_reference(set: &MoleculeSet, method: &dyn ChargeMethod) -> Charges {
    method.calculate_all(set).expect("reference charges")
}

pub fn run_group_test(
    group_name: &str,
    method: &dyn ChargeMethod,
    cases: Vec<TestCase>,
    group_avg_limit: f64,
    group_max_limit: f64,
) {
    let mut group_total_error = 0.0;
    let mut group_max_error = 0.0;
    let mut total_data_points = 0;

    println!("\nRunning Group Test: {}", group_name);
    println!("{:-<80}", "");
    println!(
        "{:<20} | {:<10} | {:<10} | {:<10}",
        "Molecule", "Atom Idx", "Expected", "Calculated"
    );

    for case in cases {
        let set = typed_set(vec![case.molecule], method);
        let charges = method
            .calculate_charges(&set.molecules()[0])
            .expect("Charge calculation failed");

        for (index, expected_q) in &case.expected {
            let calculated_q = charges[*index];
            let error = (calculated_q - expected_q).abs();

            println!(
                "{:<20} | {:<10} | {:<10.4} | {:<10.4} (Err: {:.4})",
                case.name, index, expected_q, calculated_q, error
            );

            group_total_error += error;
            if error > group_max_error {
                group_max_error = error;
            }
            total_data_points += 1;
        }
    }

    let group_avg_error = if total_data_points > 0 {
        group_total_error / total_data_points as f64
    } else {
        0.0
    };

    println!("{:-<80}", "");
    println!("Group Statistics for '{}':", group_name);
    println!("  Total Data Points: {}", total_data_points);
    println!(
        "  Group Avg Error:   {:.4} (Limit: {:.4})",
        group_avg_error, group_avg_limit
    );
    println!(
        "  Group Max Error:   {:.4} (Limit: {:.4})",
        group_max_error, group_max_limit
    );
    println!("{:-<80}\n", "");

    assert!(
        group_avg_error <= group_avg_limit,
        "Group average error {:.4} exceeds limit {:.4}",
        group_avg_error,
        group_avg_limit
    );

    assert!(
        group_max_error <= group_max_limit,
        "Group maximum error {:.4} exceeds limit {:.4}",
        group_max_error,
        group_max_limit
    );
}
