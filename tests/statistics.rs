mod common;

use approx::assert_relative_eq;
use chargefit::{AtomTypeKey, ChargeError, Charges, MoleculeSet, Plain, stats};
use common::{make_diatomic, make_water_like};
use tempfile::tempdir;

fn charges(entries: &[(&str, &[f64])]) -> Charges {
    entries
        .iter()
        .map(|(name, values)| (name.to_string(), values.to_vec()))
        .collect()
}

fn plain_set() -> MoleculeSet {
    let mut set = MoleculeSet::new(vec![
        make_diatomic("CO", "C", "O", 1.128),
        make_water_like("water", "O", "H", 0.96, 104.5),
        make_diatomic("OH", "O", "H", 0.97),
    ])
    .unwrap();
    set.classify_atoms(&Plain);
    set
}

#[test]
fn total_is_the_mean_of_per_molecule_metrics() {
    let reference = charges(&[
        ("CO", &[0.1, -0.1]),
        ("water", &[-0.8, 0.4, 0.4]),
        ("OH", &[-0.4, 0.4]),
    ]);
    let computed = charges(&[
        ("CO", &[0.2, -0.2]),
        ("water", &[-0.8, 0.4, 0.4]),
        ("OH", &[-0.1, 0.1]),
    ]);

    let total = stats::total(&reference, &computed).unwrap();

    let per_molecule: Vec<_> = reference
        .iter()
        .map(|(name, x)| stats::compare(x, computed.get(name).unwrap()))
        .collect();
    let mean = |f: fn(&stats::Statistics) -> f64| per_molecule.iter().map(f).sum::<f64>() / 3.0;

    assert_relative_eq!(total.rmsd, mean(|s| s.rmsd), epsilon = 1e-12);
    assert_relative_eq!(total.avg_abs_diff, mean(|s| s.avg_abs_diff), epsilon = 1e-12);
    assert_relative_eq!(total.max_abs_diff, mean(|s| s.max_abs_diff), epsilon = 1e-12);
    assert_relative_eq!(
        total.pearson_squared,
        mean(|s| s.pearson_squared),
        epsilon = 1e-12
    );
    // CO is off by 0.1 everywhere, water is exact, OH is off by 0.3 everywhere.
    assert_relative_eq!(total.rmsd, 0.4 / 3.0, epsilon = 1e-12);
}

#[test]
fn nan_molecules_are_dropped_from_the_average() {
    let reference = charges(&[("CO", &[0.1, -0.1]), ("OH", &[-0.4, 0.4])]);
    let computed = charges(&[("CO", &[0.3, -0.3]), ("OH", &[f64::NAN, f64::NAN])]);

    let total = stats::total(&reference, &computed).unwrap();
    assert_relative_eq!(total.rmsd, 0.2, epsilon = 1e-12);
    assert_relative_eq!(total.max_abs_diff, 0.2, epsilon = 1e-12);
    assert_relative_eq!(total.pearson_squared, 1.0, epsilon = 1e-12);
}

#[test]
fn a_nan_in_the_reference_also_excludes_the_molecule() {
    let reference = charges(&[("CO", &[f64::NAN, -0.1]), ("OH", &[-0.4, 0.4])]);
    let computed = charges(&[("CO", &[5.0, -5.0]), ("OH", &[-0.4, 0.4])]);

    let total = stats::total(&reference, &computed).unwrap();
    assert_eq!(total.rmsd, 0.0);
    assert_eq!(total.max_abs_diff, 0.0);
}

#[test]
fn statistics_stay_finite_when_nothing_is_valid() {
    let reference = charges(&[("CO", &[0.1, -0.1])]);
    let computed = charges(&[("CO", &[f64::NAN, f64::NAN])]);

    let total = stats::total(&reference, &computed).unwrap();
    assert_eq!(total.rmsd, 0.0);
    assert_eq!(total.avg_abs_diff, 0.0);
    assert_eq!(total.max_abs_diff, 0.0);
    assert_eq!(total.pearson_squared, 0.0);

    let empty = Charges::new();
    let total = stats::total(&empty, &empty).unwrap();
    assert_eq!(total.rmsd, 0.0);
}

#[test]
fn per_atom_type_pools_and_skips_invalid_atoms() {
    let set = plain_set();
    let reference = charges(&[
        ("CO", &[0.1, -0.1]),
        ("water", &[-0.8, 0.4, 0.4]),
        ("OH", &[-0.4, 0.4]),
    ]);
    let computed = charges(&[
        ("CO", &[f64::NAN, -0.2]),
        ("water", &[-0.6, 0.3, 0.3]),
        ("OH", &[-0.4, 0.5]),
    ]);

    let per_type = stats::per_atom_type(&set, &reference, &computed).unwrap();
    let keys: Vec<&AtomTypeKey> = per_type.iter().map(|(key, _)| key).collect();
    assert_eq!(
        keys,
        vec![
            &AtomTypeKey::new("O", "plain", "*"),
            &AtomTypeKey::new("H", "plain", "*"),
        ]
    );

    // O pools CO[1], water[0] and OH[0]: errors 0.1, 0.2 and 0.0.
    let oxygen = &per_type[0].1;
    assert_relative_eq!(oxygen.max_abs_diff, 0.2, epsilon = 1e-12);
    assert_relative_eq!(oxygen.avg_abs_diff, 0.1, epsilon = 1e-12);
    assert_relative_eq!(oxygen.rmsd, (0.05f64 / 3.0).sqrt(), epsilon = 1e-12);

    // H pools water[1], water[2] and OH[1]: errors 0.1 each.
    let hydrogen = &per_type[1].1;
    assert_relative_eq!(hydrogen.rmsd, 0.1, epsilon = 1e-12);
    assert_relative_eq!(hydrogen.max_abs_diff, 0.1, epsilon = 1e-12);
}

#[test]
fn a_type_without_valid_atoms_is_omitted() {
    let mut set = MoleculeSet::new(vec![make_diatomic("CO", "C", "O", 1.128)]).unwrap();
    set.classify_atoms(&Plain);

    let reference = charges(&[("CO", &[0.1, -0.1])]);
    let computed = charges(&[("CO", &[f64::NAN, -0.1])]);

    let per_type = stats::per_atom_type(&set, &reference, &computed).unwrap();
    assert_eq!(per_type.len(), 1);
    assert_eq!(per_type[0].0, AtomTypeKey::new("O", "plain", "*"));
}

#[test]
fn per_atom_type_requires_classified_atoms() {
    let set = MoleculeSet::new(vec![make_diatomic("CO", "C", "O", 1.128)]).unwrap();
    let values = charges(&[("CO", &[0.1, -0.1])]);
    assert!(matches!(
        stats::per_atom_type(&set, &values, &values),
        Err(ChargeError::UntypedAtom { .. })
    ));
}

#[test]
fn mismatched_charge_vectors_are_rejected() {
    let set = plain_set();
    let reference = charges(&[
        ("CO", &[0.1, -0.1]),
        ("water", &[-0.8, 0.4, 0.4]),
        ("OH", &[-0.4, 0.4]),
    ]);
    let short = charges(&[
        ("CO", &[0.1, -0.1]),
        ("water", &[-0.8, 0.4]),
        ("OH", &[-0.4, 0.4]),
    ]);

    let err = stats::total(&reference, &short).unwrap_err();
    assert!(matches!(
        err,
        ChargeError::ChargeCountMismatch { ref name, expected: 3, actual: 2 } if name == "water"
    ));
    assert!(short.validate_against(&set).is_err());
    assert!(reference.validate_against(&set).is_ok());

    let missing = charges(&[("CO", &[0.1, -0.1])]);
    assert!(matches!(
        missing.validate_against(&set),
        Err(ChargeError::MissingCharges(name)) if name == "OH" || name == "water"
    ));
}

#[test]
fn charges_file_keeps_nan_as_null() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("charges.json");

    let original = charges(&[("CO", &[0.125, -0.125]), ("collapsed", &[f64::NAN, f64::NAN])]);
    original.save_to_file(&path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("null"), "{text}");

    let loaded = Charges::load_from_file(&path).unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded.get("CO").unwrap(), &[0.125, -0.125]);
    assert!(loaded.get("collapsed").unwrap().iter().all(|q| q.is_nan()));
}

#[test]
fn unreadable_charges_file_reports_its_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("absent.json");
    match Charges::load_from_file(&path) {
        Err(ChargeError::Io { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("unexpected result: {other:?}"),
    }

    assert!(matches!(
        Charges::load_from_str(r#"{"CO": [0.1, "x"]}"#),
        Err(ChargeError::Json(_))
    ));
}
