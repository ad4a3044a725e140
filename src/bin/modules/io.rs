use super::error::CliError;
use chargefit::stats::Statistics;
use chargefit::{
    Atom, AtomTypeKey, Bond, ChargeMethod, Charges, Molecule, MoleculeSet, ParameterStore,
    ParameterizationResult, Plain, TypeCount, periodic,
};
use prettytable::*;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

const RECORD_SEPARATOR: &str = "$$$$";
const CHARGE_PREFIX: &str = "M  CHG";
const END_PREFIX: &str = "M  END";

pub fn read_molecules(input_spec: &str) -> Result<MoleculeSet, CliError> {
    let mut content = String::new();
    if input_spec == "-" {
        io::stdin().read_to_string(&mut content)?;
    } else {
        content = std::fs::read_to_string(input_spec).map_err(|e| CliError::Io {
            path: PathBuf::from(input_spec),
            source: e,
        })?;
    }

    let source_name = if input_spec == "-" { "stdin" } else { input_spec };
    parse_sdf(&content, source_name)
}

/// Parses every `$$$$`-terminated MOL record of an SDF file. A trailing record without a
/// separator is accepted.
pub fn parse_sdf(content: &str, source_name: &str) -> Result<MoleculeSet, CliError> {
    let mut molecules = Vec::new();
    let mut record: Vec<&str> = Vec::new();

    for line in content.lines() {
        if line.trim() == RECORD_SEPARATOR {
            molecules.push(parse_mol_record(&record, source_name)?);
            record.clear();
        } else {
            record.push(line);
        }
    }
    if record.iter().any(|line| !line.trim().is_empty()) {
        molecules.push(parse_mol_record(&record, source_name)?);
    }

    Ok(MoleculeSet::new(molecules)?)
}

fn parse_mol_record(record: &[&str], source_name: &str) -> Result<Molecule, CliError> {
    let name = record.first().map(|line| line.trim()).unwrap_or_default();
    let err = |details: String| CliError::SdfParse {
        source_name: source_name.to_string(),
        details: format!("molecule '{}': {}", name, details),
    };

    let counts_line = record
        .get(3)
        .ok_or_else(|| err("missing counts line".to_string()))?;
    match column(counts_line, 33, 39) {
        "V2000" => {}
        "V3000" => return Err(err("V3000 records are not supported".to_string())),
        other => return Err(err(format!("incorrect MOL version '{}'", other))),
    }

    let atom_count = parse_int::<usize>(column(counts_line, 0, 3), "atom count").map_err(&err)?;
    let bond_count = parse_int::<usize>(column(counts_line, 3, 6), "bond count").map_err(&err)?;

    let atom_start = 4;
    let bond_start = atom_start + atom_count;
    let properties_start = bond_start + bond_count;
    if record.len() < properties_start {
        return Err(err(format!(
            "expected {} atom and {} bond lines, record has {} lines",
            atom_count,
            bond_count,
            record.len()
        )));
    }

    let mut sites = Vec::with_capacity(atom_count);
    for (i, line) in record[atom_start..bond_start].iter().enumerate() {
        let x = parse_float(column(line, 0, 10), "x coordinate").map_err(&err)?;
        let y = parse_float(column(line, 10, 20), "y coordinate").map_err(&err)?;
        let z = parse_float(column(line, 20, 30), "z coordinate").map_err(&err)?;
        let symbol = column(line, 30, 33);
        let element = periodic::lookup(symbol)
            .map_err(|_| err(format!("atom {}: unknown element '{}'", i + 1, symbol)))?;
        sites.push((element, [x, y, z]));
    }

    let mut bonds = Vec::with_capacity(bond_count);
    for line in &record[bond_start..properties_start] {
        let first = parse_int::<usize>(column(line, 0, 3), "bond atom").map_err(&err)?;
        let second = parse_int::<usize>(column(line, 3, 6), "bond atom").map_err(&err)?;
        let order = parse_int::<u8>(column(line, 6, 9), "bond order").map_err(&err)?;
        if first == 0 || second == 0 {
            return Err(err("bond atom numbers start at 1".to_string()));
        }
        bonds.push(Bond::new(first - 1, second - 1, order));
    }

    let mut formal_charges = vec![0i32; atom_count];
    for line in &record[properties_start..] {
        if line.starts_with(END_PREFIX) {
            break;
        }
        if !line.starts_with(CHARGE_PREFIX) {
            continue;
        }
        let fields: Vec<&str> = line.get(9..).unwrap_or_default().split_whitespace().collect();
        for pair in fields.chunks(2) {
            let [atom_no, charge] = pair else {
                return Err(err(format!("unpaired charge entry in '{}'", line.trim())));
            };
            let atom_no = parse_int::<usize>(atom_no, "charged atom").map_err(&err)?;
            let charge = parse_int::<i32>(charge, "charge").map_err(&err)?;
            let slot = atom_no
                .checked_sub(1)
                .and_then(|i| formal_charges.get_mut(i))
                .ok_or_else(|| err(format!("charge refers to missing atom {}", atom_no)))?;
            *slot = charge;
        }
    }

    let atoms = sites
        .into_iter()
        .zip(formal_charges)
        .map(|((element, position), charge)| Atom::new(element, position, charge))
        .collect();

    Ok(Molecule::new(name, atoms, &bonds)?)
}

fn column(line: &str, start: usize, end: usize) -> &str {
    let end = end.min(line.len());
    line.get(start..end).map(str::trim).unwrap_or_default()
}

fn parse_int<T: std::str::FromStr>(text: &str, what: &str) -> Result<T, String> {
    text.parse()
        .map_err(|_| format!("invalid {}: '{}'", what, text))
}

fn parse_float(text: &str, what: &str) -> Result<f64, String> {
    text.parse()
        .map_err(|_| format!("invalid {}: '{}'", what, text))
}

fn box_format() -> format::TableFormat {
    format::FormatBuilder::new()
        .column_separator('│')
        .borders('│')
        .separators(
            &[format::LinePosition::Top],
            format::LineSeparator::new('─', '┬', '╭', '╮'),
        )
        .separators(
            &[format::LinePosition::Title],
            format::LineSeparator::new('═', '╪', '╞', '╡'),
        )
        .separators(
            &[format::LinePosition::Intern],
            format::LineSeparator::new('─', '┼', '├', '┤'),
        )
        .separators(
            &[format::LinePosition::Bottom],
            format::LineSeparator::new('─', '┴', '╰', '╯'),
        )
        .padding(1, 1)
        .build()
}

fn no_intern_format() -> format::TableFormat {
    format::FormatBuilder::new()
        .column_separator('│')
        .borders('│')
        .separators(
            &[format::LinePosition::Top],
            format::LineSeparator::new('─', '┬', '╭', '╮'),
        )
        .separators(
            &[format::LinePosition::Bottom],
            format::LineSeparator::new('─', '┴', '╰', '╯'),
        )
        .padding(1, 1)
        .build()
}

fn write_title(writer: &mut dyn Write, title: &str) -> Result<(), CliError> {
    let mut title_table = Table::new();
    title_table.set_format(box_format());
    title_table.add_row(row![bc->title]);
    title_table.print(writer)?;
    writeln!(writer)?;
    Ok(())
}

/// Label of a type tag as shown to users: `*` for the plain scheme, `scheme_tag` otherwise.
fn type_label(scheme: &str, tag: &str) -> String {
    if scheme == Plain::NAME {
        Plain::TAG.to_string()
    } else {
        format!("{}_{}", scheme, tag)
    }
}

pub fn write_set_info(
    writer: &mut dyn Write,
    source_name: &str,
    molecules: &MoleculeSet,
    scheme: &str,
    summary: &[TypeCount],
) -> Result<(), CliError> {
    write_title(writer, "Molecule Set Statistics")?;

    let mut summary_table = Table::new();
    summary_table.set_format(no_intern_format());
    summary_table.add_row(row![b->"Source File:", source_name]);
    summary_table.add_row(row![b->"Molecules:", molecules.len()]);
    summary_table.add_row(row![b->"Atoms:", molecules.atom_count()]);
    summary_table.add_row(row![b->"Atom Types:", summary.len()]);
    summary_table.print(writer)?;
    writeln!(writer)?;

    let mut data_table = Table::new();
    data_table.set_format(box_format());
    data_table.set_titles(row![bc->"Element", bc->"Type", bc->"# Atoms", bc->"# Molecules"]);
    for count in summary {
        data_table.add_row(row![
            l->count.element,
            l->type_label(scheme, &count.tag),
            r->count.atoms,
            r->count.molecules
        ]);
    }
    data_table.print(writer)?;

    Ok(())
}

pub fn write_charges_summary(
    writer: &mut dyn Write,
    source_name: &str,
    method: &dyn ChargeMethod,
    molecules: &MoleculeSet,
    charges: &Charges,
    output: &Path,
) -> Result<(), CliError> {
    let unsolved = charges
        .iter()
        .filter(|(_, values)| values.iter().any(|q| q.is_nan()))
        .count();

    write_title(writer, "Partial Charge Results")?;

    let mut summary_table = Table::new();
    summary_table.set_format(no_intern_format());
    summary_table.add_row(row![b->"Source File:", source_name]);
    summary_table.add_row(row![b->"Method:", method.full_name()]);
    if let Some(doi) = method.publication() {
        summary_table.add_row(row![b->"Publication:", format!("doi:{}", doi)]);
    }
    summary_table.add_row(row![b->"Molecules:", molecules.len()]);
    summary_table.add_row(row![b->"Atoms:", molecules.atom_count()]);
    summary_table.add_row(row![b->"Unsolved Molecules:", unsolved]);
    summary_table.add_row(row![b->"Output File:", output.display()]);
    summary_table.print(writer)?;

    Ok(())
}

pub fn write_parameters(
    writer: &mut dyn Write,
    store: &ParameterStore,
    precision: usize,
) -> Result<(), CliError> {
    write_title(writer, "Fitted Parameters")?;

    if !store.common_names().is_empty() {
        let mut common_table = Table::new();
        common_table.set_format(box_format());
        common_table.set_titles(row![bc->"Common Parameter", bc->"Value"]);
        for name in store.common_names() {
            let value = store.common(name)?;
            common_table.add_row(row![
                l->name,
                r->format!("{:.prec$}", value, prec = precision)
            ]);
        }
        common_table.print(writer)?;
        writeln!(writer)?;
    }

    if !store.atom_names().is_empty() {
        let mut atom_table = Table::new();
        atom_table.set_format(box_format());

        let mut titles = vec![
            Cell::new("Element").style_spec("bc"),
            Cell::new("Type").style_spec("bc"),
        ];
        titles.extend(
            store
                .atom_names()
                .iter()
                .map(|name| Cell::new(name).style_spec("bc")),
        );
        atom_table.set_titles(Row::new(titles));

        for atom_row in store.rows() {
            let mut cells = vec![
                Cell::new(&atom_row.key.element),
                Cell::new(&type_label(&atom_row.key.scheme, &atom_row.key.tag)),
            ];
            cells.extend(atom_row.values.iter().map(|value| {
                Cell::new(&format!("{:.prec$}", value, prec = precision)).style_spec("r")
            }));
            atom_table.add_row(Row::new(cells));
        }
        atom_table.print(writer)?;
        writeln!(writer)?;
    }

    Ok(())
}

pub fn write_fit_summary(
    writer: &mut dyn Write,
    result: &ParameterizationResult,
    output: &Path,
    precision: usize,
) -> Result<(), CliError> {
    let converged = if result.converged { "yes" } else { "no" };

    let mut summary_table = Table::new();
    summary_table.set_format(no_intern_format());
    summary_table.add_row(row![b->"Best Run:", result.run_index]);
    summary_table.add_row(row![b->"Objective (RMSD):", format!("{:.prec$}", result.objective, prec = precision)]);
    summary_table.add_row(row![b->"Iterations:", result.iterations]);
    summary_table.add_row(row![b->"Converged:", converged]);
    summary_table.add_row(row![b->"Output File:", output.display()]);
    summary_table.print(writer)?;
    writeln!(writer)?;
    Ok(())
}

pub fn write_statistics(
    writer: &mut dyn Write,
    total: &Statistics,
    per_type: &[(AtomTypeKey, Statistics)],
    precision: usize,
) -> Result<(), CliError> {
    write_title(writer, "Charge Statistics")?;

    let mut data_table = Table::new();
    data_table.set_format(box_format());
    data_table.set_titles(row![
        bc->"Scope", bc->"Type", bc->"RMSD", bc->"R²", bc->"Avg |Δq|", bc->"Max |Δq|"
    ]);

    let stat_cells = |stats: &Statistics| {
        [
            stats.rmsd,
            stats.pearson_squared,
            stats.avg_abs_diff,
            stats.max_abs_diff,
        ]
        .map(|value| Cell::new(&format!("{:.prec$}", value, prec = precision)).style_spec("r"))
    };

    let mut total_row = vec![Cell::new("Total").style_spec("b"), Cell::new("")];
    total_row.extend(stat_cells(total));
    data_table.add_row(Row::new(total_row));

    for (key, stats) in per_type {
        let mut cells = vec![
            Cell::new(&key.element),
            Cell::new(&type_label(&key.scheme, &key.tag)),
        ];
        cells.extend(stat_cells(stats));
        data_table.add_row(Row::new(cells));
    }
    data_table.print(writer)?;

    Ok(())
}
