use super::cli::{ChargesArgs, Cli, Commands, InfoArgs, ParameterizeArgs, StatsArgs};
use super::error::CliError;
use super::io;
use super::logging;
use chargefit::{
    Charges, MethodOptions, MoleculeSet, ParameterizationOptions, create_method, default_registry,
    parameterize, stats,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::time::Duration;
use tracing::{debug, info};

pub fn run(args: Cli) -> Result<(), CliError> {
    logging::setup_logging(
        args.logging.verbose,
        args.logging.quiet,
        args.logging.log_file.as_deref(),
    )?;
    debug!("Parsed command line: {:?}", args);

    if let Some(num_threads) = args.logging.threads {
        info!("Setting Rayon global thread pool to {} threads.", num_threads);
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()
            .map_err(|e| CliError::Setup(format!("failed to build thread pool: {}", e)))?;
    }

    let quiet = args.logging.quiet;
    match args.command {
        Commands::Info(info_args) => run_info(info_args),
        Commands::Charges(charges_args) => run_charges(charges_args, quiet),
        Commands::Parameterize(fit_args) => run_parameterize(fit_args, quiet),
        Commands::Stats(stats_args) => run_stats(stats_args),
    }
}

fn spinner(message: &'static str, quiet: bool) -> Result<ProgressBar, CliError> {
    if quiet {
        return Ok(ProgressBar::hidden());
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .map_err(|e| CliError::Setup(e.to_string()))?,
    );
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

fn source_name(input: &str) -> &str {
    if input == "-" { "stdin" } else { input }
}

fn load_molecules(input: &str) -> Result<MoleculeSet, CliError> {
    let molecules = io::read_molecules(input)?;
    info!(
        molecules = molecules.len(),
        atoms = molecules.atom_count(),
        "Loaded molecule set from {}.",
        source_name(input)
    );
    Ok(molecules)
}

fn run_info(args: InfoArgs) -> Result<(), CliError> {
    let molecules = load_molecules(&args.input)?;
    let scheme = args.classifier.scheme_name();
    let classifier = default_registry().get(scheme)?;
    let summary = molecules.type_summary(classifier);

    let mut stdout = std::io::stdout().lock();
    io::write_set_info(
        &mut stdout,
        source_name(&args.input),
        &molecules,
        scheme,
        &summary,
    )?;
    stdout.flush()?;
    Ok(())
}

fn run_charges(args: ChargesArgs, quiet: bool) -> Result<(), CliError> {
    let mut molecules = load_molecules(&args.input)?;

    let mut method = create_method(&args.method)?;
    method.initialize(&MethodOptions {
        parameter_file: args.par_file.clone(),
    })?;

    if !method.parameters().atom_names().is_empty() {
        if args.par_file.is_none() {
            return Err(CliError::MissingParameterFile(args.method.clone()));
        }
        molecules.assign_atom_types(method.parameters(), default_registry())?;
    }

    let pb = spinner("Calculating partial charges...", quiet)?;
    let charges = method.calculate_all(&molecules);
    pb.finish_and_clear();
    let charges = charges?;

    charges.save_to_file(&args.output)?;
    info!("Charges written to {}.", args.output.display());

    let mut stdout = std::io::stdout().lock();
    io::write_charges_summary(
        &mut stdout,
        source_name(&args.input),
        method.as_ref(),
        &molecules,
        &charges,
        &args.output,
    )?;
    stdout.flush()?;
    Ok(())
}

fn run_parameterize(args: ParameterizeArgs, quiet: bool) -> Result<(), CliError> {
    let mut molecules = load_molecules(&args.input)?;
    let reference = Charges::load_from_file(&args.reference)?;

    let classifier = default_registry().get(args.classifier.scheme_name())?;
    molecules.classify_atoms(classifier);

    let mut method = create_method(&args.method)?;
    method.initialize(&MethodOptions::default())?;
    method.parameters_mut().init_from_set(&molecules)?;

    let mut options = match &args.search.config {
        Some(path) => ParameterizationOptions::load_from_file(path)?,
        None => ParameterizationOptions::default(),
    };
    if let Some(population) = args.search.population {
        options.population = population;
    }
    if let Some(seed) = args.search.seed {
        options.seed = seed;
    }
    if let Some(max_iterations) = args.search.max_iterations {
        options.max_iterations = max_iterations;
    }
    debug!("Parameterization options: {:?}", options);

    let pb = spinner("Fitting parameters...", quiet)?;
    let result = parameterize(&molecules, method.as_mut(), &reference, &options);
    pb.finish_and_clear();
    let result = result?;

    method.parameters().save_to_file(&args.output)?;
    info!("Parameters written to {}.", args.output.display());

    let computed = method.calculate_all(&molecules)?;
    let total = stats::total(&reference, &computed)?;
    let per_type = stats::per_atom_type(&molecules, &reference, &computed)?;

    let precision = args.display.precision;
    let mut stdout = std::io::stdout().lock();
    io::write_parameters(&mut stdout, method.parameters(), precision)?;
    io::write_fit_summary(&mut stdout, &result, &args.output, precision)?;
    io::write_statistics(&mut stdout, &total, &per_type, precision)?;
    stdout.flush()?;
    Ok(())
}

fn run_stats(args: StatsArgs) -> Result<(), CliError> {
    let mut molecules = load_molecules(&args.input)?;
    let reference = Charges::load_from_file(&args.reference)?;
    let calculated = Charges::load_from_file(&args.calculated)?;

    match (&args.par_file, &args.method) {
        (Some(par_file), Some(method_name)) => {
            let mut method = create_method(method_name)?;
            method.initialize(&MethodOptions {
                parameter_file: Some(par_file.clone()),
            })?;
            molecules.assign_atom_types(method.parameters(), default_registry())?;
        }
        _ => {
            let classifier = default_registry().get(args.classifier.scheme_name())?;
            molecules.classify_atoms(classifier);
        }
    }

    reference.validate_against(&molecules)?;
    calculated.validate_against(&molecules)?;

    let total = stats::total(&reference, &calculated)?;
    let per_type = stats::per_atom_type(&molecules, &reference, &calculated)?;

    let mut stdout = std::io::stdout().lock();
    io::write_statistics(&mut stdout, &total, &per_type, args.display.precision)?;
    stdout.flush()?;
    Ok(())
}
