//! The `opencor` command-line tool

use std::{path::Path, process::ExitCode};

use anstream::{print, println};
use clap::Parser;
use opencor_file::{FileRef, FileType};
use opencor_model::EvaluationMode;
use opencor_sed::{SedChange, SedDocument, SimulationKind};
use opencor_shared::{issue::HasIssues, number::format_double};
use opencor_solver::{SolverPropertyType, SolverType, solvers};
use tracing_subscriber::EnvFilter;

use crate::{
    command::{CliCommand, Commands},
    engine::{Engine, EngineConfig},
};

mod command;
mod csv;
mod engine;
mod print_issue;
mod stylesheet;
mod watch;

#[cfg(test)]
mod test;

fn main() -> ExitCode {
    let cli = CliCommand::parse();

    init_logging(cli.verbose);

    let engine = match Engine::new(EngineConfig::default()) {
        Ok(engine) => engine,
        Err(error) => {
            print_issue::print_failure(&error.to_string());
            return ExitCode::FAILURE;
        }
    };

    let success = match cli.command {
        Commands::Info { file } => info(&engine, &file),
        Commands::Run {
            file,
            interpreted,
            watch,
        } => {
            let mode = if interpreted {
                EvaluationMode::Interpreted
            } else {
                EvaluationMode::Compiled
            };

            if watch {
                run_watched(&engine, &file, mode)
            } else {
                run(&engine, &file, mode)
            }
        }
        Commands::Serialise { file, base_path } => serialise(&engine, &file, base_path.as_deref()),
        Commands::Solvers => {
            print_solvers();
            true
        }
    };

    if success { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

/// Logs to stderr, at `warn` level unless `--verbose` or `RUST_LOG` says
/// otherwise.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Opens a file and builds its document, printing the issues of both.
fn load(engine: &Engine, file_name_or_url: &str) -> (FileRef, SedDocument) {
    let file = engine.open(file_name_or_url);

    print_issue::print_all(file.path(), &file.issues());

    let document = engine.document(&file);

    print_issue::print_all(file.path(), &document.issues());

    (file, document)
}

fn info(engine: &Engine, file_name_or_url: &str) -> bool {
    let (file, document) = load(engine, file_name_or_url);
    let heading = stylesheet::HEADING;

    println!("{}: {}", heading.style(file.path()), file.file_type());

    for child in file.child_files() {
        let master = file.master_file().is_some_and(|master| master.path() == child.path());
        let marker = if master { " (master)" } else { "" };

        println!("  {} {}: {}{marker}", stylesheet::DIMMED.style("-"), child.path(), child.file_type());
    }

    if file.file_type() == FileType::UnknownFile || file.file_type() == FileType::IrretrievableFile {
        return false;
    }

    if document.has_models() {
        println!("{}", heading.style("models"));

        for (_, model) in document.models() {
            println!("  {}: {}", stylesheet::IDENTIFIER.style(model.id()), model.file().path());

            for change in model.changes() {
                let SedChange::Attribute { new_value, .. } = change;

                println!("    {} = {}", change.target(), format_double(*new_value));
            }
        }
    }

    if document.has_simulations() {
        println!("{}", heading.style("simulations"));

        for (_, simulation) in document.simulations() {
            let solvers = [simulation.ode_solver(), simulation.nla_solver()]
                .into_iter()
                .flatten()
                .map(|solver| solver.name())
                .collect::<Vec<_>>()
                .join(", ");

            println!(
                "  {}: {} [{solvers}]",
                stylesheet::IDENTIFIER.style(simulation.id()),
                describe_kind(simulation.kind())
            );
        }
    }

    if document.has_tasks() {
        println!("{}", heading.style("tasks"));

        for (_, task) in document.tasks() {
            let model = task.model().and_then(|model| document.model(model)).map_or("-", |model| model.id());
            let simulation = task
                .simulation()
                .and_then(|simulation| document.simulation(simulation))
                .map_or("-", |simulation| simulation.id());

            println!("  {}: {model} with {simulation}", stylesheet::IDENTIFIER.style(task.id()));
        }
    }

    !file.has_errors() && !document.has_errors()
}

fn describe_kind(kind: SimulationKind) -> String {
    match kind {
        SimulationKind::UniformTimeCourse {
            initial_time,
            output_start_time,
            output_end_time,
            number_of_steps,
        } => format!(
            "uniform time course from {} (output {} to {}, {number_of_steps} steps)",
            format_double(initial_time),
            format_double(output_start_time),
            format_double(output_end_time)
        ),
        SimulationKind::OneStep { step } => format!("one step of {}", format_double(step)),
        SimulationKind::SteadyState => "steady state".to_string(),
        SimulationKind::Analysis => "analysis".to_string(),
    }
}

fn run(engine: &Engine, file_name_or_url: &str, mode: EvaluationMode) -> bool {
    let (file, document) = load(engine, file_name_or_url);
    let mut instance = engine.instantiate(&document, mode);

    instance.run();

    print_issue::print_all(file.path(), &instance.issues());

    for (index, task) in instance.tasks().iter().enumerate() {
        if index > 0 {
            println!();
        }

        if instance.task_count() > 1 {
            println!("# {}", task.id());
        }

        print!("{}", csv::render(task));
    }

    !document.has_errors() && !instance.has_errors()
}

fn run_watched(engine: &Engine, file_name_or_url: &str, mode: EvaluationMode) -> bool {
    let file = engine.open(file_name_or_url);

    if !file.is_local() {
        print_issue::print_failure("Only local files can be watched.");
        return false;
    }

    let path = Path::new(file.path()).to_path_buf();

    drop(file);

    let result = watch::watch(&path, || {
        engine.forget_files();
        run(engine, file_name_or_url, mode)
    });

    result.unwrap_or_else(|error| {
        print_issue::print_failure(&format!("The file could not be watched: {error}."));
        false
    })
}

fn serialise(engine: &Engine, file_name_or_url: &str, base_path: Option<&str>) -> bool {
    let (_file, document) = load(engine, file_name_or_url);

    if document.has_errors() {
        return false;
    }

    print!("{}", document.serialise(base_path));

    true
}

fn print_solvers() {
    for solver in solvers() {
        let solver_type = match solver.solver_type() {
            SolverType::Ode => "ODE",
            SolverType::Nla => "NLA",
        };

        println!(
            "{} {} {}",
            stylesheet::HEADING.style(solver.name()),
            stylesheet::DIMMED.style(solver.id()),
            solver_type
        );

        for property in solver.properties() {
            let values = if property.list_values().is_empty() {
                String::new()
            } else {
                format!(" of {}", property.list_values().join(", "))
            };

            println!(
                "  {} {}: {}{values}, default {}",
                stylesheet::IDENTIFIER.style(property.name()),
                stylesheet::DIMMED.style(property.id()),
                describe_property_type(property.property_type()),
                property.default_value()
            );
        }
    }
}

const fn describe_property_type(property_type: SolverPropertyType) -> &'static str {
    match property_type {
        SolverPropertyType::Boolean => "boolean",
        SolverPropertyType::IntegerGt0 => "integer > 0",
        SolverPropertyType::IntegerGe0 => "integer >= 0",
        SolverPropertyType::DoubleGt0 => "double > 0",
        SolverPropertyType::DoubleGe0 => "double >= 0",
        SolverPropertyType::List => "one",
    }
}
