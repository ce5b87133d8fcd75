use std::process::ExitCode;

use distinguish::{parse::read_machines_from_file, prelude::*};

use tracing::{debug, trace};
use tracing_subscriber::{filter, prelude::*};

use clap::{value_parser, Arg, ArgMatches, Command};

fn cli() -> clap::Command {
    Command::new("distinguish")
        .about("Computes a sequence of inputs on which an implementation machine observably deviates from its specification")
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbosity")
                .num_args(0..=1)
                .require_equals(true)
                .value_parser(["info", "debug", "trace"])
                .default_missing_value("info"),
        )
        .arg(
            Arg::new("spec")
                .long("spec")
                .value_parser(value_parser!(usize))
                .default_value("0")
                .help("index of the specification machine in the input file"),
        )
        .arg(
            Arg::new("impl")
                .long("impl")
                .value_parser(value_parser!(usize))
                .default_value("1")
                .help("index of the implementation machine in the input file"),
        )
        .arg(
            Arg::new("max-empty-hops")
                .long("max-empty-hops")
                .value_parser(value_parser!(usize))
                .help("maximal number of consecutive transitions without input during replay, defaults to the number of states"),
        )
        .arg(
            Arg::new("file")
                .required(true)
                .help("file containing the machines"),
        )
}

fn setup_logging(matches: &ArgMatches) {
    let level = match matches
        .try_get_one::<String>("verbosity")
        .ok()
        .flatten()
        .map(|m| m.as_str())
    {
        Some("trace") => filter::LevelFilter::TRACE,
        Some("debug") => filter::LevelFilter::DEBUG,
        Some("info") => filter::LevelFilter::INFO,
        _ => filter::LevelFilter::WARN,
    };

    let stderr_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(stderr_log.with_filter(level))
        .init();

    trace!("setup {level} logging");
}

pub fn main() -> ExitCode {
    let matches = cli().get_matches();

    setup_logging(&matches);

    let Some(path) = matches.get_one::<String>("file") else {
        unreachable!("file is a required argument");
    };
    let machines = match read_machines_from_file(path) {
        Ok(machines) => machines,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    debug!("read {} machines from {path}", machines.len());

    let spec_index = matches.get_one::<usize>("spec").copied().unwrap_or(0);
    let impl_index = matches.get_one::<usize>("impl").copied().unwrap_or(1);
    let (Some(spec), Some(imp)) = (machines.get(spec_index), machines.get(impl_index)) else {
        eprintln!(
            "{path} contains {} machines, cannot compare machine {spec_index} with machine {impl_index}",
            machines.len()
        );
        return ExitCode::FAILURE;
    };

    let max_empty_hops = matches.get_one::<usize>("max-empty-hops").copied();
    print!("{}", Report::new(spec, imp, max_empty_hops));

    ExitCode::SUCCESS
}
