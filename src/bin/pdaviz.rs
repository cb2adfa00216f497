use clap::{Arg, ArgAction, Command};
use color_eyre::eyre::Result;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use pdaviz::{
    read_pda_file, save_dot, save_pda, Acceptance, Configuration, Pda, RunStatus,
    SearchOptions, Simulator, Snapshot,
};

#[derive(Serialize)]
struct InputTrace<'a> {
    input: &'a str,
    accepted: bool,
    stepped: Vec<Snapshot>,
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_accepting_path(pda: &Pda, input: &str, path: &[Configuration]) {
    let Some(symbols) = pda.tokenize(input) else {
        return;
    };
    println!("  accepting path:");
    for configuration in path {
        println!(
            "    {}",
            configuration.snapshot(pda, &symbols, RunStatus::Running)
        );
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Command::new("pdaviz")
        .version("0.1")
        .author("Nagendra Kumar Jamadagni")
        .about("Simulate a pushdown automaton and trace its stack step by step")
        .arg(
            Arg::new("file")
                .short('f')
                .long("file")
                .help("The PDA description, either a .json file or the line based text format")
                .value_name("PDA FILE")
                .value_parser(clap::value_parser!(PathBuf))
                .required(true),
        )
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .help("An input string to test. Can be given several times")
                .value_name("INPUT")
                .action(ArgAction::Append)
                .value_parser(clap::value_parser!(String)),
        )
        .arg(
            Arg::new("step")
                .short('s')
                .long("step")
                .help("Also run each input with the single path stepper and print every configuration it visits")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("path")
                .short('p')
                .long("path")
                .help("Print the accepting path found by the search for accepted inputs")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("acceptance")
                .short('a')
                .long("acceptance")
                .help("Override the acceptance policy of the description")
                .value_name("final-state | empty-stack | either | both")
                .value_parser(clap::value_parser!(String)),
        )
        .arg(
            Arg::new("max-epsilon")
                .long("max-epsilon")
                .help("Number of consecutive ε-moves allowed on one path before it is abandoned")
                .value_name("N")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("trace-json")
                .long("trace-json")
                .help("Write the stepping trace of every input to a json file")
                .value_name("TRACE FILE")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("save-dot")
                .long("save-dot")
                .help("Save the state diagram as <NAME>.dot")
                .value_name("NAME")
                .value_parser(clap::value_parser!(String)),
        )
        .arg(
            Arg::new("save-json")
                .long("save-json")
                .help("Save the PDA description as json")
                .value_name("JSON FILE")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("More logging, repeat for more detail. RUST_LOG takes precedence")
                .action(ArgAction::Count),
        )
        .get_matches();

    init_logging(args.get_count("verbose"));

    let Some(pda_file) = args.get_one::<PathBuf>("file") else {
        unreachable!("file is a required argument");
    };

    let mut pda = read_pda_file(pda_file)?;

    if let Some(acceptance) = args.get_one::<String>("acceptance") {
        pda = pda.with_acceptance(acceptance.parse::<Acceptance>()?);
    }

    let mut options = SearchOptions::default();
    if let Some(max_epsilon) = args.get_one::<usize>("max-epsilon") {
        options.max_epsilon_run = *max_epsilon;
    }

    if let Some(name) = args.get_one::<String>("save-dot") {
        save_dot(&pda, name)?;
    }

    if let Some(json_path) = args.get_one::<PathBuf>("save-json") {
        save_pda(&pda, json_path)?;
    }

    let step = args.get_flag("step");
    let show_path = args.get_flag("path");
    let trace_file = args.get_one::<PathBuf>("trace-json");

    if !pda.is_deterministic() && step {
        println!("note: the PDA is non-deterministic, the stepper follows the first matching transition only");
    }

    let inputs: Vec<String> = args
        .get_many::<String>("input")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();

    let mut traces = Vec::new();

    for input in &inputs {
        let path = pda.accepting_path_with(input, &options);
        let accepted = path.is_some();
        println!(
            "{:?}: {}",
            input,
            if accepted { "accepted" } else { "rejected" }
        );

        if let Some(path) = path.as_ref().filter(|_| show_path) {
            print_accepting_path(&pda, input, path);
        }

        if step || trace_file.is_some() {
            let mut simulator = Simulator::new(&pda, input).with_options(options.clone());
            let status = simulator.run();

            if step {
                println!("  stepper: {}", status);
                for snapshot in simulator.trace() {
                    println!("    {}", snapshot);
                }
            }

            traces.push(InputTrace {
                input,
                accepted,
                stepped: simulator.trace().to_vec(),
            });
        }
    }

    if let Some(trace_path) = trace_file {
        let json_string = serde_json::to_string_pretty(&traces)?;
        let mut file = File::create(trace_path)?;
        writeln!(file, "{}", json_string)?;
    }

    Ok(())
}
