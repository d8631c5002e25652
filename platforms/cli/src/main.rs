use clap::Parser;
use serde_json::json;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tmsim::types::MAX_PROCESS_TIME_MS;
use tmsim::{
    simulate, Configuration, InputAlphabet, MachineDescription, MachineRegistry, ProgramLoader,
    RunOutcome, Simulate, SimulationConfig, Summary, Symbol, TapeMode, Tracer, TuringMachineError,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    /// The machine description file to load. Read from stdin when piped and omitted.
    #[clap(short, long, conflicts_with = "builtin")]
    machine: Option<PathBuf>,

    /// Use a bundled sample machine instead of a file
    #[clap(short, long)]
    builtin: Option<String>,

    /// Load a finite automaton description instead of a Turing machine
    #[clap(short, long, conflicts_with_all = ["machine", "builtin", "two_way"])]
    automaton: Option<PathBuf>,

    /// List the bundled sample machines and exit
    #[clap(short, long)]
    list: bool,

    /// Run on a two-way infinite tape instead of one with a left-end marker
    #[clap(long)]
    two_way: bool,

    /// Run these inputs once each instead of enumerating
    #[clap(short, long)]
    input: Vec<String>,

    /// Shortest string to enumerate
    #[clap(long)]
    min_length: Option<usize>,

    /// Longest string to enumerate
    #[clap(long)]
    max_length: Option<usize>,

    /// Maximum number of strings to enumerate
    #[clap(short = 'n', long)]
    count: Option<usize>,

    /// First string to enumerate
    #[clap(long)]
    start: Option<String>,

    /// Step bound for every run
    #[clap(long)]
    max_steps: Option<u64>,

    /// Wall-clock bound for every run, in milliseconds
    #[clap(long)]
    max_time: Option<u64>,

    /// Print every configuration of every run
    #[clap(short = 'd', long)]
    trace: bool,

    /// Print the results as JSON
    #[clap(long)]
    json: bool,
}

/// Prints each configuration with its tape spelled out in symbols.
struct TracePrinter<'a> {
    symbols: &'a [String],
}

impl Tracer for TracePrinter<'_> {
    fn trace(&mut self, configuration: Configuration) {
        let tape: Vec<&str> = configuration
            .tape
            .iter()
            .map(|&s| self.symbols.get(s).map_or("?", String::as_str))
            .collect();

        println!(
            "Step: {}, State: {}, Head: {}, Tape: [{}]",
            configuration.step,
            configuration.state,
            configuration.head,
            tape.join(" ")
        );
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), TuringMachineError> {
    let registry = MachineRegistry::with_bundled();

    if cli.list {
        for index in 0..registry.len() {
            let info = registry.info(index)?;
            println!(
                "{}: {} states, {} input symbols, {} transitions",
                info.name, info.num_states, info.input_alphabet_size, info.transition_count
            );
        }
        return Ok(());
    }

    if let Some(path) = &cli.automaton {
        debug!(path = %path.display(), "loading automaton");
        let description = ProgramLoader::load_automaton(path)?;
        let automaton = &description.automaton;
        let mut printer = TracePrinter {
            symbols: automaton.alphabet().symbols(),
        };

        return execute(
            &cli,
            automaton,
            &description.config,
            cli.trace,
            &mut printer,
            &description.comments,
        );
    }

    let mode = if cli.two_way {
        TapeMode::TwoWay
    } else {
        TapeMode::LeftEnd
    };
    let description = load_description(&cli, &registry, mode)?;
    let machine = &description.machine;
    let mut printer = TracePrinter {
        symbols: machine.alphabet().symbols(),
    };

    execute(
        &cli,
        machine,
        &description.config,
        cli.trace || description.trace,
        &mut printer,
        &description.comments,
    )
}

/// Runs the explicit inputs, or enumerates strings when there are none.
fn execute<M: Simulate + ?Sized>(
    cli: &Cli,
    machine: &M,
    config: &SimulationConfig,
    trace: bool,
    printer: &mut TracePrinter,
    comments: &str,
) -> Result<(), TuringMachineError> {
    let alphabet = machine.input_alphabet();
    let config = apply_overrides(cli, config.clone(), alphabet)?;

    if !cli.input.is_empty() {
        let mut results = Vec::new();
        for text in &cli.input {
            let input = alphabet.tokenize(text)?;
            let tracer = trace.then_some(&mut *printer as &mut dyn Tracer);
            let report = machine.run_input(&input, &config.limits, tracer)?;

            if cli.json {
                results.push(json!({
                    "input": text,
                    "outcome": report.outcome,
                    "step_count": report.step_count,
                    "elapsed_ms": report.elapsed_ms,
                }));
            } else {
                println!(
                    "{}: {}",
                    display_input(text),
                    describe_outcome(report.outcome, report.step_count)
                );
            }
        }
        if cli.json {
            print_json(&json!(results))?;
        }
        return Ok(());
    }

    let tracer = trace.then_some(printer as &mut dyn Tracer);
    let report = simulate(machine, &config, tracer)?;

    if cli.json {
        return print_json(&report.to_json(alphabet)?);
    }

    for (input, record) in report.records() {
        println!(
            "{}: {}",
            render(alphabet, input)?,
            describe_outcome(record.outcome, record.step_count)
        );
    }

    match report.summary() {
        Summary::NoResult => println!("No strings tested."),
        Summary::Single { input, record } => println!(
            "\nTested {}: {}",
            render(alphabet, input)?,
            describe_outcome(record.outcome, record.step_count)
        ),
        Summary::Aggregate(tallies) => println!(
            "\nTested {} strings in {} ms: {} accepted, {} rejected, {} exceeded the step bound, {} exceeded the time bound",
            report.tested(),
            report.elapsed().as_millis(),
            tallies.accepted,
            tallies.rejected,
            tallies.step_bound_exceeded,
            tallies.time_bound_exceeded
        ),
    }

    if !comments.is_empty() {
        println!("\n{comments}");
    }

    Ok(())
}

fn apply_overrides(
    cli: &Cli,
    mut config: SimulationConfig,
    alphabet: &InputAlphabet,
) -> Result<SimulationConfig, TuringMachineError> {
    if cli.min_length.is_some() || cli.max_length.is_some() {
        let min_length = cli.min_length.unwrap_or(config.min_length);
        let max_length = cli.max_length.unwrap_or(config.max_length);
        config = config.with_length_range(min_length, max_length);
    }
    if let Some(start) = &cli.start {
        config.initial = alphabet.tokenize(start)?;
    }
    if let Some(count) = cli.count {
        config.max_string_count = count;
    }
    if let Some(max_steps) = cli.max_steps {
        config.limits.max_steps = max_steps;
    }
    if let Some(max_time) = cli.max_time {
        if max_time > MAX_PROCESS_TIME_MS {
            return Err(TuringMachineError::InvalidConfig(format!(
                "Given max process time({max_time}) isn't in the range of [0, {MAX_PROCESS_TIME_MS}]."
            )));
        }
        config.limits.max_time = Some(Duration::from_millis(max_time));
    }

    Ok(config)
}

fn load_description(
    cli: &Cli,
    registry: &MachineRegistry,
    mode: TapeMode,
) -> Result<MachineDescription, TuringMachineError> {
    if let Some(path) = &cli.machine {
        debug!(path = %path.display(), ?mode, "loading machine");
        return ProgramLoader::load_machine(path, mode);
    }

    if let Some(name) = &cli.builtin {
        if mode != TapeMode::LeftEnd {
            return Err(TuringMachineError::InvalidConfig(
                "Bundled machines are written for the left-end marker tape".to_string(),
            ));
        }
        return Ok(registry.get_by_name(name)?.description.clone());
    }

    if !atty::is(atty::Stream::Stdin) {
        let mut content = String::new();
        io::stdin()
            .read_to_string(&mut content)
            .map_err(|e| TuringMachineError::FileError(format!("Failed to read stdin: {e}")))?;
        return ProgramLoader::load_machine_from_string(&content, mode);
    }

    Err(TuringMachineError::InvalidConfig(
        "No machine given; use --machine, --builtin, --automaton, or pipe a description on stdin"
            .to_string(),
    ))
}

fn render(alphabet: &InputAlphabet, input: &[Symbol]) -> Result<String, TuringMachineError> {
    Ok(display_input(&alphabet.render(input)?))
}

fn display_input(text: &str) -> String {
    if text.is_empty() {
        "(empty)".to_string()
    } else {
        text.to_string()
    }
}

fn describe_outcome(outcome: RunOutcome, steps: u64) -> String {
    let outcome = match outcome {
        RunOutcome::Accepted => "accepted",
        RunOutcome::Rejected => "rejected",
        RunOutcome::StepBoundExceeded => "step bound exceeded",
        RunOutcome::TimeBoundExceeded => "time bound exceeded",
    };
    format!("{outcome} after {steps} step(s)")
}

fn print_json(value: &serde_json::Value) -> Result<(), TuringMachineError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| TuringMachineError::InvalidConfig(format!("Failed to encode JSON: {e}")))?;
    println!("{text}");
    Ok(())
}
