//! The register allocator executable, running the allocator on a few built-in
//! programs.

use log::LevelFilter;
use orzra::{
    lir::{LirMoveFactory, RegisterConfig},
    regalloc::{AllocatorConfig, GraphColoringAllocation},
    samples,
};

fn init_logger(verbosity: u8) -> Result<(), fern::InitError> {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[ {} ] {:<5} {}",
                record.target(),
                record.level(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stdout())
        .apply()?;
    Ok(())
}

/// Keeps both register files and the stack pointer within `u8` numbers.
const MAX_REGS_PER_KIND: i64 = 127;

fn cli() -> clap::Command {
    clap::Command::new("orzra")
        .about("Graph coloring register allocation on sample programs")
        .arg(
            clap::Arg::new("int-regs")
                .long("int-regs")
                .value_parser(clap::value_parser!(u8).range(0..=MAX_REGS_PER_KIND))
                .default_value("2"),
        )
        .arg(
            clap::Arg::new("float-regs")
                .long("float-regs")
                .value_parser(clap::value_parser!(u8).range(0..=MAX_REGS_PER_KIND))
                .default_value("2"),
        )
        .arg(
            clap::Arg::new("max-liveness-iterations")
                .long("max-liveness-iterations")
                .value_parser(clap::value_parser!(usize))
                .default_value("50"),
        )
        .arg(
            clap::Arg::new("max-recolor-rounds")
                .long("max-recolor-rounds")
                .value_parser(clap::value_parser!(usize))
                .default_value("500"),
        )
        .arg(
            clap::Arg::new("example")
                .long("example")
                .value_parser(["pressure", "swap", "loop", "merge", "diamond"])
                .default_value("pressure"),
        )
        .arg(
            clap::Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(clap::ArgAction::Count),
        )
}

fn main() {
    let matches = cli().get_matches();

    let verbosity = matches.get_count("verbose");
    if let Err(err) = init_logger(verbosity) {
        eprintln!("[ orzra ] cannot set up logging: {}", err);
    }

    let int_regs = *matches.get_one::<u8>("int-regs").unwrap_or(&2);
    let float_regs = *matches.get_one::<u8>("float-regs").unwrap_or(&2);
    let regs = RegisterConfig::toy(int_regs, float_regs);

    let config = AllocatorConfig {
        max_liveness_iterations: *matches
            .get_one::<usize>("max-liveness-iterations")
            .unwrap_or(&50),
        max_recolor_rounds: *matches
            .get_one::<usize>("max-recolor-rounds")
            .unwrap_or(&500),
    };

    let example = matches
        .get_one::<String>("example")
        .map(String::as_str)
        .unwrap_or("pressure");
    let mut lir = match example {
        "swap" => samples::swap_loop(),
        "loop" => samples::loop_pressure(),
        "merge" => samples::merge_same(),
        "diamond" => samples::diamond(),
        _ => samples::pressure(),
    };

    println!("{}", lir.display());

    let mut allocation = GraphColoringAllocation::new(config);
    if let Err(err) = allocation.run_on_lir(&mut lir, &regs, &LirMoveFactory) {
        eprintln!("[ reg_alloc ] {}", err);
        std::process::exit(1);
    }

    println!("{}", lir.display());
    println!(
        "[ reg_alloc ] spills: {}, loads: {}, stores: {}, rounds: {}",
        allocation.total_spills,
        allocation.total_loads_added,
        allocation.total_stores_added,
        allocation.recolor_rounds
    );
    println!(
        "[ reg_alloc ] phi moves: {}, stack moves: {}, cycle slots: {}, frame slots: {}",
        allocation.phi_resolution_moves,
        allocation.stack_to_stack_moves,
        allocation.cycle_breaking_slots,
        lir.frame().num_slots()
    );
}
