use std::process::ExitCode;

use clap::Parser;
use nbody_bench::{logging, ArrayAllocator, BenchError, BudgetAllocator, Kernel, Report, RunController, SimParams, SystemAllocator};

const REFERENCE: SimParams = SimParams::reference();

/// Direct-summation n-body benchmark. With no arguments it runs the
/// reference configuration and prints `elapsed_ms=<ms> checksum=<sum>`.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of particles.
    #[arg(short, long, default_value_t = REFERENCE.n)]
    number: usize,

    /// Untimed warm-up steps.
    #[arg(short, long, default_value_t = REFERENCE.steps_warmup)]
    warmup: usize,

    /// Timed steps.
    #[arg(short, long, default_value_t = REFERENCE.steps)]
    steps: usize,

    /// Integration time step.
    #[arg(long, default_value_t = REFERENCE.dt)]
    dt: f64,

    /// Added to every squared pair distance.
    #[arg(long, default_value_t = REFERENCE.softening)]
    softening: f64,

    /// Generator seed.
    #[arg(long, default_value_t = REFERENCE.seed)]
    seed: u64,

    /// Force kernel.
    #[arg(short, long, value_enum, default_value_t = Kernel::Direct)]
    kernel: Kernel,

    /// Worker threads for the parallel kernel.
    #[arg(short, long, default_value_t = num_cpus::get())]
    threads: usize,

    /// Cap, in bytes, on the particle and force arrays.
    #[arg(long)]
    memory_limit: Option<usize>,
}

impl Args {
    fn params(&self) -> SimParams {
        SimParams {
            n: self.number,
            steps_warmup: self.warmup,
            steps: self.steps,
            dt: self.dt,
            softening: self.softening,
            seed: self.seed,
        }
    }
}

fn run(args: &Args, alloc: &dyn ArrayAllocator) -> Result<Report, BenchError> {
    RunController::new(args.params(), alloc)
        .with_kernel(args.kernel, args.threads)
        .run()
}

fn main() -> ExitCode {
    logging::init();
    let args = Args::parse();

    let result = match args.memory_limit {
        Some(bytes) => run(&args, &BudgetAllocator::new(bytes)),
        None => run(&args, &SystemAllocator),
    };

    match result {
        Ok(report) => {
            println!("{}", report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
