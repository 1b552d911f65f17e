use std::process::ExitCode;

use nbody_bench::{logging, BenchError, Ensemble, Integrator, Kernel, SimParams, SystemAllocator};

// Reverse summation is allowed to move the checksum this much, relatively.
const ORDER_TOLERANCE: f64 = 1e-6;
const MOMENTUM_TOLERANCE: f64 = 1e-9;

fn evolve(kernel: Kernel, params: &SimParams) -> Result<Ensemble, BenchError> {
    let mut ensemble = Ensemble::seeded(params.n, params.seed, &SystemAllocator)?;
    let mut integrator = Integrator::new(kernel, params, 0, &SystemAllocator)?;
    integrator.run(&mut ensemble, params.steps_warmup + params.steps);
    Ok(ensemble)
}

fn verify_kernel(kernel: Kernel, reference: &Ensemble, params: &SimParams) -> Result<bool, BenchError> {
    let result = evolve(kernel, params)?;
    let max_diff = reference.max_state_difference(&result);
    let (c_ref, c) = (reference.checksum(), result.checksum());
    let rel = if c_ref == 0.0 { (c - c_ref).abs() } else { ((c - c_ref) / c_ref).abs() };

    let ok = if kernel.is_bit_exact() {
        max_diff == 0.0 && c.to_bits() == c_ref.to_bits()
    } else {
        rel <= ORDER_TOLERANCE
    };

    println!("{:10} | {:22.15e} | {:22.15} | {:10.3e} | {}",
             kernel, max_diff, c, rel, if ok { "ok" } else { "FAILED" });
    Ok(ok)
}

fn main() -> ExitCode {
    logging::init();

    println!("N-Body Kernel Verification");
    println!("--------------------------");

    let params = SimParams::reference().with_n(500).with_steps(5, 20);
    println!("Running {} particles for {} steps (dt={}, softening={})",
             params.n, params.steps_warmup + params.steps, params.dt, params.softening);

    match verify(&params) {
        Ok(true) => {
            println!("\nVERIFICATION PASSED");
            ExitCode::SUCCESS
        }
        Ok(false) => {
            println!("\nVERIFICATION FAILED");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

fn verify(params: &SimParams) -> Result<bool, BenchError> {
    // Same seed, same initial state
    let a = Ensemble::seeded(params.n, params.seed, &SystemAllocator)?;
    let b = Ensemble::seeded(params.n, params.seed, &SystemAllocator)?;
    let initial_ok = a.max_state_difference(&b) == 0.0 && a.masses() == b.masses();
    println!("\nInitial state reproducible: {}", if initial_ok { "yes" } else { "NO" });

    let initial_momentum = a.momentum();
    let initial_energy = a.total_energy(params.softening);

    let reference = evolve(Kernel::Direct, params)?;

    println!("\nKernel     | Max state difference   | Checksum               | Rel. diff  | Result");
    println!("-----------|------------------------|------------------------|------------|-------");
    let mut all_ok = initial_ok;
    for kernel in Kernel::ALL {
        all_ok &= verify_kernel(kernel, &reference, params)?;
    }

    let final_momentum = reference.momentum();
    let final_energy = reference.total_energy(params.softening);
    let mut momentum_ok = true;
    println!("\nMomentum drift (direct):");
    for d in 0..3 {
        let drift = final_momentum[d] - initial_momentum[d];
        momentum_ok &= drift.abs() <= MOMENTUM_TOLERANCE;
        println!("  - axis {}: {:.6e} -> {:.6e} (drift {:.3e})", d, initial_momentum[d], final_momentum[d], drift);
    }

    // Explicit Euler does not conserve energy; report only.
    println!("\nEnergy (direct):");
    println!("  - Initial: {:.6e}", initial_energy);
    println!("  - Final:   {:.6e}", final_energy);
    println!("  - Change:  {:.3}%", (final_energy - initial_energy) / initial_energy.abs() * 100.0);

    Ok(all_ok && momentum_ok)
}
