use std::time::Instant;

use nbody_bench::{logging, Ensemble, Integrator, Kernel, SimParams, SystemAllocator};

fn main() -> Result<(), nbody_bench::BenchError> {
    logging::init();

    println!("N-Body Step Scaling");
    println!("-------------------");

    let particle_counts = [250, 500, 1000, 1500, 2000];
    let warmup = 2;
    let steps = 10;

    println!("Running {} timed steps after {} warm-up steps, {} threads available", steps, warmup, num_cpus::get());
    println!("\nParticle Count | Kernel     | Runtime (ms) | Avg Step Time (ms) | Checksum");
    println!("---------------|------------|--------------|--------------------|---------");

    for &n in &particle_counts {
        let params = SimParams::reference().with_n(n).with_steps(warmup, steps);
        for kernel in Kernel::ALL {
            let mut ensemble = Ensemble::seeded(n, params.seed, &SystemAllocator)?;
            let mut integrator = Integrator::new(kernel, &params, 0, &SystemAllocator)?;
            integrator.run(&mut ensemble, warmup);

            let start = Instant::now();
            integrator.run(&mut ensemble, steps);
            let runtime = start.elapsed().as_secs_f64() * 1000.0;

            println!("{:14} | {:10} | {:12.3} | {:18.4} | {:.6}",
                     n, kernel, runtime, runtime / steps as f64, ensemble.checksum());
        }
        println!("---------------|------------|--------------|--------------------|---------");
    }
    Ok(())
}
