use std::process::{Command, Output};

fn bench(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_nbody_bench"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to launch nbody_bench")
}

/// Parses `elapsed_ms=<F> checksum=<F>`.
fn parse_report(line: &str) -> (f64, f64) {
    let mut fields = line.split(' ');
    let elapsed = fields.next().and_then(|f| f.strip_prefix("elapsed_ms=")).expect("elapsed_ms field");
    let checksum = fields.next().and_then(|f| f.strip_prefix("checksum=")).expect("checksum field");
    assert!(fields.next().is_none(), "extra fields in {:?}", line);
    assert_eq!(elapsed.split('.').nth(1).map(str::len), Some(3), "elapsed precision in {:?}", line);
    assert_eq!(checksum.split('.').nth(1).map(str::len), Some(6), "checksum precision in {:?}", line);
    (elapsed.parse().unwrap(), checksum.parse().unwrap())
}

#[test]
fn prints_one_report_line() {
    let out = bench(&["-n", "64", "-w", "0", "-s", "10"]);
    assert!(out.status.success());
    assert!(out.stderr.is_empty(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let stdout = String::from_utf8(out.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 1, "stdout: {:?}", stdout);
    let (elapsed, checksum) = parse_report(lines[0]);
    assert!(elapsed >= 0.0);
    assert_eq!(checksum, -25.104852);
}

#[test]
fn every_kernel_prints_the_same_checksum_field() {
    let mut seen = Vec::new();
    for kernel in ["direct", "symmetric", "parallel"] {
        let out = bench(&["-n", "64", "-w", "0", "-s", "10", "-k", kernel, "-t", "2"]);
        assert!(out.status.success(), "{}", kernel);
        let stdout = String::from_utf8(out.stdout).unwrap();
        seen.push(stdout.trim_end().split(' ').nth(1).unwrap().to_string());
    }
    assert!(seen.iter().all(|c| c == "checksum=-25.104852"), "{:?}", seen);
}

#[test]
fn allocation_failure_exits_one_without_report() {
    let out = bench(&["--memory-limit", "1024"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(out.stdout.is_empty(), "stdout: {}", String::from_utf8_lossy(&out.stdout));
    let stderr = String::from_utf8(out.stderr).unwrap();
    assert_eq!(stderr.lines().count(), 1, "stderr: {:?}", stderr);
    assert!(stderr.contains("allocation failed"), "stderr: {:?}", stderr);
}

#[test]
fn invalid_softening_exits_one() {
    let out = bench(&["-n", "8", "--softening", "0"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(out.stdout.is_empty());
}

#[test]
#[ignore]
fn reference_run_matches_reference_checksum() {
    let out = bench(&[]);
    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    let (_, checksum) = parse_report(stdout.trim_end());
    assert_eq!(checksum, 6673.544927);
}
