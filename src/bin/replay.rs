// replay: run an index-normalized malloc/free trace against a virtual heap

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use addrindex::replay::{ReplayStep, Replayer};

fn print_step(step: &ReplayStep) {
    match step.address {
        Some(address) => println!("{}: {} (0x{:x})", step.instruction, step.text, address),
        None => println!("{}: {} (nil)", step.instruction, step.text),
    }
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let program_name = args.first().map(|s| s.as_str()).unwrap_or("replay");

    if args.len() != 2 {
        eprintln!("Error: expected exactly one trace file");
        eprintln!();
        eprintln!("Usage: {} <trace.txt>", program_name);
        eprintln!();
        eprintln!("The trace should already be normalized, e.g.");
        eprintln!("  addrindex < raw.txt > trace.txt");
        std::process::exit(1);
    }

    let trace_file = &args[1];

    if !Path::new(trace_file).exists() {
        eprintln!("Error: File '{}' not found", trace_file);
        std::process::exit(1);
    }

    let file = match File::open(trace_file) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Error: cannot open {}: {}", trace_file, e);
            std::process::exit(1);
        }
    };

    let mut replayer = Replayer::default();
    let report = match replayer.run(BufReader::new(file), print_step) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    for fault in &report.faults {
        eprintln!("Warning: {}", fault);
    }
    eprintln!(
        "Replayed {} instructions: {} faults, {} blocks ({} bytes) still live, peak {} bytes",
        report.instructions,
        report.faults.len(),
        report.live_blocks,
        report.live_bytes,
        report.peak_bytes
    );
}
