// addrindex: rewrite malloc/free trace addresses as first-seen indices

use std::io::{self, BufWriter};

use addrindex::rewrite::Rewriter;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 {
        let program_name = args.first().map(|s| s.as_str()).unwrap_or("addrindex");
        eprintln!("Error: {} takes no arguments", program_name);
        eprintln!();
        eprintln!("Usage: {} < trace.txt > indexed.txt", program_name);
        std::process::exit(1);
    }

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut rewriter = Rewriter::new();

    if let Err(e) = rewriter.run(stdin.lock(), BufWriter::new(stdout.lock())) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
