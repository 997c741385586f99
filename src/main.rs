use std::process;

fn main() {
    if let Err(e) = code_skills::cli::run() {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}
