#![forbid(unsafe_code)]

fn main() {
    env_logger::init();
    if let Err(error) = strata_verify::run_from_env() {
        eprintln!("{error}");
        std::process::exit(error.exit_code());
    }
}
