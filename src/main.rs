use trackdeck::cli::run;

fn main() {
    std::process::exit(run());
}
