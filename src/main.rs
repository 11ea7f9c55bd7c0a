//! junit-launch CLI entry point

fn main() {
    // Logging is initialized by the CLI once `--verbose` is known
    junit_launch::cli::run();
}
