use clap::Parser;
use std::path::PathBuf;

/// A compiler for `@enum`, `@struct` and `@union` source annotations
#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    /// Paths to the source files to scan for annotation blocks
    #[clap(name = "FILE", required = true)]
    files: Vec<PathBuf>,
    /// Exit successfully even if errors were encountered
    #[clap(long = "allow-errors")]
    allow_errors: bool,
    /// Do not print the compiled descriptors
    #[clap(long = "quiet", short = 'q')]
    quiet: bool,
}

const MAX_PRETTY_WIDTH: usize = 80;

fn get_pretty_width() -> usize {
    let term_width = termsize::get().map_or(usize::MAX, |size| usize::from(size.cols));
    std::cmp::min(term_width, MAX_PRETTY_WIDTH)
}

fn main() -> ! {
    let cli = Cli::parse();

    let mut driver = anno::Driver::new();
    driver.set_allow_errors(cli.allow_errors);
    driver.set_quiet(cli.quiet);
    driver.set_emit_width(get_pretty_width());

    let mut status = anno::Status::Ok;
    for path in &cli.files {
        match driver.load_source_path(path) {
            Some(file_id) => {
                if let anno::Status::Error = driver.compile_file(file_id) {
                    status = anno::Status::Error;
                }
            }
            None => status = anno::Status::Error,
        }
    }

    std::process::exit(status.exit_code());
}
