//! ID photo backdrop CLI tool
//!
//! Command-line interface for replacing portrait photo backgrounds with a
//! gradient using the idphoto-backdrop library.

#[cfg(feature = "cli")]
use idphoto_backdrop::cli;

#[cfg(feature = "cli")]
fn main() -> anyhow::Result<()> {
    cli::main()
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Please rebuild with --features cli");
    std::process::exit(1);
}
