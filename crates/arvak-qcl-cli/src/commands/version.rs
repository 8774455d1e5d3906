//! Version command implementation.

use console::style;

/// Execute the version command.
pub fn execute() {
    let version = env!("CARGO_PKG_VERSION");

    println!(
        "{} {} - circuit-centric quantum classifier",
        style("Arvak QCL").cyan().bold(),
        style(format!("v{version}")).yellow()
    );
    println!();
    println!("Components:");
    println!("  arvak-qcl      Simulator, estimator, trainer and validator");
    println!("  arvak-qcl-cli  Command-line interface");
    println!();
    println!(
        "Repository: {}",
        style("https://github.com/hiq-lab/arvak").underlined()
    );
    println!("License:    {}", style("Apache-2.0").dim());
}
