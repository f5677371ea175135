//! # tabclean command-line entry point
//!
//! ```text
//! main()
//!   │
//!   ├─> Parse CLI arguments (clap)
//!   ├─> Load settings (config dir, defaults if absent)
//!   ├─> Initialise logging (stderr + optional rolling file)
//!   └─> Execute the subcommand
//! ```
//!
//! ```bash
//! tabclean validate -i autos.csv -p autos.json
//! tabclean clean -i autos.csv -p autos.json -o autos_clean.csv --report report.json
//! tabclean describe -i autos_clean.csv -c price --top 10
//! tabclean describe -i survey.csv -p survey.json -c dissatisfied --group-by institute_service
//! ```

#![expect(clippy::print_stdout)] // Allow println! in main binary

mod cli;

use anyhow::Result;
use clap::Parser as _;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    let settings = tabclean::config::load_app_config();
    tabclean::logging::init(settings.log_to_file && !cli.no_log_file)?;

    cli::run_command(cli.command, &settings)
}
