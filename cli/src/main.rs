mod cli_interface;
mod commands;
mod console;
mod sample;

use clap::Parser;
use rbulk::{setup_info_logger, setup_quiet_logger};

use crate::{
    cli_interface::{Commands, CLI},
    commands::{bench::handle_bench_command, sql::handle_sql_command},
    console::print_error_message,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CLI::parse();

    match cli.command {
        Commands::Bench(details) => {
            setup_info_logger();
            handle_bench_command(details).map_err(|e| {
                print_error_message(&format!("Benchmark failed: {}", e));
                e
            })
        }
        Commands::Sql(details) => {
            setup_quiet_logger();
            handle_sql_command(details).map_err(|e| {
                print_error_message(&e.to_string());
                e
            })
        }
    }
}
