use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use linmem::harness::{self, BOUNDS_SCENARIO};
use linmem::{instantiate_file, Export, InstanceOptions, Trap, Value};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// linmem — run WebAssembly modules against a bounds-checked linear memory.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Page limit for memories that declare no maximum
    #[arg(long, global = true)]
    max_pages: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Call an exported function and print its results
    Invoke {
        /// Module file (.wasm or .wat)
        module: PathBuf,
        /// Export name
        export: String,
        /// Arguments, parsed according to the function signature
        #[arg(allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Run the goodload/badload/goodstore/badstore bounds scenario
    Check {
        /// Module file (.wasm or .wat)
        module: PathBuf,
    },
    /// Show memory limits and exports
    Inspect {
        /// Module file (.wasm or .wat)
        module: PathBuf,
    },
}

fn init_tracing() {
    // stdout carries command output; diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();

    let options = InstanceOptions {
        default_max_pages: cli.max_pages,
    };

    match cli.command {
        Command::Invoke {
            module,
            export,
            args,
        } => {
            let mut instance = instantiate_file(&module, &options)?;
            let handle = instance.func(&export)?;
            let (params, _) = instance.signature(handle)?;
            if params.len() != args.len() {
                bail!(
                    "{export} expects {} argument(s), got {}",
                    params.len(),
                    args.len()
                );
            }
            let values = args
                .iter()
                .zip(params)
                .map(|(text, ty)| Value::parse(text, *ty))
                .collect::<Result<Vec<_>>>()?;

            info!(%export, ?values, "invoking");
            match instance.invoke(handle, &values) {
                Ok(results) => {
                    for value in results {
                        println!("{value}");
                    }
                    Ok(ExitCode::SUCCESS)
                }
                Err(err) => {
                    if let Some(trap) = err.downcast_ref::<Trap>() {
                        warn!(%export, "call trapped");
                        eprintln!("trap: {trap}");
                        return Ok(ExitCode::FAILURE);
                    }
                    Err(err)
                }
            }
        }

        Command::Check { module } => {
            info!(module = %module.display(), "running bounds scenario");
            let mut instance = instantiate_file(&module, &options)?;
            let report = harness::run(&mut instance, BOUNDS_SCENARIO)?;
            print!("{report}");
            if report.passed() {
                Ok(ExitCode::SUCCESS)
            } else {
                eprintln!("linmem: {} step(s) failed", report.failures());
                Ok(ExitCode::FAILURE)
            }
        }

        Command::Inspect { module } => {
            let instance = instantiate_file(&module, &options)?;
            match instance.memory() {
                Some(mem) => {
                    let max = mem
                        .max_pages()
                        .map_or_else(|| "none".to_string(), |m| m.to_string());
                    println!("memory: {} page(s), max {max}", mem.page_count());
                }
                None => println!("memory: none"),
            }
            for (name, export) in instance.exports() {
                match export {
                    Export::Func(handle) => {
                        let (params, results) = instance.signature(handle)?;
                        println!("func {name}({}) -> ({})", join(params), join(results));
                    }
                    Export::Memory => println!("memory {name}"),
                }
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn join(types: &[linmem::ValueType]) -> String {
    types
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
