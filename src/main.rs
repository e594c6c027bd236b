//! `cedar-opt`: parse textual IR, run lowering passes, print the result or
//! emit a native object file.
//!
//! Exit status is 0 on success and 1 on any fatal failure (parse error,
//! conversion failure, verification failure, emission failure).

mod cli;

use std::io::Read;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cedar_ir::context::IrContext;
use cedar_ir::ops::DialectOp;
use cedar_ir::{parser, printer};
use cedar_lower::{PassManager, default_registry, lower_to_clif};
use cli::Cli;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("cedar-opt: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), String> {
    let registry = default_registry();

    if cli.list_passes {
        for name in registry.names() {
            println!("{name}");
        }
        return Ok(());
    }

    let input = cli.input.ok_or("no input file")?;
    let text = if input.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| format!("failed to read stdin: {e}"))?;
        buf
    } else {
        std::fs::read_to_string(&input)
            .map_err(|e| format!("failed to read {}: {e}", input.display()))?
    };

    let mut ctx = IrContext::new();
    let module = parser::parse_module(&mut ctx, &text).map_err(|e| e.to_string())?;

    if let Some(output) = cli.output {
        if !cli.passes.is_empty() {
            return Err("--pass and --output are mutually exclusive".to_owned());
        }
        lower_to_clif(&mut ctx, module).map_err(|e| e.to_string())?;
        let bytes =
            cedar_clif_backend::emit_object(&ctx, module).map_err(|e| e.to_string())?;
        std::fs::write(&output, bytes)
            .map_err(|e| format!("failed to write {}: {e}", output.display()))?;
        return Ok(());
    }

    if !cli.passes.is_empty() {
        let mut pm = PassManager::new();
        for name in &cli.passes {
            let factory = registry
                .get(name)
                .ok_or_else(|| format!("unknown pass '{name}'"))?;
            pm.add_pass(factory());
        }
        pm.run(&mut ctx, module).map_err(|e| e.to_string())?;
    } else {
        lower_to_clif(&mut ctx, module).map_err(|e| e.to_string())?;
    }

    print!("{}", printer::print_module(&ctx, module.op_ref()));
    Ok(())
}
