//! MathVM IR Driver
//!
//! Developer entry point for the IR: loads a module persisted as JSON,
//! verifies it and prints it, or emits the built-in demo module.

mod demo;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::{debug, info};
use mvm_ir::{module_from_json, module_to_json, print_function, verify_module, Module, PrintOptions, VerifyOptions};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "mvm-ir")]
#[command(about = "MathVM IR inspection tool")]
#[command(version = "0.1.0")]
struct Cli {
    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load a JSON module, verify it and print it
    Dump {
        /// Input module in JSON form
        input: PathBuf,

        /// Skip verification
        #[arg(long)]
        no_verify: bool,

        /// Annotate block labels with their predecessors
        #[arg(long)]
        preds: bool,
    },

    /// Emit the built-in demo module
    Demo {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    match cli.command {
        Commands::Dump { input, no_verify, preds } => {
            let text = fs::read_to_string(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let options = PrintOptions { show_predecessors: preds, ..PrintOptions::default() };
            let rendered = dump_module(&text, !no_verify, &options)
                .with_context(|| format!("Failed to dump {}", input.display()))?;
            print!("{rendered}");
        }
        Commands::Demo { json, output } => {
            let rendered = render_demo(json)?;
            write_output(output.as_deref(), &rendered)?;
        }
    }
    Ok(())
}

/// Parse, optionally verify, and render a JSON module
fn dump_module(text: &str, verify: bool, options: &PrintOptions) -> Result<String> {
    let module = module_from_json(text).context("Invalid module JSON")?;
    debug!("Loaded module with {} function(s)", module.len());

    if verify {
        let result = verify_module(&module, &VerifyOptions::default());
        if !result.is_ok() {
            let messages: Vec<String> = result.errors.iter().map(|e| e.to_string()).collect();
            bail!("{} verification error(s):\n{}", messages.len(), messages.join("\n"));
        }
    }
    Ok(render_module(&module, options))
}

fn render_module(module: &Module, options: &PrintOptions) -> String {
    module
        .functions()
        .iter()
        .map(|func| print_function(func, options))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_demo(json: bool) -> Result<String> {
    let module = demo::demo_module()?;
    if json {
        Ok(module_to_json(&module)?)
    } else {
        Ok(module.to_string())
    }
}

fn write_output(path: Option<&Path>, text: &str) -> Result<()> {
    match path {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote {}", path.display());
        }
        None => print!("{text}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_demo_json_dumps_like_text() {
        let json = render_demo(true).unwrap();
        let dumped = dump_module(&json, true, &PrintOptions::default()).unwrap();
        assert_eq!(dumped, render_demo(false).unwrap());
    }

    #[test]
    fn test_dump_rejects_broken_module() {
        let json = render_demo(true).unwrap();
        let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
        // drop the predecessor list of the loop header
        value["functions"][0]["blocks"][1]["predecessors"] = serde_json::json!([]);
        let broken = value.to_string();

        let err = dump_module(&broken, true, &PrintOptions::default()).unwrap_err();
        assert!(err.to_string().contains("verification error"));
        assert!(dump_module(&broken, false, &PrintOptions::default()).is_ok());
    }

    #[test]
    fn test_dump_rejects_invalid_json() {
        let err = dump_module("{", true, &PrintOptions::default()).unwrap_err();
        assert_eq!(err.to_string(), "Invalid module JSON");
    }

    #[test]
    fn test_cli_parses_dump_flags() {
        let cli = Cli::parse_from(["mvm-ir", "-v", "dump", "m.json", "--no-verify", "--preds"]);
        assert!(cli.verbose);
        match cli.command {
            Commands::Dump { input, no_verify, preds } => {
                assert_eq!(input, PathBuf::from("m.json"));
                assert!(no_verify);
                assert!(preds);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
