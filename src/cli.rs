//! Command-line interface for `cedar-opt`.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(name = "cedar-opt")]
#[command(about = "Cedar IR lowering driver and inspection tool", long_about = None)]
pub struct Cli {
    /// Input IR file ("-" reads from stdin)
    pub input: Option<PathBuf>,

    /// Run only the named passes, in the given order (repeatable)
    #[arg(long = "pass", value_name = "NAME")]
    pub passes: Vec<String>,

    /// List registered passes and exit
    #[arg(long)]
    pub list_passes: bool,

    /// Lower fully and write a native object file instead of printing IR
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}
