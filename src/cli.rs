use crate::config::LayoutConfig;
use crate::dump::{layout_dump_string, write_layout_dump};
use crate::layout::compute_layout;
use crate::step::parse_steps;
use anyhow::Result;
use clap::Parser;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "sfl", version, about = "Workflow step-graph layout engine")]
pub struct Args {
    /// Input step list (.json/.json5) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output layout JSON file. Defaults to stdout if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Pretty-print when writing to stdout
    #[arg(short = 'p', long = "pretty")]
    pub pretty: bool,

    /// Suppress structural diagnostics on stderr
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    let input = read_input(args.input.as_deref())?;
    let steps = parse_steps(&input)?;
    let layout = compute_layout(&steps, &LayoutConfig::default());

    if !args.quiet {
        for diagnostic in &layout.diagnostics {
            eprintln!("warning: {diagnostic}");
        }
    }

    match args.output.as_deref() {
        Some(path) => write_layout_dump(path, &layout)?,
        None => {
            let json = layout_dump_string(&layout, args.pretty)?;
            println!("{json}");
        }
    }
    Ok(())
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path {
        if path == Path::new("-") {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            return Ok(buf);
        }
        return Ok(std::fs::read_to_string(path)?);
    }

    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}
