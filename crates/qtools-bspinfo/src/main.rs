// main.rs - print format, lump sizes, and the embedded map name of BSP files

use std::path::PathBuf;
use std::process;

use log::{Level, LevelFilter, Metadata, Record};

use qtools_common::bspfile::{load_bsp_file, print_bsp_file_sizes};

/// Routes library log output to stderr so parse warnings are visible
/// next to the report they belong to.
struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Info
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("{}: {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

/// Append ".bsp" when the argument carries no extension of its own.
fn default_extension(arg: &str) -> PathBuf {
    let mut path = PathBuf::from(arg);
    if path.extension().is_none() {
        path.set_extension("bsp");
    }
    path
}

fn main() {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Info);
    }

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("usage: bspinfo bspfile [bspfiles]");
        process::exit(1);
    }

    let mut failed = false;
    for arg in &args[1..] {
        let path = default_extension(arg);
        println!("---------------------");
        println!("{}", path.display());
        match load_bsp_file(&path) {
            Ok((bspdata, message)) => {
                println!("{} ({})", bspdata.loadversion.name, bspdata.loadversion);
                if let Some(message) = message {
                    println!("message: {}", message);
                }
                print!("{}", print_bsp_file_sizes(&bspdata));
            }
            Err(err) => {
                eprintln!("{}: {}", path.display(), err);
                failed = true;
            }
        }
    }

    if failed {
        process::exit(1);
    }
}
