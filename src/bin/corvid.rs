use std::io::Write;

use corvid::{
    prelude::*,
    runtime::{fmt::pretty, parse::parse_int},
};
use termcolor::{ColorChoice, StandardStream};

fn usage() {
    println!("Usage: corvid [options] <text>");
    println!("Parses <text> as an integer and prints the result value and its hash.");
    println!("Options:");
    println!("  -h, --help: Print this help message");
    println!("  --radix <n>: Radix to parse in, 2 to 36 (default: 10)");
    println!("Environment:");
    println!("  CORVID_HASH_SEED, CORVID_HASH_DEPTH, CORVID_TRACE_HEAP");
}

fn run() -> Result<(), String> {
    let mut args = pico_args::Arguments::from_env();

    if args.contains(["-h", "--help"]) {
        usage();
        std::process::exit(0);
    }

    let radix = match args.opt_value_from_str::<_, i64>("--radix") {
        Ok(Some(radix)) => radix,
        Ok(None) => 10,
        Err(e) => return Err(e.to_string()),
    };

    let text = args.free_from_str::<String>().map_err(|e| e.to_string())?;

    let result = parse_int(&make_string(&text), &make_integer(radix));

    let mut out = StandardStream::stdout(ColorChoice::Auto);
    pretty(&result, &mut out).map_err(|e| e.to_string())?;
    writeln!(out).map_err(|e| e.to_string())?;
    writeln!(out, "hash: {}", hash_value(&result)).map_err(|e| e.to_string())?;
    Ok(())
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("corvid: {}", e);
        std::process::exit(2);
    }
}
