//! Reads wikitext from standard input and pretty-prints the parsed tree to
//! standard output as JSON.

use std::io::Read as _;
use std::process::ExitCode;
use wikitext_ast::{Options, Parser};

fn main() -> ExitCode {
    env_logger::init();

    let mut input = String::new();
    if let Err(error) = std::io::stdin().read_to_string(&mut input) {
        eprintln!("failed to read standard input: {error}");
        return ExitCode::FAILURE;
    }

    let options = Options {
        debug: log::log_enabled!(log::Level::Debug),
        ..Options::default()
    };
    match Parser::new(options).parse(&input) {
        Ok(ast) => match serde_json::to_string_pretty(&ast) {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(error) => {
                eprintln!("failed to serialize the tree: {error}");
                ExitCode::FAILURE
            }
        },
        Err(error) => {
            eprintln!("{error}");
            for frame in error.context() {
                eprintln!("  in production at line {}: {:?}", frame.line, frame.excerpt);
            }
            ExitCode::FAILURE
        }
    }
}
