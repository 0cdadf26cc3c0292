use std::{
    env, fs,
    io::{self, Read as _},
    process::ExitCode,
};

use sol25::{Runner, StdPrint, StdinReader};

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let source = match read_source(args.get(1).map(String::as_str)) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let runner = match Runner::new(&source) {
        Ok(runner) => runner,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::from(err.exit_code());
        }
    };

    let mut reader = StdinReader::new();
    let mut print = StdPrint::new();
    match runner.run(&mut reader, &mut print) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // flush program output written before the failure
            drop(print);
            eprintln!("error: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}

fn read_source(path: Option<&str>) -> Result<String, String> {
    match path {
        None | Some("-") => {
            let mut source = String::new();
            io::stdin()
                .read_to_string(&mut source)
                .map_err(|err| format!("failed to read stdin: {err}"))?;
            Ok(source)
        }
        Some(path) => fs::read_to_string(path).map_err(|err| format!("failed to read {path}: {err}")),
    }
}
