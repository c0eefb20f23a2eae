use std::process::ExitCode;

fn main() -> ExitCode {
    match feed_loader::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            feed_loader::exit_code(&err)
        }
    }
}
