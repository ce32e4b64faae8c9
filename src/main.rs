use std::process::ExitCode;

fn main() -> ExitCode {
    skara::telemetry::init();

    match skara::cli::run() {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(err) => {
            skara::ui::output::error(format!("{:#}", err));
            ExitCode::FAILURE
        }
    }
}
