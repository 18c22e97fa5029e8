// Terminal rendering for the runlet CLI. Progress lines, step results, and
// control-plane replies all print through here so every command looks alike.

use std::time::Duration;

use runlet_service::StepStatus;

fn paint(code: &str, text: &str) -> String {
    format!("\x1b[{}m{}\x1b[0m", code, text)
}

/// Action line in the style of `   Resolving etl_daily`.
pub fn status(action: &str, message: &str) {
    eprintln!("{} {}", paint("1;36", &format!("{:>12}", action)), message);
}

pub fn success(message: &str) {
    eprintln!("{} {}", paint("1;32", "  \u{2713}"), message);
}

pub fn failure(message: &str) {
    eprintln!("{} {}", paint("1;31", "  \u{2717}"), message);
}

/// One passed validation check.
pub fn check(message: &str) {
    eprintln!("{} {}", paint("32", "  \u{2713}"), message);
}

pub fn warning(message: &str) {
    eprintln!("{} {}", paint("33", "  !"), message);
}

pub fn error(message: &str) {
    eprintln!("{} {}", paint("1;31", "error:"), message);
}

pub fn info(message: &str) {
    eprintln!("{} {}", paint("36", "  i"), message);
}

pub fn dim(message: &str) {
    eprintln!("{}", paint("2", message));
}

pub fn header(message: &str) {
    eprintln!("{}", paint("1", &format!("==> {}", message)));
}

/// Progress line for a step that just started: `  [2/5] transform`.
pub fn step_started(index: usize, total: usize, name: &str) {
    println!("  [{}/{}] {}", index + 1, total, name);
}

/// One line of live step output; stderr lines print in red.
pub fn step_output(line: &str) {
    println!("    | {}", line);
}

pub fn step_error(line: &str) {
    eprintln!("{}", paint("31", &format!("    | {}", line)));
}

/// Result line for a finished step: `      OK (0.42s)` or
/// `      FAIL (1.03s, exit code 7)`.
pub fn step_finished(status: StepStatus, duration: Duration, exit_code: Option<i32>) {
    let color = if status == StepStatus::Succeeded {
        "32"
    } else {
        "31"
    };
    eprintln!("{}", paint(color, &step_result_line(status, duration, exit_code)));
}

fn step_result_line(status: StepStatus, duration: Duration, exit_code: Option<i32>) -> String {
    let label = match status {
        StepStatus::Succeeded => "OK",
        StepStatus::Failed => "FAIL",
        StepStatus::Skipped => "SKIP",
    };
    let exit = match exit_code {
        Some(code) if code != 0 => format!(", exit code {}", code),
        _ => String::new(),
    };
    format!("      {} ({:.2}s{})", label, duration.as_secs_f64(), exit)
}
