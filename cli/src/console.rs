use colored::Colorize;

pub fn print_error_message(error_message: &str) {
    eprintln!("{}", error_message.red());
}

pub fn print_warn_message(warn_message: &str) {
    println!("{}", warn_message.yellow());
}

pub fn print_success_message(success_message: &str) {
    println!("{}", success_message.green());
}

pub fn print_heading(heading: &str) {
    println!("\n{}", format!("-- {}", heading).bold().cyan());
}

/// Prints one statement terminated so the output can be fed to a SQL shell.
pub fn print_statement(sql: &str) {
    println!("{};", sql);
}

/// Prints a bound parameter as a SQL comment next to its placeholder.
pub fn print_parameter(placeholder: &str, value: &str) {
    println!("{}", format!("--   {} = {}", placeholder, value).dimmed());
}

/// Formats a speed-up ratio, highlighting anything that beats the baseline.
pub fn format_speed_up(baseline: f64, elapsed: f64) -> String {
    let ratio = if elapsed > 0.0 { baseline / elapsed } else { f64::INFINITY };
    let text = format!("{:.1}x", ratio);
    if ratio > 1.05 {
        text.green().to_string()
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_speed_up() {
        colored::control::set_override(false);
        assert_eq!(format_speed_up(2.0, 2.0), "1.0x");
        assert_eq!(format_speed_up(10.0, 2.0), "5.0x");
        assert_eq!(format_speed_up(1.0, 0.0), "infx");
    }
}
