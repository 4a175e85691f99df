//! Styled terminal messages. Honours `NO_COLOR`.

use console::{style, StyledObject};

/// True when `NO_COLOR` is set to any value.
#[must_use]
pub fn colors_disabled() -> bool {
    std::env::var_os("NO_COLOR").is_some()
}

fn tag(label: &'static str, paint: fn(StyledObject<&'static str>) -> StyledObject<&'static str>) -> String {
    if colors_disabled() {
        format!("[{label}]")
    } else {
        format!("[{}]", paint(style(label)).bold())
    }
}

/// Section header on stdout.
pub fn print_header(text: &str) {
    if colors_disabled() {
        println!("--- {text} ---");
    } else {
        println!("{}", style(format!("--- {text} ---")).cyan().bold());
    }
}

/// Success line on stdout.
pub fn print_success(text: &str) {
    println!("{} {text}", tag("OK", StyledObject::green));
}

/// Warning line on stderr.
pub fn print_warning(text: &str) {
    eprintln!("{} {text}", tag("WARN", StyledObject::yellow));
}

/// Error line on stderr.
pub fn print_error(text: &str) {
    eprintln!("{} {text}", tag("ERROR", StyledObject::red));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_keep_label() {
        assert!(tag("OK", StyledObject::green).contains("OK"));
        assert!(tag("ERROR", StyledObject::red).contains("ERROR"));
    }

    #[test]
    fn printers_accept_any_text() {
        print_header("Comparison");
        print_success("formulas agree");
        print_warning("");
        print_error("<bad> & \"input\"");
    }
}
