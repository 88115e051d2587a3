//! Terminal color handling
//!
//! Honors the NO_COLOR standard (https://no-color.org/) and the CLICOLOR
//! conventions:
//! - `NO_COLOR`: set to anything, disables colors
//! - `CLICOLOR_FORCE`: non-zero, forces colors even when not a TTY
//! - `CLICOLOR=0`: disables colors
//!
//! Otherwise colors follow whether stdout is a terminal.

use colored::control;
use std::io::IsTerminal;

/// Decide whether to color output from an environment lookup and TTY status
pub fn colors_enabled(lookup: impl Fn(&str) -> Option<String>, is_tty: bool) -> bool {
    if lookup("NO_COLOR").is_some() {
        return false;
    }
    if lookup("CLICOLOR_FORCE").is_some_and(|v| v != "0") {
        return true;
    }
    if lookup("CLICOLOR").is_some_and(|v| v == "0") {
        return false;
    }
    is_tty
}

/// Configure `colored` for the whole process. Call early in `main`.
pub fn init_colors() {
    let enabled = colors_enabled(|key| std::env::var(key).ok(), std::io::stdout().is_terminal());
    control::set_override(enabled);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn test_no_color_wins() {
        assert!(!colors_enabled(env(&[("NO_COLOR", ""), ("CLICOLOR_FORCE", "1")]), true));
    }

    #[test]
    fn test_clicolor_force() {
        assert!(colors_enabled(env(&[("CLICOLOR_FORCE", "1")]), false));
        assert!(!colors_enabled(env(&[("CLICOLOR_FORCE", "0")]), false));
    }

    #[test]
    fn test_clicolor_disabled() {
        assert!(!colors_enabled(env(&[("CLICOLOR", "0")]), true));
    }

    #[test]
    fn test_tty_default() {
        assert!(colors_enabled(env(&[]), true));
        assert!(!colors_enabled(env(&[]), false));
    }
}
