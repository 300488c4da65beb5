//! Terminal styles for the vizfilter CLI.
//!
//! Renderers ask for a style by meaning (a message level, a heading, muted
//! metadata), never by color. `console` drops the escapes when stdout is not a
//! terminal, so piped output stays plain.

use console::Style;
use vizfilterapp::commands::MessageLevel;

pub fn heading() -> Style {
    Style::new().bold()
}

pub fn muted() -> Style {
    Style::new().color256(244)
}

pub fn name() -> Style {
    Style::new().cyan()
}

pub fn hidden() -> Style {
    Style::new().color256(244).italic()
}

pub fn for_level(level: MessageLevel) -> Style {
    match level {
        MessageLevel::Info => muted(),
        MessageLevel::Success => Style::new().green(),
        MessageLevel::Warning => Style::new().yellow().bold(),
        MessageLevel::Error => Style::new().red().bold(),
    }
}
