//! Terminal output discipline.
//!
//! Every user-visible line carries the mode prefix: `>>> ` in free mode,
//! `>>> (<group>) ` in group mode. Status lines are bracketed; group message
//! deliveries are printed raw. Tests swap the sink for a buffer to assert
//! exact lines; interleaving with the prompt is cosmetic and not asserted.

use std::{
    io::Write,
    sync::Mutex,
};

use crate::state::Mode;

enum Sink {
    Stdout,
    Memory(Mutex<Vec<String>>),
}

/// Mode-aware line printer.
pub struct Printer {
    sink: Sink,
}

impl Printer {
    /// Print to standard output (the real client).
    pub fn stdout() -> Self {
        Self { sink: Sink::Stdout }
    }

    /// Capture lines in memory (tests).
    pub fn memory() -> Self {
        Self { sink: Sink::Memory(Mutex::new(Vec::new())) }
    }

    fn prefix(mode: &Mode) -> String {
        match mode {
            Mode::Free => ">>> ".to_owned(),
            Mode::InGroup(group) => format!(">>> ({group}) "),
        }
    }

    fn write(&self, line: String) {
        match &self.sink {
            Sink::Stdout => println!("{line}"),
            Sink::Memory(lines) => lines.lock().expect("printer mutex poisoned").push(line),
        }
    }

    /// Print a bracketed status line: `>>> [<text>]`.
    pub fn status(&self, mode: &Mode, text: &str) {
        self.write(format!("{}[{text}]", Self::prefix(mode)));
    }

    /// Print a raw line: `>>> <text>`.
    pub fn plain(&self, mode: &Mode, text: &str) {
        self.write(format!("{}{text}", Self::prefix(mode)));
    }

    /// Show the prompt without a newline (stdout only).
    pub fn prompt(&self, mode: &Mode) {
        if let Sink::Stdout = self.sink {
            print!("{}", Self::prefix(mode));
            let _ = std::io::stdout().flush();
        }
    }

    /// Lines captured so far (memory sink only).
    pub fn lines(&self) -> Vec<String> {
        match &self.sink {
            Sink::Stdout => Vec::new(),
            Sink::Memory(lines) => lines.lock().expect("printer mutex poisoned").clone(),
        }
    }
}
