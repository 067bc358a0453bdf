//! Line-based prompts. Invalid answers are reported and asked again.

use std::io::{BufRead, Write};

use color_eyre::Result;
use crossterm::style::Stylize;

/// Asks for a 1-based folder number. `None` means the user quit.
pub fn select_folder(
    input: &mut impl BufRead,
    out: &mut impl Write,
    count: usize,
) -> Result<Option<usize>> {
    loop {
        let Some(answer) = ask(input, out, "Select a folder number (or 'q' to quit) [1]: ")? else {
            return Ok(None);
        };
        let answer = if answer.is_empty() { "1" } else { answer.as_str() };

        if answer.eq_ignore_ascii_case("q") {
            return Ok(None);
        }

        match answer.parse::<usize>() {
            Ok(n) if (1..=count).contains(&n) => return Ok(Some(n - 1)),
            Ok(_) => writeln!(out, "{}", "Invalid selection. Try again.".red())?,
            Err(_) => writeln!(out, "{}", "Please enter a number or 'q'.".red())?,
        }
    }
}

/// A `[y/n]` question defaulting to yes. End of input counts as no.
pub fn confirm(input: &mut impl BufRead, out: &mut impl Write, question: &str) -> Result<bool> {
    loop {
        let Some(answer) = ask(input, out, &format!("{question} [y/n] (y): "))? else {
            return Ok(false);
        };
        match answer.to_ascii_lowercase().as_str() {
            "" | "y" => return Ok(true),
            "n" => return Ok(false),
            _ => writeln!(out, "{}", "Please select one of the available options".red())?,
        }
    }
}

fn ask(input: &mut impl BufRead, out: &mut impl Write, prompt: &str) -> Result<Option<String>> {
    write!(out, "{prompt}")?;
    out.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}
