//! Interactive selection of region, date range, queue and audio format.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use console::{style, Term};

use crate::platform::{AudioFormat, Queue, Region};
use crate::utils::{parse_date, validate_date_range};

/// Line-oriented operator terminal
pub trait Prompter {
    /// Print one line of text
    fn show(&self, line: &str) -> Result<()>;

    /// Ask a question and return the raw answer
    fn ask(&self, question: &str) -> Result<String>;
}

/// Prompter backed by the process terminal
pub struct ConsolePrompter {
    term: Term,
}

impl ConsolePrompter {
    pub fn new() -> Self {
        Self { term: Term::stdout() }
    }
}

impl Default for ConsolePrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl Prompter for ConsolePrompter {
    fn show(&self, line: &str) -> Result<()> {
        self.term.write_line(line).context("Failed to write to terminal")
    }

    fn ask(&self, question: &str) -> Result<String> {
        self.term
            .write_str(&format!("{} {} ", style("?").cyan().bold(), question))
            .context("Failed to write to terminal")?;
        self.term.read_line().context("Failed to read answer")
    }
}

/// Ask until `parse` accepts the answer
pub fn ask_until_valid<T>(
    prompter: &dyn Prompter,
    question: &str,
    parse: impl Fn(&str) -> Result<T>,
) -> Result<T> {
    loop {
        let answer = prompter.ask(question)?;
        match parse(answer.trim()) {
            Ok(value) => return Ok(value),
            Err(e) => prompter.show(&format!("  {}", e))?,
        }
    }
}

/// Numbered single-select; returns the zero-based index of the choice
pub fn select(prompter: &dyn Prompter, question: &str, options: &[String]) -> Result<usize> {
    if options.is_empty() {
        anyhow::bail!("Nothing to choose from");
    }

    for (index, option) in options.iter().enumerate() {
        prompter.show(&format!("  {}. {}", index + 1, option))?;
    }

    ask_until_valid(prompter, question, |answer| {
        let number: usize = answer
            .parse()
            .map_err(|_| anyhow::anyhow!("Enter a number between 1 and {}", options.len()))?;
        if number == 0 || number > options.len() {
            anyhow::bail!("Enter a number between 1 and {}", options.len());
        }
        Ok(number - 1)
    })
}

pub fn select_region(prompter: &dyn Prompter) -> Result<Region> {
    let options: Vec<String> = Region::ALL.iter().map(|region| region.to_string()).collect();
    let index = select(prompter, "Choose the region:", &options)?;
    Ok(Region::ALL[index])
}

/// Ask for start and end dates as `YYYY-MM-DD`
pub fn prompt_date_range(prompter: &dyn Prompter) -> Result<(NaiveDate, NaiveDate)> {
    let start = ask_until_valid(prompter, "Start date (YYYY-MM-DD):", parse_date)?;
    let end = ask_until_valid(prompter, "End date (YYYY-MM-DD):", |answer| {
        let end = parse_date(answer)?;
        validate_date_range(start, end)?;
        Ok(end)
    })?;
    Ok((start, end))
}

pub fn select_queue<'q>(prompter: &dyn Prompter, queues: &'q [Queue]) -> Result<&'q Queue> {
    if queues.is_empty() {
        anyhow::bail!("No queues available");
    }

    let options: Vec<String> = queues
        .iter()
        .map(|queue| format!("{} (ID: {})", queue.name, queue.id))
        .collect();
    let index = select(prompter, "Choose the queue number:", &options)?;
    Ok(&queues[index])
}

pub fn select_format(prompter: &dyn Prompter) -> Result<AudioFormat> {
    let options: Vec<String> = AudioFormat::ALL
        .iter()
        .map(|format| format.description().to_string())
        .collect();
    let index = select(prompter, "Choose the final audio format:", &options)?;
    Ok(AudioFormat::ALL[index])
}
