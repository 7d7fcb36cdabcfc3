//! Line prompts for the interactive menus.
//!
//! Each read races stdin against the process-wide interrupt flag, so Ctrl-C
//! ends a menu loop cleanly instead of killing the process mid-prompt.

use std::io::Write;

use chrono::NaiveDate;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::debug;

use crate::error::Result;
use crate::normalize::parse_date;
use crate::shutdown::Shutdown;

/// What a prompt produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply<T> {
    Value(T),
    /// The user typed `cancel` (or an empty line where a value is required).
    Cancelled,
    /// Ctrl-C or end of input.
    Interrupted,
}

/// Reads prompted lines from stdin.
pub struct Prompter {
    lines: Lines<BufReader<Stdin>>,
    shutdown: Shutdown,
}

impl Prompter {
    pub fn new(shutdown: Shutdown) -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
            shutdown,
        }
    }

    /// Print `label` and read one trimmed line.
    pub async fn line(&mut self, label: &str) -> Result<Reply<String>> {
        print!("{label}: ");
        std::io::stdout().flush()?;
        if self.shutdown.is_requested() {
            println!();
            return Ok(Reply::Interrupted);
        }
        tokio::select! {
            line = self.lines.next_line() => match line? {
                Some(text) => Ok(Reply::Value(text.trim().to_string())),
                None => Ok(Reply::Interrupted),
            },
            _ = self.shutdown.requested() => {
                println!();
                debug!("Prompt interrupted");
                Ok(Reply::Interrupted)
            }
        }
    }

    /// Like [`Prompter::line`], returning `default` for an empty answer.
    pub async fn line_or(&mut self, label: &str, default: &str) -> Result<Reply<String>> {
        Ok(match self.line(&format!("{label} [{default}]")).await? {
            Reply::Value(v) if v.is_empty() => Reply::Value(default.to_string()),
            other => other,
        })
    }

    /// Yes/no question; anything but `y`/`yes` is a no.
    pub async fn confirm(&mut self, question: &str) -> Result<Reply<bool>> {
        Ok(match self.line(&format!("{question} [y/N]")).await? {
            Reply::Value(v) => Reply::Value(is_yes(&v)),
            Reply::Cancelled => Reply::Cancelled,
            Reply::Interrupted => Reply::Interrupted,
        })
    }

    /// Ask for a date until it parses or the user types `cancel`.
    pub async fn date(&mut self, label: &str) -> Result<Reply<NaiveDate>> {
        loop {
            match self.line(&format!("{label} (or 'cancel')")).await? {
                Reply::Value(v) => match interpret_date(&v) {
                    DateAnswer::Date(d) => return Ok(Reply::Value(d)),
                    DateAnswer::Cancel => return Ok(Reply::Cancelled),
                    DateAnswer::Invalid => {
                        println!("Invalid date '{v}'. Try YYYY-MM-DD, YYYYMMDD or 'yesterday'.")
                    }
                },
                other => return Ok(other.without_value()),
            }
        }
    }
}

impl Reply<String> {
    /// Re-type a non-value reply.
    fn without_value<T>(self) -> Reply<T> {
        match self {
            Reply::Cancelled | Reply::Value(_) => Reply::Cancelled,
            Reply::Interrupted => Reply::Interrupted,
        }
    }
}

pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[derive(Debug, PartialEq, Eq)]
enum DateAnswer {
    Date(NaiveDate),
    Cancel,
    Invalid,
}

fn interpret_date(answer: &str) -> DateAnswer {
    let answer = answer.trim();
    if answer.is_empty() || answer.eq_ignore_ascii_case("cancel") {
        return DateAnswer::Cancel;
    }
    parse_date(answer).map_or(DateAnswer::Invalid, DateAnswer::Date)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yes_answers() {
        assert!(is_yes("Y"));
        assert!(is_yes(" yes "));
        assert!(!is_yes(""));
        assert!(!is_yes("nope"));
    }

    #[test]
    fn date_answers() {
        assert_eq!(
            interpret_date("2025-05-06"),
            DateAnswer::Date(NaiveDate::from_ymd_opt(2025, 5, 6).unwrap())
        );
        assert_eq!(interpret_date("CANCEL"), DateAnswer::Cancel);
        assert_eq!(interpret_date(""), DateAnswer::Cancel);
        assert_eq!(interpret_date("06/31/2025"), DateAnswer::Invalid);
    }

    #[tokio::test]
    async fn earlier_interrupt_ends_the_next_prompt() {
        let (tx, shutdown) = Shutdown::channel();
        tx.send_replace(true);
        let mut prompt = Prompter::new(shutdown);
        assert_eq!(prompt.line("Select an option").await.unwrap(), Reply::Interrupted);
        assert_eq!(prompt.confirm("Delete?").await.unwrap(), Reply::Interrupted);
    }

    #[test]
    fn non_values_keep_interrupts() {
        assert_eq!(Reply::<String>::Interrupted.without_value::<u8>(), Reply::Interrupted);
        assert_eq!(Reply::<String>::Cancelled.without_value::<u8>(), Reply::Cancelled);
    }
}
