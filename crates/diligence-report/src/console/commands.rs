//! Command parsing for the due diligence console
//!
//! Input starting with `/` is a command; anything else is a question about
//! the current report.

use crate::error::{ReportError, Result};
use chrono::NaiveDate;

/// Parsed command from user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Generate the initial report
    Generate {
        company: String,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    },
    /// Run the comprehensive phase on the current report
    Comprehensive,
    /// Ask a question about the current report
    Ask { question: String },
    /// Print the current narrative
    Show,
    /// Print the path of the latest document
    Download,
    /// List saved charts
    Charts,
    /// Print the chat history
    History,
    /// Delete charts and forget the report
    Clear,
    /// Show help
    Help,
    /// Exit the console
    Exit,
}

fn parse_date(token: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(token, "%Y-%m-%d").ok()
}

/// Split `<company words...> [start] [end]`
fn parse_generate(args: &[&str]) -> Result<Command> {
    let mut words = args.to_vec();
    let mut dates = Vec::new();
    while dates.len() < 2 {
        match words.last().and_then(|token| parse_date(token)) {
            Some(date) => {
                dates.push(date);
                words.pop();
            }
            None => break,
        }
    }
    dates.reverse();

    let company = words.join(" ");
    if company.is_empty() {
        return Err(ReportError::Command(
            "Missing company or ticker for generate command".to_string(),
        ));
    }

    Ok(Command::Generate {
        company,
        start: dates.first().copied(),
        end: dates.get(1).copied(),
    })
}

impl Command {
    /// Parse a command from user input
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();

        if input.is_empty() {
            return Err(ReportError::Command("Empty input".to_string()));
        }

        let Some(rest) = input.strip_prefix('/') else {
            return Ok(Command::Ask {
                question: input.to_string(),
            });
        };

        let parts: Vec<&str> = rest.split_whitespace().collect();
        let Some((cmd, args)) = parts.split_first() else {
            return Err(ReportError::Command("Empty command".to_string()));
        };

        match cmd.to_lowercase().as_str() {
            "generate" | "gen" | "g" => parse_generate(args),
            "comprehensive" | "comp" | "c" => Ok(Command::Comprehensive),
            "ask" | "a" => {
                if args.is_empty() {
                    return Err(ReportError::Command(
                        "Missing question for ask command".to_string(),
                    ));
                }
                Ok(Command::Ask {
                    question: args.join(" "),
                })
            }
            "show" | "s" => Ok(Command::Show),
            "download" | "dl" | "d" => Ok(Command::Download),
            "charts" => Ok(Command::Charts),
            "history" | "hist" => Ok(Command::History),
            "clear" | "cls" => Ok(Command::Clear),
            "help" | "h" | "?" => Ok(Command::Help),
            "exit" | "quit" | "q" => Ok(Command::Exit),
            other => Err(ReportError::Command(format!("Unknown command: {other}"))),
        }
    }

    /// Get help text for all commands
    pub fn help_text() -> &'static str {
        r"
Due Diligence Console Commands
==============================

Report Commands:
  /generate <company> [start] [end]  Generate the initial report
                                     (dates as YYYY-MM-DD, end defaults to today,
                                     start to one year before end)
  /comprehensive                     Extend the report with a comprehensive
                                     due diligence and a pass/fail conclusion
  /show                              Print the report narrative
  /download                          Print the path of the latest document
  /charts                            List saved charts

Chat Commands:
  /ask <question>                    Ask about the current report
  /history                           Show questions and answers so far

Other Commands:
  /clear                             Delete charts and start over
  /help                              Show help
  /exit                              Exit

Command Aliases:
  /g = /generate      /c = /comprehensive   /a = /ask
  /s = /show          /d = /download        /q = /exit

Once a report exists, plain text is sent as a question:
  - Did the company pass due diligence?
  - What are the main risks?
"
    }

    /// Get a short description of the command
    pub fn description(&self) -> &'static str {
        match self {
            Command::Generate { .. } => "Generate report",
            Command::Comprehensive => "Comprehensive due diligence",
            Command::Ask { .. } => "Ask about the report",
            Command::Show => "Show report",
            Command::Download => "Document path",
            Command::Charts => "List charts",
            Command::History => "Chat history",
            Command::Clear => "Clear report",
            Command::Help => "Show help",
            Command::Exit => "Exit the console",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_parse_generate_with_dates() {
        let cmd = Command::parse("/generate MSFT 2024-06-01 2024-06-10").unwrap();
        assert_eq!(
            cmd,
            Command::Generate {
                company: "MSFT".to_string(),
                start: Some(date("2024-06-01")),
                end: Some(date("2024-06-10")),
            }
        );
    }

    #[test]
    fn test_parse_generate_multi_word_company() {
        let cmd = Command::parse("/g Zzyzx Corp 2024-06-01").unwrap();
        assert_eq!(
            cmd,
            Command::Generate {
                company: "Zzyzx Corp".to_string(),
                start: Some(date("2024-06-01")),
                end: None,
            }
        );

        let cmd = Command::parse("/gen Berkshire Hathaway").unwrap();
        assert_eq!(
            cmd,
            Command::Generate {
                company: "Berkshire Hathaway".to_string(),
                start: None,
                end: None,
            }
        );
    }

    #[test]
    fn test_parse_generate_requires_company() {
        assert!(Command::parse("/generate").is_err());
        assert!(Command::parse("/generate 2024-06-01 2024-06-10").is_err());
    }

    #[test]
    fn test_parse_plain_text_is_question() {
        let cmd = Command::parse("  Did it pass? ").unwrap();
        assert_eq!(
            cmd,
            Command::Ask {
                question: "Did it pass?".to_string()
            }
        );

        let cmd = Command::parse("/a What about debt?").unwrap();
        assert_eq!(
            cmd,
            Command::Ask {
                question: "What about debt?".to_string()
            }
        );
        assert!(Command::parse("/ask").is_err());
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(Command::parse("/comprehensive").unwrap(), Command::Comprehensive);
        assert_eq!(Command::parse("/C").unwrap(), Command::Comprehensive);
        assert_eq!(Command::parse("/show").unwrap(), Command::Show);
        assert_eq!(Command::parse("/dl").unwrap(), Command::Download);
        assert_eq!(Command::parse("/charts").unwrap(), Command::Charts);
        assert_eq!(Command::parse("/hist").unwrap(), Command::History);
        assert_eq!(Command::parse("/cls").unwrap(), Command::Clear);
        assert_eq!(Command::parse("/?").unwrap(), Command::Help);
        assert_eq!(Command::parse("/quit").unwrap(), Command::Exit);
    }

    #[test]
    fn test_parse_errors() {
        assert!(Command::parse("").is_err());
        assert!(Command::parse("/").is_err());
        assert!(matches!(
            Command::parse("/unknown"),
            Err(ReportError::Command(msg)) if msg == "Unknown command: unknown"
        ));
    }

    #[test]
    fn test_help_text_lists_commands() {
        let help = Command::help_text();
        assert!(help.contains("/generate"));
        assert!(help.contains("/comprehensive"));
        assert!(help.contains("/clear"));
        assert_eq!(Command::Clear.description(), "Clear report");
    }
}
