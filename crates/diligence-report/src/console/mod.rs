//! Due Diligence Console
//!
//! A line-oriented front end over [`DueDiligence`]. The console owns the
//! single [`ReportState`] of the session and swaps it only when an action
//! succeeds.
//!
//! # Features
//!
//! - **Command-based interface**: `/generate MSFT 2024-06-01 2024-06-10`
//! - **Chat**: once a report exists, plain text is a question about it
//! - **View**: [`ConsoleView`] tells which actions are currently available
//!
//! # Example
//!
//! ```rust,ignore
//! use diligence_report::console::{DiligenceConsole, ConsoleConfig, Reply};
//!
//! let mut console = DiligenceConsole::new(service, ConsoleConfig::default());
//! match console.process_input("/generate Microsoft").await? {
//!     Reply::Text(text) => println!("{text}"),
//!     Reply::Exit => {}
//! }
//! ```

pub mod commands;

use crate::error::Result;
use crate::market::DateRange;
use crate::state::ReportState;
use crate::workflow::{DueDiligence, GenerateRequest};
use chrono::{Local, NaiveDate, TimeDelta};
use std::fmt::Write as _;
use std::path::PathBuf;

pub use commands::Command;

const CHAT_INACTIVE_HINT: &str =
    "Chat is inactive until a report exists. Use /generate <company> to create one.";

/// Configuration for the console
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    /// Welcome message
    pub welcome_message: String,
    /// Prompt prefix
    pub prompt: String,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            welcome_message: "Due Diligence Console - type /help for commands".to_string(),
            prompt: ">>> ".to_string(),
        }
    }
}

/// Which actions the current state allows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleView {
    pub report_ready: bool,
    pub comprehensive_available: bool,
    /// Chat only accepts questions once a report exists
    pub chat_active: bool,
    /// Latest document, offered for download
    pub download: Option<PathBuf>,
}

impl ConsoleView {
    pub fn of(state: &ReportState) -> Self {
        Self {
            report_ready: state.report().is_some(),
            comprehensive_available: state.report().is_some() && !state.comprehensive_done(),
            chat_active: state.report().is_some(),
            download: state.document_path().map(PathBuf::from),
        }
    }

    /// Commands worth offering right now
    pub fn available_actions(&self) -> Vec<&'static str> {
        let mut actions = Vec::new();
        if self.report_ready {
            if self.comprehensive_available {
                actions.push("/comprehensive");
            }
            actions.extend(["/ask", "/show", "/download", "/charts", "/history"]);
        } else {
            actions.push("/generate");
        }
        actions.extend(["/clear", "/help", "/exit"]);
        actions
    }
}

/// Outcome of one console input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Exit,
}

/// Resolve optional command dates; end defaults to today, start to a year before end
fn default_range(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<DateRange> {
    let end = end.unwrap_or_else(|| Local::now().date_naive());
    let start = start.unwrap_or(end - TimeDelta::days(365));
    DateRange::new(start, end)
}

/// Interactive due diligence console
pub struct DiligenceConsole {
    service: DueDiligence,
    state: ReportState,
    config: ConsoleConfig,
}

impl DiligenceConsole {
    pub fn new(service: DueDiligence, config: ConsoleConfig) -> Self {
        Self {
            service,
            state: ReportState::empty(),
            config,
        }
    }

    /// Get the welcome message
    pub fn welcome(&self) -> &str {
        &self.config.welcome_message
    }

    /// Get the prompt
    pub fn prompt(&self) -> &str {
        &self.config.prompt
    }

    pub fn state(&self) -> &ReportState {
        &self.state
    }

    pub fn view(&self) -> ConsoleView {
        ConsoleView::of(&self.state)
    }

    /// Process user input and return a reply
    pub async fn process_input(&mut self, input: &str) -> Result<Reply> {
        let command = Command::parse(input)?;
        self.execute(command).await
    }

    /// Execute a parsed command
    pub async fn execute(&mut self, command: Command) -> Result<Reply> {
        let text = match command {
            Command::Generate {
                company,
                start,
                end,
            } => {
                let request = GenerateRequest::new(company, default_range(start, end)?);
                self.state = self.service.generate(&self.state, &request).await?;
                self.report_summary("Report generated")
            }
            Command::Comprehensive => {
                self.state = self.service.comprehensive(&self.state).await?;
                self.report_summary("Comprehensive due diligence completed")
            }
            Command::Ask { question } => {
                if !self.view().chat_active {
                    return Ok(Reply::Text(CHAT_INACTIVE_HINT.to_string()));
                }
                self.state = self.service.ask(&self.state, &question).await?;
                self.state
                    .chat()
                    .last()
                    .map(|turn| turn.answer.clone())
                    .unwrap_or_default()
            }
            Command::Show => match self.state.report() {
                Some(_) => self.state.narrative_text(),
                None => "No report yet. Use /generate <company> to create one.".to_string(),
            },
            Command::Download => match self.state.document_path() {
                Some(path) => format!("Document: {}", path.display()),
                None => "No document yet.".to_string(),
            },
            Command::Charts => {
                let charts = self.state.chart_references();
                if charts.is_empty() {
                    "No charts saved.".to_string()
                } else {
                    let mut text = String::from("Charts:");
                    for chart in charts {
                        let _ = write!(text, "\n  {}", chart.display());
                    }
                    text
                }
            }
            Command::History => {
                if self.state.chat().is_empty() {
                    "No questions asked yet.".to_string()
                } else {
                    let mut text = String::new();
                    for (i, turn) in self.state.chat().iter().enumerate() {
                        let _ = write!(text, "Q{}: {}\nA{}: {}\n\n", i + 1, turn.question, i + 1, turn.answer);
                    }
                    text.trim_end().to_string()
                }
            }
            Command::Clear => {
                let removed = self.state.reset();
                format!("Report cleared ({removed} charts removed).")
            }
            Command::Help => Command::help_text().to_string(),
            Command::Exit => return Ok(Reply::Exit),
        };

        Ok(Reply::Text(text))
    }

    fn report_summary(&self, headline: &str) -> String {
        let mut text = format!("{headline}.\n\n{}", self.state.narrative_text());
        if let Some(path) = self.state.document_path() {
            let _ = write!(text, "\n\nDocument: {}", path.display());
        }
        let _ = write!(text, "\nAvailable: {}", self.view().available_actions().join(" "));
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DiligenceConfig;
    use crate::market::{DailyBar, MockMarketData};
    use diligence_platform::ContentSegment;
    use diligence_platform::testing::ScriptedPlatform;
    use std::path::Path;
    use std::sync::Arc;

    fn market() -> MockMarketData {
        let mut market = MockMarketData::new();
        market.expect_latest_close().returning(|_| Ok(Some(110.0)));
        market.expect_daily_history().returning(|_, start, _| {
            Ok([100.0, 105.0, 95.0, 110.0]
                .iter()
                .enumerate()
                .map(|(i, close)| DailyBar::from_close(start + TimeDelta::days(i as i64 + 2), *close))
                .collect())
        });
        market
    }

    fn console(dir: &Path, platform: Arc<ScriptedPlatform>) -> DiligenceConsole {
        let config = DiligenceConfig::builder()
            .output_dir(dir)
            .poll_interval(std::time::Duration::from_millis(1))
            .build()
            .unwrap();
        let service = DueDiligence::new(platform, Arc::new(market()), config).unwrap();
        DiligenceConsole::new(service, ConsoleConfig::default())
    }

    fn text(reply: Reply) -> String {
        match reply {
            Reply::Text(text) => text,
            Reply::Exit => panic!("unexpected exit"),
        }
    }

    #[test]
    fn test_default_range() {
        let end = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        let range = default_range(None, Some(end)).unwrap();
        assert_eq!(range.start, NaiveDate::from_ymd_opt(2023, 6, 11).unwrap());

        let start = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        assert!(default_range(Some(start), Some(end)).is_err());
    }

    #[test]
    fn test_view_of_empty_state() {
        let view = ConsoleView::of(&ReportState::empty());
        assert!(!view.report_ready);
        assert!(!view.chat_active);
        assert!(view.download.is_none());
        assert_eq!(view.available_actions(), vec!["/generate", "/clear", "/help", "/exit"]);
    }

    #[tokio::test]
    async fn test_chat_inactive_without_report() {
        let dir = tempfile::tempdir().unwrap();
        let platform = Arc::new(ScriptedPlatform::new().reply_text("should not be used"));
        let mut console = console(dir.path(), platform.clone());

        let reply = text(console.process_input("Did it pass?").await.unwrap());

        assert_eq!(reply, CHAT_INACTIVE_HINT);
        assert!(console.state().chat().is_empty());
        assert!(platform.created_agents().is_empty());
    }

    #[tokio::test]
    async fn test_session_flow() {
        let dir = tempfile::tempdir().unwrap();
        let platform = Arc::new(
            ScriptedPlatform::new()
                .with_assistant_message(vec![
                    ContentSegment::text("## Overview\nSteady quarter."),
                    ContentSegment::image("chart-a"),
                ])
                .reply_text("Margins held.")
                .with_assistant_message(vec![
                    ContentSegment::text("**Conclusion:** Due diligence passed."),
                    ContentSegment::image("chart-b"),
                ]),
        );
        let mut console = console(dir.path(), platform.clone());

        let reply = text(
            console
                .process_input("/generate MSFT 2024-06-01 2024-06-10")
                .await
                .unwrap(),
        );
        assert!(reply.starts_with("Report generated.\n\n**Ticker:** MSFT"));
        assert!(reply.contains("MSFT_2024-06-01_to_2024-06-10_analysis.pdf"));
        assert!(console.view().chat_active);
        assert!(console.view().comprehensive_available);

        let answer = text(console.process_input("How were margins?").await.unwrap());
        assert_eq!(answer, "Margins held.");

        let reply = text(console.process_input("/comprehensive").await.unwrap());
        assert!(reply.contains("Due diligence passed."));
        assert!(!console.view().comprehensive_available);
        assert!(!console.view().available_actions().contains(&"/comprehensive"));

        let download = text(console.process_input("/download").await.unwrap());
        assert!(download.contains("comprehensive_MSFT_2024-06-01_to_2024-06-10_analysis.pdf"));

        let history = text(console.process_input("/history").await.unwrap());
        assert_eq!(history, "Q1: How were margins?\nA1: Margins held.");

        let charts = console.state().chart_references().to_vec();
        assert_eq!(charts.len(), 2);
        let listing = text(console.process_input("/charts").await.unwrap());
        assert!(listing.contains("chart-a_image_file.png"));

        let cleared = text(console.process_input("/clear").await.unwrap());
        assert_eq!(cleared, "Report cleared (2 charts removed).");
        assert!(charts.iter().all(|c| !c.exists()));
        assert!(console.state().is_empty());
        assert!(!console.view().chat_active);
        assert!(platform.all_released());
    }

    #[tokio::test]
    async fn test_generate_twice_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let platform = Arc::new(ScriptedPlatform::new().reply_text("Fine."));
        let mut console = console(dir.path(), platform);

        console
            .process_input("/g MSFT 2024-06-01 2024-06-10")
            .await
            .unwrap();
        let before = console.state().clone();

        assert!(console.process_input("/g AAPL 2024-06-01 2024-06-10").await.is_err());
        assert_eq!(console.state(), &before);
    }

    #[tokio::test]
    async fn test_exit_and_help() {
        let dir = tempfile::tempdir().unwrap();
        let mut console = console(dir.path(), Arc::new(ScriptedPlatform::new()));

        assert_eq!(console.process_input("/exit").await.unwrap(), Reply::Exit);
        assert!(text(console.process_input("/help").await.unwrap()).contains("/generate"));
        assert_eq!(
            text(console.process_input("/show").await.unwrap()),
            "No report yet. Use /generate <company> to create one."
        );
    }
}
