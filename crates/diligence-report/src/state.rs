//! Report state carried across user actions
//!
//! A [`ReportState`] is either empty or holds exactly one [`Report`]. Workflow
//! handlers never mutate a state in place; they return a new one, so a failed
//! action leaves the previous state untouched.

use crate::market::DateRange;
use crate::narrative::Narrative;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// One question and its answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub question: String,
    pub answer: String,
}

/// A generated report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub ticker: String,
    pub range: DateRange,
    /// Statistics block, agent narrative and, once done, the comprehensive part
    pub narrative: Narrative,
    /// Saved chart images, in collection order
    pub charts: Vec<PathBuf>,
    /// Document of the initial phase
    pub initial_document: PathBuf,
    /// Most recently produced document
    pub document_path: PathBuf,
    /// Exported price series bound to code execution
    pub data_file: PathBuf,
    /// Plain text extracted from `document_path`
    pub document_text: String,
    /// Narrative of the comprehensive phase, once it ran
    pub comprehensive: Option<String>,
}

impl Report {
    pub fn comprehensive_done(&self) -> bool {
        self.comprehensive.is_some()
    }
}

/// Everything the front end keeps between actions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportState {
    report: Option<Report>,
    chat: Vec<ChatTurn>,
}

impl ReportState {
    /// The state at session start
    pub fn empty() -> Self {
        Self::default()
    }

    /// State holding a freshly generated report and no chat
    pub fn with_report(report: Report) -> Self {
        Self {
            report: Some(report),
            chat: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.report.is_none() && self.chat.is_empty()
    }

    pub fn report(&self) -> Option<&Report> {
        self.report.as_ref()
    }

    pub fn chat(&self) -> &[ChatTurn] {
        &self.chat
    }

    pub fn comprehensive_done(&self) -> bool {
        self.report.as_ref().is_some_and(Report::comprehensive_done)
    }

    /// Accumulated narrative text, empty without a report
    pub fn narrative_text(&self) -> String {
        self.report
            .as_ref()
            .map(|r| r.narrative.text())
            .unwrap_or_default()
    }

    /// Text read back from the latest document, empty without a report
    pub fn document_text(&self) -> &str {
        self.report
            .as_ref()
            .map(|r| r.document_text.as_str())
            .unwrap_or_default()
    }

    pub fn chart_references(&self) -> &[PathBuf] {
        self.report
            .as_ref()
            .map(|r| r.charts.as_slice())
            .unwrap_or_default()
    }

    pub fn document_path(&self) -> Option<&Path> {
        self.report.as_ref().map(|r| r.document_path.as_path())
    }

    /// Copy of this state with `report` replacing the current one; chat is kept
    pub fn replace_report(&self, report: Report) -> Self {
        Self {
            report: Some(report),
            chat: self.chat.clone(),
        }
    }

    /// Copy of this state with one more chat turn
    pub fn with_turn(&self, turn: ChatTurn) -> Self {
        let mut next = self.clone();
        next.chat.push(turn);
        next
    }

    /// Delete every chart file of the report and empty the state
    ///
    /// Returns how many chart files were removed. Documents and data exports
    /// stay on disk.
    pub fn reset(&mut self) -> usize {
        let mut removed = 0;
        for chart in self.chart_references() {
            if !chart.exists() {
                continue;
            }
            match std::fs::remove_file(chart) {
                Ok(()) => removed += 1,
                Err(e) => warn!("Could not remove chart {}: {e}", chart.display()),
            }
        }

        *self = Self::empty();
        info!("Report state cleared ({removed} charts removed)");
        removed
    }
}
