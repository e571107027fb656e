//! The due diligence workflow
//!
//! [`DueDiligence`] sequences resolution, market data, agent sessions and
//! document output. Each handler takes the current [`ReportState`] and returns
//! the next one; on error nothing is committed.

use crate::chat::DocumentChat;
use crate::config::DiligenceConfig;
use crate::document::{comprehensive_path, extract_text, render_pdf, report_file_name};
use crate::error::{ReportError, Result};
use crate::market::{DateRange, MarketData, write_csv};
use crate::narrative::Narrative;
use crate::prompts::Prompts;
use crate::resolver::TickerResolver;
use crate::state::{ChatTurn, Report, ReportState};
use crate::stats::statistics_block;
use diligence_platform::{AgentPlatform, SessionOptions, SessionSpec, run_once};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument, warn};

const REPORT_AGENT_NAME: &str = "due-diligence-agent";
const COMPREHENSIVE_AGENT_NAME: &str = "comprehensive-agent";

/// Input of the initial report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateRequest {
    /// Company name or ticker as typed by the user
    pub company: String,
    pub range: DateRange,
}

impl GenerateRequest {
    pub fn new(company: impl Into<String>, range: DateRange) -> Self {
        Self {
            company: company.into(),
            range,
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Run file and document work off the async workers
async fn blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ReportError::Other(format!("Blocking task failed: {e}")))?
}

/// Due diligence service
pub struct DueDiligence {
    platform: Arc<dyn AgentPlatform>,
    market: Arc<dyn MarketData>,
    prompts: Arc<Prompts>,
    resolver: TickerResolver,
    chat: DocumentChat,
    config: DiligenceConfig,
}

impl DueDiligence {
    pub fn new(
        platform: Arc<dyn AgentPlatform>,
        market: Arc<dyn MarketData>,
        config: DiligenceConfig,
    ) -> Result<Self> {
        config.validate()?;
        let prompts = Arc::new(Prompts::new()?);

        Ok(Self {
            resolver: TickerResolver::new(
                Arc::clone(&platform),
                Arc::clone(&market),
                Arc::clone(&prompts),
                &config,
            ),
            chat: DocumentChat::new(Arc::clone(&platform), Arc::clone(&prompts), &config),
            platform,
            market,
            prompts,
            config,
        })
    }

    pub fn config(&self) -> &DiligenceConfig {
        &self.config
    }

    fn session_options(&self) -> SessionOptions {
        SessionOptions::default()
            .with_poll_interval(self.config.poll_interval)
            .with_charts_dir(self.config.charts_dir())
    }

    async fn render(
        &self,
        path: PathBuf,
        ticker: &str,
        narrative: &Narrative,
        charts: &[PathBuf],
    ) -> Result<String> {
        let title = format!("Due Diligence Report - {ticker}");
        let narrative = narrative.clone();
        let charts = charts.to_vec();

        blocking(move || {
            render_pdf(&path, &title, &narrative, &charts)?;

            // Chat falls back to the narrative when the read-back fails
            Ok(extract_text(&path).unwrap_or_else(|e| {
                warn!("Could not extract text from {}: {e}", path.display());
                narrative.text()
            }))
        })
        .await
    }

    /// Produce the initial report
    ///
    /// Requires an empty state. Fails before any agent session when the ticker
    /// cannot be resolved or the range has no prices.
    #[instrument(skip(self, state), fields(company = %request.company, range = %request.range))]
    pub async fn generate(
        &self,
        state: &ReportState,
        request: &GenerateRequest,
    ) -> Result<ReportState> {
        if !state.is_empty() {
            return Err(ReportError::InvalidState(
                "A report already exists; clear it before generating a new one".to_string(),
            ));
        }

        let ticker = self
            .resolver
            .resolve(&request.company)
            .await
            .ok_or_else(|| ReportError::TickerUnresolved(request.company.trim().to_string()))?;
        let range = request.range;

        let bars = self
            .market
            .daily_history(&ticker, range.start, range.end)
            .await?;
        if bars.is_empty() {
            return Err(ReportError::NoMarketData {
                ticker,
                start: range.start,
                end: range.end,
            });
        }
        let closes: Vec<f64> = bars.iter().map(|bar| bar.close).collect();
        let stats = statistics_block(&ticker, &range, &closes);

        let output_dir = self.config.output_dir.clone();
        let data_file = output_dir.join(format!("{}.csv", range.file_stem(&ticker)));
        let csv_path = data_file.clone();
        blocking(move || {
            std::fs::create_dir_all(&output_dir)?;
            write_csv(&bars, &csv_path)
        })
        .await?;

        let spec = SessionSpec::new(
            REPORT_AGENT_NAME,
            &self.config.model,
            self.prompts.initial_instructions(&file_name(&data_file))?,
        )
        .with_web_search(self.config.bing_connection_name.clone())
        .with_attachment(&data_file);
        let request_text = self.prompts.initial_request(&ticker, &range)?;

        info!("Running initial analysis for {ticker}");
        let output = run_once(
            Arc::clone(&self.platform),
            &spec,
            &request_text,
            &self.session_options(),
        )
        .await?;

        let mut narrative = Narrative::from_lines(stats);
        let agent_text = output.narrative();
        if !agent_text.trim().is_empty() {
            narrative.push_block(&agent_text);
        }
        let charts: Vec<PathBuf> = output.chart.into_iter().collect();

        let document_path = self
            .config
            .output_dir
            .join(report_file_name(&ticker, &range));
        let document_text = self
            .render(document_path.clone(), &ticker, &narrative, &charts)
            .await?;

        info!("Initial report ready: {}", document_path.display());
        Ok(ReportState::with_report(Report {
            ticker,
            range,
            narrative,
            charts,
            initial_document: document_path.clone(),
            document_path,
            data_file,
            document_text,
            comprehensive: None,
        }))
    }

    /// Extend the report with the comprehensive analysis
    ///
    /// Requires a report whose comprehensive phase has not run yet.
    #[instrument(skip(self, state))]
    pub async fn comprehensive(&self, state: &ReportState) -> Result<ReportState> {
        let report = state.report().ok_or_else(|| {
            ReportError::InvalidState("Generate a report before the comprehensive analysis".to_string())
        })?;
        if report.comprehensive_done() {
            return Err(ReportError::InvalidState(
                "Comprehensive due diligence was already done for this report".to_string(),
            ));
        }

        let prior_text = report.narrative.text();
        let spec = SessionSpec::new(
            COMPREHENSIVE_AGENT_NAME,
            &self.config.model,
            self.prompts.comprehensive_instructions(
                &report.ticker,
                &report.range,
                &prior_text,
                &file_name(&report.data_file),
            )?,
        )
        .with_web_search(self.config.bing_connection_name.clone())
        .with_attachment(&report.data_file);
        let request_text = self
            .prompts
            .comprehensive_request(&report.ticker, &report.range)?;

        info!("Running comprehensive analysis for {}", report.ticker);
        let output = run_once(
            Arc::clone(&self.platform),
            &spec,
            &request_text,
            &self.session_options(),
        )
        .await?;

        let comprehensive = output.narrative();
        let mut narrative = report.narrative.clone();
        narrative.push_separator();
        narrative.push_text(&comprehensive);

        let mut charts = report.charts.clone();
        charts.extend(output.chart);

        let document_path = comprehensive_path(&report.document_path);
        let document_text = self
            .render(document_path.clone(), &report.ticker, &narrative, &charts)
            .await?;

        info!("Comprehensive report ready: {}", document_path.display());
        Ok(state.replace_report(Report {
            narrative,
            charts,
            document_path,
            document_text,
            comprehensive: Some(comprehensive),
            ..report.clone()
        }))
    }

    /// Answer a question about the current report
    ///
    /// Agent failures become the answer text; only a missing report or an
    /// empty question is an error.
    #[instrument(skip(self, state))]
    pub async fn ask(&self, state: &ReportState, question: &str) -> Result<ReportState> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ReportError::InvalidState("Question must not be empty".to_string()));
        }
        if state.report().is_none() {
            return Err(ReportError::InvalidState(
                "Chat is available once a report has been generated".to_string(),
            ));
        }

        // Answers come from what the user downloads, not the raw markdown
        let answer = self.chat.answer(state.document_text(), question).await;
        Ok(state.with_turn(ChatTurn {
            question: question.to_string(),
            answer,
        }))
    }
}
