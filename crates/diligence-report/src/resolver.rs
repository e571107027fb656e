//! Company name to ticker resolution

use crate::cache::TickerCache;
use crate::config::DiligenceConfig;
use crate::market::MarketData;
use crate::prompts::{NO_TICKER, Prompts};
use diligence_platform::{AgentPlatform, SessionOptions, SessionSpec, run_once};
use std::sync::Arc;
use tracing::{debug, info, warn};

const RESOLVER_AGENT_NAME: &str = "ticker-resolver";

/// Extract a ticker from a resolver agent reply
///
/// Keeps the first token, strips surrounding punctuation and maps share-class
/// dots to dashes (`BRK.B` becomes `BRK-B`). The sentinel and empty replies
/// yield `None`.
pub fn parse_ticker_reply(reply: &str) -> Option<String> {
    let token = reply.split_whitespace().next()?.to_uppercase();
    let token = token.trim_matches(|c: char| !c.is_ascii_alphanumeric());

    if token.is_empty() || token == NO_TICKER {
        return None;
    }

    Some(token.replace('.', "-"))
}

/// Resolves free-form company input to a ticker symbol
///
/// Tries the input as a symbol against market data first, then asks a
/// one-shot agent. Never fails: any error along the way means "unresolved".
pub struct TickerResolver {
    platform: Arc<dyn AgentPlatform>,
    market: Arc<dyn MarketData>,
    prompts: Arc<Prompts>,
    cache: TickerCache,
    model: String,
    web_search: Option<String>,
    options: SessionOptions,
}

impl TickerResolver {
    pub fn new(
        platform: Arc<dyn AgentPlatform>,
        market: Arc<dyn MarketData>,
        prompts: Arc<Prompts>,
        config: &DiligenceConfig,
    ) -> Self {
        Self {
            platform,
            market,
            prompts,
            cache: TickerCache::new(config.resolver_cache_ttl),
            model: config.model.clone(),
            web_search: config.bing_connection_name.clone(),
            options: SessionOptions::default().with_poll_interval(config.poll_interval),
        }
    }

    /// Resolve `input`, or `None` when no ticker could be found
    pub async fn resolve(&self, input: &str) -> Option<String> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }

        if let Some(ticker) = self.cache.get(input).await {
            return Some(ticker);
        }

        let ticker = match self.direct_lookup(input).await {
            Some(ticker) => Some(ticker),
            None => self.ask_agent(input).await,
        }?;

        info!("Resolved '{input}' to {ticker}");
        self.cache.insert(input, ticker.clone()).await;
        Some(ticker)
    }

    async fn direct_lookup(&self, input: &str) -> Option<String> {
        match self.market.latest_close(input).await {
            Ok(Some(close)) => {
                debug!("'{input}' is a listed symbol (last close {close:.2})");
                Some(input.to_uppercase())
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Direct lookup of '{input}' failed: {e}");
                None
            }
        }
    }

    async fn ask_agent(&self, input: &str) -> Option<String> {
        let result = async {
            let spec = SessionSpec::new(
                RESOLVER_AGENT_NAME,
                &self.model,
                self.prompts.resolver_instructions()?,
            )
            .with_web_search(self.web_search.clone());
            let question = self.prompts.resolver_question(input)?;

            let output = run_once(Arc::clone(&self.platform), &spec, &question, &self.options)
                .await?;
            Ok::<_, crate::ReportError>(output.first_text().and_then(parse_ticker_reply))
        }
        .await;

        match result {
            Ok(ticker) => ticker,
            Err(e) => {
                warn!("Ticker resolver agent failed for '{input}': {e}");
                None
            }
        }
    }
}
