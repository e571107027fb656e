//! Agent instructions and user messages
//!
//! Every text sent to an agent is a minijinja template registered once in
//! [`Prompts`]. Embedded content (prior analysis, document text) is passed as
//! a variable and never interpreted as template syntax.

use crate::error::Result;
use crate::market::DateRange;
use minijinja::{Environment, context};

/// Sentinel the resolver agent answers with when it knows no ticker
pub const NO_TICKER: &str = "NOTICKER";

const RESOLVER_INSTRUCTIONS: &str = "\
You are a financial assistant. Given a company name, respond ONLY with the official US stock ticker symbol from NYSE or NASDAQ. \
If the company name is Microsoft, respond with MSFT. \
If the company name is Apple, respond with AAPL. \
Don't include any other information. \
If you cannot find a ticker, respond with '{{ sentinel }}'.";

const RESOLVER_QUESTION: &str = "What is the official US stock ticker for {{ query }}?";

const INITIAL_INSTRUCTIONS: &str = "\
You are a due diligence analyst preparing an initial report on a listed company. \
Summarize recent price performance, notable news and the main risks, using markdown headings. \
Use the code interpreter to draw a line chart of the closing prices. \
Use file {{ data_file }} to get more data. \
Do market research and use the uploaded file to compulsorily provide due diligence report.";

const INITIAL_REQUEST: &str =
    "Could you please create chart of the stock mentioned {{ ticker }} from {{ start }} to {{ end }}?";

const COMPREHENSIVE_INSTRUCTIONS: &str = "\
You are a senior financial analyst. \
Perform a comprehensive due diligence for the company, including broad market conditions, cashflows, debt, and liquidity. \
Use Bing and all available market information. \
If information is not available, say so. \
Conclude if due diligence is passed or failed, and explain why. \
Summarize findings in markdown and tabular format. \
Include any charts or tables as needed. \
Company: {{ ticker }}
Period: {{ start }} to {{ end }}
Here is the previous analysis for context:
{{ prior_analysis }}
Use the uploaded file {{ data_file }} for financial data. \
Mandatorily, conclude if due diligence is passed or failed.";

const COMPREHENSIVE_REQUEST: &str =
    "Do a comprehensive due diligence for {{ ticker }} from {{ start }} to {{ end }}.";

const CHAT_INSTRUCTIONS: &str = "\
You are an expert assistant that answers questions based on the provided PDF content. \
Use the context from the PDF to provide a precise answer.
Here is the PDF content:
{{ document }}

Question: {{ question }}";

/// Registered prompt templates
pub struct Prompts {
    env: Environment<'static>,
}

impl Prompts {
    /// Register all templates
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.add_template("resolver.instructions", RESOLVER_INSTRUCTIONS)?;
        env.add_template("resolver.question", RESOLVER_QUESTION)?;
        env.add_template("initial.instructions", INITIAL_INSTRUCTIONS)?;
        env.add_template("initial.request", INITIAL_REQUEST)?;
        env.add_template("comprehensive.instructions", COMPREHENSIVE_INSTRUCTIONS)?;
        env.add_template("comprehensive.request", COMPREHENSIVE_REQUEST)?;
        env.add_template("chat.instructions", CHAT_INSTRUCTIONS)?;
        Ok(Self { env })
    }

    fn render(&self, name: &str, ctx: minijinja::Value) -> Result<String> {
        Ok(self.env.get_template(name)?.render(ctx)?)
    }

    pub fn resolver_instructions(&self) -> Result<String> {
        self.render("resolver.instructions", context! { sentinel => NO_TICKER })
    }

    pub fn resolver_question(&self, query: &str) -> Result<String> {
        self.render("resolver.question", context! { query })
    }

    pub fn initial_instructions(&self, data_file: &str) -> Result<String> {
        self.render("initial.instructions", context! { data_file })
    }

    pub fn initial_request(&self, ticker: &str, range: &DateRange) -> Result<String> {
        self.render(
            "initial.request",
            context! { ticker, start => range.start.to_string(), end => range.end.to_string() },
        )
    }

    pub fn comprehensive_instructions(
        &self,
        ticker: &str,
        range: &DateRange,
        prior_analysis: &str,
        data_file: &str,
    ) -> Result<String> {
        self.render(
            "comprehensive.instructions",
            context! {
                ticker,
                start => range.start.to_string(),
                end => range.end.to_string(),
                prior_analysis,
                data_file,
            },
        )
    }

    pub fn comprehensive_request(&self, ticker: &str, range: &DateRange) -> Result<String> {
        self.render(
            "comprehensive.request",
            context! { ticker, start => range.start.to_string(), end => range.end.to_string() },
        )
    }

    /// Instructions that embed the whole report and the question
    pub fn chat_instructions(&self, document: &str, question: &str) -> Result<String> {
        self.render("chat.instructions", context! { document, question })
    }
}
