//! Execution requests and the strategy presets built on top of them.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The one dataset analytics requests may name.
pub const SAMPLE_DATASET: &str = "sample_market_data";

/// Benchmarks used by [`ExecutionRequest::risk_analysis`] when none are given.
pub const DEFAULT_RISK_BENCHMARKS: &str = "SPY,QQQ,IWM";

/// Split a comma-separated symbol list: trimmed, upper-cased, empty entries
/// dropped, duplicates removed keeping first occurrence.
pub fn parse_symbols(csv: &str) -> Vec<String> {
    normalize_symbols(csv.split(','))
}

fn normalize_symbols<I, S>(symbols: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for raw in symbols {
        let symbol = raw.as_ref().trim().to_ascii_uppercase();
        if !symbol.is_empty() && !out.contains(&symbol) {
            out.push(symbol);
        }
    }
    out
}

/// Canned preambles prepended to caller code.
///
/// Preset values travel through `params`; the preamble only reads them
/// back, so nothing caller-controlled is spliced into source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyPreset {
    PortfolioOptimization,
    RiskAnalysis,
}

impl StrategyPreset {
    pub fn prelude(&self) -> &'static str {
        match self {
            Self::PortfolioOptimization => concat!(
                "# Portfolio optimization context\n",
                "risk_tolerance = params[\"risk_tolerance\"]\n",
                "optimization_mode = params[\"optimization_mode\"]\n",
                "\n",
                "print(\"=== Portfolio Optimization Strategy ===\")\n",
                "print(\"Risk Tolerance: \" + str(risk_tolerance))\n",
            ),
            Self::RiskAnalysis => concat!(
                "# Risk analysis context\n",
                "market_benchmarks = params[\"market_benchmarks\"]\n",
                "\n",
                "print(\"=== Risk Analysis Strategy ===\")\n",
                "print(\"Benchmarks: \" + str(market_benchmarks))\n",
            ),
        }
    }
}

/// A single script invocation. Built once, then only read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    source_code: String,
    symbols: Vec<String>,
    include_portfolio: bool,
    #[serde(default)]
    params: Map<String, Value>,
    #[serde(default)]
    dataset: Option<String>,
    #[serde(default)]
    timeout: Option<Duration>,
    #[serde(default)]
    preset: Option<StrategyPreset>,
}

impl ExecutionRequest {
    /// Plain strategy run: no market symbols, no portfolio context.
    pub fn new(source_code: impl Into<String>) -> Self {
        Self {
            source_code: source_code.into(),
            symbols: Vec::new(),
            include_portfolio: false,
            params: Map::new(),
            dataset: None,
            timeout: None,
            preset: None,
        }
    }

    /// Portfolio-optimization preset: portfolio context on, `risk_tolerance`
    /// and `optimization_mode` exposed through `params`.
    pub fn portfolio_optimization(source_code: impl Into<String>, risk_tolerance: f64) -> Self {
        let mut request = Self::new(source_code).with_portfolio(true);
        request
            .params
            .insert("risk_tolerance".to_string(), Value::from(risk_tolerance));
        request
            .params
            .insert("optimization_mode".to_string(), Value::Bool(true));
        request.preset = Some(StrategyPreset::PortfolioOptimization);
        request
    }

    /// Risk-analysis preset: market data for `benchmarks` (comma separated,
    /// default [`DEFAULT_RISK_BENCHMARKS`]) plus portfolio context.
    pub fn risk_analysis(source_code: impl Into<String>, benchmarks: Option<&str>) -> Self {
        let symbols = parse_symbols(benchmarks.unwrap_or(DEFAULT_RISK_BENCHMARKS));
        let mut request = Self::new(source_code)
            .with_portfolio(true)
            .with_symbols(symbols.iter());
        request.params.insert(
            "market_benchmarks".to_string(),
            Value::Array(symbols.into_iter().map(Value::String).collect()),
        );
        request.preset = Some(StrategyPreset::RiskAnalysis);
        request
    }

    /// Analytics run against a named dataset bound as `df`.
    pub fn analytics(source_code: impl Into<String>, dataset: impl Into<String>) -> Self {
        let mut request = Self::new(source_code);
        request.dataset = Some(dataset.into());
        request
    }

    /// Replace the symbol list from a comma-separated string; `None` or an
    /// empty string clears it.
    pub fn with_symbols_csv(mut self, csv: Option<&str>) -> Self {
        self.symbols = csv.map(parse_symbols).unwrap_or_default();
        self
    }

    pub fn with_symbols<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.symbols = normalize_symbols(symbols);
        self
    }

    pub fn with_portfolio(mut self, include: bool) -> Self {
        self.include_portfolio = include;
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Per-call wall-clock budget overriding the engine default. A zero
    /// budget is rejected by the engine as a configuration error.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn source_code(&self) -> &str {
        &self.source_code
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn include_portfolio(&self) -> bool {
        self.include_portfolio
    }

    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    pub fn dataset(&self) -> Option<&str> {
        self.dataset.as_deref()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn preset(&self) -> Option<StrategyPreset> {
        self.preset
    }

    /// Caller code with any preset preamble in front of it.
    pub fn effective_source(&self) -> String {
        match self.preset {
            Some(preset) => format!("{}\n{}", preset.prelude(), self.source_code),
            None => self.source_code.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_symbols_normalizes_and_dedupes() {
        assert_eq!(
            parse_symbols(" aapl, MSFT ,,aapl, tsla "),
            vec!["AAPL", "MSFT", "TSLA"]
        );
        assert!(parse_symbols("").is_empty());
        assert!(parse_symbols(" , ,").is_empty());
    }

    #[test]
    fn test_with_symbols_csv_none_clears() {
        let request = ExecutionRequest::new("print(1)")
            .with_symbols_csv(Some("spy"))
            .with_symbols_csv(None);
        assert!(request.symbols().is_empty());
    }

    #[test]
    fn test_defaults() {
        let request = ExecutionRequest::new("print(1)");
        assert_eq!(request.source_code(), "print(1)");
        assert!(!request.include_portfolio());
        assert!(request.params().is_empty());
        assert!(request.dataset().is_none());
        assert!(request.timeout().is_none());
        assert_eq!(request.effective_source(), "print(1)");
    }

    #[test]
    fn test_portfolio_optimization_preset() {
        let request = ExecutionRequest::portfolio_optimization("print(risk_tolerance)", 0.25);
        assert!(request.include_portfolio());
        assert_eq!(request.params()["risk_tolerance"], json!(0.25));
        assert_eq!(request.params()["optimization_mode"], json!(true));
        let source = request.effective_source();
        assert!(source.starts_with("# Portfolio optimization context"));
        assert!(source.ends_with("print(risk_tolerance)"));
    }

    #[test]
    fn test_risk_analysis_preset_defaults_benchmarks() {
        let request = ExecutionRequest::risk_analysis("pass", None);
        assert_eq!(request.symbols(), ["SPY", "QQQ", "IWM"]);
        assert_eq!(
            request.params()["market_benchmarks"],
            json!(["SPY", "QQQ", "IWM"])
        );
        assert!(request.include_portfolio());
        assert_eq!(request.preset(), Some(StrategyPreset::RiskAnalysis));
    }

    #[test]
    fn test_risk_analysis_benchmarks_never_reach_source() {
        let request = ExecutionRequest::risk_analysis("pass", Some("spy\"); import os; (\""));
        assert!(!request.effective_source().contains("IMPORT OS"));
        assert_eq!(
            request.effective_source(),
            format!("{}\npass", StrategyPreset::RiskAnalysis.prelude())
        );
    }

    #[test]
    fn test_analytics_request() {
        let request = ExecutionRequest::analytics("print(df)", SAMPLE_DATASET)
            .with_timeout(Duration::from_secs(5));
        assert_eq!(request.dataset(), Some(SAMPLE_DATASET));
        assert_eq!(request.timeout(), Some(Duration::from_secs(5)));
    }
}
