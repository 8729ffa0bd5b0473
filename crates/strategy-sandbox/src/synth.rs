//! Program synthesis: context literals, helper library and caller code
//! assembled into one self-contained Python program.
//!
//! Synthesis is pure. The same request and snapshot always produce the same
//! bytes, which the SHA-256 digest makes cheap to check and log.

use std::collections::BTreeMap;

use serde::Serialize;
use sha2::{Digest, Sha256};
use strategy_context::TrackedEntity;

use crate::embed::embed;
use crate::error::{SandboxError, SandboxResult};
use crate::request::{ExecutionRequest, SAMPLE_DATASET};
use crate::snapshot::ContextSnapshot;

const HELPERS: &str = include_str!("synth/helpers.py");

const IMPORTS: &str = "\
import json
import math
import statistics
import traceback
from datetime import datetime, timedelta

try:
    import pandas as pd
except ImportError:
    pd = None
try:
    import numpy as np
except ImportError:
    np = None
";

const PLOT_IMPORT: &str = "\
try:
    import plotly.express as px
except ImportError:
    px = None
";

const DERIVED_BINDINGS: &str = "\
account = portfolio.get(\"account\", {})
positions = portfolio.get(\"positions\", [])
";

const DATAFRAME_BINDING: &str = "\
df = pd.DataFrame(dataset_rows) if pd is not None else dataset_rows
";

const BANNER: &str = "\
print(\"=== Trading Strategy Execution Context ===\")
if portfolio:
    if account:
        print(\"Account Value: $\" + str(account.get(\"portfolio_value\", 0)))
        print(\"Buying Power: $\" + str(account.get(\"buying_power\", 0)))
    print(\"Positions: \" + str(len(positions)))
else:
    print(\"No portfolio context available\")
if market_data:
    print(\"Market Data: \" + str(len(market_data)) + \" symbols loaded\")
    for _symbol in market_data:
        print(\"  - \" + str(_symbol))
";

const DATASET_BANNER: &str = "\
print(\"Dataset: \" + dataset_name + \" (\" + str(len(dataset_rows)) + \" rows)\")
";

const BANNER_END: &str = "\
print(\"=\" * 45)
print()
";

const EXCEPTION_BOUNDARY: &str = "\
except Exception as e:
    print(\"ERROR: \" + type(e).__name__ + \": \" + str(e))
    print(\"Traceback:\")
    print(traceback.format_exc())
";

const BASE_REQUIREMENTS: [&str; 2] = ["pandas", "numpy"];
const PLOT_REQUIREMENT: &str = "plotly";

/// A program ready to hand to the process runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedProgram {
    source: String,
    requirements: Vec<String>,
    digest: String,
}

impl SynthesizedProgram {
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Third-party libraries the program imports opportunistically.
    pub fn requirements(&self) -> &[String] {
        &self.requirements
    }

    /// Lowercase hex SHA-256 of the source text.
    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn len(&self) -> usize {
        self.source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }
}

/// One `sample_market_data` row.
#[derive(Serialize)]
struct DatasetRow<'a> {
    symbol: &'a str,
    suggested_role: &'static str,
    characteristics: String,
}

fn sample_market_rows(entities: &BTreeMap<String, TrackedEntity>) -> Vec<DatasetRow<'_>> {
    entities
        .iter()
        .map(|(symbol, entity)| DatasetRow {
            symbol,
            suggested_role: entity.role.as_str(),
            characteristics: serde_json::Value::Object(entity.characteristics.clone()).to_string(),
        })
        .collect()
}

fn bind<T: ?Sized + Serialize>(out: &mut String, name: &str, value: &T) -> SandboxResult<()> {
    out.push_str(name);
    out.push_str(" = ");
    out.push_str(&embed(value)?);
    out.push('\n');
    Ok(())
}

fn push_user_code(out: &mut String, code: &str) {
    let normalized = code.replace("\r\n", "\n").replace('\r', "\n");
    out.push_str("try:\n");
    for line in normalized.split('\n') {
        if !line.is_empty() {
            out.push_str("    ");
            out.push_str(line);
        }
        out.push('\n');
    }
    out.push_str("    pass\n");
}

/// Build the program for `request` over `snapshot`.
///
/// Fails only when a context value cannot be written as a literal or the
/// request names a dataset other than `sample_market_data`.
pub fn synthesize(
    request: &ExecutionRequest,
    snapshot: &ContextSnapshot,
) -> SandboxResult<SynthesizedProgram> {
    let dataset = match request.dataset() {
        None => None,
        Some(SAMPLE_DATASET) => Some(sample_market_rows(&snapshot.tracked_entities)),
        Some(other) => {
            return Err(SandboxError::UnknownDataset {
                name: other.to_string(),
            })
        }
    };

    let mut source = String::with_capacity(HELPERS.len() + 4096);
    source.push_str(IMPORTS);
    if dataset.is_some() {
        source.push_str(PLOT_IMPORT);
    }
    source.push('\n');

    bind(&mut source, "portfolio", &snapshot.portfolio_view())?;
    bind(&mut source, "market_data", &snapshot.market_data)?;
    bind(&mut source, "tracked_entities", &snapshot.tracked_entities)?;
    bind(&mut source, "params", &snapshot.params)?;
    source.push_str(DERIVED_BINDINGS);
    if let Some(rows) = &dataset {
        bind(&mut source, "dataset_name", SAMPLE_DATASET)?;
        bind(&mut source, "dataset_rows", rows)?;
        source.push_str(DATAFRAME_BINDING);
    }
    source.push_str("\n\n");

    source.push_str(HELPERS);
    source.push_str("\n\n");

    source.push_str(BANNER);
    if dataset.is_some() {
        source.push_str(DATASET_BANNER);
    }
    source.push_str(BANNER_END);
    source.push('\n');

    push_user_code(&mut source, &request.effective_source());
    source.push_str(EXCEPTION_BOUNDARY);

    let mut requirements: Vec<String> = BASE_REQUIREMENTS.iter().map(|r| r.to_string()).collect();
    if dataset.is_some() {
        requirements.push(PLOT_REQUIREMENT.to_string());
    }

    let digest = hex::encode(Sha256::digest(source.as_bytes()));
    Ok(SynthesizedProgram {
        source,
        requirements,
        digest,
    })
}
