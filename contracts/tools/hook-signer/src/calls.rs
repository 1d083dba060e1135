//! JSON batch input.

use std::{fs, path::Path};

use alloy_primitives::{Address, Bytes, U256};
use anyhow::{Context, Result};
use serde::Deserialize;

use hook_account::Call;

/// One entry of the calls file.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallSpec {
    pub target: Address,
    #[serde(default)]
    pub value: U256,
    #[serde(default)]
    pub data: Bytes,
    #[serde(default)]
    pub allow_failure: bool,
}

impl From<CallSpec> for Call {
    fn from(spec: CallSpec) -> Self {
        Call {
            target: spec.target,
            value: spec.value,
            callData: spec.data,
            allowFailure: spec.allow_failure,
        }
    }
}

pub fn parse_calls(json: &str) -> Result<Vec<Call>> {
    let specs: Vec<CallSpec> = serde_json::from_str(json).context("calls must be a JSON array")?;
    Ok(specs.into_iter().map(Call::from).collect())
}

pub fn read_calls(path: &Path) -> Result<Vec<Call>> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read calls file {}", path.display()))?;
    parse_calls(&json)
}
