use serde::Deserialize;

/// Active billing block summary; both fields absent when ccusage is unavailable
#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub struct CcusageData {
    pub block_cost: Option<f64>,
    pub remaining_minutes: Option<u64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct Projection {
    #[serde(default)]
    pub remaining_minutes: f64,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CcusageBlock {
    #[serde(default)]
    pub is_active: bool,
    #[serde(rename = "costUSD", default)]
    pub cost_usd: Option<f64>,
    pub projection: Option<Projection>,
}

/// `ccusage blocks --json` emits an object, older releases a bare array
#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum CcusageBlocks {
    Object { blocks: Vec<CcusageBlock> },
    Array(Vec<CcusageBlock>),
}

impl CcusageBlocks {
    pub fn into_blocks(self) -> Vec<CcusageBlock> {
        match self {
            CcusageBlocks::Object { blocks } => blocks,
            CcusageBlocks::Array(blocks) => blocks,
        }
    }
}
