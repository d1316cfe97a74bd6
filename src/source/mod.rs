pub mod http;
pub mod rest_grid;
pub mod session_rpc;

use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::NaiveDate;

use crate::config::SourceConfig;
use crate::source::rest_grid::RestGridSource;
use crate::source::session_rpc::SessionRpcSource;
use crate::timetable::{RawPayload, SourceVariant};

/// A fetch collaborator: one upstream schedule API variant. The adapter's
/// tolerance contract absorbs the shape differences, so implementations hand
/// back raw records untouched together with whatever lookup table the
/// variant supplies.
#[async_trait]
pub trait ScheduleSource: Send + Sync {
    fn variant(&self) -> SourceVariant;
    fn name(&self) -> &str;
    async fn fetch_window(&self, start: NaiveDate, end: NaiveDate) -> Result<RawPayload>;
}

pub fn build_source(config: &SourceConfig) -> Result<Arc<dyn ScheduleSource>> {
    match config.variant.trim().to_ascii_lowercase().as_str() {
        "session_rpc" | "rpc" => Ok(Arc::new(SessionRpcSource::from_config(config)?)),
        "rest_grid" | "rest" => Ok(Arc::new(RestGridSource::from_config(config)?)),
        other => Err(anyhow!("unknown source variant: {other}")),
    }
}
