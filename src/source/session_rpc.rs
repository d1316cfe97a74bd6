use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{json, Value};
use tracing::warn;

use crate::config::SourceConfig;
use crate::source::http::post_json;
use crate::source::ScheduleSource;
use crate::timetable::{ElementTable, RawPayload, SourceVariant};

/// The classic JSON-RPC session API: authenticate for a session cookie,
/// request the timetable for the logged-in student, log out again. Period
/// records embed subject/teacher/room sub-records inline, so no element
/// table is needed.
pub struct SessionRpcSource {
    endpoint: String,
    username: String,
    password: String,
}

impl SessionRpcSource {
    pub fn from_config(config: &SourceConfig) -> Result<Self> {
        if config.server.trim().is_empty() || config.school.trim().is_empty() {
            return Err(anyhow!("session_rpc source requires server and school"));
        }
        if config.username.trim().is_empty() {
            return Err(anyhow!("session_rpc source requires username and password"));
        }
        Ok(Self {
            endpoint: format!(
                "https://{}/WebUntis/jsonrpc.do?school={}",
                config.server.trim(),
                config.school.trim()
            ),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    async fn call(
        &self,
        method: &str,
        params: Value,
        session_cookie: Option<&str>,
    ) -> Result<Value> {
        let body = json!({
            "id": "untis-watcher",
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
        });
        let response = post_json(&self.endpoint, &body, session_cookie)
            .await
            .with_context(|| format!("rpc call failed: {method}"))?;
        if let Some(error) = response.get("error") {
            return Err(anyhow!("rpc {method} returned an error: {error}"));
        }
        response
            .get("result")
            .cloned()
            .ok_or_else(|| anyhow!("rpc {method} returned no result"))
    }
}

struct Session {
    cookie: String,
    person_id: i64,
    person_type: i64,
}

#[async_trait]
impl ScheduleSource for SessionRpcSource {
    fn variant(&self) -> SourceVariant {
        SourceVariant::SessionRpc
    }

    fn name(&self) -> &str {
        "session-rpc"
    }

    async fn fetch_window(&self, start: NaiveDate, end: NaiveDate) -> Result<RawPayload> {
        let login = self
            .call(
                "authenticate",
                json!({
                    "user": self.username,
                    "password": self.password,
                    "client": "untis-watcher",
                }),
                None,
            )
            .await?;
        let session_id = login
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("authenticate response carried no session id"))?;
        let session = Session {
            cookie: format!("JSESSIONID={session_id}"),
            person_id: login.get("personId").and_then(Value::as_i64).unwrap_or(0),
            person_type: login.get("personType").and_then(Value::as_i64).unwrap_or(5),
        };

        let result = self.fetch_timetable(&session, start, end).await;

        // Always log out, even when the timetable request failed.
        if let Err(err) = self.call("logout", json!({}), Some(&session.cookie)).await {
            warn!(%err, "rpc logout failed");
        }

        result
    }
}

impl SessionRpcSource {
    async fn fetch_timetable(
        &self,
        session: &Session,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RawPayload> {
        let result = self
            .call(
                "getTimetable",
                json!({
                    "id": session.person_id,
                    "type": session.person_type,
                    "startDate": start.format("%Y%m%d").to_string().parse::<i64>()?,
                    "endDate": end.format("%Y%m%d").to_string().parse::<i64>()?,
                }),
                Some(&session.cookie),
            )
            .await?;
        let records = result
            .as_array()
            .cloned()
            .ok_or_else(|| anyhow!("getTimetable result is not an array"))?;
        Ok(RawPayload {
            variant: SourceVariant::SessionRpc,
            records,
            elements: ElementTable::default(),
        })
    }
}
