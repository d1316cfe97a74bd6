use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate};
use serde_json::Value;

use crate::config::SourceConfig;
use crate::source::http::get_json;
use crate::source::ScheduleSource;
use crate::timetable::{ElementTable, RawPayload, SourceVariant};

/// The REST weekly-grid API: one unauthenticated GET per week, returning
/// period records that reference schedule elements by `{type, id}` plus a
/// lookup table of element display names alongside.
pub struct RestGridSource {
    base_url: String,
    element_type: i64,
    element_id: i64,
}

impl RestGridSource {
    pub fn from_config(config: &SourceConfig) -> Result<Self> {
        if config.server.trim().is_empty() || config.school.trim().is_empty() {
            return Err(anyhow!("rest_grid source requires server and school"));
        }
        let element_id = config
            .element_id
            .ok_or_else(|| anyhow!("rest_grid source requires element_id"))?;
        Ok(Self {
            base_url: format!(
                "https://{}/WebUntis/api/public/timetable/weekly/data?school={}",
                config.server.trim(),
                config.school.trim()
            ),
            element_type: config.element_type.unwrap_or(1),
            element_id,
        })
    }

    async fn fetch_week(&self, monday: NaiveDate) -> Result<(Vec<Value>, Vec<Value>)> {
        let url = format!(
            "{}&elementType={}&elementId={}&date={}&formatId=2",
            self.base_url,
            self.element_type,
            self.element_id,
            monday.format("%Y-%m-%d")
        );
        let response = get_json(&url, None).await?;
        let data = response
            .pointer("/data/result/data")
            .ok_or_else(|| anyhow!("weekly grid response missing data.result.data"))?;

        let elements = data
            .get("elements")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        // elementPeriods maps the queried element id to its period array.
        let mut records = Vec::new();
        if let Some(period_map) = data.get("elementPeriods").and_then(Value::as_object) {
            for periods in period_map.values() {
                if let Some(array) = periods.as_array() {
                    records.extend(array.iter().cloned());
                }
            }
        }
        Ok((records, elements))
    }
}

#[async_trait]
impl ScheduleSource for RestGridSource {
    fn variant(&self) -> SourceVariant {
        SourceVariant::RestGrid
    }

    fn name(&self) -> &str {
        "rest-grid"
    }

    async fn fetch_window(&self, start: NaiveDate, end: NaiveDate) -> Result<RawPayload> {
        let mut records = Vec::new();
        let mut element_entries = Vec::new();

        let mut monday = week_start(start);
        while monday <= end {
            let (week_records, week_elements) = self.fetch_week(monday).await?;
            records.extend(week_records);
            element_entries.extend(week_elements);
            monday += Duration::days(7);
        }

        Ok(RawPayload {
            variant: SourceVariant::RestGrid,
            records,
            elements: ElementTable::from_rest_elements(&element_entries),
        })
    }
}

fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

#[cfg(test)]
mod tests {
    use chrono::Weekday;

    use super::*;

    #[test]
    fn week_start_snaps_to_monday() {
        let wednesday = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let monday = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();
        assert_eq!(week_start(wednesday), monday);
        assert_eq!(week_start(monday), monday);
        assert_eq!(week_start(monday).weekday(), Weekday::Mon);
    }
}
