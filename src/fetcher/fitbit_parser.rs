//! Fitbit response parser
//!
//! Stateless parsing functions for converting Fitbit Web API JSON responses
//! into the crate's typed records.

use crate::fetcher::{FetcherError, FetcherResult};
use crate::{ActivityLogEntry, ActivityMetricsDay, WeightEntry};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

/// One page of the activity log list
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityPage {
    /// Activities on this page, in provider order
    pub activities: Vec<ActivityLogEntry>,
    /// Absolute URL of the next page, `None` when this is the last page
    pub next: Option<String>,
}

/// Stateless parser for Fitbit API responses
pub struct FitbitParser;

impl FitbitParser {
    /// Parse one activity log list page
    ///
    /// # Format
    /// `{"activities": [...], "pagination": {"next": "<url>" | ""}}`
    pub fn parse_activity_page(page: Value) -> FetcherResult<ActivityPage> {
        let mut page = page;
        let raw = match page.get_mut("activities").map(Value::take) {
            Some(Value::Array(raw)) => raw,
            Some(Value::Null) | None => {
                return Err(FetcherError::ParseError(
                    "Missing activities array".to_string(),
                ))
            }
            Some(_) => {
                return Err(FetcherError::ParseError(
                    "activities is not an array".to_string(),
                ))
            }
        };

        let activities = raw
            .into_iter()
            .map(|activity| {
                serde_json::from_value::<ActivityLogEntry>(activity)
                    .map_err(|e| FetcherError::ParseError(format!("Invalid activity: {e}")))
            })
            .collect::<FetcherResult<Vec<_>>>()?;

        let next = page
            .get("pagination")
            .and_then(|p| p.get("next"))
            .and_then(Value::as_str)
            .filter(|next| !next.is_empty())
            .map(str::to_string);

        Ok(ActivityPage { activities, next })
    }

    /// Parse a weight log response
    ///
    /// # Format
    /// `{"weight": [{"date": "2023-01-01", "weight": 80.5, "bmi": 24.1, "fat": 20.3}]}`
    pub fn parse_weight_log(body: &Value) -> FetcherResult<Vec<WeightEntry>> {
        let entries = body
            .get("weight")
            .and_then(Value::as_array)
            .ok_or_else(|| FetcherError::ParseError("Missing weight array".to_string()))?;

        let mut weights = Vec::with_capacity(entries.len());
        for entry in entries {
            let date = Self::parse_date(
                entry
                    .get("date")
                    .ok_or_else(|| FetcherError::ParseError("Missing weight date".to_string()))?,
                "date",
            )?;
            let weight = Self::parse_decimal(
                entry
                    .get("weight")
                    .ok_or_else(|| FetcherError::ParseError("Missing weight".to_string()))?,
                "weight",
            )?;
            let bmi = Self::parse_decimal(
                entry
                    .get("bmi")
                    .ok_or_else(|| FetcherError::ParseError("Missing bmi".to_string()))?,
                "bmi",
            )?;
            let fat = match entry.get("fat") {
                Some(value) if !value.is_null() => Some(Self::parse_decimal(value, "fat")?),
                _ => None,
            };

            weights.push(WeightEntry {
                date,
                weight,
                bmi,
                fat,
            });
        }

        Ok(weights)
    }

    /// Parse one activity time series response for `resource`
    ///
    /// # Format
    /// `{"activities-<resource>": [{"dateTime": "2023-01-01", "value": "1234"}]}`
    pub fn parse_timeseries(resource: &str, body: &Value) -> FetcherResult<Vec<(NaiveDate, Decimal)>> {
        let key = format!("activities-{resource}");
        let points = body
            .get(&key)
            .and_then(Value::as_array)
            .ok_or_else(|| FetcherError::ParseError(format!("Missing {key} array")))?;

        points
            .iter()
            .map(|point| {
                let date = Self::parse_date(
                    point
                        .get("dateTime")
                        .ok_or_else(|| FetcherError::ParseError("Missing dateTime".to_string()))?,
                    "dateTime",
                )?;
                let value = Self::parse_decimal(
                    point
                        .get("value")
                        .ok_or_else(|| FetcherError::ParseError("Missing value".to_string()))?,
                    resource,
                )?;
                Ok((date, value))
            })
            .collect()
    }

    /// Merge per-resource series into one record per day, ordered by date
    ///
    /// A day missing from some series gets zero for that resource.
    pub fn merge_activity_metrics(
        series: &HashMap<&str, Vec<(NaiveDate, Decimal)>>,
    ) -> Vec<ActivityMetricsDay> {
        let mut by_date: BTreeMap<NaiveDate, HashMap<&str, Decimal>> = BTreeMap::new();
        for (resource, points) in series {
            for (date, value) in points {
                by_date.entry(*date).or_default().insert(*resource, *value);
            }
        }

        by_date
            .into_iter()
            .map(|(date, values)| {
                let get = |resource: &str| values.get(resource).copied().unwrap_or(Decimal::ZERO);
                ActivityMetricsDay {
                    date,
                    calories: get("calories"),
                    steps: get("steps"),
                    distance: get("distance"),
                    floors: get("floors"),
                    minutes_sedentary: get("minutesSedentary"),
                    minutes_lightly_active: get("minutesLightlyActive"),
                    minutes_fairly_active: get("minutesFairlyActive"),
                    minutes_very_active: get("minutesVeryActive"),
                    activity_calories: get("activityCalories"),
                }
            })
            .collect()
    }

    /// Decimal from a JSON string or number, keeping its textual scale
    fn parse_decimal(value: &Value, field_name: &str) -> FetcherResult<Decimal> {
        let text = match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => {
                return Err(FetcherError::ParseError(format!(
                    "{field_name} is neither a string nor a number"
                )))
            }
        };

        Decimal::from_str(&text)
            .or_else(|_| Decimal::from_scientific(&text))
            .map_err(|e| FetcherError::ParseError(format!("Failed to parse {field_name}: {e}")))
    }

    fn parse_date(value: &Value, field_name: &str) -> FetcherResult<NaiveDate> {
        let s = value
            .as_str()
            .ok_or_else(|| FetcherError::ParseError(format!("{field_name} is not a string")))?;

        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|e| FetcherError::ParseError(format!("Failed to parse {field_name}: {e}")))
    }
}
