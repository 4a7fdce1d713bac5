use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Body of a 2xx trigger response. `status` is `"error"` when the run failed in-band.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TriggerResponse {
    #[serde(default)]
    pub records_extracted: u64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl TriggerResponse {
    pub fn is_failure(&self) -> bool {
        self.status.as_deref() == Some("error")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProgressSnapshot {
    #[serde(default)]
    pub logs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScraperStatus {
    pub status: String,
    pub last_run: Option<String>,
    pub last_status: Option<String>,
    #[serde(default)]
    pub total_records: u64,
    /// Absent when the scraper never ran.
    #[serde(default)]
    pub last_extraction_count: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScraperLogEntry {
    pub id: i64,
    pub status: String,
    pub records_extracted: u64,
    pub error_message: Option<String>,
    pub run_date: NaiveDate,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Cause {
    pub id: i64,
    pub court_no: Option<String>,
    pub case_no: Option<String>,
    pub petitioner: Option<String>,
    pub respondent: Option<String>,
    pub advocate: Option<String>,
    pub hearing_date: Option<NaiveDate>,
    pub hearing_time: Option<String>,
    pub case_type: Option<String>,
    #[serde(default)]
    pub is_hrce: bool,
    pub inserted_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RelatedCase {
    pub cause: Cause,
    pub similarity_score: f64,
    pub match_reason: String,
}

/// Case lookup filters; unset fields are left out of the query string.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CaseSearch {
    pub query: Option<String>,
    pub case_no: Option<String>,
    pub advocate: Option<String>,
    pub court_no: Option<String>,
    pub hearing_date_from: Option<NaiveDate>,
    pub hearing_date_to: Option<NaiveDate>,
    pub fuzzy: bool,
    pub is_hrce: bool,
    pub limit: Option<u32>,
}

impl CaseSearch {
    pub fn to_query(&self) -> String {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        let text_params = [
            ("query", &self.query),
            ("case_no", &self.case_no),
            ("advocate", &self.advocate),
            ("court_no", &self.court_no),
        ];
        for (key, value) in text_params {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                query.append_pair(key, value);
            }
        }
        if let Some(from) = self.hearing_date_from {
            query.append_pair("hearing_date_from", &from.to_string());
        }
        if let Some(to) = self.hearing_date_to {
            query.append_pair("hearing_date_to", &to.to_string());
        }
        if self.fuzzy {
            query.append_pair("fuzzy", "true");
        }
        if self.is_hrce {
            query.append_pair("is_hrce", "true");
        }
        if let Some(limit) = self.limit {
            query.append_pair("limit", &limit.to_string());
        }
        query.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_search_has_empty_query() {
        assert_eq!(CaseSearch::default().to_query(), "");
    }

    #[test]
    fn only_supplied_filters_are_encoded() {
        let search = CaseSearch {
            query: Some("land acquisition".to_string()),
            advocate: Some(String::new()),
            hearing_date_from: NaiveDate::from_ymd_opt(2024, 5, 1),
            fuzzy: true,
            limit: Some(50),
            ..CaseSearch::default()
        };
        assert_eq!(
            search.to_query(),
            "query=land+acquisition&hearing_date_from=2024-05-01&fuzzy=true&limit=50"
        );
    }

    #[test]
    fn never_run_status_defaults_extraction_count() {
        let status: ScraperStatus = serde_json::from_value(serde_json::json!({
            "status": "never_run",
            "last_run": null,
            "last_status": null,
            "total_records": 0
        }))
        .unwrap();
        assert_eq!(status.last_extraction_count, 0);
    }

    #[test]
    fn in_band_trigger_failure_is_detected() {
        let response: TriggerResponse = serde_json::from_value(serde_json::json!({
            "message": "Scraper failed: timeout",
            "status": "error",
            "records_extracted": 0
        }))
        .unwrap();
        assert!(response.is_failure());
    }
}
