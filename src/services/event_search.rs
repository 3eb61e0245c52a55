//! Event search across Frigate instances.
//!
//! Semantic search fans out to every configured instance in parallel. An
//! instance that fails or has no semantic endpoint simply contributes no
//! results; the merged list is sorted and limited globally.

use super::{join_url, read_json, ImageUpload};
use crate::config::FrigateInstance;
use crate::error::Error;
use anyhow::Result;
use futures::future::join_all;
use log::{error, info, warn};
use reqwest::multipart::Form;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::cmp::Ordering;

pub const DEFAULT_SEMANTIC_LIMIT: usize = 100;
pub const DEFAULT_TEXT_LIMIT: u32 = 20;

/// Form fields the semantic endpoint ignores; they are only logged
pub const UNSUPPORTED_FILTERS: &[&str] = &[
    "zones",
    "stationary",
    "hasSnapshot",
    "type",
    "status",
    "object_id",
    "min_score",
    "include_thumbnails",
    "timezone",
];

/// Ordering applied to the merged result list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    DateAsc,
    DateDesc,
    /// Most similar first (ascending distance)
    ScoreDesc,
    /// Least similar first (descending distance)
    ScoreAsc,
}

impl SortOrder {
    /// Unknown values sort newest first
    pub fn from_param(value: &str) -> Self {
        match value {
            "date_asc" => SortOrder::DateAsc,
            "score_desc" => SortOrder::ScoreDesc,
            "score_asc" => SortOrder::ScoreAsc,
            _ => SortOrder::DateDesc,
        }
    }

    fn compare(&self, a: &FrigateEvent, b: &FrigateEvent) -> Ordering {
        let distance = |e: &FrigateEvent| e.search_distance.unwrap_or(f64::INFINITY);
        match self {
            SortOrder::DateAsc => a.start_time.total_cmp(&b.start_time),
            SortOrder::DateDesc => b.start_time.total_cmp(&a.start_time),
            SortOrder::ScoreDesc => distance(a).total_cmp(&distance(b)),
            SortOrder::ScoreAsc => distance(b).total_cmp(&distance(a)),
        }
    }
}

/// Parameters of a semantic search request
#[derive(Debug, Clone)]
pub struct SemanticSearchParams {
    pub query: Option<String>,
    pub image: Option<ImageUpload>,
    pub limit: usize,
    pub cameras: String,
    pub labels: String,
    pub after: Option<f64>,
    pub before: Option<f64>,
    pub min_confidence: f64,
    pub max_distance: Option<f64>,
    /// Passed upstream verbatim
    pub sort: String,
    /// Names of ignored filters present in the request
    pub unsupported: Vec<String>,
}

impl Default for SemanticSearchParams {
    fn default() -> Self {
        Self {
            query: None,
            image: None,
            limit: DEFAULT_SEMANTIC_LIMIT,
            cameras: "all".to_string(),
            labels: "all".to_string(),
            after: None,
            before: None,
            min_confidence: 0.0,
            max_distance: None,
            sort: "score_desc".to_string(),
            unsupported: Vec::new(),
        }
    }
}

impl SemanticSearchParams {
    /// Exactly one of a text query or a non-empty image
    pub fn validate(&self) -> Result<()> {
        let has_query = self.query.as_deref().map_or(false, |q| !q.is_empty());
        let has_image = self.image.as_ref().map_or(false, |i| !i.is_empty());

        match (has_query, has_image) {
            (false, false) => Err(Error::Validation(
                "Search requires either a \"query\" text field or a non-empty \"image\" file."
                    .to_string(),
            )
            .into()),
            (true, true) => Err(Error::Validation(
                "Search requires EITHER \"query\" text OR an \"image\" file, not both.".to_string(),
            )
            .into()),
            _ => Ok(()),
        }
    }

    fn to_form(&self) -> Result<Form> {
        let mut form = Form::new();

        match (&self.query, &self.image) {
            (Some(query), _) if !query.is_empty() => form = form.text("query", query.clone()),
            (_, Some(image)) => form = form.part("image", image.to_part()?),
            _ => {}
        }

        form = form
            .text("limit", self.limit.to_string())
            .text("cameras", self.cameras.clone())
            .text("labels", self.labels.clone());
        if let Some(after) = self.after {
            form = form.text("after", after.to_string());
        }
        if let Some(before) = self.before {
            form = form.text("before", before.to_string());
        }
        form = form.text("min_confidence", self.min_confidence.to_string());
        if let Some(max_distance) = self.max_distance {
            form = form.text("max_distance", max_distance.to_string());
        }

        Ok(form.text("sort", self.sort.clone()))
    }
}

/// Metadata attached to a semantic hit
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventMetadata {
    #[serde(rename = "box")]
    pub bbox: Option<Vec<f64>>,
    pub region: Option<Vec<f64>>,
    pub score: Option<f64>,
    pub top_score: Option<f64>,
    pub attributes: Option<Vec<Value>>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// One hit as returned by a semantic search endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct EventDetail {
    pub id: String,
    pub camera: String,
    pub label: String,
    pub start_time: f64,
    pub end_time: Option<f64>,
    #[serde(default)]
    pub has_clip: bool,
    #[serde(default)]
    pub has_snapshot: bool,
    pub search_distance: Option<f64>,
    pub search_confidence: Option<f64>,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default, deserialize_with = "lenient_metadata")]
    pub data: Option<EventMetadata>,
}

/// Metadata that fails to parse is treated as missing
fn lenient_metadata<'de, D>(deserializer: D) -> Result<Option<EventMetadata>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Search hit in the event shape the dashboard renders
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FrigateEvent {
    pub id: String,
    pub camera: String,
    pub label: String,
    pub start_time: f64,
    pub end_time: f64,
    pub has_clip: bool,
    pub has_snapshot: bool,
    pub source_instance: String,
    pub search_distance: Option<f64>,
    pub search_confidence: Option<f64>,
    pub zones: Vec<String>,
    pub thumbnail: String,
    pub sub_label: Option<String>,
    pub thumb_path: String,
    pub top_score: Option<f64>,
    pub score: Option<f64>,
    pub search_source: String,
    pub data: Value,
    pub plus_id: Option<String>,
    pub model_hash: String,
    pub detector_type: String,
    pub model_type: String,
    pub retain_indefinitely: bool,
    pub ratio: f64,
    pub stationary: bool,
    pub motionless_count: u32,
    pub position_changes: u32,
    pub current_zones: Vec<String>,
    pub entered_zones: Vec<String>,
    pub false_positive: Option<bool>,
}

impl FrigateEvent {
    pub fn from_detail(detail: EventDetail, source_instance: &str) -> Self {
        let thumbnail = format!("data:image/jpeg;base64,{}", detail.thumbnail);
        let metadata = detail.data.unwrap_or_default();

        Self {
            end_time: detail.end_time.unwrap_or(detail.start_time + 1.0),
            id: detail.id,
            camera: detail.camera,
            label: detail.label,
            start_time: detail.start_time,
            has_clip: detail.has_clip,
            has_snapshot: detail.has_snapshot,
            source_instance: source_instance.to_string(),
            search_distance: detail.search_distance,
            search_confidence: detail.search_confidence,
            zones: Vec::new(),
            thumb_path: thumbnail.clone(),
            thumbnail,
            sub_label: None,
            top_score: metadata.top_score,
            score: metadata.score,
            search_source: "semantic".to_string(),
            data: json!({
                "score": metadata.score.unwrap_or(-1.0),
                "top_score": metadata.top_score.unwrap_or(-1.0),
                "type": metadata.kind.clone().unwrap_or_else(|| "semantic_match".to_string()),
                "box": metadata.bbox,
                "region": metadata.region,
                "attributes": metadata.attributes,
            }),
            plus_id: None,
            model_hash: String::new(),
            detector_type: String::new(),
            model_type: String::new(),
            retain_indefinitely: false,
            ratio: 1.0,
            stationary: false,
            motionless_count: 0,
            position_changes: 0,
            current_zones: Vec::new(),
            entered_zones: Vec::new(),
            false_positive: None,
        }
    }
}

/// Body of a plain text search
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TextSearchRequest {
    #[serde(default)]
    pub query: String,
    pub limit: Option<u32>,
    pub search_type: Option<Vec<String>>,
}

/// Client for the semantic and text event search backends
#[derive(Clone)]
pub struct EventSearchClient {
    client: Client,
    instances: Vec<FrigateInstance>,
    text_search_url: String,
}

impl EventSearchClient {
    pub fn new(client: Client, instances: Vec<FrigateInstance>, text_search_url: &str) -> Self {
        Self {
            client,
            instances,
            text_search_url: text_search_url.to_string(),
        }
    }

    pub fn instances(&self) -> &[FrigateInstance] {
        &self.instances
    }

    /// Query every instance in parallel and merge the hits
    pub async fn semantic_search(&self, params: &SemanticSearchParams) -> Result<Vec<FrigateEvent>> {
        if self.instances.is_empty() {
            error!("No Frigate instances configured");
            return Err(Error::Unavailable(
                "Search service unavailable: No Frigate instances configured.".to_string(),
            )
            .into());
        }

        if !params.unsupported.is_empty() {
            warn!(
                "Ignoring filters not supported by semantic search: {}",
                params.unsupported.join(", ")
            );
        }

        params.validate()?;

        let searches = self
            .instances
            .iter()
            .map(|instance| self.search_instance(instance, params));
        let results = join_all(searches).await;

        let mut events: Vec<FrigateEvent> = results.into_iter().flatten().flatten().collect();
        info!("Fetched {} events from all semantic endpoints", events.len());

        let order = SortOrder::from_param(&params.sort);
        events.sort_by(|a, b| order.compare(a, b));
        events.truncate(params.limit);

        info!("Returning {} events sorted by {:?}", events.len(), order);

        Ok(events)
    }

    /// `None` when the instance is skipped or fails
    async fn search_instance(
        &self,
        instance: &FrigateInstance,
        params: &SemanticSearchParams,
    ) -> Option<Vec<FrigateEvent>> {
        let source = instance.source_label();
        let semantic_url = match instance.semantic_url.as_deref().filter(|u| !u.is_empty()) {
            Some(url) => url,
            None => {
                warn!("Semantic search URL not configured for instance {}, skipping", source);
                return None;
            }
        };

        let target = join_url(semantic_url, "search");
        let form = match params.to_form() {
            Ok(form) => form,
            Err(e) => {
                error!("Failed to build search form for {}: {}", target, e);
                return None;
            }
        };

        let response = match self.client.post(&target).multipart(form).send().await {
            Ok(response) => response,
            Err(e) => {
                error!("Network error fetching from {}: {}", target, e);
                return None;
            }
        };

        match read_json::<Vec<EventDetail>>(response, &target).await {
            Ok(details) => {
                info!("Received {} results from {}", details.len(), target);
                Some(
                    details
                        .into_iter()
                        .map(|detail| FrigateEvent::from_detail(detail, &source))
                        .collect(),
                )
            }
            Err(e) => {
                error!("Error fetching from {}: {}", target, e);
                None
            }
        }
    }

    /// Plain text search; returns the `results` field of the response
    pub async fn text_search(&self, request: &TextSearchRequest) -> Result<Value> {
        let query = request.query.trim();
        if query.is_empty() {
            return Err(Error::Validation("Search query is required".to_string()).into());
        }

        let body = json!({
            "query": request.query,
            "limit": request.limit.filter(|l| *l > 0).unwrap_or(DEFAULT_TEXT_LIMIT),
            "search_type": request
                .search_type
                .clone()
                .unwrap_or_else(|| vec!["image".to_string(), "description".to_string()]),
        });

        let response = self
            .client
            .post(join_url(&self.text_search_url, "search/text"))
            .json(&body)
            .send()
            .await
            .map_err(Error::from)?;

        let mut results: Value = read_json(response, "Search service returned error").await?;
        Ok(results.get_mut("results").map(Value::take).unwrap_or(Value::Null))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn event(id: &str, start_time: f64, distance: Option<f64>) -> FrigateEvent {
        let detail = EventDetail {
            id: id.to_string(),
            camera: "gate_1".to_string(),
            label: "person".to_string(),
            start_time,
            end_time: None,
            has_clip: false,
            has_snapshot: true,
            search_distance: distance,
            search_confidence: None,
            thumbnail: "AAAA".to_string(),
            data: None,
        };
        FrigateEvent::from_detail(detail, "http://frigate-1:5000")
    }

    fn ids(events: &[FrigateEvent]) -> Vec<&str> {
        events.iter().map(|e| e.id.as_str()).collect()
    }

    fn instance(name: &str, semantic_url: Option<String>) -> FrigateInstance {
        FrigateInstance {
            name: Some(name.to_string()),
            url: Some(format!("http://{}:5000", name)),
            semantic_url,
        }
    }

    fn hit(id: &str, start_time: f64, distance: f64) -> Value {
        json!({
            "id": id,
            "camera": "gate_1",
            "label": "person",
            "start_time": start_time,
            "end_time": start_time + 5.0,
            "has_clip": true,
            "has_snapshot": true,
            "search_distance": distance,
            "search_confidence": 80.0,
            "thumbnail": "AAAA",
            "data": {"score": 0.9, "type": "object"}
        })
    }

    #[test]
    fn test_from_detail_defaults() {
        let e = event("e1", 100.0, None);
        assert_eq!(e.end_time, 101.0);
        assert_eq!(e.thumbnail, "data:image/jpeg;base64,AAAA");
        assert_eq!(e.thumb_path, e.thumbnail);
        assert_eq!(e.search_source, "semantic");
        assert_eq!(e.data["score"], -1.0);
        assert_eq!(e.data["top_score"], -1.0);
        assert_eq!(e.data["type"], "semantic_match");
        assert_eq!(e.source_instance, "http://frigate-1:5000");
    }

    #[test]
    fn test_sort_orders() {
        let events = vec![
            event("a", 10.0, Some(0.5)),
            event("b", 30.0, None),
            event("c", 20.0, Some(0.1)),
        ];

        let sorted = |order: SortOrder| {
            let mut list = events.clone();
            list.sort_by(|a, b| order.compare(a, b));
            list
        };

        assert_eq!(ids(&sorted(SortOrder::DateAsc)), vec!["a", "c", "b"]);
        assert_eq!(ids(&sorted(SortOrder::DateDesc)), vec!["b", "c", "a"]);
        assert_eq!(ids(&sorted(SortOrder::ScoreDesc)), vec!["c", "a", "b"]);
        assert_eq!(ids(&sorted(SortOrder::ScoreAsc)), vec!["b", "a", "c"]);
        assert_eq!(SortOrder::from_param("bogus"), SortOrder::DateDesc);
    }

    #[test]
    fn test_validate_requires_exactly_one_input() {
        let mut params = SemanticSearchParams::default();
        assert!(params.validate().is_err());

        params.query = Some("red car".to_string());
        assert!(params.validate().is_ok());

        params.image = Some(ImageUpload {
            file_name: "q.jpg".to_string(),
            content_type: None,
            bytes: vec![1, 2, 3],
        });
        assert!(params.validate().is_err());

        params.query = None;
        assert!(params.validate().is_ok());
    }

    #[tokio::test]
    async fn test_semantic_search_without_instances_is_unavailable() {
        let client = EventSearchClient::new(Client::new(), vec![], "http://unused");
        let params = SemanticSearchParams {
            query: Some("dog".to_string()),
            ..Default::default()
        };

        let err = client.semantic_search(&params).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_semantic_search_merges_and_drops_failures() {
        let first = MockServer::start().await;
        let second = MockServer::start().await;
        let broken = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                hit("a", 100.0, 0.4),
                hit("b", 200.0, 0.1)
            ])))
            .mount(&first)
            .await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([hit("c", 300.0, 0.2)])))
            .mount(&second)
            .await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"detail": "boom"})))
            .mount(&broken)
            .await;

        let instances = vec![
            instance("one", Some(format!("{}/", first.uri()))),
            instance("two", Some(second.uri())),
            instance("three", Some(broken.uri())),
            instance("four", None),
        ];
        let client = EventSearchClient::new(Client::new(), instances, "http://unused");

        let params = SemanticSearchParams {
            query: Some("person in red".to_string()),
            limit: 2,
            ..Default::default()
        };
        let events = client.semantic_search(&params).await.unwrap();

        assert_eq!(ids(&events), vec!["b", "c"]);
        assert_eq!(events[0].source_instance, "http://one:5000");
        assert_eq!(events[1].source_instance, "http://two:5000");
        assert_eq!(events[0].score, Some(0.9));
        assert_eq!(events[0].data["type"], "object");
    }

    #[tokio::test]
    async fn test_text_search_returns_results_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search/text"))
            .and(body_json(json!({
                "query": "blue jersey",
                "limit": 20,
                "search_type": ["image", "description"]
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"results": [{"id": 1}], "took": 3})),
            )
            .mount(&server)
            .await;

        let client = EventSearchClient::new(Client::new(), vec![], &server.uri());
        let request = TextSearchRequest {
            query: "blue jersey".to_string(),
            ..Default::default()
        };

        let results = client.text_search(&request).await.unwrap();
        assert_eq!(results, json!([{"id": 1}]));
    }

    #[tokio::test]
    async fn test_text_search_passes_status_through() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search/text"))
            .respond_with(ResponseTemplate::new(422))
            .mount(&server)
            .await;

        let client = EventSearchClient::new(Client::new(), vec![], &server.uri());
        let request = TextSearchRequest {
            query: "x".to_string(),
            ..Default::default()
        };

        let err = client.text_search(&request).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::UpstreamStatus(422, _))
        ));

        let blank = TextSearchRequest::default();
        assert!(client.text_search(&blank).await.is_err());
    }
}
