use super::{join_url, read_json, ImageUpload};
use crate::error::Error;
use anyhow::Result;
use log::debug;
use reqwest::multipart::Form;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Which result type the face search should rank first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchPriority {
    #[default]
    Faces,
    Clusters,
}

impl SearchPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchPriority::Faces => "faces",
            SearchPriority::Clusters => "clusters",
        }
    }
}

impl fmt::Display for SearchPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchPriority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "faces" => Ok(SearchPriority::Faces),
            "clusters" => Ok(SearchPriority::Clusters),
            other => Err(Error::Validation(format!("Unknown search priority: {}", other))),
        }
    }
}

/// Optional filters for a face search
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FaceSearchOptions {
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub camera_ids: Vec<String>,
    pub min_image_quality: Option<f64>,
    pub min_cluster_quality: Option<f64>,
    pub min_cluster_size: Option<u32>,
    pub max_distance: Option<f64>,
}

impl FaceSearchOptions {
    /// Query parameters; camera ids repeat the same key
    fn query_pairs(&self, priority: SearchPriority, limit: u32) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("priority".to_string(), priority.to_string()),
            ("limit".to_string(), limit.to_string()),
        ];

        if let Some(start) = self.start_time.as_ref().filter(|s| !s.is_empty()) {
            pairs.push(("start_time".to_string(), start.clone()));
        }
        if let Some(end) = self.end_time.as_ref().filter(|s| !s.is_empty()) {
            pairs.push(("end_time".to_string(), end.clone()));
        }
        for camera_id in &self.camera_ids {
            pairs.push(("camera_ids".to_string(), camera_id.clone()));
        }
        if let Some(v) = self.min_image_quality {
            pairs.push(("min_image_quality".to_string(), v.to_string()));
        }
        if let Some(v) = self.min_cluster_quality {
            pairs.push(("min_cluster_quality".to_string(), v.to_string()));
        }
        if let Some(v) = self.min_cluster_size {
            pairs.push(("min_cluster_size".to_string(), v.to_string()));
        }
        if let Some(v) = self.max_distance {
            pairs.push(("max_distance".to_string(), v.to_string()));
        }

        pairs
    }
}

/// Client for the face clustering and search service.
///
/// Thumbnail URLs returned by the service are rewritten to the static
/// image routes it serves, so the browser can load them directly.
#[derive(Clone)]
pub struct FaceClient {
    client: Client,
    base_url: String,
}

impl FaceClient {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn clusters(&self) -> Result<Vec<Value>> {
        let response = self
            .client
            .get(join_url(&self.base_url, "clusters"))
            .send()
            .await
            .map_err(Error::from)?;

        let mut clusters: Vec<Value> = read_json(response, "Failed to fetch clusters").await?;
        for cluster in &mut clusters {
            self.rewrite_cluster_thumbnail(cluster);
        }

        Ok(clusters)
    }

    pub async fn cluster_faces(&self, cluster_id: &str) -> Result<Vec<Value>> {
        let response = self
            .client
            .get(join_url(&self.base_url, &format!("clusters/{}/faces", cluster_id)))
            .send()
            .await
            .map_err(Error::from)?;

        let mut faces: Vec<Value> = read_json(response, "Failed to fetch cluster faces").await?;
        for face in &mut faces {
            self.rewrite_face_thumbnail(face);
        }

        Ok(faces)
    }

    /// Upload an image and return `{query_face_found, matches}`
    pub async fn search_by_image(
        &self,
        image: &ImageUpload,
        priority: SearchPriority,
        limit: u32,
        options: &FaceSearchOptions,
    ) -> Result<Value> {
        if image.is_empty() {
            return Err(Error::Validation("An image file is required".to_string()).into());
        }

        let query = options.query_pairs(priority, limit);
        debug!("Face search with {} query parameters", query.len());

        let form = Form::new().part("file", image.to_part()?);
        let response = self
            .client
            .post(join_url(&self.base_url, "search"))
            .query(&query)
            .header(reqwest::header::ACCEPT, "application/json")
            .multipart(form)
            .send()
            .await
            .map_err(Error::from)?;

        let mut body: Value = read_json(response, "Search failed").await?;
        if let Some(matches) = body.get_mut("matches").and_then(Value::as_array_mut) {
            for item in matches {
                self.rewrite_match(item);
            }
        }

        Ok(body)
    }

    fn rewrite_cluster_thumbnail(&self, cluster: &mut Value) {
        let url = format!(
            "{}/cluster_images/{}.jpg",
            self.base_url,
            text_field(cluster, "cluster_id")
        );
        if let Some(fields) = cluster.as_object_mut() {
            fields.insert("representative_thumbnail_url".to_string(), Value::String(url));
        }
    }

    fn rewrite_face_thumbnail(&self, face: &mut Value) {
        let url = format!(
            "{}/face_thumbnails/{}",
            self.base_url,
            text_field(face, "source_snapshot_filename")
        );
        if let Some(fields) = face.as_object_mut() {
            fields.insert("thumbnail_url".to_string(), Value::String(url));
        }
    }

    /// Search matches are either faces or clusters; only non-empty URLs change
    fn rewrite_match(&self, item: &mut Value) {
        if has_url(item, "thumbnail_url") {
            self.rewrite_face_thumbnail(item);
        } else if has_url(item, "representative_thumbnail_url") {
            self.rewrite_cluster_thumbnail(item);
        }
    }
}

fn has_url(value: &Value, key: &str) -> bool {
    value
        .get(key)
        .and_then(Value::as_str)
        .map_or(false, |url| !url.is_empty())
}

fn text_field(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "null".to_string(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_clusters_rewrite_thumbnails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/clusters"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"cluster_id": "c1", "member_count": 4, "representative_thumbnail_url": "/tmp/x.jpg"}
            ])))
            .mount(&server)
            .await;

        let client = FaceClient::new(Client::new(), &format!("{}/", server.uri()));
        let clusters = client.clusters().await.unwrap();

        assert_eq!(
            clusters[0]["representative_thumbnail_url"],
            format!("{}/cluster_images/c1.jpg", server.uri())
        );
        assert_eq!(clusters[0]["member_count"], 4);
    }

    #[tokio::test]
    async fn test_cluster_faces_rewrite_thumbnails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/clusters/c1/faces"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"embedding_id": "e1", "source_snapshot_filename": "snap_1.jpg", "thumbnail_url": null}
            ])))
            .mount(&server)
            .await;

        let client = FaceClient::new(Client::new(), &server.uri());
        let faces = client.cluster_faces("c1").await.unwrap();

        assert_eq!(
            faces[0]["thumbnail_url"],
            format!("{}/face_thumbnails/snap_1.jpg", server.uri())
        );
    }

    #[tokio::test]
    async fn test_search_by_image_sends_filters() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .and(query_param("priority", "clusters"))
            .and(query_param("limit", "5"))
            .and(query_param("camera_ids", "gate_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "query_face_found": true,
                "matches": [
                    {"cluster_id": "c9", "representative_thumbnail_url": "old", "distance": 0.2},
                    {"embedding_id": "e1", "source_snapshot_filename": "f.jpg", "thumbnail_url": "", "distance": 0.3}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = FaceClient::new(Client::new(), &server.uri());
        let image = ImageUpload {
            file_name: "face.jpg".to_string(),
            content_type: Some("image/jpeg".to_string()),
            bytes: vec![0xff, 0xd8, 0xff],
        };
        let options = FaceSearchOptions {
            camera_ids: vec!["gate_1".to_string(), "gate_2".to_string()],
            ..Default::default()
        };

        let body = client
            .search_by_image(&image, SearchPriority::Clusters, 5, &options)
            .await
            .unwrap();

        assert_eq!(
            body["matches"][0]["representative_thumbnail_url"],
            format!("{}/cluster_images/c9.jpg", server.uri())
        );
        // Empty face thumbnails stay untouched.
        assert_eq!(body["matches"][1]["thumbnail_url"], "");
    }

    #[test]
    fn test_query_pairs_repeat_camera_ids() {
        let options = FaceSearchOptions {
            camera_ids: vec!["a".to_string(), "b".to_string()],
            max_distance: Some(0.4),
            ..Default::default()
        };
        let pairs = options.query_pairs(SearchPriority::Faces, 10);
        let cameras: Vec<_> = pairs.iter().filter(|(k, _)| k == "camera_ids").collect();

        assert_eq!(cameras.len(), 2);
        assert!(pairs.contains(&("max_distance".to_string(), "0.4".to_string())));
        assert_eq!(pairs[0], ("priority".to_string(), "faces".to_string()));
    }
}
