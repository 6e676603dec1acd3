//! Blocking HTTP clients for the planner and vision services

use super::{PathPlanner, VisionClassifier};
use crate::config::ServicesConfig;
use crate::error::{Error, Result};
use reqwest::blocking::{Client, Response, multipart};
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(4);

/// Longest response body kept in an error
const ERROR_BODY_LIMIT: usize = 256;

fn make_client(timeout: Duration) -> Result<Client> {
    Ok(Client::builder()
        .timeout(timeout)
        .connect_timeout(CONNECT_TIMEOUT.min(timeout))
        .build()?)
}

/// Body of a successful response, or [`Error::HttpStatus`]
fn read_body(resp: Response) -> Result<String> {
    let status = resp.status();
    let body = resp.text()?;
    if !status.is_success() {
        let body = match body.char_indices().nth(ERROR_BODY_LIMIT) {
            Some((cut, _)) => format!("{}...", &body[..cut]),
            None => body,
        };
        return Err(Error::HttpStatus {
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}

/// POSTs route requests as JSON
pub struct HttpPathPlanner {
    client: Client,
    url: String,
}

impl HttpPathPlanner {
    pub fn new(config: &ServicesConfig) -> Result<Self> {
        Ok(Self {
            client: make_client(Duration::from_millis(config.pathfinding_timeout_ms))?,
            url: config.pathfinding_url.clone(),
        })
    }
}

impl PathPlanner for HttpPathPlanner {
    fn request_route(&self, body: &str) -> Result<String> {
        log::debug!("POST {} ({} bytes)", self.url, body.len());
        let resp = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .body(body.to_string())
            .send()?;
        read_body(resp)
    }
}

/// Uploads captures as multipart form data (`image`, `object_id`)
pub struct HttpVisionClassifier {
    client: Client,
    url: String,
}

impl HttpVisionClassifier {
    pub fn new(config: &ServicesConfig) -> Result<Self> {
        Ok(Self {
            client: make_client(Duration::from_millis(config.vision_timeout_ms))?,
            url: config.vision_url.clone(),
        })
    }
}

impl VisionClassifier for HttpVisionClassifier {
    fn classify(&self, image: Vec<u8>, obstacle_id: i32) -> Result<String> {
        log::debug!(
            "POST {} (obstacle {}, {} bytes)",
            self.url,
            obstacle_id,
            image.len()
        );
        let part = multipart::Part::bytes(image)
            .file_name("capture.jpg")
            .mime_str("image/jpeg")?;
        let form = multipart::Form::new()
            .part("image", part)
            .text("object_id", obstacle_id.to_string());
        let resp = self.client.post(&self.url).multipart(form).send()?;
        read_body(resp)
    }
}
