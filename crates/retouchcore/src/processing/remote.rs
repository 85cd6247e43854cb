use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};

use super::{Mode, ProcessError, ProcessResult, Processor};

/// Sends images to an HTTP processing API.
///
/// The image is posted as the multipart field `file` to `{endpoint}/{mode}`; a
/// successful response body is the processed image.
pub struct RemoteProcessor {
    client: reqwest::Client,
    url: String,
    name: String,
}

impl RemoteProcessor {
    pub fn new(client: reqwest::Client, endpoint: &str, mode: Mode) -> Self {
        let url = format!("{}/{}", endpoint.trim_end_matches('/'), mode);
        Self {
            client,
            name: format!("remote:{}", mode),
            url,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Processor for RemoteProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn process(&self, input: Bytes) -> ProcessResult<Bytes> {
        let part = Part::stream(input).file_name("input.jpg").mime_str("image/jpeg")?;
        let form = Form::new().part("file", part);

        let response = self.client.post(&self.url).multipart(form).send().await?;
        if !response.status().is_success() {
            log::warn!("{} answered {} for {}", self.url, response.status(), self.name);
            return Err(ProcessError::Api(response.status()));
        }

        Ok(response.bytes().await?)
    }
}
