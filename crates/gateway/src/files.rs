//! File side-channel: register file metadata over the bus, move the bytes
//! over HTTP.
//!
//! Payloads too large for the bus travel as silo objects: registration is
//! a request/reply on [`subject::SUBJECT_FILES_CREATE`], the bytes go over
//! a plain HTTP PUT/GET against the configured public base URL.

use reqwest::header::CONTENT_TYPE;

use taskgate_core::{codec, subject, CreateFile, File, FileResponse, RemoteError};

use crate::error::GatewayError;
use crate::gateway::Gateway;

impl Gateway {
    /// Register a file placeholder with the silo; the bytes are uploaded
    /// afterwards with [`upload_file`](Self::upload_file).
    pub async fn create_file(&self, req: &CreateFile) -> Result<File, GatewayError> {
        let payload = codec::encode(req)?;
        let reply = self
            .bus()
            .request(subject::SUBJECT_FILES_CREATE, payload, self.request_timeout)
            .await?;

        let response: FileResponse = codec::decode(&reply)?;
        if let Some(err) = response.err {
            return Err(GatewayError::Remote(err));
        }
        response.file.ok_or_else(|| {
            GatewayError::Remote(RemoteError {
                message: "file response carried neither file nor error".into(),
                ..RemoteError::default()
            })
        })
    }

    /// Register and upload in one call.
    ///
    /// Size, MIME (content-sniffed when unset), and SHA-256 are derived
    /// from `data` before registration. The payload stays in memory for
    /// the duration; very large files are better served by the two-step
    /// API with a streaming body.
    pub async fn create_and_upload_file(
        &self,
        mut req: CreateFile,
        data: Vec<u8>,
    ) -> Result<File, GatewayError> {
        req.fill_from_data(&data);
        let file = self.create_file(&req).await?;
        self.upload_file(&file, data).await?;
        Ok(file)
    }

    /// HTTP PUT the file's bytes to the silo.
    ///
    /// The upload only functions if the registered SHA-256 matches the
    /// bytes sent here.
    pub async fn upload_file(&self, file: &File, data: Vec<u8>) -> Result<(), GatewayError> {
        let url = self.file_url(file)?;
        let response = self
            .http
            .put(url)
            .header(CONTENT_TYPE, &file.mime)
            .body(data)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GatewayError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }

    /// HTTP GET the file's bytes back from the silo.
    pub async fn fetch_file(&self, file: &File) -> Result<Vec<u8>, GatewayError> {
        let url = self.file_url(file)?;
        let response = self.http.get(url).send().await?;

        if !response.status().is_success() {
            return Err(GatewayError::HttpStatus(response.status().as_u16()));
        }
        Ok(response.bytes().await?.to_vec())
    }

    /// Build the side-channel URL for a file: base, entry, file id, name,
    /// and the signed hash as the `h` query parameter.
    ///
    /// A missing base URL is a configuration error, caught before any
    /// network call.
    pub(crate) fn file_url(&self, file: &File) -> Result<String, GatewayError> {
        let base = self
            .silo_public_base_url
            .as_deref()
            .ok_or_else(|| GatewayError::Config("missing silo public base url".into()))?;

        Ok(format!(
            "{}/{}/{}/{}?h={}",
            base.trim_end_matches('/'),
            file.silo_entry_id,
            file.id,
            file.name,
            file.hash,
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use assert_matches::assert_matches;
    use taskgate_bus::MemoryBus;
    use taskgate_core::{Task, TaskResult};

    use super::*;

    fn gateway(base_url: Option<&str>) -> Gateway {
        let mut builder = Gateway::builder(|_: Task| async { None::<TaskResult> })
            .name("files-test")
            .bus(Arc::new(MemoryBus::new()));
        if let Some(url) = base_url {
            builder = builder.silo_public_base_url(url);
        }
        builder.build().unwrap()
    }

    fn sample_file() -> File {
        File {
            id: "f-9".into(),
            silo_entry_id: "entry-3".into(),
            name: "invoice.json".into(),
            hash: "abc123".into(),
            mime: "application/json".into(),
            size: 2,
            sha256: "deadbeef".into(),
        }
    }

    #[test]
    fn file_url_combines_entry_id_name_and_hash() {
        let gw = gateway(Some("https://silo.example.com"));
        let url = gw.file_url(&sample_file()).unwrap();
        assert_eq!(
            url,
            "https://silo.example.com/entry-3/f-9/invoice.json?h=abc123"
        );
    }

    #[test]
    fn file_url_tolerates_a_trailing_slash() {
        let gw = gateway(Some("https://silo.example.com/"));
        let url = gw.file_url(&sample_file()).unwrap();
        assert!(url.starts_with("https://silo.example.com/entry-3/"));
    }

    #[test]
    fn missing_base_url_is_a_config_error() {
        let gw = gateway(None);
        let res = gw.file_url(&sample_file());
        assert_matches!(res, Err(GatewayError::Config(_)));
    }

    #[tokio::test]
    async fn upload_checks_the_base_url_before_any_request() {
        let gw = gateway(None);
        let res = gw.upload_file(&sample_file(), b"{}".to_vec()).await;
        assert_matches!(res, Err(GatewayError::Config(_)));
    }
}
