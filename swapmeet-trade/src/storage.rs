use std::future::Future;

use uuid::Uuid;

use swapmeet_shared::clients::minio::MinioClient;

/// Blob storage for shipping proof images.
pub trait ObjectStore: Send + Sync {
    /// Store `body` under `key` and return a URL anyone can read it from.
    fn upload(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> impl Future<Output = anyhow::Result<String>> + Send;
}

impl ObjectStore for MinioClient {
    fn upload(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> impl Future<Output = anyhow::Result<String>> + Send {
        MinioClient::upload(self, key, body, content_type)
    }
}

/// An uploaded proof image as read from the multipart body.
#[derive(Debug, Clone)]
pub struct ProofImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

pub fn image_extension(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

/// `trades/{trade_id}/{user_id}/{uuid}.{ext}`
pub fn proof_key(trade_id: Uuid, user_id: Uuid, ext: &str) -> String {
    format!("trades/{}/{}/{}.{}", trade_id, user_id, Uuid::now_v7(), ext)
}
