use serde::{Deserialize, Serialize};

use crate::{ImageError, ImageId, Slot};

/// Receipt returned after successfully storing an owner image
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageReceipt {
    pub image_id: ImageId,
    pub sort_order: Slot,
    pub mime_type: String,
    pub size_bytes: u64,
    pub url: String,
    /// Whether an existing slot was overwritten
    pub replaced: bool,
    /// Owner projection after this write
    pub image_url_list: Option<String>,
}

/// Outcome of one item of a batch ingestion
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItem {
    pub index: usize,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_id: Option<ImageId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<&'static str>,
}

impl BatchItem {
    pub fn succeeded(index: usize, receipt: &ImageReceipt) -> Self {
        Self {
            index,
            success: true,
            image_id: Some(receipt.image_id),
            url: Some(receipt.url.clone()),
            error: None,
            error_kind: None,
        }
    }

    pub fn failed(index: usize, error: &ImageError) -> Self {
        Self {
            index,
            success: false,
            image_id: None,
            url: None,
            error: Some(error.to_string()),
            error_kind: Some(error.kind()),
        }
    }
}

/// Aggregated outcome of a batch ingestion
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReceipt {
    pub results: Vec<BatchItem>,
    pub image_url_list: Option<String>,
}

impl BatchReceipt {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn any_succeeded(&self) -> bool {
        self.succeeded() > 0
    }
}
