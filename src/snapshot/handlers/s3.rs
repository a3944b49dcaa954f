use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::{
    child_text, find_text, state_mismatch, Extraction, ItemFault, Reconstruction, ServiceHandler,
    MAX_PAGES,
};
use crate::emulator::{EmulatorApi, EmulatorError, EmulatorRequest};
use crate::snapshot::error::SnapshotError;
use crate::snapshot::kind::ServiceKind;
use crate::snapshot::model::{BucketRecord, ObjectRecord, S3State, ServiceState};

const SERVICE: &str = "s3";

/// Buckets, and with detail requested, object metadata per bucket
pub struct S3Handler {
    region: String,
}

impl S3Handler {
    pub fn with_region(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
        }
    }

    fn create_bucket_request(&self, name: &str) -> EmulatorRequest {
        let request = EmulatorRequest::put(SERVICE, format!("/{}", name));
        // us-east-1 rejects an explicit location constraint
        if self.region == "us-east-1" {
            request
        } else {
            request.with_body(format!(
                "<CreateBucketConfiguration xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\">\
                 <LocationConstraint>{}</LocationConstraint></CreateBucketConfiguration>",
                self.region
            ))
        }
    }
}

impl Default for S3Handler {
    fn default() -> Self {
        Self::with_region(crate::config::DEFAULT_REGION)
    }
}

async fn list_buckets(api: &dyn EmulatorApi) -> Result<Vec<BucketRecord>, EmulatorError> {
    let response = api.call(EmulatorRequest::get(SERVICE, "/")).await?;
    let doc = response.xml()?;

    let buckets = doc
        .descendants()
        .filter(|n| n.has_tag_name("Bucket"))
        .filter_map(|n| {
            let name = child_text(n, "Name")?;
            Some(BucketRecord {
                name: name.to_string(),
                creation_date: child_text(n, "CreationDate").map(str::to_string),
                objects: Vec::new(),
            })
        })
        .collect();

    Ok(buckets)
}

async fn list_objects(api: &dyn EmulatorApi, bucket: &str) -> Result<Vec<ObjectRecord>, EmulatorError> {
    let mut objects = Vec::new();
    let mut continuation: Option<String> = None;

    for _ in 0..MAX_PAGES {
        let mut request =
            EmulatorRequest::get(SERVICE, format!("/{}", bucket)).with_query("list-type", "2");
        if let Some(token) = continuation.take() {
            request = request.with_query("continuation-token", token);
        }

        let response = api.call(request).await?;
        let doc = response.xml()?;

        for node in doc.descendants().filter(|n| n.has_tag_name("Contents")) {
            let Some(key) = child_text(node, "Key") else {
                continue;
            };
            objects.push(ObjectRecord {
                key: key.to_string(),
                size: child_text(node, "Size")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(0),
                last_modified: child_text(node, "LastModified").map(str::to_string),
                etag: child_text(node, "ETag").map(|e| e.trim_matches('"').to_string()),
            });
        }

        let truncated = find_text(&doc, "IsTruncated") == Some("true");
        continuation = find_text(&doc, "NextContinuationToken").map(str::to_string);
        if !truncated || continuation.is_none() {
            break;
        }
    }

    Ok(objects)
}

#[async_trait]
impl ServiceHandler for S3Handler {
    fn kind(&self) -> ServiceKind {
        ServiceKind::S3
    }

    async fn extract(&self, api: &dyn EmulatorApi, include_details: bool) -> Extraction {
        let mut buckets = match list_buckets(api).await {
            Ok(buckets) => buckets,
            Err(e) => {
                warn!(service = SERVICE, error = %e, "Bucket listing failed, exporting no buckets");
                return Extraction::degraded(ServiceKind::S3, &e);
            }
        };

        let mut faults = Vec::new();
        if include_details {
            for bucket in &mut buckets {
                match list_objects(api, &bucket.name).await {
                    Ok(objects) => bucket.objects = objects,
                    Err(e) => {
                        debug!(bucket = %bucket.name, error = %e, "Object listing failed");
                        faults.push(ItemFault::new(&bucket.name, &e));
                    }
                }
            }
        }

        info!(service = SERVICE, buckets = buckets.len(), "Extracted buckets");
        Extraction::with_faults(ServiceState::S3(S3State::new(buckets)), faults)
    }

    async fn reconstruct(
        &self,
        api: &dyn EmulatorApi,
        state: &ServiceState,
    ) -> Result<Reconstruction, SnapshotError> {
        let ServiceState::S3(s3) = state else {
            return Err(state_mismatch(ServiceKind::S3, state));
        };

        let mut outcome = Reconstruction::new(ServiceKind::S3);
        for bucket in &s3.buckets {
            if !is_valid_bucket_name(&bucket.name) {
                outcome.record(&bucket.name, Err("invalid bucket name".to_string()));
                continue;
            }

            let result = api
                .call(self.create_bucket_request(&bucket.name))
                .await
                .map(|_| ())
                .map_err(|e| e.to_string());
            if let Err(reason) = &result {
                debug!(bucket = %bucket.name, reason = %reason, "Bucket not created");
            }
            outcome.record(&bucket.name, result);
        }

        info!(
            service = SERVICE,
            imported = outcome.imported_count(),
            skipped = outcome.skipped_count(),
            "Restored buckets"
        );
        Ok(outcome)
    }
}

/// S3 naming rules: 3-63 chars of `[a-z0-9.-]`, alphanumeric at both ends
fn is_valid_bucket_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    (3..=63).contains(&bytes.len())
        && bytes
            .iter()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'.' || *b == b'-')
        && bytes[0].is_ascii_alphanumeric()
        && bytes[bytes.len() - 1].is_ascii_alphanumeric()
}
