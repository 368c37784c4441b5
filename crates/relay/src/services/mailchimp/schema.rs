//! Merge-field provisioning for the abandoned-cart flow.

use cartsync_core::{MergeFieldSpec, REQUIRED_MERGE_FIELDS};
use reqwest::Method;
use tracing::instrument;

use super::{MailchimpClient, MergeField, MergeFieldList};
use crate::services::marketing::{MarketingError, SchemaReport};

impl MailchimpClient {
    /// Ensure every field in [`REQUIRED_MERGE_FIELDS`] exists on the list.
    ///
    /// A create that conflicts with an existing field counts as existing.
    /// Any other failure is logged and recorded; provisioning never blocks
    /// startup.
    #[instrument(skip(self), fields(list_id = %self.list_id()))]
    pub async fn ensure_merge_fields(&self) -> SchemaReport {
        let mut report = SchemaReport::default();

        let path = format!("/lists/{}/merge-fields?count=1000", self.list_id());
        let existing: MergeFieldList = match self.get(&path).await {
            Ok(list) => list,
            Err(e) => {
                tracing::error!(error = %e, "Failed to get list merge fields");
                report
                    .failed
                    .extend(REQUIRED_MERGE_FIELDS.iter().map(|f| f.tag));
                return report;
            }
        };

        for field in &REQUIRED_MERGE_FIELDS {
            if existing.merge_fields.iter().any(|f| f.tag == field.tag) {
                tracing::info!(tag = field.tag, "Merge field already exists");
                report.existing.push(field.tag);
                continue;
            }

            match self.create_merge_field(field).await {
                Ok(created) => {
                    tracing::info!(tag = %created.tag, merge_id = ?created.merge_id, "Added merge field");
                    report.created.push(field.tag);
                }
                Err(e) if is_already_exists(&e) => {
                    tracing::info!(tag = field.tag, "Merge field already exists");
                    report.existing.push(field.tag);
                }
                Err(e) => {
                    tracing::error!(tag = field.tag, error = %e, "Failed to add merge field");
                    report.failed.push(field.tag);
                }
            }
        }

        report
    }

    async fn create_merge_field(&self, field: &MergeFieldSpec) -> Result<MergeField, MarketingError> {
        let path = format!("/lists/{}/merge-fields", self.list_id());
        self.send_json(Method::POST, &path, field).await
    }
}

/// The platform's answer when a merge tag is already taken.
fn is_already_exists(err: &MarketingError) -> bool {
    matches!(
        err,
        MarketingError::Api { status: 400, title, detail }
            if title == "Invalid Resource" && detail.contains("already exists")
    )
}
