//! Mailchimp Marketing API types.
//!
//! Only the fields the relay reads are modelled explicitly; member records
//! keep everything else in `extra` so they round-trip unchanged.

use std::collections::BTreeMap;

use cartsync_core::{MergeFields, TagSet, UserMergeFields};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Response from `GET /ping`.
#[derive(Debug, Clone, Deserialize)]
pub struct Ping {
    pub health_status: String,
}

/// A merge field defined on the list.
#[derive(Debug, Clone, Deserialize)]
pub struct MergeField {
    #[serde(default)]
    pub merge_id: Option<u64>,
    pub tag: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub field_type: Option<String>,
}

/// Response from `GET /lists/{list_id}/merge-fields`.
#[derive(Debug, Clone, Deserialize)]
pub struct MergeFieldList {
    pub merge_fields: Vec<MergeField>,
    #[serde(default)]
    pub total_items: u64,
}

/// A tag attached to a member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberTag {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_added: Option<String>,
}

/// A list member as held by the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteSubscriber {
    /// The subscriber hash.
    pub id: String,
    pub email_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub merge_fields: BTreeMap<String, Value>,
    #[serde(default)]
    pub tags: Vec<MemberTag>,
    /// Every other attribute the platform returned.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RemoteSubscriber {
    /// Names of the tags embedded in the member record.
    #[must_use]
    pub fn tag_names(&self) -> TagSet {
        self.tags.iter().map(|t| t.name.clone()).collect()
    }
}

/// Response from `GET /lists/{list_id}/members`.
#[derive(Debug, Clone, Deserialize)]
pub struct MemberList {
    pub members: Vec<RemoteSubscriber>,
    #[serde(default)]
    pub total_items: u64,
}

/// Response from `GET /lists/{list_id}/members/{hash}/tags`.
#[derive(Debug, Clone, Deserialize)]
pub struct MemberTagList {
    pub tags: Vec<MemberTag>,
    #[serde(default)]
    pub total_items: u64,
}

/// Problem-detail body returned on errors.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProblemDetail {
    #[serde(rename = "type", default)]
    pub problem_type: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub instance: Option<String>,
}

/// Body for `POST /lists/{list_id}/members`.
#[derive(Debug, Serialize)]
pub(crate) struct NewMember<'a> {
    pub email_address: &'a str,
    pub status: &'static str,
    pub merge_fields: &'a UserMergeFields,
    pub tags: &'a TagSet,
}

/// Body for `PATCH /lists/{list_id}/members/{hash}`.
#[derive(Debug, Serialize)]
pub(crate) struct MemberUpdate<'a> {
    pub merge_fields: &'a MergeFields,
}

/// Body for `POST /lists/{list_id}/members/{hash}/tags`.
#[derive(Debug, Serialize)]
pub(crate) struct TagUpdate<'a> {
    pub tags: Vec<TagStatus<'a>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct TagStatus<'a> {
    pub name: &'a str,
    pub status: &'static str,
}

impl<'a> TagUpdate<'a> {
    /// Mark every tag in `tags` active.
    pub(crate) fn activate(tags: &'a TagSet) -> Self {
        Self {
            tags: tags
                .iter()
                .map(|name| TagStatus {
                    name,
                    status: "active",
                })
                .collect(),
        }
    }
}
