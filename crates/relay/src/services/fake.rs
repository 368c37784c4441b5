//! Recording in-memory [`MarketingPlatform`] for service and route tests.

#![allow(clippy::unwrap_used)]

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use cartsync_core::{Email, MergeFields, SubscriberHash, TagSet, UserMergeFields};
use serde_json::Value;

use super::mailchimp::{MemberTag, RemoteSubscriber};
use super::marketing::{MarketingError, MarketingPlatform, SchemaReport};

/// Platform operations, used to inject failures and inspect calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Op {
    Ping,
    Add,
    Update,
    Get,
    List,
    Tags,
}

/// One recorded call.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Ping,
    EnsureSchema,
    Add {
        email: String,
        name: String,
        tags: Vec<String>,
    },
    Update {
        email: String,
        merge_fields: MergeFields,
        tags: Vec<String>,
    },
    Get {
        email: String,
    },
    List,
    Tags {
        email: String,
    },
}

#[derive(Debug, Default)]
struct State {
    members: Vec<RemoteSubscriber>,
    calls: Vec<Call>,
    failures: HashMap<Op, MarketingError>,
}

/// Fake list that behaves like the platform for the operations we use.
#[derive(Debug, Default)]
pub(crate) struct FakePlatform {
    state: Mutex<State>,
}

impl FakePlatform {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Make every future call of `op` fail with `err`.
    pub(crate) fn fail(&self, op: Op, err: MarketingError) {
        self.state.lock().unwrap().failures.insert(op, err);
    }

    /// Put a member on the list without recording a call.
    pub(crate) fn seed(&self, email: &str, name: &str, tags: &[&str]) {
        let tags: TagSet = tags.iter().copied().collect();
        let member = member(email, &UserMergeFields::from_name(name).into(), &tags);
        self.state.lock().unwrap().members.push(member);
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub(crate) fn member(&self, email: &str) -> Option<RemoteSubscriber> {
        let id = SubscriberHash::from_email(email);
        self.state
            .lock()
            .unwrap()
            .members
            .iter()
            .find(|m| m.id == id.as_str())
            .cloned()
    }

    fn record(&self, call: Call, op: Option<Op>) -> Result<(), MarketingError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        match op.and_then(|op| state.failures.get(&op)) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

fn not_found() -> MarketingError {
    MarketingError::Api {
        status: 404,
        title: "Resource Not Found".to_string(),
        detail: "The requested resource could not be found.".to_string(),
    }
}

fn merge_map(fields: &MergeFields) -> BTreeMap<String, Value> {
    serde_json::from_value(serde_json::to_value(fields).unwrap()).unwrap()
}

fn member(email: &str, fields: &MergeFields, tags: &TagSet) -> RemoteSubscriber {
    RemoteSubscriber {
        id: SubscriberHash::from_email(email).as_str().to_string(),
        email_address: email.to_string(),
        status: Some("subscribed".to_string()),
        merge_fields: merge_map(fields),
        tags: tags
            .iter()
            .map(|name| MemberTag {
                id: None,
                name: name.to_string(),
                date_added: None,
            })
            .collect(),
        extra: serde_json::Map::new(),
    }
}

#[async_trait]
impl MarketingPlatform for FakePlatform {
    async fn verify_connectivity(&self) -> Result<(), MarketingError> {
        self.record(Call::Ping, Some(Op::Ping))
    }

    async fn ensure_schema(&self) -> SchemaReport {
        self.record(Call::EnsureSchema, None).ok();
        SchemaReport::default()
    }

    async fn add_subscriber(
        &self,
        email: &Email,
        name: &str,
        tags: &TagSet,
    ) -> Result<RemoteSubscriber, MarketingError> {
        self.record(
            Call::Add {
                email: email.to_string(),
                name: name.to_string(),
                tags: tags.clone().into(),
            },
            Some(Op::Add),
        )?;

        if self.member(email.as_str()).is_some() {
            return Err(MarketingError::Api {
                status: 400,
                title: "Member Exists".to_string(),
                detail: format!("{email} is already a list member."),
            });
        }

        let created = member(email.as_str(), &UserMergeFields::from_name(name).into(), tags);
        self.state.lock().unwrap().members.push(created.clone());
        Ok(created)
    }

    async fn update_subscriber(
        &self,
        email: &Email,
        merge_fields: &MergeFields,
        tags: &TagSet,
    ) -> Result<RemoteSubscriber, MarketingError> {
        self.record(
            Call::Update {
                email: email.to_string(),
                merge_fields: merge_fields.clone(),
                tags: tags.clone().into(),
            },
            Some(Op::Update),
        )?;

        let id = SubscriberHash::from_email(email);
        let mut state = self.state.lock().unwrap();
        let existing = state
            .members
            .iter_mut()
            .find(|m| m.id == id.as_str())
            .ok_or_else(not_found)?;

        existing.merge_fields.extend(merge_map(merge_fields));
        let merged = existing.tag_names().union(tags);
        existing.tags = member(email.as_str(), merge_fields, &merged).tags;
        Ok(existing.clone())
    }

    async fn get_subscriber(&self, email: &Email) -> Result<Option<RemoteSubscriber>, MarketingError> {
        self.record(
            Call::Get {
                email: email.to_string(),
            },
            Some(Op::Get),
        )?;
        Ok(self.member(email.as_str()))
    }

    async fn list_all_subscribers(&self) -> Result<Vec<RemoteSubscriber>, MarketingError> {
        self.record(Call::List, Some(Op::List))?;
        Ok(self.state.lock().unwrap().members.clone())
    }

    async fn get_tags(&self, email: &Email) -> Result<TagSet, MarketingError> {
        self.record(
            Call::Tags {
                email: email.to_string(),
            },
            Some(Op::Tags),
        )?;
        self.member(email.as_str())
            .map(|m| m.tag_names())
            .ok_or_else(not_found)
    }
}
