//! In-process fake of the Mailchimp Marketing API.
//!
//! Serves the subset of `/3.0` the relay uses: ping, merge fields, members
//! and member tags. Members are keyed by subscriber hash and answers use
//! the platform's problem-detail error shape. Individual endpoints can be
//! made to fail and every response can be delayed.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, Query, Request, State},
    http::{StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
};
use cartsync_core::SubscriberHash;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tokio::sync::Mutex;

/// Endpoints whose responses can be overridden with [`MockMailchimp::fail`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Ping,
    ListMergeFields,
    CreateMergeField,
    AddMember,
    ListMembers,
    GetMember,
    UpdateMember,
    GetTags,
    PostTags,
}

#[derive(Debug, Clone)]
struct Problem {
    status: StatusCode,
    title: String,
    detail: String,
}

impl IntoResponse for Problem {
    fn into_response(self) -> Response {
        let body = json!({
            "type": "https://mailchimp.com/developer/marketing/docs/errors/",
            "title": self.title,
            "status": self.status.as_u16(),
            "detail": self.detail,
            "instance": "00000000-0000-0000-0000-000000000000",
        });
        (self.status, Json(body)).into_response()
    }
}

fn not_found() -> Problem {
    Problem {
        status: StatusCode::NOT_FOUND,
        title: "Resource Not Found".to_string(),
        detail: "The requested resource could not be found.".to_string(),
    }
}

#[derive(Debug, Clone)]
struct Member {
    hash: String,
    email: String,
    status: String,
    merge_fields: Map<String, Value>,
    tags: Vec<String>,
}

impl Member {
    fn to_json(&self, list_id: &str) -> Value {
        json!({
            "id": self.hash,
            "email_address": self.email,
            "unique_email_id": format!("u-{}", &self.hash[..10]),
            "status": self.status,
            "merge_fields": self.merge_fields,
            "tags_count": self.tags.len(),
            "tags": self.tag_json(),
            "list_id": list_id,
        })
    }

    fn tag_json(&self) -> Vec<Value> {
        self.tags
            .iter()
            .zip(1_u64..)
            .map(|(name, id)| {
                json!({"id": id, "name": name, "date_added": "2024-05-01T10:00:00+00:00"})
            })
            .collect()
    }
}

#[derive(Debug, Default)]
struct MockState {
    members: Vec<Member>,
    merge_fields: Vec<(String, String, String)>,
    hide_merge_fields: bool,
    failures: HashMap<Endpoint, Problem>,
    delay: Option<Duration>,
    page_cap: Option<usize>,
    requests: Vec<String>,
}

impl MockState {
    fn check(&self, endpoint: Endpoint) -> Result<(), Problem> {
        self.failures.get(&endpoint).cloned().map_or(Ok(()), Err)
    }

    fn member_mut(&mut self, hash: &str) -> Result<&mut Member, Problem> {
        self.members
            .iter_mut()
            .find(|m| m.hash == hash)
            .ok_or_else(not_found)
    }
}

/// Handle to a running fake Mailchimp server.
#[derive(Debug, Clone)]
pub struct MockMailchimp {
    addr: SocketAddr,
    state: Arc<Mutex<MockState>>,
}

impl MockMailchimp {
    /// Bind to an ephemeral port on localhost and start serving.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn start() -> Self {
        let state = Arc::new(Mutex::new(MockState::default()));

        let app = Router::new()
            .route("/3.0/ping", get(ping))
            .route(
                "/3.0/lists/{list_id}/merge-fields",
                get(list_merge_fields).post(create_merge_field),
            )
            .route(
                "/3.0/lists/{list_id}/members",
                get(list_members).post(add_member),
            )
            .route(
                "/3.0/lists/{list_id}/members/{hash}",
                get(get_member).patch(update_member),
            )
            .route(
                "/3.0/lists/{list_id}/members/{hash}/tags",
                get(get_tags).post(post_tags),
            )
            .layer(middleware::from_fn_with_state(state.clone(), gate))
            .with_state(state.clone());

        let addr = crate::serve(app).await;
        Self { addr, state }
    }

    /// API root to configure the relay with.
    #[must_use]
    pub fn api_root(&self) -> String {
        format!("http://{}/3.0", self.addr)
    }

    /// Make every future call to `endpoint` answer with this problem.
    pub async fn fail(&self, endpoint: Endpoint, status: u16, title: &str, detail: &str) {
        let problem = Problem {
            status: StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            title: title.to_string(),
            detail: detail.to_string(),
        };
        self.state.lock().await.failures.insert(endpoint, problem);
    }

    /// Undo [`MockMailchimp::fail`] for `endpoint`.
    pub async fn recover(&self, endpoint: Endpoint) {
        self.state.lock().await.failures.remove(&endpoint);
    }

    /// Delay every response.
    pub async fn set_delay(&self, delay: Duration) {
        self.state.lock().await.delay = Some(delay);
    }

    /// Serve at most `cap` members per page regardless of `count`.
    pub async fn set_page_cap(&self, cap: usize) {
        self.state.lock().await.page_cap = Some(cap);
    }

    /// Report an empty merge-field schema while still rejecting duplicates.
    pub async fn hide_merge_fields(&self) {
        self.state.lock().await.hide_merge_fields = true;
    }

    /// Define a merge field directly.
    pub async fn seed_merge_field(&self, tag: &str) {
        self.state
            .lock()
            .await
            .merge_fields
            .push((tag.to_string(), tag.to_string(), "text".to_string()));
    }

    /// Put a subscribed member on the list directly.
    pub async fn seed_member(&self, email: &str, fname: &str, lname: &str, tags: &[&str]) {
        let mut merge_fields = Map::new();
        merge_fields.insert("FNAME".to_string(), json!(fname));
        merge_fields.insert("LNAME".to_string(), json!(lname));
        self.state.lock().await.members.push(Member {
            hash: SubscriberHash::from_email(email).to_string(),
            email: email.to_string(),
            status: "subscribed".to_string(),
            merge_fields,
            tags: tags.iter().map(ToString::to_string).collect(),
        });
    }

    /// Merge fields of the member with this email, if any.
    pub async fn merge_fields(&self, email: &str) -> Option<Map<String, Value>> {
        let hash = SubscriberHash::from_email(email);
        self.state
            .lock()
            .await
            .members
            .iter()
            .find(|m| m.hash == hash.as_str())
            .map(|m| m.merge_fields.clone())
    }

    /// Tags of the member with this email, in the order they were added.
    pub async fn tags(&self, email: &str) -> Option<Vec<String>> {
        let hash = SubscriberHash::from_email(email);
        self.state
            .lock()
            .await
            .members
            .iter()
            .find(|m| m.hash == hash.as_str())
            .map(|m| m.tags.clone())
    }

    pub async fn member_count(&self) -> usize {
        self.state.lock().await.members.len()
    }

    /// Tags of the defined merge fields.
    pub async fn merge_field_tags(&self) -> Vec<String> {
        self.state
            .lock()
            .await
            .merge_fields
            .iter()
            .map(|(tag, ..)| tag.clone())
            .collect()
    }

    /// `"<METHOD> <path>"` of every authenticated request served so far.
    pub async fn requests(&self) -> Vec<String> {
        self.state.lock().await.requests.clone()
    }
}

/// Rejects unauthenticated calls, records the request and applies the delay.
async fn gate(
    State(state): State<Arc<Mutex<MockState>>>,
    request: Request,
    next: Next,
) -> Response {
    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("Basic "));
    if !authorized {
        return Problem {
            status: StatusCode::UNAUTHORIZED,
            title: "API Key Missing".to_string(),
            detail: "Your request did not include an API key.".to_string(),
        }
        .into_response();
    }

    let delay = {
        let mut state = state.lock().await;
        state
            .requests
            .push(format!("{} {}", request.method(), request.uri().path()));
        state.delay
    };
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    next.run(request).await
}

type Shared = State<Arc<Mutex<MockState>>>;

async fn ping(State(state): Shared) -> Result<Json<Value>, Problem> {
    state.lock().await.check(Endpoint::Ping)?;
    Ok(Json(json!({"health_status": "Everything's Chimpy!"})))
}

async fn list_merge_fields(
    State(state): Shared,
    Path(list_id): Path<String>,
) -> Result<Json<Value>, Problem> {
    let mut state = state.lock().await;
    state.check(Endpoint::ListMergeFields)?;

    let fields: Vec<Value> = if state.hide_merge_fields {
        Vec::new()
    } else {
        state
            .merge_fields
            .iter()
            .zip(1_u64..)
            .map(|((tag, name, kind), id)| {
                json!({"merge_id": id, "tag": tag, "name": name, "type": kind, "list_id": list_id})
            })
            .collect()
    };
    let total = fields.len();
    Ok(Json(json!({"merge_fields": fields, "total_items": total})))
}

#[derive(Debug, Deserialize)]
struct NewMergeField {
    tag: String,
    name: String,
    #[serde(rename = "type")]
    kind: String,
}

async fn create_merge_field(
    State(state): Shared,
    Json(field): Json<NewMergeField>,
) -> Result<Json<Value>, Problem> {
    let mut state = state.lock().await;
    state.check(Endpoint::CreateMergeField)?;

    if state.merge_fields.iter().any(|(tag, ..)| *tag == field.tag) {
        return Err(Problem {
            status: StatusCode::BAD_REQUEST,
            title: "Invalid Resource".to_string(),
            detail: format!(
                "A Merge Field with the tag \"{}\" already exists for this list.",
                field.tag
            ),
        });
    }

    state
        .merge_fields
        .push((field.tag.clone(), field.name.clone(), field.kind.clone()));
    Ok(Json(json!({"tag": field.tag, "name": field.name, "type": field.kind})))
}

#[derive(Debug, Deserialize)]
struct NewMember {
    email_address: String,
    status: String,
    #[serde(default)]
    merge_fields: Map<String, Value>,
    #[serde(default)]
    tags: Vec<String>,
}

async fn add_member(
    State(state): Shared,
    Path(list_id): Path<String>,
    Json(body): Json<NewMember>,
) -> Result<Json<Value>, Problem> {
    let mut state = state.lock().await;
    state.check(Endpoint::AddMember)?;

    let hash = SubscriberHash::from_email(&body.email_address).to_string();
    if state.members.iter().any(|m| m.hash == hash) {
        return Err(Problem {
            status: StatusCode::BAD_REQUEST,
            title: "Member Exists".to_string(),
            detail: format!(
                "{} is already a list member. Use PUT to insert or update list members.",
                body.email_address
            ),
        });
    }

    let member = Member {
        hash,
        email: body.email_address,
        status: body.status,
        merge_fields: body.merge_fields,
        tags: body.tags,
    };
    let response = member.to_json(&list_id);
    state.members.push(member);
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
struct Page {
    count: Option<usize>,
    offset: Option<usize>,
}

async fn list_members(
    State(state): Shared,
    Path(list_id): Path<String>,
    Query(page): Query<Page>,
) -> Result<Json<Value>, Problem> {
    let mut state = state.lock().await;
    state.check(Endpoint::ListMembers)?;

    let count = page.count.unwrap_or(10).min(state.page_cap.unwrap_or(usize::MAX));
    let members: Vec<Value> = state
        .members
        .iter()
        .skip(page.offset.unwrap_or(0))
        .take(count)
        .map(|m| m.to_json(&list_id))
        .collect();
    Ok(Json(json!({
        "members": members,
        "list_id": list_id,
        "total_items": state.members.len(),
    })))
}

async fn get_member(
    State(state): Shared,
    Path((list_id, hash)): Path<(String, String)>,
) -> Result<Json<Value>, Problem> {
    let mut state = state.lock().await;
    state.check(Endpoint::GetMember)?;
    Ok(Json(state.member_mut(&hash)?.to_json(&list_id)))
}

#[derive(Debug, Deserialize)]
struct MemberPatch {
    #[serde(default)]
    merge_fields: Map<String, Value>,
}

async fn update_member(
    State(state): Shared,
    Path((list_id, hash)): Path<(String, String)>,
    Json(patch): Json<MemberPatch>,
) -> Result<Json<Value>, Problem> {
    let mut state = state.lock().await;
    state.check(Endpoint::UpdateMember)?;

    let member = state.member_mut(&hash)?;
    member.merge_fields.extend(patch.merge_fields);
    Ok(Json(member.to_json(&list_id)))
}

async fn get_tags(
    State(state): Shared,
    Path((_list_id, hash)): Path<(String, String)>,
) -> Result<Json<Value>, Problem> {
    let mut state = state.lock().await;
    state.check(Endpoint::GetTags)?;

    let member = state.member_mut(&hash)?;
    Ok(Json(json!({
        "tags": member.tag_json(),
        "total_items": member.tags.len(),
    })))
}

#[derive(Debug, Deserialize)]
struct TagChange {
    name: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct TagChanges {
    tags: Vec<TagChange>,
}

async fn post_tags(
    State(state): Shared,
    Path((_list_id, hash)): Path<(String, String)>,
    Json(body): Json<TagChanges>,
) -> Result<StatusCode, Problem> {
    let mut state = state.lock().await;
    state.check(Endpoint::PostTags)?;

    let member = state.member_mut(&hash)?;
    for change in body.tags {
        let present = member.tags.contains(&change.name);
        match change.status.as_str() {
            "active" if !present => member.tags.push(change.name),
            "inactive" => member.tags.retain(|t| *t != change.name),
            _ => {}
        }
    }
    Ok(StatusCode::NO_CONTENT)
}
