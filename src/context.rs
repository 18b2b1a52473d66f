//! Per-request dispatch state. Created fresh for every request and dropped once the
//! response is produced; never shared between requests.

use crate::error::{AppError, ErrorKind};
use crate::helpers::Helpers;
use crate::model::{ModelHandle, Record};
use crate::params::Params;
use crate::resource::{FieldDescriptor, FieldSet, ResourceDef};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde_json::Value;
use std::sync::Arc;

pub struct Context {
    resource: Arc<ResourceDef>,
    helpers: Helpers,
    id: Option<String>,
    record: Option<Record>,
    records: Option<Vec<Record>>,
    params: Params,
    status: Option<StatusCode>,
    headers: HeaderMap,
    collection_name: Option<String>,
    member_name: Option<String>,
    extra_fields: FieldSet,
}

impl Context {
    pub(crate) fn new(resource: Arc<ResourceDef>, helpers: Helpers, params: Params) -> Self {
        Context {
            resource,
            helpers,
            id: None,
            record: None,
            records: None,
            params,
            status: None,
            headers: HeaderMap::new(),
            collection_name: None,
            member_name: None,
            extra_fields: FieldSet::new(),
        }
    }

    pub(crate) fn with_target(
        mut self,
        id: Option<String>,
        record: Option<Record>,
        collection_name: Option<String>,
        member_name: Option<String>,
    ) -> Self {
        self.id = id;
        self.record = record;
        self.collection_name = collection_name;
        self.member_name = member_name;
        self
    }

    pub fn resource(&self) -> &ResourceDef {
        &self.resource
    }

    pub(crate) fn resource_handle(&self) -> &Arc<ResourceDef> {
        &self.resource
    }

    pub fn model(&self) -> &ModelHandle {
        self.resource.model()
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Id from the path; `BadRequest` when the route carried none.
    pub fn require_id(&self) -> Result<&str, AppError> {
        self.id()
            .ok_or_else(|| AppError::bad_request("this action needs a record id in the path"))
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn collection_name(&self) -> Option<&str> {
        self.collection_name.as_deref()
    }

    pub fn member_name(&self) -> Option<&str> {
        self.member_name.as_deref()
    }

    pub fn helper<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.helpers.get::<T>()
    }

    // -- what gets rendered --

    pub fn record(&self) -> Option<&Record> {
        self.record.as_ref()
    }

    pub fn record_mut(&mut self) -> Option<&mut Record> {
        self.record.as_mut()
    }

    /// Take the resolved record out, failing with `NotFound` when there is none.
    pub fn take_record(&mut self) -> Result<Record, AppError> {
        self.record
            .take()
            .ok_or_else(|| AppError::new(ErrorKind::NotFound))
    }

    /// Render `record` instead of whatever was resolved.
    pub fn set_record(&mut self, record: Record) {
        self.records = None;
        self.record = Some(record);
    }

    /// Render a list of records.
    pub fn set_records(&mut self, records: Vec<Record>) {
        self.records = Some(records);
    }

    pub fn records(&self) -> Option<&[Record]> {
        self.records.as_deref()
    }

    // -- per-request fields, appended after the declared ones --

    pub fn attribute(&mut self, name: impl Into<String>) -> &mut Self {
        self.extra_fields.push(FieldDescriptor::attribute(name));
        self
    }

    pub fn computed<F>(&mut self, name: impl Into<String>, compute: F) -> &mut Self
    where
        F: Fn(&Record) -> Value + Send + Sync + 'static,
    {
        self.extra_fields.push(FieldDescriptor::computed(name, compute));
        self
    }

    pub fn has_many(&mut self, name: impl Into<String>) -> &mut Self {
        self.extra_fields.push(FieldDescriptor::association(name, None));
        self
    }

    pub fn has_one(&mut self, name: impl Into<String>) -> &mut Self {
        self.extra_fields.push(FieldDescriptor::connection(name, None));
        self
    }

    pub fn extra_fields(&self) -> &FieldSet {
        &self.extra_fields
    }

    // -- response status and headers --

    /// Status set so far, `200 OK` when nothing set one.
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    pub fn set_status(&mut self, status: StatusCode) -> &mut Self {
        self.status = Some(status);
        self
    }

    pub fn ok(&mut self) -> &mut Self {
        self.set_status(StatusCode::OK)
    }

    pub fn created(&mut self) -> &mut Self {
        self.set_status(StatusCode::CREATED)
    }

    pub fn no_content(&mut self) -> &mut Self {
        self.set_status(StatusCode::NO_CONTENT)
    }

    pub fn bad_request(&mut self) -> &mut Self {
        self.set_status(StatusCode::BAD_REQUEST)
    }

    pub fn not_found(&mut self) -> &mut Self {
        self.set_status(StatusCode::NOT_FOUND)
    }

    pub fn internal_server_error(&mut self) -> &mut Self {
        self.set_status(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn not_implemented(&mut self) -> &mut Self {
        self.set_status(StatusCode::NOT_IMPLEMENTED)
    }

    pub fn bad_gateway(&mut self) -> &mut Self {
        self.set_status(StatusCode::BAD_GATEWAY)
    }

    pub fn set_header(&mut self, name: &str, value: &str) -> Result<&mut Self, AppError> {
        let name = HeaderName::try_from(name)
            .map_err(|_| AppError::unexpected(format!("invalid response header name: {}", name)))?;
        let value = HeaderValue::try_from(value)
            .map_err(|_| AppError::unexpected(format!("invalid value for response header {}", name)))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub(crate) fn into_response_parts(self) -> (StatusCode, HeaderMap) {
        (self.status.unwrap_or(StatusCode::OK), self.headers)
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("resource", &self.resource.name())
            .field("id", &self.id)
            .field("collection_name", &self.collection_name)
            .field("member_name", &self.member_name)
            .field("status", &self.status)
            .finish()
    }
}
