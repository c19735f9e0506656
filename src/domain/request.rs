//! Job API operations as a closed set of request variants

use serde_json::{json, Value};

use crate::domain::{Credentials, JobHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// One logical call to the job API.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiRequest {
    Status(JobHandle),
    Info(JobHandle),
    Connect(JobHandle),
    Terminate(JobHandle),
    Shutdown(JobHandle),
    Action { job: JobHandle, action: String },
    Tail { job: JobHandle, lines: Option<u32> },
    Output { job: JobHandle, lines: Option<u32> },
    Jobs { name: Option<String> },
    Apps { name: Option<String> },
    Machines { name: Option<String> },
    Submit(Value),
}

impl ApiRequest {
    pub fn method(&self) -> HttpMethod {
        match self {
            ApiRequest::Submit(_) => HttpMethod::Post,
            _ => HttpMethod::Get,
        }
    }

    pub fn endpoint(&self) -> &'static str {
        match self {
            ApiRequest::Status(_) => "/jarvice/status",
            ApiRequest::Info(_) => "/jarvice/info",
            ApiRequest::Connect(_) => "/jarvice/connect",
            ApiRequest::Terminate(_) => "/jarvice/terminate",
            ApiRequest::Shutdown(_) => "/jarvice/shutdown",
            ApiRequest::Action { .. } => "/jarvice/action",
            ApiRequest::Tail { .. } => "/jarvice/tail",
            ApiRequest::Output { .. } => "/jarvice/output",
            ApiRequest::Jobs { .. } => "/jarvice/jobs",
            ApiRequest::Apps { .. } => "/jarvice/apps",
            ApiRequest::Machines { .. } => "/jarvice/machines",
            ApiRequest::Submit(_) => "/jarvice/submit",
        }
    }

    /// Query parameters for GET requests, credentials first.
    ///
    /// Empty for POST requests, which carry credentials in the body.
    pub fn query(&self, creds: &Credentials) -> Vec<(&'static str, String)> {
        if self.method() == HttpMethod::Post {
            return Vec::new();
        }
        let mut params = vec![
            ("username", creds.username.clone()),
            ("apikey", creds.apikey.clone()),
        ];
        match self {
            ApiRequest::Status(job)
            | ApiRequest::Info(job)
            | ApiRequest::Connect(job)
            | ApiRequest::Terminate(job)
            | ApiRequest::Shutdown(job) => params.push(job.query_param()),
            ApiRequest::Action { job, action } => {
                params.push(("action", action.clone()));
                params.push(job.query_param());
            }
            ApiRequest::Tail { job, lines } | ApiRequest::Output { job, lines } => {
                params.push(job.query_param());
                if let Some(lines) = lines {
                    params.push(("lines", lines.to_string()));
                }
            }
            ApiRequest::Jobs { name }
            | ApiRequest::Apps { name }
            | ApiRequest::Machines { name } => {
                if let Some(name) = name {
                    params.push(("name", name.clone()));
                }
            }
            ApiRequest::Submit(_) => {}
        }
        params
    }

    /// JSON body for POST requests.
    ///
    /// Submit inserts the user's credentials unless the job already has a `user` key.
    pub fn body(&self, creds: &Credentials) -> Option<Value> {
        match self {
            ApiRequest::Submit(job) => {
                let mut job = job.clone();
                if let Value::Object(map) = &mut job {
                    map.entry("user").or_insert_with(|| {
                        json!({
                            "username": creds.username,
                            "apikey": creds.apikey,
                        })
                    });
                }
                Some(job)
            }
            _ => None,
        }
    }
}

/// Response payload of a successful call.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiBody {
    Json(Value),
    Text(String),
}

impl ApiBody {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ApiBody::Json(v) => Some(v),
            ApiBody::Text(_) => None,
        }
    }

    pub fn into_json(self) -> Value {
        match self {
            ApiBody::Json(v) => v,
            ApiBody::Text(s) => Value::String(s),
        }
    }
}
