//! PostgREST gateway (the hosted Supabase backend).
//!
//! Blocking reqwest client, no Tokio runtime required. Every request carries
//! the client-wide timeout; a timeout surfaces as [`GatewayError::Timeout`].

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;

use crate::gateway::{Collection, Filter, FilterOp, GatewayError, PersistenceGateway, Query, Record};

const PREFER_REPRESENTATION: &str = "return=representation";

#[derive(Clone)]
pub struct RestGateway {
    http: Client,
    base_url: String,
}

impl RestGateway {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(api_key)
            .map_err(|_| GatewayError::InvalidRequest("API key contains invalid characters".into()))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|_| GatewayError::InvalidRequest("API key contains invalid characters".into()))?;
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .user_agent(format!("shopdash/{}", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, collection: Collection) -> String {
        format!("{}/rest/v1/{}", self.base_url, collection.table())
    }

    fn send(&self, request: RequestBuilder) -> Result<Response, GatewayError> {
        let resp = request.send().map_err(transport_error)?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v["message"].as_str().map(String::from))
            .unwrap_or(body);

        Err(match status {
            StatusCode::CONFLICT => GatewayError::Conflict(message),
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => GatewayError::Timeout(message),
            _ => GatewayError::Http {
                status: status.as_u16(),
                message,
            },
        })
    }

    fn rows(resp: Response) -> Result<Vec<Record>, GatewayError> {
        let rows: Vec<Value> = resp.json().map_err(|e| GatewayError::Decode(e.to_string()))?;
        rows.into_iter()
            .map(|row| match row {
                Value::Object(map) => Ok(map),
                other => Err(GatewayError::Decode(format!("expected a row object, got {}", other))),
            })
            .collect()
    }
}

impl PersistenceGateway for RestGateway {
    fn find(&self, collection: Collection, query: &Query) -> Result<Vec<Record>, GatewayError> {
        let mut params = vec![(
            "select".to_string(),
            query.columns.as_ref().map(|c| c.join(",")).unwrap_or_else(|| "*".into()),
        )];
        params.extend(query.filters.iter().map(filter_param));
        if let Some(order) = &query.order {
            let dir = if order.ascending { "asc" } else { "desc" };
            params.push(("order".into(), format!("{}.{}", order.column, dir)));
        }
        if let Some(limit) = query.limit {
            params.push(("limit".into(), limit.to_string()));
        }

        tracing::debug!(%collection, "rest find");
        let resp = self.send(self.http.get(self.endpoint(collection)).query(&params))?;
        Self::rows(resp)
    }

    fn insert(&self, collection: Collection, record: Record) -> Result<Record, GatewayError> {
        tracing::debug!(%collection, "rest insert");
        let resp = self.send(
            self.http
                .post(self.endpoint(collection))
                .header("Prefer", PREFER_REPRESENTATION)
                .json(&vec![Value::Object(record)]),
        )?;
        Self::rows(resp)?
            .into_iter()
            .next()
            .ok_or_else(|| GatewayError::Decode(format!("insert into {} returned no row", collection)))
    }

    fn update(&self, collection: Collection, id: &str, patch: Record) -> Result<Record, GatewayError> {
        tracing::debug!(%collection, id, "rest update");
        let resp = self.send(
            self.http
                .patch(self.endpoint(collection))
                .query(&[("id", format!("eq.{}", id))])
                .header("Prefer", PREFER_REPRESENTATION)
                .json(&Value::Object(patch)),
        )?;
        Self::rows(resp)?
            .into_iter()
            .next()
            .ok_or_else(|| GatewayError::NotFound(format!("{} id={}", collection, id)))
    }

    fn delete_where(&self, collection: Collection, filter: &Filter) -> Result<(), GatewayError> {
        tracing::debug!(%collection, "rest delete");
        self.send(
            self.http
                .delete(self.endpoint(collection))
                .query(&[filter_param(filter)]),
        )?;
        Ok(())
    }

    fn count(&self, collection: Collection, filters: &[Filter]) -> Result<u64, GatewayError> {
        let mut params = vec![("select".to_string(), "id".to_string())];
        params.extend(filters.iter().map(filter_param));

        let resp = self.send(
            self.http
                .get(self.endpoint(collection))
                .query(&params)
                .header("Prefer", "count=exact"),
        )?;

        let from_header = resp
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total);

        match from_header {
            Some(total) => Ok(total),
            None => Ok(Self::rows(resp)?.len() as u64),
        }
    }
}

fn filter_param(filter: &Filter) -> (String, String) {
    let op = match filter.op {
        FilterOp::Eq => "eq",
        FilterOp::Neq => "neq",
    };
    let value = match &filter.value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    };
    (filter.column.clone(), format!("{}.{}", op, value))
}

/// `0-24/3573` or `*/0` -> total
fn parse_content_range_total(range: &str) -> Option<u64> {
    range.rsplit_once('/').and_then(|(_, total)| total.parse().ok())
}

fn transport_error(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Timeout(e.to_string())
    } else {
        GatewayError::Network(e.to_string())
    }
}
