//! Provider implementation for Time kommune using the renovasjon REST API.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use renovasjon_core::{
    model::{Cadastral, CollectionEvent, Credential, DateRange, Property, PropertyId},
    plugin::UpstreamPlugin,
    ports::{AuthError, CollectionPort, FetchError, LoginPort, PropertyPort},
};

const DEFAULT_BASE_URL: &str = "https://renovasjon.time.kommune.no:8055";
const DEFAULT_APPLICATION_ID: &str = "2de50fc8-4ab7-426b-99cd-a5ddd0de71d1";
const DEFAULT_CLIENT_ID: &str = "100";

// Login hands the token out in this header; data requests send it back in it.
const TOKEN_HEADER: &str = "token";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Endpoint and application identity of the upstream deployment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct UpstreamSettings {
    /// Base URL without trailing slash.
    pub base_url: String,
    /// Application id sent on login (`applikasjonsId`).
    pub application_id: String,
    /// Client id sent on login (`oppdragsgiverId`).
    pub client_id: String,
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            application_id: DEFAULT_APPLICATION_ID.to_owned(),
            client_id: DEFAULT_CLIENT_ID.to_owned(),
        }
    }
}

impl UpstreamSettings {
    fn url(&self, path: &str) -> String {
        format!("{}/api/{path}", self.base_url.trim_end_matches('/'))
    }
}

/// Body of `POST /api/login`
#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    #[serde(rename = "applikasjonsId")]
    application_id: &'a str,
    #[serde(rename = "oppdragsgiverId")]
    client_id: &'a str,
}

/// Pickup as returned by /api/tomminger
#[derive(Debug, Deserialize)]
struct CollectionRecord {
    #[serde(rename = "fraksjon")]
    category: String,
    #[serde(rename = "dato")]
    date: String,
    // "fraksjonId" and "tommedatoForskjovet" exist but we don't need them
}

/// Property as returned by /api/eiendommer
#[derive(Debug, Deserialize)]
struct PropertyRecord {
    id: RawValue,
    #[serde(rename = "adresse", default)]
    address: String,
    #[serde(rename = "eier", default)]
    owner: Option<String>,
    #[serde(rename = "gNr", default)]
    gnr: Option<RawValue>,
    #[serde(rename = "bNr", default)]
    bnr: Option<RawValue>,
}

/// Identifiers come back as numbers or strings depending on the record.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawValue {
    Text(String),
    Number(i64),
}

impl fmt::Display for RawValue {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Text(text) => formatter.write_str(text),
            RawValue::Number(number) => write!(formatter, "{number}"),
        }
    }
}

impl CollectionRecord {
    fn into_event(self) -> Result<CollectionEvent, FetchError> {
        let date = parse_collection_date(&self.date)?;
        Ok(CollectionEvent::new(self.category, date))
    }
}

impl PropertyRecord {
    fn into_property(self) -> Property {
        let field = |value: Option<RawValue>| value.map(|raw| raw.to_string()).unwrap_or_default();
        Property {
            id: PropertyId(self.id.to_string()),
            address: self.address,
            owner: self.owner.unwrap_or_default(),
            cadastral: Cadastral {
                gnr: field(self.gnr),
                bnr: field(self.bnr),
            },
        }
    }
}

/// Login implementation for Time kommune.
pub struct TimeLoginPort {
    client: Client,
    settings: Arc<UpstreamSettings>,
}

impl TimeLoginPort {
    /// Create a new login port bound to the given HTTP client.
    #[must_use]
    pub fn new(client: Client, settings: Arc<UpstreamSettings>) -> Self {
        Self { client, settings }
    }
}

#[async_trait]
impl LoginPort for TimeLoginPort {
    async fn login(&self) -> Result<Credential, AuthError> {
        let response = self
            .client
            .post(self.settings.url("login"))
            .json(&LoginRequest {
                application_id: &self.settings.application_id,
                client_id: &self.settings.client_id,
            })
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(AuthError::Rejected {
                status: status.as_u16(),
            });
        }

        let token = response
            .headers()
            .get(TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::MissingToken)?;

        Ok(Credential::new(token))
    }
}

/// Collection schedule implementation for Time kommune.
pub struct TimeCollectionPort {
    client: Client,
    settings: Arc<UpstreamSettings>,
}

impl TimeCollectionPort {
    /// Create a new collection port bound to the given HTTP client.
    #[must_use]
    pub fn new(client: Client, settings: Arc<UpstreamSettings>) -> Self {
        Self { client, settings }
    }
}

#[async_trait]
impl CollectionPort for TimeCollectionPort {
    async fn collections(
        &self,
        credential: &Credential,
        property: &PropertyId,
        range: DateRange,
    ) -> Result<Vec<CollectionEvent>, FetchError> {
        let from = range.start.format(DATE_FORMAT).to_string();
        let to = range.end.format(DATE_FORMAT).to_string();

        let records = fetch_json::<Vec<CollectionRecord>>(
            self.client
                .get(self.settings.url("tomminger"))
                .query(&[
                    ("eiendomId", property.0.as_str()),
                    ("datoFra", from.as_str()),
                    ("datoTil", to.as_str()),
                ])
                .header(TOKEN_HEADER, credential.as_str()),
        )
        .await?;

        debug!(records = records.len(), "received collection records");

        let mut events = records_to_events(records)?;
        events.retain(|event| range.contains(event.date));
        Ok(events)
    }
}

/// Property search implementation for Time kommune.
pub struct TimePropertyPort {
    client: Client,
    settings: Arc<UpstreamSettings>,
}

impl TimePropertyPort {
    /// Create a new property port bound to the given HTTP client.
    #[must_use]
    pub fn new(client: Client, settings: Arc<UpstreamSettings>) -> Self {
        Self { client, settings }
    }
}

#[async_trait]
impl PropertyPort for TimePropertyPort {
    async fn search(
        &self,
        credential: &Credential,
        address: &str,
    ) -> Result<Vec<Property>, FetchError> {
        let address = address.trim();
        if address.is_empty() {
            return Ok(Vec::new());
        }

        let records = fetch_json::<Vec<PropertyRecord>>(
            self.client
                .get(self.settings.url("eiendommer"))
                .query(&[("adresse", address)])
                .header(TOKEN_HEADER, credential.as_str()),
        )
        .await?;

        Ok(records
            .into_iter()
            .map(PropertyRecord::into_property)
            .collect())
    }
}

/// Build the port bundle for the Time kommune deployment.
#[must_use]
pub fn plugin(client: Client, settings: UpstreamSettings) -> UpstreamPlugin {
    let settings = Arc::new(settings);

    UpstreamPlugin {
        name: String::from("Time kommune"),
        login_port: Arc::new(TimeLoginPort::new(client.clone(), Arc::clone(&settings))),
        collection_port: Arc::new(TimeCollectionPort::new(
            client.clone(),
            Arc::clone(&settings),
        )),
        property_port: Arc::new(TimePropertyPort::new(client, settings)),
    }
}

fn records_to_events(records: Vec<CollectionRecord>) -> Result<Vec<CollectionEvent>, FetchError> {
    let mut events = records
        .into_iter()
        .map(CollectionRecord::into_event)
        .collect::<Result<Vec<_>, _>>()?;
    events.sort_by_key(|event| event.date);
    Ok(events)
}

/// Accepts `YYYY-MM-DD`, a naive `YYYY-MM-DDThh:mm:ss`, or RFC 3339 with an
/// offset, which is converted to the local calendar day.
fn parse_collection_date(raw: &str) -> Result<NaiveDate, FetchError> {
    let trimmed = raw.trim();

    if let Ok(timestamp) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(timestamp.with_timezone(&Local).date_naive());
    }

    let date_part = trimmed.split_once('T').map_or(trimmed, |(date, _)| date);
    NaiveDate::parse_from_str(date_part, DATE_FORMAT)
        .map_err(|_err| FetchError::InvalidDate(raw.to_owned()))
}

// Small helper to fetch and decode JSON with status handling.
async fn fetch_json<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, FetchError> {
    let response = req.send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            status: status.as_u16(),
        });
    }

    let body = response.text().await?;
    Ok(serde_json::from_str(&body)?)
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    #[test]
    fn parses_plain_and_naive_timestamps() {
        assert_eq!(parse_collection_date("2024-05-06").expect("date"), date(2024, 5, 6));
        assert_eq!(
            parse_collection_date("2024-05-06T00:00:00").expect("date"),
            date(2024, 5, 6)
        );
        assert_eq!(
            parse_collection_date(" 2024-12-31T23:59:59.000 ").expect("date"),
            date(2024, 12, 31)
        );
    }

    #[test]
    fn parses_offset_timestamps_to_local_day() {
        assert_eq!(
            parse_collection_date("2024-05-06T11:00:00Z").expect("date"),
            date(2024, 5, 6)
        );
    }

    #[test]
    fn rejects_garbage_dates() {
        let err = parse_collection_date("06.05.2024").expect_err("not iso");
        assert!(matches!(err, FetchError::InvalidDate(raw) if raw == "06.05.2024"));
    }

    #[test]
    fn maps_collection_records_sorted_by_date() {
        let body = r#"[
            {"fraksjonId": 3, "fraksjon": "Restavfall", "dato": "2024-05-20T00:00:00", "tommedatoForskjovet": false},
            {"fraksjonId": 1, "fraksjon": "Matavfall", "dato": "2024-05-14T00:00:00"},
            {"fraksjonId": 2, "fraksjon": "Papir", "dato": "2024-05-16"}
        ]"#;
        let records: Vec<CollectionRecord> = serde_json::from_str(body).expect("json");

        let events = records_to_events(records).expect("events");

        assert_eq!(
            events,
            [
                CollectionEvent::new("Matavfall", date(2024, 5, 14)),
                CollectionEvent::new("Papir", date(2024, 5, 16)),
                CollectionEvent::new("Restavfall", date(2024, 5, 20)),
            ]
        );
    }

    #[test]
    fn empty_schedule_is_valid() {
        let records: Vec<CollectionRecord> = serde_json::from_str("[]").expect("json");
        assert!(records_to_events(records).expect("events").is_empty());
    }

    #[test]
    fn maps_property_records_with_mixed_id_types() {
        let body = r#"[
            {"id": "a1b2-c3", "adresse": "Storgata 1", "eier": "Ola Nordmann", "gNr": 12, "bNr": "34"},
            {"id": 99812, "adresse": "Storgata 1B"}
        ]"#;
        let records: Vec<PropertyRecord> = serde_json::from_str(body).expect("json");
        let properties: Vec<Property> = records
            .into_iter()
            .map(PropertyRecord::into_property)
            .collect();

        let [first, second] = properties.as_slice() else {
            panic!("expected two properties");
        };
        assert_eq!(first.id, PropertyId(String::from("a1b2-c3")));
        assert_eq!(first.owner, "Ola Nordmann");
        assert_eq!(first.cadastral.to_string(), "12/34");
        assert_eq!(second.id.0, "99812");
        assert_eq!(second.owner, "");
        assert_eq!(second.cadastral.to_string(), "/");
    }

    #[test]
    fn login_body_uses_upstream_field_names() {
        let settings = UpstreamSettings::default();
        let body = serde_json::to_string(&LoginRequest {
            application_id: &settings.application_id,
            client_id: &settings.client_id,
        })
        .expect("json");
        assert_eq!(
            body,
            r#"{"applikasjonsId":"2de50fc8-4ab7-426b-99cd-a5ddd0de71d1","oppdragsgiverId":"100"}"#
        );
    }

    #[test]
    fn urls_ignore_trailing_slash() {
        let settings = UpstreamSettings {
            base_url: String::from("http://localhost:8055/"),
            ..UpstreamSettings::default()
        };
        assert_eq!(settings.url("tomminger"), "http://localhost:8055/api/tomminger");
    }

    // Answers exactly one HTTP request with `response` and hands back the
    // request head as received.
    async fn serve_once(response: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let base_url = format!("http://{}", listener.local_addr().expect("addr"));

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.expect("accept");
            let mut received = Vec::new();
            let mut chunk = [0_u8; 1024];

            let head_end = loop {
                let read = stream.read(&mut chunk).await.expect("read");
                assert!(read > 0, "connection closed before request head");
                received.extend_from_slice(&chunk[..read]);
                if let Some(pos) = received.windows(4).position(|window| window == b"\r\n\r\n") {
                    break pos + 4;
                }
            };

            let head = String::from_utf8_lossy(&received[..head_end]).into_owned();
            let body_len = head
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            while received.len() < head_end + body_len {
                let read = stream.read(&mut chunk).await.expect("read body");
                if read == 0 {
                    break;
                }
                received.extend_from_slice(&chunk[..read]);
            }

            stream.write_all(response.as_bytes()).await.expect("write");
            stream.shutdown().await.expect("shutdown");
            head
        });

        (base_url, handle)
    }

    fn settings_for(base_url: String) -> Arc<UpstreamSettings> {
        Arc::new(UpstreamSettings {
            base_url,
            ..UpstreamSettings::default()
        })
    }

    #[tokio::test]
    async fn login_returns_token_header() {
        let (base_url, server) = serve_once(
            "HTTP/1.1 200 OK\r\ntoken: abc\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
        )
        .await;

        let credential = TimeLoginPort::new(Client::new(), settings_for(base_url))
            .login()
            .await
            .expect("login");

        assert_eq!(credential.as_str(), "abc");
        let head = server.await.expect("server");
        assert!(head.starts_with("POST /api/login "), "{head}");
    }

    #[tokio::test]
    async fn login_without_token_header_is_missing_token() {
        let (base_url, server) =
            serve_once("HTTP/1.1 200 OK\r\ncontent-length: 0\r\nconnection: close\r\n\r\n").await;

        let result = TimeLoginPort::new(Client::new(), settings_for(base_url))
            .login()
            .await;

        assert!(matches!(result, Err(AuthError::MissingToken)));
        server.await.expect("server");
    }

    #[tokio::test]
    async fn login_rejected_status_is_reported() {
        let (base_url, server) = serve_once(
            "HTTP/1.1 401 Unauthorized\r\ntoken: abc\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
        )
        .await;

        let result = TimeLoginPort::new(Client::new(), settings_for(base_url))
            .login()
            .await;

        assert!(matches!(result, Err(AuthError::Rejected { status: 401 })));
        server.await.expect("server");
    }

    #[tokio::test]
    async fn collections_request_carries_query_and_token() {
        let (base_url, server) = serve_once(concat!(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 106\r\nconnection: close\r\n\r\n",
            r#"[{"fraksjon":"Papir","dato":"2024-05-16T00:00:00"},"#,
            r#"{"fraksjon":"Restavfall","dato":"2024-09-01T00:00:00"}]"#,
        ))
        .await;

        let events = TimeCollectionPort::new(Client::new(), settings_for(base_url))
            .collections(
                &Credential::new("tok"),
                &PropertyId(String::from("42")),
                DateRange::lookahead(date(2024, 5, 14), 90),
            )
            .await
            .expect("collections");

        // Records outside the requested window are dropped.
        assert_eq!(events, [CollectionEvent::new("Papir", date(2024, 5, 16))]);

        let head = server.await.expect("server");
        assert!(
            head.starts_with(
                "GET /api/tomminger?eiendomId=42&datoFra=2024-05-14&datoTil=2024-08-12 "
            ),
            "{head}"
        );
        assert!(head.to_ascii_lowercase().contains("\r\ntoken: tok\r\n"), "{head}");
    }

    #[tokio::test]
    async fn collections_server_error_is_status_error() {
        let (base_url, server) = serve_once(
            "HTTP/1.1 500 Internal Server Error\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
        )
        .await;

        let result = TimeCollectionPort::new(Client::new(), settings_for(base_url))
            .collections(
                &Credential::new("tok"),
                &PropertyId(String::from("42")),
                DateRange::lookahead(date(2024, 5, 14), 90),
            )
            .await;

        assert!(matches!(result, Err(FetchError::Status { status: 500 })));
        server.await.expect("server");
    }

    #[tokio::test]
    async fn collections_html_body_is_decode_error() {
        let (base_url, server) = serve_once(
            "HTTP/1.1 200 OK\r\ncontent-type: text/html\r\ncontent-length: 13\r\nconnection: close\r\n\r\n<html></html>",
        )
        .await;

        let result = TimeCollectionPort::new(Client::new(), settings_for(base_url))
            .collections(
                &Credential::new("tok"),
                &PropertyId(String::from("42")),
                DateRange::lookahead(date(2024, 5, 14), 90),
            )
            .await;

        assert!(matches!(result, Err(FetchError::Decode(_))));
        server.await.expect("server");
    }

    #[tokio::test]
    async fn unreachable_upstream_is_a_network_error() {
        let settings = Arc::new(UpstreamSettings {
            base_url: String::from("http://127.0.0.1:9"),
            ..UpstreamSettings::default()
        });
        let client = Client::new();

        let login = TimeLoginPort::new(client.clone(), Arc::clone(&settings))
            .login()
            .await;
        assert!(matches!(login, Err(AuthError::Network(_))));

        let today = date(2024, 5, 14);
        let fetch = TimeCollectionPort::new(client, settings)
            .collections(
                &Credential::new("token"),
                &PropertyId(String::from("1")),
                DateRange::lookahead(today, 90),
            )
            .await;
        assert!(matches!(fetch, Err(FetchError::Network(_))));
    }
}
