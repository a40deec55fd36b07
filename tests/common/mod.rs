//! An in-memory Bill My Services, served through wiremock.
//!
//! It checks `wsb-hmac` the way the real service does, by rebuilding the
//! canonical string from the request it received, and enforces absolute
//! counter bounds.

#![allow(dead_code)]

use billmyservices::signer::{CanonicalFields, Signer};
use billmyservices::{Client, Counter, CounterType, CounterTypeAndCounters, CounterVersion};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use wiremock::matchers::any;
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const ACCOUNT: &str = "acme";
pub const SECRET: &str = "c2VjcmV0LWtleS0xMjM0NTY3ODkw";

#[derive(Default)]
struct State {
    counter_types: BTreeMap<String, CounterType>,
    counters: BTreeMap<(String, String), Counter>,
}

#[derive(Clone)]
pub struct FakeService {
    signer: Signer,
    state: Arc<Mutex<State>>,
}

impl FakeService {
    pub fn new() -> Self {
        Self {
            signer: Signer::from_base64(SECRET).unwrap(),
            state: Arc::default(),
        }
    }

    pub fn counter_type_codes(&self) -> Vec<String> {
        self.state.lock().unwrap().counter_types.keys().cloned().collect()
    }

    fn handle(&self, request: &Request) -> Result<ResponseTemplate, ResponseTemplate> {
        let header = |name: &str| {
            request
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let number = |name: &str| -> Result<Option<i64>, ResponseTemplate> {
            header(name)
                .map(|v| v.parse::<i64>().map_err(|_| bad_request(&format!("bad {name}"))))
                .transpose()
        };

        let segments: Vec<String> = request
            .url
            .path_segments()
            .map(|s| s.filter(|s| !s.is_empty()).map(str::to_string).collect())
            .unwrap_or_default();
        if segments.first().map(String::as_str) != Some(ACCOUNT) {
            return Err(ResponseTemplate::new(404).set_body_string("unknown account"));
        }

        let name = header("wsb-name");
        let value = number("wsb-value")?;
        let k1 = number("wsb-k1")?;
        let k2 = number("wsb-k2")?;
        let mode = match header("wsb-mode").as_deref() {
            None => None,
            Some("AbsoluteCounter") => Some(CounterVersion::AbsoluteCounter),
            Some("FrequencyCounter") => Some(CounterVersion::FrequencyCounter),
            Some(_) => return Err(bad_request("bad wsb-mode")),
        };
        let time = number("wsb-time")?.ok_or_else(|| bad_request("missing wsb-time"))?;

        let expected = self.signer.sign_fields(&CanonicalFields {
            account_id: &segments[0],
            counter_type_code: segments.get(1).map(String::as_str),
            counter_code: segments.get(2).map(String::as_str),
            name: name.as_deref(),
            value,
            k1,
            k2,
            mode,
            timestamp: time,
        });
        if header("wsb-hmac").as_deref() != Some(expected.as_str()) {
            return Err(ResponseTemplate::new(401).set_body_string("invalid signature"));
        }

        let mut state = self.state.lock().unwrap();
        let ok = ResponseTemplate::new(200);

        match (request.method.as_str(), &segments[1..]) {
            ("GET", []) => {
                let all: Vec<&CounterType> = state.counter_types.values().collect();
                Ok(ok.set_body_json(all))
            }
            ("PUT", [counter_type]) => {
                let (Some(name), Some(value), Some(k1), Some(k2), Some(mode)) = (name, value, k1, k2, mode)
                else {
                    return Err(bad_request("incomplete counter type"));
                };
                state.counter_types.insert(
                    counter_type.clone(),
                    CounterType::new(counter_type.clone(), name, value, k1, k2, mode),
                );
                Ok(ok)
            }
            ("GET", [counter_type]) => {
                let found = state.counter_types.get(counter_type).cloned().ok_or_else(not_found)?;
                let counters = state
                    .counters
                    .iter()
                    .filter(|((t, _), _)| t == counter_type)
                    .map(|(_, c)| c.clone())
                    .collect();
                Ok(ok.set_body_json(CounterTypeAndCounters::new(found, counters)))
            }
            ("DELETE", [counter_type]) => {
                state.counter_types.remove(counter_type).ok_or_else(not_found)?;
                state.counters.retain(|(t, _), _| t != counter_type);
                Ok(ok)
            }
            ("GET", [counter_type, counter]) => {
                let found = state.counter_types.get(counter_type).ok_or_else(not_found)?;
                let current = state
                    .counters
                    .get(&(counter_type.clone(), counter.clone()))
                    .cloned()
                    .unwrap_or_else(|| Counter::new(counter.clone(), 0, found.default_value()));
                Ok(ok.set_body_json(current))
            }
            ("POST", [counter_type, counter]) => {
                let delta = value.ok_or_else(|| bad_request("missing wsb-value"))?;
                let found = state.counter_types.get(counter_type).ok_or_else(not_found)?.clone();
                let key = (counter_type.clone(), counter.clone());
                let current = state
                    .counters
                    .get(&key)
                    .map(Counter::value)
                    .unwrap_or(found.default_value());
                let next = current + delta;
                if found.version() == CounterVersion::AbsoluteCounter
                    && !(found.k1()..=found.k2()).contains(&next)
                {
                    return Err(ResponseTemplate::new(409).set_body_string(format!(
                        "counter value {next} out of [{}, {}]",
                        found.k1(),
                        found.k2()
                    )));
                }
                state.counters.insert(key, Counter::new(counter.clone(), time, next));
                Ok(ok)
            }
            ("DELETE", [counter_type, counter]) => {
                state.counter_types.get(counter_type).ok_or_else(not_found)?;
                state.counters.remove(&(counter_type.clone(), counter.clone()));
                Ok(ok)
            }
            _ => Err(ResponseTemplate::new(405)),
        }
    }
}

impl Respond for FakeService {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        self.handle(request).unwrap_or_else(|rejected| rejected)
    }
}

fn bad_request(reason: &str) -> ResponseTemplate {
    ResponseTemplate::new(400).set_body_string(reason.to_string())
}

fn not_found() -> ResponseTemplate {
    ResponseTemplate::new(404).set_body_string("not found")
}

/// Starts a mock server running the fake service.
pub async fn start() -> (MockServer, FakeService) {
    let server = MockServer::start().await;
    let service = FakeService::new();

    Mock::given(any())
        .respond_with(service.clone())
        .mount(&server)
        .await;

    (server, service)
}

/// A client for `server` using the fake service's account.
pub fn client_for(server: &MockServer) -> Client {
    Client::builder()
        .service_url(server.uri())
        .unwrap()
        .account_id(ACCOUNT)
        .secret_key(SECRET)
        .build()
        .unwrap()
}
