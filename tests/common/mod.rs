// In-memory Dataplane API used by the integration tests.
//
// Mirrors the parts of the real API the manager talks to: versioned configuration,
// transactions that stage a private copy until commit, positional rule lists and
// the certificate storage. Each test file only uses a subset of it.
#![allow(dead_code)]

use std::{
    collections::{BTreeMap, HashMap},
    fmt::Write,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use haproxy_manager::{
    HaproxyManager,
    ports::dataplane::{
        ApiRequest, ApiResponse, DataplaneTransport, RequestBody, TransportError,
        TransportResult,
    },
};
use http::StatusCode;
use serde_json::{Value, json};

const CONFIGURATION: &str = "/services/haproxy/configuration/";
const TRANSACTIONS: &str = "/services/haproxy/transactions";
const SSL_STORAGE: &str = "/services/haproxy/storage/ssl_certificates";
const SSL_DIR: &str = "/etc/haproxy/ssl";

#[derive(Debug, Clone, Default)]
struct Frontend {
    record: Value,
    binds: Vec<Value>,
    switching_rules: Vec<Value>,
    http_request_rules: Vec<Value>,
}

#[derive(Debug, Clone, Default)]
struct Backend {
    record: Value,
    server_templates: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default)]
struct Snapshot {
    frontends: BTreeMap<String, Frontend>,
    backends: BTreeMap<String, Backend>,
    userlists: BTreeMap<String, BTreeMap<String, Value>>,
}

#[derive(Debug)]
struct Staged {
    version: i64,
    config: Snapshot,
}

#[derive(Debug)]
struct Injected {
    method: String,
    path_fragment: String,
    status: StatusCode,
}

#[derive(Debug, Default)]
struct State {
    version: i64,
    running: Snapshot,
    transactions: HashMap<String, Staged>,
    next_transaction: u64,
    certificates: BTreeMap<String, String>,
    requests: Vec<String>,
    injected: Vec<Injected>,
    concurrent_writes: u32,
    commits: u32,
    offline: bool,
}

/// Fake Dataplane API holding the "running" configuration in memory
pub struct FakeDataplane {
    state: Mutex<State>,
}

impl FakeDataplane {
    /// Proxy with the permanent `fe_http`/`fe_https` frontends and the error backend
    pub fn new() -> Arc<Self> {
        let mut running = Snapshot::default();
        for (name, port) in [("fe_http", 80), ("fe_https", 443)] {
            running.frontends.insert(
                name.to_string(),
                Frontend {
                    record: json!({
                        "name": name,
                        "mode": "http",
                        "maxconn": 2000,
                        "default_backend": "error_backend"
                    }),
                    binds: vec![json!({"name": name, "address": "*", "port": port})],
                    ..Default::default()
                },
            );
        }
        running.backends.insert(
            "error_backend".to_string(),
            Backend {
                record: json!({"name": "error_backend", "mode": "http"}),
                ..Default::default()
            },
        );

        Arc::new(Self {
            state: Mutex::new(State {
                version: 1,
                running,
                ..Default::default()
            }),
        })
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut State) -> T) -> T {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    pub fn version(&self) -> i64 {
        self.with_state(|s| s.version)
    }

    pub fn commits(&self) -> u32 {
        self.with_state(|s| s.commits)
    }

    pub fn open_transactions(&self) -> usize {
        self.with_state(|s| s.transactions.len())
    }

    /// Rendered running configuration
    pub fn raw(&self) -> String {
        self.with_state(|s| render(&s.running))
    }

    pub fn has_frontend(&self, name: &str) -> bool {
        self.with_state(|s| s.running.frontends.contains_key(name))
    }

    pub fn has_backend(&self, name: &str) -> bool {
        self.with_state(|s| s.running.backends.contains_key(name))
    }

    /// `(backend, cond_test)` of every switching rule, in order
    pub fn switching_rules(&self, frontend: &str) -> Vec<(String, Option<String>)> {
        self.with_state(|s| {
            s.running
                .frontends
                .get(frontend)
                .map(|f| {
                    f.switching_rules
                        .iter()
                        .map(|rule| {
                            (
                                str_field(rule, "name").unwrap_or_default().to_string(),
                                str_field(rule, "cond_test").map(str::to_string),
                            )
                        })
                        .collect()
                })
                .unwrap_or_default()
        })
    }

    pub fn http_request_rules(&self, frontend: &str) -> Vec<Value> {
        self.with_state(|s| {
            s.running
                .frontends
                .get(frontend)
                .map(|f| f.http_request_rules.clone())
                .unwrap_or_default()
        })
    }

    pub fn server_template(&self, backend: &str, prefix: &str) -> Option<Value> {
        self.with_state(|s| {
            s.running
                .backends
                .get(backend)
                .and_then(|b| b.server_templates.get(prefix).cloned())
        })
    }

    pub fn user(&self, userlist: &str, username: &str) -> Option<Value> {
        self.with_state(|s| {
            s.running
                .userlists
                .get(userlist)
                .and_then(|users| users.get(username).cloned())
        })
    }

    pub fn has_userlist(&self, userlist: &str) -> bool {
        self.with_state(|s| s.running.userlists.contains_key(userlist))
    }

    pub fn certificate(&self, file: &str) -> Option<String> {
        self.with_state(|s| s.certificates.get(file).cloned())
    }

    /// `METHOD path` of every call received so far
    pub fn requests(&self) -> Vec<String> {
        self.with_state(|s| s.requests.clone())
    }

    /// Answer the next call whose method and path match with `status`
    pub fn fail_next(&self, method: &str, path_fragment: &str, status: StatusCode) {
        self.with_state(|s| {
            s.injected.push(Injected {
                method: method.to_string(),
                path_fragment: path_fragment.to_string(),
                status,
            })
        });
    }

    /// Simulate another writer committing right before each of the next `count` commits
    pub fn concurrent_writes(&self, count: u32) {
        self.with_state(|s| s.concurrent_writes = count);
    }

    /// Another writer committed: the version moves on
    pub fn bump_version(&self) {
        self.with_state(|s| s.version += 1);
    }

    /// Append a rule to the running configuration as is, bypassing transactions
    pub fn push_http_request_rule(&self, frontend: &str, rule: Value) {
        self.with_state(|s| {
            if let Some(f) = s.running.frontends.get_mut(frontend) {
                f.http_request_rules.push(rule);
            }
        });
    }

    /// Add an empty backend to the running configuration so switching rules can target it
    pub fn seed_backend(&self, name: &str) {
        self.with_state(|s| {
            s.running.backends.insert(
                name.to_string(),
                Backend {
                    record: json!({"name": name, "mode": "http"}),
                    ..Default::default()
                },
            );
        });
    }

    pub fn set_offline(&self, offline: bool) {
        self.with_state(|s| s.offline = offline);
    }
}

#[async_trait]
impl DataplaneTransport for FakeDataplane {
    async fn issue(&self, req: ApiRequest) -> TransportResult<ApiResponse> {
        self.with_state(|s| {
            if s.offline {
                return Err(TransportError::ConnectionError(
                    "connection refused".to_string(),
                ));
            }
            s.requests.push(format!("{} {}", req.method, req.path));
            Ok(s.handle(&req))
        })
    }
}

/// Manager with default settings wired to `fake`
pub fn manager(fake: &Arc<FakeDataplane>) -> HaproxyManager {
    HaproxyManager::with_defaults(fake.clone())
}

impl State {
    fn handle(&mut self, req: &ApiRequest) -> ApiResponse {
        let method = req.method.as_str();
        if let Some(position) = self
            .injected
            .iter()
            .position(|i| i.method == method && req.path.contains(&i.path_fragment))
        {
            let injected = self.injected.remove(position);
            return failure(injected.status, "injected failure");
        }

        if let Some(rest) = req.path.strip_prefix(CONFIGURATION) {
            let segments: Vec<&str> = rest.split('/').collect();
            return self.configuration(req, &segments);
        }
        if let Some(rest) = req.path.strip_prefix(TRANSACTIONS) {
            return self.transaction(req, rest.trim_start_matches('/'));
        }
        if let Some(rest) = req.path.strip_prefix(SSL_STORAGE) {
            return self.storage(req, rest.trim_start_matches('/'));
        }
        failure(StatusCode::NOT_FOUND, format!("no route for {}", req.path))
    }

    fn transaction(&mut self, req: &ApiRequest, id: &str) -> ApiResponse {
        match (req.method.as_str(), id) {
            ("POST", "") => {
                let requested = req
                    .query_value("version")
                    .and_then(|v| v.parse::<i64>().ok());
                if requested != Some(self.version) {
                    return failure(StatusCode::NOT_ACCEPTABLE, "version mismatch");
                }
                self.next_transaction += 1;
                let id = format!("tx-{}", self.next_transaction);
                self.transactions.insert(
                    id.clone(),
                    Staged {
                        version: self.version,
                        config: self.running.clone(),
                    },
                );
                respond(
                    StatusCode::CREATED,
                    json!({"id": id, "_version": self.version, "status": "in_progress"}),
                )
            }
            ("PUT", id) => {
                let Some(staged) = self.transactions.remove(id) else {
                    return failure(StatusCode::NOT_FOUND, format!("transaction {id} not found"));
                };
                if self.concurrent_writes > 0 {
                    self.concurrent_writes -= 1;
                    self.version += 1;
                }
                if staged.version != self.version {
                    return failure(
                        StatusCode::NOT_ACCEPTABLE,
                        format!(
                            "version mismatch, transaction {} vs current {}",
                            staged.version, self.version
                        ),
                    );
                }
                if let Some(problem) = dangling_reference(&staged.config) {
                    return failure(StatusCode::BAD_REQUEST, problem);
                }
                self.running = staged.config;
                self.version += 1;
                self.commits += 1;
                respond(
                    StatusCode::ACCEPTED,
                    json!({"id": id, "_version": self.version, "status": "success"}),
                )
            }
            _ => failure(StatusCode::NOT_FOUND, "unsupported transaction call"),
        }
    }

    fn configuration(&mut self, req: &ApiRequest, segments: &[&str]) -> ApiResponse {
        match segments {
            ["version"] => return respond(StatusCode::OK, json!(self.version)),
            ["raw"] => {
                return respond(
                    StatusCode::OK,
                    json!({"_version": self.version, "data": render(&self.running)}),
                );
            }
            _ => {}
        }

        let version = self.version;
        let config = match req.query_value("transaction_id") {
            Some(id) => match self.transactions.get_mut(id) {
                Some(staged) => &mut staged.config,
                None => {
                    return failure(StatusCode::NOT_FOUND, format!("transaction {id} not found"));
                }
            },
            None => &mut self.running,
        };
        resource(config, version, req, segments)
    }

    fn storage(&mut self, req: &ApiRequest, name: &str) -> ApiResponse {
        match (req.method.as_str(), name) {
            ("POST", "") => {
                let RequestBody::Multipart {
                    filename, content, ..
                } = &req.body
                else {
                    return failure(StatusCode::BAD_REQUEST, "expected a multipart upload");
                };
                if self.certificates.contains_key(filename) {
                    return failure(StatusCode::CONFLICT, format!("{filename} already exists"));
                }
                self.certificates.insert(filename.clone(), content.clone());
                respond(StatusCode::CREATED, certificate_record(filename))
            }
            ("PUT", name) => {
                let RequestBody::Text(content) = &req.body else {
                    return failure(StatusCode::BAD_REQUEST, "expected a text body");
                };
                match self.certificates.get_mut(name) {
                    Some(existing) => {
                        *existing = content.clone();
                        respond(StatusCode::ACCEPTED, certificate_record(name))
                    }
                    None => failure(StatusCode::NOT_FOUND, format!("{name} not found")),
                }
            }
            ("GET", name) => match self.certificates.contains_key(name) {
                true => respond(StatusCode::OK, certificate_record(name)),
                false => failure(StatusCode::NOT_FOUND, format!("{name} not found")),
            },
            ("DELETE", name) => deleted(self.certificates.remove(name).is_some()),
            _ => failure(StatusCode::NOT_FOUND, "unsupported storage call"),
        }
    }
}

fn resource(config: &mut Snapshot, version: i64, req: &ApiRequest, segments: &[&str]) -> ApiResponse {
    let body = match &req.body {
        RequestBody::Json(value) => value.clone(),
        _ => Value::Null,
    };

    match (req.method.as_str(), segments) {
        ("GET", ["frontends"]) => envelope(
            version,
            Value::Array(config.frontends.values().map(|f| f.record.clone()).collect()),
        ),
        ("GET", ["frontends", name]) => found(
            version,
            config.frontends.get(*name).map(|f| f.record.clone()),
        ),
        ("POST", ["frontends"]) => {
            let Some(name) = str_field(&body, "name").map(str::to_string) else {
                return failure(StatusCode::BAD_REQUEST, "frontend without name");
            };
            if config.frontends.contains_key(&name) {
                return failure(StatusCode::CONFLICT, format!("frontend {name} exists"));
            }
            config.frontends.insert(
                name,
                Frontend {
                    record: body.clone(),
                    ..Default::default()
                },
            );
            respond(StatusCode::CREATED, body)
        }
        ("DELETE", ["frontends", name]) => deleted(config.frontends.remove(*name).is_some()),

        ("POST", ["binds"]) => match frontend_mut(config, req, "frontend") {
            Some(frontend) => {
                frontend.binds.push(body.clone());
                respond(StatusCode::CREATED, body)
            }
            None => failure(StatusCode::NOT_FOUND, "parent frontend not found"),
        },

        ("GET", ["backends", name]) => {
            found(version, config.backends.get(*name).map(|b| b.record.clone()))
        }
        ("POST", ["backends"]) => {
            let Some(name) = str_field(&body, "name").map(str::to_string) else {
                return failure(StatusCode::BAD_REQUEST, "backend without name");
            };
            if config.backends.contains_key(&name) {
                return failure(StatusCode::CONFLICT, format!("backend {name} exists"));
            }
            config.backends.insert(
                name,
                Backend {
                    record: body.clone(),
                    ..Default::default()
                },
            );
            respond(StatusCode::CREATED, body)
        }
        ("DELETE", ["backends", name]) => deleted(config.backends.remove(*name).is_some()),

        ("GET", ["server_templates", prefix]) => found(
            version,
            backend_mut(config, req).and_then(|b| b.server_templates.get(*prefix).cloned()),
        ),
        ("POST", ["server_templates"]) => {
            let Some(prefix) = str_field(&body, "prefix").map(str::to_string) else {
                return failure(StatusCode::BAD_REQUEST, "server template without prefix");
            };
            let Some(backend) = backend_mut(config, req) else {
                return failure(StatusCode::NOT_FOUND, "parent backend not found");
            };
            if backend.server_templates.contains_key(&prefix) {
                return failure(StatusCode::CONFLICT, format!("template {prefix} exists"));
            }
            backend.server_templates.insert(prefix, body.clone());
            respond(StatusCode::CREATED, body)
        }
        ("PUT", ["server_templates", prefix]) => {
            match backend_mut(config, req).and_then(|b| b.server_templates.get_mut(*prefix)) {
                Some(template) => {
                    *template = body.clone();
                    respond(StatusCode::OK, body)
                }
                None => failure(StatusCode::NOT_FOUND, format!("template {prefix} not found")),
            }
        }

        ("GET", ["backend_switching_rules"]) => match frontend_mut(config, req, "frontend") {
            Some(frontend) => envelope(version, indexed(&frontend.switching_rules)),
            None => failure(StatusCode::NOT_FOUND, "parent frontend not found"),
        },
        ("POST", ["backend_switching_rules"]) => match frontend_mut(config, req, "frontend") {
            Some(frontend) => insert_indexed(&mut frontend.switching_rules, body),
            None => failure(StatusCode::NOT_FOUND, "parent frontend not found"),
        },
        ("DELETE", ["backend_switching_rules", index]) => {
            match frontend_mut(config, req, "frontend") {
                Some(frontend) => remove_indexed(&mut frontend.switching_rules, index),
                None => failure(StatusCode::NOT_FOUND, "parent frontend not found"),
            }
        }

        ("GET", ["http_request_rules"]) => match frontend_mut(config, req, "parent_name") {
            Some(frontend) => envelope(version, indexed(&frontend.http_request_rules)),
            None => failure(StatusCode::NOT_FOUND, "parent frontend not found"),
        },
        ("POST", ["http_request_rules"]) => match frontend_mut(config, req, "parent_name") {
            Some(frontend) => insert_indexed(&mut frontend.http_request_rules, body),
            None => failure(StatusCode::NOT_FOUND, "parent frontend not found"),
        },
        ("DELETE", ["http_request_rules", index]) => {
            match frontend_mut(config, req, "parent_name") {
                Some(frontend) => remove_indexed(&mut frontend.http_request_rules, index),
                None => failure(StatusCode::NOT_FOUND, "parent frontend not found"),
            }
        }

        ("GET", ["userlists", name]) => found(
            version,
            config
                .userlists
                .contains_key(*name)
                .then(|| json!({"name": name})),
        ),
        ("POST", ["userlists"]) => {
            let Some(name) = str_field(&body, "name").map(str::to_string) else {
                return failure(StatusCode::BAD_REQUEST, "userlist without name");
            };
            if config.userlists.contains_key(&name) {
                return failure(StatusCode::CONFLICT, format!("userlist {name} exists"));
            }
            config.userlists.insert(name, BTreeMap::new());
            respond(StatusCode::CREATED, body)
        }
        ("DELETE", ["userlists", name]) => deleted(config.userlists.remove(*name).is_some()),

        ("GET", ["users", username]) => found(
            version,
            users_mut(config, req).and_then(|users| users.get(*username).cloned()),
        ),
        ("POST", ["users"]) => {
            let Some(username) = str_field(&body, "username").map(str::to_string) else {
                return failure(StatusCode::BAD_REQUEST, "user without username");
            };
            let Some(users) = users_mut(config, req) else {
                return failure(StatusCode::NOT_FOUND, "parent userlist not found");
            };
            if users.contains_key(&username) {
                return failure(StatusCode::CONFLICT, format!("user {username} exists"));
            }
            users.insert(username, body.clone());
            respond(StatusCode::CREATED, body)
        }
        ("PUT", ["users", username]) => {
            match users_mut(config, req).and_then(|users| users.get_mut(*username)) {
                Some(user) => {
                    *user = body.clone();
                    respond(StatusCode::OK, body)
                }
                None => failure(StatusCode::NOT_FOUND, format!("user {username} not found")),
            }
        }
        ("DELETE", ["users", username]) => deleted(
            users_mut(config, req)
                .map(|users| users.remove(*username).is_some())
                .unwrap_or(false),
        ),

        _ => failure(
            StatusCode::NOT_FOUND,
            format!("unsupported call {} {}", req.method, req.path),
        ),
    }
}

/// HAProxy refuses a configuration where a frontend names a missing backend
fn dangling_reference(config: &Snapshot) -> Option<String> {
    config.frontends.iter().find_map(|(name, frontend)| {
        frontend
            .switching_rules
            .iter()
            .filter_map(|rule| str_field(rule, "name"))
            .chain(str_field(&frontend.record, "default_backend"))
            .find(|backend| !config.backends.contains_key(*backend))
            .map(|backend| format!("frontend {name} references unknown backend {backend}"))
    })
}

fn frontend_mut<'a>(config: &'a mut Snapshot, req: &ApiRequest, key: &str) -> Option<&'a mut Frontend> {
    req.query_value(key)
        .and_then(|name| config.frontends.get_mut(name))
}

fn backend_mut<'a>(config: &'a mut Snapshot, req: &ApiRequest) -> Option<&'a mut Backend> {
    req.query_value("backend")
        .and_then(|name| config.backends.get_mut(name))
}

fn users_mut<'a>(
    config: &'a mut Snapshot,
    req: &ApiRequest,
) -> Option<&'a mut BTreeMap<String, Value>> {
    req.query_value("userlist")
        .and_then(|name| config.userlists.get_mut(name))
}

fn indexed(rules: &[Value]) -> Value {
    Value::Array(
        rules
            .iter()
            .enumerate()
            .map(|(position, rule)| {
                let mut rule = rule.clone();
                rule["index"] = json!(position);
                rule
            })
            .collect(),
    )
}

fn insert_indexed(rules: &mut Vec<Value>, mut rule: Value) -> ApiResponse {
    let position = rule
        .get("index")
        .and_then(Value::as_u64)
        .map(|index| (index as usize).min(rules.len()))
        .unwrap_or(rules.len());
    if let Some(object) = rule.as_object_mut() {
        object.remove("index");
    }
    rules.insert(position, rule.clone());
    rule["index"] = json!(position);
    respond(StatusCode::CREATED, rule)
}

fn remove_indexed(rules: &mut Vec<Value>, index: &str) -> ApiResponse {
    match index.parse::<usize>() {
        Ok(position) if position < rules.len() => {
            rules.remove(position);
            deleted(true)
        }
        _ => failure(StatusCode::NOT_FOUND, format!("no rule at index {index}")),
    }
}

fn certificate_record(file: &str) -> Value {
    json!({"storage_name": file, "file": format!("{SSL_DIR}/{file}")})
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

fn respond(status: StatusCode, body: Value) -> ApiResponse {
    ApiResponse::new(status, serde_json::to_vec(&body).unwrap())
}

fn envelope(version: i64, data: Value) -> ApiResponse {
    respond(StatusCode::OK, json!({"_version": version, "data": data}))
}

fn found(version: i64, data: Option<Value>) -> ApiResponse {
    match data {
        Some(data) => envelope(version, data),
        None => failure(StatusCode::NOT_FOUND, "object not found"),
    }
}

fn deleted(removed: bool) -> ApiResponse {
    if removed {
        ApiResponse::new(StatusCode::NO_CONTENT, Vec::<u8>::new())
    } else {
        failure(StatusCode::NOT_FOUND, "object not found")
    }
}

fn failure(status: StatusCode, message: impl Into<String>) -> ApiResponse {
    respond(
        status,
        json!({"code": status.as_u16(), "message": message.into()}),
    )
}

fn condition_suffix(rule: &Value) -> String {
    match (str_field(rule, "cond"), str_field(rule, "cond_test")) {
        (Some(cond), Some(test)) => format!(" {cond} {test}"),
        _ => String::new(),
    }
}

fn render_http_request_rule(rule: &Value) -> String {
    let action = match str_field(rule, "type") {
        Some("auth") => format!("auth realm {}", str_field(rule, "auth_realm").unwrap_or_default()),
        Some("redirect") => format!(
            "redirect {} {} code {}",
            str_field(rule, "redir_type").unwrap_or_default(),
            str_field(rule, "redir_value").unwrap_or_default(),
            rule.get("redir_code").and_then(Value::as_u64).unwrap_or(302)
        ),
        Some(other) => other.to_string(),
        None => String::new(),
    };
    format!("http-request {action}{}", condition_suffix(rule))
}

/// HAProxy-style text of a configuration snapshot
fn render(config: &Snapshot) -> String {
    let mut out = String::new();
    for (name, frontend) in &config.frontends {
        writeln!(out, "frontend {name}").unwrap();
        if let Some(mode) = str_field(&frontend.record, "mode") {
            writeln!(out, "  mode {mode}").unwrap();
        }
        if let Some(maxconn) = frontend.record.get("maxconn").and_then(Value::as_u64) {
            writeln!(out, "  maxconn {maxconn}").unwrap();
        }
        for bind in &frontend.binds {
            writeln!(
                out,
                "  bind {}:{}",
                str_field(bind, "address").unwrap_or("*"),
                bind.get("port").and_then(Value::as_u64).unwrap_or_default()
            )
            .unwrap();
        }
        for rule in &frontend.http_request_rules {
            writeln!(out, "  {}", render_http_request_rule(rule)).unwrap();
        }
        for rule in &frontend.switching_rules {
            writeln!(
                out,
                "  use_backend {}{}",
                str_field(rule, "name").unwrap_or_default(),
                condition_suffix(rule)
            )
            .unwrap();
        }
        if let Some(default_backend) = str_field(&frontend.record, "default_backend") {
            writeln!(out, "  default_backend {default_backend}").unwrap();
        }
        out.push('\n');
    }

    for (name, backend) in &config.backends {
        writeln!(out, "backend {name}").unwrap();
        if let Some(mode) = str_field(&backend.record, "mode") {
            writeln!(out, "  mode {mode}").unwrap();
        }
        if let Some(algorithm) = backend
            .record
            .get("balance")
            .and_then(|b| str_field(b, "algorithm"))
        {
            writeln!(out, "  balance {algorithm}").unwrap();
        }
        for template in backend.server_templates.values() {
            let mut line = format!(
                "  server-template {} {} {}:{}",
                str_field(template, "prefix").unwrap_or_default(),
                str_field(template, "num_or_range").unwrap_or_default(),
                str_field(template, "fqdn").unwrap_or_default(),
                template.get("port").and_then(Value::as_u64).unwrap_or_default()
            );
            if str_field(template, "check") == Some("enabled") {
                line.push_str(" check");
            }
            if let Some(init_addr) = str_field(template, "init-addr") {
                write!(line, " init-addr {init_addr}").unwrap();
            }
            if let Some(resolvers) = str_field(template, "resolvers") {
                write!(line, " resolvers {resolvers}").unwrap();
            }
            writeln!(out, "{line}").unwrap();
        }
        out.push('\n');
    }

    for (name, users) in &config.userlists {
        writeln!(out, "userlist {name}").unwrap();
        for (username, user) in users {
            let keyword = match user.get("secure_password").and_then(Value::as_bool) {
                Some(true) => "password",
                _ => "insecure-password",
            };
            writeln!(
                out,
                "  user {username} {keyword} {}",
                str_field(user, "password").unwrap_or_default()
            )
            .unwrap();
        }
        out.push('\n');
    }
    out
}
