//! Stateful stand-in for the Drive, Sheets and Gmail endpoints

use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

use super::mock_http::{CannedResponse, MockServer, RecordedRequest};

#[derive(Debug, Clone)]
pub struct FakeFile {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub content: String,
}

#[derive(Debug, Default)]
pub struct GoogleState {
    pub files: Vec<FakeFile>,
    /// (title, sheetId) per spreadsheet id
    pub sheets: Vec<(String, String, i64)>,
    pub cell_writes: Vec<Value>,
    pub permissions: Vec<String>,
    pub sent_raw: Vec<String>,
}

pub struct GoogleFake {
    pub server: MockServer,
    pub state: Arc<Mutex<GoogleState>>,
}

fn root(request: &RecordedRequest) -> String {
    format!("http://{}/", request.header("host").unwrap_or("127.0.0.1"))
}

fn drive_document(root: &str) -> Value {
    let file_id = json!({ "fileId": { "location": "path", "required": true } });
    json!({
        "rootUrl": root,
        "servicePath": "drive/v3/",
        "parameters": { "fields": { "location": "query" } },
        "resources": {
            "files": { "methods": {
                "list": { "httpMethod": "GET", "path": "files", "parameters": { "q": { "location": "query" } } },
                "create": { "httpMethod": "POST", "path": "files" },
                "get": { "httpMethod": "GET", "path": "files/{fileId}", "parameters": file_id.clone() },
                "export": {
                    "httpMethod": "GET",
                    "path": "files/{fileId}/export",
                    "parameters": { "fileId": { "location": "path" }, "mimeType": { "location": "query" } }
                },
                "update": {
                    "httpMethod": "PATCH",
                    "path": "files/{fileId}",
                    "parameters": file_id.clone(),
                    "supportsMediaUpload": true,
                    "mediaUpload": { "protocols": { "simple": { "path": "/upload/drive/v3/files/{fileId}" } } }
                }
            } },
            "permissions": { "methods": {
                "create": { "httpMethod": "POST", "path": "files/{fileId}/permissions", "parameters": file_id }
            } }
        }
    })
}

fn sheets_document(root: &str) -> Value {
    let id = json!({ "spreadsheetId": { "location": "path" } });
    json!({
        "rootUrl": root,
        "servicePath": "",
        "resources": { "spreadsheets": { "methods": {
            "get": { "httpMethod": "GET", "path": "v4/spreadsheets/{spreadsheetId}", "parameters": id.clone() },
            "batchUpdate": { "httpMethod": "POST", "path": "v4/spreadsheets/{spreadsheetId}:batchUpdate", "parameters": id }
        } } }
    })
}

fn gmail_document(root: &str) -> Value {
    json!({
        "rootUrl": root,
        "servicePath": "gmail/v1/users/",
        "resources": { "users": { "resources": { "messages": { "methods": {
            "send": {
                "httpMethod": "POST",
                "path": "{userId}/messages/send",
                "parameters": { "userId": { "location": "path" } }
            }
        } } } } }
    })
}

fn query_value(target: &str, key: &str) -> Option<String> {
    let query = target.split_once('?')?.1;
    query.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k == key).then(|| urlencoding::decode(v).map(|s| s.into_owned()).unwrap_or_default())
    })
}

fn sheets_of(state: &GoogleState, spreadsheet: &str) -> Vec<Value> {
    state
        .sheets
        .iter()
        .filter(|(s, _, _)| s == spreadsheet)
        .map(|(_, title, id)| json!({ "properties": { "title": title, "sheetId": id } }))
        .collect()
}

fn route(state: &Mutex<GoogleState>, request: &RecordedRequest) -> CannedResponse {
    let root = root(request);
    let path = request.path().to_string();
    let mut state = state.lock().unwrap();

    match (request.method.as_str(), path.as_str()) {
        ("GET", "/discovery/drive") => CannedResponse::json(drive_document(&root)),
        ("GET", "/discovery/sheets") => CannedResponse::json(sheets_document(&root)),
        ("GET", "/discovery/gmail") => CannedResponse::json(gmail_document(&root)),
        ("POST", "/token") => CannedResponse::json(json!({ "access_token": "fake-token" })),

        ("GET", "/drive/v3/files") => {
            let q = query_value(&request.target, "q").unwrap_or_default();
            let name = q
                .strip_prefix("name = '")
                .and_then(|rest| rest.strip_suffix('\''))
                .unwrap_or_default()
                .replace("\\'", "'");
            let files: Vec<Value> = state
                .files
                .iter()
                .filter(|f| f.name == name)
                .map(|f| json!({ "id": f.id, "name": f.name }))
                .collect();
            CannedResponse::json(json!({ "files": files }))
        }
        ("POST", "/drive/v3/files") => {
            let body: Value = serde_json::from_slice(&request.body).unwrap_or(Value::Null);
            let id = format!("file-{}", state.files.len() + 1);
            let mime_type = body["mimeType"].as_str().unwrap_or_default().to_string();
            if mime_type.ends_with("spreadsheet") {
                state.sheets.push((id.clone(), "Sheet1".to_string(), 0));
            }
            state.files.push(FakeFile {
                id: id.clone(),
                name: body["name"].as_str().unwrap_or_default().to_string(),
                mime_type,
                content: String::new(),
            });
            CannedResponse::json(json!({ "id": id }))
        }
        ("PATCH", p) if p.starts_with("/upload/drive/v3/files/") => {
            let id = p.trim_start_matches("/upload/drive/v3/files/");
            match state.files.iter_mut().find(|f| f.id == id) {
                Some(file) => {
                    file.content = request.body_text();
                    CannedResponse::json(json!({ "id": id }))
                }
                None => CannedResponse::text(404, "no such file"),
            }
        }
        ("GET", p) if p.starts_with("/drive/v3/files/") && p.ends_with("/export") => {
            let id = p.trim_start_matches("/drive/v3/files/").trim_end_matches("/export");
            match state.files.iter().find(|f| f.id == id) {
                Some(file) => CannedResponse::text(200, &format!("\u{feff}{}\r\n", file.content)),
                None => CannedResponse::text(404, "no such file"),
            }
        }
        ("POST", p) if p.starts_with("/drive/v3/files/") && p.ends_with("/permissions") => {
            let id = p.trim_start_matches("/drive/v3/files/").trim_end_matches("/permissions");
            state.permissions.push(id.to_string());
            CannedResponse::json(json!({ "id": "perm" }))
        }
        ("GET", p) if p.starts_with("/drive/v3/files/") => {
            let id = p.trim_start_matches("/drive/v3/files/");
            CannedResponse::json(json!({ "webViewLink": format!("https://docs.example/{id}") }))
        }

        ("GET", p) if p.starts_with("/v4/spreadsheets/") => {
            let id = p.trim_start_matches("/v4/spreadsheets/");
            CannedResponse::json(json!({ "spreadsheetId": id, "sheets": sheets_of(&state, id) }))
        }
        ("POST", p) if p.starts_with("/v4/spreadsheets/") && p.ends_with(":batchUpdate") => {
            let id = p
                .trim_start_matches("/v4/spreadsheets/")
                .trim_end_matches(":batchUpdate")
                .to_string();
            let body: Value = serde_json::from_slice(&request.body).unwrap_or(Value::Null);
            for req in body["requests"].as_array().cloned().unwrap_or_default() {
                if let Some(title) = req.pointer("/addSheet/properties/title").and_then(Value::as_str) {
                    let next = state.sheets.len() as i64 * 100 + 7;
                    state.sheets.push((id.clone(), title.to_string(), next));
                } else {
                    state.cell_writes.push(req);
                }
            }
            if body["includeSpreadsheetInResponse"] == json!(true) {
                CannedResponse::json(json!({ "updatedSpreadsheet": { "sheets": sheets_of(&state, &id) } }))
            } else {
                CannedResponse::json(json!({ "replies": [] }))
            }
        }

        ("POST", "/gmail/v1/users/me/messages/send") => {
            let body: Value = serde_json::from_slice(&request.body).unwrap_or(Value::Null);
            state.sent_raw.push(body["raw"].as_str().unwrap_or_default().to_string());
            CannedResponse::json(json!({ "id": "msg" }))
        }

        _ => CannedResponse::text(404, &format!("unexpected {} {}", request.method, request.target)),
    }
}

impl GoogleFake {
    pub async fn start() -> Self {
        let state = Arc::new(Mutex::new(GoogleState::default()));
        let routed = state.clone();
        let server = MockServer::start(move |request| route(&routed, request)).await;
        Self { server, state }
    }

    pub fn discovery_urls(&self) -> budget_pacing_monitor::google::DiscoveryUrls {
        budget_pacing_monitor::google::DiscoveryUrls {
            sheets: format!("{}/discovery/sheets", self.server.url()),
            drive: format!("{}/discovery/drive", self.server.url()),
            gmail: format!("{}/discovery/gmail", self.server.url()),
        }
    }
}
