//! InvenTree REST adapter: parts, stock items, link updates, placeholder stock.

use listcheck_recon::config::ReconConfig;
use listcheck_recon::stock::{PlaceholderRequest, StockItem};
use listcheck_recon::InventoryRecord;

use crate::exit_codes;
use crate::CliError;

use super::common::{self, FetchClient};

const TOKEN_ENV: &str = "INVENTREE_TOKEN";
const USERNAME_ENV: &str = "INVENTREE_USERNAME";
const PASSWORD_ENV: &str = "INVENTREE_PASSWORD";

fn upstream(message: impl Into<String>) -> CliError {
    CliError {
        code: exit_codes::EXIT_FETCH_UPSTREAM,
        message: message.into(),
        hint: None,
    }
}

/// InvenTree errors come back as `{"detail": "..."}` or field → messages maps.
fn extract_inventree_error(body: &str, status: u16) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(v) => match v["detail"].as_str() {
            Some(detail) => detail.to_string(),
            None if v.is_object() => v.to_string(),
            None => format!("HTTP {status}"),
        },
        Err(_) if body.trim().is_empty() => format!("HTTP {status}"),
        Err(_) => body.chars().take(200).collect(),
    }
}

// ── Client ──────────────────────────────────────────────────────────

pub(crate) struct InventreeClient {
    client: FetchClient,
    base_url: String,
    token: String,
    page_size: u32,
}

impl InventreeClient {
    pub(crate) fn new(base_url: &str, token: String, page_size: u32) -> Result<Self, CliError> {
        Ok(Self {
            client: FetchClient::new("InvenTree", extract_inventree_error)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            page_size,
        })
    }

    /// Connect using `--token` / `INVENTREE_TOKEN`, falling back to
    /// exchanging `INVENTREE_USERNAME` + `INVENTREE_PASSWORD` for a token.
    pub(crate) fn connect(
        config: &ReconConfig,
        token_flag: Option<String>,
        flag_name: &str,
    ) -> Result<Self, CliError> {
        let server = config.inventree_server().map_err(|e| {
            CliError::config(e.to_string()).with_hint("set [inventree] server in listcheck.toml")
        })?;

        let token = match common::resolve_credential(
            token_flag,
            "InvenTree token",
            flag_name,
            TOKEN_ENV,
        ) {
            Ok(token) => token,
            Err(missing) => {
                let user = std::env::var(USERNAME_ENV).ok().filter(|s| !s.is_empty());
                let pass = std::env::var(PASSWORD_ENV).ok().filter(|s| !s.is_empty());
                match (user, pass) {
                    (Some(user), Some(pass)) => request_token(&server, &user, &pass)?,
                    _ => return Err(missing.with_hint(format!(
                        "or set {USERNAME_ENV} and {PASSWORD_ENV}"
                    ))),
                }
            }
        };

        Self::new(&server, token, config.inventree.page_size)
    }

    fn auth_header(&self) -> String {
        format!("Token {}", self.token)
    }

    /// Walk a list endpoint with limit/offset paging.
    fn fetch_paged(&self, path: &str) -> Result<Vec<serde_json::Value>, CliError> {
        let url = format!("{}{}", self.base_url, path);
        let auth = self.auth_header();
        let mut items = Vec::new();
        let mut offset: u64 = 0;

        loop {
            let params = [
                ("limit", self.page_size.to_string()),
                ("offset", offset.to_string()),
            ];
            let body = self.client.send_json(|http| {
                http.get(&url)
                    .header("Authorization", &auth)
                    .header("Accept", "application/json")
                    .query(&params)
            })?;

            // Older servers ignore limit/offset and return the full list
            if let Some(all) = body.as_array() {
                items.extend(all.iter().cloned());
                break;
            }

            let page = body["results"]
                .as_array()
                .ok_or_else(|| upstream(format!("InvenTree {path} response missing 'results'")))?;
            let count = body["count"].as_u64().unwrap_or(0);

            tracing::debug!(path, offset, page = page.len(), count, "inventree page");

            if page.is_empty() {
                if offset < count {
                    return Err(upstream(format!(
                        "InvenTree {path} returned an empty page at offset {offset} of {count}"
                    )));
                }
                break;
            }

            offset += page.len() as u64;
            items.extend(page.iter().cloned());

            if offset >= count {
                break;
            }
        }

        Ok(items)
    }

    /// All parts that carry an IPN, sorted by IPN.
    pub(crate) fn fetch_parts(&self) -> Result<Vec<InventoryRecord>, CliError> {
        let raw = self.fetch_paged("/api/part/")?;
        let mut parts = Vec::with_capacity(raw.len());
        for item in &raw {
            if let Some(part) = parse_part(item)? {
                parts.push(part);
            }
        }
        parts.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        Ok(parts)
    }

    pub(crate) fn fetch_stock(&self) -> Result<Vec<StockItem>, CliError> {
        self.fetch_paged("/api/stock/")?
            .iter()
            .map(parse_stock_item)
            .collect()
    }

    /// Overwrite a part's `link` field.
    pub(crate) fn push_link(&self, pk: u64, url: &str) -> Result<(), CliError> {
        let endpoint = format!("{}/api/part/{}/", self.base_url, pk);
        let auth = self.auth_header();
        let payload = serde_json::json!({ "link": url });
        self.client
            .send_json(|http| {
                http.patch(&endpoint)
                    .header("Authorization", &auth)
                    .json(&payload)
            })
            .map_err(|e| push_failed(e, &format!("update link of part {pk}")))?;
        Ok(())
    }

    /// Create a stock item for a part. Returns the new item's pk when reported.
    pub(crate) fn create_stock_item(&self, req: &PlaceholderRequest) -> Result<Option<u64>, CliError> {
        let endpoint = format!("{}/api/stock/", self.base_url);
        let auth = self.auth_header();
        let mut payload = serde_json::json!({
            "part": req.part,
            "quantity": req.quantity,
        });
        if let Some(location) = req.location {
            payload["location"] = serde_json::json!(location);
        }
        let body = self
            .client
            .send_json(|http| {
                http.post(&endpoint)
                    .header("Authorization", &auth)
                    .json(&payload)
            })
            .map_err(|e| push_failed(e, &format!("create stock for part {}", req.part)))?;
        Ok(body["pk"].as_u64())
    }
}

/// Auth failures keep their code; anything else on a write is a push failure.
fn push_failed(err: CliError, action: &str) -> CliError {
    let code = match err.code {
        exit_codes::EXIT_FETCH_AUTH => exit_codes::EXIT_FETCH_AUTH,
        _ => exit_codes::EXIT_FETCH_PUSH,
    };
    CliError {
        code,
        message: format!("cannot {action}: {}", err.message),
        hint: None,
    }
}

fn request_token(server: &str, user: &str, pass: &str) -> Result<String, CliError> {
    let client = FetchClient::new("InvenTree", extract_inventree_error)?;
    let url = format!("{}/api/user/token/", server.trim_end_matches('/'));
    let body = client.send_json(|http| http.get(&url).basic_auth(user, Some(pass)))?;
    body["token"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| upstream("InvenTree token response missing 'token'"))
}

// ── Parsing ─────────────────────────────────────────────────────────

fn parse_part(item: &serde_json::Value) -> Result<Option<InventoryRecord>, CliError> {
    let pk = item["pk"]
        .as_u64()
        .ok_or_else(|| upstream("InvenTree part missing 'pk' field"))?;

    let ipn = item["IPN"].as_str().unwrap_or("").trim();
    if ipn.is_empty() {
        tracing::debug!(pk, "part has no IPN, skipped");
        return Ok(None);
    }

    Ok(Some(InventoryRecord {
        identifier: ipn.to_string(),
        reference_url: item["link"].as_str().unwrap_or("").trim().to_string(),
        pk: Some(pk),
    }))
}

fn parse_stock_item(item: &serde_json::Value) -> Result<StockItem, CliError> {
    let pk = item["pk"]
        .as_u64()
        .ok_or_else(|| upstream("InvenTree stock item missing 'pk' field"))?;
    let part = item["part"]
        .as_u64()
        .or_else(|| item["part"]["pk"].as_u64())
        .ok_or_else(|| upstream(format!("InvenTree stock item {pk} missing 'part' field")))?;

    // Quantity arrives as a number or a decimal string depending on server version
    let quantity = match &item["quantity"] {
        serde_json::Value::Number(n) => n.as_f64().unwrap_or(0.0),
        serde_json::Value::String(s) => s.parse().unwrap_or(0.0),
        _ => 0.0,
    };

    Ok(StockItem {
        pk,
        part,
        quantity,
        packaging: item["packaging"].as_str().map(str::to_string),
    })
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn client(server: &MockServer, page_size: u32) -> InventreeClient {
        let mut c = InventreeClient::new(&server.base_url(), "tok".into(), page_size).unwrap();
        c.client = FetchClient::new("InvenTree", extract_inventree_error)
            .unwrap()
            .with_initial_backoff(0);
        c
    }

    fn part(pk: u64, ipn: Option<&str>, link: &str) -> serde_json::Value {
        serde_json::json!({ "pk": pk, "IPN": ipn, "link": link, "name": format!("Part {pk}") })
    }

    #[test]
    fn test_extract_error() {
        assert_eq!(
            extract_inventree_error(r#"{"detail": "Invalid token."}"#, 401),
            "Invalid token."
        );
        assert_eq!(extract_inventree_error("", 500), "HTTP 500");
        assert_eq!(
            extract_inventree_error(r#"{"quantity": ["required"]}"#, 400),
            r#"{"quantity":["required"]}"#
        );
    }

    #[test]
    fn test_parse_part_without_ipn_is_skipped() {
        assert!(parse_part(&part(1, None, "")).unwrap().is_none());
        assert!(parse_part(&part(1, Some("  "), "")).unwrap().is_none());
        let p = parse_part(&part(2, Some("PART1"), "https://x/1")).unwrap().unwrap();
        assert_eq!(p.identifier, "PART1");
        assert_eq!(p.pk, Some(2));
    }

    #[test]
    fn test_parse_stock_quantity_forms() {
        let a = parse_stock_item(&serde_json::json!({"pk": 1, "part": 5, "quantity": 3.0})).unwrap();
        assert_eq!(a.quantity, 3.0);
        assert_eq!(a.packaging, None);
        let b = parse_stock_item(
            &serde_json::json!({"pk": 2, "part": {"pk": 6}, "quantity": "2.5", "packaging": "reel"}),
        )
        .unwrap();
        assert_eq!(b.part, 6);
        assert_eq!(b.quantity, 2.5);
        assert_eq!(b.packaging.as_deref(), Some("reel"));
    }

    #[test]
    fn test_parts_paginated_and_sorted() {
        let server = MockServer::start();

        let page1 = server.mock(|when, then| {
            when.method(GET)
                .path("/api/part/")
                .header("Authorization", "Token tok")
                .query_param("limit", "2")
                .query_param("offset", "0");
            then.status(200).json_body(serde_json::json!({
                "count": 3,
                "results": [part(1, Some("ZZZ"), "u1"), part(2, None, "")]
            }));
        });
        let page2 = server.mock(|when, then| {
            when.method(GET)
                .path("/api/part/")
                .query_param("limit", "2")
                .query_param("offset", "2");
            then.status(200).json_body(serde_json::json!({
                "count": 3,
                "results": [part(3, Some("AAA"), "")]
            }));
        });

        let parts = client(&server, 2).fetch_parts().unwrap();
        page1.assert();
        page2.assert();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].identifier, "AAA");
        assert_eq!(parts[0].reference_url, "");
        assert_eq!(parts[1].identifier, "ZZZ");
    }

    #[test]
    fn test_unpaginated_array_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/part/");
            then.status(200)
                .json_body(serde_json::json!([part(1, Some("A"), ""), part(2, Some("B"), "u")]));
        });
        let parts = client(&server, 100).fetch_parts().unwrap();
        assert_eq!(parts.len(), 2);
    }

    #[test]
    fn test_short_page_is_an_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/stock/");
            then.status(200)
                .json_body(serde_json::json!({ "count": 10, "results": [] }));
        });
        let err = client(&server, 100).fetch_stock().unwrap_err();
        assert_eq!(err.code, exit_codes::EXIT_FETCH_UPSTREAM);
        assert!(err.message.contains("empty page"), "message: {}", err.message);
    }

    #[test]
    fn test_auth_failure() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/part/");
            then.status(401).json_body(serde_json::json!({"detail": "Invalid token."}));
        });
        let err = client(&server, 100).fetch_parts().unwrap_err();
        assert_eq!(err.code, exit_codes::EXIT_FETCH_AUTH);
        assert!(err.message.contains("InvenTree auth failed (401): Invalid token."));
    }

    #[test]
    fn test_push_link_patches_part() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(PATCH)
                .path("/api/part/42/")
                .header("Authorization", "Token tok")
                .json_body(serde_json::json!({"link": "https://www.ebay.it/itm/7"}));
            then.status(200).json_body(serde_json::json!({"pk": 42}));
        });
        client(&server, 100)
            .push_link(42, "https://www.ebay.it/itm/7")
            .unwrap();
        m.assert();
    }

    #[test]
    fn test_push_link_failure_code() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(PATCH).path("/api/part/42/");
            then.status(404).json_body(serde_json::json!({"detail": "Not found."}));
        });
        let err = client(&server, 100).push_link(42, "u").unwrap_err();
        assert_eq!(err.code, exit_codes::EXIT_FETCH_PUSH);
        assert!(err.message.starts_with("cannot update link of part 42"));
    }

    #[test]
    fn test_create_stock_item_body() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(POST)
                .path("/api/stock/")
                .json_body(serde_json::json!({"part": 5, "quantity": 0, "location": 7}));
            then.status(201).json_body(serde_json::json!({"pk": 99, "part": 5}));
        });
        let req = PlaceholderRequest {
            identifier: "A".into(),
            part: 5,
            quantity: 0,
            location: Some(7),
        };
        let pk = client(&server, 100).create_stock_item(&req).unwrap();
        m.assert();
        assert_eq!(pk, Some(99));
    }

    #[test]
    fn test_request_token() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(GET)
                .path("/api/user/token/")
                .header_exists("Authorization");
            then.status(200).json_body(serde_json::json!({"token": "abc123"}));
        });
        let token = request_token(&server.base_url(), "admin", "secret").unwrap();
        m.assert();
        assert_eq!(token, "abc123");
    }
}
