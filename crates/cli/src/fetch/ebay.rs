//! eBay Trading API adapter: active listings via `GetMyeBaySelling`.
//!
//! The Trading API speaks XML over a single POST endpoint. The call name,
//! site and schema version travel in `X-EBAY-API-*` headers and the user
//! token in `X-EBAY-API-IAF-TOKEN`. Paging is driven by
//! `ActiveList/Pagination/PageNumber` until `TotalNumberOfPages` is reached.

use quick_xml::events::Event;
use quick_xml::Reader;

use listcheck_recon::config::EbayConfig;
use listcheck_recon::ListingRecord;

use crate::exit_codes;
use crate::CliError;

use super::common::{self, FetchClient};

const TOKEN_ENV: &str = "EBAY_TOKEN";
const CALL_NAME: &str = "GetMyeBaySelling";

/// Trading API error codes that mean the token itself is bad.
const AUTH_ERROR_CODES: &[&str] = &["931", "932", "16110", "17470", "21916984"];

fn extract_ebay_error(body: &str, status: u16) -> String {
    if let Ok(page) = parse_response(body) {
        if let Some(err) = page.errors.first() {
            return err.short_message.clone();
        }
    }
    if body.trim().is_empty() {
        format!("HTTP {status}")
    } else {
        body.chars().take(200).collect()
    }
}

// ── Client ──────────────────────────────────────────────────────────

pub(crate) struct EbayClient {
    client: FetchClient,
    endpoint: String,
    token: String,
    site_id: u32,
    compatibility_level: u32,
    entries_per_page: u32,
}

impl EbayClient {
    pub(crate) fn new(config: &EbayConfig, token: String) -> Result<Self, CliError> {
        Ok(Self {
            client: FetchClient::new("eBay", extract_ebay_error)?,
            endpoint: config.endpoint.clone(),
            token,
            site_id: config.site_id,
            compatibility_level: config.compatibility_level,
            entries_per_page: config.entries_per_page,
        })
    }

    pub(crate) fn connect(
        config: &EbayConfig,
        token_flag: Option<String>,
        flag_name: &str,
    ) -> Result<Self, CliError> {
        let token = common::resolve_credential(token_flag, "eBay token", flag_name, TOKEN_ENV)?;
        Self::new(config, token)
    }

    fn fetch_page(&self, page_number: u32) -> Result<ResponsePage, CliError> {
        let body = request_body(self.entries_per_page, page_number);
        let site = self.site_id.to_string();
        let level = self.compatibility_level.to_string();

        let text = self.client.send_text(|http| {
            http.post(&self.endpoint)
                .header("X-EBAY-API-CALL-NAME", CALL_NAME)
                .header("X-EBAY-API-SITEID", &site)
                .header("X-EBAY-API-COMPATIBILITY-LEVEL", &level)
                .header("X-EBAY-API-IAF-TOKEN", &self.token)
                .header("Content-Type", "text/xml")
                .body(body.clone())
        })?;

        let page = parse_response(&text).map_err(|e| CliError {
            code: exit_codes::EXIT_FETCH_UPSTREAM,
            message: format!("failed to parse {} XML response: {}", self.client.source_name(), e),
            hint: None,
        })?;

        match page.ack.as_str() {
            "Success" => {}
            "Warning" => {
                for err in &page.errors {
                    tracing::warn!(code = %err.code, message = %err.short_message, "eBay warning");
                }
            }
            ack => return Err(ack_failure(ack, &page.errors)),
        }

        Ok(page)
    }

    /// All active listings, in the order eBay returns them.
    pub(crate) fn fetch_active_listings(&self, quiet: bool) -> Result<Vec<ListingRecord>, CliError> {
        let progress = common::show_progress(quiet);
        let mut listings = Vec::new();
        let mut page_number = 1;

        loop {
            let page = self.fetch_page(page_number)?;
            if !page.has_active_list {
                tracing::debug!(page_number, "no ActiveList in response, stopping");
                break;
            }

            tracing::debug!(
                page_number,
                items = page.items.len(),
                total_pages = page.total_pages,
                "eBay page"
            );
            listings.extend(page.items);

            if progress {
                eprint!("\r  fetched page {}/{} ({} listings)", page_number, page.total_pages, listings.len());
            }

            if page_number >= page.total_pages {
                break;
            }
            page_number += 1;
        }

        if progress {
            eprintln!();
        }
        Ok(listings)
    }
}

fn ack_failure(ack: &str, errors: &[ApiError]) -> CliError {
    let code = if errors.iter().any(|e| AUTH_ERROR_CODES.contains(&e.code.as_str())) {
        exit_codes::EXIT_FETCH_AUTH
    } else {
        exit_codes::EXIT_FETCH_UPSTREAM
    };
    let detail = match errors.first() {
        Some(e) if e.code.is_empty() => e.short_message.clone(),
        Some(e) => format!("{} (code {})", e.short_message, e.code),
        None => "no error detail".to_string(),
    };
    CliError {
        code,
        message: format!("eBay {CALL_NAME} returned Ack={ack}: {detail}"),
        hint: (code == exit_codes::EXIT_FETCH_AUTH)
            .then(|| format!("refresh the user token in {TOKEN_ENV}")),
    }
}

fn request_body(entries_per_page: u32, page_number: u32) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<GetMyeBaySellingRequest xmlns="urn:ebay:apis:eBLBaseComponents">
  <ActiveList>
    <Include>true</Include>
    <Pagination>
      <EntriesPerPage>{entries_per_page}</EntriesPerPage>
      <PageNumber>{page_number}</PageNumber>
    </Pagination>
  </ActiveList>
  <DetailLevel>ReturnAll</DetailLevel>
</GetMyeBaySellingRequest>"#
    )
}

// ── Response parsing ────────────────────────────────────────────────

#[derive(Debug, Default, PartialEq)]
struct ApiError {
    code: String,
    short_message: String,
}

#[derive(Debug, Default)]
struct ResponsePage {
    ack: String,
    errors: Vec<ApiError>,
    has_active_list: bool,
    items: Vec<ListingRecord>,
    total_pages: u32,
}

/// Resolve `&amp;`-style and numeric character references.
fn resolve_entity(name: &str) -> Option<String> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse().ok()?,
        };
        return char::from_u32(code).map(String::from);
    }
    quick_xml::escape::resolve_predefined_entity(name).map(str::to_string)
}

fn parse_response(xml: &str) -> Result<ResponsePage, String> {
    let mut reader = Reader::from_str(xml);
    // Whitespace around entity references is significant in titles
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();

    let mut page = ResponsePage::default();
    let mut path: Vec<String> = Vec::new();
    let mut text = String::new();
    let mut item = ListingRecord::new("", "", "");
    let mut error = ApiError::default();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                match (path.last().map(String::as_str), name.as_str()) {
                    (Some(_), "ActiveList") if path.len() == 1 => page.has_active_list = true,
                    (Some("ItemArray"), "Item") => item = ListingRecord::new("", "", ""),
                    (Some(_), "Errors") if path.len() == 1 => error = ApiError::default(),
                    _ => {}
                }
                path.push(name);
                text.clear();
            }
            Ok(Event::Empty(ref e)) => {
                if path.len() == 1 && e.local_name().as_ref() == b"ActiveList" {
                    page.has_active_list = true;
                }
            }
            Ok(Event::Text(ref e)) => {
                text.push_str(&String::from_utf8_lossy(e.as_ref()));
            }
            Ok(Event::GeneralRef(ref e)) => {
                let name = String::from_utf8_lossy(&e[..]).to_string();
                match resolve_entity(&name) {
                    Some(resolved) => text.push_str(&resolved),
                    None => return Err(format!("unknown entity &{name};")),
                }
            }
            Ok(Event::CData(ref e)) => {
                text.push_str(&String::from_utf8_lossy(&e[..]));
            }
            Ok(Event::End(_)) => {
                let tail: Vec<&str> = path.iter().rev().take(3).map(String::as_str).collect();
                match tail.as_slice() {
                    ["Ack", ..] if path.len() == 2 => page.ack = text.trim().to_string(),
                    ["ItemID", "Item", "ItemArray"] => item.external_id = text.trim().to_string(),
                    ["Title", "Item", "ItemArray"] => item.title = text.trim().to_string(),
                    ["SKU", "Item", "ItemArray"] => item.sku = text.trim().to_string(),
                    ["Item", "ItemArray", ..] => {
                        page.items.push(std::mem::replace(&mut item, ListingRecord::new("", "", "")));
                    }
                    ["TotalNumberOfPages", "PaginationResult", "ActiveList"] => {
                        page.total_pages = text
                            .trim()
                            .parse()
                            .map_err(|_| format!("bad TotalNumberOfPages: {}", text.trim()))?;
                    }
                    ["ShortMessage", "Errors", ..] => error.short_message = text.trim().to_string(),
                    ["ErrorCode", "Errors", ..] => error.code = text.trim().to_string(),
                    ["Errors", ..] if path.len() == 2 => {
                        page.errors.push(std::mem::take(&mut error));
                    }
                    _ => {}
                }
                path.pop();
                text.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("at byte {}: {}", reader.buffer_position(), e)),
            _ => {}
        }
        buf.clear();
    }

    if page.ack.is_empty() {
        return Err("response has no Ack element".to_string());
    }
    Ok(page)
}

// ── Tests ───────────────────────────────────────────────────────────
