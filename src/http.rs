// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Blocking JSON transport plus an iterative paginator that walks every page of an endpoint
// role: fetch/pagination
// inputs: Endpoint (url, initial query, items location, continuation strategy); auth headers/query per platform
// outputs: Pages iterator of parsed bodies + item arrays; fetch_all concatenation; single-object helpers
// side_effects: Network calls through ureq; fixture transport reads env vars
// invariants:
// - Pages preserve server order; no sorting, no dedup
// - Exactly one request per page; iteration stops at the first missing continuation
// - Any non-2xx aborts the walk: 4xx => Fetch, 5xx/network => TransientFetch; no retries here
// errors: StatsError::{Fetch, TransientFetch}
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::cell::Cell;

use crate::error::{Result, StatsError};
use crate::ext::serde_json::JsonFetch;

pub const FIXTURES_ENV: &str = "CONTRIB_STATS_HTTP_FIXTURES";
pub const FIXTURES_FILE_ENV: &str = "CONTRIB_STATS_HTTP_FIXTURES_FILE";

/// Raw response as seen by the paginator.
#[derive(Debug, Clone)]
pub struct HttpResponse {
  pub status: u16,
  /// Target of a `Link: <...>; rel="next"` header, when present.
  pub next_link: Option<String>,
  pub body: String,
}

// --- Trait seam for HTTP ---
pub trait Transport {
  /// Issue a GET. `query` is appended to `url` (which may already carry a query).
  fn get(&self, url: &str, query: &[(String, String)]) -> Result<HttpResponse>;
}

/// How the next page is located once a page has been read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pagination {
  Single,
  /// Follow the literal URL of the `rel="next"` link header.
  LinkHeader,
  /// Body field holding an opaque token, sent back as `param`.
  BodyCursor { field: &'static str, param: &'static str },
  /// 1- or 0-based page numbers. Stops at `total_pages_field` when the body
  /// reports it, otherwise at the first short page.
  Numbered {
    param: &'static str,
    first: u32,
    page_size: usize,
    total_pages_field: Option<&'static str>,
  },
  /// Offset/count windows bounded by a total reported in the body.
  Offset {
    offset_param: &'static str,
    count_param: &'static str,
    page_size: usize,
    total_field: &'static str,
  },
}

#[derive(Debug, Clone)]
pub struct Endpoint {
  pub url: String,
  pub query: Vec<(String, String)>,
  /// Body field holding the page's items; `None` means the body is the array.
  pub items_at: Option<&'static str>,
  pub pagination: Pagination,
}

impl Endpoint {
  pub fn new(url: impl Into<String>) -> Self {
    Self {
      url: url.into(),
      query: Vec::new(),
      items_at: None,
      pagination: Pagination::Single,
    }
  }

  pub fn param(mut self, key: &str, value: impl Into<String>) -> Self {
    self.query.push((key.to_string(), value.into()));
    self
  }

  pub fn items_at(mut self, field: &'static str) -> Self {
    self.items_at = Some(field);
    self
  }

  pub fn paginate(mut self, pagination: Pagination) -> Self {
    self.pagination = pagination;
    self
  }

  pub fn pages<'a>(&'a self, transport: &'a dyn Transport) -> Pages<'a> {
    Pages::new(transport, self)
  }
}

/// One parsed page: the full body (for side data such as column maps) and its items.
#[derive(Debug, Clone)]
pub struct Page {
  pub body: serde_json::Value,
  pub items: Vec<serde_json::Value>,
}

#[derive(Debug)]
enum Cursor {
  Params(Vec<(String, String)>),
  Link(String),
  Done,
}

/// Lazy, forward-only walk over an endpoint's pages. Restart by calling
/// `Endpoint::pages` again; there is no mid-stream resumption.
pub struct Pages<'a> {
  transport: &'a dyn Transport,
  endpoint: &'a Endpoint,
  cursor: Cursor,
  page_no: u32,
  fetched: usize,
}

impl<'a> Pages<'a> {
  fn new(transport: &'a dyn Transport, endpoint: &'a Endpoint) -> Self {
    let start = match &endpoint.pagination {
      Pagination::Numbered { param, first, .. } => vec![(param.to_string(), first.to_string())],
      Pagination::Offset {
        offset_param,
        count_param,
        page_size,
        ..
      } => vec![
        (offset_param.to_string(), "0".to_string()),
        (count_param.to_string(), page_size.to_string()),
      ],
      _ => Vec::new(),
    };
    let page_no = match &endpoint.pagination {
      Pagination::Numbered { first, .. } => *first,
      _ => 0,
    };

    Self {
      transport,
      endpoint,
      cursor: Cursor::Params(start),
      page_no,
      fetched: 0,
    }
  }

  fn next_cursor(&self, resp: &HttpResponse, page: &Page) -> Cursor {
    match &self.endpoint.pagination {
      Pagination::Single => Cursor::Done,
      Pagination::LinkHeader => match &resp.next_link {
        Some(link) => Cursor::Link(link.clone()),
        None => Cursor::Done,
      },
      Pagination::BodyCursor { field, param } => match page.body.fetch(field).str() {
        Some(token) => Cursor::Params(vec![(param.to_string(), token.to_string())]),
        None => Cursor::Done,
      },
      Pagination::Numbered {
        param,
        first,
        page_size,
        total_pages_field,
      } => {
        let more = match total_pages_field.and_then(|f| page.body.fetch(f).to::<u64>()) {
          Some(total) => u64::from(self.page_no - first + 1) < total,
          None => !page.items.is_empty() && page.items.len() >= *page_size,
        };
        if more {
          Cursor::Params(vec![(param.to_string(), (self.page_no + 1).to_string())])
        } else {
          Cursor::Done
        }
      }
      Pagination::Offset {
        offset_param,
        count_param,
        page_size,
        total_field,
      } => {
        let total = page.body.fetch(total_field).to::<usize>().unwrap_or(0);
        if !page.items.is_empty() && self.fetched < total {
          Cursor::Params(vec![
            (offset_param.to_string(), self.fetched.to_string()),
            (count_param.to_string(), page_size.to_string()),
          ])
        } else {
          Cursor::Done
        }
      }
    }
  }
}

impl Iterator for Pages<'_> {
  type Item = Result<Page>;

  fn next(&mut self) -> Option<Self::Item> {
    let (url, query) = match std::mem::replace(&mut self.cursor, Cursor::Done) {
      Cursor::Done => return None,
      Cursor::Link(link) => (link, Vec::new()),
      Cursor::Params(extra) => (self.endpoint.url.clone(), merge_query(&self.endpoint.query, extra)),
    };

    let resp = match self.transport.get(&url, &query).and_then(|r| check_status(&url, r)) {
      Ok(r) => r,
      Err(e) => return Some(Err(e)),
    };

    let page = match parse_page(&url, &resp.body, self.endpoint.items_at) {
      Ok(p) => p,
      Err(e) => return Some(Err(e)),
    };

    self.fetched += page.items.len();
    log::debug!("fetched page {} of {} ({} items)", self.page_no, url, page.items.len());

    self.cursor = self.next_cursor(&resp, &page);
    self.page_no += 1;

    Some(Ok(page))
  }
}

/// Overlay continuation parameters on the endpoint's initial query.
fn merge_query(base: &[(String, String)], extra: Vec<(String, String)>) -> Vec<(String, String)> {
  let mut out: Vec<(String, String)> = base
    .iter()
    .filter(|(k, _)| !extra.iter().any(|(ek, _)| ek == k))
    .cloned()
    .collect();
  out.extend(extra);
  out
}

fn check_status(url: &str, resp: HttpResponse) -> Result<HttpResponse> {
  match resp.status {
    200..=299 => Ok(resp),
    400..=499 => Err(StatsError::Fetch {
      url: url.to_string(),
      status: Some(resp.status),
      message: error_message(&resp.body),
    }),
    s => Err(StatsError::TransientFetch {
      url: url.to_string(),
      message: format!("HTTP {s}"),
    }),
  }
}

/// Best-effort human message out of an error body.
fn error_message(body: &str) -> String {
  let parsed = serde_json::from_str::<serde_json::Value>(body).ok();
  let from_json = parsed.as_ref().and_then(|v| {
    v.fetch("message")
      .str()
      .or_else(|| v.fetch("error").str())
      .or_else(|| v.fetch("error.message").str())
      .map(str::to_string)
  });

  from_json.unwrap_or_else(|| body.lines().next().unwrap_or("").trim().to_string())
}

fn parse_page(url: &str, body: &str, items_at: Option<&str>) -> Result<Page> {
  let body: serde_json::Value = serde_json::from_str(body).map_err(|e| StatsError::Fetch {
    url: url.to_string(),
    status: None,
    message: format!("malformed JSON body: {e}"),
  })?;

  let items = match items_at {
    None => match body.as_array() {
      Some(arr) => arr.clone(),
      None => {
        return Err(StatsError::Fetch {
          url: url.to_string(),
          status: None,
          message: "expected a JSON array".into(),
        })
      }
    },
    Some(field) => body.fetch(field).items().to_vec(),
  };

  Ok(Page { body, items })
}

/// Retrieve every item of a paginated endpoint, concatenated in server order.
pub fn fetch_all(transport: &dyn Transport, endpoint: &Endpoint) -> Result<Vec<serde_json::Value>> {
  let mut out = Vec::new();

  for page in endpoint.pages(transport) {
    out.extend(page?.items);
  }

  log::debug!("{}: {} items", endpoint.url, out.len());

  Ok(out)
}

/// Fetch a single JSON document (no pagination).
pub fn get_json(transport: &dyn Transport, url: &str, query: &[(String, String)]) -> Result<serde_json::Value> {
  let resp = check_status(url, transport.get(url, query)?)?;

  serde_json::from_str(&resp.body).map_err(|e| StatsError::Fetch {
    url: url.to_string(),
    status: None,
    message: format!("malformed JSON body: {e}"),
  })
}

/// Like `get_json`, but a 404 is an absent entity rather than an error.
pub fn get_json_opt(
  transport: &dyn Transport,
  url: &str,
  query: &[(String, String)],
) -> Result<Option<serde_json::Value>> {
  match get_json(transport, url, query) {
    Ok(v) => Ok(Some(v)),
    Err(e) if e.is_not_found() => Ok(None),
    Err(e) => Err(e),
  }
}

/// Extract the `rel="next"` target from an RFC 8288 `Link` header.
pub fn parse_link_next(header: &str) -> Option<String> {
  header.split(',').find_map(|part| {
    let mut segs = part.split(';');
    let target = segs.next()?.trim();
    let is_next = segs.any(|p| {
      let p = p.trim();
      p == "rel=\"next\"" || p == "rel=next"
    });

    if is_next {
      target
        .strip_prefix('<')
        .and_then(|t| t.strip_suffix('>'))
        .map(str::to_string)
    } else {
      None
    }
  })
}

// --- ureq-backed transport ---
pub struct UreqTransport {
  agent: ureq::Agent,
  headers: Vec<(String, String)>,
  query: Vec<(String, String)>,
}

impl UreqTransport {
  /// `headers` and `query` are sent with every request (auth, accept, API keys).
  pub fn new(headers: Vec<(String, String)>, query: Vec<(String, String)>) -> Self {
    let agent: ureq::Agent = ureq::Agent::config_builder()
      .http_status_as_error(false)
      .build()
      .into();

    Self { agent, headers, query }
  }
}

impl Transport for UreqTransport {
  fn get(&self, url: &str, query: &[(String, String)]) -> Result<HttpResponse> {
    let mut req = self.agent.get(url);

    for (k, v) in &self.headers {
      req = req.header(k.as_str(), v.as_str());
    }

    for (k, v) in self.query.iter().chain(query.iter()) {
      req = req.query(k, v);
    }

    let mut resp = req.call().map_err(|e| StatsError::TransientFetch {
      url: url.to_string(),
      message: e.to_string(),
    })?;

    let status = resp.status().as_u16();
    let next_link = resp
      .headers()
      .get("link")
      .and_then(|h| h.to_str().ok())
      .and_then(parse_link_next);
    let body = resp.body_mut().read_to_string().map_err(|e| StatsError::TransientFetch {
      url: url.to_string(),
      message: e.to_string(),
    })?;

    Ok(HttpResponse { status, next_link, body })
  }
}

// --- Fixture-backed transport (env or in-memory) ---
//
// Routes are keyed by `url?k=v&k=v` (query in request order, unencoded);
// a route keyed by the bare url matches any query. Each route is
// `{ "status": 200, "body": <json>, "next": "<url>" }` with status and next optional.
pub struct FixtureTransport {
  routes: serde_json::Map<String, serde_json::Value>,
  requests: Cell<usize>,
  log: std::cell::RefCell<Vec<String>>,
}

impl FixtureTransport {
  pub fn new(routes: serde_json::Value) -> Self {
    let routes = match routes {
      serde_json::Value::Object(map) => map,
      _ => serde_json::Map::new(),
    };

    Self {
      routes,
      requests: Cell::new(0),
      log: std::cell::RefCell::new(Vec::new()),
    }
  }

  /// Build from `CONTRIB_STATS_HTTP_FIXTURES` (inline JSON) or
  /// `CONTRIB_STATS_HTTP_FIXTURES_FILE`; `None` when neither is set.
  pub fn from_env() -> Result<Option<Self>> {
    let raw = if let Ok(s) = std::env::var(FIXTURES_ENV) {
      s
    } else if let Ok(path) = std::env::var(FIXTURES_FILE_ENV) {
      std::fs::read_to_string(&path)?
    } else {
      return Ok(None);
    };

    let routes = serde_json::from_str::<serde_json::Value>(&raw)
      .map_err(|e| StatsError::config(format!("invalid HTTP fixtures: {e}")))?;

    Ok(Some(Self::new(routes)))
  }

  pub fn request_count(&self) -> usize {
    self.requests.get()
  }

  pub fn requested(&self) -> Vec<String> {
    self.log.borrow().clone()
  }

  fn route_key(url: &str, query: &[(String, String)]) -> String {
    if query.is_empty() {
      return url.to_string();
    }
    let qs = query.iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join("&");
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{url}{sep}{qs}")
  }
}

impl Transport for FixtureTransport {
  fn get(&self, url: &str, query: &[(String, String)]) -> Result<HttpResponse> {
    self.requests.set(self.requests.get() + 1);

    let key = Self::route_key(url, query);
    self.log.borrow_mut().push(key.clone());

    let bare = url.split('?').next().unwrap_or(url);
    let Some(route) = self.routes.get(&key).or_else(|| self.routes.get(bare)) else {
      return Ok(HttpResponse {
        status: 404,
        next_link: None,
        body: serde_json::json!({ "message": "404 Not Found" }).to_string(),
      });
    };

    Ok(HttpResponse {
      status: route.fetch("status").to::<u16>().unwrap_or(200),
      next_link: route.fetch("next").str().map(str::to_string),
      body: route.fetch("body").value().cloned().unwrap_or(serde_json::Value::Null).to_string(),
    })
  }
}

/// Fixture transport when the env asks for one, otherwise a live ureq transport.
pub fn build_transport(headers: Vec<(String, String)>, query: Vec<(String, String)>) -> Result<Box<dyn Transport>> {
  if let Some(fixtures) = FixtureTransport::from_env()? {
    log::info!("using HTTP fixtures instead of the network");
    return Ok(Box::new(fixtures));
  }

  Ok(Box::new(UreqTransport::new(headers, query)))
}
