//! ISDB dashboard server.
//!
//! Keeps one [`Catalog`] in memory and serves it as:
//! - a single-page dashboard (`/`) that draws the sunburst with Plotly and
//!   reads everything else from the JSON endpoints below,
//! - a static glossary page (`/glossary.html`),
//! - read-only JSON endpoints for figures, tags, listings and the glossary.
//!
//! The catalog never changes after startup, so handlers share it through an
//! `Arc` without locking. Restart the server to pick up a new spreadsheet.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Result};
use bytes::Bytes;
use colored::Colorize;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::header::CONTENT_TYPE;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use url::form_urlencoded;

use isdb_catalog::glossary::Glossary;
use isdb_catalog::listing::PROMPT;
use isdb_catalog::taxonomy::strip_marker;
use isdb_catalog::{Catalog, ClickPoint, Dimension, Listing, SunburstFigure};

const READY_VERSION: &str = "isdb_server_ready_v1";
const STATUS_VERSION: &str = "isdb_server_status_v1";

#[derive(Debug, Clone)]
pub(crate) struct ServerConfig {
    pub listen: SocketAddr,
    pub ready_file: Option<PathBuf>,
    pub data: PathBuf,
}

struct ServerState {
    config: ServerConfig,
    catalog: Catalog,
    loaded_at_unix_secs: u64,
}

fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

pub(crate) fn cmd_serve(source: &crate::SourceArgs, args: crate::ServeArgs) -> Result<()> {
    let catalog = source.load()?;
    let config = ServerConfig {
        listen: args.listen,
        ready_file: args.ready_file,
        data: source.data_path(),
    };

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| anyhow!("failed to initialize tokio runtime: {e}"))?;

    rt.block_on(async move { serve_async(config, catalog).await })
}

async fn serve_async(config: ServerConfig, catalog: Catalog) -> Result<()> {
    let state = Arc::new(ServerState {
        config: config.clone(),
        catalog,
        loaded_at_unix_secs: now_unix_secs(),
    });

    let listener = TcpListener::bind(config.listen)
        .await
        .map_err(|e| anyhow!("serve: failed to bind {}: {e}", config.listen))?;
    let bound = listener
        .local_addr()
        .map_err(|e| anyhow!("serve: failed to read bound addr: {e}"))?;

    eprintln!(
        "{} listening on http://{} ({} installations)",
        "serve".green().bold(),
        bound,
        state.catalog.dataset().len()
    );
    if let Some(path) = config.ready_file.as_ref() {
        write_ready_file(path, bound)?;
    }

    loop {
        let (stream, peer) = listener
            .accept()
            .await
            .map_err(|e| anyhow!("serve: accept failed: {e}"))?;
        let io = TokioIo::new(stream);
        let state = state.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req| handle_request(req, state.clone()));
            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                tracing::warn!(%peer, error = %e, "connection error");
            }
        });
    }
}

/// Written to a sibling temp file first so pollers never read a partial file.
fn write_ready_file(path: &std::path::Path, bound: SocketAddr) -> Result<()> {
    let payload = serde_json::json!({
        "version": READY_VERSION,
        "addr": bound.to_string(),
        "pid": std::process::id(),
    });
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, serde_json::to_string_pretty(&payload)?)
        .map_err(|e| anyhow!("serve: failed to write {}: {e}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .map_err(|e| anyhow!("serve: failed to write {}: {e}", path.display()))?;
    Ok(())
}

async fn handle_request(
    req: Request<Incoming>,
    state: Arc<ServerState>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let resp = route(&state, &method, &path, req.uri().query());
    tracing::debug!(%method, %path, status = resp.status().as_u16(), "request");
    Ok(resp)
}

fn route(state: &ServerState, method: &Method, path: &str, query: Option<&str>) -> Response<Full<Bytes>> {
    match (method, path) {
        (&Method::GET, "/healthz") => text_response(StatusCode::OK, "ok\n"),
        (&Method::GET, "/status") => json_response(StatusCode::OK, &status_payload(state)),
        (&Method::GET, "/dimensions") => json_response(StatusCode::OK, &dimensions_payload()),
        (&Method::GET, "/sunburst") => match sunburst_payload(state, query) {
            Ok(v) => json_response(StatusCode::OK, &v),
            Err(e) => json_error(StatusCode::BAD_REQUEST, &e.to_string()),
        },
        (&Method::GET, "/tags") => json_response(StatusCode::OK, &state.catalog.tags().dropdown_options()),
        (&Method::GET, "/installations") => match installations_payload(state, query) {
            Ok(v) => json_response(StatusCode::OK, &v),
            Err(e) => json_error(StatusCode::BAD_REQUEST, &e.to_string()),
        },
        (&Method::GET, "/glossary") => json_response(StatusCode::OK, &state.catalog.glossary()),
        (&Method::GET, "/") | (&Method::GET, "/index.html") => match render_dashboard(&state.catalog) {
            Ok(html) => html_response(StatusCode::OK, html),
            Err(e) => json_error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
        },
        (&Method::GET, "/glossary.html") => {
            html_response(StatusCode::OK, render_glossary_html(&state.catalog.glossary()))
        }
        _ => json_error(StatusCode::NOT_FOUND, "not found"),
    }
}

fn respond(status: StatusCode, content_type: &'static str, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, content_type)
        .body(Full::new(body.into()))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::from_static(b"internal error"))))
}

fn text_response(status: StatusCode, body: &'static str) -> Response<Full<Bytes>> {
    respond(status, "text/plain; charset=utf-8", body)
}

fn html_response(status: StatusCode, body: String) -> Response<Full<Bytes>> {
    respond(status, "text/html; charset=utf-8", body)
}

fn json_response<T: serde::Serialize>(status: StatusCode, value: &T) -> Response<Full<Bytes>> {
    match serde_json::to_vec(value) {
        Ok(body) => respond(status, "application/json", body),
        Err(e) => {
            tracing::warn!(error = %e, "failed to serialize response");
            respond(StatusCode::INTERNAL_SERVER_ERROR, "application/json", &b"{\"error\":\"serialize\"}"[..])
        }
    }
}

fn json_error(status: StatusCode, msg: &str) -> Response<Full<Bytes>> {
    json_response(status, &serde_json::json!({ "error": msg }))
}

/// Single-valued parameters; the last occurrence wins.
fn parse_query_params(query: Option<&str>) -> HashMap<String, String> {
    parse_query_pairs(query).into_iter().collect()
}

fn parse_query_pairs(query: Option<&str>) -> Vec<(String, String)> {
    let Some(q) = query else {
        return Vec::new();
    };
    form_urlencoded::parse(q.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// `dimension` parameter, defaulting to Artistic Intention like the dashboard.
fn dimension_param(params: &HashMap<String, String>) -> Result<Dimension> {
    match params.get("dimension").map(|s| s.trim()).filter(|s| !s.is_empty()) {
        Some(raw) => Ok(Dimension::parse(raw)?),
        None => Ok(Dimension::ArtisticIntention),
    }
}

fn status_payload(state: &ServerState) -> serde_json::Value {
    let catalog = &state.catalog;
    let nodes: serde_json::Map<String, serde_json::Value> = catalog
        .hierarchies()
        .iter()
        .map(|h| (h.dimension.code().to_string(), serde_json::json!(h.len())))
        .collect();
    serde_json::json!({
        "version": STATUS_VERSION,
        "listen": state.config.listen.to_string(),
        "data": state.config.data.display().to_string(),
        "taxonomy": catalog.taxonomy().version,
        "loaded_at_unix_secs": state.loaded_at_unix_secs,
        "installations": catalog.dataset().len(),
        "tags": catalog.tags().len(),
        "nodes": nodes,
    })
}

fn dimensions_payload() -> serde_json::Value {
    let dims: Vec<serde_json::Value> = Dimension::ALL
        .into_iter()
        .map(|d| {
            serde_json::json!({
                "code": d.code(),
                "name": d.name(),
                "colorscale": d.colorscale(),
            })
        })
        .collect();
    serde_json::Value::Array(dims)
}

fn sunburst_payload(state: &ServerState, query: Option<&str>) -> Result<SunburstFigure> {
    let params = parse_query_params(query);
    let dimension = dimension_param(&params)?;
    Ok(state.catalog.figure(dimension))
}

fn installations_payload(state: &ServerState, query: Option<&str>) -> Result<Listing> {
    let pairs = parse_query_pairs(query);
    let params: HashMap<String, String> = pairs.iter().cloned().collect();
    let dimension = dimension_param(&params)?;

    let tags: Vec<String> = pairs
        .iter()
        .filter(|(k, v)| k == "tag" && !v.is_empty())
        .map(|(_, v)| v.clone())
        .collect();
    let click = params
        .get("click_id")
        .filter(|id| !id.is_empty())
        .map(|id| ClickPoint {
            id: id.clone(),
            label: params.get("click_label").cloned().unwrap_or_default(),
            parent: params.get("click_parent").cloned().unwrap_or_default(),
        });

    Ok(state.catalog.listing(&tags, click.as_ref(), dimension))
}

fn render_dashboard(catalog: &Catalog) -> Result<String> {
    // Escape `</` so embedded JSON cannot close the surrounding `<script>`.
    let dimensions = serde_json::to_string(&dimensions_payload())?.replace("</", "<\\/");
    let options = serde_json::to_string(&catalog.tags().dropdown_options())?.replace("</", "<\\/");
    let columns = serde_json::to_string(catalog.display_columns())?.replace("</", "<\\/");

    let template = include_str!("../templates/dashboard.html");
    let mut html = template.to_string();
    html = html.replace("{{DIMENSIONS_JSON}}", &dimensions);
    html = html.replace("{{OPTIONS_JSON}}", &options);
    html = html.replace("{{COLUMNS_JSON}}", &columns);
    html = html.replace("{{INSTALLATIONS}}", &catalog.dataset().len().to_string());
    html = html.replace("{{PROMPT}}", &escape_html(PROMPT));
    Ok(html)
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn render_glossary_html(glossary: &Glossary) -> String {
    let mut body = String::new();
    let _ = writeln!(
        body,
        "<p>{} installations are currently reviewed.</p>",
        glossary.installations
    );
    for d in &glossary.dimensions {
        let _ = writeln!(
            body,
            "<h2>{} <small>({})</small></h2>",
            escape_html(d.name),
            d.dimension.code()
        );
        if let Some(desc) = &d.description {
            let _ = writeln!(body, "<p>{}</p>", escape_html(desc));
        }
        for g in &d.groups {
            let _ = writeln!(
                body,
                "<h3>{} <small>[{}]</small></h3>",
                escape_html(&g.label),
                g.installations
            );
            if let Some(desc) = &g.description {
                let _ = writeln!(body, "<p>{}</p>", escape_html(desc));
            }
            body.push_str("<dl>\n");
            for t in &g.tags {
                let _ = writeln!(
                    body,
                    "<dt>{} <small>[{}]</small></dt><dd>{}</dd>",
                    escape_html(&strip_marker(&t.label)),
                    t.installations,
                    t.description.as_deref().map(escape_html).unwrap_or_default()
                );
            }
            body.push_str("</dl>\n");
        }
    }

    format!(
        "<!doctype html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>ISDB glossary</title>\n\
         <style>body{{font-family:sans-serif;max-width:60rem;margin:2rem auto;}}small{{color:#777;}}</style>\n\
         </head>\n<body>\n<h1>Glossary</h1>\n<p><a href=\"/\">Back to the dashboard</a></p>\n{body}</body>\n</html>\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use isdb_catalog::Taxonomy;

    const SHEET: &str = "\
Name,Authors,Year,Hyperlink,Field,in_touch,in_voice,sd_spatial
Echo Room,A. One,2019,10.1000/echo,Music; Sound Design,1,1,0
Glass Wall,B. Two,2021,https://example.com/glass,Visual Arts,1,0,1
Whisper,C. Three,2020,,Music,0,1,0
";

    fn state() -> ServerState {
        let catalog = Catalog::from_csv_str(SHEET, Taxonomy::builtin().unwrap()).unwrap();
        ServerState {
            config: ServerConfig {
                listen: "127.0.0.1:0".parse().unwrap(),
                ready_file: None,
                data: PathBuf::from("inline.csv"),
            },
            catalog,
            loaded_at_unix_secs: 0,
        }
    }

    fn get(state: &ServerState, path: &str, query: Option<&str>) -> (StatusCode, String) {
        let resp = route(state, &Method::GET, path, query);
        let status = resp.status();
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let body = rt
            .block_on(resp.into_body().collect())
            .map(|c| c.to_bytes())
            .unwrap_or_default();
        (status, String::from_utf8_lossy(&body).into_owned())
    }

    fn get_json(state: &ServerState, path: &str, query: Option<&str>) -> (StatusCode, serde_json::Value) {
        let (status, body) = get(state, path, query);
        (status, serde_json::from_str(&body).unwrap())
    }

    #[test]
    fn healthz_and_unknown_paths() {
        let state = state();
        assert_eq!(get(&state, "/healthz", None), (StatusCode::OK, "ok\n".to_string()));
        let (status, body) = get_json(&state, "/nope", None);
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not found");
        let resp = route(&state, &Method::POST, "/healthz", None);
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn status_reports_counts() {
        let state = state();
        let (status, body) = get_json(&state, "/status", None);
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["version"], STATUS_VERSION);
        assert_eq!(body["installations"], 3);
        assert_eq!(body["data"], "inline.csv");
        assert!(body["nodes"]["AI"].as_u64().unwrap() > 1);
    }

    #[test]
    fn sunburst_defaults_and_rejects_bad_dimension() {
        let state = state();
        let (status, body) = get_json(&state, "/sunburst", None);
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ids"][0], "Artistic Intention");

        let (status, body) = get_json(&state, "/sunburst", Some("dimension=in"));
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ids"][0], "Interaction");
        assert_eq!(body["branchvalues"], "total");

        let (status, body) = get_json(&state, "/sunburst", Some("dimension=XX"));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("XX"));
    }

    #[test]
    fn installations_combine_tags_and_click() {
        let state = state();

        let (_, body) = get_json(&state, "/installations", None);
        assert_eq!(body["kind"], "everything");
        assert_eq!(body["rows"].as_array().unwrap().len(), 3);

        let (_, body) = get_json(&state, "/installations", Some("dimension=IN&tag=Touch"));
        assert_eq!(body["kind"], "filtered");
        assert_eq!(body["count"], 2);

        // Dropdown tag plus a clicked leaf narrows to the conjunction.
        let (_, body) = get_json(
            &state,
            "/installations",
            Some("dimension=IN&tag=Touch&click_id=in_voice&click_label=Voice"),
        );
        assert_eq!(body["count"], 1);
        assert_eq!(body["rows"][0]["cells"][0]["text"], "Echo Room");

        // Group segments only zoom.
        let (_, body) = get_json(&state, "/installations", Some("dimension=IN&click_id=IN-1"));
        assert_eq!(body["kind"], "everything");

        let (_, body) = get_json(&state, "/installations", Some("tag=Touch&tag=Spatial%3Cbr%3EAudio&tag=Voice"));
        assert_eq!(body["kind"], "no_match");
    }

    #[test]
    fn dashboard_embeds_options() {
        let state = state();
        let (status, html) = get(&state, "/", None);
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("plotly"));
        assert!(!html.contains("{{OPTIONS_JSON}}"));
        assert!(html.contains("\"value\":\"Touch\""));
        assert!(!html.contains("{{INSTALLATIONS}}"));
        assert!(html.contains("\"Chosen tag(s): \" + listing.chosen.join(\" ― \")"));
        assert!(html.contains("listing.count + \" results</p>\""));
    }

    #[test]
    fn responses_carry_content_types() {
        let state = state();
        let content_type = |path: &str| {
            route(&state, &Method::GET, path, None)
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        assert_eq!(content_type("/healthz").as_deref(), Some("text/plain; charset=utf-8"));
        assert_eq!(content_type("/status").as_deref(), Some("application/json"));
        assert_eq!(content_type("/nope").as_deref(), Some("application/json"));
        assert_eq!(content_type("/").as_deref(), Some("text/html; charset=utf-8"));
        assert_eq!(content_type("/glossary.html").as_deref(), Some("text/html; charset=utf-8"));
    }

    #[test]
    fn glossary_page_escapes_text() {
        let state = state();
        let (status, html) = get(&state, "/glossary.html", None);
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("3 installations are currently reviewed"));
        assert!(!html.contains("<br>Audio"));
        assert_eq!(escape_html("a<b>&\"c\""), "a&lt;b&gt;&amp;&quot;c&quot;");
    }
}
