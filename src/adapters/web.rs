//! Web control surface.
//!
//! Routing is a pure function of the request URI and the last published
//! [`DeviceState`] snapshot: it yields an optional [`AppCommand`] for the
//! scheduler plus the reply to send.  Handlers never touch the live state;
//! commands go through [`channels::submit`](crate::channels::submit).
//!
//! | Route            | Command                      | Reply                 |
//! |------------------|------------------------------|-----------------------|
//! | `/`              | –                            | control page          |
//! | `/led[?on=0/1]`  | `ToggleLed` / `SetLed`       | `ON` / `OFF`          |
//! | `/status`        | –                            | `ON` / `OFF`          |
//! | `/msg?t=…`       | `SetMessage`                 | 302 → `/`             |
//! | `/relay[?on=…]`  | `ToggleRelay` / `SetRelay`   | `ON` / `OFF`          |
//! | `/strip?…`       | `SetStrip`                   | `OK` / 400            |
//! | `/co2/calibrate` | `CalibrateCo2Zero`           | `QUEUED`              |
//! | `/api/state`     | –                            | JSON snapshot         |
//! | `/config[?k=v…]` | – (NVS, next boot)           | JSON config / 400     |
//!
//! A command that cannot be queued gets 503 instead of its normal reply.

use crate::adapters::nvs::load_or_default;
use crate::app::commands::{AppCommand, StripUpdate};
use crate::app::ports::{ConfigError, ConfigPort};
use crate::app::state::{DeviceState, Rgb, StripMode, normalize_message};

#[cfg(target_os = "espidf")]
use embedded_svc::http::Method;
#[cfg(target_os = "espidf")]
use embedded_svc::io::Write;
#[cfg(target_os = "espidf")]
use esp_idf_svc::http::server::{
    Configuration as HttpConfiguration, EspHttpConnection, EspHttpServer, Request,
};

/// What to send back for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Page,
    Text(&'static str),
    Redirect(&'static str),
    Json(String),
    BadRequest(&'static str),
    /// The command queue is full; the request had no effect.
    Busy,
    ServerError(&'static str),
    NotFound,
}

/// Outcome of routing one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebAction {
    pub command: Option<AppCommand>,
    pub reply: Reply,
}

impl WebAction {
    fn reply(reply: Reply) -> Self {
        Self { command: None, reply }
    }

    fn with(command: AppCommand, reply: Reply) -> Self {
        Self { command: Some(command), reply }
    }
}

fn on_off(on: bool) -> &'static str {
    if on { "ON" } else { "OFF" }
}

// ── Query parsing ─────────────────────────────────────────────

/// Every `key=value` pair in the query string of `uri`, values decoded.
pub fn query_pairs(uri: &str) -> impl Iterator<Item = (&str, String)> {
    uri.split_once('?')
        .map_or("", |(_, q)| q)
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            (name, percent_decode(&value.replace('+', " ")))
        })
}

/// Value of `key` in the query string of `uri`, `+` decoded to space and
/// `%XX` escapes resolved.
pub fn query_param(uri: &str, key: &str) -> Option<String> {
    query_pairs(uri).find(|(name, _)| *name == key).map(|(_, value)| value)
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Resolve `%XX` escapes.  Malformed escapes are kept literally and
/// invalid UTF-8 is replaced.
pub fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(h), Some(l)) = (hex_val(bytes[i + 1]), hex_val(bytes[i + 2])) {
                out.push((h << 4) | l);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn parse_bool(v: &str) -> Option<bool> {
    match v {
        "1" | "on" | "true" => Some(true),
        "0" | "off" | "false" => Some(false),
        _ => None,
    }
}

/// `RRGGBB`, with or without a leading `#`.
pub fn parse_color(v: &str) -> Option<Rgb> {
    let hex = v.strip_prefix('#').unwrap_or(v);
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some((byte(0)?, byte(2)?, byte(4)?))
}

fn parse_strip(uri: &str) -> Result<StripUpdate, &'static str> {
    let mut update = StripUpdate::default();
    if let Some(v) = query_param(uri, "on") {
        update.on = Some(parse_bool(&v).ok_or("bad on")?);
    }
    if let Some(v) = query_param(uri, "brightness") {
        update.brightness = Some(v.parse::<u8>().map_err(|_| "bad brightness")?);
    }
    if let Some(v) = query_param(uri, "mode") {
        update.mode = Some(match v.as_str() {
            "solid" => StripMode::Solid,
            "rainbow" => StripMode::Rainbow,
            _ => return Err("bad mode"),
        });
    }
    if let Some(v) = query_param(uri, "color") {
        update.color = Some(parse_color(&v).ok_or("bad color")?);
    }
    if update == StripUpdate::default() {
        return Err("no strip parameters");
    }
    Ok(update)
}

// ── Router ────────────────────────────────────────────────────

/// Map a request URI to a command and reply.
pub fn route(uri: &str, snapshot: &DeviceState) -> WebAction {
    let path = uri.split_once('?').map_or(uri, |(p, _)| p);
    match path {
        "/" => WebAction::reply(Reply::Page),
        "/status" => WebAction::reply(Reply::Text(on_off(snapshot.led_on))),
        "/led" => match query_param(uri, "on") {
            None => WebAction::with(AppCommand::ToggleLed, Reply::Text(on_off(!snapshot.led_on))),
            Some(v) => match parse_bool(&v) {
                Some(on) => WebAction::with(AppCommand::SetLed(on), Reply::Text(on_off(on))),
                None => WebAction::reply(Reply::BadRequest("bad on")),
            },
        },
        "/relay" => match query_param(uri, "on") {
            None => WebAction::with(
                AppCommand::ToggleRelay,
                Reply::Text(on_off(!snapshot.relay_on)),
            ),
            Some(v) => match parse_bool(&v) {
                Some(on) => WebAction::with(AppCommand::SetRelay(on), Reply::Text(on_off(on))),
                None => WebAction::reply(Reply::BadRequest("bad on")),
            },
        },
        "/msg" => match query_param(uri, "t") {
            Some(t) => WebAction::with(
                AppCommand::SetMessage(normalize_message(&t)),
                Reply::Redirect("/"),
            ),
            None => WebAction::reply(Reply::Redirect("/")),
        },
        "/strip" => match parse_strip(uri) {
            Ok(update) => WebAction::with(AppCommand::SetStrip(update), Reply::Text("OK")),
            Err(why) => WebAction::reply(Reply::BadRequest(why)),
        },
        "/co2/calibrate" => WebAction::with(AppCommand::CalibrateCo2Zero, Reply::Text("QUEUED")),
        "/api/state" => match serde_json::to_string(snapshot) {
            Ok(json) => WebAction::reply(Reply::Json(json)),
            Err(_) => WebAction::reply(Reply::BadRequest("state not serialisable")),
        },
        _ => WebAction::reply(Reply::NotFound),
    }
}

/// Route `uri` and hand any command to `submit`.  A rejected command
/// turns the reply into [`Reply::Busy`].
pub fn dispatch(
    uri: &str,
    snapshot: &DeviceState,
    submit: impl FnOnce(AppCommand) -> bool,
) -> Reply {
    let action = route(uri, snapshot);
    match action.command {
        Some(cmd) => {
            if submit(cmd) {
                action.reply
            } else {
                Reply::Busy
            }
        }
        None => action.reply,
    }
}

/// `/config`: without a query, the stored config; with `key=value` pairs,
/// apply them to the stored config, validate and save.  Saved values take
/// effect on the next boot.
pub fn config_route(uri: &str, port: &impl ConfigPort) -> Reply {
    let mut config = load_or_default(port);
    let mut changed = 0;
    for (key, value) in query_pairs(uri) {
        if let Err(e) = config.apply_setting(key, &value) {
            return config_error_reply(e);
        }
        changed += 1;
    }
    if changed > 0 {
        if let Err(e) = port.save(&config) {
            return config_error_reply(e);
        }
        log::info!("Config: {} setting(s) saved, applied on next boot", changed);
    }
    match serde_json::to_string(&config) {
        Ok(json) => Reply::Json(json),
        Err(_) => Reply::ServerError("config not serialisable"),
    }
}

fn config_error_reply(e: ConfigError) -> Reply {
    match e {
        ConfigError::ValidationFailed(why) => Reply::BadRequest(why),
        ConfigError::Corrupted | ConfigError::IoError => Reply::ServerError("config storage error"),
    }
}

// ── Page ──────────────────────────────────────────────────────

pub const PAGE: &str = r##"<!DOCTYPE html>
<html>
<head>
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>airwatch</title>
<style>
 body { font-family: sans-serif; background: #111; color: #ddd; max-width: 420px; margin: 24px auto; padding: 0 12px; }
 .card { background: #1c1c1c; border-radius: 8px; padding: 12px; margin-bottom: 12px; }
 .big { font-size: 2em; }
 button { padding: 8px 16px; margin: 4px 4px 0 0; border: 0; border-radius: 6px; background: #2f6fdb; color: #fff; }
 .stale { color: #777; }
 input { padding: 6px; background: #111; color: #ddd; border: 1px solid #333; border-radius: 4px; }
</style>
</head>
<body>
<h1>airwatch</h1>
<div class="card">
  <div class="big"><span id="co2">---</span> ppm <small id="co2tag"></small></div>
  <div id="climate">-</div>
  <div id="battery">-</div>
</div>
<div class="card">
  LED <b id="led">?</b> <button onclick="hit('/led')">Toggle</button><br>
  Relay <b id="relay">?</b> <button onclick="hit('/relay')">Toggle</button>
</div>
<div class="card">
  Strip
  <button onclick="hit('/strip?on=1')">On</button>
  <button onclick="hit('/strip?on=0')">Off</button>
  <button onclick="hit('/strip?mode=rainbow')">Rainbow</button>
  <br><input type="color" id="color" value="#ffffff" onchange="hit('/strip?mode=solid&color='+this.value.substring(1))">
  <input type="range" min="0" max="255" value="64" onchange="hit('/strip?brightness='+this.value)">
</div>
<form class="card" action="/msg" method="GET">
  <input type="text" name="t" maxlength="24" placeholder="Display message">
  <button type="submit">Send</button>
</form>
<script>
function hit(u) { fetch(u).then(refresh); }
function refresh() {
  fetch('/api/state').then(function(r){return r.json()}).then(function(s) {
    var co2 = document.getElementById('co2');
    var fresh = s.co2.result === 'Ok';
    co2.innerText = s.co2.sampled ? s.co2.ppm : '---';
    co2.className = fresh ? '' : 'stale';
    document.getElementById('co2tag').innerText =
      (fresh ? '' : s.co2.result + (s.co2.sampled ? ', last good value' : '')) +
      (s.co2.warming_up ? ' warming up' : '');
    document.getElementById('climate').innerText = s.climate.valid ? s.climate.temperature_c.toFixed(1) + ' C  ' + s.climate.humidity_pct.toFixed(0) + ' %' : 'climate n/a';
    document.getElementById('battery').innerText = s.battery.valid && s.battery.voltage > 0.5 ? s.battery.voltage.toFixed(2) + ' V' : 'no battery';
    document.getElementById('led').innerText = s.led_on ? 'ON' : 'OFF';
    document.getElementById('relay').innerText = s.relay_on ? 'ON' : 'OFF';
  });
}
refresh();
setInterval(refresh, 5000);
</script>
</body>
</html>
"##;

// ── ESP-IDF HTTP server ───────────────────────────────────────

/// Routes served from the state snapshot; `/config` is registered apart.
#[cfg(target_os = "espidf")]
const ROUTES: [&str; 8] =
    ["/", "/status", "/led", "/relay", "/msg", "/strip", "/co2/calibrate", "/api/state"];

#[cfg(target_os = "espidf")]
fn write_reply(req: Request<&mut EspHttpConnection<'_>>, reply: Reply) -> anyhow::Result<()> {
    match reply {
        Reply::Page => {
            req.into_response(200, Some("OK"), &[("Content-Type", "text/html; charset=utf-8")])?
                .write_all(PAGE.as_bytes())?;
        }
        Reply::Text(body) => {
            req.into_response(200, Some("OK"), &[("Content-Type", "text/plain")])?
                .write_all(body.as_bytes())?;
        }
        Reply::Redirect(location) => {
            req.into_response(302, Some("Found"), &[("Location", location)])?
                .write_all(b"OK")?;
        }
        Reply::Json(body) => {
            req.into_response(
                200,
                Some("OK"),
                &[("Content-Type", "application/json; charset=utf-8")],
            )?
            .write_all(body.as_bytes())?;
        }
        Reply::BadRequest(why) => {
            req.into_response(400, Some("Bad Request"), &[("Content-Type", "text/plain")])?
                .write_all(why.as_bytes())?;
        }
        Reply::Busy => {
            req.into_response(503, Some("Busy"), &[("Content-Type", "text/plain")])?
                .write_all(b"command queue full")?;
        }
        Reply::ServerError(why) => {
            req.into_response(500, Some("Error"), &[("Content-Type", "text/plain")])?
                .write_all(why.as_bytes())?;
        }
        Reply::NotFound => {
            req.into_status_response(404)?.write_all(b"not found")?;
        }
    }
    Ok(())
}

/// Start the HTTP server.  The returned handle must be kept alive.
/// `/config` answers 500 when NVS failed to initialise.
#[cfg(target_os = "espidf")]
pub fn start_server(
    nvs: Option<crate::adapters::nvs::NvsAdapter>,
) -> anyhow::Result<EspHttpServer<'static>> {
    let conf = HttpConfiguration {
        stack_size: 10 * 1024,
        ..Default::default()
    };
    let mut server = EspHttpServer::new(&conf)?;

    for path in ROUTES {
        server.fn_handler::<anyhow::Error, _>(path, Method::Get, move |req| {
            let uri = req.uri().to_string();
            let reply = dispatch(&uri, &crate::channels::snapshot(), crate::channels::submit);
            write_reply(req, reply)
        })?;
    }
    server.fn_handler::<anyhow::Error, _>("/config", Method::Get, move |req| {
        let uri = req.uri().to_string();
        let reply = match nvs.as_ref() {
            Some(port) => config_route(&uri, port),
            None => Reply::ServerError("config storage unavailable"),
        };
        write_reply(req, reply)
    })?;
    log::info!("Web server started ({} routes)", ROUTES.len() + 1);
    Ok(server)
}
