//! CLI argument parsing module
//!
//! A thin command-line front end: one request through a fresh session.

use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::{Arg, ArgAction, ArgMatches, Command};
use log::debug;

use crate::config::{Config, Method};
use crate::cookie::{CookieJar, CookieSource};
use crate::error::{Result, XhrError};
use crate::exit_code::exit_code_for_error;
use crate::header::RawHeaders;
use crate::http::auth::{Auth, BasicAuth, BearerAuth};
use crate::http::response::{Response, ResponseBody, ResponseType};
use crate::options::{Body, FormData, Options, PassThrough, Query, QueryValue};
use crate::session::{Reply, Session};

/// Main entry point for the CLI application
pub fn run() {
    let matches = create_app().get_matches();
    let level = if matches.get_flag("verbose") { "debug" } else { "warn" };
    crate::logging::init_with_default(level);

    if let Err(e) = run_with_args(&matches) {
        eprintln!("xhr-session: error: {}", e);
        std::process::exit(exit_code_for_error(&e));
    }
}

fn run_with_args(matches: &ArgMatches) -> Result<()> {
    let config = build_config_from_args(matches)?;
    let method = parse_method(matches)?;
    let url = matches
        .get_one::<String>("url")
        .cloned()
        .ok_or_else(|| XhrError::Config("URL is required".to_string()))?;
    let options = build_options_from_args(matches)?;
    let include = matches.get_flag("include");

    let session = Session::with_config(config)?;
    if let Some(auth) = build_auth_from_args(matches)? {
        session.set_auth(Some(auth));
    }

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| XhrError::Config(format!("Failed to create async runtime: {}", e)))?;

    let reply = rt.block_on(session.request(method, url, options))?;
    write_reply(reply, include)
}

/// Create the CLI application structure
fn create_app() -> Command {
    Command::new("xhr-session")
        .version(crate::VERSION)
        .about("Issue one request through an xhr-session session")
        .arg(Arg::new("url")
            .help("The URL to request")
            .required(true)
            .index(1))
        .arg(Arg::new("request")
            .short('X')
            .long("request")
            .value_name("METHOD")
            .help("HTTP request method (GET or POST)")
            .default_value("GET"))
        .arg(Arg::new("header")
            .short('H')
            .long("header")
            .value_name("HEADER")
            .help("Add custom HTTP header")
            .action(ArgAction::Append))
        .arg(Arg::new("cookie")
            .short('b')
            .long("cookie")
            .value_name("NAME=VALUE")
            .help("Patch a cookie into the request")
            .action(ArgAction::Append))
        .arg(Arg::new("query")
            .short('q')
            .long("query")
            .value_name("KEY=VALUE")
            .help("Append a query parameter")
            .action(ArgAction::Append))
        .arg(Arg::new("data")
            .short('d')
            .long("data")
            .value_name("DATA")
            .help("Raw request body"))
        .arg(Arg::new("form")
            .short('F')
            .long("form")
            .value_name("NAME=VALUE|NAME=@FILE")
            .help("Multipart form field")
            .action(ArgAction::Append))
        .arg(Arg::new("json")
            .long("json")
            .value_name("JSON")
            .help("JSON request body"))
        .arg(Arg::new("user")
            .short('u')
            .long("user")
            .value_name("USER[:PASSWORD]")
            .help("HTTP basic authentication"))
        .arg(Arg::new("bearer")
            .long("bearer")
            .value_name("TOKEN")
            .env("XHR_SESSION_TOKEN")
            .help("HTTP bearer token"))
        .arg(Arg::new("response-type")
            .long("response-type")
            .value_name("json|arraybuffer|blob")
            .help("Decode the response body"))
        .arg(Arg::new("include")
            .short('i')
            .long("include")
            .help("Include response headers in the output")
            .action(ArgAction::SetTrue))
        .arg(Arg::new("verbose")
            .short('v')
            .long("verbose")
            .help("Verbose output")
            .action(ArgAction::SetTrue))
        .arg(Arg::new("insecure")
            .short('k')
            .long("insecure")
            .help("Allow insecure SSL connections")
            .action(ArgAction::SetTrue))
        .arg(Arg::new("no-location")
            .long("no-location")
            .help("Do not follow redirects")
            .action(ArgAction::SetTrue))
        .arg(Arg::new("user-agent")
            .short('A')
            .long("user-agent")
            .value_name("STRING")
            .help("User-Agent header"))
        .arg(Arg::new("timeout")
            .long("timeout")
            .value_name("SECONDS")
            .help("Maximum time for the request")
            .default_value("300"))
        .arg(Arg::new("connect-timeout")
            .long("connect-timeout")
            .value_name("SECONDS")
            .help("Maximum time for connection")
            .default_value("30"))
}

fn parse_method(matches: &ArgMatches) -> Result<Method> {
    let method = matches
        .get_one::<String>("request")
        .map(String::as_str)
        .unwrap_or("GET");
    method
        .parse::<Method>()
        .map_err(|_| XhrError::Config(format!("Unsupported HTTP method: {}", method)))
}

fn build_config_from_args(matches: &ArgMatches) -> Result<Config> {
    let mut config = Config::default();

    config.verify_certs = !matches.get_flag("insecure");
    config.follow_redirects = !matches.get_flag("no-location");

    if let Some(timeout_str) = matches.get_one::<String>("timeout") {
        config.timeout = parse_timeout(timeout_str)?;
    }
    if let Some(connect_timeout_str) = matches.get_one::<String>("connect-timeout") {
        config.connect_timeout = parse_timeout(connect_timeout_str)?;
    }
    if let Some(user_agent) = matches.get_one::<String>("user-agent") {
        config.user_agent = Some(user_agent.clone());
    }

    Ok(config)
}

fn build_options_from_args(matches: &ArgMatches) -> Result<Options> {
    let mut options = Options::default();

    if let Some(headers) = matches.get_many::<String>("header") {
        let mut raw = RawHeaders::new();
        for header_str in headers {
            let (key, value) = parse_header(header_str)?;
            raw = raw.header(key, value);
        }
        options.headers = Some(raw);
    }

    if let Some(cookies) = matches.get_many::<String>("cookie") {
        let values: Vec<&String> = cookies.collect();
        options.cookie = Some(CookieSource::Map(CookieJar::parse_cookie_header(&values)));
    }

    if let Some(pairs) = matches.get_many::<String>("query") {
        let mut query = Query::new();
        for pair in pairs {
            let (key, value) = parse_pair(pair)?;
            query.insert(key, QueryValue::Text(value));
        }
        options.query = Some(query);
    }

    if let Some(json) = matches.get_one::<String>("json") {
        options.json = Some(serde_json::from_str(json)?);
    }

    if let Some(fields) = matches.get_many::<String>("form") {
        let mut form = FormData::new();
        for field in fields {
            let (name, value) = parse_pair(field)?;
            form = match value.strip_prefix('@') {
                Some(path) => {
                    let bytes = std::fs::read(path)?;
                    let file_name = Path::new(path)
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| path.to_string());
                    form.file(name, file_name, None, bytes)
                }
                None => form.text(name, value),
            };
        }
        options.data = Some(Body::Multipart(form));
    } else if let Some(data) = matches.get_one::<String>("data") {
        options.data = Some(Body::Text(data.clone()));
    }

    let response_type = match matches.get_one::<String>("response-type") {
        Some(value) => Some(value.parse::<ResponseType>().map_err(|_| {
            XhrError::Config(format!("Unknown response type: {}", value))
        })?),
        None => None,
    };

    options.pass_through = PassThrough {
        response_type,
        ..PassThrough::default()
    };

    debug!("parsed options: {:?}", options);
    Ok(options)
}

fn build_auth_from_args(matches: &ArgMatches) -> Result<Option<Arc<dyn Auth>>> {
    if let Some(user) = matches.get_one::<String>("user") {
        return Ok(Some(Arc::new(BasicAuth::parse(user)?)));
    }
    if let Some(token) = matches.get_one::<String>("bearer") {
        return Ok(Some(Arc::new(BearerAuth::new(token.clone()))));
    }
    Ok(None)
}

fn write_reply(reply: Reply, include: bool) -> Result<()> {
    let mut stdout = io::stdout().lock();
    match reply {
        Reply::Response(response) => write_response(&mut stdout, &response, include)?,
        Reply::Parsed(Some(ResponseBody::Json(value))) => {
            writeln!(stdout, "{}", serde_json::to_string_pretty(&value)?)?;
        }
        Reply::Parsed(Some(ResponseBody::Bytes(bytes))) => stdout.write_all(&bytes)?,
        Reply::Parsed(None) => {}
    }
    stdout.flush()?;
    Ok(())
}

fn write_response(out: &mut impl Write, response: &Response, include: bool) -> Result<()> {
    if include {
        write!(
            out,
            "HTTP {} {}\r\n{}\r\n\r\n",
            response.status, response.status_text, response.response_headers
        )?;
    }
    if let Some(text) = &response.response_text {
        writeln!(out, "{}", text)?;
    }
    Ok(())
}

/// Parse `key: value` header syntax
fn parse_header(input: &str) -> Result<(String, String)> {
    match input.split_once(':') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(XhrError::Config(format!(
            "Invalid header format: '{}'. Expected 'key: value'",
            input
        ))),
    }
}

/// Parse `key=value` syntax
fn parse_pair(input: &str) -> Result<(String, String)> {
    match input.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(XhrError::Config(format!(
            "Invalid format: '{}'. Expected 'key=value'",
            input
        ))),
    }
}

/// Parse timeout values (supports suffixes like 's', 'm', 'h')
fn parse_timeout(input: &str) -> Result<Duration> {
    if let Ok(seconds) = input.parse::<u64>() {
        return Ok(Duration::from_secs(seconds));
    }

    let (number_part, suffix) = if let Some(stripped) = input.strip_suffix('s') {
        (stripped, 1)
    } else if let Some(stripped) = input.strip_suffix('m') {
        (stripped, 60)
    } else if let Some(stripped) = input.strip_suffix('h') {
        (stripped, 3600)
    } else {
        return Err(XhrError::Config(format!(
            "Invalid timeout format: '{}'. Use number with optional suffix (s/m/h)",
            input
        )));
    };

    let number: u64 = number_part
        .parse()
        .map_err(|_| XhrError::Config(format!("Invalid timeout number: '{}'", number_part)))?;

    Ok(Duration::from_secs(number * suffix))
}
