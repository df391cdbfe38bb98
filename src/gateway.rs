//! Base-station client. The reconciler only sees the [`RemoteGateway`] trait; the HTTP
//! client speaks a small JSON session API where mode `mode0` means disarmed.

use crate::lock_or_recover;
use crate::state::ArmPoll;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

pub const DISARMED_MODE: &str = "mode0";
pub const ARMED_MODE: &str = "mode1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    Auth(String),
    Network(String),
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::Auth(msg) => write!(f, "gateway authentication failed: {msg}"),
            GatewayError::Network(msg) => write!(f, "gateway unreachable: {msg}"),
        }
    }
}

impl std::error::Error for GatewayError {}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        GatewayError::Network(err.to_string())
    }
}

/// Source of truth for the arm state. `arm`/`disarm` are fire-and-forget; the next
/// poll confirms them.
pub trait RemoteGateway: Send {
    fn connect(&mut self) -> Result<(), GatewayError>;
    fn arm_state(&mut self) -> Result<ArmPoll, GatewayError>;
    fn arm(&mut self) -> Result<(), GatewayError>;
    fn disarm(&mut self) -> Result<(), GatewayError>;
    /// Start re-establishing the session without waiting for it.
    fn begin_reconnect(&mut self);
}

#[derive(Debug, Clone)]
pub struct GatewayCredentials {
    pub base_url: String,
    pub user: String,
    pub password: String,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
}

#[derive(Serialize, Deserialize)]
struct ModeBody {
    active: Option<String>,
}

pub struct HttpGateway {
    client: Client,
    credentials: Arc<GatewayCredentials>,
    session: Arc<Mutex<Option<String>>>,
    reconnecting: Arc<AtomicBool>,
}

impl HttpGateway {
    pub fn new(credentials: GatewayCredentials) -> Self {
        Self {
            client: Client::new(),
            credentials: Arc::new(credentials),
            session: Arc::new(Mutex::new(None)),
            reconnecting: Arc::new(AtomicBool::new(false)),
        }
    }

    fn mode_url(&self) -> String {
        format!("{}/mode", self.credentials.base_url.trim_end_matches('/'))
    }

    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, GatewayError> {
        let token = lock_or_recover(&self.session, "gateway session").clone();
        match token {
            Some(token) => Ok(request.bearer_auth(token)),
            None => Err(GatewayError::Auth("no active session".to_string())),
        }
    }

    fn set_mode(&mut self, mode: &str) -> Result<(), GatewayError> {
        let request = self.client.post(self.mode_url()).json(&ModeBody {
            active: Some(mode.to_string()),
        });
        let response = self.authorized(request)?.send()?;
        check_status(&response)?;
        tracing::info!(mode, "gateway mode change requested");
        Ok(())
    }
}

fn login(client: &Client, credentials: &GatewayCredentials) -> Result<String, GatewayError> {
    let url = format!("{}/login", credentials.base_url.trim_end_matches('/'));
    let response = client
        .post(url)
        .json(&LoginRequest {
            email: &credentials.user,
            password: &credentials.password,
        })
        .send()?;
    check_status(&response)?;
    let body: LoginResponse = response.json()?;
    Ok(body.token)
}

fn check_status(response: &Response) -> Result<(), GatewayError> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(GatewayError::Auth(status.to_string()));
    }
    if !status.is_success() {
        return Err(GatewayError::Network(format!("unexpected status {status}")));
    }
    Ok(())
}

/// `None` and missing modes are not a state.
pub(crate) fn poll_from_mode(mode: Option<&str>) -> ArmPoll {
    match mode {
        None => ArmPoll::Unavailable,
        Some(DISARMED_MODE) => ArmPoll::Disarmed,
        Some(_) => ArmPoll::Armed,
    }
}

impl RemoteGateway for HttpGateway {
    fn connect(&mut self) -> Result<(), GatewayError> {
        let token = login(&self.client, &self.credentials)?;
        *lock_or_recover(&self.session, "gateway session") = Some(token);
        tracing::info!("gateway session established");
        Ok(())
    }

    fn arm_state(&mut self) -> Result<ArmPoll, GatewayError> {
        let request = self.client.get(self.mode_url());
        let response = self.authorized(request)?.send()?;
        check_status(&response)?;
        let body: ModeBody = response.json()?;
        Ok(poll_from_mode(body.active.as_deref()))
    }

    fn arm(&mut self) -> Result<(), GatewayError> {
        self.set_mode(ARMED_MODE)
    }

    fn disarm(&mut self) -> Result<(), GatewayError> {
        self.set_mode(DISARMED_MODE)
    }

    fn begin_reconnect(&mut self) {
        if self.reconnecting.swap(true, Ordering::SeqCst) {
            tracing::debug!("gateway reconnect already in flight");
            return;
        }
        let client = self.client.clone();
        let credentials = Arc::clone(&self.credentials);
        let session = Arc::clone(&self.session);
        let reconnecting = Arc::clone(&self.reconnecting);
        let spawned = thread::Builder::new()
            .name("gateway-reconnect".to_string())
            .spawn(move || {
                match login(&client, &credentials) {
                    Ok(token) => {
                        *lock_or_recover(&session, "gateway session") = Some(token);
                        tracing::info!("refreshed gateway session token");
                    }
                    Err(err) => tracing::error!("gateway reconnect failed: {err}"),
                }
                reconnecting.store(false, Ordering::SeqCst);
            });
        if let Err(err) = spawned {
            self.reconnecting.store(false, Ordering::SeqCst);
            tracing::error!("could not start gateway reconnect: {err}");
        }
    }
}
