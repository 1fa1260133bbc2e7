//! Backend callback dispatcher.
//!
//! For every room mutation: resolve the target backend(s), build the payload,
//! serialize it once, sign it per request and POST it to
//! `{base_url}/api/v1/room/{token}`. Each call is awaited inline by the code
//! that mutated the room, so by the time the mutation returns the delivery
//! attempt has been made.
//!
//! # Failure policy
//!
//! - Registry, payload and signing failures are returned as `NotifierError`.
//! - Delivery failures (transport, timeout, non-2xx) are logged and counted
//!   per backend and never returned. One unreachable backend does not stop
//!   delivery to the others.
//! - At most one attempt per backend per event; no queue, no retry.

use crate::call_state::{apply_flag_change, CallFlags, InCallDelta, RoomSnapshot};
use crate::config::Config;
use crate::errors::{DeliveryError, NotifierError};
use crate::observability::metrics;
use crate::payload::{self, BackendEvent};
use crate::registry::{BackendRegistry, SignalingBackend};
use crate::signer::{RequestSigner, SignedRequest, CHECKSUM_HEADER, RANDOM_HEADER};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, instrument, warn};

/// Connect timeout for backend requests.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Sends signed room callbacks to signaling backends.
#[derive(Debug)]
pub struct Dispatcher {
    registry: Arc<BackendRegistry>,
    signer: RequestSigner,
    /// Client that verifies TLS certificates.
    client: Client,
    /// Client for backends configured with `verify: false`.
    insecure_client: Client,
}

impl Dispatcher {
    /// Create a dispatcher over an existing registry.
    ///
    /// # Errors
    ///
    /// Returns `NotifierError::Configuration` if the HTTP client cannot be built.
    pub fn new(
        registry: Arc<BackendRegistry>,
        request_timeout: Duration,
    ) -> Result<Self, NotifierError> {
        let signer = RequestSigner::new(registry.secret());
        let client = build_client(request_timeout, true)?;
        let insecure_client = build_client(request_timeout, false)?;

        Ok(Self {
            registry,
            signer,
            client,
            insecure_client,
        })
    }

    /// Create a dispatcher from loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns `NotifierError::NoBackendConfigured` for an empty server list and
    /// `NotifierError::Configuration` if the HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self, NotifierError> {
        let registry = Arc::new(BackendRegistry::from_config(config)?);
        Self::new(registry, config.request_timeout)
    }

    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    /// Users were added to `room`. `room` already contains them.
    #[instrument(skip_all, fields(room_token = %room.token, invited = user_ids.len()))]
    pub async fn room_invited(
        &self,
        room: &RoomSnapshot,
        user_ids: &[String],
    ) -> Result<(), NotifierError> {
        let event = payload::build_invite(user_ids, room.user_ids(), room);
        self.dispatch(&room.token, &event).await
    }

    /// Users were removed from `room`. `room` no longer contains them.
    #[instrument(skip_all, fields(room_token = %room.token, removed = user_ids.len()))]
    pub async fn room_disinvited(
        &self,
        room: &RoomSnapshot,
        user_ids: &[String],
    ) -> Result<(), NotifierError> {
        let event = payload::build_disinvite(user_ids, room.user_ids(), room);
        self.dispatch(&room.token, &event).await
    }

    #[instrument(skip_all, fields(room_token = %room.token))]
    pub async fn room_renamed(&self, room: &RoomSnapshot) -> Result<(), NotifierError> {
        self.dispatch(&room.token, &payload::build_update(room))
            .await
    }

    #[instrument(skip_all, fields(room_token = %room.token, room_type = room.room_type.code()))]
    pub async fn room_type_changed(&self, room: &RoomSnapshot) -> Result<(), NotifierError> {
        self.dispatch(&room.token, &payload::build_update(room))
            .await
    }

    /// `room` was deleted; every member is notified.
    #[instrument(skip_all, fields(room_token = %room.token))]
    pub async fn room_deleted(&self, room: &RoomSnapshot) -> Result<(), NotifierError> {
        self.dispatch(&room.token, &payload::build_delete(room.user_ids()))
            .await
    }

    /// Set a session's call flags in `room` and notify the backend.
    ///
    /// The flag change is applied to `room` before anything is sent.
    ///
    /// # Errors
    ///
    /// Returns `NotifierError::SessionNotFound` if the session is not in
    /// `room`; the snapshot is left untouched in that case.
    #[instrument(skip(self, room), fields(room_token = %room.token, flags = flags.bits()))]
    pub async fn room_in_call_changed(
        &self,
        room: &mut RoomSnapshot,
        session_id: &str,
        flags: CallFlags,
    ) -> Result<InCallDelta, NotifierError> {
        let delta = apply_flag_change(room, session_id, flags)?;
        let event = payload::build_in_call_changed(&delta.changed, &delta.all_in_call);
        self.dispatch(&room.token, &event).await?;
        Ok(delta)
    }

    /// Deliver `event` to every backend resolved for `room_token`.
    ///
    /// # Errors
    ///
    /// Fails only for registry, serialization or signing errors. Delivery
    /// failures are logged and swallowed.
    pub async fn dispatch(
        &self,
        room_token: &str,
        event: &BackendEvent,
    ) -> Result<(), NotifierError> {
        let backends = self.registry.resolve_backends(room_token)?;
        let body = event.to_body()?;

        for backend in backends {
            let signed = self.signer.sign(&body)?;
            let url = backend.room_url(room_token);
            let started = Instant::now();

            match self.send(backend, &url, body.clone(), &signed).await {
                Ok(status) => {
                    debug!(
                        target: "notifier.dispatcher",
                        event = event.kind(),
                        backend = %backend.base_url,
                        status = status,
                        "Backend notified"
                    );
                    metrics::record_delivery(event.kind(), "success", started.elapsed());
                }
                Err(e) => {
                    warn!(
                        target: "notifier.dispatcher",
                        event = event.kind(),
                        backend = %backend.base_url,
                        room_token = %room_token,
                        error = %e,
                        "Failed to notify signaling backend"
                    );
                    metrics::record_delivery(event.kind(), e.status_label(), started.elapsed());
                }
            }
        }

        Ok(())
    }

    async fn send(
        &self,
        backend: &SignalingBackend,
        url: &str,
        body: Vec<u8>,
        signed: &SignedRequest,
    ) -> Result<u16, DeliveryError> {
        let client = if backend.verify {
            &self.client
        } else {
            &self.insecure_client
        };

        let response = client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(RANDOM_HEADER, &signed.random)
            .header(CHECKSUM_HEADER, &signed.checksum)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(status.as_u16())
        } else {
            Err(DeliveryError::Status(status.as_u16()))
        }
    }
}

fn build_client(request_timeout: Duration, verify: bool) -> Result<Client, NotifierError> {
    Client::builder()
        .timeout(request_timeout)
        .connect_timeout(CONNECT_TIMEOUT)
        .danger_accept_invalid_certs(!verify)
        .build()
        .map_err(|e| {
            error!(target: "notifier.dispatcher", error = %e, "Failed to build HTTP client");
            NotifierError::Configuration(format!("failed to build HTTP client: {}", e))
        })
}
