//! In-process fakes for the gateway and membership oracle.
//!
//! Enabled with the `testkit` feature; used by the test suites of the crates
//! that sit on top of `linkdrop-core`.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::content::ContentKind;
use crate::gateway::{
    Delivery, GatewayError, MessagingGateway, OutboundText, RelayPayload, SentMessage,
};
use crate::oracle::MembershipOracle;
use crate::recipient::RecipientId;

/// Gateway that records every call and fails on request.
pub struct RecordingGateway {
    supported: Vec<ContentKind>,
    deliveries: Mutex<Vec<Delivery>>,
    relays: Mutex<Vec<(RecipientId, RelayPayload)>>,
    texts: Mutex<Vec<(RecipientId, OutboundText)>>,
    edits: Mutex<Vec<(SentMessage, String)>>,
    relay_failures: Mutex<HashMap<RecipientId, GatewayError>>,
    throttled_once: Mutex<HashSet<RecipientId>>,
    fail_deliveries: AtomicBool,
    fail_texts: AtomicBool,
    next_message_id: AtomicI32,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::with_supported(ContentKind::ALL.to_vec())
    }

    pub fn with_supported(supported: Vec<ContentKind>) -> Self {
        Self {
            supported,
            deliveries: Mutex::new(Vec::new()),
            relays: Mutex::new(Vec::new()),
            texts: Mutex::new(Vec::new()),
            edits: Mutex::new(Vec::new()),
            relay_failures: Mutex::new(HashMap::new()),
            throttled_once: Mutex::new(HashSet::new()),
            fail_deliveries: AtomicBool::new(false),
            fail_texts: AtomicBool::new(false),
            next_message_id: AtomicI32::new(1),
        }
    }

    /// Make every relay to `recipient` fail with `error`.
    pub fn fail_relay_to(&self, recipient: RecipientId, error: GatewayError) {
        self.relay_failures.lock().unwrap().insert(recipient, error);
    }

    /// Answer the first relay to `recipient` with a short rate-limit error.
    pub fn throttle_once(&self, recipient: RecipientId) {
        self.throttled_once.lock().unwrap().insert(recipient);
    }

    pub fn set_fail_deliveries(&self, fail: bool) {
        self.fail_deliveries.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_texts(&self, fail: bool) {
        self.fail_texts.store(fail, Ordering::SeqCst);
    }

    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().unwrap().clone()
    }

    pub fn relays(&self) -> Vec<(RecipientId, RelayPayload)> {
        self.relays.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<(RecipientId, OutboundText)> {
        self.texts.lock().unwrap().clone()
    }

    pub fn texts_to(&self, recipient: RecipientId) -> Vec<String> {
        self.texts()
            .into_iter()
            .filter(|(to, _)| *to == recipient)
            .map(|(_, msg)| msg.text)
            .collect()
    }

    pub fn edits(&self) -> Vec<(SentMessage, String)> {
        self.edits.lock().unwrap().clone()
    }
}

impl Default for RecordingGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessagingGateway for RecordingGateway {
    fn supported_kinds(&self) -> &[ContentKind] {
        &self.supported
    }

    async fn deliver(&self, delivery: &Delivery) -> Result<(), GatewayError> {
        if self.fail_deliveries.load(Ordering::SeqCst) {
            return Err(GatewayError::Other("scripted delivery failure".into()));
        }
        self.deliveries.lock().unwrap().push(delivery.clone());
        Ok(())
    }

    async fn relay(&self, to: RecipientId, payload: &RelayPayload) -> Result<(), GatewayError> {
        if self.throttled_once.lock().unwrap().remove(&to) {
            return Err(GatewayError::RateLimited(Duration::from_millis(1)));
        }
        if let Some(err) = self.relay_failures.lock().unwrap().get(&to) {
            return Err(err.clone());
        }
        self.relays.lock().unwrap().push((to, *payload));
        Ok(())
    }

    async fn send_text(
        &self,
        to: RecipientId,
        message: &OutboundText,
    ) -> Result<SentMessage, GatewayError> {
        if self.fail_texts.load(Ordering::SeqCst) {
            return Err(GatewayError::Other("scripted text failure".into()));
        }
        self.texts.lock().unwrap().push((to, message.clone()));
        let message_id = self.next_message_id.fetch_add(1, Ordering::SeqCst);
        Ok(SentMessage { chat: to, message_id })
    }

    async fn edit_text(&self, sent: &SentMessage, text: &str) -> Result<(), GatewayError> {
        if self.fail_texts.load(Ordering::SeqCst) {
            return Err(GatewayError::Other("scripted edit failure".into()));
        }
        self.edits.lock().unwrap().push((*sent, text.to_string()));
        Ok(())
    }
}

/// Oracle with a scripted member set that counts how often it is asked.
pub struct ScriptedOracle {
    members: Mutex<HashSet<RecipientId>>,
    calls: AtomicUsize,
    unreachable: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self {
            members: Mutex::new(HashSet::new()),
            calls: AtomicUsize::new(0),
            unreachable: AtomicBool::new(false),
            delay: Mutex::new(None),
        }
    }

    pub fn admit(&self, recipient: RecipientId) {
        self.members.lock().unwrap().insert(recipient);
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Stall every answer by `delay`.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for ScriptedOracle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MembershipOracle for ScriptedOracle {
    async fn is_member(&self, recipient: RecipientId, _target: &str) -> Result<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.unreachable.load(Ordering::SeqCst) {
            bail!("membership oracle unreachable");
        }
        Ok(self.members.lock().unwrap().contains(&recipient))
    }
}
