//! In-memory ports used by the unit tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::model::{CollectionEvent, Credential, DateRange, PropertyId};
use crate::ports::{AuthError, CollectionPort, FetchError, LoginPort, PublishError, Publisher};

pub(crate) struct FakeLogin {
    reject_with: Mutex<Option<u16>>,
    calls: AtomicUsize,
}

impl FakeLogin {
    pub(crate) fn succeeding() -> Self {
        Self {
            reject_with: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn rejecting(status: u16) -> Self {
        Self {
            reject_with: Mutex::new(Some(status)),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn set_rejecting(&self, status: Option<u16>) {
        *self.reject_with.lock().expect("lock") = status;
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LoginPort for FakeLogin {
    async fn login(&self) -> Result<Credential, AuthError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        match *self.reject_with.lock().expect("lock") {
            Some(status) => Err(AuthError::Rejected { status }),
            None => Ok(Credential::new(format!("token-{call}"))),
        }
    }
}

pub(crate) struct FakeCollections {
    events: Vec<CollectionEvent>,
    failing: AtomicBool,
    seen: Mutex<Vec<(Credential, PropertyId, DateRange)>>,
}

impl FakeCollections {
    pub(crate) fn with_events(events: Vec<CollectionEvent>) -> Self {
        Self {
            events,
            failing: AtomicBool::new(false),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self) -> usize {
        self.seen.lock().expect("lock").len()
    }

    pub(crate) fn seen(&self) -> Vec<(Credential, PropertyId, DateRange)> {
        self.seen.lock().expect("lock").clone()
    }
}

#[async_trait]
impl CollectionPort for FakeCollections {
    async fn collections(
        &self,
        credential: &Credential,
        property: &PropertyId,
        range: DateRange,
    ) -> Result<Vec<CollectionEvent>, FetchError> {
        self.seen
            .lock()
            .expect("lock")
            .push((credential.clone(), property.clone(), range));
        if self.failing.load(Ordering::SeqCst) {
            return Err(FetchError::Status { status: 500 });
        }
        Ok(self.events.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Published {
    pub(crate) topic: String,
    pub(crate) payload: String,
    pub(crate) retain: bool,
}

#[derive(Default)]
pub(crate) struct RecordingPublisher {
    messages: Mutex<Vec<Published>>,
    fail_topic: Option<String>,
}

impl RecordingPublisher {
    pub(crate) fn failing_on(topic: &str) -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            fail_topic: Some(topic.to_owned()),
        }
    }

    pub(crate) fn take(&self) -> Vec<Published> {
        std::mem::take(&mut *self.messages.lock().expect("lock"))
    }

    pub(crate) fn snapshot(&self) -> Vec<Published> {
        self.messages.lock().expect("lock").clone()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(
        &self,
        topic: &str,
        payload: String,
        retain: bool,
    ) -> Result<(), PublishError> {
        if self.fail_topic.as_deref() == Some(topic) {
            return Err(PublishError::Bus("broker unavailable".into()));
        }
        self.messages.lock().expect("lock").push(Published {
            topic: topic.to_owned(),
            payload,
            retain,
        });
        Ok(())
    }
}
