#![allow(dead_code)]

use anyhow::{bail, Result};
use async_trait::async_trait;
use friendcircle::api::AppState;
use friendcircle::archive::{gateway_url, ArchiveStore};
use friendcircle::chat::ChatTransport;
use friendcircle::classifier::TagClassifier;
use friendcircle::config::FriendCircleConfig;
use friendcircle::db::{self, SharedConnection};
use friendcircle::transcript::types::Segment;
use friendcircle::users::types::{Tag, WalletAddress};
use rusqlite::Connection;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Open a fresh in-memory database with schema and migrations applied.
pub fn test_db() -> Connection {
    db::open_memory_database().unwrap()
}

pub fn shared_db() -> SharedConnection {
    Arc::new(Mutex::new(test_db()))
}

/// Deterministic wallet address for `n`.
pub fn wallet(n: u8) -> WalletAddress {
    format!("0x{:040x}", n).parse().unwrap()
}

pub fn segment(text: &str) -> Segment {
    Segment {
        text: text.to_string(),
        speaker: "SPEAKER_00".into(),
        speaker_id: 0,
        is_user: true,
        person_id: None,
        start: 0.0,
        end: 1.0,
    }
}

/// Returns a fixed tag list (or fails) and records every text it saw.
#[derive(Default)]
pub struct FakeClassifier {
    pub tags: Vec<Tag>,
    pub fail: bool,
    pub seen: Mutex<Vec<String>>,
}

impl FakeClassifier {
    pub fn returning(tags: &[Tag]) -> Self {
        Self {
            tags: tags.to_vec(),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl TagClassifier for FakeClassifier {
    async fn classify(&self, text: &str, _allowed: &[Tag]) -> Result<Vec<Tag>> {
        self.seen.lock().unwrap().push(text.to_string());
        if self.fail {
            bail!("classifier offline");
        }
        Ok(self.tags.clone())
    }
}

/// In-memory archive handing out sequential CIDs.
#[derive(Default)]
pub struct FakeArchive {
    pub fail: bool,
    pub docs: Mutex<Vec<(String, String, serde_json::Value)>>,
}

impl FakeArchive {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn uploads(&self) -> usize {
        self.docs.lock().unwrap().len()
    }
}

#[async_trait]
impl ArchiveStore for FakeArchive {
    async fn upload(&self, name: &str, content: &serde_json::Value) -> Result<String> {
        if self.fail {
            bail!("storage offline");
        }
        let mut docs = self.docs.lock().unwrap();
        let cid = format!("bafyfake{}", docs.len() + 1);
        docs.push((cid.clone(), name.to_string(), content.clone()));
        Ok(cid)
    }

    async fn fetch(&self, cid: &str) -> Result<serde_json::Value> {
        let docs = self.docs.lock().unwrap();
        match docs.iter().find(|(c, _, _)| c == cid) {
            Some((_, _, content)) => Ok(content.clone()),
            None => bail!("{cid} not pinned"),
        }
    }

    fn url_for(&self, cid: &str) -> String {
        gateway_url("https://{cid}.ipfs.test", cid)
    }
}

/// Loops published payloads back to `fetch`, once each.
#[derive(Default)]
pub struct FakeTransport {
    pub fail: bool,
    pub inbox: Mutex<HashMap<String, Vec<Vec<u8>>>>,
    pub published: Mutex<Vec<String>>,
}

impl FakeTransport {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl ChatTransport for FakeTransport {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<()> {
        if self.fail {
            bail!("relay offline");
        }
        self.published.lock().unwrap().push(topic.to_string());
        self.inbox
            .lock()
            .unwrap()
            .entry(topic.to_string())
            .or_default()
            .push(payload.to_vec());
        Ok(())
    }

    async fn subscribe(&self, _topics: &[String]) -> Result<()> {
        Ok(())
    }

    async fn fetch(&self, topic: &str) -> Result<Vec<Vec<u8>>> {
        if self.fail {
            bail!("relay offline");
        }
        Ok(self.inbox.lock().unwrap().remove(topic).unwrap_or_default())
    }
}

/// Collaborators behind an [`AppState`], kept so tests can inspect them.
pub struct TestApp {
    pub state: AppState,
    pub classifier: Arc<FakeClassifier>,
    pub archive: Arc<FakeArchive>,
    pub chat: Arc<FakeTransport>,
}

pub fn test_app(
    classifier: FakeClassifier,
    archive: FakeArchive,
    chat: FakeTransport,
    batch_size: usize,
) -> TestApp {
    let mut config = FriendCircleConfig::default();
    config.webhook.batch_size = batch_size;

    let classifier = Arc::new(classifier);
    let archive = Arc::new(archive);
    let chat = Arc::new(chat);
    let state = AppState::new(
        shared_db(),
        classifier.clone(),
        archive.clone(),
        chat.clone(),
        Arc::new(config),
    );
    TestApp {
        state,
        classifier,
        archive,
        chat,
    }
}

pub fn default_app() -> TestApp {
    test_app(
        FakeClassifier::returning(&[Tag::Football]),
        FakeArchive::default(),
        FakeTransport::default(),
        2,
    )
}
