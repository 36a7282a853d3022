//! Evaluation orchestrator.
//!
//! One evaluation reads everything it needs from the state store, decides
//! what (if anything) to send, performs the single outbound dispatch, and
//! persists the new fingerprint only after confirmed delivery. The decision
//! itself is a pure function of (preferences, snapshot, identity, last
//! fingerprint), so it is tested without persistence or network.
//!
//! Two entry points funnel into the same evaluation: a deferred bootstrap
//! run and an immediate run on snapshot refresh. They are not mutually
//! exclusive; if both fire before either persists its fingerprint the
//! recipient may see one duplicate message, which is accepted over adding a
//! lock around a content-keyed dedup.

use std::sync::Arc;

use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time::Duration;

use crate::config::Preferences;
use crate::error::Result;
use crate::models::{Config, DEFAULT_RECIPIENT, Identity, NotificationPayload, PendingItem, SourceTag};
use crate::pipeline::extract::extract_pending_items;
use crate::pipeline::fingerprint::content_fingerprint;
use crate::pipeline::format::format_message;
use crate::services::WebhookDispatcher;
use crate::storage::{self, COURSE_DATA_KEY, LAST_SENT_HASH_KEY, StateStore, USER_INFO_KEY};

/// Terminal state of one evaluation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Notifications disabled or no recipient configured
    Disabled,
    /// No usable course snapshot in the store
    NoSnapshot,
    /// Content unchanged since the last delivery
    Skipped,
    /// Dispatch succeeded and the fingerprint was advanced
    Delivered { count: usize },
    /// Dispatch failed; state untouched so the next trigger retries
    Failed,
}

/// What a single evaluation decided to do.
#[derive(Debug)]
enum Plan {
    Disabled,
    NoSnapshot,
    Skip,
    Send {
        message: String,
        fingerprint: String,
        items: Vec<PendingItem>,
    },
}

/// Decide on an action without performing any I/O.
fn plan_evaluation(
    prefs: &Preferences,
    base_url: &str,
    snapshot: Option<&Value>,
    identity: Option<&Identity>,
    last_fingerprint: Option<&str>,
) -> Plan {
    if !prefs.is_active() {
        return Plan::Disabled;
    }

    let snapshot = match snapshot {
        Some(s) if s.as_array().is_some_and(|courses| !courses.is_empty()) => s,
        _ => return Plan::NoSnapshot,
    };

    let items = if prefs.include_incomplete {
        extract_pending_items(snapshot, base_url)
    } else {
        Vec::new()
    };

    let recipient = identity.map_or(DEFAULT_RECIPIENT, Identity::display_name);
    let message = format_message(recipient, &items);
    let fingerprint = content_fingerprint(&prefs.phone, &message);

    if last_fingerprint == Some(fingerprint.as_str()) {
        Plan::Skip
    } else {
        Plan::Send {
            message,
            fingerprint,
            items,
        }
    }
}

/// Orchestrates evaluation runs against a state store and webhook endpoint.
#[derive(Clone)]
pub struct Notifier {
    config: Arc<Config>,
    store: Arc<dyn StateStore>,
    dispatcher: WebhookDispatcher,
}

impl Notifier {
    /// Create a notifier over the given configuration and store.
    pub fn new(config: Arc<Config>, store: Arc<dyn StateStore>) -> Result<Self> {
        let dispatcher = WebhookDispatcher::new(&config.http)?;
        Ok(Self {
            config,
            store,
            dispatcher,
        })
    }

    /// Run one full evaluation.
    ///
    /// Never fails: every degradable condition ends in an [`Outcome`], and
    /// the only post-delivery write failure is logged rather than raised
    /// (the stale fingerprint costs at most one duplicate next run).
    pub async fn evaluate_and_notify(&self, source: SourceTag) -> Outcome {
        let store = self.store.as_ref();
        let prefs = Preferences::load(store).await;
        let snapshot: Option<Value> = storage::read_json(store, COURSE_DATA_KEY).await;
        let identity: Option<Identity> = storage::read_json(store, USER_INFO_KEY).await;
        let last = match store.get(LAST_SENT_HASH_KEY).await {
            Ok(last) => last,
            Err(e) => {
                log::warn!("Could not read last-sent fingerprint: {}. Treating as absent.", e);
                None
            }
        };

        let plan = plan_evaluation(
            &prefs,
            &self.config.portal.base_url,
            snapshot.as_ref(),
            identity.as_ref(),
            last.as_deref(),
        );

        match plan {
            Plan::Disabled => {
                log::debug!("Notifier disabled or no recipient; skipping {} run", source.as_str());
                Outcome::Disabled
            }
            Plan::NoSnapshot => {
                log::debug!("No usable course snapshot; skipping {} run", source.as_str());
                Outcome::NoSnapshot
            }
            Plan::Skip => {
                log::debug!("Content unchanged; suppressing duplicate notification");
                Outcome::Skipped
            }
            Plan::Send {
                message,
                fingerprint,
                items,
            } => {
                let payload =
                    NotificationPayload::new(&prefs.phone, identity.as_ref(), source, items, message);
                let count = payload.count;

                if self.dispatcher.dispatch(&prefs.webhook_url, &payload).await {
                    log::info!(
                        "Delivered {} pending item(s) to {} (source: {})",
                        count,
                        prefs.phone,
                        source.as_str()
                    );
                    if let Err(e) = store.set(LAST_SENT_HASH_KEY, &fingerprint).await {
                        log::error!("Delivered but could not persist fingerprint: {}", e);
                    }
                    Outcome::Delivered { count }
                } else {
                    log::warn!("Dispatch failed; fingerprint left unchanged for retry");
                    Outcome::Failed
                }
            }
        }
    }

    /// Deferred bootstrap run: evaluates once after the configured delay.
    ///
    /// Returns the task handle so a host that shuts down early can abort
    /// the pending run.
    pub fn bootstrap(&self) -> JoinHandle<Outcome> {
        let notifier = self.clone();
        let delay = Duration::from_millis(self.config.bootstrap.delay_ms);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            notifier.evaluate_and_notify(SourceTag::Bootstrap).await
        })
    }

    /// Immediate run for a refreshed course snapshot.
    pub async fn on_course_data_updated(&self) -> Outcome {
        self.evaluate_and_notify(SourceTag::CourseUpdate).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{
        ENABLED_KEY, LocalStateStore, NOTIFY_INCOMPLETE_KEY, PHONE_KEY, WEBHOOK_URL_KEY,
    };
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    /// Minimal loopback webhook endpoint: answers every POST with `status`
    /// and records how many requests arrived and their bodies.
    struct WebhookStub {
        url: String,
        hits: Arc<AtomicUsize>,
        bodies: Arc<Mutex<Vec<String>>>,
        handle: JoinHandle<()>,
    }

    impl WebhookStub {
        async fn spawn(status: &'static str) -> Self {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let hits = Arc::new(AtomicUsize::new(0));
            let bodies = Arc::new(Mutex::new(Vec::new()));

            let task_hits = Arc::clone(&hits);
            let task_bodies = Arc::clone(&bodies);
            let handle = tokio::spawn(async move {
                loop {
                    let Ok((mut socket, _)) = listener.accept().await else {
                        break;
                    };
                    task_hits.fetch_add(1, Ordering::SeqCst);

                    let mut buf = Vec::new();
                    let mut chunk = [0u8; 1024];
                    let body = loop {
                        let Ok(n) = socket.read(&mut chunk).await else {
                            break String::new();
                        };
                        if n == 0 {
                            break String::new();
                        }
                        buf.extend_from_slice(&chunk[..n]);
                        if let Some(end) = find_header_end(&buf) {
                            let len = content_length(&buf[..end]);
                            if buf.len() >= end + len {
                                break String::from_utf8_lossy(&buf[end..end + len]).to_string();
                            }
                        }
                    };
                    task_bodies.lock().unwrap().push(body);

                    let response = format!(
                        "HTTP/1.1 {status}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                }
            });

            Self {
                url: format!("http://{addr}/webhook"),
                hits,
                bodies,
                handle,
            }
        }

        fn hit_count(&self) -> usize {
            self.hits.load(Ordering::SeqCst)
        }

        fn last_body(&self) -> serde_json::Value {
            let bodies = self.bodies.lock().unwrap();
            serde_json::from_str(bodies.last().expect("no request recorded")).unwrap()
        }
    }

    impl Drop for WebhookStub {
        fn drop(&mut self) {
            self.handle.abort();
        }
    }

    fn find_header_end(buf: &[u8]) -> Option<usize> {
        buf.windows(4).position(|w| w == b"\r\n\r\n").map(|p| p + 4)
    }

    fn content_length(headers: &[u8]) -> usize {
        String::from_utf8_lossy(headers)
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse().ok())?
            })
            .unwrap_or(0)
    }

    fn sample_snapshot() -> Value {
        json!([{
            "kode_course": "MK001",
            "coursename": "Kalkulus",
            "section": [{
                "nama_section": "Pertemuan 1",
                "sub_section": [
                    {"kode_template": "PRE_TEST", "judul": "Pre Test 1", "id": "41"},
                    {"kode_template": "FORUM_DISKUSI", "judul": "Diskusi 1", "id": "42"},
                    {"kode_template": "POST_TEST", "judul": "Post Test 1", "id": "43", "completion": true},
                ],
            }],
        }])
    }

    async fn seeded_notifier(webhook_url: &str, tmp: &TempDir) -> Notifier {
        let store = LocalStateStore::new(tmp.path());
        store.set(ENABLED_KEY, "true").await.unwrap();
        store.set(PHONE_KEY, "6281234567890").await.unwrap();
        store.set(WEBHOOK_URL_KEY, webhook_url).await.unwrap();
        store
            .set(COURSE_DATA_KEY, &sample_snapshot().to_string())
            .await
            .unwrap();
        store
            .set(
                USER_INFO_KEY,
                r#"{"fullname":"Budi Santoso","username":"211011400001"}"#,
            )
            .await
            .unwrap();

        Notifier::new(Arc::new(Config::default()), Arc::new(store)).unwrap()
    }

    // ==================== pure planning tests ====================

    fn active_prefs() -> Preferences {
        Preferences {
            enabled: true,
            phone: "628".to_string(),
            webhook_url: "http://localhost/hook".to_string(),
            include_incomplete: true,
        }
    }

    #[test]
    fn plan_disabled_without_recipient() {
        let mut prefs = active_prefs();
        prefs.phone = String::new();
        let snapshot = sample_snapshot();
        let plan = plan_evaluation(&prefs, "https://m", Some(&snapshot), None, None);
        assert!(matches!(plan, Plan::Disabled));

        let mut prefs = active_prefs();
        prefs.enabled = false;
        let plan = plan_evaluation(&prefs, "https://m", Some(&snapshot), None, None);
        assert!(matches!(plan, Plan::Disabled));
    }

    #[test]
    fn plan_requires_non_empty_array_snapshot() {
        let prefs = active_prefs();
        for snapshot in [None, Some(json!([])), Some(json!({"not": "array"})), Some(json!(7))] {
            let plan = plan_evaluation(&prefs, "https://m", snapshot.as_ref(), None, None);
            assert!(matches!(plan, Plan::NoSnapshot), "snapshot: {snapshot:?}");
        }
    }

    #[test]
    fn plan_skips_when_fingerprint_matches() {
        let prefs = active_prefs();
        let snapshot = sample_snapshot();

        let Plan::Send { fingerprint, .. } =
            plan_evaluation(&prefs, "https://m", Some(&snapshot), None, None)
        else {
            panic!("expected Send");
        };

        let plan = plan_evaluation(&prefs, "https://m", Some(&snapshot), None, Some(&fingerprint));
        assert!(matches!(plan, Plan::Skip));
    }

    #[test]
    fn plan_with_include_disabled_reports_zero_items() {
        let mut prefs = active_prefs();
        prefs.include_incomplete = false;
        let snapshot = sample_snapshot();

        let Plan::Send { items, message, .. } =
            plan_evaluation(&prefs, "https://m", Some(&snapshot), None, None)
        else {
            panic!("expected Send");
        };
        assert!(items.is_empty());
        assert_eq!(message, "Tidak ada tugas tertunda untuk Mahasiswa.");
    }

    #[test]
    fn plan_binds_handle_into_fingerprint() {
        let snapshot = sample_snapshot();
        let mut prefs_a = active_prefs();
        prefs_a.phone = "111".to_string();
        let mut prefs_b = active_prefs();
        prefs_b.phone = "222".to_string();

        let (Plan::Send { fingerprint: fa, .. }, Plan::Send { fingerprint: fb, .. }) = (
            plan_evaluation(&prefs_a, "https://m", Some(&snapshot), None, None),
            plan_evaluation(&prefs_b, "https://m", Some(&snapshot), None, None),
        ) else {
            panic!("expected Send for both");
        };
        assert_ne!(fa, fb);
    }

    // ==================== end-to-end orchestration tests ====================

    #[tokio::test]
    async fn delivers_once_then_skips_unchanged_content() {
        let stub = WebhookStub::spawn("200 OK").await;
        let tmp = TempDir::new().unwrap();
        let notifier = seeded_notifier(&stub.url, &tmp).await;

        let first = notifier.on_course_data_updated().await;
        assert_eq!(first, Outcome::Delivered { count: 2 });
        assert_eq!(stub.hit_count(), 1);

        let second = notifier.on_course_data_updated().await;
        assert_eq!(second, Outcome::Skipped);
        assert_eq!(stub.hit_count(), 1);
    }

    #[tokio::test]
    async fn payload_matches_wire_contract() {
        let stub = WebhookStub::spawn("200 OK").await;
        let tmp = TempDir::new().unwrap();
        let notifier = seeded_notifier(&stub.url, &tmp).await;

        notifier.on_course_data_updated().await;

        let body = stub.last_body();
        assert_eq!(body["type"], "incomplete_summary");
        assert_eq!(body["phone"], "6281234567890");
        assert_eq!(body["user"]["name"], "Budi Santoso");
        assert_eq!(body["user"]["nim"], "211011400001");
        assert_eq!(body["source"], "course_update");
        assert_eq!(body["count"], 2);
        assert_eq!(body["items"][0]["kodeCourse"], "MK001");
        assert_eq!(
            body["items"][0]["url"],
            "https://mentari.unpam.ac.id/u-courses/MK001/exam/41"
        );
        let message = body["message"].as_str().unwrap();
        assert!(message.starts_with("Halo Budi Santoso, ada 2 item belum selesai:"));
        assert!(message.contains("- Link: https://mentari.unpam.ac.id/u-courses/MK001/exam/41"));
    }

    #[tokio::test]
    async fn snapshot_change_reopens_delivery() {
        let stub = WebhookStub::spawn("200 OK").await;
        let tmp = TempDir::new().unwrap();
        let notifier = seeded_notifier(&stub.url, &tmp).await;

        assert!(matches!(
            notifier.on_course_data_updated().await,
            Outcome::Delivered { .. }
        ));
        assert_eq!(notifier.on_course_data_updated().await, Outcome::Skipped);

        // One item flips to completed; the extracted count changes.
        let mut snapshot = sample_snapshot();
        snapshot[0]["section"][0]["sub_section"][0]["completion"] = json!(true);
        notifier
            .store
            .set(COURSE_DATA_KEY, &snapshot.to_string())
            .await
            .unwrap();

        assert_eq!(
            notifier.on_course_data_updated().await,
            Outcome::Delivered { count: 1 }
        );
        assert_eq!(stub.hit_count(), 2);
    }

    #[tokio::test]
    async fn failed_dispatch_leaves_fingerprint_untouched() {
        let stub = WebhookStub::spawn("500 Internal Server Error").await;
        let tmp = TempDir::new().unwrap();
        let notifier = seeded_notifier(&stub.url, &tmp).await;

        assert_eq!(notifier.on_course_data_updated().await, Outcome::Failed);
        assert_eq!(
            notifier.store.get(LAST_SENT_HASH_KEY).await.unwrap(),
            None
        );

        // The next trigger retries the same content instead of skipping.
        assert_eq!(notifier.on_course_data_updated().await, Outcome::Failed);
        assert_eq!(stub.hit_count(), 2);
    }

    #[tokio::test]
    async fn include_flag_off_still_notifies_zero_items() {
        let stub = WebhookStub::spawn("200 OK").await;
        let tmp = TempDir::new().unwrap();
        let notifier = seeded_notifier(&stub.url, &tmp).await;
        notifier
            .store
            .set(NOTIFY_INCOMPLETE_KEY, "false")
            .await
            .unwrap();

        assert_eq!(
            notifier.on_course_data_updated().await,
            Outcome::Delivered { count: 0 }
        );
        let body = stub.last_body();
        assert_eq!(body["count"], 0);
        assert_eq!(body["message"], "Tidak ada tugas tertunda untuk Budi Santoso.");
    }

    #[tokio::test]
    async fn disabled_run_makes_no_network_call() {
        let stub = WebhookStub::spawn("200 OK").await;
        let tmp = TempDir::new().unwrap();
        let notifier = seeded_notifier(&stub.url, &tmp).await;
        notifier.store.set(ENABLED_KEY, "false").await.unwrap();

        assert_eq!(notifier.on_course_data_updated().await, Outcome::Disabled);
        assert_eq!(stub.hit_count(), 0);
    }

    #[tokio::test]
    async fn missing_snapshot_stops_early() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStateStore::new(tmp.path());
        store.set(ENABLED_KEY, "true").await.unwrap();
        store.set(PHONE_KEY, "628").await.unwrap();
        let notifier = Notifier::new(Arc::new(Config::default()), Arc::new(store)).unwrap();

        assert_eq!(notifier.on_course_data_updated().await, Outcome::NoSnapshot);
    }

    #[tokio::test]
    async fn unparseable_snapshot_is_treated_as_absent() {
        let stub = WebhookStub::spawn("200 OK").await;
        let tmp = TempDir::new().unwrap();
        let notifier = seeded_notifier(&stub.url, &tmp).await;
        notifier
            .store
            .set(COURSE_DATA_KEY, "{definitely not json")
            .await
            .unwrap();

        assert_eq!(notifier.on_course_data_updated().await, Outcome::NoSnapshot);
        assert_eq!(stub.hit_count(), 0);
    }

    #[tokio::test]
    async fn missing_identity_falls_back_to_default_recipient() {
        let stub = WebhookStub::spawn("200 OK").await;
        let tmp = TempDir::new().unwrap();
        let notifier = seeded_notifier(&stub.url, &tmp).await;
        notifier.store.set(USER_INFO_KEY, "null").await.unwrap();

        notifier.on_course_data_updated().await;
        let body = stub.last_body();
        assert!(
            body["message"]
                .as_str()
                .unwrap()
                .starts_with("Halo Mahasiswa,")
        );
    }

    #[tokio::test]
    async fn bootstrap_fires_after_delay() {
        let stub = WebhookStub::spawn("200 OK").await;
        let tmp = TempDir::new().unwrap();
        let store = LocalStateStore::new(tmp.path());
        store.set(ENABLED_KEY, "true").await.unwrap();
        store.set(PHONE_KEY, "628").await.unwrap();
        store.set(WEBHOOK_URL_KEY, &stub.url).await.unwrap();
        store
            .set(COURSE_DATA_KEY, &sample_snapshot().to_string())
            .await
            .unwrap();

        let mut config = Config::default();
        config.bootstrap.delay_ms = 10;
        let notifier = Notifier::new(Arc::new(config), Arc::new(store)).unwrap();

        let outcome = notifier.bootstrap().await.unwrap();
        assert!(matches!(outcome, Outcome::Delivered { .. }));
        assert_eq!(stub.last_body()["source"], "bootstrap");
    }

    #[tokio::test]
    async fn bootstrap_can_be_aborted_before_it_fires() {
        let stub = WebhookStub::spawn("200 OK").await;
        let tmp = TempDir::new().unwrap();
        let notifier = seeded_notifier(&stub.url, &tmp).await;

        let mut config = Config::default();
        config.bootstrap.delay_ms = 60_000;
        let notifier = Notifier {
            config: Arc::new(config),
            ..notifier
        };

        let handle = notifier.bootstrap();
        handle.abort();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(stub.hit_count(), 0);
    }
}
