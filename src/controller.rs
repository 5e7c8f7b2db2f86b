use std::sync::Arc;

use futures_util::future::{FutureExt, LocalBoxFuture};
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::{
    auth::{RouteDecision, UserAccount, UserDirectory, View, guard},
    capabilities::encode_file,
    config::AppConfig,
    errors::{AppError, Result},
    events::{BroadcastSender, SessionCommand, broadcast_json, outcome_summary},
    models::{GarmentSlot, GenerationMode, ResultSet},
    orchestrator::BatchOrchestrator,
    providers::GenerationClient,
    session::SessionState,
    util::DownloadWriter,
};

/// A dispatched batch. The session loop polls it next to new input so
/// commands that arrive mid-run are answered straight away.
struct InFlightRun {
    mode: GenerationMode,
    task: LocalBoxFuture<'static, Result<ResultSet>>,
}

/// Owns one interactive session: who is signed in, which view is open, the
/// try-on state and the collaborators that act on it. Every command result is
/// reported on the broadcast bus.
pub struct TryOnController<C> {
    users: UserDirectory,
    current_user: Option<UserAccount>,
    current_view: Option<View>,
    session: SessionState,
    orchestrator: Arc<BatchOrchestrator<C>>,
    in_flight: Option<InFlightRun>,
    downloads: DownloadWriter,
    broadcaster: BroadcastSender,
}

impl<C: GenerationClient + 'static> TryOnController<C> {
    pub async fn new(config: &AppConfig, client: C, broadcaster: BroadcastSender) -> Result<Self> {
        let users = UserDirectory::open(
            config.users.store_path.clone(),
            config.users.admin_username.clone(),
        )
        .await?;

        Ok(Self {
            users,
            current_user: None,
            current_view: None,
            session: SessionState::new(),
            orchestrator: Arc::new(BatchOrchestrator::new(client, Some(broadcaster.clone()))),
            in_flight: None,
            downloads: DownloadWriter::new(config.downloads.dir.clone(), config.downloads.stagger),
            broadcaster,
        })
    }

    pub fn has_run_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Waits for the in-flight run and applies its outcome. Cancelling this
    /// future before it resolves leaves the run in flight.
    pub async fn complete_run(&mut self) {
        let Some(run) = self.in_flight.as_mut() else {
            return;
        };
        let outcome = (&mut run.task).await;
        let mode = run.mode;
        self.in_flight = None;

        match outcome {
            Ok(results) => {
                self.emit("generation.settled", settled_payload(&results));
                self.session.finish_run(results);
            }
            Err(err) => {
                self.session.abort_run();
                self.emit(
                    "generation.failed",
                    json!({
                        "mode": mode.as_str(),
                        "kind": err.kind(),
                        "message": err.to_string(),
                    }),
                );
            }
        }
    }

    /// Runs one command. Failures are reported as `app.error` and never end
    /// the session.
    pub async fn handle(&mut self, command: SessionCommand) {
        if let Err(err) = self.dispatch(command).await {
            warn!(target: "controller", kind = err.kind(), error = %err, "command failed");
            self.emit(
                "app.error",
                json!({
                    "kind": err.kind(),
                    "message": err.to_string(),
                }),
            );
        }
    }

    async fn dispatch(&mut self, command: SessionCommand) -> Result<()> {
        match command {
            SessionCommand::Register { username, password } => {
                self.ensure_no_run()?;
                let account = self.users.create(&username, &password).await?;
                self.emit("auth.registered", json!({ "user": account }));
                self.sign_in(account);
            }
            SessionCommand::Login { username, password } => {
                self.ensure_no_run()?;
                let account = self.users.authenticate(&username, &password)?;
                self.sign_in(account);
            }
            SessionCommand::Logout => {
                self.ensure_no_run()?;
                self.sign_out();
            }
            SessionCommand::Open { view } => self.open(view),
            SessionCommand::DeleteUser { username } => self.delete_user(&username).await?,
            SessionCommand::ListUsers => {
                self.require(View::Admin)?;
                self.emit("auth.users", json!({ "users": self.users.list() }));
            }
            SessionCommand::SetMode { mode } => {
                self.require(View::Application)?;
                self.session.set_mode(mode)?;
                self.emit_state();
            }
            SessionCommand::SetKind { kind } => {
                self.require(View::Application)?;
                self.session.set_kind(kind)?;
                self.emit_state();
            }
            SessionCommand::Upload { slot, path } => {
                self.require(View::Application)?;
                let image = encode_file(&path).await?;
                let media_type = image.media_type().to_string();
                self.session.set_slot(slot, image)?;
                self.emit_slot(slot, Some(&media_type));
                self.emit_state();
            }
            SessionCommand::Clear { slot } => {
                self.require(View::Application)?;
                self.session.clear_slot(slot)?;
                self.emit_slot(slot, None);
                self.emit_state();
            }
            SessionCommand::SetInput { field, value } => {
                self.require(View::Application)?;
                self.session.set_input(field, &value)?;
                self.emit_state();
            }
            SessionCommand::Generate => self.generate()?,
            SessionCommand::Download { index } => self.download(index).await?,
            SessionCommand::DownloadAll => self.download_all().await?,
            SessionCommand::Status => self.emit_state(),
            SessionCommand::Help => {
                self.emit("help", json!({ "message": help_message() }));
            }
        }
        Ok(())
    }

    fn generate(&mut self) -> Result<()> {
        self.require(View::Application)?;
        let (mode, requests) = self.session.begin_run()?;

        info!(target: "controller", %mode, requests = requests.len(), "generation requested");
        self.emit(
            "generation.started",
            json!({
                "mode": mode.as_str(),
                "titles": requests.iter().map(|r| r.title.as_str()).collect::<Vec<_>>(),
            }),
        );

        let orchestrator = Arc::clone(&self.orchestrator);
        self.in_flight = Some(InFlightRun {
            mode,
            task: async move { orchestrator.run(mode, requests).await }.boxed_local(),
        });
        Ok(())
    }

    async fn download(&self, index: usize) -> Result<()> {
        self.require(View::Application)?;
        let results = self
            .session
            .results()
            .ok_or_else(|| AppError::not_permitted("there are no results to download"))?;
        let outcome = results
            .get(index)
            .ok_or_else(|| AppError::not_permitted(format!("no result at index {index}")))?;

        let path = self.downloads.save(index, outcome, results.mode()).await?;
        let title = outcome.title().to_string();
        self.emit(
            "download.saved",
            json!({
                "index": index,
                "title": title,
                "path": path.display().to_string(),
            }),
        );
        Ok(())
    }

    async fn download_all(&self) -> Result<()> {
        self.require(View::Application)?;
        let results = self
            .session
            .results()
            .ok_or_else(|| AppError::not_permitted("there are no results to download"))?;

        let report = self.downloads.save_all(results).await?;
        self.emit(
            "download.completed",
            json!({
                "saved": report
                    .saved
                    .iter()
                    .map(|path| path.display().to_string())
                    .collect::<Vec<_>>(),
                "skipped": report.skipped,
                "dir": self.downloads.root().display().to_string(),
            }),
        );
        Ok(())
    }

    async fn delete_user(&mut self, username: &str) -> Result<()> {
        let target = username.trim().to_lowercase();
        let is_self = self
            .current_user
            .as_ref()
            .is_some_and(|user| user.username == target);

        if is_self {
            self.ensure_no_run()?;
            self.require(View::Account)?;
        } else {
            self.require(View::Admin)?;
        }

        let removed = self.users.delete(&target).await?;
        self.emit(
            "auth.deleted",
            json!({ "user": removed, "self": is_self }),
        );
        if is_self {
            self.sign_out();
        }
        Ok(())
    }

    fn open(&mut self, view: View) {
        let decision = guard(view, self.current_user.as_ref());
        let event = match decision {
            RouteDecision::Allow => {
                self.current_view = Some(view);
                "route.changed"
            }
            RouteDecision::RedirectToLogin => "route.redirect",
            RouteDecision::Forbidden => "route.forbidden",
        };
        self.emit(
            event,
            json!({
                "requested": view.as_str(),
                "decision": decision.as_str(),
                "view": self.current_view.map(|view| view.as_str()),
            }),
        );
    }

    /// The signed-in user must be allowed into `view` and have it open.
    fn require(&self, view: View) -> Result<()> {
        match guard(view, self.current_user.as_ref()) {
            RouteDecision::Allow if self.current_view == Some(view) => Ok(()),
            RouteDecision::Allow => Err(AppError::not_permitted(format!(
                "open the {} view first",
                view.as_str()
            ))),
            RouteDecision::RedirectToLogin => Err(AppError::auth("sign in first")),
            RouteDecision::Forbidden => Err(AppError::not_permitted(format!(
                "the {} view needs the admin role",
                view.as_str()
            ))),
        }
    }

    fn ensure_no_run(&self) -> Result<()> {
        if self.has_run_in_flight() {
            Err(AppError::Busy)
        } else {
            Ok(())
        }
    }

    fn sign_in(&mut self, account: UserAccount) {
        info!(target: "controller", username = %account.username, "signed in");
        self.session = SessionState::new();
        self.current_view = Some(View::Application);
        self.emit(
            "auth.logged_in",
            json!({ "user": &account, "view": View::Application.as_str() }),
        );
        self.current_user = Some(account);
    }

    fn sign_out(&mut self) {
        let previous = self.current_user.take();
        self.current_view = None;
        self.session = SessionState::new();
        self.emit(
            "auth.logged_out",
            json!({ "username": previous.map(|user| user.username) }),
        );
    }

    fn emit_slot(&self, slot: GarmentSlot, media_type: Option<&str>) {
        self.emit(
            "slot.updated",
            json!({
                "slot": slot.as_str(),
                "populated": media_type.is_some(),
                "media_type": media_type,
            }),
        );
    }

    fn emit_state(&self) {
        let mut payload = self.session.status_payload();
        if let Value::Object(map) = &mut payload {
            map.insert(
                "user".to_string(),
                json!(self.current_user.as_ref().map(|user| user.username.as_str())),
            );
            map.insert(
                "view".to_string(),
                json!(self.current_view.map(|view| view.as_str())),
            );
        }
        self.emit("session.state", payload);
    }

    fn emit(&self, event: &str, payload: Value) {
        broadcast_json(&self.broadcaster, event, payload);
    }
}

fn settled_payload(results: &ResultSet) -> Value {
    json!({
        "mode": results.mode().as_str(),
        "succeeded": results.success_count(),
        "all_failed": results.all_failed(),
        "total": results.len(),
        "items": results
            .iter()
            .enumerate()
            .map(|(index, outcome)| outcome_summary(index, outcome))
            .collect::<Vec<_>>(),
    })
}

pub fn help_message() -> String {
    [
        "Send one JSON command per line, e.g. {\"action\":\"login\",\"username\":\"ayesha\",\"password\":\"secret1\"}",
        "",
        "Account: register, login, logout, open {view}, delete_user {username}, list_users",
        "Try-on: set_mode {single_composite|multi_pose}, set_kind {two_piece|three_piece}",
        "Uploads: upload {slot, path}, clear {slot}  (slots: kameez, dupatta, trouser, model_reference)",
        "Inputs: set_input {field, value}  (fields: model_description, background, outfit_color, aspect_ratio)",
        "Run: generate, status",
        "Results: download {index}, download_all",
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use std::{path::Path, time::Duration};

    use tokio::sync::broadcast;

    use super::*;
    use crate::{
        config::{DownloadsConfig, GeminiConfig, UsersConfig},
        events::{InputField, message_bus},
        orchestrator::tests::{FakeClient, Script},
        session::RunPhase,
    };

    struct Harness {
        controller: TryOnController<FakeClient>,
        receiver: broadcast::Receiver<String>,
        dir: tempfile::TempDir,
    }

    impl Harness {
        async fn new(client: FakeClient) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let config = test_config(dir.path());
            let (sender, receiver) = message_bus();
            let controller = TryOnController::new(&config, client, sender).await.unwrap();
            Self {
                controller,
                receiver,
                dir,
            }
        }

        async fn send(&mut self, command: SessionCommand) -> Vec<Value> {
            self.controller.handle(command).await;
            self.drain()
        }

        /// Sends `generate` and drives the resulting run to completion.
        async fn generate(&mut self) -> Vec<Value> {
            let mut events = self.send(SessionCommand::Generate).await;
            self.controller.complete_run().await;
            events.extend(self.drain());
            events
        }

        fn drain(&mut self) -> Vec<Value> {
            let mut events = Vec::new();
            while let Ok(message) = self.receiver.try_recv() {
                events.push(serde_json::from_str(&message).unwrap());
            }
            events
        }

        async fn login_new(&mut self, username: &str) {
            self.send(SessionCommand::Register {
                username: username.into(),
                password: "secret1".into(),
            })
            .await;
        }
    }

    fn test_config(root: &Path) -> AppConfig {
        AppConfig {
            gemini: GeminiConfig {
                api_key: Some("test".into()),
                model: "test-model".into(),
                endpoint: "http://localhost".into(),
                request_timeout: None,
            },
            downloads: DownloadsConfig {
                dir: root.join("downloads"),
                stagger: Duration::ZERO,
            },
            users: UsersConfig {
                store_path: root.join("users.json"),
                admin_username: "admin".into(),
            },
        }
    }

    fn find<'a>(events: &'a [Value], name: &str) -> Option<&'a Value> {
        events.iter().find(|event| event["event"] == name)
    }

    fn write_png(dir: &Path, name: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, [0x89, b'P', b'N', b'G']).unwrap();
        path
    }

    #[tokio::test]
    async fn generation_requires_sign_in() {
        let mut harness = Harness::new(FakeClient::succeeding()).await;

        let events = harness.send(SessionCommand::Generate).await;
        let error = find(&events, "app.error").unwrap();
        assert_eq!(error["payload"]["kind"], "auth");
        assert_eq!(harness.controller.orchestrator.client().calls(), 0);
    }

    #[tokio::test]
    async fn multi_pose_run_settles_in_catalog_order_and_downloads() {
        let client = FakeClient::new([
            ("Front Pose", Script::Image { delay_ms: 50 }),
            ("Close-up Pose", Script::Error { delay_ms: 0 }),
        ]);
        let mut harness = Harness::new(client).await;
        harness.login_new("ayesha").await;
        harness
            .send(SessionCommand::SetMode {
                mode: GenerationMode::MultiPose,
            })
            .await;

        let events = harness.generate().await;
        let started = find(&events, "generation.started").unwrap();
        assert_eq!(started["payload"]["titles"].as_array().unwrap().len(), 5);
        assert_eq!(
            events
                .iter()
                .filter(|event| event["event"] == "generation.item")
                .count(),
            5
        );

        let settled = &find(&events, "generation.settled").unwrap()["payload"];
        assert_eq!(settled["total"], 5);
        assert_eq!(settled["succeeded"], 4);
        let titles: Vec<_> = settled["items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|item| item["title"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(
            titles,
            [
                "Front Pose",
                "Side Pose",
                "Close-up Pose",
                "Three-Quarter Pose",
                "Back Pose"
            ]
        );
        assert_eq!(settled["items"][2]["status"], "failed");
        assert_eq!(harness.controller.session.phase(), RunPhase::Settled);

        let events = harness.send(SessionCommand::Download { index: 2 }).await;
        assert_eq!(
            find(&events, "app.error").unwrap()["payload"]["kind"],
            "not_permitted"
        );

        let events = harness.send(SessionCommand::DownloadAll).await;
        let completed = &find(&events, "download.completed").unwrap()["payload"];
        assert_eq!(completed["skipped"], json!([2]));
        assert_eq!(completed["saved"].as_array().unwrap().len(), 4);
        assert!(harness.dir.path().join("downloads/front-pose.png").exists());
    }

    #[tokio::test]
    async fn single_composite_waits_for_required_uploads() {
        let mut harness = Harness::new(FakeClient::succeeding()).await;
        harness.login_new("ayesha").await;

        let events = harness.send(SessionCommand::Generate).await;
        assert_eq!(
            find(&events, "app.error").unwrap()["payload"]["kind"],
            "not_permitted"
        );

        let kameez = write_png(harness.dir.path(), "kameez.png");
        let dupatta = write_png(harness.dir.path(), "dupatta.png");
        let events = harness
            .send(SessionCommand::Upload {
                slot: GarmentSlot::Kameez,
                path: kameez,
            })
            .await;
        let slot = &find(&events, "slot.updated").unwrap()["payload"];
        assert_eq!(slot["slot"], "kameez");
        assert_eq!(slot["media_type"], "image/png");

        harness
            .send(SessionCommand::Upload {
                slot: GarmentSlot::Dupatta,
                path: dupatta,
            })
            .await;
        harness
            .send(SessionCommand::SetInput {
                field: InputField::AspectRatio,
                value: "1:1".into(),
            })
            .await;

        let events = harness.generate().await;
        let settled = &find(&events, "generation.settled").unwrap()["payload"];
        assert_eq!(settled["total"], 1);
        assert_eq!(settled["items"][0]["title"], "Virtual Try-On");
        assert_eq!(harness.controller.orchestrator.client().calls(), 1);

        let events = harness.send(SessionCommand::Download { index: 0 }).await;
        let saved = &find(&events, "download.saved").unwrap()["payload"];
        assert!(saved["path"].as_str().unwrap().ends_with("virtual-try-on.png"));
    }

    #[tokio::test]
    async fn dispatch_failure_reports_and_allows_retry() {
        let mut harness = Harness::new(FakeClient::offline()).await;
        harness.login_new("ayesha").await;
        harness
            .send(SessionCommand::SetMode {
                mode: GenerationMode::MultiPose,
            })
            .await;

        let events = harness.generate().await;
        let failed = &find(&events, "generation.failed").unwrap()["payload"];
        assert_eq!(failed["kind"], "dispatch");
        assert!(find(&events, "generation.settled").is_none());
        assert_eq!(harness.controller.session.phase(), RunPhase::Idle);
        assert!(harness.controller.session.results().is_none());
        assert!(harness.controller.session.can_generate());
    }

    #[tokio::test]
    async fn mode_switch_clears_results_and_keeps_uploads() {
        let mut harness = Harness::new(FakeClient::succeeding()).await;
        harness.login_new("ayesha").await;
        let kameez = write_png(harness.dir.path(), "kameez.png");
        harness
            .send(SessionCommand::Upload {
                slot: GarmentSlot::Kameez,
                path: kameez,
            })
            .await;
        harness
            .send(SessionCommand::SetMode {
                mode: GenerationMode::MultiPose,
            })
            .await;
        harness.generate().await;
        assert!(harness.controller.session.results().is_some());

        let events = harness
            .send(SessionCommand::SetMode {
                mode: GenerationMode::SingleComposite,
            })
            .await;
        let state = &find(&events, "session.state").unwrap()["payload"];
        assert_eq!(state["results"], 0);
        assert_eq!(state["slots"][0]["populated"], true);
        assert!(harness.controller.session.results().is_none());
    }

    #[tokio::test]
    async fn admin_view_and_user_listing_need_admin_role() {
        let mut harness = Harness::new(FakeClient::succeeding()).await;
        harness.login_new("zara").await;

        let events = harness.send(SessionCommand::Open { view: View::Admin }).await;
        assert!(find(&events, "route.forbidden").is_some());
        let events = harness.send(SessionCommand::ListUsers).await;
        assert_eq!(find(&events, "app.error").unwrap()["payload"]["kind"], "not_permitted");

        harness.send(SessionCommand::Logout).await;
        let events = harness.send(SessionCommand::Open { view: View::Account }).await;
        assert!(find(&events, "route.redirect").is_some());

        harness.login_new("admin").await;
        let events = harness.send(SessionCommand::ListUsers).await;
        let error = &find(&events, "app.error").unwrap()["payload"];
        assert_eq!(error["kind"], "not_permitted");
        assert!(error["message"].as_str().unwrap().contains("open the admin view"));

        let events = harness.send(SessionCommand::Open { view: View::Admin }).await;
        let route = &find(&events, "route.changed").unwrap()["payload"];
        assert_eq!(route["decision"], "allow");
        assert_eq!(route["view"], "admin");

        let events = harness.send(SessionCommand::ListUsers).await;
        let users = &find(&events, "auth.users").unwrap()["payload"]["users"];
        assert_eq!(users.as_array().unwrap().len(), 2);

        let events = harness
            .send(SessionCommand::DeleteUser {
                username: "zara".into(),
            })
            .await;
        assert_eq!(find(&events, "auth.deleted").unwrap()["payload"]["self"], false);
        assert!(harness.controller.current_user.is_some());

        let events = harness
            .send(SessionCommand::SetMode {
                mode: GenerationMode::MultiPose,
            })
            .await;
        assert_eq!(find(&events, "app.error").unwrap()["payload"]["kind"], "not_permitted");
        harness
            .send(SessionCommand::Open {
                view: View::Application,
            })
            .await;
        let events = harness
            .send(SessionCommand::SetMode {
                mode: GenerationMode::MultiPose,
            })
            .await;
        assert!(find(&events, "app.error").is_none());
    }

    #[tokio::test]
    async fn deleting_own_account_signs_out() {
        let mut harness = Harness::new(FakeClient::succeeding()).await;
        harness.login_new("ayesha").await;

        let events = harness
            .send(SessionCommand::DeleteUser {
                username: "Ayesha".into(),
            })
            .await;
        assert_eq!(find(&events, "app.error").unwrap()["payload"]["kind"], "not_permitted");

        harness
            .send(SessionCommand::Open {
                view: View::Account,
            })
            .await;
        let events = harness
            .send(SessionCommand::DeleteUser {
                username: "Ayesha".into(),
            })
            .await;
        assert_eq!(find(&events, "auth.deleted").unwrap()["payload"]["self"], true);
        assert!(find(&events, "auth.logged_out").is_some());
        assert!(harness.controller.current_user.is_none());

        let events = harness
            .send(SessionCommand::Login {
                username: "ayesha".into(),
                password: "secret1".into(),
            })
            .await;
        assert_eq!(find(&events, "app.error").unwrap()["payload"]["kind"], "auth");
    }

    #[tokio::test]
    async fn generate_while_running_is_rejected_as_busy() {
        let client = FakeClient::new([("Back Pose", Script::Image { delay_ms: 40 })]);
        let mut harness = Harness::new(client).await;
        harness.login_new("ayesha").await;
        harness
            .send(SessionCommand::SetMode {
                mode: GenerationMode::MultiPose,
            })
            .await;

        let events = harness.send(SessionCommand::Generate).await;
        assert!(find(&events, "generation.started").is_some());
        assert!(harness.controller.has_run_in_flight());
        assert_eq!(harness.controller.session.phase(), RunPhase::Running);

        let events = harness.send(SessionCommand::Generate).await;
        assert_eq!(find(&events, "app.error").unwrap()["payload"]["kind"], "busy");
        assert!(find(&events, "generation.started").is_none());

        let events = harness
            .send(SessionCommand::SetMode {
                mode: GenerationMode::SingleComposite,
            })
            .await;
        assert_eq!(find(&events, "app.error").unwrap()["payload"]["kind"], "busy");
        let events = harness.send(SessionCommand::Logout).await;
        assert_eq!(find(&events, "app.error").unwrap()["payload"]["kind"], "busy");

        harness.controller.complete_run().await;
        let events = harness.drain();
        assert_eq!(
            events
                .iter()
                .filter(|event| event["event"] == "generation.settled")
                .count(),
            1
        );
        assert!(!harness.controller.has_run_in_flight());
        assert_eq!(harness.controller.session.phase(), RunPhase::Settled);
        assert_eq!(harness.controller.orchestrator.client().calls(), 5);
    }

    #[tokio::test]
    async fn failed_upload_leaves_slots_untouched() {
        let mut harness = Harness::new(FakeClient::succeeding()).await;
        harness.login_new("ayesha").await;
        let kameez = write_png(harness.dir.path(), "kameez.png");
        harness
            .send(SessionCommand::Upload {
                slot: GarmentSlot::Kameez,
                path: kameez,
            })
            .await;

        let events = harness
            .send(SessionCommand::Upload {
                slot: GarmentSlot::Kameez,
                path: harness.dir.path().join("missing.png"),
            })
            .await;
        assert_eq!(find(&events, "app.error").unwrap()["payload"]["kind"], "io");
        assert!(find(&events, "slot.updated").is_none());

        let empty = harness.dir.path().join("dupatta.png");
        std::fs::write(&empty, b"").unwrap();
        let events = harness
            .send(SessionCommand::Upload {
                slot: GarmentSlot::Dupatta,
                path: empty,
            })
            .await;
        assert_eq!(find(&events, "app.error").unwrap()["payload"]["kind"], "io");

        let slots = harness.controller.session.slots();
        assert!(slots.is_set(GarmentSlot::Kameez));
        assert!(!slots.is_set(GarmentSlot::Dupatta));
    }
}
