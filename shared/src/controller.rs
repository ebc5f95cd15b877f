//! Turns user intents into store mutations, persistence writes and a fresh view.
//!
//! Every intent runs in the same order: validate, write through the persistence
//! variant, stage the change on a copy of the store, save, then swap the copy in.
//! A failed write leaves the store untouched.
//! Failures the user should see are reported through [`UserPrompt::notify`] and
//! also returned to the caller.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::error::{TaskError, TaskResult};
use crate::persistence::{HttpTransport, KeyValueStore, Persistence, PersistenceMode};
use crate::render::{self, TaskListView};
use crate::store::TaskStore;
use crate::task::{validate_text, CreateTaskRequest, Task, TaskFilter, TaskStats, UpdateTaskRequest};
use crate::transfer::{self, IMPORT_SUCCESS_MESSAGE};

/// How long the presentation layer animates a removal before `delete_task` runs.
pub const REMOVAL_TRANSITION: std::time::Duration = std::time::Duration::from_millis(300);

pub const DELETE_CONFIRMATION: &str = "Are you sure you want to delete this task?";
pub const CLEAR_CONFIRMATION: &str =
    "Are you sure you want to delete all tasks? This action cannot be undone.";
pub const IMPORT_REMOTE_MESSAGE: &str = "Import is only available when tasks are stored locally.";

/// Blocking dialogs owned by the UI.
pub trait UserPrompt {
    fn confirm(&self, message: &str) -> bool;
    fn notify(&self, message: &str);
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EditState {
    #[default]
    Idle,
    Editing { task_id: String },
}

#[derive(Debug, Clone)]
pub struct Controller<S, T, U> {
    store: TaskStore,
    persistence: Persistence<S, T>,
    prompt: U,
    filter: TaskFilter,
    edit: EditState,
}

impl<S, T, U> Controller<S, T, U>
where
    S: KeyValueStore,
    T: HttpTransport,
    U: UserPrompt,
{
    pub fn new(persistence: Persistence<S, T>, prompt: U) -> Self {
        Self {
            store: TaskStore::new(),
            persistence,
            prompt,
            filter: TaskFilter::All,
            edit: EditState::Idle,
        }
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn filter(&self) -> TaskFilter {
        self.filter
    }

    pub fn edit_state(&self) -> &EditState {
        &self.edit
    }

    pub fn editing_task_id(&self) -> Option<&str> {
        match &self.edit {
            EditState::Editing { task_id } => Some(task_id),
            EditState::Idle => None,
        }
    }

    pub fn mode(&self) -> PersistenceMode {
        self.persistence.mode()
    }

    pub fn prompt(&self) -> &U {
        &self.prompt
    }

    pub fn render(&self, now: DateTime<Utc>) -> TaskListView {
        render::render(self.store.list(), self.filter, self.editing_task_id(), now)
    }

    pub async fn load(&mut self, now: DateTime<Utc>) -> TaskResult<()> {
        let result = self.load_tasks(now).await;
        self.surface(result)
    }

    pub async fn add_task(
        &mut self,
        text: &str,
        deadline: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> TaskResult<Task> {
        let result = self.create_task(text, deadline, now).await;
        self.surface(result)
    }

    pub async fn toggle_task(&mut self, id: &str) -> TaskResult<Task> {
        let result = match self.store.find_by_id(id).map(|task| task.completed) {
            Some(completed) => {
                self.apply_update(id, &UpdateTaskRequest::completed(!completed))
                    .await
            }
            None => Err(TaskError::NotFound(id.to_string())),
        };
        self.surface(result)
    }

    /// Idle -> Editing. Returns the text the edit field starts with.
    pub fn begin_edit(&mut self, id: &str) -> TaskResult<String> {
        let result = self
            .store
            .find_by_id(id)
            .map(|task| task.text.clone())
            .ok_or_else(|| TaskError::NotFound(id.to_string()));
        if result.is_ok() {
            debug!(id, "editing task");
            self.edit = EditState::Editing {
                task_id: id.to_string(),
            };
        }
        self.surface(result)
    }

    /// Editing -> Idle. Only non-empty, changed text is persisted.
    pub async fn commit_edit(&mut self, text: &str) -> TaskResult<Option<Task>> {
        let EditState::Editing { task_id } = std::mem::take(&mut self.edit) else {
            return Ok(None);
        };
        let new_text = text.trim();
        let unchanged = match self.store.find_by_id(&task_id) {
            Some(task) => new_text.is_empty() || task.text == new_text,
            None => return self.surface(Err(TaskError::NotFound(task_id))),
        };
        if unchanged {
            return Ok(None);
        }
        let result = self
            .apply_update(&task_id, &UpdateTaskRequest::text(new_text))
            .await
            .map(Some);
        self.surface(result)
    }

    /// Editing -> Idle, discarding the edit.
    pub fn cancel_edit(&mut self) {
        self.edit = EditState::Idle;
    }

    /// Asks the user before a removal. Unknown ids are never confirmed.
    pub fn confirm_delete(&self, id: &str) -> bool {
        self.store.find_by_id(id).is_some() && self.prompt.confirm(DELETE_CONFIRMATION)
    }

    pub async fn delete_task(&mut self, id: &str) -> TaskResult<()> {
        let result = self.remove_task(id).await;
        self.surface(result)
    }

    pub async fn set_filter(&mut self, filter: TaskFilter) -> TaskResult<()> {
        self.filter = filter;
        let result = match self.persistence.list(filter).await {
            Ok(Some(tasks)) => self.store.replace_all(tasks),
            Ok(None) => Ok(()),
            Err(err) => Err(err),
        };
        self.surface(result)
    }

    /// Backend counts in remote mode, local counts otherwise or when the backend fails.
    pub async fn stats(&self, now: DateTime<Utc>) -> TaskStats {
        match self.persistence.stats(self.store.list(), now).await {
            Ok(stats) => stats,
            Err(err) => {
                warn!(error = %err, "stats unavailable, counting locally");
                self.store.stats(now)
            }
        }
    }

    pub fn export_json(&self) -> TaskResult<String> {
        let result = transfer::export_tasks(self.store.list());
        self.surface(result)
    }

    pub async fn import_json(&mut self, raw: &str) -> TaskResult<usize> {
        let result = self.import_tasks(raw).await;
        if result.is_ok() {
            self.prompt.notify(IMPORT_SUCCESS_MESSAGE);
        }
        self.surface(result)
    }

    /// Removes every stored task after confirmation, whatever the active filter.
    /// Returns how many were removed.
    pub async fn clear_all(&mut self) -> TaskResult<usize> {
        let ids = match self.all_task_ids().await {
            Ok(ids) => ids,
            Err(err) => return self.surface(Err(err)),
        };
        if ids.is_empty() || !self.prompt.confirm(CLEAR_CONFIRMATION) {
            return Ok(0);
        }
        let result = self.remove_all(ids).await;
        self.surface(result)
    }

    async fn load_tasks(&mut self, now: DateTime<Utc>) -> TaskResult<()> {
        let tasks = self.persistence.load(now).await?;
        self.store.replace_all(tasks)?;
        info!(count = self.store.len(), mode = ?self.mode(), "tasks loaded");
        Ok(())
    }

    async fn create_task(
        &mut self,
        text: &str,
        deadline: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> TaskResult<Task> {
        let request = CreateTaskRequest::new(validate_text(text)?, deadline);
        let mut staged = self.store.clone();
        let task = match self.persistence.create(&request).await? {
            Some(created) => staged.prepend(created)?.clone(),
            None => staged.add(&request.text, request.deadline, now)?.clone(),
        };
        self.commit(staged).await?;
        info!(id = %task.id, "task created");
        Ok(task)
    }

    async fn apply_update(&mut self, id: &str, patch: &UpdateTaskRequest) -> TaskResult<Task> {
        let patch = patch.validated()?;
        if self.store.find_by_id(id).is_none() {
            return Err(TaskError::NotFound(id.to_string()));
        }
        let mut staged = self.store.clone();
        let task = match self.persistence.update(id, &patch).await? {
            Some(saved) => staged.replace(saved)?.clone(),
            None => staged.update(id, &patch)?.clone(),
        };
        self.commit(staged).await?;
        debug!(id, completed = task.completed, "task saved");
        Ok(task)
    }

    async fn remove_task(&mut self, id: &str) -> TaskResult<()> {
        if self.store.find_by_id(id).is_none() {
            return Err(TaskError::NotFound(id.to_string()));
        }
        self.persistence.delete(id).await?;
        let mut staged = self.store.clone();
        staged.remove(id)?;
        self.commit(staged).await?;
        if self.editing_task_id() == Some(id) {
            self.edit = EditState::Idle;
        }
        info!(id, "task deleted");
        Ok(())
    }

    async fn import_tasks(&mut self, raw: &str) -> TaskResult<usize> {
        if self.mode() == PersistenceMode::Remote {
            return Err(TaskError::storage(IMPORT_REMOTE_MESSAGE));
        }
        let staged = TaskStore::from_tasks(transfer::import_tasks(raw)?)?;
        let count = staged.len();
        self.commit(staged).await?;
        self.edit = EditState::Idle;
        info!(count, "tasks imported");
        Ok(count)
    }

    /// Every id the persistence variant knows about, not just the visible subset.
    async fn all_task_ids(&self) -> TaskResult<Vec<String>> {
        let ids = match self.persistence.list(TaskFilter::All).await? {
            Some(tasks) => tasks.into_iter().map(|task| task.id).collect(),
            None => self.store.list().iter().map(|task| task.id.clone()).collect(),
        };
        Ok(ids)
    }

    /// Stops at the first failed delete. Tasks the backend already dropped stay
    /// dropped from the store.
    async fn remove_all(&mut self, ids: Vec<String>) -> TaskResult<usize> {
        let mut staged = self.store.clone();
        let mut removed = 0;
        for id in &ids {
            if let Err(err) = self.persistence.delete(id).await {
                if removed > 0 {
                    self.store = staged;
                }
                return Err(err);
            }
            if staged.find_by_id(id).is_some() {
                staged.remove(id)?;
            }
            removed += 1;
        }
        self.commit(staged).await?;
        self.edit = EditState::Idle;
        info!(removed, "all tasks cleared");
        Ok(removed)
    }

    /// Saves `staged` and only then makes it the current collection.
    async fn commit(&mut self, staged: TaskStore) -> TaskResult<()> {
        self.persistence.save_all(staged.list()).await?;
        self.store = staged;
        Ok(())
    }

    fn surface<R>(&self, result: TaskResult<R>) -> TaskResult<R> {
        if let Err(err) = &result {
            if err.is_user_visible() {
                warn!(error = %err, "intent failed");
                self.prompt.notify(&err.user_message());
            } else {
                debug!(error = %err, "intent rejected");
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use chrono::TimeZone;

    use super::*;
    use crate::persistence::remote::testing::ScriptedTransport;
    use crate::persistence::{LocalAdapter, MemoryStore, RemoteAdapter, TASKS_STORAGE_KEY};
    use crate::transfer::INVALID_FORMAT_MESSAGE;

    #[derive(Debug, Clone, Default)]
    struct RecordingPrompt {
        decline: Rc<Cell<bool>>,
        confirmations: Rc<RefCell<Vec<String>>>,
        notices: Rc<RefCell<Vec<String>>>,
    }

    impl RecordingPrompt {
        fn notices(&self) -> Vec<String> {
            self.notices.borrow().clone()
        }
    }

    impl UserPrompt for RecordingPrompt {
        fn confirm(&self, message: &str) -> bool {
            self.confirmations.borrow_mut().push(message.to_string());
            !self.decline.get()
        }

        fn notify(&self, message: &str) {
            self.notices.borrow_mut().push(message.to_string());
        }
    }

    type TestController = Controller<MemoryStore, ScriptedTransport, RecordingPrompt>;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn local_controller() -> (TestController, MemoryStore, RecordingPrompt) {
        let storage = MemoryStore::new();
        let prompt = RecordingPrompt::default();
        let persistence = Persistence::Local(LocalAdapter::new(storage.clone()));
        (Controller::new(persistence, prompt.clone()), storage, prompt)
    }

    fn remote_controller() -> (TestController, ScriptedTransport, RecordingPrompt) {
        let transport = ScriptedTransport::default();
        let prompt = RecordingPrompt::default();
        let persistence = Persistence::Remote(RemoteAdapter::new(transport.clone()));
        (Controller::new(persistence, prompt.clone()), transport, prompt)
    }

    fn task_json(id: &str, text: &str, completed: bool) -> String {
        format!(
            r#"{{"id":"{id}","text":"{text}","completed":{completed},"deadline":null,"createdAt":"2024-05-01T12:00:00.000Z"}}"#
        )
    }

    #[tokio::test]
    async fn adding_to_an_empty_store() {
        let (mut controller, storage, prompt) = local_controller();
        controller.load(now()).await.unwrap();

        let task = controller.add_task("Buy milk", None, now()).await.unwrap();
        assert_eq!(controller.store().list(), &[task.clone()]);
        assert_eq!(task.text, "Buy milk");
        assert!(!task.completed);
        assert_eq!(task.deadline, None);

        let view = controller.render(now());
        assert_eq!(view.count_label, "1 task (1 pending, 0 completed)");
        assert!(storage.raw(TASKS_STORAGE_KEY).unwrap().contains("Buy milk"));
        assert!(prompt.notices().is_empty());
    }

    #[tokio::test]
    async fn blank_text_is_silently_rejected() {
        let (mut controller, storage, prompt) = local_controller();
        assert!(matches!(
            controller.add_task("   ", None, now()).await,
            Err(TaskError::InvalidInput(_))
        ));
        assert!(controller.store().is_empty());
        assert_eq!(storage.raw(TASKS_STORAGE_KEY), None);
        assert!(prompt.notices().is_empty());
    }

    #[tokio::test]
    async fn toggle_is_its_own_inverse() {
        let (mut controller, _, _) = local_controller();
        let id = controller.add_task("walk", None, now()).await.unwrap().id;
        assert!(controller.toggle_task(&id).await.unwrap().completed);
        assert!(!controller.toggle_task(&id).await.unwrap().completed);
        assert_eq!(
            controller.toggle_task("missing").await,
            Err(TaskError::NotFound("missing".into()))
        );
    }

    #[tokio::test]
    async fn edit_commit_persists_only_real_changes() {
        let (mut controller, storage, _) = local_controller();
        let id = controller.add_task("draft", None, now()).await.unwrap().id;

        assert_eq!(controller.begin_edit(&id).unwrap(), "draft");
        assert_eq!(controller.editing_task_id(), Some(id.as_str()));
        assert!(controller.render(now()).items[0].editing);

        let blob = storage.raw(TASKS_STORAGE_KEY);
        assert_eq!(controller.commit_edit("  draft ").await, Ok(None));
        assert_eq!(storage.raw(TASKS_STORAGE_KEY), blob);
        assert_eq!(controller.edit_state(), &EditState::Idle);

        controller.begin_edit(&id).unwrap();
        assert_eq!(controller.commit_edit("").await, Ok(None));
        assert_eq!(controller.store().list()[0].text, "draft");

        controller.begin_edit(&id).unwrap();
        let saved = controller.commit_edit(" final ").await.unwrap().unwrap();
        assert_eq!(saved.text, "final");
        assert!(storage.raw(TASKS_STORAGE_KEY).unwrap().contains("final"));
        assert_eq!(controller.editing_task_id(), None);
    }

    #[tokio::test]
    async fn cancel_discards_the_edit() {
        let (mut controller, _, _) = local_controller();
        let id = controller.add_task("keep me", None, now()).await.unwrap().id;
        controller.begin_edit(&id).unwrap();
        controller.cancel_edit();
        assert_eq!(controller.commit_edit("changed").await, Ok(None));
        assert_eq!(controller.store().list()[0].text, "keep me");
    }

    #[tokio::test]
    async fn delete_needs_confirmation_and_known_id() {
        let (mut controller, _, prompt) = local_controller();
        let id = controller.add_task("temp", None, now()).await.unwrap().id;

        prompt.decline.set(true);
        assert!(!controller.confirm_delete(&id));
        prompt.decline.set(false);
        assert!(controller.confirm_delete(&id));
        assert!(!controller.confirm_delete("ghost"));

        controller.delete_task(&id).await.unwrap();
        assert!(controller.store().find_by_id(&id).is_none());

        assert_eq!(
            controller.delete_task(&id).await,
            Err(TaskError::NotFound(id.clone()))
        );
        assert_eq!(prompt.notices(), vec!["That task no longer exists.".to_string()]);
    }

    #[tokio::test]
    async fn local_filter_is_applied_in_memory() {
        let (mut controller, _, _) = local_controller();
        let id = controller.add_task("a", None, now()).await.unwrap().id;
        controller.add_task("b", None, now()).await.unwrap();
        controller.toggle_task(&id).await.unwrap();

        controller.set_filter(TaskFilter::Completed).await.unwrap();
        let view = controller.render(now());
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.count_label, "1 completed task");
        assert_eq!(controller.store().len(), 2);
    }

    #[tokio::test]
    async fn corrupt_local_blob_keeps_state_and_notifies() {
        let (mut controller, storage, prompt) = local_controller();
        controller.add_task("survivor", None, now()).await.unwrap();
        storage.set(TASKS_STORAGE_KEY, "[{oops").unwrap();

        assert!(matches!(controller.load(now()).await, Err(TaskError::Storage(_))));
        assert_eq!(controller.store().len(), 1);
        assert_eq!(prompt.notices().len(), 1);
    }

    #[tokio::test]
    async fn importing_a_non_array_is_rejected() {
        let (mut controller, _, prompt) = local_controller();
        controller.add_task("existing", None, now()).await.unwrap();
        let before = controller.store().clone();

        let result = controller.import_json(r#"{"not":"an array"}"#).await;
        assert_eq!(result, Err(TaskError::storage(INVALID_FORMAT_MESSAGE)));
        assert_eq!(controller.store(), &before);
        assert_eq!(prompt.notices(), vec![INVALID_FORMAT_MESSAGE.to_string()]);
    }

    #[tokio::test]
    async fn importing_replaces_and_persists() {
        let (mut controller, storage, prompt) = local_controller();
        controller.add_task("old", None, now()).await.unwrap();
        let raw = format!("[{},{}]", task_json("x1", "one", false), task_json("x2", "two", true));

        assert_eq!(controller.import_json(&raw).await, Ok(2));
        assert_eq!(controller.store().list()[0].id, "x1");
        assert!(!storage.raw(TASKS_STORAGE_KEY).unwrap().contains("old"));
        assert_eq!(prompt.notices(), vec![IMPORT_SUCCESS_MESSAGE.to_string()]);

        let exported = controller.export_json().unwrap();
        assert_eq!(transfer::import_tasks(&exported).unwrap(), controller.store().list());
    }

    #[tokio::test]
    async fn clear_all_asks_first() {
        let (mut controller, storage, prompt) = local_controller();
        controller.add_task("a", None, now()).await.unwrap();
        controller.add_task("b", None, now()).await.unwrap();

        prompt.decline.set(true);
        assert_eq!(controller.clear_all().await, Ok(0));
        assert_eq!(controller.store().len(), 2);

        prompt.decline.set(false);
        assert_eq!(controller.clear_all().await, Ok(2));
        assert!(controller.store().is_empty());
        assert_eq!(storage.raw(TASKS_STORAGE_KEY).as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn remote_create_failure_leaves_store_unchanged() {
        let (mut controller, transport, prompt) = remote_controller();
        transport
            .reply(200, format!("[{}]", task_json("s1", "server task", false)))
            .reply(500, r#"{"error":"disk I/O error"}"#);
        controller.load(now()).await.unwrap();

        let result = controller.add_task("Buy milk", None, now()).await;
        assert!(matches!(result, Err(TaskError::Server { status: 500, .. })));
        assert_eq!(controller.store().len(), 1);
        assert_eq!(
            prompt.notices(),
            vec!["Failed to save changes. Please try again.".to_string()]
        );
    }

    #[tokio::test]
    async fn remote_create_prepends_the_server_record() {
        let (mut controller, transport, _) = remote_controller();
        transport
            .reply(200, format!("[{}]", task_json("s1", "older", false)))
            .reply(201, task_json("s2", "Buy milk", false));
        controller.load(now()).await.unwrap();

        let task = controller.add_task(" Buy milk ", None, now()).await.unwrap();
        assert_eq!(task.id, "s2");
        assert_eq!(controller.store().list()[0].id, "s2");
        assert_eq!(
            transport.sent()[1].body.as_deref(),
            Some(r#"{"text":"Buy milk","deadline":null}"#)
        );
    }

    #[tokio::test]
    async fn remote_toggle_failure_is_not_applied() {
        let (mut controller, transport, _) = remote_controller();
        transport
            .reply(200, format!("[{}]", task_json("s1", "task", false)))
            .fail("offline")
            .reply(200, task_json("s1", "task", true));
        controller.load(now()).await.unwrap();

        assert!(matches!(
            controller.toggle_task("s1").await,
            Err(TaskError::Network(_))
        ));
        assert!(!controller.store().list()[0].completed);

        assert!(controller.toggle_task("s1").await.unwrap().completed);
        assert_eq!(transport.sent()[2].body.as_deref(), Some(r#"{"completed":true}"#));
    }

    #[tokio::test]
    async fn remote_filter_refetches_from_backend() {
        let (mut controller, transport, _) = remote_controller();
        transport
            .reply(
                200,
                format!("[{},{}]", task_json("a", "open", false), task_json("b", "done", true)),
            )
            .reply(200, format!("[{}]", task_json("b", "done", true)));
        controller.load(now()).await.unwrap();

        controller.set_filter(TaskFilter::Completed).await.unwrap();
        assert_eq!(transport.sent()[1].path, "/api/tasks?filter=completed");
        assert_eq!(controller.store().len(), 1);
        assert_eq!(controller.render(now()).items[0].id, "b");
    }

    #[tokio::test]
    async fn remote_mode_refuses_imports() {
        let (mut controller, transport, prompt) = remote_controller();
        assert_eq!(
            controller.import_json("[]").await,
            Err(TaskError::storage(IMPORT_REMOTE_MESSAGE))
        );
        assert!(transport.sent().is_empty());
        assert_eq!(prompt.notices(), vec![IMPORT_REMOTE_MESSAGE.to_string()]);
    }

    #[tokio::test]
    async fn stats_fall_back_to_local_counts() {
        let (mut controller, transport, _) = remote_controller();
        transport
            .reply(200, format!("[{}]", task_json("a", "open", false)))
            .fail("offline");
        controller.load(now()).await.unwrap();
        let stats = controller.stats(now()).await;
        assert_eq!(stats.total, 1);
        assert_eq!(stats.pending, 1);
    }

    /// Memory storage that refuses writes once `full` is set.
    #[derive(Debug, Clone, Default)]
    struct QuotaStore {
        inner: MemoryStore,
        full: Rc<Cell<bool>>,
    }

    impl KeyValueStore for QuotaStore {
        fn get(&self, key: &str) -> TaskResult<Option<String>> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> TaskResult<()> {
            if self.full.get() {
                return Err(TaskError::storage("Storage quota exceeded."));
            }
            self.inner.set(key, value)
        }
    }

    #[tokio::test]
    async fn failed_local_save_is_not_applied() {
        let storage = QuotaStore::default();
        let prompt = RecordingPrompt::default();
        let persistence: Persistence<_, ScriptedTransport> =
            Persistence::Local(LocalAdapter::new(storage.clone()));
        let mut controller = Controller::new(persistence, prompt.clone());
        let id = controller.add_task("kept", None, now()).await.unwrap().id;
        let blob = storage.inner.raw(TASKS_STORAGE_KEY);
        let before = controller.store().clone();
        storage.full.set(true);

        assert!(controller.add_task("ghost", None, now()).await.is_err());
        assert!(controller.toggle_task(&id).await.is_err());
        controller.begin_edit(&id).unwrap();
        assert!(controller.commit_edit("renamed").await.is_err());
        assert!(controller.delete_task(&id).await.is_err());
        let raw = format!("[{}]", task_json("x1", "one", false));
        assert!(controller.import_json(&raw).await.is_err());
        assert!(controller.clear_all().await.is_err());

        assert_eq!(controller.store(), &before);
        assert_eq!(storage.inner.raw(TASKS_STORAGE_KEY), blob);
        assert_eq!(prompt.notices(), vec!["Storage quota exceeded.".to_string(); 6]);

        storage.full.set(false);
        assert!(controller.toggle_task(&id).await.unwrap().completed);
    }

    #[tokio::test]
    async fn remote_delete_failure_keeps_the_task() {
        let (mut controller, transport, prompt) = remote_controller();
        transport
            .reply(200, format!("[{}]", task_json("s1", "task", false)))
            .reply(500, r#"{"error":"database is locked"}"#);
        controller.load(now()).await.unwrap();
        let before = controller.store().clone();

        assert!(matches!(
            controller.delete_task("s1").await,
            Err(TaskError::Server { status: 500, .. })
        ));
        assert_eq!(controller.store(), &before);
        assert_eq!(
            prompt.notices(),
            vec!["Failed to save changes. Please try again.".to_string()]
        );
    }

    #[tokio::test]
    async fn remote_edit_failure_keeps_the_old_text() {
        let (mut controller, transport, prompt) = remote_controller();
        transport
            .reply(200, format!("[{}]", task_json("s1", "draft", false)))
            .fail("offline");
        controller.load(now()).await.unwrap();
        let before = controller.store().clone();

        controller.begin_edit("s1").unwrap();
        assert!(matches!(
            controller.commit_edit("renamed").await,
            Err(TaskError::Network(_))
        ));
        assert_eq!(transport.sent()[1].body.as_deref(), Some(r#"{"text":"renamed"}"#));
        assert_eq!(controller.store(), &before);
        assert_eq!(controller.edit_state(), &EditState::Idle);
        assert_eq!(prompt.notices().len(), 1);
    }

    #[tokio::test]
    async fn remote_clear_all_ignores_the_active_filter() {
        let (mut controller, transport, prompt) = remote_controller();
        let both = format!("[{},{}]", task_json("a", "open", false), task_json("b", "done", true));
        transport
            .reply(200, both.clone())
            .reply(200, format!("[{}]", task_json("a", "open", false)))
            .reply(200, both)
            .reply(204, "")
            .reply(204, "");
        controller.load(now()).await.unwrap();
        controller.set_filter(TaskFilter::Pending).await.unwrap();

        assert_eq!(controller.clear_all().await, Ok(2));
        let paths: Vec<String> = transport.sent().into_iter().map(|r| r.path).collect();
        assert_eq!(&paths[2..], ["/api/tasks", "/api/tasks/a", "/api/tasks/b"]);
        assert!(controller.store().is_empty());
        assert_eq!(prompt.confirmations.borrow().len(), 1);
        assert!(prompt.notices().is_empty());
    }

    #[tokio::test]
    async fn remote_clear_all_stops_at_the_first_failure() {
        let (mut controller, transport, prompt) = remote_controller();
        let both = format!("[{},{}]", task_json("a", "one", false), task_json("b", "two", false));
        transport
            .reply(200, both.clone())
            .reply(200, both)
            .reply(204, "")
            .reply(500, r#"{"error":"disk I/O error"}"#);
        controller.load(now()).await.unwrap();

        assert!(controller.clear_all().await.is_err());
        assert_eq!(transport.sent().len(), 4);
        let left: Vec<&str> = controller.store().list().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(left, ["b"]);
        assert_eq!(prompt.notices().len(), 1);
    }
}
