//! Application state and the handlers behind every user action.
//!
//! Every handler follows the same cycle: validate locally, call the API,
//! reload the whole store on success, and leave a notice either way. An
//! authentication failure anywhere also drops the saved session.

use crate::api::{RegisterRequest, TaskApi, UserProfile};
use crate::error::{Error, Result};
use crate::notice::{Notice, NoticeBoard};
use crate::projection::{self, TaskStatistics};
use crate::session::{self, Credential, SessionStore};
use crate::task::{TaskDraft, TaskId, TaskRecord};
use crate::task_store::TaskStore;
use chrono::NaiveDateTime;
use tracing::{info, warn};

pub struct App<A> {
    api: A,
    sessions: SessionStore,
    credential: Option<Credential>,
    user: Option<UserProfile>,
    store: TaskStore,
    notices: NoticeBoard,
}

impl<A: TaskApi> App<A> {
    pub fn new(api: A, sessions: SessionStore, notices: NoticeBoard) -> Self {
        Self {
            api,
            sessions,
            credential: None,
            user: None,
            store: TaskStore::new(),
            notices,
        }
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.credential.is_some() && self.user.is_some()
    }

    pub fn notices(&mut self) -> &mut NoticeBoard {
        &mut self.notices
    }

    pub fn statistics(&self, now: NaiveDateTime) -> TaskStatistics {
        projection::aggregate(&self.store, now)
    }

    /// Signs in with the saved credential, if any. Returns whether a session
    /// was resumed.
    pub async fn resume(&mut self) -> Result<bool> {
        let Some(credential) = self.sessions.load() else {
            return Ok(false);
        };
        let result = self.try_authenticate(credential).await;
        self.settle("authenticate", result).map(|_| true)
    }

    pub async fn authenticate(&mut self, credential: Credential) -> Result<()> {
        let result = self.try_authenticate(credential).await;
        self.settle("authenticate", result)?;
        self.welcome();
        Ok(())
    }

    async fn try_authenticate(&mut self, credential: Credential) -> Result<()> {
        let user = self
            .api
            .user_info(&credential)
            .await
            .map_err(|err| match err {
                Error::Auth(_) => err,
                other => Error::Auth(other.to_string()),
            })?;
        self.start_session(credential, user)?;
        self.refresh_store().await
    }

    pub async fn login(&mut self, email: &str, password: &str) -> Result<()> {
        let result = self.try_login(email, password).await;
        self.settle("log in", result)?;
        self.welcome();
        Ok(())
    }

    async fn try_login(&mut self, email: &str, password: &str) -> Result<()> {
        let auth = self.api.login(email, password).await?;
        let user = UserProfile::from(&auth);
        self.start_session(Credential::new(auth.token), user)?;
        self.refresh_store().await
    }

    pub async fn register(&mut self, request: &RegisterRequest) -> Result<()> {
        let result = self.try_register(request).await;
        self.settle("register", result)?;
        self.welcome();
        Ok(())
    }

    async fn try_register(&mut self, request: &RegisterRequest) -> Result<()> {
        request.validate()?;
        let auth = self.api.register(request).await?;
        let user = UserProfile::from(&auth);
        self.start_session(Credential::new(auth.token), user)?;
        self.refresh_store().await
    }

    /// Finishes the OAuth redirect flow from the URL the browser landed on.
    pub async fn complete_oauth(&mut self, callback: &str) -> Result<()> {
        match session::parse_callback(callback) {
            Ok(credential) => self.authenticate(credential).await,
            Err(err) => self.settle("authenticate", Err(err)),
        }
    }

    pub fn sign_out(&mut self) -> Result<()> {
        self.reset_session();
        self.notices.push(Notice::info("Signed out successfully"));
        Ok(())
    }

    pub async fn refresh(&mut self) -> Result<()> {
        let result = self.refresh_store().await;
        self.settle("load tasks", result)
    }

    pub async fn add_task(&mut self, draft: TaskDraft) -> Result<TaskRecord> {
        let result = self.try_add_task(&draft).await;
        let created = self.settle("add task", result)?;
        self.notices.push(Notice::success("Task added successfully!"));
        Ok(created)
    }

    async fn try_add_task(&mut self, draft: &TaskDraft) -> Result<TaskRecord> {
        draft.validate()?;
        let credential = self.credential()?;
        let created = self.api.add(&credential, draft).await?;
        self.refresh_store().await?;
        Ok(created)
    }

    /// The editable fields of a loaded task, as a base for an edit.
    pub fn draft_for(&self, id: TaskId) -> Result<TaskDraft> {
        self.store
            .find(id)
            .map(TaskRecord::to_draft)
            .ok_or_else(|| Error::NotFound(format!("No task found with ID: {id}")))
    }

    pub async fn edit_task(&mut self, id: TaskId, draft: TaskDraft) -> Result<()> {
        let result = self.try_edit_task(id, &draft).await;
        self.settle("update task", result)?;
        self.notices.push(Notice::success("Task updated successfully!"));
        Ok(())
    }

    async fn try_edit_task(&mut self, id: TaskId, draft: &TaskDraft) -> Result<()> {
        draft.validate()?;
        let credential = self.credential()?;
        self.api.edit(&credential, id, draft).await?;
        self.refresh_store().await
    }

    pub async fn toggle_task(&mut self, id: TaskId) -> Result<()> {
        let result = self.try_toggle_task(id).await;
        let done = self.settle("update task status", result)?;
        let label = if done { "completed" } else { "pending" };
        self.notices
            .push(Notice::success(format!("Task marked as {label}!")));
        Ok(())
    }

    async fn try_toggle_task(&mut self, id: TaskId) -> Result<bool> {
        let credential = self.credential()?;
        let toggled = self.api.toggle(&credential, id).await?;
        self.refresh_store().await?;
        Ok(toggled.done)
    }

    pub async fn complete_task(&mut self, id: TaskId) -> Result<()> {
        self.set_done(id, true).await
    }

    pub async fn reopen_task(&mut self, id: TaskId) -> Result<()> {
        self.set_done(id, false).await
    }

    /// Toggles only when the loaded state differs from `done`.
    async fn set_done(&mut self, id: TaskId, done: bool) -> Result<()> {
        let current = match self.store.find(id) {
            Some(task) => task.done,
            None => {
                let err = Error::NotFound(format!("No task found with ID: {id}"));
                return self.settle("update task status", Err(err));
            }
        };
        if current == done {
            let label = if done { "completed" } else { "pending" };
            self.notices
                .push(Notice::info(format!("Task {id} is already {label}")));
            return Ok(());
        }
        self.toggle_task(id).await
    }

    pub async fn delete_task(&mut self, id: TaskId) -> Result<()> {
        let result = self.try_delete_task(id).await;
        self.settle("delete task", result)?;
        self.notices.push(Notice::success("Task deleted successfully!"));
        Ok(())
    }

    async fn try_delete_task(&mut self, id: TaskId) -> Result<()> {
        let credential = self.credential()?;
        self.api.delete(&credential, id).await?;
        self.refresh_store().await
    }

    /// Looks `id` up in the loaded tasks; no request is made.
    pub fn search(&mut self, id: TaskId) -> Result<TaskRecord> {
        match projection::filter_by_id(&self.store, id) {
            Some(task) => {
                let task = task.clone();
                self.notices.push(Notice::success("Task found!"));
                Ok(task)
            }
            None => {
                let err = Error::NotFound(format!("No task found with ID: {id}"));
                self.settle("find task", Err(err))
            }
        }
    }

    fn credential(&self) -> Result<Credential> {
        self.credential
            .clone()
            .ok_or_else(|| Error::Auth("Please login first".into()))
    }

    fn start_session(&mut self, credential: Credential, user: UserProfile) -> Result<()> {
        self.sessions.save(&credential)?;
        info!(user = %user.name, "signed in");
        self.credential = Some(credential);
        self.user = Some(user);
        Ok(())
    }

    fn welcome(&mut self) {
        if let Some(user) = &self.user {
            let message = format!("Welcome back, {}!", user.name);
            self.notices.push(Notice::success(message));
        }
    }

    async fn refresh_store(&mut self) -> Result<()> {
        let credential = self.credential()?;
        let tasks = self.api.list_all(&credential).await?;
        info!(count = tasks.len(), "tasks loaded");
        self.store.replace(tasks);
        Ok(())
    }

    fn reset_session(&mut self) {
        self.credential = None;
        self.user = None;
        self.store.clear();
        if let Err(err) = self.sessions.clear() {
            warn!(%err, "could not remove session file");
        }
    }

    /// Turns a failure into a notice; auth failures also end the session.
    fn settle<T>(&mut self, action: &str, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            warn!(action, %err, "action failed");
            self.notices.push(Notice::from_error(action, err));
            if err.is_auth() {
                self.reset_session();
            }
        }
        result
    }
}
