use crate::api::{
    DriveAccount, DriveSession, EnvConfig, FolderSelection, GenerativeClient, ReqwestTransport,
};
use crate::document::{EditorBinding, Leaf, Workspace};
use crate::retry::{BrowserClock, CancelToken, RequestTracker, ResilientCaller};
use crate::storage::{load_folder_selection, save_folder_selection, Settings};
use leptos::prelude::*;
use std::collections::{HashMap, HashSet};
use wasm_bindgen::JsCast;

const TOAST_DURATION_MS: i32 = 3000;

/// Subsection editor backed by a signal the textarea reads and writes.
///
/// Signals are created under the app root owner, so nothing but
/// [`EditorBinding::release`] disposes them.
#[derive(Clone, Copy, Debug)]
pub(crate) struct SignalEditor {
    text: RwSignal<String>,
}

impl SignalEditor {
    fn new(owner: &Owner, leaf: &Leaf) -> Self {
        let content = leaf.content.clone();
        Self {
            text: owner.with(|| RwSignal::new(content)),
        }
    }

    pub fn signal(&self) -> RwSignal<String> {
        self.text
    }
}

impl EditorBinding for SignalEditor {
    fn value(&self) -> String {
        self.text.try_get_untracked().unwrap_or_default()
    }

    fn set_value(&self, text: &str) {
        self.text.set(text.to_string());
    }

    fn release(self) {
        self.text.dispose();
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub(crate) enum ToastKind {
    Info,
    Success,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Toast {
    pub id: u64,
    pub kind: ToastKind,
    pub message: String,
}

#[derive(Clone, Copy)]
pub(crate) struct AppState {
    pub config: StoredValue<EnvConfig>,
    pub workspace: RwSignal<Workspace<SignalEditor>>,
    pub settings: RwSignal<Settings>,

    /// Token lives in memory only; the folder choice is persisted.
    pub drive: RwSignal<DriveAccount>,

    pub toasts: RwSignal<Vec<Toast>>,
    next_toast_id: StoredValue<u64>,

    /// One tracker per request slot; starting a request supersedes the
    /// previous one in the same slot.
    requests: StoredValue<HashMap<String, RequestTracker>>,
    /// Slots with a request in flight, for spinners.
    pub busy: RwSignal<HashSet<String>>,

    owner: StoredValue<Owner>,
}

impl AppState {
    pub fn new(config: EnvConfig) -> Self {
        let owner = Owner::current().unwrap_or_else(Owner::new);
        let mut workspace = Workspace::default();
        workspace.mount_missing(|leaf| SignalEditor::new(&owner, leaf));

        Self {
            config: StoredValue::new(config),
            workspace: RwSignal::new(workspace),
            settings: RwSignal::new(Settings::load()),
            drive: RwSignal::new(DriveAccount {
                token: None,
                folder: load_folder_selection(),
            }),
            toasts: RwSignal::new(vec![]),
            next_toast_id: StoredValue::new(0),
            requests: StoredValue::new(HashMap::new()),
            busy: RwSignal::new(HashSet::new()),
            owner: StoredValue::new(owner),
        }
    }

    /// Runs a workspace mutation, then mounts editors for any subsection it
    /// created.
    pub fn edit<R>(&self, f: impl FnOnce(&mut Workspace<SignalEditor>) -> R) -> Option<R> {
        let owner = self.owner.get_value();
        self.workspace.try_update(|w| {
            let out = f(w);
            w.mount_missing(|leaf| SignalEditor::new(&owner, leaf));
            out
        })
    }

    pub fn toast(&self, kind: ToastKind, message: impl Into<String>) {
        let id = self.next_toast_id.get_value();
        self.next_toast_id.set_value(id.wrapping_add(1));
        self.toasts.update(|ts| {
            ts.push(Toast {
                id,
                kind,
                message: message.into(),
            })
        });

        let toasts = self.toasts;
        let cb = wasm_bindgen::closure::Closure::once_into_js(move || {
            toasts.try_update(|ts| ts.retain(|t| t.id != id));
        });
        if let Some(w) = web_sys::window() {
            let _ = w.set_timeout_with_callback_and_timeout_and_arguments_0(
                cb.as_ref().unchecked_ref(),
                TOAST_DURATION_MS,
            );
        }
    }

    pub fn dismiss_toast(&self, id: u64) {
        self.toasts.update(|ts| ts.retain(|t| t.id != id));
    }

    /// Starts a request in `slot`, cancelling whatever ran there before.
    pub fn begin_request(&self, slot: &str) -> CancelToken {
        let token = self
            .requests
            .try_update_value(|m| m.entry(slot.to_string()).or_default().begin())
            .unwrap_or_else(CancelToken::never);
        self.busy.update(|b| {
            b.insert(slot.to_string());
        });
        token
    }

    /// Clears the busy flag unless a newer request took over the slot.
    pub fn finish_request(&self, slot: &str, token: &CancelToken) {
        if !token.is_cancelled() {
            self.busy.update(|b| {
                b.remove(slot);
            });
        }
    }

    pub fn cancel_request(&self, slot: &str) {
        self.requests.with_value(|m| {
            if let Some(t) = m.get(slot) {
                t.cancel();
            }
        });
        self.busy.update(|b| {
            b.remove(slot);
        });
    }

    pub fn is_busy(&self, slot: &str) -> bool {
        self.busy.with(|b| b.contains(slot))
    }

    pub fn generative_client(&self) -> GenerativeClient<ReqwestTransport, BrowserClock> {
        GenerativeClient::new(
            ReqwestTransport::new(),
            ResilientCaller::default(),
            &self.config.get_value(),
            self.settings.get_untracked().gemini_api_key,
        )
    }

    pub fn drive_session(&self) -> DriveSession<ReqwestTransport, BrowserClock> {
        DriveSession::new(
            ReqwestTransport::new(),
            ResilientCaller::default(),
            &self.config.get_value(),
            self.drive.get_untracked(),
        )
    }

    /// Stores a session's account back, persisting the folder choice.
    pub fn store_drive_account(&self, account: DriveAccount) {
        if account.folder != self.drive.with_untracked(|d| d.folder.clone()) {
            save_folder_selection(&account.folder);
        }
        self.drive.set(account);
    }

    pub fn select_folder(&self, folder: FolderSelection) {
        let mut session = self.drive_session();
        session.select_folder(folder.id, folder.name);
        self.store_drive_account(session.into_account());
    }

    pub fn save_settings(&self, settings: Settings) {
        settings.save();
        self.settings.set(settings);
    }
}

#[derive(Clone, Copy)]
pub(crate) struct AppContext(pub AppState);
