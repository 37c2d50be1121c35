use super::report;
use crate::api::drive::{APP_FOLDER_NAME, ROOT_FOLDER_NAME};
use crate::api::identity::request_access_token;
use crate::api::FolderSelection;
use crate::components::ui::{Button, ButtonSize, ButtonVariant, Modal, ModalFooter, Spinner};
use crate::document::ApplyOutcome;
use crate::error::RemoteResult;
use crate::models::{DriveFile, DriveFolder};
use crate::state::{AppContext, AppState, ToastKind};
use crate::util::short_date;
use leptos::prelude::*;
use leptos::task::spawn_local;

const SLOT_LIST: &str = "drive:list";
const SLOT_LOAD: &str = "drive:load";
const SLOT_FOLDERS: &str = "drive:folders";
const SLOT_CREATE_FOLDER: &str = "drive:create-folder";

/// Signs in through Google Identity Services unless a token is already held.
pub(crate) async fn ensure_drive_token(app: AppState) -> RemoteResult<()> {
    if app.drive.with_untracked(|d| d.token.is_some()) {
        return Ok(());
    }
    let client_id = app
        .settings
        .with_untracked(|s| s.google_client_id.clone())
        .unwrap_or_default();
    let token = request_access_token(&client_id).await?;

    let mut session = app.drive_session();
    session.set_token(token);
    app.store_drive_account(session.into_account());
    Ok(())
}

/// Saved documents on Drive; picking one replaces the current document.
#[component]
pub fn DriveFilesModal(open: RwSignal<bool>) -> impl IntoView {
    let app = expect_context::<AppContext>().0;
    let files: RwSignal<Option<Vec<DriveFile>>> = RwSignal::new(None);

    Effect::new(move |_| {
        if !open.get() {
            // A download finishing after the dialog closed must not land.
            app.cancel_request(SLOT_LIST);
            app.cancel_request(SLOT_LOAD);
            return;
        }
        files.set(None);
        let token = app.begin_request(SLOT_LIST);
        spawn_local(async move {
            let result = async {
                ensure_drive_token(app).await?;
                let mut session = app.drive_session();
                let listed = session.list_saved_documents(&token).await;
                app.store_drive_account(session.into_account());
                listed
            }
            .await;

            match result {
                Ok(list) => files.set(Some(list)),
                Err(e) => {
                    report(app, "Listing Drive files failed", e);
                    open.set(false);
                }
            }
            app.finish_request(SLOT_LIST, &token);
        });
    });

    let on_pick = move |file: DriveFile| {
        let pending = app.workspace.with_untracked(|w| w.begin_replace());
        let token = app.begin_request(SLOT_LOAD);
        spawn_local(async move {
            let mut session = app.drive_session();
            let loaded = session.load_document(&token, &file.id).await;
            app.store_drive_account(session.into_account());

            match loaded {
                Ok(value) => match app.edit(|w| w.import_value_if(pending, &value)) {
                    Some(Ok(ApplyOutcome::Applied)) => {
                        app.toast(ToastKind::Success, format!("Loaded {}", file.name));
                        open.set(false);
                    }
                    Some(Ok(ApplyOutcome::StaleIgnored)) | None => {}
                    Some(Err(e)) => app.toast(ToastKind::Error, format!("Nothing loaded: {e}")),
                },
                Err(e) => report(app, "Nothing loaded", e),
            }
            app.finish_request(SLOT_LOAD, &token);
        });
    };

    view! {
        <Modal open=open title="Open from Drive">
            {move || match files.get() {
                None => view! {
                    <div class="flex items-center gap-2 py-4 text-sm text-muted-foreground">
                        <Spinner />
                        "Loading..."
                    </div>
                }
                .into_any(),
                Some(list) if list.is_empty() => view! {
                    <p class="py-4 text-center text-sm text-muted-foreground">"No saved documents."</p>
                }
                .into_any(),
                Some(list) => view! {
                    <ul class="divide-y rounded-md border">
                        {list
                            .into_iter()
                            .map(|f| {
                                let date = short_date(&f.modified_time).to_string();
                                let name = f.name.clone();
                                view! {
                                    <li
                                        class="flex cursor-pointer items-center justify-between gap-3 px-3 py-2 text-sm hover:bg-accent"
                                        on:click=move |_| on_pick(f.clone())
                                    >
                                        <span class="min-w-0 flex-1 truncate">{name}</span>
                                        <span class="shrink-0 text-xs text-muted-foreground">{date}</span>
                                    </li>
                                }
                            })
                            .collect_view()}
                    </ul>
                }
                .into_any(),
            }}
            <Show when=move || app.is_busy(SLOT_LOAD) fallback=|| ().into_view()>
                <div class="flex items-center gap-2 text-xs text-muted-foreground">
                    <Spinner />
                    "Downloading..."
                </div>
            </Show>
        </Modal>
    }
}

/// Chooses the Drive folder new documents are saved into.
#[component]
pub fn FolderPickerModal(open: RwSignal<bool>) -> impl IntoView {
    let app = expect_context::<AppContext>().0;
    let folders: RwSignal<Option<Vec<DriveFolder>>> = RwSignal::new(None);

    Effect::new(move |_| {
        if !open.get() {
            app.cancel_request(SLOT_FOLDERS);
            app.cancel_request(SLOT_CREATE_FOLDER);
            return;
        }
        folders.set(None);
        let token = app.begin_request(SLOT_FOLDERS);
        spawn_local(async move {
            let result = async {
                ensure_drive_token(app).await?;
                let mut session = app.drive_session();
                let listed = session.list_folders(&token).await;
                app.store_drive_account(session.into_account());
                listed
            }
            .await;

            match result {
                Ok(list) => folders.set(Some(list)),
                Err(e) => {
                    report(app, "Listing folders failed", e);
                    open.set(false);
                }
            }
            app.finish_request(SLOT_FOLDERS, &token);
        });
    });

    let choose = move |folder: FolderSelection| {
        app.toast(ToastKind::Info, format!("Saving to {}", folder.name));
        app.select_folder(folder);
        open.set(false);
    };

    let on_create = move |_| {
        let token = app.begin_request(SLOT_CREATE_FOLDER);
        spawn_local(async move {
            let mut session = app.drive_session();
            let created = session.create_folder(&token, APP_FOLDER_NAME).await;
            app.store_drive_account(session.into_account());

            match created {
                Ok(f) => {
                    app.toast(ToastKind::Success, "Folder created");
                    choose(FolderSelection {
                        id: Some(f.id),
                        name: f.name,
                    });
                }
                Err(e) => report(app, "Creating folder failed", e),
            }
            app.finish_request(SLOT_CREATE_FOLDER, &token);
        });
    };

    view! {
        <Modal open=open title="Choose a Drive folder">
            <ul class="max-h-[50vh] divide-y overflow-y-auto rounded-md border">
                <li
                    class="cursor-pointer px-3 py-2 text-sm font-semibold hover:bg-accent"
                    on:click=move |_| choose(FolderSelection::default())
                >
                    {format!("📁 {ROOT_FOLDER_NAME}")}
                </li>
                {move || match folders.get() {
                    None => view! {
                        <li class="flex items-center gap-2 px-3 py-2 text-sm text-muted-foreground">
                            <Spinner />
                            "Loading..."
                        </li>
                    }
                    .into_any(),
                    Some(list) => list
                        .into_iter()
                        .map(|f| {
                            let label = format!("📁 {}", f.name);
                            view! {
                                <li
                                    class="cursor-pointer px-3 py-2 text-sm hover:bg-accent"
                                    on:click=move |_| choose(FolderSelection {
                                        id: Some(f.id.clone()),
                                        name: f.name.clone(),
                                    })
                                >
                                    {label}
                                </li>
                            }
                        })
                        .collect_view()
                        .into_any(),
                }}
            </ul>
            <ModalFooter>
                <Button
                    variant=ButtonVariant::Outline
                    size=ButtonSize::Sm
                    attr:disabled=move || app.is_busy(SLOT_CREATE_FOLDER)
                    on:click=on_create
                >
                    {format!("+ Create \"{APP_FOLDER_NAME}\"")}
                </Button>
            </ModalFooter>
        </Modal>
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::RequestTracker;
    use std::collections::HashMap;

    #[test]
    fn test_folder_creation_does_not_cancel_listing() {
        let slots = [SLOT_LIST, SLOT_LOAD, SLOT_FOLDERS, SLOT_CREATE_FOLDER];
        let trackers: HashMap<&str, RequestTracker> =
            slots.iter().map(|s| (*s, RequestTracker::new())).collect();
        assert_eq!(trackers.len(), slots.len());

        let listing = trackers[SLOT_FOLDERS].begin();
        let _create = trackers[SLOT_CREATE_FOLDER].begin();
        assert!(!listing.is_cancelled());
    }
}
