mod drive;
mod pillar;
mod settings;

pub(crate) use settings::SettingsPage;

use crate::components::ui::{Button, ButtonSize, ButtonVariant, Input, Modal, ModalFooter, Spinner};
use crate::error::RemoteError;
use crate::export::{export_file_name, remote_file_name};
use crate::state::{AppContext, AppState, ToastKind};
use crate::util::{
    confirm, copy_to_clipboard, download_text, now_timestamp_label, print_page,
    read_selected_file,
};
use drive::{ensure_drive_token, DriveFilesModal};
use leptos::html;
use leptos::prelude::*;
use leptos::task::spawn_local;
use pillar::PillarCard;

pub(crate) const SLOT_DRIVE_SAVE: &str = "drive:save";

/// Logs and toasts a remote failure. Superseded requests stay silent.
pub(crate) fn report(app: AppState, context: &str, e: RemoteError) {
    match e {
        RemoteError::Cancelled => log::debug!("{context}: superseded"),
        e => {
            log::error!("{context}: {e}");
            app.toast(ToastKind::Error, format!("{context}: {e}"));
        }
    }
}

#[component]
pub fn EditorPage() -> impl IntoView {
    let app = expect_context::<AppContext>().0;
    let ws = app.workspace;

    let markdown_open = RwSignal::new(false);
    let markdown = RwSignal::new(String::new());
    let drive_open = RwSignal::new(false);
    let file_input: NodeRef<html::Input> = NodeRef::new();

    let title = Signal::derive(move || ws.with(|w| w.document().title.clone()));

    // Keyed by generation too: ids restart with every rebuilt document.
    let group_keys = move || {
        ws.with(|w| {
            let generation = w.generation();
            w.document()
                .groups()
                .iter()
                .map(|g| (generation, g.id()))
                .collect::<Vec<_>>()
        })
    };

    let on_add_pillar = move |_| {
        app.edit(|w| w.add_default_group());
    };

    let on_new = move |_| {
        if confirm("Discard the current document and start over?") {
            app.edit(|w| w.reset_to_template());
        }
    };

    let on_export_json = move |_| {
        let json = ws.with_untracked(|w| w.to_json());
        let name = export_file_name(&now_timestamp_label());
        if let Err(e) = download_text(&name, "application/json", &json) {
            log::error!("download failed: {e:?}");
            app.toast(ToastKind::Error, "Could not export the JSON file");
        }
    };

    let on_import_change = move |_| {
        let Some(input) = file_input.get_untracked() else {
            return;
        };
        spawn_local(async move {
            let text = read_selected_file(&input).await;
            input.set_value("");
            match text {
                Ok(Some(text)) => match app.edit(|w| w.import_json(&text)) {
                    Some(Ok(())) => app.toast(ToastKind::Success, "Document imported"),
                    Some(Err(e)) => app.toast(ToastKind::Error, format!("Import failed: {e}")),
                    None => {}
                },
                Ok(None) => {}
                Err(e) => {
                    log::error!("reading file failed: {e:?}");
                    app.toast(ToastKind::Error, "Could not read the selected file");
                }
            }
        });
    };

    let on_export_markdown = move |_| {
        markdown.set(ws.with_untracked(|w| w.to_markdown()));
        markdown_open.set(true);
    };

    let on_copy_markdown = move |_| {
        let text = markdown.get_untracked();
        spawn_local(async move {
            match copy_to_clipboard(&text).await {
                Ok(()) => app.toast(ToastKind::Success, "Copied!"),
                Err(e) => {
                    log::warn!("clipboard write failed: {e:?}");
                    app.toast(ToastKind::Error, "Clipboard unavailable");
                }
            }
        });
    };

    let on_save_drive = move |_| {
        let (dto, title) = ws.with_untracked(|w| (w.serialize(), w.document().title.clone()));
        let filename = remote_file_name(&title, &now_timestamp_label());
        let token = app.begin_request(SLOT_DRIVE_SAVE);

        spawn_local(async move {
            let result = async {
                ensure_drive_token(app).await?;
                let mut session = app.drive_session();
                let folder_id = session.folder().id.clone();
                let saved = session
                    .save(&token, &dto, &filename, folder_id.as_deref())
                    .await;
                app.store_drive_account(session.into_account());
                saved
            }
            .await;

            match result {
                Ok(id) => {
                    log::info!("saved {filename} as {id}");
                    app.toast(ToastKind::Success, format!("Saved to Drive ({filename})"));
                }
                Err(e) => report(app, "Save to Drive failed", e),
            }
            app.finish_request(SLOT_DRIVE_SAVE, &token);
        });
    };

    view! {
        <div class="min-h-screen bg-background pb-24">
            <header class="border-b border-border bg-card print:border-0">
                <div class="mx-auto flex w-full max-w-4xl items-center gap-3 px-4 py-4">
                    <Input
                        class="h-11 flex-1 text-xl font-bold print:border-0"
                        placeholder="Document title"
                        value=title
                        on_input=move |v: String| {
                            app.edit(|w| w.set_title(v));
                        }
                    />
                    <Button variant=ButtonVariant::Ghost size=ButtonSize::Sm href="/settings" attr:title="Settings">
                        "Settings"
                    </Button>
                </div>
            </header>

            <main class="mx-auto w-full max-w-4xl space-y-4 px-4 py-6">
                <For
                    each=group_keys
                    key=|k| *k
                    children=move |(_, group)| view! { <PillarCard group=group /> }
                />

                <Button variant=ButtonVariant::Outline class="w-full" on:click=on_add_pillar>
                    "+ Add pillar"
                </Button>
            </main>

            <footer class="fixed inset-x-0 bottom-0 border-t border-border bg-card/95 print:hidden">
                <div class="mx-auto flex w-full max-w-4xl flex-wrap items-center gap-2 px-4 py-3">
                    <Button variant=ButtonVariant::Ghost size=ButtonSize::Sm on:click=on_new>
                        "New"
                    </Button>
                    <Button variant=ButtonVariant::Outline size=ButtonSize::Sm on:click=on_export_json>
                        "Export JSON"
                    </Button>
                    <Button
                        variant=ButtonVariant::Outline
                        size=ButtonSize::Sm
                        on:click=move |_| {
                            if let Some(input) = file_input.get_untracked() {
                                input.click();
                            }
                        }
                    >
                        "Import JSON"
                    </Button>
                    <input
                        node_ref=file_input
                        type="file"
                        accept=".json,application/json"
                        class="hidden"
                        on:change=on_import_change
                    />
                    <Button variant=ButtonVariant::Outline size=ButtonSize::Sm on:click=on_export_markdown>
                        "Markdown"
                    </Button>
                    <Button variant=ButtonVariant::Outline size=ButtonSize::Sm on:click=move |_| print_page()>
                        "Print"
                    </Button>

                    <div class="flex-1" />

                    <Button
                        size=ButtonSize::Sm
                        on:click=on_save_drive
                        attr:disabled=move || app.is_busy(SLOT_DRIVE_SAVE)
                    >
                        <Show when=move || app.is_busy(SLOT_DRIVE_SAVE) fallback=|| ().into_view()>
                            <Spinner />
                        </Show>
                        "Save to Drive"
                    </Button>
                    <Button
                        variant=ButtonVariant::Secondary
                        size=ButtonSize::Sm
                        on:click=move |_| drive_open.set(true)
                    >
                        "Open from Drive"
                    </Button>
                </div>
            </footer>

            <Modal open=markdown_open title="Markdown export">
                <pre class="max-h-[55vh] overflow-auto whitespace-pre-wrap rounded-md border bg-muted p-3 text-xs">
                    {move || markdown.get()}
                </pre>
                <ModalFooter>
                    <Button variant=ButtonVariant::Outline size=ButtonSize::Sm on:click=move |_| markdown_open.set(false)>
                        "Close"
                    </Button>
                    <Button size=ButtonSize::Sm on:click=on_copy_markdown>
                        "Copy"
                    </Button>
                </ModalFooter>
            </Modal>

            <DriveFilesModal open=drive_open />
        </div>
    }
}

/// Stacked notifications, newest last.
#[component]
pub fn Toaster() -> impl IntoView {
    let app = expect_context::<AppContext>().0;

    view! {
        <div class="fixed right-4 bottom-20 z-100 flex w-80 flex-col gap-2 print:hidden" aria-live="polite">
            {move || {
                app.toasts
                    .get()
                    .into_iter()
                    .map(|t| {
                        let tone = match t.kind {
                            ToastKind::Info => "border-border bg-card text-foreground",
                            ToastKind::Success => "border-green-300 bg-green-50 text-green-800",
                            ToastKind::Error => "border-red-300 bg-red-50 text-red-800",
                        };
                        let id = t.id;
                        view! {
                            <div
                                data-kind=t.kind.as_ref().to_string()
                                class=format!("rounded-md border px-3 py-2 text-sm shadow-sm {tone}")
                                role="status"
                                on:click=move |_| app.dismiss_toast(id)
                            >
                                {t.message}
                            </div>
                        }
                    })
                    .collect_view()
            }}
        </div>
    }
}
