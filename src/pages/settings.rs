use super::drive::{ensure_drive_token, FolderPickerModal};
use super::report;
use crate::components::ui::{
    Alert, AlertDescription, Button, ButtonSize, ButtonVariant, Card, CardContent,
    CardDescription, CardFooter, CardHeader, CardTitle, Input, Label, Spinner,
};
use crate::state::{AppContext, ToastKind};
use crate::storage::Settings;
use leptos::prelude::*;
use leptos::task::spawn_local;

const SLOT_SIGN_IN: &str = "drive:sign-in";

fn blank_to_none(s: String) -> Option<String> {
    let s = s.trim().to_string();
    (!s.is_empty()).then_some(s)
}

#[component]
pub fn SettingsPage() -> impl IntoView {
    let app = expect_context::<AppContext>().0;
    let current = app.settings.get_untracked();

    let api_key = RwSignal::new(current.gemini_api_key.unwrap_or_default());
    let client_id = RwSignal::new(current.google_client_id.unwrap_or_default());
    let folder_open = RwSignal::new(false);

    let connected = move || app.drive.with(|d| d.token.is_some());
    let folder_name = move || app.drive.with(|d| d.folder.name.clone());

    let on_save = move |ev: web_sys::SubmitEvent| {
        ev.prevent_default();
        app.save_settings(Settings {
            gemini_api_key: blank_to_none(api_key.get_untracked()),
            google_client_id: blank_to_none(client_id.get_untracked()),
        });
        app.toast(ToastKind::Success, "Settings saved");
    };

    let on_sign_in = move |_| {
        let token = app.begin_request(SLOT_SIGN_IN);
        spawn_local(async move {
            match ensure_drive_token(app).await {
                Ok(()) => app.toast(ToastKind::Success, "Connected to Google Drive"),
                Err(e) => report(app, "Sign-in failed", e),
            }
            app.finish_request(SLOT_SIGN_IN, &token);
        });
    };

    let on_sign_out = move |_| {
        let mut session = app.drive_session();
        session.sign_out();
        app.store_drive_account(session.into_account());
        app.toast(ToastKind::Info, "Signed out of Google Drive");
    };

    view! {
        <div class="min-h-screen bg-background">
            <div class="mx-auto flex w-full max-w-lg flex-col gap-4 px-4 py-10">
                <div class="flex items-center justify-between">
                    <h1 class="text-xl font-semibold">"Settings"</h1>
                    <Button variant=ButtonVariant::Ghost size=ButtonSize::Sm href="/">
                        "Back to editor"
                    </Button>
                </div>

                <Card>
                    <CardHeader>
                        <CardTitle class="text-lg">"API keys"</CardTitle>
                        <CardDescription class="text-xs">
                            "Stored in this browser only."
                        </CardDescription>
                    </CardHeader>
                    <CardContent>
                        <form class="flex flex-col gap-3" on:submit=on_save>
                            <div class="flex flex-col gap-1.5">
                                <Label html_for="gemini-key" class="text-xs">"Gemini API key"</Label>
                                <Input
                                    id="gemini-key"
                                    r#type="password"
                                    placeholder="AIza..."
                                    class="h-8 text-sm"
                                    value=api_key
                                    on_input=move |v: String| api_key.set(v)
                                />
                            </div>
                            <div class="flex flex-col gap-1.5">
                                <Label html_for="client-id" class="text-xs">"Google client ID"</Label>
                                <Input
                                    id="client-id"
                                    placeholder="....apps.googleusercontent.com"
                                    class="h-8 text-sm"
                                    value=client_id
                                    on_input=move |v: String| client_id.set(v)
                                />
                            </div>
                            <Button class="w-full" size=ButtonSize::Sm>
                                "Save"
                            </Button>
                        </form>
                    </CardContent>
                </Card>

                <Card>
                    <CardHeader>
                        <CardTitle class="text-lg">"Google Drive"</CardTitle>
                        <CardDescription class="text-xs">
                            {move || if connected() { "Connected" } else { "Not connected" }}
                        </CardDescription>
                    </CardHeader>
                    <CardContent>
                        <Show
                            when=move || app.settings.with(|s| s.google_client_id.is_some())
                            fallback=|| view! {
                                <Alert class="border-destructive/30">
                                    <AlertDescription class="text-destructive text-xs">
                                        "Save a Google client ID before signing in."
                                    </AlertDescription>
                                </Alert>
                            }
                        >
                            <div class="flex items-center justify-between gap-2 text-sm">
                                <span class="text-muted-foreground">"Save folder"</span>
                                <span class="min-w-0 flex-1 truncate text-right font-medium">
                                    {folder_name}
                                </span>
                                <Button
                                    variant=ButtonVariant::Outline
                                    size=ButtonSize::Sm
                                    attr:disabled=move || !connected()
                                    on:click=move |_| folder_open.set(true)
                                >
                                    "Change"
                                </Button>
                            </div>
                        </Show>
                    </CardContent>
                    <CardFooter>
                        <Show
                            when=connected
                            fallback=move || view! {
                                <Button
                                    size=ButtonSize::Sm
                                    attr:disabled=move || app.is_busy(SLOT_SIGN_IN)
                                    on:click=on_sign_in
                                >
                                    <Show when=move || app.is_busy(SLOT_SIGN_IN) fallback=|| ().into_view()>
                                        <Spinner />
                                    </Show>
                                    "Sign in with Google"
                                </Button>
                            }
                        >
                            <Button variant=ButtonVariant::Outline size=ButtonSize::Sm on:click=on_sign_out>
                                "Sign out"
                            </Button>
                        </Show>
                    </CardFooter>
                </Card>
            </div>

            <FolderPickerModal open=folder_open />
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_to_none() {
        assert_eq!(blank_to_none("  ".to_string()), None);
        assert_eq!(blank_to_none(" key ".to_string()), Some("key".to_string()));
    }
}
