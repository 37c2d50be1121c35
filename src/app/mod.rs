use crate::api::EnvConfig;
use crate::pages::{EditorPage, SettingsPage, Toaster};
use crate::state::{AppContext, AppState};
use leptos::prelude::*;
use leptos_router::components::{Route, Router, Routes};
use leptos_router::path;

#[component]
pub fn App() -> impl IntoView {
    provide_context(AppContext(AppState::new(EnvConfig::from_window())));

    view! {
        <Router>
            <Routes fallback=|| view! { <div class="px-4 py-8 text-xs text-muted-foreground">"Not found"</div> }>
                <Route path=path!("settings") view=SettingsPage />
                <Route path=path!("") view=EditorPage />
            </Routes>
        </Router>
        <Toaster />
    }
}
