use leptos::prelude::*;
use tw_merge::tw_merge;
use wasm_bindgen::JsCast;

const FIELD_CLASS: &str = "placeholder:text-muted-foreground selection:bg-primary selection:text-primary-foreground border-input w-full min-w-0 rounded-md border bg-transparent px-3 py-1 text-base shadow-xs transition-[color,box-shadow] outline-none focus-visible:border-ring focus-visible:ring-ring/50 focus-visible:ring-2 disabled:pointer-events-none disabled:cursor-not-allowed disabled:opacity-50 md:text-sm";

fn event_value(ev: &web_sys::Event) -> Option<String> {
    let target = ev.target()?;
    if let Some(input) = target.dyn_ref::<web_sys::HtmlInputElement>() {
        return Some(input.value());
    }
    target
        .dyn_ref::<web_sys::HtmlTextAreaElement>()
        .map(|t| t.value())
}

/// Controlled text input: renders `value`, reports edits through `on_input`.
///
/// NOTE: manual `prop:value` + `on:input` wiring instead of `bind:value`,
/// which has changed shape across Leptos versions.
#[component]
pub fn Input(
    #[prop(into, optional)] class: String,
    #[prop(into, default = "text")] r#type: &'static str,
    #[prop(into, optional)] placeholder: String,
    #[prop(into, optional)] id: String,
    #[prop(optional)] disabled: bool,
    #[prop(into)] value: Signal<String>,
    #[prop(into)] on_input: Callback<String>,
) -> impl IntoView {
    let merged_class = tw_merge!(FIELD_CLASS, "flex h-9", class);

    view! {
        <input
            data-name="Input"
            type=r#type
            class=merged_class
            placeholder=placeholder
            id=id
            disabled=disabled
            prop:value=move || value.try_get().unwrap_or_default()
            on:input=move |ev| {
                if let Some(v) = event_value(&ev) {
                    on_input.run(v);
                }
            }
        />
    }
}

/// Multi-line editor bound to a signal owned elsewhere.
#[component]
pub fn Textarea(
    #[prop(into, optional)] class: String,
    #[prop(into, optional)] placeholder: String,
    #[prop(into, optional)] style: String,
    #[prop(default = 6)] rows: u32,
    #[prop(into, optional)] disabled: MaybeProp<bool>,
    bind_value: RwSignal<String>,
) -> impl IntoView {
    let merged_class = tw_merge!(FIELD_CLASS, "min-h-24 font-mono resize-y py-2", class);

    view! {
        <textarea
            data-name="Textarea"
            class=merged_class
            placeholder=placeholder
            style=style
            rows=rows.to_string()
            disabled=move || disabled.get().unwrap_or(false)
            prop:value=move || bind_value.try_get().unwrap_or_default()
            on:input=move |ev| {
                if let Some(v) = event_value(&ev) {
                    // The signal is gone once its subsection is released.
                    let _ = bind_value.try_set(v);
                }
            }
        />
    }
}
