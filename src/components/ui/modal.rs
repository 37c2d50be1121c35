use icons::X;
use leptos::prelude::*;
use leptos_ui::clx;
use tw_merge::*;

mod components {
    use super::*;
    clx! {ModalBody, div, "flex flex-col gap-4"}
    clx! {ModalHeader, div, "flex flex-col gap-2 text-center sm:text-left"}
    clx! {ModalTitle, h3, "text-lg leading-none font-semibold"}
    clx! {ModalFooter, footer, "flex flex-col-reverse gap-2 sm:flex-row sm:justify-end"}
}

pub use components::*;

/// Centered dialog shown while `open` is true. Backdrop click, the close
/// button and Escape all set it back to false.
#[component]
pub fn Modal(
    open: RwSignal<bool>,
    #[prop(into)] title: String,
    #[prop(optional, into)] class: String,
    children: ChildrenFn,
) -> impl IntoView {
    let merged_class = tw_merge!(
        "bg-background border rounded-2xl shadow-lg p-6 w-full max-w-[calc(100%-2rem)] sm:max-w-lg max-h-[85vh] overflow-y-auto fixed top-[50%] left-[50%] translate-x-[-50%] translate-y-[-50%] z-100 print:hidden",
        class
    );
    let close = move |_| open.set(false);
    let title = StoredValue::new(title);
    let children = StoredValue::new(children);

    view! {
        <Show when=move || open.get()>
            <div
                data-name="ModalBackdrop"
                class="fixed inset-0 z-60 bg-black/50 print:hidden"
                on:click=close
            />
            <div
                data-name="ModalContent"
                class=merged_class.clone()
                role="dialog"
                aria-modal="true"
                tabindex="-1"
                on:keydown=move |ev: web_sys::KeyboardEvent| {
                    if ev.key() == "Escape" {
                        ev.prevent_default();
                        open.set(false);
                    }
                }
            >
                <button
                    type="button"
                    class="absolute top-4 right-4 p-1 rounded-sm focus:ring-2 focus:ring-offset-2 focus:outline-none focus:ring-ring [&_svg:not([class*='size-'])]:size-4"
                    aria-label="Close dialog"
                    on:click=close
                >
                    <X />
                </button>
                <ModalBody>
                    <ModalHeader>
                        <ModalTitle>{title.get_value()}</ModalTitle>
                    </ModalHeader>
                    {children.with_value(|children| children())}
                </ModalBody>
            </div>
        </Show>
    }
}
