use super::report;
use crate::api::gemini::{parse_section_suggestions, rewrite_request, suggest_sections_request};
use crate::components::ui::{Button, ButtonSize, ButtonVariant, Input, Spinner, Textarea};
use crate::document::{ApplyOutcome, GroupId, LeafId, SuggestionTarget};
use crate::palette::SharedColorSet;
use crate::state::{AppContext, ToastKind};
use crate::util::confirm;
use leptos::prelude::*;
use leptos::task::spawn_local;

fn chevron(collapsed: bool) -> &'static str {
    if collapsed {
        "▸"
    } else {
        "▾"
    }
}

#[component]
pub fn PillarCard(group: GroupId) -> impl IntoView {
    let app = expect_context::<AppContext>().0;
    let ws = app.workspace;

    // Immutable for the pillar's lifetime.
    let Some(colors) = ws.with_untracked(|w| w.document().group(group).map(|g| g.color_set().clone()))
    else {
        return ().into_any();
    };

    let title = Signal::derive(move || {
        ws.with(|w| w.document().group(group).map(|g| g.title.clone()).unwrap_or_default())
    });
    let collapsed = move || {
        ws.with(|w| w.document().group(group).map(|g| g.collapsed).unwrap_or(false))
    };
    let index = move || ws.with(|w| w.document().group_index(group));
    let count = move || ws.with(|w| w.document().groups().len());

    let leaf_keys = move || {
        ws.with(|w| {
            let generation = w.generation();
            w.document()
                .group(group)
                .map(|g| g.leaf_ids().map(|id| (generation, id)).collect::<Vec<_>>())
                .unwrap_or_default()
        })
    };

    let suggest_slot = format!("suggest:{group:?}");
    let busy_slot = StoredValue::new(suggest_slot.clone());
    let is_suggesting = move || busy_slot.with_value(|slot| app.is_busy(slot));

    let on_move = move |delta: isize| {
        if let Some(i) = index() {
            let to = i.saturating_add_signed(delta);
            app.edit(|w| w.move_group(i, to));
        }
    };

    let on_delete = move |_| {
        if confirm("Delete this pillar?") {
            app.edit(|w| w.remove_group(group));
        }
    };

    let on_suggest = move |_| {
        let Some((pending, request)) = ws.with_untracked(|w| {
            let doc = w.document();
            let g = doc.group(group)?;
            let existing: Vec<String> = g.leaves().iter().map(|l| l.title.clone()).collect();
            let pending = w.begin_suggestion(SuggestionTarget::Group(group))?;
            Some((pending, suggest_sections_request(&doc.title, &g.title, &existing)))
        }) else {
            return;
        };

        let slot = suggest_slot.clone();
        let token = app.begin_request(&slot);
        let client = app.generative_client();
        spawn_local(async move {
            let result = client
                .generate(&token, &request)
                .await
                .and_then(|text| parse_section_suggestions(text.as_deref().unwrap_or("[]")));

            match result {
                Ok(seeds) if seeds.is_empty() => {
                    app.toast(ToastKind::Info, "No sections suggested");
                }
                Ok(seeds) => {
                    let n = seeds.len();
                    if app.edit(|w| w.apply_group_suggestions(pending, seeds))
                        == Some(ApplyOutcome::Applied)
                    {
                        app.toast(ToastKind::Success, format!("Added {n} suggested sections"));
                    }
                }
                Err(e) => report(app, "Suggestion failed", e),
            }
            app.finish_request(&slot, &token);
        });
    };

    let header_class = format!(
        "flex items-center gap-2 rounded-t-xl border-b-2 px-4 py-3 {} {} {}",
        colors.bg, colors.text, colors.border
    );
    let card_class = format!("rounded-xl border-2 bg-card shadow-sm break-inside-avoid {}", colors.border);
    let leaf_colors = colors.clone();

    view! {
        <section data-name="PillarCard" class=card_class>
            <div class=header_class>
                <Button
                    variant=ButtonVariant::Ghost
                    size=ButtonSize::Icon
                    attr:title="Collapse"
                    on:click=move |_| {
                        app.edit(|w| w.toggle_group_collapsed(group));
                    }
                >
                    {move || chevron(collapsed())}
                </Button>
                <Input
                    class=format!("h-9 flex-1 border-transparent bg-transparent text-lg font-semibold shadow-none {}", colors.ring)
                    value=title
                    on_input=move |v: String| {
                        app.edit(|w| w.rename_group(group, v));
                    }
                />
                <Button
                    variant=ButtonVariant::Ghost
                    size=ButtonSize::Icon
                    attr:title="Move up"
                    attr:disabled=move || index() == Some(0)
                    on:click=move |_| on_move(-1)
                >
                    "↑"
                </Button>
                <Button
                    variant=ButtonVariant::Ghost
                    size=ButtonSize::Icon
                    attr:title="Move down"
                    attr:disabled=move || index().map(|i| i + 1 >= count()).unwrap_or(true)
                    on:click=move |_| on_move(1)
                >
                    "↓"
                </Button>
                <Button
                    variant=ButtonVariant::Ghost
                    size=ButtonSize::Icon
                    class="text-destructive"
                    attr:title="Delete pillar"
                    on:click=on_delete
                >
                    "✕"
                </Button>
            </div>

            <Show when=move || !collapsed() fallback=|| ().into_view()>
                <div class="space-y-3 p-4">
                    <For
                        each=leaf_keys
                        key=|k| *k
                        children={
                            let colors = leaf_colors.clone();
                            move |(_, leaf)| {
                                view! { <SubsectionCard group=group leaf=leaf colors=colors.clone() /> }
                            }
                        }
                    />
                    <div class="flex flex-wrap gap-2">
                        <Button
                            variant=ButtonVariant::Outline
                            size=ButtonSize::Sm
                            on:click=move |_| {
                                app.edit(|w| w.add_default_leaf(group));
                            }
                        >
                            "+ Add section"
                        </Button>
                        <Button
                            variant=ButtonVariant::Ai
                            size=ButtonSize::Sm
                            attr:disabled=is_suggesting.clone()
                            on:click=on_suggest.clone()
                        >
                            <Show when=is_suggesting.clone() fallback=|| ().into_view()>
                                <Spinner />
                            </Show>
                            "✨ Suggest sections"
                        </Button>
                    </div>
                </div>
            </Show>
        </section>
    }
    .into_any()
}

#[component]
pub fn SubsectionCard(group: GroupId, leaf: LeafId, colors: SharedColorSet) -> impl IntoView {
    let app = expect_context::<AppContext>().0;
    let ws = app.workspace;

    let Some(text) = ws.with_untracked(|w| w.editor(leaf).map(|e| e.signal())) else {
        return ().into_any();
    };

    let title = Signal::derive(move || {
        ws.with(|w| w.document().leaf(group, leaf).map(|l| l.title.clone()).unwrap_or_default())
    });
    let collapsed = move || {
        ws.with(|w| w.document().leaf(group, leaf).map(|l| l.collapsed).unwrap_or(false))
    };
    let position = move || {
        ws.with(|w| {
            w.document()
                .group(group)
                .and_then(|g| g.leaves().iter().position(|l| l.id() == leaf))
        })
    };
    let count = move || {
        ws.with(|w| w.document().group(group).map(|g| g.leaves().len()).unwrap_or(0))
    };

    let slot = format!("rewrite:{leaf}");
    let busy_slot = slot.clone();
    let is_rewriting = Signal::derive(move || app.is_busy(&busy_slot));

    let on_move = move |delta: isize| {
        if let Some(i) = position() {
            let to = i.saturating_add_signed(delta);
            app.edit(|w| w.move_leaf(group, i, to));
        }
    };

    let on_delete = move |_| {
        if confirm("Delete this section?") {
            app.edit(|w| w.remove_leaf(group, leaf));
        }
    };

    let on_rewrite = move |_| {
        let Some((pending, request)) = ws.with_untracked(|w| {
            let doc = w.document();
            let g = doc.group(group)?;
            let l = g.leaf(leaf)?;
            let current = w.leaf_content(group, leaf).unwrap_or_default();
            let pending = w.begin_suggestion(SuggestionTarget::Leaf { group, leaf })?;
            Some((pending, rewrite_request(&doc.title, &g.title, &l.title, &current)))
        }) else {
            return;
        };

        let slot = slot.clone();
        let token = app.begin_request(&slot);
        let client = app.generative_client();
        spawn_local(async move {
            match client.generate(&token, &request).await {
                Ok(Some(text)) => {
                    app.edit(|w| w.apply_leaf_text(pending, &text));
                }
                Ok(None) => app.toast(ToastKind::Error, "The model returned no text"),
                Err(e) => report(app, "AI request failed", e),
            }
            app.finish_request(&slot, &token);
        });
    };

    let editor_style = format!("background-color: {}", colors.easymde_bg);
    let print_style = format!(
        "--print-bg: {}; --print-text: {}",
        colors.print_bg, colors.print_text
    );

    view! {
        <div data-name="SubsectionCard" class=format!("rounded-lg border {}", colors.border) style=print_style>
            <div class="flex items-center gap-2 px-3 py-2">
                <Button
                    variant=ButtonVariant::Ghost
                    size=ButtonSize::Icon
                    attr:title="Collapse"
                    on:click=move |_| {
                        app.edit(|w| w.toggle_leaf_collapsed(group, leaf));
                    }
                >
                    {move || chevron(collapsed())}
                </Button>
                <Input
                    class=format!("h-8 flex-1 border-transparent bg-transparent font-medium shadow-none {}", colors.ring)
                    value=title
                    on_input=move |v: String| {
                        app.edit(|w| w.rename_leaf(group, leaf, v));
                    }
                />
                <Button
                    variant=ButtonVariant::Ai
                    size=ButtonSize::Sm
                    attr:title="Draft or rewrite with AI"
                    attr:disabled=move || is_rewriting.get()
                    on:click=on_rewrite
                >
                    <Show when=move || is_rewriting.get() fallback=|| ().into_view()>
                        <Spinner />
                    </Show>
                    "✨"
                </Button>
                <Button
                    variant=ButtonVariant::Ghost
                    size=ButtonSize::Icon
                    attr:title="Move up"
                    attr:disabled=move || position() == Some(0)
                    on:click=move |_| on_move(-1)
                >
                    "↑"
                </Button>
                <Button
                    variant=ButtonVariant::Ghost
                    size=ButtonSize::Icon
                    attr:title="Move down"
                    attr:disabled=move || position().map(|i| i + 1 >= count()).unwrap_or(true)
                    on:click=move |_| on_move(1)
                >
                    "↓"
                </Button>
                <Button
                    variant=ButtonVariant::Ghost
                    size=ButtonSize::Icon
                    class="text-destructive"
                    attr:title="Delete section"
                    on:click=on_delete
                >
                    "✕"
                </Button>
            </div>
            <Show when=move || !collapsed() fallback=|| ().into_view()>
                <div class="px-3 pb-3">
                    <Textarea
                        bind_value=text
                        style=editor_style.clone()
                        placeholder="Write this section in Markdown..."
                        disabled=is_rewriting
                    />
                </div>
            </Show>
        </div>
    }
    .into_any()
}
