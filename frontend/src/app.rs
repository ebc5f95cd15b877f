use std::collections::{HashMap, HashSet, VecDeque};

use chrono::{DateTime, Utc};
use gloo::timers::future::TimeoutFuture;
use sauron::{
    html::{attributes::*, *},
    prelude::*,
};
use shared::render::{EmptyState, TaskView};
use shared::task::parse_deadline_input;
use shared::transfer::export_file_name;
use shared::{
    AppConfig, Controller, LocalAdapter, Persistence, PersistenceMode, RemoteAdapter, StorageMode,
    TaskFilter, TaskListView, TaskStats, UserPrompt, REMOVAL_TRANSITION,
};
use tracing::{info, warn};

use crate::browser::{self, BrowserPrompt, BrowserStorage};
use crate::transport::FetchTransport;

pub type AppController = Controller<BrowserStorage, FetchTransport, BrowserPrompt>;

const IMPORT_INPUT_ID: &str = "importFile";

/// Work that needs the controller. Intents run one at a time, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Add {
        text: String,
        deadline: Option<DateTime<Utc>>,
    },
    Toggle(String),
    BeginEdit(String),
    CommitEdit(String),
    CancelEdit,
    ConfirmDelete(String),
    Delete(String),
    SetFilter(TaskFilter),
    Export,
    Import(String),
    ClearAll,
}

/// What the view should do once an intent has settled.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Settled,
    Added,
    Editing(String),
    /// The toggle was rejected; the checkbox the browser already flipped must be reset.
    RevertToggle(String),
    Removing(String),
    Removed(String),
}

#[derive(Debug, Clone)]
pub struct Settled {
    controller: AppController,
    stats: TaskStats,
    outcome: Outcome,
}

#[derive(Debug, Clone)]
pub enum Msg {
    Dispatch(Intent),
    Settled(Box<Settled>),
    SetNewText(String),
    SetNewDeadline(String),
    Submit,
    SetEditText(String),
    EditKey(String),
    PickImportFile,
    Noop,
}

#[derive(Debug, Clone, Default)]
pub struct Model {
    controller: Option<AppController>,
    queue: VecDeque<Intent>,
    view: TaskListView,
    stats: TaskStats,
    mode: Option<PersistenceMode>,
    new_text: String,
    new_deadline: String,
    edit_text: String,
    removing: HashSet<String>,
    redraws: HashMap<String, u32>,
}

impl Application for Model {
    type MSG = Msg;

    fn init(&mut self) -> Cmd<Msg> {
        let config = browser::app_config();
        Cmd::new(start(config))
    }

    fn update(&mut self, msg: Msg) -> Cmd<Msg> {
        match msg {
            Msg::Dispatch(intent) => self.dispatch(intent),
            Msg::Settled(settled) => self.settle(*settled),
            Msg::SetNewText(text) => {
                self.new_text = text;
                Cmd::none()
            }
            Msg::SetNewDeadline(deadline) => {
                self.new_deadline = deadline;
                Cmd::none()
            }
            Msg::Submit => match parse_deadline_input(&self.new_deadline) {
                Ok(deadline) => self.dispatch(Intent::Add {
                    text: self.new_text.clone(),
                    deadline,
                }),
                Err(err) => {
                    warn!(error = %err, "ignoring add with unreadable deadline");
                    Cmd::none()
                }
            },
            Msg::SetEditText(text) => {
                self.edit_text = text;
                Cmd::none()
            }
            Msg::EditKey(key) => match edit_key_intent(&key, &self.edit_text) {
                Some(intent) => self.dispatch(intent),
                None => Cmd::none(),
            },
            Msg::PickImportFile => Cmd::new(async {
                match browser::read_picked_file(IMPORT_INPUT_ID).await {
                    Some(Ok(raw)) => Msg::Dispatch(Intent::Import(raw)),
                    Some(Err(err)) => {
                        BrowserPrompt.notify(&err.user_message());
                        Msg::Noop
                    }
                    None => Msg::Noop,
                }
            }),
            Msg::Noop => Cmd::none(),
        }
    }

    fn view(&self) -> Node<Msg> {
        div(
            [class("min-h-screen bg-ctp-base text-ctp-text")],
            [
                self.view_header(),
                div(
                    [class("max-w-4xl mx-auto px-6 py-8 space-y-8")],
                    [
                        self.view_stats(),
                        self.view_create_form(),
                        self.view_filters(),
                        self.view_task_list(),
                        self.view_transfer_bar(),
                    ],
                ),
            ],
        )
    }
}

impl Model {
    fn dispatch(&mut self, intent: Intent) -> Cmd<Msg> {
        match self.controller.take() {
            Some(controller) => Cmd::new(run(controller, intent)),
            None => {
                self.queue.push_back(intent);
                Cmd::none()
            }
        }
    }

    fn settle(&mut self, settled: Settled) -> Cmd<Msg> {
        let Settled {
            controller,
            stats,
            outcome,
        } = settled;

        let mut cmds = Vec::new();
        match outcome {
            Outcome::Settled => {}
            Outcome::Added => {
                self.new_text.clear();
                self.new_deadline.clear();
            }
            Outcome::Editing(text) => self.edit_text = text,
            Outcome::RevertToggle(id) => self.revert_toggle(id),
            Outcome::Removing(id) => {
                self.removing.insert(id.clone());
                cmds.push(Cmd::new(async move {
                    TimeoutFuture::new(REMOVAL_TRANSITION.as_millis() as u32).await;
                    Msg::Dispatch(Intent::Delete(id))
                }));
            }
            Outcome::Removed(id) => {
                self.removing.remove(&id);
            }
        }

        self.view = controller.render(Utc::now());
        self.stats = stats;
        self.mode = Some(controller.mode());
        self.controller = Some(controller);

        if let Some(next) = self.queue.pop_front() {
            cmds.push(self.dispatch(next));
        }
        Cmd::batch(cmds)
    }

    /// A new key makes the vdom rebuild the row, so its checkbox shows the stored
    /// state again instead of the one the click left behind.
    fn revert_toggle(&mut self, id: String) {
        *self.redraws.entry(id).or_default() += 1;
    }

    fn row_key(&self, id: &str) -> String {
        match self.redraws.get(id) {
            Some(redraw) => format!("{id}#{redraw}"),
            None => id.to_string(),
        }
    }

    fn view_header(&self) -> Node<Msg> {
        let mode = match self.mode {
            Some(PersistenceMode::Remote) => "API backend",
            Some(PersistenceMode::Local) => "Local storage",
            None => "Connecting...",
        };
        header(
            [class("bg-ctp-mantle shadow-lg border-b border-ctp-surface0")],
            [div(
                [class("max-w-4xl mx-auto px-6 py-4 flex items-center justify-between")],
                [
                    h1([class("text-2xl font-bold text-ctp-text")], [text("Task Manager")]),
                    span(
                        [class("text-sm text-ctp-subtext0")],
                        [text(format!("Storage: {mode}"))],
                    ),
                ],
            )],
        )
    }

    fn view_stats(&self) -> Node<Msg> {
        div(
            [class("grid grid-cols-2 md:grid-cols-4 gap-6")],
            [
                stat_card("Total", self.stats.total, "📝"),
                stat_card("Pending", self.stats.pending, "⏳"),
                stat_card("Completed", self.stats.completed, "✅"),
                stat_card("Overdue", self.stats.overdue, "⚠️"),
            ],
        )
    }

    fn view_create_form(&self) -> Node<Msg> {
        div(
            [class("p-6 bg-ctp-surface1 rounded-lg border border-ctp-surface2")],
            [div(
                [class("flex flex-wrap gap-4")],
                [
                    input(
                        [
                            r#type("text"),
                            id("taskInput"),
                            placeholder("What needs to be done?"),
                            value(&self.new_text),
                            on_input(|event| Msg::SetNewText(event.value())),
                            on_keydown(|event| {
                                if event.key() == "Enter" {
                                    Msg::Submit
                                } else {
                                    Msg::Noop
                                }
                            }),
                            class("flex-1 px-3 py-2 bg-ctp-surface0 border border-ctp-surface2 rounded-md text-ctp-text placeholder-ctp-subtext0 focus:outline-none focus:ring-2 focus:ring-ctp-blue"),
                        ],
                        [],
                    ),
                    input(
                        [
                            r#type("datetime-local"),
                            id("deadlineInput"),
                            value(&self.new_deadline),
                            on_input(|event| Msg::SetNewDeadline(event.value())),
                            class("px-3 py-2 bg-ctp-surface0 border border-ctp-surface2 rounded-md text-ctp-text"),
                        ],
                        [],
                    ),
                    button(
                        [
                            on_click(|_| Msg::Submit),
                            class("bg-ctp-blue hover:bg-ctp-sapphire text-ctp-base font-medium px-6 py-2 rounded-md transition-colors duration-200"),
                        ],
                        [text("Add Task")],
                    ),
                ],
            )],
        )
    }

    fn view_filters(&self) -> Node<Msg> {
        div(
            [class("flex items-center justify-between")],
            [
                div(
                    [class("flex gap-2")],
                    TaskFilter::ALL
                        .iter()
                        .map(|filter| self.filter_button(*filter))
                        .collect::<Vec<_>>(),
                ),
                span(
                    [class("text-sm text-ctp-subtext0"), id("taskCount")],
                    [text(&self.view.count_label)],
                ),
            ],
        )
    }

    fn filter_button(&self, filter: TaskFilter) -> Node<Msg> {
        let is_active = self.view.filter == filter;
        button(
            [
                on_click(move |_| Msg::Dispatch(Intent::SetFilter(filter))),
                class(format!(
                    "filter-btn px-3 py-1 rounded-md text-sm font-medium transition-colors duration-200 {}",
                    if is_active {
                        "active bg-ctp-blue text-ctp-base"
                    } else {
                        "text-ctp-subtext0 hover:text-ctp-text hover:bg-ctp-surface0"
                    }
                )),
            ],
            [text(filter.label())],
        )
    }

    fn view_task_list(&self) -> Node<Msg> {
        match self.view.empty {
            Some(empty) => view_empty_state(empty),
            None => ul(
                [class("space-y-4"), id("taskList")],
                self.view
                    .items
                    .iter()
                    .map(|task| self.view_task(task))
                    .collect::<Vec<_>>(),
            ),
        }
    }

    fn view_task(&self, task: &TaskView) -> Node<Msg> {
        let removing = self.removing.contains(&task.id);
        let mut classes = vec!["task-item"];
        if task.completed {
            classes.push("completed");
        }
        if task.is_overdue() {
            classes.push("overdue");
        }
        if removing {
            classes.push("removing opacity-0 scale-95");
        }

        li(
            [
                key(self.row_key(&task.id)),
                class(format!(
                    "{} border rounded-xl p-4 bg-ctp-surface0 shadow-sm transition-all duration-300 {}",
                    classes.join(" "),
                    if task.completed {
                        "border-ctp-green bg-ctp-green/10"
                    } else {
                        "border-ctp-surface1 hover:border-ctp-blue"
                    }
                )),
            ],
            [div(
                [class("flex items-start gap-4")],
                [
                    input(
                        [
                            r#type("checkbox"),
                            class("task-checkbox mt-1"),
                            checked(task.completed),
                            disabled(removing),
                            on_click({
                                let id = task.id.clone();
                                move |_| Msg::Dispatch(Intent::Toggle(id.clone()))
                            }),
                        ],
                        [],
                    ),
                    div(
                        [class("flex-1 min-w-0")],
                        [
                            if task.editing {
                                self.view_edit_input()
                            } else {
                                span(
                                    [
                                        class(format!(
                                            "task-text text-lg break-words {}",
                                            if task.completed {
                                                "line-through text-ctp-overlay1"
                                            } else {
                                                "text-ctp-text"
                                            }
                                        )),
                                        on_dblclick({
                                            let id = task.id.clone();
                                            move |_| Msg::Dispatch(Intent::BeginEdit(id.clone()))
                                        }),
                                    ],
                                    [text(&task.text)],
                                )
                            },
                            div(
                                [class("task-meta flex gap-4 mt-2 text-xs text-ctp-subtext0")],
                                [
                                    span(
                                        [class("task-date")],
                                        [text(format!("Created: {}", task.created_label))],
                                    ),
                                    match &task.deadline {
                                        Some(deadline) => span(
                                            [class(format!(
                                                "task-deadline {}",
                                                deadline.state.css_class()
                                            ))],
                                            [text(&deadline.label)],
                                        ),
                                        None => span([], []),
                                    },
                                ],
                            ),
                        ],
                    ),
                    div(
                        [class("task-actions flex gap-2")],
                        [
                            button(
                                [
                                    r#type("button"),
                                    class("edit-btn w-8 h-8 rounded-lg bg-ctp-blue/20 text-ctp-blue hover:bg-ctp-blue/30"),
                                    disabled(removing || task.editing),
                                    on_click({
                                        let id = task.id.clone();
                                        move |_| Msg::Dispatch(Intent::BeginEdit(id.clone()))
                                    }),
                                ],
                                [text("✏️")],
                            ),
                            button(
                                [
                                    r#type("button"),
                                    class("delete-btn w-8 h-8 rounded-lg bg-ctp-red/20 text-ctp-red hover:bg-ctp-red/30"),
                                    disabled(removing),
                                    on_click({
                                        let id = task.id.clone();
                                        move |_| Msg::Dispatch(Intent::ConfirmDelete(id.clone()))
                                    }),
                                ],
                                [text("🗑️")],
                            ),
                        ],
                    ),
                ],
            )],
        )
    }

    fn view_edit_input(&self) -> Node<Msg> {
        input(
            [
                r#type("text"),
                class("edit-input w-full px-3 py-2 bg-ctp-surface1 border border-ctp-surface2 rounded-md text-ctp-text focus:outline-none focus:ring-2 focus:ring-ctp-blue"),
                value(&self.edit_text),
                autofocus(true),
                on_input(|event| Msg::SetEditText(event.value())),
                on_keydown(|event| Msg::EditKey(event.key())),
                on_blur({
                    let text = self.edit_text.clone();
                    move |_| Msg::Dispatch(Intent::CommitEdit(text.clone()))
                }),
            ],
            [],
        )
    }

    fn view_transfer_bar(&self) -> Node<Msg> {
        let local = self.mode == Some(PersistenceMode::Local);
        div(
            [class("flex flex-wrap gap-4 justify-end")],
            [
                button(
                    [
                        on_click(|_| Msg::Dispatch(Intent::Export)),
                        class("bg-ctp-green hover:bg-ctp-teal text-ctp-base font-medium px-4 py-2 rounded-md"),
                    ],
                    [text("Export")],
                ),
                label(
                    [class(format!(
                        "font-medium px-4 py-2 rounded-md {}",
                        if local {
                            "bg-ctp-mauve hover:bg-ctp-lavender text-ctp-base cursor-pointer"
                        } else {
                            "bg-ctp-surface1 text-ctp-overlay0"
                        }
                    ))],
                    [
                        text("Import"),
                        input(
                            [
                                r#type("file"),
                                id(IMPORT_INPUT_ID),
                                attr("accept", ".json"),
                                class("hidden"),
                                on_change(|_| Msg::PickImportFile),
                            ],
                            [],
                        ),
                    ],
                ),
                button(
                    [
                        on_click(|_| Msg::Dispatch(Intent::ClearAll)),
                        class("bg-ctp-red/20 text-ctp-red hover:bg-ctp-red/30 font-medium px-4 py-2 rounded-md"),
                    ],
                    [text("Clear All")],
                ),
            ],
        )
    }
}

fn stat_card(card_title: &str, value: u64, icon: &str) -> Node<Msg> {
    div(
        [class("bg-ctp-surface1 rounded-lg p-6 border border-ctp-surface2")],
        [div(
            [class("flex items-center justify-between")],
            [
                div(
                    [],
                    [
                        p([class("text-sm font-medium text-ctp-subtext0")], [text(card_title)]),
                        p(
                            [class("text-2xl font-bold text-ctp-text mt-1")],
                            [text(value.to_string())],
                        ),
                    ],
                ),
                span([class("text-3xl")], [text(icon)]),
            ],
        )],
    )
}

fn view_empty_state(empty: EmptyState) -> Node<Msg> {
    div(
        [class("empty-state text-center py-12")],
        [
            h3([class("text-lg font-medium text-ctp-text mb-2")], [text(empty.title)]),
            p([class("text-ctp-subtext0")], [text(empty.message)]),
        ],
    )
}

/// Enter commits the edit field, Escape abandons it.
pub fn edit_key_intent(key: &str, edit_text: &str) -> Option<Intent> {
    match key {
        "Enter" => Some(Intent::CommitEdit(edit_text.to_string())),
        "Escape" => Some(Intent::CancelEdit),
        _ => None,
    }
}

/// Picks the persistence variant once, loads the first snapshot and hands the
/// controller to the model.
async fn start(config: AppConfig) -> Msg {
    let local = LocalAdapter::new(BrowserStorage).with_samples(config.seed_samples);
    let remote = match config.storage {
        StorageMode::Remote { base_url } => Some(RemoteAdapter::new(FetchTransport::new(base_url))),
        StorageMode::Local => None,
    };
    let persistence = Persistence::select(local, remote).await;
    let mut controller = Controller::new(persistence, BrowserPrompt);

    let now = Utc::now();
    if let Err(err) = controller.load(now).await {
        warn!(error = %err, "starting with an empty task list");
    }
    info!(mode = ?controller.mode(), tasks = controller.store().len(), "task manager ready");
    settled(controller, Outcome::Settled).await
}

async fn run(mut controller: AppController, intent: Intent) -> Msg {
    let now = Utc::now();
    let outcome = match intent {
        Intent::Add { text, deadline } => match controller.add_task(&text, deadline, now).await {
            Ok(_) => Outcome::Added,
            Err(_) => Outcome::Settled,
        },
        Intent::Toggle(id) => match controller.toggle_task(&id).await {
            Ok(_) => Outcome::Settled,
            Err(_) => Outcome::RevertToggle(id),
        },
        Intent::BeginEdit(id) => controller
            .begin_edit(&id)
            .map(Outcome::Editing)
            .unwrap_or(Outcome::Settled),
        Intent::CommitEdit(text) => {
            controller.commit_edit(&text).await.ok();
            Outcome::Settled
        }
        Intent::CancelEdit => {
            controller.cancel_edit();
            Outcome::Settled
        }
        Intent::ConfirmDelete(id) => {
            if controller.confirm_delete(&id) {
                Outcome::Removing(id)
            } else {
                Outcome::Settled
            }
        }
        Intent::Delete(id) => {
            controller.delete_task(&id).await.ok();
            Outcome::Removed(id)
        }
        Intent::SetFilter(filter) => {
            controller.set_filter(filter).await.ok();
            Outcome::Settled
        }
        Intent::Export => {
            if let Ok(json) = controller.export_json() {
                if let Err(err) = browser::download_json(&export_file_name(now), &json) {
                    controller.prompt().notify(&err.user_message());
                }
            }
            Outcome::Settled
        }
        Intent::Import(raw) => {
            controller.import_json(&raw).await.ok();
            Outcome::Settled
        }
        Intent::ClearAll => {
            controller.clear_all().await.ok();
            Outcome::Settled
        }
    };
    settled(controller, outcome).await
}

async fn settled(controller: AppController, outcome: Outcome) -> Msg {
    let stats = controller.stats(Utc::now()).await;
    Msg::Settled(Box::new(Settled {
        controller,
        stats,
        outcome,
    }))
}
