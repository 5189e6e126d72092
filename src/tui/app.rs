use chrono::{Duration, NaiveDate};
use ratatui::widgets::TableState;

use crate::commands::{
    active_tasks, cmd_add, cmd_check, cmd_progress, cmd_remove, cmd_resolution_add, today,
};
use crate::config::Config;
use crate::cycle::{active_bounds, CycleBounds};
use crate::error::Result;
use crate::models::{Priority, Task};
use crate::resolution::ResolutionWindow;
use crate::sprint::SprintReport;
use crate::storage::Store;

#[derive(PartialEq)]
pub enum InputMode {
    Normal,
    Editing,
    Adding,
    Checklist,
}

#[derive(PartialEq)]
pub enum ViewMode {
    Tasks,
    Resolutions,
    Analytics,
}

pub enum InputField {
    None,
    Progress,
}

pub struct App {
    pub store: Store,
    pub config: Config,
    /// Regular tasks shown in the Tasks view.
    pub tasks: Vec<Task>,
    pub resolutions: Vec<Task>,
    pub report: SprintReport,
    pub cycle: Option<CycleBounds>,
    pub state: TableState,
    pub resolution_state: TableState,
    pub checklist_state: TableState,
    pub view_mode: ViewMode,
    pub input_mode: InputMode,
    pub input_field: InputField,
    pub input_buffer: String,
    pub target_id: Option<i64>,
    pub add_state: AddState,
    pub show_expired: bool,
    /// Days of the task whose checklist is open.
    pub checklist: Vec<(NaiveDate, bool)>,
    /// One-line feedback from the last action.
    pub message: Option<String>,
}

/// State for the multi-step "Add" wizard.
#[derive(Default)]
pub struct AddState {
    pub name: String,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub step: usize, // tasks: 0 Name, 1 Desc, 2 Priority, 3 Start, 4 End, 5 Daily; resolutions: 0 Goal, 1 Details
}

impl App {
    /// Creates a new App instance and loads initial data.
    pub fn new(store: Store, config: Config) -> App {
        let mut app = App {
            store,
            config,
            tasks: Vec::new(),
            resolutions: Vec::new(),
            report: SprintReport::build(&[]),
            cycle: None,
            state: TableState::default(),
            resolution_state: TableState::default(),
            checklist_state: TableState::default(),
            view_mode: ViewMode::Tasks,
            input_mode: InputMode::Normal,
            input_field: InputField::None,
            input_buffer: String::new(),
            target_id: None,
            add_state: AddState::default(),
            show_expired: false,
            checklist: Vec::new(),
            message: None,
        };
        app.reload();
        app
    }

    /// Keeps the message of a failed action for the status line.
    fn report_result<T>(&mut self, res: Result<T>) {
        if let Err(e) = res {
            self.message = Some(e.to_string());
        }
    }

    /// Whether the add wizard skips the end date because the cycle is locked in.
    pub fn end_locked(&self) -> bool {
        self.cycle.is_some() && self.config.cycle.enforce_end_date
    }

    fn selected_task(&self) -> Option<&Task> {
        self.state.selected().and_then(|i| self.tasks.get(i))
    }

    fn selected_resolution(&self) -> Option<&Task> {
        self.resolution_state.selected().and_then(|i| self.resolutions.get(i))
    }

    /// Selects the next item in the current list.
    pub fn next(&mut self) {
        let (len, state) = match (&self.input_mode, &self.view_mode) {
            (InputMode::Checklist, _) => (self.checklist.len(), &mut self.checklist_state),
            (_, ViewMode::Tasks) => (self.tasks.len(), &mut self.state),
            (_, ViewMode::Resolutions) => (self.resolutions.len(), &mut self.resolution_state),
            (_, ViewMode::Analytics) => return,
        };
        if len == 0 { return; }
        let i = match state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        state.select(Some(i));
    }

    /// Selects the previous item in the current list.
    pub fn previous(&mut self) {
        let (len, state) = match (&self.input_mode, &self.view_mode) {
            (InputMode::Checklist, _) => (self.checklist.len(), &mut self.checklist_state),
            (_, ViewMode::Tasks) => (self.tasks.len(), &mut self.state),
            (_, ViewMode::Resolutions) => (self.resolutions.len(), &mut self.resolution_state),
            (_, ViewMode::Analytics) => return,
        };
        if len == 0 { return; }
        let i = match state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        state.select(Some(i));
    }

    /// Reloads everything from storage and recomputes derived views.
    pub fn reload(&mut self) {
        if let Err(e) = self.try_reload() {
            self.message = Some(e.to_string());
        }
    }

    fn try_reload(&mut self) -> Result<()> {
        let today = today();
        let all = self.store.load_tasks()?;
        self.cycle = active_bounds(&all, today);
        self.report = SprintReport::build(&all);
        self.tasks = if self.show_expired {
            let mut regular: Vec<Task> = all.iter().filter(|t| !t.is_resolution()).cloned().collect();
            regular.sort_by_key(|t| (std::cmp::Reverse(t.end_date), t.priority, t.progress.percent()));
            regular
        } else {
            active_tasks(&all, today)
        };
        self.resolutions = all.into_iter().filter(|t| t.is_resolution()).collect();

        clamp_selection(&mut self.state, self.tasks.len());
        clamp_selection(&mut self.resolution_state, self.resolutions.len());
        Ok(())
    }

    /// Toggles the visibility of expired tasks.
    pub fn toggle_expired(&mut self) {
        self.show_expired = !self.show_expired;
        self.reload();
    }

    /// Cycles Tasks → Resolutions → Analytics.
    pub fn toggle_view(&mut self) {
        self.view_mode = match self.view_mode {
            ViewMode::Tasks => ViewMode::Resolutions,
            ViewMode::Resolutions => ViewMode::Analytics,
            ViewMode::Analytics => ViewMode::Tasks,
        };
    }

    /// Deletes the selected task or resolution.
    pub fn delete_selected(&mut self) {
        let id = match self.view_mode {
            ViewMode::Tasks => self.selected_task().map(|t| t.id),
            ViewMode::Resolutions => self.selected_resolution().map(|t| t.id),
            ViewMode::Analytics => None,
        };
        if let Some(id) = id {
            let res = cmd_remove(&self.store, &self.config, id, true);
            if res.is_ok() {
                self.message = Some(format!("Task {} removed.", id));
            }
            self.report_result(res);
            self.reload();
        }
    }

    /// Opens the checklist of a daily task, or the progress prompt otherwise.
    pub fn open_selected(&mut self) {
        let task = match self.view_mode {
            ViewMode::Tasks => self.selected_task().cloned(),
            ViewMode::Resolutions => self.selected_resolution().cloned(),
            ViewMode::Analytics => None,
        };
        let Some(task) = task else { return };
        if task.is_daily() {
            self.target_id = Some(task.id);
            self.load_checklist(&task);
            self.checklist_state.select(if self.checklist.is_empty() { None } else { Some(0) });
            self.input_mode = InputMode::Checklist;
        } else {
            self.start_progress();
        }
    }

    fn load_checklist(&mut self, task: &Task) {
        match self.store.daily_logs(task.id) {
            Ok(logs) => {
                self.checklist.clear();
                let mut day = task.start_date;
                while day <= task.end_date {
                    self.checklist.push((day, logs.get(&day).copied().unwrap_or(false)));
                    day += Duration::days(1);
                }
            }
            Err(e) => self.message = Some(e.to_string()),
        }
    }

    /// Flips the selected day of the open checklist.
    pub fn toggle_checklist_day(&mut self) {
        let (Some(id), Some(i)) = (self.target_id, self.checklist_state.selected()) else {
            return;
        };
        let Some(&(day, done)) = self.checklist.get(i) else { return };
        match cmd_check(&self.store, id, Some(day.to_string()), !done, true) {
            Ok(percent) => {
                self.checklist[i].1 = !done;
                if let Some(p) = percent {
                    self.message = Some(format!("Progress: {}%", p));
                }
            }
            Err(e) => self.message = Some(e.to_string()),
        }
        self.reload();
    }

    pub fn close_checklist(&mut self) {
        self.input_mode = InputMode::Normal;
        self.checklist.clear();
        self.target_id = None;
    }

    /// Prompts for a new progress value of the selected non-daily task.
    pub fn start_progress(&mut self) {
        let task = match self.view_mode {
            ViewMode::Tasks => self.selected_task(),
            ViewMode::Resolutions => self.selected_resolution(),
            ViewMode::Analytics => None,
        };
        let Some((id, daily, percent)) = task.map(|t| (t.id, t.is_daily(), t.progress.percent())) else {
            return;
        };
        if daily {
            self.message = Some("Daily tasks are tracked through their checklist.".into());
            return;
        }
        self.target_id = Some(id);
        self.input_buffer = percent.to_string();
        self.input_mode = InputMode::Editing;
        self.input_field = InputField::Progress;
    }

    /// Initiates the "Add" wizard for the current view.
    pub fn start_add(&mut self) {
        if self.view_mode == ViewMode::Analytics { return; }
        if self.view_mode == ViewMode::Resolutions {
            let today = today();
            let locked = ResolutionWindow::for_today(today, &self.config.resolutions)
                .map(|w| w.is_locked(today));
            match locked {
                Ok(false) => {}
                Ok(true) => {
                    self.message = Some("Resolutions are locked for the year.".into());
                    return;
                }
                Err(e) => {
                    self.message = Some(e.to_string());
                    return;
                }
            }
        }
        self.input_mode = InputMode::Adding;
        self.add_state = AddState::default();
        self.input_buffer.clear();
    }

    /// Handles text input based on the current mode.
    pub fn handle_input(&mut self) {
        match self.input_mode {
            InputMode::Adding => self.handle_adding_input(),
            InputMode::Editing => self.handle_editing_input(),
            _ => {}
        }
    }

    fn take_optional(&mut self) -> Option<String> {
        let s = std::mem::take(&mut self.input_buffer);
        if s.trim().is_empty() { None } else { Some(s) }
    }

    /// Handles input for the "Add" wizard.
    fn handle_adding_input(&mut self) {
        match self.view_mode {
            ViewMode::Tasks => match self.add_state.step {
                0 => { // Name
                    if !self.input_buffer.trim().is_empty() {
                        self.add_state.name = std::mem::take(&mut self.input_buffer);
                        self.add_state.step += 1;
                    }
                }
                1 => { // Description
                    self.add_state.description = self.take_optional();
                    self.add_state.step += 1;
                }
                2 => { // Priority
                    match self.take_optional().map(|p| p.parse::<Priority>()) {
                        None => {
                            self.add_state.priority = Some(Priority::Medium);
                            self.add_state.step += 1;
                        }
                        Some(Ok(p)) => {
                            self.add_state.priority = Some(p);
                            self.add_state.step += 1;
                        }
                        Some(Err(e)) => self.message = Some(e.to_string()),
                    }
                }
                3 => { // Start
                    self.add_state.start = self.take_optional();
                    // end date is fixed while a cycle is running
                    self.add_state.step += if self.end_locked() { 2 } else { 1 };
                }
                4 => { // End
                    self.add_state.end = self.take_optional();
                    self.add_state.step += 1;
                }
                5 => { // Daily
                    let daily = self.input_buffer.trim().eq_ignore_ascii_case("y");
                    self.input_buffer.clear();
                    let res = cmd_add(
                        &self.store,
                        &self.config,
                        self.add_state.name.clone(),
                        self.add_state.description.clone(),
                        self.add_state.priority.unwrap_or(Priority::Medium),
                        self.add_state.start.clone(),
                        self.add_state.end.clone(),
                        daily,
                        true,
                    );
                    if let Ok(id) = res {
                        self.message = Some(format!("Added! (id = {})", id));
                    }
                    self.report_result(res);
                    self.input_mode = InputMode::Normal;
                    self.reload();
                }
                _ => {}
            },
            ViewMode::Resolutions => match self.add_state.step {
                0 => { // Goal
                    if !self.input_buffer.trim().is_empty() {
                        self.add_state.name = std::mem::take(&mut self.input_buffer);
                        self.add_state.step += 1;
                    }
                }
                1 => { // Details
                    let details = self.take_optional();
                    match cmd_resolution_add(&self.store, &self.config, self.add_state.name.clone(), details, true) {
                        Ok(added) => {
                            self.message = Some(format!(
                                "✨ Resolution '{}' for {} added successfully!",
                                added.name, added.year
                            ));
                        }
                        Err(e) => self.message = Some(e.to_string()),
                    }
                    self.input_mode = InputMode::Normal;
                    self.reload();
                }
                _ => {}
            },
            ViewMode::Analytics => self.input_mode = InputMode::Normal,
        }
    }

    /// Handles input for the progress prompt.
    fn handle_editing_input(&mut self) {
        if let (Some(id), true) = (self.target_id, matches!(self.input_field, InputField::Progress)) {
            match self.input_buffer.trim().parse::<u8>() {
                Ok(p) => {
                    let res = cmd_progress(&self.store, id, p, true);
                    if res.is_ok() {
                        self.message = Some(format!("Task {} progress set to {}%.", id, p));
                    }
                    self.report_result(res);
                }
                Err(_) => self.message = Some(format!("'{}' is not a percentage", self.input_buffer)),
            }
        }
        self.input_mode = InputMode::Normal;
        self.input_field = InputField::None;
        self.input_buffer.clear();
        self.target_id = None;
        self.reload();
    }
}

fn clamp_selection(state: &mut TableState, len: usize) {
    if len == 0 {
        state.select(None);
    } else if let Some(i) = state.selected() {
        if i >= len {
            state.select(Some(len - 1));
        }
    } else {
        state.select(Some(0));
    }
}
