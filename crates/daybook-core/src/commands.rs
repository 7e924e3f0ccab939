use std::collections::BTreeMap;

use anyhow::{Context, anyhow};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use tracing::{debug, info, instrument, warn};

use crate::calendar::{build_month_view, build_week_view};
use crate::cli::Invocation;
use crate::config::Config;
use crate::datastore::EventStore;
use crate::datetime::{parse_date, parse_local_datetime, parse_time_of_day, to_project_local};
use crate::event::{Event, EventForm};
use crate::filter::{ViewMode, filter_events_by_day, filter_events_by_month, get_filtered_events_with_week_start};
use crate::notification::{create_notification_message, get_upcoming_events};
use crate::overlap::find_overlapping_events;
use crate::render::Renderer;
use crate::validation::get_time_error_message;

const MODIFIER_KEYS: &[&str] = &[
    "title",
    "description",
    "desc",
    "location",
    "category",
    "date",
    "start",
    "end",
    "notify",
    "id",
    "view",
    "at",
    "notified",
    "force",
];

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "list",
        "day",
        "calendar",
        "add",
        "overlaps",
        "upcoming",
        "holidays",
        "validate",
        "_show",
        "help",
        "version",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

/// `key:value` modifiers plus the remaining free words of a command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub values: BTreeMap<String, String>,
    pub words: Vec<String>,
}

impl Modifiers {
    pub fn parse(args: &[String]) -> Self {
        let mut mods = Self::default();
        for arg in args {
            match arg.split_once(':') {
                Some((key, value)) if MODIFIER_KEYS.contains(&key) => {
                    let key = if key == "desc" { "description" } else { key };
                    mods.values.insert(key.to_string(), value.to_string());
                }
                _ => mods.words.push(arg.clone()),
            }
        }
        mods
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    fn require(&self, key: &str) -> anyhow::Result<&str> {
        self.get(key)
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| anyhow!("missing {key}:<value>"))
    }

    fn text(&self) -> String {
        self.words.join(" ")
    }

    fn flag(&self, key: &str) -> bool {
        self.get(key).is_some_and(|value| {
            matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "1" | "y" | "yes" | "on" | "true"
            )
        })
    }

    fn reference_date(&self, now: NaiveDateTime) -> anyhow::Result<NaiveDate> {
        match self.get("date") {
            Some(raw) => {
                parse_date(raw).ok_or_else(|| anyhow!("invalid date:{raw} (expected YYYY-MM-DD)"))
            }
            None => Ok(now.date()),
        }
    }

    fn view(&self, cfg: &Config) -> anyhow::Result<ViewMode> {
        match self.get("view") {
            Some(raw) => ViewMode::from_key(raw)
                .ok_or_else(|| anyhow!("invalid view:{raw} (expected week or month)")),
            None => cfg.default_view(),
        }
    }

    /// Builds an unsaved event from `title: date: start: end:` and friends.
    /// Free words stand in for a missing title.
    pub fn to_form(&self) -> anyhow::Result<EventForm> {
        let form = self.to_untitled_form()?;
        if form.title.trim().is_empty() {
            return Err(anyhow!("event needs a title (title:<text> or free words)"));
        }
        Ok(form)
    }

    fn to_untitled_form(&self) -> anyhow::Result<EventForm> {
        let title = match self.get("title") {
            Some(title) => title.to_string(),
            None => self.text(),
        };

        let mut form = EventForm::new(
            title,
            self.require("date")?,
            self.require("start")?,
            self.require("end")?,
        );
        if let Some(description) = self.get("description") {
            form.description = description.to_string();
        }
        if let Some(location) = self.get("location") {
            form.location = location.to_string();
        }
        if let Some(category) = self.get("category") {
            form.category = category.to_string();
        }
        if let Some(notify) = self.get("notify") {
            form.notification_time = notify
                .trim()
                .parse()
                .with_context(|| format!("invalid notify:{notify} (expected minutes)"))?;
        }
        Ok(form)
    }
}

#[instrument(skip(store, cfg, renderer, inv))]
pub fn dispatch(
    store: &EventStore,
    cfg: &Config,
    renderer: &mut Renderer,
    inv: Invocation,
) -> anyhow::Result<()> {
    let now = to_project_local(Utc::now());
    let command = inv.command.as_str();
    let mods = Modifiers::parse(&inv.command_args);

    debug!(
        command,
        modifiers = ?mods.values,
        words = ?mods.words,
        "dispatching command"
    );

    match command {
        "list" => cmd_list(store, cfg, renderer, &mods, now),
        "day" => cmd_day(store, renderer, &mods, now),
        "calendar" => cmd_calendar(store, cfg, renderer, &mods, now),
        "add" => cmd_add(store, renderer, &mods),
        "overlaps" => cmd_overlaps(store, renderer, &mods),
        "upcoming" => cmd_upcoming(store, renderer, &mods, now),
        "holidays" => cmd_holidays(cfg, renderer, &mods, now),
        "validate" => cmd_validate(renderer, &mods),
        "_show" => cmd_show(cfg),
        "help" => cmd_help(),
        "version" => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => Err(anyhow!("unknown command: {other}")),
    }
}

#[instrument(skip(store, cfg, renderer, mods, now))]
fn cmd_list(
    store: &EventStore,
    cfg: &Config,
    renderer: &mut Renderer,
    mods: &Modifiers,
    now: NaiveDateTime,
) -> anyhow::Result<()> {
    info!("command list");

    let events = store.load()?;
    let view = mods.view(cfg)?;
    let reference = mods.reference_date(now)?;
    let term = mods.text();

    let filtered =
        get_filtered_events_with_week_start(&events, &term, reference, view, cfg.week_start()?);
    renderer.print_event_table(&filtered)
}

#[instrument(skip(store, renderer, mods, now))]
fn cmd_day(
    store: &EventStore,
    renderer: &mut Renderer,
    mods: &Modifiers,
    now: NaiveDateTime,
) -> anyhow::Result<()> {
    info!("command day");

    let raw_day = mods
        .words
        .first()
        .ok_or_else(|| anyhow!("day requires a day-of-month argument"))?;
    let day: u32 = raw_day
        .parse()
        .with_context(|| format!("invalid day-of-month: {raw_day}"))?;

    let events = store.load()?;
    let reference = mods.reference_date(now)?;
    let month = filter_events_by_month(&events, reference);
    let on_day = filter_events_by_day(month.iter().copied(), day);
    renderer.print_event_table(&on_day)
}

#[instrument(skip(store, cfg, renderer, mods, now))]
fn cmd_calendar(
    store: &EventStore,
    cfg: &Config,
    renderer: &mut Renderer,
    mods: &Modifiers,
    now: NaiveDateTime,
) -> anyhow::Result<()> {
    info!("command calendar");

    let events = store.load()?;
    let holidays = cfg.holiday_calendar()?;
    let reference = mods.reference_date(now)?;
    let week_start = cfg.week_start()?;

    match mods.view(cfg)? {
        ViewMode::Month => {
            let view = build_month_view(&events, reference, &holidays, week_start);
            renderer.print_month_view(&view)
        }
        ViewMode::Week => {
            let view = build_week_view(&events, reference, &holidays, week_start);
            renderer.print_week_view(&view)
        }
    }
}

#[instrument(skip(store, renderer, mods))]
fn cmd_add(store: &EventStore, renderer: &mut Renderer, mods: &Modifiers) -> anyhow::Result<()> {
    info!("command add");

    let form = mods.to_form()?;
    if parse_date(&form.date).is_none() {
        return Err(anyhow!("invalid date:{} (expected YYYY-MM-DD)", form.date));
    }
    for (key, value) in [("start", &form.start_time), ("end", &form.end_time)] {
        if parse_time_of_day(value).is_none() {
            return Err(anyhow!("invalid {key}:{value} (expected HH:MM)"));
        }
    }

    let time_errors = get_time_error_message(&form.start_time, &form.end_time);
    if time_errors.has_error() {
        renderer.print_time_errors(&time_errors)?;
        return Err(anyhow!(
            "invalid time range {}-{}",
            form.start_time,
            form.end_time
        ));
    }

    let events = store.load()?;
    let conflicts = find_overlapping_events(&form, &events);
    if !conflicts.is_empty() {
        renderer.print_event_table(&conflicts)?;
        if !mods.flag("force") {
            return Err(anyhow!(
                "event overlaps {} existing event(s); pass force:yes to save anyway",
                conflicts.len()
            ));
        }
        warn!(conflicts = conflicts.len(), "saving overlapping event on request");
    }

    let event = form.into_event();
    let id = event.id.clone();
    let events = store.add_event(events, event)?;

    debug!(count = events.len(), "event added");
    println!("Created event {id}.");
    Ok(())
}

#[instrument(skip(store, renderer, mods))]
fn cmd_overlaps(
    store: &EventStore,
    renderer: &mut Renderer,
    mods: &Modifiers,
) -> anyhow::Result<()> {
    info!("command overlaps");

    let form = mods.to_untitled_form()?;
    let events = store.load()?;
    let conflicts = match mods.get("id") {
        Some(id) => find_overlapping_events(&Event::new(id, form), &events),
        None => find_overlapping_events(&form, &events),
    };
    renderer.print_event_table(&conflicts)
}

#[instrument(skip(store, renderer, mods, now))]
fn cmd_upcoming(
    store: &EventStore,
    renderer: &mut Renderer,
    mods: &Modifiers,
    now: NaiveDateTime,
) -> anyhow::Result<()> {
    info!("command upcoming");

    let at = match mods.get("at") {
        Some(raw) => parse_local_datetime(raw)?,
        None => now,
    };
    let notified: Vec<&str> = mods
        .get("notified")
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let events = store.load()?;
    let upcoming = get_upcoming_events(&events, at, &notified);
    if upcoming.is_empty() {
        return renderer.print_lines(["No upcoming notifications."]);
    }
    renderer.print_lines(upcoming.into_iter().map(create_notification_message))
}

#[instrument(skip(cfg, renderer, mods, now))]
fn cmd_holidays(
    cfg: &Config,
    renderer: &mut Renderer,
    mods: &Modifiers,
    now: NaiveDateTime,
) -> anyhow::Result<()> {
    info!("command holidays");

    let reference = mods.reference_date(now)?;
    let holidays = cfg.holiday_calendar()?.for_month(reference);
    renderer.print_holidays(&holidays)
}

#[instrument(skip(renderer, mods))]
fn cmd_validate(renderer: &mut Renderer, mods: &Modifiers) -> anyhow::Result<()> {
    info!("command validate");

    let start = mods.words.first().map(String::as_str).unwrap_or_default();
    let end = mods.words.get(1).map(String::as_str).unwrap_or_default();
    renderer.print_time_errors(&get_time_error_message(start, end))
}

fn cmd_show(cfg: &Config) -> anyhow::Result<()> {
    let sorted: BTreeMap<&String, &String> = cfg.iter().collect();
    for (key, value) in sorted {
        println!("{key}={value}");
    }
    for file in &cfg.loaded_files {
        println!("# loaded {}", file.display());
    }
    Ok(())
}

const HELP_TEXT: &str = "\
usage: daybook [--data FILE] [--rc KEY=VALUE] <command> [key:value ...] [words]

  list      [view:week|month] [date:YYYY-MM-DD] [search words]
  day       <day-of-month> [date:YYYY-MM-DD]
  calendar  [view:week|month] [date:YYYY-MM-DD]
  add       title: date: start: end: [description: location: category: notify: force:yes]
  overlaps  date: start: end: [id:]
  upcoming  [at:\"YYYY-MM-DD HH:MM\"] [notified:id1,id2]
  holidays  [date:YYYY-MM-DD]
  validate  <start HH:MM> <end HH:MM>
  _show | help | version

\"now\" and default dates use DAYBOOK_TIMEZONE (or daybook-time.toml), else Asia/Seoul.
";

fn cmd_help() -> anyhow::Result<()> {
    print!("{HELP_TEXT}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{HELP_TEXT, Modifiers, expand_command_abbrev, known_command_names};

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn abbreviations_must_be_unique() {
        let known = known_command_names();
        assert_eq!(expand_command_abbrev("cal", &known), Some("calendar"));
        assert_eq!(expand_command_abbrev("list", &known), Some("list"));
        assert_eq!(expand_command_abbrev("h", &known), None);
        assert_eq!(expand_command_abbrev("zzz", &known), None);
    }

    #[test]
    fn modifiers_split_keys_and_words() {
        let mods = Modifiers::parse(&args(&[
            "start:14:00",
            "desc:weekly sync",
            "팀",
            "회의",
            "ratio:1:2",
        ]));
        assert_eq!(mods.get("start"), Some("14:00"));
        assert_eq!(mods.get("description"), Some("weekly sync"));
        assert_eq!(mods.words, args(&["팀", "회의", "ratio:1:2"]));
    }

    #[test]
    fn form_uses_words_as_title() {
        let mods = Modifiers::parse(&args(&[
            "date:2024-07-01",
            "start:14:00",
            "end:15:00",
            "notify:30",
            "중요",
            "회의",
        ]));
        let form = mods.to_form().expect("form");
        assert_eq!(form.title, "중요 회의");
        assert_eq!(form.notification_time, 30);
        assert_eq!(form.start_time, "14:00");
    }

    #[test]
    fn form_requires_time_fields() {
        let mods = Modifiers::parse(&args(&["title:x", "date:2024-07-01", "start:14:00"]));
        let err = mods.to_form().expect_err("missing end");
        assert!(err.to_string().contains("end:"));
    }

    #[test]
    fn overlap_probe_may_omit_title() {
        let mods = Modifiers::parse(&args(&["date:2024-07-01", "start:14:00", "end:15:00"]));
        assert!(mods.to_form().is_err());
        let form = mods.to_untitled_form().expect("probe form");
        assert_eq!(form.date, "2024-07-01");
    }

    #[test]
    fn force_flag_accepts_truthy_values() {
        assert!(Modifiers::parse(&args(&["force:yes"])).flag("force"));
        assert!(!Modifiers::parse(&args(&["force:no"])).flag("force"));
        assert!(!Modifiers::parse(&args(&[])).flag("force"));
    }

    #[test]
    fn help_names_timezone_source() {
        assert!(HELP_TEXT.contains("DAYBOOK_TIMEZONE"));
        assert!(HELP_TEXT.contains("Asia/Seoul"));
        for name in known_command_names() {
            assert!(HELP_TEXT.contains(name), "{name}");
        }
    }
}
