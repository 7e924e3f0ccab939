use std::collections::BTreeMap;
use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::{Datelike, Weekday};
use unicode_width::UnicodeWidthStr;

use crate::calendar::{DayCell, MonthView, WeekView};
use crate::config::Config;
use crate::event::{Event, Schedule};
use crate::validation::TimeErrorRecord;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let enabled = color_setting(cfg)?;
        Ok(Self {
            color: enabled && io::stdout().is_terminal(),
        })
    }

    #[tracing::instrument(skip(self, events))]
    pub fn print_event_table(&mut self, events: &[&Event]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        if events.is_empty() {
            writeln!(out, "No events.")?;
            return Ok(());
        }

        let headers = vec![
            "Date".to_string(),
            "Time".to_string(),
            "Title".to_string(),
            "Location".to_string(),
            "Category".to_string(),
            "Notify".to_string(),
        ];

        let rows: Vec<Vec<String>> = events
            .iter()
            .map(|event| {
                vec![
                    self.paint(event.date(), "33"),
                    format!("{}-{}", event.start_time(), event.end_time()),
                    event.title().to_string(),
                    event.location().to_string(),
                    event.category().to_string(),
                    format!("{}m", event.notification_time()),
                ]
            })
            .collect();

        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, view))]
    pub fn print_month_view(&mut self, view: &MonthView<'_>) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{}", view.title)?;
        writeln!(out)?;

        let headers = weekday_labels(view.week_start);
        let rows: Vec<Vec<String>> = view
            .weeks
            .iter()
            .map(|week| {
                week.iter()
                    .map(|slot| {
                        slot.as_ref()
                            .map(|cell| self.format_cell(cell))
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .collect();
        write_table(&mut out, headers, rows)?;

        let busy: Vec<&DayCell<'_>> = view
            .days()
            .filter(|cell| !cell.events.is_empty() || cell.holiday.is_some())
            .collect();
        if !busy.is_empty() {
            writeln!(out)?;
        }
        for cell in busy {
            self.write_day_detail(&mut out, cell)?;
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, view))]
    pub fn print_week_view(&mut self, view: &WeekView<'_>) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{}", view.title)?;
        writeln!(out)?;
        for cell in &view.days {
            self.write_day_detail(&mut out, cell)?;
        }
        Ok(())
    }

    pub fn print_holidays(&mut self, holidays: &BTreeMap<String, String>) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        if holidays.is_empty() {
            writeln!(out, "No holidays.")?;
            return Ok(());
        }
        let rows: Vec<Vec<String>> = holidays
            .iter()
            .map(|(date, name)| vec![date.clone(), self.paint(name, "31")])
            .collect();
        write_table(&mut out, vec!["Date".to_string(), "Holiday".to_string()], rows)?;
        Ok(())
    }

    pub fn print_time_errors(&mut self, errors: &TimeErrorRecord) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        if !errors.has_error() {
            writeln!(out, "{}", self.paint("ok", "32"))?;
            return Ok(());
        }
        if let Some(message) = errors.start_time_error {
            writeln!(out, "start: {}", self.paint(message, "31"))?;
        }
        if let Some(message) = errors.end_time_error {
            writeln!(out, "end:   {}", self.paint(message, "31"))?;
        }
        Ok(())
    }

    pub fn print_lines<I, S>(&mut self, lines: I) -> anyhow::Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out = io::stdout().lock();
        for line in lines {
            writeln!(out, "{}", line.as_ref())?;
        }
        Ok(())
    }

    fn format_cell(&self, cell: &DayCell<'_>) -> String {
        let day = cell.date.day().to_string();
        let day = if cell.holiday.is_some() {
            self.paint(&day, "31")
        } else {
            day
        };
        if cell.events.is_empty() {
            day
        } else {
            format!("{day}*{}", cell.events.len())
        }
    }

    fn write_day_detail<W: Write>(&self, out: &mut W, cell: &DayCell<'_>) -> anyhow::Result<()> {
        let label = cell.date.format("%m-%d %a").to_string();
        match cell.holiday {
            Some(name) => writeln!(out, "{} {}", self.paint(&label, "33"), self.paint(name, "31"))?,
            None => writeln!(out, "{}", self.paint(&label, "33"))?,
        }
        for event in &cell.events {
            writeln!(
                out,
                "  {}-{} {}",
                event.start_time(),
                event.end_time(),
                event.title()
            )?;
        }
        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn color_setting(cfg: &Config) -> anyhow::Result<bool> {
    let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
    match color_cfg.to_ascii_lowercase().as_str() {
        "on" | "yes" | "true" | "1" => Ok(true),
        "off" | "no" | "false" | "0" => Ok(false),
        other => Err(anyhow!("invalid color setting: {other}")),
    }
}

fn weekday_labels(week_start: Weekday) -> Vec<String> {
    const LABELS: [&str; 7] = ["월", "화", "수", "목", "금", "토", "일"];
    (0..7)
        .map(|offset| {
            let idx = (week_start.num_days_from_monday() + offset) % 7;
            LABELS[idx as usize].to_string()
        })
        .collect()
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for (header, width) in headers.iter().zip(&widths) {
        let padding = width.saturating_sub(UnicodeWidthStr::width(header.as_str()));
        write!(writer, "{}{} ", header, " ".repeat(padding))?;
    }
    writeln!(writer)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "", width = *width)?;
    }
    writeln!(writer)?;

    for row in rows {
        for (idx, width) in widths.iter().enumerate() {
            let cell = row.get(idx).map(String::as_str).unwrap_or_default();
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = width.saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
