//! Projection of local state into what gets shown.
//!
//! `entry_view` and `project_options` are pure. The `*_table` functions are
//! the thin adapter that lays the projection out as terminal tables.

use std::fmt;

use prettytable::{color, Attr, Cell, Row, Table};

use crate::model::Entry;
use crate::ALL_PROJECTS;

/// Which entries are visible.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Filter {
    #[default]
    All,
    Project(String),
}

impl Filter {
    /// `all` and the empty string select every project.
    pub fn parse(value: &str) -> Filter {
        let value = value.trim();
        if value.is_empty() || value == ALL_PROJECTS {
            Filter::All
        } else {
            Filter::Project(value.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Filter::All => ALL_PROJECTS,
            Filter::Project(name) => name,
        }
    }

    pub fn matches(&self, entry: &Entry) -> bool {
        match self {
            Filter::All => true,
            Filter::Project(name) => &entry.project == name,
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct EntryView<'a> {
    pub filter: Filter,
    /// Stored order, newest first.
    pub rows: Vec<&'a Entry>,
    /// Sum over `rows` only.
    pub total: f64,
}

impl EntryView<'_> {
    pub fn total_label(&self) -> String {
        format!("{:.2}", self.total)
    }
}

pub fn entry_view<'a>(entries: &'a [Entry], filter: &Filter) -> EntryView<'a> {
    let rows: Vec<&Entry> = entries.iter().filter(|e| filter.matches(e)).collect();
    let total = rows.iter().map(|e| e.hours).sum();
    EntryView {
        filter: filter.clone(),
        rows,
        total,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectOptions {
    /// Filter choices: `all` first, then every project.
    pub selectable: Vec<String>,
    pub removable: Vec<String>,
    pub selected: Filter,
}

/// Keeps the previous selection when its project still exists.
pub fn project_options(projects: &[String], previous: &Filter) -> ProjectOptions {
    let mut selectable = Vec::with_capacity(projects.len() + 1);
    selectable.push(ALL_PROJECTS.to_string());
    selectable.extend(projects.iter().cloned());

    let selected = match previous {
        Filter::Project(name) if projects.contains(name) => previous.clone(),
        _ => Filter::All,
    };

    ProjectOptions {
        selectable,
        removable: projects.to_vec(),
        selected,
    }
}

pub fn entry_table(view: &EntryView) -> Table {
    let mut table = Table::new();
    table.add_row(row![Fb => "ID", "Date", "Project", "Hours", "Notes"]);

    for (index, entry) in view.rows.iter().enumerate() {
        let text_color = if index % 2 == 1 {
            color::MAGENTA
        } else {
            color::WHITE
        };
        let cells = vec![
            entry.id.to_string(),
            entry.date.to_string(),
            entry.project.clone(),
            format!("{:.2}", entry.hours),
            entry.notes.clone(),
        ]
        .into_iter()
        .map(|text| Cell::new(&text).with_style(Attr::ForegroundColor(text_color)))
        .collect();
        table.add_row(Row::new(cells));
    }

    table.add_row(row![b => "", "", format!("Total ({})", view.filter), view.total_label(), ""]);
    table
}

pub fn project_table(options: &ProjectOptions) -> Table {
    let mut table = Table::new();
    table.add_row(row![Fb => "Project", "Filter"]);
    for project in &options.removable {
        let marker = if options.selected.as_str() == project {
            "*"
        } else {
            ""
        };
        table.add_row(row![project, marker]);
    }
    table
}

/// Shown in place of the entry table when the remote read fails.
pub fn error_table(message: &str) -> Table {
    let mut table = Table::new();
    table.add_row(row![Frb => "CONNECTION FAILED"]);
    table.add_row(row![Fr => message]);
    table
}
