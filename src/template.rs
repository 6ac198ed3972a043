//! SQL templates with named field references.
//!
//! A template such as `update #table set name=:1.name where id=:1.id` is parsed
//! once into literal text, positional parameters and table placeholders.
//! Rendering for a shard swaps every reference for `?` and every `#table` for
//! the shard's table; the referenced fields are reported in positional order so
//! the binder can line values up with the placeholders.

use crate::core::{DbError, Result};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Quoted literals and `::` casts are matched first so they are skipped.
    static ref TOKEN_REGEX: Regex = Regex::new(
        r"'(?:[^']|'')*'|::|:(?P<param>[A-Za-z0-9_]+(?:\.[A-Za-z_][A-Za-z0-9_]*)*)|(?P<table>#table\b)"
    )
    .expect("template token regex is valid");
}

pub const TABLE_PLACEHOLDER: &str = "#table";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param,
    Table,
}

#[derive(Debug, Clone)]
pub struct SqlTemplate {
    source: String,
    segments: Vec<Segment>,
    fields: Vec<String>,
}

impl SqlTemplate {
    pub fn parse(sql: &str) -> Result<Self> {
        if sql.trim().is_empty() {
            return Err(DbError::ParseError("SQL template must not be empty".into()));
        }

        let mut segments = Vec::new();
        let mut fields = Vec::new();
        let mut last = 0;

        for caps in TOKEN_REGEX.captures_iter(sql) {
            let Some(whole) = caps.get(0) else {
                continue;
            };

            if let Some(param) = caps.name("param") {
                push_literal(&mut segments, &sql[last..whole.start()]);
                fields.push(field_path(param.as_str())?);
                segments.push(Segment::Param);
                last = whole.end();
            } else if caps.name("table").is_some() {
                push_literal(&mut segments, &sql[last..whole.start()]);
                segments.push(Segment::Table);
                last = whole.end();
            }
        }
        push_literal(&mut segments, &sql[last..]);

        Ok(Self {
            source: sql.to_string(),
            segments,
            fields,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Referenced field paths, one per placeholder, in positional order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn uses_table(&self) -> bool {
        self.segments.contains(&Segment::Table)
    }

    /// Render the statement text for one table.
    pub fn render(&self, table: &str) -> String {
        let mut sql = String::with_capacity(self.source.len() + table.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => sql.push_str(text),
                Segment::Param => sql.push('?'),
                Segment::Table => sql.push_str(table),
            }
        }
        sql
    }
}

fn push_literal(segments: &mut Vec<Segment>, text: &str) {
    if !text.is_empty() {
        segments.push(Segment::Literal(text.to_string()));
    }
}

/// `:1.name` and `:name` both reference field `name`; the leading numeric
/// segment only names the method parameter.
fn field_path(reference: &str) -> Result<String> {
    let mut parts = reference.split('.').peekable();
    if let Some(first) = parts.peek() {
        if first.chars().all(|c| c.is_ascii_digit()) {
            parts.next();
        }
    }

    let path: Vec<&str> = parts.collect();
    if path.is_empty() {
        return Err(DbError::ParseError(format!(
            "parameter reference ':{}' must name a field",
            reference
        )));
    }
    Ok(path.join("."))
}
