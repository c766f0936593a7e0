use chrono::NaiveDate;
use egui::Color32;

use crate::data::{format_date_key, format_date_long, Comment};
use crate::palette::sentiment_color;

pub const EMPTY_PLACEHOLDER: &str = "No trending comments for this date.";
pub const IDLE_HEADER: &str = "Hover a chart to pick a date";

#[derive(Debug, Clone, PartialEq)]
pub struct CommentItem {
    pub label: String,
    pub badge: Color32,
    pub score_label: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PanelBody {
    /// Nothing selected yet.
    Idle,
    /// A date is selected but no comment matches it.
    Empty,
    Items(Vec<CommentItem>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommentPanelView {
    pub header: String,
    pub body: PanelBody,
}

impl Default for CommentPanelView {
    fn default() -> Self {
        Self {
            header: IDLE_HEADER.to_string(),
            body: PanelBody::Idle,
        }
    }
}

impl CommentPanelView {
    pub fn items(&self) -> &[CommentItem] {
        match &self.body {
            PanelBody::Items(items) => items,
            _ => &[],
        }
    }
}

/// Panel contents for `date`: every comment whose raw date text equals the
/// `YYYY-MM-DD` form of `date`, in source order.
pub fn show_comments_for_date(comments: &[Comment], date: NaiveDate) -> CommentPanelView {
    let key = format_date_key(date);
    let items: Vec<CommentItem> = comments
        .iter()
        .filter(|c| c.date == key)
        .map(|c| CommentItem {
            label: c.sentiment_label.clone(),
            badge: sentiment_color(&c.sentiment_label),
            score_label: format!("UPVOTES: {}", c.score),
            body: c.body.clone(),
        })
        .collect();

    CommentPanelView {
        header: format_date_long(date),
        body: if items.is_empty() {
            PanelBody::Empty
        } else {
            PanelBody::Items(items)
        },
    }
}
