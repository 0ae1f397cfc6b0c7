use crate::domain::models::{Entry, Feed};
use askama::Template;
use chrono::NaiveDate;

#[derive(Template)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub site_title: String,
    pub days: Vec<(NaiveDate, Vec<(Entry, String)>)>,
    pub feeds: Vec<Feed>,
    pub used_fallback: bool,
    pub feed_failure_threshold: i64,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub status: u16,
    pub message: String,
}
