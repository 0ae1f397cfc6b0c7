//! Custom askama filters used by `templates/home.html`.

use chrono::{DateTime, Utc};

pub fn human_date(date: &chrono::NaiveDate) -> askama::Result<String> {
    Ok(date.format("%A, %B %-d, %Y").to_string())
}

pub fn human_time(dt: &DateTime<Utc>) -> askama::Result<String> {
    Ok(dt.format("%H:%M UTC").to_string())
}

/// Health label for the feed sidebar, driven by the Fetcher's failure
/// state machine: healthy at zero consecutive failures, degraded below
/// `unhealthy_threshold`, unhealthy at or above it. Auto-deactivation is
/// the terminal state and isn't represented here — a deactivated feed is
/// simply absent from the sidebar's feed list.
pub fn health_status(consecutive_failures: &i64, unhealthy_threshold: &i64) -> askama::Result<String> {
    Ok(if *consecutive_failures == 0 {
        "healthy".to_string()
    } else if consecutive_failures < unhealthy_threshold {
        format!("degraded ({consecutive_failures} failures)")
    } else {
        format!("unhealthy ({consecutive_failures} failures)")
    })
}

/// Freshness label for the feed sidebar: how long since the feed last
/// produced a new entry.
pub fn freshness(last_entry_at: &Option<DateTime<Utc>>) -> askama::Result<String> {
    let Some(last) = last_entry_at else {
        return Ok("no entries yet".to_string());
    };
    let age = Utc::now().signed_duration_since(*last);
    Ok(if age.num_days() > 0 {
        format!("{}d ago", age.num_days())
    } else if age.num_hours() > 0 {
        format!("{}h ago", age.num_hours())
    } else {
        "just now".to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn freshness_reports_none_when_unset() {
        assert_eq!(freshness(&None).unwrap(), "no entries yet");
    }

    #[test]
    fn health_status_is_healthy_at_zero_failures() {
        assert_eq!(health_status(&0, &3).unwrap(), "healthy");
    }

    #[test]
    fn health_status_is_degraded_below_threshold() {
        assert_eq!(health_status(&1, &3).unwrap(), "degraded (1 failures)");
    }

    #[test]
    fn health_status_is_unhealthy_at_or_above_threshold() {
        assert_eq!(health_status(&3, &3).unwrap(), "unhealthy (3 failures)");
    }

    #[test]
    fn freshness_reports_days_ago() {
        let old = Utc::now() - chrono::Duration::days(3);
        assert_eq!(freshness(&Some(old)).unwrap(), "3d ago");
    }

    #[test]
    fn human_date_formats_full_weekday() {
        let date = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap().date_naive();
        assert!(human_date(&date).unwrap().contains("2024"));
    }
}
