// src/utils.rs
use std::collections::BTreeMap;

use crate::types::{Application, ApplicationStatus};

/// Collapse whitespace runs and lowercase, for name comparisons
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Local filter over an already-fetched application list
#[derive(Debug, Clone, Default)]
pub struct ApplicationFilter {
    pub status: Option<ApplicationStatus>,
    /// Include completed, rejected and withdrawn applications
    pub include_closed: bool,
}

impl ApplicationFilter {
    pub fn matches(&self, application: &Application) -> bool {
        match self.status {
            // An explicit status wins over the open/closed split
            Some(status) => application.status == status,
            None => self.include_closed || application.status.is_active(),
        }
    }
}

/// Filter then sort newest first
pub fn filter_applications(
    applications: &[Application],
    filter: &ApplicationFilter,
) -> Vec<Application> {
    let mut selected: Vec<Application> = applications
        .iter()
        .filter(|a| filter.matches(a))
        .cloned()
        .collect();
    sort_newest_first(&mut selected);
    selected
}

pub fn sort_newest_first(applications: &mut [Application]) {
    applications.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
}

/// Pipeline order, terminal statuses last
pub fn sort_by_pipeline(applications: &mut [Application]) {
    applications.sort_by_key(|a| {
        (
            a.status.pipeline_rank().unwrap_or(usize::MAX),
            std::cmp::Reverse(a.created_at),
        )
    });
}

/// Number of applications per status
pub fn status_counts(applications: &[Application]) -> BTreeMap<&'static str, usize> {
    let mut counts = BTreeMap::new();
    for application in applications {
        *counts.entry(application.status.as_str()).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app(id: u64, status: &str, job: u64, created: &str) -> Application {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "status": status,
            "job_id": job,
            "created_at": created,
        }))
        .unwrap()
    }

    fn sample() -> Vec<Application> {
        vec![
            app(1, "pending", 10, "2024-03-01T10:00:00Z"),
            app(2, "withdrawn", 10, "2024-03-03T10:00:00Z"),
            app(3, "active", 11, "2024-03-02T10:00:00Z"),
            app(4, "rejected", 11, "2024-02-20T10:00:00Z"),
        ]
    }

    fn ids(applications: &[Application]) -> Vec<String> {
        applications.iter().map(|a| a.id.to_string()).collect()
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  Jane   DOE "), "jane doe");
        assert_eq!(normalize_name(""), "");
    }

    #[test]
    fn test_default_filter_hides_closed() {
        let selected = filter_applications(&sample(), &ApplicationFilter::default());
        assert_eq!(ids(&selected), vec!["3", "1"]);
    }

    #[test]
    fn test_include_closed() {
        let filter = ApplicationFilter {
            include_closed: true,
            ..Default::default()
        };
        assert_eq!(
            ids(&filter_applications(&sample(), &filter)),
            vec!["2", "3", "1", "4"]
        );
    }

    #[test]
    fn test_explicit_status_overrides_closed_split() {
        let filter = ApplicationFilter {
            status: Some(ApplicationStatus::Withdrawn),
            ..Default::default()
        };
        assert_eq!(ids(&filter_applications(&sample(), &filter)), vec!["2"]);
    }

    #[test]
    fn test_sort_by_pipeline() {
        let mut applications = sample();
        sort_by_pipeline(&mut applications);
        assert_eq!(ids(&applications), vec!["1", "3", "2", "4"]);
    }

    #[test]
    fn test_status_counts() {
        let mut applications = sample();
        applications.push(app(5, "pending", 12, "2024-03-04T10:00:00Z"));
        let counts = status_counts(&applications);
        assert_eq!(counts.get("pending"), Some(&2));
        assert_eq!(counts.get("active"), Some(&1));
        assert_eq!(counts.get("accepted"), None);
    }
}
