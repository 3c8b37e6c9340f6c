//! Plain-text rendering of command results

use crate::models::{Job, JobStats, StatusFilter, User};

const HEADERS: [&str; 6] = ["ID", "TITLE", "COMPANY", "LOCATION", "STATUS", "APPLIED"];

/// Render jobs as an aligned table, in the order given
pub fn job_table(jobs: &[Job]) -> String {
    if jobs.is_empty() {
        return "No jobs found.\n".to_string();
    }

    let rows: Vec<[String; 6]> = jobs
        .iter()
        .map(|job| {
            [
                job.id.to_string(),
                job.title.clone(),
                job.company.clone(),
                job.location.clone().unwrap_or_else(|| "-".to_string()),
                job.status.to_string(),
                job.date_applied.to_string(),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_row(&mut out, HEADERS.iter().copied(), &widths);
    for row in &rows {
        push_row(&mut out, row.iter().map(String::as_str), &widths);
    }
    out
}

fn push_row<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>, widths: &[usize; 6]) {
    let line = cells
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
        .collect::<Vec<_>>()
        .join("  ");
    out.push_str(line.trim_end());
    out.push('\n');
}

/// Render the per-status counters
pub fn stats(filter: StatusFilter, stats: &JobStats) -> String {
    format!(
        "Filter:       {}\nTotal:        {}\nApplied:      {}\nInterviewing: {}\nOffers:       {}\nRejected:     {}\n",
        filter, stats.total, stats.applied, stats.interviewing, stats.offers, stats.rejected
    )
}

/// Render the signed-in user
pub fn user(user: &User) -> String {
    let jobs = match user.jobs.len() {
        1 => "1 job".to_string(),
        n => format!("{} jobs", n),
    };
    format!("{} <{}> (id {}, {})\n", user.display_name(), user.email, user.id, jobs)
}

/// One-line summary of a single job
pub fn job_line(job: &Job) -> String {
    format!("#{} {} at {} [{}]", job.id, job.title, job.company, job.status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JobStatus;
    use chrono::NaiveDate;

    fn job(id: i64, title: &str, location: Option<&str>, status: JobStatus) -> Job {
        Job {
            id,
            title: title.to_string(),
            company: "Initech".to_string(),
            location: location.map(str::to_string),
            status,
            date_applied: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            owner_id: 1,
        }
    }

    #[test]
    fn test_empty_table() {
        assert_eq!(job_table(&[]), "No jobs found.\n");
    }

    #[test]
    fn test_table_keeps_order_and_aligns() {
        let jobs = vec![
            job(7, "Staff Engineer", Some("Remote"), JobStatus::Offer),
            job(3, "Dev", None, JobStatus::Applied),
        ];
        let table = job_table(&jobs);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("ID  TITLE"));
        assert!(lines[1].starts_with("7   Staff Engineer  Initech  Remote"));
        assert!(lines[2].starts_with("3   Dev             Initech  -"));
        assert!(lines[2].ends_with("2024-03-01"));
    }

    #[test]
    fn test_stats_lists_every_counter() {
        let jobs = vec![
            job(1, "A", None, JobStatus::Applied),
            job(2, "B", None, JobStatus::Offer),
        ];
        let out = stats(StatusFilter::All, &JobStats::from_jobs(&jobs));

        assert!(out.contains("Filter:       All"));
        assert!(out.contains("Total:        2"));
        assert!(out.contains("Offers:       1"));
        assert!(out.contains("Rejected:     0"));
    }

    #[test]
    fn test_user_line() {
        let user = User {
            id: 1,
            email: "ada@example.com".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            jobs: vec![job(1, "A", None, JobStatus::Applied)],
        };
        assert_eq!(
            super::user(&user),
            "Ada Lovelace <ada@example.com> (id 1, 1 job)\n"
        );
    }
}
