use std::collections::HashMap;

use anyhow::Result;
use chrono::{Days, NaiveDate};
use rusqlite::params;

use encore_types::models::{DailyVisits, DashboardSummary, VisitStats};

use crate::Database;
use crate::models::{db_now, format_timestamp};

impl Database {
    pub fn insert_visit(&self, path: &str, visitor_hash: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO visits (path, visitor_hash, created_at) VALUES (?1, ?2, ?3)",
                params![path, visitor_hash, format_timestamp(&db_now())],
            )?;
            Ok(())
        })
    }

    /// Visit counts for the `days` days ending on `today` (inclusive). Days
    /// without traffic are reported as zero so charts get a continuous axis.
    pub fn visit_stats(&self, days: u32, today: NaiveDate) -> Result<VisitStats> {
        let days = days.max(1);
        let first_day = today
            .checked_sub_days(Days::new(u64::from(days - 1)))
            .unwrap_or(NaiveDate::MIN);
        let since = first_day.to_string();
        let until = today.to_string();

        self.with_conn(|conn| {
            let (total_visits, unique_visitors): (i64, i64) = conn.query_row(
                "SELECT COUNT(*), COUNT(DISTINCT visitor_hash) FROM visits
                 WHERE substr(created_at, 1, 10) BETWEEN ?1 AND ?2",
                [&since, &until],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;

            let mut stmt = conn.prepare(
                "SELECT substr(created_at, 1, 10) AS day, COUNT(*) FROM visits
                 WHERE substr(created_at, 1, 10) BETWEEN ?1 AND ?2
                 GROUP BY day",
            )?;
            let counts: HashMap<String, i64> = stmt
                .query_map([&since, &until], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<_, _>>()?;

            let per_day = first_day
                .iter_days()
                .take(days as usize)
                .map(|day| DailyVisits {
                    day,
                    visits: counts.get(&day.to_string()).copied().unwrap_or(0) as u64,
                })
                .collect();

            Ok(VisitStats {
                total_visits: total_visits as u64,
                unique_visitors: unique_visitors as u64,
                per_day,
            })
        })
    }

    pub fn dashboard_summary(&self, today: NaiveDate) -> Result<DashboardSummary> {
        self.with_conn(|conn| {
            let count = |sql: &str, args: &[&dyn rusqlite::ToSql]| -> Result<u64> {
                let n: i64 = conn.query_row(sql, args, |row| row.get(0))?;
                Ok(n as u64)
            };

            Ok(DashboardSummary {
                videos_total: count("SELECT COUNT(*) FROM videos", &[])?,
                videos_pending: count("SELECT COUNT(*) FROM videos WHERE status = 'pending'", &[])?,
                videos_completed: count(
                    "SELECT COUNT(*) FROM videos WHERE status = 'completed'",
                    &[],
                )?,
                fan_messages_unread: count("SELECT COUNT(*) FROM fan_messages WHERE read = 0", &[])?,
                song_requests_pending: count(
                    "SELECT COUNT(*) FROM song_requests WHERE status = 'pending'",
                    &[],
                )?,
                calendar_upcoming: count(
                    "SELECT COUNT(*) FROM content_calendar
                     WHERE scheduled_for >= ?1 AND status != 'published'",
                    &[&today.to_string()],
                )?,
            })
        })
    }
}
