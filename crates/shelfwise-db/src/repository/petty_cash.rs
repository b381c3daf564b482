//! # Petty Cash Repository
//!
//! The shop's cash float: top-ups add to it, expenses draw from it. The
//! balance is never stored; it is always `Σ top_up − Σ expense`.
//!
//! ## Overdraw Guard
//! ```text
//! INSERT INTO petty_cash_entries (...)
//! SELECT ?...
//! WHERE kind != 'expense'
//!    OR (SELECT balance) >= amount     ← checked by the INSERT itself
//!
//! 0 rows inserted ──► InsufficientFunds { balance, requested }
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{info, warn};

use super::{clean, generate_id};
use crate::error::DbResult;
use shelfwise_core::money::Money;
use shelfwise_core::reports::{expense_lines, ExpenseLine, ReportPeriod};
use shelfwise_core::validation::{validate_positive_amount_cents, validate_text};
use shelfwise_core::{CoreError, NewPettyCashEntry, PettyCashEntry, PettyCashKind};

/// Longest allowed expense category.
const MAX_CATEGORY_LEN: usize = 60;

const BALANCE_SQL: &str = r#"
    SELECT COALESCE(SUM(CASE WHEN kind = 'top_up' THEN amount_cents ELSE -amount_cents END), 0)
    FROM petty_cash_entries
"#;

#[derive(Debug, Clone)]
pub struct PettyCashRepository {
    pool: SqlitePool,
}

impl PettyCashRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PettyCashRepository { pool }
    }

    /// Records a top-up or an expense.
    ///
    /// Categories are stored lowercase so "Transport" and "transport" land
    /// in the same P&L line.
    ///
    /// ## Returns
    /// * `Err(Domain(InsufficientFunds))` - expense larger than the float
    pub async fn record(&self, input: &NewPettyCashEntry) -> DbResult<PettyCashEntry> {
        validate_text("category", &input.category, MAX_CATEGORY_LEN)?;
        validate_positive_amount_cents("amount_cents", input.amount_cents)?;

        let now = Utc::now();
        let entry = PettyCashEntry {
            id: generate_id(),
            kind: input.kind,
            category: input.category.trim().to_lowercase(),
            amount_cents: input.amount_cents,
            description: clean(input.description.as_deref()),
            reference: clean(input.reference.as_deref()),
            occurred_at: input.occurred_at.unwrap_or(now),
            created_at: now,
        };

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO petty_cash_entries (
                id, kind, category, amount_cents, description, reference, occurred_at, created_at
            )
            SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8
            WHERE ?2 != 'expense'
               OR (SELECT COALESCE(SUM(CASE WHEN kind = 'top_up' THEN amount_cents ELSE -amount_cents END), 0)
                   FROM petty_cash_entries) >= ?4
            "#,
        )
        .bind(&entry.id)
        .bind(entry.kind)
        .bind(&entry.category)
        .bind(entry.amount_cents)
        .bind(&entry.description)
        .bind(&entry.reference)
        .bind(entry.occurred_at)
        .bind(entry.created_at)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            let balance = balance_on(&mut tx).await?;
            warn!(balance = %balance, requested = entry.amount_cents, "Petty cash expense rejected");
            return Err(CoreError::InsufficientFunds {
                balance: balance.cents(),
                requested: entry.amount_cents,
            }
            .into());
        }

        tx.commit().await?;

        info!(
            kind = %entry.kind,
            category = %entry.category,
            amount_cents = entry.amount_cents,
            "Petty cash entry recorded"
        );
        Ok(entry)
    }

    /// Current float.
    pub async fn balance(&self) -> DbResult<Money> {
        let mut conn = self.pool.acquire().await?;
        balance_on(&mut conn).await
    }

    /// Entries, newest first, optionally within `[from, to)` and of one kind.
    pub async fn list(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        kind: Option<PettyCashKind>,
    ) -> DbResult<Vec<PettyCashEntry>> {
        let entries = sqlx::query_as::<_, PettyCashEntry>(
            r#"
            SELECT * FROM petty_cash_entries
            WHERE (?1 IS NULL OR occurred_at >= ?1)
              AND (?2 IS NULL OR occurred_at < ?2)
              AND (?3 IS NULL OR kind = ?3)
            ORDER BY occurred_at DESC, rowid DESC
            "#,
        )
        .bind(from)
        .bind(to)
        .bind(kind)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Expense totals per category in `[from, to)`, alphabetical.
    pub async fn expenses_by_category(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<ExpenseLine>> {
        let period = ReportPeriod::new(from, to)?;
        let entries = self.list(Some(from), Some(to), Some(PettyCashKind::Expense)).await?;
        Ok(expense_lines(&period, &entries))
    }
}

async fn balance_on(conn: &mut SqliteConnection) -> DbResult<Money> {
    let cents: i64 = sqlx::query_scalar(BALANCE_SQL).fetch_one(&mut *conn).await?;
    Ok(Money::from_cents(cents))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::repository::test_db;
    use chrono::{Duration, TimeZone};

    fn entry(kind: PettyCashKind, category: &str, cents: i64) -> NewPettyCashEntry {
        NewPettyCashEntry {
            kind,
            category: category.to_string(),
            amount_cents: cents,
            description: None,
            reference: None,
            occurred_at: None,
        }
    }

    #[tokio::test]
    async fn test_balance_tracks_entries() {
        let db = test_db().await;
        let repo = db.petty_cash();
        assert_eq!(repo.balance().await.unwrap(), Money::zero());

        repo.record(&entry(PettyCashKind::TopUp, "float", 10_000)).await.unwrap();
        repo.record(&entry(PettyCashKind::Expense, " Transport ", 2_500)).await.unwrap();
        assert_eq!(repo.balance().await.unwrap().cents(), 7_500);

        // Spending the float exactly is fine
        repo.record(&entry(PettyCashKind::Expense, "tea", 7_500)).await.unwrap();
        assert!(repo.balance().await.unwrap().is_zero());
    }

    #[tokio::test]
    async fn test_overdraw_rejected() {
        let db = test_db().await;
        let repo = db.petty_cash();
        repo.record(&entry(PettyCashKind::TopUp, "float", 1_000)).await.unwrap();

        let err = repo
            .record(&entry(PettyCashKind::Expense, "courier", 1_001))
            .await
            .unwrap_err();
        match err {
            DbError::Domain(CoreError::InsufficientFunds { balance, requested }) => {
                assert_eq!(balance, 1_000);
                assert_eq!(requested, 1_001);
            }
            other => panic!("expected InsufficientFunds, got {other:?}"),
        }
        assert_eq!(repo.list(None, None, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rejects_bad_input() {
        let db = test_db().await;
        let repo = db.petty_cash();

        assert!(repo.record(&entry(PettyCashKind::TopUp, "float", 0)).await.is_err());
        assert!(repo.record(&entry(PettyCashKind::TopUp, "  ", 100)).await.is_err());
        let long = "x".repeat(61);
        assert!(repo.record(&entry(PettyCashKind::TopUp, &long, 100)).await.is_err());
    }

    #[tokio::test]
    async fn test_expenses_by_category() {
        let db = test_db().await;
        let repo = db.petty_cash();
        let march = Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap();

        let mut top_up = entry(PettyCashKind::TopUp, "float", 50_000);
        top_up.occurred_at = Some(march - Duration::days(30));
        repo.record(&top_up).await.unwrap();

        for (category, cents, days) in [("transport", 1_200, 0), ("Utilities", 4_000, 1), ("transport", 800, 2), ("tea", 300, 40)] {
            let mut e = entry(PettyCashKind::Expense, category, cents);
            e.occurred_at = Some(march + Duration::days(days));
            repo.record(&e).await.unwrap();
        }

        let from = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap();
        let lines = repo.expenses_by_category(from, to).await.unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].category, "transport");
        assert_eq!(lines[0].amount.cents(), 2_000);
        assert_eq!(lines[1].category, "utilities");
        assert_eq!(lines[1].amount.cents(), 4_000);

        let expenses = repo
            .list(Some(from), Some(to), Some(PettyCashKind::Expense))
            .await
            .unwrap();
        assert_eq!(expenses.len(), 3);

        assert!(matches!(
            repo.expenses_by_category(to, from).await,
            Err(DbError::Domain(CoreError::InvalidPeriod { .. }))
        ));
    }
}
