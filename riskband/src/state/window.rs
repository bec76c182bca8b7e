// riskband/src/state/window.rs
//
// Per-account replay of a batch.
//
// Design:
//   - One stable sort of the whole table by (account_id, timestamp)
//   - A single pass that tracks where the current account's run started
//   - Each step yields a borrowed view of that run, ending at the current row
//
// Scorers never see rows from another account, and never see rows that come
// after the transaction being scored.

use tracing::debug;

use crate::records::Transaction;

// ── Account window ────────────────────────────────────────────────────────────

/// Non-empty, time-ordered prefix of one account's transactions. The last row
/// is the transaction being scored.
#[derive(Debug, Clone, Copy)]
pub struct AccountWindow<'a> {
    rows: &'a [&'a Transaction],
}

impl<'a> AccountWindow<'a> {
    pub fn size(&self) -> usize { self.rows.len() }

    pub fn rows(&self) -> &'a [&'a Transaction] { self.rows }

    pub fn current(&self) -> &'a Transaction {
        self.rows[self.rows.len() - 1]
    }

    /// Every row except the current one.
    pub fn history(&self) -> &'a [&'a Transaction] {
        &self.rows[..self.rows.len() - 1]
    }

    /// The last `n` rows (or all of them when the window is shorter).
    pub fn tail(&self, n: usize) -> AccountWindow<'a> {
        let n     = n.max(1).min(self.rows.len());
        let start = self.rows.len() - n;
        Self { rows: &self.rows[start..] }
    }

    pub fn account_id(&self) -> &'a str {
        &self.current().account_id
    }
}

// ── Timeline ──────────────────────────────────────────────────────────────────

pub struct AccountTimeline<'a> {
    ordered: Vec<&'a Transaction>,
}

impl<'a> AccountTimeline<'a> {
    pub fn new(transactions: &'a [Transaction]) -> Self {
        let mut ordered: Vec<&Transaction> = transactions.iter().collect();
        // stable: equal timestamps keep input order
        ordered.sort_by(|a, b| {
            a.account_id.cmp(&b.account_id)
                .then(a.timestamp.cmp(&b.timestamp))
                .then(a.index.cmp(&b.index))
        });
        debug!("Timeline built over {} transactions", ordered.len());
        Self { ordered }
    }

    pub fn len(&self) -> usize { self.ordered.len() }
    pub fn is_empty(&self) -> bool { self.ordered.is_empty() }

    pub fn n_accounts(&self) -> usize {
        self.windows().filter(|w| w.size() == 1).count()
    }

    /// One growing window per transaction, in (account, time) order.
    pub fn windows(&self) -> impl Iterator<Item = AccountWindow<'_>> + '_ {
        let mut start = 0usize;
        (0..self.ordered.len()).map(move |end| {
            if self.ordered[end].account_id != self.ordered[start].account_id {
                start = end;
            }
            AccountWindow { rows: &self.ordered[start..=end] }
        })
    }
}
