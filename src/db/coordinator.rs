//! # Append Coordinator
//!
//! One writer path per log. Everything from the conflict check to waiter
//! delivery runs under the log's cell lock: conflict check, rule
//! validation, slot reservation, durable store write, then commit. A
//! failed store write rolls the reservation back before the lock is
//! released, so no observer ever sees an age the store cannot back.

use tracing::{debug, error, info, warn};

use super::errors::{DbError, DbResult};
use super::fact::Fact;
use super::registry::LogCell;
use super::service::Factlog;
use super::validate_log_name;

impl Factlog {
    /// Durable fact count of `log`. Answered from the loaded cell when
    /// one exists, otherwise straight from the store without forcing a
    /// replay.
    pub async fn current_age(&self, log: &str) -> DbResult<u64> {
        validate_log_name(log)?;
        let handle = self.registry.get_or_create(log);
        let cell = handle.cell.lock().await;
        self.age_of(log, &cell).await
    }

    pub(crate) async fn age_of(&self, log: &str, cell: &LogCell) -> DbResult<u64> {
        if cell.loaded {
            Ok(cell.age)
        } else {
            Ok(self.store.length(log).await?)
        }
    }

    /// Record `fact` as fact number `claimed_age` of `log`.
    ///
    /// The append is optimistic: it succeeds only if `claimed_age` is
    /// exactly one past the log's current age, so concurrent claims for
    /// one slot admit exactly one winner. The fact must also satisfy the
    /// log's integration rule; validation happens before anything is
    /// written, and a validated fact is folded into the state only after
    /// the store confirms the write.
    pub async fn append(&self, log: &str, claimed_age: u64, fact: Fact) -> DbResult<()> {
        validate_log_name(log)?;
        let handle = self.registry.get_or_create(log);
        let mut cell = handle.cell.lock().await;
        self.projector.ensure_loaded(log, &mut cell).await?;

        let expected = cell.age + 1;
        if claimed_age != expected {
            debug!(log, claimed = claimed_age, expected, "append conflict");
            return Err(DbError::Conflict { expected });
        }

        let next_state = self.projector.prepare(log, &cell, &fact)?;

        // Reserve the slot; rolled back before the lock is released if
        // the store write fails.
        cell.age += 1;
        let position = match self.store.append(log, &fact).await {
            Ok(position) => position,
            Err(source) => {
                cell.age -= 1;
                warn!(log, slot = claimed_age, error = %source, "append rolled back");
                return Err(DbError::Storage(source));
            }
        };
        if position != claimed_age {
            cell.age -= 1;
            error!(
                log,
                reserved = claimed_age,
                reported = position,
                "store position diverged from reservation"
            );
            return Err(DbError::ImpossibleState {
                reserved: claimed_age,
                reported: position,
            });
        }

        cell.state = Some(next_state);
        let delivered = cell.waiters.notify(&fact);
        if delivered > 0 {
            debug!(log, fact = claimed_age, delivered, "woke long-poll readers");
        }
        info!(log, fact = claimed_age, "fact recorded");
        Ok(())
    }
}
