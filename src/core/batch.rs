/*
 * Sequential batch execution. Each item's operation starts only after the
 * previous one has settled, and a failing item never stops the rest. The
 * context is threaded through every call so the operation and the completion
 * callback can both mutate the same state.
 */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchOutcome {
    pub succeeded: usize,
    pub total: usize,
}

impl BatchOutcome {
    pub fn all_succeeded(&self) -> bool {
        self.succeeded == self.total
    }

    // Whether a "N of M succeeded" summary should be reported.
    pub fn needs_summary(&self) -> bool {
        self.total > 1
    }
}

pub fn process_batch<C, T, E, Op, Done>(
    ctx: &mut C,
    items: &[T],
    mut operation: Op,
    on_complete: Done,
) -> BatchOutcome
where
    Op: FnMut(&mut C, &T) -> Result<(), E>,
    Done: FnOnce(&mut C, &BatchOutcome),
    E: std::fmt::Display,
{
    let mut outcome = BatchOutcome {
        succeeded: 0,
        total: items.len(),
    };
    for (index, item) in items.iter().enumerate() {
        match operation(ctx, item) {
            Ok(()) => outcome.succeeded += 1,
            Err(e) => log::warn!("Batch: Item {} of {} failed: {e}", index + 1, outcome.total),
        }
    }
    if outcome.needs_summary() {
        log::info!(
            "Batch: {} of {} operations succeeded",
            outcome.succeeded,
            outcome.total
        );
    }
    on_complete(ctx, &outcome);
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_in_the_middle_does_not_abort() {
        // Arrange
        let mut calls: Vec<u32> = Vec::new();
        let mut completions = 0;

        // Act
        let outcome = {
            let mut ctx = (&mut calls, &mut completions);
            process_batch(
                &mut ctx,
                &[1u32, 2, 3],
                |ctx, item| {
                    ctx.0.push(*item);
                    if *item == 2 { Err("boom") } else { Ok(()) }
                },
                |ctx, outcome| {
                    *ctx.1 += 1;
                    assert_eq!(outcome.succeeded, 2);
                },
            )
        };

        // Assert
        assert_eq!(calls, vec![1, 2, 3]);
        assert_eq!(completions, 1);
        assert_eq!(outcome, BatchOutcome { succeeded: 2, total: 3 });
        assert!(outcome.needs_summary());
        assert!(!outcome.all_succeeded());
    }

    #[test]
    fn test_empty_batch_still_completes() {
        let mut completed = false;
        let outcome = process_batch(
            &mut completed,
            &[] as &[u8],
            |_, _| Ok::<(), String>(()),
            |done, _| *done = true,
        );
        assert!(completed);
        assert_eq!(outcome.total, 0);
        assert!(!outcome.needs_summary());
    }
}
